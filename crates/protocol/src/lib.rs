//! PowerDial Protocol
//!
//! Shared types between the dialing sequencer and the collaborators around
//! it (lead list owner, disposition form, telephony backend, display).
//! Everything here is plain data and serializes as JSON.

use uuid::Uuid;

// Re-exports
pub mod event;
pub mod types;

pub use event::DialerEvent;
pub use types::*;

/// Generate a new unique ID
pub fn new_id() -> String {
    Uuid::new_v4().to_string()
}
