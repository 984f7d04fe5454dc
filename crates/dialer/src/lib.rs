//! PowerDial campaign dialing sequencer
//!
//! Walks a captured queue of leads one call at a time. A pure transition
//! function decides; the session actor executes the resulting effects.

pub mod call_adapter;
pub mod config;
pub mod disposition;
pub mod error;
pub mod logging;
pub mod paths;
pub mod session_actor;
pub mod session_command;
pub mod simulate;
pub mod snapshot;
pub mod timer;
pub mod transition;

pub use call_adapter::{CallPlacer, ChannelCallPlacer};
pub use config::DialerConfig;
pub use disposition::DispositionSignal;
pub use error::{ConfigError, DialerError};
pub use session_actor::DialerHandle;
pub use snapshot::{QueueOrder, QueuePolicy, TargetQueue};
pub use timer::{SettleTimer, TokioSettleTimer};
