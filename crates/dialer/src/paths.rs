//! Central path resolution for PowerDial data files.
//!
//! Resolved from: CLI `--data-dir` > `POWERDIAL_DATA_DIR` env > `~/.powerdial`.

use std::io;
use std::path::{Path, PathBuf};

const DATA_DIR_ENV: &str = "POWERDIAL_DATA_DIR";

/// Resolve the data directory.
///
/// Priority: `explicit` arg > `POWERDIAL_DATA_DIR` env > `~/.powerdial`,
/// falling back to the system temp dir when there is no home directory.
pub fn resolve_data_dir(explicit: Option<&Path>) -> PathBuf {
    if let Some(p) = explicit {
        return p.to_path_buf();
    }
    if let Some(env_val) = std::env::var_os(DATA_DIR_ENV) {
        return PathBuf::from(env_val);
    }
    dirs::home_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join(".powerdial")
}

pub fn config_path(data_dir: &Path) -> PathBuf {
    data_dir.join("config.toml")
}

pub fn log_dir(data_dir: &Path) -> PathBuf {
    data_dir.join("logs")
}

/// Create all required subdirectories under the data dir.
pub fn ensure_dirs(data_dir: &Path) -> io::Result<()> {
    std::fs::create_dir_all(data_dir)?;
    std::fs::create_dir_all(log_dir(data_dir))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn explicit_dir_wins() {
        let dir = resolve_data_dir(Some(Path::new("/srv/powerdial")));
        assert_eq!(dir, PathBuf::from("/srv/powerdial"));
        assert_eq!(config_path(&dir), PathBuf::from("/srv/powerdial/config.toml"));
        assert_eq!(log_dir(&dir), PathBuf::from("/srv/powerdial/logs"));
    }

    #[test]
    fn ensure_dirs_creates_log_dir() {
        let tmp = tempfile::tempdir().unwrap();
        let base = tmp.path().join("data");
        ensure_dirs(&base).unwrap();
        assert!(log_dir(&base).is_dir());
    }
}
