//! Centralized path configuration for STACKD.
//!
//! All data paths go through this module so the engine and any embedding
//! service agree on locations, whether running as a user or system service.

use std::path::PathBuf;

/// Get the STACKD data directory.
///
/// Resolution order:
/// 1. `STACKD_DATA_DIR` environment variable
/// 2. `/var/lib/stackd` if it exists (system install)
/// 3. `~/.stackd` for user-only installs
pub fn data_dir() -> PathBuf {
    if let Ok(dir) = std::env::var("STACKD_DATA_DIR") {
        return PathBuf::from(dir);
    }

    let system_dir = PathBuf::from("/var/lib/stackd");
    if system_dir.exists() {
        return system_dir;
    }

    dirs::home_dir().map(|h| h.join(".stackd")).unwrap_or(system_dir)
}

/// Get the database path.
pub fn db_path() -> PathBuf {
    data_dir().join("stackd.db")
}

/// Get the configuration file path.
pub fn config_path() -> PathBuf {
    data_dir().join("config.json")
}
