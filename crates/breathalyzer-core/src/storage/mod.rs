mod backend;
mod config;
mod orphans;
mod ranked_store;

pub use backend::{JsonFileBackend, LeaderboardBackend, MemoryBackend};
pub use config::{Config, ReadingConfig, ServerConfig, SessionConfig, StorageConfig};
pub use orphans::{OrphanQueue, ReplayReport};
pub use ranked_store::{
    insertion_point, Page, PageRequest, RankedStore, DEFAULT_PAGE_LIMIT, MAX_PAGE_LIMIT,
};

use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::error::{ConfigError, StorageError};

/// Returns the data directory.
///
/// `BREATHALYZER_DATA_DIR` wins when set. Otherwise `~/.config/breathalyzer[-dev]/`
/// based on BREATHALYZER_ENV (set it to `dev` for the development directory).
///
/// # Errors
/// Returns an error if creating the directory fails.
pub fn data_dir() -> Result<PathBuf, ConfigError> {
    let dir = match std::env::var_os("BREATHALYZER_DATA_DIR") {
        Some(explicit) => PathBuf::from(explicit),
        None => {
            let base_dir = dirs::home_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join(".config");

            let env =
                std::env::var("BREATHALYZER_ENV").unwrap_or_else(|_| "production".to_string());
            if env == "dev" {
                base_dir.join("breathalyzer-dev")
            } else {
                base_dir.join("breathalyzer")
            }
        }
    };

    std::fs::create_dir_all(&dir)
        .map_err(|e| ConfigError::DataDir(format!("{}: {e}", dir.display())))?;
    Ok(dir)
}

/// Serialize `value` as pretty JSON next to `path`, fsync it, then rename it over `path`.
///
/// Readers observe either the old document or the new one, never a torn write.
pub(crate) fn write_json_atomic<T: Serialize + ?Sized>(
    path: &Path,
    value: &T,
) -> Result<(), StorageError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| StorageError::io(parent, e))?;
    }

    let mut tmp_name = path.as_os_str().to_owned();
    tmp_name.push(".tmp");
    let tmp_path = PathBuf::from(tmp_name);

    let data = serde_json::to_vec_pretty(value).map_err(StorageError::Serialize)?;
    let mut file = File::create(&tmp_path).map_err(|e| StorageError::io(&tmp_path, e))?;
    file.write_all(&data).map_err(|e| StorageError::io(&tmp_path, e))?;
    file.sync_all().map_err(|e| StorageError::io(&tmp_path, e))?;
    drop(file);

    std::fs::rename(&tmp_path, path).map_err(|e| StorageError::io(path, e))
}
