//! Output folder resolution.
//!
//! Folders come from the command line, then the dataset's environment
//! variable, then a platform-specific data directory:
//! - Linux: `~/.local/share/virk/`
//! - macOS: `~/Library/Application Support/virk/`
//! - Windows: `%LOCALAPPDATA%\virk\`

use std::path::PathBuf;
use virk::{Dataset, resolve_folder};

/// Get the default data root.
pub(crate) fn default_data_dir() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("virk")
}

/// Folder of `dataset`, honouring an explicit path and its environment variable.
pub(crate) fn dataset_folder(dataset: Dataset, explicit: Option<PathBuf>) -> PathBuf {
    let env_value = std::env::var(dataset.folder_env()).ok();
    resolve_folder(dataset, explicit, env_value, &default_data_dir())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_explicit_folder_wins() {
        let dir = dataset_folder(Dataset::Companies, Some(PathBuf::from("/tmp/virk-out")));
        assert_eq!(dir, PathBuf::from("/tmp/virk-out"));
    }

    #[test]
    fn test_default_data_dir() {
        assert!(default_data_dir().ends_with("virk"));
    }
}
