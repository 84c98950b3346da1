use directories::ProjectDirs;
use std::path::PathBuf;

/// Per-user configuration directory, `None` when no home directory is known.
pub fn config_dir() -> Option<PathBuf> {
    ProjectDirs::from("", "", "Sievekit").map(|d| d.config_dir().to_path_buf())
}
