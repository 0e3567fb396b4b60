use directories::ProjectDirs;
use std::path::PathBuf;

/// Centralized application directory resolution
pub struct AppDirs;

impl AppDirs {
    /// Log file; stdout belongs to the terminal UI.
    pub fn log_path() -> Option<PathBuf> {
        if let Ok(home) = std::env::var("HOME") {
            let state_dir = PathBuf::from(home)
                .join(".local")
                .join("state")
                .join("fingers");
            Some(state_dir.join("fingers.log"))
        } else {
            ProjectDirs::from("", "", "fingers")
                .map(|proj_dirs| proj_dirs.data_local_dir().join("fingers.log"))
        }
    }
}
