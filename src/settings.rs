use std::{path::PathBuf, time::Duration};

use crate::catalog;

/// Startup defaults. Nothing here is persisted between runs.
#[derive(Debug, Clone)]
pub struct Settings {
    /// Window title
    pub title: String,
    /// Destination shown until the user browses elsewhere
    pub download_dir: PathBuf,
    /// Preset selected when the window opens
    pub default_format: &'static str,
    /// Repaint cadence while a worker is running
    pub repaint_interval: Duration,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            title: "Video Downloader".to_string(),
            download_dir: default_download_dir(),
            default_format: catalog::DEFAULT_LABEL,
            repaint_interval: Duration::from_millis(100),
        }
    }
}

fn default_download_dir() -> PathBuf {
    dirs::download_dir()
        .or_else(|| dirs::home_dir().map(|home| home.join("Downloads")))
        .unwrap_or_else(|| PathBuf::from("."))
}
