use std::path::PathBuf;

use eframe::egui::ColorImage;
use serde::Deserialize;
use serde::de::IgnoredAny;

use crate::catalog::{self, AudioExtraction};
use crate::error::{GrabError, Result};

/// Parameters captured from the form when the user clicks Download
#[derive(Debug, Clone)]
pub struct DownloadRequest {
    /// Video page URL as typed
    pub url: String,
    /// Catalog label selected in the combo box
    pub format_label: String,
    /// Folder the file lands in
    pub destination: PathBuf,
}

/// A request with its preset resolved, ready to hand to the extractor
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadJob {
    pub url: String,
    pub selector: &'static str,
    /// yt-dlp output template, `<destination>/%(title)s.%(ext)s`
    pub output_template: String,
    pub audio: Option<AudioExtraction>,
}

impl DownloadJob {
    pub fn resolve(request: &DownloadRequest) -> Result<Self> {
        let preset = catalog::lookup(&request.format_label)
            .ok_or_else(|| GrabError::UnknownFormat(request.format_label.clone()))?;
        let output_template = request
            .destination
            .join("%(title)s.%(ext)s")
            .to_string_lossy()
            .into_owned();
        Ok(Self {
            url: request.url.trim().to_string(),
            selector: preset.selector,
            output_template,
            audio: catalog::audio_extraction_for(&request.format_label),
        })
    }
}

/// Subset of the `yt-dlp -J` record shown in the info panel
#[derive(Debug, Default, Deserialize)]
pub struct VideoInfo {
    pub title: Option<String>,
    /// Seconds; yt-dlp reports a float for some extractors
    pub duration: Option<f64>,
    pub view_count: Option<u64>,
    pub uploader: Option<String>,
    pub upload_date: Option<String>,
    /// Only counted, never inspected
    #[serde(default)]
    pub formats: Vec<IgnoredAny>,
    pub thumbnail: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProgressStatus {
    Downloading,
    Finished,
    Error,
    #[serde(other)]
    Other,
}

/// One progress tick as reported by yt-dlp
#[derive(Debug, Clone, Deserialize)]
pub struct ProgressEvent {
    pub status: ProgressStatus,
    pub downloaded_bytes: Option<u64>,
    pub total_bytes: Option<u64>,
    pub total_bytes_estimate: Option<f64>,
}

/// What the progress bar and status line should show next
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProgressUpdate {
    /// 0.0 to 100.0
    pub percent: f32,
    pub status: &'static str,
}

/// Messages sent from worker threads to the GUI thread
pub enum UiEvent {
    Progress(ProgressUpdate),
    InfoReady {
        text: String,
        thumbnail: Option<ColorImage>,
    },
    InfoFailed(String),
    DownloadFinished(PathBuf),
    DownloadFailed(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeKind {
    Success,
    Error,
}

/// Modal message waiting to be acknowledged
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub kind: NoticeKind,
    pub message: String,
}

impl Notice {
    pub fn error(message: impl Into<String>) -> Self {
        Self { kind: NoticeKind::Error, message: message.into() }
    }

    pub fn success(message: impl Into<String>) -> Self {
        Self { kind: NoticeKind::Success, message: message.into() }
    }

    pub fn title(&self) -> &'static str {
        match self.kind {
            NoticeKind::Success => "Success",
            NoticeKind::Error => "Error",
        }
    }
}

/// Everything the window renders; only touched on the GUI thread
pub struct UiState {
    /// Progress percentage (0.0 to 100.0)
    pub progress: f32,
    pub status: String,
    pub info_text: String,
    pub fetching_info: bool,
    pub downloading: bool,
    pub notice: Option<Notice>,
    /// Decoded preview waiting to be uploaded as a texture
    pub thumbnail: Option<ColorImage>,
}

impl Default for UiState {
    fn default() -> Self {
        Self {
            progress: 0.0,
            status: "Ready".to_string(),
            info_text: String::new(),
            fetching_info: false,
            downloading: false,
            notice: None,
            thumbnail: None,
        }
    }
}

impl UiState {
    pub fn is_busy(&self) -> bool {
        self.fetching_info || self.downloading
    }
}
