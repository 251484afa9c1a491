use tokio::sync::mpsc::UnboundedSender;
use tracing::{debug, trace};

use crate::model::{ProgressEvent, ProgressStatus, ProgressUpdate, UiEvent};

/// Prefix placed in front of every progress line we ask yt-dlp to print.
pub const PROGRESS_MARKER: &str = "tube_grab:";

/// Decodes a stdout line printed through `--progress-template`.
pub fn parse_progress_from_line(line: &str) -> Option<ProgressEvent> {
    let payload = line.trim().strip_prefix(PROGRESS_MARKER)?;
    match serde_json::from_str(payload) {
        Ok(event) => Some(event),
        Err(e) => {
            debug!(error = %e, "skipping malformed progress line");
            None
        }
    }
}

/// Turns a raw tick into what the progress bar should show, if anything.
pub fn translate(event: &ProgressEvent) -> Option<ProgressUpdate> {
    match event.status {
        ProgressStatus::Downloading => {
            let total = event
                .total_bytes
                .map(|t| t as f64)
                .or(event.total_bytes_estimate)
                .filter(|t| *t > 0.0)?;
            let downloaded = event.downloaded_bytes? as f64;
            let percent = (downloaded / total * 100.0).clamp(0.0, 100.0);
            Some(ProgressUpdate {
                percent: percent as f32,
                status: "Downloading...",
            })
        }
        // Post-processing (e.g. mp3 extraction) may still be running.
        ProgressStatus::Finished => Some(ProgressUpdate {
            percent: 100.0,
            status: "Processing...",
        }),
        ProgressStatus::Error | ProgressStatus::Other => None,
    }
}

pub fn status_line(update: &ProgressUpdate) -> String {
    format!("{} {:.1}%", update.status, update.percent)
}

/// Handed to the extractor for the duration of one download. Posts every
/// visible tick to the GUI thread and never touches UI state itself.
#[derive(Clone)]
pub struct ProgressRelay {
    tx: UnboundedSender<UiEvent>,
}

impl ProgressRelay {
    pub fn new(tx: UnboundedSender<UiEvent>) -> Self {
        Self { tx }
    }

    pub fn tick(&self, event: &ProgressEvent) {
        let Some(update) = translate(event) else {
            trace!(status = ?event.status, "tick without visible change");
            return;
        };
        // The window may already be gone; the worker just finishes quietly.
        let _ = self.tx.send(UiEvent::Progress(update));
    }
}

/// `HH:MM:SS` with hours, `MM:SS` without, `N/A` for unknown or zero.
pub fn format_duration(seconds: Option<u64>) -> String {
    let secs = match seconds {
        Some(s) if s > 0 => s,
        _ => return "N/A".to_string(),
    };
    let hours = secs / 3600;
    let minutes = (secs % 3600) / 60;
    let rest = secs % 60;
    if hours > 0 {
        format!("{hours:02}:{minutes:02}:{rest:02}")
    } else {
        format!("{minutes:02}:{rest:02}")
    }
}
