//! Owns the form parameters and UI state, starts one worker thread per
//! action and applies whatever the workers send back.

use std::{
    future::Future,
    path::{Path, PathBuf},
    sync::Arc,
    thread,
};

use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender, unbounded_channel};
use tracing::{debug, error, info, warn};

use crate::downloader::Extractor;
use crate::error::{GrabError, Result};
use crate::model::{DownloadJob, DownloadRequest, Notice, UiEvent, UiState, VideoInfo};
use crate::progress::{ProgressRelay, format_duration, status_line};
use crate::thumbnail;

pub struct Orchestrator<E: Extractor> {
    extractor: Arc<E>,
    destination: PathBuf,
    state: UiState,
    tx: UnboundedSender<UiEvent>,
    rx: UnboundedReceiver<UiEvent>,
}

impl<E: Extractor> Orchestrator<E> {
    pub fn new(extractor: E, destination: PathBuf) -> Self {
        let (tx, rx) = unbounded_channel();
        Self {
            extractor: Arc::new(extractor),
            destination,
            state: UiState::default(),
            tx,
            rx,
        }
    }

    pub fn state(&self) -> &UiState {
        &self.state
    }

    pub fn destination(&self) -> &Path {
        &self.destination
    }

    pub fn set_destination(&mut self, path: PathBuf) {
        info!(path = %path.display(), "destination changed");
        self.destination = path;
    }

    pub fn dismiss_notice(&mut self) {
        self.state.notice = None;
    }

    pub fn take_thumbnail(&mut self) -> Option<eframe::egui::ColorImage> {
        self.state.thumbnail.take()
    }

    /// Starts a metadata lookup for `url` on a fresh worker thread.
    pub fn fetch_metadata(&mut self, url: &str) -> Result<()> {
        let url = self.validate(url)?;
        if self.state.fetching_info {
            debug!("metadata fetch ignored, one is already running");
            return Err(GrabError::Busy("metadata fetch"));
        }

        self.state.fetching_info = true;
        self.state.status = "Getting video info...".to_string();

        let extractor = Arc::clone(&self.extractor);
        let tx = self.tx.clone();
        let spawned = thread::Builder::new()
            .name("metadata-fetch".into())
            .spawn(move || {
                let event = match block_on(extractor.fetch_info(&url)) {
                    Ok(info) => {
                        let text = describe(&info);
                        let thumbnail = info.thumbnail.as_deref().and_then(|src| {
                            thumbnail::fetch_thumbnail(src)
                                .inspect_err(|e| warn!(error = %e, "thumbnail unavailable"))
                                .ok()
                        });
                        UiEvent::InfoReady { text, thumbnail }
                    }
                    Err(e) => {
                        warn!(error = %e, %url, "metadata fetch failed");
                        UiEvent::InfoFailed(e.to_string())
                    }
                };
                let _ = tx.send(event);
            });

        if let Err(e) = spawned {
            error!(error = %e, "could not spawn metadata worker");
            self.apply(UiEvent::InfoFailed(e.to_string()));
            return Err(GrabError::Io(e));
        }
        Ok(())
    }

    /// Starts a download on a fresh worker thread.
    pub fn start_download(&mut self, request: DownloadRequest) -> Result<()> {
        self.validate(&request.url)?;
        if self.state.downloading {
            debug!("download ignored, one is already running");
            return Err(GrabError::Busy("download"));
        }

        self.state.downloading = true;
        self.state.progress = 0.0;
        self.state.status = "Starting download...".to_string();

        let extractor = Arc::clone(&self.extractor);
        let tx = self.tx.clone();
        let spawned = thread::Builder::new()
            .name("download".into())
            .spawn(move || {
                let relay = ProgressRelay::new(tx.clone());
                let outcome = DownloadJob::resolve(&request)
                    .and_then(|job| block_on(extractor.download(&job, &relay)));
                let event = match outcome {
                    Ok(()) => UiEvent::DownloadFinished(request.destination),
                    Err(e) => {
                        warn!(error = %e, url = %request.url, "download failed");
                        UiEvent::DownloadFailed(e.to_string())
                    }
                };
                let _ = tx.send(event);
            });

        if let Err(e) = spawned {
            error!(error = %e, "could not spawn download worker");
            self.apply(UiEvent::DownloadFailed(e.to_string()));
            return Err(GrabError::Io(e));
        }
        Ok(())
    }

    /// Applies every pending worker message. Call once per frame.
    pub fn pump(&mut self) -> usize {
        let mut applied = 0;
        while let Ok(event) = self.rx.try_recv() {
            self.apply(event);
            applied += 1;
        }
        applied
    }

    fn validate(&mut self, url: &str) -> Result<String> {
        let url = url.trim();
        if url.is_empty() {
            let err = GrabError::EmptyUrl;
            self.state.notice = Some(Notice::error(err.to_string()));
            return Err(err);
        }
        Ok(url.to_string())
    }

    fn apply(&mut self, event: UiEvent) {
        match event {
            UiEvent::Progress(update) => {
                self.state.progress = update.percent;
                self.state.status = status_line(&update);
            }
            UiEvent::InfoReady { text, thumbnail } => {
                self.state.info_text = text;
                self.state.thumbnail = thumbnail;
                self.state.status = "Info retrieved".to_string();
                self.state.fetching_info = false;
            }
            UiEvent::InfoFailed(message) => {
                self.state.info_text = format!("Error: {message}");
                self.state.status = "Error getting info".to_string();
                self.state.fetching_info = false;
            }
            UiEvent::DownloadFinished(destination) => {
                self.state.downloading = false;
                self.state.status = "Download completed!".to_string();
                self.state.progress = 100.0;
                self.state.notice = Some(Notice::success(format!(
                    "Video downloaded successfully to:\n{}",
                    destination.display()
                )));
            }
            UiEvent::DownloadFailed(message) => {
                self.state.downloading = false;
                self.state.status = format!("Download failed: {message}");
                self.state.progress = 0.0;
                self.state.notice = Some(Notice::error(format!("Download failed:\n{message}")));
            }
        }
    }
}

/// Drives one extractor call to completion on the calling worker thread.
fn block_on<T>(fut: impl Future<Output = Result<T>>) -> Result<T> {
    let rt = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(GrabError::Runtime)?;
    rt.block_on(fut)
}

/// Renders the fixed set of fields shown in the info panel.
pub fn describe(info: &VideoInfo) -> String {
    fn or_na(value: Option<impl ToString>) -> String {
        value.map(|v| v.to_string()).unwrap_or_else(|| "N/A".to_string())
    }

    let mut text = format!("Title: {}\n", or_na(info.title.as_deref()));
    text += &format!("Duration: {}\n", format_duration(info.duration.map(|d| d as u64)));
    text += &format!("Views: {}\n", or_na(info.view_count));
    text += &format!("Uploader: {}\n", or_na(info.uploader.as_deref()));
    text += &format!("Upload Date: {}\n", or_na(info.upload_date.as_deref()));
    text += &format!("\nAvailable formats: {}\n", info.formats.len());
    text
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog;
    use crate::model::{NoticeKind, ProgressEvent, ProgressStatus};
    use std::sync::{
        Mutex,
        atomic::{AtomicUsize, Ordering},
        mpsc,
    };
    use std::time::{Duration, Instant};

    /// Scripted stand-in for yt-dlp.
    #[derive(Default)]
    struct FakeExtractor {
        info: Option<&'static str>,
        ticks: Vec<ProgressEvent>,
        failure: Option<&'static str>,
        gate: Mutex<Option<mpsc::Receiver<()>>>,
        info_calls: AtomicUsize,
        download_calls: AtomicUsize,
        seen_jobs: Mutex<Vec<DownloadJob>>,
    }

    impl Extractor for FakeExtractor {
        async fn fetch_info(&self, _url: &str) -> Result<VideoInfo> {
            self.info_calls.fetch_add(1, Ordering::SeqCst);
            match self.failure {
                Some(msg) => Err(GrabError::Tool(msg.to_string())),
                None => Ok(serde_json::from_str(self.info.unwrap_or("{}"))?),
            }
        }

        async fn download(&self, job: &DownloadJob, relay: &ProgressRelay) -> Result<()> {
            self.download_calls.fetch_add(1, Ordering::SeqCst);
            self.seen_jobs.lock().unwrap().push(job.clone());
            if let Some(gate) = self.gate.lock().unwrap().take() {
                let _ = gate.recv();
            }
            for tick in &self.ticks {
                relay.tick(tick);
            }
            match self.failure {
                Some(msg) => Err(GrabError::Tool(msg.to_string())),
                None => Ok(()),
            }
        }
    }

    fn downloading(done: u64, total: u64) -> ProgressEvent {
        ProgressEvent {
            status: ProgressStatus::Downloading,
            downloaded_bytes: Some(done),
            total_bytes: Some(total),
            total_bytes_estimate: None,
        }
    }

    fn finished() -> ProgressEvent {
        ProgressEvent {
            status: ProgressStatus::Finished,
            downloaded_bytes: None,
            total_bytes: None,
            total_bytes_estimate: None,
        }
    }

    fn request(url: &str, label: &str) -> DownloadRequest {
        DownloadRequest {
            url: url.to_string(),
            format_label: label.to_string(),
            destination: PathBuf::from("/home/me/Downloads"),
        }
    }

    /// Pumps until nothing is in flight, recording every progress value seen.
    fn settle<E: Extractor>(orch: &mut Orchestrator<E>) -> Vec<f32> {
        let deadline = Instant::now() + Duration::from_secs(5);
        let mut seen = Vec::new();
        loop {
            while let Ok(event) = orch.rx.try_recv() {
                if let UiEvent::Progress(update) = &event {
                    seen.push(update.percent);
                }
                orch.apply(event);
            }
            if !orch.state().is_busy() {
                return seen;
            }
            assert!(Instant::now() < deadline, "worker never reported back");
            thread::sleep(Duration::from_millis(5));
        }
    }

    #[test]
    fn blank_urls_spawn_nothing() {
        let mut orch = Orchestrator::new(FakeExtractor::default(), PathBuf::from("/tmp"));
        for url in ["", "   ", "\t\n"] {
            assert!(matches!(orch.fetch_metadata(url), Err(GrabError::EmptyUrl)));
            assert!(matches!(
                orch.start_download(request(url, catalog::DEFAULT_LABEL)),
                Err(GrabError::EmptyUrl)
            ));
        }
        assert!(!orch.state().is_busy());
        let notice = orch.state().notice.clone().unwrap();
        assert_eq!(notice.kind, NoticeKind::Error);
        assert_eq!(notice.message, "Please enter a video URL");
        thread::sleep(Duration::from_millis(20));
        assert_eq!(orch.pump(), 0);
        assert_eq!(orch.extractor.info_calls.load(Ordering::SeqCst), 0);
        assert_eq!(orch.extractor.download_calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn successful_download_reports_progress_and_destination() {
        let fake = FakeExtractor {
            ticks: vec![downloading(0, 400), downloading(100, 400), downloading(400, 400), finished()],
            ..Default::default()
        };
        let mut orch = Orchestrator::new(fake, PathBuf::from("/tmp"));
        orch.start_download(request("https://youtu.be/ok", "Best Quality (MP4)")).unwrap();
        assert!(orch.state().downloading);
        assert_eq!(orch.state().progress, 0.0);
        assert_eq!(orch.state().status, "Starting download...");

        let seen = settle(&mut orch);
        assert_eq!(seen, vec![0.0, 25.0, 100.0, 100.0]);
        assert!(seen.windows(2).all(|w| w[0] <= w[1]));

        let state = orch.state();
        assert!(!state.downloading);
        assert_eq!(state.progress, 100.0);
        assert_eq!(state.status, "Download completed!");
        let notice = state.notice.clone().unwrap();
        assert_eq!(notice.kind, NoticeKind::Success);
        assert!(notice.message.contains("/home/me/Downloads"));

        let jobs = orch.extractor.seen_jobs.lock().unwrap();
        assert_eq!(jobs.len(), 1);
        assert_eq!(jobs[0].selector, "best[ext=mp4]");
        assert_eq!(jobs[0].audio, None);
    }

    #[test]
    fn failed_download_surfaces_message_and_resets() {
        let fake = FakeExtractor {
            ticks: vec![downloading(50, 100)],
            failure: Some("ERROR: HTTP Error 403: Forbidden"),
            ..Default::default()
        };
        let mut orch = Orchestrator::new(fake, PathBuf::from("/tmp"));
        orch.start_download(request("https://youtu.be/bad", "HD 720p (MP4)")).unwrap();
        settle(&mut orch);

        let state = orch.state();
        assert!(!state.downloading);
        assert_eq!(state.progress, 0.0);
        assert_eq!(state.status, "Download failed: ERROR: HTTP Error 403: Forbidden");
        let notice = state.notice.clone().unwrap();
        assert_eq!(notice.kind, NoticeKind::Error);
        assert!(notice.message.contains("HTTP Error 403"));
    }

    #[test]
    fn unknown_label_fails_without_calling_extractor() {
        let mut orch = Orchestrator::new(FakeExtractor::default(), PathBuf::from("/tmp"));
        orch.start_download(request("https://youtu.be/x", "Hologram (3D)")).unwrap();
        settle(&mut orch);
        assert_eq!(orch.state().status, "Download failed: no such format: Hologram (3D)");
        assert_eq!(orch.extractor.download_calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn mp3_label_reaches_extractor_with_audio_directive() {
        let mut orch = Orchestrator::new(FakeExtractor::default(), PathBuf::from("/tmp"));
        orch.start_download(request("https://youtu.be/song", "Best Audio (MP3)")).unwrap();
        settle(&mut orch);
        let jobs = orch.extractor.seen_jobs.lock().unwrap();
        assert_eq!(jobs[0].audio, Some(catalog::MP3_EXTRACTION));
    }

    #[test]
    fn second_start_while_busy_spawns_nothing() {
        let (release, gate) = mpsc::channel();
        let fake = FakeExtractor {
            gate: Mutex::new(Some(gate)),
            ..Default::default()
        };
        let mut orch = Orchestrator::new(fake, PathBuf::from("/tmp"));
        orch.start_download(request("https://youtu.be/slow", catalog::DEFAULT_LABEL)).unwrap();
        for _ in 0..3 {
            assert!(matches!(
                orch.start_download(request("https://youtu.be/slow", catalog::DEFAULT_LABEL)),
                Err(GrabError::Busy(_))
            ));
        }
        assert!(orch.state().downloading);

        release.send(()).unwrap();
        settle(&mut orch);
        assert_eq!(orch.extractor.download_calls.load(Ordering::SeqCst), 1);
        assert!(!orch.state().downloading);
    }

    #[test]
    fn metadata_fetch_formats_fields() {
        let fake = FakeExtractor {
            info: Some(
                r#"{"title":"Big Buck Bunny","duration":3661,"view_count":1200,
                    "uploader":"Blender","upload_date":"20080529",
                    "formats":[{"format_id":"18"},{"format_id":"22"}]}"#,
            ),
            ..Default::default()
        };
        let mut orch = Orchestrator::new(fake, PathBuf::from("/tmp"));
        orch.fetch_metadata(" https://youtu.be/bbb ").unwrap();
        assert!(orch.state().fetching_info);
        assert_eq!(orch.state().status, "Getting video info...");
        assert!(matches!(orch.fetch_metadata("https://youtu.be/bbb"), Err(GrabError::Busy(_))));

        settle(&mut orch);
        let state = orch.state();
        assert!(!state.fetching_info);
        assert_eq!(state.status, "Info retrieved");
        assert_eq!(
            state.info_text,
            "Title: Big Buck Bunny\nDuration: 01:01:01\nViews: 1200\nUploader: Blender\n\
             Upload Date: 20080529\n\nAvailable formats: 2\n"
        );
        assert!(state.thumbnail.is_none());
        assert_eq!(orch.extractor.info_calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn metadata_failure_shows_error_text() {
        let fake = FakeExtractor {
            failure: Some("ERROR: Unsupported URL: https://example.com"),
            ..Default::default()
        };
        let mut orch = Orchestrator::new(fake, PathBuf::from("/tmp"));
        orch.fetch_metadata("https://example.com").unwrap();
        settle(&mut orch);
        assert_eq!(orch.state().status, "Error getting info");
        assert_eq!(
            orch.state().info_text,
            "Error: ERROR: Unsupported URL: https://example.com"
        );
        assert!(!orch.state().fetching_info);
    }

    #[test]
    fn describe_fills_missing_fields() {
        let text = describe(&VideoInfo::default());
        assert_eq!(
            text,
            "Title: N/A\nDuration: N/A\nViews: N/A\nUploader: N/A\nUpload Date: N/A\n\n\
             Available formats: 0\n"
        );
    }

    #[test]
    fn destination_is_per_instance() {
        let mut a = Orchestrator::new(FakeExtractor::default(), PathBuf::from("/a"));
        let b = Orchestrator::new(FakeExtractor::default(), PathBuf::from("/b"));
        a.set_destination(PathBuf::from("/c"));
        assert_eq!(a.destination(), Path::new("/c"));
        assert_eq!(b.destination(), Path::new("/b"));
    }
}
