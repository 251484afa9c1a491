//! Desktop front-end for downloading videos with yt-dlp

// Preset table for the format combo box
mod catalog;
// yt-dlp process handling and the extractor seam
mod downloader;
// Crate-wide error type
mod error;
// Tracing subscriber setup
mod logging;
// Data models shared between the GUI and workers
mod model;
// Worker spawning and UI state updates
mod orchestrator;
// Progress tick translation
mod progress;
// Startup defaults
mod settings;
// Thumbnail fetching and decoding
mod thumbnail;

use downloader::YtDlp;
use model::{DownloadRequest, NoticeKind};
use orchestrator::Orchestrator;
use settings::Settings;

// eframe/egui for GUI application framework
use eframe::{App, Frame, egui};
use egui::{Align2, Color32, TextureHandle, TextureOptions, Visuals};
// FileDialog for folder selection dialogs
use rfd::FileDialog;
use tracing::{debug, info};

/// Program entry point: sets up logging and launches GUI
fn main() -> Result<(), eframe::Error> {
    logging::init_tracing();

    let settings = Settings::default();
    info!(download_dir = %settings.download_dir.display(), "starting");

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default().with_inner_size([560.0, 640.0]),
        ..Default::default()
    };
    let title = settings.title.clone();
    eframe::run_native(
        &title,
        options,
        Box::new(|cc| {
            cc.egui_ctx.set_visuals(Visuals::dark());
            Box::new(GrabberApp::new(settings))
        }),
    )
}

/// Application state for the GUI
struct GrabberApp {
    settings: Settings,
    /// Input field for the video URL
    url_input: String,
    /// Selected catalog label
    selected_format: String,
    /// Owns UI state and talks to the workers
    orchestrator: Orchestrator<YtDlp>,
    /// Uploaded preview for the last metadata fetch
    thumbnail: Option<TextureHandle>,
}

impl GrabberApp {
    fn new(settings: Settings) -> Self {
        Self {
            url_input: String::new(),
            selected_format: settings.default_format.to_string(),
            orchestrator: Orchestrator::new(YtDlp::default(), settings.download_dir.clone()),
            thumbnail: None,
            settings,
        }
    }

    fn browse(&mut self) {
        let start = self.orchestrator.destination().to_path_buf();
        if let Some(folder) = FileDialog::new().set_directory(&start).pick_folder()
        {
            self.orchestrator.set_destination(folder);
        }
    }

    fn request(&self) -> DownloadRequest {
        DownloadRequest {
            url: self.url_input.clone(),
            format_label: self.selected_format.clone(),
            destination: self.orchestrator.destination().to_path_buf(),
        }
    }

    fn show_notice(&mut self, ctx: &egui::Context) {
        let Some(notice) = self.orchestrator.state().notice.clone() else {
            return;
        };
        let mut dismissed = false;
        egui::Window::new(notice.title())
            .collapsible(false)
            .resizable(false)
            .anchor(Align2::CENTER_CENTER, egui::Vec2::ZERO)
            .show(ctx, |ui| {
                let color = match notice.kind {
                    NoticeKind::Success => Color32::LIGHT_GREEN,
                    NoticeKind::Error => Color32::LIGHT_RED,
                };
                ui.colored_label(color, &notice.message);
                ui.add_space(8.0);
                dismissed = ui.button("OK").clicked();
            });
        if dismissed {
            self.orchestrator.dismiss_notice();
        }
    }
}

/// GUI update loop: called each frame to redraw and handle interactions
impl App for GrabberApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut Frame) {
        // Apply whatever the workers sent since the last frame
        let applied = self.orchestrator.pump();
        if applied > 0 {
            debug!(applied, "worker events applied");
        }
        if let Some(img) = self.orchestrator.take_thumbnail() {
            self.thumbnail = Some(ctx.load_texture("thumbnail", img, TextureOptions::default()));
        }

        let modal_open = self.orchestrator.state().notice.is_some();

        egui::CentralPanel::default().show(ctx, |ui| {
            ui.add_enabled_ui(!modal_open, |ui| {
                ui.heading(&self.settings.title);
                ui.add_space(8.0);

                ui.horizontal(|ui| {
                    ui.label("Video URL:");
                    ui.add(
                        egui::TextEdit::singleline(&mut self.url_input)
                            .hint_text("Paste video URL here...")
                            .desired_width(f32::INFINITY),
                    );
                });

                ui.horizontal(|ui| {
                    ui.label("Format:");
                    egui::ComboBox::from_id_source("format")
                        .selected_text(&self.selected_format)
                        .width(220.0)
                        .show_ui(ui, |ui| {
                            for preset in &catalog::PRESETS {
                                ui.selectable_value(
                                    &mut self.selected_format,
                                    preset.label.to_string(),
                                    preset.label,
                                );
                            }
                        });
                });

                ui.horizontal(|ui| {
                    ui.label("Save to:");
                    ui.label(self.orchestrator.destination().display().to_string());
                    if ui.button("Browse").clicked() {
                        self.browse();
                    }
                });

                ui.add_space(8.0);
                ui.horizontal(|ui| {
                    let state = self.orchestrator.state();
                    let (fetching, downloading) = (state.fetching_info, state.downloading);

                    if ui.add_enabled(!fetching, egui::Button::new("Get Info")).clicked() {
                        let url = self.url_input.clone();
                        let _ = self.orchestrator.fetch_metadata(&url);
                    }
                    if ui.add_enabled(!downloading, egui::Button::new("Download")).clicked() {
                        let request = self.request();
                        let _ = self.orchestrator.start_download(request);
                    }
                });

                let state = self.orchestrator.state();
                ui.add(egui::ProgressBar::new(state.progress / 100.0));
                ui.label(&state.status);
                ui.separator();

                egui::ScrollArea::vertical()
                    .auto_shrink([false; 2])
                    .show(ui, |ui| {
                        if let Some(tex) = &self.thumbnail {
                            ui.add(egui::Image::new(tex).max_width(320.0));
                        }
                        ui.label(&self.orchestrator.state().info_text);
                    });
            });
        });

        self.show_notice(ctx);

        // Keep polling the channel while workers are running
        if self.orchestrator.state().is_busy() {
            ctx.request_repaint_after(self.settings.repaint_interval);
        }
    }
}
