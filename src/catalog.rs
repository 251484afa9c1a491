//! Fixed table of download presets offered in the format combo box.

/// One entry of the preset table: what the user sees and what yt-dlp gets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FormatPreset {
    pub label: &'static str,
    pub selector: &'static str,
}

/// Post-processing step that converts the downloaded stream to an audio file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AudioExtraction {
    pub codec: &'static str,
    pub quality: &'static str,
}

pub const MP3_EXTRACTION: AudioExtraction = AudioExtraction {
    codec: "mp3",
    quality: "192",
};

pub const DEFAULT_LABEL: &str = "Best Quality (MP4)";

pub const PRESETS: [FormatPreset; 8] = [
    FormatPreset { label: "Best Quality (MP4)", selector: "best[ext=mp4]" },
    FormatPreset { label: "Best Audio (MP3)", selector: "bestaudio[ext=m4a]/bestaudio" },
    FormatPreset { label: "HD 1080p (MP4)", selector: "best[height<=1080][ext=mp4]" },
    FormatPreset { label: "HD 720p (MP4)", selector: "best[height<=720][ext=mp4]" },
    FormatPreset { label: "Standard 480p (MP4)", selector: "best[height<=480][ext=mp4]" },
    FormatPreset { label: "Audio Only (M4A)", selector: "bestaudio[ext=m4a]" },
    FormatPreset { label: "Audio Only (WEBM)", selector: "bestaudio[ext=webm]" },
    FormatPreset { label: "Worst Quality (Small File)", selector: "worst" },
];

pub fn lookup(label: &str) -> Option<&'static FormatPreset> {
    PRESETS.iter().find(|p| p.label == label)
}

/// Labels mentioning MP3 get transcoded after the transfer.
pub fn audio_extraction_for(label: &str) -> Option<AudioExtraction> {
    label.contains("MP3").then_some(MP3_EXTRACTION)
}
