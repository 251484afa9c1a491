use thiserror::Error;

/// Everything that can go wrong between a button click and a finished download.
#[derive(Debug, Error)]
pub enum GrabError {
    /// The URL field was empty or whitespace.
    #[error("Please enter a video URL")]
    EmptyUrl,

    /// The matching task is already in flight.
    #[error("a {0} is already running")]
    Busy(&'static str),

    #[error("no such format: {0}")]
    UnknownFormat(String),

    #[error("failed to start yt-dlp: {0}")]
    Spawn(#[source] std::io::Error),

    /// yt-dlp ran and reported a failure; carries its own message.
    #[error("{0}")]
    Tool(String),

    #[error("could not read yt-dlp output: {0}")]
    Json(#[from] serde_json::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("thumbnail request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("thumbnail could not be decoded: {0}")]
    Image(#[from] image::ImageError),

    #[error("could not start worker runtime: {0}")]
    Runtime(#[source] std::io::Error),
}

pub type Result<T> = std::result::Result<T, GrabError>;
