use std::{
    fs::File,
    future::Future,
    io::Write,
    path::{Path, PathBuf},
    process::{ExitStatus, Stdio},
};

use once_cell::sync::OnceCell;
use rust_embed::RustEmbed;
use tokio::{
    io::{AsyncBufReadExt, AsyncRead, BufReader},
    process::Command,
};
use tracing::{debug, info, trace};

use crate::error::{GrabError, Result};
use crate::model::{DownloadJob, VideoInfo};
use crate::progress::{PROGRESS_MARKER, ProgressRelay, parse_progress_from_line};

/// Drop a yt-dlp binary into `assets/` to ship it inside the executable.
#[derive(RustEmbed)]
#[folder = "assets/"]
pub struct Asset;

const TOOL_NAME: &str = if cfg!(target_os = "windows") { "yt-dlp.exe" } else { "yt-dlp" };

static TOOL_PATH: OnceCell<PathBuf> = OnceCell::new();

/// The external collaborator that knows how to talk to video sites.
pub trait Extractor: Send + Sync + 'static {
    /// Reads the metadata record without downloading anything.
    fn fetch_info(&self, url: &str) -> impl Future<Output = Result<VideoInfo>>;

    /// Performs the transfer, reporting every tick to `relay`.
    fn download(&self, job: &DownloadJob, relay: &ProgressRelay) -> impl Future<Output = Result<()>>;
}

/// Runs the `yt-dlp` executable: `bin` when set, otherwise bundled or from `PATH`.
#[derive(Debug, Default)]
pub struct YtDlp {
    pub bin: Option<PathBuf>,
}

impl YtDlp {
    pub fn with_binary(bin: impl Into<PathBuf>) -> Self {
        Self { bin: Some(bin.into()) }
    }

    fn command(&self) -> Result<Command> {
        let bin = match &self.bin {
            Some(bin) => bin,
            None => tool_path()?,
        };
        let mut cmd = Command::new(bin);
        cmd.stdin(Stdio::null()).kill_on_drop(true);
        Ok(cmd)
    }
}

impl Extractor for YtDlp {
    async fn fetch_info(&self, url: &str) -> Result<VideoInfo> {
        let args = info_args(url);
        debug!(?args, "running yt-dlp for metadata");
        let output = self
            .command()?
            .args(&args)
            .output()
            .await
            .map_err(GrabError::Spawn)?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(tool_error(&stderr, output.status));
        }
        Ok(serde_json::from_str(&String::from_utf8_lossy(&output.stdout))?)
    }

    async fn download(&self, job: &DownloadJob, relay: &ProgressRelay) -> Result<()> {
        let args = download_args(job);
        info!(url = %job.url, selector = job.selector, "starting yt-dlp download");
        debug!(?args, "yt-dlp arguments");

        let mut child = self
            .command()?
            .args(&args)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(GrabError::Spawn)?;

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| GrabError::Tool("yt-dlp stdout was not captured".into()))?;
        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| GrabError::Tool("yt-dlp stderr was not captured".into()))?;

        let mut stderr_text = String::new();
        let progress = for_each_line(stdout, |line| match parse_progress_from_line(line) {
            Some(event) => relay.tick(&event),
            None => trace!(target: "yt_dlp", "{line}"),
        });
        let errors = for_each_line(stderr, |line| {
            debug!(target: "yt_dlp", "{line}");
            stderr_text.push_str(line);
            stderr_text.push('\n');
        });
        let (progress, errors) = tokio::join!(progress, errors);

        // Reap the child before reporting a broken pipe.
        let status = child.wait().await?;
        progress?;
        errors?;

        if !status.success() {
            return Err(tool_error(&stderr_text, status));
        }
        info!(url = %job.url, "yt-dlp download finished");
        Ok(())
    }
}

/// Feeds every line of `reader` to `f`, decoding lossily so a stray code-page
/// byte in a title never aborts the stream.
async fn for_each_line<R>(reader: R, mut f: impl FnMut(&str)) -> std::io::Result<()>
where
    R: AsyncRead + Unpin,
{
    let mut reader = BufReader::new(reader);
    let mut buf = Vec::new();
    loop {
        buf.clear();
        if reader.read_until(b'\n', &mut buf).await? == 0 {
            return Ok(());
        }
        let line = String::from_utf8_lossy(&buf);
        f(line.trim_end_matches(['\r', '\n']));
    }
}

pub fn info_args(url: &str) -> Vec<String> {
    vec![
        "-J".to_owned(),
        "--encoding".to_owned(),
        "utf-8".to_owned(),
        "--no-warnings".to_owned(),
        "--no-playlist".to_owned(),
        url.to_owned(),
    ]
}

pub fn download_args(job: &DownloadJob) -> Vec<String> {
    let mut args = vec!["-f".to_owned(), job.selector.to_owned()];

    args.push("-o".to_owned());
    args.push(job.output_template.clone());

    args.push("--encoding".to_owned());
    args.push("utf-8".to_owned());
    args.push("--no-playlist".to_owned());
    args.push("--newline".to_owned());
    args.push("--no-warnings".to_owned());
    args.push("--progress".to_owned());
    args.push("--progress-template".to_owned());
    args.push(format!("download:{PROGRESS_MARKER}%(progress)j"));

    if let Some(audio) = job.audio {
        args.push("-x".to_owned());
        args.push("--audio-format".to_owned());
        args.push(audio.codec.to_owned());
        args.push("--audio-quality".to_owned());
        args.push(audio.quality.to_owned());
    }

    args.push(job.url.clone());
    args
}

/// Picks the most useful line out of yt-dlp's stderr.
pub fn tool_error(stderr: &str, status: ExitStatus) -> GrabError {
    let lines: Vec<&str> = stderr.lines().map(str::trim).filter(|l| !l.is_empty()).collect();
    let message = lines
        .iter()
        .rev()
        .find(|l| l.starts_with("ERROR:"))
        .or_else(|| lines.last())
        .map(|l| l.to_string())
        .unwrap_or_else(|| format!("yt-dlp exited with {status}"));
    GrabError::Tool(message)
}

/// Location of the yt-dlp executable, resolved once per process.
fn tool_path() -> Result<&'static PathBuf> {
    TOOL_PATH.get_or_try_init(|| match Asset::get(TOOL_NAME) {
        Some(bundled) => {
            let path = write_tool(&std::env::temp_dir(), TOOL_NAME, &bundled.data)?;
            info!(path = %path.display(), "using bundled yt-dlp");
            Ok(path)
        }
        None => {
            debug!("no bundled yt-dlp, relying on PATH");
            Ok(PathBuf::from(TOOL_NAME))
        }
    })
}

/// Writes `bytes` to `dir/name` unless it is already there and marks it executable.
pub fn write_tool(dir: &Path, name: &str, bytes: &[u8]) -> Result<PathBuf> {
    let path = dir.join(name);
    if !path.exists() {
        let mut f = File::create(&path)?;
        f.write_all(bytes)?;
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755))?;
        }
    }
    Ok(path)
}
