//! Backend running the `yt-dlp` command, or its `youtube-dl` ancestor.

use std::{
    path::Path,
    process::Stdio,
    sync::Arc,
};

use async_trait::async_trait;
use nix::{
    sys::signal::{killpg, Signal},
    unistd::Pid,
};
use serde::Deserialize;
use tokio::{
    io::{AsyncBufReadExt, AsyncReadExt, BufReader},
    process::Command,
};
use tokio_util::sync::CancellationToken;

use crate::{
    backend::{Backend, Filer, Outcome, Progress},
    error::{Error, Result},
    format::{Format, Quality},
};

/// Which command runs the downloads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, strum::FromRepr)]
pub enum BackendId {
    #[default]
    YtDlp,
    YoutubeDl,
}

#[derive(Debug, Clone)]
pub struct YtDlp {
    command: String,
}

impl YtDlp {
    pub fn new(id: BackendId) -> Self {
        let command = match id {
            BackendId::YtDlp => "yt-dlp",
            BackendId::YoutubeDl => "youtube-dl",
        };
        YtDlp::with_command(command)
    }

    pub fn with_command(command: impl Into<String>) -> Self {
        YtDlp { command: command.into() }
    }
}

#[async_trait]
impl Backend for YtDlp {
    fn name(&self) -> &str {
        &self.command
    }

    fn qualities(&self) -> &[Quality] {
        &[Quality::Ask, Quality::BestFound, Quality::BestPossible]
    }

    async fn open(&self, url: &str) -> Result<Arc<dyn Filer>> {
        let output = Command::new(&self.command)
            .args(["-J", "--no-playlist", url])
            .stdin(Stdio::null())
            .output()
            .await
            .map_err(|source| Error::Spawn { command: self.command.clone(), source })?;
        if !output.status.success() {
            return Err(Error::Backend { command: self.command.clone(), message: last_line(&output.stderr) });
        }
        let (title, formats) = parse_info(&output.stdout)?;
        log::debug!("{}: {} formats for {}", self.command, formats.len(), title);
        Ok(Arc::new(YtDlpFile { command: self.command.clone(), url: url.to_string(), title, formats }))
    }
}

fn last_line(output: &[u8]) -> String {
    String::from_utf8_lossy(output).lines().filter(|l| !l.trim().is_empty()).last().unwrap_or("no output").to_string()
}

#[derive(Deserialize)]
struct VideoInfo {
    #[serde(default)]
    title: String,
    #[serde(default)]
    formats: Vec<FormatInfo>,
}

#[derive(Deserialize)]
struct FormatInfo {
    format_id: String,
    #[serde(default)]
    ext: String,
    resolution: Option<String>,
    format_note: Option<String>,
    filesize: Option<u64>,
    filesize_approx: Option<u64>,
    vcodec: Option<String>,
    acodec: Option<String>,
    abr: Option<f64>,
}

/// `none` means the stream has no such track.
fn codec(codec: Option<String>) -> String {
    codec.filter(|c| c != "none").unwrap_or_default()
}

/// Title and formats of a `-J` dump, best format first. Streams without audio nor video are dropped.
pub fn parse_info(json: &[u8]) -> Result<(String, Vec<Format>)> {
    let info: VideoInfo = serde_json::from_slice(json)?;
    let formats = info
        .formats
        .into_iter()
        .rev()
        .map(|f| Format {
            id: f.format_id,
            extension: f.ext,
            resolution: f.resolution.or(f.format_note).unwrap_or_default(),
            size: f.filesize.or(f.filesize_approx).unwrap_or_default(),
            video_encoding: codec(f.vcodec),
            audio_encoding: codec(f.acodec),
            audio_bitrate: f.abr.map_or(0, |abr| abr.round() as u32),
            delete_after: None,
        })
        .filter(|f| f.has_audio() || f.has_video())
        .collect();
    Ok((info.title, formats))
}

/// Percentage of a `[download]  42.1% of ...` progress line.
pub fn parse_progress(line: &str) -> Option<f64> {
    let rest = line.strip_prefix("[download]")?.trim_start();
    let (percent, _) = rest.split_once('%')?;
    percent.trim().parse().ok()
}

struct YtDlpFile {
    command: String,
    url: String,
    title: String,
    formats: Vec<Format>,
}

impl YtDlpFile {
    fn download_args(&self, dir: &Path, file_stem: &str, format: &Format) -> Vec<String> {
        // the output name is a template, where % must be doubled
        let output = dir.join(format!("{}.%(ext)s", file_stem.replace('%', "%%")));
        let mut args = vec!["--newline".to_string(), "--no-playlist".to_string(), "-f".to_string(), format.id.clone()];
        if format.is_merge() {
            args.extend(["--merge-output-format".to_string(), format.extension.clone()]);
        }
        args.extend(["-o".to_string(), output.to_string_lossy().into_owned(), self.url.clone()]);
        args
    }
}

#[async_trait]
impl Filer for YtDlpFile {
    fn title(&self) -> &str {
        &self.title
    }

    fn formats(&self) -> &[Format] {
        &self.formats
    }

    async fn download(&self, dir: &Path, file_stem: &str, format: &Format, progress: Progress, cancel: CancellationToken) -> Result<Outcome> {
        let args = self.download_args(dir, file_stem, format);
        log::debug!("Running {} {}", self.command, args.join(" "));
        let mut child = Command::new(&self.command)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            // own group, so that the merge subprocesses die with it
            .process_group(0)
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| Error::Spawn { command: self.command.clone(), source })?;

        let spawn_error = |what: &str| Error::Spawn { command: self.command.clone(), source: std::io::Error::other(format!("no {}", what)) };
        let mut lines = BufReader::new(child.stdout.take().ok_or_else(|| spawn_error("stdout"))?).lines();
        let mut stderr = child.stderr.take().ok_or_else(|| spawn_error("stderr"))?;
        let errors = tokio::spawn(async move {
            let mut errors = Vec::new();
            if let Err(err) = stderr.read_to_end(&mut errors).await {
                log::warn!("Could not read the errors of the download: {}", err);
            }
            errors
        });

        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    if let Some(pid) = child.id() {
                        if let Err(err) = killpg(Pid::from_raw(pid as i32), Signal::SIGTERM) {
                            log::warn!("Could not stop {}: {}", self.command, err);
                        }
                    }
                    if let Err(err) = child.wait().await {
                        log::warn!("Could not wait for {} to stop: {}", self.command, err);
                    }
                    return Ok(Outcome::Canceled);
                }
                line = lines.next_line() => match line {
                    Ok(Some(line)) => {
                        if let Some(percent) = parse_progress(&line) {
                            progress.set(percent);
                        }
                    }
                    Ok(None) => break,
                    Err(err) => {
                        log::warn!("Could not read the progress of {}: {}", self.command, err);
                        break;
                    }
                },
            }
        }

        let status = child.wait().await.map_err(|source| Error::Spawn { command: self.command.clone(), source })?;
        if status.success() {
            Ok(Outcome::Done)
        } else {
            let errors = errors.await.unwrap_or_default();
            Err(Error::Backend { command: self.command.clone(), message: last_line(&errors) })
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_parse_info() {
        let dump = br#"{
            "title": "Some talk",
            "formats": [
                {"format_id": "sb0", "ext": "mhtml", "vcodec": "none", "acodec": "none", "format_note": "storyboard"},
                {"format_id": "140", "ext": "m4a", "vcodec": "none", "acodec": "mp4a.40.2", "abr": 129.5, "resolution": "audio only", "filesize": 3000000},
                {"format_id": "137", "ext": "mp4", "vcodec": "avc1.640028", "acodec": "none", "resolution": "1920x1080", "filesize_approx": 50000000}
            ]
        }"#;
        let (title, formats) = parse_info(dump).unwrap();
        assert_eq!(title, "Some talk");
        assert_eq!(formats.iter().map(|f| f.id.as_str()).collect::<Vec<_>>(), vec!["137", "140"]);
        assert_eq!(formats[0].resolution, "1920x1080");
        assert_eq!(formats[0].size, 50_000_000);
        assert!(formats[0].has_video() && !formats[0].has_audio());
        assert_eq!(formats[1].audio_bitrate, 130);
        assert!(parse_info(b"not json").is_err());
    }

    #[test]
    fn test_parse_progress() {
        assert_eq!(parse_progress("[download]  42.3% of 10.00MiB at 1.00MiB/s ETA 00:06"), Some(42.3));
        assert_eq!(parse_progress("[download] 100% of 10.00MiB in 00:10"), Some(100.0));
        assert_eq!(parse_progress("[download] Destination: a.mp4"), None);
        assert_eq!(parse_progress("[info] 50%"), None);
    }

    #[test]
    fn test_download_args() {
        let file = YtDlpFile { command: "yt-dlp".into(), url: "https://host/v".into(), title: "t".into(), formats: Vec::new() };
        let merged = Format { id: "137+140".into(), extension: "mp4".into(), ..Default::default() };
        insta::assert_snapshot!(
            file.download_args(Path::new("/videos"), "100% live", &merged).join(" "),
            @"--newline --no-playlist -f 137+140 --merge-output-format mp4 -o /videos/100%% live.%(ext)s https://host/v"
        );
    }

    /// A downloader printing `script`, the test stands in for yt-dlp.
    fn fake_downloader(dir: &Path, script: &str) -> YtDlpFile {
        use std::os::unix::fs::PermissionsExt;
        let command = dir.join("fake-dl");
        std::fs::write(&command, format!("#!/bin/sh\n{}\n", script)).unwrap();
        std::fs::set_permissions(&command, std::fs::Permissions::from_mode(0o755)).unwrap();
        YtDlpFile { command: command.display().to_string(), url: "https://host/v".into(), title: "t".into(), formats: Vec::new() }
    }

    #[tokio::test]
    async fn test_download_progress_and_cancel() {
        let dir = tempfile::tempdir().unwrap();
        let file = fake_downloader(dir.path(), "echo '[download]  12.5% of 10.00MiB'\nexec sleep 30");
        let (progress, cancel) = (Progress::default(), CancellationToken::new());
        let format = Format { id: "18".into(), extension: "mp4".into(), ..Default::default() };

        let download = {
            let (progress, cancel, dir) = (progress.clone(), cancel.clone(), dir.path().to_path_buf());
            tokio::spawn(async move { file.download(&dir, "v", &format, progress, cancel).await })
        };
        for _ in 0..500 {
            if progress.get() > 0.0 {
                break;
            }
            tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        }
        assert_eq!(progress.get(), 12.5);

        cancel.cancel();
        let outcome = tokio::time::timeout(std::time::Duration::from_secs(10), download).await.unwrap().unwrap();
        assert_eq!(outcome.unwrap(), Outcome::Canceled);
    }

    #[tokio::test]
    async fn test_download_failure_reports_the_last_error() {
        let dir = tempfile::tempdir().unwrap();
        let file = fake_downloader(dir.path(), "echo 'WARNING: slow' >&2\necho 'ERROR: Video unavailable' >&2\nexit 1");
        let format = Format { id: "18".into(), extension: "mp4".into(), ..Default::default() };
        let result = file.download(dir.path(), "v", &format, Progress::default(), CancellationToken::new()).await;
        assert!(matches!(result, Err(Error::Backend { message, .. }) if message == "ERROR: Video unavailable"));
    }

    #[tokio::test]
    async fn test_missing_command() {
        let backend = YtDlp::with_command("surely-not-an-installed-downloader");
        assert!(matches!(backend.open("https://host/v").await, Err(Error::Spawn { .. })));
    }
}
