use std::collections::HashMap;
use std::future::Future;
use std::process::Stdio;
use std::sync::LazyLock;
use std::time::Duration;

use eyre::{Result, WrapErr, bail};
use log::{debug, info};
use regex::Regex;
use serde::Deserialize;
use tokio::process::Command;

use crate::{Transcript, UNKNOWN_TITLE, extract_video_id};

/// Caption language requested from the platform
const CAPTION_LANG: &str = "en";

pub const DEFAULT_CAPTION_TIMEOUT: Duration = Duration::from_secs(30);
pub const DEFAULT_METADATA_TIMEOUT: Duration = Duration::from_secs(90);

/// Result of looking for a video's transcript
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchOutcome {
    Found(Transcript),
    /// No English track, the caption download was refused, or the track was empty
    Unavailable,
}

/// Resolves a free-form message believed to contain a video link into a transcript
pub trait TranscriptFetcher {
    fn fetch(&self, reference: &str) -> impl Future<Output = Result<FetchOutcome>> + Send;
}

/// Subset of `yt-dlp --dump-single-json` output
#[derive(Debug, Deserialize)]
struct VideoInfo {
    title: Option<String>,
    requested_subtitles: Option<HashMap<String, SubtitleTrack>>,
}

#[derive(Debug, Deserialize)]
struct SubtitleTrack {
    url: Option<String>,
}

/// Fetches caption metadata through the `yt-dlp` executable and the caption file over HTTP
#[derive(Debug, Clone)]
pub struct YtDlpFetcher {
    client: reqwest::Client,
    program: String,
    /// Arguments placed before the yt-dlp options, e.g. a script path when `program` is a shell
    leading_args: Vec<String>,
    metadata_timeout: Duration,
    caption_timeout: Duration,
}

impl YtDlpFetcher {
    pub fn new(client: reqwest::Client, metadata_timeout: Duration, caption_timeout: Duration) -> Self {
        Self {
            client,
            program: "yt-dlp".to_string(),
            leading_args: Vec::new(),
            metadata_timeout,
            caption_timeout,
        }
    }

    /// Use a yt-dlp executable other than the one on PATH
    pub fn with_program(mut self, program: impl Into<String>) -> Self {
        self.program = program.into();
        self
    }

    async fn video_info(&self, url: &str) -> Result<VideoInfo> {
        debug!("Resolving caption metadata via {}: {url}", self.program);

        let child = Command::new(&self.program)
            .args(&self.leading_args)
            .args([
                "--skip-download",
                "--write-subs",
                "--write-auto-subs",
                "--sub-langs",
                CAPTION_LANG,
                "--sub-format",
                "vtt",
                "--dump-single-json",
                "--no-playlist",
                "--no-warnings",
                "--quiet",
                // user text must never be read as an option
                "--",
                url,
            ])
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .output();

        let output = match tokio::time::timeout(self.metadata_timeout, child).await {
            Ok(Ok(output)) => output,
            Ok(Err(e)) if e.kind() == std::io::ErrorKind::NotFound => {
                bail!("{} not found. Install it with: pip install yt-dlp", self.program);
            }
            Ok(Err(e)) => bail!("failed to run {}: {e}", self.program),
            Err(_) => bail!("{} timed out after {:?}", self.program, self.metadata_timeout),
        };

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            bail!("{} exited with status {}: {}", self.program, output.status, stderr.trim());
        }

        parse_video_info(&output.stdout)
    }

    async fn download_captions(&self, url: &str) -> Result<Option<String>> {
        debug!("Downloading caption track");

        let resp = self
            .client
            .get(url)
            .timeout(self.caption_timeout)
            .send()
            .await?;

        if !resp.status().is_success() {
            info!("Caption download returned {}", resp.status());
            return Ok(None);
        }

        Ok(Some(resp.text().await?))
    }
}

impl TranscriptFetcher for YtDlpFetcher {
    async fn fetch(&self, reference: &str) -> Result<FetchOutcome> {
        let url = video_url(reference);
        let info = self.video_info(&url).await.wrap_err("caption metadata lookup failed")?;

        let title = info.title.clone().unwrap_or_else(|| UNKNOWN_TITLE.to_string());
        let Some(track_url) = english_track_url(&info) else {
            info!("No {CAPTION_LANG} caption track for {url}");
            return Ok(FetchOutcome::Unavailable);
        };

        let Some(vtt) = self.download_captions(track_url).await? else {
            return Ok(FetchOutcome::Unavailable);
        };

        let text = clean_vtt(&vtt);
        if text.is_empty() {
            info!("Caption track for {url} was empty after cleanup");
            return Ok(FetchOutcome::Unavailable);
        }

        debug!("Transcript for \"{title}\": {} chars", text.chars().count());
        Ok(FetchOutcome::Found(Transcript { title, text }))
    }
}

/// Canonical watch URL when a video ID can be found, otherwise the message as sent
fn video_url(reference: &str) -> String {
    match extract_video_id(reference) {
        Some(id) => format!("https://www.youtube.com/watch?v={id}"),
        None => reference.trim().to_string(),
    }
}

fn parse_video_info(stdout: &[u8]) -> Result<VideoInfo> {
    serde_json::from_slice(stdout).wrap_err("could not decode yt-dlp metadata")
}

fn english_track_url(info: &VideoInfo) -> Option<&str> {
    info.requested_subtitles
        .as_ref()?
        .get(CAPTION_LANG)?
        .url
        .as_deref()
}

static CUE_TIMING_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\d{2}:\d{2}:\d{2}\.\d+ --> .*").expect("valid regex"));
static INLINE_TAG_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"<[^>\n]*>").expect("valid regex"));
static LINE_BREAKS_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[\r\n]+").expect("valid regex"));

/// Flatten a WebVTT payload into one line of plain text
pub fn clean_vtt(vtt: &str) -> String {
    let text = CUE_TIMING_RE.replace_all(vtt, "");
    let text = text.replace("WEBVTT", "");
    let text = INLINE_TAG_RE.replace_all(&text, "");
    let text = html_escape::decode_html_entities(&text);
    let text = LINE_BREAKS_RE.replace_all(&text, " ");
    text.trim().to_string()
}
