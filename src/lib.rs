pub mod config;
pub mod language;
pub mod ollama;
pub mod prompt;
pub mod router;
pub mod session;
pub mod telegram;
pub mod youtube;

use std::sync::LazyLock;

use regex::Regex;

/// Title used when the video metadata carries none
pub const UNKNOWN_TITLE: &str = "Unknown Title";

/// Flattened caption text of a video, timing information removed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transcript {
    pub title: String,
    pub text: String,
}

static WATCH_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"youtube\.com/watch\?\S*v=([a-zA-Z0-9_-]{11})").expect("valid regex"));
static SHORT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"youtu\.be/([a-zA-Z0-9_-]{11})").expect("valid regex"));
static PATH_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"youtube\.com/(?:embed|shorts|live)/([a-zA-Z0-9_-]{11})").expect("valid regex"));

/// Extract a video ID from the first YouTube URL found anywhere in `input`
pub fn extract_video_id(input: &str) -> Option<String> {
    [&*WATCH_RE, &*SHORT_RE, &*PATH_RE]
        .iter()
        .find_map(|re| re.captures(input))
        .map(|caps| caps[1].to_string())
}
