//! Video and audio link helpers for the media pages.

use regex::Regex;
use std::sync::OnceLock;

fn youtube_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"(?:v=|youtu\.be/|embed/|watch\?v=)([a-zA-Z0-9_-]{11})")
            .expect("valid youtube pattern")
    })
}

fn drive_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"/file/d/([a-zA-Z0-9_-]+)").expect("valid drive pattern"))
}

/// Extract the 11 character video id from a YouTube URL.
pub fn youtube_video_id(url: &str) -> Option<&str> {
    youtube_pattern()
        .captures(url)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str())
}

/// Canonical watch URL for a YouTube link.
pub fn youtube_watch_url(url: &str) -> Option<String> {
    youtube_video_id(url).map(|id| format!("https://www.youtube.com/watch?v={}", id))
}

/// Turn a Google Drive share link into a direct download link.
pub fn drive_direct_link(share_link: &str) -> Option<String> {
    drive_pattern()
        .captures(share_link)
        .and_then(|c| c.get(1))
        .map(|m| format!("https://drive.google.com/uc?export=download&id={}", m.as_str()))
}
