//! YouTube link helpers.
//!
//! Recognised shapes: `youtube.com/watch?v=ID`, `youtu.be/ID`,
//! `youtube.com/embed/ID` and `youtube.com/shorts/ID`, with or without a
//! scheme and a `www.`/`m.` host prefix. The id must be exactly 11
//! URL-safe characters and may only be followed by a query or fragment.

use std::sync::LazyLock;

use regex_lite::Regex;

static YOUTUBE_URL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^(?:https?://)?(?:www\.|m\.)?(?:youtube\.com/(?:watch\?(?:[^#\s]*&)?v=|embed/|shorts/)|youtu\.be/)([A-Za-z0-9_-]{11})(?:[?&#]\S*)?$",
    )
    .expect("valid youtube pattern")
});

/// Extract the 11-character video id from a YouTube URL.
pub fn extract_youtube_id(url: &str) -> Option<String> {
    YOUTUBE_URL
        .captures(url.trim())
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
}

pub fn validate_youtube_url(url: &str) -> bool {
    extract_youtube_id(url).is_some()
}

pub fn embed_url(id: &str) -> String {
    format!("https://www.youtube.com/embed/{id}")
}

/// Poster frame served by YouTube for a video.
pub fn thumbnail_url(id: &str) -> String {
    format!("https://img.youtube.com/vi/{id}/hqdefault.jpg")
}
