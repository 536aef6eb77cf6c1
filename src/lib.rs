pub mod config;
pub mod output;
pub mod render;
pub mod server;
pub mod summarize;
pub mod ui;
pub mod youtube;

use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;

/// A single captioned segment
#[derive(Debug, Clone, Serialize)]
pub struct Segment {
    pub text: String,
    pub start: f64,
    pub duration: f64,
}

/// Complete transcript for a video
#[derive(Debug, Clone, Serialize)]
pub struct Transcript {
    pub video_id: String,
    pub title: String,
    pub language: String,
    pub segments: Vec<Segment>,
}

impl Transcript {
    /// Segment texts joined by a single space
    pub fn text(&self) -> String {
        self.segments
            .iter()
            .map(|s| s.text.as_str())
            .collect::<Vec<_>>()
            .join(" ")
    }
}

static BARE_ID: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^[a-zA-Z0-9_-]{11}$").expect("valid regex"));

// watch?v= and youtu.be/ capture everything up to the next '&'
static WATCH_OR_SHORT_LINK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?:youtube\.com/watch\?v=|youtu\.be/)([^&]+)").expect("valid regex"));

static EMBED_OR_SHORTS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"youtube\.com/(?:embed|shorts)/([^&?/]+)").expect("valid regex"));

/// Extract video ID from various YouTube URL formats
pub fn extract_video_id(input: &str) -> Option<String> {
    let input = input.trim();

    if BARE_ID.is_match(input) {
        return Some(input.to_string());
    }

    if let Some(caps) = WATCH_OR_SHORT_LINK.captures(input) {
        return Some(caps[1].to_string());
    }

    if let Some(caps) = EMBED_OR_SHORTS.captures(input) {
        return Some(caps[1].to_string());
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn segment(text: &str) -> Segment {
        Segment {
            text: text.to_string(),
            start: 0.0,
            duration: 1.0,
        }
    }

    #[test]
    fn test_bare_video_id() {
        assert_eq!(extract_video_id("dQw4w9WgXcQ"), Some("dQw4w9WgXcQ".to_string()));
    }

    #[test]
    fn test_watch_url() {
        assert_eq!(
            extract_video_id("https://www.youtube.com/watch?v=dQw4w9WgXcQ"),
            Some("dQw4w9WgXcQ".to_string())
        );
    }

    #[test]
    fn test_watch_url_stops_at_ampersand() {
        assert_eq!(
            extract_video_id("https://www.youtube.com/watch?v=ABC123&t=5s"),
            Some("ABC123".to_string())
        );
    }

    #[test]
    fn test_short_url() {
        assert_eq!(extract_video_id("https://youtu.be/XYZ987"), Some("XYZ987".to_string()));
    }

    #[test]
    fn test_embed_url() {
        assert_eq!(
            extract_video_id("https://www.youtube.com/embed/dQw4w9WgXcQ"),
            Some("dQw4w9WgXcQ".to_string())
        );
    }

    #[test]
    fn test_shorts_url() {
        assert_eq!(
            extract_video_id("https://www.youtube.com/shorts/dQw4w9WgXcQ?feature=share"),
            Some("dQw4w9WgXcQ".to_string())
        );
    }

    #[test]
    fn test_unrecognized_url() {
        assert_eq!(extract_video_id("https://vimeo.com/123456"), None);
        assert_eq!(extract_video_id("https://www.youtube.com/feed/trending"), None);
    }

    #[test]
    fn test_invalid_input() {
        assert_eq!(extract_video_id("not-a-valid-id"), None);
        assert_eq!(extract_video_id(""), None);
    }

    #[test]
    fn test_whitespace_trimming() {
        assert_eq!(extract_video_id("  dQw4w9WgXcQ  "), Some("dQw4w9WgXcQ".to_string()));
    }

    #[test]
    fn test_transcript_text_joins_with_space() {
        let t = Transcript {
            video_id: "abc".to_string(),
            title: String::new(),
            language: "en".to_string(),
            segments: vec![segment("hello"), segment("world")],
        };
        assert_eq!(t.text(), "hello world");
    }

    #[test]
    fn test_transcript_text_empty() {
        let t = Transcript {
            video_id: "abc".to_string(),
            title: String::new(),
            language: "en".to_string(),
            segments: vec![],
        };
        assert_eq!(t.text(), "");
    }
}
