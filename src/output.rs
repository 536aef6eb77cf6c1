use eyre::Result;

use crate::Transcript;

/// Render transcript as plain text, segments joined by a single space
pub fn render_text(transcript: &Transcript) -> String {
    transcript.text()
}

/// Render transcript with metadata and timings as pretty JSON
pub fn render_json(transcript: &Transcript) -> Result<String> {
    Ok(serde_json::to_string_pretty(transcript)?)
}
