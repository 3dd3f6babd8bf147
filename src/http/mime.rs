//! MIME type detection and the response strategy it implies.

use std::path::Path;

/// How a file's bytes are turned into a response body.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    /// Images, video and audio.
    Encoded,
    /// HTML pages, run through the code engine.
    Html,
    /// Everything else, passed through unmodified.
    Raw,
}

/// Guesses the MIME type from the file extension, falling back to
/// `application/octet-stream`.
pub fn guess(path: &Path) -> String {
    mime_guess::from_path(path)
        .first_or_octet_stream()
        .essence_str()
        .to_string()
}

pub fn strategy_for(mime: &str) -> Strategy {
    let top_level = mime.split('/').next().unwrap_or_default();

    match top_level {
        "image" | "video" | "audio" => Strategy::Encoded,
        _ if mime == "text/html" => Strategy::Html,
        _ => Strategy::Raw,
    }
}
