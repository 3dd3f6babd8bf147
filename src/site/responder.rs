use std::path::Path;

use anyhow::Context;
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;

use crate::config::MediaEncoding;
use crate::http::mime::{self, Strategy};
use crate::http::response::{Response, ResponseBuilder, StatusCode};
use crate::script::{self, ProcessRunner};

/// Builds the 200 response for a file known to exist.
///
/// The whole file is read into memory. Media files are base64 encoded when
/// `encoding` says so, HTML pages have their code blocks substituted, and
/// anything else is sent as is.
pub async fn respond(
    file: &Path,
    encoding: MediaEncoding,
    runner: &ProcessRunner,
) -> anyhow::Result<Response> {
    let mime_type = mime::guess(file);
    let data = tokio::fs::read(file)
        .await
        .with_context(|| format!("reading {}", file.display()))?;

    let body = match mime::strategy_for(&mime_type) {
        Strategy::Encoded if encoding == MediaEncoding::Base64 => STANDARD.encode(&data).into_bytes(),
        Strategy::Html => {
            let page = String::from_utf8_lossy(&data);
            script::substitute(&page, runner).await.into_bytes()
        }
        Strategy::Encoded | Strategy::Raw => data,
    };

    Ok(ResponseBuilder::new(StatusCode::Ok)
        .header("Content-Type", mime_type)
        .body(body)
        .build())
}
