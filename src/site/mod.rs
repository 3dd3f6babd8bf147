//! Mapping request paths onto the site root and answering with file contents.

pub mod responder;

use std::path::{Path, PathBuf};

use crate::http::request::STATUS_PATH;

pub use responder::respond;

/// Where a request path leads.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Target {
    /// The live status page.
    Status,
    /// A filesystem path under the root. It may not exist.
    File(PathBuf),
    /// The path tried to climb out of the root with a `..` segment.
    Forbidden(String),
}

/// Resolves a request path against `root`.
///
/// `/` becomes `/index.html`. The path is appended to the root as text: no
/// percent decoding and no query stripping.
pub fn resolve(root: &Path, request_path: &str) -> Target {
    if request_path == STATUS_PATH {
        return Target::Status;
    }

    let path = if request_path == "/" { "/index.html" } else { request_path };

    if path.split(['/', '\\']).any(|segment| segment == "..") {
        return Target::Forbidden(path.to_string());
    }

    let mut joined = root.as_os_str().to_os_string();
    joined.push(path);
    Target::File(PathBuf::from(joined))
}
