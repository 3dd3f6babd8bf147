/// The first line of an HTTP request, `METHOD PATH VERSION`.
///
/// Method and version are kept verbatim. Only the path drives routing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestLine {
    /// The method token, e.g. "GET". Not validated.
    pub method: String,
    /// The request target, e.g. "/index.html"
    pub path: String,
    /// HTTP version token. Empty when the client sent only two tokens.
    pub version: String,
}

impl RequestLine {
    pub fn new(
        method: impl Into<String>,
        path: impl Into<String>,
        version: impl Into<String>,
    ) -> Self {
        Self {
            method: method.into(),
            path: path.into(),
            version: version.into(),
        }
    }

    /// Whether this line asks for the live status page.
    pub fn is_status(&self) -> bool {
        self.path == STATUS_PATH
    }
}

/// The only route not backed by the filesystem.
pub const STATUS_PATH: &str = "/status";
