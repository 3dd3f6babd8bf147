use std::collections::HashSet;
use std::net::IpAddr;
use std::path::{Path, PathBuf};

use anyhow::Context;
use serde::{Deserialize, Deserializer};

/// Environment variable naming the YAML configuration file.
pub const CONFIG_ENV: &str = "SPLICE_CONFIG";

/// Configuration file used when neither the environment nor the command line names one.
pub const DEFAULT_CONFIG_PATH: &str = "splice.yaml";

/// Server configuration, loaded once at startup and shared read-only.
///
/// Every field is optional in the YAML file:
///
/// ```yaml
/// port: 8080
/// root: ./site
/// access_log: logs/access.log
/// error_log: logs/error.log
/// accept: ["127.0.0.1"]
/// reject: ["10.0.0.7 10.0.0.8"]
/// media_encoding: base64
/// scripting:
///   interpreters: [python3, sh]
///   timeout_ms: 5000
/// ```
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    pub host: String,
    pub port: u16,
    /// Directory request paths are resolved against.
    pub root: PathBuf,
    pub access_log: PathBuf,
    pub error_log: PathBuf,
    /// Addresses allowed to connect. Empty means everyone not in `reject`.
    #[serde(deserialize_with = "address_set")]
    pub accept: HashSet<String>,
    /// Addresses refused outright. Checked before `accept`.
    #[serde(deserialize_with = "address_set")]
    pub reject: HashSet<String>,
    pub media_encoding: MediaEncoding,
    pub scripting: ScriptingConfig,
}

/// How `image/*`, `video/*` and `audio/*` files go on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaEncoding {
    /// Base64 text, `Content-Length` of the encoded text.
    #[default]
    Base64,
    /// The file bytes untouched.
    Raw,
}

/// Limits applied to embedded code blocks found in HTML pages.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ScriptingConfig {
    /// When false, HTML is served without scanning for code blocks.
    pub enabled: bool,
    /// Interpreter programs a page may name.
    pub interpreters: Vec<String>,
    /// Run whatever interpreter a page names, ignoring `interpreters`.
    pub unrestricted: bool,
    pub timeout_ms: u64,
    pub max_output_bytes: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 80,
            root: PathBuf::from("."),
            access_log: PathBuf::from("logs/access.log"),
            error_log: PathBuf::from("logs/error.log"),
            accept: HashSet::new(),
            reject: HashSet::new(),
            media_encoding: MediaEncoding::default(),
            scripting: ScriptingConfig::default(),
        }
    }
}

impl Default for ScriptingConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            interpreters: Vec::new(),
            unrestricted: false,
            timeout_ms: 10_000,
            max_output_bytes: 1024 * 1024,
        }
    }
}

impl Config {
    /// The configuration file: `$SPLICE_CONFIG`, the first command line
    /// argument, or `splice.yaml`, in that order.
    pub fn path() -> PathBuf {
        std::env::var(CONFIG_ENV)
            .ok()
            .or_else(|| std::env::args().nth(1))
            .unwrap_or_else(|| DEFAULT_CONFIG_PATH.to_string())
            .into()
    }

    /// A missing file is not an error: the defaults are used instead.
    pub fn from_file(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();

        let text = match std::fs::read_to_string(path) {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Self::default()),
            Err(e) => {
                return Err(e).with_context(|| format!("reading config {}", path.display()));
            }
        };

        Self::from_yaml(&text).with_context(|| format!("parsing config {}", path.display()))
    }

    pub fn from_yaml(text: &str) -> anyhow::Result<Self> {
        // An empty document deserializes to unit, not to a mapping.
        if text.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yaml::from_str(text)?)
    }

    /// The address the listener binds to.
    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Accepts a list whose entries may each hold several whitespace-separated
/// addresses, e.g. `["127.0.0.1 10.0.0.1", "::1"]`.
///
/// Addresses are stored in canonical form, so `0:0:0:0:0:0:0:1` and
/// `::ffff:10.0.0.1` match peers `::1` and `10.0.0.1`. Entries that are not
/// IP addresses are kept verbatim and never match.
fn address_set<'de, D>(deserializer: D) -> Result<HashSet<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let entries = Option::<Vec<String>>::deserialize(deserializer)?.unwrap_or_default();

    Ok(entries
        .iter()
        .flat_map(|entry| entry.split_whitespace())
        .map(canonical_address)
        .collect())
}

fn canonical_address(text: &str) -> String {
    match text.parse::<IpAddr>() {
        Ok(addr) => addr.to_canonical().to_string(),
        Err(_) => text.to_string(),
    }
}
