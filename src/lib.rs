//! Splice - static file server with server-side code blocks
//!
//! Serves files from a root directory, gates peers by IP, reports host status
//! on `/status`, and runs `<code interpreteur="...">` blocks found in HTML
//! pages through external interpreters before sending them.

pub mod access;
pub mod config;
pub mod http;
pub mod script;
pub mod server;
pub mod site;
pub mod status;
pub mod telemetry;
