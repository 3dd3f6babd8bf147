//! HTTP protocol handling.
//!
//! The server speaks a deliberately small subset of HTTP/1.1: one request
//! line per connection, no headers or body read, one response, then close.
//!
//! # Architecture
//!
//! - **`connection`**: the per-connection state machine
//! - **`parser`**: request line framing and tokenising
//! - **`request`**: the parsed request line
//! - **`response`**: HTTP response representation with builder pattern
//! - **`writer`**: serializes and writes responses, head before body
//! - **`mime`**: MIME type detection and response strategy
//!
//! # Connection State Machine
//!
//! ```text
//!        ┌─────────────┐
//!        │  Filtering  │ ← Check peer address (reject → Closed, nothing sent)
//!        └──────┬──────┘
//!               ▼
//!        ┌─────────────┐
//!        │   Reading   │ ← One request line (empty/invalid → Closed, nothing sent)
//!        └──────┬──────┘
//!               ▼
//!        ┌──────────────────┐
//!        │     Routing      │ ← /status, file, or 404
//!        └──────┬───────────┘
//!               ▼
//!        ┌──────────────────┐
//!        │     Writing      │ ← Send response to client
//!        └──────┬───────────┘
//!               ▼
//!             Closed
//! ```

pub mod connection;
pub mod mime;
pub mod parser;
pub mod request;
pub mod response;
pub mod writer;
