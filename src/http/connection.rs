use std::io;
use std::net::IpAddr;
use std::sync::Arc;
use std::time::Duration;

use bytes::BytesMut;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::time::timeout;

use crate::access;
use crate::http::parser::{MAX_REQUEST_LINE, ParseError, decode_line, find_line_end, parse_request_line};
use crate::http::request::RequestLine;
use crate::http::response::Response;
use crate::http::writer::ResponseWriter;
use crate::server::ServerContext;
use crate::site::{self, Target};
use crate::status;

/// How long a closing connection keeps discarding client input.
const LINGER_TIMEOUT: Duration = Duration::from_millis(250);
const LINGER_LIMIT: usize = 64 * 1024;

/// How a connection ended, when it ended without an I/O failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// The peer address is not allowed. Nothing was read or sent.
    Rejected,
    /// Empty or unusable request line. Nothing was sent.
    Malformed(ParseError),
    /// The status page was sent.
    Status,
    /// A file was sent.
    Served,
    /// The 404 page was sent.
    NotFound,
}

/// One accepted connection, handled from access check to close.
pub struct Connection<S> {
    stream: S,
    peer: IpAddr,
    ctx: Arc<ServerContext>,
    buffer: BytesMut,
}

pub enum ConnectionState {
    Filtering,
    Reading,
    Routing(RequestLine),
    Writing(ResponseWriter, Outcome),
    Closed(Outcome),
}

impl<S> Connection<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    pub fn new(stream: S, peer: IpAddr, ctx: Arc<ServerContext>) -> Self {
        Self {
            stream,
            peer: peer.to_canonical(),
            ctx,
            buffer: BytesMut::with_capacity(MAX_REQUEST_LINE),
        }
    }

    /// Handles the connection and closes it.
    ///
    /// I/O failures are logged here and yield `None`; they never reach the
    /// listener.
    pub async fn serve(mut self) -> Option<Outcome> {
        match self.run().await {
            Ok(outcome) => Some(outcome),
            Err(e) => {
                self.report_failure(&e);
                None
            }
        }
    }

    /// Drives the connection state machine to completion.
    ///
    /// The connection is counted as active for as long as this runs.
    pub async fn run(&mut self) -> anyhow::Result<Outcome> {
        let _active = self.ctx.counter.enter();
        let mut state = ConnectionState::Filtering;

        loop {
            state = match state {
                ConnectionState::Filtering => {
                    if access::is_accepted(self.peer, &self.ctx.config) {
                        ConnectionState::Reading
                    } else {
                        self.ctx
                            .sink
                            .error(&format!("connection refused for {}", self.peer));
                        ConnectionState::Closed(Outcome::Rejected)
                    }
                }

                ConnectionState::Reading => match self.read_request_line().await? {
                    Ok(req) => ConnectionState::Routing(req),
                    Err(e) => {
                        self.ctx.sink.error(&e.to_string());
                        ConnectionState::Closed(Outcome::Malformed(e))
                    }
                },

                ConnectionState::Routing(req) => {
                    let (response, outcome) = self.route(&req).await?;
                    ConnectionState::Writing(ResponseWriter::new(response), outcome)
                }

                ConnectionState::Writing(writer, outcome) => {
                    writer.write_to_stream(&mut self.stream).await?;
                    self.linger().await;
                    ConnectionState::Closed(outcome)
                }

                ConnectionState::Closed(outcome) => return Ok(outcome),
            };
        }
    }

    /// Reads and parses the request line. Headers and body are never read.
    ///
    /// Non-empty lines are written to the access log before parsing.
    pub async fn read_request_line(&mut self) -> anyhow::Result<Result<RequestLine, ParseError>> {
        let line = match self.read_line().await? {
            Ok(line) => line,
            Err(e) => return Ok(Err(e)),
        };

        if !line.is_empty() {
            self.ctx.sink.access(&self.peer.to_string(), &line);
        }

        Ok(parse_request_line(&line))
    }

    async fn read_line(&mut self) -> anyhow::Result<Result<String, ParseError>> {
        loop {
            if let Some(end) = find_line_end(&self.buffer) {
                if end >= MAX_REQUEST_LINE {
                    return Ok(Err(ParseError::TooLong));
                }
                let raw = self.buffer.split_to(end + 1);
                return Ok(decode_line(&raw[..end]).map(str::to_string));
            }

            if self.buffer.len() >= MAX_REQUEST_LINE {
                return Ok(Err(ParseError::TooLong));
            }

            let n = self.stream.read_buf(&mut self.buffer).await?;

            if n == 0 {
                // Peer closed: an unterminated tail still counts as the line.
                let raw = self.buffer.split();
                return Ok(decode_line(&raw).map(str::to_string));
            }
        }
    }

    async fn route(&self, req: &RequestLine) -> anyhow::Result<(Response, Outcome)> {
        let cfg = &self.ctx.config;

        match site::resolve(&cfg.root, &req.path) {
            Target::Status => {
                let page = status::status_html(self.ctx.counter.active());
                Ok((Response::html_unsized(page), Outcome::Status))
            }

            Target::File(path) => match tokio::fs::metadata(&path).await {
                Ok(meta) if !meta.is_dir() => {
                    let response = site::respond(&path, cfg.media_encoding, &self.ctx.runner).await?;
                    Ok((response, Outcome::Served))
                }
                _ => {
                    self.ctx
                        .sink
                        .error(&format!("file not found: {}", path.display()));
                    Ok((Response::not_found(), Outcome::NotFound))
                }
            },

            Target::Forbidden(path) => {
                self.ctx
                    .sink
                    .error(&format!("refused path outside root: {path}"));
                Ok((Response::not_found(), Outcome::NotFound))
            }
        }
    }

    /// Half-closes the stream, then reads and drops what the client still
    /// sends (headers we never parsed) for a short while. Closing with unread
    /// input would reset the connection and could discard the response.
    async fn linger(&mut self) {
        if self.stream.shutdown().await.is_err() {
            return;
        }

        let mut scratch = [0u8; 4096];
        let mut discarded = 0;
        let drain = async {
            while discarded < LINGER_LIMIT {
                match self.stream.read(&mut scratch).await {
                    Ok(0) | Err(_) => break,
                    Ok(n) => discarded += n,
                }
            }
        };
        let _ = timeout(LINGER_TIMEOUT, drain).await;
    }

    fn report_failure(&self, e: &anyhow::Error) {
        self.ctx
            .sink
            .error(&format!("error handling request from {}: {e:#}", self.peer));

        if is_connection_reset(e) {
            self.ctx
                .sink
                .error(&format!("connection reset by {}: {e}", self.peer));
        }
    }
}

/// Whether the peer dropped the connection under us.
pub fn is_connection_reset(e: &anyhow::Error) -> bool {
    e.chain()
        .filter_map(|cause| cause.downcast_ref::<io::Error>())
        .any(|io| {
            matches!(
                io.kind(),
                io::ErrorKind::ConnectionReset
                    | io::ErrorKind::ConnectionAborted
                    | io::ErrorKind::BrokenPipe
            )
        })
}
