use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use tokio::net::TcpListener;
use tracing::info;

use crate::config::Config;
use crate::http::connection::Connection;
use crate::server::{ConnectionCounter, ServerContext};
use crate::telemetry::LogSink;

/// Pause after a failed accept, e.g. when out of file descriptors.
const ACCEPT_BACKOFF: Duration = Duration::from_millis(100);

pub struct Server {
    listener: TcpListener,
    ctx: Arc<ServerContext>,
}

impl Server {
    pub async fn bind(cfg: Config, sink: Arc<dyn LogSink>) -> anyhow::Result<Self> {
        let addr = cfg.listen_addr();
        let listener = TcpListener::bind(&addr)
            .await
            .with_context(|| format!("binding {addr}"))?;

        Ok(Self {
            listener,
            ctx: Arc::new(ServerContext::new(cfg, sink)),
        })
    }

    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// A handle on the live connection count.
    pub fn connections(&self) -> ConnectionCounter {
        self.ctx.counter.clone()
    }

    /// Accepts connections forever, one task each.
    pub async fn run(self) -> anyhow::Result<()> {
        info!(
            "Listening on {}, serving {}",
            self.local_addr()?,
            self.ctx.config.root.display()
        );

        loop {
            let (socket, peer) = match self.listener.accept().await {
                Ok(accepted) => accepted,
                Err(e) => {
                    tracing::error!(error = %e, "Accept failed");
                    tokio::time::sleep(ACCEPT_BACKOFF).await;
                    continue;
                }
            };
            tracing::debug!("Accepted connection from {}", peer);

            let ctx = Arc::clone(&self.ctx);
            tokio::spawn(async move {
                let conn = Connection::new(socket, peer.ip(), ctx);
                if let Some(outcome) = conn.serve().await {
                    tracing::debug!(%peer, ?outcome, "Connection closed");
                }
            });
        }
    }
}

pub async fn run(cfg: Config, sink: Arc<dyn LogSink>) -> anyhow::Result<()> {
    Server::bind(cfg, sink).await?.run().await
}
