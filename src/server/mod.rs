//! Listener and the state shared by every connection.

pub mod counter;
pub mod listener;

use std::sync::Arc;

use crate::config::Config;
use crate::script::{ProcessRunner, ScriptPolicy};
use crate::telemetry::LogSink;

pub use counter::{ConnectionCounter, ConnectionGuard};
pub use listener::Server;

/// Everything a connection needs, built once at startup.
pub struct ServerContext {
    pub config: Config,
    pub runner: ProcessRunner,
    pub counter: ConnectionCounter,
    pub sink: Arc<dyn LogSink>,
}

impl ServerContext {
    pub fn new(config: Config, sink: Arc<dyn LogSink>) -> Self {
        let runner = ProcessRunner::new(ScriptPolicy::from(&config.scripting));

        Self {
            config,
            runner,
            counter: ConnectionCounter::new(),
            sink,
        }
    }
}
