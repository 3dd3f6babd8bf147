//! Runs one embedded code block through an external interpreter.

use std::process::Stdio;
use std::time::Duration;

use anyhow::{Context, bail};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWriteExt};
use tokio::process::{Child, Command};
use tokio::time::timeout;

use crate::config::ScriptingConfig;

/// Prefix of the text rendered in place of a block that failed to run.
pub const FAILURE_PREFIX: &str = "execution error: ";

/// stderr is only kept for the log line.
const STDERR_CAP: u64 = 4096;

/// Which interpreters may run, and for how long.
#[derive(Debug, Clone)]
pub struct ScriptPolicy {
    pub enabled: bool,
    pub interpreters: Vec<String>,
    pub unrestricted: bool,
    pub timeout: Duration,
    pub max_output_bytes: usize,
}

impl From<&ScriptingConfig> for ScriptPolicy {
    fn from(cfg: &ScriptingConfig) -> Self {
        Self {
            enabled: cfg.enabled,
            interpreters: cfg.interpreters.clone(),
            unrestricted: cfg.unrestricted,
            timeout: Duration::from_millis(cfg.timeout_ms),
            max_output_bytes: cfg.max_output_bytes,
        }
    }
}

impl ScriptPolicy {
    /// A policy allowing exactly the given interpreters, with default limits.
    pub fn allowing<I, S>(interpreters: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            interpreters: interpreters.into_iter().map(Into::into).collect(),
            ..Self::from(&ScriptingConfig::default())
        }
    }

    pub fn permits(&self, interpreter: &str) -> bool {
        self.unrestricted || self.interpreters.iter().any(|name| name == interpreter)
    }
}

/// Spawns interpreters under a [`ScriptPolicy`].
#[derive(Debug, Clone)]
pub struct ProcessRunner {
    policy: ScriptPolicy,
}

impl ProcessRunner {
    pub fn new(policy: ScriptPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> &ScriptPolicy {
        &self.policy
    }

    /// Runs `code` through `interpreter` and returns its standard output,
    /// one `\n` terminated line per output line.
    ///
    /// Never fails: any problem is rendered as `execution error: ...`.
    pub async fn run(&self, interpreter: &str, code: &str) -> String {
        let interpreter = interpreter.trim();

        match self.try_run(interpreter, code).await {
            Ok(stdout) => reassemble_lines(&stdout),
            Err(e) => {
                tracing::warn!(interpreter, error = %format!("{e:#}"), "Code block failed");
                format!("{FAILURE_PREFIX}{e:#}")
            }
        }
    }

    async fn try_run(&self, interpreter: &str, code: &str) -> anyhow::Result<Vec<u8>> {
        if !self.policy.permits(interpreter) {
            bail!("interpreter `{interpreter}` is not permitted");
        }

        let child = spawn(interpreter)?;
        let group = child.id();

        let collected = timeout(self.policy.timeout, self.collect(child, interpreter, code)).await;

        // Background jobs never outlive their block.
        kill_group(group);

        collected.map_err(|_| {
            anyhow::anyhow!(
                "`{interpreter}` timed out after {} ms",
                self.policy.timeout.as_millis()
            )
        })?
    }

    async fn collect(&self, mut child: Child, interpreter: &str, code: &str) -> anyhow::Result<Vec<u8>> {
        let mut stdin = child.stdin.take().context("no stdin handle")?;
        let stdout = child.stdout.take().context("no stdout handle")?;
        let stderr = child.stderr.take().context("no stderr handle")?;

        // Ends once every process holding stderr is gone.
        let stderr_task = tokio::spawn(drain_capped(stderr, STDERR_CAP));

        // Feed and drain at the same time so neither pipe can fill up and stall.
        let feed = async move {
            stdin.write_all(code.as_bytes()).await?;
            stdin.shutdown().await
        };
        let limit = self.policy.max_output_bytes;
        let (fed, out) = tokio::join!(feed, read_capped(stdout, limit as u64 + 1));

        fed.with_context(|| format!("writing code to `{interpreter}`"))?;
        let out = out.with_context(|| format!("reading output of `{interpreter}`"))?;

        if out.len() > limit {
            bail!("`{interpreter}` produced more than {limit} bytes of output");
        }

        let status = child
            .wait()
            .await
            .with_context(|| format!("waiting for `{interpreter}`"))?;

        if !status.success() {
            if let Ok(Ok(err)) = stderr_task.await {
                let err = String::from_utf8_lossy(&err);
                tracing::debug!(interpreter, stderr = %err.trim_end(), "Interpreter stderr");
            }
            bail!("`{interpreter}` exited with {status}");
        }

        Ok(out)
    }
}

/// Starts `interpreter` with piped stdio, leading a process group of its own.
fn spawn(interpreter: &str) -> anyhow::Result<Child> {
    let mut command = Command::new(interpreter);
    command
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    #[cfg(unix)]
    command.process_group(0);

    command
        .spawn()
        .with_context(|| format!("cannot start `{interpreter}`"))
}

/// Sends SIGKILL to the process group led by `leader`.
#[cfg(unix)]
fn kill_group(leader: Option<u32>) {
    use nix::sys::signal::{Signal, killpg};
    use nix::unistd::Pid;

    let Some(pid) = leader.and_then(|id| i32::try_from(id).ok()) else {
        return;
    };
    // ESRCH: the whole group already exited.
    if let Err(e) = killpg(Pid::from_raw(pid), Signal::SIGKILL) {
        tracing::debug!(pid, error = %e, "Could not kill interpreter process group");
    }
}

#[cfg(not(unix))]
fn kill_group(_leader: Option<u32>) {}

async fn read_capped<R>(reader: R, cap: u64) -> std::io::Result<Vec<u8>>
where
    R: AsyncRead + Unpin,
{
    let mut buf = Vec::new();
    reader.take(cap).read_to_end(&mut buf).await?;
    Ok(buf)
}

/// Keeps the first `cap` bytes and discards the rest until EOF.
async fn drain_capped<R>(mut reader: R, cap: u64) -> std::io::Result<Vec<u8>>
where
    R: AsyncRead + Unpin,
{
    let mut buf = Vec::new();
    (&mut reader).take(cap).read_to_end(&mut buf).await?;
    tokio::io::copy(&mut reader, &mut tokio::io::sink()).await?;
    Ok(buf)
}

/// Splits captured output into lines and terminates each with `\n`.
fn reassemble_lines(raw: &[u8]) -> String {
    let text = String::from_utf8_lossy(raw);
    let mut out = String::with_capacity(text.len() + 1);

    for line in text.lines() {
        out.push_str(line);
        out.push('\n');
    }
    out
}
