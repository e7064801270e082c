//! Stdio transport for one tool-server process.
//!
//! Strict request/response: write one request line, then read lines until the
//! matching response arrives. Notifications and server-initiated requests that
//! show up first are logged and skipped.

use crate::config::McpServerConfig;
use crate::error::McpError;
use crate::jsonrpc::{JsonRpcMessage, JsonRpcRequest, MessageKind};
use std::process::Stdio;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, Lines};
use tokio::process::{Child, ChildStdin, ChildStdout, Command};

/// A running tool-server process and its line-oriented streams.
pub struct ServerProcess {
    name: String,
    child: Child,
    stdin: Option<ChildStdin>,
    stdout: Lines<BufReader<ChildStdout>>,
    timeout_ms: u64,
    requests_sent: u64,
}

impl ServerProcess {
    /// Spawn the configured command with its extra environment merged over ours.
    pub fn spawn(name: &str, config: &McpServerConfig) -> Result<Self, McpError> {
        let mut cmd = Command::new(&config.command);
        cmd.args(&config.args)
            .envs(&config.env)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .kill_on_drop(true);

        let spawn_failed = |source| McpError::SpawnFailed {
            name: name.to_string(),
            source,
        };

        let mut child = cmd.spawn().map_err(spawn_failed)?;

        let stdin = child.stdin.take().ok_or_else(|| {
            spawn_failed(std::io::Error::other("stdin was not captured"))
        })?;
        let stdout = child.stdout.take().ok_or_else(|| {
            spawn_failed(std::io::Error::other("stdout was not captured"))
        })?;

        let mut extra_env: Vec<&str> = config.env.keys().map(String::as_str).collect();
        extra_env.sort_unstable();
        tracing::debug!(
            "Spawned tool server '{}' (pid {:?}): {} {:?}, extra env {:?}",
            name,
            child.id(),
            config.command,
            config.args,
            extra_env
        );

        Ok(Self {
            name: name.to_string(),
            child,
            stdin: Some(stdin),
            stdout: BufReader::new(stdout).lines(),
            timeout_ms: config.timeout_ms,
            requests_sent: 0,
        })
    }

    /// Whether nothing has been written to this process yet.
    pub fn is_fresh(&self) -> bool {
        self.requests_sent == 0
    }

    /// Send one request and wait for the response that answers it.
    pub async fn request(
        &mut self,
        id: u64,
        method: &str,
        params: serde_json::Value,
    ) -> Result<JsonRpcMessage, McpError> {
        let request = JsonRpcRequest::new(id, method, params);
        let mut line = serde_json::to_string(&request)?;
        line.push('\n');
        tracing::debug!("-> {}: {}", self.name, line.trim_end());

        self.requests_sent += 1;
        self.write_line(&line).await?;

        let timeout = Duration::from_millis(self.timeout_ms);
        match tokio::time::timeout(timeout, self.read_response(id)).await {
            Ok(result) => result,
            Err(_) => Err(McpError::Timeout {
                name: self.name.clone(),
                timeout_ms: self.timeout_ms,
            }),
        }
    }

    async fn write_line(&mut self, line: &str) -> Result<(), McpError> {
        let stdin = self.stdin.as_mut().ok_or_else(|| McpError::NoResponse {
            name: self.name.clone(),
        })?;
        let written = async {
            stdin.write_all(line.as_bytes()).await?;
            stdin.flush().await
        }
        .await;

        match written {
            Ok(()) => Ok(()),
            // The process is gone; there will be no answer.
            Err(e) if e.kind() == std::io::ErrorKind::BrokenPipe => Err(McpError::NoResponse {
                name: self.name.clone(),
            }),
            Err(e) => Err(McpError::Io(e)),
        }
    }

    async fn read_response(&mut self, id: u64) -> Result<JsonRpcMessage, McpError> {
        loop {
            let Some(line) = self.stdout.next_line().await? else {
                return Err(McpError::NoResponse {
                    name: self.name.clone(),
                });
            };
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            tracing::debug!("<- {}: {}", self.name, line);

            let message: JsonRpcMessage =
                serde_json::from_str(line).map_err(|e| McpError::Protocol {
                    name: self.name.clone(),
                    message: format!("unparseable line: {e}"),
                })?;

            match message.kind() {
                MessageKind::Response if message.answers(id) => return Ok(message),
                MessageKind::Response => {
                    tracing::warn!(
                        "Skipping stale response {:?} from '{}' (waiting for id {id})",
                        message.id,
                        self.name
                    );
                }
                MessageKind::Notification => {
                    tracing::debug!(
                        "Skipping notification '{}' from '{}'",
                        message.method.as_deref().unwrap_or_default(),
                        self.name
                    );
                }
                MessageKind::Request => {
                    tracing::warn!(
                        "Ignoring server-initiated request '{}' from '{}'",
                        message.method.as_deref().unwrap_or_default(),
                        self.name
                    );
                }
            }
        }
    }

    /// Close stdin and send SIGTERM, give the process `grace` to exit, then kill it.
    pub async fn shutdown(mut self, grace: Duration) {
        drop(self.stdin.take());
        self.terminate();

        match tokio::time::timeout(grace, self.child.wait()).await {
            Ok(Ok(status)) => {
                tracing::debug!("Tool server '{}' exited: {status}", self.name);
            }
            Ok(Err(e)) => {
                tracing::warn!("Failed to wait for tool server '{}': {e}", self.name);
            }
            Err(_) => {
                tracing::warn!(
                    "Tool server '{}' did not exit within {}ms, killing",
                    self.name,
                    grace.as_millis()
                );
                if let Err(e) = self.child.kill().await {
                    tracing::warn!("Failed to kill tool server '{}': {e}", self.name);
                }
            }
        }
    }

    #[cfg(unix)]
    fn terminate(&self) {
        use nix::sys::signal::{Signal, kill};
        use nix::unistd::Pid;

        // No pid once the child has been reaped.
        let Some(pid) = self.child.id() else {
            return;
        };
        let Ok(pid) = i32::try_from(pid) else {
            return;
        };
        if let Err(e) = kill(Pid::from_raw(pid), Signal::SIGTERM) {
            tracing::debug!("SIGTERM to tool server '{}' failed: {e}", self.name);
        }
    }

    #[cfg(not(unix))]
    fn terminate(&self) {}
}
