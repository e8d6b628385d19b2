//! Process handle — one spawned shell command and its merged output channel

use hostgraph_core::{Error, Result};
use std::process::Stdio;
use tokio::io::{AsyncBufReadExt, BufReader, Lines};
use tokio::process::{Child, ChildStderr, ChildStdout, Command};
use tracing::debug;

/// A launched `sh -c` child. Stdout and stderr are both piped and merged into
/// a single line channel in arrival order.
pub struct ProcessHandle {
    child: Child,
    stdout: Lines<BufReader<ChildStdout>>,
    stderr: Lines<BufReader<ChildStderr>>,
    stdout_done: bool,
    stderr_done: bool,
}

impl ProcessHandle {
    /// Spawn `command` under the shell. Fails with `Error::Launch` if the
    /// process cannot be started at all.
    pub fn launch(command: &str) -> Result<Self> {
        // Truncate on char boundaries; commands are operator input and can
        // carry multibyte text anywhere, including at byte 80.
        debug!("launch: {}", command.chars().take(80).collect::<String>());
        let mut child = Command::new("sh")
            .arg("-c")
            .arg(command)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| Error::launch(e.to_string()))?;

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| Error::launch("child stdout not captured"))?;
        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| Error::launch("child stderr not captured"))?;

        Ok(Self {
            child,
            stdout: BufReader::new(stdout).lines(),
            stderr: BufReader::new(stderr).lines(),
            stdout_done: false,
            stderr_done: false,
        })
    }

    /// Next line of output (newline-terminated) from either pipe, in arrival
    /// order. `None` once both pipes are exhausted. Read failures surface as
    /// `Error::StreamRead` items; the affected pipe is treated as exhausted.
    ///
    /// Chunks are normalized lines, not raw bytes: `next_line` strips a `\r`
    /// from CRLF endings, and every chunk (including a final unterminated
    /// line) is re-terminated with a single `\n`.
    ///
    /// Cancel-safe: `next_line` never loses a partially read line.
    pub async fn next_chunk(&mut self) -> Option<Result<String>> {
        loop {
            if self.stdout_done && self.stderr_done {
                return None;
            }
            tokio::select! {
                line = self.stdout.next_line(), if !self.stdout_done => match line {
                    Ok(Some(mut l)) => {
                        l.push('\n');
                        return Some(Ok(l));
                    }
                    Ok(None) => self.stdout_done = true,
                    Err(e) => {
                        self.stdout_done = true;
                        return Some(Err(Error::StreamRead(e.to_string())));
                    }
                },
                line = self.stderr.next_line(), if !self.stderr_done => match line {
                    Ok(Some(mut l)) => {
                        l.push('\n');
                        return Some(Ok(l));
                    }
                    Ok(None) => self.stderr_done = true,
                    Err(e) => {
                        self.stderr_done = true;
                        return Some(Err(Error::StreamRead(e.to_string())));
                    }
                },
            }
        }
    }

    /// Request termination without waiting for the process to die.
    pub fn start_kill(&mut self) {
        if let Err(e) = self.child.start_kill() {
            debug!("start_kill: {}", e);
        }
    }

    /// Block until the process has fully exited. Signal deaths (no exit code)
    /// and wait failures map to -1.
    pub async fn wait(&mut self) -> i32 {
        match self.child.wait().await {
            Ok(status) => status.code().unwrap_or(-1),
            Err(_) => -1,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn launch_and_read_stdout() {
        let mut proc = ProcessHandle::launch("echo hello").unwrap();
        let chunk = proc.next_chunk().await.unwrap().unwrap();
        assert_eq!(chunk, "hello\n");
        assert!(proc.next_chunk().await.is_none());
        assert_eq!(proc.wait().await, 0);
    }

    #[tokio::test]
    async fn stderr_is_merged() {
        let mut proc = ProcessHandle::launch("echo err >&2").unwrap();
        let chunk = proc.next_chunk().await.unwrap().unwrap();
        assert_eq!(chunk, "err\n");
        assert!(proc.next_chunk().await.is_none());
        assert_eq!(proc.wait().await, 0);
    }

    #[tokio::test]
    async fn nonzero_exit_code() {
        let mut proc = ProcessHandle::launch("exit 3").unwrap();
        assert!(proc.next_chunk().await.is_none());
        assert_eq!(proc.wait().await, 3);
    }

    #[tokio::test]
    async fn launch_logs_long_multibyte_command() {
        // Debug logging formats a truncated preview of the command; with a
        // subscriber at debug level that must not split a multibyte char.
        let subscriber = tracing_subscriber::fmt()
            .with_max_level(tracing::Level::DEBUG)
            .with_writer(std::io::sink)
            .finish();
        let _guard = tracing::subscriber::set_default(subscriber);

        let command = format!("echo {}", "é".repeat(50));
        let mut proc = ProcessHandle::launch(&command).unwrap();
        while proc.next_chunk().await.is_some() {}
        assert_eq!(proc.wait().await, 0);
    }

    #[tokio::test]
    async fn kill_closes_the_channel() {
        let mut proc = ProcessHandle::launch("sleep 30").unwrap();
        proc.start_kill();
        assert!(proc.next_chunk().await.is_none());
        // Killed by signal, no exit code.
        assert_eq!(proc.wait().await, -1);
    }
}
