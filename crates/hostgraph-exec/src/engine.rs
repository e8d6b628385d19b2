//! Execution engine — launch, preempt, stream, persist
//!
//! One invocation = one pump task that owns the child process. The pump
//! forwards each output line to the live channel and appends it, unmodified,
//! to the in-memory transcript. Whatever happens mid-stream, exactly once per
//! invocation and in this order: the transcript is persisted, the registry
//! entry is released, and the trailing status line is emitted.
//!
//! A caller dropping the live stream does not stop the process. Sends onto a
//! closed channel are ignored and the pump runs the invocation to completion,
//! so the transcript is persisted whether or not anyone watched it finish.

use crate::process::ProcessHandle;
use crate::registry::{ExecRegistry, RunningExec};
use bytes::Bytes;
use hostgraph_core::{Error, NodeId, Result, TranscriptStore};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Exit code reported when the output channel failed mid-stream.
const STREAM_ERROR_EXIT_CODE: i32 = 1;

pub struct ExecEngine {
    registry: Arc<ExecRegistry>,
    store: Arc<dyn TranscriptStore>,
}

impl ExecEngine {
    pub fn new(store: Arc<dyn TranscriptStore>) -> Self {
        Self {
            registry: Arc::new(ExecRegistry::new()),
            store,
        }
    }

    pub fn registry(&self) -> &Arc<ExecRegistry> {
        &self.registry
    }

    /// Start `command` for `node_id`, preempting any invocation already
    /// running there, and return the live output stream: zero or more raw
    /// output chunks, then exactly one status line.
    ///
    /// Fails before anything is launched or registered on an empty command
    /// (`Error::Validation`) or a spawn failure (`Error::Launch`) — those are
    /// the only paths that persist nothing.
    pub fn execute(&self, node_id: &NodeId, command: &str) -> Result<ReceiverStream<Bytes>> {
        let command = command.trim();
        if command.is_empty() {
            return Err(Error::validation("command required"));
        }

        let proc = ProcessHandle::launch(command)?;

        let exec = RunningExec::new();
        let invocation = exec.invocation;
        let cancel = exec.cancel_token();
        if let Some(prev) = self.registry.register(node_id, exec) {
            debug!(
                "Preempting invocation {} on {} for {}",
                prev.invocation, node_id, invocation
            );
            prev.terminate();
        }
        info!("Executing on {}: {}", node_id, command);

        let (tx, rx) = mpsc::channel::<Bytes>(64);
        tokio::spawn(pump(
            proc,
            node_id.clone(),
            command.to_string(),
            invocation,
            cancel,
            Arc::clone(&self.registry),
            Arc::clone(&self.store),
            tx,
        ));

        Ok(ReceiverStream::new(rx))
    }
}

#[allow(clippy::too_many_arguments)]
async fn pump(
    mut proc: ProcessHandle,
    node_id: NodeId,
    command: String,
    invocation: Uuid,
    cancel: CancellationToken,
    registry: Arc<ExecRegistry>,
    store: Arc<dyn TranscriptStore>,
    tx: mpsc::Sender<Bytes>,
) {
    let mut transcript = String::new();
    let mut kill_sent = false;
    // Set only on the stream-error path; otherwise wait() supplies the code.
    let mut sentinel_code: Option<i32> = None;

    loop {
        tokio::select! {
            chunk = proc.next_chunk() => match chunk {
                Some(Ok(line)) => {
                    transcript.push_str(&line);
                    let _ = tx.send(Bytes::from(line)).await;
                }
                Some(Err(e)) => {
                    // Recovered locally: fold the failure into the transcript
                    // and finish with a sentinel code instead of aborting the
                    // invocation.
                    warn!("Stream read failed on {}: {}", node_id, e);
                    let marker = format!("\n[ERROR] {}\n", e);
                    transcript.push_str(&marker);
                    let _ = tx.send(Bytes::from(marker)).await;
                    sentinel_code = Some(STREAM_ERROR_EXIT_CODE);
                    break;
                }
                None => break,
            },
            _ = cancel.cancelled(), if !kill_sent => {
                // Preempted. Kill once, then keep draining: the pipes close
                // shortly after and this invocation still persists whatever
                // it produced.
                debug!("Invocation {} on {} terminated by preemption", invocation, node_id);
                kill_sent = true;
                proc.start_kill();
            }
        }
    }

    let code = match sentinel_code {
        Some(code) => code,
        None => proc.wait().await,
    };

    if !store.persist_command(node_id.as_str(), &command, &transcript) {
        warn!("Transcript dropped: node {} unknown to the store", node_id);
    }
    registry.release(&node_id, invocation);
    let _ = tx
        .send(Bytes::from(format!(
            "\n=== Command finished with return code {} ===\n",
            code
        )))
        .await;
    debug!("Invocation {} on {} finished with code {}", invocation, node_id, code);
}
