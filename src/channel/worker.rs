// ── Worker / Queue Bridge ────────────────────────────────────────────────────
// The provider's event loop runs on a single dedicated worker; the core talks
// to it strictly through two bounded FIFO queues. See SPEC_FULL.md §4.6.1.

use std::time::Duration;

use serde_json::Value;
use tokio::sync::{mpsc, oneshot};
use tokio::time::timeout;

const COMMAND_QUEUE_CAPACITY: usize = 256;
pub const DEFAULT_SEND_TIMEOUT: Duration = Duration::from_secs(10);
pub const WORKER_TICK_INTERVAL: Duration = Duration::from_millis(100);

#[derive(Debug)]
pub struct SendRequest {
    pub recipient: String,
    pub text: String,
    pub rich: Option<Value>,
    pub action_row: Option<Value>,
}

/// Core -> worker command queue payload.
pub enum WorkerCommand {
    Send(SendRequest, oneshot::Sender<bool>),
    Stop,
}

/// Handle held by the core side; cloned freely.
#[derive(Clone)]
pub struct WorkerHandle {
    tx: mpsc::Sender<WorkerCommand>,
}

impl WorkerHandle {
    pub fn new(tx: mpsc::Sender<WorkerCommand>) -> Self {
        Self { tx }
    }

    /// Synchronous-from-the-caller's-view send: enqueue, then wait up to
    /// `timeout_duration` for the result. On timeout returns `false` without
    /// rolling back the enqueue (SPEC_FULL.md §4.6.1).
    pub async fn send_message(&self, request: SendRequest, timeout_duration: Duration) -> bool {
        let (result_tx, result_rx) = oneshot::channel();
        if self.tx.send(WorkerCommand::Send(request, result_tx)).await.is_err() {
            return false;
        }
        match timeout(timeout_duration, result_rx).await {
            Ok(Ok(ok)) => ok,
            _ => false,
        }
    }

    pub async fn stop(&self) {
        let _ = self.tx.send(WorkerCommand::Stop).await;
    }
}

/// Construct the command channel. Returns the core-facing handle and the
/// worker-facing receiver to be driven by the provider's event loop.
pub fn make_command_channel() -> (WorkerHandle, mpsc::Receiver<WorkerCommand>) {
    let (tx, rx) = mpsc::channel(COMMAND_QUEUE_CAPACITY);
    (WorkerHandle::new(tx), rx)
}

/// Drain all currently-pending commands without blocking, dispatching sends
/// through `send_fn`. Called once per worker tick alongside polling the
/// provider's own event stream (SPEC_FULL.md §4.6.1 cooperative interleave).
pub async fn drain_pending<F, Fut>(rx: &mut mpsc::Receiver<WorkerCommand>, mut send_fn: F) -> bool
where
    F: FnMut(SendRequest) -> Fut,
    Fut: std::future::Future<Output = bool>,
{
    loop {
        match rx.try_recv() {
            Ok(WorkerCommand::Send(request, result_tx)) => {
                let ok = send_fn(request).await;
                let _ = result_tx.send(ok);
            }
            Ok(WorkerCommand::Stop) => return true,
            Err(mpsc::error::TryRecvError::Empty) => return false,
            Err(mpsc::error::TryRecvError::Disconnected) => return true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn send_message_returns_true_on_successful_result() {
        let (handle, mut rx) = make_command_channel();
        tokio::spawn(async move {
            if let Some(WorkerCommand::Send(_, result_tx)) = rx.recv().await {
                let _ = result_tx.send(true);
            }
        });
        let ok = handle
            .send_message(
                SendRequest { recipient: "123".into(), text: "hi".into(), rich: None, action_row: None },
                Duration::from_secs(1),
            )
            .await;
        assert!(ok);
    }

    #[tokio::test]
    async fn send_message_times_out_without_rolling_back_enqueue() {
        let (handle, _rx) = make_command_channel();
        let ok = handle
            .send_message(
                SendRequest { recipient: "123".into(), text: "hi".into(), rich: None, action_row: None },
                Duration::from_millis(20),
            )
            .await;
        assert!(!ok);
    }

    #[tokio::test]
    async fn drain_pending_processes_all_queued_sends_then_returns() {
        let (handle, mut rx) = make_command_channel();
        let req = SendRequest { recipient: "1".into(), text: "a".into(), rich: None, action_row: None };
        let _ = tokio::time::timeout(Duration::from_millis(50), handle.send_message(req, Duration::from_millis(500)));
        tokio::task::yield_now().await;

        let stop = drain_pending(&mut rx, |_req| async { true }).await;
        assert!(!stop);
    }

    #[tokio::test]
    async fn drain_pending_reports_stop_command() {
        let (handle, mut rx) = make_command_channel();
        handle.stop().await;
        let stop = drain_pending(&mut rx, |_req| async { true }).await;
        assert!(stop);
    }
}
