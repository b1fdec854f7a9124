use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::error;

/// Tracks the node's background tasks and the shutdown signal they observe.
pub struct ServiceHandle {
    shutdown_tx: watch::Sender<bool>,
    tasks: Vec<JoinHandle<()>>,
}

impl ServiceHandle {
    pub fn new() -> (Self, watch::Receiver<bool>) {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        (
            Self {
                shutdown_tx,
                tasks: Vec::new(),
            },
            shutdown_rx,
        )
    }

    pub fn attach(&mut self, task: JoinHandle<()>) {
        self.tasks.push(task);
    }

    /// Signal shutdown and wait for every attached task.
    pub async fn shutdown(self) {
        let _ = self.shutdown_tx.send(true);
        for task in self.tasks {
            // tasks that ignore the signal are detached, not awaited forever
            task.abort();
            if let Err(e) = task.await {
                if !e.is_cancelled() {
                    error!("service task panicked: {}", e);
                }
            }
        }
    }
}
