//! Periodic background rebuild of the lexical fallback snapshot.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{broadcast, mpsc};
use tokio::time::sleep;
use tracing::{info, instrument, warn};

use ragline_core::{defaults, Error, Result};

use crate::hybrid::HybridRetrieval;
use crate::lexical::InitOutcome;

/// Event emitted by the refresh task.
#[derive(Debug, Clone, PartialEq)]
pub enum RefreshEvent {
    /// Task started.
    Started,
    /// A new snapshot was installed.
    Refreshed { documents: usize },
    /// Nothing to load (index missing, empty, or no backend).
    Skipped,
    /// A rebuild failed; the previous snapshot is still in use.
    Failed { error: String },
    /// Task stopped.
    Stopped,
}

/// Handle for controlling a running refresh task.
pub struct RefreshHandle {
    shutdown_tx: mpsc::Sender<()>,
    event_rx: broadcast::Receiver<RefreshEvent>,
}

impl RefreshHandle {
    /// Signal the task to stop after the current cycle.
    pub async fn shutdown(&self) -> Result<()> {
        self.shutdown_tx
            .send(())
            .await
            .map_err(|_| Error::Internal("Failed to send shutdown signal".into()))?;
        Ok(())
    }

    /// Get a receiver for refresh events.
    pub fn events(&self) -> broadcast::Receiver<RefreshEvent> {
        self.event_rx.resubscribe()
    }
}

/// Spawn a task that calls `initialize()` every `interval`, starting
/// immediately.
pub fn spawn_refresh(retriever: Arc<dyn HybridRetrieval>, interval: Duration) -> RefreshHandle {
    let (shutdown_tx, mut shutdown_rx) = mpsc::channel(1);
    let (event_tx, event_rx) = broadcast::channel(defaults::EVENT_BUS_CAPACITY);

    tokio::spawn(async move {
        run(retriever, interval, &event_tx, &mut shutdown_rx).await;
    });

    RefreshHandle {
        shutdown_tx,
        event_rx,
    }
}

#[instrument(skip_all, fields(subsystem = "search", component = "refresh", interval_secs = interval.as_secs()))]
async fn run(
    retriever: Arc<dyn HybridRetrieval>,
    interval: Duration,
    event_tx: &broadcast::Sender<RefreshEvent>,
    shutdown_rx: &mut mpsc::Receiver<()>,
) {
    info!("Fallback refresh started");
    let _ = event_tx.send(RefreshEvent::Started);

    loop {
        let event = match retriever.initialize().await {
            Ok(InitOutcome::Loaded { documents }) => RefreshEvent::Refreshed { documents },
            Ok(_) => RefreshEvent::Skipped,
            Err(e) => {
                warn!(error = %e, "Fallback refresh cycle failed");
                RefreshEvent::Failed {
                    error: e.to_string(),
                }
            }
        };
        let _ = event_tx.send(event);

        tokio::select! {
            _ = shutdown_rx.recv() => {
                info!("Fallback refresh received shutdown signal");
                break;
            }
            _ = sleep(interval) => {}
        }
    }

    let _ = event_tx.send(RefreshEvent::Stopped);
    info!("Fallback refresh stopped");
}
