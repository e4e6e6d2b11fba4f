//! Host-side services a cluster frame calls out to.

use async_trait::async_trait;
use kubeframe_core::{AppEvent, ClusterId};
use kubeframe_logging::{FileLogSink, LoggingGuard};
use tokio::sync::broadcast;

/// Failure reported by a collaborator.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[error("{0}")]
pub struct CollaboratorError(pub String);

/// Loads extensions into the frame. Called at most once per mount.
pub trait ExtensionLoader: Send + Sync {
    /// Load all enabled extensions.
    fn load_extensions(&self);
}

impl<F> ExtensionLoader for F
where
    F: Fn() + Send + Sync,
{
    fn load_extensions(&self) {
        self();
    }
}

/// The process hosting the frame.
#[async_trait]
pub trait FrameHost: Send + Sync {
    /// Tell the host which frame renders `cluster_id`.
    async fn request_set_frame_id(&self, cluster_id: &ClusterId) -> Result<(), CollaboratorError>;
}

/// Fire-and-forget telemetry sink.
pub trait EventSink: Send + Sync {
    /// Publish an event.
    fn emit(&self, event: AppEvent) -> Result<(), CollaboratorError>;
}

/// [`EventSink`] backed by a broadcast channel.
#[derive(Clone, Debug)]
pub struct BroadcastEventSink {
    tx: broadcast::Sender<AppEvent>,
}

impl BroadcastEventSink {
    /// Wrap an existing channel.
    pub fn new(tx: broadcast::Sender<AppEvent>) -> Self {
        Self { tx }
    }

    /// Subscribe to emitted events.
    pub fn subscribe(&self) -> broadcast::Receiver<AppEvent> {
        self.tx.subscribe()
    }
}

impl EventSink for BroadcastEventSink {
    fn emit(&self, event: AppEvent) -> Result<(), CollaboratorError> {
        self.tx
            .send(event)
            .map(|_| ())
            .map_err(|_| CollaboratorError("no event receivers".into()))
    }
}

/// User-facing notifications.
pub trait Notifier: Send + Sync {
    /// Show a warning to the user.
    fn show_warning(&self, message: &str);
}

impl<F> Notifier for F
where
    F: Fn(&str) + Send + Sync,
{
    fn show_warning(&self, message: &str) {
        self(message);
    }
}

/// Log file owned by the frame.
pub trait FileLogging: Send + Sync {
    /// Flush and close the log file.
    fn close_file_logging(&self);
}

impl FileLogging for LoggingGuard {
    fn close_file_logging(&self) {
        LoggingGuard::close_file_logging(self);
    }
}

impl FileLogging for FileLogSink {
    fn close_file_logging(&self) {
        let _ = self.close();
    }
}
