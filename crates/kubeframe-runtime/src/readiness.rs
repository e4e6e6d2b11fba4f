//! Cluster readiness signal and the gate that awaits it.
//!
//! A signal settles exactly once, to either ready or failed. Later attempts
//! to settle it are ignored, so awaiting it any number of times yields the
//! same result.

use kubeframe_core::{ClusterId, ReadinessError};
use tokio::sync::watch;

#[derive(Clone, Debug, PartialEq, Eq)]
enum ReadinessState {
    Pending,
    Ready,
    Failed(String),
}

/// Producer side of a readiness signal, held by whatever activates the cluster.
#[derive(Debug)]
pub struct ReadinessHandle {
    tx: watch::Sender<ReadinessState>,
}

impl ReadinessHandle {
    /// Settle the signal as ready. Returns `false` if it was already settled.
    pub fn mark_ready(&self) -> bool {
        self.settle(ReadinessState::Ready)
    }

    /// Settle the signal as failed. Returns `false` if it was already settled.
    pub fn fail(&self, reason: impl Into<String>) -> bool {
        self.settle(ReadinessState::Failed(reason.into()))
    }

    fn settle(&self, next: ReadinessState) -> bool {
        self.tx.send_if_modified(|current| {
            if *current == ReadinessState::Pending {
                *current = next;
                true
            } else {
                false
            }
        })
    }
}

/// Consumer side of a readiness signal. Cheap to clone.
#[derive(Clone, Debug)]
pub struct ReadinessSignal {
    cluster_id: ClusterId,
    rx: watch::Receiver<ReadinessState>,
}

impl ReadinessSignal {
    /// Create a pending signal and the handle that settles it.
    pub fn new(cluster_id: ClusterId) -> (ReadinessHandle, Self) {
        let (tx, rx) = watch::channel(ReadinessState::Pending);
        (ReadinessHandle { tx }, Self { cluster_id, rx })
    }

    /// Whether the signal has settled as ready.
    pub fn is_ready(&self) -> bool {
        *self.rx.borrow() == ReadinessState::Ready
    }

    /// Wait for the signal to settle.
    ///
    /// A handle dropped while still pending counts as a failure of the
    /// readiness mechanism itself.
    pub async fn wait(&self) -> Result<(), ReadinessError> {
        let mut rx = self.rx.clone();
        let settled = rx
            .wait_for(|state| *state != ReadinessState::Pending)
            .await
            .map(|state| state.clone());

        match settled {
            Ok(ReadinessState::Failed(reason)) => Err(ReadinessError::Failed {
                cluster_id: self.cluster_id.clone(),
                reason,
            }),
            Ok(_) => Ok(()),
            Err(_) => Err(ReadinessError::SignalDropped {
                cluster_id: self.cluster_id.clone(),
            }),
        }
    }
}

/// The cluster a frame hosts: an immutable id plus its readiness signal.
#[derive(Clone, Debug)]
pub struct ClusterContext {
    id: ClusterId,
    when_ready: ReadinessSignal,
}

impl ClusterContext {
    /// Create a context whose readiness is settled through the returned handle.
    pub fn new(id: ClusterId) -> (Self, ReadinessHandle) {
        let (handle, when_ready) = ReadinessSignal::new(id.clone());
        (Self { id, when_ready }, handle)
    }

    /// The hosted cluster's id.
    pub fn id(&self) -> &ClusterId {
        &self.id
    }

    /// The readiness signal.
    pub fn when_ready(&self) -> &ReadinessSignal {
        &self.when_ready
    }
}

/// Wait until the cluster is ready, propagating a failed readiness unchanged.
pub async fn await_ready(context: &ClusterContext) -> Result<(), ReadinessError> {
    context.when_ready.wait().await
}
