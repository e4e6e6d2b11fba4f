//! Error hierarchy for the cluster-frame lifecycle.
//!
//! Fatal variants (see [`FrameError::is_fatal`]) unwind a frame's activation
//! sequence. The rest are raised at their origin and converted to a log line
//! or a user warning there.

use std::time::Duration;

use thiserror::Error;

use crate::ids::ClusterId;

/// Failure of a cluster's readiness signal.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ReadinessError {
    /// The cluster reported that activation failed.
    #[error("cluster {cluster_id} failed to become ready: {reason}")]
    Failed {
        /// Cluster whose activation failed.
        cluster_id: ClusterId,
        /// Reason reported by the readiness producer.
        reason: String,
    },

    /// The producer of the signal went away before settling it.
    #[error("readiness signal for cluster {cluster_id} was dropped before settling")]
    SignalDropped {
        /// Cluster whose signal was abandoned.
        cluster_id: ClusterId,
    },
}

/// Errors raised while mounting, activating, or tearing down a cluster frame.
#[derive(Clone, Debug, Error)]
pub enum FrameError {
    /// The hosted cluster never became ready.
    #[error(transparent)]
    Readiness(#[from] ReadinessError),

    /// The host process rejected the frame id registration.
    #[error("failed to register frame for cluster {cluster_id}: {reason}")]
    FrameIdRegistration {
        /// Cluster the frame belongs to.
        cluster_id: ClusterId,
        /// Rejection reason from the host.
        reason: String,
    },

    /// The catalog stayed empty past the deadline.
    #[error("catalog was not populated within {timeout:?}")]
    CatalogTimeout {
        /// Deadline that elapsed.
        timeout: Duration,
    },

    /// The telemetry sink rejected an event.
    #[error("event emission failed: {0}")]
    Emission(String),

    /// A catalog watch was started while another one was still in flight.
    #[error("a catalog watch is already in progress")]
    WatchInProgress,
}

impl FrameError {
    /// Whether this error aborts the activation sequence.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::Readiness(_) | Self::FrameIdRegistration { .. } | Self::WatchInProgress
        )
    }

    /// Short classification string for logging.
    pub fn category(&self) -> &'static str {
        match self {
            Self::Readiness(_) => "readiness",
            Self::FrameIdRegistration { .. } => "frame_id_registration",
            Self::CatalogTimeout { .. } => "catalog_timeout",
            Self::Emission(_) => "emission",
            Self::WatchInProgress => "watch_in_progress",
        }
    }
}

/// Result type for frame operations.
pub type Result<T> = std::result::Result<T, FrameError>;
