//! # kubeframe-runtime
//!
//! Brings a mounted cluster frame to a ready state and tears it down.
//!
//! - [`readiness`]: one-shot "cluster is ready" signal and its gate
//! - [`catalog`]: observable entity catalog with an active-entity pointer
//! - [`watcher`]: resolve once the catalog is non-empty, or time out
//! - [`frame`]: the activation sequence run once per mount
//! - [`shutdown`]: at-most-once teardown driven by window unload signals
//! - [`collaborators`]: traits for the host-side services a frame calls

#![deny(unsafe_code)]

pub mod catalog;
pub mod collaborators;
pub mod frame;
pub mod readiness;
pub mod shutdown;
pub mod watcher;

pub use catalog::{CatalogDiscovery, CatalogEntity, CatalogEvent, CatalogSink, EntityCatalog};
pub use collaborators::{
    BroadcastEventSink, CollaboratorError, EventSink, ExtensionLoader, FileLogging, FrameHost,
    Notifier,
};
pub use frame::{ClusterFrame, EXTENSIONS_NOT_LOADED, FrameDependencies, MountedFrame};
pub use readiness::{ClusterContext, ReadinessHandle, ReadinessSignal, await_ready};
pub use shutdown::{
    CleanupAction, ShutdownCoordinator, ShutdownHandle, TeardownOutcome, TeardownTrigger,
    UnloadSignal, WindowEvents,
};
pub use watcher::{ActivationOutcome, CatalogWatch, WatchState};
