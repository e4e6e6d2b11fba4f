//! Cluster-frame activation sequence.
//!
//! Runs once per mount, in this order:
//!
//! 1. start catalog discovery
//! 2. report the frame id to the host
//! 3. wait for the cluster to be ready
//! 4. point the catalog's active entity at the cluster
//! 5. watch the catalog; load extensions once it is non-empty, or warn on timeout
//! 6. on the next scheduling turn, emit the `cluster/open` event
//! 7. install the teardown listener
//!
//! A failure in steps 2 or 3 aborts everything after it. Steps 5 and 6 run in
//! background tasks and never fail the sequence.

use std::sync::Arc;
use std::time::Duration;

use kubeframe_core::{AppEvent, ClusterId, EntityId, FrameError, FrameRoutingId};
use tokio::task::JoinHandle;
use tracing::{Instrument, Span, debug, error, info, info_span, warn};

use crate::catalog::EntityCatalog;
use crate::collaborators::{EventSink, ExtensionLoader, FileLogging, FrameHost, Notifier};
use crate::readiness::{ClusterContext, await_ready};
use crate::shutdown::{CleanupAction, ShutdownCoordinator, ShutdownHandle, TeardownOutcome, WindowEvents};
use crate::watcher::{ActivationOutcome, CatalogWatch};

/// Warning shown when the catalog never populates.
pub const EXTENSIONS_NOT_LOADED: &str =
    "Failed to get KubernetesCluster for this view. Extensions will not be loaded.";

/// Everything a frame needs from its host.
pub struct FrameDependencies {
    /// The hosted cluster.
    pub cluster: ClusterContext,
    /// Routing id of the frame rendering the cluster.
    pub frame_id: FrameRoutingId,
    /// Entity catalog shared with discovery.
    pub catalog: Arc<EntityCatalog>,
    /// Host process.
    pub host: Arc<dyn FrameHost>,
    /// Extension loader.
    pub extensions: Arc<dyn ExtensionLoader>,
    /// Telemetry sink.
    pub events: Arc<dyn EventSink>,
    /// User notifications.
    pub notifier: Arc<dyn Notifier>,
    /// The frame's log file.
    pub file_logging: Arc<dyn FileLogging>,
    /// Unload signals of the hosting window.
    pub window: WindowEvents,
    /// How long to wait for the catalog before giving up on extensions.
    pub catalog_timeout: Duration,
}

/// A cluster frame that has not been mounted yet.
pub struct ClusterFrame {
    deps: FrameDependencies,
}

impl ClusterFrame {
    /// Wrap the frame's dependencies.
    pub fn new(deps: FrameDependencies) -> Self {
        Self { deps }
    }

    /// Run the activation sequence.
    ///
    /// `unmount_root` detaches the hosted view; it runs as the last teardown
    /// step. Must be called inside a tokio runtime.
    pub async fn run<F>(self, unmount_root: F) -> Result<MountedFrame, FrameError>
    where
        F: FnOnce() + Send + 'static,
    {
        let cluster_id = self.deps.cluster.id().clone();
        let span = info_span!(
            "cluster_frame",
            cluster_id = %cluster_id,
            frame_id = self.deps.frame_id.0
        );
        self.activate(cluster_id, Box::new(unmount_root))
            .instrument(span)
            .await
    }

    async fn activate(
        self,
        cluster_id: ClusterId,
        unmount_root: CleanupAction,
    ) -> Result<MountedFrame, FrameError> {
        let FrameDependencies {
            cluster,
            frame_id,
            catalog,
            host,
            extensions,
            events,
            notifier,
            file_logging,
            window,
            catalog_timeout,
        } = self.deps;

        // 1. Discovery must be running before anything reads the catalog.
        let _ = catalog.init();
        info!("Init dashboard, clusterId={cluster_id}, frameId={frame_id}");

        // 2.
        host.request_set_frame_id(&cluster_id)
            .await
            .map_err(|e| {
                fatal(FrameError::FrameIdRegistration {
                    cluster_id: cluster_id.clone(),
                    reason: e.to_string(),
                })
            })?;

        // 3.
        await_ready(&cluster).await.map_err(|e| fatal(e.into()))?;

        // 4 and 5. The active entity is set once the watch slot is claimed
        // and before the watch starts, so extensions always see it.
        let watch =
            CatalogWatch::start_focused(&catalog, EntityId::from(&cluster_id)).map_err(fatal)?;
        let activation = tokio::spawn(
            load_extensions_when_populated(watch, catalog_timeout, extensions, notifier)
                .in_current_span(),
        );

        // 6.
        let opened = tokio::spawn(emit_opened(events, cluster_id.clone()).in_current_span());

        // 7.
        let shutdown = ShutdownCoordinator::install(
            &window,
            teardown_actions(cluster_id, frame_id, file_logging, unmount_root),
        );

        Ok(MountedFrame {
            activation: Some(activation),
            outcome: None,
            opened: Some(opened),
            shutdown,
        })
    }
}

fn fatal(error: FrameError) -> FrameError {
    error!(error = %error, category = error.category(), "frame activation aborted");
    error
}

async fn load_extensions_when_populated(
    watch: CatalogWatch,
    timeout: Duration,
    extensions: Arc<dyn ExtensionLoader>,
    notifier: Arc<dyn Notifier>,
) -> ActivationOutcome {
    let outcome = watch
        .wait(timeout, |error| {
            warn!(
                error = %error,
                category = error.category(),
                "catalog not populated, extensions will not be loaded"
            );
            notifier.show_warning(EXTENSIONS_NOT_LOADED);
        })
        .await;

    if let ActivationOutcome::Populated { entities } = outcome {
        debug!(entities, "catalog populated, loading extensions");
        extensions.load_extensions();
    }
    outcome
}

async fn emit_opened(events: Arc<dyn EventSink>, cluster_id: ClusterId) {
    tokio::task::yield_now().await;
    match events.emit(AppEvent::cluster_open(&cluster_id)) {
        Ok(()) => debug!("cluster open event emitted"),
        Err(e) => {
            let error = FrameError::Emission(e.to_string());
            warn!(
                error = %error,
                category = error.category(),
                "failed to emit cluster open event"
            );
        }
    }
}

fn teardown_actions(
    cluster_id: ClusterId,
    frame_id: FrameRoutingId,
    file_logging: Arc<dyn FileLogging>,
    unmount_root: CleanupAction,
) -> Vec<CleanupAction> {
    let span = Span::current();
    // Log first so the unload line still reaches the file before it closes.
    let log_unload: CleanupAction = Box::new(move || {
        let _entered = span.enter();
        info!("Unload dashboard, clusterId={cluster_id}, frameId={frame_id}");
    });
    let close_file_logging: CleanupAction = Box::new(move || file_logging.close_file_logging());
    vec![log_unload, close_file_logging, unmount_root]
}

/// A mounted frame: background activation plus its teardown handle.
#[derive(Debug)]
pub struct MountedFrame {
    activation: Option<JoinHandle<ActivationOutcome>>,
    outcome: Option<ActivationOutcome>,
    opened: Option<JoinHandle<()>>,
    shutdown: ShutdownHandle,
}

impl MountedFrame {
    /// Wait for the catalog watch to resolve.
    ///
    /// Returns `None` if the activation task panicked or was aborted.
    pub async fn activation(&mut self) -> Option<ActivationOutcome> {
        if let Some(handle) = self.activation.take() {
            match handle.await {
                Ok(outcome) => self.outcome = Some(outcome),
                Err(e) => error!(error = %e, "frame activation task failed"),
            }
        }
        self.outcome.clone()
    }

    /// Wait for the `cluster/open` emission attempt to finish.
    pub async fn opened(&mut self) {
        if let Some(handle) = self.opened.take() {
            if let Err(e) = handle.await {
                warn!(error = %e, "cluster open emission task failed");
            }
        }
    }

    /// The frame's teardown handle.
    pub fn shutdown(&self) -> &ShutdownHandle {
        &self.shutdown
    }

    /// Tear the frame down now, unless an unload signal already did.
    pub fn unmount(&self) -> TeardownOutcome {
        self.shutdown.trigger()
    }
}
