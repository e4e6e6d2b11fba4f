//! `kubeframe` demo host: mounts one cluster frame and turns process signals
//! into the frame's unload signals.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use clap::Parser;
use kubeframe_core::{AppEvent, ClusterId, EntityId, FrameRoutingId};
use kubeframe_logging::{LoggingGuard, init_logging};
use kubeframe_runtime::{
    BroadcastEventSink, CatalogDiscovery, CatalogEntity, CatalogSink, ClusterContext,
    ClusterFrame, CollaboratorError, EntityCatalog, FileLogging, FrameDependencies, FrameHost,
    UnloadSignal, WindowEvents,
};
use kubeframe_settings::{get_settings, init_settings, load_settings_from_path, settings_path};
use tokio::sync::broadcast;
use tracing::{info, warn};

/// Mount a single cluster frame and keep it up until an unload signal.
#[derive(Debug, Parser)]
#[command(name = "kubeframe", version)]
struct Args {
    /// Cluster to host.
    #[arg(long, default_value = "minikube")]
    cluster_id: String,

    /// Routing id of the frame.
    #[arg(long, default_value_t = 1)]
    frame_id: u32,

    /// Settings file [default: ~/.kubeframe/settings.json].
    #[arg(long)]
    settings: Option<PathBuf>,

    /// Delay before the cluster reports ready.
    #[arg(long, default_value_t = 250)]
    ready_after_ms: u64,

    /// Delay before discovery adds the cluster to the catalog. Omit to never
    /// add it.
    #[arg(long)]
    discover_after_ms: Option<u64>,

    /// Overrides the configured catalog timeout.
    #[arg(long, value_parser = clap::value_parser!(u64).range(0..=3_600_000))]
    catalog_timeout_ms: Option<u64>,
}

/// Host that accepts every frame id.
struct LoggingHost;

#[async_trait]
impl FrameHost for LoggingHost {
    async fn request_set_frame_id(&self, cluster_id: &ClusterId) -> Result<(), CollaboratorError> {
        info!(cluster_id = %cluster_id, "frame id registered with host");
        Ok(())
    }
}

/// Discovery that reports one entity after a fixed delay.
struct DelayedDiscovery {
    entity: CatalogEntity,
    delay: Option<Duration>,
}

impl CatalogDiscovery for DelayedDiscovery {
    fn start(&self, sink: CatalogSink) {
        let Some(delay) = self.delay else {
            info!("discovery started, no entities will be reported");
            return;
        };
        let entity = self.entity.clone();
        drop(tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            info!(entity = %entity.id, kind = %entity.kind, "entity discovered");
            sink.push(entity);
        }));
    }
}

fn spawn_event_printer(mut rx: broadcast::Receiver<AppEvent>) {
    drop(tokio::spawn(async move {
        while let Ok(event) = rx.recv().await {
            info!(name = %event.name, action = %event.action, params = ?event.params, "app event");
        }
    }));
}

/// Map process signals onto the window's unload signals. Returns after the
/// first one has been dispatched.
async fn forward_os_signals(window: &WindowEvents) -> anyhow::Result<()> {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};

        let mut terminate = signal(SignalKind::terminate()).context("failed to listen for SIGTERM")?;
        let mut hangup = signal(SignalKind::hangup()).context("failed to listen for SIGHUP")?;
        let unload = tokio::select! {
            r = tokio::signal::ctrl_c() => {
                r.context("failed to listen for ctrl+c")?;
                UnloadSignal::BeforeUnload
            }
            _ = terminate.recv() => UnloadSignal::PageHide,
            _ = hangup.recv() => UnloadSignal::PageHide,
        };
        let listeners = window.dispatch(unload);
        info!(signal = ?unload, listeners, "dispatched unload signal");
    }

    #[cfg(not(unix))]
    {
        tokio::signal::ctrl_c()
            .await
            .context("failed to listen for ctrl+c")?;
        let listeners = window.dispatch(UnloadSignal::BeforeUnload);
        info!(listeners, "dispatched unload signal");
    }

    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let path = args.settings.clone().unwrap_or_else(settings_path);
    let mut settings = load_settings_from_path(&path)
        .with_context(|| format!("failed to load settings from {}", path.display()))?;
    if let Some(ms) = args.catalog_timeout_ms {
        settings.frame.catalog_timeout_ms = ms;
    }
    if init_settings(settings).is_err() {
        anyhow::bail!("settings were already initialized");
    }
    let settings = get_settings();

    let guard: Arc<LoggingGuard> =
        Arc::new(init_logging(&settings.logging).context("failed to initialize logging")?);
    info!(path = %path.display(), "starting kubeframe");

    let cluster_id = ClusterId::from_raw(args.cluster_id.as_str());
    let (cluster, readiness) = ClusterContext::new(cluster_id.clone());
    let ready_after = Duration::from_millis(args.ready_after_ms);
    drop(tokio::spawn(async move {
        tokio::time::sleep(ready_after).await;
        if readiness.mark_ready() {
            info!("cluster ready");
        }
    }));

    let catalog = Arc::new(EntityCatalog::with_discovery(DelayedDiscovery {
        entity: CatalogEntity::new(
            EntityId::from(&cluster_id),
            "KubernetesCluster",
            cluster_id.as_str(),
        ),
        delay: args.discover_after_ms.map(Duration::from_millis),
    }));

    let (events_tx, events_rx) = broadcast::channel(16);
    spawn_event_printer(events_rx);

    let window = WindowEvents::new();
    let file_logging: Arc<dyn FileLogging> = guard.clone();
    let frame = ClusterFrame::new(FrameDependencies {
        cluster,
        frame_id: FrameRoutingId(args.frame_id),
        catalog,
        host: Arc::new(LoggingHost),
        extensions: Arc::new(|| info!("extensions loaded")),
        events: Arc::new(BroadcastEventSink::new(events_tx)),
        notifier: Arc::new(|message: &str| warn!(warning = message, "user warning")),
        file_logging,
        window: window.clone(),
        catalog_timeout: settings.frame.catalog_timeout(),
    });

    let mounted = frame
        .run(|| info!("root view unmounted"))
        .await
        .context("cluster frame failed to activate")?;
    info!("frame mounted, waiting for an unload signal");

    forward_os_signals(&window).await?;
    mounted.shutdown().triggered().await;
    mounted.shutdown().released().await;

    info!("shutting down");
    Ok(())
}
