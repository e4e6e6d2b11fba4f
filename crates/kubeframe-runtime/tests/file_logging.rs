//! The frame's log file, driven through a real `FileLogLayer`.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use kubeframe_core::{ClusterId, EntityId, FrameRoutingId};
use kubeframe_logging::{FileLogLayer, FileLogRecord, FileLogSink};
use kubeframe_runtime::{
    BroadcastEventSink, CatalogEntity, ClusterContext, ClusterFrame, CollaboratorError,
    EntityCatalog, FileLogging, FrameDependencies, FrameHost, UnloadSignal, WindowEvents,
};
use tracing::Level;
use tracing_subscriber::layer::SubscriberExt;

struct AcceptingHost;

#[async_trait]
impl FrameHost for AcceptingHost {
    async fn request_set_frame_id(&self, _cluster_id: &ClusterId) -> Result<(), CollaboratorError> {
        Ok(())
    }
}

fn read_records(sink: &FileLogSink) -> Vec<FileLogRecord> {
    std::fs::read_to_string(sink.path())
        .unwrap()
        .lines()
        .map(|line| serde_json::from_str(line).unwrap())
        .collect()
}

#[tokio::test(start_paused = true)]
async fn frame_logs_reach_the_file_until_teardown_closes_it() {
    let dir = tempfile::tempdir().unwrap();
    let sink = Arc::new(FileLogSink::new(&dir.path().join("frames").join("minikube.log")).unwrap());
    let subscriber =
        tracing_subscriber::registry().with(FileLogLayer::new(Arc::clone(&sink), Level::INFO));
    let _default = tracing::subscriber::set_default(subscriber);

    let cluster_id = ClusterId::from_raw("minikube");
    let (cluster, readiness) = ClusterContext::new(cluster_id.clone());
    assert!(readiness.mark_ready());
    let catalog = Arc::new(EntityCatalog::new());
    catalog.sink().push(CatalogEntity::new(
        EntityId::from(&cluster_id),
        "KubernetesCluster",
        "minikube",
    ));
    let window = WindowEvents::new();
    let (events, _) = tokio::sync::broadcast::channel(4);

    let file_logging: Arc<dyn FileLogging> = sink.clone();
    let frame = ClusterFrame::new(FrameDependencies {
        cluster,
        frame_id: FrameRoutingId(7),
        catalog,
        host: Arc::new(AcceptingHost),
        extensions: Arc::new(|| tracing::info!("extensions loaded")),
        events: Arc::new(BroadcastEventSink::new(events)),
        notifier: Arc::new(|_: &str| {}),
        file_logging,
        window: window.clone(),
        catalog_timeout: Duration::from_secs(15),
    });

    let mut mounted = frame.run(|| {}).await.unwrap();
    assert!(mounted.activation().await.unwrap().is_populated());
    mounted.opened().await;

    assert_eq!(window.dispatch(UnloadSignal::PageHide), 1);
    mounted.shutdown().triggered().await;
    assert!(sink.is_closed());

    tracing::info!("written after close");
    let records = read_records(&sink);
    assert_eq!(records.len() as u64, sink.lines_written());

    let init = records
        .iter()
        .find(|r| r.message.starts_with("Init dashboard"))
        .unwrap();
    assert_eq!(init.message, "Init dashboard, clusterId=minikube, frameId=7");
    assert_eq!(init.cluster_id.as_deref(), Some("minikube"));
    assert_eq!(init.frame_id.as_deref(), Some("7"));

    assert!(records.iter().any(|r| r.message == "extensions loaded"));
    // The failed emission is logged as a warning, not an error.
    assert!(
        records
            .iter()
            .any(|r| r.level == "WARN" && r.message.contains("cluster open"))
    );

    let last = records.last().unwrap();
    assert_eq!(last.message, "Unload dashboard, clusterId=minikube, frameId=7");
    assert_eq!(last.cluster_id.as_deref(), Some("minikube"));
    assert!(records.iter().all(|r| r.message != "written after close"));
}
