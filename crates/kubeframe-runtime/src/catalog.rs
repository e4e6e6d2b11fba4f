//! Observable catalog of discovered entities.
//!
//! Discovery appends entities through a [`CatalogSink`] while the frame reads
//! them. The item list lives in a `watch` channel so readers can react to
//! every append instead of sampling. The active-entity pointer has a single
//! writer, the frame activation sequence.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use kubeframe_core::EntityId;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tokio::sync::{broadcast, watch};
use tracing::debug;

use crate::watcher::WatchState;

const EVENT_CAPACITY: usize = 64;

/// A discovered entity.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogEntity {
    /// Entity id. Clusters use their cluster id.
    pub id: EntityId,
    /// Entity kind, e.g. `KubernetesCluster`.
    pub kind: String,
    /// Display name.
    pub name: String,
}

impl CatalogEntity {
    /// Build an entity record.
    pub fn new(id: EntityId, kind: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id,
            kind: kind.into(),
            name: name.into(),
        }
    }
}

/// Changes published by a catalog, in the order they happened.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CatalogEvent {
    /// Discovery was started by [`EntityCatalog::init`].
    DiscoveryStarted,
    /// Entities were appended; carries the new length.
    EntitiesAdded {
        /// Catalog length after the append.
        len: usize,
    },
    /// The active entity pointer was set.
    ActiveEntityChanged(EntityId),
    /// A non-empty watch began.
    WatchStarted,
    /// The outstanding watch finished in the given terminal state.
    WatchFinished(WatchState),
}

/// Source of catalog entities. Started once, on the first [`EntityCatalog::init`].
pub trait CatalogDiscovery: Send + Sync {
    /// Begin discovery. Entities are delivered through `sink`, possibly long
    /// after this returns.
    fn start(&self, sink: CatalogSink);
}

/// Write handle used by discovery to append entities.
#[derive(Clone, Debug)]
pub struct CatalogSink {
    items: Arc<watch::Sender<Vec<CatalogEntity>>>,
    events: broadcast::Sender<CatalogEvent>,
}

impl CatalogSink {
    /// Append one entity.
    pub fn push(&self, entity: CatalogEntity) {
        self.extend(std::iter::once(entity));
    }

    /// Append several entities as a single change.
    pub fn extend(&self, entities: impl IntoIterator<Item = CatalogEntity>) {
        let mut len = 0;
        let changed = self.items.send_if_modified(|items| {
            let before = items.len();
            items.extend(entities);
            len = items.len();
            len != before
        });
        if changed {
            let _ = self.events.send(CatalogEvent::EntitiesAdded { len });
        }
    }
}

/// The entity catalog shared by a frame and its discovery source.
pub struct EntityCatalog {
    items: Arc<watch::Sender<Vec<CatalogEntity>>>,
    events: broadcast::Sender<CatalogEvent>,
    active_entity: RwLock<Option<EntityId>>,
    discovery: Option<Box<dyn CatalogDiscovery>>,
    initialized: AtomicBool,
    watching: AtomicBool,
}

impl EntityCatalog {
    /// An empty catalog with no discovery source; fill it through [`Self::sink`].
    pub fn new() -> Self {
        let (items, _) = watch::channel(Vec::new());
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            items: Arc::new(items),
            events,
            active_entity: RwLock::new(None),
            discovery: None,
            initialized: AtomicBool::new(false),
            watching: AtomicBool::new(false),
        }
    }

    /// An empty catalog fed by `discovery` once initialized.
    pub fn with_discovery(discovery: impl CatalogDiscovery + 'static) -> Self {
        Self {
            discovery: Some(Box::new(discovery)),
            ..Self::new()
        }
    }

    /// Start discovery. Only the first call has an effect; returns whether
    /// this call started it.
    pub fn init(&self) -> bool {
        if self.initialized.swap(true, Ordering::SeqCst) {
            return false;
        }
        let _ = self.events.send(CatalogEvent::DiscoveryStarted);
        if let Some(discovery) = &self.discovery {
            debug!("starting catalog discovery");
            discovery.start(self.sink());
        }
        true
    }

    /// Whether [`Self::init`] has run.
    pub fn is_initialized(&self) -> bool {
        self.initialized.load(Ordering::SeqCst)
    }

    /// A handle for appending entities.
    pub fn sink(&self) -> CatalogSink {
        CatalogSink {
            items: Arc::clone(&self.items),
            events: self.events.clone(),
        }
    }

    /// Snapshot of the current entities.
    pub fn items(&self) -> Vec<CatalogEntity> {
        self.items.borrow().clone()
    }

    /// Number of entities.
    pub fn len(&self) -> usize {
        self.items.borrow().len()
    }

    /// Whether no entity has been discovered yet.
    pub fn is_empty(&self) -> bool {
        self.items.borrow().is_empty()
    }

    /// Observe the item list. The receiver sees every later append.
    pub fn subscribe_items(&self) -> watch::Receiver<Vec<CatalogEntity>> {
        self.items.subscribe()
    }

    /// Subscribe to the catalog's change log.
    pub fn subscribe_events(&self) -> broadcast::Receiver<CatalogEvent> {
        self.events.subscribe()
    }

    /// The entity currently in focus, if any.
    pub fn active_entity(&self) -> Option<EntityId> {
        self.active_entity.read().clone()
    }

    /// Point the catalog at `id`. The entity does not have to be present yet.
    pub(crate) fn set_active_entity(&self, id: EntityId) {
        *self.active_entity.write() = Some(id.clone());
        let _ = self.events.send(CatalogEvent::ActiveEntityChanged(id));
    }

    /// Claim the single watch slot. Returns `false` if a watch is in flight.
    ///
    /// The active entity is only moved to `focus` once the slot is ours, so a
    /// rejected watcher never touches the pointer.
    pub(crate) fn try_begin_watch(&self, focus: Option<EntityId>) -> bool {
        if self
            .watching
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return false;
        }
        if let Some(id) = focus {
            self.set_active_entity(id);
        }
        let _ = self.events.send(CatalogEvent::WatchStarted);
        true
    }

    pub(crate) fn end_watch(&self, state: WatchState) {
        self.watching.store(false, Ordering::SeqCst);
        let _ = self.events.send(CatalogEvent::WatchFinished(state));
    }

    /// Whether a watch is currently outstanding.
    pub fn is_watched(&self) -> bool {
        self.watching.load(Ordering::SeqCst)
    }
}

impl Default for EntityCatalog {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for EntityCatalog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EntityCatalog")
            .field("len", &self.len())
            .field("active_entity", &self.active_entity())
            .field("initialized", &self.is_initialized())
            .field("watching", &self.is_watched())
            .finish_non_exhaustive()
    }
}
