//! Wait for the catalog to become non-empty, racing a deadline.
//!
//! The predicate is evaluated once when the watch registers and again on
//! every catalog change. When the deadline and the first entity land at the
//! same instant the deadline wins, so a catalog that populates at or after
//! the timeout always counts as timed out.

use std::sync::Arc;
use std::time::Duration;

use kubeframe_core::{EntityId, FrameError};
use tokio::sync::watch;
use tokio::time::{Instant, sleep_until};
use tracing::debug;

use crate::catalog::{CatalogEntity, EntityCatalog};

/// Stand-in deadline for timeouts too large to add to the current instant.
const FAR_FUTURE: Duration = Duration::from_secs(86_400 * 365 * 30);

/// Lifecycle of a catalog watch.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum WatchState {
    /// Waiting for the first entity or the deadline.
    Watching,
    /// The catalog became non-empty first.
    Populated,
    /// The deadline elapsed first.
    TimedOut,
}

/// Terminal result of a catalog watch. Reported once, never retried.
#[derive(Clone, Debug)]
pub enum ActivationOutcome {
    /// The catalog held `entities` items when the watch resolved.
    Populated {
        /// Catalog length observed at resolution.
        entities: usize,
    },
    /// The catalog stayed empty; carries the timeout error handed to the
    /// caller's hook.
    TimedOut(FrameError),
}

impl ActivationOutcome {
    /// The terminal watch state this outcome corresponds to.
    pub fn state(&self) -> WatchState {
        match self {
            Self::Populated { .. } => WatchState::Populated,
            Self::TimedOut(_) => WatchState::TimedOut,
        }
    }

    /// Whether the catalog populated before the deadline.
    pub fn is_populated(&self) -> bool {
        matches!(self, Self::Populated { .. })
    }
}

/// An outstanding watch. Holds the catalog's single watch slot until it
/// resolves or is dropped.
#[derive(Debug)]
pub struct CatalogWatch {
    catalog: Arc<EntityCatalog>,
    items: watch::Receiver<Vec<CatalogEntity>>,
    state: WatchState,
}

impl CatalogWatch {
    /// Register a watch on `catalog`.
    ///
    /// Fails with [`FrameError::WatchInProgress`] while another watch on the
    /// same catalog has not resolved.
    pub fn start(catalog: &Arc<EntityCatalog>) -> Result<Self, FrameError> {
        Self::claim(catalog, None)
    }

    /// Register a watch and, once the slot is claimed, point the catalog's
    /// active entity at `focus`.
    ///
    /// On [`FrameError::WatchInProgress`] the active entity is left as the
    /// running watch set it.
    pub fn start_focused(catalog: &Arc<EntityCatalog>, focus: EntityId) -> Result<Self, FrameError> {
        Self::claim(catalog, Some(focus))
    }

    fn claim(catalog: &Arc<EntityCatalog>, focus: Option<EntityId>) -> Result<Self, FrameError> {
        if !catalog.try_begin_watch(focus) {
            return Err(FrameError::WatchInProgress);
        }
        Ok(Self {
            catalog: Arc::clone(catalog),
            items: catalog.subscribe_items(),
            state: WatchState::Watching,
        })
    }

    /// Current state. Always [`WatchState::Watching`] until [`Self::wait`] resolves.
    pub fn state(&self) -> WatchState {
        self.state
    }

    /// Resolve once the catalog is non-empty or `timeout` elapses.
    ///
    /// `on_timeout` runs exactly once, and only on the timeout path.
    pub async fn wait(
        mut self,
        timeout: Duration,
        on_timeout: impl FnOnce(&FrameError),
    ) -> ActivationOutcome {
        let now = Instant::now();
        let deadline = now
            .checked_add(timeout)
            .unwrap_or_else(|| now + FAR_FUTURE);
        let mut items = self.items.clone();

        let populated = async move {
            let len = items
                .wait_for(|items| !items.is_empty())
                .await
                .map(|items| items.len());
            match len {
                Ok(len) => len,
                // The catalog owns the sender and we hold the catalog, so
                // this only happens if it is torn down mid-watch.
                Err(_) => std::future::pending().await,
            }
        };

        let outcome = tokio::select! {
            biased;
            () = sleep_until(deadline) => {
                let error = FrameError::CatalogTimeout { timeout };
                on_timeout(&error);
                ActivationOutcome::TimedOut(error)
            }
            entities = populated => ActivationOutcome::Populated { entities },
        };

        self.state = outcome.state();
        debug!(state = ?self.state, "catalog watch resolved");
        outcome
    }
}

impl Drop for CatalogWatch {
    fn drop(&mut self) {
        self.catalog.end_watch(self.state);
    }
}

/// Watch `catalog` until it is non-empty or `timeout` elapses.
pub async fn await_non_empty(
    catalog: &Arc<EntityCatalog>,
    timeout: Duration,
    on_timeout: impl FnOnce(&FrameError),
) -> Result<ActivationOutcome, FrameError> {
    let watch = CatalogWatch::start(catalog)?;
    Ok(watch.wait(timeout, on_timeout).await)
}
