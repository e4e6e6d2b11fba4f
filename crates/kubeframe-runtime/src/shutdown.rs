//! At-most-once frame teardown.
//!
//! [`ShutdownCoordinator::install`] subscribes one listener to both window
//! unload signals. Whichever fires first (or an explicit
//! [`ShutdownHandle::trigger`]) runs the cleanup list in order; every later
//! trigger is a no-op. The listener drops its subscriptions once the latch
//! has fired, so repeated mounts never accumulate listeners.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::Mutex;
use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info};

/// A single cleanup step. Runs synchronously, in list order.
pub type CleanupAction = Box<dyn FnOnce() + Send>;

/// Window-level signals that unload a frame.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum UnloadSignal {
    /// The window is about to close.
    BeforeUnload,
    /// The page was hidden or moved to the background.
    PageHide,
}

/// Dispatcher for the window's unload signals.
#[derive(Clone, Debug)]
pub struct WindowEvents {
    before_unload: broadcast::Sender<()>,
    page_hide: broadcast::Sender<()>,
}

impl WindowEvents {
    /// Create a dispatcher with no listeners.
    pub fn new() -> Self {
        let (before_unload, _) = broadcast::channel(1);
        let (page_hide, _) = broadcast::channel(1);
        Self {
            before_unload,
            page_hide,
        }
    }

    fn channel(&self, signal: UnloadSignal) -> &broadcast::Sender<()> {
        match signal {
            UnloadSignal::BeforeUnload => &self.before_unload,
            UnloadSignal::PageHide => &self.page_hide,
        }
    }

    /// Fire `signal`. Returns how many listeners were notified.
    pub fn dispatch(&self, signal: UnloadSignal) -> usize {
        self.channel(signal).send(()).unwrap_or(0)
    }

    /// Number of live listeners for `signal`.
    pub fn listener_count(&self, signal: UnloadSignal) -> usize {
        self.channel(signal).receiver_count()
    }

    fn subscribe(&self, signal: UnloadSignal) -> broadcast::Receiver<()> {
        self.channel(signal).subscribe()
    }
}

impl Default for WindowEvents {
    fn default() -> Self {
        Self::new()
    }
}

/// What set off a teardown.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TeardownTrigger {
    /// A window unload signal.
    Signal(UnloadSignal),
    /// [`ShutdownHandle::trigger`].
    Explicit,
}

/// Result of asking for a teardown.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TeardownOutcome {
    /// This call ran the cleanup list.
    Executed(TeardownTrigger),
    /// The cleanup list already ran; nothing was done.
    AlreadyTriggered,
}

struct Latch {
    actions: Mutex<Option<Vec<CleanupAction>>>,
    triggered: AtomicBool,
    done: watch::Sender<bool>,
}

impl Latch {
    fn fire(&self, trigger: TeardownTrigger) -> TeardownOutcome {
        let Some(actions) = self.actions.lock().take() else {
            debug!(?trigger, "teardown already triggered, ignoring");
            return TeardownOutcome::AlreadyTriggered;
        };
        self.triggered.store(true, Ordering::SeqCst);
        info!(?trigger, steps = actions.len(), "running frame teardown");
        for action in actions {
            action();
        }
        let _ = self.done.send_replace(true);
        TeardownOutcome::Executed(trigger)
    }
}

/// Installs the teardown listener for a frame.
pub struct ShutdownCoordinator;

impl ShutdownCoordinator {
    /// Subscribe to both unload signals of `window` and run `actions`, in
    /// order, the first time either fires.
    ///
    /// Must be called inside a tokio runtime.
    pub fn install(window: &WindowEvents, actions: Vec<CleanupAction>) -> ShutdownHandle {
        let (done, _) = watch::channel(false);
        let latch = Arc::new(Latch {
            actions: Mutex::new(Some(actions)),
            triggered: AtomicBool::new(false),
            done,
        });

        // Subscribe before spawning so a signal dispatched right after
        // install is not missed.
        let before_unload = window.subscribe(UnloadSignal::BeforeUnload);
        let page_hide = window.subscribe(UnloadSignal::PageHide);
        let listener = tokio::spawn(listen(Arc::clone(&latch), before_unload, page_hide));

        ShutdownHandle {
            latch,
            listener: Mutex::new(Some(listener)),
        }
    }
}

async fn listen(
    latch: Arc<Latch>,
    mut before_unload: broadcast::Receiver<()>,
    mut page_hide: broadcast::Receiver<()>,
) {
    let mut done = latch.done.subscribe();
    let signal = tokio::select! {
        r = before_unload.recv() => fired(r, UnloadSignal::BeforeUnload),
        r = page_hide.recv() => fired(r, UnloadSignal::PageHide),
        _ = done.wait_for(|done| *done) => None,
    };
    if let Some(signal) = signal {
        let _ = latch.fire(TeardownTrigger::Signal(signal));
    }
}

fn fired(
    result: Result<(), broadcast::error::RecvError>,
    signal: UnloadSignal,
) -> Option<UnloadSignal> {
    match result {
        Ok(()) | Err(broadcast::error::RecvError::Lagged(_)) => Some(signal),
        Err(broadcast::error::RecvError::Closed) => None,
    }
}

/// Handle to a frame's installed teardown.
pub struct ShutdownHandle {
    latch: Arc<Latch>,
    listener: Mutex<Option<JoinHandle<()>>>,
}

impl ShutdownHandle {
    /// Run the teardown now, unless it already ran.
    pub fn trigger(&self) -> TeardownOutcome {
        self.latch.fire(TeardownTrigger::Explicit)
    }

    /// Whether teardown has started.
    pub fn is_triggered(&self) -> bool {
        self.latch.triggered.load(Ordering::SeqCst)
    }

    /// Wait until the cleanup list has finished running.
    pub async fn triggered(&self) {
        let mut done = self.latch.done.subscribe();
        let _ = done.wait_for(|done| *done).await;
    }

    /// Wait until the listener has released its signal subscriptions.
    pub async fn released(&self) {
        let listener = self.listener.lock().take();
        if let Some(listener) = listener {
            let _ = listener.await;
        }
    }
}

impl std::fmt::Debug for ShutdownHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ShutdownHandle")
            .field("triggered", &self.is_triggered())
            .finish_non_exhaustive()
    }
}
