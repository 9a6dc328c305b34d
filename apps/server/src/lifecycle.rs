use axum_server::Handle;
use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicU8, Ordering};
use std::time::Duration;
use strum_macros::Display;
use tracing::{debug, info};

/// How often the readiness gate re-checks the lifecycle stage.
const POLL_INTERVAL: Duration = Duration::from_millis(100);
/// Grace period for in-flight responses once shutdown is requested.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(10);

/// Lifecycle stages of the one-shot listener. Transitions are strictly
/// forward; [`Stage::Stopped`] is terminal.
#[derive(Debug, Display, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[repr(u8)]
pub enum Stage {
    /// Constructed, not yet accepting connections.
    Starting = 0,
    /// Bound and accepting connections.
    Running = 1,
    /// Shutdown requested; an in-flight response may still complete.
    Stopping = 2,
    /// The listener is closed.
    Stopped = 3,
}

impl Stage {
    const fn from_raw(raw: u8) -> Self {
        match raw {
            0 => Self::Starting,
            1 => Self::Running,
            2 => Self::Stopping,
            _ => Self::Stopped,
        }
    }
}

/// Shared lifecycle cell for the listener.
///
/// The serving handler, the interrupt task, and the readiness gate all see
/// the same cell; every mutation goes through the forward-only transitions
/// below, observers only ever call [`Lifecycle::stage`].
#[derive(Debug)]
pub struct Lifecycle {
    stage: AtomicU8,
}

impl Lifecycle {
    #[must_use]
    pub const fn new() -> Self {
        Self { stage: AtomicU8::new(Stage::Starting as u8) }
    }

    /// Current stage.
    #[must_use]
    pub fn stage(&self) -> Stage {
        Stage::from_raw(self.stage.load(Ordering::Acquire))
    }

    /// Starting → Running. Returns whether this call performed the
    /// transition; it fails once shutdown has already begun.
    pub fn mark_running(&self) -> bool {
        self.stage
            .compare_exchange(
                Stage::Starting as u8,
                Stage::Running as u8,
                Ordering::AcqRel,
                Ordering::Acquire,
            )
            .is_ok()
    }

    /// Advances to Stopping from any earlier stage. Returns whether this
    /// call won the transition; losers observe a stage already at or past
    /// Stopping.
    pub fn begin_stopping(&self) -> bool {
        self.advance_to(Stage::Stopping)
    }

    /// Advances to the terminal Stopped stage.
    pub fn mark_stopped(&self) {
        self.advance_to(Stage::Stopped);
    }

    fn advance_to(&self, target: Stage) -> bool {
        self.stage
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |raw| {
                (raw < target as u8).then_some(target as u8)
            })
            .is_ok()
    }
}

impl Default for Lifecycle {
    fn default() -> Self {
        Self::new()
    }
}

/// Waits until the listener reports [`Stage::Running`].
///
/// Polls every 100 ms. Returns `true` once Running is observed and `false`
/// if the lifecycle reaches Stopping or Stopped first (e.g., an interrupt
/// arrived before the listener came up). There is no upper bound on the
/// wait while the stage remains Starting.
pub async fn wait_until_running(lifecycle: &Lifecycle) -> bool {
    loop {
        match lifecycle.stage() {
            Stage::Running => return true,
            Stage::Stopping | Stage::Stopped => return false,
            Stage::Starting => tokio::time::sleep(POLL_INTERVAL).await,
        }
    }
}

/// Funnel for the two termination triggers: the served request and the
/// operator interrupt.
#[derive(Debug, Clone)]
pub struct ShutdownCoordinator {
    lifecycle: Arc<Lifecycle>,
    handle: Handle<SocketAddr>,
}

impl ShutdownCoordinator {
    pub(crate) const fn new(lifecycle: Arc<Lifecycle>, handle: Handle<SocketAddr>) -> Self {
        Self { lifecycle, handle }
    }

    /// Requests shutdown of the listener.
    ///
    /// Idempotent: only the first call has effect, later calls are no-ops.
    /// The in-flight response, if any, is allowed to complete within the
    /// grace period before the listener closes.
    pub fn shutdown(&self) {
        if self.lifecycle.begin_stopping() {
            info!(stage = %self.lifecycle.stage(), "Shutdown requested, closing listener");
            self.handle.graceful_shutdown(Some(SHUTDOWN_GRACE));
        } else {
            debug!("Shutdown already in progress");
        }
    }
}
