//! Lease registry keyed by device path.

use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use serde::Serialize;
use tokio::sync::{watch, OwnedMutexGuard};
use tokio::time::Instant;

/// Delay between a release and the next grant on the same path.
pub const DEFAULT_SETTLE_DELAY: Duration = Duration::from_millis(500);

/// What a lease holder is using the port for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LeasePurpose {
    Telemetry,
    Flash,
}

impl fmt::Display for LeasePurpose {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(match self {
            LeasePurpose::Telemetry => "telemetry",
            LeasePurpose::Flash => "flash",
        })
    }
}

/// Observable state of one device path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PortStatus {
    Free,
    Held(LeasePurpose),
    /// Released, but the settling delay has not elapsed.
    Settling,
}

impl fmt::Display for PortStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PortStatus::Free => f.write_str("free"),
            PortStatus::Held(purpose) => write!(f, "held ({purpose})"),
            PortStatus::Settling => f.write_str("settling"),
        }
    }
}

#[derive(Debug, Default)]
struct SlotState {
    holder: Option<LeasePurpose>,
    available_at: Option<Instant>,
    flash_waiting: usize,
}

#[derive(Debug)]
struct PortSlot {
    /// Fair mutex: waiters are granted in request order.
    gate: Arc<tokio::sync::Mutex<()>>,
    state: Mutex<SlotState>,
    flash_pending: watch::Sender<bool>,
}

impl PortSlot {
    fn new() -> Self {
        let (flash_pending, _) = watch::channel(false);
        Self {
            gate: Arc::new(tokio::sync::Mutex::new(())),
            state: Mutex::new(SlotState::default()),
            flash_pending,
        }
    }

    fn state(&self) -> MutexGuard<'_, SlotState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Nobody holds, awaits or is settling the port. Only meaningful under
    /// the registry lock, where no new reference to the slot can appear.
    fn is_idle(self: &Arc<Self>, now: Instant) -> bool {
        if Arc::strong_count(self) > 1 {
            return false;
        }
        let state = self.state();
        state.holder.is_none() && state.available_at.map_or(true, |at| at <= now)
    }

    fn adjust_flash_waiting(&self, delta: isize) {
        let mut state = self.state();
        state.flash_waiting = state.flash_waiting.saturating_add_signed(delta);
        self.flash_pending.send_replace(state.flash_waiting > 0);
    }
}

/// Counts a queued flash request for as long as it is waiting, including
/// when the request future is dropped before being granted.
struct PendingFlash(Arc<PortSlot>);

impl PendingFlash {
    fn new(slot: &Arc<PortSlot>) -> Self {
        slot.adjust_flash_waiting(1);
        Self(Arc::clone(slot))
    }
}

impl Drop for PendingFlash {
    fn drop(&mut self) {
        self.0.adjust_flash_waiting(-1);
    }
}

#[derive(Debug)]
struct Inner {
    settle: Duration,
    ports: Mutex<HashMap<PathBuf, Arc<PortSlot>>>,
}

/// Owned registry of serial device paths and their leases.
///
/// Cloning is cheap; clones share the same registry. Pass it explicitly to
/// every consumer of a port (telemetry reader, uploader).
#[derive(Debug, Clone)]
pub struct PortCoordinator {
    inner: Arc<Inner>,
}

impl Default for PortCoordinator {
    fn default() -> Self {
        Self::new()
    }
}

impl PortCoordinator {
    pub fn new() -> Self {
        Self::with_settle_delay(DEFAULT_SETTLE_DELAY)
    }

    pub fn with_settle_delay(settle: Duration) -> Self {
        Self {
            inner: Arc::new(Inner {
                settle,
                ports: Mutex::new(HashMap::new()),
            }),
        }
    }

    pub fn settle_delay(&self) -> Duration {
        self.inner.settle
    }

    /// Slot for `path`, dropping idle slots of other paths on the way so the
    /// registry only tracks ports in use.
    fn slot(&self, path: &Path) -> Arc<PortSlot> {
        let mut ports = self
            .inner
            .ports
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        let now = Instant::now();
        ports.retain(|_, slot| !slot.is_idle(now));
        Arc::clone(
            ports
                .entry(path.to_path_buf())
                .or_insert_with(|| Arc::new(PortSlot::new())),
        )
    }

    /// Wait for exclusive use of `path`.
    ///
    /// Requests for one path are granted one at a time, in the order they
    /// were made, and never before the settling delay of the previous
    /// release has elapsed. A flash request signals the current telemetry
    /// holder through [`PortLease::preempted`].
    pub async fn request_lease(&self, path: impl AsRef<Path>, purpose: LeasePurpose) -> PortLease {
        let path = path.as_ref().to_path_buf();
        let slot = self.slot(&path);
        let pending = (purpose == LeasePurpose::Flash).then(|| PendingFlash::new(&slot));

        tracing::debug!(port = %path.display(), %purpose, "lease requested");
        let guard = Arc::clone(&slot.gate).lock_owned().await;

        let available_at = slot.state().available_at;
        if let Some(at) = available_at {
            if at > Instant::now() {
                tracing::debug!(port = %path.display(), "waiting for port to settle");
                tokio::time::sleep_until(at).await;
            }
        }

        {
            let mut state = slot.state();
            state.holder = Some(purpose);
            state.available_at = None;
        }
        drop(pending);
        tracing::info!(port = %path.display(), %purpose, "lease granted");

        let flash_pending = slot.flash_pending.subscribe();
        PortLease {
            path,
            purpose,
            settle: self.inner.settle,
            slot,
            flash_pending,
            guard: Some(guard),
        }
    }

    pub fn status(&self, path: impl AsRef<Path>) -> PortStatus {
        let ports = self
            .inner
            .ports
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        let Some(slot) = ports.get(path.as_ref()) else {
            return PortStatus::Free;
        };
        let state = slot.state();
        match (state.holder, state.available_at) {
            (Some(purpose), _) => PortStatus::Held(purpose),
            (None, Some(at)) if at > Instant::now() => PortStatus::Settling,
            _ => PortStatus::Free,
        }
    }
}

/// Exclusive use of one device path. Released on drop.
#[derive(Debug)]
pub struct PortLease {
    path: PathBuf,
    purpose: LeasePurpose,
    settle: Duration,
    slot: Arc<PortSlot>,
    flash_pending: watch::Receiver<bool>,
    guard: Option<OwnedMutexGuard<()>>,
}

impl PortLease {
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn purpose(&self) -> LeasePurpose {
        self.purpose
    }

    /// Resolves once a flash request is waiting on this path.
    ///
    /// Only telemetry leases are preempted; for a flash lease this never
    /// resolves.
    pub async fn preempted(&self) {
        if self.purpose == LeasePurpose::Flash {
            return std::future::pending().await;
        }
        let mut pending = self.flash_pending.clone();
        if pending.wait_for(|waiting| *waiting).await.is_err() {
            std::future::pending::<()>().await;
        }
    }

    /// Whether a flash request is already waiting. Always false for flash
    /// leases.
    pub fn is_preempted(&self) -> bool {
        self.purpose == LeasePurpose::Telemetry && *self.flash_pending.borrow()
    }

    pub fn release(self) {
        drop(self);
    }

    /// Release after closing the device. A close error is logged; the port
    /// is still handed on after the settling delay.
    pub fn release_after_close(self, closed: std::io::Result<()>) {
        if let Err(e) = closed {
            tracing::warn!(port = %self.path.display(), "error closing port: {e}");
        }
        drop(self);
    }
}

impl Drop for PortLease {
    fn drop(&mut self) {
        let Some(guard) = self.guard.take() else {
            return;
        };
        {
            let mut state = self.slot.state();
            state.holder = None;
            state.available_at = Some(Instant::now() + self.settle);
        }
        drop(guard);
        tracing::info!(port = %self.path.display(), purpose = %self.purpose, "lease released");
    }
}
