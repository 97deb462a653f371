//! Migration blockers.
//!
//! A running offloaded target cannot be live-migrated: the in-kernel
//! target's state lives outside this process. While a device is running it
//! arms a blocker here; the embedding system consults [`MigrationBlockers`]
//! before allowing migration to proceed.
//!
//! The registry is an explicit object, constructed once by the host process
//! and shared by reference. There is no process-global list, so tests can
//! run isolated instances.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

/// Handle for one armed blocker.
///
/// Returned by [`MigrationBlockers::arm`] and consumed by
/// [`MigrationBlockers::disarm`]. Holding the handle is the proof that the
/// blocker is armed; the device record stores it while Running.
#[derive(Debug)]
pub struct BlockerHandle {
    id: u64,
    reason: String,
}

impl BlockerHandle {
    /// Returns the reason this blocker was armed with.
    #[must_use]
    pub fn reason(&self) -> &str {
        &self.reason
    }
}

/// Process-wide set of reasons blocking live migration.
#[derive(Debug, Default)]
pub struct MigrationBlockers {
    reasons: Mutex<HashMap<u64, String>>,
    next_id: AtomicU64,
}

impl MigrationBlockers {
    /// Creates an empty blocker registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn reasons_guard(&self) -> MutexGuard<'_, HashMap<u64, String>> {
        // a poisoned map is still usable; recover it rather than panic
        self.reasons.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Arms a blocker and returns its handle.
    pub fn arm(&self, reason: impl Into<String>) -> BlockerHandle {
        let reason = reason.into();
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.reasons_guard().insert(id, reason.clone());
        BlockerHandle { id, reason }
    }

    /// Disarms a previously armed blocker, consuming its handle.
    pub fn disarm(&self, handle: BlockerHandle) {
        self.reasons_guard().remove(&handle.id);
    }

    /// Returns true if any blocker is armed.
    #[must_use]
    pub fn is_blocked(&self) -> bool {
        !self.reasons_guard().is_empty()
    }

    /// Returns the currently armed reasons.
    #[must_use]
    pub fn reasons(&self) -> Vec<String> {
        self.reasons_guard().values().cloned().collect()
    }
}
