//! Lifecycle controller.
//!
//! Sequences the multi-step handshake that brings an offloaded target up
//! and down. Start is atomic: either the device ends up fully operational —
//! transport started, ABI negotiated, endpoint bound, migration blocker
//! armed — or every completed step is rolled back in reverse order and the
//! device is `Stopped` again with nothing leaked. Stop is best-effort by
//! design: the kernel-side state may already have diverged (process exit,
//! prior partial failure), so each teardown sub-step logs and continues.
//!
//! # Start Sequence
//!
//! ```text
//!  Stopped ── guard ──▶ Starting
//!     ▲                    │ 1. enable notifiers      ──┐
//!     │                    │ 2. transport start         │ rollback in
//!     │                    │ 3. negotiate ABI           │ reverse order
//!     │                    │ 4. bind endpoint         ──┘ on failure
//!     │                    ▼
//!     └── rollback      Running  (+ blocker armed)
//! ```
//!
//! All calls are synchronous and made from the thread that owns the
//! device's request dispatch; the `Stopped`/`AlreadyActive` guard is the
//! state machine's own serialization and callers must not overlap start
//! and stop from multiple threads without external locking.

use chrono::Utc;
use tracing::{debug, info, warn};

use crate::constants::{VIRTIO_STATUS_DRIVER, VIRTIO_STATUS_DRIVER_OK};
use crate::device::{DeviceState, TargetDevice};
use crate::endpoint;
use crate::error::{Error, Result};
use crate::migration::MigrationBlockers;
use crate::negotiate::negotiate;

impl TargetDevice {
    /// Starts the offloaded target.
    ///
    /// Runs the full handshake: notifier enablement, transport start, ABI
    /// negotiation, endpoint binding. On success the device is `Running`,
    /// the kernel-reported ABI version is recorded, and a migration
    /// blocker naming this device is armed.
    ///
    /// On any failure the completed steps are rolled back in reverse
    /// order, best-effort, and the device is `Stopped` again.
    ///
    /// # Errors
    ///
    /// - [`Error::AlreadyActive`]: the device is not `Stopped`
    /// - [`Error::Transport`]: notifier enablement or transport start failed
    /// - [`Error::UnsupportedAbi`] / [`Error::ShortResponse`]: negotiation
    ///   failed
    /// - [`Error::EndpointBind`]: the kernel rejected the binding
    pub fn start(&mut self, blockers: &MigrationBlockers) -> Result<()> {
        if self.state != DeviceState::Stopped {
            return Err(Error::AlreadyActive(self.id.clone()));
        }
        self.state = DeviceState::Starting;
        info!(id = %self.id, wwpn = %self.wwpn, tpgt = self.tpgt, "starting offload target");

        if let Err(source) = self.channel.enable_notifiers() {
            self.state = DeviceState::Stopped;
            return Err(Error::Transport {
                op: "enable notifiers",
                source,
            });
        }

        if let Err(source) = self.channel.start() {
            self.channel.disable_notifiers();
            self.state = DeviceState::Stopped;
            return Err(Error::Transport {
                op: "transport start",
                source,
            });
        }
        for queue in &mut self.virtqueues {
            queue.set_ready(true);
        }

        let reported = match negotiate(self.channel.as_mut()) {
            Ok(version) => version,
            Err(err) => {
                self.roll_back_started("abi negotiation");
                return Err(err);
            }
        };

        if let Err(err) = endpoint::bind(self.channel.as_mut(), &self.wwpn, self.tpgt) {
            self.roll_back_started("endpoint binding");
            return Err(err);
        }

        self.abi_version = Some(reported);
        self.state = DeviceState::Running;
        self.started_at = Some(Utc::now());
        self.migration_blocker = Some(blockers.arm(format!(
            "offload target '{}' does not support migration",
            self.id
        )));
        info!(id = %self.id, abi_version = reported, "offload target running");
        Ok(())
    }

    /// Stops the offloaded target.
    ///
    /// A no-op on a `Stopped` device. Otherwise clears the endpoint
    /// (best-effort), stops the transport, disables notifiers, disarms the
    /// migration blocker and returns the device to `Stopped`. Teardown
    /// sub-step failures are logged, never propagated.
    pub fn stop(&mut self, blockers: &MigrationBlockers) -> Result<()> {
        if self.state == DeviceState::Stopped {
            debug!(id = %self.id, "stop on stopped device is a no-op");
            return Ok(());
        }
        self.state = DeviceState::Stopping;
        info!(id = %self.id, "stopping offload target");

        endpoint::unbind(self.channel.as_mut(), &self.wwpn, self.tpgt);
        self.channel.stop();
        for queue in &mut self.virtqueues {
            queue.set_ready(false);
        }
        self.channel.disable_notifiers();

        if let Some(handle) = self.migration_blocker.take() {
            blockers.disarm(handle);
        }
        self.started_at = None;
        self.state = DeviceState::Stopped;
        info!(id = %self.id, "offload target stopped");
        Ok(())
    }

    /// Applies a guest-written virtio status byte.
    ///
    /// The guest drives start and stop indirectly by setting or clearing
    /// its driver-ready bits. Already being in the demanded state is a
    /// no-op. A start failure is returned to the caller; with no userspace
    /// fallback for the offloaded data path, the embedding system decides
    /// how hard to fail.
    pub fn apply_guest_status(&mut self, status: u8, blockers: &MigrationBlockers) -> Result<()> {
        let want_started = status & (VIRTIO_STATUS_DRIVER | VIRTIO_STATUS_DRIVER_OK) != 0;
        let is_started = self.state == DeviceState::Running;
        if want_started == is_started {
            return Ok(());
        }
        if want_started {
            self.start(blockers)
        } else {
            self.stop(blockers)
        }
    }

    /// Reverse-order teardown of the steps completed before a failed
    /// start. Each sub-step is best-effort; the transport logs its own
    /// failures and this rollback always completes.
    fn roll_back_started(&mut self, failed_step: &str) {
        warn!(id = %self.id, step = failed_step, "start failed, rolling back");
        self.channel.stop();
        for queue in &mut self.virtqueues {
            queue.set_ready(false);
        }
        self.channel.disable_notifiers();
        self.state = DeviceState::Stopped;
    }
}
