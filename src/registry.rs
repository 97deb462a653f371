//! Device registry.
//!
//! The registry owns every live device record and is the sole authority
//! for id uniqueness: no device exists outside it. It is constructed
//! explicitly by the host process — there is no implicit global list — so
//! tests run isolated registries against fake transports.
//!
//! # Locking
//!
//! One registry-wide mutex guards the id → record map for `add`, `find`,
//! `remove` and the snapshot queries. The map lock is never held across a
//! transport call: channel opening happens between map accesses, and the
//! `start`/`stop` drivers lock only the individual device for the duration
//! of the transition. Map lock then device lock is the only nesting order.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use tracing::{debug, info};

use crate::config::TargetConfig;
use crate::device::{DeviceState, TargetDevice, TargetStatus};
use crate::error::{Error, Result};
use crate::migration::MigrationBlockers;
use crate::transport::ControlTransport;

/// Shared handle to one registered device.
pub type DeviceHandle = Arc<Mutex<TargetDevice>>;

/// Registry of offloaded targets, keyed by device id.
pub struct TargetRegistry {
    devices: Mutex<HashMap<String, DeviceHandle>>,
    transport: Box<dyn ControlTransport>,
    blockers: Arc<MigrationBlockers>,
}

impl TargetRegistry {
    /// Creates an empty registry.
    ///
    /// The transport opens control channels for new devices; the blocker
    /// registry is shared with whatever migration machinery the embedding
    /// system runs.
    #[must_use]
    pub fn new(transport: Box<dyn ControlTransport>, blockers: Arc<MigrationBlockers>) -> Self {
        Self {
            devices: Mutex::new(HashMap::new()),
            transport,
            blockers,
        }
    }

    /// Returns the shared migration-blocker registry.
    #[must_use]
    pub fn blockers(&self) -> &Arc<MigrationBlockers> {
        &self.blockers
    }

    fn map_guard(&self) -> Result<MutexGuard<'_, HashMap<String, DeviceHandle>>> {
        self.devices
            .lock()
            .map_err(|e| Error::Internal(format!("registry lock poisoned: {e}")))
    }

    // =========================================================================
    // Membership
    // =========================================================================

    /// Registers a new device from validated creation parameters.
    ///
    /// Allocates the fixed three-slot virtqueue set, opens the control
    /// channel exactly once, and inserts the record as `Stopped`. On any
    /// failure nothing is registered and no channel is left open.
    ///
    /// # Errors
    ///
    /// - [`Error::MissingField`] / [`Error::InvalidId`] /
    ///   [`Error::InvalidRange`]: parameter validation failed
    /// - [`Error::DuplicateId`]: a device with this id already exists; the
    ///   existing record is left untouched
    /// - [`Error::ChannelOpenFailed`]: the control channel could not be
    ///   opened
    pub fn add(&self, config: &TargetConfig) -> Result<DeviceHandle> {
        let tpgt = config.validate()?;

        // cheap duplicate check before paying for a channel open
        if self.map_guard()?.contains_key(&config.id) {
            return Err(Error::DuplicateId(config.id.clone()));
        }

        let channel = self
            .transport
            .open(&config.channel_source())
            .map_err(|source| Error::ChannelOpenFailed { source })?;

        let device = TargetDevice::new(config.id.clone(), config.wwpn.clone(), tpgt, channel);
        let handle = Arc::new(Mutex::new(device));

        // re-check under the lock; another thread may have raced the open
        let mut devices = self.map_guard()?;
        if devices.contains_key(&config.id) {
            return Err(Error::DuplicateId(config.id.clone()));
        }
        devices.insert(config.id.clone(), Arc::clone(&handle));
        drop(devices);

        info!(id = %config.id, wwpn = %config.wwpn, tpgt, "offload target registered");
        Ok(handle)
    }

    /// Looks up a device by id.
    ///
    /// Returns a shared handle without transferring ownership; the record
    /// stays registered.
    #[must_use]
    pub fn find(&self, id: &str) -> Option<DeviceHandle> {
        self.map_guard().ok()?.get(id).map(Arc::clone)
    }

    /// Removes a stopped device, releasing its control channel.
    ///
    /// # Errors
    ///
    /// - [`Error::NotFound`]: no device with this id
    /// - [`Error::StillActive`]: the device is not `Stopped`
    pub fn remove(&self, id: &str) -> Result<()> {
        let mut devices = self.map_guard()?;
        let handle = devices
            .get(id)
            .ok_or_else(|| Error::NotFound(id.to_string()))?;

        let state = self.device_guard(handle)?.state();
        if state != DeviceState::Stopped {
            return Err(Error::StillActive {
                id: id.to_string(),
                state: state.to_string(),
            });
        }

        devices.remove(id);
        drop(devices);
        debug!(id, "offload target removed");
        Ok(())
    }

    // =========================================================================
    // Snapshots
    // =========================================================================

    /// Returns a read-only snapshot of one device.
    #[must_use]
    pub fn status(&self, id: &str) -> Option<TargetStatus> {
        let handle = self.find(id)?;
        let device = self.device_guard(&handle).ok()?;
        Some(device.status())
    }

    /// Returns snapshots of all registered devices.
    #[must_use]
    pub fn list(&self) -> Vec<TargetStatus> {
        let handles: Vec<DeviceHandle> = match self.map_guard() {
            Ok(devices) => devices.values().map(Arc::clone).collect(),
            Err(_) => return Vec::new(),
        };
        handles
            .iter()
            .filter_map(|handle| Some(self.device_guard(handle).ok()?.status()))
            .collect()
    }

    // =========================================================================
    // Lifecycle Drivers
    // =========================================================================
    //
    // Entry points for the embedding system's control loop. Each locks the
    // one device for the whole transition, which serializes start/stop per
    // device; the state-machine guard inside remains the semantic check.
    // =========================================================================

    /// Starts a device by id.
    ///
    /// # Errors
    ///
    /// [`Error::NotFound`] if the id is unknown, otherwise whatever the
    /// lifecycle start returns.
    pub fn start(&self, id: &str) -> Result<()> {
        let handle = self
            .find(id)
            .ok_or_else(|| Error::NotFound(id.to_string()))?;
        let mut device = self.device_guard(&handle)?;
        device.start(&self.blockers)
    }

    /// Stops a device by id.
    ///
    /// # Errors
    ///
    /// [`Error::NotFound`] if the id is unknown; stopping an already
    /// stopped device succeeds as a no-op.
    pub fn stop(&self, id: &str) -> Result<()> {
        let handle = self
            .find(id)
            .ok_or_else(|| Error::NotFound(id.to_string()))?;
        let mut device = self.device_guard(&handle)?;
        device.stop(&self.blockers)
    }

    /// Applies a guest-written virtio status byte to a device.
    ///
    /// # Errors
    ///
    /// [`Error::NotFound`] if the id is unknown, otherwise whatever the
    /// demanded transition returns.
    pub fn apply_guest_status(&self, id: &str, status: u8) -> Result<()> {
        let handle = self
            .find(id)
            .ok_or_else(|| Error::NotFound(id.to_string()))?;
        let mut device = self.device_guard(&handle)?;
        device.apply_guest_status(status, &self.blockers)
    }

    /// Validates a guest configuration-space write against a device.
    ///
    /// # Errors
    ///
    /// [`Error::NotFound`] if the id is unknown;
    /// [`Error::ConfigMismatch`] (fatal) if a fixed size was changed.
    pub fn check_guest_config(&self, id: &str, raw: &[u8]) -> Result<()> {
        let handle = self
            .find(id)
            .ok_or_else(|| Error::NotFound(id.to_string()))?;
        let device = self.device_guard(&handle)?;
        device.check_guest_config(raw)
    }

    fn device_guard<'a>(&self, handle: &'a DeviceHandle) -> Result<MutexGuard<'a, TargetDevice>> {
        handle
            .lock()
            .map_err(|e| Error::Internal(format!("device lock poisoned: {e}")))
    }
}

impl std::fmt::Debug for TargetRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let count = self.map_guard().map(|m| m.len()).unwrap_or(0);
        f.debug_struct("TargetRegistry")
            .field("devices", &count)
            .finish_non_exhaustive()
    }
}
