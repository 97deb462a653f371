//! Device record types.
//!
//! This module defines the runtime state of one offloaded target:
//! - `DeviceState`: lifecycle state machine states
//! - `VirtqueueRole` / `Virtqueue`: the fixed three-queue set
//! - `TargetDevice`: the record itself, owner of the control channel
//! - `TargetStatus`: read-only serializable snapshot for lookups
//!
//! State transitions are driven exclusively by the lifecycle controller
//! (see [`crate::lifecycle`]); nothing else mutates `state`, the queue set
//! or the migration blocker.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::constants::{
    CDB_SIZE, CDB_SIZE_OFFSET, QUEUE_COUNT, SENSE_SIZE, SENSE_SIZE_OFFSET,
};
use crate::error::{Error, Result};
use crate::migration::BlockerHandle;
use crate::transport::ControlChannel;

// =============================================================================
// Device State
// =============================================================================

/// Lifecycle state of an offloaded target.
///
/// ```text
///             start                      stop
///   Stopped ────────▶ Starting ─ ─ ┐   ┌──────▶ Stopping
///      ▲                  │        │   │            │
///      │                  ▼        │   │            │
///      └────────────── Running ────┘───┴────────────┘
///        (rollback /      ▲
///         stop done)      └── start complete
/// ```
///
/// A failed start never parks the device in an error state; rollback always
/// lands back in `Stopped`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub enum DeviceState {
    /// Not running; the only state that permits start and removal.
    #[default]
    Stopped,
    /// Start sequence in progress.
    Starting,
    /// Fully operational with a bound endpoint and armed blocker.
    Running,
    /// Stop sequence in progress.
    Stopping,
}

impl std::fmt::Display for DeviceState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DeviceState::Stopped => write!(f, "Stopped"),
            DeviceState::Starting => write!(f, "Starting"),
            DeviceState::Running => write!(f, "Running"),
            DeviceState::Stopping => write!(f, "Stopping"),
        }
    }
}

// =============================================================================
// Virtqueues
// =============================================================================

/// Fixed virtqueue roles, in wire ordinal order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum VirtqueueRole {
    /// Task management and asynchronous-event control queue.
    Control = 0,
    /// Event reporting queue.
    Event = 1,
    /// Request queue carrying SCSI commands.
    Io = 2,
}

impl VirtqueueRole {
    /// All roles, in ordinal order.
    pub const ALL: [VirtqueueRole; QUEUE_COUNT] =
        [VirtqueueRole::Control, VirtqueueRole::Event, VirtqueueRole::Io];

    /// Returns the wire ordinal of this role.
    #[must_use]
    pub fn index(self) -> usize {
        self as usize
    }
}

/// One virtqueue slot owned by a device record.
#[derive(Debug, Clone, Copy)]
pub struct Virtqueue {
    role: VirtqueueRole,
    ready: bool,
}

impl Virtqueue {
    fn new(role: VirtqueueRole) -> Self {
        Self { role, ready: false }
    }

    /// Returns the fixed role of this queue.
    #[must_use]
    pub fn role(&self) -> VirtqueueRole {
        self.role
    }

    /// Returns true while the transport is started and the queue is live.
    #[must_use]
    pub fn is_ready(&self) -> bool {
        self.ready
    }

    pub(crate) fn set_ready(&mut self, ready: bool) {
        self.ready = ready;
    }
}

// =============================================================================
// Target Device
// =============================================================================

/// One offloaded target: identity, control channel, queue set and state.
///
/// Created by the registry with validated parameters; mutated only through
/// the lifecycle controller; destroyed by registry removal, which is
/// permitted only while `Stopped`. Dropping the record closes the control
/// channel exactly once.
pub struct TargetDevice {
    pub(crate) id: String,
    pub(crate) wwpn: String,
    pub(crate) tpgt: u16,
    pub(crate) channel: Box<dyn ControlChannel>,
    pub(crate) virtqueues: [Virtqueue; QUEUE_COUNT],
    pub(crate) features: u64,
    pub(crate) acked_features: u64,
    pub(crate) state: DeviceState,
    pub(crate) abi_version: Option<i32>,
    pub(crate) migration_blocker: Option<BlockerHandle>,
    pub(crate) started_at: Option<DateTime<Utc>>,
}

impl TargetDevice {
    pub(crate) fn new(
        id: String,
        wwpn: String,
        tpgt: u16,
        channel: Box<dyn ControlChannel>,
    ) -> Self {
        Self {
            id,
            wwpn,
            tpgt,
            channel,
            virtqueues: [
                Virtqueue::new(VirtqueueRole::Control),
                Virtqueue::new(VirtqueueRole::Event),
                Virtqueue::new(VirtqueueRole::Io),
            ],
            features: 0,
            acked_features: 0,
            state: DeviceState::Stopped,
            abi_version: None,
            migration_blocker: None,
            started_at: None,
        }
    }

    /// Returns the device id.
    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Returns the target port name.
    #[must_use]
    pub fn wwpn(&self) -> &str {
        &self.wwpn
    }

    /// Returns the target port group tag.
    #[must_use]
    pub fn tpgt(&self) -> u16 {
        self.tpgt
    }

    /// Returns the current lifecycle state.
    #[must_use]
    pub fn state(&self) -> DeviceState {
        self.state
    }

    /// Returns the ABI version the kernel reported, once negotiated.
    #[must_use]
    pub fn abi_version(&self) -> Option<i32> {
        self.abi_version
    }

    /// Returns the backend feature bits (zero until negotiated).
    #[must_use]
    pub fn features(&self) -> u64 {
        self.features
    }

    /// Returns the acknowledged feature bits (zero until negotiated).
    #[must_use]
    pub fn acked_features(&self) -> u64 {
        self.acked_features
    }

    /// Returns the fixed queue set.
    #[must_use]
    pub fn virtqueues(&self) -> &[Virtqueue; QUEUE_COUNT] {
        &self.virtqueues
    }

    /// Returns true while a migration blocker is armed for this device.
    #[must_use]
    pub fn is_migration_blocked(&self) -> bool {
        self.migration_blocker.is_some()
    }

    /// Returns a read-only snapshot of the device.
    #[must_use]
    pub fn status(&self) -> TargetStatus {
        TargetStatus {
            id: self.id.clone(),
            wwpn: self.wwpn.clone(),
            tpgt: self.tpgt,
            state: self.state,
            abi_version: self.abi_version,
            started_at: self.started_at,
        }
    }

    // =========================================================================
    // Guest Config Validation
    // =========================================================================

    /// Validates a guest configuration-space write against the fixed
    /// device contract.
    ///
    /// The sense-buffer and CDB sizes are shared with the in-kernel target
    /// and cannot be renegotiated while requests are in flight. A mismatch
    /// is fatal ([`Error::is_fatal`]); the embedding driver decides whether
    /// that terminates the process or just this device.
    ///
    /// # Errors
    ///
    /// - [`Error::ShortResponse`]: the written config space is truncated
    /// - [`Error::ConfigMismatch`]: a fixed size was changed
    pub fn check_guest_config(&self, raw: &[u8]) -> Result<()> {
        let sense = read_config_u32(raw, SENSE_SIZE_OFFSET)?;
        let cdb = read_config_u32(raw, CDB_SIZE_OFFSET)?;

        if sense != SENSE_SIZE {
            return Err(Error::ConfigMismatch {
                field: "sense_size",
                guest: sense,
                host: SENSE_SIZE,
            });
        }
        if cdb != CDB_SIZE {
            return Err(Error::ConfigMismatch {
                field: "cdb_size",
                guest: cdb,
                host: CDB_SIZE,
            });
        }
        Ok(())
    }
}

impl std::fmt::Debug for TargetDevice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TargetDevice")
            .field("id", &self.id)
            .field("wwpn", &self.wwpn)
            .field("tpgt", &self.tpgt)
            .field("state", &self.state)
            .field("abi_version", &self.abi_version)
            .finish_non_exhaustive()
    }
}

fn read_config_u32(raw: &[u8], offset: usize) -> Result<u32> {
    let bytes: [u8; 4] = raw
        .get(offset..offset + 4)
        .and_then(|b| b.try_into().ok())
        .ok_or(Error::ShortResponse {
            op: "config write",
            expected: offset + 4,
            got: raw.len(),
        })?;
    Ok(u32::from_le_bytes(bytes))
}

// =============================================================================
// Target Status
// =============================================================================

/// Read-only snapshot of one device, suitable for listing and monitoring.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TargetStatus {
    /// Device id.
    pub id: String,
    /// Target port name.
    pub wwpn: String,
    /// Target port group tag.
    pub tpgt: u16,
    /// Lifecycle state at snapshot time.
    pub state: DeviceState,
    /// Kernel-reported ABI version, once negotiated.
    pub abi_version: Option<i32>,
    /// When the device last entered Running.
    pub started_at: Option<DateTime<Utc>>,
}
