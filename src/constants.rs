//! # Offload Target Constants
//!
//! Compiled-in policy values for the kernel-offload control plane. These
//! constants are the **single source of truth** for the wire ABI, the fixed
//! virtqueue topology, and the device-identifier bounds used throughout the
//! codebase.
//!
//! ## Modification Guidelines
//!
//! Before modifying any constant:
//! 1. Check whether the in-kernel target shares the value (ABI version,
//!    config sizes) — those cannot change unilaterally
//! 2. Update dependent tests and documentation
//!
//! ## Cross-References
//!
//! - [`crate::wire`]: Uses the ABI version in every endpoint request
//! - [`crate::negotiate`]: Compares the kernel-reported version against
//!   [`SUPPORTED_ABI_VERSION`]
//! - [`crate::device`]: Uses the fixed config sizes and queue count

// =============================================================================
// Wire ABI
// =============================================================================
//
// The control-channel ABI is negotiated once per device start. The kernel
// reports its version; anything newer than what this crate was compiled
// against is a hard compatibility failure.
// =============================================================================

/// Highest control-channel ABI version this crate understands.
///
/// A kernel-side target reporting a greater version requires a newer build
/// of this frontend; start fails with `UnsupportedAbi` and rolls back.
/// Lower reported versions are accepted and recorded for diagnostics only.
pub const SUPPORTED_ABI_VERSION: i32 = 0;

/// Default control-node path opened when no pre-opened descriptor is
/// supplied at device creation.
pub const DEFAULT_CONTROL_PATH: &str = "/dev/vhost-scsi";

// =============================================================================
// Virtqueue Topology
// =============================================================================

/// Number of virtqueues per offloaded target.
///
/// The set is fixed at construction: Control, Event, I/O. It is never
/// resized over the life of a device.
pub const QUEUE_COUNT: usize = 3;

// =============================================================================
// Guest Configuration Contract
// =============================================================================
//
// The guest may rewrite parts of the device configuration space while the
// device is running. The sense-buffer and CDB sizes are part of the contract
// with the in-kernel target and cannot be renegotiated; a mismatch has no
// degraded operating mode.
// =============================================================================

/// Fixed sense-buffer size (bytes) shared with the in-kernel target.
pub const SENSE_SIZE: u32 = 96;

/// Fixed CDB size (bytes) shared with the in-kernel target.
pub const CDB_SIZE: u32 = 32;

/// Byte offset of `sense_size` in the guest-visible config space.
pub const SENSE_SIZE_OFFSET: usize = 20;

/// Byte offset of `cdb_size` in the guest-visible config space.
pub const CDB_SIZE_OFFSET: usize = 24;

// =============================================================================
// Guest Status Bits
// =============================================================================

/// Guest has loaded a driver for the device.
pub const VIRTIO_STATUS_DRIVER: u8 = 0x02;

/// Guest driver is ready to drive the device.
pub const VIRTIO_STATUS_DRIVER_OK: u8 = 0x04;

// =============================================================================
// Device Identifier Validation
// =============================================================================
//
// Device ids become log fields and migration-blocker reasons; the allowlist
// keeps them safe for both.
// =============================================================================

/// Valid characters for device ids.
///
/// Includes: `a-z`, `A-Z`, `0-9`, `-`, `_`, `.`
pub const DEVICE_ID_VALID_CHARS: &str =
    "abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789-_.";

/// Maximum device id length.
pub const MAX_DEVICE_ID_LEN: usize = 128;

/// Validates a device id for safety.
///
/// Device ids must be non-empty, at most [`MAX_DEVICE_ID_LEN`] bytes, and
/// drawn from [`DEVICE_ID_VALID_CHARS`].
///
/// # Returns
///
/// `Ok(())` if valid, `Err(reason)` with a description of the failure.
#[inline]
#[must_use = "validation result must be checked before the id is registered"]
pub fn validate_device_id(id: &str) -> std::result::Result<(), &'static str> {
    if id.is_empty() {
        return Err("device id cannot be empty");
    }
    if id.len() > MAX_DEVICE_ID_LEN {
        return Err("device id exceeds maximum length");
    }
    if !id.chars().all(|c| DEVICE_ID_VALID_CHARS.contains(c)) {
        return Err("device id contains invalid characters");
    }
    Ok(())
}
