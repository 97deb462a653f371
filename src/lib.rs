//! # vhost-scsi-ctl
//!
//! **Control-plane lifecycle manager for kernel-offloaded SCSI targets**
//!
//! This crate manages the frontend side of a virtio-scsi device whose I/O
//! processing is delegated to an in-kernel target over a shared virtqueue
//! transport. The frontend owns device identity, protocol negotiation,
//! endpoint binding, and safe start/stop sequencing; it never processes
//! queue descriptors itself.
//!
//! # Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │                          vhost-scsi-ctl                             │
//! ├─────────────────────────────────────────────────────────────────────┤
//! │  ┌─────────────────────────────────────────────────────────────┐    │
//! │  │                      TargetRegistry                         │    │
//! │  │        add(config) → find(id) → start/stop → remove(id)     │    │
//! │  └──────────────────────────────┬──────────────────────────────┘    │
//! │                                 │                                   │
//! │  ┌──────────────────────────────┼──────────────────────────────┐    │
//! │  │               Lifecycle Controller (per device)             │    │
//! │  │  notifiers → transport start → negotiate ABI → bind endpoint│    │
//! │  │          rollback in reverse order on partial failure       │    │
//! │  └──────────────────────────────┼──────────────────────────────┘    │
//! │                                 │                                   │
//! │  ┌──────────────────────────────┼──────────────────────────────┐    │
//! │  │                  ControlChannel (trait seam)                │    │
//! │  │   fixed-layout control requests │ virtqueue mapping │ irq   │    │
//! │  └─────────────────────────────────────────────────────────────┘    │
//! ├─────────────────────────────────────────────────────────────────────┤
//! │                  in-kernel SCSI target (external)                   │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Device Lifecycle
//!
//! ```text
//!                 start                        stop
//!   ┌─────────┐ ─────────► ┌──────────┐     ┌──────────┐
//!   │ Stopped │            │ Starting │     │ Stopping │
//!   └─────────┘ ◄───────── └────┬─────┘     └────┬─────┘
//!        ▲       rollback       │ handshake      │
//!        │                      ▼ complete       │
//!        │                 ┌─────────┐           │
//!        └──────────────── │ Running │ ──────────┘
//!                          └─────────┘  (blocker armed)
//! ```
//!
//! A failed start always rolls back fully to `Stopped` — there is no error
//! state, and no virtqueue registration or notifier handle outlives the
//! attempt. Stop is best-effort throughout because the kernel-side state
//! may already have diverged.
//!
//! # Migration
//!
//! The in-kernel target's state cannot be migrated with the VM. Every
//! running device arms a blocker in a [`MigrationBlockers`] registry that
//! the embedding system consults before migrating; the blocker is disarmed
//! on stop. A device's blocker exists if and only if it is `Running`.
//!
//! # Concurrency Model
//!
//! All control operations are synchronous, blocking calls made from the
//! thread that owns the device's request dispatch. The registry map is the
//! only structure shared across threads, behind a single mutex; each device
//! is locked individually for the whole of a start/stop transition. No
//! control operation carries a timeout — a hung channel call blocks its
//! caller, a known limitation preserved from the reference behavior.
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use vhost_scsi_ctl::{MigrationBlockers, TargetConfig, TargetRegistry};
//!
//! let blockers = Arc::new(MigrationBlockers::new());
//! let registry = TargetRegistry::new(Box::new(transport), Arc::clone(&blockers));
//!
//! registry.add(&TargetConfig::new("tgt0", "naa.600140554cf3a18e").with_tpgt(1))?;
//! registry.start("tgt0")?;
//! assert!(blockers.is_blocked());
//!
//! registry.stop("tgt0")?;
//! registry.remove("tgt0")?;
//! # Ok::<(), vhost_scsi_ctl::Error>(())
//! ```

pub mod config;
pub mod constants;
pub mod device;
pub mod endpoint;
pub mod error;
pub mod lifecycle;
pub mod migration;
pub mod negotiate;
pub mod registry;
pub mod transport;
pub mod wire;

// Re-exports
pub use config::TargetConfig;
pub use constants::*;
pub use device::{DeviceState, TargetDevice, TargetStatus, Virtqueue, VirtqueueRole};
pub use error::{Error, Result};
pub use migration::{BlockerHandle, MigrationBlockers};
pub use negotiate::negotiate;
pub use registry::{DeviceHandle, TargetRegistry};
pub use transport::{ChannelSource, ControlChannel, ControlTransport};
pub use wire::{decode_abi_version, ControlOp, EndpointRequest, ENDPOINT_REQUEST_LEN, WWPN_FIELD_LEN};
