//! Transport collaborator seam.
//!
//! The control plane never talks to the kernel directly; it drives a
//! [`ControlChannel`] obtained from a [`ControlTransport`]. Production
//! embeddings supply an implementation that opens the control node, maps
//! virtqueue memory and forwards notifications; tests supply a scripted
//! in-memory fake.
//!
//! All calls are synchronous and blocking, made from the thread that owns
//! the device's lifecycle. None of them carry a timeout: a hung channel
//! call blocks the calling thread indefinitely. This is a known limitation
//! of the control plane, preserved deliberately.

use std::io;
use std::os::fd::RawFd;

use crate::wire::ControlOp;

// =============================================================================
// Channel Source
// =============================================================================

/// Where the control channel for a device comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelSource {
    /// Open the compiled-in default control node
    /// ([`crate::constants::DEFAULT_CONTROL_PATH`]).
    DefaultPath,
    /// Adopt a descriptor the embedding process opened ahead of time.
    PreopenedFd(RawFd),
}

// =============================================================================
// Transport Traits
// =============================================================================

/// Opens control channels for new devices.
pub trait ControlTransport: Send + Sync {
    /// Opens a control channel from the given source.
    ///
    /// Called exactly once per device, at creation. The returned channel is
    /// exclusively owned by the device record and closed when the record is
    /// dropped.
    ///
    /// # Errors
    ///
    /// Returns the underlying I/O error if the control node cannot be
    /// opened or the descriptor cannot be adopted.
    fn open(&self, source: &ChannelSource) -> io::Result<Box<dyn ControlChannel>>;
}

/// An open control channel to one in-kernel target.
///
/// Implementations own whatever OS resources back the channel and release
/// them on drop. The lifecycle controller is the only caller; it guarantees
/// `start`/`stop` pairing and never issues concurrent calls on one channel.
pub trait ControlChannel: Send {
    /// Enables guest-side virtqueue notifiers.
    ///
    /// # Errors
    ///
    /// Returns the underlying I/O error; the caller rolls the device back.
    fn enable_notifiers(&mut self) -> io::Result<()>;

    /// Disables guest-side virtqueue notifiers. Infallible by contract;
    /// implementations log their own sub-step failures.
    fn disable_notifiers(&mut self);

    /// Maps virtqueue memory and begins kernel-side polling.
    ///
    /// # Errors
    ///
    /// Returns the underlying I/O error; the caller rolls the device back.
    fn start(&mut self) -> io::Result<()>;

    /// Stops kernel-side polling and unmaps virtqueue memory. Infallible by
    /// contract; implementations log their own sub-step failures.
    fn stop(&mut self);

    /// Issues one control request and returns the raw response bytes.
    ///
    /// # Errors
    ///
    /// A kernel rejection surfaces as an `io::Error` whose
    /// `raw_os_error()` carries the errno.
    fn control_request(&mut self, op: ControlOp, payload: &[u8]) -> io::Result<Vec<u8>>;
}
