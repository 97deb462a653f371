//! Endpoint binding.
//!
//! Binding associates a device's virtqueue set with a named SCSI target
//! (WWPN + target port group tag) on the kernel side; unbinding releases
//! it. Both operations send the same fixed-layout request, differing only
//! in opcode.

use tracing::{debug, warn};

use crate::constants::SUPPORTED_ABI_VERSION;
use crate::error::{Error, Result};
use crate::transport::ControlChannel;
use crate::wire::{ControlOp, EndpointRequest};

/// Fallback errno when the transport reports no OS error code (EIO).
const FALLBACK_ERRNO: i32 = 5;

/// Binds the virtqueue set to the (WWPN, TPGT) target.
///
/// # Errors
///
/// Any kernel rejection is translated into [`Error::EndpointBind`] carrying
/// the errno; the caller rolls the device back.
pub fn bind(channel: &mut dyn ControlChannel, wwpn: &str, tpgt: u16) -> Result<()> {
    let request = EndpointRequest {
        abi_version: SUPPORTED_ABI_VERSION,
        wwpn,
        tpgt,
    };
    match channel.control_request(ControlOp::SetEndpoint, &request.encode()) {
        Ok(_) => {
            debug!(wwpn, tpgt, "endpoint bound");
            Ok(())
        }
        Err(err) => Err(Error::EndpointBind {
            errno: err.raw_os_error().unwrap_or(FALLBACK_ERRNO),
        }),
    }
}

/// Releases a previously bound target, best-effort.
///
/// Failure is recorded as a warning and otherwise ignored: by the time the
/// frontend tears down, the kernel-side resource may already be gone, and
/// the binding is considered released from this side regardless of the
/// acknowledgment.
pub fn unbind(channel: &mut dyn ControlChannel, wwpn: &str, tpgt: u16) {
    let request = EndpointRequest {
        abi_version: SUPPORTED_ABI_VERSION,
        wwpn,
        tpgt,
    };
    match channel.control_request(ControlOp::ClearEndpoint, &request.encode()) {
        Ok(_) => debug!(wwpn, tpgt, "endpoint cleared"),
        Err(err) => warn!(
            wwpn,
            tpgt,
            error = %err,
            "failed to clear endpoint; kernel-side target may already be gone"
        ),
    }
}
