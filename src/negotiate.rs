//! ABI negotiation with the in-kernel target.

use tracing::{debug, error};

use crate::constants::SUPPORTED_ABI_VERSION;
use crate::error::{Error, Result};
use crate::transport::ControlChannel;
use crate::wire::{decode_abi_version, ControlOp};

/// Queries the kernel's control ABI version and enforces the
/// forward-compatibility policy.
///
/// A reported version greater than [`SUPPORTED_ABI_VERSION`] is a hard
/// compatibility failure: the caller must not proceed to endpoint binding.
/// Lower or equal versions are accepted without behavioral branching; the
/// reported value is returned so the caller can record it for diagnostics.
///
/// # Errors
///
/// - [`Error::Transport`]: the version query itself failed
/// - [`Error::ShortResponse`]: the response was shorter than 4 bytes
/// - [`Error::UnsupportedAbi`]: the kernel is newer than this frontend
pub fn negotiate(channel: &mut dyn ControlChannel) -> Result<i32> {
    let response = channel
        .control_request(ControlOp::GetAbiVersion, &[])
        .map_err(|source| Error::Transport {
            op: "abi version query",
            source,
        })?;
    let reported = decode_abi_version(&response)?;

    if reported > SUPPORTED_ABI_VERSION {
        error!(
            reported,
            supported = SUPPORTED_ABI_VERSION,
            "kernel target abi is newer than this frontend supports"
        );
        return Err(Error::UnsupportedAbi {
            reported,
            supported: SUPPORTED_ABI_VERSION,
        });
    }

    debug!(reported, "abi version negotiated");
    Ok(reported)
}
