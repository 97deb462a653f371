//! Control request codec.
//!
//! This module defines the fixed-layout messages exchanged with the
//! in-kernel target over the control channel.
//!
//! # Wire Format
//!
//! Every endpoint request is exactly [`ENDPOINT_REQUEST_LEN`] bytes:
//!
//! ```text
//! offset  size  field
//! ------  ----  -----------------------------------------
//!      0     4  abi_version   (i32, little-endian)
//!      4   224  wwpn          (NUL-padded or truncated)
//!    228     2  tpgt          (u16, little-endian)
//!    230     2  reserved      (zero)
//! ```
//!
//! The layout is produced by explicit serialization routines rather than
//! struct packing, so it is byte-for-byte stable across compilers and
//! testable without a kernel channel.
//!
//! # Requests
//!
//! | Opcode | Request | Payload | Response |
//! |--------|---------------|------------------------|----------------|
//! | `0x40` | SetEndpoint   | endpoint request bytes | empty          |
//! | `0x41` | ClearEndpoint | endpoint request bytes | empty          |
//! | `0x42` | GetAbiVersion | empty                  | i32 LE version |

use crate::error::{Error, Result};

// =============================================================================
// Constants
// =============================================================================

/// Fixed length of the WWPN field on the wire.
pub const WWPN_FIELD_LEN: usize = 224;

/// Total encoded length of an endpoint request.
pub const ENDPOINT_REQUEST_LEN: usize = 4 + WWPN_FIELD_LEN + 2 + 2;

/// Length of a get-ABI-version response.
pub const ABI_VERSION_LEN: usize = 4;

// =============================================================================
// Control Opcodes
// =============================================================================

/// Control-channel request opcodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ControlOp {
    /// Bind a virtqueue set to a (WWPN, TPGT) target.
    SetEndpoint,
    /// Release a previously bound target.
    ClearEndpoint,
    /// Query the control ABI version the kernel implements.
    GetAbiVersion,
}

impl ControlOp {
    /// Returns the wire opcode.
    #[must_use]
    pub fn opcode(self) -> u32 {
        match self {
            ControlOp::SetEndpoint => 0x40,
            ControlOp::ClearEndpoint => 0x41,
            ControlOp::GetAbiVersion => 0x42,
        }
    }
}

impl std::fmt::Display for ControlOp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ControlOp::SetEndpoint => write!(f, "set-endpoint"),
            ControlOp::ClearEndpoint => write!(f, "clear-endpoint"),
            ControlOp::GetAbiVersion => write!(f, "get-abi-version"),
        }
    }
}

// =============================================================================
// Endpoint Request
// =============================================================================

/// Payload of the SetEndpoint and ClearEndpoint requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EndpointRequest<'a> {
    /// ABI version this frontend was compiled against.
    pub abi_version: i32,
    /// Target port name; truncated or NUL-padded to [`WWPN_FIELD_LEN`].
    pub wwpn: &'a str,
    /// Target port group tag.
    pub tpgt: u16,
}

impl EndpointRequest<'_> {
    /// Encodes the request into its fixed wire layout.
    ///
    /// The buffer is freshly zeroed on every call, so a WWPN shorter than
    /// the field never inherits bytes from a previous encode, and a longer
    /// one is truncated at exactly [`WWPN_FIELD_LEN`] bytes.
    #[must_use]
    pub fn encode(&self) -> [u8; ENDPOINT_REQUEST_LEN] {
        let mut buf = [0u8; ENDPOINT_REQUEST_LEN];
        buf[..4].copy_from_slice(&self.abi_version.to_le_bytes());

        let wwpn = self.wwpn.as_bytes();
        let len = wwpn.len().min(WWPN_FIELD_LEN);
        buf[4..4 + len].copy_from_slice(&wwpn[..len]);

        let tpgt_off = 4 + WWPN_FIELD_LEN;
        buf[tpgt_off..tpgt_off + 2].copy_from_slice(&self.tpgt.to_le_bytes());
        // reserved bytes stay zero
        buf
    }
}

// =============================================================================
// Response Decoding
// =============================================================================

/// Decodes the integer version out of a GetAbiVersion response.
///
/// # Errors
///
/// Returns [`Error::ShortResponse`] if the response is shorter than the
/// fixed 4-byte layout.
pub fn decode_abi_version(response: &[u8]) -> Result<i32> {
    let bytes: [u8; ABI_VERSION_LEN] =
        response
            .get(..ABI_VERSION_LEN)
            .and_then(|b| b.try_into().ok())
            .ok_or(Error::ShortResponse {
                op: "get-abi-version",
                expected: ABI_VERSION_LEN,
                got: response.len(),
            })?;
    Ok(i32::from_le_bytes(bytes))
}
