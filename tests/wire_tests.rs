//! Tests for the control request codec.
//!
//! Validates the fixed wire layout independent of any kernel channel.

use vhost_scsi_ctl::{
    decode_abi_version, ControlOp, EndpointRequest, Error, ENDPOINT_REQUEST_LEN, WWPN_FIELD_LEN,
};

// =============================================================================
// Layout
// =============================================================================

#[test]
fn test_request_is_exactly_232_bytes() {
    assert_eq!(ENDPOINT_REQUEST_LEN, 232);
    assert_eq!(WWPN_FIELD_LEN, 224);

    let req = EndpointRequest {
        abi_version: 0,
        wwpn: "naa.5001405",
        tpgt: 0,
    };
    assert_eq!(req.encode().len(), ENDPOINT_REQUEST_LEN);
}

#[test]
fn test_field_offsets() {
    let req = EndpointRequest {
        abi_version: -2,
        wwpn: "ab",
        tpgt: 0xBEEF,
    };
    let buf = req.encode();

    assert_eq!(&buf[..4], &(-2i32).to_le_bytes());
    assert_eq!(&buf[4..6], b"ab");
    assert_eq!(&buf[228..230], &0xBEEFu16.to_le_bytes());
    assert_eq!(&buf[230..232], &[0, 0]);
}

// =============================================================================
// WWPN Encoding Properties
// =============================================================================

#[test]
fn test_same_wwpn_encodes_identically() {
    let encode = |wwpn: &str| {
        EndpointRequest {
            abi_version: 0,
            wwpn,
            tpgt: 3,
        }
        .encode()
    };
    assert_eq!(encode("naa.600140554cf3a18e"), encode("naa.600140554cf3a18e"));
}

#[test]
fn test_overlong_wwpn_truncates_at_field_boundary() {
    let long = "a".repeat(WWPN_FIELD_LEN * 2);
    let buf = EndpointRequest {
        abi_version: 0,
        wwpn: &long,
        tpgt: 0x0101,
    }
    .encode();

    assert!(buf[4..4 + WWPN_FIELD_LEN].iter().all(|&b| b == b'a'));
    // truncation is deterministic and never overruns the tpgt field
    assert_eq!(&buf[228..230], &0x0101u16.to_le_bytes());
}

#[test]
fn test_short_wwpn_is_nul_padded() {
    let buf = EndpointRequest {
        abi_version: 0,
        wwpn: "naa.1",
        tpgt: 0,
    }
    .encode();

    assert_eq!(&buf[4..9], b"naa.1");
    assert!(buf[9..4 + WWPN_FIELD_LEN].iter().all(|&b| b == 0));
}

// =============================================================================
// Response Decoding
// =============================================================================

#[test]
fn test_abi_version_round_trip() {
    for version in [0i32, 1, 5, i32::MAX, -1] {
        assert_eq!(decode_abi_version(&version.to_le_bytes()).unwrap(), version);
    }
}

#[test]
fn test_short_abi_response_is_an_error() {
    for len in 0..4 {
        let err = decode_abi_version(&vec![0u8; len]).unwrap_err();
        assert!(matches!(err, Error::ShortResponse { got, .. } if got == len));
    }
}

#[test]
fn test_extra_response_bytes_are_ignored() {
    let mut response = 9i32.to_le_bytes().to_vec();
    response.extend_from_slice(&[0xFF; 8]);
    assert_eq!(decode_abi_version(&response).unwrap(), 9);
}

// =============================================================================
// Opcodes
// =============================================================================

#[test]
fn test_opcode_values_are_stable() {
    assert_eq!(ControlOp::SetEndpoint.opcode(), 0x40);
    assert_eq!(ControlOp::ClearEndpoint.opcode(), 0x41);
    assert_eq!(ControlOp::GetAbiVersion.opcode(), 0x42);
}

#[test]
fn test_opcode_display_names() {
    assert_eq!(ControlOp::SetEndpoint.to_string(), "set-endpoint");
    assert_eq!(ControlOp::ClearEndpoint.to_string(), "clear-endpoint");
    assert_eq!(ControlOp::GetAbiVersion.to_string(), "get-abi-version");
}
