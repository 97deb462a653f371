//! Error types for the offload control plane.

/// Result type alias for control-plane operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in the offload control plane.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    // =========================================================================
    // Creation Errors
    // =========================================================================
    /// A required creation parameter was absent or empty.
    #[error("missing required field: {field}")]
    MissingField { field: &'static str },

    /// Device id failed allowlist validation.
    #[error("invalid device id '{id}': {reason}")]
    InvalidId { id: String, reason: &'static str },

    /// A numeric creation parameter was out of range.
    #[error("{field} out of range: {value} > {max}")]
    InvalidRange {
        field: &'static str,
        value: u64,
        max: u64,
    },

    /// A device with this id is already registered.
    #[error("device already exists: {0}")]
    DuplicateId(String),

    /// No device with this id is registered.
    #[error("device not found: {0}")]
    NotFound(String),

    /// Opening the control channel failed; the device was not registered.
    #[error("failed to open control channel: {source}")]
    ChannelOpenFailed {
        #[source]
        source: std::io::Error,
    },

    // =========================================================================
    // Start-Time Errors
    // =========================================================================
    /// A transport call failed during start; the device rolled back to
    /// Stopped.
    #[error("transport error during {op}: {source}")]
    Transport {
        op: &'static str,
        #[source]
        source: std::io::Error,
    },

    /// The in-kernel target implements a newer control ABI than this
    /// frontend supports.
    #[error(
        "kernel target abi_version {reported} is greater than the supported \
         version {supported}; upgrade this frontend"
    )]
    UnsupportedAbi { reported: i32, supported: i32 },

    /// The kernel rejected the set-endpoint request.
    #[error("failed to bind endpoint: errno {errno}")]
    EndpointBind { errno: i32 },

    /// A control response was shorter than its fixed layout requires.
    #[error("short {op} response: expected {expected} bytes, got {got}")]
    ShortResponse {
        op: &'static str,
        expected: usize,
        got: usize,
    },

    // =========================================================================
    // State Errors
    // =========================================================================
    /// Start was requested on a device that is not Stopped.
    #[error("device '{0}' is already active")]
    AlreadyActive(String),

    /// Removal was requested on a device that is not Stopped.
    #[error("device '{id}' is still active (state '{state}')")]
    StillActive { id: String, state: String },

    // =========================================================================
    // Runtime Errors
    // =========================================================================
    /// The guest rewrote a config field that the in-kernel target cannot
    /// renegotiate. There is no degraded mode for this; see
    /// [`Error::is_fatal`].
    #[error("guest changed {field} to {guest}, device is fixed at {host}")]
    ConfigMismatch {
        field: &'static str,
        guest: u32,
        host: u32,
    },

    // =========================================================================
    // Internal Errors
    // =========================================================================
    /// Internal error (should not happen).
    #[error("internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Returns true for errors with no safe recovery path.
    ///
    /// The embedding driver decides whether a fatal error terminates the
    /// process or only the affected device; library code never exits.
    #[must_use]
    pub fn is_fatal(&self) -> bool {
        matches!(self, Error::ConfigMismatch { .. })
    }
}
