//! Device creation parameters.
//!
//! A [`TargetConfig`] carries everything needed to register one offloaded
//! target. The embedding system builds it from its own option parser or
//! deserializes it straight from configuration (the struct derives serde).
//!
//! Validation happens before any OS resource is touched: the registry calls
//! [`TargetConfig::validate`] and only then opens the control channel.

use serde::{Deserialize, Serialize};
use std::os::fd::RawFd;

use crate::constants::validate_device_id;
use crate::error::{Error, Result};
use crate::transport::ChannelSource;

/// Creation parameters for one offloaded target.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TargetConfig {
    /// Unique device id.
    pub id: String,
    /// World Wide Port Name of the target endpoint.
    pub wwpn: String,
    /// Target port group tag. Required; carried wide so an out-of-range
    /// value is reported instead of silently wrapping.
    #[serde(default)]
    pub tpgt: Option<u32>,
    /// Pre-opened control descriptor. When absent, the transport opens the
    /// default control node.
    #[serde(default)]
    pub vhostfd: Option<RawFd>,
}

impl TargetConfig {
    /// Creates a config with the required fields set.
    #[must_use]
    pub fn new(id: impl Into<String>, wwpn: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            wwpn: wwpn.into(),
            tpgt: None,
            vhostfd: None,
        }
    }

    /// Sets the target port group tag.
    #[must_use]
    pub fn with_tpgt(mut self, tpgt: u32) -> Self {
        self.tpgt = Some(tpgt);
        self
    }

    /// Supplies a pre-opened control descriptor.
    #[must_use]
    pub fn with_vhostfd(mut self, fd: RawFd) -> Self {
        self.vhostfd = Some(fd);
        self
    }

    /// Validates the config and returns the narrowed port group tag.
    ///
    /// An absent `tpgt` is rejected rather than defaulted: the kernel-side
    /// endpoint is identified by the (WWPN, TPGT) pair and a guessed tag
    /// would bind the wrong target.
    ///
    /// # Errors
    ///
    /// - [`Error::MissingField`]: empty `id`, empty `wwpn`, or absent `tpgt`
    /// - [`Error::InvalidId`]: `id` fails allowlist validation
    /// - [`Error::InvalidRange`]: `tpgt` does not fit in 16 bits
    pub fn validate(&self) -> Result<u16> {
        if self.id.is_empty() {
            return Err(Error::MissingField { field: "id" });
        }
        if let Err(reason) = validate_device_id(&self.id) {
            return Err(Error::InvalidId {
                id: self.id.clone(),
                reason,
            });
        }
        if self.wwpn.is_empty() {
            return Err(Error::MissingField { field: "wwpn" });
        }
        let tpgt = self.tpgt.ok_or(Error::MissingField { field: "tpgt" })?;
        u16::try_from(tpgt).map_err(|_| Error::InvalidRange {
            field: "tpgt",
            value: u64::from(tpgt),
            max: u64::from(u16::MAX),
        })
    }

    /// Returns where the control channel for this device comes from.
    #[must_use]
    pub fn channel_source(&self) -> ChannelSource {
        match self.vhostfd {
            Some(fd) => ChannelSource::PreopenedFd(fd),
            None => ChannelSource::DefaultPath,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_accepts_full_config() {
        let config = TargetConfig::new("tgt0", "naa.5001405").with_tpgt(1);
        assert_eq!(config.validate().unwrap(), 1);
    }

    #[test]
    fn test_validate_rejects_missing_fields() {
        let err = TargetConfig::new("", "naa.5001405")
            .with_tpgt(1)
            .validate()
            .unwrap_err();
        assert!(matches!(err, Error::MissingField { field: "id" }));

        let err = TargetConfig::new("tgt0", "")
            .with_tpgt(1)
            .validate()
            .unwrap_err();
        assert!(matches!(err, Error::MissingField { field: "wwpn" }));

        let err = TargetConfig::new("tgt0", "naa.5001405")
            .validate()
            .unwrap_err();
        assert!(matches!(err, Error::MissingField { field: "tpgt" }));
    }

    #[test]
    fn test_validate_rejects_out_of_range_tpgt() {
        let err = TargetConfig::new("tgt0", "naa.5001405")
            .with_tpgt(65_536)
            .validate()
            .unwrap_err();
        assert!(matches!(
            err,
            Error::InvalidRange {
                field: "tpgt",
                value: 65_536,
                max: 65_535,
            }
        ));
    }

    #[test]
    fn test_validate_rejects_unsafe_id() {
        let err = TargetConfig::new("tgt/0", "naa.5001405")
            .with_tpgt(0)
            .validate()
            .unwrap_err();
        assert!(matches!(err, Error::InvalidId { .. }));
    }

    #[test]
    fn test_channel_source() {
        let config = TargetConfig::new("tgt0", "naa.5001405").with_tpgt(0);
        assert_eq!(config.channel_source(), ChannelSource::DefaultPath);

        let config = config.with_vhostfd(12);
        assert_eq!(config.channel_source(), ChannelSource::PreopenedFd(12));
    }

    #[test]
    fn test_deserializes_from_json() {
        let config: TargetConfig =
            serde_json::from_str(r#"{"id":"tgt0","wwpn":"naa.5001405","tpgt":4}"#).unwrap();
        assert_eq!(config.id, "tgt0");
        assert_eq!(config.validate().unwrap(), 4);
        assert!(config.vhostfd.is_none());
    }
}
