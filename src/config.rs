//! # Configuration Management
//!
//! Structured configuration for the client: connection parameters for the
//! session core and pacing parameters for the benchmark driver.
//!
//! ## Configuration Sources
//! - TOML files via `ClientConfig::from_file()`
//! - Direct instantiation with defaults
//! - Command-line overrides applied by the binary
//!
//! The configuration is immutable once a session is constructed from it; no
//! process-wide mutable state exists.

use std::fs;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::core::codec::Wire;
use crate::error::{ProtocolError, Result};

/// Top-level configuration.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct ClientConfig {
    /// Connection and handshake parameters, fixed per session.
    #[serde(default)]
    pub session: SessionConfig,

    /// Driver parameters for single-shot and repeated-run modes.
    #[serde(default)]
    pub driver: DriverConfig,
}

impl ClientConfig {
    /// Load configuration from a TOML file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .map_err(|e| ProtocolError::Config(format!("failed to read config file: {e}")))?;
        Self::from_toml(&contents)
    }

    /// Load configuration from a TOML string.
    pub fn from_toml(content: &str) -> Result<Self> {
        toml::from_str::<Self>(content)
            .map_err(|e| ProtocolError::Config(format!("failed to parse TOML: {e}")))
    }

    /// Validate for common misconfigurations. Empty list means valid.
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();
        errors.extend(self.session.validate());
        errors.extend(self.driver.validate());
        errors
    }

    /// Validate and return a `Result`.
    pub fn validate_strict(&self) -> Result<()> {
        let errors = self.validate();
        if errors.is_empty() {
            Ok(())
        } else {
            Err(ProtocolError::Config(format!(
                "configuration validation failed:\n  - {}",
                errors.join("\n  - ")
            )))
        }
    }
}

/// Immutable per-session connection configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SessionConfig {
    /// Terminal server address, "host:port".
    pub addr: String,

    /// Byte order for every multi-byte integer field: exactly "BigEndian"
    /// or "LittleEndian". Must match the peer; never negotiated.
    pub endian: String,

    /// Session identifier sent in the auth handshake. At most 32 bytes are
    /// significant on the wire.
    pub session_id: String,

    /// Local source port to dial from; 0 picks an ephemeral port.
    pub local_port: u16,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            addr: String::from("localhost:10010"),
            endian: String::from("BigEndian"),
            session_id: String::from("world-wild-only-SSID"),
            local_port: 33456,
        }
    }
}

impl SessionConfig {
    /// Validate connection parameters.
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();

        if self.addr.is_empty() {
            errors.push("session address cannot be empty".to_string());
        } else if !self.addr.contains(':') {
            errors.push(format!(
                "invalid session address '{}' (expected 'host:port')",
                self.addr
            ));
        }

        if let Err(err) = Wire::new(&self.endian) {
            errors.push(err.to_string());
        }

        if self.session_id.is_empty() {
            errors.push("session_id cannot be empty".to_string());
        }

        errors
    }
}

/// Driver-level configuration: what to buy and how often.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DriverConfig {
    /// Basket id sent with every purchase.
    pub basket_id: String,

    /// Barcodes sent with every purchase.
    pub barcodes: Vec<String>,

    /// Number of rounds in repeated-run mode.
    pub round_times: u32,

    /// Delay between rounds in repeated-run mode.
    #[serde(with = "duration_serde")]
    pub round_period: Duration,

    /// Whether a failed send aborts the remaining rounds.
    pub stop_on_error: bool,
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self {
            basket_id: String::from("3345678"),
            barcodes: vec![
                String::from("8888351100042"),
                String::from("9556166090085"),
                String::from("8850025001023"),
            ],
            round_times: 1000,
            round_period: Duration::from_secs(1),
            stop_on_error: false,
        }
    }
}

impl DriverConfig {
    /// Validate driver parameters.
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();

        if self.basket_id.is_empty() {
            errors.push("basket_id cannot be empty".to_string());
        }

        if self.barcodes.is_empty() {
            errors.push("barcode list cannot be empty".to_string());
        }

        if self.round_times == 0 {
            errors.push("round_times must be greater than 0".to_string());
        }

        if self.round_period.is_zero() {
            errors.push("round_period must be greater than 0".to_string());
        }

        errors
    }
}

/// Helper module for Duration serialization as milliseconds.
mod duration_serde {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        (duration.as_millis() as u64).serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let millis = u64::deserialize(deserializer)?;
        Ok(Duration::from_millis(millis))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        assert!(ClientConfig::default().validate().is_empty());
    }

    #[test]
    fn bad_endian_is_flagged() {
        let mut config = ClientConfig::default();
        config.session.endian = String::from("middle");
        let errors = config.validate();
        assert_eq!(errors.len(), 1);
        assert!(errors[0].contains("endian"));
    }

    #[test]
    fn toml_roundtrip_with_overrides() {
        let config = ClientConfig::from_toml(
            r#"
            [session]
            addr = "10.0.0.7:10010"
            endian = "LittleEndian"
            session_id = "floor-3"
            local_port = 0

            [driver]
            basket_id = "77"
            barcodes = ["111", "222"]
            round_times = 5
            round_period = 250
            stop_on_error = true
            "#,
        )
        .expect("parse");
        assert_eq!(config.session.addr, "10.0.0.7:10010");
        assert_eq!(config.session.local_port, 0);
        assert_eq!(config.driver.round_period, Duration::from_millis(250));
        assert!(config.driver.stop_on_error);
        assert!(config.validate().is_empty());
    }

    #[test]
    fn missing_sections_fall_back_to_defaults() {
        let config = ClientConfig::from_toml("").expect("parse");
        assert_eq!(config.session.addr, "localhost:10010");
        assert_eq!(config.driver.round_times, 1000);
    }

    #[test]
    fn zero_rounds_is_flagged() {
        let mut config = ClientConfig::default();
        config.driver.round_times = 0;
        assert!(!config.validate().is_empty());
        assert!(config.validate_strict().is_err());
    }
}
