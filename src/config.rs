//! # Configuration Management
//!
//! Centralized configuration for the network client.
//!
//! This module provides protocol constants plus structured configuration for
//! peer connections: timeouts, pending-request table capacity, frame size
//! limits, checksum policy, and the local handshake identity.
//!
//! ## Configuration Sources
//! - TOML files via `from_file()`
//! - Direct instantiation with defaults, or `default_with_overrides()`

use crate::error::{ProtocolError, Result};
use crate::utils::timeout;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::Read;
use std::path::Path;
use std::time::Duration;

/// Magic constant identifying protocol frames (`0x12345678`).
pub const PROTOCOL_MAGIC: i32 = 0x1234_5678;

/// Max allowed frame length field before the stream is considered corrupt.
pub const MAX_FRAME_SIZE: usize = 10 * 1024 * 1024;

/// Max plausible declared-address length in a remote handshake.
pub const MAX_DECLARED_ADDRESS_SIZE: usize = 1024;

/// Max plausible total handshake record length.
pub const MAX_HANDSHAKE_SIZE: usize = 4096;

/// Bound on the pending-request table; the least-recently-used unsettled
/// entry is evicted past this point.
pub const DEFAULT_PENDING_CAPACITY: usize = 100;

/// Default protocol version announced in the local handshake.
pub const NODE_VERSION: (i32, i32, i32) = (0, 13, 1);

/// Client configuration for a single peer connection.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ClientConfig {
    /// Timeout for a TCP connect plus remote handshake
    #[serde(with = "duration_serde")]
    pub connect_timeout: Duration,

    /// Timeout for an outstanding request waiting for its reply
    #[serde(with = "duration_serde")]
    pub request_timeout: Duration,

    /// Capacity of the pending-request table
    pub pending_capacity: usize,

    /// Frames whose length field exceeds this are treated as stream corruption
    pub max_frame_size: usize,

    /// Whether a payload checksum mismatch fails the frame (default: log only)
    pub enforce_checksums: bool,

    /// Identity announced to remote peers
    #[serde(default)]
    pub identity: NodeIdentity,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            connect_timeout: timeout::DEFAULT_CONNECT_TIMEOUT,
            request_timeout: timeout::DEFAULT_REQUEST_TIMEOUT,
            pending_capacity: DEFAULT_PENDING_CAPACITY,
            max_frame_size: MAX_FRAME_SIZE,
            enforce_checksums: false,
            identity: NodeIdentity::default(),
        }
    }
}

impl ClientConfig {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut file = File::open(path)
            .map_err(|e| ProtocolError::ConfigError(format!("Failed to open config file: {e}")))?;

        let mut contents = String::new();
        file.read_to_string(&mut contents)
            .map_err(|e| ProtocolError::ConfigError(format!("Failed to read config file: {e}")))?;

        Self::from_toml(&contents)
    }

    /// Load configuration from TOML string
    pub fn from_toml(content: &str) -> Result<Self> {
        toml::from_str::<Self>(content)
            .map_err(|e| ProtocolError::ConfigError(format!("Failed to parse TOML: {e}")))
    }

    /// Apply overrides to the default configuration
    pub fn default_with_overrides<F>(mutator: F) -> Self
    where
        F: FnOnce(&mut Self),
    {
        let mut config = Self::default();
        mutator(&mut config);
        config
    }

    /// Validate the configuration for common misconfigurations.
    ///
    /// Returns a list of validation errors. Empty list means the
    /// configuration is valid.
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();

        if self.request_timeout.as_millis() < 100 {
            errors.push("Request timeout too short (minimum: 100ms)".to_string());
        } else if self.request_timeout.as_secs() > 300 {
            errors.push("Request timeout too long (maximum: 300s)".to_string());
        }

        if self.connect_timeout.as_millis() < 100 {
            errors.push("Connect timeout too short (minimum: 100ms)".to_string());
        }

        if self.pending_capacity == 0 {
            errors.push("Pending-request capacity must be greater than 0".to_string());
        } else if self.pending_capacity > 100_000 {
            errors.push(format!(
                "Pending-request capacity very high: {} (each entry pins a waiter)",
                self.pending_capacity
            ));
        }

        if self.max_frame_size < 1024 {
            errors.push("Max frame size too small (minimum: 1 KB)".to_string());
        } else if self.max_frame_size > 100 * 1024 * 1024 {
            errors.push(format!(
                "Max frame size too large: {} bytes (maximum recommended: 100 MB)",
                self.max_frame_size
            ));
        }

        errors.extend(self.identity.validate());

        errors
    }

    /// Validate and return Result - convenience method
    pub fn validate_strict(&self) -> Result<()> {
        let errors = self.validate();
        if errors.is_empty() {
            Ok(())
        } else {
            Err(ProtocolError::ConfigError(format!(
                "Configuration validation failed:\n  - {}",
                errors.join("\n  - ")
            )))
        }
    }
}

/// Identity announced in the local half of the handshake.
///
/// The application name carries the network prefix as its last character
/// (`W` mainnet, `T` testnet), which is how peers reject cross-network
/// connections.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct NodeIdentity {
    /// Application name including network prefix (e.g. "wavesW")
    pub app_name: String,

    /// Announced protocol version
    pub version: (i32, i32, i32),

    /// Free-form node name shown to peers
    pub node_name: String,

    /// Declared listening address bytes; empty for a non-listening crawler
    #[serde(default)]
    pub declared_address: Vec<u8>,
}

impl Default for NodeIdentity {
    fn default() -> Self {
        Self::for_network('W')
    }
}

impl NodeIdentity {
    /// Identity for the network with the given prefix character.
    pub fn for_network(prefix: char) -> Self {
        Self {
            app_name: format!("waves{prefix}"),
            version: NODE_VERSION,
            node_name: String::from("name"),
            declared_address: Vec::new(),
        }
    }

    /// Validate identity fields against wire-format limits
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();

        if self.app_name.is_empty() {
            errors.push("Application name cannot be empty".to_string());
        } else if self.app_name.len() > u8::MAX as usize {
            errors.push(format!(
                "Application name too long: {} bytes (maximum: 255)",
                self.app_name.len()
            ));
        }

        if self.node_name.len() > u8::MAX as usize {
            errors.push(format!(
                "Node name too long: {} bytes (maximum: 255)",
                self.node_name.len()
            ));
        }

        if self.declared_address.len() > MAX_DECLARED_ADDRESS_SIZE {
            errors.push(format!(
                "Declared address too long: {} bytes (maximum: {})",
                self.declared_address.len(),
                MAX_DECLARED_ADDRESS_SIZE
            ));
        }

        errors
    }
}

/// Helper module for Duration serialization/deserialization
mod duration_serde {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let millis = duration.as_millis() as u64;
        millis.serialize(serializer)
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
    fn test_default_config_is_valid() {
        assert!(ClientConfig::default().validate().is_empty());
    }

    #[test]
    fn test_zero_capacity_rejected() {
        let config = ClientConfig::default_with_overrides(|c| c.pending_capacity = 0);
        assert!(config.validate_strict().is_err());
    }

    #[test]
    fn test_network_prefix() {
        assert_eq!(NodeIdentity::for_network('T').app_name, "wavesT");
        assert_eq!(NodeIdentity::default().app_name, "wavesW");
    }

    #[test]
    fn test_toml_roundtrip() {
        let config = ClientConfig::default();
        let toml = toml::to_string(&config).unwrap();
        let parsed = ClientConfig::from_toml(&toml).unwrap();
        assert_eq!(parsed.request_timeout, config.request_timeout);
        assert_eq!(parsed.pending_capacity, config.pending_capacity);
        assert_eq!(parsed.identity.app_name, config.identity.app_name);
    }
}
