//! Capture request configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{CaptureError, Result};

/// Camera streaming port on Bambu printers.
pub const DEFAULT_PORT: u16 = 6000;

/// LAN-mode user every printer accepts.
pub const DEFAULT_USERNAME: &str = "bblp";

/// Overall capture deadline when none is given.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Printer camera connection configuration.
///
/// Immutable once handed to a session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CameraConfig {
    /// Printer host name or IP address.
    pub host: String,
    /// Access code (from printer's LAN mode settings).
    pub access_code: String,
    /// Camera stream port.
    #[serde(default = "default_port")]
    pub port: u16,
    /// Username sent in the auth record.
    #[serde(default = "default_username")]
    pub username: String,
    /// Overall operation timeout.
    #[serde(default = "default_timeout", rename = "timeout_ms", with = "millis")]
    pub timeout: Duration,
}

impl CameraConfig {
    /// Create a new configuration with default port, username and timeout.
    pub fn new(host: impl Into<String>, access_code: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            access_code: access_code.into(),
            port: DEFAULT_PORT,
            username: DEFAULT_USERNAME.to_string(),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Build a configuration from the public operation's arguments.
    pub fn from_options(host: &str, access_code: &str, options: CaptureOptions) -> Self {
        Self {
            host: host.to_string(),
            access_code: access_code.to_string(),
            port: options.port,
            username: options.username,
            timeout: options.timeout,
        }
    }

    /// Override the stream port.
    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Override the auth username.
    pub fn with_username(mut self, username: impl Into<String>) -> Self {
        self.username = username.into();
        self
    }

    /// Override the overall timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Check the request before any I/O happens.
    pub fn validate(&self) -> Result<()> {
        if self.access_code.is_empty() {
            return Err(CaptureError::MissingCredential(format!(
                "no access code for {}",
                self.host
            )));
        }
        if self.host.is_empty() {
            return Err(CaptureError::ConnectFailed("empty host".into()));
        }
        Ok(())
    }

    /// `host:port` string for the TCP connect.
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Timeout in whole milliseconds, as reported in errors.
    pub fn timeout_ms(&self) -> u64 {
        u64::try_from(self.timeout.as_millis()).unwrap_or(u64::MAX)
    }
}

/// Optional settings of [`crate::capture_single_frame`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaptureOptions {
    /// Camera stream port.
    pub port: u16,
    /// Username sent in the auth record.
    pub username: String,
    /// Overall operation timeout.
    pub timeout: Duration,
}

impl Default for CaptureOptions {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            username: DEFAULT_USERNAME.to_string(),
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

fn default_port() -> u16 {
    DEFAULT_PORT
}

fn default_username() -> String {
    DEFAULT_USERNAME.to_string()
}

fn default_timeout() -> Duration {
    DEFAULT_TIMEOUT
}

mod millis {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        let ms = u64::try_from(value.as_millis()).unwrap_or(u64::MAX);
        serializer.serialize_u64(ms)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_millis)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = CameraConfig::new("192.168.1.50", "12345678");
        assert_eq!(config.port, 6000);
        assert_eq!(config.username, "bblp");
        assert_eq!(config.timeout, Duration::from_secs(10));
        assert_eq!(config.addr(), "192.168.1.50:6000");
    }

    #[test]
    fn test_missing_credential() {
        let config = CameraConfig::new("printer.local", "");
        let err = config.validate().unwrap_err();
        assert!(matches!(err, CaptureError::MissingCredential(_)));
    }

    #[test]
    fn test_deserialize_with_defaults() {
        let config: CameraConfig =
            toml::from_str("host = \"x1c.lan\"\naccess_code = \"abcd1234\"\ntimeout_ms = 2500\n")
                .unwrap();
        assert_eq!(config.port, DEFAULT_PORT);
        assert_eq!(config.username, DEFAULT_USERNAME);
        assert_eq!(config.timeout, Duration::from_millis(2500));
    }

    #[test]
    fn test_from_options() {
        let options = CaptureOptions {
            port: 6001,
            username: "operator".into(),
            timeout: Duration::from_millis(2500),
        };
        let config = CameraConfig::from_options("printer.local", "code", options);
        assert_eq!(config.port, 6001);
        assert_eq!(config.username, "operator");
        assert_eq!(config.timeout_ms(), 2500);
        assert!(config.validate().is_ok());
    }
}
