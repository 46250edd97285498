//! Optional TOML settings file.
//!
//! ```toml
//! [printer]
//! host = "192.168.1.50"
//! access_code = "12345678"
//!
//! [capture]
//! timeout_ms = 15000
//! output_dir = "snapshots"
//! ```

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Deserialize;

/// Parsed settings file. Every value is optional; command-line flags win.
#[derive(Debug, Default, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct Settings {
    /// Printer connection values.
    #[serde(default)]
    pub printer: PrinterSettings,
    /// Capture and output values.
    #[serde(default)]
    pub capture: CaptureSettings,
}

/// `[printer]` table.
#[derive(Debug, Default, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct PrinterSettings {
    pub host: Option<String>,
    pub access_code: Option<String>,
    pub port: Option<u16>,
    pub username: Option<String>,
}

/// `[capture]` table.
#[derive(Debug, Default, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct CaptureSettings {
    pub timeout_ms: Option<u64>,
    pub output_dir: Option<PathBuf>,
    pub name: Option<String>,
}

impl Settings {
    /// Read and parse a settings file.
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading settings from {}", path.display()))?;
        Self::parse(&text).with_context(|| format!("parsing {}", path.display()))
    }

    /// Parse settings from TOML text.
    pub fn parse(text: &str) -> Result<Self> {
        Ok(toml::from_str(text)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_full() {
        let settings = Settings::parse(
            r#"
[printer]
host = "192.168.1.50"
access_code = "12345678"
port = 6001
username = "bblp"

[capture]
timeout_ms = 15000
output_dir = "snaps"
name = "x1c"
"#,
        )
        .unwrap();

        assert_eq!(settings.printer.host.as_deref(), Some("192.168.1.50"));
        assert_eq!(settings.printer.port, Some(6001));
        assert_eq!(settings.capture.timeout_ms, Some(15000));
        assert_eq!(settings.capture.output_dir, Some(PathBuf::from("snaps")));
    }

    #[test]
    fn test_parse_empty() {
        assert_eq!(Settings::parse("").unwrap(), Settings::default());
    }

    #[test]
    fn test_rejects_unknown_keys() {
        assert!(Settings::parse("[printer]\nserial = \"01P00A\"\n").is_err());
    }

    #[test]
    fn test_load_missing_file() {
        let tmp = tempfile::tempdir().unwrap();
        let err = Settings::load(&tmp.path().join("absent.toml")).unwrap_err();
        assert!(err.to_string().contains("reading settings"));
    }
}
