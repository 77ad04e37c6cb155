// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Adapter configuration.

use std::path::Path;

use serde::{Deserialize, Serialize};
use crate::error::Result;

/// Which authorization `requestPermissions` asks the platform for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AuthorizationLevel {
    /// Background authorization, required for crossings while suspended.
    Always,
    WhenInUse,
}

/// Host-supplied adapter settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct AdapterConfig {
    /// Authorization level requested from the platform.
    pub authorization: AuthorizationLevel,
    /// Resolve `requestPermissions` through the error callback when the
    /// answer is denied or restricted, instead of returning the state.
    pub denied_is_error: bool,
    /// `tracing` filter used when `RUST_LOG` is not set.
    pub log_filter: String,
}

impl Default for AdapterConfig {
    fn default() -> Self {
        Self {
            authorization: AuthorizationLevel::Always,
            denied_is_error: false,
            log_filter: "info".into(),
        }
    }
}

impl AdapterConfig {
    /// Read a JSON config file. Missing keys take their defaults.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let data = std::fs::read_to_string(path.as_ref())?;
        let config = serde_json::from_str(&data)?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_request_always() {
        let config = AdapterConfig::default();
        assert_eq!(config.authorization, AuthorizationLevel::Always);
        assert!(!config.denied_is_error);
    }

    #[test]
    fn partial_file_fills_in_defaults() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("geofencing.json");
        std::fs::write(&path, r#"{"authorization": "when-in-use"}"#).expect("write");

        let config = AdapterConfig::load(&path).expect("load");
        assert_eq!(config.authorization, AuthorizationLevel::WhenInUse);
        assert_eq!(config.log_filter, "info");
    }

    #[test]
    fn written_config_loads_back() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("geofencing.json");
        let config = AdapterConfig {
            denied_is_error: true,
            log_filter: "debug".into(),
            ..AdapterConfig::default()
        };
        std::fs::write(&path, serde_json::to_string_pretty(&config).expect("serialize"))
            .expect("write");
        assert_eq!(AdapterConfig::load(&path).expect("load"), config);
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        assert!(matches!(
            AdapterConfig::load(dir.path().join("absent.json")),
            Err(crate::GeofenceError::Io(_))
        ));
    }

    #[test]
    fn malformed_file_is_a_serialization_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("broken.json");
        std::fs::write(&path, "{ not json").expect("write");
        assert!(matches!(
            AdapterConfig::load(&path),
            Err(crate::GeofenceError::Serialization(_))
        ));
    }
}
