// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! User-facing adapter settings (which receivers run, debugging).

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info};

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),
}

/// Which D-Bus bus to serve the adapter on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BusKind {
    #[default]
    Session,
    System,
}

/// Adapter settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdapterSettings {
    /// Run the audio-only receiver and expose its output property.
    #[serde(default = "default_true")]
    pub audio: bool,
    /// Run the video receiver and expose its audio output property.
    #[serde(default = "default_true")]
    pub video: bool,
    /// Verbose logging, and verbose output from the video receiver.
    #[serde(default)]
    pub debugging: bool,
    /// Stop receivers through `sudo`.
    #[serde(default = "default_true")]
    pub privileged_stop: bool,
    #[serde(default)]
    pub bus: BusKind,
    /// Upper bound on each enumeration query.
    #[serde(default = "default_query_timeout_secs")]
    pub query_timeout_secs: u64,
}

fn default_true() -> bool {
    true
}

fn default_query_timeout_secs() -> u64 {
    crate::audio::command::DEFAULT_QUERY_TIMEOUT.as_secs()
}

impl Default for AdapterSettings {
    fn default() -> Self {
        Self {
            audio: true,
            video: true,
            debugging: false,
            privileged_stop: true,
            bus: BusKind::default(),
            query_timeout_secs: default_query_timeout_secs(),
        }
    }
}

impl AdapterSettings {
    pub fn from_toml(s: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(s)
    }

    /// Load settings; a missing file yields defaults.
    pub fn load(path: &Path) -> Result<Self, SettingsError> {
        if !path.exists() {
            debug!("No settings at {:?}, using defaults", path);
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path)?;
        let settings = Self::from_toml(&content)?;
        info!("Loaded settings from {:?}", path);
        Ok(settings)
    }

    pub fn query_timeout(&self) -> Duration {
        Duration::from_secs(self.query_timeout_secs.max(1))
    }
}
