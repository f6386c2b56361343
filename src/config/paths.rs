// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Fixed per-installation file locations.

use directories::BaseDirs;
use std::path::{Path, PathBuf};
use thiserror::Error;

const ADDON_NAME: &str = "airport";

/// Environment variable overriding the gateway's home directory.
pub const HOME_ENV: &str = "MOZIOT_HOME";

#[derive(Debug, Error)]
pub enum PathsError {
    #[error("Failed to determine home directory")]
    NoHomeDir,
}

/// Where the adapter, its receivers and its data live.
#[derive(Debug, Clone)]
pub struct InstallPaths {
    addon_dir: PathBuf,
    data_dir: PathBuf,
}

impl InstallPaths {
    /// Resolve paths from `$MOZIOT_HOME`, falling back to `~/.mozilla-iot`.
    pub fn discover() -> Result<Self, PathsError> {
        let base = match std::env::var_os(HOME_ENV) {
            Some(home) if !home.is_empty() => PathBuf::from(home),
            _ => BaseDirs::new()
                .map(|d| d.home_dir().join(".mozilla-iot"))
                .ok_or(PathsError::NoHomeDir)?,
        };
        Ok(Self::from_base(&base))
    }

    /// Lay out paths under a gateway home directory.
    pub fn from_base(base: &Path) -> Self {
        Self {
            addon_dir: base.join("addons").join(ADDON_NAME),
            data_dir: base.join("data").join(ADDON_NAME),
        }
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    pub fn settings_file(&self) -> PathBuf {
        self.data_dir.join("settings.toml")
    }

    pub fn persistence_file(&self) -> PathBuf {
        self.data_dir.join("persistence.json")
    }

    pub fn shairport_dir(&self) -> PathBuf {
        self.addon_dir.join("shairport")
    }

    pub fn shairport_binary(&self) -> PathBuf {
        self.shairport_dir().join("shairport")
    }

    pub fn shairport_default_conf(&self) -> PathBuf {
        self.shairport_dir().join("shairport_default.conf")
    }

    pub fn shairport_conf(&self) -> PathBuf {
        self.shairport_dir().join("shairport.conf")
    }

    pub fn rpiplay_dir(&self) -> PathBuf {
        self.addon_dir.join("rpiplay")
    }

    pub fn rpiplay_binary(&self) -> PathBuf {
        self.rpiplay_dir().join("rpiplay")
    }
}

/// Host name in title case ("candle-pi" -> "Candle-Pi"), or "Candle".
pub fn host_display_name() -> String {
    std::fs::read_to_string("/proc/sys/kernel/hostname")
        .ok()
        .or_else(|| std::env::var("HOSTNAME").ok())
        .map(|h| title_case(h.trim()))
        .filter(|h| !h.is_empty())
        .unwrap_or_else(|| "Candle".to_string())
}

/// Upper-case the first letter of every alphabetic run, lower-case the rest.
pub fn title_case(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut in_word = false;
    for c in s.chars() {
        if c.is_alphabetic() {
            if in_word {
                out.extend(c.to_lowercase());
            } else {
                out.extend(c.to_uppercase());
            }
            in_word = true;
        } else {
            out.push(c);
            in_word = false;
        }
    }
    out
}
