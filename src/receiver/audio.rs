// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Audio-only receiver (shairport-sync): config rendering and launch spec.

use crate::audio::AudioSink;
use crate::config::InstallPaths;
use crate::process::LaunchSpec;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info};

/// Process name of the audio receiver.
pub const PROCESS_NAME: &str = "shairport";

/// Commented-out output device line in the default template.
pub const OUTPUT_DEVICE_PLACEHOLDER: &str = "//\toutput_device = \"default\";";

/// Commented-out mixer control line in the default template.
pub const MIXER_CONTROL_PLACEHOLDER: &str = "//\tmixer_control_name = \"PCM\";";

#[derive(Debug, Error)]
pub enum ConfigWriteError {
    #[error("Failed to read template {path:?}: {source}")]
    ReadTemplate {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Failed to write config {path:?}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Substitute the sink into the template text.
///
/// Placeholders are matched byte-for-byte; a template without them comes
/// back unchanged. The mixer line stays commented when the sink has no
/// usable control.
pub fn render_config(template: &str, sink: &AudioSink) -> String {
    let output_line = format!("output_device = \"{}\";", sink.hardware_address());
    let rendered = template.replace(OUTPUT_DEVICE_PLACEHOLDER, &output_line);

    if sink.has_mixer_control() {
        let mixer_line = format!("mixer_control_name = \"{}\";", sink.mixer_control_name);
        rendered.replace(MIXER_CONTROL_PLACEHOLDER, &mixer_line)
    } else {
        rendered
    }
}

/// Regenerates the live config from the pristine default template.
#[derive(Debug, Clone)]
pub struct ConfigRewriter {
    template: PathBuf,
    target: PathBuf,
}

impl ConfigRewriter {
    pub fn new(template: impl Into<PathBuf>, target: impl Into<PathBuf>) -> Self {
        Self {
            template: template.into(),
            target: target.into(),
        }
    }

    pub fn from_paths(paths: &InstallPaths) -> Self {
        Self::new(paths.shairport_default_conf(), paths.shairport_conf())
    }

    pub fn target(&self) -> &Path {
        &self.target
    }

    /// Replace the live config with the template rendered for `sink`.
    ///
    /// The template is always the starting point, so earlier edits never
    /// accumulate. Nothing is written if the template cannot be read.
    pub fn render(&self, sink: &AudioSink) -> Result<(), ConfigWriteError> {
        let template =
            fs::read_to_string(&self.template).map_err(|source| ConfigWriteError::ReadTemplate {
                path: self.template.clone(),
                source,
            })?;

        let rendered = render_config(&template, sink);
        if rendered == template {
            debug!("Template {:?} has no placeholders to fill", self.template);
        }

        fs::write(&self.target, rendered).map_err(|source| ConfigWriteError::Write {
            path: self.target.clone(),
            source,
        })?;

        info!(
            "Wrote {:?} for {} ({})",
            self.target,
            sink.display_name,
            sink.hardware_address()
        );
        Ok(())
    }
}

/// Launch spec for the audio receiver reading `config`.
pub fn launch_spec(paths: &InstallPaths, config: &Path) -> LaunchSpec {
    LaunchSpec {
        process_name: PROCESS_NAME.to_string(),
        program: paths.shairport_binary(),
        args: vec![
            "-j".to_string(),
            "-c".to_string(),
            config.to_string_lossy().into_owned(),
        ],
        library_path: paths.shairport_dir(),
    }
}
