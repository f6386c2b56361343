// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Output routing: turning a user's selection into a rendered config, a
//! persisted choice, a restarted receiver and an updated device property.
//!
//! Each channel (audio, video) is serialized by its own lock, so the
//! controller stays correct even if the host dispatches requests
//! concurrently. Failures other than an unknown sink are contained here:
//! they are logged and recorded in the channel's health, never returned.

use crate::audio::types::display_options;
use crate::audio::{CommandRunner, SinkEnumerator};
use crate::config::{InstallPaths, RoutingSelection, StateStore};
use crate::device::{AirportDevice, DeviceEvent};
use crate::process::ProcessSupervisor;
use crate::receiver::{self, ConfigRewriter};
use airport_ipc::{
    AdapterError, ChannelStatusInfo, PropertyInfo, VideoAudioOutput, AUDIO_OUTPUT_PROPERTY,
    VIDEO_AUDIO_OUTPUT_PROPERTY,
};
use parking_lot::Mutex;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::mpsc as tokio_mpsc;
use tracing::{debug, error, info, warn};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RoutingError {
    #[error("No audio output named {0:?}")]
    SinkNotFound(String),
    #[error("Invalid selection: {0}")]
    InvalidSelection(String),
    #[error("Unknown property: {0}")]
    UnknownProperty(String),
    #[error("Adapter has been unloaded")]
    Unloaded,
}

impl From<RoutingError> for AdapterError {
    fn from(e: RoutingError) -> Self {
        match e {
            RoutingError::SinkNotFound(name) => AdapterError::SinkNotFound(name),
            RoutingError::InvalidSelection(v) => AdapterError::InvalidSelection(v),
            RoutingError::UnknownProperty(p) => AdapterError::UnknownProperty(p),
            RoutingError::Unloaded => AdapterError::Unloaded,
        }
    }
}

/// A routing channel with its own selection, process and lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Channel {
    Audio,
    Video,
}

impl Channel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Channel::Audio => "audio",
            Channel::Video => "video",
        }
    }

    /// The device property a channel is exposed as.
    pub fn property(&self) -> &'static str {
        match self {
            Channel::Audio => AUDIO_OUTPUT_PROPERTY,
            Channel::Video => VIDEO_AUDIO_OUTPUT_PROPERTY,
        }
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ChannelState {
    #[default]
    Idle,
    Applying,
    Committed,
}

impl ChannelState {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChannelState::Idle => "idle",
            ChannelState::Applying => "applying",
            ChannelState::Committed => "committed",
        }
    }
}

/// Secondary status for a channel, since a committed value does not prove
/// the receiver is actually running.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChannelHealth {
    pub state: ChannelState,
    pub last_error: Option<String>,
}

/// Which channels the adapter runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EnabledChannels {
    pub audio: bool,
    pub video: bool,
}

/// Host-dependent inputs to the controller.
pub struct ControllerParts {
    pub paths: InstallPaths,
    pub runner: Arc<dyn CommandRunner>,
    pub supervisor: Arc<dyn ProcessSupervisor>,
    /// Friendly host name used in the video receiver's advertised name.
    pub host_name: String,
    /// Ask the video receiver for verbose output.
    pub verbose: bool,
}

/// Owns all mutable routing state: selection, device properties, health.
pub struct RoutingController {
    paths: InstallPaths,
    enumerator: SinkEnumerator,
    supervisor: Arc<dyn ProcessSupervisor>,
    rewriter: ConfigRewriter,
    store: StateStore,
    host_name: String,
    verbose: bool,
    channels: EnabledChannels,
    selection: Mutex<RoutingSelection>,
    device: Mutex<AirportDevice>,
    audio_lock: Mutex<()>,
    video_lock: Mutex<()>,
    audio_health: Mutex<ChannelHealth>,
    video_health: Mutex<ChannelHealth>,
    unloaded: AtomicBool,
}

impl RoutingController {
    /// Enumerate sinks, load (or default) the selection and build the device.
    pub fn new(
        parts: ControllerParts,
        channels: EnabledChannels,
        notifier: Option<tokio_mpsc::UnboundedSender<DeviceEvent>>,
    ) -> Self {
        let enumerator = SinkEnumerator::new(parts.runner);
        let store = StateStore::new(parts.paths.persistence_file());
        let sinks = enumerator.enumerate();
        let first_sink = sinks.first().map(|s| s.display_name.as_str());

        let mut selection = match store.load() {
            Ok(selection) => {
                info!("Loaded persisted selection: {:?}", selection);
                selection
            }
            Err(e) => {
                info!("No usable persisted selection ({}), using defaults", e);
                RoutingSelection::defaults(first_sink)
            }
        };
        if selection.audio_output.is_none() {
            selection.audio_output = first_sink.map(str::to_string);
        }

        let mut device = AirportDevice::new();
        if channels.audio {
            device = device
                .with_audio_output(display_options(&sinks), selection.audio_output.as_deref());
        }
        if channels.video {
            device = device.with_video_audio_output(selection.video_audio_output);
        }
        if let Some(tx) = notifier {
            device.set_notifier(tx);
        }
        info!(
            "{} device {:?} created ({})",
            device.title, device.id, device.description
        );

        Self {
            rewriter: ConfigRewriter::from_paths(&parts.paths),
            paths: parts.paths,
            enumerator,
            supervisor: parts.supervisor,
            store,
            host_name: parts.host_name,
            verbose: parts.verbose,
            channels,
            selection: Mutex::new(selection),
            device: Mutex::new(device),
            audio_lock: Mutex::new(()),
            video_lock: Mutex::new(()),
            audio_health: Mutex::new(ChannelHealth::default()),
            video_health: Mutex::new(ChannelHealth::default()),
            unloaded: AtomicBool::new(false),
        }
    }

    /// Start the enabled receivers with the persisted selection.
    pub fn restore(&self) {
        let selection = self.selection();

        if self.channels.audio {
            match selection.audio_output {
                Some(ref name) => {
                    info!("Enabling AirPlay audio receiver on {:?}", name);
                    if let Err(e) = self.set_audio_output(name) {
                        warn!("Could not restore audio output: {}", e);
                    }
                }
                None => warn!("No audio outputs found, audio receiver not started"),
            }
        }

        if self.channels.video {
            info!(
                "Enabling AirPlay video receiver with {} audio",
                selection.video_audio_output
            );
            if let Err(e) = self.set_video_audio_output(selection.video_audio_output) {
                warn!("Could not restore video audio output: {}", e);
            }
        }
    }

    /// Route the audio-only receiver to the sink labelled `display_name`.
    pub fn set_audio_output(&self, display_name: &str) -> Result<(), RoutingError> {
        self.check_enabled(Channel::Audio)?;
        let _guard = self.audio_lock.lock();
        self.check_active()?;
        debug!("Setting audio output to {:?}", display_name);

        let previous = self.begin(Channel::Audio);

        let sinks = self.enumerator.enumerate();
        let Some(sink) = sinks.iter().find(|s| s.display_name == display_name) else {
            let err = RoutingError::SinkNotFound(display_name.to_string());
            warn!("{}", err);
            self.abort(Channel::Audio, previous, &err);
            return Err(err);
        };

        let mut problems = Vec::new();

        if !self.supervisor.stop(receiver::audio::PROCESS_NAME) {
            problems.push(format!("could not stop {}", receiver::audio::PROCESS_NAME));
        }

        if let Err(e) = self.persist(|s| s.audio_output = Some(display_name.to_string())) {
            problems.push(e);
        }

        if let Err(e) = self.rewriter.render(sink) {
            error!("Error changing audio receiver config: {}", e);
            problems.push(e.to_string());
        }

        self.device.lock().update(AUDIO_OUTPUT_PROPERTY, display_name);

        let spec = receiver::audio::launch_spec(&self.paths, self.rewriter.target());
        if let Err(e) = self.supervisor.start(&spec) {
            error!("Error starting audio receiver: {}", e);
            problems.push(e.to_string());
        }

        self.commit(Channel::Audio, problems);
        Ok(())
    }

    /// Point the video receiver's audio at `output` and restart it.
    pub fn set_video_audio_output(&self, output: VideoAudioOutput) -> Result<(), RoutingError> {
        self.check_enabled(Channel::Video)?;
        let _guard = self.video_lock.lock();
        self.check_active()?;
        debug!("Setting video audio output to {}", output);

        self.begin(Channel::Video);
        let mut problems = Vec::new();

        if let Err(e) = self.persist(|s| s.video_audio_output = output) {
            problems.push(e);
        }

        if !self.supervisor.stop(receiver::video::PROCESS_NAME) {
            problems.push(format!("could not stop {}", receiver::video::PROCESS_NAME));
        }

        let spec = receiver::video::launch_spec(&self.paths, output, &self.host_name, self.verbose);
        if let Err(e) = self.supervisor.start(&spec) {
            error!("Error restarting video receiver: {}", e);
            problems.push(e.to_string());
        }

        self.device
            .lock()
            .update(VIDEO_AUDIO_OUTPUT_PROPERTY, output.as_str());

        self.commit(Channel::Video, problems);
        Ok(())
    }

    /// Entry point for the property layer.
    pub fn set_property(&self, name: &str, value: &str) -> Result<(), RoutingError> {
        if !self.device.lock().has_property(name) {
            return Err(RoutingError::UnknownProperty(name.to_string()));
        }

        match name {
            AUDIO_OUTPUT_PROPERTY => self.set_audio_output(value),
            VIDEO_AUDIO_OUTPUT_PROPERTY => {
                let output = value
                    .parse::<VideoAudioOutput>()
                    .map_err(|_| RoutingError::InvalidSelection(value.to_string()))?;
                self.set_video_audio_output(output)
            }
            _ => Err(RoutingError::UnknownProperty(name.to_string())),
        }
    }

    /// Stop both receivers. Terminal: later transitions fail with `Unloaded`.
    pub fn unload(&self) {
        info!("Shutting down airport");
        self.unloaded.store(true, Ordering::SeqCst);

        // Let any in-flight transition finish before stopping its process.
        let _audio = self.audio_lock.lock();
        let _video = self.video_lock.lock();

        for name in [receiver::audio::PROCESS_NAME, receiver::video::PROCESS_NAME] {
            if !self.supervisor.stop(name) {
                warn!("Error stopping {}", name);
            }
        }
    }

    pub fn is_unloaded(&self) -> bool {
        self.unloaded.load(Ordering::SeqCst)
    }

    /// The committed selection.
    pub fn selection(&self) -> RoutingSelection {
        self.selection.lock().clone()
    }

    pub fn properties(&self) -> Vec<PropertyInfo> {
        self.device.lock().properties()
    }

    /// Current display names, freshly enumerated.
    pub fn audio_outputs(&self) -> Vec<String> {
        display_options(&self.enumerator.enumerate())
    }

    pub fn health(&self, channel: Channel) -> ChannelHealth {
        self.health_slot(channel).lock().clone()
    }

    pub fn status(&self) -> Vec<ChannelStatusInfo> {
        [Channel::Audio, Channel::Video]
            .into_iter()
            .map(|channel| {
                let health = self.health(channel);
                ChannelStatusInfo {
                    channel: channel.as_str().to_string(),
                    state: health.state.as_str().to_string(),
                    last_error: health.last_error.unwrap_or_default(),
                }
            })
            .collect()
    }

    // ==================== Internals ====================

    fn check_enabled(&self, channel: Channel) -> Result<(), RoutingError> {
        let enabled = match channel {
            Channel::Audio => self.channels.audio,
            Channel::Video => self.channels.video,
        };
        if enabled {
            Ok(())
        } else {
            Err(RoutingError::UnknownProperty(channel.property().to_string()))
        }
    }

    fn check_active(&self) -> Result<(), RoutingError> {
        if self.is_unloaded() {
            Err(RoutingError::Unloaded)
        } else {
            Ok(())
        }
    }

    fn health_slot(&self, channel: Channel) -> &Mutex<ChannelHealth> {
        match channel {
            Channel::Audio => &self.audio_health,
            Channel::Video => &self.video_health,
        }
    }

    /// Enter Applying, returning the state to fall back to.
    fn begin(&self, channel: Channel) -> ChannelState {
        let mut health = self.health_slot(channel).lock();
        let previous = health.state;
        health.state = ChannelState::Applying;
        previous
    }

    fn abort(&self, channel: Channel, previous: ChannelState, err: &RoutingError) {
        let mut health = self.health_slot(channel).lock();
        health.state = previous;
        health.last_error = Some(err.to_string());
    }

    fn commit(&self, channel: Channel, problems: Vec<String>) {
        let mut health = self.health_slot(channel).lock();
        health.state = ChannelState::Committed;
        health.last_error = if problems.is_empty() {
            None
        } else {
            Some(problems.join("; "))
        };
    }

    /// Apply `change` to the in-memory selection and write it out.
    ///
    /// The in-memory selection stays authoritative if the write fails.
    fn persist(&self, change: impl FnOnce(&mut RoutingSelection)) -> Result<(), String> {
        let mut selection = self.selection.lock();
        change(&mut selection);
        self.store.save(&selection).map_err(|e| {
            error!("Could not store data in persistent store: {}", e);
            format!("persist: {}", e)
        })
    }
}
