// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! D-Bus interface implementation for the adapter.

use crate::routing::RoutingController;
use airport_ipc::{AdapterError, ChannelStatusInfo, PropertyInfo, VideoAudioOutput, DBUS_INTERFACE};
use std::sync::Arc;
use tokio::runtime::Handle;
use tracing::debug;
use zbus::interface;

/// Input validation helpers for D-Bus method arguments.
mod validate {
    /// Validate a property value: non-empty, max 256 chars, no control characters.
    pub fn validate_value(value: &str) -> Result<(), zbus::fdo::Error> {
        if value.is_empty() {
            return Err(zbus::fdo::Error::InvalidArgs("Value must not be empty".into()));
        }
        if value.len() > 256 {
            return Err(zbus::fdo::Error::InvalidArgs(format!(
                "Value exceeds 256 character limit (got {})",
                value.len()
            )));
        }
        if value.chars().any(|c| c.is_control()) {
            return Err(zbus::fdo::Error::InvalidArgs(
                "Value must not contain control characters".into(),
            ));
        }
        Ok(())
    }
}

/// The D-Bus interface implementation.
pub struct AdapterDbusService {
    controller: Arc<RoutingController>,
    runtime: Handle,
}

impl AdapterDbusService {
    pub fn new(controller: Arc<RoutingController>, runtime: Handle) -> Self {
        Self {
            controller,
            runtime,
        }
    }

    /// Run controller work on the blocking pool. Transitions wait on
    /// external commands and per-channel locks.
    async fn blocking<T, F>(&self, work: F) -> zbus::fdo::Result<T>
    where
        F: FnOnce(&RoutingController) -> T + Send + 'static,
        T: Send + 'static,
    {
        let controller = self.controller.clone();
        self.runtime
            .spawn_blocking(move || work(&controller))
            .await
            .map_err(|e| to_fdo(AdapterError::Internal(e.to_string())))
    }
}

fn to_fdo(e: impl Into<AdapterError>) -> zbus::fdo::Error {
    let e: AdapterError = e.into();
    e.into()
}

#[interface(name = "com.airport.Adapter")]
impl AdapterDbusService {
    // ==================== Routing ====================

    /// Route the audio-only receiver to the sink with this display name.
    async fn set_audio_output(&self, display_name: String) -> zbus::fdo::Result<()> {
        validate::validate_value(&display_name)?;
        debug!("D-Bus: set_audio_output({})", display_name);
        self.blocking(move |c| c.set_audio_output(&display_name))
            .await?
            .map_err(to_fdo)
    }

    /// Set the video receiver's audio target ("off", "analog" or "hdmi").
    async fn set_video_audio_output(&self, selection: &str) -> zbus::fdo::Result<()> {
        debug!("D-Bus: set_video_audio_output({})", selection);
        let output = selection.parse::<VideoAudioOutput>().map_err(to_fdo)?;
        self.blocking(move |c| c.set_video_audio_output(output))
            .await?
            .map_err(to_fdo)
    }

    /// Set a device property by name, as the gateway's property layer does.
    async fn set_property(&self, name: String, value: String) -> zbus::fdo::Result<()> {
        validate::validate_value(&value)?;
        debug!("D-Bus: set_property({}, {})", name, value);
        self.blocking(move |c| c.set_property(&name, &value))
            .await?
            .map_err(to_fdo)
    }

    // ==================== Queries ====================

    /// Get the device's properties with their committed values.
    async fn get_properties(&self) -> zbus::fdo::Result<Vec<PropertyInfo>> {
        Ok(self.controller.properties())
    }

    /// List currently available audio outputs.
    async fn get_audio_outputs(&self) -> zbus::fdo::Result<Vec<String>> {
        self.blocking(|c| c.audio_outputs()).await
    }

    /// Get per-channel health.
    async fn get_status(&self) -> zbus::fdo::Result<Vec<ChannelStatusInfo>> {
        Ok(self.controller.status())
    }

    // ==================== Signals ====================

    /// Emitted when a property value is committed.
    #[zbus(signal)]
    async fn property_changed(
        ctx: &zbus::SignalContext<'_>,
        name: &str,
        value: &str,
    ) -> zbus::Result<()>;
}

/// Emit PropertyChanged from outside the interface methods.
pub async fn emit_property_changed(
    ctx: &zbus::SignalContext<'_>,
    name: &str,
    value: &str,
) -> zbus::Result<()> {
    ctx.connection()
        .emit_signal(
            ctx.destination(),
            ctx.path(),
            DBUS_INTERFACE,
            "PropertyChanged",
            &(name, value),
        )
        .await
}
