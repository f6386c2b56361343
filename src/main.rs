// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Airport - AirPlay receiver adapter.
//!
//! Detects local audio outputs, runs the AirPlay audio and video receivers,
//! and keeps the user's output routing across restarts. The gateway drives
//! it over D-Bus.

mod audio;
mod config;
mod dbus;
mod device;
mod process;
mod receiver;
mod routing;

use airport_ipc::{DBUS_NAME, DBUS_PATH};
use audio::SystemRunner;
use config::paths::host_display_name;
use config::{AdapterSettings, BusKind, InstallPaths};
use dbus::AdapterDbusService;
use device::DeviceEvent;
use process::SystemSupervisor;
use routing::{ControllerParts, EnabledChannels, RoutingController};
use std::sync::Arc;
use tokio::runtime::Handle;
use tokio::sync::mpsc as tokio_mpsc;
use tracing::{debug, error, info, warn};
use zbus::connection::Builder;

async fn serve(
    bus: BusKind,
    controller: Arc<RoutingController>,
    runtime: Handle,
) -> zbus::Result<zbus::Connection> {
    let builder = match bus {
        BusKind::Session => Builder::session()?,
        BusKind::System => Builder::system()?,
    };
    builder
        .name(DBUS_NAME)?
        .serve_at(DBUS_PATH, AdapterDbusService::new(controller, runtime))?
        .build()
        .await
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let paths = InstallPaths::discover()?;
    let settings_path = paths.settings_file();
    let (settings, settings_error) = match AdapterSettings::load(&settings_path) {
        Ok(settings) => (settings, None),
        Err(e) => (AdapterSettings::default(), Some(e)),
    };

    // Initialize logging
    let crate_directive = if settings.debugging {
        "airport=debug"
    } else {
        "airport=info"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(crate_directive.parse()?)
                .add_directive("zbus=warn".parse()?),
        )
        .init();

    info!("Airport adapter starting...");
    if let Some(e) = settings_error {
        warn!("Error loading settings from {:?}: {}, using defaults", settings_path, e);
    }
    debug!("Settings: {:?}", settings);
    debug!("Data directory: {:?}", paths.data_dir());

    let (event_tx, event_rx) = tokio_mpsc::unbounded_channel::<DeviceEvent>();

    let runtime = Handle::current();
    let parts = ControllerParts {
        paths,
        runner: Arc::new(SystemRunner::new(runtime.clone(), settings.query_timeout())),
        supervisor: Arc::new(SystemSupervisor::new(settings.privileged_stop)),
        host_name: host_display_name(),
        verbose: settings.debugging,
    };
    let channels = EnabledChannels {
        audio: settings.audio,
        video: settings.video,
    };

    // Enumeration and the initial transitions wait on external commands.
    let controller = tokio::task::spawn_blocking(move || {
        let controller = Arc::new(RoutingController::new(parts, channels, Some(event_tx)));
        // Start the receivers with the persisted selection
        controller.restore();
        controller
    })
    .await?;

    let connection = match serve(settings.bus, controller.clone(), runtime).await {
        Ok(connection) => connection,
        Err(e) => {
            error!("Failed to register on D-Bus: {}", e);
            let unload_controller = controller.clone();
            let _ = tokio::task::spawn_blocking(move || unload_controller.unload()).await;
            return Err(e.into());
        }
    };

    info!("D-Bus service registered at {}", DBUS_NAME);
    info!("Airport adapter ready");

    // Forward device property changes as D-Bus signals
    let signal_connection = connection.clone();
    let signal_task = tokio::spawn(async move {
        let mut event_rx = event_rx;
        while let Some(event) = event_rx.recv().await {
            let object_server = signal_connection.object_server();
            let iface_ref = match object_server
                .interface::<_, AdapterDbusService>(DBUS_PATH)
                .await
            {
                Ok(iface) => iface,
                Err(e) => {
                    warn!("Failed to get D-Bus interface for signal: {}", e);
                    continue;
                }
            };
            let ctx = iface_ref.signal_context();
            match event {
                DeviceEvent::PropertyChanged { name, value } => {
                    debug!("Emitting D-Bus PropertyChanged signal: {} = {}", name, value);
                    if let Err(e) = dbus::emit_property_changed(ctx, &name, &value).await {
                        warn!("Failed to emit PropertyChanged signal: {}", e);
                    }
                }
            }
        }
    });

    // Handle shutdown signals
    let mut sigterm = tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())?;
    let mut sigint = tokio::signal::unix::signal(tokio::signal::unix::SignalKind::interrupt())?;

    tokio::select! {
        _ = sigterm.recv() => {
            info!("Received SIGTERM, shutting down...");
        }
        _ = sigint.recv() => {
            info!("Received SIGINT, shutting down...");
        }
    }

    // Unload runs on a blocking thread: it waits for in-flight transitions.
    let unload_controller = controller.clone();
    if let Err(e) = tokio::task::spawn_blocking(move || unload_controller.unload()).await {
        error!("Unload failed: {}", e);
    }

    signal_task.abort();
    drop(connection);

    info!("Airport adapter stopped");
    Ok(())
}
