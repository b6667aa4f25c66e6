//! Connection controller - moves devices between link states
//!
//! Owns the connect/disconnect paths: transport call, registry flags, audio
//! routing handoff, user notification and the best-effort persistence stamp.

use anyhow::{anyhow, Result};
use chrono::Utc;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::audio::PlaybackService;
use crate::bus::{BusEvent, Device, NotificationLevel, SharedBus};
use crate::devices::registry::DeviceRegistry;
use crate::devices::transport::SharedTransport;
use crate::store::{ConnectionStampPatch, DeviceConnectionRow, SharedStore};

pub struct ConnectionController {
    transport: SharedTransport,
    registry: Arc<DeviceRegistry>,
    playback: Arc<PlaybackService>,
    store: SharedStore,
    bus: SharedBus,
}

impl ConnectionController {
    pub fn new(
        transport: SharedTransport,
        registry: Arc<DeviceRegistry>,
        playback: Arc<PlaybackService>,
        store: SharedStore,
        bus: SharedBus,
    ) -> Self {
        Self {
            transport,
            registry,
            playback,
            store,
            bus,
        }
    }

    /// Connect a known device.
    ///
    /// On success the device ends up connected AND paired with a fresh
    /// last_connected_at stamp; audio-output categories additionally take
    /// over the playback route. Every failure class collapses to one
    /// "Connection Failed" notification - the differentiated cause only
    /// reaches the logs.
    pub async fn connect(&self, device_id: &str) -> Result<Device> {
        let device = self
            .registry
            .get(device_id)
            .await
            .ok_or_else(|| anyhow!("unknown device: {}", device_id))?;

        let linked = match self.transport.connect(device_id).await {
            Ok(linked) => linked,
            Err(e) => {
                warn!("Connect to {} failed: {}", device.name, e);
                false
            }
        };

        if !linked {
            self.bus.notify(
                NotificationLevel::Error,
                "Connection Failed",
                format!("Could not connect to {}", device.name),
            );
            return Err(anyhow!("connection to {} failed", device.name));
        }

        let device = self
            .registry
            .mark_connected(device_id)
            .await
            .ok_or_else(|| anyhow!("device {} vanished from registry", device_id))?;

        if device.category.is_audio_output() {
            self.playback.route_to(&device).await;
        }

        info!("Connected to {} ({})", device.name, device.category);
        self.bus.publish(BusEvent::DeviceConnected {
            device: device.clone(),
        });
        self.bus.notify(
            NotificationLevel::Success,
            "Connected Successfully",
            format!("Connected to {}", device.name),
        );

        self.stamp_connection(&device).await;

        Ok(device)
    }

    /// Disconnect a device. Only the link drops; pairing is preserved.
    pub async fn disconnect(&self, device_id: &str) -> Result<Device> {
        let device = self
            .registry
            .get(device_id)
            .await
            .ok_or_else(|| anyhow!("unknown device: {}", device_id))?;

        let dropped = match self.transport.disconnect(device_id).await {
            Ok(dropped) => dropped,
            Err(e) => {
                warn!("Disconnect from {} failed: {}", device.name, e);
                false
            }
        };

        if !dropped {
            self.bus.notify(
                NotificationLevel::Error,
                "Disconnect Failed",
                format!("Could not disconnect from {}", device.name),
            );
            return Err(anyhow!("disconnect from {} failed", device.name));
        }

        let device = self
            .registry
            .mark_disconnected(device_id)
            .await
            .ok_or_else(|| anyhow!("device {} vanished from registry", device_id))?;

        if self.playback.routed_device_id().await.as_deref() == Some(device_id) {
            self.playback.clear_route(device_id).await;
        }

        self.bus.publish(BusEvent::DeviceDisconnected {
            device: device.clone(),
        });
        self.bus.notify(
            NotificationLevel::Warning,
            "Disconnected",
            format!("Disconnected from {}", device.name),
        );

        Ok(device)
    }

    /// Best-effort upsert of the `device_connections` row. Single attempt;
    /// on failure the error is logged and the stamp abandoned.
    async fn stamp_connection(&self, device: &Device) {
        let Some(store) = &self.store else {
            return;
        };

        let patch = ConnectionStampPatch {
            last_connected_at: device.last_connected_at.unwrap_or_else(Utc::now),
            battery_level: device.battery.map(i32::from),
            signal_strength: Some(i32::from(device.signal_strength)),
            is_trusted: true,
        };

        let updated: Result<Vec<DeviceConnectionRow>, _> = store
            .table("device_connections")
            .eq("device_name", &device.name)
            .update(&patch)
            .await;

        match updated {
            Ok(rows) if rows.is_empty() => {
                // First sighting of this device: insert the full row
                let row = DeviceConnectionRow::from_device(device);
                if let Err(e) = store
                    .table("device_connections")
                    .insert::<_, DeviceConnectionRow>(&row)
                    .await
                {
                    debug!("Could not persist connection for {}: {}", device.name, e);
                }
            }
            Ok(_) => {}
            Err(e) => debug!("Could not stamp connection for {}: {}", device.name, e),
        }
    }
}
