//! DeviceRegistry - single source of truth for known devices

use chrono::Utc;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info};

use crate::bus::{BusEvent, Device, DeviceCategory, SharedBus};

/// DeviceRegistry maintains the set of known devices.
/// - Seeded from the persisted store or the platform's paired list
/// - Scan results merge in without duplicating known ids
/// - Connect/disconnect mutate flags; devices are never removed
/// - Provides query interface for the API layer and the reconnect loop
pub struct DeviceRegistry {
    devices: Arc<RwLock<HashMap<String, Device>>>,
    bus: SharedBus,
}

impl DeviceRegistry {
    pub fn new(bus: SharedBus) -> Self {
        Self {
            devices: Arc::new(RwLock::new(HashMap::new())),
            bus,
        }
    }

    /// Seed the registry silently (startup path, no discovery events)
    pub async fn seed(&self, devices: Vec<Device>) {
        let mut map = self.devices.write().await;
        for device in devices {
            map.entry(device.id.clone()).or_insert(device);
        }
        info!("Registry seeded with {} device(s)", map.len());
    }

    /// Merge a scan batch into the registry.
    ///
    /// Idempotent: ids already present are skipped, so repeating a scan with
    /// an unchanged result set adds nothing. Returns the devices that were
    /// actually new, publishing a DeviceDiscovered event for each.
    pub async fn merge_scan_results(&self, batch: Vec<Device>) -> Vec<Device> {
        let mut added = Vec::new();
        {
            let mut map = self.devices.write().await;
            for device in batch {
                if map.contains_key(&device.id) {
                    debug!("Scan result {} already known, skipping", device.id);
                    continue;
                }
                map.insert(device.id.clone(), device.clone());
                added.push(device);
            }
        }
        for device in &added {
            self.bus.publish(BusEvent::DeviceDiscovered {
                device: device.clone(),
            });
        }
        added
    }

    /// All known devices, name-ordered for stable API output
    pub async fn list(&self) -> Vec<Device> {
        let mut devices: Vec<Device> = self.devices.read().await.values().cloned().collect();
        devices.sort_by(|a, b| a.name.cmp(&b.name));
        devices
    }

    /// Look up one device
    pub async fn get(&self, device_id: &str) -> Option<Device> {
        self.devices.read().await.get(device_id).cloned()
    }

    /// Mark a device connected: sets connected and paired, stamps
    /// last_connected_at. Returns the updated snapshot.
    pub async fn mark_connected(&self, device_id: &str) -> Option<Device> {
        let mut map = self.devices.write().await;
        let device = map.get_mut(device_id)?;
        device.connected = true;
        device.paired = true;
        device.last_connected_at = Some(Utc::now());
        Some(device.clone())
    }

    /// Mark a device disconnected. Pairing state is preserved - forgetting a
    /// device is a separate operation this service does not implement.
    pub async fn mark_disconnected(&self, device_id: &str) -> Option<Device> {
        let mut map = self.devices.write().await;
        let device = map.get_mut(device_id)?;
        device.connected = false;
        Some(device.clone())
    }

    /// Candidates for the auto-reconnect pass: paired, not connected,
    /// matching category
    pub async fn reconnect_candidates(&self, category: DeviceCategory) -> Vec<Device> {
        self.devices
            .read()
            .await
            .values()
            .filter(|d| d.paired && !d.connected && d.category == category)
            .cloned()
            .collect()
    }

    /// First paired device of a category (used by voice car-connect)
    pub async fn first_paired(&self, category: DeviceCategory) -> Option<Device> {
        let mut paired: Vec<Device> = self
            .devices
            .read()
            .await
            .values()
            .filter(|d| d.paired && d.category == category)
            .cloned()
            .collect();
        // Prefer a device that still needs connecting
        paired.sort_by_key(|d| d.connected);
        paired.into_iter().next()
    }

    /// Number of currently connected devices
    pub async fn connected_count(&self) -> usize {
        self.devices
            .read()
            .await
            .values()
            .filter(|d| d.connected)
            .count()
    }

    /// Total known devices
    pub async fn len(&self) -> usize {
        self.devices.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.devices.read().await.is_empty()
    }
}
