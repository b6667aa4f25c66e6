//! Deterministic in-memory transport for tests.
//!
//! No artificial latency, scriptable failures. Integration suites use this
//! to exercise the coordination core without timing dependence.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use tokio::sync::RwLock;

use crate::bus::Device;
use crate::devices::transport::{DeviceTransport, TransportError};

/// In-memory fake platform.
pub struct FakeTransport {
    devices: RwLock<HashMap<String, Device>>,
    discoverable: RwLock<Vec<Device>>,
    deny_scan: AtomicBool,
    refuse_links: AtomicBool,
    connect_calls: AtomicUsize,
}

impl FakeTransport {
    pub fn new() -> Self {
        Self {
            devices: RwLock::new(HashMap::new()),
            discoverable: RwLock::new(Vec::new()),
            deny_scan: AtomicBool::new(false),
            refuse_links: AtomicBool::new(false),
            connect_calls: AtomicUsize::new(0),
        }
    }

    /// Make a device known to the platform (paired/connected per its flags)
    pub async fn add_device(&self, device: Device) {
        self.devices.write().await.insert(device.id.clone(), device);
    }

    /// Script what the next scans discover
    pub async fn set_discoverable(&self, devices: Vec<Device>) {
        *self.discoverable.write().await = devices;
    }

    /// Make scans fail with a permission error
    pub fn deny_scan(&self, deny: bool) {
        self.deny_scan.store(deny, Ordering::SeqCst);
    }

    /// Make connect/disconnect return `Ok(false)`
    pub fn refuse_links(&self, refuse: bool) {
        self.refuse_links.store(refuse, Ordering::SeqCst);
    }

    /// Number of connect attempts made against this transport
    pub fn connect_calls(&self) -> usize {
        self.connect_calls.load(Ordering::SeqCst)
    }
}

impl Default for FakeTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DeviceTransport for FakeTransport {
    fn name(&self) -> &'static str {
        "fake"
    }

    async fn is_enabled(&self) -> bool {
        true
    }

    async fn scan(&self) -> Result<Vec<Device>, TransportError> {
        if self.deny_scan.load(Ordering::SeqCst) {
            return Err(TransportError::PermissionDenied);
        }
        Ok(self.discoverable.read().await.clone())
    }

    async fn connect(&self, device_id: &str) -> Result<bool, TransportError> {
        self.connect_calls.fetch_add(1, Ordering::SeqCst);
        if self.refuse_links.load(Ordering::SeqCst) {
            return Ok(false);
        }
        let mut devices = self.devices.write().await;
        match devices.get_mut(device_id) {
            Some(device) => {
                device.connected = true;
                device.paired = true;
                Ok(true)
            }
            // Unknown to the platform yet (fresh scan result): accept the link
            None => Ok(true),
        }
    }

    async fn disconnect(&self, device_id: &str) -> Result<bool, TransportError> {
        if self.refuse_links.load(Ordering::SeqCst) {
            return Ok(false);
        }
        let mut devices = self.devices.write().await;
        match devices.get_mut(device_id) {
            Some(device) => {
                device.connected = false;
                Ok(true)
            }
            None => Ok(true),
        }
    }

    async fn paired_devices(&self) -> Result<Vec<Device>, TransportError> {
        Ok(self
            .devices
            .read()
            .await
            .values()
            .filter(|d| d.paired)
            .cloned()
            .collect())
    }

    async fn connected_devices(&self) -> Result<Vec<Device>, TransportError> {
        Ok(self
            .devices
            .read()
            .await
            .values()
            .filter(|d| d.connected)
            .cloned()
            .collect())
    }
}
