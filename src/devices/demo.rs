//! Simulated device transport.
//!
//! The stand-in used on platforms without native discovery capability: scans
//! return a fixed demo device list after an artificial delay, and link
//! operations always succeed after a shorter one. Latencies are tunable so
//! the scan-timeout path is testable without waiting out real delays.

use async_trait::async_trait;
use std::time::Duration;
use tokio::time::sleep;

use crate::bus::{AudioProfile, Device, DeviceCategory};
use crate::devices::transport::{DeviceTransport, TransportError};

const DEFAULT_SCAN_LATENCY: Duration = Duration::from_secs(2);
const DEFAULT_LINK_LATENCY: Duration = Duration::from_secs(1);

/// Devices the demo platform remembers as already paired.
pub fn seed_devices() -> Vec<Device> {
    vec![
        Device::new("buds-pro", "Samsung Galaxy Buds Pro", DeviceCategory::Earphones)
            .connected()
            .with_signal(95)
            .with_battery(85)
            .with_profile(AudioProfile::A2dp),
        Device::new("bmw-audio", "BMW Car Audio", DeviceCategory::Car)
            .paired()
            .with_signal(0)
            .with_profile(AudioProfile::A2dp),
        Device::new("iphone-15", "iPhone 15 Pro", DeviceCategory::Phone)
            .paired()
            .with_profile(AudioProfile::Hfp),
    ]
}

/// Devices a demo scan discovers.
fn discoverable_devices() -> Vec<Device> {
    vec![
        Device::new("airpods-pro", "AirPods Pro", DeviceCategory::Earphones)
            .with_signal(75)
            .with_profile(AudioProfile::A2dp),
        Device::new("watch-s9", "Apple Watch Series 9", DeviceCategory::Smartwatch)
            .with_signal(85)
            .with_battery(67),
        Device::new("tesla-model-s", "Tesla Model S", DeviceCategory::Car)
            .with_signal(65)
            .with_profile(AudioProfile::A2dp),
    ]
}

/// Simulated transport with fake latency.
pub struct DemoTransport {
    scan_latency: Duration,
    link_latency: Duration,
}

impl DemoTransport {
    pub fn new() -> Self {
        Self {
            scan_latency: DEFAULT_SCAN_LATENCY,
            link_latency: DEFAULT_LINK_LATENCY,
        }
    }

    /// Override latencies (tests use millisecond delays)
    pub fn with_latency(scan_latency: Duration, link_latency: Duration) -> Self {
        Self {
            scan_latency,
            link_latency,
        }
    }
}

impl Default for DemoTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DeviceTransport for DemoTransport {
    fn name(&self) -> &'static str {
        "demo"
    }

    async fn is_enabled(&self) -> bool {
        true
    }

    async fn scan(&self) -> Result<Vec<Device>, TransportError> {
        sleep(self.scan_latency).await;
        Ok(discoverable_devices())
    }

    async fn connect(&self, device_id: &str) -> Result<bool, TransportError> {
        sleep(self.link_latency).await;
        tracing::debug!("demo: simulated connection to {}", device_id);
        Ok(true)
    }

    async fn disconnect(&self, device_id: &str) -> Result<bool, TransportError> {
        sleep(self.link_latency).await;
        tracing::debug!("demo: simulated disconnection from {}", device_id);
        Ok(true)
    }

    async fn paired_devices(&self) -> Result<Vec<Device>, TransportError> {
        Ok(seed_devices().into_iter().filter(|d| d.paired).collect())
    }

    async fn connected_devices(&self) -> Result<Vec<Device>, TransportError> {
        Ok(seed_devices().into_iter().filter(|d| d.connected).collect())
    }
}
