//! Scan coordinator - bounded discovery passes merged into the registry

use std::sync::Arc;
use std::time::Duration;
use tracing::warn;

use crate::bus::{BusEvent, Device, NotificationLevel, SharedBus};
use crate::devices::registry::DeviceRegistry;
use crate::devices::transport::{SharedTransport, TransportError};

/// Runs discovery against the transport with a hard upper bound on how long
/// the caller can be kept waiting.
///
/// Failures never propagate: permission denial, platform absence and
/// timeouts all collapse to an empty result plus one user-visible
/// notification.
pub struct ScanCoordinator {
    transport: SharedTransport,
    registry: Arc<DeviceRegistry>,
    bus: SharedBus,
    timeout: Duration,
}

impl ScanCoordinator {
    pub fn new(
        transport: SharedTransport,
        registry: Arc<DeviceRegistry>,
        bus: SharedBus,
        timeout: Duration,
    ) -> Self {
        Self {
            transport,
            registry,
            bus,
            timeout,
        }
    }

    /// Run one discovery pass.
    ///
    /// Returns the devices that were new to the registry; known ids in the
    /// batch are skipped by the merge, so the result never duplicates a
    /// device the caller already has.
    pub async fn scan(&self) -> Vec<Device> {
        self.bus.publish(BusEvent::ScanStarted);

        let batch = match tokio::time::timeout(self.timeout, self.transport.scan()).await {
            Ok(Ok(batch)) => batch,
            Ok(Err(e)) => {
                warn!("Scan failed on {} transport: {}", self.transport.name(), e);
                self.notify_failure(&e);
                self.bus.publish(BusEvent::ScanFinished { discovered: 0 });
                return Vec::new();
            }
            Err(_) => {
                warn!(
                    "Scan on {} transport exceeded {:?}",
                    self.transport.name(),
                    self.timeout
                );
                self.bus.notify(
                    NotificationLevel::Error,
                    "Scan Failed",
                    "Device discovery timed out",
                );
                self.bus.publish(BusEvent::ScanFinished { discovered: 0 });
                return Vec::new();
            }
        };

        let added = self.registry.merge_scan_results(batch).await;
        self.bus.publish(BusEvent::ScanFinished {
            discovered: added.len(),
        });
        added
    }

    fn notify_failure(&self, error: &TransportError) {
        let body = match error {
            TransportError::PermissionDenied => {
                "Could not scan for devices. Please check permissions."
            }
            TransportError::Unavailable => "Bluetooth is not available on this platform.",
            TransportError::Failed(_) => "Could not scan for devices.",
        };
        self.bus
            .notify(NotificationLevel::Error, "Scan Failed", body);
    }
}
