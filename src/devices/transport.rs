//! Device transport capability seam.
//!
//! The coordination core never talks to a platform Bluetooth API directly; it
//! goes through this trait. Production platforms plug in a native adapter,
//! platforms without discovery capability get [`crate::devices::DemoTransport`],
//! and tests get [`crate::devices::FakeTransport`].

use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;

use crate::bus::Device;

/// Failure classes on the transport boundary.
///
/// The connection controller collapses all of these into a single
/// user-facing "Connection Failed" notification, but logs the class so
/// permission problems are distinguishable from link failures in the logs.
#[derive(Debug, Clone, Error)]
pub enum TransportError {
    #[error("bluetooth permission denied")]
    PermissionDenied,

    #[error("bluetooth is unavailable on this platform")]
    Unavailable,

    #[error("device operation failed: {0}")]
    Failed(String),
}

/// Minimal verb set the coordination core needs from a platform.
#[async_trait]
pub trait DeviceTransport: Send + Sync {
    /// Transport name for logs and the status endpoint
    fn name(&self) -> &'static str;

    /// Whether the underlying radio is powered and usable
    async fn is_enabled(&self) -> bool;

    /// Discover nearby devices.
    ///
    /// The returned batch is guaranteed internally unique by id. Merging
    /// against already-known devices is the registry's job.
    async fn scan(&self) -> Result<Vec<Device>, TransportError>;

    /// Establish a link to a device. `Ok(false)` means the platform refused
    /// without an error (e.g. device out of range).
    async fn connect(&self, device_id: &str) -> Result<bool, TransportError>;

    /// Drop the link to a device. Pairing state is untouched.
    async fn disconnect(&self, device_id: &str) -> Result<bool, TransportError>;

    /// Devices the platform remembers as paired
    async fn paired_devices(&self) -> Result<Vec<Device>, TransportError>;

    /// Devices currently holding a link
    async fn connected_devices(&self) -> Result<Vec<Device>, TransportError>;
}

/// Shared transport handle
pub type SharedTransport = Arc<dyn DeviceTransport>;
