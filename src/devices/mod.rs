//! Device coordination core
//!
//! The pieces that track known Bluetooth devices and move them between
//! connection states:
//! - [`transport`]: the capability seam over platform discovery/link APIs
//! - [`demo`]: simulated transport for platforms without native discovery
//! - [`fake`]: deterministic in-memory transport for the test suites
//! - [`registry`]: the single source of truth for known devices
//! - [`scanner`]: bounded discovery passes merged into the registry
//! - [`controller`]: connect/disconnect with audio routing and notifications
//! - [`autoconnect`]: periodic reconnect pass for trusted car devices

pub mod autoconnect;
pub mod controller;
pub mod demo;
pub mod fake;
pub mod registry;
pub mod scanner;
pub mod transport;

pub use autoconnect::{
    AlwaysPolicy, AutoReconnectLoop, ProbabilisticPolicy, ReconnectPolicy, SignalThresholdPolicy,
};
pub use controller::ConnectionController;
pub use demo::DemoTransport;
pub use fake::FakeTransport;
pub use registry::DeviceRegistry;
pub use scanner::ScanCoordinator;
pub use transport::{DeviceTransport, SharedTransport, TransportError};
