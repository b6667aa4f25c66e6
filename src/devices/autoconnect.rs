//! Auto-reconnect loop for trusted car devices
//!
//! Periodically re-evaluates paired-but-disconnected car devices against a
//! reconnection predicate and reconnects the ones that pass. The loop is a
//! coordinator-owned task: it MUST stop when its cancellation token fires,
//! otherwise the timer would keep firing against stale state.

use std::sync::Arc;
use std::time::Duration;
use tokio::time::interval;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::devices::controller::ConnectionController;
use crate::devices::registry::DeviceRegistry;
use crate::bus::{Device, DeviceCategory};

/// Reconnection predicate evaluated per candidate device.
///
/// Candidates are always paired && !connected && car-category; policies only
/// decide whether "in range" is plausible right now.
pub trait ReconnectPolicy: Send + Sync {
    fn should_reconnect(&self, device: &Device) -> bool;

    fn name(&self) -> &'static str {
        "policy"
    }
}

/// Proximity predicate: reconnect when the last observed signal strength
/// clears a threshold. This is the intended real-platform behavior.
pub struct SignalThresholdPolicy {
    pub threshold: u8,
}

impl ReconnectPolicy for SignalThresholdPolicy {
    fn should_reconnect(&self, device: &Device) -> bool {
        device.signal_strength >= self.threshold
    }

    fn name(&self) -> &'static str {
        "signal-threshold"
    }
}

/// Demo predicate: a uniform random draw simulating the car coming into
/// range roughly once every five passes.
pub struct ProbabilisticPolicy;

impl ReconnectPolicy for ProbabilisticPolicy {
    fn should_reconnect(&self, _device: &Device) -> bool {
        rand::random::<f64>() > 0.8
    }

    fn name(&self) -> &'static str {
        "probabilistic"
    }
}

/// Test predicate: always in range.
pub struct AlwaysPolicy;

impl ReconnectPolicy for AlwaysPolicy {
    fn should_reconnect(&self, _device: &Device) -> bool {
        true
    }

    fn name(&self) -> &'static str {
        "always"
    }
}

/// Periodic reconnect pass over the registry.
pub struct AutoReconnectLoop {
    registry: Arc<DeviceRegistry>,
    controller: Arc<ConnectionController>,
    policy: Arc<dyn ReconnectPolicy>,
    period: Duration,
}

impl AutoReconnectLoop {
    pub fn new(
        registry: Arc<DeviceRegistry>,
        controller: Arc<ConnectionController>,
        policy: Arc<dyn ReconnectPolicy>,
        period: Duration,
    ) -> Self {
        Self {
            registry,
            controller,
            policy,
            period,
        }
    }

    /// Evaluate one pass. Returns how many connect attempts were made.
    ///
    /// Only devices with `paired == true` are ever considered - the registry
    /// candidate query enforces that before the policy sees anything.
    pub async fn tick(&self) -> usize {
        let candidates = self.registry.reconnect_candidates(DeviceCategory::Car).await;
        let mut attempts = 0;

        for device in candidates {
            debug_assert!(device.paired);
            if !self.policy.should_reconnect(&device) {
                continue;
            }
            debug!(
                "Auto-reconnect ({}): attempting {}",
                self.policy.name(),
                device.name
            );
            attempts += 1;
            // The controller owns notifications for both outcomes
            let _ = self.controller.connect(&device.id).await;
        }

        attempts
    }

    /// Run until cancelled. Spawned under the service coordinator.
    pub async fn run(self: Arc<Self>, cancel: CancellationToken) {
        info!(
            "Auto-reconnect loop started ({}, every {:?})",
            self.policy.name(),
            self.period
        );
        let mut ticker = interval(self.period);
        // The immediate first tick would race startup seeding; skip it
        ticker.tick().await;

        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    info!("Auto-reconnect loop shutting down");
                    break;
                }
                _ = ticker.tick() => {
                    self.tick().await;
                }
            }
        }
    }
}
