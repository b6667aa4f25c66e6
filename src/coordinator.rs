//! ServiceCoordinator - centralized lifecycle management for background tasks
//!
//! The coordinator is the registry of recurring background services (the
//! auto-reconnect loop, the playback progress ticker) and owns their
//! cancellation tokens. Every timer in the hub runs under it, so teardown
//! cannot leak an interval that keeps firing against stale state.

use std::collections::HashMap;
use std::time::Duration;

use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::bus::{BusEvent, SharedBus};

/// Registered background service
struct RegisteredService {
    /// Running task handle (if started)
    handle: Option<JoinHandle<()>>,
    /// Cancellation token for this service
    cancel: CancellationToken,
}

/// ServiceCoordinator manages background task lifecycle:
/// - Register services by name
/// - Spawn them with child cancellation tokens
/// - Coordinate graceful shutdown with stop ACKs
pub struct ServiceCoordinator {
    services: RwLock<HashMap<String, RegisteredService>>,
    bus: SharedBus,
    /// Global shutdown token (parent of all service tokens)
    shutdown: CancellationToken,
    /// Timeout for shutdown acknowledgments
    shutdown_timeout: Duration,
}

impl ServiceCoordinator {
    pub fn new(bus: SharedBus) -> Self {
        Self {
            services: RwLock::new(HashMap::new()),
            bus,
            shutdown: CancellationToken::new(),
            shutdown_timeout: Duration::from_secs(5),
        }
    }

    /// Create with custom shutdown timeout
    pub fn with_shutdown_timeout(bus: SharedBus, timeout: Duration) -> Self {
        Self {
            services: RwLock::new(HashMap::new()),
            bus,
            shutdown: CancellationToken::new(),
            shutdown_timeout: timeout,
        }
    }

    /// Start a service with the given spawn function.
    /// The spawn function receives a cancellation token and must return when
    /// it fires. The coordinator publishes the ServiceStopped ACK on exit.
    pub async fn start_service<F, Fut>(&self, name: &str, spawn_fn: F)
    where
        F: FnOnce(CancellationToken) -> Fut,
        Fut: std::future::Future<Output = ()> + Send + 'static,
    {
        let mut services = self.services.write().await;

        if let Some(service) = services.get(name) {
            if service.handle.is_some() {
                debug!("Service {} already running", name);
                return;
            }
        }

        let cancel = self.shutdown.child_token();
        let bus = self.bus.clone();
        let service_name = name.to_string();
        let future = spawn_fn(cancel.clone());

        let handle = tokio::spawn(async move {
            future.await;
            // Automatic ACK so shutdown() can count completions
            bus.publish(BusEvent::ServiceStopped {
                service: service_name,
            });
        });

        services.insert(
            name.to_string(),
            RegisteredService {
                handle: Some(handle),
                cancel,
            },
        );

        info!("Started service: {}", name);
    }

    /// Check if a service is running
    pub async fn is_running(&self, name: &str) -> bool {
        let services = self.services.read().await;
        services.get(name).map(|s| s.handle.is_some()).unwrap_or(false)
    }

    /// Stop a single service
    pub async fn stop_service(&self, name: &str) {
        // Extract handle while holding lock; await with the lock released
        let handle = {
            let mut services = self.services.write().await;
            let Some(service) = services.get_mut(name) else {
                debug!("Service {} not registered", name);
                return;
            };
            if service.handle.is_none() {
                debug!("Service {} not running", name);
                return;
            }
            info!("Stopping service: {}", name);
            service.cancel.cancel();
            service.handle.take()
        };

        if let Some(handle) = handle {
            match tokio::time::timeout(self.shutdown_timeout, handle).await {
                Ok(Ok(())) => info!("Service {} stopped cleanly", name),
                Ok(Err(e)) => error!("Service {} task panicked: {}", name, e),
                Err(_) => warn!("Service {} did not stop within timeout, abandoning", name),
            }
        }
    }

    /// Graceful shutdown of all services
    /// 1. Publish ShuttingDown event
    /// 2. Cancel all service tokens
    /// 3. Wait for ServiceStopped ACKs
    /// 4. Join remaining task handles with bounded waits
    pub async fn shutdown(&self) {
        info!("Coordinator initiating shutdown");

        let running: Vec<String> = {
            let services = self.services.read().await;
            services
                .iter()
                .filter(|(_, s)| s.handle.is_some())
                .map(|(name, _)| name.clone())
                .collect()
        };

        if running.is_empty() {
            info!("No services running, shutdown complete");
            return;
        }

        info!("Shutting down {} service(s): {:?}", running.len(), running);

        // Subscribe before cancelling so no ACK is missed
        let rx = self.bus.subscribe();

        self.bus.publish(BusEvent::ShuttingDown {
            reason: Some("Coordinator shutdown".to_string()),
        });
        self.shutdown.cancel();

        let acks_received = self.wait_for_acks(rx, &running).await;
        if acks_received < running.len() {
            warn!(
                "Only received {}/{} shutdown ACKs, forcing remaining",
                acks_received,
                running.len()
            );
        }

        // Collect all task handles (release lock before awaiting)
        let handles: Vec<(String, JoinHandle<()>)> = {
            let mut services = self.services.write().await;
            services
                .iter_mut()
                .filter_map(|(name, service)| service.handle.take().map(|h| (name.clone(), h)))
                .collect()
        };

        for (name, handle) in handles {
            match tokio::time::timeout(Duration::from_secs(1), handle).await {
                Ok(Ok(())) => debug!("Service {} task joined", name),
                Ok(Err(e)) => warn!("Service {} task panicked: {}", name, e),
                Err(_) => warn!("Service {} task did not join, abandoning", name),
            }
        }

        info!("Coordinator shutdown complete");
    }

    /// Wait for ServiceStopped events from running services
    async fn wait_for_acks(
        &self,
        mut rx: tokio::sync::broadcast::Receiver<BusEvent>,
        expected: &[String],
    ) -> usize {
        let mut received: Vec<String> = Vec::new();
        let deadline = tokio::time::Instant::now() + self.shutdown_timeout;

        while received.len() < expected.len() {
            let remaining = deadline.saturating_duration_since(tokio::time::Instant::now());
            if remaining.is_zero() {
                break;
            }

            match tokio::time::timeout(remaining, rx.recv()).await {
                Ok(Ok(BusEvent::ServiceStopped { service })) => {
                    if expected.contains(&service) && !received.contains(&service) {
                        debug!("Received ACK from service: {}", service);
                        received.push(service);
                    }
                }
                Ok(Ok(_)) => {
                    // Other event, continue waiting
                }
                Ok(Err(_)) => {
                    // Channel closed
                    break;
                }
                Err(_) => {
                    // Timeout
                    break;
                }
            }
        }

        received.len()
    }

    /// Names of registered services (for the status endpoint)
    pub async fn registered_services(&self) -> Vec<String> {
        self.services.read().await.keys().cloned().collect()
    }
}
