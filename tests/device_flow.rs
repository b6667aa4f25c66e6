//! Device coordination integration tests
//!
//! Full-fixture scenarios over the fake transport: scan merging,
//! connect/disconnect invariants, audio routing and the auto-reconnect loop
//! lifecycle.

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::time::timeout;
use tokio_util::sync::CancellationToken;

use smart_hub_control::audio::PlaybackService;
use smart_hub_control::bus::{
    create_bus, BusEvent, Device, DeviceCategory, NotificationLevel, SharedBus,
};
use smart_hub_control::devices::{
    AlwaysPolicy, AutoReconnectLoop, ConnectionController, DemoTransport, DeviceRegistry,
    FakeTransport, ReconnectPolicy, ScanCoordinator,
};

// =============================================================================
// Test utilities
// =============================================================================

struct Hub {
    bus: SharedBus,
    transport: Arc<FakeTransport>,
    registry: Arc<DeviceRegistry>,
    playback: Arc<PlaybackService>,
    controller: Arc<ConnectionController>,
    scanner: Arc<ScanCoordinator>,
}

async fn hub_with(devices: Vec<Device>) -> Hub {
    let bus = create_bus();
    let transport = Arc::new(FakeTransport::new());
    let registry = Arc::new(DeviceRegistry::new(bus.clone()));
    registry.seed(devices.clone()).await;
    for device in devices {
        transport.add_device(device).await;
    }
    let playback = Arc::new(PlaybackService::new(bus.clone()));
    let controller = Arc::new(ConnectionController::new(
        transport.clone(),
        registry.clone(),
        playback.clone(),
        None,
        bus.clone(),
    ));
    let scanner = Arc::new(ScanCoordinator::new(
        transport.clone(),
        registry.clone(),
        bus.clone(),
        Duration::from_millis(500),
    ));
    Hub {
        bus,
        transport,
        registry,
        playback,
        controller,
        scanner,
    }
}

/// Wait for a specific event type with timeout
async fn expect_event<F>(
    rx: &mut broadcast::Receiver<BusEvent>,
    predicate: F,
    timeout_ms: u64,
) -> Option<BusEvent>
where
    F: Fn(&BusEvent) -> bool,
{
    let deadline = Duration::from_millis(timeout_ms);
    match timeout(deadline, async {
        loop {
            match rx.recv().await {
                Ok(event) if predicate(&event) => return Some(event),
                Ok(_) => continue,
                Err(_) => return None,
            }
        }
    })
    .await
    {
        Ok(event) => event,
        Err(_) => None,
    }
}

fn paired_car() -> Device {
    Device::new("bmw-audio", "BMW Car Audio", DeviceCategory::Car)
        .paired()
        .with_signal(80)
}

// =============================================================================
// Connect / disconnect invariants
// =============================================================================

#[tokio::test]
async fn connect_then_disconnect_leaves_device_paired() {
    let hub = hub_with(vec![paired_car()]).await;

    hub.controller.connect("bmw-audio").await.unwrap();
    hub.controller.disconnect("bmw-audio").await.unwrap();

    let device = hub.registry.get("bmw-audio").await.unwrap();
    assert!(device.paired);
    assert!(!device.connected);
}

#[tokio::test]
async fn connect_publishes_event_and_routes_audio() {
    let hub = hub_with(vec![paired_car()]).await;
    let mut rx = hub.bus.subscribe();

    hub.controller.connect("bmw-audio").await.unwrap();

    let event = expect_event(
        &mut rx,
        |e| matches!(e, BusEvent::DeviceConnected { .. }),
        500,
    )
    .await;
    assert!(event.is_some());

    assert_eq!(
        hub.playback.routed_device_id().await.as_deref(),
        Some("bmw-audio")
    );
}

// =============================================================================
// Scan coordination
// =============================================================================

#[tokio::test]
async fn scanning_twice_does_not_duplicate_devices() {
    let hub = hub_with(vec![]).await;
    hub.transport
        .set_discoverable(vec![
            Device::new("airpods-pro", "AirPods Pro", DeviceCategory::Earphones),
            Device::new("tesla-model-s", "Tesla Model S", DeviceCategory::Car),
        ])
        .await;

    let first = hub.scanner.scan().await;
    assert_eq!(first.len(), 2);

    let second = hub.scanner.scan().await;
    assert!(second.is_empty(), "idempotent merge");
    assert_eq!(hub.registry.len().await, 2);
}

#[tokio::test]
async fn scan_results_never_duplicate_known_registry_ids() {
    let hub = hub_with(vec![paired_car()]).await;
    hub.transport
        .set_discoverable(vec![
            // Same id as the seeded car plus one genuinely new device
            Device::new("bmw-audio", "BMW Car Audio", DeviceCategory::Car),
            Device::new("watch-s9", "Apple Watch Series 9", DeviceCategory::Smartwatch),
        ])
        .await;

    let discovered = hub.scanner.scan().await;
    assert_eq!(discovered.len(), 1);
    assert_eq!(discovered[0].id, "watch-s9");
}

#[tokio::test]
async fn slow_transport_hits_the_scan_timeout() {
    // Demo transport with a scan latency far beyond the coordinator timeout
    let bus = create_bus();
    let registry = Arc::new(DeviceRegistry::new(bus.clone()));
    let scanner = ScanCoordinator::new(
        Arc::new(DemoTransport::with_latency(
            Duration::from_secs(30),
            Duration::ZERO,
        )),
        registry.clone(),
        bus.clone(),
        Duration::from_millis(50),
    );
    let mut rx = bus.subscribe();

    let discovered = scanner.scan().await;
    assert!(discovered.is_empty());
    assert_eq!(registry.len().await, 0);

    let failure = expect_event(
        &mut rx,
        |e| {
            matches!(
                e,
                BusEvent::Notification {
                    level: NotificationLevel::Error,
                    ..
                }
            )
        },
        500,
    )
    .await;
    assert!(failure.is_some(), "timeout must surface as a notification");
}

// =============================================================================
// Auto-reconnect loop
// =============================================================================

#[tokio::test(start_paused = true)]
async fn reconnect_loop_connects_paired_car_and_stops_on_cancel() {
    let hub = hub_with(vec![paired_car()]).await;
    let mut rx = hub.bus.subscribe();

    let policy: Arc<dyn ReconnectPolicy> = Arc::new(AlwaysPolicy);
    let looper = Arc::new(AutoReconnectLoop::new(
        hub.registry.clone(),
        hub.controller.clone(),
        policy,
        Duration::from_secs(5),
    ));

    let cancel = CancellationToken::new();
    let handle = tokio::spawn(looper.run(cancel.clone()));

    // One 5s period elapses (paused clock auto-advances)
    tokio::time::sleep(Duration::from_secs(6)).await;

    let device = hub.registry.get("bmw-audio").await.unwrap();
    assert!(device.connected);
    assert!(device.last_connected_at.is_some());

    let success = expect_event(
        &mut rx,
        |e| {
            matches!(
                e,
                BusEvent::Notification { title, .. } if title == "Connected Successfully"
            )
        },
        500,
    )
    .await;
    assert!(success.is_some());

    // Cancellation must stop the timer for good
    cancel.cancel();
    handle.await.unwrap();

    let calls = hub.transport.connect_calls();
    tokio::time::sleep(Duration::from_secs(30)).await;
    assert_eq!(
        hub.transport.connect_calls(),
        calls,
        "no reconnect attempts after cancellation"
    );
}

#[tokio::test(start_paused = true)]
async fn reconnect_loop_skips_unpaired_devices() {
    let unpaired = Device::new("tesla-model-s", "Tesla Model S", DeviceCategory::Car);
    let hub = hub_with(vec![unpaired]).await;

    let looper = Arc::new(AutoReconnectLoop::new(
        hub.registry.clone(),
        hub.controller.clone(),
        Arc::new(AlwaysPolicy),
        Duration::from_secs(5),
    ));

    let cancel = CancellationToken::new();
    let handle = tokio::spawn(looper.run(cancel.clone()));

    tokio::time::sleep(Duration::from_secs(16)).await;
    cancel.cancel();
    handle.await.unwrap();

    assert_eq!(hub.transport.connect_calls(), 0);
    assert!(!hub.registry.get("tesla-model-s").await.unwrap().connected);
}

#[tokio::test]
async fn reconnected_device_is_not_reconsidered() {
    let hub = hub_with(vec![paired_car()]).await;

    let looper = AutoReconnectLoop::new(
        hub.registry.clone(),
        hub.controller.clone(),
        Arc::new(AlwaysPolicy),
        Duration::from_secs(5),
    );

    assert_eq!(looper.tick().await, 1);
    // Now connected: the candidate filter must exclude it
    assert_eq!(looper.tick().await, 0);
    assert_eq!(hub.transport.connect_calls(), 1);
}
