//! Smart Hub Control - device and audio coordination bridge

use smart_hub_control::{api, audio, bus, config, coordinator, devices, rules, store, voice};

use anyhow::Result;
use axum::{
    routing::{get, post},
    Router,
};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::signal;
use tower_http::{compression::CompressionLayer, cors::CorsLayer, trace::TraceLayer};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use audio::PlaybackService;
use devices::{
    AutoReconnectLoop, ConnectionController, DemoTransport, DeviceRegistry, ProbabilisticPolicy,
    ReconnectPolicy, ScanCoordinator, SharedTransport, SignalThresholdPolicy,
};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "smart_hub_control=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!(
        "Starting Smart Hub Control v{}",
        env!("CARGO_PKG_VERSION")
    );

    // Load configuration
    let config = config::load_config()?;
    tracing::info!("Configuration loaded, port: {}", config.port);

    // Create event bus
    let bus = bus::create_bus();
    tracing::info!("Event bus initialized");

    // Hosted store (optional - the hub runs store-less in demo setups)
    let store: store::SharedStore = match &config.store {
        Some(store_config) => match store::StoreClient::new(store_config) {
            Ok(client) => {
                tracing::info!("Hosted store configured at {}", store_config.url);
                Some(Arc::new(client))
            }
            Err(e) => {
                tracing::warn!("Ignoring store configuration: {}", e);
                None
            }
        },
        None => None,
    };

    // Device transport. Platforms without native discovery get the demo
    // transport; a native adapter would be wired here instead.
    let transport: SharedTransport = Arc::new(DemoTransport::new());
    tracing::info!("Device transport: {}", transport.name());

    // Device registry, seeded from the persisted store when available and
    // falling back to the transport's paired list
    let registry = Arc::new(DeviceRegistry::new(bus.clone()));
    seed_registry(&registry, &store, &transport).await;

    // Playback facade with the hosted audio library (or demo playlist)
    let playlist = audio::library::load_playlist(&store).await;
    let playback = Arc::new(PlaybackService::with_playlist(bus.clone(), playlist));

    // Connection controller
    let controller = Arc::new(ConnectionController::new(
        transport.clone(),
        registry.clone(),
        playback.clone(),
        store.clone(),
        bus.clone(),
    ));

    // Scan coordinator
    let scanner = Arc::new(ScanCoordinator::new(
        transport.clone(),
        registry.clone(),
        bus.clone(),
        Duration::from_secs(config.scan_timeout_secs),
    ));

    // Voice service
    let synthesizer = voice::synthesizer_from_config(config.speech.as_ref());
    tracing::info!("Speech synthesizer: {}", synthesizer.name());
    let voice_service = Arc::new(voice::VoiceService::new(
        registry.clone(),
        controller.clone(),
        playback.clone(),
        synthesizer,
        store.clone(),
        bus.clone(),
    ));

    // Automation rules
    let rules_service = Arc::new(rules::RulesService::new(store.clone(), bus.clone()));

    // Background services under the coordinator: auto-reconnect + progress
    // ticker. Both must die with the process, not outlive their owner.
    let coordinator = Arc::new(coordinator::ServiceCoordinator::new(bus.clone()));

    let policy: Arc<dyn ReconnectPolicy> = if config.demo {
        Arc::new(ProbabilisticPolicy)
    } else {
        Arc::new(SignalThresholdPolicy {
            threshold: config.autoconnect.signal_threshold,
        })
    };
    let reconnect = Arc::new(AutoReconnectLoop::new(
        registry.clone(),
        controller.clone(),
        policy,
        Duration::from_secs(config.autoconnect.interval_secs),
    ));
    coordinator
        .start_service("auto-reconnect", {
            let reconnect = reconnect.clone();
            move |cancel| reconnect.run(cancel)
        })
        .await;

    coordinator
        .start_service("playback-ticker", {
            let playback = playback.clone();
            move |cancel| playback.run_ticker(cancel)
        })
        .await;

    // Build application state
    let state = api::AppState {
        registry,
        controller,
        scanner,
        playback,
        voice: voice_service,
        rules: rules_service,
        bus: bus.clone(),
        transport_name: transport.name(),
        started_at: Instant::now(),
    };

    // Build API routes
    let app = Router::new()
        // Health check
        .route("/status", get(api::status_handler))
        // Device routes
        .route("/devices", get(api::devices_handler))
        .route("/devices/scan", post(api::scan_handler))
        .route("/devices/connect", post(api::connect_handler))
        .route("/devices/disconnect", post(api::disconnect_handler))
        // Playback routes
        .route("/playback", get(api::playback_handler))
        .route("/playback/control", post(api::playback_control_handler))
        .route("/playback/volume", post(api::volume_handler))
        // Voice routes
        .route("/voice/command", post(api::voice_handler))
        .route("/voice/recent", get(api::voice_recent_handler))
        // Automation rule routes
        .route("/rules", get(api::rules_handler).post(api::create_rule_handler))
        .route("/rules/toggle", post(api::toggle_rule_handler))
        .route("/rules/templates", get(api::rule_templates_handler))
        // Event stream (SSE)
        .route("/events", get(api::events_handler))
        // Middleware
        .layer(CorsLayer::permissive())
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    // Start server with graceful shutdown
    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    tracing::info!("Listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    // Cleanup: stop background services (reconnect loop, ticker)
    tracing::info!("Shutting down services...");
    coordinator.shutdown().await;
    tracing::info!("Shutdown complete");

    Ok(())
}

/// Seed the registry: persisted rows first, then the platform's paired list
/// for anything the store does not know yet.
async fn seed_registry(
    registry: &Arc<DeviceRegistry>,
    store: &store::SharedStore,
    transport: &SharedTransport,
) {
    if let Some(store) = store {
        match store
            .table("device_connections")
            .order("last_connected_at", true)
            .select::<smart_hub_control::store::DeviceConnectionRow>()
            .await
        {
            Ok(rows) => {
                let devices: Vec<_> = rows
                    .into_iter()
                    .map(smart_hub_control::store::DeviceConnectionRow::into_device)
                    .collect();
                tracing::info!("Loaded {} device(s) from the store", devices.len());
                registry.seed(devices).await;
            }
            Err(e) => tracing::warn!("Could not load persisted devices: {}", e),
        }
    }

    match transport.paired_devices().await {
        Ok(paired) => registry.seed(paired).await,
        Err(e) => tracing::warn!("Could not read paired devices: {}", e),
    }
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM)
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => tracing::info!("Received Ctrl+C, shutting down..."),
        _ = terminate => tracing::info!("Received SIGTERM, shutting down..."),
    }
}
