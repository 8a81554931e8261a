//! MelodyFocus - a practice-timer server for piano students
//!
//! This is the main entry point for the melodyfocus application.

use std::{sync::Arc, time::Duration};

use tokio::{net::TcpListener, time::timeout};
use tracing::{info, warn};

use melodyfocus::{
    api::create_router,
    config::Config,
    services::{check_player_available, AudioBackend, DesktopNotifier, GeminiClient, NullBackend, PcmPipeBackend},
    session::SessionClock,
    state::{AppState, DurationPreferences, JsonFileStore, MemoryStore, PlanLibrary, PreferenceStore},
    tasks::{completion_counter_task, spawn_session_controller},
    utils::shutdown_signal,
};

const CONTROLLER_SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(5);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::parse();

    // Initialize tracing with appropriate log level
    tracing_subscriber::fmt()
        .with_env_filter(format!("melodyfocus={},tower_http=info", config.log_level()))
        .init();

    info!("Starting melodyfocus server v{}", env!("CARGO_PKG_VERSION"));
    info!(
        "Configuration: host={}, port={}, mode={}",
        config.host, config.port, config.mode
    );

    let store: Arc<dyn PreferenceStore> = match config.resolved_data_dir() {
        Some(dir) => {
            let store = JsonFileStore::in_dir(&dir);
            info!("Preferences stored in {}", store.path().display());
            Arc::new(store)
        }
        None => {
            warn!("No data directory available, preferences will not persist");
            Arc::new(MemoryStore::new())
        }
    };

    let audio: Arc<dyn AudioBackend> = if config.no_sound || !check_player_available(&config.audio_command).await {
        Arc::new(NullBackend)
    } else {
        Arc::new(PcmPipeBackend::new(&config.audio_command))
    };
    let notifier = Arc::new(DesktopNotifier::new(!config.no_notifications));

    let generator = GeminiClient::new(config.gemini_api_key.clone(), &config.gemini_model)?;
    if !generator.has_api_key() {
        warn!("GEMINI_API_KEY not set, plan generation is disabled");
    }

    // Start the session controller that owns the clock
    let durations = DurationPreferences::new(Arc::clone(&store));
    let clock = SessionClock::new(config.mode, durations.clone());
    let (session, controller) = spawn_session_controller(clock, audio, notifier);

    let state = Arc::new(AppState::new(
        session,
        durations,
        PlanLibrary::load(store),
        Arc::new(generator),
        config.port,
        config.host.clone(),
    ));

    let counter_state = Arc::clone(&state);
    let counter = tokio::spawn(async move {
        completion_counter_task(counter_state).await;
    });

    // Create HTTP router with all endpoints
    let app = create_router(Arc::clone(&state));

    let addr = config.address();
    let listener = TcpListener::bind(&addr).await?;

    info!("Server running on http://{}", addr);
    info!("Endpoints:");
    info!("  GET  /session                 - Current countdown");
    info!("  POST /session/toggle          - Start or pause");
    info!("  POST /session/mode/:mode      - Switch mode");
    info!("  POST /session/reset           - Reset countdown");
    info!("  POST /session/alarm/stop      - Stop the alarm");
    info!("  POST /plans/generate          - Generate a class with AI");
    info!("  POST /plans/:id/steps/:i/start - Time a class step");
    info!("  GET  /status                  - Session and server status");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    // Dropping the last session handle lets the controller silence the alarm
    counter.abort();
    let _ = counter.await;
    drop(state);
    match timeout(CONTROLLER_SHUTDOWN_TIMEOUT, controller).await {
        Ok(Ok(())) => info!("Session controller stopped"),
        Ok(Err(e)) => warn!("Session controller failed: {}", e),
        Err(_) => warn!("Session controller did not stop within {:?}", CONTROLLER_SHUTDOWN_TIMEOUT),
    }

    info!("Server shutdown complete");
    Ok(())
}
