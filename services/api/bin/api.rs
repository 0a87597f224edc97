//! Main Entrypoint for the Havruta API Service
//!
//! This binary is responsible for:
//! 1. Loading configuration from the environment.
//! 2. Building the capability bundle (or an unconfigured one without a credential).
//! 3. Starting the session and its transcript log.
//! 4. Constructing the Axum router and applying middleware.
//! 5. Starting the web server and handling graceful shutdown.

use anyhow::Context;
use havruta_api::{config::Config, router::create_router, state::AppState};
use havruta_core::{
    capability::Capabilities, error::Capability, orchestrator::TurnOrchestrator,
    prompt::HAVRUTA_SYSTEM, session::Session,
};
use std::{collections::HashMap, fs, net::SocketAddr, path::Path, sync::Arc};
use tower_http::cors::{Any, CorsLayer};
use tracing::{info, warn};

/// Listens for the `Ctrl+C` signal to gracefully shut down the server.
async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "Failed to install Ctrl+C handler");
        std::future::pending::<()>().await;
    }
    info!("Received shutdown signal. Shutting down gracefully...");
}

/// Loads `*.md` prompt overrides from a directory, keyed by file stem.
///
/// A missing directory is not an error; the built-in prompt is used instead.
fn load_prompts(prompts_path: &Path) -> anyhow::Result<HashMap<String, String>> {
    let mut prompts = HashMap::new();
    if !prompts_path.is_dir() {
        return Ok(prompts);
    }
    for entry in fs::read_dir(prompts_path)? {
        let path = entry?.path();
        if path.is_file() && path.extension().and_then(|s| s.to_str()) == Some("md") {
            let prompt_key = path
                .file_stem()
                .and_then(|s| s.to_str())
                .context("Could not get file stem")?
                .to_string();
            let content = fs::read_to_string(&path)
                .with_context(|| format!("Failed to read prompt {}", path.display()))?;
            prompts.insert(prompt_key, content);
        }
    }
    Ok(prompts)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // --- 1. Load Configuration ---
    let config = Config::from_env().context("Failed to load configuration")?;

    // --- 2. Initialize Logging ---
    tracing_subscriber::fmt()
        .with_max_level(config.log_level)
        .with_timer(tracing_subscriber::fmt::time::ChronoLocal::rfc_3339())
        .init();
    info!("Configuration loaded. Initializing application state...");

    // --- 3. Build Capabilities and the Orchestrator ---
    let capabilities = Capabilities::openai(&config.provider_settings());

    let mut prompts = load_prompts(&config.prompts_path)?;
    let system_template = match prompts.remove("havruta_system") {
        Some(template) => {
            info!(path = %config.prompts_path.display(), "Using havruta_system.md prompt override");
            template
        }
        None => HAVRUTA_SYSTEM.to_string(),
    };

    let orchestrator = TurnOrchestrator::new(capabilities)
        .with_system_template(system_template)
        .with_language(config.stt_language.clone());

    // --- 4. Start the Session ---
    let session = Session::start(&config.run_dir);
    let session_id = session.session_id().to_string();
    let configured = orchestrator
        .capabilities()
        .is_configured(Capability::Generation);

    let app_state = Arc::new(AppState::new(session, orchestrator));

    // --- 5. Create Router and Apply Middleware ---
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = create_router(app_state).layer(cors);

    // --- 6. Start Server ---
    info!(
        %session_id,
        configured,
        model = %config.chat_model,
        bind_address = %config.bind_address,
        "Service configured. Starting server..."
    );
    let listener = tokio::net::TcpListener::bind(config.bind_address).await?;

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    info!("Server has shut down.");
    Ok(())
}
