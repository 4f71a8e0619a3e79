//! # Voice Agent Backend - Main Application Entry Point
//!
//! HTTP service that turns a spoken question into a spoken answer:
//! audio upload → transcription → chat reply → speech synthesis.
//!
//! ## Application Architecture:
//! - **config**: Layered configuration (defaults, config.toml, environment)
//! - **error**: The closed set of request failures and their HTTP mapping
//! - **state**: Shared state handed to every request handler
//! - **health**: Service info and liveness endpoints
//! - **middleware**: Request id, span and access logging
//! - **handlers**: Route table, multipart reader and endpoint handlers
//! - **audio**: Upload validation and request-scoped temp files
//! - **providers**: Transcription, chat and speech clients behind traits
//! - **session**: Conversation history store
//! - **pipeline**: Orchestrates one request through all stages

mod audio; // Upload validation and temp files (audio/ directory)
mod config; // Configuration management (config.rs)
mod error; // Error handling types (error.rs)
mod handlers; // HTTP request handlers (handlers/ directory)
mod health; // Health check endpoints (health.rs)
mod middleware; // Custom middleware (middleware/ directory)
mod pipeline; // Stage orchestration (pipeline/ directory)
mod providers; // Upstream AI clients (providers/ directory)
mod session; // Conversation sessions (session/ directory)
mod state; // Application state (state.rs)

use actix_cors::Cors;
use actix_web::{web, App, HttpServer};
use anyhow::Result;
use config::AppConfig;
use session::SessionStore;
use state::AppState;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// The main application entry point.
///
/// ## What this function does:
/// 1. **Loads configuration** from files and environment variables
/// 2. **Sets up logging**, honouring the configured debug switch
/// 3. **Builds the provider client and session store**
/// 4. **Starts the session sweeper** when an idle TTL is configured
/// 5. **Runs the HTTP server** until Ctrl+C or SIGTERM
#[actix_web::main]
async fn main() -> Result<()> {
    // .ok(): a missing .env file is fine
    dotenv::dotenv().ok();

    let config = AppConfig::load()?;
    init_tracing(&config)?;
    config.validate()?;

    info!("Starting {} v{}", config.app.name, env!("CARGO_PKG_VERSION"));
    info!(
        asr = %config.models.asr_model,
        llm = %config.models.llm_model,
        tts = %config.models.tts_model,
        "Provider models configured"
    );

    let app_state = AppState::from_config(config.clone())?;
    let bind_addr = format!("{}:{}", config.server.host, config.server.port);

    if config.conversation.session_ttl_secs > 0 {
        spawn_session_sweeper(
            app_state.sessions.clone(),
            Duration::from_secs(config.conversation.session_ttl_secs),
        );
    }

    info!("Starting HTTP server on {}", bind_addr);

    let server = HttpServer::new(move || {
        let cors = Cors::default()
            .allow_any_origin()
            .allow_any_method()
            .allow_any_header()
            .expose_headers(vec![
                "X-Request-Id",
                "X-Transcription",
                "X-Response-Text",
                "X-Processing-Time",
            ])
            .max_age(3600);

        App::new()
            .app_data(web::Data::new(app_state.clone()))
            // Middleware runs in reverse order for responses
            .wrap(cors)
            .wrap(middleware::RequestLogging)
            .configure(handlers::configure_routes)
    })
    .disable_signals()
    .bind(&bind_addr)?
    .run();

    let server_handle = server.handle();
    let server_task = tokio::spawn(server);

    // Whichever finishes first wins
    tokio::select! {
        result = server_task => {
            match result {
                Ok(Ok(())) => {}
                Ok(Err(e)) => error!("Server error: {}", e),
                Err(e) => error!("Server task error: {}", e),
            }
        }
        _ = wait_for_shutdown() => {
            info!("Shutdown signal received, stopping server...");
            server_handle.stop(true).await;
        }
    }

    info!("Server stopped gracefully");
    Ok(())
}

/// Initialize the tracing (logging) system.
///
/// ## Environment Variables:
/// - `RUST_LOG`: Wins when set (e.g. "voice_agent_backend=trace")
/// - Otherwise `app.debug` picks between a debug and a quieter default
fn init_tracing(config: &AppConfig) -> Result<()> {
    let default_filter = if config.app.debug {
        "voice_agent_backend=debug,actix_web=info"
    } else {
        "voice_agent_backend=info,actix_web=warn"
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .try_init()?;

    Ok(())
}

/// Periodically drop sessions idle for longer than `ttl`.
fn spawn_session_sweeper(sessions: Arc<dyn SessionStore>, ttl: Duration) {
    let period = (ttl / 2).max(Duration::from_secs(1));
    info!(ttl_secs = ttl.as_secs(), "Session eviction enabled");

    tokio::spawn(async move {
        let mut interval = tokio::time::interval(period);
        loop {
            interval.tick().await;
            let removed = sessions.evict_idle(ttl).await;
            if removed > 0 {
                info!(removed, "Evicted idle sessions");
            }
        }
    });
}

/// Resolve on Ctrl+C or SIGTERM.
///
/// If a handler can't be installed the failure is logged and that signal is
/// simply never observed.
async fn wait_for_shutdown() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                warn!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl+C"),
        _ = terminate => info!("Received SIGTERM"),
    }
}
