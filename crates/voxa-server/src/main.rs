//! Voxa server binary: the voice assistant backend.
//!
//! Starts an axum HTTP server with structured logging, database initialization,
//! provider construction and graceful shutdown on SIGTERM/SIGINT.

use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;
use voxa_server::agents::AgentLoader;
use voxa_server::persistence::ConversationLog;
use voxa_server::pipeline::Pipeline;
use voxa_server::session::SessionStore;
use voxa_server::{app, background, config, AppState, Components};
use voxa_voice::{ChatCompletionsClient, SpeechToText, SttPolicy, TtsService};

fn resolve_config_path() -> (Option<String>, &'static str) {
    if let Some(path) = std::env::args()
        .nth(1)
        .filter(|value| !value.trim().is_empty())
    {
        return (Some(path), "cli-arg");
    }

    if let Ok(path) = std::env::var("VOXA_CONFIG_PATH") {
        if !path.trim().is_empty() {
            return (Some(path), "env-var");
        }
    }

    (None, "default")
}

#[tokio::main]
async fn main() {
    let (resolved_config_path, config_source) = resolve_config_path();
    let selected_config_path = resolved_config_path.as_deref().or(Some("config.toml"));

    // Load configuration
    let config = config::load_config(selected_config_path)
        .expect("failed to load configuration; the server cannot start without valid config");

    // Initialize tracing
    let filter =
        EnvFilter::try_new(&config.logging.level).unwrap_or_else(|_| EnvFilter::new("info"));

    if config.logging.json {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }

    tracing::info!(
        source = config_source,
        path = selected_config_path.unwrap_or("<none>"),
        "resolved startup configuration path"
    );

    // Initialize database
    let pool = voxa_db::create_pool(
        &config.database.path,
        voxa_db::DbRuntimeSettings {
            busy_timeout_ms: config.database.busy_timeout_ms,
            pool_max_size: config.database.pool_max_size,
        },
    )
    .expect("failed to create database pool; check database.path in config");

    {
        let conn = pool
            .get()
            .expect("failed to get database connection for migrations");
        let applied = voxa_db::run_migrations(&conn).expect("failed to run database migrations");
        if applied > 0 {
            tracing::info!(count = applied, "applied database migrations");
        }
    }

    // Build providers. Unknown provider kinds stop start-up here.
    let stt = SttPolicy::from_config(&config.stt).expect("invalid [stt] configuration");
    if stt.has_fallback() {
        tracing::info!(primary = stt.name(), "speech-to-text fallback enabled");
    }
    let llm = ChatCompletionsClient::new(&config.llm).expect("invalid [llm] configuration");
    let tts = TtsService::from_config(&config.tts)
        .await
        .expect("invalid [tts] configuration");

    let components = Components {
        stt: config.stt.primary.kind.clone(),
        llm: llm.model().to_string(),
        tts: config.tts.kind.clone(),
    };

    let log = ConversationLog::new(pool.clone());
    let pipeline = Pipeline::new(
        Arc::new(stt),
        Arc::new(llm),
        Arc::new(tts),
        config.session.max_history,
    )
    .with_log(log.clone());

    let sessions = SessionStore::new();
    tokio::spawn(background::start_session_sweep(
        sessions.clone(),
        config.session.timeout_seconds,
        config.session.sweep_interval_seconds,
    ));

    let agents = AgentLoader::from_config(&config.agents);
    if !agents.dir().exists() {
        tracing::warn!(path = %agents.dir().display(), "agents directory not found; every agent will use defaults");
    }

    let state = AppState {
        pool,
        sessions,
        agents,
        pipeline,
        log,
        components,
    };

    // Build application
    let app = app(state);
    let addr = SocketAddr::new(config.server.host, config.server.port);

    tracing::info!(%addr, "starting voxa server");

    let listener = TcpListener::bind(addr)
        .await
        .expect("failed to bind to address; is another process using this port?");

    // Serve with graceful shutdown
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("server error");

    tracing::info!("voxa server shut down");
}

/// Waits for a SIGINT (Ctrl+C) or SIGTERM signal for graceful shutdown.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => { tracing::info!("received SIGINT, initiating graceful shutdown"); }
        () = terminate => { tracing::info!("received SIGTERM, initiating graceful shutdown"); }
    }
}
