//! agrigate-api - HTTP gateway server for agrigate

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use agrigate_api::middleware::StaticTokenVerifier;
use agrigate_api::services::{Gateway, GatewayConfig, InMemoryHistoryStore};
use agrigate_api::{build_router, AppState, ServerConfig};
use agrigate_core::defaults;
use agrigate_inference::GeminiBackend;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Initialize tracing with configurable output
    //
    // Environment variables:
    //   LOG_FORMAT  - "json" or "text" (default: "text")
    //   LOG_FILE    - path to log file (optional, enables file logging)
    //   LOG_ANSI    - "true"/"false" override ANSI colors (auto-detected by default)
    //   RUST_LOG    - standard env filter (default: agrigate crates at debug, tower_http=debug)
    let log_format = std::env::var("LOG_FORMAT").unwrap_or_else(|_| "text".to_string());
    let log_file = std::env::var("LOG_FILE").ok();
    let log_ansi = std::env::var("LOG_ANSI")
        .ok()
        .map(|v| v == "true" || v == "1");

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        "agrigate_api=debug,agrigate_inference=debug,agrigate_core=info,tower_http=debug".into()
    });

    let registry = tracing_subscriber::registry().with(env_filter);

    // Optionally create a file appender with daily rotation
    let _file_guard = if let Some(ref path) = log_file {
        let file_dir = std::path::Path::new(path)
            .parent()
            .unwrap_or(std::path::Path::new("."));
        let file_name = std::path::Path::new(path)
            .file_name()
            .and_then(|f| f.to_str())
            .unwrap_or("agrigate-api.log");
        let file_appender = tracing_appender::rolling::daily(file_dir, file_name);
        let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

        if log_format == "json" {
            registry
                .with(
                    tracing_subscriber::fmt::layer()
                        .json()
                        .with_writer(non_blocking),
                )
                .init();
        } else {
            let mut layer = tracing_subscriber::fmt::layer().with_writer(non_blocking);
            if let Some(ansi) = log_ansi {
                layer = layer.with_ansi(ansi);
            } else {
                layer = layer.with_ansi(false); // no ANSI in files
            }
            registry.with(layer).init();
        }
        Some(guard)
    } else {
        // Console-only output
        if log_format == "json" {
            registry
                .with(tracing_subscriber::fmt::layer().json())
                .init();
        } else {
            let mut layer = tracing_subscriber::fmt::layer();
            if let Some(ansi) = log_ansi {
                layer = layer.with_ansi(ansi);
            }
            registry.with(layer).init();
        }
        None
    };

    info!(
        log_format = %log_format,
        log_file = log_file.as_deref().unwrap_or("(stdout)"),
        "Logging initialized"
    );

    let server = ServerConfig::from_env();
    info!(environment = %server.environment, "Configuration loaded");

    // One Gemini client serves both chat and vision
    let gemini = Arc::new(GeminiBackend::from_env()?);
    let gateway_config = GatewayConfig::from_env();
    let idle_timeout = gateway_config.sessions.idle_timeout;
    let gateway = Arc::new(Gateway::new(
        gemini.clone(),
        gemini,
        Arc::new(InMemoryHistoryStore::new()),
        gateway_config,
    ));

    let reaper = gateway.sessions().spawn_reaper(
        Duration::from_secs(defaults::SESSION_REAP_INTERVAL_SECS),
        idle_timeout,
    );
    match &reaper {
        Some(_) => info!(idle_secs = idle_timeout.as_secs(), "Session reaper started"),
        None => info!("Session reaper disabled"),
    }

    let verifier = Arc::new(StaticTokenVerifier::from_env());
    info!(tokens = verifier.len(), "Token verifier initialized");

    let addr: SocketAddr = format!("{}:{}", server.host, server.port).parse()?;
    let state = AppState::new(gateway, verifier, server);
    let app = build_router(state);

    // Start server
    info!("Starting server on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
