//! Shevanta gateway: HTTP front end for the bilingual (Marathi/English) voice assistant.
//!
//! Routes:
//! - `GET  /health`
//! - `POST /api/process-voice`   multipart `audio` (WAV) → transcript, reply, audio URL
//! - `POST /api/process-text`    `{"text"}` → reply, audio URL
//! - `POST /api/generate-speech` `{"text"}` → audio URL for the text itself
//! - `GET  /api/get-audio/:identifier` → `audio/wav`
//!
//! `--synthesize <TEXT> [--out <PATH>]` runs one synthesis through the configured chain and exits.

mod config;
mod error;
mod handlers;
mod voice;

use axum::{
    body::Body,
    extract::{DefaultBodyLimit, Request},
    http::HeaderValue,
    middleware::{self, Next},
    response::Response,
    routing::{get, post},
    Router,
};
use config::ServerConfig;
use shevanta_voice::{build_orchestrator, VoiceConfig, VoiceOrchestrator};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tracing::{error, info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

const DEFAULT_SELF_TEST_OUT: &str = "shevanta-self-test.wav";

#[derive(Clone)]
pub struct AppState {
    pub orchestrator: Arc<VoiceOrchestrator>,
}

fn init_tracing(log_dir: Option<&PathBuf>) -> Option<WorkerGuard> {
    let (file_layer, guard) = match log_dir {
        Some(dir) => {
            let appender = tracing_appender::rolling::daily(dir, "shevanta-gateway.log");
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = tracing_subscriber::fmt::layer()
                .with_ansi(false)
                .with_writer(writer);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .with(file_layer)
        .init();
    guard
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let layer = CorsLayer::new().allow_methods(Any).allow_headers(Any);
    if origins.is_empty() {
        return layer.allow_origin(Any);
    }
    let allowed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|o| match HeaderValue::from_str(o) {
            Ok(v) => Some(v),
            Err(_) => {
                warn!(target: "shevanta::gateway", origin = %o, "ignoring invalid CORS origin");
                None
            }
        })
        .collect();
    layer.allow_origin(AllowOrigin::list(allowed))
}

pub fn router(state: AppState, server: &ServerConfig) -> Router {
    let api = Router::new()
        .route("/process-voice", post(handlers::voice::process_voice))
        .route("/process-text", post(handlers::voice::process_text))
        .route("/generate-speech", post(handlers::voice::generate_speech))
        .route("/get-audio/:identifier", get(handlers::voice::get_audio));

    Router::new()
        .route("/health", get(health))
        .nest("/api", api)
        .with_state(state)
        .layer(DefaultBodyLimit::max(server.max_upload_bytes))
        .layer(cors_layer(&server.cors_origins))
        .layer(middleware::from_fn(log_requests))
}

async fn log_requests(request: Request<Body>, next: Next) -> Response {
    let method = request.method().clone();
    let path = request.uri().path().to_string();
    let started = Instant::now();
    let response = next.run(request).await;
    info!(
        target: "shevanta::gateway",
        %method,
        %path,
        status = response.status().as_u16(),
        elapsed_ms = started.elapsed().as_millis() as u64,
        "request"
    );
    response
}

async fn health() -> &'static str {
    "OK"
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!(target: "shevanta::gateway", "failed to listen for Ctrl-C: {}", e);
        std::future::pending::<()>().await;
    }
    info!(target: "shevanta::gateway", "shutdown requested");
}

/// Value following `flag`, if present.
fn flag_value<'a>(args: &'a [String], flag: &str) -> Option<&'a str> {
    args.iter()
        .position(|a| a == flag)
        .and_then(|pos| args.get(pos + 1))
        .map(String::as_str)
}

#[tokio::main]
async fn main() {
    if let Err(e) = dotenvy::dotenv() {
        eprintln!("[shevanta-gateway] .env not loaded: {} (using system environment)", e);
    }
    let server = ServerConfig::from_env();
    let _log_guard = init_tracing(server.log_dir.as_ref());

    let voice_config = match VoiceConfig::load() {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("[shevanta-gateway] {}", e);
            std::process::exit(1);
        }
    };

    let args: Vec<String> = std::env::args().collect();
    if args.iter().any(|a| a == "--synthesize") {
        let Some(text) = flag_value(&args, "--synthesize").map(str::to_string) else {
            eprintln!("Usage: shevanta-gateway --synthesize <TEXT> [--out <PATH>]");
            std::process::exit(1);
        };
        let out = PathBuf::from(flag_value(&args, "--out").unwrap_or(DEFAULT_SELF_TEST_OUT));
        let cfg = voice_config.clone();
        let target = out.clone();
        let result = tokio::task::spawn_blocking(move || {
            let orchestrator = build_orchestrator(&cfg);
            voice::run_synthesize(&orchestrator, &text, &target)
        })
        .await;
        match result {
            Ok(Ok(voice_name)) => {
                println!("Wrote {} (voice: {})", out.display(), voice_name);
                std::process::exit(0);
            }
            Ok(Err(e)) => {
                eprintln!("Self-test failed: {}", e);
                std::process::exit(1);
            }
            Err(e) => {
                eprintln!("Self-test panicked: {}", e);
                std::process::exit(1);
            }
        }
    }

    // Blocking HTTP clients are built off the async runtime.
    let cfg = voice_config.clone();
    let orchestrator = match tokio::task::spawn_blocking(move || build_orchestrator(&cfg)).await {
        Ok(o) => Arc::new(o),
        Err(e) => {
            error!(target: "shevanta::gateway", "failed to initialise voice pipeline: {}", e);
            std::process::exit(1);
        }
    };
    voice::log_voice_status(&voice_config, &orchestrator);

    let store = orchestrator.store().clone();
    let sweep_every = voice_config.store.sweep_interval();
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(sweep_every);
        loop {
            ticker.tick().await;
            let removed = store.sweep_expired();
            if removed > 0 {
                info!(target: "shevanta::voice", removed, "expired audio clips swept");
            }
        }
    });

    let pipeline = orchestrator.clone();
    let app = router(AppState { orchestrator }, &server);
    let addr = server.bind_addr();
    let listener = match tokio::net::TcpListener::bind(&addr).await {
        Ok(l) => l,
        Err(e) => {
            error!(target: "shevanta::gateway", "cannot bind {}: {}", addr, e);
            std::process::exit(1);
        }
    };
    info!(target: "shevanta::gateway", "Shevanta listening on http://{}", addr);

    if let Err(e) = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
    {
        error!(target: "shevanta::gateway", "server error: {}", e);
        std::process::exit(1);
    }
    // Blocking HTTP clients are released off the async runtime too.
    let _ = tokio::task::spawn_blocking(move || drop(pipeline)).await;
    info!(target: "shevanta::gateway", "Shevanta stopped");
}
