use axum::{Extension, Router};
use std::sync::Arc;
use tower_http::cors::CorsLayer;

use todo_assistant::config::AgentConfig;
use todo_assistant::llm::{HttpModelClient, ModelClient};
use todo_assistant::{db, handlers, middleware, AppState};

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    init_logging().expect("Failed to initialize logging");

    let db_pool = db::create_pool()
        .await
        .expect("Failed to create database pool.");

    let config = AgentConfig::from_env();
    if config.assistant_disabled {
        tracing::warn!("ASSISTANT_DISABLED is set; all turns will use fallback replies");
    }

    // Without an API key the assistant still runs, degraded.
    let model: Option<Arc<dyn ModelClient>> = match std::env::var("LLM_API_KEY").ok() {
        Some(api_key) if !api_key.is_empty() => {
            tracing::info!("Initializing model client ({})...", config.model);
            Some(Arc::new(HttpModelClient::new(api_key, &config)) as Arc<dyn ModelClient>)
        }
        _ => {
            tracing::warn!("LLM_API_KEY not found. Assistant will serve fallback replies only.");
            None
        }
    };

    let shared_state = AppState::new(db_pool, config, model);

    let app = Router::new()
        .merge(handlers::auth_routes())
        .merge(handlers::todo_routes())
        .merge(handlers::assistant_routes())
        .layer(axum::middleware::from_fn(
            middleware::request_logging_middleware,
        ))
        .layer(CorsLayer::permissive())
        .layer(Extension(shared_state));

    let listener = tokio::net::TcpListener::bind("0.0.0.0:3000").await.unwrap();
    tracing::info!("listening on {}", listener.local_addr().unwrap());
    axum::serve(listener, app).await.unwrap();
}

fn init_logging() -> Result<(), Box<dyn std::error::Error>> {
    use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

    let log_level = std::env::var("RUST_LOG").unwrap_or_else(|_| {
        if cfg!(debug_assertions) {
            "debug,todo_assistant=trace,sqlx=info,reqwest=info,hyper=info,tower=info".to_string()
        } else {
            "info,todo_assistant=info,sqlx=warn,reqwest=warn,hyper=warn,tower=warn".to_string()
        }
    });

    let env_filter = EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new(&log_level))?;

    let fmt_layer = if std::env::var("LOG_FORMAT").as_deref() == Ok("json") {
        // JSON logging for aggregation in production
        fmt::layer()
            .json()
            .with_current_span(true)
            .with_span_list(false)
            .with_target(true)
            .with_thread_ids(true)
            .with_thread_names(true)
            .boxed()
    } else {
        fmt::layer()
            .with_target(true)
            .with_thread_ids(false)
            .with_thread_names(false)
            .with_file(true)
            .with_line_number(true)
            .boxed()
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .init();

    tracing::info!("Todo assistant starting up...");
    tracing::info!("Version: {}", env!("CARGO_PKG_VERSION"));
    tracing::info!(
        "Build mode: {}",
        if cfg!(debug_assertions) {
            "development"
        } else {
            "production"
        }
    );
    tracing::info!("Log level: {}", log_level);

    Ok(())
}
