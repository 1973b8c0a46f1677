//! HTTP server assembly: introspect at startup, bind every relation,
//! freeze the registry and serve.

use std::sync::Arc;
use std::time::Duration;

use axum::{
    routing::{get, post},
    Router,
};
use dotenvy::dotenv;
use tokio::net::TcpListener;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::timeout::TimeoutLayer;

use handlers::{health_check, list_relations, query_relation, relation_schema};

use crate::catalog;
use crate::config::ServerConfig;

pub mod errors;
pub mod handlers;
mod models;
pub mod pool;
pub mod resolver;
mod rows;

/// Filter bodies are small JSON objects; anything near this is a mistake.
const MAX_BODY_BYTES: usize = 1024 * 1024;

pub struct AppState {
    pub registry: resolver::RelationRegistry,
    pub pool: Arc<pool::PgPool>,
    pub config: ServerConfig,
}

/// Assemble the full HTTP surface around a prepared state: routes,
/// body cap, request deadline and panic containment.
pub fn build_router(app_state: AppState) -> Router {
    let request_timeout = Duration::from_secs(app_state.config.request_timeout_secs);
    Router::new()
        .route("/health", get(health_check))
        .route("/relations", get(list_relations))
        .route("/relations/{schema}/{relation}", get(relation_schema))
        .route("/{schema}/{relation}", post(query_relation))
        .layer(RequestBodyLimitLayer::new(MAX_BODY_BYTES))
        .layer(TimeoutLayer::new(request_timeout))
        .layer(CatchPanicLayer::new())
        .with_state(Arc::new(app_state))
}

pub async fn run() {
    dotenv().ok();

    // Load server configuration from environment variables
    let config = match ServerConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            log::error!("Configuration error: {}", e);
            std::process::exit(1);
        }
    };

    run_with_config(config).await;
}

pub async fn run_with_config(config: ServerConfig) {
    dotenv().ok();

    log::info!(
        "Server configuration: http={}:{}, schemas={:?}, pool_size={}",
        config.http_host,
        config.http_port,
        config.schemas,
        config.pool_size
    );

    let pool = match pool::PgPool::new(
        &config.database_url,
        config.pool_size,
        Duration::from_secs(config.acquire_timeout_secs),
    ) {
        Ok(pool) => Arc::new(pool),
        Err(e) => {
            log::error!("✗ Failed to set up the database pool: {}", e);
            std::process::exit(1);
        }
    };

    // One catalog pass at startup. Everything the server will ever say
    // about relations comes from this snapshot.
    let snapshot = {
        let conn = match pool.acquire().await {
            Ok(conn) => conn,
            Err(e) => {
                log::error!("✗ Cannot reach the database for catalog introspection: {}", e);
                log::error!("  Server cannot start without a catalog snapshot.");
                std::process::exit(1);
            }
        };
        match catalog::load_snapshot(&conn).await {
            Ok(snapshot) => snapshot,
            Err(e) => {
                log::error!("✗ Catalog introspection failed: {}", e);
                log::error!("  Server cannot start without a catalog snapshot.");
                std::process::exit(1);
            }
        }
    };

    let registry = resolver::RelationRegistry::bind_all(&snapshot, &config.schemas);
    if registry.is_empty() {
        log::warn!(
            "⚠ No relations found in schemas {:?}; the API will serve an empty registry",
            config.schemas
        );
    }

    let http_bind_address = format!("{}:{}", config.http_host, config.http_port);

    let app = build_router(AppState {
        registry,
        pool,
        config: config.clone(),
    });

    log::info!("Starting HTTP server on {}", http_bind_address);
    let http_listener = match TcpListener::bind(&http_bind_address).await {
        Ok(listener) => {
            println!("✓ Successfully bound HTTP listener to {}", http_bind_address);
            listener
        }
        Err(e) => {
            log::error!(
                "✗ FATAL: Failed to bind HTTP listener to {}: {}",
                http_bind_address,
                e
            );
            log::error!("  Is another process using port {}?", config.http_port);
            std::process::exit(1);
        }
    };

    let http_server = axum::serve(http_listener, app);

    println!("pglens server is running");
    println!("  HTTP API: http://{}", http_bind_address);
    println!("Press Ctrl+C to stop");

    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        let signals = (
            signal(SignalKind::terminate()),
            signal(SignalKind::interrupt()),
        );
        match signals {
            (Ok(mut sigterm), Ok(mut sigint)) => {
                tokio::select! {
                    result = http_server => {
                        if let Err(e) = result {
                            log::error!("HTTP server error: {:?}", e);
                        }
                    }
                    _ = sigterm.recv() => println!("Received SIGTERM, shutting down..."),
                    _ = sigint.recv() => println!("Received SIGINT, shutting down..."),
                }
            }
            _ => {
                log::error!(
                    "Failed to register signal handlers. Server will run without graceful shutdown."
                );
                if let Err(e) = http_server.await {
                    log::error!("HTTP server error: {:?}", e);
                }
            }
        }
    }

    #[cfg(windows)]
    {
        tokio::select! {
            result = http_server => {
                if let Err(e) = result {
                    log::error!("HTTP server error: {:?}", e);
                }
            }
            _ = tokio::signal::ctrl_c() => {
                println!("Received shutdown signal, shutting down...");
            }
        }
    }

    println!("Server stopped");
}
