//! Inkboard relay and stroke store server
//!
//! Relays finalized strokes between clients drawing on the same whiteboard
//! and serves the durable stroke log they replay on join.
//!
//! ## Protocol
//!
//! WebSocket messages at `/ws` are JSON:
//! ```json
//! { "type": "join", "whiteboard": "<uuid>" }
//! { "type": "stroke", "stroke": { "id": "<uuid>", "points": [{ "x": 1, "y": 2 }], "color": "#000", "thickness": 3, "userId": "u" } }
//! { "type": "leave" }
//! ```
//!
//! REST under `/api`:
//! - `POST /api/whiteboards`
//! - `GET /api/whiteboards/{id}`
//! - `GET|POST /api/whiteboards/{id}/strokes`

mod api;
mod config;
mod state;
mod ws;

use axum::{Router, routing::get};
use config::ServerConfig;
use inkboard_core::{
    FileDirectory, FileStrokeStore, MemoryDirectory, MemoryStrokeStore, StorageResult, StrokeStore,
    WhiteboardDirectory,
};
use state::AppState;
use std::process::ExitCode;
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{error, info};

/// Build the HTTP router.
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/health", get(health))
        .route("/ws", get(ws::ws_handler))
        .route("/api/whiteboards", axum::routing::post(api::create_whiteboard))
        .route("/api/whiteboards/{id}", get(api::get_whiteboard))
        .route(
            "/api/whiteboards/{id}/strokes",
            get(api::list_strokes).post(api::append_stroke),
        )
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

fn build_state(config: &ServerConfig) -> StorageResult<AppState> {
    let (store, directory): (Arc<dyn StrokeStore>, Arc<dyn WhiteboardDirectory>) = match &config.data_dir {
        Some(dir) => {
            info!("Persisting to {}", dir.display());
            (
                Arc::new(FileStrokeStore::new(dir.join("strokes"))?),
                Arc::new(FileDirectory::new(dir.join("boards"))?),
            )
        }
        None => {
            info!("No data directory set, strokes are kept in memory");
            (Arc::new(MemoryStrokeStore::new()), Arc::new(MemoryDirectory::new()))
        }
    };
    Ok(AppState::new(store, directory, config.channel_capacity))
}

#[tokio::main]
async fn main() -> ExitCode {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "inkboard_server=info,tower_http=info".into()),
        )
        .init();

    let config = match ServerConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            error!("{}", e);
            return ExitCode::FAILURE;
        }
    };
    let state = match build_state(&config) {
        Ok(state) => Arc::new(state),
        Err(e) => {
            error!("Failed to open stores: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let listener = match tokio::net::TcpListener::bind(config.addr).await {
        Ok(listener) => listener,
        Err(e) => {
            error!("Failed to bind {}: {}", config.addr, e);
            return ExitCode::FAILURE;
        }
    };
    info!("Inkboard server listening on {}", config.addr);
    info!("WebSocket endpoint: ws://{}/ws", config.addr);

    if let Err(e) = axum::serve(listener, router(state)).await {
        error!("Server error: {}", e);
        return ExitCode::FAILURE;
    }
    ExitCode::SUCCESS
}

/// Index page
async fn index() -> &'static str {
    "Inkboard Server - Connect via WebSocket at /ws"
}

/// Health check
async fn health() -> &'static str {
    "ok"
}

#[cfg(test)]
mod tests {
    use super::*;
    use config::DEFAULT_CHANNEL_CAPACITY;
    use inkboard_core::WhiteboardId;

    #[tokio::test]
    async fn test_file_backed_state() {
        let dir = tempfile::tempdir().unwrap();
        let config = ServerConfig {
            data_dir: Some(dir.path().to_path_buf()),
            ..ServerConfig::default()
        };
        let state = build_state(&config).unwrap();
        assert_eq!(state.peer_count(WhiteboardId::new()), 0);
        assert!(state.store.list(&WhiteboardId::new()).await.unwrap().is_empty());
        assert!(dir.path().join("strokes").is_dir());
    }

    #[test]
    fn test_memory_state_by_default() {
        let config = ServerConfig::default();
        assert_eq!(config.channel_capacity, DEFAULT_CHANNEL_CAPACITY);
        assert!(build_state(&config).is_ok());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_file_backed_strokes_over_http() {
        use axum::body::{Body, to_bytes};
        use axum::http::{Request, StatusCode};
        use inkboard_core::StoredStroke;
        use tower::ServiceExt;

        let dir = tempfile::tempdir().unwrap();
        let config = ServerConfig {
            data_dir: Some(dir.path().to_path_buf()),
            ..ServerConfig::default()
        };
        let app = router(Arc::new(build_state(&config).unwrap()));
        let board = WhiteboardId::new();
        let uri = format!("/api/whiteboards/{}/strokes", board);
        let record = serde_json::json!({
            "stroke_id": inkboard_core::StrokeId::new(),
            "whiteboard_id": board,
            "user_id": "alice",
            "points": [{ "x": 0.0, "y": 0.0 }, { "x": 1.0, "y": 1.0 }],
            "color": "#000000",
            "thickness": 3.0,
        });

        let response = app
            .clone()
            .oneshot(
                Request::post(&uri)
                    .header("content-type", "application/json")
                    .body(Body::from(record.to_string()))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);

        let response = app
            .oneshot(Request::get(&uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let listed: Vec<StoredStroke> = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(listed.len(), 1);
        assert!(dir.path().join("strokes").join(format!("{}.jsonl", board)).is_file());
    }
}
