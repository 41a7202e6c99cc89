//! REST endpoints for whiteboard metadata and the stroke log.

use crate::state::AppState;
use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use inkboard_core::whiteboard::NewWhiteboard;
use inkboard_core::{StorageError, StorageResult, StoredStroke, StrokeRecord, Whiteboard, WhiteboardId};
use serde_json::json;
use std::sync::Arc;
use tokio::runtime::Handle;
use tracing::{info, warn};

/// Storage failure rendered as an HTTP error.
pub struct ApiError(StorageError);

impl From<StorageError> for ApiError {
    fn from(e: StorageError) -> Self {
        Self(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            StorageError::NotFound(_) => StatusCode::NOT_FOUND,
            StorageError::Serialization(_) => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        if status.is_server_error() {
            warn!("Request failed: {}", self.0);
        }
        (status, Json(json!({ "error": self.0.to_string() }))).into_response()
    }
}

/// Run a store call on the blocking pool. File-backed stores do
/// synchronous I/O inside their futures.
async fn on_store<T, F>(call: F) -> Result<T, ApiError>
where
    T: Send + 'static,
    F: FnOnce(&Handle) -> StorageResult<T> + Send + 'static,
{
    let runtime = Handle::current();
    tokio::task::spawn_blocking(move || call(&runtime))
        .await
        .map_err(|e| StorageError::Other(format!("Store task failed: {}", e)))?
        .map_err(ApiError::from)
}

pub async fn create_whiteboard(
    State(state): State<Arc<AppState>>,
    Json(body): Json<NewWhiteboard>,
) -> Result<(StatusCode, Json<Whiteboard>), ApiError> {
    let directory = state.directory.clone();
    let whiteboard = on_store(move |rt| {
        rt.block_on(directory.create(&body.owner_id, body.title.as_deref()))
    })
    .await?;
    info!("Created whiteboard {} for {}", whiteboard.id, whiteboard.owner_id);
    Ok((StatusCode::CREATED, Json(whiteboard)))
}

pub async fn get_whiteboard(
    State(state): State<Arc<AppState>>,
    Path(id): Path<WhiteboardId>,
) -> Result<Json<Whiteboard>, ApiError> {
    let directory = state.directory.clone();
    Ok(Json(on_store(move |rt| rt.block_on(directory.get(&id))).await?))
}

/// Persisted strokes in insertion order.
pub async fn list_strokes(
    State(state): State<Arc<AppState>>,
    Path(id): Path<WhiteboardId>,
) -> Result<Json<Vec<StoredStroke>>, ApiError> {
    let store = state.store.clone();
    Ok(Json(on_store(move |rt| rt.block_on(store.list(&id))).await?))
}

pub async fn append_stroke(
    State(state): State<Arc<AppState>>,
    Path(id): Path<WhiteboardId>,
    Json(record): Json<StrokeRecord>,
) -> Result<(StatusCode, Json<StoredStroke>), ApiError> {
    if record.whiteboard_id != id {
        return Err(StorageError::Serialization(format!(
            "stroke belongs to {}, not {}",
            record.whiteboard_id, id
        ))
        .into());
    }
    let store = state.store.clone();
    let stored = on_store(move |rt| rt.block_on(store.append(record))).await?;
    Ok((StatusCode::CREATED, Json(stored)))
}

#[cfg(test)]
mod tests {
    use crate::router;
    use crate::state::AppState;
    use axum::body::{Body, to_bytes};
    use axum::http::{Request, StatusCode};
    use inkboard_core::{
        MemoryDirectory, MemoryStrokeStore, StoredStroke, StrokeId, StrokeRecord, Whiteboard, WhiteboardId,
    };
    use serde_json::json;
    use std::sync::Arc;
    use tower::ServiceExt;

    fn app() -> axum::Router {
        router(Arc::new(AppState::new(
            Arc::new(MemoryStrokeStore::new()),
            Arc::new(MemoryDirectory::new()),
            16,
        )))
    }

    fn post(uri: &str, body: serde_json::Value) -> Request<Body> {
        Request::post(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn body_json<T: serde::de::DeserializeOwned>(response: axum::response::Response) -> T {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn record(whiteboard_id: WhiteboardId) -> StrokeRecord {
        serde_json::from_value(json!({
            "stroke_id": StrokeId::new(),
            "whiteboard_id": whiteboard_id,
            "user_id": "alice",
            "points": [{ "x": 0.0, "y": 0.0 }, { "x": 4.0, "y": 2.0 }],
            "color": "hsl(97, 70%, 50%)",
            "thickness": 3.0,
        }))
        .unwrap()
    }

    #[tokio::test]
    async fn test_health() {
        let response = app()
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_create_and_get_whiteboard() {
        let app = app();
        let response = app
            .clone()
            .oneshot(post("/api/whiteboards", json!({ "owner_id": "alice", "title": null })))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);
        let created: Whiteboard = body_json(response).await;
        assert_eq!(created.display_title(), "Untitled Board");

        let response = app
            .oneshot(
                Request::get(format!("/api/whiteboards/{}", created.id))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let fetched: Whiteboard = body_json(response).await;
        assert_eq!(fetched, created);
    }

    #[tokio::test]
    async fn test_unknown_whiteboard_is_404() {
        let response = app()
            .oneshot(
                Request::get(format!("/api/whiteboards/{}", WhiteboardId::new()))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_append_then_list_in_order() {
        let app = app();
        let board = WhiteboardId::new();
        let records: Vec<_> = (0..3).map(|_| record(board)).collect();

        for r in &records {
            let response = app
                .clone()
                .oneshot(post(
                    &format!("/api/whiteboards/{}/strokes", board),
                    serde_json::to_value(r).unwrap(),
                ))
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::CREATED);
        }

        let response = app
            .oneshot(
                Request::get(format!("/api/whiteboards/{}/strokes", board))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        let listed: Vec<StoredStroke> = body_json(response).await;
        let ids: Vec<_> = listed.iter().map(|s| s.record.stroke_id).collect();
        let expected: Vec<_> = records.iter().map(|r| r.stroke_id).collect();
        assert_eq!(ids, expected);
        assert_eq!(listed[2].seq, 2);
    }

    #[tokio::test]
    async fn test_append_rejects_mismatched_board() {
        let response = app()
            .oneshot(post(
                &format!("/api/whiteboards/{}/strokes", WhiteboardId::new()),
                serde_json::to_value(record(WhiteboardId::new())).unwrap(),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
