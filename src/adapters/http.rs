//! HTTP surface of the pairing coordinator.
//!
//! | Endpoint | Method | Description |
//! |----------|--------|-------------|
//! | `/scan` | POST | Report a reader scan `{tagId}` |
//! | `/bind/:item_id` | GET | Long-poll until the next scan is bound to the item |
//! | `/pairing` | GET | Current coordinator slots |
//! | `/pairing` | DELETE | Abort the in-flight pairing |
//! | `/health` | GET | Liveness probe |

use crate::core::coordinator::PairingCoordinator;
use crate::domain::model::{BindResponse, PairingSnapshot, ScanOutcome};
use crate::domain::ports::EntityStore;
use crate::utils::error::{PairingError, Result};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

pub struct AppState<S: EntityStore> {
    pub coordinator: Arc<PairingCoordinator<S>>,
    pub bind_timeout: Option<Duration>,
}

impl<S: EntityStore> Clone for AppState<S> {
    fn clone(&self) -> Self {
        Self {
            coordinator: Arc::clone(&self.coordinator),
            bind_timeout: self.bind_timeout,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanRequest {
    pub tag_id: String,
}

/// JSON error body for failed requests.
pub struct ApiError(pub PairingError);

impl From<PairingError> for ApiError {
    fn from(err: PairingError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            PairingError::ItemNotFound { .. } => StatusCode::NOT_FOUND,
            PairingError::InvalidTag { .. } => StatusCode::BAD_REQUEST,
            PairingError::Superseded { .. } => StatusCode::CONFLICT,
            PairingError::Cancelled { .. } => StatusCode::GONE,
            PairingError::TimedOut { .. } => StatusCode::REQUEST_TIMEOUT,
            PairingError::HttpError(_) => StatusCode::BAD_GATEWAY,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };

        if status.is_server_error() {
            tracing::error!("Request failed: {}", self.0);
        }

        let body = json!({
            "error": self.0.user_friendly_message(),
            "category": format!("{:?}", self.0.category()),
        });
        (status, Json(body)).into_response()
    }
}

pub fn router<S: EntityStore + 'static>(state: AppState<S>) -> Router {
    Router::new()
        .route("/scan", post(report_scan::<S>))
        .route("/bind/:item_id", get(await_bind::<S>))
        .route(
            "/pairing",
            get(pairing_status::<S>).delete(reset_pairing::<S>),
        )
        .route("/health", get(health))
        .layer(TraceLayer::new_for_http())
        // 前端網頁由其他來源提供
        .layer(CorsLayer::permissive())
        .with_state(state)
}

pub async fn serve<F>(listener: TcpListener, router: Router, shutdown: F) -> Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let addr = listener.local_addr()?;
    tracing::info!("Pairing API listening on http://{}", addr);
    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown)
        .await?;
    Ok(())
}

async fn report_scan<S: EntityStore + 'static>(
    State(state): State<AppState<S>>,
    Json(request): Json<ScanRequest>,
) -> std::result::Result<Json<ScanOutcome>, ApiError> {
    let outcome = state.coordinator.report_scan(&request.tag_id).await?;
    Ok(Json(outcome))
}

async fn await_bind<S: EntityStore + 'static>(
    State(state): State<AppState<S>>,
    Path(item_id): Path<String>,
) -> Response {
    // If the client disconnects, this future is dropped along with the
    // handle, which clears the pending slot.
    let reply = match state.coordinator.register_bind(&item_id).await {
        Ok(handle) => match state.bind_timeout {
            Some(timeout) => handle.wait_timeout(timeout).await,
            None => handle.wait().await,
        },
        Err(e) => Err(e),
    };

    match reply {
        Ok(result) => (StatusCode::OK, Json(BindResponse::from(result))).into_response(),
        Err(PairingError::Superseded { item_id }) => (
            StatusCode::CONFLICT,
            Json(BindResponse::Superseded { item_id }),
        )
            .into_response(),
        Err(PairingError::Cancelled { item_id }) => {
            (StatusCode::GONE, Json(BindResponse::Cancelled { item_id })).into_response()
        }
        Err(PairingError::TimedOut { item_id }) => (
            StatusCode::REQUEST_TIMEOUT,
            Json(BindResponse::Timeout { item_id }),
        )
            .into_response(),
        Err(other) => ApiError(other).into_response(),
    }
}

async fn pairing_status<S: EntityStore + 'static>(
    State(state): State<AppState<S>>,
) -> Json<PairingSnapshot> {
    Json(state.coordinator.snapshot())
}

async fn reset_pairing<S: EntityStore + 'static>(
    State(state): State<AppState<S>>,
) -> Json<PairingSnapshot> {
    Json(state.coordinator.reset().await)
}

async fn health() -> Json<serde_json::Value> {
    Json(json!({"status": "ok"}))
}
