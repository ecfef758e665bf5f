use std::{str::FromStr, sync::Arc};

use axum::{
    Router,
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::{get, post},
};
use serde::Deserialize;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tower_http::trace::TraceLayer;
use tracing::info;
use uuid::Uuid;

use crate::{
    error::NotificationError,
    models::{event::EventType, health::HealthStatus, response::ApiResponse, status::QueueItemStatus},
    service::NotificationService,
};

pub struct AppState {
    pub service: Arc<NotificationService>,
}

pub fn router(service: Arc<NotificationService>) -> Router {
    let state = Arc::new(AppState { service });

    Router::new()
        .route("/health", get(health_check))
        .route("/providers", get(list_providers))
        .route("/queue/stats", get(queue_stats))
        .route("/queue/items", get(list_queue_items))
        .route("/queue/items/{id}/requeue", post(requeue_item))
        .route("/templates/{event}/variables", get(template_variables))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

pub async fn run_api_server(
    service: Arc<NotificationService>,
    port: u16,
    shutdown: CancellationToken,
) -> anyhow::Result<()> {
    let addr = format!("0.0.0.0:{}", port);
    let listener = TcpListener::bind(&addr).await?;

    info!(address = %addr, "Status server started");

    axum::serve(listener, router(service))
        .with_graceful_shutdown(async move { shutdown.cancelled().await })
        .await?;

    Ok(())
}

struct ApiError(NotificationError);

impl From<NotificationError> for ApiError {
    fn from(err: NotificationError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            NotificationError::InvalidInput(_)
            | NotificationError::Validation { .. }
            | NotificationError::Template(_)
            | NotificationError::UnknownProvider(_) => StatusCode::BAD_REQUEST,
            NotificationError::NotFound(_) => StatusCode::NOT_FOUND,
            NotificationError::Queue(_) => StatusCode::CONFLICT,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let body = ApiResponse::<()>::error(self.0.to_string(), "Request failed");
        (status, Json(body)).into_response()
    }
}

async fn health_check(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let report = state.service.health().report().await;

    let status_code = match report.status {
        HealthStatus::Healthy => StatusCode::OK,
        HealthStatus::Degraded => StatusCode::OK,
        HealthStatus::Unhealthy => StatusCode::SERVICE_UNAVAILABLE,
    };

    (status_code, Json(report))
}

async fn list_providers(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(ApiResponse::success(
        state.service.registry().info(),
        "Registered providers",
    ))
}

async fn queue_stats(State(state): State<Arc<AppState>>) -> Result<impl IntoResponse, ApiError> {
    let stats = state.service.queue().get_queue_stats().await?;
    Ok(Json(ApiResponse::success(stats, "Queue statistics")))
}

#[derive(Debug, Deserialize)]
struct QueueFilter {
    status: Option<String>,
}

async fn list_queue_items(
    State(state): State<Arc<AppState>>,
    Query(filter): Query<QueueFilter>,
) -> Result<impl IntoResponse, ApiError> {
    let status = match filter.status.as_deref() {
        Some(raw) => Some(QueueItemStatus::from_string(raw).ok_or_else(|| {
            NotificationError::InvalidInput(format!("unknown queue status '{}'", raw))
        })?),
        None => None,
    };

    let items = state.service.queue().list(status).await?;
    Ok(Json(ApiResponse::success(items, "Queue items")))
}

async fn requeue_item(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let item = state.service.queue().requeue_failed(id).await?;
    Ok(Json(ApiResponse::success(item, "Queue item requeued")))
}

async fn template_variables(Path(event): Path<String>) -> Result<impl IntoResponse, ApiError> {
    let event_type = EventType::from_str(&event)?;
    Ok(Json(ApiResponse::success(
        crate::templates::variables::available_variables(event_type),
        format!("Template variables for {}", event_type),
    )))
}
