//! Read-only HTTP view of the feeds.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use mymarket_catalog::{CatalogError, Market};
use mymarket_common::feed::{FeedKind, FeedSnapshot};
use mymarket_common::listing::Category;
use mymarket_store::FileStore;
use serde::Serialize;
use tracing::info;

type AppState = Arc<Market<Arc<FileStore>>>;

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
}

type ApiError = (StatusCode, Json<ErrorResponse>);

fn api_error(e: CatalogError) -> ApiError {
    let status = match e {
        CatalogError::Category(_) | CatalogError::Validation(_) => StatusCode::BAD_REQUEST,
        CatalogError::NotSignedIn => StatusCode::UNAUTHORIZED,
        CatalogError::NotOwner => StatusCode::FORBIDDEN,
        CatalogError::ListingNotFound(_) => StatusCode::NOT_FOUND,
        CatalogError::StoreRead(_) | CatalogError::StoreWrite(_) => {
            StatusCode::SERVICE_UNAVAILABLE
        }
    };
    (
        status,
        Json(ErrorResponse {
            error: e.to_string(),
        }),
    )
}

async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse { status: "ok" })
}

async fn snapshot(state: &AppState, kind: FeedKind) -> Result<Json<FeedSnapshot>, ApiError> {
    state
        .catalog()
        .snapshot(&kind, state.profiles())
        .await
        .map(Json)
        .map_err(api_error)
}

async fn feed_handler(State(state): State<AppState>) -> Result<Json<FeedSnapshot>, ApiError> {
    snapshot(&state, FeedKind::Global).await
}

async fn category_handler(
    State(state): State<AppState>,
    Path(category): Path<String>,
) -> Result<Json<FeedSnapshot>, ApiError> {
    let category: Category = category
        .parse()
        .map_err(|e| api_error(CatalogError::Category(e)))?;
    snapshot(&state, FeedKind::Category(category)).await
}

pub fn router(market: Market<Arc<FileStore>>) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/feed", get(feed_handler))
        .route("/feed/{category}", get(category_handler))
        .with_state(Arc::new(market))
}

pub async fn serve(market: Market<Arc<FileStore>>, port: u16) -> anyhow::Result<()> {
    let addr = format!("0.0.0.0:{port}");
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!(%addr, "listening");
    axum::serve(listener, router(market)).await?;
    Ok(())
}
