//! Read API (§4.8): paginated, read-only JSON endpoints over the Store.
//!
//! HTML template rendering is explicitly out of scope (§1); the pagination
//! response shape instead matches the field semantics of the page the
//! original rendered through, serialized as JSON.

use crate::store::{Store, TickDto, VspTickDto};
use axum::extract::{Query, State};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

const PAGE_SIZE: i64 = 20;

#[derive(Debug, Deserialize)]
pub struct PageQuery {
    page: Option<i64>,
}

/// Mirrors the pagination response fields exactly, including that
/// `previous_page` can be `0` (meaning "no previous page").
#[derive(Debug, Serialize)]
pub struct PaginatedResponse<T: Serialize> {
    data: Vec<T>,
    current_page: i64,
    previous_page: i64,
    next_page: Option<i64>,
    total_pages: i64,
    total_count: i64,
}

fn paginate<T: Serialize>(
    page_param: Option<i64>,
    total_count: i64,
    data: Vec<T>,
) -> PaginatedResponse<T> {
    let page = page_param.filter(|p| *p > 0).unwrap_or(1);
    let offset = (page - 1) * PAGE_SIZE;
    let total_pages = (total_count + PAGE_SIZE - 1) / PAGE_SIZE.max(1);
    let next_page = if offset + (data.len() as i64) < total_count {
        Some(page + 1)
    } else {
        None
    };

    PaginatedResponse {
        data,
        current_page: page,
        previous_page: page - 1,
        next_page,
        total_pages,
        total_count,
    }
}

struct ApiError(anyhow::Error);

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (
            axum::http::StatusCode::INTERNAL_SERVER_ERROR,
            self.0.to_string(),
        )
            .into_response()
    }
}

impl<E: Into<anyhow::Error>> From<E> for ApiError {
    fn from(err: E) -> Self {
        ApiError(err.into())
    }
}

async fn exchange_ticks(
    State(store): State<Store>,
    Query(params): Query<PageQuery>,
) -> Result<Json<PaginatedResponse<TickDto>>, ApiError> {
    let page = params.page.filter(|p| *p > 0).unwrap_or(1);
    let offset = (page - 1) * PAGE_SIZE;

    let total_count = store.all_exchange_ticks_count()?;
    let rows = store.all_exchange_ticks(offset, PAGE_SIZE)?;

    Ok(Json(paginate(params.page, total_count, rows)))
}

async fn vsp_ticks(
    State(store): State<Store>,
    Query(params): Query<PageQuery>,
) -> Result<Json<PaginatedResponse<VspTickDto>>, ApiError> {
    let page = params.page.filter(|p| *p > 0).unwrap_or(1);
    let offset = (page - 1) * PAGE_SIZE;

    let total_count = store.all_vsp_ticks_count()?;
    let rows = store.all_vsp_ticks(offset, PAGE_SIZE)?;

    Ok(Json(paginate(params.page, total_count, rows)))
}

async fn health_check() -> &'static str {
    "ok"
}

fn router(store: Store) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/exchange", get(exchange_ticks))
        .route("/vsp", get(vsp_ticks))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(store)
}

/// Serves the Read API until `token` is cancelled.
pub async fn serve(store: Store, addr: &str, token: CancellationToken) -> anyhow::Result<()> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(addr, "read api listening");

    axum::serve(listener, router(store))
        .with_graceful_shutdown(async move {
            token.cancelled().await;
        })
        .await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pagination_matches_s6() {
        let rows: Vec<i32> = (0..20).collect();
        let response = paginate(Some(2), 45, rows);
        assert_eq!(response.current_page, 2);
        assert_eq!(response.previous_page, 1);
        assert_eq!(response.next_page, Some(3));
        assert_eq!(response.total_pages, 3);
    }

    #[test]
    fn last_page_has_no_next_page() {
        let rows: Vec<i32> = (0..5).collect();
        let response = paginate(Some(3), 45, rows);
        assert_eq!(response.next_page, None);
        assert_eq!(response.total_pages, 3);
    }

    #[test]
    fn page_zero_clamps_to_one() {
        let rows: Vec<i32> = Vec::new();
        let response = paginate(Some(0), 0, rows);
        assert_eq!(response.current_page, 1);
        assert_eq!(response.previous_page, 0);
    }
}
