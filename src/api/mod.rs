//! HTTP surface: `GET /`, `GET /search`, `POST /gemini-info`.

mod errors;
mod params;

use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::{Query, State};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use tower_http::cors::{Any, CorsLayer};
use tracing::info;

use crate::catalog::{SearchEngine, TableSource};
use crate::gemini::EnrichmentProxy;
use errors::{enrich_error_to_response, rejection_to_response, search_error_to_response};
use params::{Banner, InfoRequest, SearchParams, SearchResponse};

const BANNER: &str = "DoriTop API serveri ishlamoqda! (v2: Saralash bilan)";

/// Shared handler state.
pub struct AppState<S> {
    pub catalog: SearchEngine<S>,
    pub enrichment: EnrichmentProxy,
}

/// Build the full router. CORS is open to every origin, method and header.
pub fn router<S>(state: Arc<AppState<S>>) -> Router
where
    S: TableSource + Send + Sync + 'static,
{
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/", get(root))
        .route("/search", get(search::<S>))
        .route("/gemini-info", post(gemini_info::<S>))
        .layer(cors)
        .with_state(state)
}

async fn root() -> Json<Banner> {
    Json(Banner { message: BANNER })
}

async fn search<S>(
    State(state): State<Arc<AppState<S>>>,
    Query(params): Query<SearchParams>,
) -> Response
where
    S: TableSource + Send + Sync + 'static,
{
    match state.catalog.search(params.q.as_deref()).await {
        Ok(results) => Json(SearchResponse { results }).into_response(),
        Err(e) => search_error_to_response(e),
    }
}

async fn gemini_info<S>(
    State(state): State<Arc<AppState<S>>>,
    payload: Result<Json<InfoRequest>, JsonRejection>,
) -> Response
where
    S: TableSource + Send + Sync + 'static,
{
    let Json(request) = match payload {
        Ok(p) => p,
        Err(rejection) => return rejection_to_response(rejection),
    };
    info!(name = %request.dori_nomi, "gemini-info requested");

    match state.enrichment.enrich(&request.dori_nomi).await {
        Ok(info) => Json(info).into_response(),
        Err(e) => enrich_error_to_response(e),
    }
}
