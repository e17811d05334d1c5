//! HTTP API
//!
//! JSON endpoints for the oracle dashboard.

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::Deserialize;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::warn;

use oracle_core::{Asset, StoreError};

use crate::responses::{ErrorResponse, OracleHistoryResponse, RecentUpdatesResponse};
use crate::service::{History, OracleService, ViewError};

const NO_STORE_MESSAGE: &str = "History is not recorded: no database configured";

/// Create the API router with all endpoints
pub fn create_router(service: OracleService) -> Router {
    Router::new()
        .route("/api/oracles", get(get_btc_oracles))
        .route("/api/oracles/mon", get(get_mon_oracles))
        .route("/api/oracles/history", get(get_history))
        .route("/api/health", get(get_health))
        .with_state(service)
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
}

/// GET /api/oracles - BTC/USD view
async fn get_btc_oracles(State(service): State<OracleService>) -> Response {
    aggregate(&service, Asset::Btc)
}

/// GET /api/oracles/mon - MON/USD view
async fn get_mon_oracles(State(service): State<OracleService>) -> Response {
    aggregate(&service, Asset::Mon)
}

fn aggregate(service: &OracleService, asset: Asset) -> Response {
    match service.view(asset) {
        Ok(view) => Json(view).into_response(),
        Err(e) => {
            let status = match e {
                ViewError::NotConfigured(_) => StatusCode::NOT_FOUND,
                ViewError::NotReady(_) => StatusCode::SERVICE_UNAVAILABLE,
                ViewError::Cycle(_) => StatusCode::BAD_GATEWAY,
            };
            (status, Json(ErrorResponse::new(e))).into_response()
        }
    }
}

#[derive(Debug, Deserialize)]
struct HistoryQuery {
    oracle: Option<String>,
    limit: Option<String>,
}

impl HistoryQuery {
    /// A missing or non-numeric limit falls back to the default
    fn limit(&self) -> Option<u32> {
        self.limit.as_deref().and_then(|l| l.trim().parse().ok())
    }
}

/// GET /api/oracles/history?oracle=Pyth&limit=100
async fn get_history(
    Query(query): Query<HistoryQuery>,
    State(service): State<OracleService>,
) -> Response {
    let oracle = query.oracle.as_deref().map(str::trim).filter(|o| !o.is_empty());

    match service.history(oracle, query.limit()).await {
        Ok(History::Oracle { oracle, entries }) => Json(OracleHistoryResponse {
            oracle,
            history: entries,
            message: None,
        })
        .into_response(),
        Ok(History::Recent(updates)) => Json(RecentUpdatesResponse {
            updates,
            message: None,
        })
        .into_response(),
        Err(StoreError::Unavailable) => match oracle {
            Some(oracle) => Json(OracleHistoryResponse {
                oracle: oracle.to_string(),
                history: vec![],
                message: Some(NO_STORE_MESSAGE.to_string()),
            })
            .into_response(),
            None => Json(RecentUpdatesResponse {
                updates: vec![],
                message: Some(NO_STORE_MESSAGE.to_string()),
            })
            .into_response(),
        },
        Err(e) => {
            warn!("history query failed: {}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, Json(ErrorResponse::new(e))).into_response()
        }
    }
}

/// GET /api/health - per-asset cycle status
async fn get_health(State(service): State<OracleService>) -> impl IntoResponse {
    Json(service.health())
}
