use axum::{
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use shared::{parse_api_date, DateRange, EnabledYears};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::info;

use crate::domain::reconciler::DataApi;
use crate::domain::store_directory::StoreFilter;
use crate::domain::DashboardService;

/// Application state shared across handlers. One dashboard session per
/// process; handlers serialize through the lock, matching the sequential
/// fetch model.
pub struct AppState<A: DataApi> {
    pub service: Arc<RwLock<DashboardService<A>>>,
}

impl<A: DataApi> Clone for AppState<A> {
    fn clone(&self) -> Self {
        Self {
            service: self.service.clone(),
        }
    }
}

impl<A: DataApi> AppState<A> {
    pub fn new(service: DashboardService<A>) -> Self {
        Self {
            service: Arc::new(RwLock::new(service)),
        }
    }
}

pub fn router<A: DataApi + 'static>(state: AppState<A>) -> Router {
    Router::new()
        .route("/kpis", get(get_kpis::<A>))
        .route("/charts/sales-trend", get(get_sales_trend::<A>))
        .route("/charts/labor-by-state", get(get_labor_by_state::<A>))
        .route("/charts/cost-bars", get(get_cost_bars::<A>))
        .route("/comp-sales", get(get_comp_sales::<A>))
        .route("/gross-sales", get(get_gross_sales::<A>))
        .route("/stores", get(get_stores::<A>))
        .route("/districts", get(get_districts::<A>))
        .route("/status", get(get_status::<A>))
        .route("/range", post(set_range::<A>))
        .route("/filter/store", post(set_store_filter::<A>))
        .route("/filter/district", post(set_district_filter::<A>))
        .route("/years", post(set_enabled_years::<A>))
        .route("/years/backfill", post(backfill_year::<A>))
        .route("/refresh", post(refresh::<A>))
        .with_state(state)
}

/// Axum handler for GET /api/kpis
async fn get_kpis<A: DataApi>(State(state): State<AppState<A>>) -> impl IntoResponse {
    let service = state.service.read().await;
    (StatusCode::OK, Json(service.kpis())).into_response()
}

/// Axum handler for GET /api/charts/sales-trend
async fn get_sales_trend<A: DataApi>(State(state): State<AppState<A>>) -> impl IntoResponse {
    let service = state.service.read().await;
    (StatusCode::OK, Json(service.sales_trend())).into_response()
}

/// Axum handler for GET /api/charts/labor-by-state
async fn get_labor_by_state<A: DataApi>(State(state): State<AppState<A>>) -> impl IntoResponse {
    let service = state.service.read().await;
    (StatusCode::OK, Json(service.labor_by_state())).into_response()
}

/// Axum handler for GET /api/charts/cost-bars
async fn get_cost_bars<A: DataApi>(State(state): State<AppState<A>>) -> impl IntoResponse {
    let service = state.service.read().await;
    (StatusCode::OK, Json(service.cost_bars())).into_response()
}

/// Axum handler for GET /api/comp-sales
async fn get_comp_sales<A: DataApi>(State(state): State<AppState<A>>) -> impl IntoResponse {
    let service = state.service.read().await;
    (StatusCode::OK, Json(service.comp_sales_by_store())).into_response()
}

/// Axum handler for GET /api/gross-sales
async fn get_gross_sales<A: DataApi>(State(state): State<AppState<A>>) -> impl IntoResponse {
    let service = state.service.read().await;
    (StatusCode::OK, Json(service.gross_sales_by_store())).into_response()
}

/// Axum handler for GET /api/stores
async fn get_stores<A: DataApi>(State(state): State<AppState<A>>) -> impl IntoResponse {
    let service = state.service.read().await;
    (StatusCode::OK, Json(service.stores().to_vec())).into_response()
}

/// Axum handler for GET /api/districts
async fn get_districts<A: DataApi>(State(state): State<AppState<A>>) -> impl IntoResponse {
    let service = state.service.read().await;
    (StatusCode::OK, Json(service.districts())).into_response()
}

#[derive(Debug, Serialize)]
struct StatusBody {
    loading: bool,
    refreshing: bool,
    history_loaded: bool,
    start: String,
    end: String,
    store: Option<String>,
    district: Option<String>,
}

/// Axum handler for GET /api/status
async fn get_status<A: DataApi>(State(state): State<AppState<A>>) -> impl IntoResponse {
    let service = state.service.read().await;
    let range = service.active_range();
    let (store, district) = match service.filter() {
        StoreFilter::All => (None, None),
        StoreFilter::Store(number) => (Some(number.clone()), None),
        StoreFilter::District(name) => (None, Some(name.clone())),
    };
    let body = StatusBody {
        loading: service.is_loading(),
        refreshing: service.is_refreshing(),
        history_loaded: service.history_loaded(),
        start: shared::format_api_date(range.start),
        end: shared::format_api_date(range.end),
        store,
        district,
    };
    (StatusCode::OK, Json(body)).into_response()
}

#[derive(Debug, Deserialize)]
pub struct RangeBody {
    pub start: String,
    pub end: String,
}

/// Axum handler for POST /api/range
async fn set_range<A: DataApi>(
    State(state): State<AppState<A>>,
    Json(body): Json<RangeBody>,
) -> impl IntoResponse {
    info!("POST /api/range - {} .. {}", body.start, body.end);

    let (Some(start), Some(end)) = (parse_api_date(&body.start), parse_api_date(&body.end)) else {
        return (StatusCode::BAD_REQUEST, "dates must be YYYY-MM-DD").into_response();
    };
    if end < start {
        return (StatusCode::BAD_REQUEST, "end precedes start").into_response();
    }

    let mut service = state.service.write().await;
    service.update_for_range(DateRange::new(start, end)).await;
    (StatusCode::OK, Json(service.kpis())).into_response()
}

#[derive(Debug, Deserialize)]
pub struct StoreFilterBody {
    pub store: Option<String>,
}

/// Axum handler for POST /api/filter/store
async fn set_store_filter<A: DataApi>(
    State(state): State<AppState<A>>,
    Json(body): Json<StoreFilterBody>,
) -> impl IntoResponse {
    info!("POST /api/filter/store - {:?}", body.store);

    let mut service = state.service.write().await;
    service.set_store_filter(body.store).await;
    (StatusCode::OK, Json(service.kpis())).into_response()
}

#[derive(Debug, Deserialize)]
pub struct DistrictFilterBody {
    pub district: Option<String>,
}

/// Axum handler for POST /api/filter/district
async fn set_district_filter<A: DataApi>(
    State(state): State<AppState<A>>,
    Json(body): Json<DistrictFilterBody>,
) -> impl IntoResponse {
    info!("POST /api/filter/district - {:?}", body.district);

    let mut service = state.service.write().await;
    service.set_district_filter(body.district).await;
    (StatusCode::OK, Json(service.kpis())).into_response()
}

/// Axum handler for POST /api/years
async fn set_enabled_years<A: DataApi>(
    State(state): State<AppState<A>>,
    Json(enabled): Json<EnabledYears>,
) -> impl IntoResponse {
    info!("POST /api/years - {:?}", enabled);

    let mut service = state.service.write().await;
    service.enable_years(enabled).await;
    (StatusCode::OK, Json(service.sales_trend())).into_response()
}

#[derive(Debug, Deserialize)]
pub struct BackfillBody {
    pub year: i32,
}

/// Axum handler for POST /api/years/backfill
async fn backfill_year<A: DataApi>(
    State(state): State<AppState<A>>,
    Json(body): Json<BackfillBody>,
) -> impl IntoResponse {
    info!("POST /api/years/backfill - {}", body.year);

    let mut service = state.service.write().await;
    service.load_additional_year(body.year).await;
    (StatusCode::OK, Json(service.sales_trend())).into_response()
}

/// Axum handler for POST /api/refresh
async fn refresh<A: DataApi>(State(state): State<AppState<A>>) -> impl IntoResponse {
    info!("POST /api/refresh");

    let mut service = state.service.write().await;
    service.refresh().await;
    (StatusCode::OK, Json(service.kpis())).into_response()
}
