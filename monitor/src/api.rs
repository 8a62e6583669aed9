use crate::config::MonitorConfig;
use crate::error::{MonitorError, Result};
use crate::net;
use crate::store::UsageStore;
use axum::{
    Router,
    extract::{Json, Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
};
use chrono::{Local, NaiveDate};
use common::{DailyUsage, MonthlyUsage, RateSnapshot};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing::{info, instrument};

/// Most recent snapshot published by the collector, served on `/api/live`.
pub struct LiveSpeeds {
    latest: RwLock<RateSnapshot>,
}

impl LiveSpeeds {
    pub fn new() -> Self {
        Self {
            latest: RwLock::new(RateSnapshot::default()),
        }
    }

    pub fn update(&self, snapshot: RateSnapshot) {
        *self.latest.write() = snapshot;
    }

    pub fn latest(&self) -> RateSnapshot {
        *self.latest.read()
    }
}

impl Default for LiveSpeeds {
    fn default() -> Self {
        Self::new()
    }
}

pub struct ApiServer {
    config: Arc<MonitorConfig>,
    store: Arc<UsageStore>,
    live: Arc<LiveSpeeds>,
}

#[derive(Clone)]
struct AppState {
    store: Arc<UsageStore>,
    live: Arc<LiveSpeeds>,
}

#[derive(Debug, Serialize, Deserialize)]
struct HealthResponse {
    status: String,
    version: String,
}

#[derive(Debug, Serialize, Deserialize)]
struct GenericResponse {
    success: bool,
    message: String,
}

#[derive(Debug, Serialize, Deserialize)]
struct DailyStatsResponse {
    day: String,
    bytes_sent: u64,
    bytes_recv: u64,
    total_bytes: u64,
    max_up_speed: u64,
    max_down_speed: u64,
    active_seconds: u64,
    avg_up_speed: f64,
    avg_down_speed: f64,
}

impl From<DailyUsage> for DailyStatsResponse {
    fn from(usage: DailyUsage) -> Self {
        Self {
            day: usage.day.to_string(),
            bytes_sent: usage.bytes_sent,
            bytes_recv: usage.bytes_recv,
            total_bytes: usage.total_bytes(),
            max_up_speed: usage.max_up_speed,
            max_down_speed: usage.max_down_speed,
            active_seconds: usage.active_seconds,
            avg_up_speed: usage.avg_up_speed(),
            avg_down_speed: usage.avg_down_speed(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct RangeStatsResponse {
    days: Vec<DailyStatsResponse>,
}

#[derive(Debug, Serialize, Deserialize)]
struct MonthlyStatsResponse {
    year: i32,
    month: u32,
    bytes_sent: u64,
    bytes_recv: u64,
    total_bytes: u64,
    max_up_speed: u64,
    max_down_speed: u64,
    active_seconds: u64,
    days_tracked: u64,
}

impl From<MonthlyUsage> for MonthlyStatsResponse {
    fn from(monthly: MonthlyUsage) -> Self {
        Self {
            year: monthly.year,
            month: monthly.month,
            bytes_sent: monthly.bytes_sent,
            bytes_recv: monthly.bytes_recv,
            total_bytes: monthly.total_bytes(),
            max_up_speed: monthly.max_up_speed,
            max_down_speed: monthly.max_down_speed,
            active_seconds: monthly.active_seconds,
            days_tracked: monthly.days_tracked,
        }
    }
}

#[derive(Debug, Serialize)]
struct InterfacesResponse {
    interfaces: Vec<net::InterfaceInfo>,
}

#[derive(Debug, Deserialize)]
struct RangeParams {
    start: String,
    end: String,
}

#[derive(Debug, Deserialize)]
struct MonthParams {
    year: i32,
    month: u32,
}

impl ApiServer {
    pub fn new(config: Arc<MonitorConfig>, store: Arc<UsageStore>, live: Arc<LiveSpeeds>) -> Self {
        Self { config, store, live }
    }

    #[instrument(skip(self))]
    pub async fn run(self) -> Result<()> {
        let app = router(AppState {
            store: self.store,
            live: self.live,
        });

        info!("Starting API server on {}", self.config.api_addr);

        let listener = tokio::net::TcpListener::bind(&self.config.api_addr).await?;
        axum::serve(listener, app).await?;

        Ok(())
    }
}

fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/api/live", get(get_live))
        .route("/api/interfaces", get(get_interfaces))
        .route("/api/stats/today", get(get_today))
        .route("/api/stats/daily/{day}", get(get_daily))
        .route("/api/stats/range", get(get_range))
        .route("/api/stats/monthly", get(get_monthly))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health_check() -> impl IntoResponse {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

async fn get_live(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.live.latest())
}

async fn get_interfaces() -> impl IntoResponse {
    Json(InterfacesResponse {
        interfaces: net::list_interfaces(),
    })
}

#[instrument(skip(state))]
async fn get_today(State(state): State<AppState>) -> Response {
    let today = Local::now().date_naive();
    match state.store.get_daily(today).await {
        // Today always exists for callers, even before the first flush.
        Ok(row) => {
            let usage = row.unwrap_or_else(|| DailyUsage::empty(today));
            (StatusCode::OK, Json(DailyStatsResponse::from(usage))).into_response()
        }
        Err(e) => query_error(e).into_response(),
    }
}

#[instrument(skip(state))]
async fn get_daily(State(state): State<AppState>, Path(day): Path<String>) -> Response {
    let Ok(day) = day.parse::<NaiveDate>() else {
        return bad_request(format!("Invalid date: {}", day)).into_response();
    };

    match state.store.get_daily(day).await {
        Ok(Some(usage)) => {
            (StatusCode::OK, Json(DailyStatsResponse::from(usage))).into_response()
        }
        Ok(None) => (
            StatusCode::NOT_FOUND,
            Json(GenericResponse {
                success: false,
                message: format!("No usage recorded for {}", day),
            }),
        )
            .into_response(),
        Err(e) => query_error(e).into_response(),
    }
}

#[instrument(skip(state))]
async fn get_range(State(state): State<AppState>, Query(params): Query<RangeParams>) -> Response {
    let (Ok(start), Ok(end)) = (
        params.start.parse::<NaiveDate>(),
        params.end.parse::<NaiveDate>(),
    ) else {
        return bad_request("Invalid date range, expected YYYY-MM-DD".to_string()).into_response();
    };

    match state.store.get_range(start, end).await {
        Ok(rows) => (
            StatusCode::OK,
            Json(RangeStatsResponse {
                days: rows.into_iter().map(DailyStatsResponse::from).collect(),
            }),
        )
            .into_response(),
        Err(e) => query_error(e).into_response(),
    }
}

#[instrument(skip(state))]
async fn get_monthly(State(state): State<AppState>, Query(params): Query<MonthParams>) -> Response {
    if !(1..=12).contains(&params.month) {
        return bad_request(format!("Invalid month: {}", params.month)).into_response();
    }

    match state.store.get_monthly(params.year, params.month).await {
        Ok(monthly) => {
            (StatusCode::OK, Json(MonthlyStatsResponse::from(monthly))).into_response()
        }
        Err(e) => query_error(e).into_response(),
    }
}

fn bad_request(message: String) -> (StatusCode, Json<GenericResponse>) {
    (
        StatusCode::BAD_REQUEST,
        Json(GenericResponse {
            success: false,
            message,
        }),
    )
}

fn query_error(e: MonitorError) -> (StatusCode, Json<GenericResponse>) {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(GenericResponse {
            success: false,
            message: format!("Query failed: {}", e),
        }),
    )
}
