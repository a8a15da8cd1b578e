use crate::feedback::FeedbackService;
use crate::models::{FeedbackResponse, MergeRequest, RecordEntriesRequest};
use crate::service::{CostError, CostService};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use chrono::NaiveDate;
use common::{AppState, auth::UserContext};
use reconcile::{BudgetPeriod, Period};
use serde_json::json;
use std::sync::Arc;
use validator::Validate;

impl IntoResponse for CostError {
    fn into_response(self) -> Response {
        let (status, msg) = match self {
            CostError::InvalidInput(msg) => (StatusCode::BAD_REQUEST, msg),
            CostError::InvalidAmount(msg) => (StatusCode::UNPROCESSABLE_ENTITY, msg),
            CostError::NotFound => (StatusCode::NOT_FOUND, "Not found".to_string()),
            CostError::Timeout(msg) => (StatusCode::GATEWAY_TIMEOUT, format!("Timed out fetching {}", msg)),
            CostError::Infrastructure(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Internal server error".to_string(),
            ),
        };

        (status, Json(json!({ "error": msg }))).into_response()
    }
}

pub fn costs_router(state: Arc<AppState>) -> Router<Arc<AppState>> {
    Router::new()
        .route("/entries", post(record_entries))
        .route("/merge", post(merge_day))
        .route("/week/{date}", get(get_week))
        .route("/month/{month}", get(get_month))
        .route("/month/{month}/weeks", get(get_month_weeks))
        .route("/compare/{period}/{date}", get(compare_period))
        .route("/feedback/{month}", get(get_feedback))
        .with_state(state)
}

fn parse_date(raw: &str) -> Result<NaiveDate, CostError> {
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .map_err(|_| CostError::InvalidInput("Invalid date format, expected YYYY-MM-DD".into()))
}

async fn record_entries(
    State(state): State<Arc<AppState>>,
    user: UserContext,
    Json(payload): Json<RecordEntriesRequest>,
) -> Result<impl IntoResponse, CostError> {
    payload
        .validate()
        .map_err(|e| CostError::InvalidInput(e.to_string()))?;

    let outcome = CostService::record_entries(&state.db, &user, payload)
        .await
        .map_err(|e| {
            tracing::error!("record_entries error: {:?}", e);
            e
        })?;

    let status = if outcome.applied { StatusCode::CREATED } else { StatusCode::OK };
    Ok((status, Json(outcome)))
}

async fn merge_day(
    State(state): State<Arc<AppState>>,
    user: UserContext,
    Json(payload): Json<MergeRequest>,
) -> Result<impl IntoResponse, CostError> {
    payload
        .validate()
        .map_err(|e| CostError::InvalidInput(e.to_string()))?;

    let outcome = CostService::merge_day(&state.db, &user, payload)
        .await
        .map_err(|e| {
            tracing::error!("merge_day error: {:?}", e);
            e
        })?;
    Ok(Json(outcome))
}

async fn get_week(
    State(state): State<Arc<AppState>>,
    user: UserContext,
    Path(date): Path<String>,
) -> Result<impl IntoResponse, CostError> {
    let period = Period::week_of(parse_date(&date)?, state.policy.week_start)?;
    let totals = CostService::period_totals(&state.db, &user, &period).await?;
    Ok(Json(totals))
}

async fn get_month(
    State(state): State<Arc<AppState>>,
    user: UserContext,
    Path(month): Path<String>,
) -> Result<impl IntoResponse, CostError> {
    let period = Period::parse_month(&month)?;
    let totals = CostService::period_totals(&state.db, &user, &period).await?;
    Ok(Json(totals))
}

async fn get_month_weeks(
    State(state): State<Arc<AppState>>,
    user: UserContext,
    Path(month): Path<String>,
) -> Result<impl IntoResponse, CostError> {
    let period = Period::parse_month(&month)?;
    let weeks = CostService::month_weeks(&state.db, &user, &state.policy, &period).await?;
    Ok(Json(weeks))
}

async fn compare_period(
    State(state): State<Arc<AppState>>,
    user: UserContext,
    Path((period, date)): Path<(String, String)>,
) -> Result<impl IntoResponse, CostError> {
    let budget_period = period.parse::<BudgetPeriod>()?;
    let date = parse_date(&date)?;

    let result = CostService::compare_period(&state.db, &user, &state.policy, budget_period, date).await?;
    Ok(Json(result))
}

async fn get_feedback(
    State(state): State<Arc<AppState>>,
    user: UserContext,
    Path(month): Path<String>,
) -> Result<impl IntoResponse, CostError> {
    tracing::info!("Computing feedback for: {}", month);

    let feedback = FeedbackService::monthly_feedback(
        &state.db,
        &user,
        &month,
        state.config.fetch_timeout(),
    )
    .await?;

    Ok(Json(FeedbackResponse::from(feedback)))
}
