use crate::models::{AllocationRequest, IncomeProfile, SaveBudgetOutcome, SaveBudgetRequest, SetIncomeRequest};
use crate::service::{BudgetError, BudgetService};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use common::{AppState, auth::UserContext};
use reconcile::BudgetPeriod;
use serde_json::json;
use std::sync::Arc;
use validator::Validate;

impl IntoResponse for BudgetError {
    fn into_response(self) -> Response {
        let (status, msg) = match self {
            BudgetError::InvalidInput(msg) => (StatusCode::BAD_REQUEST, msg),
            BudgetError::NotFound => (StatusCode::NOT_FOUND, "Budget not found".to_string()),
            BudgetError::Infrastructure(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Internal server error".to_string(),
            ),
        };

        (status, Json(json!({ "error": msg }))).into_response()
    }
}

pub fn budgets_router(state: Arc<AppState>) -> Router<Arc<AppState>> {
    Router::new()
        // Specific routes first
        .route("/income", get(get_income).put(set_income))
        .route("/allocation", post(allocate))
        // Then parameterized routes
        .route("/{period}", get(get_budget).put(save_budget))
        .with_state(state)
}

pub fn parse_period(raw: &str) -> Result<BudgetPeriod, BudgetError> {
    raw.parse::<BudgetPeriod>().map_err(BudgetError::from)
}

async fn get_budget(
    State(state): State<Arc<AppState>>,
    user: UserContext,
    Path(period): Path<String>,
) -> Result<impl IntoResponse, BudgetError> {
    let period = parse_period(&period)?;
    let budget = BudgetService::budget_or_default(&state.db, &user, period).await?;
    Ok(Json(budget))
}

async fn save_budget(
    State(state): State<Arc<AppState>>,
    user: UserContext,
    Path(period): Path<String>,
    Json(payload): Json<SaveBudgetRequest>,
) -> Result<Response, BudgetError> {
    let period = parse_period(&period)?;
    let outcome = BudgetService::save_budget(
        &state.db,
        &user,
        &state.policy,
        period,
        payload.by_category,
        payload.acknowledged,
    )
    .await
    .map_err(|e| {
        tracing::error!("save_budget error: {:?}", e);
        e
    })?;

    let status = match outcome {
        SaveBudgetOutcome::Saved { .. } => StatusCode::OK,
        SaveBudgetOutcome::NeedsConfirmation { .. } => StatusCode::CONFLICT,
    };
    Ok((status, Json(outcome)).into_response())
}

async fn get_income(
    State(state): State<Arc<AppState>>,
    user: UserContext,
) -> Result<impl IntoResponse, BudgetError> {
    let income = BudgetService::get_income(&state.db, &user)
        .await?
        .ok_or(BudgetError::NotFound)?;
    Ok(Json(IncomeProfile::new(income)))
}

async fn set_income(
    State(state): State<Arc<AppState>>,
    user: UserContext,
    Json(payload): Json<SetIncomeRequest>,
) -> Result<impl IntoResponse, BudgetError> {
    payload
        .validate()
        .map_err(|e| BudgetError::InvalidInput(e.to_string()))?;

    let profile = BudgetService::set_income(&state.db, &user, payload.monthly_take_home).await?;
    Ok(Json(profile))
}

async fn allocate(
    State(state): State<Arc<AppState>>,
    user: UserContext,
    Json(payload): Json<AllocationRequest>,
) -> Result<impl IntoResponse, BudgetError> {
    let response = BudgetService::allocate(&state.db, &user, &payload.allocation, payload.total).await?;
    Ok(Json(response))
}
