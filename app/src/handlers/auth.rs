use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use common::{AppState, auth::AUTH_USER_KEY};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use tower_sessions::Session;
use validator::Validate;

#[derive(Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(length(min = 1, max = 64))]
    pub username: String,
    #[serde(default)]
    pub password: String,
}

impl LoginRequest {
    /// Trims the username so validation sees the name that will be stored.
    fn normalized(mut self) -> Self {
        self.username = self.username.trim().to_string();
        self
    }
}

fn error(status: StatusCode, msg: &str) -> Response {
    (status, Json(json!({ "error": msg }))).into_response()
}

pub async fn login(
    State(state): State<Arc<AppState>>,
    session: Session,
    Json(payload): Json<LoginRequest>,
) -> Response {
    let payload = payload.normalized();
    if payload.validate().is_err() {
        return error(StatusCode::BAD_REQUEST, "Username must be 1-64 characters");
    }

    if let Some(correct_password) = &state.config.app_password {
        if payload.password != *correct_password {
            tracing::warn!(username = %payload.username, "rejected login");
            return error(StatusCode::UNAUTHORIZED, "Invalid password");
        }
    }

    let username = payload.username;
    if let Err(e) = session.insert(AUTH_USER_KEY, &username).await {
        tracing::error!("Failed to store session: {}", e);
        return error(StatusCode::INTERNAL_SERVER_ERROR, "Internal server error");
    }

    tracing::info!(%username, "signed in");
    Json(json!({ "username": username })).into_response()
}

pub async fn logout(session: Session) -> Response {
    if let Err(e) = session.flush().await {
        tracing::error!("Failed to clear session: {}", e);
        return error(StatusCode::INTERNAL_SERVER_ERROR, "Internal server error");
    }
    StatusCode::NO_CONTENT.into_response()
}
