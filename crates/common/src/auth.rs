use axum::{
    Json,
    extract::{FromRequestParts, Request, State},
    http::{StatusCode, request::Parts},
    middleware::Next,
    response::{IntoResponse, Response},
};
use serde_json::json;
use std::sync::Arc;
use tower_sessions::Session;
use crate::AppState;

pub const AUTH_USER_KEY: &str = "username";

/// The signed-in user, passed explicitly into every service call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserContext {
    pub username: String,
}

impl UserContext {
    pub fn new(username: impl Into<String>) -> Self {
        Self { username: username.into() }
    }
}

impl<S: Send + Sync> FromRequestParts<S> for UserContext {
    type Rejection = Response;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<UserContext>()
            .cloned()
            .ok_or_else(unauthorized)
    }
}

fn unauthorized() -> Response {
    (StatusCode::UNAUTHORIZED, Json(json!({ "error": "Login required" }))).into_response()
}

pub async fn auth_middleware(
    State(state): State<Arc<AppState>>,
    session: Session,
    mut request: Request,
    next: Next,
) -> Response {
    let signed_in: Option<String> = session
        .get(AUTH_USER_KEY)
        .await
        .unwrap_or(None);

    let username = match (signed_in, &state.config.app_password) {
        (Some(username), _) => username,
        // If no password is set, authentication is disabled
        (None, None) => state.config.default_user.clone(),
        (None, Some(_)) => return unauthorized(),
    };

    request.extensions_mut().insert(UserContext { username });
    next.run(request).await
}
