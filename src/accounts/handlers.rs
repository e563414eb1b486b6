use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use tracing::{error, info, instrument, warn};

use crate::{
    accounts::{
        dto::{ErrorResponse, LoginRequest, MessageResponse, RegisterRequest, UserName},
        services::{InfrastructureError, LoginError, RegisterError},
    },
    state::AppState,
};

pub fn account_routes() -> Router<AppState> {
    Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
        .route("/users", get(list_users))
}

#[instrument(skip(state, payload))]
pub async fn register(
    State(state): State<AppState>,
    payload: Result<Json<RegisterRequest>, JsonRejection>,
) -> Result<Json<MessageResponse>, RegisterError> {
    let Json(payload) = payload.map_err(|e| {
        warn!(error = %e, "register body rejected");
        RegisterError::InvalidInput("invalid request body")
    })?;

    let id = state
        .accounts
        .register(&payload.name, &payload.email, &payload.password)
        .await?;

    info!(user_id = %id, "user registered");
    Ok(Json(MessageResponse {
        message: "User registered successfully".into(),
        id,
    }))
}

#[instrument(skip(state, payload))]
pub async fn login(
    State(state): State<AppState>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<Json<MessageResponse>, LoginError> {
    let Json(payload) = payload.map_err(|e| {
        warn!(error = %e, "login body rejected");
        LoginError::InvalidInput("invalid request body")
    })?;

    let id = state.accounts.login(&payload.email, &payload.password).await?;

    info!(user_id = %id, "user logged in");
    Ok(Json(MessageResponse {
        message: "Login successful".into(),
        id,
    }))
}

#[instrument(skip(state))]
pub async fn list_users(
    State(state): State<AppState>,
) -> Result<Json<Vec<UserName>>, InfrastructureError> {
    let names = state.accounts.list_account_names().await?;
    Ok(Json(names.into_iter().map(|name| UserName { name }).collect()))
}

fn reply(status: StatusCode, message: &str) -> Response {
    (
        status,
        Json(ErrorResponse {
            error: message.to_string(),
        }),
    )
        .into_response()
}

impl IntoResponse for InfrastructureError {
    fn into_response(self) -> Response {
        error!(error = ?self.0, "infrastructure failure");
        reply(StatusCode::INTERNAL_SERVER_ERROR, "Internal server error")
    }
}

impl IntoResponse for RegisterError {
    fn into_response(self) -> Response {
        match self {
            RegisterError::InvalidInput(msg) => {
                warn!(reason = msg, "register invalid input");
                reply(StatusCode::BAD_REQUEST, msg)
            }
            RegisterError::EmailTaken => {
                warn!("email already registered");
                reply(StatusCode::BAD_REQUEST, "Email already registered")
            }
            RegisterError::Infrastructure(e) => e.into_response(),
        }
    }
}

impl IntoResponse for LoginError {
    fn into_response(self) -> Response {
        match self {
            LoginError::InvalidInput(msg) => {
                warn!(reason = msg, "login invalid input");
                reply(StatusCode::BAD_REQUEST, msg)
            }
            LoginError::InvalidCredentials => {
                warn!("login invalid credentials");
                reply(StatusCode::UNAUTHORIZED, "Invalid credentials")
            }
            LoginError::Infrastructure(e) => e.into_response(),
        }
    }
}
