use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use chrono::DateTime;
use chrono::Utc;
use serde::Deserialize;
use serde::Serialize;

use super::ApiError;
use super::ApiSuccess;
use crate::identity::models::EmailAddress;
use crate::identity::ports::TokenLifecyclePort;
use crate::inbound::http::router::AppState;

const RESET_MESSAGE: &str = "If the account exists, a password reset has been issued";

/// Issue a reset token.
///
/// The answer is the same for known and unknown emails. Without mail
/// delivery the token is returned in the body.
pub async fn forgot_password(
    State(state): State<AppState>,
    Json(body): Json<ForgotPasswordRequest>,
) -> Result<ApiSuccess<ForgotPasswordResponseData>, ApiError> {
    let email = EmailAddress::new(body.email)
        .map_err(|e| ApiError::UnprocessableEntity(format!("Invalid email: {}", e)))?;

    let ticket = state
        .lifecycle
        .forgot_password(&email)
        .await
        .map_err(ApiError::from)?;

    Ok(ApiSuccess::new(
        StatusCode::OK,
        ForgotPasswordResponseData {
            message: RESET_MESSAGE.to_string(),
            token: ticket.token,
            expires_at: ticket.expires_at,
        },
    ))
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ForgotPasswordRequest {
    email: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ForgotPasswordResponseData {
    pub message: String,
    pub token: String,
    pub expires_at: DateTime<Utc>,
}
