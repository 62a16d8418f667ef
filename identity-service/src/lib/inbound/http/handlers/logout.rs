use axum::extract::State;
use axum::http::StatusCode;
use axum::Extension;

use super::ApiError;
use crate::identity::ports::TokenLifecyclePort;
use crate::inbound::http::middleware::AuthenticatedRequest;
use crate::inbound::http::router::AppState;

/// Revoke the access token that authenticated this request.
pub async fn logout(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthenticatedRequest>,
) -> Result<StatusCode, ApiError> {
    state
        .lifecycle
        .blacklist_token(&auth.raw_token)
        .await
        .map_err(ApiError::from)?;

    tracing::info!(user_id = %auth.subject_id, "User logged out");

    Ok(StatusCode::NO_CONTENT)
}
