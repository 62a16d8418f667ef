use axum::extract::State;
use axum::http::StatusCode;
use axum::Extension;

use super::ApiError;
use super::ApiSuccess;
use super::UserData;
use crate::identity::ports::TokenLifecyclePort;
use crate::inbound::http::middleware::AuthenticatedRequest;
use crate::inbound::http::router::AppState;

pub async fn get_profile(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthenticatedRequest>,
) -> Result<ApiSuccess<UserData>, ApiError> {
    state
        .lifecycle
        .get_profile(&auth.subject_id)
        .await
        .map_err(ApiError::from)
        .map(|ref user| ApiSuccess::new(StatusCode::OK, user.into()))
}
