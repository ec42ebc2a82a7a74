use axum::{
    extract::State,
    routing::post,
    Json, Router,
};
use tracing::{info, instrument, warn};

use crate::{
    auth::{
        claims::TokenKind,
        dto::{RefreshRequest, TokenPair, TokenRequest},
    },
    error::ApiError,
    extract::Payload,
    state::AppState,
    users::services::authenticate,
};

pub fn token_routes() -> Router<AppState> {
    Router::new()
        .route("/users/token/", post(obtain_token))
        .route("/users/token/refresh/", post(refresh_token))
}

#[instrument(skip(state, payload))]
pub async fn obtain_token(
    State(state): State<AppState>,
    Payload(payload): Payload<TokenRequest>,
) -> Result<Json<TokenPair>, ApiError> {
    let user = authenticate(&state, &payload.email, &payload.password).await?;
    let pair = state.jwt.issue_pair(user.id)?;
    info!(user_id = %user.id, "token pair issued");
    Ok(Json(pair))
}

#[instrument(skip(state, payload))]
pub async fn refresh_token(
    State(state): State<AppState>,
    Payload(payload): Payload<RefreshRequest>,
) -> Result<Json<TokenPair>, ApiError> {
    let claims = state.jwt.decode(&payload.refresh, TokenKind::Refresh).map_err(|e| {
        warn!(error = %e, "refresh rejected");
        ApiError::Unauthorized("Token is invalid or expired".into())
    })?;

    if state.users.find_by_id(claims.sub).await?.is_none() {
        warn!(user_id = %claims.sub, "refresh for unknown user");
        return Err(ApiError::Unauthorized("User not found".into()));
    }

    Ok(Json(state.jwt.issue_pair(claims.sub)?))
}
