use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, patch, post},
    Json, Router,
};
use tracing::instrument;

use crate::{
    auth::guards::Caller,
    error::ApiError,
    extract::Payload,
    state::AppState,
    users::{
        dto::{MeResponse, ProfilePatch, ProfileReplace, PublicUser, RegisterRequest},
        services,
    },
};

pub fn user_routes() -> Router<AppState> {
    Router::new()
        .route("/users/register/", post(register))
        .route("/users/update/", patch(update_partial).put(update_full))
        .route("/users/me/", get(me))
}

#[instrument(skip(state, payload))]
pub async fn register(
    State(state): State<AppState>,
    Payload(payload): Payload<RegisterRequest>,
) -> Result<(StatusCode, Json<PublicUser>), ApiError> {
    let user = services::register(&state, payload).await?;
    Ok((StatusCode::CREATED, Json(user.into())))
}

#[instrument(skip(state, payload), fields(user_id = %caller.id))]
pub async fn update_partial(
    State(state): State<AppState>,
    caller: Caller,
    Payload(payload): Payload<ProfilePatch>,
) -> Result<Json<PublicUser>, ApiError> {
    let user = services::update_profile(&state, caller.id, payload).await?;
    Ok(Json(user.into()))
}

#[instrument(skip(state, payload), fields(user_id = %caller.id))]
pub async fn update_full(
    State(state): State<AppState>,
    caller: Caller,
    Payload(payload): Payload<ProfileReplace>,
) -> Result<Json<PublicUser>, ApiError> {
    let user = services::update_profile(&state, caller.id, payload.into()).await?;
    Ok(Json(user.into()))
}

#[instrument(skip_all, fields(user_id = %caller.id))]
pub async fn me(caller: Caller) -> Json<MeResponse> {
    Json(MeResponse {
        email: caller.email,
    })
}
