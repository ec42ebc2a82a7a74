use axum::{extract::State, routing::get, Json, Router};
use tracing::instrument;

use crate::{
    auth::jwt::AuthUser,
    bicycles::dto::BicycleView,
    error::ApiError,
    state::AppState,
};

pub fn bicycle_routes() -> Router<AppState> {
    Router::new().route("/bicycles/available/", get(list_available))
}

#[instrument(skip_all)]
pub async fn list_available(
    State(state): State<AppState>,
    AuthUser(_user_id): AuthUser,
) -> Result<Json<Vec<BicycleView>>, ApiError> {
    let bicycles = state.bicycles.list_available().await?;
    Ok(Json(bicycles.into_iter().map(BicycleView::from).collect()))
}
