//! Staff-only fleet management.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, patch, post},
    Json, Router,
};
use tracing::{info, instrument};

use crate::{
    auth::guards::{require_superuser, Caller},
    bicycles::{
        dto::{
            validate_model, validate_price, AdminBicycleQuery, AvailabilityRequest,
            AvailabilityResponse, BicycleView, CreateBicycleRequest, UpdatePriceRequest,
        },
        repo_types::BicycleFilter,
    },
    error::ApiError,
    extract::Payload,
    state::AppState,
    store::page,
};

pub fn admin_routes() -> Router<AppState> {
    Router::new()
        .route("/admin/bicycles/", get(list).post(create))
        .route("/admin/bicycles/:id/", patch(update_price))
        .route("/admin/bicycles/availability/", post(set_availability))
}

#[instrument(skip(state), fields(user_id = %caller.id))]
pub async fn list(
    State(state): State<AppState>,
    caller: Caller,
    Query(q): Query<AdminBicycleQuery>,
) -> Result<Json<Vec<BicycleView>>, ApiError> {
    require_superuser(&caller)?;
    let (limit, offset) = page(q.limit, q.offset);
    let filter = BicycleFilter {
        in_rent: q.in_rent,
        search: q.search.filter(|s| !s.trim().is_empty()),
        limit,
        offset,
    };
    let rows = state.bicycles.list(&filter).await?;
    Ok(Json(rows.into_iter().map(BicycleView::from).collect()))
}

#[instrument(skip(state, payload), fields(user_id = %caller.id))]
pub async fn create(
    State(state): State<AppState>,
    caller: Caller,
    Payload(payload): Payload<CreateBicycleRequest>,
) -> Result<(StatusCode, Json<BicycleView>), ApiError> {
    require_superuser(&caller)?;
    let model = validate_model(&payload.model)?;
    let price = validate_price(payload.price)?;
    let bicycle = state.bicycles.create(&model, price).await?;
    info!(bicycle_id = bicycle.id, model = %bicycle.model, "bicycle added");
    Ok((StatusCode::CREATED, Json(bicycle.into())))
}

#[instrument(skip(state, payload), fields(user_id = %caller.id))]
pub async fn update_price(
    State(state): State<AppState>,
    caller: Caller,
    Path(id): Path<i64>,
    Payload(payload): Payload<UpdatePriceRequest>,
) -> Result<Json<BicycleView>, ApiError> {
    require_superuser(&caller)?;
    let price = validate_price(payload.price)?;
    let bicycle = state.bicycles.update_price(id, price).await?;
    info!(bicycle_id = id, price = %bicycle.price, "bicycle price changed");
    Ok(Json(bicycle.into()))
}

/// Mark selected as rented / available. Bypasses the rental ledger.
#[instrument(skip(state, payload), fields(user_id = %caller.id))]
pub async fn set_availability(
    State(state): State<AppState>,
    caller: Caller,
    Payload(payload): Payload<AvailabilityRequest>,
) -> Result<Json<AvailabilityResponse>, ApiError> {
    require_superuser(&caller)?;
    if payload.ids.is_empty() {
        return Err(ApiError::validation("ids", "This list may not be empty."));
    }
    let updated = state
        .bicycles
        .set_in_rent(&payload.ids, payload.in_rent)
        .await?;
    info!(
        updated,
        in_rent = payload.in_rent,
        requested = payload.ids.len(),
        "availability overridden"
    );
    Ok(Json(AvailabilityResponse { updated }))
}
