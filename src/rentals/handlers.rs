use axum::{
    body::Bytes,
    extract::{Path, Query, State},
    http::{header, StatusCode},
    routing::{get, post},
    Json, Router,
};
use tracing::{info, instrument, warn};

use crate::{
    auth::guards::{require_owner_or_superuser, require_superuser, Caller},
    error::ApiError,
    extract::Payload,
    rentals::{
        domain::now_micros,
        dto::{AdminRentalQuery, AdminRentalView, CloseRentalRequest, CreateRentalRequest, RentalView},
        repo_types::{Rental, RentalFilter},
    },
    state::AppState,
    store::page,
};

pub fn rental_routes() -> Router<AppState> {
    Router::new()
        .route("/rentals/create/", post(create_rental))
        .route("/rentals/history/", get(rental_history))
        .route("/rentals/:id/", get(get_rental).patch(close_rental))
}

pub fn admin_routes() -> Router<AppState> {
    Router::new().route("/admin/rentals/", get(admin_list))
}

async fn load_owned(state: &AppState, caller: &Caller, id: i64) -> Result<Rental, ApiError> {
    let rental = state
        .rentals
        .find(id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Rental not found".into()))?;
    require_owner_or_superuser(caller, &rental)?;
    Ok(rental)
}

/// POST /rentals/create/ { bicycle }
#[instrument(skip(state), fields(user_id = %caller.id))]
pub async fn create_rental(
    State(state): State<AppState>,
    caller: Caller,
    Payload(payload): Payload<CreateRentalRequest>,
) -> Result<(StatusCode, [(header::HeaderName, String); 1], Json<RentalView>), ApiError> {
    let rental = match state
        .rentals
        .open(payload.bicycle, caller.id, now_micros())
        .await
    {
        Ok(r) => r,
        Err(e) => {
            warn!(error = %e, bicycle_id = payload.bicycle, "rental not opened");
            return Err(e.into());
        }
    };

    info!(rental_id = rental.id, bicycle_id = rental.bicycle_id, "rental opened");
    let location = format!("/api/rentals/{}/", rental.id);
    Ok((
        StatusCode::CREATED,
        [(header::LOCATION, location)],
        Json(rental.into()),
    ))
}

#[instrument(skip(state), fields(user_id = %caller.id))]
pub async fn get_rental(
    State(state): State<AppState>,
    caller: Caller,
    Path(id): Path<i64>,
) -> Result<Json<RentalView>, ApiError> {
    let rental = load_owned(&state, &caller, id).await?;
    Ok(Json(rental.into()))
}

/// PATCH /rentals/:id/ { end_time? }: returns the bicycle and finalizes cost.
#[instrument(skip(state, body), fields(user_id = %caller.id))]
pub async fn close_rental(
    State(state): State<AppState>,
    caller: Caller,
    Path(id): Path<i64>,
    body: Bytes,
) -> Result<Json<RentalView>, ApiError> {
    let payload: CloseRentalRequest = if body.iter().all(u8::is_ascii_whitespace) {
        CloseRentalRequest::default()
    } else {
        serde_json::from_slice(&body)
            .map_err(|e| ApiError::validation("end_time", format!("Invalid payload: {e}")))?
    };

    load_owned(&state, &caller, id).await?;

    let rental = match state.rentals.close(id, payload.end_time).await {
        Ok(r) => r,
        Err(e) => {
            warn!(error = %e, rental_id = id, "rental not closed");
            return Err(e.into());
        }
    };

    info!(
        rental_id = rental.id,
        bicycle_id = rental.bicycle_id,
        total_cost = %rental.total_cost,
        "rental closed"
    );
    Ok(Json(rental.into()))
}

#[instrument(skip(state), fields(user_id = %caller.id))]
pub async fn rental_history(
    State(state): State<AppState>,
    caller: Caller,
) -> Result<Json<Vec<RentalView>>, ApiError> {
    let rows = state.rentals.list_by_renter(caller.id).await?;
    Ok(Json(rows.into_iter().map(RentalView::from).collect()))
}

#[instrument(skip(state), fields(user_id = %caller.id))]
pub async fn admin_list(
    State(state): State<AppState>,
    caller: Caller,
    Query(q): Query<AdminRentalQuery>,
) -> Result<Json<Vec<AdminRentalView>>, ApiError> {
    require_superuser(&caller)?;
    let (limit, offset) = page(q.limit, q.offset);
    let filter = RentalFilter {
        bicycle_id: q.bicycle,
        renter_id: q.renter,
        is_returned: q.is_returned,
        limit,
        offset,
    };
    let rows = state.rentals.list(&filter).await?;
    Ok(Json(rows.into_iter().map(AdminRentalView::from).collect()))
}
