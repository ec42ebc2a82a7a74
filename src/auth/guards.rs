//! Access checks. Handlers call these explicitly with the caller and the
//! resource being touched.

use axum::{async_trait, extract::FromRequestParts, http::request::Parts};
use tracing::warn;
use uuid::Uuid;

use crate::auth::jwt::AuthUser;
use crate::error::ApiError;
use crate::rentals::repo_types::Rental;
use crate::state::AppState;

/// Authenticated caller, re-read from the user registry on every request so a
/// demoted or deleted account loses access immediately.
#[derive(Debug, Clone)]
pub struct Caller {
    pub id: Uuid,
    pub email: String,
    pub is_superuser: bool,
}

#[async_trait]
impl FromRequestParts<AppState> for Caller {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let AuthUser(user_id) = AuthUser::from_request_parts(parts, state).await?;
        let user = state.users.find_by_id(user_id).await?.ok_or_else(|| {
            warn!(%user_id, "token for unknown user");
            ApiError::Unauthorized("User not found".into())
        })?;
        Ok(Caller {
            id: user.id,
            email: user.email,
            is_superuser: user.is_superuser,
        })
    }
}

pub fn require_superuser(caller: &Caller) -> Result<(), ApiError> {
    if caller.is_superuser {
        return Ok(());
    }
    warn!(user_id = %caller.id, "superuser required");
    Err(ApiError::Forbidden(
        "You do not have permission to perform this action.".into(),
    ))
}

pub fn require_owner_or_superuser(caller: &Caller, rental: &Rental) -> Result<(), ApiError> {
    if rental.renter_id == caller.id || caller.is_superuser {
        return Ok(());
    }
    warn!(user_id = %caller.id, rental_id = rental.id, "not the renter");
    Err(ApiError::Forbidden(
        "You do not have permission to perform this action.".into(),
    ))
}
