use lazy_static::lazy_static;
use regex::Regex;
use tracing::{info, warn};
use uuid::Uuid;

use crate::auth::password::{hash_password, verify_password};
use crate::config::AdminBootstrap;
use crate::error::ApiError;
use crate::state::AppState;
use crate::users::dto::{ProfilePatch, RegisterRequest};
use crate::users::repo_types::{NewUser, User, UserChanges};

pub const MAX_EMAIL_LEN: usize = 99;
pub const MAX_NAME_LEN: usize = 99;

pub(crate) fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    }
    EMAIL_RE.is_match(email)
}

pub fn normalize_email(raw: &str) -> Result<String, ApiError> {
    let email = raw.trim().to_lowercase();
    if email.is_empty() {
        return Err(ApiError::validation("email", "This field is required."));
    }
    if email.chars().count() > MAX_EMAIL_LEN {
        return Err(ApiError::validation(
            "email",
            format!("Ensure this field has no more than {MAX_EMAIL_LEN} characters."),
        ));
    }
    if !is_valid_email(&email) {
        return Err(ApiError::validation("email", "Enter a valid email address."));
    }
    Ok(email)
}

pub fn validate_name(raw: &str) -> Result<String, ApiError> {
    let name = raw.trim();
    if name.is_empty() {
        return Err(ApiError::validation("name", "This field may not be blank."));
    }
    if name.chars().count() > MAX_NAME_LEN {
        return Err(ApiError::validation(
            "name",
            format!("Ensure this field has no more than {MAX_NAME_LEN} characters."),
        ));
    }
    Ok(name.to_string())
}

pub fn validate_password(raw: &str) -> Result<(), ApiError> {
    if raw.is_empty() {
        return Err(ApiError::validation("password", "This field may not be blank."));
    }
    Ok(())
}

pub async fn register(state: &AppState, req: RegisterRequest) -> Result<User, ApiError> {
    let email = normalize_email(&req.email)?;
    let name = validate_name(&req.name)?;
    validate_password(&req.password)?;

    let password_hash = hash_password(&req.password)?;
    let user = state
        .users
        .create(NewUser {
            email,
            name,
            password_hash,
            is_superuser: false,
        })
        .await?;

    info!(user_id = %user.id, email = %user.email, "user registered");
    Ok(user)
}

pub async fn update_profile(
    state: &AppState,
    user_id: Uuid,
    patch: ProfilePatch,
) -> Result<User, ApiError> {
    let mut changes = UserChanges::default();
    if let Some(email) = patch.email.as_deref() {
        changes.email = Some(normalize_email(email)?);
    }
    if let Some(name) = patch.name.as_deref() {
        changes.name = Some(validate_name(name)?);
    }
    if let Some(password) = patch.password.as_deref() {
        validate_password(password)?;
        changes.password_hash = Some(hash_password(password)?);
    }

    let rehashed = changes.password_hash.is_some();
    let updated = state.users.update(user_id, changes).await?;
    info!(user_id = %updated.id, rehashed, "profile updated");
    Ok(updated)
}

/// Checks credentials; any mismatch is reported as the same 401.
pub async fn authenticate(state: &AppState, email: &str, password: &str) -> Result<User, ApiError> {
    let invalid = || ApiError::Unauthorized("No active account found with the given credentials".into());
    let email = email.trim().to_lowercase();

    let Some(user) = state.users.find_by_email(&email).await? else {
        warn!(email = %email, "login unknown email");
        return Err(invalid());
    };
    if !verify_password(password, &user.password_hash)? {
        warn!(user_id = %user.id, "login invalid password");
        return Err(invalid());
    }
    Ok(user)
}

/// Creates the configured superuser, or promotes the existing account.
pub async fn ensure_superuser(state: &AppState, admin: &AdminBootstrap) -> Result<User, ApiError> {
    let email = normalize_email(&admin.email)?;
    validate_password(&admin.password)?;

    if let Some(existing) = state.users.find_by_email(&email).await? {
        if !existing.is_superuser {
            state.users.set_superuser(existing.id, true).await?;
            info!(user_id = %existing.id, "existing user promoted to superuser");
        }
        return Ok(User {
            is_superuser: true,
            ..existing
        });
    }

    let user = state
        .users
        .create(NewUser {
            name: email.clone(),
            email,
            password_hash: hash_password(&admin.password)?,
            is_superuser: true,
        })
        .await?;
    info!(user_id = %user.id, "superuser created");
    Ok(user)
}
