use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::users::repo_types::User;

/// Request body for user registration.
#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub name: String,
}

/// PATCH body: every field optional.
#[derive(Debug, Default, Deserialize)]
pub struct ProfilePatch {
    pub email: Option<String>,
    pub name: Option<String>,
    pub password: Option<String>,
}

/// PUT body: full replacement of the editable fields.
#[derive(Debug, Deserialize)]
pub struct ProfileReplace {
    pub email: String,
    pub name: String,
    pub password: String,
}

impl From<ProfileReplace> for ProfilePatch {
    fn from(r: ProfileReplace) -> Self {
        Self {
            email: Some(r.email),
            name: Some(r.name),
            password: Some(r.password),
        }
    }
}

/// Public part of the user returned to the client.
#[derive(Debug, Serialize)]
pub struct PublicUser {
    pub id: Uuid,
    pub email: String,
    pub name: String,
}

impl From<User> for PublicUser {
    fn from(u: User) -> Self {
        Self {
            id: u.id,
            email: u.email,
            name: u.name,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct MeResponse {
    pub email: String,
}
