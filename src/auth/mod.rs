use crate::state::AppState;
use axum::Router;

pub mod claims;
pub mod dto;
pub mod guards;
pub mod handlers;
pub mod jwt;
pub mod password;

pub fn router() -> Router<AppState> {
    handlers::token_routes()
}
