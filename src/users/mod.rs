use crate::state::AppState;
use axum::Router;

pub mod cast;
mod dto;
pub mod handlers;
pub mod memory;
pub mod password;
pub mod patch;
pub mod repo;
pub mod repo_types;
pub mod services;
pub mod store;

pub fn router() -> Router<AppState> {
    Router::new()
        .merge(handlers::account_routes())
        .merge(handlers::profile_routes())
}
