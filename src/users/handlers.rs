use axum::{
    extract::{rejection::JsonRejection, Path, State},
    routing::{get, post, put},
    Json, Router,
};
use tracing::instrument;

use crate::{
    errors::AppError,
    state::AppState,
    users::{
        dto::{
            CredentialsRequest, MessageResponse, RegisterRequest, UpdateProfileRequest,
            UpdateUserRequest, UserResponse,
        },
        repo_types::User,
        services::{self, CredentialChange},
    },
};

pub fn account_routes() -> Router<AppState> {
    Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
        .route("/delete-account", post(delete_account))
}

pub fn profile_routes() -> Router<AppState> {
    Router::new()
        .route("/get-user/:phone", get(get_user))
        .route("/update-user", put(update_user))
        .route("/update-profile", put(update_profile))
}

#[instrument(skip(state, payload))]
pub async fn register(
    State(state): State<AppState>,
    payload: Result<Json<RegisterRequest>, JsonRejection>,
) -> Result<Json<MessageResponse>, AppError> {
    let Json(payload) = payload?;
    services::register(
        state.users.as_ref(),
        payload.phone.as_deref(),
        payload.password.as_deref(),
        payload.profile,
    )
    .await?;
    Ok(Json(MessageResponse {
        message: "User registered successfully",
    }))
}

#[instrument(skip(state, payload))]
pub async fn login(
    State(state): State<AppState>,
    payload: Result<Json<CredentialsRequest>, JsonRejection>,
) -> Result<Json<UserResponse>, AppError> {
    let Json(payload) = payload?;
    let user = services::login(
        state.users.as_ref(),
        payload.phone.as_deref(),
        payload.password.as_deref(),
    )
    .await?;
    Ok(Json(UserResponse {
        message: "Login successful",
        user,
    }))
}

#[instrument(skip(state, payload))]
pub async fn delete_account(
    State(state): State<AppState>,
    payload: Result<Json<CredentialsRequest>, JsonRejection>,
) -> Result<Json<MessageResponse>, AppError> {
    let Json(payload) = payload?;
    services::delete_account(
        state.users.as_ref(),
        payload.phone.as_deref(),
        payload.password.as_deref(),
    )
    .await?;
    Ok(Json(MessageResponse {
        message: "Account deleted successfully",
    }))
}

#[instrument(skip(state))]
pub async fn get_user(
    State(state): State<AppState>,
    Path(phone): Path<String>,
) -> Result<Json<User>, AppError> {
    let user = services::get(state.users.as_ref(), &phone).await?;
    Ok(Json(user))
}

#[instrument(skip(state, payload))]
pub async fn update_user(
    State(state): State<AppState>,
    payload: Result<Json<UpdateUserRequest>, JsonRejection>,
) -> Result<Json<UserResponse>, AppError> {
    let Json(payload) = payload?;
    let user =
        services::replace_profile(state.users.as_ref(), payload.phone.as_deref(), payload.profile)
            .await?;
    Ok(Json(UserResponse {
        message: "User updated successfully",
        user,
    }))
}

#[instrument(skip(state, payload))]
pub async fn update_profile(
    State(state): State<AppState>,
    payload: Result<Json<UpdateProfileRequest>, JsonRejection>,
) -> Result<Json<UserResponse>, AppError> {
    let Json(payload) = payload?;
    let user = services::update_profile(
        state.users.as_ref(),
        payload.phone.as_deref(),
        payload.changes,
        CredentialChange {
            current_password: payload.password.as_deref(),
            new_password: payload.new_password.as_deref(),
        },
    )
    .await?;
    Ok(Json(UserResponse {
        message: "Profile updated successfully",
        user,
    }))
}
