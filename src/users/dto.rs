use serde::{Deserialize, Serialize};

use crate::users::{cast::ProfileInput, patch::ProfileChanges, repo_types::User};

/// Request body for registration.
#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub phone: Option<String>,
    pub password: Option<String>,
    #[serde(flatten)]
    pub profile: ProfileInput,
}

/// Request body for login and account deletion.
#[derive(Debug, Deserialize)]
pub struct CredentialsRequest {
    pub phone: Option<String>,
    pub password: Option<String>,
}

/// Request body for the full-replace update.
#[derive(Debug, Deserialize)]
pub struct UpdateUserRequest {
    pub phone: Option<String>,
    #[serde(flatten)]
    pub profile: ProfileInput,
}

/// Request body for the merge update.
#[derive(Debug, Deserialize)]
pub struct UpdateProfileRequest {
    pub phone: Option<String>,
    #[serde(flatten)]
    pub changes: ProfileChanges,
    /// Current password; checked only when non-blank.
    pub password: Option<String>,
    #[serde(rename = "newPassword", alias = "new_password")]
    pub new_password: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: &'static str,
}

#[derive(Debug, Serialize)]
pub struct UserResponse {
    pub message: &'static str,
    pub user: User,
}
