use serde::Serialize;
use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;

/// Optional profile attributes of a user.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, FromRow)]
pub struct Profile {
    pub name: Option<String>,
    pub dob: Option<String>, // stored verbatim, no format enforced
    pub age: Option<i32>,
    pub gender: Option<String>,
    pub district: Option<String>,
    pub email: Option<String>,
    pub address: Option<String>,
    pub pincode: Option<String>,
}

/// User record in the store.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct User {
    pub id: Uuid,
    pub phone: String, // unique key, never changes
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub profile: Profile,
    #[serde(skip_serializing)]
    pub password_hash: String, // Argon2 PHC string, not exposed in JSON
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

/// Everything needed to insert a record.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub phone: String,
    pub profile: Profile,
    pub password_hash: String,
}

/// Whole mutable document written by a point update.
#[derive(Debug, Clone)]
pub struct UserFields {
    pub profile: Profile,
    pub password_hash: String,
}
