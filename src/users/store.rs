use async_trait::async_trait;
use thiserror::Error;

use crate::users::repo_types::{NewUser, Profile, User, UserFields};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("phone number already registered")]
    DuplicatePhone,

    #[error("Cast to {kind} failed for value {value} at path \"{path}\"")]
    Cast {
        kind: &'static str,
        value: String,
        path: &'static str,
    },

    #[error(transparent)]
    Backend(#[from] anyhow::Error),
}

/// Record store keyed by phone number.
///
/// Every operation is a single point read or write; an update replaces the
/// written part of one record atomically.
#[async_trait]
pub trait UserStore: Send + Sync {
    async fn find_by_phone(&self, phone: &str) -> Result<Option<User>, StoreError>;

    /// Fails with [`StoreError::DuplicatePhone`] if the phone is taken.
    async fn insert(&self, user: NewUser) -> Result<User, StoreError>;

    /// Writes profile and password hash. `None` when no record has this phone.
    async fn update_by_phone(
        &self,
        phone: &str,
        fields: &UserFields,
    ) -> Result<Option<User>, StoreError>;

    /// Writes the profile only; the stored password hash is never read or
    /// written. `None` when no record has this phone.
    async fn replace_profile_by_phone(
        &self,
        phone: &str,
        profile: &Profile,
    ) -> Result<Option<User>, StoreError>;

    /// Returns whether a record was removed.
    async fn delete_by_phone(&self, phone: &str) -> Result<bool, StoreError>;
}
