use std::collections::HashMap;

use async_trait::async_trait;
use time::OffsetDateTime;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::users::{
    repo_types::{NewUser, Profile, User, UserFields},
    store::{StoreError, UserStore},
};

/// Record store kept in process memory. Contents are lost on restart.
#[derive(Default)]
pub struct InMemoryUserStore {
    users: RwLock<HashMap<String, User>>,
}

impl InMemoryUserStore {
    pub fn new() -> Self {
        Self::default()
    }

    #[cfg(test)]
    pub async fn count(&self) -> usize {
        self.users.read().await.len()
    }
}

#[async_trait]
impl UserStore for InMemoryUserStore {
    async fn find_by_phone(&self, phone: &str) -> Result<Option<User>, StoreError> {
        Ok(self.users.read().await.get(phone).cloned())
    }

    async fn insert(&self, user: NewUser) -> Result<User, StoreError> {
        let mut users = self.users.write().await;
        if users.contains_key(&user.phone) {
            return Err(StoreError::DuplicatePhone);
        }
        let now = OffsetDateTime::now_utc();
        let record = User {
            id: Uuid::new_v4(),
            phone: user.phone,
            profile: user.profile,
            password_hash: user.password_hash,
            created_at: now,
            updated_at: now,
        };
        users.insert(record.phone.clone(), record.clone());
        Ok(record)
    }

    async fn update_by_phone(
        &self,
        phone: &str,
        fields: &UserFields,
    ) -> Result<Option<User>, StoreError> {
        let mut users = self.users.write().await;
        let Some(record) = users.get_mut(phone) else {
            return Ok(None);
        };
        record.profile = fields.profile.clone();
        record.password_hash = fields.password_hash.clone();
        record.updated_at = OffsetDateTime::now_utc();
        Ok(Some(record.clone()))
    }

    async fn replace_profile_by_phone(
        &self,
        phone: &str,
        profile: &Profile,
    ) -> Result<Option<User>, StoreError> {
        let mut users = self.users.write().await;
        let Some(record) = users.get_mut(phone) else {
            return Ok(None);
        };
        record.profile = profile.clone();
        record.updated_at = OffsetDateTime::now_utc();
        Ok(Some(record.clone()))
    }

    async fn delete_by_phone(&self, phone: &str) -> Result<bool, StoreError> {
        Ok(self.users.write().await.remove(phone).is_some())
    }
}
