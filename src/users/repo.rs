use anyhow::Context;
use async_trait::async_trait;
use sqlx::{postgres::PgPoolOptions, PgPool};
use tracing::{info, warn};
use uuid::Uuid;

use crate::{
    config::DatabaseConfig,
    users::{
        repo_types::{NewUser, Profile, User, UserFields},
        store::{StoreError, UserStore},
    },
};

const USER_COLUMNS: &str = "id, phone, name, dob, age, gender, district, email, address, \
                            pincode, password_hash, created_at, updated_at";

/// PostgreSQL-backed record store.
#[derive(Clone)]
pub struct PgUserStore {
    db: PgPool,
}

impl PgUserStore {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    pub async fn connect(config: &DatabaseConfig) -> anyhow::Result<Self> {
        let db = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .connect(&config.url)
            .await
            .context("connect to database")?;
        Ok(Self::new(db))
    }

    /// Applies pending migrations; failures are logged and tolerated.
    pub async fn migrate(&self) {
        match sqlx::migrate!("./migrations").run(&self.db).await {
            Ok(()) => info!("database migrations applied"),
            Err(e) => {
                warn!(error = %e, "migrations folder not found or migration failed; continuing")
            }
        }
    }
}

fn backend(e: sqlx::Error, what: &'static str) -> StoreError {
    StoreError::Backend(anyhow::Error::new(e).context(what))
}

#[async_trait]
impl UserStore for PgUserStore {
    async fn find_by_phone(&self, phone: &str) -> Result<Option<User>, StoreError> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE phone = $1"
        ))
        .bind(phone)
        .fetch_optional(&self.db)
        .await
        .map_err(|e| backend(e, "select user by phone"))?;
        Ok(user)
    }

    async fn insert(&self, user: NewUser) -> Result<User, StoreError> {
        let NewUser {
            phone,
            profile,
            password_hash,
        } = user;
        let created = sqlx::query_as::<_, User>(&format!(
            r#"
            INSERT INTO users (id, phone, name, dob, age, gender, district, email, address,
                               pincode, password_hash)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(Uuid::new_v4())
        .bind(phone)
        .bind(profile.name)
        .bind(profile.dob)
        .bind(profile.age)
        .bind(profile.gender)
        .bind(profile.district)
        .bind(profile.email)
        .bind(profile.address)
        .bind(profile.pincode)
        .bind(password_hash)
        .fetch_one(&self.db)
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(ref db) if db.is_unique_violation() => StoreError::DuplicatePhone,
            e => backend(e, "insert user"),
        })?;
        Ok(created)
    }

    async fn update_by_phone(
        &self,
        phone: &str,
        fields: &UserFields,
    ) -> Result<Option<User>, StoreError> {
        let p = &fields.profile;
        let updated = sqlx::query_as::<_, User>(&format!(
            r#"
            UPDATE users
            SET name = $2, dob = $3, age = $4, gender = $5, district = $6, email = $7,
                address = $8, pincode = $9, password_hash = $10, updated_at = now()
            WHERE phone = $1
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(phone)
        .bind(&p.name)
        .bind(&p.dob)
        .bind(p.age)
        .bind(&p.gender)
        .bind(&p.district)
        .bind(&p.email)
        .bind(&p.address)
        .bind(&p.pincode)
        .bind(&fields.password_hash)
        .fetch_optional(&self.db)
        .await
        .map_err(|e| backend(e, "update user"))?;
        Ok(updated)
    }

    async fn replace_profile_by_phone(
        &self,
        phone: &str,
        profile: &Profile,
    ) -> Result<Option<User>, StoreError> {
        let updated = sqlx::query_as::<_, User>(&format!(
            r#"
            UPDATE users
            SET name = $2, dob = $3, age = $4, gender = $5, district = $6, email = $7,
                address = $8, pincode = $9, updated_at = now()
            WHERE phone = $1
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(phone)
        .bind(&profile.name)
        .bind(&profile.dob)
        .bind(profile.age)
        .bind(&profile.gender)
        .bind(&profile.district)
        .bind(&profile.email)
        .bind(&profile.address)
        .bind(&profile.pincode)
        .fetch_optional(&self.db)
        .await
        .map_err(|e| backend(e, "replace user profile"))?;
        Ok(updated)
    }

    async fn delete_by_phone(&self, phone: &str) -> Result<bool, StoreError> {
        let result = sqlx::query("DELETE FROM users WHERE phone = $1")
            .bind(phone)
            .execute(&self.db)
            .await
            .map_err(|e| backend(e, "delete user"))?;
        Ok(result.rows_affected() > 0)
    }
}
