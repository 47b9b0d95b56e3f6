use tracing::{debug, info, warn};

use crate::{
    errors::AppError,
    users::{
        cast::ProfileInput,
        password::Password,
        patch::ProfileChanges,
        repo_types::{NewUser, User, UserFields},
        store::UserStore,
    },
};

/// Optional re-authentication and rotation requested with a merge update.
#[derive(Debug, Default, Clone, Copy)]
pub struct CredentialChange<'a> {
    pub current_password: Option<&'a str>,
    pub new_password: Option<&'a str>,
}

fn required<'a>(value: Option<&'a str>, what: &str) -> Result<&'a str, AppError> {
    value
        .filter(|v| !v.trim().is_empty())
        .ok_or_else(|| AppError::BadRequest(format!("{what} required")))
}

fn require_credentials<'a>(
    phone: Option<&'a str>,
    password: Option<&'a str>,
) -> Result<(&'a str, Password<'a>), AppError> {
    match (required(phone, "Phone"), Password::parse(password)) {
        (Ok(phone), Some(password)) => Ok((phone, password)),
        _ => Err(AppError::BadRequest(
            "Phone and password are required".into(),
        )),
    }
}

fn check_password(password: Password<'_>, user: &User) -> Result<(), AppError> {
    if password.matches(&user.password_hash)? {
        Ok(())
    } else {
        warn!(user_id = %user.id, "password mismatch");
        Err(AppError::Unauthorized)
    }
}

pub async fn register(
    store: &dyn UserStore,
    phone: Option<&str>,
    password: Option<&str>,
    profile: ProfileInput,
) -> Result<User, AppError> {
    let (phone, password) = require_credentials(phone, password)?;
    let action = "Registration failed";

    if store
        .find_by_phone(phone)
        .await
        .map_err(AppError::store(action))?
        .is_some()
    {
        warn!(phone, "phone already registered");
        return Err(AppError::Conflict);
    }

    let profile = profile.cast().map_err(AppError::store(action))?;
    let user = store
        .insert(NewUser {
            phone: phone.to_string(),
            profile,
            password_hash: password.hash()?,
        })
        .await
        .map_err(AppError::store(action))?;

    info!(user_id = %user.id, "user registered");
    Ok(user)
}

pub async fn login(
    store: &dyn UserStore,
    phone: Option<&str>,
    password: Option<&str>,
) -> Result<User, AppError> {
    let (phone, password) = require_credentials(phone, password)?;
    let user = store
        .find_by_phone(phone)
        .await
        .map_err(AppError::store("Login failed"))?
        .ok_or(AppError::NotFound)?;

    check_password(password, &user)?;
    info!(user_id = %user.id, "user logged in");
    Ok(user)
}

pub async fn get(store: &dyn UserStore, phone: &str) -> Result<User, AppError> {
    store
        .find_by_phone(phone)
        .await
        .map_err(AppError::store("Failed to fetch user"))?
        .ok_or(AppError::NotFound)
}

/// Overwrites every profile attribute in one write; the password is never
/// read or written.
pub async fn replace_profile(
    store: &dyn UserStore,
    phone: Option<&str>,
    profile: ProfileInput,
) -> Result<User, AppError> {
    let phone = required(phone, "Phone")?;
    let action = "Update failed";

    let profile = profile.cast().map_err(AppError::store(action))?;
    let updated = store
        .replace_profile_by_phone(phone, &profile)
        .await
        .map_err(AppError::store(action))?
        .ok_or(AppError::NotFound)?;

    warn!(user_id = %updated.id, "profile replaced without credential check");
    Ok(updated)
}

/// Merge update with optional re-authentication and password rotation.
///
/// Nothing is written unless the record exists, a non-blank current password
/// (if given) verifies, and every supplied value casts. Only fields carrying a
/// value are merged; the merged document is persisted in one write.
pub async fn update_profile(
    store: &dyn UserStore,
    phone: Option<&str>,
    changes: ProfileChanges,
    credentials: CredentialChange<'_>,
) -> Result<User, AppError> {
    let phone = required(phone, "Phone")?;
    let action = "Update failed";

    let user = store
        .find_by_phone(phone)
        .await
        .map_err(AppError::store(action))?
        .ok_or(AppError::NotFound)?;

    match Password::parse(credentials.current_password) {
        Some(current) => check_password(current, &user)?,
        // Legacy behavior: no current password means no verification.
        None => warn!(user_id = %user.id, "profile update without current password"),
    }

    let fields_changed = !changes.is_empty();
    let profile = changes
        .apply(&user.profile)
        .map_err(AppError::store(action))?;

    let new_password = Password::parse(credentials.new_password);
    let password_hash = match new_password {
        Some(new_password) => new_password.hash()?,
        None => user.password_hash,
    };
    let password_changed = new_password.is_some();
    debug!(user_id = %user.id, fields_changed, password_changed, "merged profile update");

    let updated = store
        .update_by_phone(
            phone,
            &UserFields {
                profile,
                password_hash,
            },
        )
        .await
        .map_err(AppError::store(action))?
        .ok_or(AppError::NotFound)?;

    info!(user_id = %updated.id, password_changed, "profile updated");
    Ok(updated)
}

pub async fn delete_account(
    store: &dyn UserStore,
    phone: Option<&str>,
    password: Option<&str>,
) -> Result<(), AppError> {
    let (phone, password) = require_credentials(phone, password)?;
    let action = "Failed to delete account";

    let user = store
        .find_by_phone(phone)
        .await
        .map_err(AppError::store(action))?
        .ok_or(AppError::NotFound)?;
    check_password(password, &user)?;

    if !store
        .delete_by_phone(phone)
        .await
        .map_err(AppError::store(action))?
    {
        return Err(AppError::NotFound);
    }
    info!(user_id = %user.id, "account deleted");
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use async_trait::async_trait;

    use super::*;
    use crate::users::{
        cast::RawField,
        memory::InMemoryUserStore,
        patch::Patch,
        repo_types::Profile,
        store::StoreError,
    };

    async fn seeded() -> InMemoryUserStore {
        let store = InMemoryUserStore::new();
        register(
            &store,
            Some("555"),
            Some("x"),
            ProfileInput {
                name: Some(RawField::new("A")),
                district: Some(RawField::new("North")),
                age: Some(RawField::new(30)),
                ..ProfileInput::default()
            },
        )
        .await
        .expect("seed user");
        store
    }

    async fn stored(store: &dyn UserStore, phone: &str) -> User {
        store
            .find_by_phone(phone)
            .await
            .unwrap()
            .expect("record exists")
    }

    fn verifies(plain: &str, hash: &str) -> bool {
        Password::parse(Some(plain))
            .expect("non-blank password")
            .matches(hash)
            .unwrap()
    }

    fn rename(name: &str) -> ProfileChanges {
        ProfileChanges {
            name: Patch::Set(RawField::new(name)),
            ..ProfileChanges::default()
        }
    }

    /// Store that can change the password of "555" right before the next
    /// operation reaches the inner store, or refuse every merge write.
    struct Interfering {
        inner: InMemoryUserStore,
        rotate_to: Mutex<Option<&'static str>>,
        fail_updates: bool,
    }

    impl Interfering {
        fn new(inner: InMemoryUserStore) -> Self {
            Self {
                inner,
                rotate_to: Mutex::new(None),
                fail_updates: false,
            }
        }

        async fn interfere(&self) -> Result<(), StoreError> {
            let pending = { self.rotate_to.lock().unwrap().take() };
            let Some(new_password) = pending else {
                return Ok(());
            };
            let user = stored(&self.inner, "555").await;
            let fields = UserFields {
                profile: user.profile,
                password_hash: Password::parse(Some(new_password))
                    .expect("non-blank password")
                    .hash()?,
            };
            self.inner.update_by_phone("555", &fields).await?;
            Ok(())
        }
    }

    #[async_trait]
    impl UserStore for Interfering {
        async fn find_by_phone(&self, phone: &str) -> Result<Option<User>, StoreError> {
            self.interfere().await?;
            self.inner.find_by_phone(phone).await
        }

        async fn insert(&self, user: NewUser) -> Result<User, StoreError> {
            self.interfere().await?;
            self.inner.insert(user).await
        }

        async fn update_by_phone(
            &self,
            phone: &str,
            fields: &UserFields,
        ) -> Result<Option<User>, StoreError> {
            self.interfere().await?;
            if self.fail_updates {
                return Err(StoreError::Backend(anyhow::anyhow!(
                    "connection reset by peer"
                )));
            }
            self.inner.update_by_phone(phone, fields).await
        }

        async fn replace_profile_by_phone(
            &self,
            phone: &str,
            profile: &Profile,
        ) -> Result<Option<User>, StoreError> {
            self.interfere().await?;
            self.inner.replace_profile_by_phone(phone, profile).await
        }

        async fn delete_by_phone(&self, phone: &str) -> Result<bool, StoreError> {
            self.interfere().await?;
            self.inner.delete_by_phone(phone).await
        }
    }

    #[tokio::test]
    async fn update_sets_supplied_field_and_keeps_the_rest() {
        let store = seeded().await;
        let user = update_profile(&store, Some("555"), rename("B"), CredentialChange::default())
            .await
            .unwrap();

        assert_eq!(user.phone, "555");
        assert_eq!(user.profile.name.as_deref(), Some("B"));
        assert_eq!(user.profile.district.as_deref(), Some("North"));
        assert_eq!(user.profile.age, Some(30));
        assert!(verifies("x", &user.password_hash));
    }

    #[tokio::test]
    async fn wrong_current_password_is_unauthorized_and_changes_nothing() {
        let store = seeded().await;
        let before = stored(&store, "555").await;

        let err = update_profile(
            &store,
            Some("555"),
            rename("B"),
            CredentialChange {
                current_password: Some("wrong"),
                new_password: Some("y"),
            },
        )
        .await
        .unwrap_err();
        assert!(matches!(err, AppError::Unauthorized));

        let after = stored(&store, "555").await;
        assert_eq!(after.profile, before.profile);
        assert_eq!(after.password_hash, before.password_hash);
        assert_eq!(after.updated_at, before.updated_at);
    }

    #[tokio::test]
    async fn missing_or_blank_current_password_does_not_block() {
        let store = seeded().await;
        for current in [None, Some(""), Some("   ")] {
            let user = update_profile(
                &store,
                Some("555"),
                rename("B"),
                CredentialChange {
                    current_password: current,
                    new_password: None,
                },
            )
            .await
            .expect("update proceeds");
            assert_eq!(user.profile.name.as_deref(), Some("B"));
        }
    }

    #[tokio::test]
    async fn matching_current_password_allows_update() {
        let store = seeded().await;
        let user = update_profile(
            &store,
            Some("555"),
            rename("B"),
            CredentialChange {
                current_password: Some("x"),
                new_password: None,
            },
        )
        .await
        .unwrap();
        assert_eq!(user.profile.name.as_deref(), Some("B"));
    }

    #[tokio::test]
    async fn new_password_replaces_stored_password_only() {
        let store = seeded().await;
        let user = update_profile(
            &store,
            Some("555"),
            ProfileChanges::default(),
            CredentialChange {
                current_password: None,
                new_password: Some("y"),
            },
        )
        .await
        .unwrap();

        assert_eq!(user.profile.name.as_deref(), Some("A"));
        assert!(verifies("y", &user.password_hash));
        assert!(!verifies("x", &user.password_hash));
    }

    #[tokio::test]
    async fn blank_new_password_keeps_old_one() {
        let store = seeded().await;
        let before = stored(&store, "555").await;
        let user = update_profile(
            &store,
            Some("555"),
            ProfileChanges::default(),
            CredentialChange {
                current_password: Some("x"),
                new_password: Some(" "),
            },
        )
        .await
        .unwrap();
        assert_eq!(user.password_hash, before.password_hash);
    }

    #[tokio::test]
    async fn falsy_fields_never_clear_stored_values() {
        let store = seeded().await;
        let changes = ProfileChanges {
            name: Patch::from(Some(RawField::new(""))),
            age: Patch::from(Some(RawField::new(0))),
            district: Patch::from(None),
            ..ProfileChanges::default()
        };
        let user = update_profile(&store, Some("555"), changes, CredentialChange::default())
            .await
            .unwrap();

        assert_eq!(user.profile.name.as_deref(), Some("A"));
        assert_eq!(user.profile.age, Some(30));
        assert_eq!(user.profile.district.as_deref(), Some("North"));
    }

    #[tokio::test]
    async fn unknown_phone_is_not_found_and_store_unchanged() {
        let store = seeded().await;
        let err = update_profile(&store, Some("999"), rename("Z"), CredentialChange::default())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound));
        assert_eq!(store.count().await, 1);
        assert!(store.find_by_phone("999").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn blank_phone_is_a_bad_request() {
        let store = seeded().await;
        for phone in [None, Some(""), Some("  ")] {
            let err = update_profile(&store, phone, rename("Z"), CredentialChange::default())
                .await
                .unwrap_err();
            assert!(matches!(err, AppError::BadRequest(ref m) if m == "Phone required"));
        }
    }

    #[tokio::test]
    async fn repeating_an_update_is_idempotent() {
        let store = seeded().await;
        let credentials = CredentialChange {
            current_password: Some("x"),
            new_password: None,
        };
        let changes = ProfileChanges {
            email: Patch::Set(RawField::new("a@example.com")),
            age: Patch::Set(RawField::new(31)),
            ..ProfileChanges::default()
        };

        let once = update_profile(&store, Some("555"), changes.clone(), credentials)
            .await
            .unwrap();
        let twice = update_profile(&store, Some("555"), changes, credentials)
            .await
            .unwrap();

        assert_eq!(once.id, twice.id);
        assert_eq!(once.profile, twice.profile);
        assert_eq!(once.password_hash, twice.password_hash);
    }

    #[tokio::test]
    async fn uncastable_value_fails_the_update_without_writing() {
        let store = seeded().await;
        let before = stored(&store, "555").await;
        let changes = ProfileChanges {
            name: Patch::Set(RawField::new("B")),
            age: Patch::Set(RawField::new("thirty")),
            ..ProfileChanges::default()
        };
        let err = update_profile(&store, Some("555"), changes, CredentialChange::default())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Store { action: "Update failed", .. }));

        let after = stored(&store, "555").await;
        assert_eq!(after.profile, before.profile);
        assert_eq!(after.updated_at, before.updated_at);
    }

    #[tokio::test]
    async fn castable_strings_are_stored_as_numbers() {
        let store = seeded().await;
        let changes = ProfileChanges {
            age: Patch::Set(RawField::new("31")),
            ..ProfileChanges::default()
        };
        let user = update_profile(&store, Some("555"), changes, CredentialChange::default())
            .await
            .unwrap();
        assert_eq!(user.profile.age, Some(31));
    }

    #[tokio::test]
    async fn failing_store_write_is_a_store_failure_and_changes_nothing() {
        let mut store = Interfering::new(seeded().await);
        store.fail_updates = true;
        let before = stored(&store.inner, "555").await;

        let err = update_profile(
            &store,
            Some("555"),
            rename("B"),
            CredentialChange {
                current_password: Some("x"),
                new_password: Some("y"),
            },
        )
        .await
        .unwrap_err();
        match err {
            AppError::Store { action, source } => {
                assert_eq!(action, "Update failed");
                assert!(source.to_string().contains("connection reset"));
            }
            other => panic!("expected store failure, got {other:?}"),
        }

        let after = stored(&store.inner, "555").await;
        assert_eq!(after.profile, before.profile);
        assert_eq!(after.password_hash, before.password_hash);
    }

    #[tokio::test]
    async fn replace_profile_does_not_undo_a_concurrent_password_change() {
        let store = Interfering::new(seeded().await);
        *store.rotate_to.lock().unwrap() = Some("rotated");

        let user = replace_profile(
            &store,
            Some("555"),
            ProfileInput {
                name: Some(RawField::new("N")),
                ..ProfileInput::default()
            },
        )
        .await
        .unwrap();

        assert_eq!(user.profile.name.as_deref(), Some("N"));
        assert!(verifies("rotated", &user.password_hash));
        assert!(!verifies("x", &user.password_hash));
        let stored_hash = stored(&store.inner, "555").await.password_hash;
        assert!(verifies("rotated", &stored_hash));
    }

    #[tokio::test]
    async fn register_rejects_duplicate_and_missing_credentials() {
        let store = seeded().await;
        let err = register(&store, Some("555"), Some("z"), ProfileInput::default())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Conflict));

        let err = register(&store, Some("777"), Some(""), ProfileInput::default())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::BadRequest(_)));
        assert_eq!(store.count().await, 1);
    }

    #[tokio::test]
    async fn register_with_uncastable_age_stores_nothing() {
        let store = seeded().await;
        let err = register(
            &store,
            Some("777"),
            Some("z"),
            ProfileInput {
                age: Some(RawField::new(30.5)),
                ..ProfileInput::default()
            },
        )
        .await
        .unwrap_err();
        assert!(matches!(err, AppError::Store { action: "Registration failed", .. }));
        assert_eq!(store.count().await, 1);
    }

    #[tokio::test]
    async fn login_checks_phone_and_password() {
        let store = seeded().await;
        assert!(login(&store, Some("555"), Some("x")).await.is_ok());
        assert!(matches!(
            login(&store, Some("555"), Some("nope")).await.unwrap_err(),
            AppError::Unauthorized
        ));
        assert!(matches!(
            login(&store, Some("999"), Some("x")).await.unwrap_err(),
            AppError::NotFound
        ));
        assert!(matches!(
            login(&store, None, Some("x")).await.unwrap_err(),
            AppError::BadRequest(_)
        ));
    }

    #[tokio::test]
    async fn replace_profile_nulls_absent_fields_and_keeps_password() {
        let store = seeded().await;
        let before = stored(&store, "555").await;
        let user = replace_profile(
            &store,
            Some("555"),
            ProfileInput {
                email: Some(RawField::new("b@example.com")),
                ..ProfileInput::default()
            },
        )
        .await
        .unwrap();

        assert_eq!(user.profile.name, None);
        assert_eq!(user.profile.age, None);
        assert_eq!(user.profile.email.as_deref(), Some("b@example.com"));
        assert_eq!(user.password_hash, before.password_hash);

        let err = replace_profile(&store, Some("999"), ProfileInput::default())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound));
    }

    #[tokio::test]
    async fn delete_requires_matching_password() {
        let store = seeded().await;
        let err = delete_account(&store, Some("555"), Some("wrong"))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Unauthorized));
        assert_eq!(store.count().await, 1);

        delete_account(&store, Some("555"), Some("x")).await.unwrap();
        assert_eq!(store.count().await, 0);
        assert!(matches!(get(&store, "555").await.unwrap_err(), AppError::NotFound));
    }
}
