use argon2::{
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use rand::rngs::OsRng;
use tracing::error;

/// A client-supplied password that has at least one visible character.
///
/// Blank input never becomes a `Password`, so a stored hash can only ever be
/// derived from, or checked against, a non-empty secret.
#[derive(Clone, Copy)]
pub struct Password<'a>(&'a str);

impl<'a> Password<'a> {
    /// `None` for absent, empty or whitespace-only input.
    pub fn parse(raw: Option<&'a str>) -> Option<Self> {
        raw.filter(|p| !p.trim().is_empty()).map(Password)
    }

    /// Salted Argon2 hash in PHC string form, as kept in the store.
    pub fn hash(&self) -> anyhow::Result<String> {
        let salt = SaltString::generate(&mut OsRng);
        Argon2::default()
            .hash_password(self.0.as_bytes(), &salt)
            .map(|hash| hash.to_string())
            .map_err(|e| {
                error!(error = %e, "password hashing failed");
                anyhow::anyhow!("hash password: {e}")
            })
    }

    /// Whether this password produced `stored_hash`. A hash that does not
    /// parse is an error rather than a mismatch.
    pub fn matches(&self, stored_hash: &str) -> anyhow::Result<bool> {
        let parsed = PasswordHash::new(stored_hash).map_err(|e| {
            error!(error = %e, "stored password hash is malformed");
            anyhow::anyhow!("parse stored password hash: {e}")
        })?;
        Ok(Argon2::default()
            .verify_password(self.0.as_bytes(), &parsed)
            .is_ok())
    }
}

impl std::fmt::Debug for Password<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("Password(***)")
    }
}
