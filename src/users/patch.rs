use serde::{Deserialize, Deserializer};
use serde_json::Value;

use crate::users::{cast::RawField, repo_types::Profile, store::StoreError};

/// Values that count as "no value supplied" when empty or zero.
pub trait Truthy {
    fn is_truthy(&self) -> bool;
}

impl Truthy for RawField {
    fn is_truthy(&self) -> bool {
        match self.as_value() {
            Value::Null => false,
            Value::Bool(b) => *b,
            Value::Number(n) => n.as_f64().map_or(true, |f| f != 0.0),
            Value::String(s) => !s.is_empty(),
            Value::Array(_) | Value::Object(_) => true,
        }
    }
}

/// Per-field instruction of a merge update.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Patch<T> {
    #[default]
    Keep,
    Set(T),
}

impl<T> Patch<T> {
    pub fn is_set(&self) -> bool {
        matches!(self, Patch::Set(_))
    }
}

/// Absent, `None`, empty or zero input means "keep the stored value".
impl<T: Truthy> From<Option<T>> for Patch<T> {
    fn from(value: Option<T>) -> Self {
        match value {
            Some(v) if v.is_truthy() => Patch::Set(v),
            _ => Patch::Keep,
        }
    }
}

impl<'de, T> Deserialize<'de> for Patch<T>
where
    T: Deserialize<'de> + Truthy,
{
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Option::<T>::deserialize(deserializer).map(Patch::from)
    }
}

/// Merge instructions for every profile attribute.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ProfileChanges {
    pub name: Patch<RawField>,
    pub dob: Patch<RawField>,
    pub age: Patch<RawField>,
    pub gender: Patch<RawField>,
    pub district: Patch<RawField>,
    pub email: Patch<RawField>,
    pub address: Patch<RawField>,
    pub pincode: Patch<RawField>,
}

fn merge<T>(
    patch: Patch<RawField>,
    slot: &mut Option<T>,
    cast: impl FnOnce(&RawField) -> Result<Option<T>, StoreError>,
) -> Result<(), StoreError> {
    if let Patch::Set(raw) = patch {
        *slot = cast(&raw)?;
    }
    Ok(())
}

impl ProfileChanges {
    pub fn is_empty(&self) -> bool {
        !(self.name.is_set()
            || self.dob.is_set()
            || self.age.is_set()
            || self.gender.is_set()
            || self.district.is_set()
            || self.email.is_set()
            || self.address.is_set()
            || self.pincode.is_set())
    }

    /// Casts and merges the set fields into a copy of `profile`.
    ///
    /// `profile` is left untouched when any value fails to cast.
    pub fn apply(self, profile: &Profile) -> Result<Profile, StoreError> {
        let mut merged = profile.clone();
        merge(self.name, &mut merged.name, |r| r.cast_text("name"))?;
        merge(self.dob, &mut merged.dob, |r| r.cast_text("dob"))?;
        merge(self.age, &mut merged.age, |r| r.cast_int("age"))?;
        merge(self.gender, &mut merged.gender, |r| r.cast_text("gender"))?;
        merge(self.district, &mut merged.district, |r| r.cast_text("district"))?;
        merge(self.email, &mut merged.email, |r| r.cast_text("email"))?;
        merge(self.address, &mut merged.address, |r| r.cast_text("address"))?;
        merge(self.pincode, &mut merged.pincode, |r| r.cast_text("pincode"))?;
        Ok(merged)
    }
}
