//! Schema casting of client-supplied profile attributes.
//!
//! Attribute values reach the store exactly as the client sent them. The store
//! casts them to the column type before writing, the way a document schema
//! would: numbers and booleans become text, numeric strings become integers.
//! A value that cannot be cast fails the write with [`StoreError::Cast`].

use serde::{Deserialize, Deserializer};
use serde_json::Value;

use crate::users::{repo_types::Profile, store::StoreError};

/// A profile attribute as received, before casting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawField(Value);

impl RawField {
    pub fn new(value: impl Into<Value>) -> Self {
        Self(value.into())
    }

    pub fn as_value(&self) -> &Value {
        &self.0
    }

    fn cast_error(&self, path: &'static str, kind: &'static str) -> StoreError {
        StoreError::Cast {
            kind,
            value: self.0.to_string(),
            path,
        }
    }

    /// Casts to text. `null` means no value.
    pub fn cast_text(&self, path: &'static str) -> Result<Option<String>, StoreError> {
        match &self.0 {
            Value::Null => Ok(None),
            Value::String(s) => Ok(Some(s.clone())),
            Value::Number(n) => Ok(Some(n.to_string())),
            Value::Bool(b) => Ok(Some(b.to_string())),
            Value::Array(_) | Value::Object(_) => Err(self.cast_error(path, "string")),
        }
    }

    /// Casts to a 32-bit integer. `null` and blank strings mean no value;
    /// fractional or out-of-range numbers are rejected.
    pub fn cast_int(&self, path: &'static str) -> Result<Option<i32>, StoreError> {
        let number = match &self.0 {
            Value::Null => return Ok(None),
            Value::Bool(b) => return Ok(Some(i32::from(*b))),
            Value::Number(n) => n.as_f64(),
            Value::String(s) if s.trim().is_empty() => return Ok(None),
            Value::String(s) => s.trim().parse::<f64>().ok(),
            Value::Array(_) | Value::Object(_) => None,
        };
        match number {
            Some(n)
                if n.is_finite()
                    && n.fract() == 0.0
                    && n >= f64::from(i32::MIN)
                    && n <= f64::from(i32::MAX) =>
            {
                Ok(Some(n as i32))
            }
            _ => Err(self.cast_error(path, "integer")),
        }
    }
}

impl<'de> Deserialize<'de> for RawField {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Value::deserialize(deserializer).map(RawField)
    }
}

/// Profile attributes of a register or full-replace request.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ProfileInput {
    pub name: Option<RawField>,
    pub dob: Option<RawField>,
    pub age: Option<RawField>,
    pub gender: Option<RawField>,
    pub district: Option<RawField>,
    pub email: Option<RawField>,
    pub address: Option<RawField>,
    pub pincode: Option<RawField>,
}

fn text(raw: Option<RawField>, path: &'static str) -> Result<Option<String>, StoreError> {
    raw.map_or(Ok(None), |r| r.cast_text(path))
}

impl ProfileInput {
    pub fn cast(self) -> Result<Profile, StoreError> {
        Ok(Profile {
            name: text(self.name, "name")?,
            dob: text(self.dob, "dob")?,
            age: self.age.map_or(Ok(None), |r| r.cast_int("age"))?,
            gender: text(self.gender, "gender")?,
            district: text(self.district, "district")?,
            email: text(self.email, "email")?,
            address: text(self.address, "address")?,
            pincode: text(self.pincode, "pincode")?,
        })
    }
}
