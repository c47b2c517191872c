//! User identity and the input payloads for the auth endpoints.
//!
//! The service owns the shape of a user record; this client treats it as an
//! opaque JSON object and only reads the handful of fields it displays.
//! Everything else passes through untouched so stored identities round-trip
//! exactly.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// An authenticated user record, exactly as the service returned it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Identity(Value);

impl Identity {
    /// Wraps a JSON value as an identity.
    ///
    /// Returns `None` unless the value is a JSON object; a bare string or
    /// number is not a usable user record.
    pub fn from_value(value: Value) -> Option<Self> {
        if value.is_object() { Some(Self(value)) } else { None }
    }

    /// Parses a serialized identity, as stored in the credentials file.
    pub fn from_json(raw: &str) -> Option<Self> {
        serde_json::from_str::<Value>(raw).ok().and_then(Self::from_value)
    }

    fn field(&self, key: &str) -> Option<&str> {
        self.0.get(key).and_then(Value::as_str)
    }

    /// Service-assigned identifier, if present. Numeric ids are rendered
    /// as their decimal form.
    pub fn id(&self) -> Option<String> {
        match self.0.get("id") {
            Some(Value::String(s)) => Some(s.clone()),
            Some(Value::Number(n)) => Some(n.to_string()),
            _ => None,
        }
    }

    pub fn name(&self) -> Option<&str> {
        self.field("name")
    }

    pub fn email(&self) -> Option<&str> {
        self.field("email")
    }

    /// Account role: "donor", "receiver" or "both".
    pub fn role(&self) -> Option<&str> {
        self.field("role")
    }

    /// The underlying record.
    pub fn as_value(&self) -> &Value {
        &self.0
    }
}

/// Login input for `POST /auth/login`.
#[derive(Debug, Clone, Serialize)]
pub struct LoginCredentials {
    pub email: String,
    pub password: String,
}

impl LoginCredentials {
    pub fn new(email: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            password: password.into(),
        }
    }

    /// Checks the credentials before any network dispatch.
    pub fn validate(&self) -> Result<(), String> {
        if !is_plausible_email(&self.email) {
            return Err("A valid email address is required".to_string());
        }
        if self.password.is_empty() {
            return Err("A password is required".to_string());
        }
        Ok(())
    }
}

/// Pickup location attached to a registration.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Location {
    pub address: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pincode: Option<String>,
}

/// Registration input for `POST /auth/register`.
#[derive(Debug, Clone, Serialize)]
pub struct RegisterProfile {
    pub name: String,
    pub email: String,
    pub phone: String,
    pub password: String,
    /// "donor", "receiver" or "both".
    pub role: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<Location>,
}

impl RegisterProfile {
    /// Minimum accepted password length, matching the registration form.
    pub const MIN_PASSWORD_LEN: usize = 6;

    /// Checks the profile before any network dispatch.
    pub fn validate(&self) -> Result<(), String> {
        if self.name.trim().is_empty() {
            return Err("A name is required".to_string());
        }
        if !is_plausible_email(&self.email) {
            return Err("A valid email address is required".to_string());
        }
        if self.phone.trim().is_empty() {
            return Err("A phone number is required".to_string());
        }
        if self.password.len() < Self::MIN_PASSWORD_LEN {
            return Err(format!(
                "Password must be at least {} characters",
                Self::MIN_PASSWORD_LEN
            ));
        }
        if self.role.trim().is_empty() {
            return Err("A role is required".to_string());
        }
        Ok(())
    }
}

/// Cheap structural check; real address validation is the service's job.
fn is_plausible_email(email: &str) -> bool {
    let trimmed = email.trim();
    match trimmed.split_once('@') {
        Some((local, domain)) => !local.is_empty() && domain.contains('.'),
        None => false,
    }
}
