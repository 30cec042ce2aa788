use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

pub const MAX_USERNAME_CHARS: usize = 150;
pub const MIN_PASSWORD_CHARS: usize = 8;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub username: String,
    pub email: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl User {
    /// The address status-change notices go to, if any.
    pub fn contact_email(&self) -> Option<&str> {
        self.email.as_deref().map(str::trim).filter(|e| !e.is_empty())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateUserInput {
    pub username: String,
    #[serde(default)]
    pub email: Option<String>,
    pub password: String,
    pub password_confirm: String,
}

impl CreateUserInput {
    pub fn validate(&self) -> Result<(), ValidationError> {
        let mut errors = ValidationError::new();
        let username = self.username.trim();
        if username.is_empty() {
            errors.add("username", "must not be blank");
        } else if username.chars().count() > MAX_USERNAME_CHARS {
            errors.add(
                "username",
                format!("must be at most {} characters", MAX_USERNAME_CHARS),
            );
        }
        if let Some(email) = self.email.as_deref().filter(|e| !e.trim().is_empty()) {
            if !email.contains('@') {
                errors.add("email", "is not a valid address");
            }
        }
        if self.password.chars().count() < MIN_PASSWORD_CHARS {
            errors.add(
                "password",
                format!("must be at least {} characters", MIN_PASSWORD_CHARS),
            );
        }
        if self.password != self.password_confirm {
            errors.add("password_confirm", "passwords do not match");
        }
        errors.into_result()
    }
}

/// A signed-in browser or API client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthSession {
    pub token: String,
    pub user_id: i64,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl AuthSession {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn input(password: &str, confirm: &str) -> CreateUserInput {
        CreateUserInput {
            username: "alice".into(),
            email: Some("alice@example.com".into()),
            password: password.into(),
            password_confirm: confirm.into(),
        }
    }

    #[test]
    fn mismatched_passwords_are_rejected() {
        let err = input("secret-one", "secret-two").validate().unwrap_err();
        assert!(err.has_field("password_confirm"));
    }

    #[test]
    fn short_password_is_rejected() {
        let err = input("short", "short").validate().unwrap_err();
        assert!(err.has_field("password"));
    }

    #[test]
    fn blank_email_means_no_contact() {
        let user = User {
            id: 1,
            username: "alice".into(),
            email: Some("  ".into()),
            created_at: Utc::now(),
        };
        assert_eq!(user.contact_email(), None);
    }
}
