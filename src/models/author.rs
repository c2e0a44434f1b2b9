//! Author model
//!
//! An `Author` is a registered user who may own posts. `Identity` is the
//! slimmed-down view of the logged-in author that request handlers pass into
//! the core.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Registered author account with profile fields.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Author {
    /// Unique identifier
    pub id: i64,
    /// Username (unique)
    pub username: String,
    /// Email address (unique)
    pub email: String,
    /// Password hash (argon2)
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub first_name: String,
    pub last_name: String,
    pub bio: String,
    pub birth_date: Option<NaiveDate>,
    pub location: String,
    /// Reference to an uploaded profile photo
    pub profile_photo: Option<String>,
    /// Staff members may moderate comments and posts
    pub is_staff: bool,
    /// Creation timestamp
    pub created_at: DateTime<Utc>,
}

impl Author {
    /// Identity view used by the moderation core
    pub fn identity(&self) -> Identity {
        Identity {
            author_id: self.id,
            username: self.username.clone(),
            email: self.email.clone(),
            display_name: self.username.clone(),
            is_staff: self.is_staff,
        }
    }
}

/// The authenticated caller of a request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub author_id: i64,
    pub username: String,
    pub email: String,
    /// Label stored on comments written by this identity
    pub display_name: String,
    pub is_staff: bool,
}

/// Input for creating an author account
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CreateAuthorInput {
    pub username: String,
    pub email: String,
    /// Plain-text password, hashed by `AuthorService`
    pub password: String,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    #[serde(default)]
    pub bio: String,
    #[serde(default)]
    pub birth_date: Option<NaiveDate>,
    #[serde(default)]
    pub location: String,
    #[serde(default)]
    pub is_staff: bool,
}

impl CreateAuthorInput {
    pub fn new(username: impl Into<String>, email: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            email: email.into(),
            password: password.into(),
            ..Default::default()
        }
    }

    /// Mark the account as staff
    pub fn staff(mut self) -> Self {
        self.is_staff = true;
        self
    }
}

/// Row to insert, with the password already hashed
#[derive(Debug, Clone)]
pub struct NewAuthor {
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub first_name: String,
    pub last_name: String,
    pub bio: String,
    pub birth_date: Option<NaiveDate>,
    pub location: String,
    pub profile_photo: Option<String>,
    pub is_staff: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identity_uses_username_as_display_name() {
        let author = Author {
            id: 7,
            username: "alice".to_string(),
            email: "alice@example.com".to_string(),
            password_hash: "hash".to_string(),
            first_name: "Alice".to_string(),
            last_name: "Liddell".to_string(),
            bio: String::new(),
            birth_date: None,
            location: String::new(),
            profile_photo: None,
            is_staff: true,
            created_at: Utc::now(),
        };

        let identity = author.identity();
        assert_eq!(identity.author_id, 7);
        assert_eq!(identity.display_name, "alice");
        assert!(identity.is_staff);
    }

    #[test]
    fn test_password_hash_not_serialized() {
        let author = Author {
            id: 1,
            username: "bob".to_string(),
            email: "bob@example.com".to_string(),
            password_hash: "secret-hash".to_string(),
            first_name: String::new(),
            last_name: String::new(),
            bio: String::new(),
            birth_date: None,
            location: String::new(),
            profile_photo: None,
            is_staff: false,
            created_at: Utc::now(),
        };

        let json = serde_json::to_string(&author).unwrap();
        assert!(!json.contains("secret-hash"));
    }
}
