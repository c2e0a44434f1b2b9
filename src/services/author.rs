//! Author accounts and login sessions
//!
//! Authors are created by the admin CLI. Readers of the HTTP API identify
//! themselves with the session token returned by [`AuthorService::login`].

use std::sync::Arc;

use anyhow::Context;
use chrono::{Duration, Utc};
use uuid::Uuid;

use super::error::{CoreError, CoreResult};
use super::password::{hash_password, verify_password};
use super::validation::{is_valid_email, required};
use crate::db::repositories::{
    AuthorRepository, SessionRepository, SqlxAuthorRepository, SqlxSessionRepository,
};
use crate::db::{is_unique_violation, DynDatabasePool};
use crate::models::{Author, CreateAuthorInput, Identity, NewAuthor, Session};

const USERNAME_MAX_LEN: usize = 150;
const EMAIL_MAX_LEN: usize = 254;
const PASSWORD_MIN_LEN: usize = 8;

/// Author and session management
pub struct AuthorService {
    authors: Arc<dyn AuthorRepository>,
    sessions: Arc<dyn SessionRepository>,
    session_expiration_days: i64,
}

impl AuthorService {
    pub fn new(
        authors: Arc<dyn AuthorRepository>,
        sessions: Arc<dyn SessionRepository>,
        session_expiration_days: i64,
    ) -> Self {
        Self {
            authors,
            sessions,
            session_expiration_days,
        }
    }

    pub fn from_pool(pool: DynDatabasePool, session_expiration_days: i64) -> Self {
        Self::new(
            SqlxAuthorRepository::boxed(pool.clone()),
            SqlxSessionRepository::boxed(pool),
            session_expiration_days,
        )
    }

    /// Create an author account with a hashed password.
    ///
    /// # Errors
    ///
    /// - `Validation` for malformed input or a taken username/email
    /// - `Internal` for database errors
    pub async fn create_author(&self, input: CreateAuthorInput) -> CoreResult<Author> {
        let username = required("Username", &input.username, USERNAME_MAX_LEN)?;
        if username.chars().any(char::is_whitespace) {
            return Err(CoreError::validation("Username must not contain spaces"));
        }
        let email = required("Email", &input.email, EMAIL_MAX_LEN)?;
        if !is_valid_email(&email) {
            return Err(CoreError::validation("Email address is invalid"));
        }
        if input.password.chars().count() < PASSWORD_MIN_LEN {
            return Err(CoreError::validation(format!(
                "Password must be at least {} characters",
                PASSWORD_MIN_LEN
            )));
        }

        if self.authors.get_by_username(&username).await?.is_some() {
            return Err(CoreError::validation(format!(
                "Username '{}' is already taken",
                username
            )));
        }
        if self.authors.get_by_username_or_email(&email).await?.is_some() {
            return Err(CoreError::validation(format!(
                "Email '{}' is already registered",
                email
            )));
        }

        let password_hash = hash_password(&input.password).context("Failed to hash password")?;
        let author = self
            .authors
            .create(&NewAuthor {
                username,
                email,
                password_hash,
                first_name: input.first_name.trim().to_string(),
                last_name: input.last_name.trim().to_string(),
                bio: input.bio,
                birth_date: input.birth_date,
                location: input.location.trim().to_string(),
                profile_photo: None,
                is_staff: input.is_staff,
            })
            .await
            .map_err(|e| {
                // Lost a race with a concurrent registration
                if is_unique_violation(&e) {
                    CoreError::validation("Username or email is already registered")
                } else {
                    CoreError::Internal(e)
                }
            })?;

        tracing::info!(author_id = author.id, username = %author.username, "Author created");
        Ok(author)
    }

    /// Check credentials and open a session
    pub async fn login(&self, username_or_email: &str, password: &str) -> CoreResult<Session> {
        let invalid = || CoreError::Authentication("Invalid username or password".to_string());

        let author = self
            .authors
            .get_by_username_or_email(username_or_email.trim())
            .await?
            .ok_or_else(invalid)?;

        if !verify_password(password, &author.password_hash).context("Failed to verify password")? {
            tracing::info!(author_id = author.id, "Login rejected");
            return Err(invalid());
        }

        let now = Utc::now();
        let session = self
            .sessions
            .create(&Session {
                id: Uuid::new_v4().to_string(),
                author_id: author.id,
                expires_at: now + Duration::days(self.session_expiration_days),
                created_at: now,
            })
            .await?;

        tracing::info!(author_id = author.id, "Author logged in");
        Ok(session)
    }

    /// Drop a session; unknown tokens are ignored
    pub async fn logout(&self, token: &str) -> CoreResult<()> {
        self.sessions.delete(token).await?;
        Ok(())
    }

    /// Identity behind a session token.
    ///
    /// Expired sessions are deleted and read as no identity.
    pub async fn current_identity(&self, token: &str) -> CoreResult<Option<Identity>> {
        let Some(session) = self.sessions.get_by_id(token).await? else {
            return Ok(None);
        };
        if session.is_expired() {
            self.sessions.delete(&session.id).await?;
            tracing::debug!(author_id = session.author_id, "Expired session removed");
            return Ok(None);
        }

        Ok(self
            .authors
            .get_by_id(session.author_id)
            .await?
            .map(|author| author.identity()))
    }

    /// Remove every expired session, returning how many were deleted
    pub async fn cleanup_expired_sessions(&self) -> CoreResult<i64> {
        let removed = self.sessions.delete_expired().await?;
        if removed > 0 {
            tracing::info!(removed, "Expired sessions cleaned up");
        }
        Ok(removed)
    }

    /// Number of registered authors
    pub async fn count(&self) -> CoreResult<i64> {
        Ok(self.authors.count().await?)
    }
}
