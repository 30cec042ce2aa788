use chrono::{DateTime, Duration, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};
use pbkdf2::pbkdf2_hmac;
use sha2::Sha256;
use subtle::ConstantTimeEq;
use uuid::Uuid;

use super::Database;
use crate::error::{Error, Result, ValidationError};
use crate::models::{AuthSession, CreateUserInput, User};

const COLUMNS: &str = "id, username, email, created_at";

fn user_from_row(row: &Row) -> rusqlite::Result<User> {
    Ok(User {
        id: row.get("id")?,
        username: row.get("username")?,
        email: row.get("email")?,
        created_at: row.get("created_at")?,
    })
}

pub(super) fn find_user(conn: &Connection, id: i64) -> Result<Option<User>> {
    let sql = format!("SELECT {} FROM users WHERE id = ?1", COLUMNS);
    Ok(conn.query_row(&sql, [id], user_from_row).optional()?)
}

const HASH_SCHEME: &str = "pbkdf2_sha256";

/// Stored as `pbkdf2_sha256$<rounds>$<hex digest>`, so older hashes keep
/// verifying after the round count changes.
fn hash_password(password: &str, salt: &str, rounds: u32) -> String {
    let mut key = [0u8; 32];
    pbkdf2_hmac::<Sha256>(password.as_bytes(), salt.as_bytes(), rounds, &mut key);
    format!("{}${}${}", HASH_SCHEME, rounds, hex::encode(key))
}

fn verify_password(password: &str, salt: &str, stored: &str) -> Result<bool> {
    let malformed = || Error::Corrupt("unrecognised password hash".to_string());
    let mut parts = stored.splitn(3, '$');
    let (Some(HASH_SCHEME), Some(rounds), Some(digest)) = (parts.next(), parts.next(), parts.next())
    else {
        return Err(malformed());
    };
    let rounds: u32 = rounds.parse().map_err(|_| malformed())?;
    let expected = hex::decode(digest).map_err(|_| malformed())?;
    if expected.is_empty() {
        return Err(malformed());
    }

    let mut key = vec![0u8; expected.len()];
    pbkdf2_hmac::<Sha256>(password.as_bytes(), salt.as_bytes(), rounds, &mut key);
    Ok(key.ct_eq(&expected).into())
}

fn purge_expired(conn: &Connection, now: DateTime<Utc>) -> Result<usize> {
    let purged = conn.execute("DELETE FROM auth_sessions WHERE expires_at <= ?1", [now])?;
    if purged > 0 {
        tracing::debug!(purged, "Expired sessions purged");
    }
    Ok(purged)
}

impl Database {
    pub fn create_user(&self, input: CreateUserInput) -> Result<User> {
        input.validate()?;
        let username = input.username.trim().to_string();
        let email = input
            .email
            .map(|e| e.trim().to_string())
            .filter(|e| !e.is_empty());

        let salt = Uuid::new_v4().simple().to_string();
        let hash = hash_password(&input.password, &salt, self.password_rounds);

        let conn = self.lock();
        let taken: bool = conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM users WHERE username = ?1)",
            [&username],
            |row| row.get(0),
        )?;
        if taken {
            return Err(ValidationError::single("username", "is already taken").into());
        }

        let now = Utc::now();
        conn.execute(
            "INSERT INTO users (username, email, password_salt, password_hash, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![username, email, salt, hash, now],
        )?;
        let id = conn.last_insert_rowid();
        tracing::info!(user_id = id, "User created");

        Ok(User {
            id,
            username,
            email,
            created_at: now,
        })
    }

    pub fn get_user(&self, id: i64) -> Result<Option<User>> {
        find_user(&self.lock(), id)
    }

    /// The user owning these credentials, or `None` on any mismatch.
    pub fn verify_credentials(&self, username: &str, password: &str) -> Result<Option<User>> {
        let found = self
            .lock()
            .query_row(
                "SELECT id, username, email, created_at, password_salt, password_hash
                 FROM users WHERE username = ?1",
                [username.trim()],
                |row| {
                    let user = user_from_row(row)?;
                    let salt: String = row.get("password_salt")?;
                    let hash: String = row.get("password_hash")?;
                    Ok((user, salt, hash))
                },
            )
            .optional()?;

        let Some((user, salt, hash)) = found else {
            return Ok(None);
        };
        Ok(verify_password(password, &salt, &hash)?.then_some(user))
    }

    /// Opens a session and purges the ones that have already expired.
    pub fn create_session(&self, user_id: i64, ttl: Duration) -> Result<AuthSession> {
        let now = Utc::now();
        let session = AuthSession {
            token: Uuid::new_v4().to_string(),
            user_id,
            created_at: now,
            expires_at: now + ttl,
        };
        let conn = self.lock();
        purge_expired(&conn, now)?;
        conn.execute(
            "INSERT INTO auth_sessions (token, user_id, created_at, expires_at)
             VALUES (?1, ?2, ?3, ?4)",
            params![session.token, session.user_id, session.created_at, session.expires_at],
        )?;
        tracing::debug!(user_id, "Session opened");
        Ok(session)
    }

    /// The user behind a live session token.
    pub fn user_for_token(&self, token: &str, now: DateTime<Utc>) -> Result<Option<User>> {
        let conn = self.lock();
        let session = conn
            .query_row(
                "SELECT token, user_id, created_at, expires_at FROM auth_sessions WHERE token = ?1",
                [token],
                |row| {
                    Ok(AuthSession {
                        token: row.get("token")?,
                        user_id: row.get("user_id")?,
                        created_at: row.get("created_at")?,
                        expires_at: row.get("expires_at")?,
                    })
                },
            )
            .optional()?;

        match session {
            Some(session) if !session.is_expired(now) => find_user(&conn, session.user_id),
            Some(session) => {
                conn.execute("DELETE FROM auth_sessions WHERE token = ?1", [&session.token])?;
                Ok(None)
            }
            None => Ok(None),
        }
    }

    /// Removes every session expired at `now`. Returns how many were removed.
    pub fn purge_expired_sessions(&self, now: DateTime<Utc>) -> Result<usize> {
        purge_expired(&self.lock(), now)
    }

    pub fn delete_session(&self, token: &str) -> Result<bool> {
        Ok(self
            .lock()
            .execute("DELETE FROM auth_sessions WHERE token = ?1", [token])?
            > 0)
    }
}
