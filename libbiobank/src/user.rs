//! Objects related to the users of the biobank tracker
use crate::{
    Database,
    core::{
        error::{Error, Result},
        loadable::Loadable,
    },
};
use argon2::{Argon2, PasswordHasher, PasswordVerifier};
use async_trait::async_trait;
use password_hash::{PasswordHash, SaltString, rand_core::OsRng};
use serde::{Deserialize, Serialize};
use sqlx::sqlite::SqliteQueryResult;
use tracing::debug;

/// The maximum number of characters allowed in a username
pub const USERNAME_MAX_LENGTH: usize = 150;

/// A registered user of the web application
#[derive(sqlx::FromRow, Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct User {
    #[sqlx(rename = "userid")]
    pub id: i64,
    pub username: String,
    #[serde(skip_serializing)]
    #[sqlx(default)]
    pub pwhash: String,
}

#[async_trait]
impl Loadable for User {
    type Id = i64;

    fn id(&self) -> Self::Id {
        self.id
    }

    fn set_id(&mut self, id: Self::Id) {
        self.id = id
    }

    async fn load(id: Self::Id, db: &Database) -> Result<Self> {
        sqlx::query_as("SELECT userid, username, pwhash FROM bb_users WHERE userid=?")
            .bind(id)
            .fetch_one(db.pool())
            .await
            .map_err(|e| e.into())
    }

    async fn delete_id(id: &Self::Id, db: &Database) -> Result<SqliteQueryResult> {
        sqlx::query("DELETE FROM bb_users WHERE userid=?")
            .bind(id)
            .execute(db.pool())
            .await
            .map_err(|e| e.into())
    }
}

impl User {
    pub fn new(username: String, pwhash: String) -> Self {
        Self {
            id: Self::invalid_id(),
            username,
            pwhash,
        }
    }

    pub async fn load_all(db: &Database) -> Result<Vec<User>> {
        sqlx::query_as("SELECT userid, username, pwhash FROM bb_users ORDER BY username ASC")
            .fetch_all(db.pool())
            .await
            .map_err(|e| e.into())
    }

    pub async fn load_by_username(username: &str, db: &Database) -> Result<Option<User>> {
        sqlx::query_as("SELECT userid, username, pwhash FROM bb_users WHERE username=?")
            .bind(username)
            .fetch_optional(db.pool())
            .await
            .map_err(|e| e.into())
    }

    /// Add this user to the database. On success the id of this object is
    /// set to the id of the new row.
    pub async fn insert(&mut self, db: &Database) -> Result<SqliteQueryResult> {
        if self.id != Self::invalid_id() {
            return Err(Error::InvalidInsertObjectAlreadyExists(self.id));
        }
        Self::validate_username(&self.username)?;
        debug!(username = %self.username, "Inserting user into database");
        sqlx::query("INSERT INTO bb_users (username, pwhash) VALUES (?, ?)")
            .bind(&self.username)
            .bind(&self.pwhash)
            .execute(db.pool())
            .await
            .map(|r| {
                self.id = r.last_insert_rowid();
                r
            })
            .map_err(|e| e.into())
    }

    pub async fn update(&self, db: &Database) -> Result<SqliteQueryResult> {
        if self.id == Self::invalid_id() {
            return Err(Error::InvalidUpdateObjectNotFound);
        }
        Self::validate_username(&self.username)?;
        sqlx::query("UPDATE bb_users SET username=?, pwhash=? WHERE userid=?")
            .bind(&self.username)
            .bind(&self.pwhash)
            .bind(self.id)
            .execute(db.pool())
            .await
            .map_err(|e| e.into())
    }

    /// Usernames may contain letters, digits and the characters `@ . + - _`
    pub fn validate_username(username: &str) -> Result<()> {
        if username.is_empty() {
            return Err(Error::AuthInvalidUsernameEmpty);
        }
        if username.chars().count() > USERNAME_MAX_LENGTH {
            return Err(Error::AuthInvalidUsernameTooLong(USERNAME_MAX_LENGTH));
        }
        let invalid: String = username
            .chars()
            .filter(|c| !(c.is_alphanumeric() || "@.+-_".contains(*c)))
            .collect();
        if !invalid.is_empty() {
            return Err(Error::AuthInvalidUsernameInvalidCharacters(invalid));
        }
        Ok(())
    }

    pub fn hash_password(pw: &str) -> Result<String> {
        let salt = SaltString::generate(&mut OsRng);
        let hasher = Argon2::default();
        Ok(hasher.hash_password(pw.as_bytes(), &salt)?.to_string())
    }

    pub fn verify_password(&self, pw: &str) -> Result<()> {
        let hasher = Argon2::default();
        let expected_hash = PasswordHash::new(&self.pwhash)?;
        hasher
            .verify_password(pw.as_bytes(), &expected_hash)
            .map_err(|e| e.into())
    }

    pub fn change_password(&mut self, pw: &str) -> Result<()> {
        self.pwhash = Self::hash_password(pw)?;
        Ok(())
    }
}
