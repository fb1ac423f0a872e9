use crate::error::Error;
use async_trait::async_trait;
use axum::{extract::FromRequestParts, http::request::Parts};
use axum_login::{AuthUser, AuthnBackend, UserId};
use libbiobank::{Database, empty_string_as_none, user::User};
use serde::{Deserialize, Serialize};
use std::ops::Deref;
use tracing::debug;

#[derive(Debug, Clone, Serialize)]
pub(crate) struct SqliteUser(User);

impl Deref for SqliteUser {
    type Target = User;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl AuthUser for SqliteUser {
    type Id = String;

    fn id(&self) -> Self::Id {
        self.username.clone()
    }

    fn session_auth_hash(&self) -> &[u8] {
        self.pwhash.as_bytes()
    }
}

#[derive(Clone, Deserialize, Serialize)]
pub(crate) struct Credentials {
    #[serde(default)]
    pub(crate) username: String,
    #[serde(default)]
    pub(crate) password: String,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    pub(crate) next: Option<String>,
}

#[derive(Clone)]
pub(crate) struct SqliteAuthBackend {
    db: Database,
}

#[async_trait]
impl AuthnBackend for SqliteAuthBackend {
    type User = SqliteUser;
    type Credentials = Credentials;
    type Error = Error;

    async fn authenticate(
        &self,
        credentials: Self::Credentials,
    ) -> Result<Option<Self::User>, Self::Error> {
        debug!(username = %credentials.username, "authenticating");
        let user = self.get_user(&credentials.username).await?;
        // a wrong password is a failed login, not an error
        Ok(user.filter(|u| u.verify_password(&credentials.password).is_ok()))
    }

    async fn get_user(&self, username: &UserId<Self>) -> Result<Option<Self::User>, Self::Error> {
        User::load_by_username(username, &self.db)
            .await
            .map(|o| o.map(SqliteUser))
            .map_err(|e| e.into())
    }
}

impl SqliteAuthBackend {
    /// Store a new user with a hashed copy of the given password
    pub(crate) async fn register(&self, username: String, password: &str) -> Result<User, Error> {
        let password_hash = User::hash_password(password)?;
        let mut user = User::new(username, password_hash);
        user.insert(&self.db).await?;
        debug!(user.id, username = %user.username, "Registered new user");
        Ok(user)
    }

    pub(crate) fn new(db: Database) -> Self {
        Self { db }
    }
}

pub(crate) type AuthSession = axum_login::AuthSession<SqliteAuthBackend>;

impl<S> FromRequestParts<S> for SqliteUser
where
    S: Send + Sync,
{
    type Rejection = Error;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let auth = AuthSession::from_request_parts(parts, state)
            .await
            .map_err(|(_, msg)| anyhow::anyhow!(msg))?;
        auth.user
            .ok_or_else(|| Error::Unauthorized("No logged in user".to_string()))
    }
}
