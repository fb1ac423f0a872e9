use crate::error::Error;
use libbiobank::{Database, core::loadable::Loadable};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use time::OffsetDateTime;
use tower_sessions::Session;

/// Extractors that convert axum's rejections into our own [Error] type so that
/// they are rendered by the error page like every other failure.
pub(crate) mod extract {
    use crate::error::Error;
    use axum::extract::{
        FromRequest, FromRequestParts,
        rejection::{FormRejection, QueryRejection},
    };

    #[derive(FromRequest)]
    #[from_request(via(axum::Form), rejection(Error))]
    pub(crate) struct Form<T>(pub(crate) T);

    #[derive(FromRequestParts)]
    #[from_request(via(axum::extract::Query), rejection(Error))]
    pub(crate) struct Query<T>(pub(crate) T);

    impl From<FormRejection> for Error {
        fn from(value: FormRejection) -> Self {
            Error::UnprocessableEntityFormRejection(value)
        }
    }

    impl From<QueryRejection> for Error {
        fn from(value: QueryRejection) -> Self {
            Error::UnprocessableEntityQueryRejection(value)
        }
    }
}

const FLASH_SESSION_KEY: &str = "flash_messages";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub(crate) enum FlashMessageKind {
    Success,
    Info,
}

/// A one-shot message that is stored in the session and shown on the next
/// rendered page
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub(crate) struct FlashMessage {
    pub kind: FlashMessageKind,
    pub msg: String,
}

impl FlashMessage {
    pub(crate) fn success(msg: impl Into<String>) -> Self {
        Self {
            kind: FlashMessageKind::Success,
            msg: msg.into(),
        }
    }

    pub(crate) fn info(msg: impl Into<String>) -> Self {
        Self {
            kind: FlashMessageKind::Info,
            msg: msg.into(),
        }
    }
}

/// Queue a flash message for the next page that is rendered in this session
pub(crate) async fn push_flash(session: &Session, message: FlashMessage) -> Result<(), Error> {
    let mut messages: Vec<FlashMessage> = session
        .get(FLASH_SESSION_KEY)
        .await?
        .unwrap_or_default();
    messages.push(message);
    session.insert(FLASH_SESSION_KEY, messages).await?;
    Ok(())
}

/// Remove and return all queued flash messages
pub(crate) async fn take_flash(session: &Session) -> Result<Vec<FlashMessage>, Error> {
    Ok(session
        .remove::<Vec<FlashMessage>>(FLASH_SESSION_KEY)
        .await?
        .unwrap_or_default())
}

/// Validation messages for a submitted form, keyed by field name
#[derive(thiserror::Error, Debug, Default, Serialize, PartialEq)]
#[serde(transparent)]
#[error("Invalid values for fields: {}", .0.keys().cloned().collect::<Vec<_>>().join(", "))]
pub(crate) struct FormErrors(BTreeMap<String, Vec<String>>);

impl FormErrors {
    pub(crate) fn add(&mut self, field: &str, message: impl Into<String>) {
        self.0
            .entry(field.to_string())
            .or_default()
            .push(message.into());
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub(crate) fn get(&self, field: &str) -> Option<&[String]> {
        self.0.get(field).map(|v| v.as_slice())
    }

    /// Returns `value` if no errors were recorded
    pub(crate) fn or_value<T>(self, value: T) -> Result<T, FormErrors> {
        match self.is_empty() {
            true => Ok(value),
            false => Err(self),
        }
    }
}

/// The hour of the day in local time, or UTC if the local offset is unknown
pub(crate) fn current_hour() -> u8 {
    OffsetDateTime::now_local()
        .unwrap_or_else(|_| OffsetDateTime::now_utc())
        .hour()
}

/// Only allow redirects to paths on this site
pub(crate) fn safe_next(next: Option<&str>) -> Option<&str> {
    next.filter(|n| n.starts_with('/') && !n.starts_with("//") && !n.starts_with("/\\"))
}

/// Load an object by id, treating a missing row as a 404
pub(crate) async fn load_object<T: Loadable>(
    id: T::Id,
    what: &str,
    db: &Database,
) -> Result<T, Error> {
    T::load(id, db).await.map_err(|e| match e.is_not_found() {
        true => Error::NotFound(format!("Unable to find {what} '{id}'")),
        false => e.into(),
    })
}
