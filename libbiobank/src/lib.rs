//! This is a library that provides the storage layer for a small biobank
//! tracker: users, disease-term collections owned by those users, and the
//! donor samples that belong to each collection.

use serde::{Deserialize, Deserializer};
use std::str::FromStr;

pub mod collection;
pub mod core;
pub mod sample;
pub mod user;

pub use crate::core::database::Database;
pub use crate::core::error::Error;
pub use crate::core::error::Result;

/// The maximum number of characters allowed in short text fields such as a
/// collection title or a sample's material type
pub const MAX_TEXT_LENGTH: usize = 255;

pub fn empty_string_as_none<'de, D, T>(de: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: FromStr,
    T::Err: std::fmt::Display,
{
    let opt = Option::<String>::deserialize(de)?;
    match opt.as_deref() {
        None | Some("") => Ok(None),
        Some(s) => FromStr::from_str(s)
            .map_err(serde::de::Error::custom)
            .map(Some),
    }
}
