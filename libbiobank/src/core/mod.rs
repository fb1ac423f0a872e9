//! Core infrastructure for managing and accessing the biobank database.
pub mod database;
pub mod error;
pub mod loadable;
pub mod query;
