//! sakhi-core - Core library for Krishi Sakhi
//!
//! This crate contains the shared models, auth client, and the remote/local
//! store layer used by all Krishi Sakhi interfaces.

pub mod auth;
pub mod config;
pub mod error;
pub mod models;
pub mod search;
pub mod session;
pub mod store;
pub mod util;

pub use error::{Error, Result};
pub use models::{ActivityLogEntry, Crop, EntryId, Profile};
