//! Error types for sakhi-core

use thiserror::Error;

/// Result type alias using sakhi-core's Error
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in sakhi-core operations
#[derive(Error, Debug)]
pub enum Error {
    /// Authentication error
    #[error(transparent)]
    Auth(#[from] crate::auth::AuthError),

    /// Store error (remote or local)
    #[error(transparent)]
    Store(#[from] crate::store::StoreError),
}
