//! App-launch session gate.
//!
//! Decides what the app shows first: a resolved profile goes straight to the
//! dashboard, anything else lands on the login flow. Resolution never fails;
//! every degraded path logs a warning and yields `None`.

use crate::auth::{AuthResult, AuthSession, SessionPersistence, SupabasePhoneAuth};
use crate::models::Profile;
use crate::store::{ProfileApi, StoreError};

/// Source of a restorable session.
#[allow(async_fn_in_trait)]
pub trait SessionSource {
    async fn restore_session(&self) -> AuthResult<Option<AuthSession>>;
}

impl<S: SessionPersistence> SessionSource for SupabasePhoneAuth<S> {
    async fn restore_session(&self) -> AuthResult<Option<AuthSession>> {
        Self::restore_session(self).await
    }
}

pub struct SessionGate<A: SessionSource, P: ProfileApi> {
    auth: Option<A>,
    profiles: Option<P>,
}

impl<A: SessionSource, P: ProfileApi> SessionGate<A, P> {
    pub const fn new(auth: Option<A>, profiles: Option<P>) -> Self {
        Self { auth, profiles }
    }

    /// Resolve the signed-in profile, if any.
    ///
    /// `None` covers every other case: unconfigured backend, no persisted
    /// session, a session that cannot be refreshed, a verified identity with
    /// no profile row, or any transport failure. The caller only branches on
    /// logged-in versus not.
    pub async fn resolve(&self) -> Option<Profile> {
        let (Some(auth), Some(profiles)) = (&self.auth, &self.profiles) else {
            tracing::debug!("Remote backend not configured, starting signed out");
            return None;
        };

        let session = match auth.restore_session().await {
            Ok(Some(session)) => session,
            Ok(None) => return None,
            Err(error) => {
                tracing::warn!("Failed to restore session, starting signed out: {error}");
                return None;
            }
        };

        match profiles.fetch_profile(&session.user.id).await {
            Ok(row) => Some(row.into_profile()),
            Err(StoreError::NotFound) => {
                tracing::warn!(
                    user_id = session.user.id,
                    "Session restored but no profile exists, starting signed out"
                );
                None
            }
            Err(error) => {
                tracing::warn!("Failed to fetch profile, starting signed out: {error}");
                None
            }
        }
    }
}
