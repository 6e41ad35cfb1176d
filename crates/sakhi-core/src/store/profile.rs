//! Profile store tying identity verification to the profile table.

use super::remote::ProfileApi;
use super::StoreError;
use crate::auth::{AuthError, Identity, IdentityApi};
use crate::models::{Profile, ProfileDraft, ProfileRow};
use crate::{Error, Result};

/// Orchestrates phone verification and the profile row lifecycle.
///
/// Profile writes have no local fallback. A profile that only exists on one
/// device is worse than a clear failure, so every error here surfaces to the
/// caller.
pub struct ProfileStore<A: IdentityApi, P: ProfileApi> {
    auth: Option<A>,
    remote: Option<P>,
}

impl<A: IdentityApi, P: ProfileApi> ProfileStore<A, P> {
    pub const fn new(auth: Option<A>, remote: Option<P>) -> Self {
        Self { auth, remote }
    }

    fn auth(&self) -> Result<&A> {
        self.auth.as_ref().ok_or(Error::Auth(AuthError::NotConfigured))
    }

    fn remote(&self) -> Result<&P> {
        self.remote
            .as_ref()
            .ok_or(Error::Store(StoreError::NotConfigured))
    }

    /// Send a one-time code to the given 10-digit phone number.
    pub async fn send_verification_code(&self, phone: &str) -> Result<()> {
        self.auth()?.send_otp(phone).await?;
        Ok(())
    }

    /// Exchange phone + code for a verified identity.
    pub async fn verify_code(&self, phone: &str, code: &str) -> Result<Identity> {
        Ok(self.auth()?.verify_otp(phone, code).await?)
    }

    /// Create the profile row for a freshly verified identity.
    pub async fn create_profile(&self, user_id: &str, draft: ProfileDraft) -> Result<Profile> {
        let row = ProfileRow::from_draft(user_id, draft);
        let stored = self.remote()?.insert_profile(row).await?;
        Ok(stored.into_profile())
    }

    /// Fetch the profile for an identity.
    ///
    /// `Ok(None)` means the identity is verified but has not completed
    /// registration; transport and API failures stay errors.
    pub async fn fetch_profile(&self, user_id: &str) -> Result<Option<Profile>> {
        match self.remote()?.fetch_profile(user_id).await {
            Ok(row) => Ok(Some(row.into_profile())),
            Err(StoreError::NotFound) => Ok(None),
            Err(error) => Err(error.into()),
        }
    }

    /// Replace the profile's editable fields.
    pub async fn update_profile(&self, user_id: &str, draft: ProfileDraft) -> Result<Profile> {
        let row = ProfileRow::from_draft(user_id, draft);
        let stored = self.remote()?.update_profile(user_id, row).await?;
        Ok(stored.into_profile())
    }

    /// Invalidate the current session.
    pub async fn sign_out(&self) -> Result<()> {
        self.auth()?.sign_out().await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use chrono::Utc;
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::auth::AuthResult;
    use crate::models::{FarmDetails, Language, Location};
    use crate::store::StoreResult;

    #[derive(Clone, Default)]
    struct FakeAuth {
        sent_codes: Arc<Mutex<Vec<String>>>,
        signed_out: Arc<Mutex<bool>>,
    }

    impl IdentityApi for FakeAuth {
        async fn send_otp(&self, phone: &str) -> AuthResult<()> {
            self.sent_codes.lock().unwrap().push(phone.to_string());
            Ok(())
        }

        async fn verify_otp(&self, phone: &str, code: &str) -> AuthResult<Identity> {
            if code == "123456" {
                Ok(Identity {
                    id: "user-1".to_string(),
                    phone: Some(format!("+91{phone}")),
                })
            } else {
                Err(AuthError::Api("Token has expired or is invalid (403)".to_string()))
            }
        }

        async fn sign_out(&self) -> AuthResult<()> {
            *self.signed_out.lock().unwrap() = true;
            Ok(())
        }
    }

    #[derive(Clone, Default)]
    struct FakeProfiles {
        rows: Arc<Mutex<Vec<ProfileRow>>>,
    }

    impl ProfileApi for FakeProfiles {
        async fn insert_profile(&self, row: ProfileRow) -> StoreResult<ProfileRow> {
            let mut stored = row;
            stored.id = Some("row-1".to_string());
            stored.created_at = Some(Utc::now());
            self.rows.lock().unwrap().push(stored.clone());
            Ok(stored)
        }

        async fn fetch_profile(&self, user_id: &str) -> StoreResult<ProfileRow> {
            self.rows
                .lock()
                .unwrap()
                .iter()
                .find(|row| row.user_id == user_id)
                .cloned()
                .ok_or(StoreError::NotFound)
        }

        async fn update_profile(&self, user_id: &str, row: ProfileRow) -> StoreResult<ProfileRow> {
            let mut rows = self.rows.lock().unwrap();
            let existing = rows
                .iter_mut()
                .find(|candidate| candidate.user_id == user_id)
                .ok_or(StoreError::NotFound)?;
            existing.name = row.name;
            existing.crops = row.crops;
            existing.updated_at = Some(Utc::now());
            Ok(existing.clone())
        }
    }

    fn draft() -> ProfileDraft {
        ProfileDraft {
            name: "Lakshmi".to_string(),
            phone: "9876543210".to_string(),
            location: Location {
                state: "Kerala".to_string(),
                district: "Thrissur".to_string(),
                village: "Ollur".to_string(),
            },
            farm: FarmDetails {
                land_size: "1-2 acres".to_string(),
                soil_type: "laterite".to_string(),
                irrigation_type: "drip".to_string(),
                crops: vec!["Rice".to_string()],
            },
            language: Language::Ml,
        }
    }

    fn store() -> ProfileStore<FakeAuth, FakeProfiles> {
        ProfileStore::new(Some(FakeAuth::default()), Some(FakeProfiles::default()))
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn verify_then_create_then_fetch() {
        let store = store();

        store.send_verification_code("9876543210").await.unwrap();
        let identity = store.verify_code("9876543210", "123456").await.unwrap();
        assert_eq!(identity.id, "user-1");

        let created = store.create_profile(&identity.id, draft()).await.unwrap();
        assert_eq!(created.name, "Lakshmi");

        let fetched = store.fetch_profile(&identity.id).await.unwrap();
        assert_eq!(fetched, Some(created));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn missing_profile_is_none_not_an_error() {
        let store = store();
        assert_eq!(store.fetch_profile("nobody").await.unwrap(), None);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn wrong_code_surfaces_auth_error() {
        let store = store();
        let error = store.verify_code("9876543210", "000000").await.unwrap_err();
        assert!(matches!(error, Error::Auth(AuthError::Api(_))));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn unconfigured_store_reports_not_configured() {
        let store: ProfileStore<FakeAuth, FakeProfiles> = ProfileStore::new(None, None);

        let auth_error = store.send_verification_code("9876543210").await.unwrap_err();
        assert!(matches!(auth_error, Error::Auth(AuthError::NotConfigured)));

        let store_error = store.fetch_profile("user-1").await.unwrap_err();
        assert!(matches!(store_error, Error::Store(StoreError::NotConfigured)));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn update_replaces_editable_fields() {
        let store = store();
        store.create_profile("user-1", draft()).await.unwrap();

        let mut updated = draft();
        updated.name = "Lakshmi Devi".to_string();
        updated.farm.crops.push("Banana".to_string());

        let profile = store.update_profile("user-1", updated).await.unwrap();
        assert_eq!(profile.name, "Lakshmi Devi");
        assert_eq!(profile.farm.crops, vec!["Rice", "Banana"]);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn sign_out_reaches_identity_service() {
        let auth = FakeAuth::default();
        let store = ProfileStore::new(Some(auth.clone()), Some(FakeProfiles::default()));

        store.sign_out().await.unwrap();
        assert!(*auth.signed_out.lock().unwrap());
    }
}
