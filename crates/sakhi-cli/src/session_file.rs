//! File-backed session persistence.

use std::path::PathBuf;

use sakhi_core::auth::{AuthError, AuthResult, AuthSession, SessionPersistence};

/// Stores the auth session as a JSON file under the data directory.
#[derive(Debug, Clone)]
pub struct SessionFileStore {
    path: PathBuf,
}

impl SessionFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl SessionPersistence for SessionFileStore {
    fn load(&self) -> AuthResult<Option<AuthSession>> {
        if !self.path.exists() {
            return Ok(None);
        }

        let raw = std::fs::read_to_string(&self.path).map_err(|error| {
            AuthError::Storage(format!("failed to read {}: {error}", self.path.display()))
        })?;
        let session = serde_json::from_str(&raw).map_err(|error| {
            AuthError::Storage(format!("failed to parse {}: {error}", self.path.display()))
        })?;
        Ok(Some(session))
    }

    fn save(&self, session: &AuthSession) -> AuthResult<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).map_err(|error| {
                AuthError::Storage(format!("failed to create {}: {error}", parent.display()))
            })?;
        }

        let serialized = serde_json::to_string_pretty(session)
            .map_err(|error| AuthError::Storage(format!("failed to serialize session: {error}")))?;
        std::fs::write(&self.path, serialized).map_err(|error| {
            AuthError::Storage(format!("failed to write {}: {error}", self.path.display()))
        })
    }

    fn clear(&self) -> AuthResult<()> {
        if self.path.exists() {
            std::fs::remove_file(&self.path).map_err(|error| {
                AuthError::Storage(format!("failed to remove {}: {error}", self.path.display()))
            })?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use sakhi_core::auth::Identity;
    use tempfile::tempdir;

    use super::*;

    fn session() -> AuthSession {
        AuthSession {
            access_token: "access".to_string(),
            refresh_token: "refresh".to_string(),
            expires_at: 1_900_000_000,
            user: Identity {
                id: "user-1".to_string(),
                phone: Some("+919876543210".to_string()),
            },
        }
    }

    #[test]
    fn round_trips_session() {
        let dir = tempdir().unwrap();
        let store = SessionFileStore::new(dir.path().join("session.json"));

        assert_eq!(store.load().unwrap(), None);
        store.save(&session()).unwrap();
        assert_eq!(store.load().unwrap(), Some(session()));
    }

    #[test]
    fn clear_removes_session_and_tolerates_absence() {
        let dir = tempdir().unwrap();
        let store = SessionFileStore::new(dir.path().join("session.json"));

        store.save(&session()).unwrap();
        store.clear().unwrap();
        assert_eq!(store.load().unwrap(), None);

        // Clearing again is fine.
        store.clear().unwrap();
    }

    #[test]
    fn corrupt_session_surfaces_storage_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("session.json");
        std::fs::write(&path, "not json").unwrap();

        let store = SessionFileStore::new(path);
        assert!(matches!(
            store.load().unwrap_err(),
            AuthError::Storage(_)
        ));
    }
}
