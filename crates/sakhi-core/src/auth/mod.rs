//! Supabase phone-OTP auth client.

pub mod registration;

use std::fmt;

use reqwest::{Client, RequestBuilder, StatusCode};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::RemoteConfig;
use crate::util::{is_valid_phone, unix_timestamp_now};

const EXPIRY_SKEW_SECONDS: i64 = 60;
const PHONE_COUNTRY_PREFIX: &str = "+91";

/// An authenticated identity issued by the external auth service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub id: String,
    pub phone: Option<String>,
}

#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthSession {
    pub access_token: String,
    pub refresh_token: String,
    pub expires_at: i64,
    pub user: Identity,
}

impl AuthSession {
    #[must_use]
    pub fn is_expired(&self) -> bool {
        self.expires_at <= unix_timestamp_now() + EXPIRY_SKEW_SECONDS
    }
}

impl fmt::Debug for AuthSession {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("AuthSession")
            .field("access_token", &"[REDACTED]")
            .field("refresh_token", &"[REDACTED]")
            .field("expires_at", &self.expires_at)
            .field("user", &self.user)
            .finish()
    }
}

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Remote auth is not configured for this build.")]
    NotConfigured,
    #[error("Invalid auth configuration: {0}")]
    InvalidConfiguration(&'static str),
    #[error("{0}")]
    Validation(String),
    #[error("Registration step not allowed: {0}")]
    InvalidTransition(String),
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Failed to parse JSON payload: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Auth API error: {0}")]
    Api(String),
    #[error("Session storage error: {0}")]
    Storage(String),
}

pub type AuthResult<T> = Result<T, AuthError>;

/// Persistence for the auth session between app launches.
pub trait SessionPersistence: Clone + Send + Sync + 'static {
    fn load(&self) -> AuthResult<Option<AuthSession>>;
    fn save(&self, session: &AuthSession) -> AuthResult<()>;
    fn clear(&self) -> AuthResult<()>;
}

/// Seam for the external identity service, so stores and the registration
/// flow can be exercised against a fake in tests.
#[allow(async_fn_in_trait)]
pub trait IdentityApi {
    /// Request a one-time code be sent to the given 10-digit phone number.
    async fn send_otp(&self, phone: &str) -> AuthResult<()>;

    /// Exchange phone + code for an authenticated identity.
    async fn verify_otp(&self, phone: &str, code: &str) -> AuthResult<Identity>;

    /// Invalidate the current session.
    async fn sign_out(&self) -> AuthResult<()>;
}

#[derive(Clone)]
pub struct SupabasePhoneAuth<S: SessionPersistence> {
    auth_url: String,
    anon_key: String,
    client: Client,
    store: S,
}

impl<S: SessionPersistence> SupabasePhoneAuth<S> {
    pub fn new(url: impl AsRef<str>, anon_key: impl Into<String>, store: S) -> AuthResult<Self> {
        let auth_url = normalize_auth_url(url.as_ref())?;
        let anon_key = anon_key.into().trim().to_string();
        if anon_key.is_empty() {
            return Err(AuthError::InvalidConfiguration(
                "Supabase anon key must not be empty",
            ));
        }

        Ok(Self {
            auth_url,
            anon_key,
            client: Client::builder().build()?,
            store,
        })
    }

    /// Build a client from optional remote configuration.
    ///
    /// Returns `None` when the backend is not configured; that is the
    /// local-only mode, not an error.
    pub fn from_config(config: &RemoteConfig, store: S) -> AuthResult<Option<Self>> {
        match config.credentials() {
            Some((url, key)) => Ok(Some(Self::new(url, key, store)?)),
            None => Ok(None),
        }
    }

    /// Load the persisted session, refreshing it when expired.
    ///
    /// A session that cannot be loaded or refreshed is cleared and treated
    /// as absent.
    pub async fn restore_session(&self) -> AuthResult<Option<AuthSession>> {
        let stored_session = match self.store.load() {
            Ok(Some(session)) => session,
            Ok(None) => return Ok(None),
            Err(error) => {
                tracing::warn!("Failed to load persisted session: {}", error);
                self.store.clear()?;
                return Ok(None);
            }
        };

        if !stored_session.is_expired() {
            return Ok(Some(stored_session));
        }

        match self.refresh_session(&stored_session.refresh_token).await {
            Ok(refreshed) => Ok(Some(refreshed)),
            Err(error) => {
                tracing::warn!("Failed to refresh persisted session: {}", error);
                self.store.clear()?;
                Ok(None)
            }
        }
    }

    pub async fn refresh_session(&self, refresh_token: &str) -> AuthResult<AuthSession> {
        if refresh_token.trim().is_empty() {
            return Err(AuthError::InvalidConfiguration(
                "Refresh token must not be empty",
            ));
        }

        let payload = serde_json::json!({
            "refresh_token": refresh_token,
        });
        let request = self.public_request(
            self.client
                .post(format!("{}/token", self.auth_url))
                .query(&[("grant_type", "refresh_token")])
                .json(&payload),
        );
        let response = self.send_auth_request(request).await?;
        let session = response.into_session()?.ok_or_else(|| {
            AuthError::Api("Refresh response did not include an active session".to_string())
        })?;

        self.store.save(&session)?;
        Ok(session)
    }

    fn public_request(&self, request: RequestBuilder) -> RequestBuilder {
        request
            .header("apikey", &self.anon_key)
            .header("Authorization", format!("Bearer {}", self.anon_key))
    }

    async fn send_auth_request(&self, request: RequestBuilder) -> AuthResult<AuthApiResponse> {
        let response = request.send().await?;
        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AuthError::Api(parse_api_error(status, &body)));
        }
        Ok(response.json::<AuthApiResponse>().await?)
    }
}

impl<S: SessionPersistence> IdentityApi for SupabasePhoneAuth<S> {
    async fn send_otp(&self, phone: &str) -> AuthResult<()> {
        let phone = validate_phone(phone)?;

        let payload = serde_json::json!({
            "phone": format_phone(&phone),
            "create_user": true,
        });
        let request = self.public_request(
            self.client
                .post(format!("{}/otp", self.auth_url))
                .json(&payload),
        );

        let response = request.send().await?;
        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AuthError::Api(parse_api_error(status, &body)));
        }
        Ok(())
    }

    async fn verify_otp(&self, phone: &str, code: &str) -> AuthResult<Identity> {
        let phone = validate_phone(phone)?;
        let code = code.trim();
        if code.is_empty() {
            return Err(AuthError::Validation(
                "Verification code is required".to_string(),
            ));
        }

        let payload = serde_json::json!({
            "phone": format_phone(&phone),
            "token": code,
            "type": "sms",
        });
        let request = self.public_request(
            self.client
                .post(format!("{}/verify", self.auth_url))
                .json(&payload),
        );

        let response = self.send_auth_request(request).await?;
        let session = response.into_session()?.ok_or_else(|| {
            AuthError::Api("Verification response did not include an active session".to_string())
        })?;

        self.store.save(&session)?;
        Ok(session.user)
    }

    async fn sign_out(&self) -> AuthResult<()> {
        if let Some(session) = self.store.load()? {
            let request = self
                .client
                .post(format!("{}/logout", self.auth_url))
                .header("apikey", &self.anon_key)
                .bearer_auth(&session.access_token);

            let response = request.send().await?;
            if !(response.status().is_success() || response.status() == StatusCode::UNAUTHORIZED) {
                let status = response.status();
                let body = response.text().await.unwrap_or_default();
                return Err(AuthError::Api(parse_api_error(status, &body)));
            }
        }

        self.store.clear()?;
        Ok(())
    }
}

pub fn normalize_auth_url(url: &str) -> AuthResult<String> {
    let trimmed = url.trim().trim_end_matches('/');
    if trimmed.is_empty() {
        return Err(AuthError::InvalidConfiguration(
            "Supabase URL must not be empty",
        ));
    }
    if !(trimmed.starts_with("http://") || trimmed.starts_with("https://")) {
        return Err(AuthError::InvalidConfiguration(
            "Supabase URL must include http:// or https://",
        ));
    }
    if trimmed.ends_with("/auth/v1") {
        Ok(trimmed.to_string())
    } else {
        Ok(format!("{trimmed}/auth/v1"))
    }
}

fn validate_phone(phone: &str) -> AuthResult<String> {
    let phone = phone.trim();
    if is_valid_phone(phone) {
        Ok(phone.to_string())
    } else {
        Err(AuthError::Validation(
            "Phone number must be exactly 10 digits".to_string(),
        ))
    }
}

fn format_phone(phone: &str) -> String {
    format!("{PHONE_COUNTRY_PREFIX}{phone}")
}

#[derive(Debug, Deserialize)]
struct AuthApiResponse {
    access_token: Option<String>,
    refresh_token: Option<String>,
    expires_at: Option<i64>,
    expires_in: Option<i64>,
    user: Option<AuthApiUser>,
}

impl AuthApiResponse {
    fn into_session(self) -> AuthResult<Option<AuthSession>> {
        let expires_at = self.expires_at.or_else(|| {
            self.expires_in
                .map(|expires_in| unix_timestamp_now().saturating_add(expires_in))
        });

        match (self.access_token, self.refresh_token, expires_at, self.user) {
            (Some(access_token), Some(refresh_token), Some(expires_at), Some(user)) => {
                Ok(Some(AuthSession {
                    access_token,
                    refresh_token,
                    expires_at,
                    user: user.into(),
                }))
            }
            (None, None, None, _) => Ok(None),
            _ => Err(AuthError::Api(
                "Auth response did not include enough session fields".to_string(),
            )),
        }
    }
}

#[derive(Debug, Deserialize)]
struct AuthApiUser {
    id: String,
    phone: Option<String>,
}

impl From<AuthApiUser> for Identity {
    fn from(value: AuthApiUser) -> Self {
        Self {
            id: value.id,
            phone: value.phone.filter(|phone| !phone.is_empty()),
        }
    }
}

#[derive(Debug, Deserialize)]
struct AuthErrorResponse {
    error: Option<String>,
    error_description: Option<String>,
    message: Option<String>,
    msg: Option<String>,
}

fn parse_api_error(status: StatusCode, body: &str) -> String {
    if let Ok(payload) = serde_json::from_str::<AuthErrorResponse>(body) {
        if let Some(message) = payload
            .message
            .or(payload.msg)
            .or(payload.error_description)
            .or(payload.error)
        {
            return format!("{} ({})", message.trim(), status.as_u16());
        }
    }

    let trimmed = body.trim();
    if trimmed.is_empty() {
        format!("HTTP {}", status.as_u16())
    } else {
        format!("{} ({})", trimmed, status.as_u16())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_auth_url_appends_auth_path() {
        let normalized = normalize_auth_url("https://demo.supabase.co").unwrap();
        assert_eq!(normalized, "https://demo.supabase.co/auth/v1");
    }

    #[test]
    fn normalize_auth_url_keeps_existing_auth_path() {
        let normalized = normalize_auth_url("https://demo.supabase.co/auth/v1").unwrap();
        assert_eq!(normalized, "https://demo.supabase.co/auth/v1");
    }

    #[test]
    fn validate_phone_rejects_bad_numbers() {
        assert!(validate_phone("9876543210").is_ok());
        assert!(validate_phone(" 9876543210 ").is_ok());
        assert!(matches!(
            validate_phone("12345"),
            Err(AuthError::Validation(_))
        ));
    }

    #[test]
    fn format_phone_applies_country_prefix() {
        assert_eq!(format_phone("9876543210"), "+919876543210");
    }

    #[test]
    fn response_without_session_fields_yields_none() {
        let response = AuthApiResponse {
            access_token: None,
            refresh_token: None,
            expires_at: None,
            expires_in: None,
            user: None,
        };
        assert!(response.into_session().unwrap().is_none());
    }

    #[test]
    fn response_with_expires_in_derives_expiry() {
        let response = AuthApiResponse {
            access_token: Some("token".to_string()),
            refresh_token: Some("refresh".to_string()),
            expires_at: None,
            expires_in: Some(3600),
            user: Some(AuthApiUser {
                id: "user".to_string(),
                phone: Some("+919876543210".to_string()),
            }),
        };
        let session = response.into_session().unwrap().unwrap();
        assert!(session.expires_at > unix_timestamp_now());
        assert_eq!(session.user.phone.as_deref(), Some("+919876543210"));
    }

    #[test]
    fn session_debug_redacts_tokens() {
        let session = AuthSession {
            access_token: "secret-access-token".to_string(),
            refresh_token: "secret-refresh-token".to_string(),
            expires_at: 1_700_000_000,
            user: Identity {
                id: "user".to_string(),
                phone: None,
            },
        };
        let rendered = format!("{session:?}");
        assert!(!rendered.contains("secret-access-token"));
        assert!(!rendered.contains("secret-refresh-token"));
        assert!(rendered.contains("[REDACTED]"));
    }

    #[test]
    fn parse_api_error_prefers_structured_message() {
        let rendered = parse_api_error(
            StatusCode::BAD_REQUEST,
            r#"{"msg":"Token has expired or is invalid"}"#,
        );
        assert_eq!(rendered, "Token has expired or is invalid (400)");
    }

    #[test]
    fn parse_api_error_falls_back_to_body_text() {
        let rendered = parse_api_error(StatusCode::INTERNAL_SERVER_ERROR, "boom");
        assert_eq!(rendered, "boom (500)");
        let empty = parse_api_error(StatusCode::INTERNAL_SERVER_ERROR, "");
        assert_eq!(empty, "HTTP 500");
    }
}
