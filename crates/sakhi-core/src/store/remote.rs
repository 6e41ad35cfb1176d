//! Supabase PostgREST client.

use chrono::Utc;
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::Deserialize;

use super::{StoreError, StoreResult};
use crate::config::RemoteConfig;
use crate::models::{ActivityLogEntry, Crop, CropId, ProfileRow, RecentActivity};
use crate::util::{compact_text, is_http_url};

const PROFILES_TABLE: &str = "user_profiles";
const ACTIVITIES_TABLE: &str = "activities";
const CROPS_TABLE: &str = "crops";

/// Remote profile operations.
#[allow(async_fn_in_trait)]
pub trait ProfileApi {
    async fn insert_profile(&self, row: ProfileRow) -> StoreResult<ProfileRow>;

    /// Fetch the profile for an identity. A verified identity without a
    /// profile row yields `StoreError::NotFound`, distinguishable from
    /// transport failures.
    async fn fetch_profile(&self, user_id: &str) -> StoreResult<ProfileRow>;

    async fn update_profile(&self, user_id: &str, row: ProfileRow) -> StoreResult<ProfileRow>;
}

/// Remote activity-log operations.
#[allow(async_fn_in_trait)]
pub trait ActivityApi {
    /// Insert an entry. The entry carries a client-generated id and the
    /// insert ignores duplicates, so outbox replay is idempotent.
    async fn insert_activity(&self, entry: &ActivityLogEntry) -> StoreResult<ActivityLogEntry>;

    /// List a profile's entries, date descending.
    async fn list_activities(&self, user_id: &str) -> StoreResult<Vec<ActivityLogEntry>>;
}

/// Remote crop operations.
#[allow(async_fn_in_trait)]
pub trait CropApi {
    async fn insert_crop(&self, crop: &Crop) -> StoreResult<Crop>;
    async fn list_crops(&self, user_id: &str) -> StoreResult<Vec<Crop>>;
    async fn update_crop_activity(
        &self,
        crop_id: &CropId,
        summary: &RecentActivity,
    ) -> StoreResult<()>;
}

/// PostgREST client for the Supabase data API.
#[derive(Clone)]
pub struct SupabaseRest {
    rest_url: String,
    anon_key: String,
    access_token: Option<String>,
    client: Client,
}

impl SupabaseRest {
    pub fn new(url: impl AsRef<str>, anon_key: impl Into<String>) -> StoreResult<Self> {
        let rest_url = normalize_rest_url(url.as_ref())?;
        let anon_key = anon_key.into().trim().to_string();
        if anon_key.is_empty() {
            return Err(StoreError::Api(
                "Supabase anon key must not be empty".to_string(),
            ));
        }

        Ok(Self {
            rest_url,
            anon_key,
            access_token: None,
            client: Client::builder().build()?,
        })
    }

    /// Build a client from optional remote configuration.
    ///
    /// Returns `None` when unconfigured; callers treat that as local-only
    /// mode, not as an error.
    pub fn from_config(config: &RemoteConfig) -> StoreResult<Option<Self>> {
        match config.credentials() {
            Some((url, key)) => Ok(Some(Self::new(url, key)?)),
            None => Ok(None),
        }
    }

    /// Authenticate data requests with a signed-in user's access token
    /// instead of the anon key.
    #[must_use]
    pub fn with_access_token(mut self, access_token: impl Into<String>) -> Self {
        self.access_token = Some(access_token.into());
        self
    }

    fn request(&self, method: reqwest::Method, table: &str) -> RequestBuilder {
        let bearer = self.access_token.as_deref().unwrap_or(&self.anon_key);
        self.client
            .request(method, format!("{}/{table}", self.rest_url))
            .header("apikey", &self.anon_key)
            .bearer_auth(bearer)
    }

    async fn check(&self, response: Response) -> StoreResult<Response> {
        if response.status().is_success() {
            return Ok(response);
        }

        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        Err(classify_api_error(status, &body))
    }
}

impl ProfileApi for SupabaseRest {
    async fn insert_profile(&self, row: ProfileRow) -> StoreResult<ProfileRow> {
        let response = self
            .request(reqwest::Method::POST, PROFILES_TABLE)
            .header("Prefer", "return=representation")
            .header("Accept", "application/vnd.pgrst.object+json")
            .json(&row)
            .send()
            .await?;

        let response = self.check(response).await?;
        Ok(response.json::<ProfileRow>().await?)
    }

    async fn fetch_profile(&self, user_id: &str) -> StoreResult<ProfileRow> {
        let response = self
            .request(reqwest::Method::GET, PROFILES_TABLE)
            .query(&[("user_id", format!("eq.{user_id}")), ("select", "*".into())])
            .header("Accept", "application/vnd.pgrst.object+json")
            .send()
            .await?;

        let response = self.check(response).await?;
        Ok(response.json::<ProfileRow>().await?)
    }

    async fn update_profile(&self, user_id: &str, row: ProfileRow) -> StoreResult<ProfileRow> {
        let mut payload = serde_json::to_value(&row)?;
        if let Some(object) = payload.as_object_mut() {
            object.remove("user_id");
            object.insert(
                "updated_at".to_string(),
                serde_json::to_value(Utc::now())?,
            );
        }

        let response = self
            .request(reqwest::Method::PATCH, PROFILES_TABLE)
            .query(&[("user_id", format!("eq.{user_id}"))])
            .header("Prefer", "return=representation")
            .header("Accept", "application/vnd.pgrst.object+json")
            .json(&payload)
            .send()
            .await?;

        let response = self.check(response).await?;
        Ok(response.json::<ProfileRow>().await?)
    }
}

impl ActivityApi for SupabaseRest {
    async fn insert_activity(&self, entry: &ActivityLogEntry) -> StoreResult<ActivityLogEntry> {
        let response = self
            .request(reqwest::Method::POST, ACTIVITIES_TABLE)
            .query(&[("on_conflict", "id")])
            .header("Prefer", "return=representation,resolution=ignore-duplicates")
            .json(entry)
            .send()
            .await?;

        let response = self.check(response).await?;
        let mut rows = response.json::<Vec<ActivityLogEntry>>().await?;

        // An empty representation means the row already existed and the
        // duplicate was ignored; the caller's entry is the stored state.
        Ok(rows.pop().unwrap_or_else(|| entry.clone()))
    }

    async fn list_activities(&self, user_id: &str) -> StoreResult<Vec<ActivityLogEntry>> {
        let response = self
            .request(reqwest::Method::GET, ACTIVITIES_TABLE)
            .query(&[
                ("user_id", format!("eq.{user_id}")),
                ("select", "*".to_string()),
                ("order", "date.desc,created_at.desc".to_string()),
            ])
            .send()
            .await?;

        let response = self.check(response).await?;
        Ok(response.json::<Vec<ActivityLogEntry>>().await?)
    }
}

impl CropApi for SupabaseRest {
    async fn insert_crop(&self, crop: &Crop) -> StoreResult<Crop> {
        let response = self
            .request(reqwest::Method::POST, CROPS_TABLE)
            .header("Prefer", "return=representation")
            .header("Accept", "application/vnd.pgrst.object+json")
            .json(crop)
            .send()
            .await?;

        let response = self.check(response).await?;
        Ok(response.json::<Crop>().await?)
    }

    async fn list_crops(&self, user_id: &str) -> StoreResult<Vec<Crop>> {
        let response = self
            .request(reqwest::Method::GET, CROPS_TABLE)
            .query(&[
                ("user_id", format!("eq.{user_id}")),
                ("select", "*".to_string()),
            ])
            .send()
            .await?;

        let response = self.check(response).await?;
        Ok(response.json::<Vec<Crop>>().await?)
    }

    async fn update_crop_activity(
        &self,
        crop_id: &CropId,
        summary: &RecentActivity,
    ) -> StoreResult<()> {
        let payload = serde_json::json!({ "recent_activity": summary });
        let response = self
            .request(reqwest::Method::PATCH, CROPS_TABLE)
            .query(&[("id", format!("eq.{crop_id}"))])
            .json(&payload)
            .send()
            .await?;

        self.check(response).await?;
        Ok(())
    }
}

fn normalize_rest_url(url: &str) -> StoreResult<String> {
    let trimmed = url.trim().trim_end_matches('/');
    if trimmed.is_empty() {
        return Err(StoreError::Api(
            "Supabase URL must not be empty".to_string(),
        ));
    }
    if !is_http_url(trimmed) {
        return Err(StoreError::Api(
            "Supabase URL must include http:// or https://".to_string(),
        ));
    }
    if trimmed.ends_with("/rest/v1") {
        Ok(trimmed.to_string())
    } else {
        Ok(format!("{trimmed}/rest/v1"))
    }
}

#[derive(Debug, Deserialize)]
struct PostgrestErrorBody {
    code: Option<String>,
    message: Option<String>,
    details: Option<String>,
}

/// Classify a failed PostgREST response into a structured error kind.
///
/// Classification uses the SQLSTATE/PostgREST `code` field, never message
/// text: `PGRST116` (single-object miss) maps to `NotFound`, known schema
/// and data mismatch codes map to `Schema`, everything else surfaces as
/// `Api`.
pub(crate) fn classify_api_error(status: StatusCode, body: &str) -> StoreError {
    if let Ok(payload) = serde_json::from_str::<PostgrestErrorBody>(body) {
        let message = payload
            .message
            .or(payload.details)
            .map_or_else(|| format!("HTTP {}", status.as_u16()), |text| text.trim().to_string());

        if let Some(code) = payload.code.as_deref() {
            if code == "PGRST116" {
                return StoreError::NotFound;
            }
            if is_schema_mismatch_code(code) {
                return StoreError::Schema(format!("{message} ({code})"));
            }
        }

        return StoreError::Api(format!("{} ({})", message, status.as_u16()));
    }

    if status == StatusCode::NOT_FOUND || status == StatusCode::NOT_ACCEPTABLE {
        return StoreError::NotFound;
    }

    let trimmed = body.trim();
    if trimmed.is_empty() {
        StoreError::Api(format!("HTTP {}", status.as_u16()))
    } else {
        StoreError::Api(format!("{} ({})", compact_text(trimmed), status.as_u16()))
    }
}

/// Codes that mean the remote table disagrees with our row shape, so a
/// local fallback can stand in. Class 42 is not matched wholesale: it also
/// holds `42501` (insufficient privilege), the code row-level security
/// rejections come back with, and those must surface to the caller.
fn is_schema_mismatch_code(code: &str) -> bool {
    code.starts_with("22")
        || matches!(code, "42703" | "42P01" | "42P02" | "42883" | "PGRST204")
}
