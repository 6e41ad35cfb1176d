//! Crop store, remote-only.

use super::remote::CropApi;
use super::{StoreError, StoreResult};
use crate::models::{Crop, RecentActivity};

/// Remote-only store for a profile's crops.
///
/// Crops have no local fallback. Listing degrades to an empty list with a
/// warning so the rest of the app keeps working, but writes surface their
/// errors.
pub struct CropStore<R: CropApi> {
    remote: Option<R>,
}

impl<R: CropApi> CropStore<R> {
    pub const fn new(remote: Option<R>) -> Self {
        Self { remote }
    }

    /// List a profile's crops.
    ///
    /// Unconfigured and failing backends both yield an empty list; the
    /// failure is reported only through the log.
    pub async fn list_crops(&self, user_id: &str) -> Vec<Crop> {
        let Some(remote) = &self.remote else {
            return Vec::new();
        };

        match remote.list_crops(user_id).await {
            Ok(crops) => crops,
            Err(error) => {
                tracing::warn!("Failed to list crops, showing none: {error}");
                Vec::new()
            }
        }
    }

    /// Add a crop for a profile. The progress percentage must be 0-100.
    pub async fn add_crop(&self, crop: Crop) -> StoreResult<Crop> {
        if !Crop::is_valid_progress(crop.progress) {
            return Err(StoreError::Api(format!(
                "Crop progress must be between 0 and 100, got {}",
                crop.progress
            )));
        }

        let remote = self.remote.as_ref().ok_or(StoreError::NotConfigured)?;
        remote.insert_crop(&crop).await
    }

    /// Update the named crop's recent-activity summary after an activity is
    /// logged against it.
    ///
    /// Best effort: the activity itself is already stored, so a missing crop
    /// or a failure here is logged and swallowed.
    pub async fn record_recent_activity(
        &self,
        user_id: &str,
        crop_name: &str,
        summary: RecentActivity,
    ) {
        let Some(remote) = &self.remote else {
            return;
        };

        let crops = match remote.list_crops(user_id).await {
            Ok(crops) => crops,
            Err(error) => {
                tracing::warn!(crop_name, "Failed to look up crop for activity summary: {error}");
                return;
            }
        };

        let Some(crop) = crops
            .iter()
            .find(|crop| crop.name.eq_ignore_ascii_case(crop_name))
        else {
            return;
        };

        if let Err(error) = remote.update_crop_activity(&crop.id, &summary).await {
            tracing::warn!(crop_name, "Failed to update crop activity summary: {error}");
        }
    }
}
