//! User profile model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Preferred interface language
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    #[default]
    En,
    Ml,
}

impl Language {
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::En => "en",
            Self::Ml => "ml",
        }
    }
}

/// Where the farmer lives
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Location {
    pub state: String,
    pub district: String,
    pub village: String,
}

/// Farm characteristics collected at registration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FarmDetails {
    /// Land size bucket, e.g. "1-2 acres"
    pub land_size: String,
    pub soil_type: String,
    pub irrigation_type: String,
    /// Crop names grown on the farm
    pub crops: Vec<String>,
}

/// A farmer's profile, one-to-one with an authenticated identity
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    /// The identity this profile belongs to
    pub user_id: String,
    pub name: String,
    pub phone: String,
    pub location: Location,
    pub farm: FarmDetails,
    pub language: Language,
    pub created_at: DateTime<Utc>,
}

/// Fields collected during registration, before the profile row exists
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileDraft {
    pub name: String,
    pub phone: String,
    pub location: Location,
    pub farm: FarmDetails,
    pub language: Language,
}

/// Storage representation of a profile, matching the `user_profiles` table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileRow {
    /// Row id, assigned by the remote store
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub user_id: String,
    pub name: String,
    pub phone: String,
    pub state: String,
    pub district: String,
    pub village: String,
    pub land_size: String,
    pub soil_type: String,
    pub irrigation_type: String,
    pub crops: Vec<String>,
    pub language: Language,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl ProfileRow {
    /// Build an insert row from a draft for the given identity.
    #[must_use]
    pub fn from_draft(user_id: impl Into<String>, draft: ProfileDraft) -> Self {
        Self {
            id: None,
            user_id: user_id.into(),
            name: draft.name,
            phone: draft.phone,
            state: draft.location.state,
            district: draft.location.district,
            village: draft.location.village,
            land_size: draft.farm.land_size,
            soil_type: draft.farm.soil_type,
            irrigation_type: draft.farm.irrigation_type,
            crops: draft.farm.crops,
            language: draft.language,
            created_at: None,
            updated_at: None,
        }
    }

    /// Convert the storage row into the UI-facing profile model.
    #[must_use]
    pub fn into_profile(self) -> Profile {
        Profile {
            user_id: self.user_id,
            name: self.name,
            phone: self.phone,
            location: Location {
                state: self.state,
                district: self.district,
                village: self.village,
            },
            farm: FarmDetails {
                land_size: self.land_size,
                soil_type: self.soil_type,
                irrigation_type: self.irrigation_type,
                crops: self.crops,
            },
            language: self.language,
            created_at: self.created_at.unwrap_or_else(Utc::now),
        }
    }
}
