//! Crop model

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::ActivityCategory;

/// A unique identifier for a crop, using UUID v7 (time-sortable)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CropId(Uuid);

impl CropId {
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }

    #[must_use]
    pub fn as_str(&self) -> String {
        self.0.to_string()
    }
}

impl Default for CropId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for CropId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for CropId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

/// Growth stages in their natural order.
///
/// The ordering is advisory only; nothing prevents a crop from being set to
/// an earlier stage.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
#[serde(rename_all = "lowercase")]
pub enum GrowthStage {
    #[default]
    Sowing,
    Vegetative,
    Flowering,
    Fruiting,
    Harvesting,
}

impl GrowthStage {
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Sowing => "sowing",
            Self::Vegetative => "vegetative",
            Self::Flowering => "flowering",
            Self::Fruiting => "fruiting",
            Self::Harvesting => "harvesting",
        }
    }

    /// The next stage, or `None` from `Harvesting`.
    #[must_use]
    pub const fn next(&self) -> Option<Self> {
        match self {
            Self::Sowing => Some(Self::Vegetative),
            Self::Vegetative => Some(Self::Flowering),
            Self::Flowering => Some(Self::Fruiting),
            Self::Fruiting => Some(Self::Harvesting),
            Self::Harvesting => None,
        }
    }
}

impl fmt::Display for GrowthStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Summary of the most recent activity logged against a crop
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecentActivity {
    pub category: ActivityCategory,
    pub date: NaiveDate,
    pub quantity: Option<String>,
}

/// A crop belonging to a profile
///
/// Growth stage and progress are independently authored; progress is
/// validated for range only and never derived from the stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Crop {
    pub id: CropId,
    pub user_id: String,
    pub name: String,
    pub variety: String,
    pub sowing_date: NaiveDate,
    /// Cultivated area, unit implied
    pub area: f64,
    pub growth_stage: GrowthStage,
    pub expected_harvest: NaiveDate,
    /// Completion percentage, 0-100
    pub progress: u8,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recent_activity: Option<RecentActivity>,
    pub created_at: DateTime<Utc>,
}

impl Crop {
    /// Clamp-free range check for the progress percentage.
    #[must_use]
    pub const fn is_valid_progress(progress: u8) -> bool {
        progress <= 100
    }

    /// Record the most recent activity summary for this crop.
    pub fn note_activity(&mut self, summary: RecentActivity) {
        self.recent_activity = Some(summary);
    }
}
