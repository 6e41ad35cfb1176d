//! Farm activity log model

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A unique identifier for an activity log entry, using UUID v7 (time-sortable)
///
/// Generated client-side so that inserts replayed from the outbox carry the
/// same key and can be deduplicated by the remote store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EntryId(Uuid);

impl EntryId {
    /// Create a new unique entry ID using UUID v7
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }

    /// Get the string representation of this ID
    #[must_use]
    pub fn as_str(&self) -> String {
        self.0.to_string()
    }
}

impl Default for EntryId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for EntryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for EntryId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

/// Fixed vocabulary of loggable farm activities
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActivityCategory {
    Irrigation,
    Fertilizer,
    Pesticide,
    Weeding,
    Mulching,
    Harvest,
    Sowing,
}

impl ActivityCategory {
    /// All categories, in display order
    pub const ALL: [Self; 7] = [
        Self::Irrigation,
        Self::Fertilizer,
        Self::Pesticide,
        Self::Weeding,
        Self::Mulching,
        Self::Harvest,
        Self::Sowing,
    ];

    /// Lowercase label, as stored and shown in filters
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Irrigation => "irrigation",
            Self::Fertilizer => "fertilizer",
            Self::Pesticide => "pesticide",
            Self::Weeding => "weeding",
            Self::Mulching => "mulching",
            Self::Harvest => "harvest",
            Self::Sowing => "sowing",
        }
    }
}

impl fmt::Display for ActivityCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for ActivityCategory {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_lowercase();
        Self::ALL
            .into_iter()
            .find(|category| category.label() == normalized)
            .ok_or_else(|| format!("Unknown activity category: {s}"))
    }
}

/// An immutable farm activity log entry
///
/// The crop is referenced by its free-text label rather than a foreign key;
/// serde field names match the remote `activities` table columns so the same
/// representation serves the wire and the local fallback blob.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActivityLogEntry {
    /// Unique identifier
    pub id: EntryId,
    /// Owning profile's identity id
    pub user_id: String,
    /// Crop label this activity was logged against
    #[serde(rename = "crop_type")]
    pub crop: String,
    /// Activity category
    #[serde(rename = "activity_type")]
    pub category: ActivityCategory,
    /// Free-text description
    pub description: String,
    /// Quantity with unit, e.g. "20 liters"
    pub quantity: Option<String>,
    /// Day the activity took place
    pub date: NaiveDate,
    /// Optional notes
    pub notes: Option<String>,
    /// Creation timestamp
    pub created_at: DateTime<Utc>,
}

impl ActivityLogEntry {
    /// Materialize a draft into an entry with a fresh id and timestamp.
    #[must_use]
    pub fn from_draft(user_id: impl Into<String>, draft: ActivityDraft) -> Self {
        let quantity = draft.quantity_with_unit();
        Self {
            id: EntryId::new(),
            user_id: user_id.into(),
            crop: draft.crop,
            category: draft.category,
            description: draft.description,
            quantity,
            date: draft.date,
            notes: draft.notes,
            created_at: Utc::now(),
        }
    }
}

/// Caller-supplied fields for a new activity log entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActivityDraft {
    pub crop: String,
    pub category: ActivityCategory,
    pub description: String,
    pub quantity: Option<String>,
    pub unit: Option<String>,
    pub date: NaiveDate,
    pub notes: Option<String>,
}

impl ActivityDraft {
    /// Join quantity and unit into the stored "20 liters" form.
    #[must_use]
    pub fn quantity_with_unit(&self) -> Option<String> {
        match (self.quantity.as_deref(), self.unit.as_deref()) {
            (Some(quantity), Some(unit)) => Some(format!("{quantity} {unit}")),
            (Some(quantity), None) => Some(quantity.to_string()),
            (None, _) => None,
        }
    }
}

/// Sort entries for display: date descending, ties broken by creation
/// timestamp descending (most recently inserted first).
pub fn sort_for_display(entries: &mut [ActivityLogEntry]) {
    entries.sort_by(|a, b| {
        b.date
            .cmp(&a.date)
            .then_with(|| b.created_at.cmp(&a.created_at))
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    fn draft(category: ActivityCategory, date: NaiveDate) -> ActivityDraft {
        ActivityDraft {
            crop: "Rice".to_string(),
            category,
            description: "Test".to_string(),
            quantity: Some("5".to_string()),
            unit: Some("liters".to_string()),
            date,
            notes: None,
        }
    }

    #[test]
    fn test_entry_id_unique() {
        let id1 = EntryId::new();
        let id2 = EntryId::new();
        assert_ne!(id1, id2);
    }

    #[test]
    fn test_entry_id_parse() {
        let id = EntryId::new();
        let parsed: EntryId = id.as_str().parse().unwrap();
        assert_eq!(id, parsed);
    }

    #[test]
    fn test_category_round_trip() {
        for category in ActivityCategory::ALL {
            let parsed: ActivityCategory = category.label().parse().unwrap();
            assert_eq!(parsed, category);
        }
        assert!("ploughing".parse::<ActivityCategory>().is_err());
    }

    #[test]
    fn test_category_parse_case_insensitive() {
        let parsed: ActivityCategory = " Irrigation ".parse().unwrap();
        assert_eq!(parsed, ActivityCategory::Irrigation);
    }

    #[test]
    fn test_quantity_with_unit() {
        let date = NaiveDate::from_ymd_opt(2025, 6, 1).unwrap();
        assert_eq!(
            draft(ActivityCategory::Irrigation, date).quantity_with_unit(),
            Some("5 liters".to_string())
        );

        let mut no_unit = draft(ActivityCategory::Irrigation, date);
        no_unit.unit = None;
        assert_eq!(no_unit.quantity_with_unit(), Some("5".to_string()));

        let mut no_quantity = draft(ActivityCategory::Irrigation, date);
        no_quantity.quantity = None;
        assert_eq!(no_quantity.quantity_with_unit(), None);
    }

    #[test]
    fn test_from_draft_synthesizes_id_and_timestamp() {
        let date = NaiveDate::from_ymd_opt(2025, 6, 1).unwrap();
        let entry =
            ActivityLogEntry::from_draft("user-1", draft(ActivityCategory::Harvest, date));

        assert_eq!(entry.user_id, "user-1");
        assert_eq!(entry.date, date);
        assert_eq!(entry.quantity.as_deref(), Some("5 liters"));
        assert!(entry.created_at <= Utc::now());
    }

    #[test]
    fn test_sort_for_display_date_desc_then_insertion() {
        let day1 = NaiveDate::from_ymd_opt(2025, 6, 1).unwrap();
        let day2 = NaiveDate::from_ymd_opt(2025, 6, 2).unwrap();

        let older = ActivityLogEntry::from_draft("u", draft(ActivityCategory::Weeding, day2));
        std::thread::sleep(std::time::Duration::from_millis(2));
        let newer = ActivityLogEntry::from_draft("u", draft(ActivityCategory::Weeding, day2));
        let earlier_day = ActivityLogEntry::from_draft("u", draft(ActivityCategory::Weeding, day1));

        let mut entries = vec![older.clone(), earlier_day.clone(), newer.clone()];
        sort_for_display(&mut entries);

        assert_eq!(entries[0].id, newer.id);
        assert_eq!(entries[1].id, older.id);
        assert_eq!(entries[2].id, earlier_day.id);
    }

    #[test]
    fn test_entry_serde_uses_table_column_names() {
        let date = NaiveDate::from_ymd_opt(2025, 6, 1).unwrap();
        let entry = ActivityLogEntry::from_draft("u", draft(ActivityCategory::Mulching, date));

        let json = serde_json::to_value(&entry).unwrap();
        assert_eq!(json["crop_type"], "Rice");
        assert_eq!(json["activity_type"], "mulching");

        let back: ActivityLogEntry = serde_json::from_value(json).unwrap();
        assert_eq!(back, entry);
    }
}
