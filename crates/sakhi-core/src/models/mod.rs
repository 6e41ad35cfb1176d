//! Data models for Krishi Sakhi

mod activity;
mod crop;
mod profile;

pub use activity::{sort_for_display, ActivityCategory, ActivityDraft, ActivityLogEntry, EntryId};
pub use crop::{Crop, CropId, GrowthStage, RecentActivity};
pub use profile::{FarmDetails, Language, Location, Profile, ProfileDraft, ProfileRow};
