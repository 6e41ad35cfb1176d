//! Activity filtering, summary counts, and date display.
//!
//! Everything here is pure and synchronous; callers pass today's date in so
//! results are reproducible.

use chrono::{Datelike, NaiveDate};

use crate::models::{ActivityCategory, ActivityLogEntry};

/// Category filter applied alongside the search term.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CategoryFilter {
    #[default]
    All,
    Only(ActivityCategory),
}

impl CategoryFilter {
    #[must_use]
    pub fn allows(&self, category: ActivityCategory) -> bool {
        match self {
            Self::All => true,
            Self::Only(selected) => *selected == category,
        }
    }
}

/// Whether an entry matches a search term and category filter.
///
/// The term matches case-insensitively against the description or the
/// category label; an empty term matches everything.
#[must_use]
pub fn matches(entry: &ActivityLogEntry, term: &str, filter: CategoryFilter) -> bool {
    if !filter.allows(entry.category) {
        return false;
    }

    let term = term.trim().to_lowercase();
    if term.is_empty() {
        return true;
    }

    entry.description.to_lowercase().contains(&term)
        || entry.category.label().to_lowercase().contains(&term)
}

/// Entries matching a search term and category filter, in input order.
#[must_use]
pub fn filter_entries<'a>(
    entries: &'a [ActivityLogEntry],
    term: &str,
    filter: CategoryFilter,
) -> Vec<&'a ActivityLogEntry> {
    entries
        .iter()
        .filter(|entry| matches(entry, term, filter))
        .collect()
}

/// Entries dated within the last seven calendar days, today included.
///
/// Future-dated entries deliberately never count: a plain day-difference
/// bound would let a mis-dated entry inflate the weekly figure.
#[must_use]
pub fn this_week_count(entries: &[ActivityLogEntry], today: NaiveDate) -> usize {
    entries
        .iter()
        .filter(|entry| (0..=7).contains(&(today - entry.date).num_days()))
        .count()
}

/// Entries dated in the same calendar month and year as `today`.
#[must_use]
pub fn this_month_count(entries: &[ActivityLogEntry], today: NaiveDate) -> usize {
    entries
        .iter()
        .filter(|entry| entry.date.month() == today.month() && entry.date.year() == today.year())
        .count()
}

/// Total entries in the given category.
#[must_use]
pub fn category_count(entries: &[ActivityLogEntry], category: ActivityCategory) -> usize {
    entries
        .iter()
        .filter(|entry| entry.category == category)
        .count()
}

/// Render an entry date relative to `today`.
///
/// `Today`, `Yesterday`, `N days ago` within a week, otherwise the full
/// date as `5 Jun 2025`.
#[must_use]
pub fn format_entry_date(date: NaiveDate, today: NaiveDate) -> String {
    match (today - date).num_days() {
        0 => "Today".to_string(),
        1 => "Yesterday".to_string(),
        days @ 2..=6 => format!("{days} days ago"),
        _ => date.format("%-d %b %Y").to_string(),
    }
}
