//! Domain view of a processed upload.
//!
//! The engine normalizes the server's JSON into these types; nothing here knows
//! about the wire format.
use std::collections::BTreeMap;
use std::fmt;

use crate::text::{is_blank_name, title_case};

/// Aggregate counters for the global view.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Totals {
    pub total_services_crystal: u64,
    pub total_services_query: u64,
    pub num_professionals: u64,
    pub num_users: u64,
    pub services_by_category: Vec<(String, u64)>,
}

/// Precomputed sub-report for one professional or user.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct EntityReport {
    pub total_services: Option<u64>,
    pub total_users: Option<u64>,
    pub services_by_category: Vec<(String, u64)>,
    pub detailed_services: Vec<(String, u64)>,
    pub download_link: Option<String>,
    pub file_name: Option<String>,
}

/// How the Query export's users matched against Crystal.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct QueryValidation {
    pub total_users: u64,
    pub users_in_crystal: u64,
    pub users_only_in_query: u64,
    pub download_link: Option<String>,
    pub file_name: Option<String>,
}

/// Columns the server picked from the Crystal export.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnMapping {
    pub professional: String,
    pub service: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ProcessedReport {
    pub totals: Totals,
    pub professionals: Vec<String>,
    pub users: Vec<String>,
    pub professional_data: BTreeMap<String, EntityReport>,
    pub user_data: BTreeMap<String, EntityReport>,
    /// Shown by a search with nothing selected.
    pub query_validation: Option<QueryValidation>,
    /// Partial-failure message sent alongside otherwise valid data.
    pub warning: Option<String>,
    pub column_mapping: Option<ColumnMapping>,
}

impl ProcessedReport {
    /// Looks up a sub-report by its original (untransformed) key.
    pub fn entity(&self, kind: EntityKind, name: &str) -> Option<&EntityReport> {
        match kind {
            EntityKind::Professional => self.professional_data.get(name),
            EntityKind::User => self.user_data.get(name),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityKind {
    Professional,
    User,
}

impl EntityKind {
    /// Name of the export each dimension comes from.
    pub fn source_label(self) -> &'static str {
        match self {
            EntityKind::Professional => "Crystal",
            EntityKind::User => "Query",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntityKind::Professional => write!(f, "professional"),
            EntityKind::User => write!(f, "user"),
        }
    }
}

/// One option in a selection list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListEntry {
    pub key: String,
    pub display: String,
}

/// Builds a selection list: blanks and `nan` dropped, duplicates collapsed,
/// sorted case-insensitively by display name.
pub fn filter_list(names: &[String]) -> Vec<ListEntry> {
    let mut entries: Vec<ListEntry> = names
        .iter()
        .filter(|name| !is_blank_name(name))
        .map(|name| ListEntry {
            key: name.clone(),
            display: title_case(name),
        })
        .collect();
    entries.sort_by(|a, b| {
        a.display
            .to_lowercase()
            .cmp(&b.display.to_lowercase())
            .then_with(|| a.key.cmp(&b.key))
    });
    entries.dedup_by(|a, b| a.key == b.key);
    entries
}
