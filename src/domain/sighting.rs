//! Field sightings and the filter used when exporting them.

use serde::{Deserialize, Serialize};
use std::fmt;
use time::{format_description::well_known::Rfc3339, OffsetDateTime};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SightingStatus {
    Active,
    Sterilized,
    Resolved,
}

impl SightingStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            SightingStatus::Active => "active",
            SightingStatus::Sterilized => "sterilized",
            SightingStatus::Resolved => "resolved",
        }
    }
}

impl fmt::Display for SightingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub lat: f64,
    pub lng: f64,
}

/// An animal observation reported from the field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sighting {
    pub id: String,
    pub location: Location,
    /// RFC 3339 timestamp.
    pub timestamp: String,
    pub status: SightingStatus,
    #[serde(default)]
    pub reporter: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub species: Option<String>,
    #[serde(default)]
    pub mission_id: Option<String>,
}

impl Sighting {
    pub fn observed_at(&self) -> Option<OffsetDateTime> {
        OffsetDateTime::parse(&self.timestamp, &Rfc3339).ok()
    }
}

/// Criteria applied to sightings before export.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SightingFilter {
    pub from: Option<OffsetDateTime>,
    pub to: Option<OffsetDateTime>,
    /// Empty means every status.
    pub statuses: Vec<SightingStatus>,
    pub drive_id: Option<String>,
    pub search_query: Option<String>,
}

impl SightingFilter {
    pub fn matches(&self, sighting: &Sighting) -> bool {
        if !self.statuses.is_empty() && !self.statuses.contains(&sighting.status) {
            return false;
        }

        if self.from.is_some() || self.to.is_some() {
            let Some(observed) = sighting.observed_at() else {
                return false;
            };
            if self.from.is_some_and(|from| observed < from) {
                return false;
            }
            if self.to.is_some_and(|to| observed > to) {
                return false;
            }
        }

        if let Some(drive_id) = &self.drive_id {
            if sighting.mission_id.as_deref() != Some(drive_id.as_str()) {
                return false;
            }
        }

        if let Some(query) = self.search_query.as_deref().map(str::trim) {
            if !query.is_empty() {
                let needle = query.to_lowercase();
                let found = [&sighting.notes, &sighting.species, &sighting.reporter]
                    .into_iter()
                    .flatten()
                    .any(|text| text.to_lowercase().contains(&needle));
                if !found {
                    return false;
                }
            }
        }

        true
    }

    pub fn apply<'a>(&self, sightings: &'a [Sighting]) -> Vec<&'a Sighting> {
        sightings.iter().filter(|s| self.matches(s)).collect()
    }
}
