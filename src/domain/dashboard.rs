use serde::{Deserialize, Serialize};

use super::models::Drive;

/// Headline numbers of a running drive.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct DriveKpis {
    pub animals_covered: u64,
    pub tagged_sterilized: u64,
    pub area_coverage_km2: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DriveVolunteer {
    pub id: u64,
    pub name: String,
    #[serde(default)]
    pub points: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar_url: Option<String>,
}

/// What the detail view of `/drives/{id}` shows: the drive itself, its KPIs
/// and the volunteers signed up for it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DriveDashboard {
    pub mission_details: Drive,
    #[serde(default)]
    pub kpis: DriveKpis,
    #[serde(default)]
    pub volunteers: Vec<DriveVolunteer>,
}

impl DriveDashboard {
    /// Dashboard of a drive nobody has worked on yet: no animals, no
    /// volunteers, and the full polygon as the covered area.
    pub fn for_new_drive(drive: Drive) -> Self {
        let kpis = DriveKpis {
            area_coverage_km2: drive.details.polygon.area_km2(),
            ..DriveKpis::default()
        };
        Self {
            mission_details: drive,
            kpis,
            volunteers: Vec::new(),
        }
    }

    /// Volunteers ordered by points, best first.
    pub fn leaderboard(&self) -> Vec<&DriveVolunteer> {
        let mut volunteers: Vec<&DriveVolunteer> = self.volunteers.iter().collect();
        volunteers.sort_by(|a, b| b.points.cmp(&a.points).then_with(|| a.name.cmp(&b.name)));
        volunteers
    }
}
