use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

use super::errors::{DomainError, DomainResult};

/// The three screens of the drive creation wizard, in order.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum WizardStep {
    #[default]
    Details,
    Area,
    Review,
}

impl WizardStep {
    pub const ALL: [WizardStep; 3] = [WizardStep::Details, WizardStep::Area, WizardStep::Review];

    pub fn index(self) -> usize {
        match self {
            WizardStep::Details => 0,
            WizardStep::Area => 1,
            WizardStep::Review => 2,
        }
    }

    pub fn next(self) -> Option<WizardStep> {
        match self {
            WizardStep::Details => Some(WizardStep::Area),
            WizardStep::Area => Some(WizardStep::Review),
            WizardStep::Review => None,
        }
    }

    pub fn previous(self) -> Option<WizardStep> {
        match self {
            WizardStep::Details => None,
            WizardStep::Area => Some(WizardStep::Details),
            WizardStep::Review => Some(WizardStep::Area),
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            WizardStep::Details => "Details",
            WizardStep::Area => "Area",
            WizardStep::Review => "Review",
        }
    }

    /// Editable fields shown on this step.
    pub fn fields(self) -> &'static [DriveField] {
        match self {
            WizardStep::Details => &[
                DriveField::Title,
                DriveField::Description,
                DriveField::Date,
                DriveField::RangeKm,
                DriveField::City,
                DriveField::Area,
                DriveField::CommunityForming,
            ],
            WizardStep::Area => &[DriveField::Center, DriveField::Polygon],
            WizardStep::Review => &[],
        }
    }
}

/// Names of the draft fields, used as keys for validation errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DriveField {
    Title,
    Description,
    Date,
    RangeKm,
    City,
    Area,
    Center,
    CommunityForming,
    Polygon,
}

impl DriveField {
    pub fn as_str(self) -> &'static str {
        match self {
            DriveField::Title => "title",
            DriveField::Description => "description",
            DriveField::Date => "date",
            DriveField::RangeKm => "range_km",
            DriveField::City => "city",
            DriveField::Area => "area",
            DriveField::Center => "center",
            DriveField::CommunityForming => "community_forming",
            DriveField::Polygon => "polygon",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            DriveField::Title => "Drive Title",
            DriveField::Description => "Description",
            DriveField::Date => "Date (YYYY-MM-DD)",
            DriveField::RangeKm => "Range (km)",
            DriveField::City => "City",
            DriveField::Area => "Area / Ward",
            DriveField::Center => "Map Center (lat,lng)",
            DriveField::CommunityForming => "Community Forming",
            DriveField::Polygon => "Drive Area (GeoJSON or @file)",
        }
    }
}

impl fmt::Display for DriveField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Center {
    pub lat: f64,
    pub lng: f64,
}

impl Center {
    /// Parses a `lat,lng` pair as typed into the center field.
    ///
    /// # Examples
    ///
    /// ```
    /// use pawhub::domain::Center;
    ///
    /// let center = Center::parse("19.06, 72.83").unwrap();
    /// assert_eq!(center, Center { lat: 19.06, lng: 72.83 });
    /// assert!(Center::parse("95,0").is_err());
    /// ```
    pub fn parse(input: &str) -> DomainResult<Self> {
        let invalid = |message: &str| DomainError::invalid_input(DriveField::Center, message);

        let (lat, lng) = input
            .split_once(',')
            .ok_or_else(|| invalid("expected `lat,lng`"))?;
        let lat: f64 = lat.trim().parse().map_err(|_| invalid("latitude is not a number"))?;
        let lng: f64 = lng.trim().parse().map_err(|_| invalid("longitude is not a number"))?;

        if !(-90.0..=90.0).contains(&lat) {
            return Err(invalid("latitude must be between -90 and 90"));
        }
        if !(-180.0..=180.0).contains(&lng) {
            return Err(invalid("longitude must be between -180 and 180"));
        }
        Ok(Center { lat, lng })
    }
}

impl fmt::Display for Center {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{}", self.lat, self.lng)
    }
}

/// Parses the optional range field. Empty input clears the range.
pub fn parse_range_km(input: &str) -> DomainResult<Option<f64>> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }
    let value: f64 = trimmed
        .parse()
        .map_err(|_| DomainError::invalid_input(DriveField::RangeKm, "not a number"))?;
    check_range_km(value).map(Some)
}

/// A range is a finite, non-negative distance.
pub fn check_range_km(value: f64) -> DomainResult<f64> {
    if !value.is_finite() || value < 0.0 {
        return Err(DomainError::invalid_input(
            DriveField::RangeKm,
            "must be zero or greater",
        ));
    }
    Ok(value)
}

fn deserialize_range_km<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    Option::<f64>::deserialize(deserializer)?
        .map(check_range_km)
        .transpose()
        .map_err(serde::de::Error::custom)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
enum GeometryKind {
    Polygon,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct PolygonRepr {
    #[serde(rename = "type")]
    kind: GeometryKind,
    coordinates: Vec<Vec<[f64; 2]>>,
}

/// A GeoJSON polygon whose rings are always closed.
///
/// Positions are `[lng, lat]`. The only way to build one is through
/// [`Polygon::from_rings`] (or deserialization, which goes through it), so an
/// open ring can never be observed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(into = "PolygonRepr", try_from = "PolygonRepr")]
pub struct Polygon {
    rings: Vec<Vec<[f64; 2]>>,
}

impl Polygon {
    /// Builds a polygon, appending the first position to any ring that does not
    /// already end with it.
    ///
    /// # Examples
    ///
    /// ```
    /// use pawhub::domain::Polygon;
    ///
    /// let polygon = Polygon::from_rings(vec![vec![
    ///     [72.82, 19.05],
    ///     [72.84, 19.05],
    ///     [72.84, 19.07],
    /// ]])
    /// .unwrap();
    /// let ring = &polygon.coordinates()[0];
    /// assert_eq!(ring.first(), ring.last());
    /// assert_eq!(ring.len(), 4);
    /// ```
    pub fn from_rings(rings: Vec<Vec<[f64; 2]>>) -> DomainResult<Self> {
        if rings.is_empty() {
            return Err(DomainError::EmptyRing);
        }
        let mut closed = Vec::with_capacity(rings.len());
        for mut ring in rings {
            let first = *ring.first().ok_or(DomainError::EmptyRing)?;
            if ring.last() != Some(&first) {
                ring.push(first);
            }
            closed.push(ring);
        }
        Ok(Polygon { rings: closed })
    }

    pub fn coordinates(&self) -> &[Vec<[f64; 2]>] {
        &self.rings
    }

    pub fn outer_ring(&self) -> &[[f64; 2]] {
        &self.rings[0]
    }

    /// Number of distinct vertices of the outer ring.
    pub fn vertex_count(&self) -> usize {
        self.outer_ring().len().saturating_sub(1).max(1)
    }

    /// Approximate surface of the polygon in square kilometres, holes excluded.
    ///
    /// Each ring is projected onto a plane tangent at its mean latitude, which
    /// is accurate enough for neighbourhood-sized drive areas.
    pub fn area_km2(&self) -> f64 {
        let mut rings = self.rings.iter().map(|ring| ring_area_km2(ring));
        let outer = rings.next().unwrap_or(0.0);
        (outer - rings.sum::<f64>()).max(0.0)
    }

    /// `(min_lng, min_lat, max_lng, max_lat)` of the outer ring.
    pub fn bounds(&self) -> (f64, f64, f64, f64) {
        self.outer_ring().iter().fold(
            (f64::INFINITY, f64::INFINITY, f64::NEG_INFINITY, f64::NEG_INFINITY),
            |(min_x, min_y, max_x, max_y), [x, y]| {
                (min_x.min(*x), min_y.min(*y), max_x.max(*x), max_y.max(*y))
            },
        )
    }
}

const EARTH_RADIUS_KM: f64 = 6371.0088;

fn ring_area_km2(ring: &[[f64; 2]]) -> f64 {
    if ring.len() < 4 {
        return 0.0;
    }
    let mean_lat = ring.iter().map(|[_, lat]| lat).sum::<f64>() / ring.len() as f64;
    let kx = EARTH_RADIUS_KM * mean_lat.to_radians().cos();
    let project = |[lng, lat]: [f64; 2]| (kx * lng.to_radians(), EARTH_RADIUS_KM * lat.to_radians());

    let twice_area: f64 = ring
        .windows(2)
        .map(|pair| {
            let (x1, y1) = project(pair[0]);
            let (x2, y2) = project(pair[1]);
            x1 * y2 - x2 * y1
        })
        .sum();
    twice_area.abs() / 2.0
}

impl From<Polygon> for PolygonRepr {
    fn from(polygon: Polygon) -> Self {
        PolygonRepr {
            kind: GeometryKind::Polygon,
            coordinates: polygon.rings,
        }
    }
}

impl TryFrom<PolygonRepr> for Polygon {
    type Error = DomainError;

    fn try_from(repr: PolygonRepr) -> Result<Self, Self::Error> {
        Polygon::from_rings(repr.coordinates)
    }
}

/// The in-progress drive record edited by the wizard.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DriveDraft {
    pub title: String,
    pub description: String,
    pub date: String,
    #[serde(deserialize_with = "deserialize_range_km")]
    pub range_km: Option<f64>,
    pub city: String,
    pub area: String,
    pub center: Option<Center>,
    pub community_forming: bool,
    pub polygon: Option<Polygon>,
}

impl DriveDraft {
    /// Renders a field's current value for display or as the initial edit buffer.
    pub fn field_text(&self, field: DriveField) -> String {
        match field {
            DriveField::Title => self.title.clone(),
            DriveField::Description => self.description.clone(),
            DriveField::Date => self.date.clone(),
            DriveField::RangeKm => self.range_km.map(|r| r.to_string()).unwrap_or_default(),
            DriveField::City => self.city.clone(),
            DriveField::Area => self.area.clone(),
            DriveField::Center => self.center.map(|c| c.to_string()).unwrap_or_default(),
            DriveField::CommunityForming => {
                (if self.community_forming { "yes" } else { "no" }).to_string()
            }
            DriveField::Polygon => self
                .polygon
                .as_ref()
                .map(|p| format!("{} vertices", p.vertex_count()))
                .unwrap_or_default(),
        }
    }
}

/// A partial update of a [`DriveDraft`]. `None` means "not touched".
///
/// Nullable draft fields use a nested option: `Some(None)` clears the value.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DriveDraftPatch {
    pub title: Option<String>,
    pub description: Option<String>,
    pub date: Option<String>,
    pub range_km: Option<Option<f64>>,
    pub city: Option<String>,
    pub area: Option<String>,
    pub center: Option<Option<Center>>,
    pub community_forming: Option<bool>,
    pub polygon: Option<Option<Polygon>>,
}

impl DriveDraftPatch {
    /// Builds a patch that sets a text field from raw input.
    ///
    /// Only the plain string fields are accepted here; typed fields have their
    /// own parsers.
    pub fn text(field: DriveField, value: impl Into<String>) -> DomainResult<Self> {
        let value = value.into();
        let mut patch = DriveDraftPatch::default();
        match field {
            DriveField::Title => patch.title = Some(value),
            DriveField::Description => patch.description = Some(value),
            DriveField::Date => patch.date = Some(value),
            DriveField::City => patch.city = Some(value),
            DriveField::Area => patch.area = Some(value),
            other => {
                return Err(DomainError::invalid_input(other, "not a text field"));
            }
        }
        Ok(patch)
    }

    pub fn range_km(value: Option<f64>) -> Self {
        DriveDraftPatch {
            range_km: Some(value),
            ..Default::default()
        }
    }

    pub fn center(value: Option<Center>) -> Self {
        DriveDraftPatch {
            center: Some(value),
            ..Default::default()
        }
    }

    pub fn community_forming(value: bool) -> Self {
        DriveDraftPatch {
            community_forming: Some(value),
            ..Default::default()
        }
    }

    pub fn polygon(value: Option<Polygon>) -> Self {
        DriveDraftPatch {
            polygon: Some(value),
            ..Default::default()
        }
    }

    /// Fields this patch touches.
    pub fn fields(&self) -> Vec<DriveField> {
        let mut fields = Vec::new();
        if self.title.is_some() {
            fields.push(DriveField::Title);
        }
        if self.description.is_some() {
            fields.push(DriveField::Description);
        }
        if self.date.is_some() {
            fields.push(DriveField::Date);
        }
        if self.range_km.is_some() {
            fields.push(DriveField::RangeKm);
        }
        if self.city.is_some() {
            fields.push(DriveField::City);
        }
        if self.area.is_some() {
            fields.push(DriveField::Area);
        }
        if self.center.is_some() {
            fields.push(DriveField::Center);
        }
        if self.community_forming.is_some() {
            fields.push(DriveField::CommunityForming);
        }
        if self.polygon.is_some() {
            fields.push(DriveField::Polygon);
        }
        fields
    }

    pub fn apply_to(self, draft: &mut DriveDraft) {
        if let Some(title) = self.title {
            draft.title = title;
        }
        if let Some(description) = self.description {
            draft.description = description;
        }
        if let Some(date) = self.date {
            draft.date = date;
        }
        if let Some(range_km) = self.range_km {
            draft.range_km = range_km;
        }
        if let Some(city) = self.city {
            draft.city = city;
        }
        if let Some(area) = self.area {
            draft.area = area;
        }
        if let Some(center) = self.center {
            draft.center = center;
        }
        if let Some(community_forming) = self.community_forming {
            draft.community_forming = community_forming;
        }
        if let Some(polygon) = self.polygon {
            draft.polygon = polygon;
        }
    }
}

/// Wire body of the drive creation endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DrivePayload {
    pub title: String,
    pub description: String,
    pub date: String,
    pub range_km: Option<f64>,
    pub city: String,
    pub area: String,
    pub center: Center,
    pub community_forming: bool,
    pub polygon: Polygon,
}

/// A created drive as returned by a repository.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Drive {
    pub id: String,
    #[serde(flatten)]
    pub details: DrivePayload,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
}

impl Drive {
    /// Path of the detail view for this drive.
    pub fn route(&self) -> String {
        drive_route(&self.id)
    }
}

pub fn drive_route(id: &str) -> String {
    format!("/drives/{}", id)
}
