//! Intake of drive areas from a drawing surface.
//!
//! The drawing surface (a map editor in the browser, pasted GeoJSON or a
//! file in the terminal client) emits GeoJSON-shaped geometry. Only the
//! narrow subset needed here is modelled: polygon geometry, optionally wrapped
//! in a Feature, and the created / edited / deleted events.

use serde::Deserialize;

use super::errors::{DomainError, DomainResult};
use super::models::Polygon;

/// Geometry as emitted by the drawing surface, before coercion.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type")]
pub enum RawGeometry {
    Polygon { coordinates: Vec<Vec<Vec<f64>>> },
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
enum DrawnShape {
    Feature { geometry: RawGeometry },
    Geometry(RawGeometry),
}

impl RawGeometry {
    /// Parses either a bare geometry or a Feature wrapping one.
    ///
    /// # Examples
    ///
    /// ```
    /// use pawhub::domain::RawGeometry;
    ///
    /// let feature = r#"{"type":"Feature","properties":{},"geometry":
    ///     {"type":"Polygon","coordinates":[[[0,0],[1,0],[1,1],[0,0]]]}}"#;
    /// assert!(RawGeometry::from_json(feature).is_ok());
    /// assert!(RawGeometry::from_json(r#"{"type":"Point","coordinates":[0,0]}"#).is_err());
    /// ```
    pub fn from_json(input: &str) -> DomainResult<Self> {
        let shape: DrawnShape = serde_json::from_str(input).map_err(|_| {
            DomainError::InvalidGeometry(
                "expected a GeoJSON Polygon geometry or a Feature containing one".to_string(),
            )
        })?;
        Ok(match shape {
            DrawnShape::Feature { geometry } => geometry,
            DrawnShape::Geometry(geometry) => geometry,
        })
    }
}

/// Events raised by the drawing surface.
#[derive(Debug, Clone, PartialEq)]
pub enum DrawEvent {
    Created(RawGeometry),
    /// One entry per edited layer.
    Edited(Vec<RawGeometry>),
    Deleted,
}

/// Converts drawing surface output into the draft's polygon.
///
/// Holds no state: the single active polygon lives in the draft, and every
/// draw result replaces it wholesale.
pub struct AreaDefinition;

impl AreaDefinition {
    /// Coerces drawn geometry into a [`Polygon`]. Positions keep their
    /// longitude and latitude; extra dimensions are dropped and open rings
    /// are closed. No winding or self-intersection checks are made.
    pub fn on_polygon_drawn(raw: RawGeometry) -> DomainResult<Polygon> {
        let RawGeometry::Polygon { coordinates } = raw;

        let mut rings = Vec::with_capacity(coordinates.len());
        for ring in coordinates {
            let mut positions = Vec::with_capacity(ring.len());
            for position in ring {
                match position.as_slice() {
                    [lng, lat, ..] => positions.push([*lng, *lat]),
                    _ => {
                        return Err(DomainError::InvalidGeometry(
                            "position needs a longitude and a latitude".to_string(),
                        ));
                    }
                }
            }
            rings.push(positions);
        }

        Polygon::from_rings(rings)
    }

    pub fn on_polygon_deleted() -> Option<Polygon> {
        None
    }

    /// Resolves a drawing event to the polygon that should now be active.
    pub fn apply(event: DrawEvent) -> DomainResult<Option<Polygon>> {
        match event {
            DrawEvent::Created(raw) => Self::on_polygon_drawn(raw).map(Some),
            DrawEvent::Edited(layers) => match layers.into_iter().last() {
                Some(raw) => Self::on_polygon_drawn(raw).map(Some),
                None => Err(DomainError::InvalidGeometry(
                    "edit event carried no layers".to_string(),
                )),
            },
            DrawEvent::Deleted => Ok(Self::on_polygon_deleted()),
        }
    }
}
