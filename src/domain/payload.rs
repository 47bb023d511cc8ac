use super::errors::{DomainError, DomainResult};
use super::models::{DriveDraft, DriveField, DrivePayload};

/// Assembles the creation payload from a draft that has cleared the area step.
///
/// Text fields are trimmed; everything else is copied as is. A missing
/// center or polygon means the caller skipped the step gate, which is a bug
/// rather than a user mistake, and is reported as
/// [`DomainError::IncompleteDraft`].
///
/// # Examples
///
/// ```
/// use pawhub::domain::{to_payload, Center, DriveDraft, Polygon};
///
/// let draft = DriveDraft {
///     title: "  Bandra drive ".to_string(),
///     date: "2025-09-01".to_string(),
///     city: "Mumbai".to_string(),
///     area: "Bandra".to_string(),
///     center: Some(Center { lat: 19.06, lng: 72.83 }),
///     polygon: Some(Polygon::from_rings(vec![vec![[0.0, 0.0], [1.0, 0.0], [1.0, 1.0]]]).unwrap()),
///     ..Default::default()
/// };
/// let payload = to_payload(&draft).unwrap();
/// assert_eq!(payload.title, "Bandra drive");
/// ```
pub fn to_payload(draft: &DriveDraft) -> DomainResult<DrivePayload> {
    let center = draft
        .center
        .ok_or(DomainError::IncompleteDraft(DriveField::Center))?;
    let polygon = draft
        .polygon
        .clone()
        .ok_or(DomainError::IncompleteDraft(DriveField::Polygon))?;

    Ok(DrivePayload {
        title: draft.title.trim().to_string(),
        description: draft.description.trim().to_string(),
        date: draft.date.clone(),
        range_km: draft.range_km,
        city: draft.city.trim().to_string(),
        area: draft.area.trim().to_string(),
        center,
        community_forming: draft.community_forming,
        polygon,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{AreaDefinition, Center, RawGeometry};

    fn complete_draft() -> DriveDraft {
        DriveDraft {
            title: "  Bandra drive  ".to_string(),
            description: "\nEvening round\t".to_string(),
            date: "2025-09-01".to_string(),
            range_km: Some(2.5),
            city: " Mumbai".to_string(),
            area: "Bandra ".to_string(),
            center: Some(Center { lat: 19.06, lng: 72.83 }),
            community_forming: true,
            polygon: Some(
                AreaDefinition::on_polygon_drawn(RawGeometry::Polygon {
                    coordinates: vec![vec![
                        vec![72.82, 19.05],
                        vec![72.84, 19.05],
                        vec![72.84, 19.07],
                        vec![72.82, 19.07],
                    ]],
                })
                .unwrap(),
            ),
        }
    }

    #[test]
    fn test_text_fields_are_trimmed() {
        let payload = to_payload(&complete_draft()).unwrap();
        assert_eq!(payload.title, "Bandra drive");
        assert_eq!(payload.description, "Evening round");
        assert_eq!(payload.city, "Mumbai");
        assert_eq!(payload.area, "Bandra");
    }

    #[test]
    fn test_other_fields_pass_through() {
        let draft = complete_draft();
        let payload = to_payload(&draft).unwrap();
        assert_eq!(payload.date, draft.date);
        assert_eq!(payload.range_km, draft.range_km);
        assert_eq!(Some(payload.center), draft.center);
        assert_eq!(payload.community_forming, draft.community_forming);
        assert_eq!(Some(payload.polygon), draft.polygon);
    }

    #[test]
    fn test_date_is_not_trimmed() {
        let mut draft = complete_draft();
        draft.date = " 2025-09-01".to_string();
        assert_eq!(to_payload(&draft).unwrap().date, " 2025-09-01");
    }

    #[test]
    fn test_adapter_polygon_stays_closed() {
        let payload = to_payload(&complete_draft()).unwrap();
        let ring = &payload.polygon.coordinates()[0];
        assert_eq!(ring.first(), ring.last());
    }

    #[test]
    fn test_missing_center_is_a_programming_error() {
        let mut draft = complete_draft();
        draft.center = None;
        assert_eq!(
            to_payload(&draft),
            Err(DomainError::IncompleteDraft(DriveField::Center))
        );
    }

    #[test]
    fn test_missing_polygon_is_a_programming_error() {
        let mut draft = complete_draft();
        draft.polygon = None;
        assert_eq!(
            to_payload(&draft),
            Err(DomainError::IncompleteDraft(DriveField::Polygon))
        );
    }

    #[test]
    fn test_wire_shape() {
        let json = serde_json::to_value(to_payload(&complete_draft()).unwrap()).unwrap();
        assert_eq!(json["range_km"], 2.5);
        assert_eq!(json["community_forming"], true);
        assert_eq!(json["center"]["lat"], 19.06);
        assert_eq!(json["polygon"]["type"], "Polygon");
        assert_eq!(json["polygon"]["coordinates"][0].as_array().unwrap().len(), 5);
    }
}
