//! Per-step validation of the drive draft.
//!
//! The validator is a pure function of the step and the draft. The wizard
//! uses [`validate`] to produce inline messages and [`is_step_valid`] to
//! decide whether the "next" action is enabled; the latter is defined in
//! terms of the former so the two can never disagree.

use std::collections::BTreeMap;
use time::{macros::format_description, Date};

use super::models::{DriveDraft, DriveField, WizardStep};

/// Field-level validation messages for one wizard step.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationErrors {
    errors: BTreeMap<DriveField, String>,
}

impl ValidationErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, field: DriveField, message: impl Into<String>) {
        self.errors.insert(field, message.into());
    }

    pub fn get(&self, field: DriveField) -> Option<&str> {
        self.errors.get(&field).map(|s| s.as_str())
    }

    pub fn contains(&self, field: DriveField) -> bool {
        self.errors.contains_key(&field)
    }

    pub fn clear_field(&mut self, field: DriveField) {
        self.errors.remove(&field);
    }

    pub fn clear(&mut self) {
        self.errors.clear();
    }

    /// Merges another set of errors into this one, overwriting duplicates.
    pub fn extend(&mut self, other: ValidationErrors) {
        self.errors.extend(other.errors);
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn len(&self) -> usize {
        self.errors.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (DriveField, &str)> {
        self.errors.iter().map(|(field, message)| (*field, message.as_str()))
    }
}

/// Checks the fields required by `step`.
///
/// # Examples
///
/// ```
/// use pawhub::domain::{validate, DriveDraft, DriveField, WizardStep};
///
/// let draft = DriveDraft {
///     title: String::new(),
///     date: "2025-09-01".to_string(),
///     city: "Mumbai".to_string(),
///     area: "Bandra".to_string(),
///     ..Default::default()
/// };
/// let errors = validate(WizardStep::Details, &draft);
/// assert_eq!(errors.get(DriveField::Title), Some("Title is required"));
/// assert_eq!(errors.len(), 1);
/// ```
pub fn validate(step: WizardStep, draft: &DriveDraft) -> ValidationErrors {
    let mut errors = ValidationErrors::new();

    match step {
        WizardStep::Details => {
            if draft.title.trim().is_empty() {
                errors.insert(DriveField::Title, "Title is required");
            }
            if draft.date.is_empty() {
                errors.insert(DriveField::Date, "Date is required");
            } else if !is_iso_date(&draft.date) {
                errors.insert(DriveField::Date, "Date must be a valid date (YYYY-MM-DD)");
            }
            if draft.city.trim().is_empty() {
                errors.insert(DriveField::City, "City is required");
            }
            if draft.area.trim().is_empty() {
                errors.insert(DriveField::Area, "Area is required");
            }
        }
        WizardStep::Area => {
            if draft.center.is_none() {
                errors.insert(
                    DriveField::Center,
                    "Please select a valid city and area to set the map center",
                );
            }
            if draft.polygon.is_none() {
                errors.insert(DriveField::Polygon, "Please draw an area on the map");
            }
        }
        WizardStep::Review => {}
    }

    errors
}

pub fn is_step_valid(step: WizardStep, draft: &DriveDraft) -> bool {
    validate(step, draft).is_empty()
}

/// Validates `step` together with every step before it.
pub fn validate_through(step: WizardStep, draft: &DriveDraft) -> ValidationErrors {
    let mut errors = ValidationErrors::new();
    for earlier in WizardStep::ALL.into_iter().filter(|s| *s <= step) {
        errors.extend(validate(earlier, draft));
    }
    errors
}

/// `true` for a real calendar date written as `YYYY-MM-DD`.
pub fn is_iso_date(value: &str) -> bool {
    let format = format_description!("[year]-[month]-[day]");
    value.len() == 10 && Date::parse(value, &format).is_ok()
}
