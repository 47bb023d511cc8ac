//! In-progress drive draft, the active wizard step and its inline errors.

use tracing::debug;

use crate::domain::{
    validate, validate_through, DriveDraft, DriveDraftPatch, DriveField, ValidationErrors,
    WizardStep,
};

/// Single owner of the draft being edited.
///
/// The step can only move forward through [`FormStore::next_step`], so the
/// Review step is never reached with a draft that fails an earlier step.
///
/// # Examples
///
/// ```
/// use pawhub::application::FormStore;
/// use pawhub::domain::{DriveDraftPatch, DriveField, WizardStep};
///
/// let mut form = FormStore::new();
/// assert!(!form.next_step());
/// assert!(form.errors().contains(DriveField::Title));
///
/// form.update_form(DriveDraftPatch::text(DriveField::Title, "Bandra drive").unwrap());
/// assert!(!form.errors().contains(DriveField::Title));
/// assert_eq!(form.step(), WizardStep::Details);
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FormStore {
    draft: DriveDraft,
    step: WizardStep,
    errors: ValidationErrors,
}

impl FormStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts on the Details step with an existing draft, e.g. one read from disk.
    pub fn with_draft(draft: DriveDraft) -> Self {
        Self {
            draft,
            ..Self::default()
        }
    }

    pub fn draft(&self) -> &DriveDraft {
        &self.draft
    }

    pub fn step(&self) -> WizardStep {
        self.step
    }

    pub fn errors(&self) -> &ValidationErrors {
        &self.errors
    }

    /// Merges the fields present in `patch` and clears their errors.
    pub fn update_form(&mut self, patch: DriveDraftPatch) {
        for field in patch.fields() {
            self.errors.clear_field(field);
        }
        patch.apply_to(&mut self.draft);
    }

    /// Shows an inline error for input that never made it into the draft.
    pub fn reject_input(&mut self, field: DriveField, message: impl Into<String>) {
        self.errors.insert(field, message);
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Validates the current step and advances when it is clean.
    ///
    /// Entering Review re-checks every earlier step. Returns whether the step
    /// changed.
    pub fn next_step(&mut self) -> bool {
        let Some(next) = self.step.next() else {
            return false;
        };

        let errors = if next == WizardStep::Review {
            validate_through(self.step, &self.draft)
        } else {
            validate(self.step, &self.draft)
        };

        if !errors.is_empty() {
            debug!(step = self.step.label(), errors = errors.len(), "step blocked");
            self.step = first_invalid_step(&errors).unwrap_or(self.step);
            self.errors = errors;
            return false;
        }

        self.errors.clear();
        self.step = next;
        true
    }

    /// Moves back one step; a no-op on Details.
    pub fn prev_step(&mut self) {
        if let Some(previous) = self.step.previous() {
            self.step = previous;
        }
    }

    /// Re-checks everything needed for submission.
    ///
    /// On failure the step falls back to the first one with errors and the
    /// errors are shown there.
    pub fn confirm_ready(&mut self) -> bool {
        let errors = validate_through(WizardStep::Review, &self.draft);
        if errors.is_empty() {
            return true;
        }
        if let Some(step) = first_invalid_step(&errors) {
            self.step = step;
        }
        self.errors = errors;
        false
    }
}

fn first_invalid_step(errors: &ValidationErrors) -> Option<WizardStep> {
    WizardStep::ALL
        .into_iter()
        .find(|step| step.fields().iter().any(|field| errors.contains(*field)))
}
