//! The drive creation workflow: form editing, step gating and submission.

use std::fs;
use std::sync::Arc;
use std::time::Duration;

use tracing::{error, info, warn};

use crate::application::form::FormStore;
use crate::application::submission::SubmissionController;
use crate::domain::{
    drive_route, parse_range_km, to_payload, AreaDefinition, Center, DomainError, DomainResult,
    DrawEvent, DriveDraftPatch, DriveField, DrivePayload, RawGeometry,
};
use crate::infrastructure::{DriveRepository, RepositoryError, RepositoryResult};

/// What came back from a finished submission.
#[derive(Debug, Clone, PartialEq)]
pub enum WizardEvent {
    Created { id: String, route: String },
    Failed(String),
}

/// The drive creation wizard without a screen.
///
/// Owns the form and the submission controller. While a submission is in
/// flight the draft and the step are frozen: every mutator refuses and
/// returns `false`.
pub struct Wizard {
    form: FormStore,
    submission: SubmissionController,
    submitted: Option<DrivePayload>,
    banner: Option<String>,
    navigation: Option<String>,
}

impl Wizard {
    /// Creates a wizard on an empty draft that saves into `repository`.
    pub fn new(repository: Arc<dyn DriveRepository>) -> Self {
        Self::with_form(FormStore::new(), repository)
    }

    /// Creates a wizard that starts from an existing form.
    ///
    /// # Arguments
    ///
    /// * `form` - Draft and step to resume from
    /// * `repository` - Where created drives are saved
    pub fn with_form(form: FormStore, repository: Arc<dyn DriveRepository>) -> Self {
        Self {
            form,
            submission: SubmissionController::new(repository),
            submitted: None,
            banner: None,
            navigation: None,
        }
    }

    pub fn form(&self) -> &FormStore {
        &self.form
    }

    /// The repository drives are saved into.
    pub fn repository(&self) -> &Arc<dyn DriveRepository> {
        self.submission.repository()
    }

    /// Whether a submission is in flight and the draft is frozen.
    pub fn is_submitting(&self) -> bool {
        self.submission.is_submitting()
    }

    /// Error from the last failed submission, until dismissed.
    pub fn banner(&self) -> Option<&str> {
        self.banner.as_deref()
    }

    pub fn dismiss_banner(&mut self) {
        self.banner = None;
    }

    /// Route of the most recently created drive.
    pub fn navigation(&self) -> Option<&str> {
        self.navigation.as_deref()
    }

    /// Hands the pending navigation target over to the caller.
    pub fn take_navigation(&mut self) -> Option<String> {
        self.navigation.take()
    }

    fn frozen(&self, action: &str) -> bool {
        if self.submission.is_submitting() {
            warn!(action, "refused while a submission is in flight");
            return true;
        }
        false
    }

    /// Parses raw text typed into `field` and stores it in the draft.
    ///
    /// Input that does not parse leaves the draft as it was and shows an
    /// inline error on the field instead. Returns whether the draft changed.
    ///
    /// # Arguments
    ///
    /// * `field` - The draft field being edited
    /// * `input` - Raw text as typed; `@path` reads a polygon from a file
    pub fn set_field(&mut self, field: DriveField, input: &str) -> bool {
        if self.frozen("set_field") {
            return false;
        }
        match parse_field(field, input) {
            Ok(patch) => {
                self.form.update_form(patch);
                true
            }
            Err(err) => {
                warn!(field = field.as_str(), error = %err, "rejected field input");
                self.form.reject_input(field, inline_message(&err));
                false
            }
        }
    }

    pub fn toggle_community_forming(&mut self) -> bool {
        if self.frozen("toggle_community_forming") {
            return false;
        }
        let value = !self.form.draft().community_forming;
        self.form.update_form(DriveDraftPatch::community_forming(value));
        true
    }

    /// Feeds an event from the drawing surface into the draft.
    pub fn apply_draw_event(&mut self, event: DrawEvent) -> bool {
        if self.frozen("apply_draw_event") {
            return false;
        }
        match AreaDefinition::apply(event) {
            Ok(polygon) => {
                self.form.update_form(DriveDraftPatch::polygon(polygon));
                true
            }
            Err(err) => {
                warn!(error = %err, "rejected drawn area");
                self.form.reject_input(DriveField::Polygon, inline_message(&err));
                false
            }
        }
    }

    /// Moves forward if the current step validates.
    pub fn next_step(&mut self) -> bool {
        if self.frozen("next_step") {
            return false;
        }
        self.form.next_step()
    }

    /// Moves back one step. Returns `false` when frozen.
    pub fn prev_step(&mut self) -> bool {
        if self.frozen("prev_step") {
            return false;
        }
        self.form.prev_step();
        true
    }

    /// The body that would be sent right now, if the draft is complete.
    pub fn payload(&self) -> DomainResult<DrivePayload> {
        to_payload(self.form.draft())
    }

    /// Starts creating the drive. Returns `false` when nothing was sent.
    ///
    /// Refused while a submission is in flight. An incomplete draft sends the
    /// form back to the first step that needs attention.
    pub fn create(&mut self) -> bool {
        if self.submission.is_submitting() {
            return false;
        }
        if !self.form.confirm_ready() {
            return false;
        }

        let payload = match self.payload() {
            Ok(payload) => payload,
            Err(err) => {
                error!(error = %err, "validated draft could not be assembled");
                debug_assert!(false, "validated draft could not be assembled: {err}");
                return false;
            }
        };

        self.banner = None;
        if let Err(err) = self.submission.submit(payload.clone()) {
            self.banner = Some(err.to_string());
            return false;
        }
        self.submitted = Some(payload);
        true
    }

    /// Picks up a finished submission without blocking.
    pub fn tick(&mut self) -> Option<WizardEvent> {
        let result = self.submission.poll()?;
        Some(self.finish(result))
    }

    /// Blocks until the in-flight submission finishes or `timeout` passes.
    pub fn wait(&mut self, timeout: Duration) -> Option<WizardEvent> {
        let result = self.submission.wait(timeout)?;
        Some(self.finish(result))
    }

    /// Drops the draft and abandons any in-flight submission.
    pub fn cancel(&mut self) {
        self.submission.cancel();
        self.submitted = None;
        self.form.reset();
        self.banner = None;
    }

    fn finish(&mut self, result: RepositoryResult<String>) -> WizardEvent {
        let submitted = self.submitted.take();
        match result {
            Ok(id) => {
                let route = drive_route(&id);
                info!(%id, %route, "drive created");
                self.form.reset();
                self.banner = None;
                self.navigation = Some(route.clone());
                WizardEvent::Created { id, route }
            }
            Err(err) => {
                error!(error = %err, "drive creation failed");
                if matches!(err, RepositoryError::Unreachable(_)) {
                    let body = submitted.and_then(|p| serde_json::to_string(&p).ok());
                    if let Some(body) = body {
                        info!(payload = %body, "backend unreachable, payload not delivered");
                    }
                }
                let message = banner_message(&err);
                self.banner = Some(message.clone());
                WizardEvent::Failed(message)
            }
        }
    }
}

fn parse_field(field: DriveField, input: &str) -> DomainResult<DriveDraftPatch> {
    match field {
        DriveField::RangeKm => Ok(DriveDraftPatch::range_km(parse_range_km(input)?)),
        DriveField::Center => {
            if input.trim().is_empty() {
                Ok(DriveDraftPatch::center(None))
            } else {
                Ok(DriveDraftPatch::center(Some(Center::parse(input)?)))
            }
        }
        DriveField::CommunityForming => match input.trim().to_ascii_lowercase().as_str() {
            "yes" | "y" | "true" => Ok(DriveDraftPatch::community_forming(true)),
            "no" | "n" | "false" | "" => Ok(DriveDraftPatch::community_forming(false)),
            _ => Err(DomainError::invalid_input(field, "answer yes or no")),
        },
        DriveField::Polygon => {
            let event = polygon_event(input)?;
            Ok(DriveDraftPatch::polygon(AreaDefinition::apply(event)?))
        }
        _ => DriveDraftPatch::text(field, input),
    }
}

/// Empty input deletes the area; `@path` reads GeoJSON from a file.
fn polygon_event(input: &str) -> DomainResult<DrawEvent> {
    let input = input.trim();
    if input.is_empty() {
        return Ok(DrawEvent::Deleted);
    }
    let json = match input.strip_prefix('@') {
        Some(path) => fs::read_to_string(path.trim()).map_err(|e| {
            DomainError::invalid_input(DriveField::Polygon, format!("cannot read {}: {}", path.trim(), e))
        })?,
        None => input.to_string(),
    };
    Ok(DrawEvent::Created(RawGeometry::from_json(&json)?))
}

fn inline_message(err: &DomainError) -> String {
    match err {
        DomainError::InvalidInput { message, .. } => message.clone(),
        other => other.to_string(),
    }
}

fn banner_message(err: &RepositoryError) -> String {
    match err {
        RepositoryError::Status { message, .. } => message.clone(),
        RepositoryError::MissingId => err.to_string(),
        RepositoryError::Unreachable(_) => {
            "Backend not available. The payload was written to the log.".to_string()
        }
        _ => "Failed to create drive. Please try again.".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Drive, WizardStep};
    use crate::infrastructure::MemoryRepository;
    use std::io::Write;

    const SQUARE: &str = r#"{"type":"Polygon","coordinates":[[[72.82,19.05],[72.84,19.05],[72.84,19.07],[72.82,19.07],[72.82,19.05]]]}"#;

    struct Unreachable;

    impl DriveRepository for Unreachable {
        fn save(&self, _: &DrivePayload) -> RepositoryResult<String> {
            Err(RepositoryError::Unreachable("connection refused".to_string()))
        }

        fn get(&self, _: &str) -> RepositoryResult<Option<Drive>> {
            Ok(None)
        }
    }

    /// Hands out a fixed id, as a backend answering `{"id": "42"}` would.
    struct FixedId(&'static str);

    impl DriveRepository for FixedId {
        fn save(&self, _: &DrivePayload) -> RepositoryResult<String> {
            Ok(self.0.to_string())
        }

        fn get(&self, _: &str) -> RepositoryResult<Option<Drive>> {
            Ok(None)
        }
    }

    /// Fails like an unreachable backend, but only after a while.
    struct SlowUnreachable(Duration);

    impl DriveRepository for SlowUnreachable {
        fn save(&self, _: &DrivePayload) -> RepositoryResult<String> {
            std::thread::sleep(self.0);
            Err(RepositoryError::Unreachable("connection refused".to_string()))
        }

        fn get(&self, _: &str) -> RepositoryResult<Option<Drive>> {
            Ok(None)
        }
    }

    fn memory() -> Arc<MemoryRepository> {
        Arc::new(MemoryRepository::new())
    }

    fn fill_details(wizard: &mut Wizard) {
        assert!(wizard.set_field(DriveField::Title, "Bandra drive"));
        assert!(wizard.set_field(DriveField::Date, "2025-09-01"));
        assert!(wizard.set_field(DriveField::City, "Mumbai"));
        assert!(wizard.set_field(DriveField::Area, "Bandra"));
    }

    fn ready_for_review(repository: Arc<dyn DriveRepository>) -> Wizard {
        let mut wizard = Wizard::new(repository);
        fill_details(&mut wizard);
        assert!(wizard.next_step());
        assert!(wizard.set_field(DriveField::Center, "19.06,72.83"));
        assert!(wizard.set_field(DriveField::Polygon, SQUARE));
        assert!(wizard.next_step());
        assert_eq!(wizard.form().step(), WizardStep::Review);
        wizard
    }

    #[test]
    fn test_empty_title_blocks_details() {
        let mut wizard = Wizard::new(memory());
        assert!(wizard.set_field(DriveField::Title, ""));
        assert!(wizard.set_field(DriveField::Date, "2025-09-01"));
        assert!(wizard.set_field(DriveField::City, "Mumbai"));
        assert!(wizard.set_field(DriveField::Area, "Bandra"));

        assert!(!wizard.next_step());
        let errors = wizard.form().errors();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors.get(DriveField::Title), Some("Title is required"));
    }

    #[test]
    fn test_successful_create_resets_and_navigates() {
        let repo = memory();
        let mut wizard = ready_for_review(repo.clone());

        assert!(wizard.create());
        assert!(wizard.is_submitting());
        assert!(!wizard.create());

        let event = wizard.wait(Duration::from_secs(5)).unwrap();
        assert_eq!(
            event,
            WizardEvent::Created {
                id: "1".to_string(),
                route: "/drives/1".to_string()
            }
        );
        assert_eq!(wizard.navigation(), Some("/drives/1"));
        assert_eq!(wizard.form(), &FormStore::new());
        assert!(wizard.banner().is_none());

        let stored = repo.get("1").unwrap().unwrap();
        assert_eq!(stored.details.title, "Bandra drive");
        assert_eq!(stored.details.polygon.outer_ring().first(), stored.details.polygon.outer_ring().last());
    }

    #[test]
    fn test_string_id_from_backend_becomes_route() {
        let mut wizard = ready_for_review(Arc::new(FixedId("42")));
        assert!(wizard.create());

        let event = wizard.wait(Duration::from_secs(5)).unwrap();
        assert_eq!(
            event,
            WizardEvent::Created {
                id: "42".to_string(),
                route: "/drives/42".to_string()
            }
        );
        assert_eq!(wizard.navigation(), Some("/drives/42"));
        assert_eq!(wizard.form(), &FormStore::new());
        assert_eq!(wizard.take_navigation().as_deref(), Some("/drives/42"));
        assert!(wizard.navigation().is_none());
    }

    #[test]
    fn test_draft_is_frozen_while_submitting() {
        let mut wizard = ready_for_review(Arc::new(SlowUnreachable(Duration::from_millis(200))));
        let before = wizard.form().clone();

        assert!(wizard.create());
        assert!(!wizard.set_field(DriveField::Title, "Edited mid-flight"));
        assert!(!wizard.prev_step());
        assert!(!wizard.prev_step());
        assert!(!wizard.next_step());
        assert!(!wizard.toggle_community_forming());
        assert!(!wizard.apply_draw_event(DrawEvent::Deleted));
        assert_eq!(wizard.form(), &before);

        let event = wizard.wait(Duration::from_secs(5)).unwrap();
        assert!(matches!(event, WizardEvent::Failed(ref m) if m.contains("Backend not available")));
        assert_eq!(wizard.form(), &before);
        assert_eq!(wizard.form().step(), WizardStep::Review);

        assert!(wizard.set_field(DriveField::Title, "Edited after failure"));
        assert!(wizard.prev_step());
        assert_eq!(wizard.form().step(), WizardStep::Area);
    }

    #[test]
    fn test_failed_create_keeps_draft_and_shows_banner() {
        let mut wizard = ready_for_review(Arc::new(Unreachable));
        let before = wizard.form().draft().clone();

        assert!(wizard.create());
        let event = wizard.wait(Duration::from_secs(5)).unwrap();
        assert!(matches!(event, WizardEvent::Failed(_)));
        assert_eq!(wizard.form().draft(), &before);
        assert_eq!(wizard.form().step(), WizardStep::Review);
        assert!(wizard.banner().unwrap().contains("Backend not available"));
        assert!(wizard.navigation().is_none());

        wizard.dismiss_banner();
        assert!(wizard.banner().is_none());
    }

    #[test]
    fn test_create_with_incomplete_draft_goes_back() {
        let mut wizard = Wizard::new(memory());
        fill_details(&mut wizard);
        assert!(!wizard.create());
        assert!(!wizard.is_submitting());
        assert_eq!(wizard.form().step(), WizardStep::Area);
        assert!(wizard.form().errors().contains(DriveField::Polygon));
    }

    #[test]
    fn test_cancel_during_submission_ignores_result() {
        let repo = Arc::new(MemoryRepository::with_latency(Duration::from_millis(100)));
        let mut wizard = ready_for_review(repo);
        assert!(wizard.create());
        wizard.cancel();

        assert!(!wizard.is_submitting());
        assert!(wizard.wait(Duration::from_millis(400)).is_none());
        assert!(wizard.navigation().is_none());
        assert_eq!(wizard.form(), &FormStore::new());
    }

    #[test]
    fn test_negative_range_is_rejected_inline() {
        let mut wizard = Wizard::new(memory());
        assert!(wizard.set_field(DriveField::RangeKm, "2.5"));
        assert!(!wizard.set_field(DriveField::RangeKm, "-1"));
        assert_eq!(wizard.form().draft().range_km, Some(2.5));
        assert!(wizard.form().errors().contains(DriveField::RangeKm));

        assert!(wizard.set_field(DriveField::RangeKm, ""));
        assert_eq!(wizard.form().draft().range_km, None);
        assert!(!wizard.form().errors().contains(DriveField::RangeKm));
    }

    #[test]
    fn test_bad_center_is_rejected_inline() {
        let mut wizard = Wizard::new(memory());
        assert!(!wizard.set_field(DriveField::Center, "somewhere"));
        assert_eq!(
            wizard.form().errors().get(DriveField::Center),
            Some("expected `lat,lng`")
        );
        assert!(wizard.form().draft().center.is_none());
    }

    #[test]
    fn test_polygon_from_file_and_delete() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(SQUARE.as_bytes()).unwrap();

        let mut wizard = Wizard::new(memory());
        let input = format!("@{}", file.path().display());
        assert!(wizard.set_field(DriveField::Polygon, &input));
        assert_eq!(wizard.form().draft().polygon.as_ref().unwrap().vertex_count(), 4);

        assert!(wizard.set_field(DriveField::Polygon, ""));
        assert!(wizard.form().draft().polygon.is_none());

        assert!(!wizard.set_field(DriveField::Polygon, "@/definitely/not/here.json"));
        assert!(wizard.form().errors().contains(DriveField::Polygon));
    }

    #[test]
    fn test_redraw_replaces_polygon() {
        let mut wizard = Wizard::new(memory());
        assert!(wizard.set_field(DriveField::Polygon, SQUARE));
        let triangle = r#"{"type":"Feature","properties":{},"geometry":{"type":"Polygon","coordinates":[[[0,0],[1,0],[1,1]]]}}"#;
        assert!(wizard.set_field(DriveField::Polygon, triangle));
        let polygon = wizard.form().draft().polygon.clone().unwrap();
        assert_eq!(polygon.vertex_count(), 3);
        assert_eq!(polygon.outer_ring().len(), 4);
    }

    #[test]
    fn test_draw_events_keep_one_polygon() {
        let mut wizard = Wizard::new(memory());
        let first = RawGeometry::from_json(SQUARE).unwrap();
        let second = RawGeometry::Polygon {
            coordinates: vec![vec![vec![0.0, 0.0, 12.0], vec![1.0, 0.0], vec![1.0, 1.0]]],
        };

        assert!(wizard.apply_draw_event(DrawEvent::Created(first.clone())));
        assert!(wizard.apply_draw_event(DrawEvent::Edited(vec![first, second])));
        let polygon = wizard.form().draft().polygon.clone().unwrap();
        assert_eq!(polygon.outer_ring(), &[[0.0, 0.0], [1.0, 0.0], [1.0, 1.0], [0.0, 0.0]]);

        assert!(!wizard.apply_draw_event(DrawEvent::Edited(vec![])));
        assert!(wizard.form().draft().polygon.is_some());

        assert!(wizard.apply_draw_event(DrawEvent::Deleted));
        assert!(wizard.form().draft().polygon.is_none());
    }

    #[test]
    fn test_toggle_community_forming() {
        let mut wizard = Wizard::new(memory());
        wizard.toggle_community_forming();
        assert!(wizard.form().draft().community_forming);
        wizard.toggle_community_forming();
        assert!(!wizard.form().draft().community_forming);
    }

    #[test]
    fn test_payload_preview_trims_text() {
        let mut wizard = ready_for_review(memory());
        wizard.set_field(DriveField::Title, "  Bandra drive  ");
        assert_eq!(wizard.payload().unwrap().title, "Bandra drive");
    }

    #[test]
    fn test_banner_messages() {
        assert_eq!(
            banner_message(&RepositoryError::Status {
                status: 400,
                message: "Date is in the past".to_string()
            }),
            "Date is in the past"
        );
        assert_eq!(banner_message(&RepositoryError::MissingId), "No ID returned from server");
        assert_eq!(
            banner_message(&RepositoryError::Poisoned),
            "Failed to create drive. Please try again."
        );
    }
}
