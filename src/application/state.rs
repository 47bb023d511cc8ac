//! Application state for the terminal wizard.
//!
//! Holds the wizard itself plus everything the screen needs on top of it:
//! which field is focused, the edit buffer, the help popup and the
//! dashboard of a freshly created drive.

use std::sync::Arc;

use tracing::warn;

use crate::application::dashboard::{DashboardLoaded, DashboardLoader};
use crate::application::wizard::{Wizard, WizardEvent};
use crate::domain::{DriveDashboard, DriveField, WizardStep};
use crate::infrastructure::DriveRepository;

const IN_FLIGHT: &str = "A submission is already in progress";

/// Represents the current mode of the application.
///
/// The mode decides how key presses are interpreted and which overlays are
/// drawn.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppMode {
    /// Moving between fields and steps
    Normal,
    /// Typing into the focused field
    Editing,
    /// Help screen is displayed
    Help,
    /// Showing the dashboard of the drive that was just created
    Detail,
}

/// Content of the detail view at `/drives/{id}`.
#[derive(Debug, Clone, PartialEq)]
pub enum DriveDetail {
    /// The dashboard is being fetched
    Loading { id: String, route: String },
    Loaded(DriveDashboard),
    /// The drive was created but its dashboard could not be shown
    Unavailable { route: String, reason: String },
}

/// Main application state.
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
/// use pawhub::application::{App, AppMode};
/// use pawhub::infrastructure::MemoryRepository;
///
/// let app = App::new(Arc::new(MemoryRepository::new()));
/// assert_eq!(app.mode, AppMode::Normal);
/// assert_eq!(app.selected_field, 0);
/// ```
pub struct App {
    /// The drive creation workflow
    pub wizard: Wizard,
    /// Index of the focused field within the current step
    pub selected_field: usize,
    /// Current application mode
    pub mode: AppMode,
    /// Edit buffer for the focused field
    pub input: String,
    /// Cursor position within the edit buffer, in characters
    pub cursor_position: usize,
    /// Scroll position in help text
    pub help_scroll: usize,
    /// Temporary status message to display
    pub status_message: Option<String>,
    /// Drive shown in detail mode
    pub detail: Option<DriveDetail>,
    dashboards: DashboardLoader,
}

impl App {
    /// Creates the application on an empty draft.
    ///
    /// # Arguments
    ///
    /// * `repository` - Backend that created drives are saved into
    pub fn new(repository: Arc<dyn DriveRepository>) -> Self {
        Self::with_wizard(Wizard::new(repository))
    }

    /// Wraps an already configured wizard.
    pub fn with_wizard(wizard: Wizard) -> Self {
        Self {
            wizard,
            selected_field: 0,
            mode: AppMode::Normal,
            input: String::new(),
            cursor_position: 0,
            help_scroll: 0,
            status_message: None,
            detail: None,
            dashboards: DashboardLoader::new(),
        }
    }

    /// The wizard step currently on screen.
    pub fn step(&self) -> WizardStep {
        self.wizard.form().step()
    }

    /// The field under the cursor; `None` on the Review step.
    pub fn selected_field(&self) -> Option<DriveField> {
        self.step().fields().get(self.selected_field).copied()
    }

    /// Moves focus down, wrapping to the first field.
    pub fn select_next_field(&mut self) {
        let count = self.step().fields().len();
        if count > 0 {
            self.selected_field = (self.selected_field + 1) % count;
        }
    }

    pub fn select_previous_field(&mut self) {
        let count = self.step().fields().len();
        if count > 0 {
            self.selected_field = (self.selected_field + count - 1) % count;
        }
    }

    /// Opens the focused field for editing. Yes/no fields are toggled instead.
    ///
    /// Refused with a status message while a submission is in flight.
    pub fn start_editing(&mut self) {
        if self.wizard.is_submitting() {
            self.status_message = Some(IN_FLIGHT.to_string());
            return;
        }
        let Some(field) = self.selected_field() else {
            return;
        };
        if field == DriveField::CommunityForming {
            self.wizard.toggle_community_forming();
            return;
        }

        let draft = self.wizard.form().draft();
        self.input = match field {
            DriveField::Polygon => draft
                .polygon
                .as_ref()
                .and_then(|p| serde_json::to_string(p).ok())
                .unwrap_or_default(),
            _ => draft.field_text(field),
        };
        self.cursor_position = self.input.chars().count();
        self.mode = AppMode::Editing;
        self.status_message = None;
    }

    /// Stores the edit buffer in the focused field and returns to normal mode.
    ///
    /// Rejected input is reported inline by the wizard; the buffer is dropped
    /// either way.
    pub fn finish_editing(&mut self) {
        if let Some(field) = self.selected_field() {
            if !self.wizard.set_field(field, &self.input) {
                self.status_message = Some(format!("{} was not changed", field.label()));
            }
        }
        self.cancel_editing();
    }

    pub fn cancel_editing(&mut self) {
        self.mode = AppMode::Normal;
        self.input.clear();
        self.cursor_position = 0;
    }

    /// Inserts a character at the cursor.
    ///
    /// # Arguments
    ///
    /// * `c` - Character typed by the user
    pub fn insert_char(&mut self, c: char) {
        let at = self.byte_index();
        self.input.insert(at, c);
        self.cursor_position += 1;
    }

    pub fn delete_before_cursor(&mut self) {
        if self.cursor_position > 0 {
            self.cursor_position -= 1;
            let at = self.byte_index();
            self.input.remove(at);
        }
    }

    pub fn delete_at_cursor(&mut self) {
        if self.cursor_position < self.input.chars().count() {
            let at = self.byte_index();
            self.input.remove(at);
        }
    }

    fn byte_index(&self) -> usize {
        self.input
            .char_indices()
            .nth(self.cursor_position)
            .map(|(i, _)| i)
            .unwrap_or(self.input.len())
    }

    /// Advances the wizard, or points at the first field that blocks it.
    pub fn next_step(&mut self) {
        if self.wizard.is_submitting() {
            self.status_message = Some(IN_FLIGHT.to_string());
            return;
        }
        if self.wizard.next_step() {
            self.selected_field = 0;
            self.status_message = None;
        } else if self.step() != WizardStep::Review || !self.wizard.form().errors().is_empty() {
            self.focus_first_error();
            self.status_message = Some("Fix the highlighted fields to continue".to_string());
        }
    }

    /// Goes back one step; refused while a submission is in flight.
    pub fn prev_step(&mut self) {
        if !self.wizard.prev_step() {
            self.status_message = Some(IN_FLIGHT.to_string());
            return;
        }
        self.selected_field = 0;
        self.status_message = None;
    }

    /// Submits the drive from the Review step.
    pub fn create(&mut self) {
        if self.step() != WizardStep::Review {
            self.status_message = Some("Review the drive before creating it".to_string());
            return;
        }
        if self.wizard.is_submitting() {
            self.status_message = Some(IN_FLIGHT.to_string());
            return;
        }

        if self.wizard.create() {
            self.status_message = Some("Creating drive...".to_string());
        } else if self.wizard.banner().is_none() {
            self.focus_first_error();
            self.status_message = Some("Fix the highlighted fields to continue".to_string());
        }
    }

    /// Discards the draft, including any submission still in flight.
    pub fn cancel(&mut self) {
        self.wizard.cancel();
        self.cancel_editing();
        self.selected_field = 0;
        self.status_message = Some("Draft discarded".to_string());
    }

    pub fn dismiss_banner(&mut self) {
        self.wizard.dismiss_banner();
    }

    /// Picks up finished background work: a submission outcome or a
    /// dashboard that was being loaded.
    ///
    /// Called once per pass of the event loop. Returns `true` when the
    /// screen changed.
    pub fn tick(&mut self) -> bool {
        let mut changed = false;
        if let Some(event) = self.wizard.tick() {
            self.on_wizard_event(event);
            changed = true;
        }
        if let Some(loaded) = self.dashboards.poll() {
            self.on_dashboard_loaded(loaded);
            changed = true;
        }
        changed
    }

    /// Reacts to a finished submission.
    ///
    /// A created drive opens the detail view right away and its dashboard is
    /// fetched in the background; a failure leaves the wizard's banner up.
    ///
    /// # Arguments
    ///
    /// * `event` - Outcome reported by the wizard
    pub fn on_wizard_event(&mut self, event: WizardEvent) {
        match event {
            WizardEvent::Created { id, route } => {
                self.selected_field = 0;
                self.cancel_editing();
                self.mode = AppMode::Detail;
                self.status_message = Some(format!("Drive created: {}", route));
                let repository = Arc::clone(self.wizard.repository());
                self.detail = Some(match self.dashboards.request(repository, &id) {
                    Ok(()) => DriveDetail::Loading { id, route },
                    Err(err) => {
                        warn!(%id, error = %err, "could not start dashboard load");
                        DriveDetail::Unavailable {
                            route,
                            reason: err.to_string(),
                        }
                    }
                });
            }
            WizardEvent::Failed(_) => {
                self.status_message = None;
            }
        }
    }

    fn on_dashboard_loaded(&mut self, loaded: DashboardLoaded) {
        let route = match &self.detail {
            Some(DriveDetail::Loading { id, route }) if *id == loaded.id => route.clone(),
            _ => return,
        };
        let id = loaded.id;
        self.detail = Some(match loaded.result {
            Ok(Some(dashboard)) => DriveDetail::Loaded(dashboard),
            Ok(None) => DriveDetail::Unavailable {
                route,
                reason: "not found on reload".to_string(),
            },
            Err(err) => {
                warn!(%id, error = %err, "could not load drive dashboard");
                DriveDetail::Unavailable {
                    route,
                    reason: err.to_string(),
                }
            }
        });
    }

    /// Leaves the detail view and consumes the navigation target.
    pub fn close_detail(&mut self) {
        self.dashboards.cancel();
        self.detail = None;
        self.wizard.take_navigation();
        self.mode = AppMode::Normal;
    }

    pub fn show_help(&mut self) {
        self.mode = AppMode::Help;
        self.help_scroll = 0;
    }

    /// Pretty JSON of the payload that would be submitted.
    ///
    /// # Errors
    ///
    /// Returns a user-facing message if the draft cannot be assembled yet.
    pub fn payload_json(&self) -> Result<String, String> {
        let payload = self
            .wizard
            .payload()
            .map_err(|_| "Complete the Details and Area steps first".to_string())?;
        serde_json::to_string_pretty(&payload).map_err(|e| e.to_string())
    }

    /// Copies the payload JSON to the system clipboard via `arboard`.
    ///
    /// The outcome is reported in the status bar.
    pub fn copy_payload(&mut self) {
        let message = match self.payload_json() {
            Ok(json) => match arboard::Clipboard::new().and_then(|mut c| c.set_text(json)) {
                Ok(()) => "Payload copied to clipboard".to_string(),
                Err(err) => format!("Clipboard unavailable: {}", err),
            },
            Err(message) => message,
        };
        self.status_message = Some(message);
    }

    fn focus_first_error(&mut self) {
        let errors = self.wizard.form().errors();
        if let Some(index) = self
            .step()
            .fields()
            .iter()
            .position(|field| errors.contains(*field))
        {
            self.selected_field = index;
        }
    }
}
