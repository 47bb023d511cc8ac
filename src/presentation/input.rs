use crate::application::{App, AppMode};
use crossterm::event::{KeyCode, KeyModifiers};

/// Translates key presses into [`App`] operations.
///
/// Stateless; each mode has its own handler and the current [`AppMode`]
/// picks which one runs.
pub struct InputHandler;

impl InputHandler {
    /// Routes one key press to the handler of the current mode.
    ///
    /// # Arguments
    ///
    /// * `app` - Application state to update
    /// * `key` - The key that was pressed
    /// * `modifiers` - Modifier keys held down; Ctrl selects the wizard
    ///   shortcuts in normal mode
    pub fn handle_key_event(app: &mut App, key: KeyCode, modifiers: KeyModifiers) {
        match app.mode {
            AppMode::Normal => Self::handle_normal_mode(app, key, modifiers),
            AppMode::Editing => Self::handle_editing_mode(app, key),
            AppMode::Help => Self::handle_help_mode(app, key),
            AppMode::Detail => Self::handle_detail_mode(app, key),
        }
    }

    /// Field focus, editing, step moves and the Ctrl shortcuts.
    fn handle_normal_mode(app: &mut App, key: KeyCode, modifiers: KeyModifiers) {
        if modifiers.contains(KeyModifiers::CONTROL) {
            match key {
                KeyCode::Char('n') => app.next_step(),
                KeyCode::Char('p') => app.prev_step(),
                KeyCode::Char('g') => app.create(),
                KeyCode::Char('x') => app.cancel(),
                KeyCode::Char('y') => app.copy_payload(),
                _ => {}
            }
            return;
        }

        app.status_message = None;

        match key {
            KeyCode::Up | KeyCode::Char('k') | KeyCode::BackTab => app.select_previous_field(),
            KeyCode::Down | KeyCode::Char('j') | KeyCode::Tab => app.select_next_field(),
            KeyCode::Enter | KeyCode::F(2) => app.start_editing(),
            KeyCode::Esc => app.dismiss_banner(),
            KeyCode::F(1) | KeyCode::Char('?') => app.show_help(),
            _ => {}
        }
    }

    /// Keys edit the buffer; Enter commits and Esc throws it away.
    fn handle_editing_mode(app: &mut App, key: KeyCode) {
        match key {
            KeyCode::Enter => {
                app.finish_editing();
            }
            KeyCode::Esc => {
                app.cancel_editing();
            }
            KeyCode::Backspace => {
                app.delete_before_cursor();
            }
            KeyCode::Delete => {
                app.delete_at_cursor();
            }
            KeyCode::Left => {
                if app.cursor_position > 0 {
                    app.cursor_position -= 1;
                }
            }
            KeyCode::Right => {
                if app.cursor_position < app.input.chars().count() {
                    app.cursor_position += 1;
                }
            }
            KeyCode::Home => {
                app.cursor_position = 0;
            }
            KeyCode::End => {
                app.cursor_position = app.input.chars().count();
            }
            KeyCode::Char(c) => {
                app.insert_char(c);
            }
            _ => {}
        }
    }

    fn handle_help_mode(app: &mut App, key: KeyCode) {
        match key {
            KeyCode::Esc | KeyCode::F(1) | KeyCode::Char('?') | KeyCode::Char('q') => {
                app.mode = AppMode::Normal;
            }
            KeyCode::Up | KeyCode::Char('k') => {
                if app.help_scroll > 0 {
                    app.help_scroll -= 1;
                }
            }
            KeyCode::Down | KeyCode::Char('j') => {
                app.help_scroll += 1;
            }
            KeyCode::PageUp => {
                app.help_scroll = app.help_scroll.saturating_sub(5);
            }
            KeyCode::PageDown => {
                app.help_scroll += 5;
            }
            KeyCode::Home => {
                app.help_scroll = 0;
            }
            _ => {}
        }
    }

    fn handle_detail_mode(app: &mut App, key: KeyCode) {
        if matches!(key, KeyCode::Esc | KeyCode::Enter | KeyCode::Char('q')) {
            app.close_detail();
        }
    }
}
