//! Keyboard event handling for the dialogs.
//!
//! Maps crossterm keyboard events to dialog state changes. Key behavior
//! depends on which dialog is open.

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

use super::app::{App, DialogKind};

/// Handles a keyboard event and updates the dialog state accordingly.
///
/// Returns `true` once the dialog is closed, `false` otherwise.
///
/// # Event Handling
///
/// - `Enter`: Confirm (from either dialog)
/// - `q`, `Esc`, `Ctrl+C`: Cancel
/// - Cost dialog: `y` confirms, `n` cancels
/// - Review dialog: j/k or arrows navigate, `Space` toggles, `a` accepts
///   all, `n` rejects all
///
/// # Examples
///
/// ```
/// use autotag::tui::{App, Decision, event::handle_key_event};
/// use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
///
/// let mut app = App::review_tags(&["#rust".to_string()]);
/// let key = KeyEvent::new(KeyCode::Esc, KeyModifiers::NONE);
/// let closed = handle_key_event(&mut app, key);
/// assert!(closed);
/// assert_eq!(app.decision(), Some(Decision::Cancelled));
/// ```
pub fn handle_key_event(app: &mut App, key: KeyEvent) -> bool {
    if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
        app.cancel();
        return true;
    }

    match key.code {
        KeyCode::Enter => {
            app.confirm();
            return true;
        }
        KeyCode::Esc | KeyCode::Char('q') => {
            app.cancel();
            return true;
        }
        _ => {}
    }

    match app.kind() {
        DialogKind::ConfirmCost => handle_confirm_cost(app, key),
        DialogKind::ReviewTags => {
            handle_review_tags(app, key);
            false
        }
    }
}

fn handle_confirm_cost(app: &mut App, key: KeyEvent) -> bool {
    match key.code {
        KeyCode::Char('y') => {
            app.confirm();
            true
        }
        KeyCode::Char('n') => {
            app.cancel();
            true
        }
        _ => false,
    }
}

fn handle_review_tags(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Char('j') | KeyCode::Down => app.select_next(),
        KeyCode::Char('k') | KeyCode::Up => app.select_previous(),
        KeyCode::Char(' ') => app.toggle_selected(),
        KeyCode::Char('a') => app.accept_all(),
        KeyCode::Char('n') => app.reject_all(),
        _ => {}
    }
}
