//! Terminal dialogs for autotag.
//!
//! Provides the cost confirmation and tag review prompts using ratatui for
//! rendering and crossterm for terminal management.

use std::io;
use std::panic;
use std::sync::Once;

use anyhow::{Context, Result};
use crossterm::{
    event::{self as crossterm_event, Event, KeyEventKind},
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use ratatui::{Terminal, backend::CrosstermBackend};

use crate::cost::CostPreview;
use crate::pipeline::Prompter;

mod app;
pub mod event;
mod ui;

pub use app::{App, Decision, DialogKind};

/// Initializes the terminal for rendering.
///
/// Enables raw mode and enters the alternate screen.
///
/// # Errors
///
/// Returns an error if terminal initialization fails.
fn init_terminal() -> Result<Terminal<CrosstermBackend<io::Stdout>>> {
    enable_raw_mode().context("failed to enable raw mode")?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen).context("failed to enter alternate screen")?;
    let backend = CrosstermBackend::new(stdout);
    let terminal = Terminal::new(backend).context("failed to create terminal")?;
    Ok(terminal)
}

/// Restores the terminal to its original state.
///
/// Must run after every dialog, even on error.
///
/// # Errors
///
/// Returns an error if terminal restoration fails.
fn restore_terminal(terminal: &mut Terminal<CrosstermBackend<io::Stdout>>) -> Result<()> {
    disable_raw_mode().context("failed to disable raw mode")?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)
        .context("failed to leave alternate screen")?;
    terminal.show_cursor().context("failed to show cursor")?;
    Ok(())
}

/// Minimal terminal restoration for the panic hook. Errors are ignored.
fn restore_terminal_panic() {
    let _ = disable_raw_mode();
    let _ = execute!(io::stdout(), LeaveAlternateScreen);
}

/// Installs a panic hook that restores the terminal, then runs the
/// original hook. Installed once per process.
fn init_panic_hook() {
    static INSTALL: Once = Once::new();
    INSTALL.call_once(|| {
        let original_hook = panic::take_hook();
        panic::set_hook(Box::new(move |panic_info| {
            restore_terminal_panic();
            original_hook(panic_info);
        }));
    });
}

/// Shows a dialog until the user confirms or cancels it.
///
/// # Errors
///
/// Returns an error if event polling, rendering, or terminal operations fail.
/// Terminal state is always restored, even on error.
pub fn run_dialog(app: &mut App) -> Result<()> {
    init_panic_hook();
    let mut terminal = init_terminal()?;

    let result = run_dialog_internal(app, &mut terminal);

    if let Err(e) = restore_terminal(&mut terminal) {
        eprintln!("Error restoring terminal: {e}");
    }

    result
}

fn run_dialog_internal(
    app: &mut App,
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
) -> Result<()> {
    loop {
        terminal.draw(|frame| {
            ui::draw(frame, app);
        })?;

        if crossterm_event::poll(std::time::Duration::from_millis(100))?
            && let Event::Key(key) = crossterm_event::read()?
            && key.kind == KeyEventKind::Press
            && event::handle_key_event(app, key)
        {
            break;
        }
    }

    Ok(())
}

/// Prompter that asks the user in the terminal.
#[derive(Debug, Clone, Copy, Default)]
pub struct TerminalPrompter;

impl Prompter for TerminalPrompter {
    fn confirm_cost(&mut self, preview: &CostPreview) -> io::Result<bool> {
        let mut app = App::confirm_cost(preview);
        run_dialog(&mut app).map_err(io::Error::other)?;
        Ok(app.cost_confirmed())
    }

    fn review_tags(&mut self, tags: &[String]) -> io::Result<Vec<String>> {
        let mut app = App::review_tags(tags);
        run_dialog(&mut app).map_err(io::Error::other)?;
        Ok(app.reviewed_tags())
    }
}
