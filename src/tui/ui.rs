//! UI rendering for the dialogs.
//!
//! Each dialog is a bordered panel with a body and a shortcut bar at the
//! bottom of the screen.

use ratatui::{
    Frame,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span, Text},
    widgets::{Block, Borders, List, ListItem, ListState, Paragraph, Wrap},
};

use super::app::{App, DialogKind};

/// Main rendering function for the dialogs.
///
/// # Arguments
///
/// * `frame` - The ratatui Frame to render into
/// * `app` - The dialog state
pub fn draw(frame: &mut Frame, app: &App) {
    let size = frame.area();

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Min(0),    // Dialog body
            Constraint::Length(1), // Shortcut bar
        ])
        .split(size);

    match app.kind() {
        DialogKind::ConfirmCost => render_cost_preview(frame, app, chunks[0]),
        DialogKind::ReviewTags => render_tag_review(frame, app, chunks[0]),
    }
    render_shortcut_bar(frame, app, chunks[1]);
}

fn render_cost_preview(frame: &mut Frame, app: &App, area: Rect) {
    let mut lines: Vec<Line> = app.message().lines().map(Line::from).collect();
    lines.push(Line::from(""));
    lines.push(Line::from("Send this text to the API?"));

    let border_color = if app.has_warning() {
        Color::Yellow
    } else {
        Color::Cyan
    };

    let paragraph = Paragraph::new(Text::from(lines))
        .block(
            Block::default()
                .title("Cost estimate")
                .borders(Borders::ALL)
                .border_style(Style::default().fg(border_color)),
        )
        .wrap(Wrap { trim: false });

    frame.render_widget(paragraph, area);
}

fn render_tag_review(frame: &mut Frame, app: &App, area: Rect) {
    let items: Vec<ListItem> = app
        .tags()
        .iter()
        .enumerate()
        .map(|(i, tag)| {
            let (mark, style) = if app.is_accepted(i) {
                ("[x] ", Style::default())
            } else {
                ("[ ] ", Style::default().fg(Color::DarkGray))
            };
            ListItem::new(Line::from(vec![Span::raw(mark), Span::styled(tag.clone(), style)]))
        })
        .collect();

    let title = format!(
        "Suggested tags ({}/{} selected)",
        app.accepted_tags().len(),
        app.tags().len()
    );

    let list = List::new(items)
        .block(
            Block::default()
                .title(title)
                .borders(Borders::ALL)
                .border_style(Style::default().fg(Color::Cyan)),
        )
        .highlight_style(Style::default().add_modifier(Modifier::REVERSED));

    let mut state = ListState::default();
    state.select(app.selected_index());

    frame.render_stateful_widget(list, area, &mut state);
}

/// Renders the shortcut bar at the bottom of the screen.
///
/// Format: `Key: action | Key: action` with keys highlighted in cyan.
fn render_shortcut_bar(frame: &mut Frame, app: &App, area: Rect) {
    let key_style = Style::default().fg(Color::Cyan);
    let sep_style = Style::default().fg(Color::DarkGray);

    let spans = match app.kind() {
        DialogKind::ConfirmCost => vec![
            Span::styled("y/Enter", key_style),
            Span::raw(": continue"),
            Span::styled(" | ", sep_style),
            Span::styled("n/Esc", key_style),
            Span::raw(": cancel"),
        ],
        DialogKind::ReviewTags => vec![
            Span::styled("j/k", key_style),
            Span::raw(": navigate"),
            Span::styled(" | ", sep_style),
            Span::styled("Space", key_style),
            Span::raw(": toggle"),
            Span::styled(" | ", sep_style),
            Span::styled("a/n", key_style),
            Span::raw(": all/none"),
            Span::styled(" | ", sep_style),
            Span::styled("Enter", key_style),
            Span::raw(": insert"),
            Span::styled(" | ", sep_style),
            Span::styled("Esc", key_style),
            Span::raw(": discard"),
        ],
    };

    frame.render_widget(Paragraph::new(Line::from(spans)), area);
}
