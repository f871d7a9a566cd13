use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem, ListState, Paragraph, Wrap},
    Frame,
};

use portafolio_core::models::QueryEntry;

use crate::app::{App, AppState};
use crate::ui::styles;

use super::empty_line;

pub fn render(frame: &mut Frame, app: &App, area: Rect) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(3), Constraint::Min(6)])
        .split(area);

    render_question(frame, app, chunks[0]);

    let body = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(40), Constraint::Percentage(60)])
        .split(chunks[1]);

    render_history(frame, app, body[0]);
    render_answer(frame, app, body[1]);
}

fn render_question(frame: &mut Frame, app: &App, area: Rect) {
    let asking = app.state == AppState::Asking;
    let line = if asking {
        Line::from(vec![
            Span::styled(app.question.clone(), styles::input_style()),
            Span::styled("▌", styles::input_style()),
        ])
    } else if app.question.is_empty() {
        Line::from(Span::styled("Press / to ask about the uploaded documents", styles::muted_style()))
    } else {
        Line::from(Span::raw(app.question.clone()))
    };

    let block = Block::default()
        .title(" Question ")
        .title_style(styles::title_style())
        .borders(Borders::ALL)
        .border_style(styles::border_style(asking));
    frame.render_widget(Paragraph::new(line).block(block), area);
}

fn render_history(frame: &mut Frame, app: &App, area: Rect) {
    let entries = app.history.entries();
    let block = Block::default()
        .title(format!(" History ({}) · saved {} ", entries.len(), app.history.last_saved()))
        .title_style(styles::title_style())
        .borders(Borders::ALL)
        .border_style(styles::border_style(app.state != AppState::Asking));

    if entries.is_empty() {
        frame.render_widget(Paragraph::new(empty_line(false, "questions")).block(block), area);
        return;
    }

    let items: Vec<ListItem> = entries
        .iter()
        .enumerate()
        .map(|(i, entry)| {
            let style = if i == app.history_selection {
                styles::selected_style()
            } else if entry.failed {
                styles::error_style()
            } else {
                styles::list_item_style()
            };
            let when = entry.asked_at.with_timezone(&chrono::Local).format("%H:%M");
            ListItem::new(Line::from(format!("{} {}", when, App::history_label(entry)))).style(style)
        })
        .collect();

    let mut state = ListState::default();
    state.select(Some(app.history_selection));
    frame.render_stateful_widget(List::new(items).block(block), area, &mut state);
}

fn answer_lines(entry: &QueryEntry) -> Vec<Line<'static>> {
    let mut lines = vec![
        Line::from(Span::styled(entry.question.clone(), styles::emphasis_style())),
        Line::from(""),
    ];
    let style = if entry.failed {
        styles::error_style()
    } else {
        styles::list_item_style()
    };
    lines.extend(entry.answer.lines().map(|l| Line::styled(l.to_string(), style)));
    if let Some(precision) = entry.precision {
        lines.push(Line::from(""));
        lines.push(Line::from(vec![
            Span::styled("Precision: ", styles::muted_style()),
            Span::styled(format!("{:.2}", precision), styles::precision_style(precision)),
        ]));
    }
    lines
}

fn render_answer(frame: &mut Frame, app: &App, area: Rect) {
    let lines = match app.selected_entry() {
        Some(entry) => answer_lines(entry),
        None if app.loading > 0 => vec![empty_line(true, "")],
        None => vec![Line::from(Span::styled(
            "Answers from your portfolio documents appear here",
            styles::muted_style(),
        ))],
    };

    let block = Block::default()
        .title(" Answer ")
        .title_style(styles::title_style())
        .borders(Borders::ALL)
        .border_style(styles::border_style(false));
    frame.render_widget(
        Paragraph::new(lines).block(block).wrap(Wrap { trim: false }),
        area,
    );
}
