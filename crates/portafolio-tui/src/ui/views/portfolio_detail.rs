use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem, ListState, Paragraph},
    Frame,
};

use portafolio_core::models::{Category, WEEK_COUNT};

use crate::app::App;
use crate::ui::styles;

use super::empty_line;

pub fn render(frame: &mut Frame, app: &App, area: Rect) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Heading
            Constraint::Length(2), // Weeks
            Constraint::Length(2), // Categories
            Constraint::Min(4),    // Files
            Constraint::Length(3), // Selected file link
        ])
        .split(area);

    render_heading(frame, app, chunks[0]);
    render_weeks(frame, app, chunks[1]);
    render_categories(frame, app, chunks[2]);
    render_files(frame, app, chunks[3]);
    render_link(frame, app, chunks[4]);
}

fn render_heading(frame: &mut Frame, app: &App, area: Rect) {
    let line = match app.portfolio.as_ref() {
        Some(p) => Line::from(vec![
            Span::styled(format!(" {}", p.heading()), styles::title_style()),
            Span::styled(format!("  {} · {}", p.nombre, p.year()), styles::muted_style()),
        ]),
        None => empty_line(true, ""),
    };
    let block = Block::default()
        .borders(Borders::BOTTOM)
        .border_style(styles::muted_style());
    frame.render_widget(Paragraph::new(line).block(block), area);
}

fn render_weeks(frame: &mut Frame, app: &App, area: Rect) {
    let counts = app.week_counts();
    let mut spans = vec![Span::styled(" Week ", styles::muted_style())];
    for week in 1..=WEEK_COUNT {
        let count = counts[(week - 1) as usize];
        let label = if count > 0 {
            format!("{}({})", week, count)
        } else {
            week.to_string()
        };
        spans.push(Span::styled(label, styles::week_style(week == app.week, count > 0)));
        spans.push(Span::raw(" "));
    }
    frame.render_widget(Paragraph::new(Line::from(spans)), area);
}

fn render_categories(frame: &mut Frame, app: &App, area: Rect) {
    let mut spans = vec![Span::styled(" ", styles::muted_style())];
    for (i, category) in Category::ALL.iter().enumerate() {
        if i > 0 {
            spans.push(Span::styled(" | ", styles::muted_style()));
        }
        spans.push(Span::styled(
            category.display_name(),
            styles::category_style(*category, *category == app.category),
        ));
    }
    frame.render_widget(Paragraph::new(Line::from(spans)), area);
}

fn render_files(frame: &mut Frame, app: &App, area: Rect) {
    let files = app.section_files();
    let block = Block::default()
        .title(format!(
            " Week {} · {} ({}) ",
            app.week,
            app.category.display_name(),
            files.len()
        ))
        .title_style(styles::category_style(app.category, true))
        .borders(Borders::ALL)
        .border_style(styles::border_style(true));

    if files.is_empty() {
        frame.render_widget(
            Paragraph::new(empty_line(app.portfolio.is_none(), "files in this section")).block(block),
            area,
        );
        return;
    }

    let items: Vec<ListItem> = files
        .iter()
        .enumerate()
        .map(|(i, file)| {
            let style = if i == app.file_selection {
                styles::selected_style()
            } else {
                styles::list_item_style()
            };
            let uploader = file.usuario.as_deref().unwrap_or("");
            ListItem::new(Line::from(vec![
                Span::raw(format!("  {}", file.display_name())),
                Span::styled(format!("  {}", uploader), styles::muted_style()),
            ]))
            .style(style)
        })
        .collect();

    let mut state = ListState::default();
    state.select(Some(app.file_selection));
    frame.render_stateful_widget(List::new(items).block(block), area, &mut state);
}

fn render_link(frame: &mut Frame, app: &App, area: Rect) {
    let line = match app.selected_file().and_then(|f| f.link()) {
        Some(link) => Line::from(vec![
            Span::styled(" Link: ", styles::muted_style()),
            Span::styled(link.to_string(), styles::link_style()),
        ]),
        None => Line::from(""),
    };
    let block = Block::default()
        .borders(Borders::TOP)
        .border_style(styles::muted_style());
    frame.render_widget(Paragraph::new(line).block(block), area);
}
