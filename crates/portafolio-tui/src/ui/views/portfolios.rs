use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem, ListState, Paragraph, Wrap},
    Frame,
};

use portafolio_core::models::{Portfolio, Role};
use portafolio_core::utils::truncate;

use crate::app::App;
use crate::ui::styles;

use super::empty_line;

pub fn render(frame: &mut Frame, app: &App, area: Rect) {
    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(55), Constraint::Percentage(45)])
        .split(area);

    render_list(frame, app, chunks[0]);
    render_summary(frame, app, chunks[1]);
}

fn render_list(frame: &mut Frame, app: &App, area: Rect) {
    let visible = app.filtered_portfolios();

    let mut title = format!(" Portfolios ({}) ", visible.len());
    if app.portfolio_filter.is_active() {
        title = format!(
            " Portfolios ({} of {}) · filter: {} {} ",
            visible.len(),
            app.portfolios.len(),
            app.portfolio_filter.name,
            app.portfolio_filter.year
        );
    }
    let block = Block::default()
        .title(title)
        .title_style(styles::title_style())
        .borders(Borders::ALL)
        .border_style(styles::border_style(true));

    if visible.is_empty() {
        frame.render_widget(
            Paragraph::new(empty_line(app.loading > 0, "portfolios")).block(block),
            area,
        );
        return;
    }

    let items: Vec<ListItem> = visible
        .iter()
        .enumerate()
        .map(|(i, p)| {
            let style = if i == app.portfolio_selection {
                styles::selected_style()
            } else {
                styles::list_item_style()
            };
            ListItem::new(Line::from(format!("{:<34} {}", truncate(&p.nombre, 32), p.year())))
                .style(style)
        })
        .collect();

    let mut state = ListState::default();
    state.select(Some(app.portfolio_selection));
    frame.render_stateful_widget(List::new(items).block(block), area, &mut state);
}

fn summary_lines(portfolio: &Portfolio, show_owner: bool) -> Vec<Line<'static>> {
    let mut lines = vec![
        Line::from(Span::styled(portfolio.nombre.clone(), styles::emphasis_style())),
        Line::from(""),
        Line::from(vec![
            Span::styled("Year: ", styles::muted_style()),
            Span::raw(portfolio.year().to_string()),
        ]),
    ];
    if show_owner {
        if let Some(email) = portfolio.owner_email() {
            lines.push(Line::from(vec![
                Span::styled("Owner: ", styles::muted_style()),
                Span::raw(email.to_string()),
            ]));
        }
    }
    if let Some(description) = portfolio.descripcion.as_deref().filter(|d| !d.trim().is_empty()) {
        lines.push(Line::from(""));
        lines.push(Line::from(description.to_string()));
    }
    lines
}

fn render_summary(frame: &mut Frame, app: &App, area: Rect) {
    let lines = match app.selected_portfolio() {
        Some(p) => summary_lines(p, app.role() == Some(Role::Administrator)),
        None => vec![],
    };

    let block = Block::default()
        .title(" Details ")
        .title_style(styles::title_style())
        .borders(Borders::ALL)
        .border_style(styles::border_style(false));
    frame.render_widget(
        Paragraph::new(lines).block(block).wrap(Wrap { trim: false }),
        area,
    );
}
