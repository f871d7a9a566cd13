use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem, ListState, Paragraph},
    Frame,
};

use portafolio_core::auth::Route;

use crate::app::App;
use crate::ui::styles;

/// Landing menu for administrators and teachers.
pub fn render(frame: &mut Frame, app: &App, area: Rect) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(4), Constraint::Min(4)])
        .split(area);

    let greeting = match app.route() {
        Route::AdminHome => "Administration",
        _ => "Teacher dashboard",
    };
    let who = app.email().unwrap_or_default();
    let header = vec![
        Line::from(Span::styled(format!(" {}", greeting), styles::title_style())),
        Line::from(Span::styled(format!(" {}", who), styles::muted_style())),
    ];
    frame.render_widget(
        Paragraph::new(header).block(Block::default().borders(Borders::BOTTOM).border_style(styles::muted_style())),
        chunks[0],
    );

    let items: Vec<ListItem> = app
        .menu_items()
        .iter()
        .enumerate()
        .map(|(i, item)| {
            let style = if i == app.menu_selection {
                styles::selected_style()
            } else {
                styles::list_item_style()
            };
            ListItem::new(Line::from(format!("  {}", item.label()))).style(style)
        })
        .collect();

    let block = Block::default()
        .title(" Menu ")
        .title_style(styles::title_style())
        .borders(Borders::ALL)
        .border_style(styles::border_style(true));

    let mut state = ListState::default();
    state.select(Some(app.menu_selection));
    frame.render_stateful_widget(List::new(items).block(block), chunks[1], &mut state);
}
