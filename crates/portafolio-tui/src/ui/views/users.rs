use ratatui::{
    layout::Rect,
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem, ListState, Paragraph},
    Frame,
};

use portafolio_core::models::User;
use portafolio_core::utils::truncate;

use crate::app::App;
use crate::ui::styles;

use super::empty_line;

fn role_label(user: &User) -> String {
    match user.role() {
        Some(role) => role.display_name().to_string(),
        None => user
            .role_ref()
            .and_then(|r| r.name())
            .unwrap_or("-")
            .to_string(),
    }
}

pub fn render(frame: &mut Frame, app: &App, area: Rect) {
    let block = Block::default()
        .title(format!(" Teachers ({}) ", app.users.len()))
        .title_style(styles::title_style())
        .borders(Borders::ALL)
        .border_style(styles::border_style(true));

    if app.users.is_empty() {
        frame.render_widget(
            Paragraph::new(empty_line(app.loading > 0, "accounts")).block(block),
            area,
        );
        return;
    }

    let mut items = vec![ListItem::new(Line::from(Span::styled(
        format!("  {:<30} {:<34} {}", "Name", "Email", "Role"),
        styles::muted_style(),
    )))];
    items.extend(app.users.iter().enumerate().map(|(i, user)| {
        let selected = i == app.users_selection;
        let row_style = if selected {
            styles::selected_style()
        } else {
            styles::list_item_style()
        };
        let role_style = if selected {
            row_style
        } else {
            styles::role_style(user.role())
        };
        ListItem::new(Line::from(vec![
            Span::raw(format!(
                "  {:<30} {:<34} ",
                truncate(&user.full_name(), 28),
                truncate(&user.email, 32)
            )),
            Span::styled(role_label(user), role_style),
        ]))
        .style(row_style)
    }));

    let mut state = ListState::default();
    // Row 0 is the header
    state.select(Some(app.users_selection + 1));
    frame.render_stateful_widget(List::new(items).block(block), area, &mut state);
}
