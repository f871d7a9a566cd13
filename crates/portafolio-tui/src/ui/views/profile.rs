use ratatui::{
    layout::Rect,
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
    Frame,
};

use portafolio_core::auth::now_millis;

use crate::app::App;
use crate::ui::styles;

fn field(label: &str, value: String) -> Line<'static> {
    Line::from(vec![
        Span::styled(format!("  {:<10}", label), styles::muted_style()),
        Span::raw(value),
    ])
}

pub fn render(frame: &mut Frame, app: &App, area: Rect) {
    let session = app.router.session().snapshot();
    let role = session
        .role()
        .map(|r| r.display_name().to_string())
        .or_else(|| session.role.clone())
        .unwrap_or_else(|| "-".to_string());

    let lines = vec![
        Line::from(""),
        field("Email", session.email.clone().unwrap_or_else(|| "-".to_string())),
        field("Role", role),
        field("User id", session.user_id.clone().unwrap_or_else(|| "-".to_string())),
        field(
            "Session",
            format!("{} min left", session.minutes_until_expiry(now_millis())),
        ),
        Line::from(""),
        Line::from(Span::styled(
            "  Press e to change your name or password.",
            styles::muted_style(),
        )),
    ];

    let block = Block::default()
        .title(" My profile ")
        .title_style(styles::title_style())
        .borders(Borders::ALL)
        .border_style(styles::border_style(true));
    frame.render_widget(Paragraph::new(lines).block(block), area);
}
