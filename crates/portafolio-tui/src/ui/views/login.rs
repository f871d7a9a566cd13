use ratatui::{
    layout::Rect,
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph},
    Frame,
};

use crate::app::App;
use crate::ui::render::centered_rect_fixed;
use crate::ui::styles;

use super::form_lines;

pub fn render(frame: &mut Frame, app: &App, area: Rect) {
    let extra = app.login_notice.is_some() as u16 * 2 + app.login_form.error.is_some() as u16 * 2;
    let dialog = centered_rect_fixed(56, 11 + extra, area);
    frame.render_widget(Clear, dialog);

    let mut lines = vec![
        Line::from(Span::styled("  Portafolio docente", styles::title_style())),
        Line::from(Span::styled(
            format!("  {}", app.api.base_url()),
            styles::muted_style(),
        )),
        Line::from(""),
    ];

    if let Some(ref notice) = app.login_notice {
        lines.push(Line::from(Span::styled(format!("  {}", notice), styles::notice_style())));
        lines.push(Line::from(""));
    }

    lines.extend(form_lines(&app.login_form, 9));

    lines.push(Line::from(""));
    let button_style = if app.login_form.is_last_field() {
        styles::selected_style()
    } else {
        styles::list_item_style()
    };
    lines.push(Line::from(vec![
        Span::raw("                  ["),
        Span::styled("  Sign in  ", button_style),
        Span::raw("]"),
    ]));

    if let Some(ref error) = app.login_form.error {
        lines.push(Line::from(""));
        lines.push(Line::from(Span::styled(format!("  {}", error), styles::error_style())));
    }

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(styles::border_style(true));

    frame.render_widget(Paragraph::new(lines).block(block), dialog);
}
