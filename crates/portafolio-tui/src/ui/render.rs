use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::Style,
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph, Wrap},
    Frame,
};

use portafolio_core::auth::Route;

use crate::app::{App, AppState};

use super::styles;
use super::views::{self, home, login, menu, portfolio_detail, portfolios, profile, users};

pub fn render(frame: &mut Frame, app: &App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Title bar
            Constraint::Min(10),   // Main content
            Constraint::Length(2), // Status bar
        ])
        .split(frame.area());

    render_title_bar(frame, app, chunks[0]);
    render_main_content(frame, app, chunks[1]);
    render_status_bar(frame, app, chunks[2]);

    // Render overlays
    match app.state {
        AppState::ShowingHelp => render_help_overlay(frame, app),
        AppState::ConfirmingQuit => render_quit_overlay(frame),
        AppState::ConfirmingDelete => render_delete_overlay(frame, app),
        AppState::EditingForm => render_form_overlay(frame, app),
        _ => {}
    }
}

fn render_title_bar(frame: &mut Frame, app: &App, area: Rect) {
    let title = format!("  Portafolio · {}", app.route().title());
    let right = match app.session_summary() {
        Some(summary) => format!("{}  [?] Help", summary),
        None => "[?] Help".to_string(),
    };

    let title_line = Line::from(vec![
        Span::styled(title.clone(), styles::title_style()),
        Span::raw(" ".repeat(
            (area.width as usize).saturating_sub(title.chars().count() + right.chars().count() + 2),
        )),
        Span::styled(right, styles::muted_style()),
    ]);

    let block = Block::default()
        .borders(Borders::BOTTOM)
        .border_style(styles::muted_style());

    let paragraph = Paragraph::new(title_line).block(block);
    frame.render_widget(paragraph, area);
}

fn render_main_content(frame: &mut Frame, app: &App, area: Rect) {
    match app.route() {
        Route::Login => login::render(frame, app, area),
        Route::Home => home::render(frame, app, area),
        Route::AdminHome | Route::TeacherDashboard => menu::render(frame, app, area),
        Route::AdminUsers => users::render(frame, app, area),
        Route::Portfolios => portfolios::render(frame, app, area),
        Route::PortfolioDetail(_) => portfolio_detail::render(frame, app, area),
        Route::Profile => profile::render(frame, app, area),
    }
}

/// Key hints for the status bar, by view.
fn shortcuts(app: &App) -> &'static str {
    match app.route() {
        Route::Login => "[Tab] next field | [Enter] sign in | [Esc] quit",
        Route::Home => "[/] ask | [c]lear | [g]o home | [q]uit",
        Route::AdminHome | Route::TeacherDashboard => "[Enter] open | [L]ogout | [q]uit",
        Route::AdminUsers => "[n]ew | [e]dit | [d]elete | [r]eload | [g]o home",
        Route::Portfolios => "[Enter] open | [n]ew | [e]dit | [d]elete | [f]ilter | [g]o home",
        Route::PortfolioDetail(_) => "[←/→] week | [Tab] category | [u]pload | [d]elete | [Esc] back",
        Route::Profile => "[e]dit | [g]o home | [L]ogout",
    }
}

fn render_status_bar(frame: &mut Frame, app: &App, area: Rect) {
    let left_text = if let Some(ref msg) = app.status_message {
        format!(" {} ", msg)
    } else if app.loading > 0 {
        " Loading... ".to_string()
    } else {
        String::new()
    };
    let right_text = format!(" {} ", shortcuts(app));

    let width = area.width as usize;
    let padding_len = width
        .saturating_sub(left_text.chars().count())
        .saturating_sub(right_text.chars().count());
    let status_line = Line::from(vec![
        Span::styled(left_text, styles::muted_style()),
        Span::raw(" ".repeat(padding_len)),
        Span::styled(right_text, styles::muted_style()),
    ]);
    let paragraph = Paragraph::new(status_line).style(styles::status_bar_style());
    frame.render_widget(paragraph, area);
}

fn help_line(key: &'static str, desc: &'static str) -> Line<'static> {
    Line::from(vec![
        Span::styled(format!("  {:<10}", key), styles::key_hint_style()),
        Span::styled(desc, styles::list_item_style()),
    ])
}

fn render_help_overlay(frame: &mut Frame, _app: &App) {
    let area = centered_rect_fixed(54, 26, frame.area());

    // Clear the area
    frame.render_widget(Clear, area);

    let version = env!("CARGO_PKG_VERSION");

    let help_text = vec![
        Line::from(Span::styled("  Portafolio", styles::title_style())),
        Line::from(Span::styled(format!("  version {}", version), styles::muted_style())),
        Line::from(""),
        Line::from(Span::styled(" Navigation", styles::emphasis_style())),
        help_line("g", "Home for your role"),
        help_line("h", "Search documents"),
        help_line("p", "Portfolios"),
        help_line("a", "Manage teachers (administrators)"),
        help_line("i", "My profile"),
        help_line("↑/↓", "Move in list"),
        help_line("Enter", "Open / show"),
        help_line("Esc", "Back"),
        Line::from(""),
        Line::from(Span::styled(" Actions", styles::emphasis_style())),
        help_line("n / e / d", "New / edit / delete"),
        help_line("/", "Ask a question"),
        help_line("u", "Upload files to week and category"),
        help_line("f", "Filter portfolios"),
        help_line("r", "Reload"),
        help_line("L", "Sign out"),
        help_line("q", "Quit"),
        Line::from(""),
        Line::from(vec![
            Span::styled("       Press ", styles::muted_style()),
            Span::styled("?", styles::key_hint_style()),
            Span::styled(" or ", styles::muted_style()),
            Span::styled("Esc", styles::key_hint_style()),
            Span::styled(" to close", styles::muted_style()),
        ]),
    ];

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(styles::border_style(true))
        .style(Style::default());

    let paragraph = Paragraph::new(help_text).block(block);

    frame.render_widget(paragraph, area);
}

fn render_form_overlay(frame: &mut Frame, app: &App) {
    let Some(active) = app.form.as_ref() else {
        return;
    };

    let error_rows = if active.form.error.is_some() { 2 } else { 0 };
    let height = active.form.fields.len() as u16 + 5 + error_rows;
    let area = centered_rect_fixed(64, height, frame.area());

    frame.render_widget(Clear, area);

    let mut lines = vec![Line::from("")];
    lines.extend(views::form_lines(&active.form, 26));
    lines.push(Line::from(""));
    lines.push(Line::from(vec![
        Span::styled(" [Enter]", styles::key_hint_style()),
        Span::styled(" next / save  ", styles::muted_style()),
        Span::styled("[Esc]", styles::key_hint_style()),
        Span::styled(" cancel", styles::muted_style()),
    ]));
    if let Some(ref error) = active.form.error {
        lines.push(Line::from(""));
        lines.push(Line::from(Span::styled(format!(" {}", error), styles::error_style())));
    }

    let block = Block::default()
        .title(Span::styled(format!(" {} ", active.kind.title()), styles::title_style()))
        .borders(Borders::ALL)
        .border_style(styles::border_style(true));

    frame.render_widget(Paragraph::new(lines).block(block), area);
}

fn render_delete_overlay(frame: &mut Frame, app: &App) {
    let Some(pending) = app.pending_delete.as_ref() else {
        return;
    };

    let area = centered_rect_fixed(54, 8, frame.area());
    frame.render_widget(Clear, area);

    let lines = vec![
        Line::from(""),
        Line::from(Span::styled(
            format!(" Delete {}?", pending.describe()),
            styles::emphasis_style(),
        )),
        Line::from(Span::styled(" This cannot be undone.", styles::muted_style())),
        Line::from(""),
        Line::from(vec![
            Span::styled(" Press ", styles::muted_style()),
            Span::styled("[Y]", styles::key_hint_style()),
            Span::styled(" to delete, ", styles::muted_style()),
            Span::styled("[N]", styles::key_hint_style()),
            Span::styled(" to cancel", styles::muted_style()),
        ]),
    ];

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(styles::error_style());

    frame.render_widget(
        Paragraph::new(lines).block(block).wrap(Wrap { trim: false }),
        area,
    );
}

/// Create a centered rectangle with fixed dimensions
pub fn centered_rect_fixed(width: u16, height: u16, r: Rect) -> Rect {
    let x = r.x + (r.width.saturating_sub(width)) / 2;
    let y = r.y + (r.height.saturating_sub(height)) / 2;
    Rect::new(x, y, width.min(r.width), height.min(r.height))
}

fn render_quit_overlay(frame: &mut Frame) {
    let area = centered_rect_fixed(46, 7, frame.area());

    // Clear the area
    frame.render_widget(Clear, area);

    let lines = vec![
        Line::from(""),
        Line::from(Span::styled(
            "   Are you sure you want to quit?",
            styles::emphasis_style(),
        )),
        Line::from(""),
        Line::from(vec![
            Span::styled("   Press ", styles::muted_style()),
            Span::styled("[Y]", styles::key_hint_style()),
            Span::styled(" to quit, ", styles::muted_style()),
            Span::styled("[N]", styles::key_hint_style()),
            Span::styled(" to cancel", styles::muted_style()),
        ]),
    ];

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(styles::border_style(true))
        .style(Style::default());

    let paragraph = Paragraph::new(lines).block(block);

    frame.render_widget(paragraph, area);
}
