use ratatui::style::{Color, Modifier, Style};

use portafolio_core::models::{Category, Role};

// Institutional palette: crimson and gold over a slate base
pub const CRIMSON: Color = Color::Rgb(176, 58, 72);
pub const GOLD: Color = Color::Rgb(214, 170, 72);
pub const SAGE: Color = Color::Rgb(110, 170, 120);
pub const ALERT: Color = Color::Rgb(226, 92, 64);
pub const SLATE: Color = Color::Rgb(122, 128, 142);
pub const INK: Color = Color::Rgb(226, 224, 214);
pub const DUSK: Color = Color::Rgb(50, 40, 56);

// Category accents, shared by the tab strip and the file list title
const THEORY: Color = Color::Rgb(98, 150, 210);
const PRACTICE: Color = GOLD;
const LABORATORY: Color = SAGE;

/// Answers at or above this precision are shown as reliable.
const HIGH_PRECISION: f64 = 70.0;
const LOW_PRECISION: f64 = 40.0;

pub fn title_style() -> Style {
    Style::default().fg(CRIMSON).add_modifier(Modifier::BOLD)
}

pub fn selected_style() -> Style {
    Style::default().bg(DUSK).fg(GOLD).add_modifier(Modifier::BOLD)
}

pub fn list_item_style() -> Style {
    Style::default().fg(INK)
}

pub fn muted_style() -> Style {
    Style::default().fg(SLATE)
}

/// Portfolio names, quoted questions and other headline text inside a pane.
pub fn emphasis_style() -> Style {
    Style::default().fg(GOLD)
}

pub fn error_style() -> Style {
    Style::default().fg(ALERT)
}

/// Login banner after a sign-out or an expired session.
pub fn notice_style() -> Style {
    Style::default().fg(GOLD).add_modifier(Modifier::ITALIC)
}

pub fn link_style() -> Style {
    Style::default().fg(THEORY).add_modifier(Modifier::UNDERLINED)
}

pub fn category_color(category: Category) -> Color {
    match category {
        Category::Theory => THEORY,
        Category::Practice => PRACTICE,
        Category::Laboratory => LABORATORY,
    }
}

pub fn category_style(category: Category, selected: bool) -> Style {
    let style = Style::default().fg(category_color(category));
    if selected {
        style.add_modifier(Modifier::BOLD | Modifier::UNDERLINED)
    } else {
        style.add_modifier(Modifier::DIM)
    }
}

/// Week numbers: current week underlined, empty weeks dimmed.
pub fn week_style(selected: bool, has_files: bool) -> Style {
    match (selected, has_files) {
        (true, _) => Style::default()
            .fg(CRIMSON)
            .add_modifier(Modifier::BOLD | Modifier::UNDERLINED),
        (false, true) => Style::default().fg(INK),
        (false, false) => Style::default().fg(SLATE),
    }
}

pub fn role_style(role: Option<Role>) -> Style {
    match role {
        Some(Role::Administrator) => Style::default().fg(CRIMSON),
        Some(Role::Teacher) => Style::default().fg(INK),
        None => Style::default().fg(SLATE),
    }
}

pub fn precision_style(precision: f64) -> Style {
    if precision >= HIGH_PRECISION {
        Style::default().fg(SAGE).add_modifier(Modifier::BOLD)
    } else if precision >= LOW_PRECISION {
        Style::default().fg(GOLD)
    } else {
        Style::default().fg(ALERT)
    }
}

pub fn border_style(focused: bool) -> Style {
    if focused {
        Style::default().fg(CRIMSON)
    } else {
        Style::default().fg(SLATE)
    }
}

/// Text being typed into a field or the question box.
pub fn input_style() -> Style {
    Style::default().fg(GOLD)
}

pub fn status_bar_style() -> Style {
    Style::default().bg(Color::Rgb(36, 30, 40)).fg(INK)
}

pub fn key_hint_style() -> Style {
    Style::default().fg(GOLD).add_modifier(Modifier::BOLD)
}
