//! Per-route content rendering.

pub mod home;
pub mod login;
pub mod menu;
pub mod portfolio_detail;
pub mod portfolios;
pub mod profile;
pub mod users;

use ratatui::text::{Line, Span};

use crate::form::Form;
use crate::ui::styles;

/// One line per field: label, bracketed value, cursor on the focused field.
pub fn form_lines(form: &Form, label_width: usize) -> Vec<Line<'static>> {
    form.fields
        .iter()
        .enumerate()
        .map(|(i, field)| {
            let focused = i == form.focus;
            let value_style = if focused {
                styles::selected_style()
            } else {
                styles::list_item_style()
            };
            let cursor = if focused { "▌" } else { "" };
            Line::from(vec![
                Span::styled(format!(" {:>width$}: [", field.label, width = label_width), styles::muted_style()),
                Span::styled(format!("{}{}", field.display(), cursor), value_style),
                Span::styled("]", styles::muted_style()),
            ])
        })
        .collect()
}

/// Placeholder shown while a list is empty.
pub fn empty_line(loading: bool, what: &str) -> Line<'static> {
    let text = if loading {
        "  Loading...".to_string()
    } else {
        format!("  No {} to show", what)
    };
    Line::from(Span::styled(text, styles::muted_style()))
}
