//! Terminal UI module using ratatui.
//!
//! This module provides the TUI rendering and input handling:
//!
//! - `render`: Frame layout, title and status bars, overlays
//! - `input`: Keyboard event handling per view
//! - `styles`: Color schemes and text styling
//! - `views`: Content rendering for each route (login, portfolios, etc.)

pub mod input;
pub mod render;
pub mod styles;
pub mod views;
