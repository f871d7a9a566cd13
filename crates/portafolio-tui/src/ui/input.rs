//! Keyboard input handling for the TUI.
//!
//! This module handles all keyboard events and translates them into
//! application state changes. Overlays take keys first, then the login
//! view, then global shortcuts, then the current view.

use anyhow::Result;
use crossterm::event::{KeyCode, KeyEvent};

use portafolio_core::auth::Route;

use crate::app::{App, AppState, FormKind, PAGE_SCROLL_SIZE};

/// Longest question accepted in the search box.
const MAX_QUESTION_LENGTH: usize = 500;

/// Handle keyboard input. Returns true if the app should quit.
pub async fn handle_input(app: &mut App, key: KeyEvent) -> Result<bool> {
    match app.state {
        AppState::ShowingHelp => {
            if matches!(key.code, KeyCode::Esc | KeyCode::Char('?') | KeyCode::Char('q')) {
                app.state = AppState::Normal;
            }
            return Ok(false);
        }
        AppState::ConfirmingQuit => {
            match key.code {
                KeyCode::Char('y') | KeyCode::Char('Y') | KeyCode::Enter => {
                    app.state = AppState::Quitting;
                    return Ok(true);
                }
                KeyCode::Char('n') | KeyCode::Char('N') | KeyCode::Esc => {
                    app.state = AppState::Normal;
                }
                _ => {}
            }
            return Ok(false);
        }
        AppState::ConfirmingDelete => {
            match key.code {
                KeyCode::Char('y') | KeyCode::Char('Y') | KeyCode::Enter => app.confirm_delete(),
                KeyCode::Char('n') | KeyCode::Char('N') | KeyCode::Esc => app.cancel_delete(),
                _ => {}
            }
            return Ok(false);
        }
        AppState::EditingForm => {
            handle_form_input(app, key);
            return Ok(false);
        }
        AppState::Asking => {
            handle_question_input(app, key);
            return Ok(false);
        }
        AppState::Normal | AppState::Quitting => {}
    }

    if *app.route() == Route::Login {
        return handle_login_input(app, key).await;
    }

    // Global keys
    match key.code {
        KeyCode::Char('q') => {
            app.state = AppState::ConfirmingQuit;
            return Ok(false);
        }
        KeyCode::Char('?') => {
            app.state = AppState::ShowingHelp;
            return Ok(false);
        }
        KeyCode::Char('g') => {
            app.start();
            return Ok(false);
        }
        KeyCode::Char('h') => {
            app.navigate(Route::Home);
            return Ok(false);
        }
        KeyCode::Char('p') => {
            app.navigate(Route::Portfolios);
            return Ok(false);
        }
        KeyCode::Char('a') => {
            app.navigate(Route::AdminUsers);
            return Ok(false);
        }
        KeyCode::Char('i') => {
            app.navigate(Route::Profile);
            return Ok(false);
        }
        KeyCode::Char('L') => {
            app.logout();
            return Ok(false);
        }
        KeyCode::Up => {
            app.move_selection(-1);
            return Ok(false);
        }
        KeyCode::Down => {
            app.move_selection(1);
            return Ok(false);
        }
        KeyCode::PageUp => {
            app.move_selection(-(PAGE_SCROLL_SIZE as isize));
            return Ok(false);
        }
        KeyCode::PageDown => {
            app.move_selection(PAGE_SCROLL_SIZE as isize);
            return Ok(false);
        }
        KeyCode::Home => {
            app.move_selection(isize::MIN);
            return Ok(false);
        }
        KeyCode::End => {
            app.move_selection(isize::MAX);
            return Ok(false);
        }
        _ => {}
    }

    // Any other key clears a stale status message
    app.status_message = None;

    match app.route().clone() {
        Route::AdminHome | Route::TeacherDashboard => {
            if key.code == KeyCode::Enter {
                app.activate_menu();
            }
        }
        Route::Home => match key.code {
            KeyCode::Char('/') => app.state = AppState::Asking,
            KeyCode::Char('c') => app.clear_history(),
            _ => {}
        },
        Route::AdminUsers => match key.code {
            KeyCode::Char('n') => app.open_form(FormKind::NewTeacher),
            KeyCode::Char('e') | KeyCode::Enter => {
                if let Some(user) = app.selected_user().cloned() {
                    app.open_form(FormKind::EditTeacher(user));
                }
            }
            KeyCode::Char('d') | KeyCode::Delete => app.request_delete(),
            KeyCode::Char('r') => app.load_users(),
            KeyCode::Esc => app.start(),
            _ => {}
        },
        Route::Portfolios => match key.code {
            KeyCode::Enter => app.open_selected_portfolio(),
            KeyCode::Char('n') => app.open_form(FormKind::NewPortfolio),
            KeyCode::Char('e') => {
                if let Some(id) = app.selected_portfolio().map(|p| p.id().to_string()) {
                    app.open_form(FormKind::EditPortfolio(id));
                }
            }
            KeyCode::Char('d') | KeyCode::Delete => app.request_delete(),
            KeyCode::Char('f') => app.open_form(FormKind::FilterPortfolios),
            KeyCode::Char('r') => app.load_portfolios(),
            KeyCode::Esc => app.start(),
            _ => {}
        },
        Route::PortfolioDetail(id) => match key.code {
            KeyCode::Right => app.select_week(true),
            KeyCode::Left => app.select_week(false),
            KeyCode::Tab => app.select_category(true),
            KeyCode::BackTab => app.select_category(false),
            KeyCode::Char('u') => app.open_form(FormKind::Upload),
            KeyCode::Char('d') | KeyCode::Delete => app.request_delete(),
            KeyCode::Char('r') => app.load_detail(&id),
            KeyCode::Esc | KeyCode::Backspace => app.navigate(Route::Portfolios),
            _ => {}
        },
        Route::Profile => match key.code {
            KeyCode::Char('e') | KeyCode::Enter => app.open_form(FormKind::Profile),
            KeyCode::Esc => app.start(),
            _ => {}
        },
        Route::Login => {}
    }

    Ok(false)
}

fn handle_question_input(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Esc => {
            app.state = AppState::Normal;
            app.question.clear();
        }
        KeyCode::Enter => app.ask(),
        KeyCode::Backspace => {
            app.question.pop();
        }
        KeyCode::Char(c) if !c.is_control() && app.question.chars().count() < MAX_QUESTION_LENGTH => {
            app.question.push(c);
        }
        _ => {}
    }
}

fn handle_form_input(app: &mut App, key: KeyEvent) {
    if key.code == KeyCode::Esc {
        app.cancel_form();
        return;
    }
    let Some(active) = app.form.as_mut() else {
        app.state = AppState::Normal;
        return;
    };
    let form = &mut active.form;

    match key.code {
        KeyCode::Down | KeyCode::Tab => form.focus_next(),
        KeyCode::Up | KeyCode::BackTab => form.focus_prev(),
        KeyCode::Enter => {
            if form.is_last_field() {
                app.submit_form();
            } else {
                form.focus_next();
            }
        }
        KeyCode::Backspace => form.pop_char(),
        KeyCode::Char(c) => {
            form.push_char(c);
        }
        _ => {}
    }
}

async fn handle_login_input(app: &mut App, key: KeyEvent) -> Result<bool> {
    let form = &mut app.login_form;
    match key.code {
        KeyCode::Esc => {
            // Quit if on login screen
            app.state = AppState::Quitting;
            return Ok(true);
        }
        KeyCode::Down | KeyCode::Tab => form.focus_next(),
        KeyCode::Up | KeyCode::BackTab => form.focus_prev(),
        KeyCode::Enter => {
            if form.is_last_field() {
                // Failures are shown on the form
                let _ = app.attempt_login().await;
            } else {
                form.focus_next();
            }
        }
        KeyCode::Backspace => form.pop_char(),
        KeyCode::Char(c) => {
            form.push_char(c);
        }
        _ => {}
    }
    Ok(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossterm::event::KeyModifiers;
    use portafolio_core::auth::SessionGrant;
    use portafolio_core::Config;
    use tempfile::TempDir;

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn signed_in_app(dir: &TempDir, role: &str) -> App {
        let config = Config {
            api_url: Some("http://127.0.0.1:9/api".to_string()),
            ..Config::default()
        };
        let mut app = App::with_config(config, dir.path()).unwrap();
        app.apply_grant(&SessionGrant {
            token: "abc".to_string(),
            user_id: "u1".to_string(),
            role: Some(role.to_string()),
            email: Some("docente@uni.edu".to_string()),
        })
        .unwrap();
        app
    }

    #[tokio::test]
    async fn test_quit_requires_confirmation() {
        let dir = TempDir::new().unwrap();
        let mut app = signed_in_app(&dir, "DOCENTE");

        assert!(!handle_input(&mut app, key(KeyCode::Char('q'))).await.unwrap());
        assert_eq!(app.state, AppState::ConfirmingQuit);
        assert!(!handle_input(&mut app, key(KeyCode::Char('n'))).await.unwrap());
        assert_eq!(app.state, AppState::Normal);

        handle_input(&mut app, key(KeyCode::Char('q'))).await.unwrap();
        assert!(handle_input(&mut app, key(KeyCode::Char('y'))).await.unwrap());
    }

    #[tokio::test]
    async fn test_typing_question_in_asking_mode() {
        let dir = TempDir::new().unwrap();
        let mut app = signed_in_app(&dir, "DOCENTE");
        handle_input(&mut app, key(KeyCode::Char('h'))).await.unwrap();
        assert_eq!(*app.route(), Route::Home);

        handle_input(&mut app, key(KeyCode::Char('/'))).await.unwrap();
        assert_eq!(app.state, AppState::Asking);
        for c in "qué".chars() {
            handle_input(&mut app, key(KeyCode::Char(c))).await.unwrap();
        }
        // Global keys are typed, not interpreted
        handle_input(&mut app, key(KeyCode::Char('q'))).await.unwrap();
        assert_eq!(app.question, "quéq");

        handle_input(&mut app, key(KeyCode::Esc)).await.unwrap();
        assert_eq!(app.state, AppState::Normal);
        assert!(app.question.is_empty());
    }

    #[tokio::test]
    async fn test_teacher_cannot_reach_user_management() {
        let dir = TempDir::new().unwrap();
        let mut app = signed_in_app(&dir, "DOCENTE");

        handle_input(&mut app, key(KeyCode::Char('a'))).await.unwrap();
        assert_eq!(*app.route(), Route::Home);
    }

    #[tokio::test]
    async fn test_form_escape_cancels() {
        let dir = TempDir::new().unwrap();
        let mut app = signed_in_app(&dir, "ADMINISTRADOR");
        handle_input(&mut app, key(KeyCode::Char('p'))).await.unwrap();
        handle_input(&mut app, key(KeyCode::Char('f'))).await.unwrap();
        assert_eq!(app.state, AppState::EditingForm);

        handle_input(&mut app, key(KeyCode::Char('x'))).await.unwrap();
        assert_eq!(app.form.as_ref().unwrap().form.value(0), "x");

        handle_input(&mut app, key(KeyCode::Esc)).await.unwrap();
        assert!(app.form.is_none());
        assert_eq!(app.state, AppState::Normal);
    }

    #[tokio::test]
    async fn test_week_keys_are_arrows_only() {
        let dir = TempDir::new().unwrap();
        let mut app = signed_in_app(&dir, "DOCENTE");
        app.navigate(Route::PortfolioDetail("p1".to_string()));
        assert_eq!(app.week, 1);

        handle_input(&mut app, key(KeyCode::Char('l'))).await.unwrap();
        assert_eq!(app.week, 1);

        handle_input(&mut app, key(KeyCode::Right)).await.unwrap();
        assert_eq!(app.week, 2);
        handle_input(&mut app, key(KeyCode::Left)).await.unwrap();
        assert_eq!(app.week, 1);
        assert_eq!(*app.route(), Route::PortfolioDetail("p1".to_string()));
    }

    #[tokio::test]
    async fn test_login_validation_stays_on_login() {
        let dir = TempDir::new().unwrap();
        let config = Config {
            api_url: Some("http://127.0.0.1:9/api".to_string()),
            ..Config::default()
        };
        let mut app = App::with_config(config, dir.path()).unwrap();
        app.start();
        app.login_form.set_value(0, "");

        app.login_form.focus = 1;
        handle_input(&mut app, key(KeyCode::Enter)).await.unwrap();

        assert_eq!(*app.route(), Route::Login);
        assert_eq!(app.login_form.error.as_deref(), Some("Email and password required"));
    }
}
