//! Application state management for the portafolio client.
//!
//! This module contains the `App` struct that owns the router (and through
//! it the persisted session), the API client, the query history and all
//! per-view UI state, plus background task coordination.

use std::future::Future;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Result};
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use portafolio_core::auth::{
    CredentialStore, FileStore, GuardDecision, Route, Router, SessionContext, SessionGrant,
};
use portafolio_core::history::HistoryStore;
use portafolio_core::models::file::{files_in, visible_files, week_counts};
use portafolio_core::models::portfolio::visible_portfolios;
use portafolio_core::models::{
    Category, Portfolio, PortfolioFile, PortfolioFilter, PortfolioPayload, ProfilePayload,
    QueryEntry, Role, UploadRequest, User, UserPayload, WEEK_COUNT,
};
use portafolio_core::utils::{format_expiry, is_plausible_email, truncate};
use portafolio_core::{ApiClient, ApiError, Config};

use crate::form::Form;

// ============================================================================
// Constants
// ============================================================================

/// Buffer size for the background task message channel.
const CHANNEL_BUFFER_SIZE: usize = 32;

/// Number of items to scroll on page up/down.
pub const PAGE_SCROLL_SIZE: usize = 10;

/// History entries are listed by their question, cut to this many chars.
pub const HISTORY_LABEL_CHARS: usize = 40;

const EMAIL_ENV: &str = "PORTAFOLIO_EMAIL";
const PASSWORD_ENV: &str = "PORTAFOLIO_PASSWORD";

const SESSION_EXPIRED: &str = "Session expired. Please log in again.";

// ============================================================================
// UI State Types
// ============================================================================

/// Overall application state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppState {
    Normal,
    Asking,
    EditingForm,
    ShowingHelp,
    ConfirmingQuit,
    ConfirmingDelete,
    Quitting,
}

/// Entries of the landing menus.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MenuItem {
    Teachers,
    Portfolios,
    Search,
    Profile,
}

impl MenuItem {
    pub fn label(&self) -> &'static str {
        match self {
            MenuItem::Teachers => "Manage teachers",
            MenuItem::Portfolios => "Portfolios",
            MenuItem::Search => "Search documents",
            MenuItem::Profile => "My profile",
        }
    }

    pub fn route(&self) -> Route {
        match self {
            MenuItem::Teachers => Route::AdminUsers,
            MenuItem::Portfolios => Route::Portfolios,
            MenuItem::Search => Route::Home,
            MenuItem::Profile => Route::Profile,
        }
    }
}

const ADMIN_MENU: &[MenuItem] = &[
    MenuItem::Teachers,
    MenuItem::Portfolios,
    MenuItem::Search,
    MenuItem::Profile,
];

const TEACHER_MENU: &[MenuItem] = &[MenuItem::Portfolios, MenuItem::Search, MenuItem::Profile];

/// What an open form overlay edits.
#[derive(Debug, Clone, PartialEq)]
pub enum FormKind {
    NewTeacher,
    EditTeacher(User),
    NewPortfolio,
    EditPortfolio(String),
    FilterPortfolios,
    Upload,
    Profile,
}

impl FormKind {
    pub fn title(&self) -> &'static str {
        match self {
            FormKind::NewTeacher => "New teacher",
            FormKind::EditTeacher(_) => "Edit teacher",
            FormKind::NewPortfolio => "New portfolio",
            FormKind::EditPortfolio(_) => "Edit portfolio",
            FormKind::FilterPortfolios => "Filter portfolios",
            FormKind::Upload => "Upload files",
            FormKind::Profile => "Edit profile",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ActiveForm {
    pub kind: FormKind,
    pub form: Form,
}

/// Item awaiting delete confirmation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PendingDelete {
    User { id: String, name: String },
    Portfolio { id: String, name: String },
    File { id: String, name: String, portfolio_id: String },
}

impl PendingDelete {
    pub fn describe(&self) -> String {
        match self {
            PendingDelete::User { name, .. } => format!("teacher \"{}\"", name),
            PendingDelete::Portfolio { name, .. } => format!("portfolio \"{}\"", name),
            PendingDelete::File { name, .. } => format!("file \"{}\"", name),
        }
    }
}

/// Data to re-fetch once a mutation has gone through.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reload {
    Users,
    Portfolios,
    Files(String),
}

// ============================================================================
// Background Task Results
// ============================================================================

/// Results sent from spawned API tasks back to the UI loop.
enum TaskResult {
    Users(Vec<User>),
    Portfolios(Vec<Portfolio>),
    PortfolioDetail {
        portfolio: Portfolio,
        files: Vec<PortfolioFile>,
    },
    Answer(QueryEntry),
    Done {
        message: String,
        reload: Option<Reload>,
    },
    Error(String),
    /// The backend rejected the token.
    Unauthorized,
}

// ============================================================================
// Main Application Struct
// ============================================================================

pub struct App {
    // Core services
    pub config: Config,
    pub router: Router<FileStore>,
    pub api: ApiClient,
    pub history: HistoryStore,
    cache_dir: PathBuf,
    /// Bumped whenever the signed-in account changes; results of tasks
    /// spawned under an older value are dropped.
    session_generation: u64,

    // UI State
    pub state: AppState,
    pub status_message: Option<String>,
    pub loading: usize,

    // Login view
    pub login_form: Form,
    pub login_notice: Option<String>,

    // Landing menus
    pub menu_selection: usize,

    // Search view
    pub question: String,
    pub history_selection: usize,

    // Teacher management
    pub users: Vec<User>,
    pub users_selection: usize,

    // Portfolio list
    pub portfolios: Vec<Portfolio>,
    pub portfolio_filter: PortfolioFilter,
    pub portfolio_selection: usize,

    // Portfolio detail
    pub portfolio: Option<Portfolio>,
    pub files: Vec<PortfolioFile>,
    pub week: u8,
    pub category: Category,
    pub file_selection: usize,

    // Overlays
    pub form: Option<ActiveForm>,
    pub pending_delete: Option<PendingDelete>,

    task_tx: mpsc::Sender<(u64, TaskResult)>,
    task_rx: mpsc::Receiver<(u64, TaskResult)>,
}

impl App {
    /// Create the application from the user's config and cache directory.
    pub fn new() -> Result<Self> {
        let config = match Config::load() {
            Ok(c) => c,
            Err(e) => {
                warn!(error = %e, "Failed to load config, using defaults");
                Config::default()
            }
        };
        let cache_dir = config.cache_dir().unwrap_or_else(|_| PathBuf::from("./cache"));
        debug!(?cache_dir, "Cache directory configured");
        Self::with_config(config, &cache_dir)
    }

    /// Build the app around an explicit config and cache directory. The
    /// persisted session is sanitized before anything can render.
    pub fn with_config(config: Config, cache_dir: &Path) -> Result<Self> {
        let store = FileStore::open(cache_dir)?;
        let mut session =
            SessionContext::new(store).with_lifetime_minutes(config.session_minutes());
        let outcome = session.sanitize()?;
        debug!(?outcome, "Session sanitized");

        let router = Router::new(session);
        let api = ApiClient::new(&config.api_url())?;
        let snapshot = router.session().snapshot();
        let history = match snapshot.user_id.as_deref() {
            Some(user_id) if snapshot.is_valid() => open_history(cache_dir, user_id),
            _ => HistoryStore::signed_out(),
        };

        let (task_tx, task_rx) = mpsc::channel(CHANNEL_BUFFER_SIZE);

        let email = std::env::var(EMAIL_ENV)
            .ok()
            .or_else(|| config.last_email.clone())
            .unwrap_or_default();
        let password = std::env::var(PASSWORD_ENV)
            .ok()
            .or_else(|| CredentialStore::remembered(&email))
            .unwrap_or_default();
        let mut login_form = Form::new().email("Email", &email).password("Password");
        login_form.set_value(1, &password);
        let login_form = login_form.focus_first_empty();

        Ok(Self {
            config,
            router,
            api,
            history,
            cache_dir: cache_dir.to_path_buf(),
            session_generation: 0,

            state: AppState::Normal,
            status_message: None,
            loading: 0,

            login_form,
            login_notice: None,

            menu_selection: 0,

            question: String::new(),
            history_selection: 0,

            users: Vec::new(),
            users_selection: 0,

            portfolios: Vec::new(),
            portfolio_filter: PortfolioFilter::default(),
            portfolio_selection: 0,

            portfolio: None,
            files: Vec::new(),
            week: 1,
            category: Category::Theory,
            file_selection: 0,

            form: None,
            pending_delete: None,

            task_tx,
            task_rx,
        })
    }

    /// Route to the role's landing view; the guard sends anonymous users to
    /// the login view.
    pub fn start(&mut self) {
        let landing = Route::landing_for(self.role());
        self.navigate(landing);
    }

    // =========================================================================
    // Session accessors
    // =========================================================================

    pub fn route(&self) -> &Route {
        self.router.current()
    }

    pub fn role(&self) -> Option<Role> {
        self.router.session().snapshot().role()
    }

    pub fn user_id(&self) -> Option<String> {
        self.router.session().snapshot().user_id
    }

    pub fn email(&self) -> Option<String> {
        self.router.session().snapshot().email
    }

    /// "ana@uni.edu · Teacher · until 14:05" for the title bar.
    pub fn session_summary(&self) -> Option<String> {
        let session = self.router.session().snapshot();
        if !session.is_valid() {
            return None;
        }
        let who = session.email.clone().unwrap_or_else(|| "signed in".to_string());
        let role = session
            .role()
            .map(|r| r.display_name().to_string())
            .or_else(|| session.role.clone())
            .unwrap_or_else(|| "no role".to_string());
        let until = session.expiry_millis().map(format_expiry).unwrap_or_default();
        Some(format!("{} · {} · until {}", who, role, until))
    }

    // =========================================================================
    // Navigation
    // =========================================================================

    /// Navigate through the guard and load whatever the rendered view needs.
    pub fn navigate(&mut self, route: Route) {
        let requested = route.clone();
        if let Err(e) = self.router.navigate(route) {
            error!(error = %e, "Navigation failed");
            self.status_message = Some(format!("Error: {}", e));
            return;
        }

        match self.router.last_decision().clone() {
            GuardDecision::Render(_) => {}
            GuardDecision::RedirectToLogin => {
                debug!(?requested, "No valid session, showing login");
                self.on_signed_out(None);
            }
            GuardDecision::RedirectToDefault => {
                self.status_message =
                    Some(format!("{} is not available for your role", requested.title()));
            }
        }
        self.on_enter();
    }

    /// Re-run the guard for the current view, e.g. when the session expires
    /// while the app is idle.
    pub fn check_session(&mut self) {
        if self.route().is_public() {
            return;
        }
        match self.router.revalidate() {
            Ok(true) if *self.route() == Route::Login => {
                info!("Session expired while in use");
                self.on_signed_out(Some(SESSION_EXPIRED));
            }
            Ok(true) => self.on_enter(),
            Ok(false) => {}
            Err(e) => error!(error = %e, "Failed to revalidate session"),
        }
    }

    fn on_enter(&mut self) {
        match self.route().clone() {
            Route::AdminHome | Route::TeacherDashboard => self.menu_selection = 0,
            Route::AdminUsers => self.load_users(),
            Route::Portfolios => self.load_portfolios(),
            Route::PortfolioDetail(id) => {
                if self.portfolio.as_ref().map(|p| p.id()) != Some(id.as_str()) {
                    self.portfolio = None;
                    self.files.clear();
                    self.week = 1;
                    self.category = Category::Theory;
                    self.file_selection = 0;
                }
                self.load_detail(&id);
            }
            Route::Home => {
                self.history_selection = self.history.len().saturating_sub(1);
            }
            Route::Login | Route::Profile => {}
        }
    }

    /// Drop everything fetched under the old session.
    fn on_signed_out(&mut self, notice: Option<&str>) {
        self.session_generation += 1;
        self.api.clear_token();
        self.history = HistoryStore::signed_out();
        self.history_selection = 0;
        self.users.clear();
        self.portfolios.clear();
        self.portfolio = None;
        self.files.clear();
        self.form = None;
        self.pending_delete = None;
        self.question.clear();
        self.state = AppState::Normal;
        self.login_notice = notice.map(String::from);
        self.login_form.clear_masked();
        self.login_form = self.login_form.clone().focus_first_empty();
    }

    fn expire_session(&mut self) {
        if let Err(e) = self.router.logout() {
            error!(error = %e, "Failed to purge session");
        }
        self.on_signed_out(Some(SESSION_EXPIRED));
    }

    pub fn logout(&mut self) {
        if let Err(e) = self.router.logout() {
            error!(error = %e, "Failed to purge session");
        }
        info!("Signed out");
        self.on_signed_out(Some("Signed out."));
        self.status_message = None;
    }

    /// Client for the current token. A missing or expired token ends the
    /// session instead.
    fn authed_api(&mut self) -> Option<ApiClient> {
        match self.router.session().token() {
            Some(token) => Some(self.api.with_token(token)),
            None => {
                self.expire_session();
                self.navigate(Route::Login);
                None
            }
        }
    }

    // =========================================================================
    // Authentication
    // =========================================================================

    /// Sign in with the login form's credentials.
    pub async fn attempt_login(&mut self) -> Result<()> {
        let email = self.login_form.value(0).trim().to_string();
        let password = self.login_form.value(1).to_string();

        if let Err(message) = validate_login(&email, &password) {
            self.login_form.set_error(message);
            return Err(anyhow!(message));
        }
        self.login_form.error = None;
        self.login_notice = None;

        match self.api.authenticate(&email, &password).await {
            Ok(grant) => {
                if let Err(e) = CredentialStore::store(&email, &password) {
                    warn!(error = %e, "Failed to store credentials");
                }
                self.config.last_email = Some(email);
                if let Err(e) = self.config.save() {
                    warn!(error = %e, "Failed to save config");
                }
                self.apply_grant(&grant)
            }
            Err(e) => {
                error!(error = %e, "Login failed");
                let user_message = match e.downcast_ref::<ApiError>() {
                    Some(ApiError::InvalidCredentials) => "Invalid email or password".to_string(),
                    Some(ApiError::NetworkError(cause)) if cause.is_timeout() => {
                        "Connection timed out. Please try again.".to_string()
                    }
                    Some(ApiError::NetworkError(_)) => {
                        "Unable to connect to server. Check your internet connection.".to_string()
                    }
                    _ => format!("Login failed: {:#}", e),
                };
                self.login_form.set_error(user_message);
                self.login_form.clear_masked();
                Err(e)
            }
        }
    }

    /// Persist a fresh grant and land on the role's home view.
    pub fn apply_grant(&mut self, grant: &SessionGrant) -> Result<()> {
        self.router.login(grant)?;
        self.session_generation += 1;
        self.history = open_history(&self.cache_dir, &grant.user_id);
        self.history_selection = 0;
        self.api.set_token(grant.token.clone());
        self.login_form.clear_masked();
        self.login_form.error = None;
        self.state = AppState::Normal;
        self.status_message = None;
        info!(route = ?self.route(), "Login successful");
        self.on_enter();
        Ok(())
    }

    // =========================================================================
    // Background tasks
    // =========================================================================

    async fn send_result(
        tx: &mpsc::Sender<(u64, TaskResult)>,
        generation: u64,
        result: TaskResult,
    ) {
        if let Err(e) = tx.send((generation, result)).await {
            warn!(error = %e, "Failed to deliver task result");
        }
    }

    /// Run an API call off the UI loop; its result arrives through the
    /// channel.
    fn spawn<F>(&mut self, label: &'static str, task: F)
    where
        F: Future<Output = Result<TaskResult>> + Send + 'static,
    {
        let tx = self.task_tx.clone();
        let generation = self.session_generation;
        self.loading += 1;
        tokio::spawn(async move {
            let result = match task.await {
                Ok(result) => result,
                Err(e) if ApiError::is_unauthorized(&e) => TaskResult::Unauthorized,
                Err(e) => {
                    error!(task = label, error = %e, "Background task failed");
                    TaskResult::Error(format!("{}: {:#}", label, e))
                }
            };
            Self::send_result(&tx, generation, result).await;
        });
    }

    /// Apply every finished task, then re-check the session.
    pub fn check_background_tasks(&mut self) {
        let mut results = Vec::new();
        while let Ok(result) = self.task_rx.try_recv() {
            results.push(result);
        }
        for (generation, result) in results {
            self.loading = self.loading.saturating_sub(1);
            if generation != self.session_generation {
                debug!(generation, "Discarding result from an earlier session");
                continue;
            }
            self.process_task_result(result);
        }
        self.check_session();
    }

    fn process_task_result(&mut self, result: TaskResult) {
        match result {
            TaskResult::Users(users) => {
                self.users = users;
                self.users_selection = self.users_selection.min(self.users.len().saturating_sub(1));
            }
            TaskResult::Portfolios(portfolios) => {
                let user_id = self.user_id();
                self.portfolios = visible_portfolios(portfolios, self.role(), user_id.as_deref());
                self.clamp_portfolio_selection();
            }
            TaskResult::PortfolioDetail { portfolio, files } => {
                if *self.route() != Route::PortfolioDetail(portfolio.id().to_string()) {
                    debug!(id = %portfolio.id(), "Discarding detail for a view no longer shown");
                    return;
                }
                let email = self.email();
                self.files = visible_files(files, self.role(), email.as_deref());
                self.portfolio = Some(portfolio);
                self.clamp_file_selection();
            }
            TaskResult::Answer(entry) => {
                if let Err(e) = self.history.push(entry) {
                    warn!(error = %e, "Failed to save query history");
                }
                self.history_selection = self.history.len().saturating_sub(1);
            }
            TaskResult::Done { message, reload } => {
                self.status_message = Some(message);
                match reload {
                    Some(Reload::Users) => self.load_users(),
                    Some(Reload::Portfolios) => self.load_portfolios(),
                    Some(Reload::Files(id)) => {
                        if *self.route() == Route::PortfolioDetail(id.clone()) {
                            self.load_detail(&id);
                        }
                    }
                    None => {}
                }
            }
            TaskResult::Error(msg) => {
                let lower = msg.to_lowercase();
                let user_message = if lower.contains("rate limit") {
                    "Server is busy. Please wait a moment and try again.".to_string()
                } else if lower.contains("network") || lower.contains("connect") {
                    "Network error. Check your connection.".to_string()
                } else {
                    format!("Error: {}", msg)
                };
                self.status_message = Some(user_message);
            }
            TaskResult::Unauthorized => {
                warn!("Token rejected by server");
                self.expire_session();
                self.navigate(Route::Login);
            }
        }
    }

    // =========================================================================
    // Loaders
    // =========================================================================

    pub fn load_users(&mut self) {
        let Some(api) = self.authed_api() else { return };
        self.spawn("Teachers", async move { Ok(TaskResult::Users(api.list_users().await?)) });
    }

    pub fn load_portfolios(&mut self) {
        let Some(api) = self.authed_api() else { return };
        self.spawn("Portfolios", async move {
            Ok(TaskResult::Portfolios(api.list_portfolios().await?))
        });
    }

    pub fn load_detail(&mut self, id: &str) {
        let Some(api) = self.authed_api() else { return };
        let id = id.to_string();
        self.spawn("Portfolio", async move {
            let (portfolio, files) =
                futures::try_join!(api.fetch_portfolio(&id), api.list_files(&id))?;
            Ok(TaskResult::PortfolioDetail { portfolio, files })
        });
    }

    /// Send the typed question to the document search.
    pub fn ask(&mut self) {
        let question = self.question.trim().to_string();
        if question.is_empty() {
            self.status_message = Some("Type a question first".to_string());
            return;
        }
        let Some(user_id) = self.user_id() else {
            self.expire_session();
            self.navigate(Route::Login);
            return;
        };
        let Some(api) = self.authed_api() else { return };

        self.question.clear();
        self.state = AppState::Normal;
        self.status_message = Some("Searching...".to_string());
        self.spawn("Search", async move {
            match api.ask(&question, &user_id).await {
                Ok(response) => Ok(TaskResult::Answer(QueryEntry::answered(&question, &response))),
                Err(e) if ApiError::is_unauthorized(&e) => Err(e),
                Err(e) => {
                    warn!(error = %e, "Query failed");
                    Ok(TaskResult::Answer(QueryEntry::failed(&question, &format!("{:#}", e))))
                }
            }
        });
    }

    pub fn clear_history(&mut self) {
        match self.history.clear() {
            Ok(()) => self.status_message = Some("History cleared".to_string()),
            Err(e) => self.status_message = Some(format!("Error: {}", e)),
        }
        self.history_selection = 0;
    }

    pub fn selected_entry(&self) -> Option<&QueryEntry> {
        self.history.get(self.history_selection)
    }

    /// Question shortened for the history list.
    pub fn history_label(entry: &QueryEntry) -> String {
        truncate(&entry.question, HISTORY_LABEL_CHARS)
    }

    // =========================================================================
    // Landing menus
    // =========================================================================

    pub fn menu_items(&self) -> &'static [MenuItem] {
        match self.route() {
            Route::AdminHome => ADMIN_MENU,
            Route::TeacherDashboard => TEACHER_MENU,
            _ => &[],
        }
    }

    pub fn activate_menu(&mut self) {
        if let Some(item) = self.menu_items().get(self.menu_selection).copied() {
            self.navigate(item.route());
        }
    }

    // =========================================================================
    // Lists and selection
    // =========================================================================

    pub fn filtered_portfolios(&self) -> Vec<&Portfolio> {
        self.portfolio_filter.apply(&self.portfolios)
    }

    pub fn selected_portfolio(&self) -> Option<&Portfolio> {
        self.filtered_portfolios().get(self.portfolio_selection).copied()
    }

    pub fn selected_user(&self) -> Option<&User> {
        self.users.get(self.users_selection)
    }

    /// Files in the selected week and category.
    pub fn section_files(&self) -> Vec<&PortfolioFile> {
        files_in(&self.files, self.week, self.category)
    }

    pub fn selected_file(&self) -> Option<&PortfolioFile> {
        self.section_files().get(self.file_selection).copied()
    }

    pub fn week_counts(&self) -> [usize; WEEK_COUNT as usize] {
        week_counts(&self.files)
    }

    fn clamp_portfolio_selection(&mut self) {
        let len = self.filtered_portfolios().len();
        self.portfolio_selection = self.portfolio_selection.min(len.saturating_sub(1));
    }

    fn clamp_file_selection(&mut self) {
        let len = self.section_files().len();
        self.file_selection = self.file_selection.min(len.saturating_sub(1));
    }

    fn list_len(&self) -> usize {
        match self.route() {
            Route::AdminHome | Route::TeacherDashboard => self.menu_items().len(),
            Route::Home => self.history.len(),
            Route::AdminUsers => self.users.len(),
            Route::Portfolios => self.filtered_portfolios().len(),
            Route::PortfolioDetail(_) => self.section_files().len(),
            Route::Login | Route::Profile => 0,
        }
    }

    fn selection_mut(&mut self) -> Option<&mut usize> {
        match self.route().clone() {
            Route::AdminHome | Route::TeacherDashboard => Some(&mut self.menu_selection),
            Route::Home => Some(&mut self.history_selection),
            Route::AdminUsers => Some(&mut self.users_selection),
            Route::Portfolios => Some(&mut self.portfolio_selection),
            Route::PortfolioDetail(_) => Some(&mut self.file_selection),
            Route::Login | Route::Profile => None,
        }
    }

    /// Move the current view's list selection, clamped to its bounds.
    pub fn move_selection(&mut self, delta: isize) {
        let len = self.list_len();
        if let Some(selection) = self.selection_mut() {
            if len == 0 {
                *selection = 0;
            } else {
                *selection = selection.saturating_add_signed(delta).min(len - 1);
            }
        }
    }

    pub fn select_week(&mut self, forward: bool) {
        self.week = match (forward, self.week) {
            (true, w) if w >= WEEK_COUNT => 1,
            (true, w) => w + 1,
            (false, w) if w <= 1 => WEEK_COUNT,
            (false, w) => w - 1,
        };
        self.file_selection = 0;
    }

    pub fn select_category(&mut self, forward: bool) {
        self.category = if forward {
            self.category.next()
        } else {
            self.category.prev()
        };
        self.file_selection = 0;
    }

    pub fn open_selected_portfolio(&mut self) {
        if let Some(id) = self.selected_portfolio().map(|p| p.id().to_string()) {
            self.navigate(Route::PortfolioDetail(id));
        }
    }

    // =========================================================================
    // Forms
    // =========================================================================

    pub fn open_form(&mut self, kind: FormKind) {
        let form = match &kind {
            FormKind::NewTeacher => Form::new()
                .text("First name", "")
                .text("Last name", "")
                .email("Email", "")
                .password("Password"),
            FormKind::EditTeacher(user) => Form::new()
                .text("First name", &user.nombre)
                .text("Last name", &user.apellido)
                .password("New password (blank keeps)"),
            FormKind::NewPortfolio => Form::new()
                .text("Name", "")
                .text("Description", "")
                .text("Year", ""),
            FormKind::EditPortfolio(id) => {
                let Some(p) = self.portfolios.iter().find(|p| p.id() == id.as_str()) else {
                    return;
                };
                Form::new()
                    .text("Name", &p.nombre)
                    .text("Description", p.descripcion.as_deref().unwrap_or(""))
                    .text("Year", p.year())
            }
            FormKind::FilterPortfolios => Form::new()
                .text("Name contains", &self.portfolio_filter.name)
                .text("Year", &self.portfolio_filter.year),
            FormKind::Upload => Form::new().paths("Files (separate with ;)"),
            FormKind::Profile => Form::new()
                .text("First name", "")
                .text("Last name", "")
                .password("New password (optional)"),
        };
        self.form = Some(ActiveForm { kind, form });
        self.state = AppState::EditingForm;
    }

    pub fn cancel_form(&mut self) {
        self.form = None;
        self.state = AppState::Normal;
    }

    /// Validate and send the open form. Invalid input keeps the form open
    /// with an inline error.
    pub fn submit_form(&mut self) {
        let Some(ActiveForm { kind, mut form }) = self.form.take() else {
            return;
        };

        match self.build_submission(&kind, &form) {
            Ok(()) => {
                self.state = AppState::Normal;
            }
            // An expired session already moved us to the login view.
            Err(_) if *self.route() == Route::Login => {}
            Err(message) => {
                form.set_error(message);
                self.form = Some(ActiveForm { kind, form });
            }
        }
    }

    fn build_submission(&mut self, kind: &FormKind, form: &Form) -> Result<(), String> {
        match kind {
            FormKind::NewTeacher => {
                let payload = UserPayload::new_teacher(
                    form.value(0),
                    form.value(1),
                    form.value(2),
                    form.value(3),
                    self.config.teacher_role_id(),
                );
                payload.validate(true).map_err(|e| e.to_string())?;
                let api = self.authed_api().ok_or(SESSION_EXPIRED)?;
                self.spawn("Create teacher", async move {
                    api.create_teacher(&payload).await?;
                    Ok(TaskResult::Done {
                        message: format!("Teacher {} created", payload.email),
                        reload: Some(Reload::Users),
                    })
                });
            }
            FormKind::EditTeacher(user) => {
                let payload = UserPayload::for_update(
                    user,
                    form.value(0),
                    form.value(1),
                    form.value(2),
                    self.config.teacher_role_id(),
                );
                payload.validate(false).map_err(|e| e.to_string())?;
                let api = self.authed_api().ok_or(SESSION_EXPIRED)?;
                let id = user.id().to_string();
                self.spawn("Update teacher", async move {
                    api.update_user(&id, &payload).await?;
                    Ok(TaskResult::Done {
                        message: "Teacher updated".to_string(),
                        reload: Some(Reload::Users),
                    })
                });
            }
            FormKind::NewPortfolio => {
                let user_id = self.user_id().ok_or(SESSION_EXPIRED)?;
                let payload = PortfolioPayload::new(form.value(0), form.value(1), form.value(2))
                    .created_by(&user_id);
                payload.validate().map_err(|e| e.to_string())?;
                let api = self.authed_api().ok_or(SESSION_EXPIRED)?;
                self.spawn("Create portfolio", async move {
                    api.create_portfolio(&payload).await?;
                    Ok(TaskResult::Done {
                        message: format!("Portfolio \"{}\" created", payload.nombre),
                        reload: Some(Reload::Portfolios),
                    })
                });
            }
            FormKind::EditPortfolio(id) => {
                let payload = PortfolioPayload::new(form.value(0), form.value(1), form.value(2));
                payload.validate().map_err(|e| e.to_string())?;
                let api = self.authed_api().ok_or(SESSION_EXPIRED)?;
                let id = id.clone();
                self.spawn("Update portfolio", async move {
                    api.update_portfolio(&id, &payload).await?;
                    Ok(TaskResult::Done {
                        message: "Portfolio updated".to_string(),
                        reload: Some(Reload::Portfolios),
                    })
                });
            }
            FormKind::FilterPortfolios => {
                self.portfolio_filter = PortfolioFilter {
                    name: form.value(0).trim().to_string(),
                    year: form.value(1).trim().to_string(),
                };
                self.portfolio_selection = 0;
            }
            FormKind::Upload => {
                let portfolio_id = match self.route() {
                    Route::PortfolioDetail(id) => id.clone(),
                    _ => return Err("Open a portfolio first".to_string()),
                };
                let request = UploadRequest {
                    portfolio_id: portfolio_id.clone(),
                    week: self.week,
                    category: self.category,
                    paths: UploadRequest::parse_paths(form.value(0)),
                };
                request.validate().map_err(|e| e.to_string())?;
                if let Some(missing) = request.paths.iter().find(|p| !p.is_file()) {
                    return Err(format!("File not found: {}", missing.display()));
                }
                let api = self.authed_api().ok_or(SESSION_EXPIRED)?;
                self.status_message = Some("Uploading...".to_string());
                self.spawn("Upload", async move {
                    api.upload_files(&request).await?;
                    Ok(TaskResult::Done {
                        message: format!(
                            "Uploaded {} file(s) to week {} · {}",
                            request.paths.len(),
                            request.week,
                            request.category.display_name()
                        ),
                        reload: Some(Reload::Files(portfolio_id)),
                    })
                });
            }
            FormKind::Profile => {
                let payload = ProfilePayload::new(form.value(0), form.value(1), form.value(2));
                payload.validate().map_err(|e| e.to_string())?;
                let user_id = self.user_id().ok_or(SESSION_EXPIRED)?;
                let api = self.authed_api().ok_or(SESSION_EXPIRED)?;
                self.spawn("Save profile", async move {
                    api.update_profile(&user_id, &payload).await?;
                    Ok(TaskResult::Done {
                        message: "Profile saved".to_string(),
                        reload: None,
                    })
                });
            }
        }
        Ok(())
    }

    // =========================================================================
    // Deletion
    // =========================================================================

    /// Ask to delete the item selected in the current view.
    pub fn request_delete(&mut self) {
        let pending = match self.route().clone() {
            Route::AdminUsers => match self.selected_user() {
                Some(user) if !user.is_deletable() => {
                    self.status_message =
                        Some("Administrator accounts cannot be deleted".to_string());
                    None
                }
                Some(user) => Some(PendingDelete::User {
                    id: user.id().to_string(),
                    name: user.full_name(),
                }),
                None => None,
            },
            Route::Portfolios => self.selected_portfolio().map(|p| PendingDelete::Portfolio {
                id: p.id().to_string(),
                name: p.nombre.clone(),
            }),
            Route::PortfolioDetail(portfolio_id) => {
                let role = self.role();
                let email = self.email();
                match self.selected_file() {
                    Some(file) if !file.can_delete(role, email.as_deref()) => {
                        self.status_message =
                            Some("Only the uploader or an administrator can delete this file".to_string());
                        None
                    }
                    Some(file) => Some(PendingDelete::File {
                        id: file.id().to_string(),
                        name: file.display_name().to_string(),
                        portfolio_id,
                    }),
                    None => None,
                }
            }
            _ => None,
        };

        if let Some(pending) = pending {
            self.pending_delete = Some(pending);
            self.state = AppState::ConfirmingDelete;
        }
    }

    pub fn cancel_delete(&mut self) {
        self.pending_delete = None;
        self.state = AppState::Normal;
    }

    pub fn confirm_delete(&mut self) {
        self.state = AppState::Normal;
        let Some(pending) = self.pending_delete.take() else {
            return;
        };
        let Some(api) = self.authed_api() else { return };
        let what = pending.describe();
        self.spawn("Delete", async move {
            let reload = match pending {
                PendingDelete::User { id, .. } => {
                    api.delete_user(&id).await?;
                    Reload::Users
                }
                PendingDelete::Portfolio { id, .. } => {
                    api.delete_portfolio(&id).await?;
                    Reload::Portfolios
                }
                PendingDelete::File { id, portfolio_id, .. } => {
                    api.delete_file(&id).await?;
                    Reload::Files(portfolio_id)
                }
            };
            Ok(TaskResult::Done {
                message: format!("Deleted {}", what),
                reload: Some(reload),
            })
        });
    }
}

/// History for `user_id`; an unreadable cache dir leaves it unpersisted.
fn open_history(cache_dir: &Path, user_id: &str) -> HistoryStore {
    HistoryStore::open(cache_dir, user_id).unwrap_or_else(|e| {
        warn!(error = %e, "Failed to open query history");
        HistoryStore::signed_out()
    })
}

/// Login form rules: both fields present and a plausible email.
pub fn validate_login(email: &str, password: &str) -> Result<(), &'static str> {
    if email.is_empty() || password.is_empty() {
        return Err("Email and password required");
    }
    if !is_plausible_email(email) {
        return Err("Enter a valid email address");
    }
    Ok(())
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use portafolio_core::auth::{now_millis, KeyValueStore};
    use tempfile::TempDir;

    const HOUR_MS: i64 = 3_600_000;

    fn test_config() -> Config {
        Config {
            // Nothing listens on the discard port; spawned loads fail fast.
            api_url: Some("http://127.0.0.1:9/api".to_string()),
            last_email: Some("docente@uni.edu".to_string()),
            ..Config::default()
        }
    }

    fn app_in(dir: &TempDir) -> App {
        App::with_config(test_config(), dir.path()).unwrap()
    }

    fn grant(role: &str) -> SessionGrant {
        grant_for("u1", role)
    }

    fn grant_for(user_id: &str, role: &str) -> SessionGrant {
        SessionGrant {
            token: format!("token-{}", user_id),
            user_id: user_id.to_string(),
            role: Some(role.to_string()),
            email: Some(format!("{}@uni.edu", user_id)),
        }
    }

    fn write_session(dir: &TempDir, json: &str) {
        std::fs::write(dir.path().join("session.json"), json).unwrap();
    }

    #[test]
    fn test_validate_login() {
        assert_eq!(validate_login("", "x"), Err("Email and password required"));
        assert_eq!(validate_login("a@b.edu", ""), Err("Email and password required"));
        assert_eq!(validate_login("docente", "secreto"), Err("Enter a valid email address"));
        assert_eq!(validate_login("docente@uni.edu", "secreto"), Ok(()));
    }

    #[test]
    fn test_history_label_is_truncated() {
        let entry = QueryEntry::failed(&"¿".repeat(50), "boom");
        let label = App::history_label(&entry);
        assert_eq!(label.chars().count(), HISTORY_LABEL_CHARS + 3);
        assert!(label.ends_with("..."));
    }

    #[tokio::test]
    async fn test_starts_at_login_without_session() {
        let dir = TempDir::new().unwrap();
        let mut app = app_in(&dir);
        app.start();
        assert_eq!(*app.route(), Route::Login);
        assert_eq!(app.login_form.value(0), "docente@uni.edu");
    }

    #[tokio::test]
    async fn test_expired_session_is_purged_on_startup() {
        let dir = TempDir::new().unwrap();
        let past = now_millis() - HOUR_MS;
        write_session(
            &dir,
            &format!(r#"{{"token": "abc", "expiry": "{}", "role": "DOCENTE", "userId": "u1"}}"#, past),
        );

        let mut app = app_in(&dir);
        assert!(app.router.session().store().is_empty());
        assert!(!dir.path().join("session.json").exists());

        app.start();
        assert_eq!(*app.route(), Route::Login);
    }

    #[tokio::test]
    async fn test_inconsistent_session_is_purged_on_startup() {
        let dir = TempDir::new().unwrap();
        write_session(&dir, r#"{"token": "abc", "role": "ADMINISTRADOR"}"#);

        let app = app_in(&dir);
        assert!(app.router.session().store().is_empty());
    }

    #[tokio::test]
    async fn test_valid_session_resumes_at_landing() {
        let dir = TempDir::new().unwrap();
        let future = now_millis() + HOUR_MS;
        write_session(
            &dir,
            &format!(r#"{{"token": "abc", "expiry": "{}", "role": "ADMINISTRADOR", "userId": "u1"}}"#, future),
        );

        let mut app = app_in(&dir);
        app.start();
        assert_eq!(*app.route(), Route::AdminHome);
        assert_eq!(app.menu_items()[0], MenuItem::Teachers);
    }

    #[tokio::test]
    async fn test_teacher_login_and_role_guard() {
        let dir = TempDir::new().unwrap();
        let mut app = app_in(&dir);
        app.start();

        app.apply_grant(&grant("DOCENTE")).unwrap();
        assert_eq!(*app.route(), Route::TeacherDashboard);
        assert!(app.session_summary().unwrap().contains("Teacher"));

        app.navigate(Route::AdminUsers);
        assert_eq!(*app.route(), Route::Home);
        assert_eq!(*app.router.last_decision(), GuardDecision::RedirectToDefault);
        assert!(app.status_message.as_deref().unwrap().contains("not available"));

        app.navigate(Route::Portfolios);
        assert_eq!(*app.route(), Route::Portfolios);
    }

    #[tokio::test]
    async fn test_unknown_role_lands_on_default() {
        let dir = TempDir::new().unwrap();
        let mut app = app_in(&dir);

        app.apply_grant(&grant("TEACHER")).unwrap();
        assert_eq!(*app.route(), Route::Home);

        app.navigate(Route::Portfolios);
        assert_eq!(*app.route(), Route::Home);
    }

    #[tokio::test]
    async fn test_logout_purges_and_returns_to_login() {
        let dir = TempDir::new().unwrap();
        let mut app = app_in(&dir);
        app.apply_grant(&grant("ADMINISTRADOR")).unwrap();
        assert!(dir.path().join("session.json").exists());

        app.logout();
        assert_eq!(*app.route(), Route::Login);
        assert!(app.router.session().store().is_empty());

        app.navigate(Route::Profile);
        assert_eq!(*app.route(), Route::Login);
    }

    #[tokio::test]
    async fn test_rejected_token_ends_session() {
        let dir = TempDir::new().unwrap();
        let mut app = app_in(&dir);
        app.apply_grant(&grant("DOCENTE")).unwrap();

        app.process_task_result(TaskResult::Unauthorized);

        assert_eq!(*app.route(), Route::Login);
        assert_eq!(app.login_notice.as_deref(), Some(SESSION_EXPIRED));
        assert!(app.router.session().store().is_empty());
    }

    #[tokio::test]
    async fn test_portfolio_results_are_scoped_to_owner() {
        let dir = TempDir::new().unwrap();
        let mut app = app_in(&dir);
        app.apply_grant(&grant("DOCENTE")).unwrap();

        let portfolios: Vec<Portfolio> = serde_json::from_str(
            r#"[
                {"id": "p1", "nombre": "Cálculo", "anio": "2025-I", "creadoPor": "u1"},
                {"id": "p2", "nombre": "Física", "anio": "2025-I", "creadoPor": "u2"},
                {"id": "p3", "nombre": "Química", "anio": "2025-I", "creadoPor": "u1", "estado": "inactivo"}
            ]"#,
        )
        .unwrap();
        app.process_task_result(TaskResult::Portfolios(portfolios));

        assert_eq!(app.portfolios.len(), 1);
        assert_eq!(app.selected_portfolio().unwrap().id(), "p1");
    }

    #[tokio::test]
    async fn test_invalid_form_stays_open_with_error() {
        let dir = TempDir::new().unwrap();
        let mut app = app_in(&dir);
        app.apply_grant(&grant("DOCENTE")).unwrap();
        app.navigate(Route::Portfolios);

        app.open_form(FormKind::NewPortfolio);
        app.form.as_mut().unwrap().form.set_value(0, "Cálculo");
        app.submit_form();

        let active = app.form.as_ref().unwrap();
        assert_eq!(active.form.error.as_deref(), Some("Description is required"));
        assert_eq!(app.state, AppState::EditingForm);
    }

    #[tokio::test]
    async fn test_filter_form_applies_without_network() {
        let dir = TempDir::new().unwrap();
        let mut app = app_in(&dir);
        app.apply_grant(&grant("ADMINISTRADOR")).unwrap();
        app.portfolios = serde_json::from_str(
            r#"[
                {"id": "p1", "nombre": "Cálculo I", "anio": "2025-I"},
                {"id": "p2", "nombre": "Física", "anio": "2025-II"}
            ]"#,
        )
        .unwrap();

        app.open_form(FormKind::FilterPortfolios);
        app.form.as_mut().unwrap().form.set_value(1, "2025-II");
        app.submit_form();

        assert!(app.form.is_none());
        assert_eq!(app.filtered_portfolios().len(), 1);
        assert_eq!(app.filtered_portfolios()[0].id(), "p2");
    }

    #[tokio::test]
    async fn test_admin_accounts_are_not_deletable() {
        let dir = TempDir::new().unwrap();
        let mut app = app_in(&dir);
        app.apply_grant(&grant("ADMINISTRADOR")).unwrap();
        app.navigate(Route::AdminUsers);
        app.users = serde_json::from_str(
            r#"[
                {"_id": "a1", "nombre": "Ana", "apellido": "Admin", "email": "a@uni.edu", "rol": "ADMINISTRADOR"},
                {"_id": "t1", "nombre": "Luis", "apellido": "Docente", "email": "l@uni.edu", "rol": {"_id": "r2", "nombre": "DOCENTE"}}
            ]"#,
        )
        .unwrap();

        app.request_delete();
        assert!(app.pending_delete.is_none());

        app.move_selection(1);
        app.request_delete();
        assert_eq!(app.state, AppState::ConfirmingDelete);
        assert!(matches!(app.pending_delete, Some(PendingDelete::User { ref id, .. }) if id == "t1"));
    }

    #[tokio::test]
    async fn test_unreachable_server_shows_connection_error() {
        let dir = TempDir::new().unwrap();
        let mut app = app_in(&dir);
        app.start();
        app.login_form.set_value(1, "secreto");

        assert!(app.attempt_login().await.is_err());

        assert_eq!(*app.route(), Route::Login);
        assert_eq!(
            app.login_form.error.as_deref(),
            Some("Unable to connect to server. Check your internet connection.")
        );
        assert!(app.login_form.value(1).is_empty());
    }

    #[tokio::test]
    async fn test_history_is_not_shared_between_accounts() {
        let dir = TempDir::new().unwrap();
        let mut app = app_in(&dir);
        app.apply_grant(&grant_for("u1", "DOCENTE")).unwrap();
        app.process_task_result(TaskResult::Answer(QueryEntry::failed("notas de u1", "boom")));
        assert_eq!(app.history.len(), 1);

        app.logout();
        assert!(app.history.is_empty());

        app.apply_grant(&grant_for("u2", "DOCENTE")).unwrap();
        app.navigate(Route::Home);
        assert!(app.history.is_empty());
        assert!(app.selected_entry().is_none());

        app.logout();
        app.apply_grant(&grant_for("u1", "DOCENTE")).unwrap();
        assert_eq!(app.history.entries()[0].question, "notas de u1");
    }

    #[tokio::test]
    async fn test_restored_session_opens_its_own_history() {
        let dir = TempDir::new().unwrap();
        let mut first = app_in(&dir);
        first.apply_grant(&grant_for("u7", "DOCENTE")).unwrap();
        first.process_task_result(TaskResult::Answer(QueryEntry::failed("¿sílabo?", "boom")));
        drop(first);

        let app = app_in(&dir);
        assert_eq!(app.history.len(), 1);
    }

    #[tokio::test]
    async fn test_results_from_previous_session_are_dropped() {
        let dir = TempDir::new().unwrap();
        let mut app = app_in(&dir);
        app.apply_grant(&grant_for("a1", "ADMINISTRADOR")).unwrap();
        let admin_generation = app.session_generation;

        app.logout();
        app.apply_grant(&grant_for("u2", "DOCENTE")).unwrap();
        assert_ne!(app.session_generation, admin_generation);

        let users: Vec<User> =
            serde_json::from_str(r#"[{"_id": "t1", "nombre": "Luis", "rol": "DOCENTE"}]"#).unwrap();
        let stale = [
            TaskResult::Users(users),
            TaskResult::Answer(QueryEntry::failed("pregunta del admin", "boom")),
            TaskResult::Done {
                message: "Teacher deleted".to_string(),
                reload: None,
            },
        ];
        for result in stale {
            app.loading += 1;
            app.task_tx.send((admin_generation, result)).await.unwrap();
        }
        app.check_background_tasks();

        assert!(app.users.is_empty());
        assert!(app.history.is_empty());
        assert_ne!(app.status_message.as_deref(), Some("Teacher deleted"));
        assert_eq!(*app.route(), Route::TeacherDashboard);

        app.task_tx
            .send((app.session_generation, TaskResult::Answer(QueryEntry::failed("mía", "boom"))))
            .await
            .unwrap();
        app.check_background_tasks();
        assert_eq!(app.history.len(), 1);
    }

    #[tokio::test]
    async fn test_week_and_category_cycle() {
        let dir = TempDir::new().unwrap();
        let mut app = app_in(&dir);
        app.select_week(false);
        assert_eq!(app.week, WEEK_COUNT);
        app.select_week(true);
        assert_eq!(app.week, 1);
        app.select_category(false);
        assert_eq!(app.category, Category::Laboratory);
    }
}
