//! Application state management for the admin console.
//!
//! This module contains the `App` struct that holds UI state, the shared
//! session, and the channel background requests report back on. Which view
//! is shown is decided by the route guard on every pass of the event loop.

use std::sync::Arc;

use anyhow::Result;
use tokio::sync::{mpsc, watch};
use tracing::{debug, info, warn};

use quadrobobr_core::api::{ApiError, AuthorizedClient};
use quadrobobr_core::auth::{SessionManager, SessionState};
use quadrobobr_core::config::Config;
use quadrobobr_core::routes::{
    Navigation, Route, RouteGuard, Section, HOME_PATH, LOGIN_PATH,
};

// ============================================================================
// Constants
// ============================================================================

/// Buffer size for the background task message channel.
const CHANNEL_BUFFER_SIZE: usize = 16;

/// Maximum length for email input.
const MAX_EMAIL_LENGTH: usize = 254;

/// Maximum length for password input.
/// 128 chars accommodates password managers and passphrases.
const MAX_PASSWORD_LENGTH: usize = 128;

/// Redirect hops followed in one pass (`/` -> `/admin` -> `/login`).
const MAX_REDIRECTS: usize = 4;

/// Environment variable pre-filling the login email.
const EMAIL_ENV: &str = "QUADROBOBR_EMAIL";

// ============================================================================
// UI State Types
// ============================================================================

/// Overlay state on top of the current view
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppState {
    Normal,
    ShowingHelp,
    ConfirmingLogout,
    ConfirmingQuit,
    Quitting,
}

/// Login form focus state
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LoginFocus {
    Email,
    Password,
    Button,
}

/// Results sent back from background requests.
enum BackgroundResult {
    UnreadCount(u64),
    /// The server rejected the token that was sent
    SessionRejected,
    Error(String),
}

// ============================================================================
// Main Application Struct
// ============================================================================

pub struct App {
    // Core services
    pub config: Config,
    pub session: Arc<SessionManager>,
    pub api: AuthorizedClient,
    pub guard: RouteGuard,

    // Navigation
    pub state: AppState,
    pub location: String,
    pub route: Route,
    pub menu_selection: usize,

    // Login form state
    pub login_email: String,
    pub login_password: String,
    pub login_focus: LoginFocus,
    pub login_error: Option<String>,

    // Sidebar data
    pub unread_count: Option<u64>,
    pub status_message: Option<String>,

    session_rx: watch::Receiver<SessionState>,
    background_tx: mpsc::Sender<BackgroundResult>,
    background_rx: mpsc::Receiver<BackgroundResult>,
}

impl App {
    pub fn with_session(config: Config, session: Arc<SessionManager>) -> Self {
        let api = session.api().authorized(session.clone());
        let session_rx = session.subscribe();
        let (background_tx, background_rx) = mpsc::channel(CHANNEL_BUFFER_SIZE);

        let login_email = std::env::var(EMAIL_ENV)
            .ok()
            .or_else(|| config.last_email.clone())
            .unwrap_or_default();

        let mut app = Self {
            config,
            session,
            api,
            guard: RouteGuard::new(),

            state: AppState::Normal,
            location: "/".to_string(),
            route: Route::Home,
            menu_selection: 0,

            login_email,
            login_password: String::new(),
            login_focus: LoginFocus::Email,
            login_error: None,

            unread_count: None,
            status_message: None,

            session_rx,
            background_tx,
            background_rx,
        };
        app.resolve_route();
        app
    }

    // =========================================================================
    // Navigation
    // =========================================================================

    /// Request a path. The guard decides what is shown on the next pass.
    pub fn navigate(&mut self, path: &str) {
        debug!(from = %self.location, to = path, "Navigate");
        self.location = path.to_string();
        self.resolve_route();
    }

    /// Run the guard against the requested path, following redirects.
    pub fn resolve_route(&mut self) {
        for _ in 0..MAX_REDIRECTS {
            match self.guard.resolve(&self.location, &*self.session) {
                Navigation::Render(route) => {
                    if route == Route::Login && self.route != Route::Login {
                        self.start_login();
                    }
                    if let Route::Section(section) = route {
                        self.menu_selection = Section::ALL
                            .iter()
                            .position(|s| *s == section)
                            .unwrap_or(self.menu_selection);
                    }
                    self.route = route;
                    return;
                }
                Navigation::Redirect(route) => {
                    debug!(from = %self.location, to = route.path(), "Redirect");
                    self.location = route.path().to_string();
                }
            }
        }

        warn!(location = %self.location, "Too many redirects, showing login");
        self.location = LOGIN_PATH.to_string();
        if self.route != Route::Login {
            self.start_login();
        }
        self.route = Route::Login;
    }

    pub fn selected_section(&self) -> Section {
        Section::ALL[self.menu_selection.min(Section::ALL.len() - 1)]
    }

    pub fn select_next(&mut self) {
        self.menu_selection = (self.menu_selection + 1) % Section::ALL.len();
    }

    pub fn select_prev(&mut self) {
        self.menu_selection = self
            .menu_selection
            .checked_sub(1)
            .unwrap_or(Section::ALL.len() - 1);
    }

    pub fn open_selected_section(&mut self) {
        let path = self.selected_section().path();
        self.navigate(path);
    }

    // =========================================================================
    // Authentication
    // =========================================================================

    /// Attempt login with the credentials from the login form
    pub async fn attempt_login(&mut self) -> Result<()> {
        let email = self.login_email.trim().to_string();
        let password = self.login_password.clone();

        if email.is_empty() || password.is_empty() {
            self.login_error = Some("Email and password required".to_string());
            return Err(anyhow::anyhow!("Email and password required"));
        }

        self.login_error = None;

        match self.session.login(&email, &password).await {
            Ok(identity) => {
                self.config.last_email = Some(email);
                if let Err(e) = self.config.save() {
                    warn!(error = %e, "Failed to save config");
                }

                self.login_password.clear();
                self.status_message = Some(format!("Signed in as {}", identity.display_name()));
                self.navigate(HOME_PATH);
                Ok(())
            }
            Err(e) => {
                self.login_error = Some(e.user_message());
                self.login_focus = LoginFocus::Password;
                Err(e.into())
            }
        }
    }

    /// Start the login process (reset the form)
    pub fn start_login(&mut self) {
        self.login_focus = if self.login_email.is_empty() {
            LoginFocus::Email
        } else {
            LoginFocus::Password
        };
        self.login_password.clear();
        self.login_error = None;
    }

    pub fn logout(&mut self) {
        self.session.logout();
        self.navigate(LOGIN_PATH);
    }

    // =========================================================================
    // Background Tasks
    // =========================================================================

    /// Fetch the unread message count without blocking the UI.
    pub fn refresh_unread_count(&self) {
        if !self.session.is_authenticated() {
            return;
        }
        let api = self.api.clone();
        let tx = self.background_tx.clone();
        tokio::spawn(async move {
            let result = match api.unread_message_count().await {
                Ok(count) => BackgroundResult::UnreadCount(count),
                Err(ApiError::Unauthorized) => BackgroundResult::SessionRejected,
                Err(e) => BackgroundResult::Error(e.to_string()),
            };
            if tx.send(result).await.is_err() {
                debug!("App closed before unread count arrived");
            }
        });
    }

    /// Apply session changes and results from background requests.
    pub fn check_background_tasks(&mut self) {
        if self.session_rx.has_changed().unwrap_or(false) {
            let state = self.session_rx.borrow_and_update().clone();
            self.on_session_changed(state);
        }

        while let Ok(result) = self.background_rx.try_recv() {
            self.process_background_result(result);
        }
    }

    fn on_session_changed(&mut self, state: SessionState) {
        match state {
            SessionState::SignedIn(_) => {
                info!("Session started");
                self.refresh_unread_count();
            }
            SessionState::SignedOut => {
                info!("Session ended");
                self.unread_count = None;
            }
        }
    }

    fn process_background_result(&mut self, result: BackgroundResult) {
        match result {
            BackgroundResult::UnreadCount(count) => {
                self.unread_count = Some(count);
            }
            // A rejection of a token a newer login replaced leaves the view alone
            BackgroundResult::SessionRejected if self.session.is_authenticated() => {
                debug!("Ignoring rejection of a replaced token");
            }
            BackgroundResult::SessionRejected => {
                self.status_message = Some("Session expired, please sign in again".to_string());
                self.navigate(LOGIN_PATH);
            }
            BackgroundResult::Error(msg) => {
                warn!(error = %msg, "Background request failed");
                self.status_message = Some(format!("Error: {}", msg));
            }
        }
    }
}

// ============================================================================
// Input validation helpers (exported for use in input.rs)
// ============================================================================

/// Check if a character is valid for input (no control characters)
fn is_valid_input_char(c: char) -> bool {
    !c.is_control()
}

/// Check if an email character should be accepted
pub fn can_add_email_char(current_len: usize, c: char) -> bool {
    current_len < MAX_EMAIL_LENGTH && is_valid_input_char(c) && !c.is_whitespace()
}

/// Check if a password character should be accepted
pub fn can_add_password_char(current_len: usize, c: char) -> bool {
    current_len < MAX_PASSWORD_LENGTH && is_valid_input_char(c)
}

// ============================================================================
// Tests
// ============================================================================
