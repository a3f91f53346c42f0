//! Console routes and the guard deciding which of them may be shown.
//!
//! The guard is a pure function of the requested path and the current
//! authentication state. It is evaluated on every render pass and keeps no
//! state of its own, so a logout anywhere is seen on the very next render.

use tracing::debug;

use crate::auth::SessionManager;

pub const LOGIN_PATH: &str = "/login";
pub const HOME_PATH: &str = "/admin";

/// Anything that can answer "is an admin signed in right now".
pub trait Authenticated {
    fn is_authenticated(&self) -> bool;
}

impl Authenticated for SessionManager {
    fn is_authenticated(&self) -> bool {
        SessionManager::is_authenticated(self)
    }
}

impl<T: Authenticated + ?Sized> Authenticated for std::sync::Arc<T> {
    fn is_authenticated(&self) -> bool {
        (**self).is_authenticated()
    }
}

/// Content sections of the admin console, in sidebar order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Section {
    Photos,
    Video,
    Sliders,
    Gallery,
    Reviews,
    Messages,
    Faq,
    Users,
    Seo,
    Telegram,
}

impl Section {
    pub const ALL: [Section; 10] = [
        Section::Photos,
        Section::Video,
        Section::Sliders,
        Section::Gallery,
        Section::Reviews,
        Section::Messages,
        Section::Faq,
        Section::Users,
        Section::Seo,
        Section::Telegram,
    ];

    pub fn path(&self) -> &'static str {
        match self {
            Section::Photos => "/admin/photos",
            Section::Video => "/admin/video",
            Section::Sliders => "/admin/sliders",
            Section::Gallery => "/admin/gallery",
            Section::Reviews => "/admin/reviews",
            Section::Messages => "/admin/messages",
            Section::Faq => "/admin/faq",
            Section::Users => "/admin/users",
            Section::Seo => "/admin/seo",
            Section::Telegram => "/admin/telegram",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Section::Photos => "Photos",
            Section::Video => "Video",
            Section::Sliders => "Sliders",
            Section::Gallery => "Gallery",
            Section::Reviews => "Reviews",
            Section::Messages => "Messages",
            Section::Faq => "FAQ",
            Section::Users => "Users",
            Section::Seo => "SEO",
            Section::Telegram => "Telegram",
        }
    }

    /// REST collection the section's editor works against.
    pub fn api_collection(&self) -> &'static str {
        match self {
            Section::Photos => "/api/photos",
            Section::Video => "/api/videos",
            Section::Sliders => "/api/sliders",
            Section::Gallery => "/api/gallery",
            Section::Reviews => "/api/reviews",
            Section::Messages => "/api/contact-forms",
            Section::Faq => "/api/faq/all",
            Section::Users => "/api/users",
            Section::Seo => "/api/seo",
            Section::Telegram => "/api/telegram/settings",
        }
    }
}

/// A view the console can show.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Route {
    Login,
    Home,
    Section(Section),
}

impl Route {
    /// Parse a path. Trailing slashes are ignored; unknown paths yield `None`.
    pub fn from_path(path: &str) -> Option<Self> {
        let trimmed = path.trim();
        let normalized = match trimmed.trim_end_matches('/') {
            "" => "/",
            p => p,
        };
        match normalized {
            LOGIN_PATH => Some(Route::Login),
            HOME_PATH => Some(Route::Home),
            p => Section::ALL
                .iter()
                .find(|s| s.path() == p)
                .map(|s| Route::Section(*s)),
        }
    }

    pub fn path(&self) -> &'static str {
        match self {
            Route::Login => LOGIN_PATH,
            Route::Home => HOME_PATH,
            Route::Section(section) => section.path(),
        }
    }

    pub fn is_protected(&self) -> bool {
        !matches!(self, Route::Login)
    }
}

/// Outcome of a guard check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Navigation {
    Render(Route),
    Redirect(Route),
}

/// Gate in front of every protected view.
#[derive(Debug, Clone, Copy, Default)]
pub struct RouteGuard;

impl RouteGuard {
    pub fn new() -> Self {
        Self
    }

    /// Decide what to do with a request for `path`.
    ///
    /// `/` and unknown paths go to the home view; protected views render only
    /// when `auth` reports a signed-in admin, otherwise they redirect to login.
    pub fn resolve(&self, path: &str, auth: &impl Authenticated) -> Navigation {
        let route = match Route::from_path(path) {
            Some(route) => route,
            None => {
                debug!(path = path, "Unknown path, redirecting home");
                return Navigation::Redirect(Route::Home);
            }
        };

        if route.is_protected() && !auth.is_authenticated() {
            return Navigation::Redirect(Route::Login);
        }
        Navigation::Render(route)
    }
}
