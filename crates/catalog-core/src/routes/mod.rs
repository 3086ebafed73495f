//! Route table and navigation.
//!
//! `/`, `/login` and the not-found page are public. Everything under
//! `/products` goes through the guard on every navigation.

mod guard;

use std::fmt;

pub use guard::{guard, GuardDecision, GuardState};

use crate::auth::Session;
use crate::models::ProductId;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    Home,
    Login,
    Products,
    NewProduct,
    EditProduct(ProductId),
    NotFound(String),
}

impl Route {
    /// Match a path against the route table. Query strings and fragments are
    /// ignored; a trailing slash is tolerated.
    pub fn parse(path: &str) -> Self {
        let path = path.split(['?', '#']).next().unwrap_or_default();
        let trimmed = path.trim_end_matches('/');
        let segments: Vec<&str> = trimmed
            .split('/')
            .filter(|s| !s.is_empty())
            .collect();

        match segments.as_slice() {
            [] => Route::Home,
            ["login"] => Route::Login,
            ["products"] => Route::Products,
            ["products", "new"] => Route::NewProduct,
            ["products", id] => match id.parse::<ProductId>() {
                Ok(id) => Route::EditProduct(id),
                Err(_) => Route::NotFound(path.to_string()),
            },
            _ => Route::NotFound(path.to_string()),
        }
    }

    pub fn path(&self) -> String {
        match self {
            Route::Home => "/".to_string(),
            Route::Login => "/login".to_string(),
            Route::Products => "/products".to_string(),
            Route::NewProduct => "/products/new".to_string(),
            Route::EditProduct(id) => format!("/products/{}", id),
            Route::NotFound(path) => path.clone(),
        }
    }

    pub fn is_protected(&self) -> bool {
        matches!(
            self,
            Route::Products | Route::NewProduct | Route::EditProduct(_)
        )
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.path())
    }
}

/// Outcome of navigating to a path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Navigation {
    Render(Route),
    Redirect { from: Route, to: Route },
    /// Protected route requested while the session is still hydrating.
    Pending(Route),
}

/// Resolve `path` and run the guard against the current session.
///
/// Call this on every navigation; the decision is never cached.
pub fn navigate(session: &Session, path: &str) -> Navigation {
    let route = Route::parse(path);
    if !route.is_protected() {
        return Navigation::Render(route);
    }
    match guard(session.guard_state()) {
        GuardDecision::Allow => Navigation::Render(route),
        GuardDecision::Suspend => Navigation::Pending(route),
        GuardDecision::Redirect(to) => Navigation::Redirect { from: route, to },
    }
}
