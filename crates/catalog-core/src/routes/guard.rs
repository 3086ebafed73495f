//! Route guard: the allow/redirect decision for protected routes.

use super::Route;

/// The two session facts the guard looks at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GuardState {
    pub is_authenticated: bool,
    pub loading: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GuardDecision {
    /// Session still hydrating: render nothing yet.
    Suspend,
    Redirect(Route),
    Allow,
}

/// Pure decision for a protected subtree.
pub fn guard(state: GuardState) -> GuardDecision {
    if state.loading {
        GuardDecision::Suspend
    } else if !state.is_authenticated {
        GuardDecision::Redirect(Route::Login)
    } else {
        GuardDecision::Allow
    }
}
