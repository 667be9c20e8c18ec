//! Navigation guard consulted before a protected view is rendered.

use crate::models::Identity;

pub const LOGIN_PATH: &str = "/login";
pub const HOME_PATH: &str = "/";
pub const ADMIN_DASHBOARD_PATH: &str = "/admin/dashboard";

/// Outcome of a guard check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuardDecision {
    Allow,
    RedirectTo(&'static str),
}

/// Access requirements of a view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RouteRequirements {
    pub requires_auth: bool,
    pub requires_admin: bool,
}

impl RouteRequirements {
    pub const PUBLIC: Self = Self {
        requires_auth: false,
        requires_admin: false,
    };
    pub const AUTHENTICATED: Self = Self {
        requires_auth: true,
        requires_admin: false,
    };
    pub const ADMIN: Self = Self {
        requires_auth: true,
        requires_admin: true,
    };

    /// Requirements of the storefront's views. Everything under `/admin`
    /// needs an admin; the shop itself, cart and checkout included, is public.
    #[must_use]
    pub fn for_path(path: &str) -> Self {
        let path = path.split(['?', '#']).next().unwrap_or_default();
        if path == "/admin" || path.starts_with("/admin/") {
            Self::ADMIN
        } else {
            Self::PUBLIC
        }
    }

    #[must_use]
    pub fn check(self, identity: Option<&Identity>) -> GuardDecision {
        decide(identity, self.requires_auth, self.requires_admin)
    }
}

/// Decide whether a view may be rendered.
///
/// A missing identity on an authenticated view goes to the login page; a
/// non-admin on an admin view goes home.
#[must_use]
pub fn decide(
    identity: Option<&Identity>,
    requires_auth: bool,
    requires_admin: bool,
) -> GuardDecision {
    match identity {
        None if requires_auth => GuardDecision::RedirectTo(LOGIN_PATH),
        None if requires_admin => GuardDecision::RedirectTo(HOME_PATH),
        Some(identity) if requires_admin && !identity.is_admin() => {
            GuardDecision::RedirectTo(HOME_PATH)
        }
        _ => GuardDecision::Allow,
    }
}

/// Where to go after signing in.
#[must_use]
pub fn landing_path(identity: &Identity) -> &'static str {
    if identity.is_admin() {
        ADMIN_DASHBOARD_PATH
    } else {
        HOME_PATH
    }
}

#[cfg(test)]
mod tests {
    use mercato_core::{Role, UserId};
    use secrecy::SecretString;

    use super::*;

    fn identity(role: Role) -> Identity {
        Identity {
            id: UserId::new("u1"),
            username: "ada".into(),
            email: "ada@example.com".into(),
            token: SecretString::from("tok"),
            role,
        }
    }

    #[test]
    fn test_anonymous_needs_login() {
        assert_eq!(decide(None, true, false), GuardDecision::RedirectTo("/login"));
        assert_eq!(decide(None, true, true), GuardDecision::RedirectTo("/login"));
        assert_eq!(decide(None, false, false), GuardDecision::Allow);
    }

    #[test]
    fn test_admin_views() {
        let customer = identity(Role::Customer);
        let admin = identity(Role::Admin);
        assert_eq!(decide(Some(&customer), true, true), GuardDecision::RedirectTo("/"));
        assert_eq!(decide(Some(&admin), true, true), GuardDecision::Allow);
        assert_eq!(decide(None, false, true), GuardDecision::RedirectTo("/"));
    }

    #[test]
    fn test_requirements_by_path() {
        assert_eq!(RouteRequirements::for_path("/admin/products"), RouteRequirements::ADMIN);
        assert_eq!(RouteRequirements::for_path("/admin"), RouteRequirements::ADMIN);
        assert_eq!(RouteRequirements::for_path("/administrator"), RouteRequirements::PUBLIC);
        assert_eq!(
            RouteRequirements::for_path("/admin/users?page=2"),
            RouteRequirements::ADMIN
        );
        assert_eq!(RouteRequirements::for_path("/checkout"), RouteRequirements::PUBLIC);
        assert_eq!(RouteRequirements::for_path("/products/p1"), RouteRequirements::PUBLIC);
    }

    #[test]
    fn test_landing_path() {
        assert_eq!(landing_path(&identity(Role::Admin)), "/admin/dashboard");
        assert_eq!(landing_path(&identity(Role::Customer)), "/");
    }
}
