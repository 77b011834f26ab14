use crate::roles::Role;

pub const ROOT_ROUTE: &str = "/";
pub const ADMIN_DASHBOARD_ROUTE: &str = "/admin";
pub const ADVISOR_DASHBOARD_ROUTE: &str = "/advisor/dashboard";
pub const ENTREPRENEUR_DASHBOARD_ROUTE: &str = "/entrepreneur/dashboard";

pub const ADMIN_LOGIN_ROUTE: &str = "/admin/login";
pub const ADVISOR_LOGIN_ROUTE: &str = "/auth/advisor";
pub const ENTREPRENEUR_LOGIN_ROUTE: &str = "/auth/entrepreneur";

/// Landing page for a role. Suppliers have no dashboard and share the root
/// path with anonymous users.
pub fn dashboard_route(role: Option<Role>) -> &'static str {
    match role {
        Some(Role::Admin) => ADMIN_DASHBOARD_ROUTE,
        Some(Role::Advisor) => ADVISOR_DASHBOARD_ROUTE,
        Some(Role::Entrepreneur) => ENTREPRENEUR_DASHBOARD_ROUTE,
        Some(Role::Supplier) | None => ROOT_ROUTE,
    }
}

/// Login page for a role; anything without a dedicated page lands on the
/// entrepreneur login.
pub fn login_route(role: Option<Role>) -> &'static str {
    match role {
        Some(Role::Admin) => ADMIN_LOGIN_ROUTE,
        Some(Role::Advisor) => ADVISOR_LOGIN_ROUTE,
        Some(Role::Entrepreneur) | Some(Role::Supplier) | None => ENTREPRENEUR_LOGIN_ROUTE,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn supplier_and_anonymous_share_root_dashboard() {
        assert_eq!(dashboard_route(Some(Role::Supplier)), ROOT_ROUTE);
        assert_eq!(dashboard_route(None), ROOT_ROUTE);
    }

    #[test]
    fn dashboards_per_role() {
        assert_eq!(dashboard_route(Some(Role::Admin)), "/admin");
        assert_eq!(dashboard_route(Some(Role::Advisor)), "/advisor/dashboard");
        assert_eq!(dashboard_route(Some(Role::Entrepreneur)), "/entrepreneur/dashboard");
    }

    #[test]
    fn login_falls_back_to_entrepreneur() {
        assert_eq!(login_route(None), ENTREPRENEUR_LOGIN_ROUTE);
        assert_eq!(login_route(Some(Role::Supplier)), ENTREPRENEUR_LOGIN_ROUTE);
        assert_eq!(login_route(Some(Role::Admin)), ADMIN_LOGIN_ROUTE);
        assert_eq!(login_route(Some(Role::Advisor)), ADVISOR_LOGIN_ROUTE);
    }
}
