//! Static route policy for the admin dashboard.
//!
//! Which routes need a login at all, and which roles may open each one.
//! Defined at build time; nothing mutates it.

use serde::Serialize;

use crate::models::Role;

const ALL_ROLES: &[Role] = &[Role::Owner, Role::PaymentAdmin, Role::Worker];
const OWNER_AND_WORKER: &[Role] = &[Role::Owner, Role::Worker];
const OWNER_AND_PAYMENTS: &[Role] = &[Role::Owner, Role::PaymentAdmin];
const OWNER_ONLY: &[Role] = &[Role::Owner];

/// Routes that require an authenticated identity (prefix match).
const PROTECTED_ROUTES: &[&str] = &[
    "/dashboard",
    "/products",
    "/orders",
    "/customers",
    "/payments",
    "/analytics",
    "/admin-users",
    "/admin",
    "/settings",
];

const ROUTE_RULES: &[RouteRule] = &[
    RouteRule::new("/dashboard", ALL_ROLES),
    RouteRule::new("/products", OWNER_AND_WORKER),
    RouteRule::new("/orders", ALL_ROLES),
    RouteRule::new("/customers", OWNER_AND_PAYMENTS),
    RouteRule::new("/payments", OWNER_AND_PAYMENTS),
    RouteRule::new("/analytics", OWNER_ONLY),
    RouteRule::new("/admin-users", OWNER_ONLY),
    RouteRule::new("/settings", OWNER_ONLY),
];

/// Sidebar entries, in display order.
const NAVIGATION: &[NavItem] = &[
    NavItem::new("Dashboard", "/dashboard", ALL_ROLES),
    NavItem::new("Products", "/products", OWNER_AND_WORKER),
    NavItem::new("Orders", "/orders", ALL_ROLES),
    NavItem::new("Customers", "/customers", OWNER_AND_PAYMENTS),
    NavItem::new("Payments", "/payments", OWNER_AND_PAYMENTS),
    NavItem::new("Analytics", "/analytics", OWNER_ONLY),
    NavItem::new("Admin Users", "/admin-users", OWNER_ONLY),
    NavItem::new("Settings", "/settings", OWNER_ONLY),
];

/// The dashboard's policy.
pub const ADMIN_POLICY: RoutePolicy = RoutePolicy::new(PROTECTED_ROUTES, ROUTE_RULES, NAVIGATION);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RouteRule {
    pub path: &'static str,
    pub roles: &'static [Role],
}

impl RouteRule {
    pub const fn new(path: &'static str, roles: &'static [Role]) -> Self {
        Self { path, roles }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct NavItem {
    pub name: &'static str,
    pub href: &'static str,
    pub roles: &'static [Role],
}

impl NavItem {
    pub const fn new(name: &'static str, href: &'static str, roles: &'static [Role]) -> Self {
        Self { name, href, roles }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct RoutePolicy {
    protected: &'static [&'static str],
    rules: &'static [RouteRule],
    navigation: &'static [NavItem],
}

/// Strip query string and fragment, and any trailing slash except on `/`.
pub fn normalize_path(path: &str) -> &str {
    let end = path.find(|c| c == '?' || c == '#').unwrap_or(path.len());
    let path = &path[..end];
    let trimmed = path.trim_end_matches('/');
    if trimmed.is_empty() {
        "/"
    } else {
        trimmed
    }
}

/// Segment-aware prefix test: `/products` covers `/products` and
/// `/products/42` but not `/productsx`.
pub fn covers(prefix: &str, path: &str) -> bool {
    if prefix == "/" {
        return true;
    }
    match path.strip_prefix(prefix) {
        Some(rest) => rest.is_empty() || rest.starts_with('/'),
        None => false,
    }
}

impl RoutePolicy {
    pub const fn new(
        protected: &'static [&'static str],
        rules: &'static [RouteRule],
        navigation: &'static [NavItem],
    ) -> Self {
        Self {
            protected,
            rules,
            navigation,
        }
    }

    /// Whether the route needs an authenticated identity at all.
    pub fn requires_auth(&self, path: &str) -> bool {
        let path = normalize_path(path);
        self.protected.iter().any(|prefix| covers(prefix, path))
    }

    /// Roles permitted on `path`: exact rule first, then the longest
    /// covering prefix. `None` means any authenticated identity.
    pub fn required_roles(&self, path: &str) -> Option<&'static [Role]> {
        let path = normalize_path(path);
        if let Some(rule) = self.rules.iter().find(|r| r.path == path) {
            return Some(rule.roles);
        }
        self.rules
            .iter()
            .filter(|r| covers(r.path, path))
            .max_by_key(|r| r.path.len())
            .map(|r| r.roles)
    }

    /// Sidebar entries a role may see.
    pub fn visible_nav(&self, role: Role) -> Vec<&'static NavItem> {
        self.navigation
            .iter()
            .filter(|item| item.roles.contains(&role))
            .collect()
    }

    pub fn rules(&self) -> &'static [RouteRule] {
        self.rules
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_path() {
        assert_eq!(normalize_path("/products/"), "/products");
        assert_eq!(normalize_path("/products?page=2"), "/products");
        assert_eq!(normalize_path("/orders#top"), "/orders");
        assert_eq!(normalize_path("/"), "/");
        assert_eq!(normalize_path(""), "/");
    }

    #[test]
    fn test_covers_is_segment_aware() {
        assert!(covers("/products", "/products"));
        assert!(covers("/products", "/products/42"));
        assert!(!covers("/products", "/productsx"));
        assert!(!covers("/admin", "/admin-users"));
        assert!(covers("/", "/anything"));
    }

    #[test]
    fn test_requires_auth() {
        assert!(ADMIN_POLICY.requires_auth("/dashboard"));
        assert!(ADMIN_POLICY.requires_auth("/orders/abc-123"));
        assert!(ADMIN_POLICY.requires_auth("/payments/pending-confirmations?x=1"));
        assert!(!ADMIN_POLICY.requires_auth("/auth/login"));
        assert!(!ADMIN_POLICY.requires_auth("/auth/forgot-password"));
        assert!(!ADMIN_POLICY.requires_auth("/"));
        assert!(!ADMIN_POLICY.requires_auth("/api-test"));
    }

    #[test]
    fn test_required_roles_prefix_inherits() {
        assert_eq!(ADMIN_POLICY.required_roles("/products/42"), Some(OWNER_AND_WORKER));
        assert_eq!(
            ADMIN_POLICY.required_roles("/products/42"),
            ADMIN_POLICY.required_roles("/products")
        );
        assert_eq!(ADMIN_POLICY.required_roles("/customers/7/edit"), Some(OWNER_AND_PAYMENTS));
    }

    #[test]
    fn test_required_roles_longest_prefix_wins() {
        const RULES: &[RouteRule] = &[
            RouteRule::new("/products", OWNER_AND_WORKER),
            RouteRule::new("/products/archive", OWNER_ONLY),
        ];
        const POLICY: RoutePolicy = RoutePolicy::new(&["/products"], RULES, &[]);

        assert_eq!(POLICY.required_roles("/products/archive"), Some(OWNER_ONLY));
        assert_eq!(POLICY.required_roles("/products/archive/3"), Some(OWNER_ONLY));
        assert_eq!(POLICY.required_roles("/products/archived"), Some(OWNER_AND_WORKER));
        assert_eq!(POLICY.required_roles("/products/42"), Some(OWNER_AND_WORKER));
    }

    #[test]
    fn test_categories_follow_products() {
        assert_eq!(ADMIN_POLICY.required_roles("/products/categories"), Some(OWNER_AND_WORKER));
    }

    #[test]
    fn test_required_roles_unlisted() {
        // Protected but unlisted: any authenticated identity.
        assert_eq!(ADMIN_POLICY.required_roles("/admin"), None);
    }

    #[test]
    fn test_visible_nav_per_role() {
        fn names(role: Role) -> Vec<&'static str> {
            ADMIN_POLICY.visible_nav(role).iter().map(|i| i.name).collect()
        }
        assert_eq!(names(Role::Worker), vec!["Dashboard", "Products", "Orders"]);
        assert_eq!(names(Role::PaymentAdmin), vec!["Dashboard", "Orders", "Customers", "Payments"]);
        assert_eq!(names(Role::Owner).len(), 8);
    }

    #[test]
    fn test_every_nav_item_matches_its_rule() {
        for item in NAVIGATION {
            assert!(ADMIN_POLICY.requires_auth(item.href), "{} not protected", item.href);
            assert_eq!(ADMIN_POLICY.required_roles(item.href), Some(item.roles), "{}", item.href);
        }
    }
}
