//! Navigation targets produced by the guard and the session store.

use reqwest::Url;

/// Login view
pub const LOGIN_PATH: &str = "/auth/login";

/// Where users with the wrong role are sent
pub const FALLBACK_PATH: &str = "/dashboard";

/// Where a successful login lands when there is no usable return path
pub const DEFAULT_LANDING_PATH: &str = "/dashboard";

/// Only used to borrow `Url`'s query encoding for site-relative paths.
const PLACEHOLDER_ORIGIN: &str = "http://dashboard.invalid";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Navigation {
    /// Login view, carrying the path to come back to.
    Login { from: Option<String> },
    /// Fallback page with the unauthorized flag and an optional message.
    Fallback { message: Option<String> },
    /// Any other site-relative location.
    Path(String),
}

fn site_url(href: &str) -> Option<Url> {
    Url::parse(PLACEHOLDER_ORIGIN).and_then(|base| base.join(href)).ok()
}

fn with_query<'a>(path: &str, pairs: impl IntoIterator<Item = (&'a str, &'a str)>) -> String {
    let mut url = match site_url(path) {
        Some(url) => url,
        None => return path.to_string(),
    };
    url.query_pairs_mut().extend_pairs(pairs);
    match url.query() {
        Some(query) if !query.is_empty() => format!("{}?{}", url.path(), query),
        _ => url.path().to_string(),
    }
}

impl Navigation {
    pub fn login(from: Option<&str>) -> Self {
        Navigation::Login {
            from: from.map(str::to_string),
        }
    }

    pub fn fallback(message: impl Into<String>) -> Self {
        Navigation::Fallback {
            message: Some(message.into()),
        }
    }

    /// Site-relative URL for this target.
    pub fn href(&self) -> String {
        match self {
            Navigation::Login { from } => {
                with_query(LOGIN_PATH, from.as_deref().map(|f| ("from", f)))
            }
            Navigation::Fallback { message } => with_query(
                FALLBACK_PATH,
                std::iter::once(("unauthorized", "true"))
                    .chain(message.as_deref().map(|m| ("message", m))),
            ),
            Navigation::Path(path) => path.clone(),
        }
    }

    /// Recognize an href produced by `href()`.
    pub fn from_href(href: &str) -> Self {
        let url = match site_url(href) {
            Some(url) => url,
            None => return Navigation::Path(href.to_string()),
        };
        let param = |name: &str| {
            url.query_pairs()
                .find(|(k, _)| k == name)
                .map(|(_, v)| v.into_owned())
        };

        if url.path() == LOGIN_PATH {
            return Navigation::Login { from: param("from") };
        }
        if url.path() == FALLBACK_PATH && param("unauthorized").as_deref() == Some("true") {
            return Navigation::Fallback {
                message: param("message"),
            };
        }
        Navigation::Path(href.to_string())
    }
}

/// Where to go after a successful login.
///
/// `from` is honoured only when it is a same-site absolute path that is not
/// the login view itself; anything else lands on the dashboard.
pub fn resolve_return_path(from: Option<&str>) -> String {
    match from.map(str::trim) {
        Some(path)
            if path.starts_with('/')
                && !path.starts_with("//")
                && !path.contains('\\')
                && super::policy::normalize_path(path) != LOGIN_PATH =>
        {
            path.to_string()
        }
        _ => DEFAULT_LANDING_PATH.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_login_href_encodes_return_path() {
        let nav = Navigation::login(Some("/orders/42?tab=items"));
        assert_eq!(nav.href(), "/auth/login?from=%2Forders%2F42%3Ftab%3Ditems");
        assert_eq!(Navigation::from_href(&nav.href()), nav);
        assert_eq!(Navigation::login(None).href(), "/auth/login");
    }

    #[test]
    fn test_fallback_href() {
        let nav = Navigation::fallback("No access");
        assert_eq!(nav.href(), "/dashboard?unauthorized=true&message=No+access");
        assert_eq!(Navigation::from_href(&nav.href()), nav);

        let bare = Navigation::Fallback { message: None };
        assert_eq!(bare.href(), "/dashboard?unauthorized=true");
        assert_eq!(Navigation::from_href(&bare.href()), bare);
    }

    #[test]
    fn test_plain_dashboard_is_not_fallback() {
        assert_eq!(
            Navigation::from_href("/dashboard"),
            Navigation::Path("/dashboard".to_string())
        );
    }

    #[test]
    fn test_resolve_return_path() {
        assert_eq!(resolve_return_path(Some("/payments/record")), "/payments/record");
        assert_eq!(resolve_return_path(None), DEFAULT_LANDING_PATH);
        assert_eq!(resolve_return_path(Some("")), DEFAULT_LANDING_PATH);
        assert_eq!(resolve_return_path(Some("https://evil.example")), DEFAULT_LANDING_PATH);
        assert_eq!(resolve_return_path(Some("//evil.example/x")), DEFAULT_LANDING_PATH);
        assert_eq!(resolve_return_path(Some("/\\evil.example")), DEFAULT_LANDING_PATH);
        assert_eq!(resolve_return_path(Some("/auth/login?from=/x")), DEFAULT_LANDING_PATH);
    }
}
