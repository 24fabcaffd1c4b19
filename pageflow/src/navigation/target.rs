//! Session targets and the target-page predicate.

use serde::{Deserialize, Serialize};
use url::Url;

use crate::config::SiteProfile;
use crate::errors::ConfigError;

/// What the session was asked to collect from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind", content = "value")]
pub enum SessionTarget {
    /// A page address to open directly.
    Url(String),
    /// A free-text query run through the site's search page.
    Query(String),
}

impl SessionTarget {
    /// Classifies raw user input: absolute http(s) addresses are URLs,
    /// anything else is a query.
    #[must_use]
    pub fn parse(raw: &str) -> Self {
        let trimmed = raw.trim();
        match Url::parse(trimmed) {
            Ok(url) if matches!(url.scheme(), "http" | "https") => Self::Url(url.to_string()),
            _ => Self::Query(trimmed.to_string()),
        }
    }

    /// Returns the raw text of the target.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Url(s) | Self::Query(s) => s,
        }
    }
}

/// Builds the address the session's first tab is opened on.
pub fn resolve_start_url(target: &SessionTarget, site: &SiteProfile) -> Result<String, ConfigError> {
    match target {
        SessionTarget::Url(url) => Ok(url.clone()),
        SessionTarget::Query(query) if query.trim().is_empty() => {
            Err(ConfigError::invalid("target", "query must not be empty"))
        }
        SessionTarget::Query(query) => {
            let encoded: String = url::form_urlencoded::byte_serialize(query.trim().as_bytes()).collect();
            Ok(site.search_url_template.replace("{query}", &encoded))
        }
    }
}

/// Predicate recognising the target page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetMatcher {
    hosts: Vec<String>,
    path_marker: String,
}

impl TargetMatcher {
    /// Creates a matcher.
    #[must_use]
    pub fn new<I, S>(hosts: I, path_marker: impl Into<String>) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            hosts: hosts.into_iter().map(Into::into).collect(),
            path_marker: path_marker.into(),
        }
    }

    /// Creates a matcher from a site profile.
    #[must_use]
    pub fn from_profile(site: &SiteProfile) -> Self {
        Self::new(site.target_hosts.iter().cloned(), site.target_path_marker.clone())
    }

    /// Returns true if `url` is a target page.
    #[must_use]
    pub fn matches(&self, url: &str) -> bool {
        let Ok(parsed) = Url::parse(url) else {
            return false;
        };
        let Some(host) = parsed.host_str() else {
            return false;
        };
        self.hosts.iter().any(|h| host.contains(h.as_str()))
            && parsed.path().contains(&self.path_marker)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_target() {
        assert!(matches!(
            SessionTarget::parse("https://smartstore.naver.com/shop/products/1"),
            SessionTarget::Url(_)
        ));
        assert_eq!(
            SessionTarget::parse("  wireless earbuds "),
            SessionTarget::Query("wireless earbuds".to_string())
        );
        assert!(matches!(SessionTarget::parse("ftp://x/y"), SessionTarget::Query(_)));
    }

    #[test]
    fn test_query_is_encoded_into_template() {
        let site = SiteProfile::default().with_search_template("https://search.test/?q={query}");
        let url = resolve_start_url(&SessionTarget::Query("무선 이어폰".to_string()), &site).unwrap();
        assert_eq!(url, "https://search.test/?q=%EB%AC%B4%EC%84%A0+%EC%9D%B4%EC%96%B4%ED%8F%B0");
    }

    #[test]
    fn test_url_target_is_used_verbatim() {
        let target = SessionTarget::Url("https://brand.naver.com/x/products/9".to_string());
        let url = resolve_start_url(&target, &SiteProfile::default()).unwrap();
        assert_eq!(url, "https://brand.naver.com/x/products/9");
    }

    #[test]
    fn test_empty_query_rejected() {
        let err = resolve_start_url(&SessionTarget::Query(" ".to_string()), &SiteProfile::default());
        assert!(err.is_err());
    }

    #[test]
    fn test_matcher() {
        let matcher = TargetMatcher::from_profile(&SiteProfile::default());
        assert!(matcher.matches("https://smartstore.naver.com/shop/products/123"));
        assert!(matcher.matches("https://brand.naver.com/brand/products/5?tab=qna"));
        assert!(!matcher.matches("https://search.shopping.naver.com/search/all?query=x"));
        assert!(!matcher.matches("https://smartstore.naver.com/shop"));
        assert!(!matcher.matches("about:blank"));
    }
}
