//! Mapping of requests to the resource/action pairs that authorization
//! decisions are made over.
//!
//! A request for `POST /api/management/v1/useradm/users?page=2` addresses
//! resource `management:v1:useradm:users` with action `POST`.

use std::collections::BTreeSet;
use std::fmt;

use hyper::Method;
use serde::{Deserialize, Serialize};

/// Prefix removed from request paths before they become resources.
pub const API_PREFIX: &str = "/api/";

/// Internal token verification endpoint, gated by default.
pub const INTERNAL_VERIFY_PATH: &str = "/api/internal/v1/warden/auth/verify";

/// Management token verification endpoint, gated by default.
pub const MANAGEMENT_VERIFY_PATH: &str = "/api/management/v1/warden/auth/verify";

/// The subject of an authorization decision.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ResourceAction {
    /// `:` separated path segments, e.g. `management:v1:useradm:users`.
    pub resource: String,
    /// Upper case HTTP method name.
    pub action: String,
}

impl fmt::Display for ResourceAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.action, self.resource)
    }
}

/// Derive the resource/action pair for a request.
///
/// Total over all inputs: the query string is ignored, a leading
/// [`API_PREFIX`] is stripped, empty segments are dropped and the remaining
/// segments are joined with `:`. The root path maps to an empty resource.
#[must_use]
pub fn extract(method: &Method, path: &str) -> ResourceAction {
    let path = without_query(path);
    let path = path.strip_prefix(API_PREFIX).unwrap_or(path);

    let resource = path
        .split('/')
        .filter(|segment| !segment.is_empty())
        .collect::<Vec<_>>()
        .join(":");

    ResourceAction {
        resource,
        action: method.as_str().to_ascii_uppercase(),
    }
}

fn without_query(path: &str) -> &str {
    path.split_once('?').map_or(path, |(path, _)| path)
}

/// Strip the query and any trailing slashes, keeping the root as `/`.
fn normalize(path: &str) -> &str {
    let trimmed = without_query(path).trim_end_matches('/');
    if trimmed.is_empty() { "/" } else { trimmed }
}

/// The set of paths the gate protects.
///
/// Matching is exact after normalization, so `/a/b/` and `/a/b?x=1` match a
/// configured `/a/b` but `/a/b/c` does not.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GatedEndpoints {
    paths: BTreeSet<String>,
}

impl GatedEndpoints {
    /// Gate exactly the given paths.
    pub fn new<I, P>(paths: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: AsRef<str>,
    {
        Self {
            paths: paths
                .into_iter()
                .map(|path| normalize(path.as_ref()).to_owned())
                .collect(),
        }
    }

    /// Gate no paths at all.
    #[must_use]
    pub fn none() -> Self {
        Self {
            paths: BTreeSet::new(),
        }
    }

    /// Add a path to the set.
    #[must_use]
    pub fn with(mut self, path: impl AsRef<str>) -> Self {
        self.paths.insert(normalize(path.as_ref()).to_owned());
        self
    }

    /// Returns `true` if requests to `path` must pass the gate.
    #[must_use]
    pub fn is_gated(&self, path: &str) -> bool {
        self.paths.contains(normalize(path))
    }

    /// Gated paths in normalized form.
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.paths.iter().map(String::as_str)
    }
}

/// The internal and management token verification endpoints.
impl Default for GatedEndpoints {
    fn default() -> Self {
        Self::new([INTERNAL_VERIFY_PATH, MANAGEMENT_VERIFY_PATH])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn resource(method: Method, path: &str) -> (String, String) {
        let ResourceAction { resource, action } = extract(&method, path);
        (resource, action)
    }

    #[test]
    fn it_joins_segments_after_the_api_prefix() {
        assert_eq!(
            resource(Method::POST, "/api/management/v1/useradm/users"),
            ("management:v1:useradm:users".into(), "POST".into())
        );
    }

    #[test]
    fn it_ignores_queries_and_empty_segments() {
        assert_eq!(
            resource(Method::GET, "/api//internal/v1/warden//auth/verify/?x=1&y=/a/b"),
            ("internal:v1:warden:auth:verify".into(), "GET".into())
        );
    }

    #[test]
    fn it_keeps_paths_outside_the_api_prefix() {
        assert_eq!(
            resource(Method::DELETE, "/status/live"),
            ("status:live".into(), "DELETE".into())
        );
        assert_eq!(resource(Method::GET, "/api"), ("api".into(), "GET".into()));
    }

    #[test]
    fn it_maps_the_root_to_an_empty_resource() {
        assert_eq!(resource(Method::GET, "/"), (String::new(), "GET".into()));
        assert_eq!(resource(Method::GET, "/api/"), (String::new(), "GET".into()));
        assert_eq!(resource(Method::GET, ""), (String::new(), "GET".into()));
    }

    #[test]
    fn it_upper_cases_extension_methods() {
        let method = Method::from_bytes(b"purge").unwrap();
        assert_eq!(resource(method, "/api/cache"), ("cache".into(), "PURGE".into()));
    }

    #[test]
    fn it_gates_the_verification_endpoints_by_default() {
        let gated = GatedEndpoints::default();

        assert!(gated.is_gated(INTERNAL_VERIFY_PATH));
        assert!(gated.is_gated(MANAGEMENT_VERIFY_PATH));
        assert!(gated.is_gated("/api/management/v1/warden/auth/verify/"));
        assert!(gated.is_gated("/api/internal/v1/warden/auth/verify?token=x"));

        assert!(!gated.is_gated("/api/internal/v1/warden/auth/verify/more"));
        assert!(!gated.is_gated("/api/internal/v1/warden/health"));
        assert!(!gated.is_gated("/"));
    }

    #[test]
    fn it_normalizes_configured_paths() {
        let gated = GatedEndpoints::none().with("/api/devices/").with("/");

        assert!(gated.is_gated("/api/devices"));
        assert!(gated.is_gated("/"));
        assert!(gated.is_gated("//"));
        assert_eq!(gated.iter().collect::<Vec<_>>(), vec!["/", "/api/devices"]);
    }
}
