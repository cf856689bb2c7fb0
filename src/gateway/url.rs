//! Upstream URL normalization.
//!
//! # Responsibilities
//! - Strip trailing slashes and a trailing `/api` from the configured base
//! - Give resource paths exactly one trailing slash
//! - Route static media (`media/**/*.ext`) around the `/api` segment
//! - Detect `.`/`..` segments that a URL parser would resolve away
//!
//! # Design Decisions
//! - Pure: no I/O, the base is normalized once at construction
//! - Query strings are appended by the caller, never normalized here

/// Builds upstream URLs from a configured base and a resource path.
#[derive(Debug, Clone)]
pub struct UrlNormalizer {
    /// Base URL without trailing slashes and without a trailing `/api`.
    base: String,
    static_prefix: String,
}

impl UrlNormalizer {
    /// Create a normalizer for the given base URL and static media prefix.
    pub fn new(base_url: &str, static_prefix: &str) -> Self {
        let trimmed = base_url.trim_end_matches('/');
        let base = trimmed.strip_suffix("/api").unwrap_or(trimmed);

        Self {
            base: base.to_string(),
            static_prefix: static_prefix.trim_start_matches('/').to_string(),
        }
    }

    /// The base URL with any `/api` suffix removed.
    pub fn base(&self) -> &str {
        &self.base
    }

    /// Compute the absolute upstream URL for a resource path.
    pub fn target(&self, path: &str) -> String {
        let path = path.trim_start_matches('/');

        if self.is_static_asset(path) {
            return format!("{}/{}", self.base, path);
        }

        let normalized = normalize_path(path);
        format!("{}/api/{}", self.base, normalized.trim_start_matches('/'))
    }

    /// Compute the upstream URL and append a raw query string when present.
    pub fn target_with_query(&self, path: &str, query: Option<&str>) -> String {
        let mut url = self.target(path);
        if let Some(query) = query.filter(|q| !q.is_empty()) {
            url.push('?');
            url.push_str(query);
        }
        url
    }

    /// True when the path starts with the static prefix and its last segment
    /// carries a file extension.
    pub fn is_static_asset(&self, path: &str) -> bool {
        let path = path.trim_start_matches('/');
        if self.static_prefix.is_empty() || !path.starts_with(&self.static_prefix) {
            return false;
        }

        let last = path.rsplit('/').next().unwrap_or_default();
        match last.rsplit_once('.') {
            Some((stem, ext)) => {
                !stem.is_empty() && !ext.is_empty() && ext.chars().all(|c| c.is_ascii_alphanumeric())
            }
            None => false,
        }
    }
}

/// True when any segment is `.` or `..`, literally or percent-encoded.
///
/// Backslashes count as separators because WHATWG parsers treat them as `/`
/// in http(s) URLs.
pub fn has_dot_segment(path: &str) -> bool {
    path.split(['/', '\\']).any(|segment| {
        let decoded = segment.to_ascii_lowercase().replace("%2e", ".");
        decoded == "." || decoded == ".."
    })
}

/// Give a path exactly one trailing slash. Idempotent.
pub fn normalize_path(path: &str) -> String {
    if path.ends_with('/') {
        path.to_string()
    } else {
        format!("{}/", path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_path_is_idempotent() {
        for path in ["", "courses", "courses/12", "seasons/3/batches/"] {
            let once = normalize_path(path);
            assert_eq!(normalize_path(&once), once);
            assert!(once.ends_with('/'));
            assert!(!once.ends_with("//"));
        }
    }

    #[test]
    fn test_base_with_api_suffix_has_single_api_segment() {
        for base in [
            "https://backend.test/api",
            "https://backend.test/api/",
            "https://backend.test/api//",
            "https://backend.test",
            "https://backend.test/",
        ] {
            let urls = UrlNormalizer::new(base, "media/");
            let target = urls.target("courses/5");
            assert_eq!(target, "https://backend.test/api/courses/5/", "base: {}", base);
            assert_eq!(target.matches("/api/").count(), 1);
        }
    }

    #[test]
    fn test_path_with_api_like_segment_is_kept() {
        let urls = UrlNormalizer::new("https://backend.test/api", "media/");
        assert_eq!(
            urls.target("payments/api-keys"),
            "https://backend.test/api/payments/api-keys/"
        );
    }

    #[test]
    fn test_static_asset_skips_api_segment() {
        let urls = UrlNormalizer::new("https://backend.test/api/", "media/");
        assert_eq!(
            urls.target("media/videos/intro.mp4"),
            "https://backend.test/media/videos/intro.mp4"
        );
    }

    #[test]
    fn test_static_prefix_without_extension_is_api_path() {
        let urls = UrlNormalizer::new("https://backend.test/api", "media/");
        assert!(!urls.is_static_asset("media/videos"));
        assert!(!urls.is_static_asset("media/videos/.hidden"));
        assert_eq!(
            urls.target("media/videos"),
            "https://backend.test/api/media/videos/"
        );
    }

    #[test]
    fn test_extension_outside_prefix_is_api_path() {
        let urls = UrlNormalizer::new("https://backend.test/api", "media/");
        assert_eq!(
            urls.target("reports/summary.pdf"),
            "https://backend.test/api/reports/summary.pdf/"
        );
    }

    #[test]
    fn test_empty_path_yields_valid_url() {
        let urls = UrlNormalizer::new("https://backend.test/api", "media/");
        let target = urls.target("");
        assert_eq!(target, "https://backend.test/api/");
        assert!(url::Url::parse(&target).is_ok());
    }

    #[test]
    fn test_dot_segments_are_detected() {
        for path in [
            "..",
            "../admin/users",
            "courses/../../admin",
            "%2e%2e/admin/users",
            "%2E%2e/admin",
            ".%2e/admin",
            "%2e./admin",
            "courses/./5",
            "courses/%2E/5",
            "courses\\..\\admin",
        ] {
            assert!(has_dot_segment(path), "path: {}", path);
        }

        for path in ["", "courses/5", "media/intro.mp4", "files/...", "v1.2/notes", "%2e%2e%2e"] {
            assert!(!has_dot_segment(path), "path: {}", path);
        }
    }

    #[test]
    fn test_query_is_appended_after_trailing_slash() {
        let urls = UrlNormalizer::new("https://backend.test", "media/");
        assert_eq!(
            urls.target_with_query("courses", Some("page=2&search=math")),
            "https://backend.test/api/courses/?page=2&search=math"
        );
        assert_eq!(
            urls.target_with_query("courses", Some("")),
            "https://backend.test/api/courses/"
        );
    }
}
