//! A single path-prefix to upstream mapping.
//!
//! # Responsibilities
//! - Parse raw `(path, reverse_uri)` pairs into validated records
//! - Track freshness (`last_seen`) and the enabled flag
//! - Derive availability on every read
//!
//! # Design Decisions
//! - The path is normalized once and never changes for the record's lifetime
//! - Availability is never stored: `enabled && now - last_seen <= 60s`
//! - Relative reverse targets are kept as text and resolved per request

use std::fmt;
use std::time::Duration;

use chrono::{DateTime, Utc};
use url::Url;
use uuid::Uuid;

use crate::config::StaticProxyConfig;
use crate::registry::{RegistryError, ResolveError};
use crate::routing::segments;

/// How long after its last heartbeat a record still counts as available.
pub const AVAILABILITY_WINDOW: Duration = Duration::from_secs(60);

/// Base used to validate relative reverse targets.
const RELATIVE_CHECK_BASE: &str = "http://localhost/";

/// Upstream base URI of a proxy record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReverseTarget {
    /// Absolute http(s) URI.
    Absolute(Url),
    /// Relative reference resolved against the inbound request's origin.
    Relative(String),
}

impl ReverseTarget {
    /// Parse a reverse target, accepting absolute http(s) URIs and relative references.
    pub fn parse(raw: &str) -> Result<Self, RegistryError> {
        let raw = raw.trim();
        let invalid = |reason: &str| RegistryError::InvalidReverseUri {
            uri: raw.to_string(),
            reason: reason.to_string(),
        };
        if raw.is_empty() {
            return Err(invalid("empty URI"));
        }

        match Url::parse(raw) {
            Ok(url) => {
                if !matches!(url.scheme(), "http" | "https") {
                    return Err(invalid("scheme must be http or https"));
                }
                if !url.has_host() {
                    return Err(invalid("missing host"));
                }
                Ok(Self::Absolute(url))
            }
            Err(url::ParseError::RelativeUrlWithoutBase) => {
                let base = Url::parse(RELATIVE_CHECK_BASE)
                    .map_err(|e| invalid(&e.to_string()))?;
                base.join(raw).map_err(|e| invalid(&e.to_string()))?;
                Ok(Self::Relative(raw.to_string()))
            }
            Err(e) => Err(invalid(&e.to_string())),
        }
    }

    /// Textual form used for display and conflict detection.
    pub fn as_str(&self) -> &str {
        match self {
            Self::Absolute(url) => url.as_str(),
            Self::Relative(raw) => raw,
        }
    }

    /// Resolve the upstream URL for a forwarded request.
    ///
    /// `origin` is the inbound request's own base (used for relative targets),
    /// `remainder` is the request path with the proxy prefix stripped. The
    /// result always stays under the target's base path.
    pub fn resolve(
        &self,
        origin: Option<&Url>,
        remainder: &str,
        query: Option<&str>,
    ) -> Result<Url, ResolveError> {
        let mut base = match self {
            Self::Absolute(url) => url.clone(),
            Self::Relative(raw) => origin
                .ok_or(url::ParseError::RelativeUrlWithoutBase)?
                .join(raw)?,
        };
        base.set_query(None);
        base.set_fragment(None);
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }

        // "./" keeps a remainder such as "a:b" from parsing as a scheme
        let mut target = base.join(&format!("./{}", remainder.trim_start_matches('/')))?;
        if !target.path().starts_with(base.path()) {
            return Err(ResolveError::OutsideBase {
                target: target.path().to_string(),
                base: base.path().to_string(),
            });
        }
        target.set_query(query.filter(|q| !q.is_empty()));
        Ok(target)
    }
}

impl fmt::Display for ReverseTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One registered upstream mapping.
#[derive(Debug, Clone)]
pub struct ProxyRecord {
    id: Uuid,
    path: String,
    reverse_target: ReverseTarget,
    last_seen: DateTime<Utc>,
    enabled: bool,
}

impl ProxyRecord {
    /// Parse and validate a record from raw values. `last_seen` starts at now.
    pub fn parse(path: &str, reverse_uri: &str) -> Result<Self, RegistryError> {
        let normalized = segments::normalize(path)
            .ok_or_else(|| RegistryError::InvalidPath(path.to_string()))?;
        Ok(Self::new(normalized, ReverseTarget::parse(reverse_uri)?))
    }

    /// Build a record from an already normalized path.
    pub fn new(path: String, reverse_target: ReverseTarget) -> Self {
        Self {
            id: Uuid::new_v4(),
            path,
            reverse_target,
            last_seen: Utc::now(),
            enabled: true,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn reverse_target(&self) -> &ReverseTarget {
        &self.reverse_target
    }

    pub fn last_seen(&self) -> DateTime<Utc> {
        self.last_seen
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Availability as of now.
    pub fn is_available(&self) -> bool {
        self.is_available_at(Utc::now())
    }

    /// Availability as of `now`.
    pub fn is_available_at(&self, now: DateTime<Utc>) -> bool {
        if !self.enabled {
            return false;
        }
        match (now - self.last_seen).to_std() {
            Ok(age) => age <= AVAILABILITY_WINDOW,
            // last_seen is in the future (clock skew between readers)
            Err(_) => true,
        }
    }

    /// Mark as seen now and re-enable.
    pub fn refresh(&mut self) {
        self.refresh_at(Utc::now());
    }

    pub fn refresh_at(&mut self, seen: DateTime<Utc>) {
        self.last_seen = seen;
        self.enabled = true;
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    /// Returns true if `other` points at the same upstream.
    pub fn same_target(&self, other: &ReverseTarget) -> bool {
        self.reverse_target.as_str() == other.as_str()
    }
}

impl TryFrom<&StaticProxyConfig> for ProxyRecord {
    type Error = RegistryError;

    fn try_from(entry: &StaticProxyConfig) -> Result<Self, Self::Error> {
        Self::parse(&entry.path, &entry.reverse_uri)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeDelta;

    #[test]
    fn parse_normalizes_path() {
        let record = ProxyRecord::parse("Shop/", "http://upstream.local").unwrap();
        assert_eq!(record.path(), "/Shop");
        assert_eq!(record.reverse_target().as_str(), "http://upstream.local/");
        assert!(record.is_enabled());
        assert!(record.is_available());
    }

    #[test]
    fn parse_rejects_bad_input() {
        assert!(matches!(
            ProxyRecord::parse("", "http://upstream.local/"),
            Err(RegistryError::InvalidPath(_))
        ));
        assert!(matches!(
            ProxyRecord::parse("/Shop", "ftp://upstream.local/"),
            Err(RegistryError::InvalidReverseUri { .. })
        ));
        assert!(matches!(
            ProxyRecord::parse("/Shop", "http://[::1"),
            Err(RegistryError::InvalidReverseUri { .. })
        ));
        assert!(matches!(
            ProxyRecord::parse("/Shop", "  "),
            Err(RegistryError::InvalidReverseUri { .. })
        ));
    }

    #[test]
    fn relative_targets_are_accepted() {
        let target = ReverseTarget::parse("/internal/shop/").unwrap();
        assert_eq!(target, ReverseTarget::Relative("/internal/shop/".into()));
    }

    #[test]
    fn availability_expires_after_window() {
        let mut record = ProxyRecord::parse("/Shop", "http://upstream.local/").unwrap();
        let now = Utc::now();

        record.refresh_at(now - TimeDelta::seconds(59));
        assert!(record.is_available_at(now));

        record.refresh_at(now - TimeDelta::seconds(61));
        assert!(!record.is_available_at(now));
        assert!(record.is_enabled());
    }

    #[test]
    fn disabled_record_is_never_available() {
        let mut record = ProxyRecord::parse("/Shop", "http://upstream.local/").unwrap();
        record.set_enabled(false);
        assert!(!record.is_available_at(record.last_seen()));

        record.refresh();
        assert!(record.is_available());
    }

    #[test]
    fn resolve_joins_remainder_and_query() {
        let target = ReverseTarget::parse("http://upstream.local/").unwrap();
        let url = target.resolve(None, "Cart", Some("page=2")).unwrap();
        assert_eq!(url.as_str(), "http://upstream.local/Cart?page=2");

        let nested = ReverseTarget::parse("http://upstream.local/app").unwrap();
        let url = nested.resolve(None, "Cart/Items/", None).unwrap();
        assert_eq!(url.as_str(), "http://upstream.local/app/Cart/Items/");

        let url = nested.resolve(None, "", Some("")).unwrap();
        assert_eq!(url.as_str(), "http://upstream.local/app/");
    }

    #[test]
    fn resolve_relative_needs_origin() {
        let target = ReverseTarget::parse("internal/").unwrap();
        assert!(target.resolve(None, "x", None).is_err());

        let origin = Url::parse("http://self.local:8080/").unwrap();
        let url = target.resolve(Some(&origin), "x", None).unwrap();
        assert_eq!(url.as_str(), "http://self.local:8080/internal/x");
    }

    #[test]
    fn resolve_never_leaves_base_path() {
        let target = ReverseTarget::parse("http://upstream.local/app/").unwrap();
        for remainder in ["../secret", "../../secret", "%2e%2e/secret", "a/../../secret"] {
            assert!(
                matches!(
                    target.resolve(None, remainder, None),
                    Err(ResolveError::OutsideBase { .. })
                ),
                "{remainder} escaped"
            );
        }

        let url = target.resolve(None, "a/../b", None).unwrap();
        assert_eq!(url.as_str(), "http://upstream.local/app/b");
    }
}
