//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (intervals and timeouts > 0)
//! - Validate addresses, URIs and header names
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: ProxyConfig → Result<(), Vec<ValidationError>>
//! - Static proxy entries are not checked here: a bad entry is skipped at
//!   registry bootstrap instead of failing the whole config

use std::net::SocketAddr;

use axum::http::HeaderName;
use thiserror::Error;
use url::Url;

use crate::config::schema::ProxyConfig;

/// A single semantic problem in a configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("listener.bind_address '{0}' is not a socket address")]
    InvalidBindAddress(String),
    #[error("listener.max_connections must be greater than zero")]
    ZeroConnections,
    #[error("listener.path_base '{0}' must be empty or start with '/'")]
    InvalidPathBase(String),
    #[error("registry.admin_path '{0}' must start with '/' and name at least one segment")]
    InvalidAdminPath(String),
    #[error("presence.base_uri '{0}' is not an absolute http(s) URI")]
    InvalidBaseUri(String),
    #[error("{0} must be greater than zero")]
    ZeroDuration(&'static str),
    #[error("forwarding.excluded_headers entry '{0}' is not a valid header name")]
    InvalidHeaderName(String),
    #[error("observability.log_format '{0}' must be 'pretty' or 'json'")]
    InvalidLogFormat(String),
}

/// Check a configuration for semantic errors.
pub fn validate_config(config: &ProxyConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::InvalidBindAddress(
            config.listener.bind_address.clone(),
        ));
    }
    if config.listener.max_connections == 0 {
        errors.push(ValidationError::ZeroConnections);
    }
    let path_base = &config.listener.path_base;
    if !path_base.is_empty() && !path_base.starts_with('/') {
        errors.push(ValidationError::InvalidPathBase(path_base.clone()));
    }

    let admin_path = &config.registry.admin_path;
    if !admin_path.starts_with('/') || crate::routing::segments::count(admin_path) == 0 {
        errors.push(ValidationError::InvalidAdminPath(admin_path.clone()));
    }

    if let Some(base_uri) = &config.presence.base_uri {
        let valid = Url::parse(base_uri)
            .map(|url| matches!(url.scheme(), "http" | "https") && url.has_host())
            .unwrap_or(false);
        if !valid {
            errors.push(ValidationError::InvalidBaseUri(base_uri.clone()));
        }
    }

    for (value, name) in [
        (config.presence.interval_secs, "presence.interval_secs"),
        (config.timeouts.connect_secs, "timeouts.connect_secs"),
        (config.timeouts.upstream_secs, "timeouts.upstream_secs"),
        (config.timeouts.heartbeat_secs, "timeouts.heartbeat_secs"),
    ] {
        if value == 0 {
            errors.push(ValidationError::ZeroDuration(name));
        }
    }

    for header in &config.forwarding.excluded_headers {
        if HeaderName::from_bytes(header.as_bytes()).is_err() {
            errors.push(ValidationError::InvalidHeaderName(header.clone()));
        }
    }

    let format = config.observability.log_format.as_str();
    if format != "pretty" && format != "json" {
        errors.push(ValidationError::InvalidLogFormat(format.to_string()));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        assert_eq!(validate_config(&ProxyConfig::default()), Ok(()));
    }

    #[test]
    fn collects_every_error() {
        let mut config = ProxyConfig::default();
        config.listener.bind_address = "nowhere".into();
        config.registry.admin_path = "Api/1/Proxies".into();
        config.presence.base_uri = Some("not a uri".into());
        config.presence.interval_secs = 0;
        config.forwarding.excluded_headers.push("bad header".into());

        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors.len(), 5);
        assert!(errors.contains(&ValidationError::ZeroDuration("presence.interval_secs")));
        assert!(errors.contains(&ValidationError::InvalidHeaderName("bad header".into())));
    }

    #[test]
    fn bad_static_proxies_do_not_fail_validation() {
        let mut config = ProxyConfig::default();
        config.proxies.push(crate::config::StaticProxyConfig {
            path: "".into(),
            reverse_uri: "::::".into(),
        });
        assert!(validate_config(&config).is_ok());
    }
}
