//! Registry endpoint request handling.
//!
//! | Method            | Query params          | Effect                         |
//! |-------------------|-----------------------|--------------------------------|
//! | GET               | (none)                | list all records               |
//! | GET               | `path`                | show one record                |
//! | GET/POST          | `path`, `reverseUri`  | register or refresh            |
//! | PUT/PATCH         | `path`, `reverseUri`  | deregister, then register anew |
//! | DELETE            | `path`, `reverseUri`  | deregister                     |

use axum::http::{HeaderMap, Method};
use url::form_urlencoded;

use crate::config::ProxyConfig;
use crate::error::ProxyError;
use crate::http::entity::Entity;
use crate::http::request::{origin, QueryParams};
use crate::registry::{ProxyRecord, ProxyRegistry, Registration, RegistrationMode};
use crate::routing::segments;

pub const PATH_PARAM: &str = "path";
pub const REVERSE_URI_PARAM: &str = "reverseUri";

/// Builds hrefs pointing back at the registry endpoint.
#[derive(Debug, Clone)]
pub struct Links {
    collection: String,
}

impl Links {
    /// Links are absolute when the request carries a Host header.
    pub fn new(headers: &HeaderMap, config: &ProxyConfig) -> Self {
        let origin = origin(headers)
            .map(|o| o.as_str().trim_end_matches('/').to_string())
            .unwrap_or_default();
        Self {
            collection: format!(
                "{}{}{}",
                origin,
                config.listener.path_base.trim_end_matches('/'),
                config.registry.admin_path
            ),
        }
    }

    pub fn collection(&self) -> &str {
        &self.collection
    }

    pub fn record(&self, path: &str) -> String {
        let encoded: String = form_urlencoded::byte_serialize(path.as_bytes()).collect();
        format!("{}?{}={}", self.collection, PATH_PARAM, encoded)
    }
}

/// Dispatch one registry endpoint request.
pub fn handle(
    registry: &ProxyRegistry,
    method: &Method,
    params: &QueryParams,
    links: &Links,
) -> Result<Entity, ProxyError> {
    if *method == Method::GET && params.get(REVERSE_URI_PARAM).is_none() {
        return match params.get(PATH_PARAM) {
            None => Ok(collection_entity(registry, links)),
            Some(path) => show(registry, path, links),
        };
    }

    let mode = registration_mode(method)?;
    let path = params
        .get(PATH_PARAM)
        .ok_or(ProxyError::MissingParameter(PATH_PARAM))?;
    let reverse_uri = params
        .get(REVERSE_URI_PARAM)
        .ok_or(ProxyError::MissingParameter(REVERSE_URI_PARAM))?;

    let record = ProxyRecord::parse(path, reverse_uri)?;
    let registration = registry.register(record, mode)?;
    Ok(status_entity(&registration, links))
}

/// Map a request method onto a registration mode.
pub fn registration_mode(method: &Method) -> Result<RegistrationMode, ProxyError> {
    match *method {
        Method::GET | Method::POST => Ok(RegistrationMode::Refresh),
        Method::PUT | Method::PATCH => Ok(RegistrationMode::Replace),
        Method::DELETE => Ok(RegistrationMode::Remove),
        _ => Err(ProxyError::MethodNotAllowed(method.clone())),
    }
}

fn show(registry: &ProxyRegistry, path: &str, links: &Links) -> Result<Entity, ProxyError> {
    let normalized = segments::normalize(path)
        .ok_or_else(|| crate::registry::RegistryError::InvalidPath(path.to_string()))?;
    registry
        .find_exact(&normalized)
        .map(|record| record_entity(&record, links))
        .ok_or(ProxyError::NotFound(normalized))
}

/// Entity describing one record.
pub fn record_entity(record: &ProxyRecord, links: &Links) -> Entity {
    Entity::new("proxy")
        .with_property("id", record.id().to_string())
        .with_property("path", record.path())
        .with_property("reverseUri", record.reverse_target().as_str())
        .with_property("lastSeen", record.last_seen().to_rfc3339())
        .with_property("enabled", record.is_enabled())
        .with_property("available", record.is_available())
        .with_link("self", links.record(record.path()))
        .with_link("collection", links.collection())
}

/// Entity listing every record.
pub fn collection_entity(registry: &ProxyRegistry, links: &Links) -> Entity {
    let records = registry.records();
    let entity = Entity::new("proxies")
        .with_class("collection")
        .with_property("count", records.len())
        .with_link("self", links.collection())
        .with_link("collection", links.collection());
    records.iter().fold(entity, |entity, record| {
        entity.with_entity(record_entity(record, links).with_rel("item"))
    })
}

/// Entity reporting the result of a registration.
pub fn status_entity(registration: &Registration, links: &Links) -> Entity {
    let record = &registration.record;
    Entity::new("status")
        .with_property("path", record.path())
        .with_property("reverseUri", record.reverse_target().as_str())
        .with_property("outcome", registration.outcome.kind())
        .with_property(
            "refreshed",
            registration.outcome == crate::registry::Outcome::Refreshed,
        )
        .with_link("collection", links.collection())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::{header, HeaderValue, StatusCode};

    fn links() -> Links {
        let mut headers = HeaderMap::new();
        headers.insert(header::HOST, HeaderValue::from_static("node-b:5000"));
        Links::new(&headers, &ProxyConfig::default())
    }

    fn call(registry: &ProxyRegistry, method: Method, query: &str) -> Result<Entity, ProxyError> {
        handle(registry, &method, &QueryParams::parse(Some(query)), &links())
    }

    #[test]
    fn links_are_absolute_and_encoded() {
        let links = links();
        assert_eq!(links.collection(), "http://node-b:5000/Api/1/Proxies");
        assert_eq!(
            links.record("/Shop/Cart"),
            "http://node-b:5000/Api/1/Proxies?path=%2FShop%2FCart"
        );
        let relative = Links::new(&HeaderMap::new(), &ProxyConfig::default());
        assert_eq!(relative.collection(), "/Api/1/Proxies");
    }

    #[test]
    fn register_then_show_and_list() {
        let registry = ProxyRegistry::new();
        let status = call(
            &registry,
            Method::GET,
            "path=/Shop&reverseUri=http://upstream.local/",
        )
        .unwrap();
        assert_eq!(status.properties["outcome"], "add");
        assert_eq!(status.properties["refreshed"], false);

        let shown = call(&registry, Method::GET, "path=/shop").unwrap();
        assert_eq!(shown.properties["path"], "/Shop");
        assert_eq!(shown.properties["available"], true);
        assert_eq!(shown.links[0].rel, vec!["self".to_string()]);
        assert_eq!(shown.links[1].href, "http://node-b:5000/Api/1/Proxies");

        let listed = call(&registry, Method::GET, "").unwrap();
        assert_eq!(listed.properties["count"], 1);
        assert_eq!(listed.entities[0].rel, vec!["item".to_string()]);
        assert_eq!(listed.links.len(), 2);
    }

    #[test]
    fn repeated_registration_refreshes() {
        let registry = ProxyRegistry::new();
        let query = "path=/Shop&reverseUri=http://upstream.local/";
        call(&registry, Method::POST, query).unwrap();
        let again = call(&registry, Method::GET, query).unwrap();
        assert_eq!(again.properties["refreshed"], true);
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn client_errors() {
        let registry = ProxyRegistry::new();
        let status = |query: &str, method: Method| {
            call(&registry, method, query).unwrap_err().status_code()
        };

        assert_eq!(status("path=/Shop", Method::POST), StatusCode::BAD_REQUEST);
        assert_eq!(
            status("reverseUri=http://upstream.local/", Method::GET),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            status("path=/Shop&reverseUri=nope://x", Method::PUT),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(status("path=/Missing", Method::GET), StatusCode::NOT_FOUND);
        assert_eq!(status("path=/a?b", Method::GET), StatusCode::BAD_REQUEST);
        assert_eq!(
            status("path=/Shop&reverseUri=http://upstream.local/", Method::HEAD),
            StatusCode::METHOD_NOT_ALLOWED
        );
        assert!(registry.is_empty());
    }

    #[test]
    fn conflict_leaves_record_untouched() {
        let registry = ProxyRegistry::new();
        call(&registry, Method::GET, "path=/Shop&reverseUri=http://upstream.local/").unwrap();

        let err = call(&registry, Method::GET, "path=/Shop&reverseUri=http://other.local/")
            .unwrap_err();
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(
            registry.find_exact("/Shop").unwrap().reverse_target().as_str(),
            "http://upstream.local/"
        );
    }

    #[test]
    fn delete_reports_remove() {
        let registry = ProxyRegistry::new();
        let query = "path=/Shop&reverseUri=http://upstream.local/";
        call(&registry, Method::GET, query).unwrap();

        let removed = call(&registry, Method::DELETE, query).unwrap();
        assert_eq!(removed.properties["outcome"], "remove");
        assert!(registry.find_exact("/Shop").is_none());
    }

    #[test]
    fn put_recreates_record() {
        let registry = ProxyRegistry::new();
        let query = "path=/Shop&reverseUri=http://upstream.local/";
        call(&registry, Method::GET, query).unwrap();
        let before = registry.find_exact("/Shop").unwrap().id();

        let replaced = call(&registry, Method::PUT, query).unwrap();
        assert_eq!(replaced.properties["outcome"], "add");
        assert_ne!(registry.find_exact("/Shop").unwrap().id(), before);
    }
}
