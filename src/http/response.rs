//! Negotiated entity responses.
//!
//! # Responsibilities
//! - Serialize an entity in the negotiated format and charset
//! - Map request errors to status codes and error entities
//!
//! # Design Decisions
//! - Errors become responses only here, at the handler boundary
//! - A serialization failure degrades to a plain-text 500, never a panic

use axum::{
    body::Body,
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
};

use crate::error::ProxyError;
use crate::http::entity::Entity;
use crate::http::negotiation::{MediaFormat, Negotiated};

/// An entity plus the status and negotiation it is rendered with.
#[derive(Debug, Clone)]
pub struct EntityResponse {
    pub status: StatusCode,
    pub entity: Entity,
    pub negotiated: Negotiated,
}

impl EntityResponse {
    pub fn ok(entity: Entity, negotiated: Negotiated) -> Self {
        Self {
            status: StatusCode::OK,
            entity,
            negotiated,
        }
    }

    /// Error entity for a request-level error.
    pub fn error(error: &ProxyError, negotiated: Negotiated) -> Self {
        let status = error.status_code();
        let detail = error.detail();
        Self {
            status,
            entity: Entity::error(status.as_u16(), &error.to_string(), detail.as_deref()),
            negotiated,
        }
    }

    fn render(&self) -> Result<String, serde_json::Error> {
        match self.negotiated.format {
            MediaFormat::Siren | MediaFormat::Json => self.entity.to_json(),
            MediaFormat::Xml => Ok(self.entity.to_xml()),
        }
    }
}

impl IntoResponse for EntityResponse {
    fn into_response(self) -> Response {
        let text = match self.render() {
            Ok(text) => text,
            Err(e) => {
                tracing::error!(error = %e, "Failed to serialize entity");
                return (StatusCode::INTERNAL_SERVER_ERROR, "entity serialization failed")
                    .into_response();
            }
        };

        let body = self.negotiated.charset.encode(&text);
        let mut response = Response::new(Body::from(body));
        *response.status_mut() = self.status;
        if let Ok(content_type) = HeaderValue::from_str(&self.negotiated.content_type()) {
            response
                .headers_mut()
                .insert(header::CONTENT_TYPE, content_type);
        }
        response
    }
}

/// Response for a panic caught by the outermost layer.
///
/// The request is gone at that point, so the default negotiation applies.
pub fn panic_response(panic: Box<dyn std::any::Any + Send + 'static>) -> Response {
    let message = panic
        .downcast_ref::<String>()
        .map(String::as_str)
        .or_else(|| panic.downcast_ref::<&str>().copied())
        .unwrap_or("unknown panic");
    tracing::error!(panic = %message, "Handler panicked");

    let error = ProxyError::Internal(message.to_string());
    EntityResponse::error(&error, Negotiated::default()).into_response()
}
