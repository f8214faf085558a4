//! Hypermedia entity documents.
//!
//! # Responsibilities
//! - Model the Siren document returned by the registry endpoint and error paths
//! - Render the same document as XML for `application/xml` clients
//!
//! # Design Decisions
//! - One document shape for every media type; only the serialization differs
//! - Properties are free-form JSON values so records, statuses and errors share a type

use serde::Serialize;
use serde_json::{Map, Value};

/// A hypermedia link.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Link {
    pub rel: Vec<String>,
    pub href: String,
}

impl Link {
    pub fn new(rel: &str, href: impl Into<String>) -> Self {
        Self {
            rel: vec![rel.to_string()],
            href: href.into(),
        }
    }
}

/// A Siren entity.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Entity {
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub class: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub rel: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Map::is_empty")]
    pub properties: Map<String, Value>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub entities: Vec<Entity>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub links: Vec<Link>,
}

impl Entity {
    pub fn new(class: &str) -> Self {
        Self {
            class: vec![class.to_string()],
            ..Self::default()
        }
    }

    pub fn with_class(mut self, class: &str) -> Self {
        self.class.push(class.to_string());
        self
    }

    pub fn with_rel(mut self, rel: &str) -> Self {
        self.rel.push(rel.to_string());
        self
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn with_property(mut self, name: &str, value: impl Into<Value>) -> Self {
        self.properties.insert(name.to_string(), value.into());
        self
    }

    pub fn with_entity(mut self, entity: Entity) -> Self {
        self.entities.push(entity);
        self
    }

    pub fn with_link(mut self, rel: &str, href: impl Into<String>) -> Self {
        self.links.push(Link::new(rel, href));
        self
    }

    /// Build the error entity for a status code and message.
    pub fn error(status: u16, message: &str, detail: Option<&str>) -> Self {
        let entity = Self::new("error")
            .with_title(message)
            .with_property("status", status)
            .with_property("message", message);
        match detail {
            Some(detail) => entity.with_property("detail", detail),
            None => entity,
        }
    }

    /// Serialize as a Siren JSON document.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Serialize as XML.
    pub fn to_xml(&self) -> String {
        let mut out = String::from(r#"<?xml version="1.0"?>"#);
        write_entity(&mut out, self);
        out
    }
}

fn write_entity(out: &mut String, entity: &Entity) {
    out.push_str("<entity");
    if !entity.class.is_empty() {
        push_attr(out, "class", &entity.class.join(" "));
    }
    if !entity.rel.is_empty() {
        push_attr(out, "rel", &entity.rel.join(" "));
    }
    if let Some(title) = &entity.title {
        push_attr(out, "title", title);
    }
    out.push('>');

    if !entity.properties.is_empty() {
        out.push_str("<properties>");
        for (name, value) in &entity.properties {
            write_value(out, name, value);
        }
        out.push_str("</properties>");
    }
    if !entity.entities.is_empty() {
        out.push_str("<entities>");
        for child in &entity.entities {
            write_entity(out, child);
        }
        out.push_str("</entities>");
    }
    if !entity.links.is_empty() {
        out.push_str("<links>");
        for link in &entity.links {
            out.push_str("<link");
            push_attr(out, "rel", &link.rel.join(" "));
            push_attr(out, "href", &link.href);
            out.push_str("/>");
        }
        out.push_str("</links>");
    }
    out.push_str("</entity>");
}

fn write_value(out: &mut String, name: &str, value: &Value) {
    match value {
        Value::Null => {
            out.push('<');
            out.push_str(name);
            out.push_str("/>");
        }
        Value::Array(items) => {
            open(out, name);
            for item in items {
                write_value(out, "item", item);
            }
            close(out, name);
        }
        Value::Object(fields) => {
            open(out, name);
            for (field, inner) in fields {
                write_value(out, field, inner);
            }
            close(out, name);
        }
        Value::String(text) => {
            open(out, name);
            escape_into(out, text);
            close(out, name);
        }
        Value::Bool(_) | Value::Number(_) => {
            open(out, name);
            out.push_str(&value.to_string());
            close(out, name);
        }
    }
}

fn open(out: &mut String, name: &str) {
    out.push('<');
    out.push_str(name);
    out.push('>');
}

fn close(out: &mut String, name: &str) {
    out.push_str("</");
    out.push_str(name);
    out.push('>');
}

fn push_attr(out: &mut String, name: &str, value: &str) {
    out.push(' ');
    out.push_str(name);
    out.push_str("=\"");
    escape_into(out, value);
    out.push('"');
}

fn escape_into(out: &mut String, text: &str) {
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            c => out.push(c),
        }
    }
}
