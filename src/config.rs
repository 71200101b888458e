//! Loading the response table from a configuration document.
//!
//! The document is a YAML (or JSON) mapping of route path to a mapping of
//! verb to response attributes:
//!
//! ```yaml
//! /widgets:
//!   get:
//!     statusCode: 200
//!     body: "[]"
//!   post:
//!     statusCode: 201
//!     headers:
//!       Location: /widgets/1
//! ```

use crate::error::ConfigError;
use crate::table::{normalize_path, ResponseDefinition, RouteTable, Verb, DEFAULT_CONTENT_TYPE};
use bytes::Bytes;
use http::header::{HeaderMap, HeaderName, HeaderValue};
use http::StatusCode;
use serde::de::{self, Deserializer, MapAccess, SeqAccess, Visitor};
use serde::Deserialize;
use serde_yaml::{Mapping, Number, Value};
use std::collections::HashMap;
use std::fmt;
use std::path::Path;
use tracing::{debug, info, warn};

/// Response attributes for one (path, verb) entry, as written in the document.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "camelCase")]
pub struct ResponseAttributes {
    /// HTTP status code (required)
    #[serde(default)]
    pub status_code: Option<i64>,

    /// Content type of the response
    #[serde(default = "default_content_type")]
    pub content_type: String,

    /// Response body
    #[serde(default)]
    pub body: Option<ResponseBody>,

    /// Extra response headers
    #[serde(default)]
    pub headers: HashMap<String, HeaderText>,
}

/// Header value as written in the document. Numbers and booleans are sent
/// in their YAML spelling.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum HeaderText {
    Text(String),
    Number(Number),
    Flag(bool),
}

impl fmt::Display for HeaderText {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HeaderText::Text(text) => f.write_str(text),
            HeaderText::Number(number) => write!(f, "{}", number),
            HeaderText::Flag(flag) => write!(f, "{}", flag),
        }
    }
}

fn default_content_type() -> String {
    DEFAULT_CONTENT_TYPE.to_string()
}

/// Response body as written in the document.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum ResponseBody {
    /// Sent verbatim
    Text(String),
    /// Any other YAML value, sent as compact JSON
    Structured(serde_json::Value),
}

impl ResponseBody {
    /// Get the body content as bytes.
    pub fn to_bytes(&self) -> Result<Bytes, serde_json::Error> {
        match self {
            ResponseBody::Text(content) => Ok(Bytes::from(content.clone())),
            ResponseBody::Structured(content) => Ok(Bytes::from(serde_json::to_vec(content)?)),
        }
    }
}

impl ResponseAttributes {
    /// Resolve into a [`ResponseDefinition`], validating status, headers and
    /// content type.
    pub fn into_definition(
        self,
        path: &str,
        verb_name: &str,
        verb: Verb,
    ) -> Result<ResponseDefinition, ConfigError> {
        let status = self.status_code.ok_or_else(|| ConfigError::MissingStatusCode {
            path: path.to_string(),
            verb: verb_name.to_string(),
        })?;

        let status = u16::try_from(status)
            .ok()
            .and_then(|code| StatusCode::from_u16(code).ok())
            .ok_or_else(|| ConfigError::InvalidStatusCode {
                path: path.to_string(),
                verb: verb_name.to_string(),
                status,
            })?;

        let content_type = HeaderValue::from_str(&self.content_type).map_err(|_| {
            ConfigError::InvalidContentType {
                path: path.to_string(),
                verb: verb_name.to_string(),
                content_type: self.content_type.clone(),
            }
        })?;

        let mut headers = HeaderMap::with_capacity(self.headers.len());
        for (name, value) in &self.headers {
            let invalid = || ConfigError::InvalidHeader {
                path: path.to_string(),
                verb: verb_name.to_string(),
                name: name.clone(),
            };
            let header_name = HeaderName::from_bytes(name.as_bytes()).map_err(|_| invalid())?;
            let header_value = HeaderValue::from_str(&value.to_string()).map_err(|_| invalid())?;
            headers.insert(header_name, header_value);
        }

        let mut definition = ResponseDefinition::new(verb, status)
            .with_content_type(content_type)
            .with_headers(headers);

        if let Some(body) = &self.body {
            let bytes = body.to_bytes().map_err(|e| ConfigError::InvalidAttributes {
                path: path.to_string(),
                verb: verb_name.to_string(),
                message: format!("invalid body: {}", e),
            })?;
            definition = definition.with_body(bytes);
        }

        Ok(definition)
    }
}

impl RouteTable {
    /// Load the table from a configuration file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let table = Self::from_yaml(&content)?;
        info!(path = %path.display(), routes = table.len(), "Loaded response table");
        Ok(table)
    }

    /// Build the table from a YAML or JSON document.
    ///
    /// Either every route loads or an error is returned. A repeated path or
    /// verb replaces the earlier one; verbs outside the six recognized ones
    /// are skipped.
    pub fn from_yaml(yaml: &str) -> Result<Self, ConfigError> {
        let document: Node = serde_yaml::from_str(yaml)?;
        let mut table = RouteTable::new();

        let paths = match document {
            Node::Scalar(Value::Null) => return Ok(table),
            Node::Mapping(paths) => paths,
            Node::Scalar(other) => {
                return Err(ConfigError::InvalidShape(format!(
                    "top level must be a mapping of paths, found {}",
                    value_kind(&other)
                )))
            }
        };

        for (raw_path, verbs) in paths {
            let raw_path = mapping_key(&raw_path, "path")?;
            let path = normalize_path(&raw_path).to_string();
            let verbs = as_mapping(verbs, &path)?;

            if table.remove_path(&path) {
                warn!(path = %path, "Duplicate path, later definition wins");
            }

            for (raw_verb, attributes) in verbs {
                let verb_name = mapping_key(&raw_verb, "verb")?;
                let Some(verb) = Verb::parse(&verb_name) else {
                    warn!(path = %path, verb = %verb_name, "Unsupported verb, route skipped");
                    continue;
                };

                let attributes = parse_attributes(attributes.into_value(), &path, &verb_name)?;
                let definition = attributes.into_definition(&path, &verb_name, verb)?;

                debug!(
                    path = %path,
                    verb = %verb,
                    status = definition.status().as_u16(),
                    "Registered route"
                );

                if table.insert(&path, definition).is_some() {
                    warn!(path = %path, verb = %verb, "Duplicate route, later definition wins");
                }
            }
        }

        Ok(table)
    }
}

/// A parsed YAML node whose mappings keep every entry in document order,
/// repeated keys included.
#[derive(Debug)]
enum Node {
    Mapping(Vec<(Value, Node)>),
    Scalar(Value),
}

impl Node {
    /// Collapse into a plain value. A repeated key keeps its last value.
    fn into_value(self) -> Value {
        match self {
            Node::Mapping(entries) => {
                let mut mapping = Mapping::with_capacity(entries.len());
                for (key, node) in entries {
                    mapping.insert(key, node.into_value());
                }
                Value::Mapping(mapping)
            }
            Node::Scalar(value) => value,
        }
    }
}

impl<'de> Deserialize<'de> for Node {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        deserializer.deserialize_any(NodeVisitor)
    }
}

struct NodeVisitor;

impl<'de> Visitor<'de> for NodeVisitor {
    type Value = Node;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("any YAML value")
    }

    fn visit_bool<E: de::Error>(self, v: bool) -> Result<Node, E> {
        Ok(Node::Scalar(Value::Bool(v)))
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<Node, E> {
        Ok(Node::Scalar(Value::Number(v.into())))
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<Node, E> {
        Ok(Node::Scalar(Value::Number(v.into())))
    }

    fn visit_f64<E: de::Error>(self, v: f64) -> Result<Node, E> {
        Ok(Node::Scalar(Value::Number(v.into())))
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<Node, E> {
        Ok(Node::Scalar(Value::String(v.to_string())))
    }

    fn visit_string<E: de::Error>(self, v: String) -> Result<Node, E> {
        Ok(Node::Scalar(Value::String(v)))
    }

    fn visit_unit<E: de::Error>(self) -> Result<Node, E> {
        Ok(Node::Scalar(Value::Null))
    }

    fn visit_none<E: de::Error>(self) -> Result<Node, E> {
        Ok(Node::Scalar(Value::Null))
    }

    fn visit_some<D>(self, deserializer: D) -> Result<Node, D::Error>
    where
        D: Deserializer<'de>,
    {
        Node::deserialize(deserializer)
    }

    fn visit_seq<A>(self, mut seq: A) -> Result<Node, A::Error>
    where
        A: SeqAccess<'de>,
    {
        let mut items = Vec::with_capacity(seq.size_hint().unwrap_or(0));
        while let Some(node) = seq.next_element::<Node>()? {
            items.push(node.into_value());
        }
        Ok(Node::Scalar(Value::Sequence(items)))
    }

    fn visit_map<A>(self, mut map: A) -> Result<Node, A::Error>
    where
        A: MapAccess<'de>,
    {
        let mut entries = Vec::with_capacity(map.size_hint().unwrap_or(0));
        while let Some((key, node)) = map.next_entry::<Node, Node>()? {
            entries.push((key.into_value(), node));
        }
        Ok(Node::Mapping(entries))
    }
}

fn parse_attributes(
    attributes: Value,
    path: &str,
    verb_name: &str,
) -> Result<ResponseAttributes, ConfigError> {
    // `get: {}` or a bare `get:` still goes through the statusCode check
    let attributes = match attributes {
        Value::Null => Value::Mapping(Mapping::new()),
        other => other,
    };
    serde_yaml::from_value(attributes).map_err(|e| ConfigError::InvalidAttributes {
        path: path.to_string(),
        verb: verb_name.to_string(),
        message: e.to_string(),
    })
}

fn as_mapping(node: Node, path: &str) -> Result<Vec<(Value, Node)>, ConfigError> {
    match node {
        Node::Mapping(entries) => Ok(entries),
        Node::Scalar(other) => Err(ConfigError::InvalidShape(format!(
            "path /{} must map verbs to responses, found {}",
            path,
            value_kind(&other)
        ))),
    }
}

fn mapping_key(key: &Value, what: &str) -> Result<String, ConfigError> {
    match key {
        Value::String(s) => Ok(s.clone()),
        other => Err(ConfigError::InvalidShape(format!(
            "{} keys must be strings, found {}",
            what,
            value_kind(other)
        ))),
    }
}

fn value_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Sequence(_) => "a sequence",
        Value::Mapping(_) => "a mapping",
        Value::Tagged(_) => "a tagged value",
    }
}
