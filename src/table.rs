//! Routing table of canned responses.
//!
//! Routes are keyed by normalized path (leading slash stripped) and HTTP
//! verb. The table is built once at startup and never mutated afterwards,
//! so it can be shared across connection tasks behind an `Arc`.

use bytes::Bytes;
use http::header::{HeaderMap, HeaderValue};
use http::{Method, StatusCode};
use std::collections::HashMap;
use std::fmt;

/// Key used for the root path, which would otherwise normalize to `""`.
///
/// Contains a space, which a request target can never carry, so no request
/// other than `/` reaches it. A configuration key spelled exactly like this
/// does share the root route.
pub const ROOT_PATH: &str = "<root path>";

/// Default `Content-Type` when a route does not set `contentType`.
pub const DEFAULT_CONTENT_TYPE: &str = "application/json";

/// Default body when a route does not set `body`.
pub const DEFAULT_BODY: &str = "{}";

/// Strip a single leading slash from `path`.
///
/// Used by both the loader and the dispatcher so that `/widgets` and
/// `widgets` name the same route.
pub fn normalize_path(path: &str) -> &str {
    let stripped = path.strip_prefix('/').unwrap_or(path);
    if stripped.is_empty() {
        ROOT_PATH
    } else {
        stripped
    }
}

/// The HTTP verbs a route can be declared for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Verb {
    Get,
    Post,
    Put,
    Patch,
    Delete,
    Head,
}

impl Verb {
    /// All recognized verbs.
    pub const ALL: [Verb; 6] = [
        Verb::Get,
        Verb::Post,
        Verb::Put,
        Verb::Patch,
        Verb::Delete,
        Verb::Head,
    ];

    /// Parse a verb name, ignoring case.
    pub fn parse(name: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|verb| verb.as_str().eq_ignore_ascii_case(name))
    }

    /// Map a request method onto a verb. Any other method yields `None`.
    pub fn from_method(method: &Method) -> Option<Self> {
        match *method {
            Method::GET => Some(Verb::Get),
            Method::POST => Some(Verb::Post),
            Method::PUT => Some(Verb::Put),
            Method::PATCH => Some(Verb::Patch),
            Method::DELETE => Some(Verb::Delete),
            Method::HEAD => Some(Verb::Head),
            _ => None,
        }
    }

    /// Uppercase name of the verb.
    pub fn as_str(&self) -> &'static str {
        match self {
            Verb::Get => "GET",
            Verb::Post => "POST",
            Verb::Put => "PUT",
            Verb::Patch => "PATCH",
            Verb::Delete => "DELETE",
            Verb::Head => "HEAD",
        }
    }
}

impl fmt::Display for Verb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A fully resolved canned response for one route.
#[derive(Debug, Clone)]
pub struct ResponseDefinition {
    verb: Verb,
    status: StatusCode,
    content_type: HeaderValue,
    body: Bytes,
    headers: HeaderMap,
}

impl ResponseDefinition {
    /// Create a definition with the default content type, body and no headers.
    pub fn new(verb: Verb, status: StatusCode) -> Self {
        Self {
            verb,
            status,
            content_type: HeaderValue::from_static(DEFAULT_CONTENT_TYPE),
            body: Bytes::from_static(DEFAULT_BODY.as_bytes()),
            headers: HeaderMap::new(),
        }
    }

    pub fn with_content_type(mut self, content_type: HeaderValue) -> Self {
        self.content_type = content_type;
        self
    }

    pub fn with_body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = body.into();
        self
    }

    pub fn with_headers(mut self, headers: HeaderMap) -> Self {
        self.headers = headers;
        self
    }

    pub fn verb(&self) -> Verb {
        self.verb
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn content_type(&self) -> &HeaderValue {
        &self.content_type
    }

    pub fn body(&self) -> &Bytes {
        &self.body
    }

    /// Extra headers, applied before `Content-Type`.
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }
}

/// Outcome of a table lookup.
#[derive(Debug)]
pub enum Lookup<'a> {
    Found(&'a ResponseDefinition),
    NotFound,
}

/// Immutable mapping from normalized path to its per-verb responses.
#[derive(Debug, Clone, Default)]
pub struct RouteTable {
    routes: HashMap<String, Vec<ResponseDefinition>>,
}

impl RouteTable {
    /// Create an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a definition under `path` (normalized here).
    ///
    /// A definition already present for the same verb is replaced in place
    /// and returned.
    pub fn insert(
        &mut self,
        path: &str,
        definition: ResponseDefinition,
    ) -> Option<ResponseDefinition> {
        let responses = self
            .routes
            .entry(normalize_path(path).to_string())
            .or_default();

        match responses
            .iter_mut()
            .find(|existing| existing.verb == definition.verb)
        {
            Some(existing) => Some(std::mem::replace(existing, definition)),
            None => {
                responses.push(definition);
                None
            }
        }
    }

    /// Drop every route under `path`. Returns whether any existed.
    pub fn remove_path(&mut self, path: &str) -> bool {
        self.routes.remove(normalize_path(path)).is_some()
    }

    /// Find the definition for a request path and method.
    pub fn lookup(&self, path: &str, method: &Method) -> Lookup<'_> {
        match Verb::from_method(method) {
            Some(verb) => self.lookup_verb(path, verb),
            None => Lookup::NotFound,
        }
    }

    /// Find the definition for a request path and verb.
    pub fn lookup_verb(&self, path: &str, verb: Verb) -> Lookup<'_> {
        self.routes
            .get(normalize_path(path))
            .and_then(|responses| responses.iter().find(|r| r.verb == verb))
            .map_or(Lookup::NotFound, Lookup::Found)
    }

    /// Number of (path, verb) routes.
    pub fn len(&self) -> usize {
        self.routes.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Normalized paths with at least one route.
    pub fn paths(&self) -> impl Iterator<Item = &str> {
        self.routes.keys().map(String::as_str)
    }

    /// Every route as `(normalized path, definition)`.
    pub fn routes(&self) -> impl Iterator<Item = (&str, &ResponseDefinition)> {
        self.routes.iter().flat_map(|(path, responses)| {
            responses.iter().map(move |response| (path.as_str(), response))
        })
    }
}
