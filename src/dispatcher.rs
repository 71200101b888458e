//! Per-request dispatch: log the body, look up the route, answer.

use crate::error::DispatchError;
use crate::request_log::RequestLog;
use crate::table::{normalize_path, Lookup, ResponseDefinition, RouteTable};
use bytes::Bytes;
use http::header::CONTENT_TYPE;
use http::{Method, Request, Response, StatusCode};
use http_body_util::{BodyExt, Full};
use hyper::body::Incoming;
use std::sync::Arc;
use tracing::{debug, warn};

/// Type alias for the HTTP response.
pub type HttpResponse = Response<Full<Bytes>>;

/// Matches requests against the route table.
///
/// Holds only shared, read-only state, so one instance serves every
/// connection.
#[derive(Debug, Clone)]
pub struct Dispatcher {
    table: Arc<RouteTable>,
    log: Arc<RequestLog>,
}

impl Dispatcher {
    pub fn new(table: Arc<RouteTable>, log: Arc<RequestLog>) -> Self {
        Self { table, log }
    }

    pub fn table(&self) -> &RouteTable {
        &self.table
    }

    /// Handle a request from the listener.
    ///
    /// The body is read in full before dispatch. A body that cannot be read
    /// yields the not-found outcome.
    pub async fn handle(&self, req: Request<Incoming>) -> HttpResponse {
        let (parts, body) = req.into_parts();

        let body = match body.collect().await.map_err(DispatchError::from) {
            Ok(collected) => collected.to_bytes(),
            Err(e) => {
                warn!(
                    method = %parts.method,
                    path = %parts.uri.path(),
                    error = %e,
                    "Dispatch failed"
                );
                return not_found();
            }
        };

        self.dispatch(&parts.method, parts.uri.path(), &body).await
    }

    /// Produce the response for a request with an already collected body.
    pub async fn dispatch(&self, method: &Method, path: &str, body: &[u8]) -> HttpResponse {
        self.log.record(body).await;

        match self.table.lookup(path, method) {
            Lookup::Found(definition) => match build_response(definition) {
                Ok(response) => {
                    debug!(
                        method = %method,
                        path = %normalize_path(path),
                        status = definition.status().as_u16(),
                        "Matched route"
                    );
                    response
                }
                Err(e) => {
                    warn!(method = %method, path = %path, error = %e, "Dispatch failed");
                    not_found()
                }
            },
            Lookup::NotFound => {
                debug!(method = %method, path = %path, "No route matched");
                not_found()
            }
        }
    }
}

/// Build the configured response. `Content-Type` is set last so it always
/// overrides a content-type entry in the headers map.
fn build_response(definition: &ResponseDefinition) -> Result<HttpResponse, DispatchError> {
    let mut response = Response::builder()
        .status(definition.status())
        .body(Full::new(definition.body().clone()))?;

    let headers = response.headers_mut();
    for (name, value) in definition.headers() {
        headers.insert(name.clone(), value.clone());
    }
    headers.insert(CONTENT_TYPE, definition.content_type().clone());

    Ok(response)
}

/// The uniform not-found outcome.
fn not_found() -> HttpResponse {
    let mut response = Response::new(Full::new(Bytes::new()));
    *response.status_mut() = StatusCode::NOT_FOUND;
    response
}
