//! Generic HTTP Response Simulator
//!
//! A stand-in HTTP server that answers every request with a response
//! declared ahead of time in a configuration document, so that deployment
//! playbooks and cluster smoke tests can run without the real service.
//!
//! # Features
//!
//! - **Static Routes**: One canned response per (path, verb)
//! - **Leading-Slash Insensitive**: `/widgets` and `widgets` are the same route
//! - **Request Log**: Every request body is appended to a log file
//! - **Uniform 404**: Unmatched routes and dispatch failures answer 404
//!
//! # Example Configuration
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

pub mod config;
pub mod dispatcher;
pub mod error;
pub mod request_log;
pub mod server;
pub mod table;

pub use dispatcher::Dispatcher;
pub use error::{ConfigError, DispatchError, ServerError};
pub use request_log::RequestLog;
pub use server::Server;
pub use table::{Lookup, ResponseDefinition, RouteTable, Verb};
