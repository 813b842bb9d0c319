//! # switchyard
//!
//! The dispatch core of a minimal HTTP server framework.
//!
//! This crate provides:
//! - Path patterns with named (`:id`) and greedy (`:rest*`) parameters
//! - An ordered, append-only handler registry frozen before serving
//! - A dispatcher running matching handlers in registration order, each
//!   one able to send the response or hand over to the next
//! - Body decoding (JSON, URL-encoded, multipart) with a size ceiling,
//!   completed before the first handler runs
//!
//! ## Quick Start
//!
//! ```
//! use switchyard::{body, handler, Flow, Registry, Request};
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let router = Registry::new()
//!     .get("/users/:id", handler(|req, res| {
//!         Box::pin(async move {
//!             let id = req.params.get("id").unwrap_or("unknown").to_string();
//!             res.json(&serde_json::json!({ "id": id }))?;
//!             Ok(Flow::Done)
//!         })
//!     }))
//!     .freeze()
//!     .unwrap();
//!
//! let exchange = router.handle(Request::get("/users/42"), body::empty()).await;
//! assert_eq!(exchange.response.status(), 200);
//! assert_eq!(exchange.response.body_string().unwrap(), r#"{"id":"42"}"#);
//! # }
//! ```
//!
//! ## Middleware
//!
//! Middleware is a handler registered for every method and path. It runs
//! in registration order and returns [`Flow::Next`] to continue:
//!
//! ```ignore
//! let router = Registry::new()
//!     .middleware(RequestLogger)
//!     .middleware(handler(|req, res| Box::pin(async move {
//!         if req.get_header("Authorization").is_none() {
//!             res.set_status(401)?.text("unauthorized")?;
//!             return Ok(Flow::Done);
//!         }
//!         Ok(Flow::Next)
//!     })))
//!     .get("/", index)
//!     .freeze()?;
//! ```
//!
//! ## Request bodies
//!
//! For methods that carry a body (POST, PUT and PATCH by default), the
//! body is decoded before dispatch and available as [`Request::body`].
//! A body that is too large or in no recognized format is answered
//! with 413 or 400 and never reaches a handler.

pub mod body;
mod dispatcher;
mod error;
mod handler;
mod path;
mod registry;
mod request;
mod response;
mod static_files;

pub use body::{Body, BodyDecoder, BodyStream, DecoderConfig, FilePart};
pub use dispatcher::{Exchange, Outcome, Pipeline, Router, Step};
pub use error::{BoxError, DecodeError, Result, RouterError};
pub use handler::{
    boxed, handler, BoxFuture, BoxedHandler, Flow, Handler, HandlerResult, RequestLogger,
};
pub use path::{PathPattern, PathSegment, WILDCARD};
pub use registry::{Entry, EntryMatch, MethodFilter, Registry};
pub use request::{Method, PathParams, Request};
pub use response::Response;
pub use static_files::{content_type, StaticFile, StaticFiles};
