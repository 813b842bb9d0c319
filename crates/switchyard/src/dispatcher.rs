//! Per-request dispatch.
//!
//! The chain is driven by a [`Pipeline`]: a cursor over the frozen entry
//! list. Each call to [`Pipeline::step`] scans forward to the next entry
//! matching the request and moves the cursor past it. The router invokes
//! that entry's handler and steps again only when the handler returns
//! [`Flow::Next`] without having sent the response.

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::FutureExt;
use tracing::{debug, error, warn};

use crate::body::{BodyDecoder, BodyStream};
use crate::error::{DecodeError, RouterError};
use crate::handler::{Flow, Handler};
use crate::registry::{Entry, EntryMatch};
use crate::request::Request;
use crate::response::Response;

/// How a dispatch ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// The response was sent, by a handler or by the router itself.
    Sent,
    /// A route handler matched but no handler sent a response. This is a
    /// handler bug; the router does not paper over it.
    Stalled,
    /// The body stream failed before dispatch; nothing can be sent.
    Aborted,
}

/// Result of one scan step.
#[derive(Debug)]
pub enum Step<'r> {
    /// Run the handler of `entry`, found at `index`.
    Invoke {
        index: usize,
        entry: &'r Entry,
        matched: EntryMatch,
    },
    /// The cursor reached the end of the entry list.
    Exhausted {
        /// Whether a route entry (method and pattern) matched during this
        /// dispatch. Unconditional middleware does not count.
        matched: bool,
    },
}

/// Cursor over the entry list for a single request.
#[derive(Debug)]
pub struct Pipeline<'r> {
    entries: &'r [Entry],
    cursor: usize,
    matched: bool,
}

impl<'r> Pipeline<'r> {
    /// Starts a scan at the first entry.
    pub fn new(entries: &'r [Entry]) -> Self {
        Self {
            entries,
            cursor: 0,
            matched: false,
        }
    }

    /// Index of the next entry to be examined.
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    /// Scans forward to the next entry matching `req`.
    pub fn step(&mut self, req: &Request) -> Step<'r> {
        let entries = self.entries;
        while let Some(entry) = entries.get(self.cursor) {
            let index = self.cursor;
            self.cursor += 1;
            if let Some(matched) = entry.matches(req) {
                if matches!(matched, EntryMatch::Route(_)) {
                    self.matched = true;
                }
                return Step::Invoke {
                    index,
                    entry,
                    matched,
                };
            }
        }
        Step::Exhausted {
            matched: self.matched,
        }
    }
}

/// A request that went through [`Router::handle`].
#[derive(Debug)]
pub struct Exchange {
    /// The request, with its decoded body and last bound parameters.
    pub request: Request,
    /// The response as left by the chain.
    pub response: Response,
    /// How dispatch ended.
    pub outcome: Outcome,
}

/// Frozen handler table plus body decoder.
///
/// Cheap to clone; every clone shares the same immutable entries.
#[derive(Debug, Clone)]
pub struct Router {
    entries: Arc<[Entry]>,
    decoder: BodyDecoder,
}

impl Router {
    pub(crate) fn new(entries: Arc<[Entry]>, decoder: BodyDecoder) -> Self {
        Self { entries, decoder }
    }

    /// Returns the registered entries in dispatch order.
    pub fn entries(&self) -> &[Entry] {
        &self.entries
    }

    /// Returns the body decoder.
    pub fn decoder(&self) -> &BodyDecoder {
        &self.decoder
    }

    /// Decodes the body, then runs the handler chain.
    ///
    /// A body that fails to decode never reaches any handler.
    pub async fn handle(&self, mut request: Request, body: BodyStream) -> Exchange {
        let mut response = Response::new();

        let outcome = match self.decoder.decode(&request, body).await {
            Ok(decoded) => {
                request.body = decoded;
                self.dispatch(&mut request, &mut response).await
            }
            Err(err) => reject(&request, &mut response, &err),
        };

        Exchange {
            request,
            response,
            outcome,
        }
    }

    /// Runs the handler chain for an already decoded request.
    pub async fn dispatch(&self, req: &mut Request, res: &mut Response) -> Outcome {
        let mut pipeline = Pipeline::new(&self.entries);

        loop {
            let (index, entry, matched) = match pipeline.step(req) {
                Step::Invoke {
                    index,
                    entry,
                    matched,
                } => (index, entry, matched),
                Step::Exhausted { matched: false } => {
                    let err = RouterError::NotFound {
                        method: req.method.to_string(),
                        path: req.path.clone(),
                    };
                    debug!(%err, "no handler matched");
                    res.finalize(404, err.to_string());
                    return Outcome::Sent;
                }
                Step::Exhausted { matched: true } => {
                    warn!(
                        method = %req.method,
                        path = %req.path,
                        "handler chain ended without a response"
                    );
                    return Outcome::Stalled;
                }
            };

            if let EntryMatch::Route(params) = matched {
                req.params = params;
            }
            debug!(
                index,
                method = %entry.method,
                pattern = entry.pattern.pattern(),
                "invoking handler"
            );

            let result = AssertUnwindSafe(entry.handler.call(req, res))
                .catch_unwind()
                .await;

            let flow = match result {
                Ok(Ok(flow)) => flow,
                Ok(Err(err)) => {
                    fault(req, res, &err.to_string());
                    return Outcome::Sent;
                }
                Err(panic) => {
                    fault(req, res, &panic_message(&*panic));
                    return Outcome::Sent;
                }
            };

            if res.is_sent() {
                return Outcome::Sent;
            }
            if flow == Flow::Done {
                warn!(
                    method = %req.method,
                    path = %req.path,
                    index,
                    "handler finished without sending a response"
                );
                return Outcome::Stalled;
            }
        }
    }
}

/// Answers a request whose body could not be decoded.
fn reject(req: &Request, res: &mut Response, err: &DecodeError) -> Outcome {
    warn!(method = %req.method, path = %req.path, error = %err, "request body rejected");

    let Some(status) = err.status() else {
        return Outcome::Aborted;
    };
    res.finalize(status, err.to_string());
    if err.closes_connection() {
        res.close_connection();
    }
    Outcome::Sent
}

/// Logs a handler fault and answers with a 500 unless already sent.
fn fault(req: &Request, res: &mut Response, detail: &str) {
    error!(method = %req.method, path = %req.path, error = detail, "handler fault");
    if !res.is_sent() {
        res.finalize(500, "Internal Server Error");
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "handler panicked".to_string()
    }
}
