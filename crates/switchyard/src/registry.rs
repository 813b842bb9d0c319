//! Handler registration.
//!
//! A [`Registry`] is only open during setup. [`Registry::freeze`] turns it
//! into an immutable [`Router`] that can be shared across connections.

use std::fmt;
use std::sync::Arc;

use crate::body::{BodyDecoder, DecoderConfig};
use crate::dispatcher::Router;
use crate::error::{Result, RouterError};
use crate::handler::{BoxedHandler, Handler};
use crate::path::{PathPattern, WILDCARD};
use crate::request::{Method, PathParams, Request};

/// Which request methods an entry accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MethodFilter {
    /// Any method, regardless of path (middleware).
    Any,
    /// Exactly this method.
    Only(Method),
}

impl MethodFilter {
    /// Parses `*` or a method name, ignoring case.
    pub fn parse(s: &str) -> Option<Self> {
        if s == "*" {
            Some(Self::Any)
        } else {
            Method::parse(s).map(Self::Only)
        }
    }
}

impl From<Method> for MethodFilter {
    fn from(method: Method) -> Self {
        Self::Only(method)
    }
}

impl fmt::Display for MethodFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Any => f.write_str("*"),
            Self::Only(method) => write!(f, "{method}"),
        }
    }
}

/// How an entry matched a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EntryMatch {
    /// A method-agnostic entry; the path is not consulted and the
    /// request's parameters are left as they are.
    Unconditional,
    /// Method and pattern matched, binding these parameters.
    Route(PathParams),
}

/// One registered (method, pattern, handler) tuple.
#[derive(Clone)]
pub struct Entry {
    /// Accepted methods.
    pub method: MethodFilter,
    /// Path pattern.
    pub pattern: PathPattern,
    /// Request handler.
    pub handler: BoxedHandler,
}

impl Entry {
    /// Checks this entry against a request without touching it.
    pub fn matches(&self, req: &Request) -> Option<EntryMatch> {
        match self.method {
            MethodFilter::Any => Some(EntryMatch::Unconditional),
            MethodFilter::Only(method) if method == req.method => {
                self.pattern.match_path(&req.path).map(EntryMatch::Route)
            }
            MethodFilter::Only(_) => None,
        }
    }
}

impl fmt::Debug for Entry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Entry")
            .field("method", &self.method)
            .field("pattern", &self.pattern.pattern())
            .finish_non_exhaustive()
    }
}

/// Append-only list of handler entries, populated during setup.
///
/// Insertion order is dispatch priority.
#[derive(Default)]
pub struct Registry {
    entries: Vec<Entry>,
    error: Option<RouterError>,
    decoder: DecoderConfig,
}

impl Registry {
    /// Creates a new empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the body decoding configuration.
    #[must_use]
    pub fn with_decoder(mut self, config: DecoderConfig) -> Self {
        self.decoder = config;
        self
    }

    /// Adds a GET handler.
    #[must_use]
    pub fn get(self, pattern: &str, handler: impl Handler + 'static) -> Self {
        self.route(Method::Get, pattern, handler)
    }

    /// Adds a POST handler.
    #[must_use]
    pub fn post(self, pattern: &str, handler: impl Handler + 'static) -> Self {
        self.route(Method::Post, pattern, handler)
    }

    /// Adds a PUT handler.
    #[must_use]
    pub fn put(self, pattern: &str, handler: impl Handler + 'static) -> Self {
        self.route(Method::Put, pattern, handler)
    }

    /// Adds a DELETE handler.
    #[must_use]
    pub fn delete(self, pattern: &str, handler: impl Handler + 'static) -> Self {
        self.route(Method::Delete, pattern, handler)
    }

    /// Adds a handler for `method` on every path.
    #[must_use]
    pub fn on(self, method: Method, handler: impl Handler + 'static) -> Self {
        self.route(method, WILDCARD, handler)
    }

    /// Adds middleware: a handler that runs for every method and path.
    #[must_use]
    pub fn middleware(self, handler: impl Handler + 'static) -> Self {
        self.route(MethodFilter::Any, WILDCARD, handler)
    }

    /// Adds a handler with any method filter.
    #[must_use]
    pub fn route(
        self,
        method: impl Into<MethodFilter>,
        pattern: &str,
        handler: impl Handler + 'static,
    ) -> Self {
        let handler: BoxedHandler = Arc::new(handler);
        self.chain(method, pattern, [handler])
    }

    /// Adds several handlers for the same method and pattern.
    ///
    /// Each handler becomes its own entry, in the order given.
    #[must_use]
    pub fn chain(
        mut self,
        method: impl Into<MethodFilter>,
        pattern: &str,
        handlers: impl IntoIterator<Item = BoxedHandler>,
    ) -> Self {
        let method = method.into();
        match PathPattern::parse(pattern) {
            Ok(pattern) => {
                self.entries
                    .extend(handlers.into_iter().map(|handler| Entry {
                        method,
                        pattern: pattern.clone(),
                        handler,
                    }));
            }
            Err(err) => {
                self.error.get_or_insert(err);
            }
        }
        self
    }

    /// Number of registered entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if nothing has been registered.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Ends setup and returns the immutable router.
    ///
    /// Fails with the first invalid pattern that was registered.
    pub fn freeze(self) -> Result<Router> {
        if let Some(err) = self.error {
            return Err(err);
        }
        Ok(Router::new(
            Arc::from(self.entries),
            BodyDecoder::new(self.decoder),
        ))
    }
}
