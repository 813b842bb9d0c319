//! Handler trait and the continuation protocol.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use tracing::info;

use crate::error::BoxError;
use crate::request::Request;
use crate::response::Response;

/// A boxed future for async handler operations.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// What a handler asks the dispatcher to do once it returns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    /// Invoke the continuation: resume the scan at the next matching
    /// handler.
    Next,
    /// Stop the chain. The handler is expected to have sent the response.
    Done,
}

/// Result of running a handler.
pub type HandlerResult = Result<Flow, BoxError>;

/// A shared, type-erased handler.
pub type BoxedHandler = Arc<dyn Handler>;

/// Trait for anything that can take part in a dispatch chain.
///
/// A handler may:
/// - Send the response, ending the chain
/// - Return [`Flow::Next`] to hand control to the next matching handler
/// - Fail, in which case the dispatcher answers with a server error
///
/// Closures of the right shape implement this trait directly.
///
/// # Example
///
/// ```
/// use switchyard::{BoxFuture, Flow, Handler, HandlerResult, Request, Response};
///
/// struct PoweredBy;
///
/// impl Handler for PoweredBy {
///     fn call<'a>(
///         &'a self,
///         _req: &'a mut Request,
///         res: &'a mut Response,
///     ) -> BoxFuture<'a, HandlerResult> {
///         Box::pin(async move {
///             res.set_header("X-Powered-By", "switchyard")?;
///             Ok(Flow::Next)
///         })
///     }
/// }
/// ```
pub trait Handler: Send + Sync {
    /// Runs the handler against the request and its response.
    fn call<'a>(&'a self, req: &'a mut Request, res: &'a mut Response)
        -> BoxFuture<'a, HandlerResult>;
}

impl<F> Handler for F
where
    F: for<'a> Fn(&'a mut Request, &'a mut Response) -> BoxFuture<'a, HandlerResult>
        + Send
        + Sync,
{
    fn call<'a>(
        &'a self,
        req: &'a mut Request,
        res: &'a mut Response,
    ) -> BoxFuture<'a, HandlerResult> {
        self(req, res)
    }
}

/// Pins down the signature of a handler closure.
///
/// Closures passed straight to a generic `impl Handler` parameter cannot
/// have their borrowed argument lifetimes inferred; routing them through
/// this function fixes the signature.
///
/// ```
/// use switchyard::{handler, Flow, Registry};
///
/// let registry = Registry::new().get(
///     "/ping",
///     handler(|_req, res| {
///         Box::pin(async move {
///             res.text("pong")?;
///             Ok(Flow::Done)
///         })
///     }),
/// );
/// assert_eq!(registry.len(), 1);
/// ```
pub fn handler<F>(f: F) -> F
where
    F: for<'a> Fn(&'a mut Request, &'a mut Response) -> BoxFuture<'a, HandlerResult>
        + Send
        + Sync
        + 'static,
{
    f
}

/// Type-erases a handler, e.g. for [`Registry::chain`](crate::Registry::chain).
pub fn boxed(handler: impl Handler + 'static) -> BoxedHandler {
    Arc::new(handler)
}

/// Middleware that logs each request and passes it on.
pub struct RequestLogger;

impl Handler for RequestLogger {
    fn call<'a>(
        &'a self,
        req: &'a mut Request,
        _res: &'a mut Response,
    ) -> BoxFuture<'a, HandlerResult> {
        Box::pin(async move {
            info!(method = %req.method, path = %req.path, "--> request");
            Ok(Flow::Next)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_closure_handler() {
        let h = handler(|req, res| {
            Box::pin(async move {
                res.text(format!("hello {}", req.path))?;
                Ok(Flow::Done)
            })
        });

        let mut req = Request::get("/world");
        let mut res = Response::new();
        let flow = Handler::call(&h, &mut req, &mut res).await.unwrap();
        assert_eq!(flow, Flow::Done);
        assert_eq!(res.body_string(), Some("hello /world".to_string()));
    }

    #[tokio::test]
    async fn test_request_logger_continues() {
        let mut req = Request::get("/");
        let mut res = Response::new();
        let flow = RequestLogger.call(&mut req, &mut res).await.unwrap();
        assert_eq!(flow, Flow::Next);
        assert!(!res.is_sent());
    }

    #[tokio::test]
    async fn test_write_after_send_propagates() {
        let h = handler(|_req, res| {
            Box::pin(async move {
                res.success()?;
                res.text("twice")?;
                Ok(Flow::Done)
            })
        });

        let mut req = Request::get("/");
        let mut res = Response::new();
        let err = Handler::call(&h, &mut req, &mut res).await.unwrap_err();
        assert_eq!(err.to_string(), "response already sent");
    }
}
