//! Bridges hyper connections to the dispatch core.

use std::io;

use bytes::Bytes;
use futures::StreamExt;
use http_body_util::{BodyExt, Full};
use hyper::body::Incoming;
use hyper::{Request as HyperRequest, Response as HyperResponse, StatusCode};
use thiserror::Error;
use tracing::{error, warn};

use switchyard::{Method, Outcome, Request, Response, Router};

/// Reasons an exchange ends without a response.
///
/// Returned as the service error so hyper drops the connection.
#[derive(Debug, Error)]
pub enum Unanswered {
    /// The handler chain ran but nobody sent a response.
    #[error("handler chain ended without a response: {method} {path}")]
    Stalled { method: Method, path: String },

    /// The client went away while the body was being read.
    #[error("request body stream aborted: {method} {path}")]
    Aborted { method: Method, path: String },
}

/// Runs one hyper request through the router.
pub async fn handle_request(
    req: HyperRequest<Incoming>,
    router: Router,
) -> Result<HyperResponse<Full<Bytes>>, Unanswered> {
    let Some(method) = Method::parse(req.method().as_str()) else {
        warn!(method = %req.method(), "unsupported request method");
        return Ok(plain(StatusCode::NOT_IMPLEMENTED, "Not Implemented"));
    };

    let target = req
        .uri()
        .path_and_query()
        .map_or_else(|| req.uri().path().to_string(), |pq| pq.as_str().to_string());
    let mut request = Request::new(method, target);
    for (key, value) in req.headers() {
        if let Ok(v) = value.to_str() {
            request.headers.insert(key.to_string(), v.to_string());
        }
    }

    let body = req
        .into_body()
        .into_data_stream()
        .map(|chunk| chunk.map_err(io::Error::other))
        .boxed();

    let exchange = router.handle(request, body).await;
    let method = exchange.request.method;
    let path = exchange.request.path;
    match exchange.outcome {
        Outcome::Sent => Ok(to_hyper(exchange.response)),
        Outcome::Stalled => Err(Unanswered::Stalled { method, path }),
        Outcome::Aborted => Err(Unanswered::Aborted { method, path }),
    }
}

/// Converts a sent response into a hyper response.
pub fn to_hyper(response: Response) -> HyperResponse<Full<Bytes>> {
    let (status, headers, body) = response.into_parts();

    let mut builder = HyperResponse::builder()
        .status(StatusCode::from_u16(status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR));
    for (key, value) in &headers {
        builder = builder.header(key.as_str(), value.as_str());
    }

    match builder.body(Full::new(Bytes::from(body))) {
        Ok(response) => response,
        Err(err) => {
            error!(error = %err, "handler produced an invalid response");
            plain(StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error")
        }
    }
}

fn plain(status: StatusCode, body: &'static str) -> HyperResponse<Full<Bytes>> {
    let mut response = HyperResponse::new(Full::new(Bytes::from_static(body.as_bytes())));
    *response.status_mut() = status;
    response
}
