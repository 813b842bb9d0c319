#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use switchyard::{body, handler, Exchange, Flow, Handler, Request, Router};

/// Shared list of handler names, in the order they ran.
pub type Trace = Arc<Mutex<Vec<&'static str>>>;

pub fn trace() -> Trace {
    Arc::new(Mutex::new(Vec::new()))
}

pub fn seen(trace: &Trace) -> Vec<&'static str> {
    trace.lock().unwrap().clone()
}

/// A handler that records its name and returns `flow` without sending.
pub fn step(trace: &Trace, name: &'static str, flow: Flow) -> impl Handler + 'static {
    let trace = trace.clone();
    handler(move |_req, _res| {
        trace.lock().unwrap().push(name);
        Box::pin(async move { Ok(flow) })
    })
}

/// A handler that records its name and answers with `name` as the body.
pub fn reply(trace: &Trace, name: &'static str) -> impl Handler + 'static {
    let trace = trace.clone();
    handler(move |_req, res| {
        trace.lock().unwrap().push(name);
        Box::pin(async move {
            res.text(name)?;
            Ok(Flow::Done)
        })
    })
}

pub async fn send(router: &Router, request: Request) -> Exchange {
    router.handle(request, body::empty()).await
}

pub async fn send_body(router: &Router, request: Request, payload: &'static str) -> Exchange {
    router.handle(request, body::full(payload)).await
}
