//! Demo application wired onto the dispatch core.

use std::path::PathBuf;

use serde_json::json;
use switchyard::{handler, DecoderConfig, Flow, Handler, Registry, RequestLogger, StaticFiles};

/// Builds the handler table served by the binary.
pub fn build_registry(static_dir: Option<PathBuf>, decoder: DecoderConfig) -> Registry {
    let registry = Registry::new()
        .with_decoder(decoder)
        .middleware(RequestLogger)
        .get("/", index())
        .get("/hello/:name", hello())
        .get("/search", search())
        .post("/echo", echo())
        .put("/echo", echo())
        .get("/report.csv", report())
        .get(
            "/home",
            handler(|_req, res| {
                Box::pin(async move {
                    res.redirect("/")?;
                    Ok(Flow::Done)
                })
            }),
        );

    match static_dir {
        Some(dir) => registry.get("/static/:rest*", StaticFiles::new(dir).from_param("rest")),
        None => registry,
    }
}

fn index() -> impl Handler + 'static {
    handler(|_req, res| {
        Box::pin(async move {
            res.html(r#"<h1>switchyard</h1><p>Try <a href="/hello/world">/hello/world</a>.</p>"#)?;
            Ok(Flow::Done)
        })
    })
}

fn hello() -> impl Handler + 'static {
    handler(|req, res| {
        Box::pin(async move {
            let name = req.params.get("name").unwrap_or("stranger");
            res.json(&json!({ "greeting": format!("hello, {name}") }))?;
            Ok(Flow::Done)
        })
    })
}

fn search() -> impl Handler + 'static {
    handler(|req, res| {
        Box::pin(async move {
            let Some(q) = req.get_query("q") else {
                res.set_status(400)?.text("missing query parameter `q`")?;
                return Ok(Flow::Done);
            };
            let page = req
                .get_query("page")
                .and_then(|p| p.parse::<u32>().ok())
                .unwrap_or(1);
            res.json(&json!({ "q": q, "page": page }))?;
            Ok(Flow::Done)
        })
    })
}

fn echo() -> impl Handler + 'static {
    handler(|req, res| {
        Box::pin(async move {
            let Some(body) = &req.body else {
                res.set_status(400)?.text("expected a request body")?;
                return Ok(Flow::Done);
            };
            let files: Vec<_> = body
                .files
                .iter()
                .map(|f| {
                    json!({ "field": f.field, "filename": f.filename, "bytes": f.data.len() })
                })
                .collect();
            res.json(&json!({ "fields": body.fields, "files": files }))?;
            Ok(Flow::Done)
        })
    })
}

fn report() -> impl Handler + 'static {
    handler(|_req, res| {
        Box::pin(async move {
            res.csv("report.csv", "route,method\n/,GET\n/echo,POST\n")?;
            Ok(Flow::Done)
        })
    })
}
