//! Request bodies decoded ahead of dispatch.

mod common;

use std::io;

use bytes::Bytes;
use common::{reply, seen, send_body, trace};
use futures::stream::{self, StreamExt};
use serde::Deserialize;
use serde_json::json;
use switchyard::{
    handler, DecoderConfig, Flow, Handler, Method, Outcome, Registry, Request, Router,
};

fn echo() -> impl Handler + 'static {
    handler(|req, res| {
        Box::pin(async move {
            match &req.body {
                Some(body) => res.json(&body.fields)?,
                None => res.text("no body")?,
            }
            Ok(Flow::Done)
        })
    })
}

fn echo_router(config: DecoderConfig) -> Router {
    Registry::new()
        .with_decoder(config)
        .get("/echo", echo())
        .post("/echo", echo())
        .put("/echo", echo())
        .freeze()
        .unwrap()
}

#[derive(Debug, Deserialize, PartialEq)]
struct Signup {
    name: String,
    age: u32,
}

#[tokio::test]
async fn test_json_body_is_decoded_before_first_handler() {
    let router = Registry::new()
        .middleware(handler(|req, res| {
            Box::pin(async move {
                let a = req.body.as_ref().and_then(|b| b.field("a")).cloned();
                res.json(&json!({ "seen": a }))?;
                Ok(Flow::Done)
            })
        }))
        .freeze()
        .unwrap();

    let request = Request::post("/anything").header("Content-Type", "application/json");
    let exchange = send_body(&router, request, r#"{"a":1}"#).await;
    assert_eq!(exchange.response.body_string(), Some(r#"{"seen":1}"#.to_string()));
}

#[tokio::test]
async fn test_typed_access_to_body() {
    let router = Registry::new()
        .post(
            "/signup",
            handler(|req, res| {
                Box::pin(async move {
                    let signup: Signup = match req.json() {
                        Some(parsed) => parsed?,
                        None => return Err("missing body".into()),
                    };
                    res.set_status(201)?.text(signup.name)?;
                    Ok(Flow::Done)
                })
            }),
        )
        .freeze()
        .unwrap();

    let payload = r#"{"name":"ada","age":36}"#;
    let exchange = send_body(&router, Request::post("/signup"), payload).await;
    assert_eq!(exchange.response.status(), 201);
    assert_eq!(exchange.response.body_string(), Some("ada".to_string()));
    assert_eq!(
        exchange.request.json::<Signup>().unwrap().unwrap(),
        Signup {
            name: "ada".to_string(),
            age: 36
        }
    );
}

#[tokio::test]
async fn test_form_body_is_decoded() {
    let router = echo_router(DecoderConfig::default());
    let request =
        Request::post("/echo").header("Content-Type", "application/x-www-form-urlencoded");
    let exchange = send_body(&router, request, "name=Ada+Lovelace&lang=en").await;
    assert_eq!(
        exchange.response.body_string(),
        Some(r#"{"lang":"en","name":"Ada Lovelace"}"#.to_string())
    );
}

#[tokio::test]
async fn test_chunked_body_is_reassembled() {
    let router = echo_router(DecoderConfig::default());
    let chunks = [r#"{"ite"#, r#"ms":[1,"#, r#"2,3]}"#]
        .into_iter()
        .map(|chunk| Ok::<_, io::Error>(Bytes::from_static(chunk.as_bytes())));
    let exchange = router
        .handle(Request::post("/echo"), stream::iter(chunks).boxed())
        .await;
    assert_eq!(
        exchange.response.body_string(),
        Some(r#"{"items":[1,2,3]}"#.to_string())
    );
}

#[tokio::test]
async fn test_empty_body_is_empty_mapping() {
    let router = echo_router(DecoderConfig::default());
    let exchange = send_body(&router, Request::new(Method::Put, "/echo"), "").await;
    assert_eq!(exchange.response.body_string(), Some("{}".to_string()));
}

#[tokio::test]
async fn test_get_has_no_body() {
    let router = echo_router(DecoderConfig::default());
    let exchange = send_body(&router, Request::get("/echo"), r#"{"ignored":true}"#).await;
    assert_eq!(exchange.response.body_string(), Some("no body".to_string()));
    assert!(exchange.request.body.is_none());
}

#[tokio::test]
async fn test_malformed_body_never_reaches_handlers() {
    let t = trace();
    let router = Registry::new()
        .middleware(reply(&t, "mw"))
        .freeze()
        .unwrap();

    let exchange = send_body(&router, Request::post("/x"), "{not json <at all>").await;
    assert_eq!(exchange.outcome, Outcome::Sent);
    assert_eq!(exchange.response.status(), 400);
    assert!(seen(&t).is_empty());
}

#[tokio::test]
async fn test_oversized_body_never_reaches_handlers() {
    let t = trace();
    let router = Registry::new()
        .with_decoder(DecoderConfig {
            max_body_bytes: 16,
            ..DecoderConfig::default()
        })
        .middleware(reply(&t, "mw"))
        .freeze()
        .unwrap();

    let payload = r#"{"data":"0123456789abcdef"}"#;
    let exchange = send_body(&router, Request::post("/upload"), payload).await;
    assert_eq!(exchange.outcome, Outcome::Sent);
    assert_eq!(exchange.response.status(), 413);
    assert!(exchange.response.closes_connection());
    assert!(exchange.request.body.is_none());
    assert!(seen(&t).is_empty());
}

#[tokio::test]
async fn test_default_limit_rejects_declared_length() {
    let t = trace();
    let router = Registry::new()
        .middleware(reply(&t, "mw"))
        .freeze()
        .unwrap();

    let request = Request::post("/upload").header("Content-Length", "1000001");
    let exchange = send_body(&router, request, "{}").await;
    assert_eq!(exchange.response.status(), 413);
    assert!(seen(&t).is_empty());
}

#[tokio::test]
async fn test_aborted_stream_sends_nothing() {
    let t = trace();
    let router = Registry::new()
        .middleware(reply(&t, "mw"))
        .freeze()
        .unwrap();

    let chunks = vec![
        Ok(Bytes::from_static(b"{\"partial\":")),
        Err(io::Error::new(io::ErrorKind::ConnectionReset, "peer went away")),
    ];
    let exchange = router
        .handle(Request::post("/x"), stream::iter(chunks).boxed())
        .await;
    assert_eq!(exchange.outcome, Outcome::Aborted);
    assert!(!exchange.response.is_sent());
    assert!(seen(&t).is_empty());
}

#[tokio::test]
async fn test_multipart_upload() {
    let router = Registry::new()
        .post(
            "/avatar",
            handler(|req, res| {
                Box::pin(async move {
                    let Some(body) = &req.body else {
                        return Err("missing body".into());
                    };
                    let user = body.field_str("user").unwrap_or_default().to_string();
                    let size = body.file("avatar").map_or(0, |f| f.data.len());
                    res.text(format!("{user}:{size}"))?;
                    Ok(Flow::Done)
                })
            }),
        )
        .freeze()
        .unwrap();

    let payload = concat!(
        "--XyZ\r\n",
        "Content-Disposition: form-data; name=\"user\"\r\n",
        "\r\n",
        "ada\r\n",
        "--XyZ\r\n",
        "Content-Disposition: form-data; name=\"avatar\"; filename=\"me.png\"\r\n",
        "Content-Type: image/png\r\n",
        "\r\n",
        "PNGDATA\r\n",
        "--XyZ--\r\n",
    );
    let request =
        Request::post("/avatar").header("Content-Type", "multipart/form-data; boundary=XyZ");
    let exchange = send_body(&router, request, payload).await;

    assert_eq!(exchange.response.body_string(), Some("ada:7".to_string()));
    let body = exchange.request.body.unwrap();
    let file = body.file("avatar").unwrap();
    assert_eq!(file.filename, "me.png");
    assert_eq!(file.content_type.as_deref(), Some("image/png"));
}

#[tokio::test]
async fn test_custom_body_methods() {
    let config: DecoderConfig =
        serde_json::from_value(json!({ "body_methods": ["POST"] })).unwrap();
    let router = echo_router(config);

    let exchange = send_body(&router, Request::new(Method::Put, "/echo"), r#"{"a":1}"#).await;
    assert_eq!(exchange.response.body_string(), Some("no body".to_string()));

    let exchange = send_body(&router, Request::post("/echo"), r#"{"a":1}"#).await;
    assert_eq!(exchange.response.body_string(), Some(r#"{"a":1}"#.to_string()));
}
