//! Request body decoding.
//!
//! Bodies are fully buffered before any handler runs. Multipart form data
//! is decoded into scalar fields plus file parts; everything else is
//! parsed as JSON, then as URL-encoded form data, and rejected if
//! neither format fits.

use bytes::Bytes;
use futures::stream::{self, BoxStream, StreamExt};
use multer::{Constraints, Multipart, SizeLimit};
use serde::Deserialize;
use serde_json::{Map, Value};
use tracing::debug;

use crate::error::DecodeError;
use crate::request::{Method, Request};

/// Default body ceiling in bytes.
pub const DEFAULT_MAX_BODY_BYTES: usize = 1_000_000;

/// Raw request body as delivered by the transport.
pub type BodyStream = BoxStream<'static, std::io::Result<Bytes>>;

/// Wraps a complete byte buffer as a body stream.
pub fn full(data: impl Into<Bytes>) -> BodyStream {
    let data = data.into();
    stream::once(async move { Ok::<_, std::io::Error>(data) }).boxed()
}

/// A body stream that yields nothing.
pub fn empty() -> BodyStream {
    stream::empty().boxed()
}

/// A file part of a multipart body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilePart {
    /// Form field the file was submitted under.
    pub field: String,
    /// Original filename as sent by the client.
    pub filename: String,
    /// Declared media type of the part.
    pub content_type: Option<String>,
    /// Full content of the part.
    pub data: Bytes,
}

/// A decoded request body.
#[derive(Debug, Clone, PartialEq)]
pub struct Body {
    /// Decoded key/value content. JSON bodies keep their parsed shape;
    /// form and multipart bodies produce an object of strings.
    pub fields: Value,
    /// File parts, only populated for multipart bodies.
    pub files: Vec<FilePart>,
}

impl Body {
    /// Creates a body with no file parts.
    pub fn from_fields(fields: Value) -> Self {
        Self {
            fields,
            files: Vec::new(),
        }
    }

    /// Looks up a top-level field.
    pub fn field(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }

    /// Looks up a top-level field holding a string.
    pub fn field_str(&self, key: &str) -> Option<&str> {
        self.field(key).and_then(Value::as_str)
    }

    /// Finds the first file submitted under `field`.
    pub fn file(&self, field: &str) -> Option<&FilePart> {
        self.files.iter().find(|f| f.field == field)
    }
}

/// Body decoding settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DecoderConfig {
    /// Maximum number of body bytes accepted.
    pub max_body_bytes: usize,
    /// Methods whose requests carry a body.
    pub body_methods: Vec<Method>,
}

impl Default for DecoderConfig {
    fn default() -> Self {
        Self {
            max_body_bytes: DEFAULT_MAX_BODY_BYTES,
            body_methods: vec![Method::Post, Method::Put, Method::Patch],
        }
    }
}

/// Decodes request bodies according to method and content type.
#[derive(Debug, Clone, Default)]
pub struct BodyDecoder {
    config: DecoderConfig,
}

impl BodyDecoder {
    /// Creates a decoder with the given settings.
    pub fn new(config: DecoderConfig) -> Self {
        Self { config }
    }

    /// Returns the decoder settings.
    pub fn config(&self) -> &DecoderConfig {
        &self.config
    }

    /// Decodes `body` for `req`.
    ///
    /// Returns `Ok(None)` for methods that carry no body; the stream is
    /// dropped unread in that case.
    pub async fn decode(
        &self,
        req: &Request,
        body: BodyStream,
    ) -> Result<Option<Body>, DecodeError> {
        if !self.config.body_methods.contains(&req.method) {
            return Ok(None);
        }

        let limit = self.config.max_body_bytes;
        let declared = req
            .get_header("content-length")
            .and_then(|v| v.trim().parse::<usize>().ok());
        if declared.is_some_and(|len| len > limit) {
            return Err(DecodeError::PayloadTooLarge { limit });
        }

        if let Some(content_type) = req
            .content_type()
            .filter(|ct| has_essence(ct, "multipart/form-data"))
        {
            let boundary = multer::parse_boundary(content_type)?;
            return self.decode_multipart(body, boundary).await.map(Some);
        }

        let raw = self.buffer(body).await?;
        debug!(bytes = raw.len(), "buffered request body");
        let declared_form = req
            .content_type()
            .is_some_and(|ct| has_essence(ct, "application/x-www-form-urlencoded"));
        parse_buffered(&raw, declared_form).map(Some)
    }

    async fn buffer(&self, mut body: BodyStream) -> Result<Vec<u8>, DecodeError> {
        let limit = self.config.max_body_bytes;
        let mut buf = Vec::new();

        while let Some(chunk) = body.next().await {
            let chunk = chunk.map_err(DecodeError::Aborted)?;
            if buf.len() + chunk.len() > limit {
                return Err(DecodeError::PayloadTooLarge { limit });
            }
            buf.extend_from_slice(&chunk);
        }

        Ok(buf)
    }

    async fn decode_multipart(
        &self,
        body: BodyStream,
        boundary: String,
    ) -> Result<Body, DecodeError> {
        let limit = self.config.max_body_bytes as u64;
        let constraints = Constraints::new().size_limit(SizeLimit::new().whole_stream(limit));
        let mut multipart = Multipart::with_constraints(body, boundary, constraints);

        let mut fields = Map::new();
        let mut files = Vec::new();

        while let Some(field) = multipart.next_field().await? {
            let name = field.name().unwrap_or_default().to_string();
            let content_type = field.content_type().map(ToString::to_string);

            let filename = field.file_name().map(str::to_string);

            match filename {
                Some(filename) => {
                    let data = field.bytes().await?;
                    debug!(field = %name, %filename, bytes = data.len(), "decoded file part");
                    files.push(FilePart {
                        field: name,
                        filename,
                        content_type,
                        data,
                    });
                }
                None => {
                    let text = field.text().await?;
                    fields.insert(name, Value::String(text));
                }
            }
        }

        Ok(Body {
            fields: Value::Object(fields),
            files,
        })
    }
}

fn has_essence(content_type: &str, expected: &str) -> bool {
    content_type
        .split(';')
        .next()
        .is_some_and(|essence| essence.trim().eq_ignore_ascii_case(expected))
}

/// Parses a buffered body as JSON, falling back to URL-encoded form data.
///
/// A body declared as a form is always handed to the form parser; any
/// other body must look like one first.
fn parse_buffered(raw: &[u8], declared_form: bool) -> Result<Body, DecodeError> {
    if let Ok(value) = serde_json::from_slice::<Value>(raw) {
        return Ok(Body::from_fields(value));
    }

    if declared_form || is_form_urlencoded(raw) {
        let fields: Map<String, Value> = url::form_urlencoded::parse(raw)
            .into_owned()
            .map(|(k, v)| (k, Value::String(v)))
            .collect();
        return Ok(Body::from_fields(Value::Object(fields)));
    }

    Err(DecodeError::Malformed)
}

/// Whether `raw` is UTF-8 text using only the URL-encoded form alphabet.
///
/// Percent signs must introduce a two-digit hex escape. Brackets and
/// non-ASCII characters are accepted as browsers and query-string
/// libraries send them raw.
fn is_form_urlencoded(raw: &[u8]) -> bool {
    if std::str::from_utf8(raw).is_err() {
        return false;
    }

    let mut i = 0;
    while i < raw.len() {
        match raw[i] {
            b'%' => {
                let escape = raw.get(i + 1..i + 3);
                if !escape.is_some_and(|hex| hex.iter().all(u8::is_ascii_hexdigit)) {
                    return false;
                }
                i += 3;
                continue;
            }
            b if b.is_ascii_alphanumeric() || !b.is_ascii() => {}
            b'-' | b'.' | b'_' | b'~' | b'+' | b'=' | b'&' | b'!' | b'$' | b'\'' | b'('
            | b')' | b'*' | b',' | b';' | b'/' | b':' | b'?' | b'@' | b'[' | b']' => {}
            _ => return false,
        }
        i += 1;
    }
    true
}
