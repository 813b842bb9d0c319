//! HTTP response sink with write-once semantics.

use std::collections::HashMap;

use tracing::error;

use crate::error::{Result, RouterError};

/// An HTTP response being built by handlers.
///
/// Status and headers may be changed freely until the response is sent.
/// Sending is terminal: any later write fails with
/// [`RouterError::ResponseAlreadySent`].
#[derive(Debug, Clone)]
pub struct Response {
    status: u16,
    headers: HashMap<String, String>,
    body: Vec<u8>,
    sent: bool,
}

impl Response {
    /// Creates an unsent response with status 200.
    pub fn new() -> Self {
        Self {
            status: 200,
            headers: HashMap::new(),
            body: Vec::new(),
            sent: false,
        }
    }

    /// Returns the status code.
    pub fn status(&self) -> u16 {
        self.status
    }

    /// Returns the response headers.
    pub fn headers(&self) -> &HashMap<String, String> {
        &self.headers
    }

    /// Gets a header value, ignoring case.
    pub fn header(&self, key: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(key))
            .map(|(_, v)| v.as_str())
    }

    /// Returns the body bytes.
    pub fn body(&self) -> &[u8] {
        &self.body
    }

    /// Returns the body as a string.
    pub fn body_string(&self) -> Option<String> {
        String::from_utf8(self.body.clone()).ok()
    }

    /// Returns true once the response has been sent.
    pub fn is_sent(&self) -> bool {
        self.sent
    }

    /// Sets the status code.
    pub fn set_status(&mut self, status: u16) -> Result<&mut Self> {
        self.ensure_unsent()?;
        self.status = status;
        Ok(self)
    }

    /// Sets a header, replacing any previous value.
    pub fn set_header(
        &mut self,
        key: impl Into<String>,
        value: impl Into<String>,
    ) -> Result<&mut Self> {
        self.ensure_unsent()?;
        self.headers.insert(key.into(), value.into());
        Ok(self)
    }

    /// Writes the body and sends the response.
    pub fn send(&mut self, body: impl Into<Vec<u8>>) -> Result<()> {
        self.ensure_unsent()?;
        self.body = body.into();
        self.sent = true;
        Ok(())
    }

    /// Sends the response with an empty body.
    pub fn end(&mut self) -> Result<()> {
        self.send(Vec::new())
    }

    /// Sends an empty 200 OK.
    pub fn success(&mut self) -> Result<()> {
        self.set_status(200)?.end()
    }

    /// Sends a 404 naming the requested path.
    pub fn not_found(&mut self, path: &str) -> Result<()> {
        self.set_status(404)?.send(format!("not found: {path}"))
    }

    /// Sends a 302 redirect.
    pub fn redirect(&mut self, url: impl Into<String>) -> Result<()> {
        self.set_status(302)?.set_header("Location", url)?.end()
    }

    /// Sends a JSON body with the current status.
    ///
    /// Falls back to a 500 if the value cannot be serialized.
    pub fn json<T: serde::Serialize>(&mut self, data: &T) -> Result<()> {
        match serde_json::to_vec(data) {
            Ok(body) => self
                .set_header("Content-Type", "application/json")?
                .send(body),
            Err(err) => {
                error!(error = %err, "failed to serialize JSON response");
                self.internal_server_error()
            }
        }
    }

    /// Sends an HTML body with the current status.
    pub fn html(&mut self, body: impl Into<String>) -> Result<()> {
        self.set_header("Content-Type", "text/html; charset=utf-8")?
            .send(body.into())
    }

    /// Sends a plain text body with the current status.
    pub fn text(&mut self, body: impl Into<String>) -> Result<()> {
        self.set_header("Content-Type", "text/plain; charset=utf-8")?
            .send(body.into())
    }

    /// Sends CSV data as a file attachment.
    pub fn csv(&mut self, filename: &str, data: impl Into<Vec<u8>>) -> Result<()> {
        self.set_header(
            "Content-Disposition",
            format!("attachment; filename={filename}"),
        )?
        .set_header("Content-Type", "text/csv")?
        .send(data)
    }

    /// Sends a generic 500.
    pub fn internal_server_error(&mut self) -> Result<()> {
        self.set_status(500)?.send("Internal Server Error")
    }

    /// Sends a plain text response on behalf of the dispatcher.
    ///
    /// Callers check [`Response::is_sent`] first.
    pub(crate) fn finalize(&mut self, status: u16, body: impl Into<String>) {
        debug_assert!(!self.sent, "dispatcher finalized a sent response");
        self.status = status;
        self.headers.insert(
            "Content-Type".to_string(),
            "text/plain; charset=utf-8".to_string(),
        );
        self.body = body.into().into_bytes();
        self.sent = true;
    }

    /// Asks the transport to close the connection after this response.
    ///
    /// Allowed after sending: it only affects the connection.
    pub fn close_connection(&mut self) {
        self.headers
            .insert("Connection".to_string(), "close".to_string());
    }

    /// Returns true if the connection should be closed after sending.
    pub fn closes_connection(&self) -> bool {
        self.header("connection")
            .is_some_and(|v| v.eq_ignore_ascii_case("close"))
    }

    /// Consumes the response into status, headers and body.
    pub fn into_parts(self) -> (u16, HashMap<String, String>, Vec<u8>) {
        (self.status, self.headers, self.body)
    }

    fn ensure_unsent(&self) -> Result<()> {
        if self.sent {
            return Err(RouterError::ResponseAlreadySent);
        }
        Ok(())
    }
}

impl Default for Response {
    fn default() -> Self {
        Self::new()
    }
}
