//! Serving files from a directory.

use std::path::{Component, Path, PathBuf};

use tracing::debug;

use crate::handler::{BoxFuture, Flow, Handler, HandlerResult};
use crate::request::Request;
use crate::response::Response;

/// A file read from disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StaticFile {
    /// File content.
    pub data: Vec<u8>,
    /// Content type inferred from the extension.
    pub content_type: &'static str,
}

/// Handler serving files below a root directory.
///
/// The file is looked up from a path parameter when one is configured
/// (e.g. `rest` for a `/assets/:rest*` route), otherwise from the full
/// request path. Missing files and any path containing `..` get a 404.
#[derive(Debug, Clone)]
pub struct StaticFiles {
    root: PathBuf,
    param: Option<String>,
}

impl StaticFiles {
    /// Serves files below `root`.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            param: None,
        }
    }

    /// Takes the relative file path from the named path parameter.
    #[must_use]
    pub fn from_param(mut self, name: impl Into<String>) -> Self {
        self.param = Some(name.into());
        self
    }

    /// Resolves a relative URL path below the root.
    ///
    /// Traversal attempts resolve to nothing without consulting the
    /// filesystem.
    pub fn resolve(&self, url_path: &str) -> Option<PathBuf> {
        if url_path.contains("..") {
            return None;
        }

        let mut path = self.root.clone();
        for component in Path::new(url_path.trim_start_matches('/')).components() {
            match component {
                Component::Normal(part) => path.push(part),
                Component::CurDir => {}
                _ => return None,
            }
        }
        Some(path)
    }

    /// Loads a file, or `None` if it does not exist or is not a file.
    pub async fn load(&self, url_path: &str) -> Option<StaticFile> {
        let path = self.resolve(url_path)?;
        let metadata = tokio::fs::metadata(&path).await.ok()?;
        if !metadata.is_file() {
            return None;
        }
        let data = tokio::fs::read(&path).await.ok()?;
        Some(StaticFile {
            data,
            content_type: content_type(&path),
        })
    }
}

impl Handler for StaticFiles {
    fn call<'a>(
        &'a self,
        req: &'a mut Request,
        res: &'a mut Response,
    ) -> BoxFuture<'a, HandlerResult> {
        Box::pin(async move {
            let url_path = match &self.param {
                Some(name) => req.params.get(name).unwrap_or_default(),
                None => req.path.as_str(),
            };

            match self.load(url_path).await {
                Some(file) => {
                    res.set_header("Content-Type", file.content_type)?
                        .send(file.data)?;
                }
                None => {
                    debug!(path = %req.path, "static file not found");
                    res.not_found(&req.path)?;
                }
            }
            Ok(Flow::Done)
        })
    }
}

/// Maps a file extension to a MIME type.
pub fn content_type(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|s| s.to_str())
        .unwrap_or("")
        .to_lowercase();
    match ext.as_str() {
        "html" | "htm" => "text/html",
        "css" => "text/css",
        "js" => "application/javascript",
        "json" => "application/json",
        "txt" => "text/plain",
        "svg" => "image/svg+xml",
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "ico" => "image/x-icon",
        _ => "application/octet-stream",
    }
}
