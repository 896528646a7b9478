use std::{
    io,
    path::{Component, Path, PathBuf},
};

use tokio::io::{AsyncWrite, AsyncWriteExt};
use tracing::debug;

use crate::dto::http::{NOT_FOUND_BODY, not_found_head, ok_head};

const INDEX_PATH: &str = "/index.html";

/// A file resolved from the web root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Asset {
    /// MIME type derived from the extension.
    pub content_type: &'static str,
    /// File contents.
    pub body: Vec<u8>,
}

/// Serves the spectator UI bundle for plain (non-upgrade) requests.
#[derive(Debug, Clone)]
pub struct StaticAssets {
    root: PathBuf,
}

impl StaticAssets {
    /// Serve files below `root`.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Resolve a request target to a file, or `None` when nothing servable exists.
    pub async fn resolve(&self, target: &str) -> Option<Asset> {
        let relative = sanitize(target)?;
        let path = self.root.join(&relative);
        match tokio::fs::read(&path).await {
            Ok(body) => Some(Asset {
                content_type: content_type(&relative),
                body,
            }),
            Err(err) => {
                debug!(path = %path.display(), error = %err, "asset not found");
                None
            }
        }
    }

    /// Write a complete response for `target` to `writer`.
    pub async fn respond<W>(&self, writer: &mut W, target: &str) -> io::Result<()>
    where
        W: AsyncWrite + Unpin,
    {
        match self.resolve(target).await {
            Some(asset) => {
                writer
                    .write_all(ok_head(asset.content_type, asset.body.len()).as_bytes())
                    .await?;
                writer.write_all(&asset.body).await?;
            }
            None => {
                writer.write_all(not_found_head().as_bytes()).await?;
                writer.write_all(NOT_FOUND_BODY.as_bytes()).await?;
            }
        }
        writer.flush().await
    }
}

/// Map a request target onto a relative path below the web root.
///
/// Drops the query string, maps `/` to the index page and refuses anything
/// that is not a plain descending path.
fn sanitize(target: &str) -> Option<PathBuf> {
    let path = target.split(['?', '#']).next().unwrap_or_default();
    let path = if path.is_empty() || path == "/" {
        INDEX_PATH
    } else {
        path
    };

    let mut relative = PathBuf::new();
    for component in Path::new(path.trim_start_matches('/')).components() {
        match component {
            Component::Normal(part) => relative.push(part),
            Component::CurDir => {}
            _ => return None,
        }
    }
    (!relative.as_os_str().is_empty()).then_some(relative)
}

/// MIME type for a file, keyed by extension.
pub fn content_type(path: &Path) -> &'static str {
    let extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_ascii_lowercase);
    match extension.as_deref() {
        Some("html") => "text/html",
        Some("css") => "text/css",
        Some("js") => "application/javascript",
        Some("json") => "application/json",
        Some("png") => "image/png",
        Some("jpg" | "jpeg") => "image/jpeg",
        Some("gif") => "image/gif",
        Some("ico") => "image/x-icon",
        Some("svg") => "image/svg+xml",
        Some("webmanifest") => "application/manifest+json",
        Some("txt") => "text/plain",
        _ => "application/octet-stream",
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use super::*;

    fn web_root() -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("index.html"), "<h1>board</h1>").unwrap();
        fs::create_dir(dir.path().join("css")).unwrap();
        fs::write(dir.path().join("css/app.css"), "body{}").unwrap();
        dir
    }

    #[test]
    fn content_types_by_extension() {
        assert_eq!(content_type(Path::new("a.html")), "text/html");
        assert_eq!(content_type(Path::new("a.JPEG")), "image/jpeg");
        assert_eq!(content_type(Path::new("site.webmanifest")), "application/manifest+json");
        assert_eq!(content_type(Path::new("blob")), "application/octet-stream");
    }

    #[test]
    fn sanitize_rejects_traversal() {
        assert_eq!(sanitize("/"), Some(PathBuf::from("index.html")));
        assert_eq!(sanitize(""), Some(PathBuf::from("index.html")));
        assert_eq!(sanitize("/css/app.css?v=2"), Some(PathBuf::from("css/app.css")));
        assert_eq!(sanitize("/../secrets.py"), None);
        assert_eq!(sanitize("/css/../../etc/passwd"), None);
    }

    #[tokio::test]
    async fn root_serves_index() {
        let dir = web_root();
        let assets = StaticAssets::new(dir.path());
        let asset = assets.resolve("/").await.unwrap();
        assert_eq!(asset.content_type, "text/html");
        assert_eq!(asset.body, b"<h1>board</h1>");
    }

    #[tokio::test]
    async fn respond_writes_ok_response() {
        let dir = web_root();
        let assets = StaticAssets::new(dir.path());
        let mut out = Vec::new();
        assets.respond(&mut out, "/css/app.css").await.unwrap();

        let text = String::from_utf8(out).unwrap();
        assert!(text.starts_with("HTTP/1.1 200 OK\r\n"));
        assert!(text.contains("Content-Type: text/css\r\n"));
        assert!(text.contains("Content-Length: 6\r\n"));
        assert!(text.ends_with("\r\n\r\nbody{}"));
    }

    #[tokio::test]
    async fn respond_writes_not_found() {
        let dir = web_root();
        let assets = StaticAssets::new(dir.path());
        let mut out = Vec::new();
        assets.respond(&mut out, "/missing.js").await.unwrap();

        let text = String::from_utf8(out).unwrap();
        assert!(text.starts_with("HTTP/1.1 404 Not Found\r\n"));
        assert!(text.ends_with(NOT_FOUND_BODY));
    }
}
