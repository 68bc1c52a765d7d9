//! Serving files from a directory.

use std::path::{Component, Path, PathBuf};

use http::header::CONTENT_TYPE;
use http::StatusCode;

use crate::chain::{handler, Handler};

/// A handler that serves the file named by the `filepath` parameter from
/// `root`.
///
/// Paths that climb out of `root` and paths that are not regular files
/// get a bare 404.
pub fn serve_dir(root: PathBuf) -> Handler {
    handler(move |c| {
        let Some(path) = resolve(&root, c.param("filepath")) else {
            c.status(StatusCode::NOT_FOUND);
            return;
        };

        match std::fs::metadata(&path) {
            Ok(meta) if meta.is_file() => {}
            _ => {
                c.status(StatusCode::NOT_FOUND);
                return;
            }
        }

        match std::fs::read(&path) {
            Ok(bytes) => {
                c.set_header(CONTENT_TYPE.as_str(), content_type(&path));
                c.data(StatusCode::OK, bytes);
            }
            Err(e) => {
                tracing::debug!(path = %path.display(), error = %e, "static file unreadable");
                c.status(StatusCode::NOT_FOUND);
            }
        }
    })
}

/// Join `relative` onto `root`, refusing anything but plain components.
fn resolve(root: &Path, relative: &str) -> Option<PathBuf> {
    let mut path = root.to_path_buf();
    let mut pushed = false;
    for component in Path::new(relative).components() {
        match component {
            Component::Normal(part) => {
                path.push(part);
                pushed = true;
            }
            Component::CurDir => {}
            Component::ParentDir | Component::RootDir | Component::Prefix(_) => return None,
        }
    }
    pushed.then_some(path)
}

fn content_type(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase);
    match ext.as_deref() {
        Some("html" | "htm") => "text/html; charset=utf-8",
        Some("css") => "text/css; charset=utf-8",
        Some("js" | "mjs") => "text/javascript; charset=utf-8",
        Some("json") => "application/json",
        Some("txt") => "text/plain; charset=utf-8",
        Some("xml") => "application/xml",
        Some("svg") => "image/svg+xml",
        Some("png") => "image/png",
        Some("jpg" | "jpeg") => "image/jpeg",
        Some("gif") => "image/gif",
        Some("ico") => "image/x-icon",
        Some("webp") => "image/webp",
        Some("wasm") => "application/wasm",
        Some("pdf") => "application/pdf",
        _ => "application/octet-stream",
    }
}
