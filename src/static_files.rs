use crate::http::HttpResponse;
use std::path::{Component, Path, PathBuf};
use tracing::debug;

pub fn content_type_for(path: &Path) -> &'static str {
    match path.extension().and_then(|e| e.to_str()).map(|e| e.to_ascii_lowercase()).as_deref() {
        Some("html") | Some("htm") => "text/html; charset=utf-8",
        Some("js") | Some("mjs") => "application/javascript; charset=utf-8",
        Some("css") => "text/css; charset=utf-8",
        Some("json") => "application/json; charset=utf-8",
        Some("svg") => "image/svg+xml",
        Some("png") => "image/png",
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("webp") => "image/webp",
        Some("ico") => "image/x-icon",
        Some("txt") => "text/plain; charset=utf-8",
        _ => "application/octet-stream",
    }
}

/// URL path → soubor pod `root`. None pro cokoliv, co by vylezlo ven (`..`, absolutní cesty).
pub fn resolve_static_path(root: &Path, url_path: &str) -> Option<PathBuf> {
    let trimmed = url_path.trim_start_matches('/');
    let relative = if trimmed.is_empty() { "index.html" } else { trimmed };

    let mut out = root.to_path_buf();
    for component in Path::new(relative).components() {
        match component {
            Component::Normal(part) => out.push(part),
            Component::CurDir => {}
            _ => return None,
        }
    }
    Some(out)
}

pub async fn serve_static(root: &Path, url_path: &str) -> HttpResponse {
    let Some(mut path) = resolve_static_path(root, url_path) else {
        return HttpResponse::text(404, "not found");
    };

    if tokio::fs::metadata(&path).await.map(|m| m.is_dir()).unwrap_or(false) {
        path.push("index.html");
    }

    match tokio::fs::read(&path).await {
        Ok(bytes) => HttpResponse::bytes(200, content_type_for(&path), bytes),
        Err(e) => {
            debug!("static {:?}: {}", path, e);
            HttpResponse::text(404, "not found")
        }
    }
}
