//! HTTP front door: minimální HTTP/1.1 nad TcpListener
//!
//!   GET /api/data               → snapshot JSON | 503
//!   GET /api/player/:id/heroes  → hrdinové hráče (TTL cache)
//!   GET /api/img?url=           → proxy obrázků z liquipedia.net
//!   GET /api/refresh            → spustí full refresh na pozadí
//!   GET /*                      → statické soubory z STATIC_DIR

use crate::cache::CachedImage;
use crate::refresh::{trigger_refresh, RefreshOutcome};
use crate::state::DashState;
use crate::static_files::serve_static;
use anyhow::{Context, Result};
use reqwest::Url;
use serde::Serialize;
use serde_json::json;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::time::timeout;
use tracing::{debug, info, warn};

const MAX_REQUEST_HEAD: usize = 16 * 1024;
const REQUEST_HEAD_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status:       u16,
    pub content_type: String,
    pub headers:      Vec<(&'static str, String)>,
    pub body:         Vec<u8>,
}

impl HttpResponse {
    pub fn bytes(status: u16, content_type: &str, body: Vec<u8>) -> Self {
        Self { status, content_type: content_type.to_string(), headers: Vec::new(), body }
    }

    pub fn text(status: u16, body: &str) -> Self {
        Self::bytes(status, "text/plain; charset=utf-8", body.as_bytes().to_vec())
    }

    pub fn json<T: Serialize>(status: u16, value: &T) -> Self {
        let body = serde_json::to_vec(value).unwrap_or_else(|_| b"{}".to_vec());
        Self::bytes(status, "application/json; charset=utf-8", body)
    }

    pub fn error(status: u16, msg: &str) -> Self {
        Self::json(status, &json!({ "error": msg }))
    }

    pub fn with_header(mut self, name: &'static str, value: impl Into<String>) -> Self {
        self.headers.push((name, value.into()));
        self
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn to_http_bytes(&self) -> Vec<u8> {
        let mut head = format!(
            "HTTP/1.1 {} {}\r\nContent-Type: {}\r\nContent-Length: {}\r\nConnection: close\r\n",
            self.status,
            reason_phrase(self.status),
            self.content_type,
            self.body.len()
        );
        for (name, value) in &self.headers {
            head.push_str(&format!("{name}: {value}\r\n"));
        }
        head.push_str("\r\n");

        let mut out = head.into_bytes();
        out.extend_from_slice(&self.body);
        out
    }
}

fn reason_phrase(status: u16) -> &'static str {
    match status {
        200 => "OK",
        202 => "Accepted",
        400 => "Bad Request",
        403 => "Forbidden",
        404 => "Not Found",
        405 => "Method Not Allowed",
        502 => "Bad Gateway",
        503 => "Service Unavailable",
        _ => "Internal Server Error",
    }
}

/// (method, path + query) → odpověď. Bez socketu, ať jde testovat.
pub async fn route(state: &DashState, method: &str, target: &str) -> HttpResponse {
    let Ok(url) = Url::parse(&format!("http://localhost{target}")) else {
        return HttpResponse::error(400, "bad request target");
    };

    if method != "GET" {
        return HttpResponse::error(405, "only GET is supported");
    }

    let segments: Vec<&str> = url
        .path_segments()
        .map(|s| s.filter(|p| !p.is_empty()).collect())
        .unwrap_or_default();

    match segments.as_slice() {
        ["api", "data"] => handle_data(state).await,
        ["api", "refresh"] => handle_refresh(state),
        ["api", "img"] => {
            let src = url
                .query_pairs()
                .find(|(k, _)| k == "url")
                .map(|(_, v)| v.into_owned());
            handle_image(state, src).await
        }
        ["api", "player", id, "heroes"] => handle_player_heroes(state, id).await,
        ["api", ..] => HttpResponse::error(404, "unknown api route"),
        _ => match urlencoding::decode(url.path()) {
            Ok(path) => serve_static(&state.config.static_dir, &path).await,
            Err(_) => HttpResponse::error(400, "path is not valid UTF-8"),
        },
    }
}

async fn handle_data(state: &DashState) -> HttpResponse {
    match state.current_snapshot().await {
        Some(snapshot) => HttpResponse::json(200, snapshot.as_ref()),
        None => HttpResponse::error(503, "data not loaded yet"),
    }
}

fn handle_refresh(state: &DashState) -> HttpResponse {
    match trigger_refresh(state) {
        RefreshOutcome::AlreadyRunning => HttpResponse::json(202, &json!({ "status": "already_running" })),
        _ => {
            info!("Manual refresh triggered");
            HttpResponse::json(202, &json!({ "status": "started" }))
        }
    }
}

async fn handle_player_heroes(state: &DashState, raw_id: &str) -> HttpResponse {
    let Ok(account_id) = raw_id.parse::<u64>() else {
        return HttpResponse::error(400, "player id must be numeric");
    };
    if account_id == 0 {
        return HttpResponse::error(400, "player id must be numeric");
    }

    let api = Arc::clone(&state.opendota);
    let lookup = state
        .player_heroes
        .get_or_fetch(account_id, move |id| async move {
            let heroes = api.player_heroes(id).await?;
            Ok::<_, anyhow::Error>(Arc::new(heroes.into_iter().filter(|h| h.games > 0).collect::<Vec<_>>()))
        })
        .await;

    match lookup {
        Ok((heroes, status)) => {
            HttpResponse::json(200, heroes.as_ref()).with_header("X-Cache", status.as_header())
        }
        Err(e) => {
            warn!("player {} heroes failed: {:#}", account_id, e);
            HttpResponse::error(502, "could not fetch player heroes")
        }
    }
}

async fn handle_image(state: &DashState, src: Option<String>) -> HttpResponse {
    let Some(src) = src.filter(|s| !s.is_empty()) else {
        return HttpResponse::error(400, "missing url parameter");
    };
    if !state.wiki.allows_image(&src) {
        return HttpResponse::error(403, "only liquipedia.net images are proxied");
    }

    let wiki = Arc::clone(&state.wiki);
    let lookup = state
        .images
        .get_or_fetch(src.clone(), move |url| async move {
            let (bytes, content_type) = wiki.fetch_image(&url).await?;
            Ok::<_, anyhow::Error>(CachedImage { bytes: Arc::new(bytes), content_type })
        })
        .await;

    match lookup {
        Ok((image, status)) => HttpResponse::bytes(200, &image.content_type, image.bytes.as_ref().clone())
            .with_header("Cache-Control", "public, max-age=86400")
            .with_header("X-Cache", status.as_header()),
        Err(e) => {
            warn!("image proxy {} failed: {:#}", src, e);
            HttpResponse::error(502, "could not fetch image")
        }
    }
}

/// Přečte hlavičku requestu (body nás u GET nezajímá)
async fn read_request_head(stream: &mut TcpStream) -> Result<Option<String>> {
    let mut buf = Vec::with_capacity(1024);
    let mut chunk = [0u8; 2048];

    loop {
        let n = stream.read(&mut chunk).await.context("http read")?;
        if n == 0 {
            break;
        }
        buf.extend_from_slice(&chunk[..n]);
        if buf.windows(4).any(|w| w == b"\r\n\r\n") || buf.len() >= MAX_REQUEST_HEAD {
            break;
        }
    }

    if buf.is_empty() {
        return Ok(None);
    }
    Ok(Some(String::from_utf8_lossy(&buf).to_string()))
}

/// Klient, který nedošle hlavičku do `limit`, dostane zavřené spojení
async fn read_request_head_within(stream: &mut TcpStream, limit: Duration) -> Result<Option<String>> {
    match timeout(limit, read_request_head(stream)).await {
        Ok(head) => head,
        Err(_) => Err(anyhow::anyhow!("request head timed out after {:?}", limit)),
    }
}

async fn handle_http_connection(mut stream: TcpStream, state: DashState) -> Result<()> {
    let Some(req) = read_request_head_within(&mut stream, REQUEST_HEAD_TIMEOUT).await? else {
        return Ok(());
    };

    let first_line = req.lines().next().unwrap_or_default();
    let mut parts = first_line.split_whitespace();
    let method = parts.next().unwrap_or("");
    let target = parts.next().unwrap_or("");

    let resp = route(&state, method, target).await;
    debug!("{} {} → {}", method, target, resp.status);

    stream.write_all(&resp.to_http_bytes()).await.context("http write")?;
    stream.shutdown().await.ok();
    Ok(())
}

pub async fn serve(listener: TcpListener, state: DashState) -> Result<()> {
    loop {
        let (stream, peer) = listener.accept().await.context("http accept")?;
        let state = state.clone();
        tokio::spawn(async move {
            if let Err(e) = handle_http_connection(stream, state).await {
                debug!("http handler err {}: {}", peer, e);
            }
        });
    }
}

pub async fn start_http_server(state: DashState, bind: SocketAddr) -> Result<()> {
    let listener = TcpListener::bind(bind).await.context(format!("http bind {bind}"))?;
    info!("dota-dash listening on http://{}", bind);
    serve(listener, state).await
}
