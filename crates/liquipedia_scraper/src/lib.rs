//! Liquipedia scraper pro Dota 2 rozpis zápasů
//!
//! Zdroj: https://liquipedia.net/dota2/Liquipedia:Matches
//!
//! Struktura jednoho zápasu (zkráceno):
//! <table class="wikitable wikitable-striped infobox_matches_content">
//!   <td class="team-left"> <span data-highlightingclass="Team Spirit"> <img src="/commons/..."> </td>
//!   <td class="versus"> <abbr title="Best of 3">Bo3</abbr> </td>
//!   <td class="team-right"> ... </td>
//!   <span class="timer-object" data-timestamp="1760900400">
//!   <div class="match-filler"> <a href="/dota2/BLAST/Slam/4" title="BLAST/Slam/4">BLAST Slam IV</a> </div>
//! </table>
//!
//! Žádný parser, jen regexy nad fragmenty. Rozbitý fragment se přeskočí.

use anyhow::{anyhow, Context, Result};
use logger::{ApiStatusEvent, EventLogger, now_iso};
use once_cell::sync::Lazy;
use regex::Regex;
use reqwest::Url;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::PathBuf;
use std::time::Duration;
use tracing::{debug, info, warn};

pub const DEFAULT_MATCHES_URL: &str = "https://liquipedia.net/dota2/Liquipedia:Matches";
pub const WIKI_ORIGIN: &str = "https://liquipedia.net";

/// Literal, podle kterého se HTML krájí na jednotlivé zápasy
pub const MATCH_MARKER: &str = "infobox_matches_content";

/// Liquipedia API policy vyžaduje popisný UA s kontaktem
const USER_AGENT: &str = "dota-dash/0.1 (personal dashboard; https://github.com/dota-dash)";

static RE_HIGHLIGHT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"data-highlightingclass="([^"]+)""#).unwrap());
static RE_TEAM_TEXT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"class="team-template-text"[^>]*>\s*<a\s[^>]*title="([^"]+)""#).unwrap()
});
static RE_IMG_SRC: Lazy<Regex> = Lazy::new(|| Regex::new(r#"<img[^>]*?\ssrc="([^"]+)""#).unwrap());
static RE_TIMESTAMP: Lazy<Regex> = Lazy::new(|| Regex::new(r#"data-timestamp="(\d+)""#).unwrap());
static RE_BEST_OF: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\bbo(\d{1,2})\b|best of (\d{1,2})").unwrap());
static RE_LINK: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"<a\s+href="(/dota2/[^"]+)"([^>]*)>([^<]*)</a>"#).unwrap());
static RE_TITLE: Lazy<Regex> = Lazy::new(|| Regex::new(r#"title="([^"]+)""#).unwrap());

/// Jeden naplánovaný (nebo právě hraný) zápas z Liquipedie
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UpcomingMatch {
    pub team1:            String,
    pub team1_logo:       Option<String>,
    pub team2:            String,
    pub team2_logo:       Option<String>,
    /// Unix sekundy (UTC)
    pub timestamp:        i64,
    pub best_of:          Option<u8>,
    pub tournament:       Option<String>,
    /// Relativní wiki cesta, např. "/dota2/BLAST/Slam/4"
    pub tournament_path:  Option<String>,
    /// Sledované týmy v zápase (doplní filter_upcoming)
    #[serde(default)]
    pub tracked_team_ids: Vec<u64>,
}

/// Lowercase, jen alfanumerické znaky oddělené mezerou
pub fn normalize_name(name: &str) -> String {
    name.to_lowercase()
        .chars()
        .map(|c| if c.is_alphanumeric() { c } else { ' ' })
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

fn decode_entities(raw: &str) -> String {
    raw.replace("&nbsp;", " ")
        .replace("&#160;", " ")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&#039;", "'")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&amp;", "&")
        .trim()
        .to_string()
}

/// Relativní / protocol-relative src → absolutní URL na liquipedia.net
pub fn absolutize(src: &str) -> String {
    if src.starts_with("http://") || src.starts_with("https://") {
        src.to_string()
    } else if let Some(rest) = src.strip_prefix("//") {
        format!("https://{rest}")
    } else if src.starts_with('/') {
        format!("{WIKI_ORIGIN}{src}")
    } else {
        format!("{WIKI_ORIGIN}/{src}")
    }
}

static WIKI_ORIGIN_URL: Lazy<Url> = Lazy::new(|| Url::parse(WIKI_ORIGIN).unwrap());

/// Stejné schéma, host i port jako `origin`
pub fn is_image_from(raw: &str, origin: &Url) -> bool {
    match Url::parse(raw) {
        Ok(url) => {
            url.scheme() == origin.scheme()
                && url.host_str() == origin.host_str()
                && url.port_or_known_default() == origin.port_or_known_default()
        }
        Err(_) => false,
    }
}

/// Jen https obrázky přímo z liquipedia.net (proxy nesmí být open relay)
pub fn is_wiki_image_url(raw: &str) -> bool {
    is_image_from(raw, &WIKI_ORIGIN_URL)
}

fn side_team(side: &str) -> Option<String> {
    RE_HIGHLIGHT
        .captures(side)
        .or_else(|| RE_TEAM_TEXT.captures(side))
        .map(|c| decode_entities(&c[1]))
        .filter(|name| !name.is_empty())
}

fn side_logo(side: &str) -> Option<String> {
    RE_IMG_SRC.captures(side).map(|c| absolutize(&c[1]))
}

fn parse_best_of(fragment: &str) -> Option<u8> {
    let caps = RE_BEST_OF.captures(fragment)?;
    caps.get(1)
        .or_else(|| caps.get(2))
        .and_then(|m| m.as_str().parse::<u8>().ok())
        .filter(|n| *n > 0)
}

fn parse_tournament(fragment: &str) -> (Option<String>, Option<String>) {
    // bez match-filler by poslední odkaz byl tým vpravo
    let Some(pos) = fragment.find("match-filler") else {
        return (None, None);
    };
    let section = &fragment[pos..];

    let last = RE_LINK
        .captures_iter(section)
        .filter(|c| !decode_entities(&c[3]).is_empty() || RE_TITLE.is_match(&c[2]))
        .last();

    match last {
        Some(c) => {
            let text = decode_entities(&c[3]);
            let name = if text.is_empty() {
                RE_TITLE.captures(&c[2]).map(|t| decode_entities(&t[1]))
            } else {
                Some(text)
            };
            (name, Some(c[1].to_string()))
        }
        None => (None, None),
    }
}

/// Jeden fragment → zápas. None = fragment nedává smysl, přeskočit.
fn parse_fragment(fragment: &str) -> Option<UpcomingMatch> {
    let split = fragment.find("class=\"team-right\"")?;
    let (left, rest) = fragment.split_at(split);
    // pravá strana končí s řádkem týmů, match-filler už patří turnaji
    let right_end = ["</tr>", "match-filler"]
        .iter()
        .filter_map(|m| rest.find(m))
        .min()
        .unwrap_or(rest.len());
    let right = &rest[..right_end];

    let timestamp = RE_TIMESTAMP.captures(fragment)?[1].parse::<i64>().ok()?;

    let team1 = side_team(left);
    let team2 = side_team(right);
    if team1.is_none() && team2.is_none() {
        return None;
    }

    let (tournament, tournament_path) = parse_tournament(rest);

    Some(UpcomingMatch {
        team1: team1.unwrap_or_else(|| "TBD".to_string()),
        team1_logo: side_logo(left),
        team2: team2.unwrap_or_else(|| "TBD".to_string()),
        team2_logo: side_logo(right),
        timestamp,
        best_of: parse_best_of(fragment),
        tournament,
        tournament_path,
        tracked_team_ids: Vec::new(),
    })
}

/// Rozseká stránku podle MATCH_MARKER a vytáhne všechny parsovatelné zápasy
pub fn parse_matches(html: &str) -> Vec<UpcomingMatch> {
    let mut fragments = html.split(MATCH_MARKER);
    fragments.next(); // vše před prvním markerem je hlavička stránky

    let mut out = Vec::new();
    let mut skipped = 0usize;
    for fragment in fragments {
        match parse_fragment(fragment) {
            Some(m) => out.push(m),
            None => skipped += 1,
        }
    }

    debug!("Liquipedia parse: {} matches, {} skipped fragments", out.len(), skipped);
    out
}

/// Nechá jen zápasy sledovaných týmů, budoucí nebo nedávno začaté.
///
/// `resolve` mapuje jméno týmu z wiki na id sledovaného týmu.
pub fn filter_upcoming<F>(
    matches: Vec<UpcomingMatch>,
    resolve: F,
    now: i64,
    past_window_secs: i64,
) -> Vec<UpcomingMatch>
where
    F: Fn(&str) -> Option<u64>,
{
    let cutoff = now - past_window_secs;
    let mut seen = HashSet::new();
    let mut out = Vec::new();

    for mut m in matches {
        if m.timestamp < cutoff {
            continue;
        }

        let ids: Vec<u64> = [resolve(&m.team1), resolve(&m.team2)]
            .into_iter()
            .flatten()
            .collect();
        if ids.is_empty() {
            continue;
        }

        let key = (normalize_name(&m.team1), normalize_name(&m.team2), m.timestamp);
        if !seen.insert(key) {
            continue;
        }

        m.tracked_team_ids = ids;
        out.push(m);
    }

    out.sort_by_key(|m| m.timestamp);
    out
}

pub struct LiquipediaScraper {
    client:       reqwest::Client,
    logger:       EventLogger,
    url:          String,
    image_origin: Url,
}

impl LiquipediaScraper {
    pub fn new(log_dir: impl Into<PathBuf>, url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::builder()
                .user_agent(USER_AGENT)
                .timeout(Duration::from_secs(10))
                .gzip(true)
                .build()
                .unwrap_or_else(|_| reqwest::Client::new()),
            logger:       EventLogger::new(log_dir),
            url:          url.into(),
            image_origin: WIKI_ORIGIN_URL.clone(),
        }
    }

    /// Odkud smí image proxy stahovat (default https://liquipedia.net)
    pub fn with_image_origin(mut self, origin: Url) -> Self {
        self.image_origin = origin;
        self
    }

    pub fn allows_image(&self, url: &str) -> bool {
        is_image_from(url, &self.image_origin)
    }

    /// Best-effort, bez retry
    pub async fn fetch_matches_html(&self) -> Result<String> {
        let resp = match self.client.get(&self.url).send().await {
            Ok(resp) => resp,
            Err(e) => {
                self.log_status(false, None, &e.to_string(), 0);
                return Err(e).context(format!("Liquipedia request failed for {}", self.url));
            }
        };

        let status = resp.status();
        if !status.is_success() {
            self.log_status(false, Some(status.as_u16()), &format!("http_{status}"), 0);
            return Err(anyhow!("Liquipedia HTTP {}", status));
        }

        match resp.text().await {
            Ok(html) => Ok(html),
            Err(e) => {
                self.log_status(false, Some(status.as_u16()), &e.to_string(), 0);
                Err(e).context("Liquipedia body read failed")
            }
        }
    }

    pub async fn fetch_upcoming<F>(&self, resolve: F, now: i64, past_window_secs: i64) -> Result<Vec<UpcomingMatch>>
    where
        F: Fn(&str) -> Option<u64>,
    {
        let html = self.fetch_matches_html().await?;
        let parsed = parse_matches(&html);
        let total = parsed.len();
        let upcoming = filter_upcoming(parsed, resolve, now, past_window_secs);

        info!("Liquipedia: {} matches on page, {} for tracked teams", total, upcoming.len());
        self.log_status(true, Some(200), "ok", upcoming.len());
        Ok(upcoming)
    }

    /// Stáhne obrázek z wiki (pro image proxy). Vrací (bytes, content-type).
    pub async fn fetch_image(&self, url: &str) -> Result<(Vec<u8>, String)> {
        if !self.allows_image(url) {
            return Err(anyhow!("refusing non-wiki image url {url}"));
        }

        let resp = self.client.get(url)
            .send()
            .await
            .context(format!("image request failed for {url}"))?;

        let status = resp.status();
        if !status.is_success() {
            warn!("Liquipedia image {} → HTTP {}", url, status);
            return Err(anyhow!("image HTTP {}", status));
        }

        let content_type = resp
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("application/octet-stream")
            .to_string();
        if !content_type.starts_with("image/") {
            return Err(anyhow!("unexpected content type {content_type} for {url}"));
        }

        let bytes = resp.bytes().await?.to_vec();
        Ok((bytes, content_type))
    }

    fn log_status(&self, ok: bool, status_code: Option<u16>, msg: &str, items: usize) {
        let _ = self.logger.log(&ApiStatusEvent {
            ts: now_iso(),
            event: "API_STATUS",
            source: "liquipedia".to_string(),
            scope: "matches_page".to_string(),
            ok,
            status_code,
            attempts: 1,
            message: msg.to_string(),
            items,
        });
    }
}
