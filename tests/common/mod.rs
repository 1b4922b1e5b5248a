#![allow(dead_code)]

use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use dota_dash::{Config, DashState};
use liquipedia_scraper::LiquipediaScraper;
use opendota_client::OpenDotaClient;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use reqwest::Url;
use tokio::net::TcpListener;

pub const SPIRIT: u64 = 7119388;
pub const LIQUID: u64 = 2163;
pub const FALCONS: u64 = 9247354;

/// Fake OpenDota + Liquipedia na jednom portu
pub struct FakeUpstream {
    pub base_url:   String,
    pub wiki_url:   String,
    /// Origin pro obrázky (image proxy ho dostane místo liquipedia.net)
    pub origin:     String,
    pub now:        i64,
    hits:           Arc<Mutex<Vec<String>>>,
}

impl FakeUpstream {
    pub fn hits(&self, path: &str) -> usize {
        self.hits.lock().unwrap().iter().filter(|p| p.as_str() == path).count()
    }
}

fn wiki_html(now: i64) -> String {
    let fragment = |left: &str, right: &str, ts: i64, bo: u8, tournament: &str| {
        format!(
            r#"<table class="wikitable infobox_matches_content"><tr>
<td class="team-left"><span data-highlightingclass="{left}"><img alt="{left}" src="/commons/images/{left}.png"></span></td>
<td class="versus"><abbr title="Best of {bo}">Bo{bo}</abbr></td>
<td class="team-right"><span data-highlightingclass="{right}"></span></td></tr>
<tr><td class="match-filler"><span class="timer-object" data-timestamp="{ts}"></span><a href="/dota2/{tournament}" title="{tournament}">{tournament}</a></td></tr></table>"#
        )
    };
    format!(
        "<html><body>{}{}{}</body></html>",
        fragment("Team Spirit", "Team Falcons", now + 3600, 3, "BLAST_Slam"),
        fragment("Aurora Gaming", "Nigma Galaxy", now + 7200, 2, "PGL"),
        fragment("Team Liquid", "OG", now - 86_400, 3, "Old_Cup"),
    )
}

fn team_info(id: u64) -> String {
    match id {
        SPIRIT => r#"{"team_id": 7119388, "name": "Team Spirit", "tag": "TSpirit", "wins": 600, "losses": 300, "rating": 1512.5}"#.to_string(),
        _ => format!(r#"{{"team_id": {id}, "name": "Team {id}", "wins": 10, "losses": 10}}"#),
    }
}

fn team_matches(id: u64) -> String {
    match id {
        SPIRIT => r#"[
            {"match_id": 7001, "start_time": 1759000000, "leagueid": 99, "league_name": "PGL Wallachia", "radiant": true, "radiant_win": false, "opposing_team_id": 2163, "opposing_team_name": "Team Liquid"},
            {"match_id": 8001, "start_time": 1760000000, "leagueid": 100, "league_name": "BLAST Slam IV", "radiant": true, "radiant_win": true, "duration": 2400, "opposing_team_id": 9247354, "opposing_team_name": "Team Falcons"},
            {"match_id": 8002, "start_time": 1760003600, "leagueid": 100, "league_name": "BLAST Slam IV", "radiant": false, "radiant_win": false, "duration": 2100, "opposing_team_id": 9247354, "opposing_team_name": "Team Falcons"}
        ]"#.to_string(),
        _ => "[]".to_string(),
    }
}

fn team_players(id: u64) -> String {
    match id {
        SPIRIT => r#"[{"account_id": 1, "name": "Yatoro", "games_played": 300, "wins": 200, "is_current_team_member": true},
                      {"account_id": 99, "name": "OldGuy", "is_current_team_member": false}]"#.to_string(),
        LIQUID => r#"[{"account_id": 77, "name": "Nisha", "is_current_team_member": true},
                      {"account_id": 78, "name": "Retired", "is_current_team_member": false}]"#.to_string(),
        _ => "[]".to_string(),
    }
}

const MATCH_8002: &str = r#"{"match_id": 8002, "start_time": 1760003600, "radiant_win": false, "players": [
    {"account_id": 11, "player_slot": 0, "hero_id": 1, "personaname": "r1"},
    {"account_id": 12, "player_slot": 1, "hero_id": 2, "personaname": "r2"},
    {"account_id": 1, "player_slot": 128, "hero_id": 8, "personaname": "yatoro_smurf"},
    {"account_id": 2, "player_slot": 129, "hero_id": 74, "personaname": "larl"},
    {"account_id": 5, "player_slot": 130, "hero_id": 86, "name": null, "personaname": "miposhka"},
    {"account_id": null, "player_slot": 131, "hero_id": 20}
]}"#;

const PRO_PLAYERS: &str = r#"[
    {"account_id": 1, "name": "Yatoro", "team_id": 7119388},
    {"account_id": 2, "name": "Larl", "team_id": 7119388},
    {"account_id": 77, "name": "Nisha", "team_id": 2163}
]"#;

const HERO_STATS: &str = r#"[{"id": 1, "name": "npc_dota_hero_antimage", "localized_name": "Anti-Mage", "primary_attr": "agi", "roles": ["Carry"], "pro_pick": 50, "pro_win": 27, "1_pick": 100}]"#;

const LIVE_FIRST: &str = r#"[
    {"match_id": "9001", "league_id": 100, "team_id_radiant": 7119388, "team_name_radiant": "Team Spirit", "team_id_dire": 9247354, "team_name_dire": "Team Falcons", "spectators": 100},
    {"match_id": 9002, "league_id": 0, "spectators": 5000},
    {"match_id": 9003, "league_id": 200, "team_id_radiant": 1, "spectators": 900}
]"#;

const LIVE_LATER: &str = r#"[{"match_id": 9004, "league_id": 300, "team_id_dire": 2163, "spectators": 42}]"#;

pub const IMAGE_BYTES: &str = "PNG-BYTES";

fn respond(path: &str, now: i64, live_calls: &AtomicUsize, flaky_calls: &AtomicUsize) -> (u16, &'static str, String) {
    let json = "application/json";
    let segments: Vec<&str> = path.trim_matches('/').split('/').collect();

    match segments.as_slice() {
        ["wiki", ..] => (200, "text/html; charset=utf-8", wiki_html(now)),
        ["commons", "images", "logo.png"] => (200, "image/png", IMAGE_BYTES.to_string()),
        ["commons", "images", "page.png"] => (200, "text/html; charset=utf-8", "<html></html>".to_string()),
        ["commons", "images", "broken.png"] => (500, "text/plain", "boom".to_string()),
        ["commons", "images", "flaky.png"] => {
            if flaky_calls.fetch_add(1, Ordering::SeqCst) == 0 {
                (200, "image/png", IMAGE_BYTES.to_string())
            } else {
                (503, "text/plain", "down".to_string())
            }
        }
        ["api", "teams", id] if *id == LIQUID.to_string() => (500, json, "{}".to_string()),
        ["api", "teams", id] => (200, json, team_info(id.parse().unwrap_or(0))),
        ["api", "teams", id, "matches"] => (200, json, team_matches(id.parse().unwrap_or(0))),
        ["api", "teams", id, "players"] => (200, json, team_players(id.parse().unwrap_or(0))),
        ["api", "teams", _, "heroes"] => (200, json, r#"[{"hero_id": 1, "localized_name": "Anti-Mage", "games_played": 10, "wins": 7}]"#.to_string()),
        ["api", "heroStats"] => (200, json, HERO_STATS.to_string()),
        ["api", "proPlayers"] => (200, json, PRO_PLAYERS.to_string()),
        ["api", "live"] => {
            let body = if live_calls.fetch_add(1, Ordering::SeqCst) == 0 { LIVE_FIRST } else { LIVE_LATER };
            (200, json, body.to_string())
        }
        ["api", "matches", "8002"] => (200, json, MATCH_8002.to_string()),
        ["api", "players", "500", "heroes"] => (500, json, "{}".to_string()),
        ["api", "players", _, "heroes"] => (
            200,
            json,
            r#"[{"hero_id": "86", "games": 40, "win": 25, "last_played": 1760000000}, {"hero_id": 1, "games": 0}]"#.to_string(),
        ),
        _ => (404, json, r#"{"error": "Not Found"}"#.to_string()),
    }
}

pub async fn spawn_upstream() -> FakeUpstream {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let now = chrono::Utc::now().timestamp();
    let hits = Arc::new(Mutex::new(Vec::new()));
    let live_calls = Arc::new(AtomicUsize::new(0));
    let flaky_calls = Arc::new(AtomicUsize::new(0));

    let hits_srv = Arc::clone(&hits);
    tokio::spawn(async move {
        loop {
            let Ok((mut stream, _)) = listener.accept().await else { break };
            let hits = Arc::clone(&hits_srv);
            let live_calls = Arc::clone(&live_calls);
            let flaky_calls = Arc::clone(&flaky_calls);
            tokio::spawn(async move {
                let mut buf = Vec::new();
                let mut chunk = [0u8; 2048];
                while let Ok(n) = stream.read(&mut chunk).await {
                    if n == 0 {
                        break;
                    }
                    buf.extend_from_slice(&chunk[..n]);
                    if buf.windows(4).any(|w| w == b"\r\n\r\n") {
                        break;
                    }
                }
                let head = String::from_utf8_lossy(&buf).to_string();
                let target = head.split_whitespace().nth(1).unwrap_or("/").to_string();
                let path = target.split('?').next().unwrap_or("/").to_string();
                hits.lock().unwrap().push(path.clone());

                let (status, content_type, body) = respond(&path, now, &live_calls, &flaky_calls);
                let resp = format!(
                    "HTTP/1.1 {status} X\r\nContent-Type: {content_type}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                    body.len(),
                    body
                );
                let _ = stream.write_all(resp.as_bytes()).await;
            });
        }
    });

    FakeUpstream {
        base_url: format!("http://{addr}/api"),
        wiki_url: format!("http://{addr}/wiki/Liquipedia:Matches"),
        origin: format!("http://{addr}"),
        now,
        hits,
    }
}

pub fn temp_dir(tag: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("dota-dash-{tag}-{}", std::process::id()));
    std::fs::create_dir_all(&dir).unwrap();
    dir
}

pub fn state_for(upstream: &FakeUpstream, tag: &str) -> DashState {
    let dir = temp_dir(tag);
    let static_dir = dir.join("public");
    std::fs::create_dir_all(&static_dir).unwrap();
    std::fs::write(static_dir.join("index.html"), "<!doctype html><title>DotaDash</title>").unwrap();
    std::fs::write(static_dir.join("app.js"), "console.log('dash');").unwrap();
    std::fs::write(static_dir.join("team logos.css"), ".logo {}").unwrap();

    let config = Config {
        port: 0,
        api_key: None,
        opendota_base_url: upstream.base_url.clone(),
        liquipedia_url: upstream.wiki_url.clone(),
        refresh_interval: Duration::from_secs(600),
        live_refresh_interval: Duration::from_secs(60),
        player_heroes_ttl: Duration::from_secs(600),
        image_ttl: Duration::from_secs(600),
        static_dir,
        log_dir: dir.join("logs"),
    };

    let opendota = OpenDotaClient::new(&config.log_dir, config.opendota_base_url.clone(), None)
        .with_retry_delay(Duration::from_millis(5));
    let wiki = LiquipediaScraper::new(&config.log_dir, config.liquipedia_url.clone())
        .with_image_origin(Url::parse(&upstream.origin).unwrap());
    DashState::with_clients(config, opendota, wiki)
}
