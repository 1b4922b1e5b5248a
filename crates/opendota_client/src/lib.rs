/// DotaDash: OpenDota client
///
/// Typovaný klient nad https://api.opendota.com/api
///   - týmy: /teams/{id}, /teams/{id}/matches, /teams/{id}/players, /teams/{id}/heroes
///   - globální: /heroStats, /live, /proPlayers
///   - detail: /matches/{id}, /players/{id}/heroes
///
/// Retry: 3 pokusy, lineární pauza (attempt × retry_delay). 404 se neopakuje.

use anyhow::{anyhow, Result};
use logger::{ApiStatusEvent, EventLogger, now_iso};
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, warn};

pub const DEFAULT_BASE_URL: &str = "https://api.opendota.com/api";
pub const MAX_ATTEMPTS: u32 = 3;

// ── API structs ──────────────────────────────────────────────────────────────

#[derive(Serialize, Deserialize, Debug, Clone, Default)]
#[serde(default)]
pub struct TeamInfo {
    pub team_id:         u64,
    pub rating:          Option<f64>,
    pub wins:            u32,
    pub losses:          u32,
    pub last_match_time: Option<i64>,
    pub name:            Option<String>,
    pub tag:             Option<String>,
    pub logo_url:        Option<String>,
}

#[derive(Serialize, Deserialize, Debug, Clone, Default)]
#[serde(default)]
pub struct TeamMatch {
    pub match_id:           u64,
    pub radiant_win:        Option<bool>,
    /// true = tým hrál za Radiant
    pub radiant:            Option<bool>,
    pub duration:           u32,
    pub start_time:         i64,
    pub leagueid:           u32,
    pub league_name:        Option<String>,
    pub cluster:            Option<u32>,
    pub opposing_team_id:   Option<u64>,
    pub opposing_team_name: Option<String>,
    pub opposing_team_logo: Option<String>,
}

impl TeamMatch {
    /// Vyhrál sledovaný tým? None pokud chybí strana nebo výsledek.
    pub fn won(&self) -> Option<bool> {
        match (self.radiant, self.radiant_win) {
            (Some(side), Some(radiant_win)) => Some(side == radiant_win),
            _ => None,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Default)]
#[serde(default)]
pub struct TeamPlayer {
    pub account_id:             u64,
    pub name:                   Option<String>,
    pub games_played:           u32,
    pub wins:                   u32,
    pub is_current_team_member: Option<bool>,
}

#[derive(Serialize, Deserialize, Debug, Clone, Default)]
#[serde(default)]
pub struct TeamHero {
    pub hero_id:        u32,
    pub localized_name: Option<String>,
    pub games_played:   u32,
    pub wins:           u32,
}

#[derive(Serialize, Deserialize, Debug, Clone, Default)]
#[serde(default)]
pub struct HeroStat {
    pub id:             u32,
    pub name:           String,
    pub localized_name: String,
    pub primary_attr:   Option<String>,
    pub attack_type:    Option<String>,
    pub roles:          Vec<String>,
    pub img:            Option<String>,
    pub icon:           Option<String>,
    pub pro_pick:       Option<u32>,
    pub pro_win:        Option<u32>,
    pub pro_ban:        Option<u32>,
}

#[derive(Serialize, Deserialize, Debug, Clone, Default)]
#[serde(default)]
pub struct LiveGame {
    // /live vrací match_id i jako string
    #[serde(deserialize_with = "lenient_u64")]
    pub match_id:          u64,
    pub league_id:         u32,
    pub team_name_radiant: Option<String>,
    pub team_name_dire:    Option<String>,
    pub team_id_radiant:   Option<u64>,
    pub team_id_dire:      Option<u64>,
    pub radiant_score:     u32,
    pub dire_score:        u32,
    pub radiant_lead:      Option<i64>,
    pub game_time:         i64,
    pub spectators:        u32,
    pub average_mmr:       Option<u32>,
    pub activate_time:     Option<i64>,
}

#[derive(Serialize, Deserialize, Debug, Clone, Default)]
#[serde(default)]
pub struct ProPlayer {
    pub account_id:   u64,
    pub name:         Option<String>,
    pub personaname:  Option<String>,
    pub team_id:      Option<u64>,
    pub team_name:    Option<String>,
    pub country_code: Option<String>,
}

#[derive(Serialize, Deserialize, Debug, Clone, Default)]
#[serde(default)]
pub struct MatchDetails {
    pub match_id:    u64,
    pub start_time:  i64,
    pub radiant_win: Option<bool>,
    pub players:     Vec<MatchPlayer>,
}

#[derive(Serialize, Deserialize, Debug, Clone, Default)]
#[serde(default)]
pub struct MatchPlayer {
    pub account_id:  Option<u64>,
    pub player_slot: u32,
    pub hero_id:     u32,
    pub name:        Option<String>,
    pub personaname: Option<String>,
    #[serde(rename = "isRadiant")]
    pub is_radiant:  Option<bool>,
}

impl MatchPlayer {
    /// Sloty 0-4 Radiant, 128-132 Dire
    pub fn on_radiant(&self) -> bool {
        self.is_radiant.unwrap_or(self.player_slot < 128)
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Default)]
#[serde(default)]
pub struct PlayerHero {
    #[serde(deserialize_with = "lenient_u64")]
    pub hero_id:       u64,
    pub last_played:   i64,
    pub games:         u32,
    pub win:           u32,
    pub with_games:    u32,
    pub with_win:      u32,
    pub against_games: u32,
    pub against_win:   u32,
}

fn lenient_u64<'de, D>(deserializer: D) -> std::result::Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(match value {
        serde_json::Value::Number(n) => n.as_u64().unwrap_or(0),
        serde_json::Value::String(s) => s.trim().parse().unwrap_or(0),
        _ => 0,
    })
}

// ── OpenDotaClient ───────────────────────────────────────────────────────────

pub struct OpenDotaClient {
    client:      reqwest::Client,
    logger:      EventLogger,
    base_url:    String,
    api_key:     Option<String>,   // None = free tier
    retry_delay: Duration,
}

impl OpenDotaClient {
    pub fn new(
        log_dir:  impl Into<PathBuf>,
        base_url: impl Into<String>,
        api_key:  Option<String>,
    ) -> Self {
        Self {
            client: reqwest::Client::builder()
                .user_agent("dota-dash/0.1")
                .timeout(Duration::from_secs(15))
                .build()
                .unwrap_or_else(|_| reqwest::Client::new()),
            logger:      EventLogger::new(log_dir),
            base_url:    base_url.into().trim_end_matches('/').to_string(),
            api_key:     api_key.filter(|k| !k.trim().is_empty()),
            retry_delay: Duration::from_secs(1),
        }
    }

    pub fn with_retry_delay(mut self, retry_delay: Duration) -> Self {
        self.retry_delay = retry_delay;
        self
    }

    pub async fn team(&self, team_id: u64) -> Result<TeamInfo> {
        self.get_json(&format!("/teams/{team_id}")).await
    }

    pub async fn team_matches(&self, team_id: u64) -> Result<Vec<TeamMatch>> {
        self.get_json(&format!("/teams/{team_id}/matches")).await
    }

    pub async fn team_players(&self, team_id: u64) -> Result<Vec<TeamPlayer>> {
        self.get_json(&format!("/teams/{team_id}/players")).await
    }

    pub async fn team_heroes(&self, team_id: u64) -> Result<Vec<TeamHero>> {
        self.get_json(&format!("/teams/{team_id}/heroes")).await
    }

    pub async fn hero_stats(&self) -> Result<Vec<HeroStat>> {
        self.get_json("/heroStats").await
    }

    pub async fn live(&self) -> Result<Vec<LiveGame>> {
        self.get_json("/live").await
    }

    pub async fn pro_players(&self) -> Result<Vec<ProPlayer>> {
        self.get_json("/proPlayers").await
    }

    pub async fn match_details(&self, match_id: u64) -> Result<MatchDetails> {
        self.get_json(&format!("/matches/{match_id}")).await
    }

    pub async fn player_heroes(&self, account_id: u64) -> Result<Vec<PlayerHero>> {
        self.get_json(&format!("/players/{account_id}/heroes")).await
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let url = format!("{}{}", self.base_url, path);
        let mut last_error = String::new();
        let mut last_status: Option<u16> = None;

        for attempt in 1..=MAX_ATTEMPTS {
            let mut req = self.client.get(&url);
            if let Some(key) = &self.api_key {
                req = req.query(&[("api_key", key.as_str())]);
            }

            match req.send().await {
                Ok(resp) => {
                    let status = resp.status();
                    last_status = Some(status.as_u16());

                    if status.is_success() {
                        match resp.json::<T>().await {
                            Ok(body) => {
                                debug!("OpenDota {} ok (attempt {})", path, attempt);
                                return Ok(body);
                            }
                            Err(e) => last_error = format!("decode failed: {e}"),
                        }
                    } else if status == StatusCode::NOT_FOUND {
                        // 404 se neopakuje, tým/hráč neexistuje
                        self.log_api_error(path, last_status, attempt, "not found");
                        return Err(anyhow!("OpenDota {path}: HTTP 404"));
                    } else {
                        last_error = format!("HTTP {status}");
                    }
                }
                Err(e) => last_error = e.to_string(),
            }

            if attempt < MAX_ATTEMPTS {
                let delay = self.retry_delay * attempt;
                warn!(
                    "OpenDota {} attempt {}/{} failed: {} (retry in {:?})",
                    path, attempt, MAX_ATTEMPTS, last_error, delay
                );
                sleep(delay).await;
            }
        }

        self.log_api_error(path, last_status, MAX_ATTEMPTS, &last_error);
        Err(anyhow!(
            "OpenDota {path} failed after {MAX_ATTEMPTS} attempts: {last_error}"
        ))
    }

    fn log_api_error(&self, path: &str, status_code: Option<u16>, attempts: u32, msg: &str) {
        let _ = self.logger.log(&ApiStatusEvent {
            ts: now_iso(),
            event: "API_STATUS",
            source: "opendota".to_string(),
            scope: path.to_string(),
            ok: false,
            status_code,
            attempts,
            message: msg.to_string(),
            items: 0,
        });
    }
}
