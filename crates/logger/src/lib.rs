/// DotaDash: Logger
/// JSONL event stream (jeden soubor na den)

use anyhow::Result;
use chrono::Utc;
use serde::Serialize;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::PathBuf;

pub struct EventLogger {
    log_dir: PathBuf,
}

impl EventLogger {
    pub fn new(log_dir: impl Into<PathBuf>) -> Self {
        let dir = log_dir.into();
        fs::create_dir_all(&dir).ok();
        Self { log_dir: dir }
    }

    pub fn log<T: Serialize>(&self, event: &T) -> Result<()> {
        let date  = Utc::now().format("%Y-%m-%d").to_string();
        let path  = self.log_dir.join(format!("{date}.jsonl"));
        let line  = serde_json::to_string(event)?;
        let mut f = OpenOptions::new().create(true).append(true).open(&path)?;
        writeln!(f, "{line}")?;
        Ok(())
    }
}

pub fn now_iso() -> String {
    Utc::now().to_rfc3339()
}

// ── Event typy ────────────────────────────────────────────────────────────────

/// Výsledek jednoho upstream volání (OpenDota / Liquipedia)
#[derive(Serialize, Debug)]
pub struct ApiStatusEvent {
    pub ts:          String,
    pub event:       &'static str,   // "API_STATUS"
    pub source:      String,         // "opendota" | "liquipedia"
    pub scope:       String,         // path nebo "matches_page"
    pub ok:          bool,
    pub status_code: Option<u16>,
    pub attempts:    u32,
    pub message:     String,
    pub items:       usize,
}

#[derive(Serialize, Debug)]
pub struct RefreshCycleEvent {
    pub ts:              String,
    pub event:           &'static str,   // "REFRESH_CYCLE"
    pub kind:            String,         // "full" | "live"
    pub teams:           usize,
    pub failed_fetches:  usize,
    pub upcoming_items:  usize,
    pub live_items:      usize,
    pub duration_ms:     u64,
}
