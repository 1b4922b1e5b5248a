//! Refresh orchestrace
//!
//!   full: každých REFRESH_INTERVAL_SECS - týmy (info/matches/players/heroes) + heroStats
//!         + live + proPlayers + Liquipedia, vše paralelně; pak detaily posledních zápasů
//!   live: každých LIVE_REFRESH_INTERVAL_SECS - jen /live, přepíše live část snapshotu
//!
//! Chybějící data = prázdný default + warn, cyklus nikdy nepadá.

use crate::snapshot::{
    build_roster, most_recent_match, pro_name_map, select_live_games, Snapshot, TeamSnapshot,
};
use crate::state::{DashState, RefreshGuard};
use crate::teams::{resolve_team_name, TRACKED_TEAMS};
use anyhow::Result;
use chrono::Utc;
use futures_util::future::join_all;
use logger::{now_iso, RefreshCycleEvent};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::time::{interval, MissedTickBehavior};
use tracing::{info, warn};

/// Jak dlouho po startu ještě ukazujeme zápas z Liquipedie
pub const UPCOMING_PAST_WINDOW_SECS: i64 = 3 * 3600;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshOutcome {
    Completed,
    Started,
    AlreadyRunning,
}

/// Err → default + započítat chybu
fn or_default<T: Default>(res: Result<T>, what: &str, failed: &mut usize) -> T {
    match res {
        Ok(v) => v,
        Err(e) => {
            warn!("{} failed: {:#}", what, e);
            *failed += 1;
            T::default()
        }
    }
}

fn or_none<T>(res: Result<T>, what: &str, failed: &mut usize) -> Option<T> {
    match res {
        Ok(v) => Some(v),
        Err(e) => {
            warn!("{} failed: {:#}", what, e);
            *failed += 1;
            None
        }
    }
}

/// Full refresh v aktuálním tasku (čeká na dokončení)
pub async fn refresh_full(state: &DashState) -> RefreshOutcome {
    match state.try_begin_refresh() {
        Some(guard) => {
            run_full_refresh(state, guard).await;
            RefreshOutcome::Completed
        }
        None => {
            info!("Full refresh already running, skipping");
            RefreshOutcome::AlreadyRunning
        }
    }
}

/// Manuální trigger - spustí refresh na pozadí a hned vrátí
pub fn trigger_refresh(state: &DashState) -> RefreshOutcome {
    match state.try_begin_refresh() {
        Some(guard) => {
            let state = state.clone();
            tokio::spawn(async move {
                run_full_refresh(&state, guard).await;
            });
            RefreshOutcome::Started
        }
        None => RefreshOutcome::AlreadyRunning,
    }
}

async fn run_full_refresh(state: &DashState, _guard: RefreshGuard) {
    let started = Instant::now();
    let api = state.opendota.as_ref();
    let now = Utc::now().timestamp();
    info!("--- Full refresh ({} teams) ---", TRACKED_TEAMS.len());

    let team_fetches = TRACKED_TEAMS.iter().map(|team| async move {
        let (info, matches, players, heroes) = tokio::join!(
            api.team(team.id),
            api.team_matches(team.id),
            api.team_players(team.id),
            api.team_heroes(team.id),
        );
        (team, info, matches, players, heroes)
    });

    let (teams_raw, hero_stats, live, pros, upcoming) = tokio::join!(
        join_all(team_fetches),
        api.hero_stats(),
        api.live(),
        api.pro_players(),
        state.wiki.fetch_upcoming(resolve_team_name, now, UPCOMING_PAST_WINDOW_SECS),
    );

    let mut failed = 0usize;
    let hero_stats = or_default(hero_stats, "heroStats", &mut failed);
    let live = or_default(live, "live", &mut failed);
    let pros = or_default(pros, "proPlayers", &mut failed);
    let upcoming = or_default(upcoming, "Liquipedia matches", &mut failed);
    let pro_names = pro_name_map(&pros);

    let teams_raw: Vec<_> = teams_raw
        .into_iter()
        .map(|(team, info, matches, players, heroes)| {
            let info = or_none(info, &format!("team {} info", team.name), &mut failed);
            let matches = or_default(matches, &format!("team {} matches", team.name), &mut failed);
            let players = or_default(players, &format!("team {} players", team.name), &mut failed);
            let heroes = or_default(heroes, &format!("team {} heroes", team.name), &mut failed);
            (team, info, matches, players, heroes)
        })
        .collect();

    // Druhá vlna: detail posledního zápasu každého týmu → sestava
    let detail_fetches = teams_raw.iter().map(|(_, _, matches, _, _)| {
        let recent = most_recent_match(matches).map(|m| m.match_id);
        async move {
            match recent {
                Some(match_id) => Some(api.match_details(match_id).await),
                None => None,
            }
        }
    });
    let details = join_all(detail_fetches).await;

    let mut teams = Vec::with_capacity(teams_raw.len());
    for ((team, info, matches, players, heroes), detail) in teams_raw.into_iter().zip(details) {
        let detail = detail.and_then(|res| or_none(res, &format!("team {} last match", team.name), &mut failed));
        let roster = build_roster(most_recent_match(&matches), detail.as_ref(), &pro_names, &players);
        teams.push(TeamSnapshot::build(team, info, matches, roster, heroes));
    }

    let live_games = select_live_games(live);
    let ts = now_iso();
    let snapshot = Snapshot {
        updated_at: ts.clone(),
        live_updated_at: ts,
        teams,
        hero_stats,
        live_games,
        upcoming,
        failed_fetches: failed,
    };

    let (team_count, upcoming_items, live_items) =
        (snapshot.teams.len(), snapshot.upcoming.len(), snapshot.live_games.len());
    *state.snapshot.write().await = Some(Arc::new(snapshot));

    let duration_ms = started.elapsed().as_millis() as u64;
    info!(
        "Full refresh done in {}ms: teams={}, upcoming={}, live={}, failed_fetches={}",
        duration_ms, team_count, upcoming_items, live_items, failed
    );
    let _ = state.logger.log(&RefreshCycleEvent {
        ts: now_iso(),
        event: "REFRESH_CYCLE",
        kind: "full".to_string(),
        teams: team_count,
        failed_fetches: failed,
        upcoming_items,
        live_items,
        duration_ms,
    });
}

/// Jen /live. Bez snapshotu nebo při chybě nic nemění. Vrací počet live her.
pub async fn refresh_live(state: &DashState) -> Option<usize> {
    let started = Instant::now();
    let live = match state.opendota.live().await {
        Ok(live) => live,
        Err(e) => {
            warn!("Live refresh failed: {:#}", e);
            return None;
        }
    };
    let live_games = select_live_games(live);
    let live_items = live_games.len();

    {
        let mut slot = state.snapshot.write().await;
        let next = match slot.as_ref() {
            Some(current) => current.with_live(live_games, now_iso()),
            None => return None,
        };
        *slot = Some(Arc::new(next));
    }

    let _ = state.logger.log(&RefreshCycleEvent {
        ts: now_iso(),
        event: "REFRESH_CYCLE",
        kind: "live".to_string(),
        teams: 0,
        failed_fetches: 0,
        upcoming_items: 0,
        live_items,
        duration_ms: started.elapsed().as_millis() as u64,
    });
    Some(live_items)
}

/// Dva timery: full (první tick hned po startu) a rychlý live
pub fn spawn_schedules(state: DashState) {
    let full_every = state.config.refresh_interval.max(Duration::from_secs(1));
    let live_every = state.config.live_refresh_interval.max(Duration::from_secs(1));
    info!("Refresh cadence: full every {:?}, live every {:?}", full_every, live_every);

    {
        let state = state.clone();
        tokio::spawn(async move {
            let mut ticker = interval(full_every);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                refresh_full(&state).await;
            }
        });
    }

    tokio::spawn(async move {
        let mut ticker = interval(live_every);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // první tick je okamžitý; live data po startu přinese full refresh
        ticker.tick().await;
        loop {
            ticker.tick().await;
            if state.is_refreshing() {
                continue;
            }
            if let Some(n) = refresh_live(&state).await {
                info!("Live refresh: {} games", n);
            }
        }
    });
}
