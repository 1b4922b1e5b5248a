//! Seskupení zápasů do sérií a sérií do lig
//!
//! Série = po sobě jdoucí hry proti stejnému soupeři ve stejné lize,
//! mezi starty sousedních her max SERIES_GAP_SECS. Z výsledků se odhadne BoN.

use opendota_client::TeamMatch;
use serde::Serialize;

pub const SERIES_GAP_SECS: i64 = 3 * 3600;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Series {
    pub opponent_id:   Option<u64>,
    pub opponent_name: Option<String>,
    pub opponent_logo: Option<String>,
    pub league_id:     u32,
    pub league_name:   Option<String>,
    /// Start první hry
    pub start_time:    i64,
    /// Start poslední hry
    pub end_time:      i64,
    pub wins:          u32,
    pub losses:        u32,
    pub best_of:       u8,
    /// Chronologicky
    pub match_ids:     Vec<u64>,
}

impl Series {
    fn from_match(m: &TeamMatch) -> Self {
        let mut series = Self {
            opponent_id:   m.opposing_team_id,
            opponent_name: m.opposing_team_name.clone(),
            opponent_logo: m.opposing_team_logo.clone(),
            league_id:     m.leagueid,
            league_name:   m.league_name.clone(),
            start_time:    m.start_time,
            end_time:      m.start_time,
            wins:          0,
            losses:        0,
            best_of:       1,
            match_ids:     Vec::new(),
        };
        series.push_older(m);
        series
    }

    /// Přidá starší hru (zápasy jdou od nejnovějšího)
    fn push_older(&mut self, m: &TeamMatch) {
        match m.won() {
            Some(true) => self.wins += 1,
            Some(false) => self.losses += 1,
            None => {}
        }
        self.start_time = self.start_time.min(m.start_time);
        self.end_time = self.end_time.max(m.start_time);
        self.match_ids.insert(0, m.match_id);
        self.best_of = infer_best_of(self.wins, self.losses, self.match_ids.len());
    }

    fn accepts(&self, m: &TeamMatch) -> bool {
        self.league_id == m.leagueid
            && same_opponent(self, m)
            && self.start_time - m.start_time <= SERIES_GAP_SECS
    }

    pub fn won(&self) -> bool {
        self.wins > self.losses
    }
}

fn same_opponent(series: &Series, m: &TeamMatch) -> bool {
    match (series.opponent_id, m.opposing_team_id) {
        (Some(a), Some(b)) => a == b,
        (None, None) => series.opponent_name.is_some() && series.opponent_name == m.opposing_team_name,
        _ => false,
    }
}

/// 1 hra → Bo1, 1:1 ve dvou hrách → Bo2, jinak nejmenší liché N, které sedí na skóre
pub fn infer_best_of(wins: u32, losses: u32, games: usize) -> u8 {
    let games = games.min(u8::MAX as usize) as u8;
    if games <= 1 {
        return 1;
    }
    if games == 2 && wins == 1 && losses == 1 {
        return 2;
    }
    let leader = wins.max(losses).min(64) as u8;
    let from_score = (2 * leader).saturating_sub(1);
    let best_of = from_score.max(games);
    if best_of % 2 == 0 { best_of + 1 } else { best_of }
}

/// Série od nejnovější
pub fn group_series(matches: &[TeamMatch]) -> Vec<Series> {
    let mut sorted: Vec<&TeamMatch> = matches.iter().collect();
    sorted.sort_by(|a, b| b.start_time.cmp(&a.start_time).then(b.match_id.cmp(&a.match_id)));

    let mut out: Vec<Series> = Vec::new();
    for m in sorted {
        match out.last_mut() {
            Some(current) if current.accepts(m) => current.push_older(m),
            _ => out.push(Series::from_match(m)),
        }
    }
    out
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LeagueGroup {
    pub league_id:   u32,
    pub league_name: Option<String>,
    pub series:      Vec<Series>,
}

/// Ligy seřazené podle nejnovější série
pub fn group_leagues(series: Vec<Series>) -> Vec<LeagueGroup> {
    let mut out: Vec<LeagueGroup> = Vec::new();
    for s in series {
        match out.iter_mut().find(|g| g.league_id == s.league_id) {
            Some(group) => {
                if group.league_name.is_none() {
                    group.league_name = s.league_name.clone();
                }
                group.series.push(s);
            }
            None => out.push(LeagueGroup {
                league_id: s.league_id,
                league_name: s.league_name.clone(),
                series: vec![s],
            }),
        }
    }
    out
}
