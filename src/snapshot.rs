//! Snapshot: jedna kompletní výměna cache po refresh cyklu

use crate::series::{group_leagues, group_series, LeagueGroup};
use crate::teams::{is_tracked, TrackedTeam};
use liquipedia_scraper::UpcomingMatch;
use opendota_client::{
    HeroStat, LiveGame, MatchDetails, ProPlayer, TeamHero, TeamInfo, TeamMatch, TeamPlayer,
};
use serde::Serialize;
use std::collections::HashMap;

/// Kolik posledních zápasů držíme na tým
pub const MATCH_HISTORY_LIMIT: usize = 100;

#[derive(Debug, Clone, Serialize)]
pub struct Snapshot {
    pub updated_at:      String,
    pub live_updated_at: String,
    pub teams:           Vec<TeamSnapshot>,
    pub hero_stats:      Vec<HeroStat>,
    pub live_games:      Vec<LiveGameView>,
    pub upcoming:        Vec<UpcomingMatch>,
    pub failed_fetches:  usize,
}

impl Snapshot {
    /// Kopie s novými live hrami (zbytek beze změny)
    pub fn with_live(&self, live_games: Vec<LiveGameView>, live_updated_at: String) -> Self {
        Self {
            live_games,
            live_updated_at,
            ..self.clone()
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct TeamSnapshot {
    pub team:    &'static TrackedTeam,
    pub info:    Option<TeamInfo>,
    pub matches: Vec<TeamMatch>,
    pub roster:  Vec<RosterPlayer>,
    pub heroes:  Vec<TeamHero>,
    pub leagues: Vec<LeagueGroup>,
}

impl TeamSnapshot {
    pub fn build(
        team:    &'static TrackedTeam,
        info:    Option<TeamInfo>,
        mut matches: Vec<TeamMatch>,
        roster:  Vec<RosterPlayer>,
        heroes:  Vec<TeamHero>,
    ) -> Self {
        sort_recent_first(&mut matches);
        matches.truncate(MATCH_HISTORY_LIMIT);
        let leagues = group_leagues(group_series(&matches));

        Self { team, info, matches, roster, heroes, leagues }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RosterPlayer {
    pub account_id: u64,
    pub name:       String,
    /// Hrdina z posledního zápasu (None u fallback sestavy)
    pub hero_id:    Option<u32>,
}

#[derive(Debug, Clone, Serialize)]
pub struct LiveGameView {
    #[serde(flatten)]
    pub game:             LiveGame,
    pub tracked_team_ids: Vec<u64>,
}

pub fn sort_recent_first(matches: &mut [TeamMatch]) {
    matches.sort_by(|a, b| b.start_time.cmp(&a.start_time).then(b.match_id.cmp(&a.match_id)));
}

pub fn most_recent_match(matches: &[TeamMatch]) -> Option<&TeamMatch> {
    matches
        .iter()
        .max_by(|a, b| a.start_time.cmp(&b.start_time).then(a.match_id.cmp(&b.match_id)))
}

/// account_id → pro jméno (jen neprázdná jména)
pub fn pro_name_map(pros: &[ProPlayer]) -> HashMap<u64, String> {
    pros.iter()
        .filter_map(|p| {
            let name = p.name.as_deref()?.trim();
            (!name.is_empty()).then(|| (p.account_id, name.to_string()))
        })
        .collect()
}

/// Sestava z hráčů na straně týmu v posledním zápase.
/// Bez detailu zápasu → aktuální členové z /teams/{id}/players.
pub fn build_roster(
    recent:     Option<&TeamMatch>,
    details:    Option<&MatchDetails>,
    pro_names:  &HashMap<u64, String>,
    fallback:   &[TeamPlayer],
) -> Vec<RosterPlayer> {
    if let (Some(recent), Some(details)) = (recent, details) {
        if let Some(side) = recent.radiant {
            let roster: Vec<RosterPlayer> = details
                .players
                .iter()
                .filter(|p| p.on_radiant() == side)
                .filter_map(|p| {
                    let account_id = p.account_id.filter(|id| *id > 0)?;
                    let name = pro_names
                        .get(&account_id)
                        .cloned()
                        .or_else(|| p.name.clone().filter(|n| !n.trim().is_empty()))
                        .or_else(|| p.personaname.clone())
                        .unwrap_or_else(|| account_id.to_string());
                    Some(RosterPlayer { account_id, name, hero_id: Some(p.hero_id) })
                })
                .collect();

            if !roster.is_empty() {
                return roster;
            }
        }
    }

    fallback
        .iter()
        .filter(|p| p.is_current_team_member.unwrap_or(false))
        .map(|p| RosterPlayer {
            account_id: p.account_id,
            name: pro_names
                .get(&p.account_id)
                .cloned()
                .or_else(|| p.name.clone())
                .unwrap_or_else(|| p.account_id.to_string()),
            hero_id: None,
        })
        .collect()
}

/// Jen ligové hry (league_id > 0), nejsledovanější první
pub fn select_live_games(games: Vec<LiveGame>) -> Vec<LiveGameView> {
    let mut out: Vec<LiveGameView> = games
        .into_iter()
        .filter(|g| g.league_id > 0)
        .map(|game| {
            let tracked_team_ids = [game.team_id_radiant, game.team_id_dire]
                .into_iter()
                .flatten()
                .filter(|id| is_tracked(*id))
                .collect();
            LiveGameView { game, tracked_team_ids }
        })
        .collect();

    out.sort_by(|a, b| b.game.spectators.cmp(&a.game.spectators));
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use opendota_client::MatchPlayer;

    fn player(account_id: u64, slot: u32, hero_id: u32, personaname: &str) -> MatchPlayer {
        MatchPlayer {
            account_id: Some(account_id),
            player_slot: slot,
            hero_id,
            personaname: Some(personaname.to_string()),
            ..MatchPlayer::default()
        }
    }

    fn details() -> MatchDetails {
        MatchDetails {
            match_id: 10,
            players: vec![
                player(1, 0, 11, "r1"),
                player(2, 1, 12, "r2"),
                player(3, 128, 13, "d1"),
                player(4, 129, 14, "d2"),
            ],
            ..MatchDetails::default()
        }
    }

    #[test]
    fn roster_takes_team_side_and_prefers_pro_names() {
        let recent = TeamMatch { match_id: 10, radiant: Some(false), ..TeamMatch::default() };
        let pros = pro_name_map(&[
            ProPlayer { account_id: 3, name: Some("Collapse".into()), ..ProPlayer::default() },
            ProPlayer { account_id: 4, name: Some("  ".into()), ..ProPlayer::default() },
        ]);

        let roster = build_roster(Some(&recent), Some(&details()), &pros, &[]);
        assert_eq!(
            roster,
            vec![
                RosterPlayer { account_id: 3, name: "Collapse".into(), hero_id: Some(13) },
                RosterPlayer { account_id: 4, name: "d2".into(), hero_id: Some(14) },
            ]
        );
    }

    #[test]
    fn roster_falls_back_to_current_members() {
        let fallback = vec![
            TeamPlayer { account_id: 7, name: Some("Nisha".into()), is_current_team_member: Some(true), ..TeamPlayer::default() },
            TeamPlayer { account_id: 8, name: Some("Old".into()), is_current_team_member: Some(false), ..TeamPlayer::default() },
        ];
        let roster = build_roster(None, None, &HashMap::new(), &fallback);
        assert_eq!(roster, vec![RosterPlayer { account_id: 7, name: "Nisha".into(), hero_id: None }]);

        // neznámá strana → taky fallback
        let recent = TeamMatch { match_id: 10, radiant: None, ..TeamMatch::default() };
        let roster = build_roster(Some(&recent), Some(&details()), &HashMap::new(), &fallback);
        assert_eq!(roster.len(), 1);
    }

    #[test]
    fn live_games_filter_and_sort() {
        let games = vec![
            LiveGame { match_id: 1, league_id: 0, spectators: 9000, ..LiveGame::default() },
            LiveGame { match_id: 2, league_id: 5, spectators: 10, team_id_dire: Some(2163), ..LiveGame::default() },
            LiveGame { match_id: 3, league_id: 5, spectators: 500, team_id_radiant: Some(1), ..LiveGame::default() },
        ];
        let live = select_live_games(games);
        assert_eq!(live.iter().map(|g| g.game.match_id).collect::<Vec<_>>(), vec![3, 2]);
        assert!(live[0].tracked_team_ids.is_empty());
        assert_eq!(live[1].tracked_team_ids, vec![2163]);

        let json = serde_json::to_value(&live[1]).unwrap();
        assert_eq!(json["match_id"], 2);
        assert_eq!(json["tracked_team_ids"][0], 2163);
    }

    #[test]
    fn team_snapshot_trims_history_and_groups() {
        let matches: Vec<TeamMatch> = (0..150)
            .map(|i| TeamMatch {
                match_id: i,
                start_time: i as i64 * 86_400,
                leagueid: 1,
                opposing_team_id: Some(i),
                ..TeamMatch::default()
            })
            .collect();
        let snap = TeamSnapshot::build(&crate::teams::TRACKED_TEAMS[0], None, matches, vec![], vec![]);
        assert_eq!(snap.matches.len(), MATCH_HISTORY_LIMIT);
        assert_eq!(snap.matches[0].match_id, 149);
        assert_eq!(snap.leagues.len(), 1);
        assert_eq!(snap.leagues[0].series.len(), MATCH_HISTORY_LIMIT);
        assert_eq!(most_recent_match(&snap.matches).map(|m| m.match_id), Some(149));
    }
}
