//! Sledované týmy (statická konfigurace)

use liquipedia_scraper::normalize_name;
use serde::Serialize;

#[derive(Debug, Clone, Serialize)]
pub struct TrackedTeam {
    /// OpenDota team_id
    pub id:      u64,
    pub name:    &'static str,
    pub tag:     &'static str,
    /// Další jména, pod kterými tým vystupuje na Liquipedii
    pub aliases: &'static [&'static str],
}

pub const TRACKED_TEAMS: &[TrackedTeam] = &[
    TrackedTeam { id: 7119388, name: "Team Spirit",       tag: "TSpirit", aliases: &["Spirit"] },
    TrackedTeam { id: 2163,    name: "Team Liquid",       tag: "Liquid",  aliases: &[] },
    TrackedTeam { id: 8291895, name: "Tundra Esports",    tag: "Tundra",  aliases: &[] },
    TrackedTeam { id: 8599101, name: "Gaimin Gladiators", tag: "GG",      aliases: &["Gladiators"] },
    TrackedTeam { id: 9247354, name: "Team Falcons",      tag: "Falcons", aliases: &[] },
    TrackedTeam { id: 8255888, name: "BetBoom Team",      tag: "BB",      aliases: &["BetBoom"] },
    TrackedTeam { id: 2586976, name: "OG",                tag: "OG",      aliases: &[] },
];

impl TrackedTeam {
    pub fn matches_name(&self, candidate: &str) -> bool {
        let candidate = normalize_name(candidate);
        if candidate.is_empty() {
            return false;
        }
        std::iter::once(self.name)
            .chain(std::iter::once(self.tag))
            .chain(self.aliases.iter().copied())
            .any(|n| normalize_name(n) == candidate)
    }
}

/// Jméno z wiki → id sledovaného týmu
pub fn resolve_team_name(name: &str) -> Option<u64> {
    TRACKED_TEAMS.iter().find(|t| t.matches_name(name)).map(|t| t.id)
}

pub fn is_tracked(team_id: u64) -> bool {
    TRACKED_TEAMS.iter().any(|t| t.id == team_id)
}
