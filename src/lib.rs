//! DotaDash: osobní Dota 2 esports dashboard
//!
//! OpenDota (týmy, zápasy, hrdinové) + Liquipedia (rozpis zápasů) → in-memory snapshot
//! → JSON API + statický frontend.

pub mod cache;
pub mod config;
pub mod http;
pub mod refresh;
pub mod series;
pub mod snapshot;
pub mod state;
pub mod static_files;
pub mod teams;

pub use config::Config;
pub use state::DashState;
