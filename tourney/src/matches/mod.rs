//! Matches: sides, scores, scheduling and results.

pub mod manager;
pub mod models;

pub use manager::MatchManager;
pub use models::{
    MAX_GAMES_PER_SET, MAX_SETS, Match, MatchId, MatchStatus, NewMatch, Score, SetScore, Side,
    SideIndex,
};
