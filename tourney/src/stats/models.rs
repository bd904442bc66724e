//! Player statistic models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::tournament::TournamentId;
use crate::users::UserId;

/// Aggregate record of one player in one tournament
///
/// Derived from completed matches and replaced wholesale on recomputation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Statistic {
    pub player_id: UserId,
    pub tournament_id: TournamentId,
    pub wins: u32,
    pub losses: u32,
    pub sets_won: u32,
    pub sets_lost: u32,
    pub games_won: u32,
    pub games_lost: u32,
    /// `None` until at least one match has been decided
    pub win_percentage: Option<f64>,
    pub updated_at: DateTime<Utc>,
}

impl Statistic {
    /// Matches decided either way
    pub fn matches_played(&self) -> u32 {
        self.wins + self.losses
    }
}

/// Win percentage in 0..=100, `None` when nothing has been played
pub fn win_percentage(wins: u32, losses: u32) -> Option<f64> {
    let played = wins + losses;
    if played == 0 {
        None
    } else {
        Some(f64::from(wins) / f64::from(played) * 100.0)
    }
}
