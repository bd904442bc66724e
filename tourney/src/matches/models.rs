//! Match data models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

use crate::tournament::TournamentId;
use crate::users::UserId;

/// Match ID type
pub type MatchId = i64;

/// One side of a match: a single player or a doubles pair
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "Vec<UserId>", into = "Vec<UserId>")]
pub struct Side(Vec<UserId>);

impl Side {
    pub fn singles(player: UserId) -> Self {
        Self(vec![player])
    }

    /// Doubles pair; the two players must differ
    pub fn doubles(first: UserId, second: UserId) -> Result<Self, String> {
        Self::try_from(vec![first, second])
    }

    pub fn players(&self) -> &[UserId] {
        &self.0
    }

    pub fn contains(&self, player: UserId) -> bool {
        self.0.contains(&player)
    }

    /// Whether no player appears on both sides
    pub fn is_disjoint(&self, other: &Side) -> bool {
        !self.0.iter().any(|p| other.contains(*p))
    }
}

impl TryFrom<Vec<UserId>> for Side {
    type Error = String;

    fn try_from(players: Vec<UserId>) -> Result<Self, Self::Error> {
        match players.as_slice() {
            [_] => Ok(Self(players)),
            [a, b] if a != b => Ok(Self(players)),
            [_, _] => Err("a doubles side needs two different players".to_string()),
            _ => Err(format!(
                "a side has one or two players, got {}",
                players.len()
            )),
        }
    }
}

impl From<Side> for Vec<UserId> {
    fn from(side: Side) -> Self {
        side.0
    }
}

/// Which side of a match
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SideIndex {
    First,
    Second,
}

impl SideIndex {
    pub fn opposite(self) -> Self {
        match self {
            SideIndex::First => SideIndex::Second,
            SideIndex::Second => SideIndex::First,
        }
    }
}

/// Match status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchStatus {
    Pending,
    Scheduled,
    InProgress,
    Completed,
    Canceled,
}

impl MatchStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            MatchStatus::Pending => "pending",
            MatchStatus::Scheduled => "scheduled",
            MatchStatus::InProgress => "in_progress",
            MatchStatus::Completed => "completed",
            MatchStatus::Canceled => "canceled",
        }
    }

    /// Whether the match can no longer change
    pub fn is_final(self) -> bool {
        matches!(self, MatchStatus::Completed | MatchStatus::Canceled)
    }
}

impl fmt::Display for MatchStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MatchStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(MatchStatus::Pending),
            "scheduled" => Ok(MatchStatus::Scheduled),
            "in_progress" => Ok(MatchStatus::InProgress),
            "completed" => Ok(MatchStatus::Completed),
            "canceled" => Ok(MatchStatus::Canceled),
            other => Err(format!("unknown match status '{other}'")),
        }
    }
}

/// Upper bound on the games either side may take in one set
pub const MAX_GAMES_PER_SET: u32 = 999;

/// Upper bound on the number of sets in one match
pub const MAX_SETS: usize = 9;

/// Games won by each side in one set
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SetScore {
    pub first: u32,
    pub second: u32,
}

impl SetScore {
    pub fn new(first: u32, second: u32) -> Self {
        Self { first, second }
    }

    /// Side with strictly more games; `None` on a tie
    pub fn winner(&self) -> Option<SideIndex> {
        match self.first.cmp(&self.second) {
            std::cmp::Ordering::Greater => Some(SideIndex::First),
            std::cmp::Ordering::Less => Some(SideIndex::Second),
            std::cmp::Ordering::Equal => None,
        }
    }

    /// Games won by `side`
    pub fn games(&self, side: SideIndex) -> u32 {
        match side {
            SideIndex::First => self.first,
            SideIndex::Second => self.second,
        }
    }
}

/// Ordered set results of a match
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Score(pub Vec<SetScore>);

impl Score {
    pub fn sets(&self) -> &[SetScore] {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Check the score is one a match could end with
    pub fn validate(&self) -> Result<(), String> {
        if self.0.is_empty() {
            return Err("score must contain at least one set".to_string());
        }
        if self.0.len() > MAX_SETS {
            return Err(format!("score has more than {MAX_SETS} sets"));
        }
        if let Some((n, set)) = self
            .0
            .iter()
            .enumerate()
            .find(|(_, set)| set.first.max(set.second) > MAX_GAMES_PER_SET)
        {
            return Err(format!(
                "set {} has {}-{} games, at most {MAX_GAMES_PER_SET} allowed per side",
                n + 1,
                set.first,
                set.second
            ));
        }
        Ok(())
    }

    /// Sets won by `side`
    pub fn sets_won(&self, side: SideIndex) -> u32 {
        self.0
            .iter()
            .filter(|set| set.winner() == Some(side))
            .count() as u32
    }
}

impl From<Vec<(u32, u32)>> for Score {
    fn from(sets: Vec<(u32, u32)>) -> Self {
        Self(sets.into_iter().map(|(a, b)| SetScore::new(a, b)).collect())
    }
}

/// Persisted match
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Match {
    pub id: MatchId,
    pub tournament_id: TournamentId,
    pub round: u32,
    pub first: Side,
    pub second: Side,
    pub scheduled_at: Option<DateTime<Utc>>,
    pub location: Option<String>,
    pub status: MatchStatus,
    pub score: Option<Score>,
    pub created_at: DateTime<Utc>,
}

impl Match {
    /// Side `player` plays on, if any
    pub fn side_of(&self, player: UserId) -> Option<SideIndex> {
        if self.first.contains(player) {
            Some(SideIndex::First)
        } else if self.second.contains(player) {
            Some(SideIndex::Second)
        } else {
            None
        }
    }
}

/// Match about to be inserted
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewMatch {
    pub tournament_id: TournamentId,
    pub round: u32,
    pub first: Side,
    pub second: Side,
    pub status: MatchStatus,
}

impl NewMatch {
    /// Pending match with no date or location; sides must not share a player
    pub fn new(
        tournament_id: TournamentId,
        round: u32,
        first: Side,
        second: Side,
    ) -> Result<Self, String> {
        if !first.is_disjoint(&second) {
            return Err(format!(
                "sides {:?} and {:?} share a player",
                first.players(),
                second.players()
            ));
        }
        if round == 0 {
            return Err("rounds are numbered from 1".to_string());
        }

        Ok(Self {
            tournament_id,
            round,
            first,
            second,
            status: MatchStatus::Pending,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_side_sizes() {
        assert!(Side::try_from(vec![]).is_err());
        assert!(Side::try_from(vec![1, 2, 3]).is_err());
        assert!(Side::doubles(4, 4).is_err());
        assert_eq!(Side::doubles(4, 5).unwrap().players(), &[4, 5]);
    }

    #[test]
    fn test_overlapping_sides_rejected() {
        let a = Side::doubles(1, 2).unwrap();
        let b = Side::doubles(2, 3).unwrap();
        assert!(NewMatch::new(1, 1, a, b).is_err());

        let a = Side::singles(1);
        let b = Side::singles(1);
        assert!(NewMatch::new(1, 1, a, b).is_err());
    }

    #[test]
    fn test_new_match_is_pending() {
        let m = NewMatch::new(9, 1, Side::singles(1), Side::singles(2)).unwrap();
        assert_eq!(m.status, MatchStatus::Pending);
        assert_eq!(m.round, 1);
    }

    #[test]
    fn test_set_winner() {
        assert_eq!(SetScore::new(6, 4).winner(), Some(SideIndex::First));
        assert_eq!(SetScore::new(5, 7).winner(), Some(SideIndex::Second));
        assert_eq!(SetScore::new(6, 6).winner(), None);
    }

    #[test]
    fn test_score_bounds() {
        assert!(Score::default().validate().is_err());
        assert!(Score::from(vec![(6, 4), (7, 6)]).validate().is_ok());
        assert!(Score::from(vec![(MAX_GAMES_PER_SET, 0)]).validate().is_ok());
        assert!(Score::from(vec![(u32::MAX, 0), (6, 0)]).validate().is_err());
        assert!(Score::from(vec![(6, 4); MAX_SETS + 1]).validate().is_err());
    }

    #[test]
    fn test_sets_won() {
        let score = Score::from(vec![(6, 4), (3, 6), (7, 5)]);
        assert_eq!(score.sets_won(SideIndex::First), 2);
        assert_eq!(score.sets_won(SideIndex::Second), 1);
    }

    #[test]
    fn test_side_deserialization_validates() {
        let side: Result<Side, _> = serde_json::from_str("[3, 3]");
        assert!(side.is_err());
        let side: Side = serde_json::from_str("[3]").unwrap();
        assert_eq!(side.players(), &[3]);
    }
}
