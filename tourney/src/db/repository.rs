//! Repository trait definitions for testability and dependency injection.
//!
//! The tournament core only talks to storage through these traits. Postgres
//! implementations live in [`super::postgres`], the in-memory reference
//! implementation shared by tests lives in [`super::memory`].

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::errors::StoreResult;
use crate::matches::{Match, MatchId, NewMatch};
use crate::stats::Statistic;
use crate::tournament::{NewTournament, Registration, Tournament, TournamentId, TournamentStatus};
use crate::users::{User, UserId};

/// Default page size for participant listings
pub const DEFAULT_PAGE_LIMIT: u32 = 20;

/// Largest page size accepted
pub const MAX_PAGE_LIMIT: u32 = 100;

/// Offset/limit pagination
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Page {
    #[serde(default)]
    pub offset: u32,
    #[serde(default = "default_limit")]
    pub limit: u32,
}

fn default_limit() -> u32 {
    DEFAULT_PAGE_LIMIT
}

impl Page {
    /// Page with `limit` clamped to `1..=MAX_PAGE_LIMIT`
    pub fn new(offset: u32, limit: u32) -> Self {
        Self {
            offset,
            limit: limit.clamp(1, MAX_PAGE_LIMIT),
        }
    }

    /// Same page with the limit clamped
    pub fn normalized(self) -> Self {
        Self::new(self.offset, self.limit)
    }
}

impl Default for Page {
    fn default() -> Self {
        Self::new(0, DEFAULT_PAGE_LIMIT)
    }
}

/// Outcome of an atomic register-with-ceiling
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegistrationOutcome {
    Registered(Registration),
    AlreadyRegistered,
    /// Ceiling reached; carries the ceiling
    CapacityReached(u32),
    /// Tournament left OPEN before the write; carries the status found
    NotOpen(TournamentStatus),
    TournamentMissing,
}

/// Trait for tournament and registration storage
#[async_trait]
pub trait TournamentRepository: Send + Sync {
    /// Insert a new tournament in DRAFT
    async fn create(&self, new: &NewTournament) -> StoreResult<Tournament>;

    /// Find tournament by ID
    async fn get(&self, id: TournamentId) -> StoreResult<Option<Tournament>>;

    /// Set status to `next` only if it currently equals `expected`
    ///
    /// `bracket_pending` is written in the same step. Returns the updated row,
    /// or `None` when the status did not match (or the row is missing).
    async fn compare_and_set_status(
        &self,
        id: TournamentId,
        expected: TournamentStatus,
        next: TournamentStatus,
        bracket_pending: bool,
    ) -> StoreResult<Option<Tournament>>;

    /// Tournaments still carrying the start marker
    async fn list_bracket_pending(&self) -> StoreResult<Vec<Tournament>>;

    /// Number of registrations
    async fn count_participants(&self, id: TournamentId) -> StoreResult<u32>;

    /// Register a participant while the tournament is OPEN and below `max`
    ///
    /// Status, duplicate and capacity are checked and the row inserted as one
    /// serialized step per tournament.
    async fn register_participant(
        &self,
        id: TournamentId,
        player_id: UserId,
        max: Option<u32>,
    ) -> StoreResult<RegistrationOutcome>;

    /// Remove a registration; `false` when there was none
    async fn unregister_participant(&self, id: TournamentId, player_id: UserId)
    -> StoreResult<bool>;

    /// Whether the player is registered
    async fn is_registered(&self, id: TournamentId, player_id: UserId) -> StoreResult<bool>;

    /// Registrations in registration order
    async fn list_participants(&self, id: TournamentId, page: Page)
    -> StoreResult<Vec<Registration>>;

    /// Every registered player ID, in registration order
    async fn participant_ids(&self, id: TournamentId) -> StoreResult<Vec<UserId>>;
}

/// Trait for match storage
#[async_trait]
pub trait MatchRepository: Send + Sync {
    /// Find match by ID
    async fn get_match(&self, id: MatchId) -> StoreResult<Option<Match>>;

    /// All matches of a tournament ordered by round then ID
    async fn find_by_tournament(&self, tournament_id: TournamentId) -> StoreResult<Vec<Match>>;

    /// Completed matches of a tournament in which `player_id` played
    async fn find_completed_for_player(
        &self,
        tournament_id: TournamentId,
        player_id: UserId,
    ) -> StoreResult<Vec<Match>>;

    /// Whether any match exists for the tournament
    async fn has_any_matches(&self, tournament_id: TournamentId) -> StoreResult<bool>;

    /// Insert a first-round bracket as one all-or-nothing write
    ///
    /// Returns `None` without writing when the tournament already has matches.
    async fn save_bracket(
        &self,
        tournament_id: TournamentId,
        matches: &[NewMatch],
    ) -> StoreResult<Option<Vec<Match>>>;

    /// Overwrite schedule, status and score of an existing match
    async fn update_match(&self, m: &Match) -> StoreResult<()>;
}

/// Trait for user lookups
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Find user by ID
    async fn find_by_id(&self, user_id: UserId) -> StoreResult<Option<User>>;
}

/// Trait for the materialized statistics view
#[async_trait]
pub trait StatisticRepository: Send + Sync {
    async fn find_by_player_and_tournament(
        &self,
        player_id: UserId,
        tournament_id: TournamentId,
    ) -> StoreResult<Option<Statistic>>;

    /// Insert or fully replace the row keyed by (player, tournament)
    async fn upsert(&self, statistic: &Statistic) -> StoreResult<Statistic>;

    /// All statistics of a tournament
    async fn list_by_tournament(&self, tournament_id: TournamentId) -> StoreResult<Vec<Statistic>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_limit_clamped() {
        assert_eq!(Page::new(0, 0).limit, 1);
        assert_eq!(Page::new(0, 500).limit, MAX_PAGE_LIMIT);
        assert_eq!(Page::new(40, 10), Page { offset: 40, limit: 10 });
    }

    #[test]
    fn test_page_defaults_from_json() {
        let page: Page = serde_json::from_str("{}").unwrap();
        assert_eq!(page, Page::default());
    }
}
