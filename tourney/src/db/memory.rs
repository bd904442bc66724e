//! In-memory implementation of every repository trait.
//!
//! This is the reference implementation the test suites run against. It keeps
//! the same atomicity guarantees as the Postgres store (one mutex serializes
//! every write) and exposes fault injection hooks for exercising failure
//! paths.

use async_trait::async_trait;
use chrono::Utc;
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use super::errors::{StoreError, StoreResult};
use super::repository::{
    MatchRepository, Page, RegistrationOutcome, StatisticRepository, TournamentRepository,
    UserRepository,
};
use crate::matches::{Match, MatchId, MatchStatus, NewMatch};
use crate::stats::Statistic;
use crate::tournament::{NewTournament, Registration, Tournament, TournamentId, TournamentStatus};
use crate::users::{User, UserId};

#[derive(Default)]
struct State {
    tournaments: BTreeMap<TournamentId, Tournament>,
    registrations: HashMap<TournamentId, Vec<Registration>>,
    matches: BTreeMap<MatchId, Match>,
    users: HashMap<UserId, User>,
    statistics: HashMap<(UserId, TournamentId), Statistic>,
    next_tournament_id: TournamentId,
    next_match_id: MatchId,
}

#[derive(Default)]
struct Faults {
    match_writes: AtomicBool,
    lost_bracket_acks: AtomicBool,
    status_writes_to: Mutex<Option<TournamentStatus>>,
    latency: Mutex<Option<Duration>>,
}

/// Shared in-memory store
#[derive(Default)]
pub struct InMemoryStore {
    state: Mutex<State>,
    faults: Faults,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// New store behind an `Arc`, ready to hand to the managers
    pub fn shared() -> Arc<Self> {
        Arc::new(Self::new())
    }

    pub fn with_user(self, user: User) -> Self {
        self.insert_user(user);
        self
    }

    pub fn insert_user(&self, user: User) {
        self.state().users.insert(user.id, user);
    }

    /// Make every match write fail until reset
    pub fn fail_match_writes(&self, fail: bool) {
        self.faults.match_writes.store(fail, Ordering::SeqCst);
    }

    /// Store brackets but report each write as failed until reset
    pub fn lose_bracket_acks(&self, lose: bool) {
        self.faults.lost_bracket_acks.store(lose, Ordering::SeqCst);
    }

    /// Make status writes targeting `status` fail; `None` clears the fault
    pub fn fail_status_writes_to(&self, status: Option<TournamentStatus>) {
        *lock(&self.faults.status_writes_to) = status;
    }

    /// Delay every operation by `latency`; `None` clears the delay
    pub fn set_latency(&self, latency: Option<Duration>) {
        *lock(&self.faults.latency) = latency;
    }

    /// Number of matches stored across all tournaments
    pub fn match_count(&self) -> usize {
        self.state().matches.len()
    }

    fn state(&self) -> MutexGuard<'_, State> {
        lock(&self.state)
    }

    async fn pause(&self) {
        let latency = *lock(&self.faults.latency);
        if let Some(latency) = latency {
            tokio::time::sleep(latency).await;
        }
    }

    fn check_match_writes(&self) -> StoreResult<()> {
        if self.faults.match_writes.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("match writes disabled".to_string()));
        }
        Ok(())
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

#[async_trait]
impl TournamentRepository for InMemoryStore {
    async fn create(&self, new: &NewTournament) -> StoreResult<Tournament> {
        self.pause().await;
        let mut state = self.state();
        state.next_tournament_id += 1;
        let now = Utc::now();
        let tournament = Tournament {
            id: state.next_tournament_id,
            name: new.name.trim().to_string(),
            format: new.format,
            status: TournamentStatus::Draft,
            min_participants: new.min_participants,
            max_participants: new.max_participants,
            registration_deadline: new.registration_deadline,
            creator_id: new.creator_id,
            bracket_pending: false,
            created_at: now,
            updated_at: now,
        };
        state.tournaments.insert(tournament.id, tournament.clone());
        Ok(tournament)
    }

    async fn get(&self, id: TournamentId) -> StoreResult<Option<Tournament>> {
        self.pause().await;
        Ok(self.state().tournaments.get(&id).cloned())
    }

    async fn compare_and_set_status(
        &self,
        id: TournamentId,
        expected: TournamentStatus,
        next: TournamentStatus,
        bracket_pending: bool,
    ) -> StoreResult<Option<Tournament>> {
        self.pause().await;
        if *lock(&self.faults.status_writes_to) == Some(next) {
            return Err(StoreError::Unavailable(format!(
                "status writes to {next} disabled"
            )));
        }

        let mut state = self.state();
        match state.tournaments.get_mut(&id) {
            Some(stored) if stored.status == expected => {
                stored.status = next;
                stored.bracket_pending = bracket_pending;
                stored.updated_at = Utc::now();
                Ok(Some(stored.clone()))
            }
            _ => Ok(None),
        }
    }

    async fn list_bracket_pending(&self) -> StoreResult<Vec<Tournament>> {
        self.pause().await;
        Ok(self
            .state()
            .tournaments
            .values()
            .filter(|t| t.bracket_pending)
            .cloned()
            .collect())
    }

    async fn count_participants(&self, id: TournamentId) -> StoreResult<u32> {
        self.pause().await;
        Ok(self
            .state()
            .registrations
            .get(&id)
            .map_or(0, |regs| regs.len() as u32))
    }

    async fn register_participant(
        &self,
        id: TournamentId,
        player_id: UserId,
        max: Option<u32>,
    ) -> StoreResult<RegistrationOutcome> {
        self.pause().await;
        let mut state = self.state();
        let status = match state.tournaments.get(&id) {
            Some(t) => t.status,
            None => return Ok(RegistrationOutcome::TournamentMissing),
        };
        if status != TournamentStatus::Open {
            return Ok(RegistrationOutcome::NotOpen(status));
        }

        let regs = state.registrations.entry(id).or_default();
        if regs.iter().any(|r| r.player_id == player_id) {
            return Ok(RegistrationOutcome::AlreadyRegistered);
        }
        if let Some(max) = max {
            if regs.len() as u32 >= max {
                return Ok(RegistrationOutcome::CapacityReached(max));
            }
        }

        let registration = Registration {
            tournament_id: id,
            player_id,
            registered_at: Utc::now(),
        };
        regs.push(registration.clone());
        Ok(RegistrationOutcome::Registered(registration))
    }

    async fn unregister_participant(
        &self,
        id: TournamentId,
        player_id: UserId,
    ) -> StoreResult<bool> {
        self.pause().await;
        let mut state = self.state();
        let Some(regs) = state.registrations.get_mut(&id) else {
            return Ok(false);
        };
        let before = regs.len();
        regs.retain(|r| r.player_id != player_id);
        Ok(regs.len() != before)
    }

    async fn is_registered(&self, id: TournamentId, player_id: UserId) -> StoreResult<bool> {
        self.pause().await;
        Ok(self
            .state()
            .registrations
            .get(&id)
            .is_some_and(|regs| regs.iter().any(|r| r.player_id == player_id)))
    }

    async fn list_participants(
        &self,
        id: TournamentId,
        page: Page,
    ) -> StoreResult<Vec<Registration>> {
        self.pause().await;
        let page = page.normalized();
        Ok(self
            .state()
            .registrations
            .get(&id)
            .map(|regs| {
                regs.iter()
                    .skip(page.offset as usize)
                    .take(page.limit as usize)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn participant_ids(&self, id: TournamentId) -> StoreResult<Vec<UserId>> {
        self.pause().await;
        Ok(self
            .state()
            .registrations
            .get(&id)
            .map(|regs| regs.iter().map(|r| r.player_id).collect())
            .unwrap_or_default())
    }
}

fn materialize(state: &mut State, new: &NewMatch) -> Match {
    state.next_match_id += 1;
    Match {
        id: state.next_match_id,
        tournament_id: new.tournament_id,
        round: new.round,
        first: new.first.clone(),
        second: new.second.clone(),
        scheduled_at: None,
        location: None,
        status: new.status,
        score: None,
        created_at: Utc::now(),
    }
}

#[async_trait]
impl MatchRepository for InMemoryStore {
    async fn get_match(&self, id: MatchId) -> StoreResult<Option<Match>> {
        self.pause().await;
        Ok(self.state().matches.get(&id).cloned())
    }

    async fn find_by_tournament(&self, tournament_id: TournamentId) -> StoreResult<Vec<Match>> {
        self.pause().await;
        let mut found: Vec<Match> = self
            .state()
            .matches
            .values()
            .filter(|m| m.tournament_id == tournament_id)
            .cloned()
            .collect();
        found.sort_by_key(|m| (m.round, m.id));
        Ok(found)
    }

    async fn find_completed_for_player(
        &self,
        tournament_id: TournamentId,
        player_id: UserId,
    ) -> StoreResult<Vec<Match>> {
        self.pause().await;
        Ok(self
            .state()
            .matches
            .values()
            .filter(|m| {
                m.tournament_id == tournament_id
                    && m.status == MatchStatus::Completed
                    && m.side_of(player_id).is_some()
            })
            .cloned()
            .collect())
    }

    async fn has_any_matches(&self, tournament_id: TournamentId) -> StoreResult<bool> {
        self.pause().await;
        Ok(self
            .state()
            .matches
            .values()
            .any(|m| m.tournament_id == tournament_id))
    }

    async fn save_bracket(
        &self,
        tournament_id: TournamentId,
        matches: &[NewMatch],
    ) -> StoreResult<Option<Vec<Match>>> {
        self.pause().await;
        self.check_match_writes()?;
        let mut state = self.state();
        if state
            .matches
            .values()
            .any(|m| m.tournament_id == tournament_id)
        {
            return Ok(None);
        }

        let mut saved = Vec::with_capacity(matches.len());
        for new in matches {
            let stored = materialize(&mut state, new);
            state.matches.insert(stored.id, stored.clone());
            saved.push(stored);
        }

        if self.faults.lost_bracket_acks.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable(format!(
                "connection lost after storing bracket of tournament {tournament_id}"
            )));
        }
        Ok(Some(saved))
    }

    async fn update_match(&self, m: &Match) -> StoreResult<()> {
        self.pause().await;
        self.check_match_writes()?;
        let mut state = self.state();
        match state.matches.get_mut(&m.id) {
            Some(stored) => {
                stored.scheduled_at = m.scheduled_at;
                stored.location = m.location.clone();
                stored.status = m.status;
                stored.score = m.score.clone();
                Ok(())
            }
            None => Err(StoreError::Corrupt(format!("match {} does not exist", m.id))),
        }
    }
}

#[async_trait]
impl UserRepository for InMemoryStore {
    async fn find_by_id(&self, user_id: UserId) -> StoreResult<Option<User>> {
        self.pause().await;
        Ok(self.state().users.get(&user_id).cloned())
    }
}

#[async_trait]
impl StatisticRepository for InMemoryStore {
    async fn find_by_player_and_tournament(
        &self,
        player_id: UserId,
        tournament_id: TournamentId,
    ) -> StoreResult<Option<Statistic>> {
        self.pause().await;
        Ok(self
            .state()
            .statistics
            .get(&(player_id, tournament_id))
            .cloned())
    }

    async fn upsert(&self, statistic: &Statistic) -> StoreResult<Statistic> {
        self.pause().await;
        self.state().statistics.insert(
            (statistic.player_id, statistic.tournament_id),
            statistic.clone(),
        );
        Ok(statistic.clone())
    }

    async fn list_by_tournament(&self, tournament_id: TournamentId) -> StoreResult<Vec<Statistic>> {
        self.pause().await;
        let mut found: Vec<Statistic> = self
            .state()
            .statistics
            .values()
            .filter(|s| s.tournament_id == tournament_id)
            .cloned()
            .collect();
        found.sort_by_key(|s| s.player_id);
        Ok(found)
    }
}
