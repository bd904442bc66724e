//! Tournament lifecycle: creation, status transitions and the start saga.

use std::sync::Arc;

use super::errors::{TournamentError, TournamentResult};
use super::models::{
    LifecycleAction, NewTournament, RecoveryReport, StartOutcome, Tournament, TournamentId,
    TournamentStatus,
};
use crate::bracket::{BracketGenerator, BracketSummary};
use crate::db::{MatchRepository, RequestContext, TournamentRepository, UserRepository, guarded};
use crate::users::{User, UserId};

/// Owns every tournament status transition
#[derive(Clone)]
pub struct TournamentManager {
    tournaments: Arc<dyn TournamentRepository>,
    matches: Arc<dyn MatchRepository>,
    users: Arc<dyn UserRepository>,
    generator: Arc<BracketGenerator>,
}

impl TournamentManager {
    /// Create a manager whose brackets are seeded from OS randomness
    pub fn new(
        tournaments: Arc<dyn TournamentRepository>,
        matches: Arc<dyn MatchRepository>,
        users: Arc<dyn UserRepository>,
    ) -> Self {
        let generator = BracketGenerator::new(tournaments.clone(), matches.clone());
        Self::with_generator(tournaments, matches, users, generator)
    }

    pub fn with_generator(
        tournaments: Arc<dyn TournamentRepository>,
        matches: Arc<dyn MatchRepository>,
        users: Arc<dyn UserRepository>,
        generator: BracketGenerator,
    ) -> Self {
        Self {
            tournaments,
            matches,
            users,
            generator: Arc::new(generator),
        }
    }

    /// Create a tournament in DRAFT
    pub async fn create_tournament(
        &self,
        ctx: &RequestContext,
        new: NewTournament,
    ) -> TournamentResult<Tournament> {
        new.validate().map_err(TournamentError::Validation)?;
        let creator = self.load_user(ctx, new.creator_id).await?;
        if !creator.is_active {
            return Err(TournamentError::PermissionDenied(format!(
                "user {} is inactive",
                creator.id
            )));
        }

        let tournament = guarded(ctx, self.tournaments.create(&new)).await?;
        log::info!(
            "Created {} tournament {} '{}' by user {}",
            tournament.format,
            tournament.id,
            tournament.name,
            tournament.creator_id
        );
        Ok(tournament)
    }

    pub async fn get_tournament(
        &self,
        ctx: &RequestContext,
        tournament_id: TournamentId,
    ) -> TournamentResult<Tournament> {
        guarded(ctx, self.tournaments.get(tournament_id))
            .await?
            .ok_or(TournamentError::TournamentNotFound(tournament_id))
    }

    /// DRAFT -> OPEN
    pub async fn open_tournament(
        &self,
        ctx: &RequestContext,
        tournament_id: TournamentId,
        user_id: UserId,
    ) -> TournamentResult<Tournament> {
        self.transition(
            ctx,
            tournament_id,
            user_id,
            LifecycleAction::Open,
            TournamentStatus::Open,
        )
        .await
    }

    /// ACTIVE -> COMPLETED
    pub async fn complete_tournament(
        &self,
        ctx: &RequestContext,
        tournament_id: TournamentId,
        user_id: UserId,
    ) -> TournamentResult<Tournament> {
        self.transition(
            ctx,
            tournament_id,
            user_id,
            LifecycleAction::Complete,
            TournamentStatus::Completed,
        )
        .await
    }

    /// DRAFT | OPEN | ACTIVE -> CANCELLED
    pub async fn cancel_tournament(
        &self,
        ctx: &RequestContext,
        tournament_id: TournamentId,
        user_id: UserId,
    ) -> TournamentResult<Tournament> {
        self.transition(
            ctx,
            tournament_id,
            user_id,
            LifecycleAction::Cancel,
            TournamentStatus::Cancelled,
        )
        .await
    }

    /// OPEN -> ACTIVE, then generate the first round
    ///
    /// Validation order: tournament exists, tournament is OPEN, user exists,
    /// user is the creator or an admin, enough participants. The status swap
    /// is a compare-and-set that also raises `bracket_pending`; if bracket
    /// generation then fails the tournament is put back to OPEN before the
    /// error is returned.
    pub async fn start_tournament(
        &self,
        ctx: &RequestContext,
        tournament_id: TournamentId,
        user_id: UserId,
    ) -> TournamentResult<StartOutcome> {
        let tournament = self.get_tournament(ctx, tournament_id).await?;

        if tournament.status != TournamentStatus::Open {
            return Err(invalid_state(&tournament, LifecycleAction::Start));
        }

        let user = self.load_user(ctx, user_id).await?;
        authorize(&user, &tournament, LifecycleAction::Start)?;

        let needed = tournament.required_participants();
        let current = guarded(ctx, self.tournaments.count_participants(tournament_id)).await?;
        if current < needed {
            return Err(TournamentError::InsufficientParticipants { needed, current });
        }

        let active = self
            .swap_status(ctx, &tournament, LifecycleAction::Start, TournamentStatus::Active, true)
            .await?;
        log::info!(
            "Tournament {tournament_id} moved to active by user {user_id}, generating bracket"
        );

        match self.generator.generate(ctx, &active).await {
            Ok(summary) => Ok(self.finish_start(ctx, active, summary).await),
            Err(err) => self.compensate_start(ctx, active, err).await,
        }
    }

    /// Resolve tournaments left with `bracket_pending` by an interrupted start
    ///
    /// ACTIVE tournaments that have matches keep their status and lose the
    /// marker; ACTIVE tournaments without matches go back to OPEN. Intended to
    /// run before requests are served.
    pub async fn recover_pending_brackets(
        &self,
        ctx: &RequestContext,
    ) -> TournamentResult<RecoveryReport> {
        let pending = guarded(ctx, self.tournaments.list_bracket_pending()).await?;
        let mut report = RecoveryReport::default();

        for tournament in pending {
            let id = tournament.id;
            if tournament.status != TournamentStatus::Active {
                // Marker without an active start: just drop it
                guarded(
                    ctx,
                    self.tournaments.compare_and_set_status(
                        id,
                        tournament.status,
                        tournament.status,
                        false,
                    ),
                )
                .await?;
                continue;
            }

            if guarded(ctx, self.matches.has_any_matches(id)).await? {
                let cleared = guarded(
                    ctx,
                    self.tournaments.compare_and_set_status(
                        id,
                        TournamentStatus::Active,
                        TournamentStatus::Active,
                        false,
                    ),
                )
                .await?;
                if cleared.is_some() {
                    log::info!("Recovery: tournament {id} has its bracket, marker cleared");
                    report.confirmed.push(id);
                }
            } else {
                let reverted = guarded(
                    ctx,
                    self.tournaments.compare_and_set_status(
                        id,
                        TournamentStatus::Active,
                        TournamentStatus::Open,
                        false,
                    ),
                )
                .await?;
                if reverted.is_some() {
                    log::warn!("Recovery: tournament {id} had no bracket, reverted to open");
                    report.reverted.push(id);
                }
            }
        }

        Ok(report)
    }

    /// Fail with `PermissionDenied` unless `user_id` is an active admin
    pub async fn require_admin(&self, ctx: &RequestContext, user_id: UserId) -> TournamentResult<User> {
        let user = self.load_user(ctx, user_id).await?;
        if user.is_active && user.role.is_admin() {
            Ok(user)
        } else {
            Err(TournamentError::PermissionDenied(format!(
                "user {user_id} is not an administrator"
            )))
        }
    }

    async fn transition(
        &self,
        ctx: &RequestContext,
        tournament_id: TournamentId,
        user_id: UserId,
        action: LifecycleAction,
        next: TournamentStatus,
    ) -> TournamentResult<Tournament> {
        let tournament = self.get_tournament(ctx, tournament_id).await?;
        if !tournament.status.can_transition_to(next) {
            return Err(invalid_state(&tournament, action));
        }

        let user = self.load_user(ctx, user_id).await?;
        authorize(&user, &tournament, action)?;

        let updated = self
            .swap_status(ctx, &tournament, action, next, false)
            .await?;
        log::info!(
            "Tournament {tournament_id}: {} -> {} by user {user_id}",
            tournament.status,
            updated.status
        );
        Ok(updated)
    }

    /// Compare-and-set from the status `tournament` was read with
    ///
    /// A lost race re-reads the row and reports the status actually found.
    async fn swap_status(
        &self,
        ctx: &RequestContext,
        tournament: &Tournament,
        action: LifecycleAction,
        next: TournamentStatus,
        bracket_pending: bool,
    ) -> TournamentResult<Tournament> {
        let swapped = guarded(
            ctx,
            self.tournaments.compare_and_set_status(
                tournament.id,
                tournament.status,
                next,
                bracket_pending,
            ),
        )
        .await?;

        match swapped {
            Some(updated) => Ok(updated),
            None => {
                let current = self.get_tournament(ctx, tournament.id).await?;
                log::debug!(
                    "Tournament {} changed concurrently: expected {}, found {}",
                    tournament.id,
                    tournament.status,
                    current.status
                );
                Err(invalid_state(&current, action))
            }
        }
    }

    /// Clear the marker once the bracket is stored
    ///
    /// Runs under a detached context: the bracket is already written, so a
    /// cancelled request must still leave the marker cleared. A failure only
    /// leaves the marker for recovery to confirm.
    async fn finish_start(
        &self,
        ctx: &RequestContext,
        active: Tournament,
        summary: BracketSummary,
    ) -> StartOutcome {
        let detached = ctx.detached();
        let cleared = guarded(
            &detached,
            self.tournaments.compare_and_set_status(
                active.id,
                TournamentStatus::Active,
                TournamentStatus::Active,
                false,
            ),
        )
        .await;

        let tournament = match cleared {
            Ok(Some(updated)) => updated,
            Ok(None) => {
                log::warn!(
                    "Tournament {} left active before its start marker was cleared",
                    active.id
                );
                active
            }
            Err(err) => {
                log::warn!(
                    "Could not clear start marker of tournament {}: {err}",
                    active.id
                );
                active
            }
        };

        let byes = match summary.auto_advanced.len() {
            1 => "1 bye".to_string(),
            n => format!("{n} byes"),
        };
        let message = format!(
            "Tournament '{}' started: {} first-round matches over {} rounds, {byes}",
            tournament.name, summary.matches_created, summary.rounds
        );

        StartOutcome {
            tournament,
            bracket: summary,
            message,
        }
    }

    /// Undo the OPEN -> ACTIVE swap after a failed generation
    async fn compensate_start(
        &self,
        ctx: &RequestContext,
        active: Tournament,
        generation: TournamentError,
    ) -> TournamentResult<StartOutcome> {
        let detached = ctx.detached();
        let id = active.id;

        // A write that timed out may still have committed
        match guarded(&detached, self.matches.has_any_matches(id)).await {
            Ok(true) => {
                log::warn!(
                    "Bracket generation for tournament {id} reported '{generation}' but matches exist, keeping it active"
                );
                let summary = self.generator.summarize_existing(&detached, &active).await?;
                return Ok(self.finish_start(&detached, active, summary).await);
            }
            Ok(false) => {}
            Err(check) => {
                log::error!(
                    "Tournament {id}: bracket generation failed ({generation}) and the match check failed ({check}); left pending recovery"
                );
                return Err(TournamentError::CompensationFailed {
                    generation: Box::new(generation),
                    revert: Box::new(check.into()),
                });
            }
        }

        let reverted = guarded(
            &detached,
            self.tournaments.compare_and_set_status(
                id,
                TournamentStatus::Active,
                TournamentStatus::Open,
                false,
            ),
        )
        .await;

        match reverted {
            Ok(Some(_)) => {
                log::warn!(
                    "Bracket generation for tournament {id} failed, reverted to open: {generation}"
                );
                Err(TournamentError::BracketGenerationFailed(Box::new(generation)))
            }
            Ok(None) => {
                log::warn!(
                    "Bracket generation for tournament {id} failed and its status changed concurrently: {generation}"
                );
                Err(TournamentError::BracketGenerationFailed(Box::new(generation)))
            }
            Err(revert) => {
                log::error!(
                    "Tournament {id}: bracket generation failed ({generation}) and reverting to open failed ({revert}); left pending recovery"
                );
                Err(TournamentError::CompensationFailed {
                    generation: Box::new(generation),
                    revert: Box::new(revert.into()),
                })
            }
        }
    }

    async fn load_user(&self, ctx: &RequestContext, user_id: UserId) -> TournamentResult<User> {
        guarded(ctx, self.users.find_by_id(user_id))
            .await?
            .ok_or(TournamentError::UserNotFound(user_id))
    }
}

fn invalid_state(tournament: &Tournament, action: LifecycleAction) -> TournamentError {
    TournamentError::InvalidState {
        tournament_id: tournament.id,
        action,
        actual: tournament.status,
    }
}

/// Admins may drive any tournament, everyone else only their own
fn authorize(user: &User, tournament: &Tournament, action: LifecycleAction) -> TournamentResult<()> {
    if user.is_active && (user.role.is_admin() || tournament.is_created_by(user.id)) {
        return Ok(());
    }

    Err(TournamentError::PermissionDenied(format!(
        "user {} may not {action} tournament {}",
        user.id, tournament.id
    )))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bracket::PresetSeeder;
    use crate::db::InMemoryStore;
    use crate::users::Role;

    const ADMIN: UserId = 1;
    const ORGANIZER: UserId = 2;
    const OTHER_ORGANIZER: UserId = 3;

    fn manager() -> (Arc<InMemoryStore>, TournamentManager) {
        let store = Arc::new(
            InMemoryStore::new()
                .with_user(User::new(ADMIN, "root", Role::Admin))
                .with_user(User::new(ORGANIZER, "olga", Role::Organizer))
                .with_user(User::new(OTHER_ORGANIZER, "omar", Role::Organizer)),
        );
        let generator = BracketGenerator::with_seeder(store.clone(), store.clone(), PresetSeeder);
        let manager =
            TournamentManager::with_generator(store.clone(), store.clone(), store.clone(), generator);
        (store, manager)
    }

    #[tokio::test]
    async fn test_create_validates_input() {
        let (_store, manager) = manager();
        let err = manager
            .create_tournament(
                &RequestContext::default(),
                NewTournament::single_elimination("   ", ORGANIZER),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, TournamentError::Validation(_)));
    }

    #[tokio::test]
    async fn test_open_and_cancel() {
        let (_store, manager) = manager();
        let ctx = RequestContext::default();
        let t = manager
            .create_tournament(&ctx, NewTournament::single_elimination("Cup", ORGANIZER))
            .await
            .unwrap();
        assert_eq!(t.status, TournamentStatus::Draft);

        let opened = manager.open_tournament(&ctx, t.id, ORGANIZER).await.unwrap();
        assert_eq!(opened.status, TournamentStatus::Open);

        let cancelled = manager.cancel_tournament(&ctx, t.id, ADMIN).await.unwrap();
        assert_eq!(cancelled.status, TournamentStatus::Cancelled);

        let err = manager.open_tournament(&ctx, t.id, ADMIN).await.unwrap_err();
        assert!(matches!(
            err,
            TournamentError::InvalidState {
                actual: TournamentStatus::Cancelled,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn test_only_creator_or_admin_transitions() {
        let (_store, manager) = manager();
        let ctx = RequestContext::default();
        let t = manager
            .create_tournament(&ctx, NewTournament::single_elimination("Cup", ORGANIZER))
            .await
            .unwrap();

        let err = manager
            .open_tournament(&ctx, t.id, OTHER_ORGANIZER)
            .await
            .unwrap_err();
        assert!(matches!(err, TournamentError::PermissionDenied(_)));
        assert_eq!(
            manager.get_tournament(&ctx, t.id).await.unwrap().status,
            TournamentStatus::Draft
        );
    }

    #[tokio::test]
    async fn test_complete_requires_active() {
        let (_store, manager) = manager();
        let ctx = RequestContext::default();
        let t = manager
            .create_tournament(&ctx, NewTournament::single_elimination("Cup", ORGANIZER))
            .await
            .unwrap();

        let err = manager
            .complete_tournament(&ctx, t.id, ORGANIZER)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            TournamentError::InvalidState {
                action: LifecycleAction::Complete,
                actual: TournamentStatus::Draft,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn test_recovery_resolves_markers() {
        let (store, manager) = manager();
        let ctx = RequestContext::default();

        let mut ids = Vec::new();
        for name in ["with bracket", "without bracket"] {
            let t = manager
                .create_tournament(&ctx, NewTournament::single_elimination(name, ORGANIZER))
                .await
                .unwrap();
            manager.open_tournament(&ctx, t.id, ORGANIZER).await.unwrap();
            store
                .compare_and_set_status(t.id, TournamentStatus::Open, TournamentStatus::Active, true)
                .await
                .unwrap();
            ids.push(t.id);
        }

        let bracket = vec![
            crate::matches::NewMatch::new(
                ids[0],
                1,
                crate::matches::Side::singles(10),
                crate::matches::Side::singles(11),
            )
            .unwrap(),
        ];
        store.save_bracket(ids[0], &bracket).await.unwrap();

        let report = manager.recover_pending_brackets(&ctx).await.unwrap();
        assert_eq!(report.confirmed, vec![ids[0]]);
        assert_eq!(report.reverted, vec![ids[1]]);

        let first = manager.get_tournament(&ctx, ids[0]).await.unwrap();
        assert_eq!(first.status, TournamentStatus::Active);
        assert!(!first.bracket_pending);
        let second = manager.get_tournament(&ctx, ids[1]).await.unwrap();
        assert_eq!(second.status, TournamentStatus::Open);
        assert!(!second.bracket_pending);
    }
}
