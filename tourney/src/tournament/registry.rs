//! Participant registration.

use chrono::Utc;
use std::sync::Arc;

use super::errors::{TournamentError, TournamentResult};
use super::models::{LifecycleAction, Registration, Tournament, TournamentId, TournamentStatus};
use crate::db::{
    Page, RegistrationOutcome, RequestContext, TournamentRepository, UserRepository, guarded,
};
use crate::users::{User, UserId};

/// Registers and lists tournament participants
#[derive(Clone)]
pub struct RegistrationManager {
    tournaments: Arc<dyn TournamentRepository>,
    users: Arc<dyn UserRepository>,
}

impl RegistrationManager {
    pub fn new(tournaments: Arc<dyn TournamentRepository>, users: Arc<dyn UserRepository>) -> Self {
        Self { tournaments, users }
    }

    /// Register `player_id` for a tournament
    ///
    /// Checks run in order: tournament and player exist, player may compete,
    /// not already registered, tournament OPEN, deadline not passed, capacity
    /// left. The final insert re-checks status, duplicate and capacity
    /// atomically in the store.
    pub async fn register(
        &self,
        ctx: &RequestContext,
        tournament_id: TournamentId,
        player_id: UserId,
    ) -> TournamentResult<Registration> {
        let tournament = self.load_tournament(ctx, tournament_id).await?;
        let player = self.load_user(ctx, player_id).await?;

        if !player.is_eligible_competitor() {
            return Err(TournamentError::PermissionDenied(format!(
                "user {} with role {} cannot compete",
                player.id, player.role
            )));
        }

        if guarded(ctx, self.tournaments.is_registered(tournament_id, player_id)).await? {
            return Err(TournamentError::AlreadyRegistered {
                tournament_id,
                player_id,
            });
        }

        if tournament.status != TournamentStatus::Open {
            return Err(TournamentError::InvalidState {
                tournament_id,
                action: LifecycleAction::Register,
                actual: tournament.status,
            });
        }

        let now = Utc::now();
        if tournament.registration_expired(now) {
            return Err(TournamentError::RegistrationExpired {
                tournament_id,
                deadline: tournament.registration_deadline.unwrap_or(now),
            });
        }

        if let Some(max) = tournament.max_participants {
            let current = guarded(ctx, self.tournaments.count_participants(tournament_id)).await?;
            if current >= max {
                return Err(TournamentError::CapacityExceeded { tournament_id, max });
            }
        }

        let outcome = guarded(
            ctx,
            self.tournaments
                .register_participant(tournament_id, player_id, tournament.max_participants),
        )
        .await?;

        match outcome {
            RegistrationOutcome::Registered(registration) => {
                log::info!("Player {player_id} registered for tournament {tournament_id}");
                Ok(registration)
            }
            RegistrationOutcome::AlreadyRegistered => Err(TournamentError::AlreadyRegistered {
                tournament_id,
                player_id,
            }),
            RegistrationOutcome::CapacityReached(max) => {
                Err(TournamentError::CapacityExceeded { tournament_id, max })
            }
            RegistrationOutcome::NotOpen(actual) => Err(TournamentError::InvalidState {
                tournament_id,
                action: LifecycleAction::Register,
                actual,
            }),
            RegistrationOutcome::TournamentMissing => {
                Err(TournamentError::TournamentNotFound(tournament_id))
            }
        }
    }

    /// Withdraw a registration while the tournament is still OPEN
    pub async fn unregister(
        &self,
        ctx: &RequestContext,
        tournament_id: TournamentId,
        player_id: UserId,
    ) -> TournamentResult<()> {
        let tournament = self.load_tournament(ctx, tournament_id).await?;

        if tournament.status != TournamentStatus::Open {
            return Err(TournamentError::InvalidState {
                tournament_id,
                action: LifecycleAction::Unregister,
                actual: tournament.status,
            });
        }

        let removed = guarded(
            ctx,
            self.tournaments
                .unregister_participant(tournament_id, player_id),
        )
        .await?;

        if !removed {
            return Err(TournamentError::NotRegistered {
                tournament_id,
                player_id,
            });
        }

        log::info!("Player {player_id} unregistered from tournament {tournament_id}");
        Ok(())
    }

    pub async fn count_participants(
        &self,
        ctx: &RequestContext,
        tournament_id: TournamentId,
    ) -> TournamentResult<u32> {
        self.load_tournament(ctx, tournament_id).await?;
        Ok(guarded(ctx, self.tournaments.count_participants(tournament_id)).await?)
    }

    /// One page of registrations in registration order
    pub async fn list_participants(
        &self,
        ctx: &RequestContext,
        tournament_id: TournamentId,
        page: Page,
    ) -> TournamentResult<Vec<Registration>> {
        self.load_tournament(ctx, tournament_id).await?;
        Ok(guarded(
            ctx,
            self.tournaments
                .list_participants(tournament_id, page.normalized()),
        )
        .await?)
    }

    async fn load_tournament(
        &self,
        ctx: &RequestContext,
        tournament_id: TournamentId,
    ) -> TournamentResult<Tournament> {
        guarded(ctx, self.tournaments.get(tournament_id))
            .await?
            .ok_or(TournamentError::TournamentNotFound(tournament_id))
    }

    async fn load_user(&self, ctx: &RequestContext, user_id: UserId) -> TournamentResult<User> {
        guarded(ctx, self.users.find_by_id(user_id))
            .await?
            .ok_or(TournamentError::UserNotFound(user_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::InMemoryStore;
    use crate::tournament::NewTournament;
    use crate::users::Role;
    use chrono::Duration;

    async fn setup(new: NewTournament) -> (Arc<InMemoryStore>, RegistrationManager, Tournament) {
        let store = Arc::new(
            InMemoryStore::new()
                .with_user(User::new(1, "org", Role::Organizer))
                .with_user(User::new(2, "ana", Role::Player))
                .with_user(User::new(3, "ben", Role::Player))
                .with_user(User::new(4, "sam", Role::Spectator)),
        );
        let created = store.create(&new).await.unwrap();
        let tournament = store
            .compare_and_set_status(created.id, TournamentStatus::Draft, TournamentStatus::Open, false)
            .await
            .unwrap()
            .unwrap();
        let manager = RegistrationManager::new(store.clone(), store.clone());
        (store, manager, tournament)
    }

    #[tokio::test]
    async fn test_register_and_count() {
        let (_store, manager, t) = setup(NewTournament::single_elimination("Cup", 1)).await;
        let ctx = RequestContext::default();

        let reg = manager.register(&ctx, t.id, 2).await.unwrap();
        assert_eq!(reg.player_id, 2);
        assert_eq!(manager.count_participants(&ctx, t.id).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_spectator_cannot_register() {
        let (_store, manager, t) = setup(NewTournament::single_elimination("Cup", 1)).await;
        let err = manager
            .register(&RequestContext::default(), t.id, 4)
            .await
            .unwrap_err();
        assert!(matches!(err, TournamentError::PermissionDenied(_)));
    }

    #[tokio::test]
    async fn test_missing_player_and_tournament() {
        let (_store, manager, t) = setup(NewTournament::single_elimination("Cup", 1)).await;
        let ctx = RequestContext::default();
        assert!(matches!(
            manager.register(&ctx, t.id, 99).await.unwrap_err(),
            TournamentError::UserNotFound(99)
        ));
        assert!(matches!(
            manager.register(&ctx, 77, 2).await.unwrap_err(),
            TournamentError::TournamentNotFound(77)
        ));
    }

    #[tokio::test]
    async fn test_expired_deadline() {
        let deadline = Utc::now() - Duration::hours(1);
        let new = NewTournament::single_elimination("Late", 1).with_deadline(deadline);
        let (_store, manager, t) = setup(new).await;
        let err = manager
            .register(&RequestContext::default(), t.id, 2)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            TournamentError::RegistrationExpired { tournament_id, deadline: d }
                if tournament_id == t.id && d == deadline
        ));
    }

    #[tokio::test]
    async fn test_capacity_enforced() {
        let new = NewTournament::single_elimination("Small", 1).with_capacity(None, Some(2));
        let (store, manager, t) = setup(new).await;
        store.insert_user(User::new(5, "cy", Role::Player));
        let ctx = RequestContext::default();

        manager.register(&ctx, t.id, 2).await.unwrap();
        manager.register(&ctx, t.id, 3).await.unwrap();
        let err = manager.register(&ctx, t.id, 5).await.unwrap_err();
        assert!(matches!(err, TournamentError::CapacityExceeded { max: 2, .. }));
    }

    #[tokio::test]
    async fn test_unregister() {
        let (_store, manager, t) = setup(NewTournament::single_elimination("Cup", 1)).await;
        let ctx = RequestContext::default();

        manager.register(&ctx, t.id, 2).await.unwrap();
        manager.unregister(&ctx, t.id, 2).await.unwrap();
        assert_eq!(manager.count_participants(&ctx, t.id).await.unwrap(), 0);

        let err = manager.unregister(&ctx, t.id, 2).await.unwrap_err();
        assert!(matches!(err, TournamentError::NotRegistered { .. }));
    }
}
