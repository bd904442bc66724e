//! Shared fixtures for the integration suites.
#![allow(dead_code)]

use std::sync::Arc;

use tourney::bracket::{BracketGenerator, PresetSeeder};
use tourney::db::{InMemoryStore, RequestContext};
use tourney::matches::MatchManager;
use tourney::stats::StatsManager;
use tourney::tournament::{NewTournament, RegistrationManager, Tournament, TournamentManager};
use tourney::users::{Role, User, UserId};

pub const ADMIN: UserId = 1;
pub const ORGANIZER: UserId = 2;
pub const OUTSIDER: UserId = 3;
pub const SPECTATOR: UserId = 4;

/// First id handed out by [`Harness::add_players`]
pub const FIRST_PLAYER: UserId = 100;

/// Every manager wired to one in-memory store
pub struct Harness {
    pub store: Arc<InMemoryStore>,
    pub tournaments: TournamentManager,
    pub registry: RegistrationManager,
    pub matches: MatchManager,
    pub stats: StatsManager,
    pub ctx: RequestContext,
}

impl Harness {
    /// Brackets pair participants in registration order
    pub fn new() -> Self {
        let store = Arc::new(
            InMemoryStore::new()
                .with_user(User::new(ADMIN, "admin", Role::Admin))
                .with_user(User::new(ORGANIZER, "organizer", Role::Organizer))
                .with_user(User::new(OUTSIDER, "outsider", Role::Organizer))
                .with_user(User::new(SPECTATOR, "watcher", Role::Spectator)),
        );

        let generator = BracketGenerator::with_seeder(store.clone(), store.clone(), PresetSeeder);
        Self {
            tournaments: TournamentManager::with_generator(
                store.clone(),
                store.clone(),
                store.clone(),
                generator,
            ),
            registry: RegistrationManager::new(store.clone(), store.clone()),
            matches: MatchManager::new(store.clone(), store.clone()),
            stats: StatsManager::new(store.clone(), store.clone(), store.clone(), store.clone()),
            store,
            ctx: RequestContext::default(),
        }
    }

    /// Insert `n` players with consecutive ids starting at [`FIRST_PLAYER`]
    pub fn add_players(&self, n: i64) -> Vec<UserId> {
        (FIRST_PLAYER..FIRST_PLAYER + n)
            .map(|id| {
                self.store
                    .insert_user(User::new(id, format!("player{id}"), Role::Player));
                id
            })
            .collect()
    }

    /// Create and open a tournament owned by [`ORGANIZER`]
    pub async fn open(&self, new: NewTournament) -> Tournament {
        let created = self
            .tournaments
            .create_tournament(&self.ctx, new)
            .await
            .unwrap();
        self.tournaments
            .open_tournament(&self.ctx, created.id, ORGANIZER)
            .await
            .unwrap()
    }

    /// Open single-elimination tournament with `n` registered players
    pub async fn open_with_players(&self, n: i64) -> (Tournament, Vec<UserId>) {
        let tournament = self
            .open(NewTournament::single_elimination("Harness Cup", ORGANIZER))
            .await;
        let players = self.add_players(n);
        for &player in &players {
            self.registry
                .register(&self.ctx, tournament.id, player)
                .await
                .unwrap();
        }
        (tournament, players)
    }
}
