//! Tournament lifecycle and participant registration.
//!
//! ## Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use tourney::db::{InMemoryStore, RequestContext};
//! use tourney::tournament::{NewTournament, TournamentManager};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let store = InMemoryStore::shared();
//!     let manager = TournamentManager::new(store.clone(), store.clone(), store.clone());
//!     let ctx = RequestContext::default();
//!
//!     let tournament = manager
//!         .create_tournament(&ctx, NewTournament::single_elimination("Club Cup", 1))
//!         .await?;
//!     manager.open_tournament(&ctx, tournament.id, 1).await?;
//!
//!     Ok(())
//! }
//! ```

pub mod errors;
pub mod lifecycle;
pub mod models;
pub mod registry;

pub use errors::{ErrorKind, TournamentError, TournamentResult};
pub use lifecycle::TournamentManager;
pub use models::{
    LifecycleAction, MAX_NAME_LEN, MIN_BRACKET_PARTICIPANTS, NewTournament, RecoveryReport,
    Registration, StartOutcome, Tournament, TournamentFormat, TournamentId, TournamentStatus,
};
pub use registry::RegistrationManager;
