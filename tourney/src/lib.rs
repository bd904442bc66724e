//! # Tourney
//!
//! Tournament management: participant registration, a lifecycle state machine,
//! single-elimination bracket generation and player statistics.
//!
//! ## Architecture
//!
//! A tournament moves through a strict forward path:
//!
//! ```text
//! DRAFT --(open)--> OPEN --(start)--> ACTIVE --(complete)--> COMPLETED
//! DRAFT|OPEN|ACTIVE --(cancel)--> CANCELLED
//! ```
//!
//! Starting a tournament swaps its status with a compare-and-set and then
//! writes the first round as one batch. If the bracket cannot be written the
//! tournament is put back to OPEN; a `bracket_pending` marker lets
//! [`tournament::TournamentManager::recover_pending_brackets`] clean up after a
//! crash in between.
//!
//! ## Core Modules
//!
//! - [`tournament`]: lifecycle transitions and participant registration
//! - [`bracket`]: bracket planning, seeding and persistence
//! - [`matches`]: match scheduling and results
//! - [`stats`]: statistics recomputation
//! - [`db`]: storage traits, Postgres and in-memory stores, deadlines
//!
//! ## Example
//!
//! ```
//! use tourney::bracket::{PresetSeeder, plan_single_elimination};
//!
//! let plan = plan_single_elimination(&[1, 2, 3, 4, 5, 6, 7], &mut PresetSeeder).unwrap();
//! assert_eq!(plan.rounds, 3);
//! assert_eq!(plan.byes, 1);
//! assert_eq!(plan.pairings.len(), 3);
//! ```

pub mod bracket;
pub mod db;
pub mod matches;
pub mod stats;
pub mod tournament;
pub mod users;

pub use bracket::{BracketGenerator, BracketSummary};
pub use db::{RequestContext, StoreError};
pub use matches::MatchManager;
pub use stats::StatsManager;
pub use tournament::{
    ErrorKind, RegistrationManager, TournamentError, TournamentManager, TournamentResult,
};
