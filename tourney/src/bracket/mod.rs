//! Bracket generation.
//!
//! Only single elimination is executable; every other format is rejected with
//! `UnsupportedFormat`. Seeding is pluggable through [`Seeder`] so brackets
//! can be reproduced from a fixed seed or an explicit order.

pub mod generator;
pub mod seeding;

pub use generator::{BracketGenerator, BracketPlan, BracketSummary, plan_single_elimination};
pub use seeding::{PresetSeeder, RandomSeeder, Seeder};
