//! Player statistics, a materialized view over completed matches.

pub mod aggregator;
pub mod models;

pub use aggregator::{StatsManager, compute_statistic};
pub use models::{Statistic, win_percentage};
