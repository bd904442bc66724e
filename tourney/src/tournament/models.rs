//! Tournament data models and the lifecycle state machine.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

use crate::bracket::BracketSummary;
use crate::users::UserId;

/// Tournament ID type
pub type TournamentId = i64;

/// Longest accepted tournament name
pub const MAX_NAME_LEN: usize = 200;

/// Fewest participants a bracket can be built from
pub const MIN_BRACKET_PARTICIPANTS: u32 = 2;

/// Tournament status
///
/// ```text
/// DRAFT --(open)--> OPEN --(start)--> ACTIVE --(complete)--> COMPLETED
/// DRAFT|OPEN|ACTIVE --(cancel)--> CANCELLED
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TournamentStatus {
    /// Being set up, not visible for registration
    Draft,
    /// Accepting registrations
    Open,
    /// Bracket generated, matches being played
    Active,
    /// Finished
    Completed,
    /// Cancelled
    Cancelled,
}

impl TournamentStatus {
    /// Whether no transition leaves this status
    pub fn is_terminal(self) -> bool {
        matches!(self, TournamentStatus::Completed | TournamentStatus::Cancelled)
    }

    /// Whether `self -> next` is an edge of the lifecycle graph
    pub fn can_transition_to(self, next: TournamentStatus) -> bool {
        use TournamentStatus::*;
        matches!(
            (self, next),
            (Draft, Open)
                | (Open, Active)
                | (Active, Completed)
                | (Draft, Cancelled)
                | (Open, Cancelled)
                | (Active, Cancelled)
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            TournamentStatus::Draft => "draft",
            TournamentStatus::Open => "open",
            TournamentStatus::Active => "active",
            TournamentStatus::Completed => "completed",
            TournamentStatus::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for TournamentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TournamentStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "draft" => Ok(TournamentStatus::Draft),
            "open" => Ok(TournamentStatus::Open),
            "active" => Ok(TournamentStatus::Active),
            "completed" => Ok(TournamentStatus::Completed),
            "cancelled" => Ok(TournamentStatus::Cancelled),
            other => Err(format!("unknown tournament status '{other}'")),
        }
    }
}

/// Bracket format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TournamentFormat {
    SingleElimination,
    DoubleElimination,
    RoundRobin,
    Swiss,
}

impl TournamentFormat {
    /// Whether a bracket can be generated for this format
    pub fn is_supported(self) -> bool {
        matches!(self, TournamentFormat::SingleElimination)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            TournamentFormat::SingleElimination => "single_elimination",
            TournamentFormat::DoubleElimination => "double_elimination",
            TournamentFormat::RoundRobin => "round_robin",
            TournamentFormat::Swiss => "swiss",
        }
    }
}

impl fmt::Display for TournamentFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TournamentFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "single_elimination" => Ok(TournamentFormat::SingleElimination),
            "double_elimination" => Ok(TournamentFormat::DoubleElimination),
            "round_robin" => Ok(TournamentFormat::RoundRobin),
            "swiss" => Ok(TournamentFormat::Swiss),
            other => Err(format!("unknown tournament format '{other}'")),
        }
    }
}

/// Lifecycle operations, used to name the rejected operation in errors
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LifecycleAction {
    Open,
    Start,
    Complete,
    Cancel,
    Register,
    Unregister,
    RecordResult,
}

impl fmt::Display for LifecycleAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let repr = match self {
            LifecycleAction::Open => "open",
            LifecycleAction::Start => "start",
            LifecycleAction::Complete => "complete",
            LifecycleAction::Cancel => "cancel",
            LifecycleAction::Register => "register for",
            LifecycleAction::Unregister => "unregister from",
            LifecycleAction::RecordResult => "record results in",
        };
        f.write_str(repr)
    }
}

/// Tournament record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tournament {
    pub id: TournamentId,
    pub name: String,
    pub format: TournamentFormat,
    pub status: TournamentStatus,
    pub min_participants: Option<u32>,
    pub max_participants: Option<u32>,
    pub registration_deadline: Option<DateTime<Utc>>,
    pub creator_id: UserId,
    /// Set while a start is between the status swap and bracket persistence
    pub bracket_pending: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Tournament {
    /// Whether the registration deadline, if any, lies before `now`
    pub fn registration_expired(&self, now: DateTime<Utc>) -> bool {
        self.registration_deadline
            .is_some_and(|deadline| deadline < now)
    }

    /// Registrations needed before the tournament can start
    pub fn required_participants(&self) -> u32 {
        self.min_participants
            .unwrap_or(MIN_BRACKET_PARTICIPANTS)
            .max(MIN_BRACKET_PARTICIPANTS)
    }

    /// Whether `user_id` created this tournament
    pub fn is_created_by(&self, user_id: UserId) -> bool {
        self.creator_id == user_id
    }
}

/// Input for creating a tournament
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewTournament {
    pub name: String,
    pub format: TournamentFormat,
    #[serde(default)]
    pub min_participants: Option<u32>,
    #[serde(default)]
    pub max_participants: Option<u32>,
    #[serde(default)]
    pub registration_deadline: Option<DateTime<Utc>>,
    pub creator_id: UserId,
}

impl NewTournament {
    /// Single-elimination tournament with no capacity bounds or deadline
    pub fn single_elimination(name: impl Into<String>, creator_id: UserId) -> Self {
        Self {
            name: name.into(),
            format: TournamentFormat::SingleElimination,
            min_participants: None,
            max_participants: None,
            registration_deadline: None,
            creator_id,
        }
    }

    pub fn with_format(mut self, format: TournamentFormat) -> Self {
        self.format = format;
        self
    }

    pub fn with_capacity(mut self, min: Option<u32>, max: Option<u32>) -> Self {
        self.min_participants = min;
        self.max_participants = max;
        self
    }

    pub fn with_deadline(mut self, deadline: DateTime<Utc>) -> Self {
        self.registration_deadline = Some(deadline);
        self
    }

    /// Check field constraints, returning a description of the first violation
    pub fn validate(&self) -> Result<(), String> {
        let name = self.name.trim();
        if name.is_empty() {
            return Err("name must not be empty".to_string());
        }
        if name.chars().count() > MAX_NAME_LEN {
            return Err(format!("name must be at most {MAX_NAME_LEN} characters"));
        }

        if self
            .max_participants
            .is_some_and(|max| max < MIN_BRACKET_PARTICIPANTS)
        {
            return Err(format!(
                "max_participants must be at least {MIN_BRACKET_PARTICIPANTS}"
            ));
        }

        if let (Some(min), Some(max)) = (self.min_participants, self.max_participants) {
            if min > max {
                return Err(format!(
                    "min_participants ({min}) exceeds max_participants ({max})"
                ));
            }
        }

        Ok(())
    }
}

/// Tournament registration entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Registration {
    pub tournament_id: TournamentId,
    pub player_id: UserId,
    pub registered_at: DateTime<Utc>,
}

/// Result of a successful start
#[derive(Debug, Clone, Serialize)]
pub struct StartOutcome {
    pub tournament: Tournament,
    pub bracket: BracketSummary,
    pub message: String,
}

/// Markers resolved by a recovery pass
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RecoveryReport {
    /// ACTIVE tournaments whose bracket was fully written
    pub confirmed: Vec<TournamentId>,
    /// Tournaments reverted to OPEN because no bracket was written
    pub reverted: Vec<TournamentId>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn tournament(status: TournamentStatus) -> Tournament {
        let now = Utc::now();
        Tournament {
            id: 1,
            name: "Spring Open".to_string(),
            format: TournamentFormat::SingleElimination,
            status,
            min_participants: None,
            max_participants: None,
            registration_deadline: None,
            creator_id: 10,
            bracket_pending: false,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_forward_path() {
        use TournamentStatus::*;
        assert!(Draft.can_transition_to(Open));
        assert!(Open.can_transition_to(Active));
        assert!(Active.can_transition_to(Completed));
    }

    #[test]
    fn test_active_only_from_open() {
        use TournamentStatus::*;
        for from in [Draft, Active, Completed, Cancelled] {
            assert!(!from.can_transition_to(Active), "{from} -> active");
        }
    }

    #[test]
    fn test_cancel_from_non_terminal_only() {
        use TournamentStatus::*;
        assert!(Draft.can_transition_to(Cancelled));
        assert!(Open.can_transition_to(Cancelled));
        assert!(Active.can_transition_to(Cancelled));
        assert!(!Completed.can_transition_to(Cancelled));
        assert!(!Cancelled.can_transition_to(Cancelled));
    }

    #[test]
    fn test_terminal_states_have_no_exit() {
        use TournamentStatus::*;
        for from in [Completed, Cancelled] {
            assert!(from.is_terminal());
            for to in [Draft, Open, Active, Completed, Cancelled] {
                assert!(!from.can_transition_to(to));
            }
        }
    }

    #[test]
    fn test_only_single_elimination_supported() {
        assert!(TournamentFormat::SingleElimination.is_supported());
        assert!(!TournamentFormat::DoubleElimination.is_supported());
        assert!(!TournamentFormat::RoundRobin.is_supported());
        assert!(!TournamentFormat::Swiss.is_supported());
    }

    #[test]
    fn test_registration_expired() {
        let mut t = tournament(TournamentStatus::Open);
        let now = Utc::now();
        assert!(!t.registration_expired(now));

        t.registration_deadline = Some(now - Duration::minutes(1));
        assert!(t.registration_expired(now));

        t.registration_deadline = Some(now + Duration::minutes(1));
        assert!(!t.registration_expired(now));
    }

    #[test]
    fn test_required_participants_never_below_two() {
        let mut t = tournament(TournamentStatus::Open);
        assert_eq!(t.required_participants(), 2);

        t.min_participants = Some(0);
        assert_eq!(t.required_participants(), 2);

        t.min_participants = Some(6);
        assert_eq!(t.required_participants(), 6);
    }

    #[test]
    fn test_new_tournament_validation() {
        assert!(NewTournament::single_elimination("Cup", 1).validate().is_ok());
        assert!(NewTournament::single_elimination("   ", 1).validate().is_err());
        assert!(
            NewTournament::single_elimination("x".repeat(MAX_NAME_LEN + 1), 1)
                .validate()
                .is_err()
        );
        assert!(
            NewTournament::single_elimination("Cup", 1)
                .with_capacity(None, Some(1))
                .validate()
                .is_err()
        );
        assert!(
            NewTournament::single_elimination("Cup", 1)
                .with_capacity(Some(8), Some(4))
                .validate()
                .is_err()
        );
        assert!(
            NewTournament::single_elimination("Cup", 1)
                .with_capacity(Some(4), Some(8))
                .validate()
                .is_ok()
        );
    }

    #[test]
    fn test_status_parse_rejects_unknown() {
        assert_eq!("open".parse::<TournamentStatus>(), Ok(TournamentStatus::Open));
        assert!("paused".parse::<TournamentStatus>().is_err());
    }
}
