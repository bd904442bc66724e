//! Tournament error types.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;
use thiserror::Error;

use super::models::{LifecycleAction, TournamentFormat, TournamentId, TournamentStatus};
use crate::db::StoreError;
use crate::matches::MatchId;
use crate::users::UserId;

/// Stable error category reported to callers
///
/// Transports map these to their own status vocabulary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Validation,
    NotFound,
    PermissionDenied,
    InvalidState,
    Conflict,
    CapacityExceeded,
    Expired,
    InsufficientParticipants,
    UnsupportedFormat,
    PersistenceFailure,
}

impl ErrorKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorKind::Validation => "validation",
            ErrorKind::NotFound => "not_found",
            ErrorKind::PermissionDenied => "permission_denied",
            ErrorKind::InvalidState => "invalid_state",
            ErrorKind::Conflict => "conflict",
            ErrorKind::CapacityExceeded => "capacity_exceeded",
            ErrorKind::Expired => "expired",
            ErrorKind::InsufficientParticipants => "insufficient_participants",
            ErrorKind::UnsupportedFormat => "unsupported_format",
            ErrorKind::PersistenceFailure => "persistence_failure",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Tournament errors
#[derive(Debug, Error)]
pub enum TournamentError {
    /// Malformed identifier or input
    #[error("Invalid input: {0}")]
    Validation(String),

    #[error("Tournament not found: {0}")]
    TournamentNotFound(TournamentId),

    #[error("User not found: {0}")]
    UserNotFound(UserId),

    #[error("Match not found: {0}")]
    MatchNotFound(MatchId),

    #[error("Player {player_id} is not registered for tournament {tournament_id}")]
    NotRegistered {
        tournament_id: TournamentId,
        player_id: UserId,
    },

    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    #[error("Cannot {action} tournament {tournament_id}: tournament is {actual}")]
    InvalidState {
        tournament_id: TournamentId,
        action: LifecycleAction,
        actual: TournamentStatus,
    },

    /// Match is not in a status that allows the operation
    #[error("Match {match_id} cannot be updated: {reason}")]
    InvalidMatchState { match_id: MatchId, reason: String },

    #[error("Player {player_id} already registered for tournament {tournament_id}")]
    AlreadyRegistered {
        tournament_id: TournamentId,
        player_id: UserId,
    },

    #[error("Bracket already generated for tournament {0}")]
    BracketAlreadyGenerated(TournamentId),

    #[error("Tournament {tournament_id} is full: {max} participants")]
    CapacityExceeded { tournament_id: TournamentId, max: u32 },

    #[error("Registration for tournament {tournament_id} closed at {deadline}")]
    RegistrationExpired {
        tournament_id: TournamentId,
        deadline: DateTime<Utc>,
    },

    #[error("Insufficient participants: need {needed}, have {current}")]
    InsufficientParticipants { needed: u32, current: u32 },

    #[error("Unsupported tournament format: {0}")]
    UnsupportedFormat(TournamentFormat),

    /// Bracket generation failed after the start transition; status was reverted
    #[error("Tournament started but bracket generation failed: {0}")]
    BracketGenerationFailed(#[source] Box<TournamentError>),

    /// Bracket generation failed and so did the revert to OPEN
    #[error(
        "Tournament started but bracket generation failed: {generation}; reverting status also failed: {revert}"
    )]
    CompensationFailed {
        generation: Box<TournamentError>,
        revert: Box<TournamentError>,
    },

    #[error("Persistence failure: {0}")]
    Persistence(#[from] StoreError),
}

impl TournamentError {
    /// Stable category of this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            TournamentError::Validation(_) => ErrorKind::Validation,
            TournamentError::TournamentNotFound(_)
            | TournamentError::UserNotFound(_)
            | TournamentError::MatchNotFound(_)
            | TournamentError::NotRegistered { .. } => ErrorKind::NotFound,
            TournamentError::PermissionDenied(_) => ErrorKind::PermissionDenied,
            TournamentError::InvalidState { .. } | TournamentError::InvalidMatchState { .. } => {
                ErrorKind::InvalidState
            }
            TournamentError::AlreadyRegistered { .. }
            | TournamentError::BracketAlreadyGenerated(_) => ErrorKind::Conflict,
            TournamentError::CapacityExceeded { .. } => ErrorKind::CapacityExceeded,
            TournamentError::RegistrationExpired { .. } => ErrorKind::Expired,
            TournamentError::InsufficientParticipants { .. } => {
                ErrorKind::InsufficientParticipants
            }
            TournamentError::UnsupportedFormat(_) => ErrorKind::UnsupportedFormat,
            TournamentError::BracketGenerationFailed(source) => source.kind(),
            TournamentError::CompensationFailed { .. } | TournamentError::Persistence(_) => {
                ErrorKind::PersistenceFailure
            }
        }
    }

    /// Whether a storage timeout is at the root of this error
    pub fn is_timeout(&self) -> bool {
        match self {
            TournamentError::Persistence(StoreError::Timeout(_)) => true,
            TournamentError::BracketGenerationFailed(source) => source.is_timeout(),
            _ => false,
        }
    }

    /// Get a client-safe error message that doesn't leak storage internals
    pub fn client_message(&self) -> String {
        match self {
            TournamentError::Persistence(_) => "Internal server error".to_string(),
            TournamentError::CompensationFailed { .. } => {
                "Tournament start failed and is pending recovery".to_string()
            }
            TournamentError::BracketGenerationFailed(source) => format!(
                "Tournament started but bracket generation failed: {}",
                source.client_message()
            ),
            _ => self.to_string(),
        }
    }
}

/// Result type for tournament operations
pub type TournamentResult<T> = Result<T, TournamentError>;
