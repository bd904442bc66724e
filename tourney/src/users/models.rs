//! User data models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

/// User ID type
pub type UserId = i64;

/// Role held by a user account
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Platform administrator, may drive any tournament
    Admin,
    /// Creates and runs tournaments
    Organizer,
    /// Competes in tournaments
    Player,
    /// Read-only account
    Spectator,
}

impl Role {
    /// Whether a user holding this role may register to compete
    pub fn can_compete(self) -> bool {
        matches!(self, Role::Player)
    }

    /// Whether this role grants control over every tournament
    pub fn is_admin(self) -> bool {
        matches!(self, Role::Admin)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Organizer => "organizer",
            Role::Player => "player",
            Role::Spectator => "spectator",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "admin" => Ok(Role::Admin),
            "organizer" => Ok(Role::Organizer),
            "player" => Ok(Role::Player),
            "spectator" => Ok(Role::Spectator),
            other => Err(format!("unknown role '{other}'")),
        }
    }
}

/// User model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub username: String,
    pub display_name: String,
    pub role: Role,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

impl User {
    /// Build an active user with the current timestamp
    pub fn new(id: UserId, username: impl Into<String>, role: Role) -> Self {
        let username = username.into();
        Self {
            id,
            display_name: username.clone(),
            username,
            role,
            is_active: true,
            created_at: Utc::now(),
        }
    }

    /// Whether this user may register as a competitor
    pub fn is_eligible_competitor(&self) -> bool {
        self.is_active && self.role.can_compete()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_players_compete() {
        assert!(Role::Player.can_compete());
        assert!(!Role::Admin.can_compete());
        assert!(!Role::Organizer.can_compete());
        assert!(!Role::Spectator.can_compete());
    }

    #[test]
    fn test_inactive_player_not_eligible() {
        let mut user = User::new(7, "alice", Role::Player);
        assert!(user.is_eligible_competitor());

        user.is_active = false;
        assert!(!user.is_eligible_competitor());
    }

    #[test]
    fn test_role_string_round_trip() {
        for role in [Role::Admin, Role::Organizer, Role::Player, Role::Spectator] {
            assert_eq!(role.as_str().parse::<Role>(), Ok(role));
        }
        assert!("referee".parse::<Role>().is_err());
    }
}
