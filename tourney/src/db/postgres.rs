//! PostgreSQL implementation of the repository traits.
#![allow(clippy::needless_raw_string_hashes)]

use async_trait::async_trait;
use sqlx::{PgPool, Row, postgres::PgRow};

use super::errors::{StoreError, StoreResult};
use super::repository::{
    MatchRepository, Page, RegistrationOutcome, StatisticRepository, TournamentRepository,
    UserRepository,
};
use crate::matches::{Match, MatchId, MatchStatus, NewMatch, Score, Side};
use crate::stats::Statistic;
use crate::tournament::{NewTournament, Registration, Tournament, TournamentId, TournamentStatus};
use crate::users::{User, UserId};

const TOURNAMENT_COLUMNS: &str = "id, name, format, status, min_participants, max_participants, \
     registration_deadline, creator_id, bracket_pending, created_at, updated_at";

const MATCH_COLUMNS: &str = "id, tournament_id, round, first_side, second_side, scheduled_at, \
     location, status, score, created_at";

const STATISTIC_COLUMNS: &str = "player_id, tournament_id, wins, losses, sets_won, sets_lost, \
     games_won, games_lost, win_percentage, updated_at";

/// Postgres-backed store for tournaments, matches, users and statistics
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn to_u32(value: i32, column: &str) -> StoreResult<u32> {
    u32::try_from(value).map_err(|_| StoreError::Corrupt(format!("{column} = {value}")))
}

fn opt_u32(value: Option<i32>, column: &str) -> StoreResult<Option<u32>> {
    value.map(|v| to_u32(v, column)).transpose()
}

fn to_i32(value: u32, column: &str) -> StoreResult<i32> {
    i32::try_from(value).map_err(|_| StoreError::OutOfRange(format!("{column} = {value}")))
}

fn parse_column<T>(value: &str) -> StoreResult<T>
where
    T: std::str::FromStr<Err = String>,
{
    value.parse().map_err(StoreError::Corrupt)
}

fn tournament_from_row(row: &PgRow) -> StoreResult<Tournament> {
    Ok(Tournament {
        id: row.try_get("id")?,
        name: row.try_get("name")?,
        format: parse_column(row.try_get::<&str, _>("format")?)?,
        status: parse_column(row.try_get::<&str, _>("status")?)?,
        min_participants: opt_u32(row.try_get("min_participants")?, "min_participants")?,
        max_participants: opt_u32(row.try_get("max_participants")?, "max_participants")?,
        registration_deadline: row.try_get("registration_deadline")?,
        creator_id: row.try_get("creator_id")?,
        bracket_pending: row.try_get("bracket_pending")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

fn side_from_row(row: &PgRow, column: &str) -> StoreResult<Side> {
    let players: Vec<i64> = row.try_get(column)?;
    Side::try_from(players).map_err(StoreError::Corrupt)
}

fn match_from_row(row: &PgRow) -> StoreResult<Match> {
    let score = row
        .try_get::<Option<serde_json::Value>, _>("score")?
        .map(serde_json::from_value::<Score>)
        .transpose()?;

    Ok(Match {
        id: row.try_get("id")?,
        tournament_id: row.try_get("tournament_id")?,
        round: to_u32(row.try_get("round")?, "round")?,
        first: side_from_row(row, "first_side")?,
        second: side_from_row(row, "second_side")?,
        scheduled_at: row.try_get("scheduled_at")?,
        location: row.try_get("location")?,
        status: parse_column::<MatchStatus>(row.try_get::<&str, _>("status")?)?,
        score,
        created_at: row.try_get("created_at")?,
    })
}

fn statistic_from_row(row: &PgRow) -> StoreResult<Statistic> {
    Ok(Statistic {
        player_id: row.try_get("player_id")?,
        tournament_id: row.try_get("tournament_id")?,
        wins: to_u32(row.try_get("wins")?, "wins")?,
        losses: to_u32(row.try_get("losses")?, "losses")?,
        sets_won: to_u32(row.try_get("sets_won")?, "sets_won")?,
        sets_lost: to_u32(row.try_get("sets_lost")?, "sets_lost")?,
        games_won: to_u32(row.try_get("games_won")?, "games_won")?,
        games_lost: to_u32(row.try_get("games_lost")?, "games_lost")?,
        win_percentage: row.try_get("win_percentage")?,
        updated_at: row.try_get("updated_at")?,
    })
}

#[async_trait]
impl TournamentRepository for PgStore {
    async fn create(&self, new: &NewTournament) -> StoreResult<Tournament> {
        let row = sqlx::query(&format!(
            r#"
            INSERT INTO tournaments (name, format, status, min_participants, max_participants,
                                     registration_deadline, creator_id)
            VALUES ($1, $2, 'draft', $3, $4, $5, $6)
            RETURNING {TOURNAMENT_COLUMNS}
            "#
        ))
        .bind(new.name.trim())
        .bind(new.format.as_str())
        .bind(
            new.min_participants
                .map(|v| to_i32(v, "min_participants"))
                .transpose()?,
        )
        .bind(
            new.max_participants
                .map(|v| to_i32(v, "max_participants"))
                .transpose()?,
        )
        .bind(new.registration_deadline)
        .bind(new.creator_id)
        .fetch_one(&self.pool)
        .await?;

        tournament_from_row(&row)
    }

    async fn get(&self, id: TournamentId) -> StoreResult<Option<Tournament>> {
        let row = sqlx::query(&format!(
            "SELECT {TOURNAMENT_COLUMNS} FROM tournaments WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(tournament_from_row).transpose()
    }

    async fn compare_and_set_status(
        &self,
        id: TournamentId,
        expected: TournamentStatus,
        next: TournamentStatus,
        bracket_pending: bool,
    ) -> StoreResult<Option<Tournament>> {
        // Single conditional UPDATE: the row only changes if nobody moved it first
        let row = sqlx::query(&format!(
            r#"
            UPDATE tournaments
            SET status = $3, bracket_pending = $4, updated_at = NOW()
            WHERE id = $1 AND status = $2
            RETURNING {TOURNAMENT_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(expected.as_str())
        .bind(next.as_str())
        .bind(bracket_pending)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(tournament_from_row).transpose()
    }

    async fn list_bracket_pending(&self) -> StoreResult<Vec<Tournament>> {
        let rows = sqlx::query(&format!(
            "SELECT {TOURNAMENT_COLUMNS} FROM tournaments WHERE bracket_pending ORDER BY id"
        ))
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(tournament_from_row).collect()
    }

    async fn count_participants(&self, id: TournamentId) -> StoreResult<u32> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM tournament_registrations WHERE tournament_id = $1")
                .bind(id)
                .fetch_one(&self.pool)
                .await?;

        Ok(u32::try_from(count).unwrap_or(u32::MAX))
    }

    async fn register_participant(
        &self,
        id: TournamentId,
        player_id: UserId,
        max: Option<u32>,
    ) -> StoreResult<RegistrationOutcome> {
        let mut tx = self.pool.begin().await?;

        // Row lock serializes registrations (and status swaps) per tournament
        let status: Option<String> =
            sqlx::query_scalar("SELECT status FROM tournaments WHERE id = $1 FOR UPDATE")
                .bind(id)
                .fetch_optional(&mut *tx)
                .await?;

        let Some(status) = status else {
            return Ok(RegistrationOutcome::TournamentMissing);
        };
        let status: TournamentStatus = parse_column(&status)?;
        if status != TournamentStatus::Open {
            return Ok(RegistrationOutcome::NotOpen(status));
        }

        let existing = sqlx::query(
            "SELECT 1 FROM tournament_registrations WHERE tournament_id = $1 AND player_id = $2",
        )
        .bind(id)
        .bind(player_id)
        .fetch_optional(&mut *tx)
        .await?;

        if existing.is_some() {
            return Ok(RegistrationOutcome::AlreadyRegistered);
        }

        if let Some(max) = max {
            let count: i64 = sqlx::query_scalar(
                "SELECT COUNT(*) FROM tournament_registrations WHERE tournament_id = $1",
            )
            .bind(id)
            .fetch_one(&mut *tx)
            .await?;

            if count >= i64::from(max) {
                return Ok(RegistrationOutcome::CapacityReached(max));
            }
        }

        let row = sqlx::query(
            r#"
            INSERT INTO tournament_registrations (tournament_id, player_id)
            VALUES ($1, $2)
            RETURNING tournament_id, player_id, registered_at
            "#,
        )
        .bind(id)
        .bind(player_id)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(RegistrationOutcome::Registered(Registration {
            tournament_id: row.try_get("tournament_id")?,
            player_id: row.try_get("player_id")?,
            registered_at: row.try_get("registered_at")?,
        }))
    }

    async fn unregister_participant(
        &self,
        id: TournamentId,
        player_id: UserId,
    ) -> StoreResult<bool> {
        let result = sqlx::query(
            "DELETE FROM tournament_registrations WHERE tournament_id = $1 AND player_id = $2",
        )
        .bind(id)
        .bind(player_id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn is_registered(&self, id: TournamentId, player_id: UserId) -> StoreResult<bool> {
        let found: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM tournament_registrations WHERE tournament_id = $1 AND player_id = $2)",
        )
        .bind(id)
        .bind(player_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(found)
    }

    async fn list_participants(
        &self,
        id: TournamentId,
        page: Page,
    ) -> StoreResult<Vec<Registration>> {
        let page = page.normalized();
        let rows = sqlx::query(
            r#"
            SELECT tournament_id, player_id, registered_at
            FROM tournament_registrations
            WHERE tournament_id = $1
            ORDER BY id
            OFFSET $2 LIMIT $3
            "#,
        )
        .bind(id)
        .bind(i64::from(page.offset))
        .bind(i64::from(page.limit))
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .map(|row| {
                Ok(Registration {
                    tournament_id: row.try_get("tournament_id")?,
                    player_id: row.try_get("player_id")?,
                    registered_at: row.try_get("registered_at")?,
                })
            })
            .collect()
    }

    async fn participant_ids(&self, id: TournamentId) -> StoreResult<Vec<UserId>> {
        let ids = sqlx::query_scalar(
            "SELECT player_id FROM tournament_registrations WHERE tournament_id = $1 ORDER BY id",
        )
        .bind(id)
        .fetch_all(&self.pool)
        .await?;

        Ok(ids)
    }
}

#[async_trait]
impl MatchRepository for PgStore {
    async fn get_match(&self, id: MatchId) -> StoreResult<Option<Match>> {
        let row = sqlx::query(&format!("SELECT {MATCH_COLUMNS} FROM matches WHERE id = $1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(match_from_row).transpose()
    }

    async fn find_by_tournament(&self, tournament_id: TournamentId) -> StoreResult<Vec<Match>> {
        let rows = sqlx::query(&format!(
            "SELECT {MATCH_COLUMNS} FROM matches WHERE tournament_id = $1 ORDER BY round, id"
        ))
        .bind(tournament_id)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(match_from_row).collect()
    }

    async fn find_completed_for_player(
        &self,
        tournament_id: TournamentId,
        player_id: UserId,
    ) -> StoreResult<Vec<Match>> {
        let rows = sqlx::query(&format!(
            r#"
            SELECT {MATCH_COLUMNS} FROM matches
            WHERE tournament_id = $1
              AND status = 'completed'
              AND ($2 = ANY(first_side) OR $2 = ANY(second_side))
            ORDER BY round, id
            "#
        ))
        .bind(tournament_id)
        .bind(player_id)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(match_from_row).collect()
    }

    async fn has_any_matches(&self, tournament_id: TournamentId) -> StoreResult<bool> {
        let found: bool =
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM matches WHERE tournament_id = $1)")
                .bind(tournament_id)
                .fetch_one(&self.pool)
                .await?;

        Ok(found)
    }

    async fn save_bracket(
        &self,
        tournament_id: TournamentId,
        matches: &[NewMatch],
    ) -> StoreResult<Option<Vec<Match>>> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("SELECT id FROM tournaments WHERE id = $1 FOR UPDATE")
            .bind(tournament_id)
            .fetch_optional(&mut *tx)
            .await?;

        let exists: bool =
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM matches WHERE tournament_id = $1)")
                .bind(tournament_id)
                .fetch_one(&mut *tx)
                .await?;

        if exists {
            return Ok(None);
        }

        let mut saved = Vec::with_capacity(matches.len());
        for new in matches {
            let row = sqlx::query(&format!(
                r#"
                INSERT INTO matches (tournament_id, round, first_side, second_side, status)
                VALUES ($1, $2, $3, $4, $5)
                RETURNING {MATCH_COLUMNS}
                "#
            ))
            .bind(tournament_id)
            .bind(to_i32(new.round, "round")?)
            .bind(new.first.players())
            .bind(new.second.players())
            .bind(new.status.as_str())
            .fetch_one(&mut *tx)
            .await?;

            saved.push(match_from_row(&row)?);
        }

        tx.commit().await?;
        Ok(Some(saved))
    }

    async fn update_match(&self, m: &Match) -> StoreResult<()> {
        let score = m.score.as_ref().map(serde_json::to_value).transpose()?;

        let result = sqlx::query(
            r#"
            UPDATE matches
            SET scheduled_at = $2, location = $3, status = $4, score = $5
            WHERE id = $1
            "#,
        )
        .bind(m.id)
        .bind(m.scheduled_at)
        .bind(&m.location)
        .bind(m.status.as_str())
        .bind(score)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::Corrupt(format!("match {} does not exist", m.id)));
        }
        Ok(())
    }
}

#[async_trait]
impl UserRepository for PgStore {
    async fn find_by_id(&self, user_id: UserId) -> StoreResult<Option<User>> {
        let row = sqlx::query(
            "SELECT id, username, display_name, role, is_active, created_at FROM users WHERE id = $1",
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(|r| {
            Ok(User {
                id: r.try_get("id")?,
                username: r.try_get("username")?,
                display_name: r.try_get("display_name")?,
                role: parse_column(r.try_get::<&str, _>("role")?)?,
                is_active: r.try_get("is_active")?,
                created_at: r.try_get("created_at")?,
            })
        })
        .transpose()
    }
}

#[async_trait]
impl StatisticRepository for PgStore {
    async fn find_by_player_and_tournament(
        &self,
        player_id: UserId,
        tournament_id: TournamentId,
    ) -> StoreResult<Option<Statistic>> {
        let row = sqlx::query(&format!(
            "SELECT {STATISTIC_COLUMNS} FROM player_statistics WHERE player_id = $1 AND tournament_id = $2"
        ))
        .bind(player_id)
        .bind(tournament_id)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(statistic_from_row).transpose()
    }

    async fn upsert(&self, statistic: &Statistic) -> StoreResult<Statistic> {
        let row = sqlx::query(&format!(
            r#"
            INSERT INTO player_statistics (player_id, tournament_id, wins, losses, sets_won,
                                           sets_lost, games_won, games_lost, win_percentage,
                                           updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            ON CONFLICT (player_id, tournament_id) DO UPDATE SET
                wins = EXCLUDED.wins,
                losses = EXCLUDED.losses,
                sets_won = EXCLUDED.sets_won,
                sets_lost = EXCLUDED.sets_lost,
                games_won = EXCLUDED.games_won,
                games_lost = EXCLUDED.games_lost,
                win_percentage = EXCLUDED.win_percentage,
                updated_at = EXCLUDED.updated_at
            RETURNING {STATISTIC_COLUMNS}
            "#
        ))
        .bind(statistic.player_id)
        .bind(statistic.tournament_id)
        .bind(to_i32(statistic.wins, "wins")?)
        .bind(to_i32(statistic.losses, "losses")?)
        .bind(to_i32(statistic.sets_won, "sets_won")?)
        .bind(to_i32(statistic.sets_lost, "sets_lost")?)
        .bind(to_i32(statistic.games_won, "games_won")?)
        .bind(to_i32(statistic.games_lost, "games_lost")?)
        .bind(statistic.win_percentage)
        .bind(statistic.updated_at)
        .fetch_one(&self.pool)
        .await?;

        statistic_from_row(&row)
    }

    async fn list_by_tournament(&self, tournament_id: TournamentId) -> StoreResult<Vec<Statistic>> {
        let rows = sqlx::query(&format!(
            "SELECT {STATISTIC_COLUMNS} FROM player_statistics WHERE tournament_id = $1 ORDER BY player_id"
        ))
        .bind(tournament_id)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(statistic_from_row).collect()
    }
}
