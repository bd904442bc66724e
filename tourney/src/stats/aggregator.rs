//! Statistics recomputation from completed matches.

use chrono::{DateTime, Utc};
use std::sync::Arc;

use super::models::{Statistic, win_percentage};
use crate::db::{
    MatchRepository, RequestContext, StatisticRepository, TournamentRepository, UserRepository,
    guarded,
};
use crate::matches::{Match, MatchStatus};
use crate::tournament::{TournamentError, TournamentId, TournamentResult};
use crate::users::UserId;

/// Derive a player's record from match history
///
/// Only completed, scored matches the player took part in are counted. A
/// match is won on a strict majority of sets; an even split counts as
/// neither a win nor a loss.
pub fn compute_statistic(
    player_id: UserId,
    tournament_id: TournamentId,
    matches: &[Match],
    now: DateTime<Utc>,
) -> Statistic {
    let mut stat = Statistic {
        player_id,
        tournament_id,
        wins: 0,
        losses: 0,
        sets_won: 0,
        sets_lost: 0,
        games_won: 0,
        games_lost: 0,
        win_percentage: None,
        updated_at: now,
    };

    for m in matches {
        if m.tournament_id != tournament_id || m.status != MatchStatus::Completed {
            continue;
        }
        let (Some(side), Some(score)) = (m.side_of(player_id), m.score.as_ref()) else {
            continue;
        };
        let other = side.opposite();

        let won = score.sets_won(side);
        let lost = score.sets_won(other);
        stat.sets_won = stat.sets_won.saturating_add(won);
        stat.sets_lost = stat.sets_lost.saturating_add(lost);

        for set in score.sets() {
            stat.games_won = stat.games_won.saturating_add(set.games(side));
            stat.games_lost = stat.games_lost.saturating_add(set.games(other));
        }

        if won > lost {
            stat.wins = stat.wins.saturating_add(1);
        } else if lost > won {
            stat.losses = stat.losses.saturating_add(1);
        }
    }

    stat.win_percentage = win_percentage(stat.wins, stat.losses);
    stat
}

/// Sole writer of player statistics
#[derive(Clone)]
pub struct StatsManager {
    tournaments: Arc<dyn TournamentRepository>,
    matches: Arc<dyn MatchRepository>,
    users: Arc<dyn UserRepository>,
    statistics: Arc<dyn StatisticRepository>,
}

impl StatsManager {
    pub fn new(
        tournaments: Arc<dyn TournamentRepository>,
        matches: Arc<dyn MatchRepository>,
        users: Arc<dyn UserRepository>,
        statistics: Arc<dyn StatisticRepository>,
    ) -> Self {
        Self {
            tournaments,
            matches,
            users,
            statistics,
        }
    }

    /// Rebuild and store one player's statistic for a tournament
    ///
    /// The stored row is replaced in full, so running this twice over the same
    /// match history yields the same row.
    pub async fn recompute(
        &self,
        ctx: &RequestContext,
        player_id: UserId,
        tournament_id: TournamentId,
    ) -> TournamentResult<Statistic> {
        self.ensure_tournament(ctx, tournament_id).await?;
        guarded(ctx, self.users.find_by_id(player_id))
            .await?
            .ok_or(TournamentError::UserNotFound(player_id))?;

        self.rebuild(ctx, player_id, tournament_id).await
    }

    /// Rebuild the statistics of every registered participant
    pub async fn recompute_tournament(
        &self,
        ctx: &RequestContext,
        tournament_id: TournamentId,
    ) -> TournamentResult<Vec<Statistic>> {
        self.ensure_tournament(ctx, tournament_id).await?;
        let participants = guarded(ctx, self.tournaments.participant_ids(tournament_id)).await?;

        let mut rebuilt = Vec::with_capacity(participants.len());
        for player_id in participants {
            rebuilt.push(self.rebuild(ctx, player_id, tournament_id).await?);
        }

        log::info!(
            "Recomputed statistics for {} players in tournament {tournament_id}",
            rebuilt.len()
        );
        Ok(rebuilt)
    }

    /// Stored statistic, if one was computed
    pub async fn get_statistic(
        &self,
        ctx: &RequestContext,
        player_id: UserId,
        tournament_id: TournamentId,
    ) -> TournamentResult<Option<Statistic>> {
        Ok(guarded(
            ctx,
            self.statistics
                .find_by_player_and_tournament(player_id, tournament_id),
        )
        .await?)
    }

    pub async fn list_statistics(
        &self,
        ctx: &RequestContext,
        tournament_id: TournamentId,
    ) -> TournamentResult<Vec<Statistic>> {
        self.ensure_tournament(ctx, tournament_id).await?;
        Ok(guarded(ctx, self.statistics.list_by_tournament(tournament_id)).await?)
    }

    async fn rebuild(
        &self,
        ctx: &RequestContext,
        player_id: UserId,
        tournament_id: TournamentId,
    ) -> TournamentResult<Statistic> {
        let history = guarded(
            ctx,
            self.matches
                .find_completed_for_player(tournament_id, player_id),
        )
        .await?;

        let stat = compute_statistic(player_id, tournament_id, &history, Utc::now());
        Ok(guarded(ctx, self.statistics.upsert(&stat)).await?)
    }

    async fn ensure_tournament(
        &self,
        ctx: &RequestContext,
        tournament_id: TournamentId,
    ) -> TournamentResult<()> {
        guarded(ctx, self.tournaments.get(tournament_id))
            .await?
            .ok_or(TournamentError::TournamentNotFound(tournament_id))?;
        Ok(())
    }
}
