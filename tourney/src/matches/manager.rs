//! Match scheduling and result recording.

use chrono::{DateTime, Utc};
use std::sync::Arc;

use super::models::{Match, MatchId, MatchStatus, Score};
use crate::db::{MatchRepository, RequestContext, TournamentRepository, guarded};
use crate::tournament::{
    LifecycleAction, TournamentError, TournamentId, TournamentResult, TournamentStatus,
};

/// Match manager
#[derive(Clone)]
pub struct MatchManager {
    tournaments: Arc<dyn TournamentRepository>,
    matches: Arc<dyn MatchRepository>,
}

impl MatchManager {
    pub fn new(
        tournaments: Arc<dyn TournamentRepository>,
        matches: Arc<dyn MatchRepository>,
    ) -> Self {
        Self {
            tournaments,
            matches,
        }
    }

    /// Store the final score of a match and mark it COMPLETED
    ///
    /// The tournament must be ACTIVE and the match neither completed nor
    /// cancelled.
    pub async fn record_result(
        &self,
        ctx: &RequestContext,
        match_id: MatchId,
        score: Score,
    ) -> TournamentResult<Match> {
        score.validate().map_err(TournamentError::Validation)?;

        let mut m = self.load_match(ctx, match_id).await?;
        let tournament = guarded(ctx, self.tournaments.get(m.tournament_id))
            .await?
            .ok_or(TournamentError::TournamentNotFound(m.tournament_id))?;

        if tournament.status != TournamentStatus::Active {
            return Err(TournamentError::InvalidState {
                tournament_id: tournament.id,
                action: LifecycleAction::RecordResult,
                actual: tournament.status,
            });
        }

        if m.status.is_final() {
            return Err(TournamentError::InvalidMatchState {
                match_id,
                reason: format!("match is already {}", m.status),
            });
        }

        m.status = MatchStatus::Completed;
        m.score = Some(score);
        guarded(ctx, self.matches.update_match(&m)).await?;

        log::info!(
            "Recorded result for match {match_id} in tournament {}",
            m.tournament_id
        );
        Ok(m)
    }

    /// Assign a date and optional location to a PENDING or SCHEDULED match
    pub async fn schedule_match(
        &self,
        ctx: &RequestContext,
        match_id: MatchId,
        at: DateTime<Utc>,
        location: Option<String>,
    ) -> TournamentResult<Match> {
        let mut m = self.load_match(ctx, match_id).await?;

        if !matches!(m.status, MatchStatus::Pending | MatchStatus::Scheduled) {
            return Err(TournamentError::InvalidMatchState {
                match_id,
                reason: format!("cannot schedule a match that is {}", m.status),
            });
        }

        m.scheduled_at = Some(at);
        m.location = location
            .map(|l| l.trim().to_string())
            .filter(|l| !l.is_empty());
        m.status = MatchStatus::Scheduled;
        guarded(ctx, self.matches.update_match(&m)).await?;

        Ok(m)
    }

    /// Every match of a tournament, by round
    pub async fn list_matches(
        &self,
        ctx: &RequestContext,
        tournament_id: TournamentId,
    ) -> TournamentResult<Vec<Match>> {
        guarded(ctx, self.tournaments.get(tournament_id))
            .await?
            .ok_or(TournamentError::TournamentNotFound(tournament_id))?;

        Ok(guarded(ctx, self.matches.find_by_tournament(tournament_id)).await?)
    }

    pub async fn get_match(&self, ctx: &RequestContext, match_id: MatchId) -> TournamentResult<Match> {
        self.load_match(ctx, match_id).await
    }

    async fn load_match(&self, ctx: &RequestContext, match_id: MatchId) -> TournamentResult<Match> {
        guarded(ctx, self.matches.get_match(match_id))
            .await?
            .ok_or(TournamentError::MatchNotFound(match_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::InMemoryStore;
    use crate::matches::{NewMatch, Side};
    use crate::tournament::NewTournament;

    async fn active_match(store: &Arc<InMemoryStore>) -> Match {
        let t = store
            .create(&NewTournament::single_elimination("League", 1))
            .await
            .unwrap();
        store
            .compare_and_set_status(t.id, TournamentStatus::Draft, TournamentStatus::Open, false)
            .await
            .unwrap();
        store
            .compare_and_set_status(t.id, TournamentStatus::Open, TournamentStatus::Active, false)
            .await
            .unwrap();
        let new = NewMatch::new(t.id, 1, Side::singles(10), Side::singles(11)).unwrap();
        store.save_bracket(t.id, &[new]).await.unwrap().unwrap().remove(0)
    }

    #[tokio::test]
    async fn test_record_result_completes_match() {
        let store = InMemoryStore::shared();
        let m = active_match(&store).await;
        let manager = MatchManager::new(store.clone(), store.clone());
        let ctx = RequestContext::default();

        let done = manager
            .record_result(&ctx, m.id, Score::from(vec![(6, 3), (6, 4)]))
            .await
            .unwrap();
        assert_eq!(done.status, MatchStatus::Completed);

        let err = manager
            .record_result(&ctx, m.id, Score::from(vec![(6, 0)]))
            .await
            .unwrap_err();
        assert!(matches!(err, TournamentError::InvalidMatchState { .. }));
    }

    #[tokio::test]
    async fn test_empty_score_rejected() {
        let store = InMemoryStore::shared();
        let m = active_match(&store).await;
        let manager = MatchManager::new(store.clone(), store.clone());

        let err = manager
            .record_result(&RequestContext::default(), m.id, Score::default())
            .await
            .unwrap_err();
        assert!(matches!(err, TournamentError::Validation(_)));
    }

    #[tokio::test]
    async fn test_oversized_score_rejected() {
        let store = InMemoryStore::shared();
        let m = active_match(&store).await;
        let manager = MatchManager::new(store.clone(), store.clone());
        let ctx = RequestContext::default();

        let err = manager
            .record_result(&ctx, m.id, Score::from(vec![(u32::MAX, 0), (6, 0)]))
            .await
            .unwrap_err();
        assert!(matches!(err, TournamentError::Validation(_)));

        let stored = manager.get_match(&ctx, m.id).await.unwrap();
        assert_eq!(stored.status, MatchStatus::Pending);
        assert!(stored.score.is_none());
    }

    #[tokio::test]
    async fn test_schedule_then_reschedule() {
        let store = InMemoryStore::shared();
        let m = active_match(&store).await;
        let manager = MatchManager::new(store.clone(), store.clone());
        let ctx = RequestContext::default();
        let at = Utc::now();

        let scheduled = manager
            .schedule_match(&ctx, m.id, at, Some(" Court 2 ".to_string()))
            .await
            .unwrap();
        assert_eq!(scheduled.status, MatchStatus::Scheduled);
        assert_eq!(scheduled.location.as_deref(), Some("Court 2"));

        let moved = manager.schedule_match(&ctx, m.id, at, None).await.unwrap();
        assert_eq!(moved.location, None);
        assert_eq!(manager.list_matches(&ctx, m.tournament_id).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_unknown_match() {
        let store = InMemoryStore::shared();
        let manager = MatchManager::new(store.clone(), store.clone());
        let err = manager
            .get_match(&RequestContext::default(), 404)
            .await
            .unwrap_err();
        assert!(matches!(err, TournamentError::MatchNotFound(404)));
    }
}
