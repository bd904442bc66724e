//! Single-elimination bracket planning and persistence.

use serde::Serialize;
use std::collections::HashSet;
use std::sync::{Arc, Mutex, PoisonError};

use super::seeding::{RandomSeeder, Seeder};
use crate::db::{MatchRepository, RequestContext, TournamentRepository, guarded};
use crate::matches::{NewMatch, Side};
use crate::tournament::{
    MIN_BRACKET_PARTICIPANTS, Tournament, TournamentError, TournamentFormat, TournamentId,
    TournamentResult,
};
use crate::users::UserId;

/// First-round layout, before anything is written
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BracketPlan {
    /// Rounds needed to reach a single winner
    pub rounds: u32,
    /// Empty slots up to the next power of two
    pub byes: u32,
    /// Participants advancing to round 2 without a match
    pub auto_advanced: Vec<UserId>,
    /// Round-1 pairings in seeded order
    pub pairings: Vec<(UserId, UserId)>,
}

impl BracketPlan {
    pub fn matches(&self) -> u32 {
        u32::try_from(self.pairings.len()).unwrap_or(u32::MAX)
    }
}

/// Result of a generated bracket
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BracketSummary {
    pub tournament_id: TournamentId,
    pub format: TournamentFormat,
    pub rounds: u32,
    pub matches_created: u32,
    pub byes: u32,
    pub auto_advanced: Vec<UserId>,
}

/// Seed `participants` and lay out the first round
///
/// For `n` participants the bracket has `ceil(log2 n)` rounds and
/// `2^rounds - n` byes. `floor(n / 2)` matches are paired; with an odd count
/// the first seeded participant advances without playing.
pub fn plan_single_elimination(
    participants: &[UserId],
    seeder: &mut dyn Seeder,
) -> TournamentResult<BracketPlan> {
    let count = u32::try_from(participants.len())
        .map_err(|_| TournamentError::Validation("too many participants".to_string()))?;

    if count < MIN_BRACKET_PARTICIPANTS {
        return Err(TournamentError::InsufficientParticipants {
            needed: MIN_BRACKET_PARTICIPANTS,
            current: count,
        });
    }

    let mut seen = HashSet::with_capacity(participants.len());
    if let Some(dup) = participants.iter().find(|id| !seen.insert(**id)) {
        return Err(TournamentError::Validation(format!(
            "participant {dup} appears more than once"
        )));
    }

    let mut seeded = participants.to_vec();
    seeder.seed(&mut seeded);

    let slots = count.next_power_of_two();
    let rounds = slots.trailing_zeros();
    let byes = slots - count;

    let advancing = seeded.len() % 2;
    let auto_advanced = seeded[..advancing].to_vec();
    let pairings = seeded[advancing..]
        .chunks_exact(2)
        .map(|pair| (pair[0], pair[1]))
        .collect();

    Ok(BracketPlan {
        rounds,
        byes,
        auto_advanced,
        pairings,
    })
}

/// Writes the first round of a tournament exactly once
pub struct BracketGenerator {
    tournaments: Arc<dyn TournamentRepository>,
    matches: Arc<dyn MatchRepository>,
    seeder: Mutex<Box<dyn Seeder>>,
}

impl BracketGenerator {
    /// Generator seeding with OS randomness
    pub fn new(
        tournaments: Arc<dyn TournamentRepository>,
        matches: Arc<dyn MatchRepository>,
    ) -> Self {
        Self::with_seeder(tournaments, matches, RandomSeeder::new())
    }

    pub fn with_seeder(
        tournaments: Arc<dyn TournamentRepository>,
        matches: Arc<dyn MatchRepository>,
        seeder: impl Seeder + 'static,
    ) -> Self {
        Self {
            tournaments,
            matches,
            seeder: Mutex::new(Box::new(seeder)),
        }
    }

    /// Plan and persist round 1 for `tournament`
    ///
    /// Fails with `UnsupportedFormat` for anything but single elimination and
    /// with `BracketAlreadyGenerated` when any match already exists. The batch
    /// write re-checks for existing matches, so concurrent callers cannot both
    /// succeed.
    pub async fn generate(
        &self,
        ctx: &RequestContext,
        tournament: &Tournament,
    ) -> TournamentResult<BracketSummary> {
        if !tournament.format.is_supported() {
            return Err(TournamentError::UnsupportedFormat(tournament.format));
        }

        if guarded(ctx, self.matches.has_any_matches(tournament.id)).await? {
            return Err(TournamentError::BracketAlreadyGenerated(tournament.id));
        }

        let participants = guarded(ctx, self.tournaments.participant_ids(tournament.id)).await?;

        let plan = {
            let mut seeder = self.seeder.lock().unwrap_or_else(PoisonError::into_inner);
            plan_single_elimination(&participants, &mut **seeder)?
        };

        let new_matches = plan
            .pairings
            .iter()
            .map(|&(a, b)| NewMatch::new(tournament.id, 1, Side::singles(a), Side::singles(b)))
            .collect::<Result<Vec<_>, _>>()
            .map_err(TournamentError::Validation)?;

        let saved = guarded(ctx, self.matches.save_bracket(tournament.id, &new_matches))
            .await?
            .ok_or(TournamentError::BracketAlreadyGenerated(tournament.id))?;

        log::info!(
            "Generated bracket for tournament {}: {} participants, {} rounds, {} matches, {} byes",
            tournament.id,
            participants.len(),
            plan.rounds,
            saved.len(),
            plan.byes
        );

        Ok(BracketSummary {
            tournament_id: tournament.id,
            format: tournament.format,
            rounds: plan.rounds,
            matches_created: u32::try_from(saved.len()).unwrap_or(u32::MAX),
            byes: plan.byes,
            auto_advanced: plan.auto_advanced,
        })
    }

    /// Describe a first round that is already stored
    pub async fn summarize_existing(
        &self,
        ctx: &RequestContext,
        tournament: &Tournament,
    ) -> TournamentResult<BracketSummary> {
        let participants = guarded(ctx, self.tournaments.participant_ids(tournament.id)).await?;
        let first_round: Vec<_> = guarded(ctx, self.matches.find_by_tournament(tournament.id))
            .await?
            .into_iter()
            .filter(|m| m.round == 1)
            .collect();

        let count = u32::try_from(participants.len()).unwrap_or(u32::MAX);
        let slots = count.max(1).next_power_of_two();
        let auto_advanced = participants
            .into_iter()
            .filter(|&p| first_round.iter().all(|m| m.side_of(p).is_none()))
            .collect();

        Ok(BracketSummary {
            tournament_id: tournament.id,
            format: tournament.format,
            rounds: slots.trailing_zeros(),
            matches_created: u32::try_from(first_round.len()).unwrap_or(u32::MAX),
            byes: slots - count.max(1),
            auto_advanced,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bracket::PresetSeeder;

    fn players(n: i64) -> Vec<UserId> {
        (1..=n).collect()
    }

    #[test]
    fn test_two_players() {
        let plan = plan_single_elimination(&players(2), &mut PresetSeeder).unwrap();
        assert_eq!(plan.rounds, 1);
        assert_eq!(plan.byes, 0);
        assert_eq!(plan.pairings, vec![(1, 2)]);
        assert!(plan.auto_advanced.is_empty());
    }

    #[test]
    fn test_seven_players() {
        let plan = plan_single_elimination(&players(7), &mut PresetSeeder).unwrap();
        assert_eq!(plan.rounds, 3);
        assert_eq!(plan.byes, 1);
        assert_eq!(plan.matches(), 3);
        assert_eq!(plan.auto_advanced, vec![1]);
        assert_eq!(plan.pairings, vec![(2, 3), (4, 5), (6, 7)]);
    }

    #[test]
    fn test_eight_players() {
        let plan = plan_single_elimination(&players(8), &mut PresetSeeder).unwrap();
        assert_eq!(plan.rounds, 3);
        assert_eq!(plan.byes, 0);
        assert_eq!(plan.matches(), 4);
    }

    #[test]
    fn test_five_players() {
        let plan = plan_single_elimination(&players(5), &mut PresetSeeder).unwrap();
        assert_eq!(plan.rounds, 3);
        assert_eq!(plan.byes, 3);
        assert_eq!(plan.matches(), 2);
        assert_eq!(plan.auto_advanced, vec![1]);
    }

    #[test]
    fn test_too_few_players() {
        let err = plan_single_elimination(&players(1), &mut PresetSeeder).unwrap_err();
        assert!(matches!(
            err,
            TournamentError::InsufficientParticipants { needed: 2, current: 1 }
        ));
        assert!(plan_single_elimination(&[], &mut PresetSeeder).is_err());
    }

    #[test]
    fn test_duplicate_participant_rejected() {
        let err = plan_single_elimination(&[1, 2, 2], &mut PresetSeeder).unwrap_err();
        assert!(matches!(err, TournamentError::Validation(_)));
    }

    #[test]
    fn test_seeded_plan_uses_every_participant_once() {
        let mut seeder = RandomSeeder::from_seed(99);
        let plan = plan_single_elimination(&players(13), &mut seeder).unwrap();

        let mut everyone: Vec<UserId> = plan
            .pairings
            .iter()
            .flat_map(|&(a, b)| [a, b])
            .chain(plan.auto_advanced.iter().copied())
            .collect();
        everyone.sort_unstable();
        assert_eq!(everyone, players(13));
    }
}
