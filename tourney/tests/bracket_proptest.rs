/// Property-based tests for bracket planning using proptest
///
/// These tests check the first-round arithmetic and that seeding never
/// loses or duplicates a participant.
use proptest::prelude::*;
use std::collections::BTreeSet;
use tourney::bracket::{PresetSeeder, RandomSeeder, plan_single_elimination};
use tourney::users::UserId;

fn participants(n: usize) -> Vec<UserId> {
    (1..=n as UserId).collect()
}

proptest! {
    #[test]
    fn prop_round_and_bye_counts(n in 2usize..=512) {
        let plan = plan_single_elimination(&participants(n), &mut PresetSeeder).unwrap();
        let n = n as u32;

        let expected_rounds = (n as f64).log2().ceil() as u32;
        prop_assert_eq!(plan.rounds, expected_rounds);
        prop_assert_eq!(plan.byes, (1u32 << plan.rounds) - n);
        prop_assert_eq!(plan.matches(), n / 2);
    }

    #[test]
    fn prop_every_participant_placed_once(n in 2usize..=256, seed in any::<u64>()) {
        let mut seeder = RandomSeeder::from_seed(seed);
        let plan = plan_single_elimination(&participants(n), &mut seeder).unwrap();

        let placed: Vec<UserId> = plan
            .pairings
            .iter()
            .flat_map(|&(a, b)| [a, b])
            .chain(plan.auto_advanced.iter().copied())
            .collect();
        let unique: BTreeSet<UserId> = placed.iter().copied().collect();

        prop_assert_eq!(placed.len(), n);
        prop_assert_eq!(unique, participants(n).into_iter().collect::<BTreeSet<_>>());
        prop_assert_eq!(plan.auto_advanced.len(), n % 2);
    }

    #[test]
    fn prop_pairings_are_disjoint(n in 2usize..=128, seed in any::<u64>()) {
        let mut seeder = RandomSeeder::from_seed(seed);
        let plan = plan_single_elimination(&participants(n), &mut seeder).unwrap();
        prop_assert!(plan.pairings.iter().all(|(a, b)| a != b));
    }

    #[test]
    fn prop_same_seed_same_bracket(n in 2usize..=64, seed in any::<u64>()) {
        let a = plan_single_elimination(&participants(n), &mut RandomSeeder::from_seed(seed)).unwrap();
        let b = plan_single_elimination(&participants(n), &mut RandomSeeder::from_seed(seed)).unwrap();
        prop_assert_eq!(a, b);
    }
}

#[test]
fn test_documented_examples() {
    for (n, rounds, matches, byes) in [(2, 1, 1, 0), (7, 3, 3, 1), (8, 3, 4, 0)] {
        let plan = plan_single_elimination(&participants(n), &mut PresetSeeder).unwrap();
        assert_eq!(plan.rounds, rounds, "rounds for n={n}");
        assert_eq!(plan.matches(), matches, "matches for n={n}");
        assert_eq!(plan.byes, byes, "byes for n={n}");
    }
}
