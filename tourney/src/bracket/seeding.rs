//! Seeding sources for bracket generation.

use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;

use crate::users::UserId;

/// Orders participants before they are paired
pub trait Seeder: Send {
    /// Reorder `participants` in place
    fn seed(&mut self, participants: &mut [UserId]);
}

impl<S: Seeder + ?Sized> Seeder for Box<S> {
    fn seed(&mut self, participants: &mut [UserId]) {
        (**self).seed(participants);
    }
}

/// Uniform random permutation
pub struct RandomSeeder {
    rng: StdRng,
}

impl RandomSeeder {
    /// Seeder drawing from the operating system's entropy
    pub fn new() -> Self {
        Self {
            rng: StdRng::from_os_rng(),
        }
    }

    /// Reproducible seeder; the same seed always yields the same permutation
    pub fn from_seed(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }
}

impl Default for RandomSeeder {
    fn default() -> Self {
        Self::new()
    }
}

impl Seeder for RandomSeeder {
    fn seed(&mut self, participants: &mut [UserId]) {
        participants.shuffle(&mut self.rng);
    }
}

/// Keeps the order it is given
#[derive(Debug, Default, Clone, Copy)]
pub struct PresetSeeder;

impl Seeder for PresetSeeder {
    fn seed(&mut self, _participants: &mut [UserId]) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_random_seeder_is_a_permutation() {
        let mut seeder = RandomSeeder::new();
        let mut players: Vec<UserId> = (1..=32).collect();
        seeder.seed(&mut players);

        let mut sorted = players.clone();
        sorted.sort_unstable();
        assert_eq!(sorted, (1..=32).collect::<Vec<_>>());
    }

    #[test]
    fn test_seeded_is_reproducible() {
        let mut a: Vec<UserId> = (1..=16).collect();
        let mut b = a.clone();
        RandomSeeder::from_seed(7).seed(&mut a);
        RandomSeeder::from_seed(7).seed(&mut b);
        assert_eq!(a, b);
    }

    #[test]
    fn test_preset_keeps_order() {
        let mut players = vec![5, 3, 9];
        PresetSeeder.seed(&mut players);
        assert_eq!(players, vec![5, 3, 9]);
    }
}
