//! Reset chance and the dice behind it

use crate::reset::{Policy, ResetError, ResetResult};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Chance in percent that a bot at `level` resets, given the trigger level it
/// crossed.
///
/// Without scaling this is the policy's flat chance. With scaling the chance
/// grows with how far past the threshold the bot is, truncated toward zero and
/// capped at 100.
///
/// # Errors
/// Returns `InvalidArgument` if `threshold_level` is 0.
pub fn compute_chance(level: u8, threshold_level: u8, policy: &Policy) -> ResetResult<u8> {
    if threshold_level == 0 {
        return Err(ResetError::InvalidArgument(
            "threshold level must be greater than 0".to_string(),
        ));
    }

    if !policy.scaled_chance {
        return Ok(policy.reset_chance_percent);
    }

    let scaled = f32::from(level) / f32::from(threshold_level)
        * f32::from(policy.reset_chance_percent);

    // Truncation matches the integer cast the chance has always used
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let chance = (scaled as u32).min(100) as u8;
    Ok(chance)
}

/// Source of the uniform `[0, 99]` draw used for every chance roll
pub trait Roller: Send {
    /// Draw an integer in `[0, 99]`
    fn roll(&mut self) -> u8;

    /// Roll against a chance in percent
    fn succeeds(&mut self, chance: u8) -> bool {
        self.roll() < chance
    }
}

/// [`Roller`] backed by a `rand` generator
#[derive(Debug, Clone)]
pub struct RngRoller<R = StdRng> {
    rng: R,
}

impl RngRoller<StdRng> {
    /// Roller seeded from the operating system
    #[must_use]
    pub fn from_os_rng() -> Self {
        Self {
            rng: StdRng::from_os_rng(),
        }
    }

    /// Deterministic roller for replays and tests
    #[must_use]
    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }
}

impl<R: Rng> RngRoller<R> {
    #[must_use]
    pub fn with_rng(rng: R) -> Self {
        Self { rng }
    }
}

impl<R: Rng + Send> Roller for RngRoller<R> {
    fn roll(&mut self) -> u8 {
        self.rng.random_range(0..100)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scaled(chance: u8) -> Policy {
        Policy {
            scaled_chance: true,
            reset_chance_percent: chance,
            ..Policy::default()
        }
    }

    #[test]
    fn test_flat_chance() {
        let policy = Policy {
            reset_chance_percent: 37,
            ..Policy::default()
        };
        assert_eq!(compute_chance(10, 80, &policy).unwrap(), 37);
        assert_eq!(compute_chance(80, 80, &policy).unwrap(), 37);
    }

    #[test]
    fn test_zero_threshold_rejected() {
        let result = compute_chance(10, 0, &Policy::default());
        assert!(matches!(result, Err(ResetError::InvalidArgument(_))));
    }

    #[test]
    fn test_scaled_floor_semantics() {
        // 60 / 80 * 50 = 37.5
        assert_eq!(compute_chance(60, 80, &scaled(50)).unwrap(), 37);
        // 79 / 80 * 99 = 97.7625
        assert_eq!(compute_chance(79, 80, &scaled(99)).unwrap(), 97);
        // 1 / 3 * 100 = 33.33..
        assert_eq!(compute_chance(1, 3, &scaled(100)).unwrap(), 33);
    }

    #[test]
    fn test_scaled_at_threshold_is_exact() {
        for chance in 0..=100 {
            for threshold in 1..=80 {
                assert_eq!(
                    compute_chance(threshold, threshold, &scaled(chance)).unwrap(),
                    chance
                );
            }
        }
    }

    #[test]
    fn test_scaled_capped_at_100() {
        assert_eq!(compute_chance(80, 58, &scaled(100)).unwrap(), 100);
        assert_eq!(compute_chance(80, 2, &scaled(90)).unwrap(), 100);
    }

    #[test]
    fn test_scaled_below_threshold_monotonic() {
        for chance in [1, 25, 50, 99, 100] {
            let policy = scaled(chance);
            for threshold in [2, 10, 55, 80] {
                let mut previous = 0;
                for level in 0..threshold {
                    let value = compute_chance(level, threshold, &policy).unwrap();
                    assert!(value <= chance);
                    assert!(value >= previous);
                    previous = value;
                }
            }
        }
    }

    #[test]
    fn test_rng_roller_range_and_determinism() {
        let mut a = RngRoller::seeded(7);
        let mut b = RngRoller::seeded(7);
        for _ in 0..1000 {
            let draw = a.roll();
            assert!(draw < 100);
            assert_eq!(draw, b.roll());
        }
    }

    #[test]
    fn test_succeeds_bounds() {
        let mut roller = RngRoller::seeded(42);
        for _ in 0..200 {
            assert!(!roller.succeeds(0));
            assert!(roller.succeeds(100));
        }
    }
}
