//! Shared test utilities for domain testing
//!
//! - `TestDataBuilder`: deterministic, seeded test data generation
//! - `assertions`: custom assertion helpers
//!
//! # Usage
//!
//! ```
//! use test_utils::TestDataBuilder;
//!
//! let mut builder = TestDataBuilder::from_test_name("my_test");
//! let apps = builder.count(50);
//! let headroom = builder.percent(40.0);
//! assert!(apps <= 50);
//! assert!((0.0..=40.0).contains(&headroom));
//! ```
//!
//! The same test name always yields the same sequence, so property-style
//! loops over many generated cases stay reproducible.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Builder for test data with deterministic randomization
///
/// This ensures tests are reproducible by using seeded random data.
pub struct TestDataBuilder {
    seed: u64,
    rng: StdRng,
}

impl TestDataBuilder {
    /// Create a new builder with a seed (for deterministic tests)
    pub fn new(seed: u64) -> Self {
        Self {
            seed,
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Create from test name (generates seed from test name hash)
    ///
    /// This is the recommended way to create a builder for consistent test data.
    pub fn from_test_name(name: &str) -> Self {
        use std::collections::hash_map::DefaultHasher;
        use std::hash::{Hash, Hasher};

        let mut hasher = DefaultHasher::new();
        name.hash(&mut hasher);
        Self::new(hasher.finish())
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Integer in `0..=max`
    pub fn count(&mut self, max: u32) -> u32 {
        self.rng.random_range(0..=max)
    }

    /// Integer in `min..=max`
    pub fn between(&mut self, min: u64, max: u64) -> u64 {
        self.rng.random_range(min..=max)
    }

    /// Percentage in `0.0..=max`
    pub fn percent(&mut self, max: f64) -> f64 {
        self.rng.random_range(0.0..=max)
    }

    /// Ratio in `1.0..=max`, e.g. an overcommit ratio
    pub fn ratio(&mut self, max: f64) -> f64 {
        self.rng.random_range(1.0..=max)
    }

    pub fn flag(&mut self) -> bool {
        self.rng.random_bool(0.5)
    }

    /// Contiguous inclusive ranges covering `0..`, the last one open-ended.
    ///
    /// Returns `brackets` `(min, max)` pairs with widths in `1..=max_width`.
    pub fn bracket_bounds(&mut self, brackets: usize, max_width: u64) -> Vec<(u64, Option<u64>)> {
        let mut bounds = Vec::with_capacity(brackets);
        let mut min = 0;
        for i in 0..brackets {
            if i + 1 == brackets {
                bounds.push((min, None));
            } else {
                let max = min + self.between(1, max_width.max(1)) - 1;
                bounds.push((min, Some(max)));
                min = max + 1;
            }
        }
        bounds
    }

    /// Generate a unique name for testing
    pub fn name(&self, prefix: &str, suffix: &str) -> String {
        format!("test-{}-{}-{}", prefix, self.seed, suffix)
    }
}

/// Test assertion helpers
pub mod assertions {
    use std::fmt::Debug;

    /// Assert two floats agree within `tolerance`
    pub fn assert_close(actual: f64, expected: f64, tolerance: f64, context: &str) {
        assert!(
            (actual - expected).abs() <= tolerance,
            "{}: expected {} ± {}, got {}",
            context,
            expected,
            tolerance,
            actual
        );
    }

    /// Assert that `actual` never drops below `baseline`
    pub fn assert_not_less<T: PartialOrd + Debug>(actual: T, baseline: T, context: &str) {
        assert!(
            actual >= baseline,
            "{}: expected at least {:?}, got {:?}",
            context,
            baseline,
            actual
        );
    }

    /// Assert that an optional value is Some
    pub fn assert_some<T>(value: Option<T>, context: &str) -> T {
        value.unwrap_or_else(|| panic!("{}: expected Some, got None", context))
    }
}
