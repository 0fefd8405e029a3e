// Metronome - A batching Statsd client for Rust!
//
// Copyright 2025-2026 Nick Pillitteri
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha12Rng;
use std::sync::Mutex;

/// Decides whether a sampled event is included in the outgoing stream.
///
/// An event at `rate` is included when a uniform draw in `[0, 1)` is
/// strictly less than the rate; receiving aggregators rescale observed
/// counts by `1/rate`. The strict comparison matches what deployed
/// receivers expect and must not be loosened.
///
/// The default sampler draws from the thread local RNG and takes no lock.
/// The seeded sampler serializes a ChaCha RNG behind a mutex so that a
/// fixed seed yields a reproducible include/suppress sequence, mainly
/// useful in tests.
#[derive(Debug)]
pub(crate) enum Sampler {
    Entropy,
    Seeded(Mutex<ChaCha12Rng>),
}

impl Sampler {
    pub(crate) fn from_entropy() -> Self {
        Sampler::Entropy
    }

    pub(crate) fn seeded(seed: u64) -> Self {
        Sampler::Seeded(Mutex::new(ChaCha12Rng::seed_from_u64(seed)))
    }

    /// True if an event at the given rate should be sent.
    ///
    /// Rates of 1 or more never suppress and consume no draw.
    pub(crate) fn accept(&self, rate: f64) -> bool {
        if rate >= 1.0 {
            return true;
        }

        let draw: f64 = match self {
            Sampler::Entropy => rand::thread_rng().gen(),
            Sampler::Seeded(rng) => rng.lock().unwrap().gen(),
        };

        draw < rate
    }
}

#[cfg(test)]
mod tests {
    use super::Sampler;
    use rand::{Rng, SeedableRng};
    use rand_chacha::ChaCha12Rng;

    #[test]
    fn test_rate_one_always_accepts() {
        let sampler = Sampler::from_entropy();
        for _ in 0..1000 {
            assert!(sampler.accept(1.0));
        }
    }

    #[test]
    fn test_rate_zero_never_accepts() {
        let sampler = Sampler::from_entropy();
        for _ in 0..1000 {
            assert!(!sampler.accept(0.0));
        }
    }

    #[test]
    fn test_seeded_sampler_matches_reference_draws() {
        let sampler = Sampler::seeded(42);
        let mut reference = ChaCha12Rng::seed_from_u64(42);

        for _ in 0..100 {
            let expected = reference.gen::<f64>() < 0.5;
            assert_eq!(expected, sampler.accept(0.5));
        }
    }

    #[test]
    fn test_seeded_sampler_rate_one_consumes_no_draw() {
        let sampler = Sampler::seeded(7);
        let mut reference = ChaCha12Rng::seed_from_u64(7);

        // full-rate events between sampled ones must not shift the sequence
        assert!(sampler.accept(1.0));
        let expected = reference.gen::<f64>() < 0.25;
        assert_eq!(expected, sampler.accept(0.25));
    }

    #[test]
    fn test_seeded_sampler_distribution_is_plausible() {
        let sampler = Sampler::seeded(1234);
        let accepted = (0..10_000).filter(|_| sampler.accept(0.5)).count();

        // deterministic under the fixed seed, loose bounds for clarity
        assert!(accepted > 4_500, "accepted {} of 10000", accepted);
        assert!(accepted < 5_500, "accepted {} of 10000", accepted);
    }
}
