//! Pluggable EPR-rate sources for capacity network construction.
//!
//! Edge capacities in an entanglement network are drawn once, at build time,
//! from a real-valued source. This crate isolates that randomness capability
//! behind a minimal object-safe trait so topology construction can run against
//! a seeded generator in simulations and against a degenerate fixed rate in
//! reference setups, without the consumer knowing which is which.
//!
//! A logical bidirectional link consumes a *single* draw: the consumer calls
//! [`RateSource::draw`] once per input pair and reuses the value for the
//! reverse edge.

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha20Rng;
use thiserror::Error;

/// Errors raised while configuring a rate source.
#[derive(Debug, Error, Clone, Copy, PartialEq)]
pub enum RateSourceError {
    /// The requested interval is empty, inverted, or extends below zero.
    #[error("invalid rate range [{lo}, {hi}): bounds must satisfy 0 <= lo <= hi")]
    InvalidRange { lo: f64, hi: f64 },
    /// A fixed rate must be a finite nonnegative number.
    #[error("invalid fixed rate {0}: must be finite and nonnegative")]
    InvalidRate(f64),
}

/// Minimal capability implemented by all EPR-rate sources.
///
/// A source exposes exactly one parameterless operation returning a
/// nonnegative rate in EPR pairs per second.
pub trait RateSource {
    /// Draw the next rate.
    fn draw(&mut self) -> f64;
}

/// Uniform rate source over `[lo, hi)` backed by a ChaCha20 generator.
#[derive(Clone, Debug)]
pub struct UniformRateSource {
    rng: ChaCha20Rng,
    lo: f64,
    hi: f64,
}

impl UniformRateSource {
    /// Build a source drawing uniformly from `[lo, hi)`, seeded from the OS.
    pub fn new(lo: f64, hi: f64) -> Result<Self, RateSourceError> {
        Self::from_rng(lo, hi, ChaCha20Rng::from_entropy())
    }

    /// Deterministic variant for simulations and tests.
    pub fn with_seed(lo: f64, hi: f64, seed: u64) -> Result<Self, RateSourceError> {
        Self::from_rng(lo, hi, ChaCha20Rng::seed_from_u64(seed))
    }

    /// Reuse an existing generator, e.g. one shared with other draws of the
    /// same experiment.
    pub fn from_rng(lo: f64, hi: f64, rng: ChaCha20Rng) -> Result<Self, RateSourceError> {
        if !lo.is_finite() || !hi.is_finite() || lo < 0.0 || hi < lo {
            return Err(RateSourceError::InvalidRange { lo, hi });
        }
        Ok(Self { rng, lo, hi })
    }

    /// Rewind the source to a fresh deterministic stream.
    pub fn reseed(&mut self, seed: u64) {
        self.rng = ChaCha20Rng::seed_from_u64(seed);
    }
}

impl RateSource for UniformRateSource {
    fn draw(&mut self) -> f64 {
        if self.lo == self.hi {
            return self.lo;
        }
        self.rng.gen_range(self.lo..self.hi)
    }
}

/// Degenerate source that always returns the same configured rate.
#[derive(Clone, Copy, Debug)]
pub struct FixedRateSource {
    rate: f64,
}

impl FixedRateSource {
    pub fn new(rate: f64) -> Result<Self, RateSourceError> {
        if !rate.is_finite() || rate < 0.0 {
            return Err(RateSourceError::InvalidRate(rate));
        }
        Ok(Self { rate })
    }
}

impl RateSource for FixedRateSource {
    fn draw(&mut self) -> f64 {
        self.rate
    }
}
