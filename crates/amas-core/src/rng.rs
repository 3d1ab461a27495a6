//! Deterministic random sources.
//!
//! Reproducibility rule: no global or thread-local RNG anywhere in the
//! engine.  Every agent owns an [`AgentRng`] seeded from the run's master
//! seed and its own id, and the environment construction hooks receive a
//! [`SimRng`] seeded from the master seed alone.  Re-running with the same
//! seed and a sequential worker mode replays the exact same draws.
//!
//! Per-agent seeds are mixed as
//!
//! ```text
//! seed = master_seed XOR (agent_id * GOLDEN_GAMMA)
//! ```
//!
//! where the constant is the 64-bit fractional part of the golden ratio,
//! spreading consecutive ids across the whole seed space.  Agents therefore
//! never share RNG state: no contention, no cross-thread ordering
//! dependency, and adding agents later does not disturb earlier streams.

use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

use crate::AgentId;

/// 64-bit fractional golden-ratio constant for seed mixing.
const GOLDEN_GAMMA: u64 = 0x9e37_79b9_7f4a_7c15;

// ── AgentRng ──────────────────────────────────────────────────────────────────

/// Per-agent deterministic RNG.
///
/// Owned by the agent's locked state and only ever touched by the worker
/// currently running that agent's phase, so no synchronisation is needed.
pub struct AgentRng(SmallRng);

impl AgentRng {
    /// Seed deterministically from the run's master seed and an agent id.
    pub fn new(master_seed: u64, agent: AgentId) -> Self {
        let seed = master_seed ^ u64::from(agent.0).wrapping_mul(GOLDEN_GAMMA);
        AgentRng(SmallRng::seed_from_u64(seed))
    }

    /// Generate a value uniformly in `range`.
    #[inline]
    pub fn gen_range<T, R>(&mut self, range: R) -> T
    where
        T: rand::distributions::uniform::SampleUniform,
        R: rand::distributions::uniform::SampleRange<T>,
    {
        self.0.gen_range(range)
    }

    /// `true` with probability `p` (clamped to [0, 1]).
    #[inline]
    pub fn gen_bool(&mut self, p: f64) -> bool {
        self.0.gen_bool(p.clamp(0.0, 1.0))
    }

    /// Choose a random element from a slice; `None` if the slice is empty.
    #[inline]
    pub fn choose<'a, T>(&mut self, slice: &'a [T]) -> Option<&'a T> {
        use rand::seq::SliceRandom;
        slice.choose(&mut self.0)
    }
}

// ── SimRng ────────────────────────────────────────────────────────────────────

/// Simulation-level RNG for global draws (environment construction,
/// application-level arbitration).
///
/// Used only in single-threaded or explicitly locked contexts.  Workers that
/// need independent randomness derive a [`SimRng::child`] instead of sharing
/// this one.
pub struct SimRng(SmallRng);

impl SimRng {
    pub fn new(seed: u64) -> Self {
        SimRng(SmallRng::seed_from_u64(seed))
    }

    /// Derive a child `SimRng` with a different seed offset.
    pub fn child(&mut self, offset: u64) -> SimRng {
        let child_seed: u64 = self.0.r#gen::<u64>() ^ offset.wrapping_mul(GOLDEN_GAMMA);
        SimRng(SmallRng::seed_from_u64(child_seed))
    }

    /// Generate a value uniformly in `range`.
    #[inline]
    pub fn gen_range<T, R>(&mut self, range: R) -> T
    where
        T: rand::distributions::uniform::SampleUniform,
        R: rand::distributions::uniform::SampleRange<T>,
    {
        self.0.gen_range(range)
    }

    /// `true` with probability `p` (clamped to [0, 1]).
    #[inline]
    pub fn gen_bool(&mut self, p: f64) -> bool {
        self.0.gen_bool(p.clamp(0.0, 1.0))
    }
}
