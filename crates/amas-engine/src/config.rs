//! Engine configuration.

/// How synchronous agents are executed within a tick.
#[derive(Copy, Clone, PartialEq, Eq, Debug, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Parallelism {
    /// Run agents inline on the scheduler loop thread, in dispatch order.
    ///
    /// The single-worker mode: with a fixed seed, two runs replay identical
    /// per-agent state sequences — the regression oracle for behaviors whose
    /// hooks touch shared state.
    Sequential,
    /// Fan agents out to the shared rayon worker pool.
    #[default]
    WorkerPool,
}

/// Top-level engine configuration.
///
/// A plain struct with public fields; applications typically build it from
/// their own CLI or config file.
#[derive(Copy, Clone, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct EngineConfig {
    /// Master RNG seed.  Every agent's stream and the environment's
    /// construction stream derive from it.
    pub seed: u64,

    /// Worker mode for the synchronous agent fan-out.
    pub parallelism: Parallelism,
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig { seed: 42, parallelism: Parallelism::WorkerPool }
    }
}
