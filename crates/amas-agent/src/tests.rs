//! Unit tests for the agent lifecycle and criticality protocol.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use amas_core::{AgentId, AgentPhase, AgentRng, ExecutionPolicy};
use rustc_hash::FxHashMap;

use crate::behavior::AgentCtx;
use crate::{AgentBehavior, AgentCell, AgentDirectory, AgentMode, NoopSignals, SignalSink};

// ── Helpers ───────────────────────────────────────────────────────────────────

/// Empty shared world for tests that don't exercise the environment.
struct World;

/// Behavior with a settable criticality that optionally grows on `on_act`.
struct Score {
    value: f64,
    bump_on_act: f64,
}

impl AgentBehavior<World> for Score {
    fn compute_criticality(&mut self, _ctx: &mut AgentCtx<'_, World>) -> f64 {
        self.value
    }

    fn on_act(&mut self, _ctx: &mut AgentCtx<'_, World>) {
        self.value += self.bump_on_act;
    }
}

fn score_cell(id: u32, value: f64, bump_on_act: f64) -> Arc<AgentCell<World>> {
    let id = AgentId(id);
    Arc::new(AgentCell::new(
        id,
        AgentMode::Synchronous,
        AgentRng::new(42, id),
        Box::new(Score { value, bump_on_act }),
    ))
}

fn snapshot_value(cell: &AgentCell<World>, id: u32) -> Option<f64> {
    cell.snapshot()
        .into_iter()
        .find(|&(n, _)| n == AgentId(id))
        .map(|(_, c)| c)
}

// ── Neighborhood ──────────────────────────────────────────────────────────────

#[cfg(test)]
mod neighborhood_tests {
    use super::*;

    #[test]
    fn self_membership_is_established_at_creation() {
        let cell = score_cell(3, 0.0, 0.0);
        assert_eq!(cell.neighborhood(), vec![AgentId(3)]);
    }

    #[test]
    fn new_neighbors_start_at_negative_infinity() {
        let cell = score_cell(0, 0.0, 0.0);
        cell.add_neighbors(&[AgentId(1), AgentId(2)]);

        assert_eq!(cell.neighborhood(), vec![AgentId(0), AgentId(1), AgentId(2)]);
        assert_eq!(snapshot_value(&cell, 1), Some(f64::NEG_INFINITY));
        assert_eq!(snapshot_value(&cell, 2), Some(f64::NEG_INFINITY));
    }

    #[test]
    fn invalid_id_is_silently_ignored() {
        let cell = score_cell(0, 0.0, 0.0);
        cell.add_neighbors(&[AgentId::INVALID]);
        assert_eq!(cell.neighborhood(), vec![AgentId(0)]);
        assert!(cell.snapshot().is_empty());
    }
}

// ── Perception ────────────────────────────────────────────────────────────────

#[cfg(test)]
mod perception_tests {
    use super::*;

    #[test]
    fn snapshot_reflects_published_criticalities() {
        let directory = AgentDirectory::new();
        let a = score_cell(0, 1.0, 0.0);
        let b = score_cell(1, 5.0, 0.0);
        directory.insert(a.clone());
        directory.insert(b.clone());
        a.add_neighbors(&[AgentId(1)]);
        a.before_ready(&World);
        b.before_ready(&World);

        // First TwoPhases dispatch is the perception phase.
        a.run_cycle(ExecutionPolicy::TwoPhases, &World, &directory, &NoopSignals);

        assert_eq!(snapshot_value(&a, 0), Some(1.0));
        assert_eq!(snapshot_value(&a, 1), Some(5.0));
    }

    #[test]
    fn departed_neighbor_keeps_its_last_seen_value() {
        let directory = AgentDirectory::new();
        let a = score_cell(0, 1.0, 0.0);
        let b = score_cell(1, 5.0, 0.0);
        directory.insert(a.clone());
        directory.insert(b.clone());
        a.add_neighbors(&[AgentId(1)]);
        a.before_ready(&World);
        b.before_ready(&World);

        a.run_cycle(ExecutionPolicy::OnePhase, &World, &directory, &NoopSignals);
        directory.remove(AgentId(1));
        a.run_cycle(ExecutionPolicy::OnePhase, &World, &directory, &NoopSignals);

        assert_eq!(snapshot_value(&a, 1), Some(5.0));
    }
}

// ── Decision/action ───────────────────────────────────────────────────────────

#[cfg(test)]
mod decision_tests {
    use super::*;

    #[test]
    fn decision_republishes_criticality_and_own_slot() {
        let directory = AgentDirectory::new();
        let cell = score_cell(0, 1.0, 1.0);
        directory.insert(cell.clone());
        cell.before_ready(&World);
        assert_eq!(cell.criticality(), 1.0);

        cell.run_cycle(ExecutionPolicy::OnePhase, &World, &directory, &NoopSignals);

        // on_act bumped the score before the engine recomputed it.
        assert_eq!(cell.criticality(), 2.0);
        assert_eq!(snapshot_value(&cell, 0), Some(2.0));
    }

    #[test]
    fn execution_order_combines_layer_and_jitter() {
        struct Layered;
        impl AgentBehavior<World> for Layered {
            fn compute_criticality(&mut self, _ctx: &mut AgentCtx<'_, World>) -> f64 {
                0.0
            }
            fn execution_order_layer(&self) -> i64 {
                3
            }
        }

        let id = AgentId(0);
        let cell = AgentCell::new(id, AgentMode::Synchronous, AgentRng::new(42, id), Box::new(Layered));
        cell.before_ready(&World);

        let order = cell.execution_order();
        assert!((30_000..40_000).contains(&order), "got {order}");
    }
}

// ── Phase machine ─────────────────────────────────────────────────────────────

#[cfg(test)]
mod phase_tests {
    use super::*;

    #[test]
    fn two_phase_dispatches_alternate_the_machine() {
        let directory = AgentDirectory::new();
        let cell = score_cell(0, 0.0, 0.0);
        directory.insert(cell.clone());
        cell.before_ready(&World);
        assert_eq!(cell.phase(), AgentPhase::Initialization);

        cell.run_cycle(ExecutionPolicy::TwoPhases, &World, &directory, &NoopSignals);
        assert_eq!(cell.phase(), AgentPhase::PerceptionDone);

        cell.run_cycle(ExecutionPolicy::TwoPhases, &World, &directory, &NoopSignals);
        assert_eq!(cell.phase(), AgentPhase::DecisionActionDone);

        cell.run_cycle(ExecutionPolicy::TwoPhases, &World, &directory, &NoopSignals);
        assert_eq!(cell.phase(), AgentPhase::PerceptionDone);
    }

    #[test]
    fn one_phase_dispatch_runs_the_full_cycle() {
        let directory = AgentDirectory::new();
        let cell = score_cell(0, 0.0, 0.0);
        directory.insert(cell.clone());
        cell.before_ready(&World);

        cell.run_cycle(ExecutionPolicy::OnePhase, &World, &directory, &NoopSignals);
        assert_eq!(cell.phase(), AgentPhase::DecisionActionDone);
    }
}

// ── Signals ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod signal_tests {
    use super::*;

    #[derive(Default)]
    struct CountingSink {
        perceived: AtomicUsize,
        acted: AtomicUsize,
    }

    impl SignalSink for CountingSink {
        fn perceived(&self, _agent: AgentId) {
            self.perceived.fetch_add(1, Ordering::SeqCst);
        }
        fn acted(&self, _agent: AgentId) {
            self.acted.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn one_phase_cycle_fires_both_signals() {
        let directory = AgentDirectory::new();
        let cell = score_cell(0, 0.0, 0.0);
        directory.insert(cell.clone());
        cell.before_ready(&World);

        let sink = CountingSink::default();
        cell.run_cycle(ExecutionPolicy::OnePhase, &World, &directory, &sink);

        assert_eq!(sink.perceived.load(Ordering::SeqCst), 1);
        assert_eq!(sink.acted.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn two_phase_dispatch_fires_one_signal_each() {
        let directory = AgentDirectory::new();
        let cell = score_cell(0, 0.0, 0.0);
        directory.insert(cell.clone());
        cell.before_ready(&World);

        let sink = CountingSink::default();
        cell.run_cycle(ExecutionPolicy::TwoPhases, &World, &directory, &sink);
        assert_eq!(sink.perceived.load(Ordering::SeqCst), 1);
        assert_eq!(sink.acted.load(Ordering::SeqCst), 0);

        cell.run_cycle(ExecutionPolicy::TwoPhases, &World, &directory, &sink);
        assert_eq!(sink.perceived.load(Ordering::SeqCst), 1);
        assert_eq!(sink.acted.load(Ordering::SeqCst), 1);
    }
}

// ── Most-critical arbitration ─────────────────────────────────────────────────

#[cfg(test)]
mod most_critical_tests {
    use super::*;

    fn snapshot_of(entries: &[(u32, f64)]) -> Mutex<FxHashMap<AgentId, f64>> {
        let mut map = FxHashMap::default();
        for &(id, c) in entries {
            map.insert(AgentId(id), c);
        }
        Mutex::new(map)
    }

    #[test]
    fn returns_the_maximum_entry() {
        let env = World;
        let mut rng = AgentRng::new(7, AgentId(0));
        let mut hood = vec![AgentId(0), AgentId(1), AgentId(2)];
        let snapshot = snapshot_of(&[(0, 1.0), (1, 5.0), (2, 3.0)]);
        let mut ctx = AgentCtx::new(AgentId(0), &env, &mut rng, &mut hood, &snapshot);

        for _ in 0..50 {
            assert_eq!(ctx.most_critical_neighbor(true), Some(AgentId(1)));
        }
    }

    #[test]
    fn ties_are_broken_uniformly_and_never_lose_to_lower_entries() {
        let env = World;
        let mut rng = AgentRng::new(7, AgentId(0));
        let mut hood = vec![AgentId(0), AgentId(1), AgentId(2)];
        let snapshot = snapshot_of(&[(0, 1.0), (1, 5.0), (2, 5.0)]);
        let mut ctx = AgentCtx::new(AgentId(0), &env, &mut rng, &mut hood, &snapshot);

        let mut hits = [0usize; 3];
        for _ in 0..300 {
            let winner = ctx.most_critical_neighbor(true).expect("nonempty snapshot");
            assert_ne!(winner, AgentId(0), "a below-max entry must never win");
            hits[winner.index()] += 1;
        }
        assert!(hits[1] > 0 && hits[2] > 0, "both tied entries should win sometimes: {hits:?}");
    }

    #[test]
    fn excluding_self_skips_the_own_entry() {
        let env = World;
        let mut rng = AgentRng::new(7, AgentId(0));
        let mut hood = vec![AgentId(0), AgentId(1)];
        let snapshot = snapshot_of(&[(0, 9.0), (1, 2.0)]);
        let mut ctx = AgentCtx::new(AgentId(0), &env, &mut rng, &mut hood, &snapshot);

        assert_eq!(ctx.most_critical_neighbor(false), Some(AgentId(1)));
        assert_eq!(ctx.most_critical_neighbor(true), Some(AgentId(0)));
    }

    #[test]
    fn empty_snapshot_returns_none() {
        let env = World;
        let mut rng = AgentRng::new(7, AgentId(0));
        let mut hood = vec![AgentId(0)];
        let snapshot = snapshot_of(&[]);
        let mut ctx = AgentCtx::new(AgentId(0), &env, &mut rng, &mut hood, &snapshot);

        assert_eq!(ctx.most_critical_neighbor(true), None);
        assert_eq!(ctx.most_critical_neighbor(false), None);
    }

    #[test]
    fn only_own_entry_and_excluded_returns_none() {
        let env = World;
        let mut rng = AgentRng::new(7, AgentId(0));
        let mut hood = vec![AgentId(0)];
        let snapshot = snapshot_of(&[(0, 4.0)]);
        let mut ctx = AgentCtx::new(AgentId(0), &env, &mut rng, &mut hood, &snapshot);

        assert_eq!(ctx.most_critical_neighbor(false), None);
    }
}
