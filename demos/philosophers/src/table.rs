//! The shared table: contested forks and the published seat reports.

use std::fmt;
use std::sync::Mutex;

use amas_core::{AgentId, SimRng};
use amas_engine::Environment;

// ── Fork ──────────────────────────────────────────────────────────────────────

/// A fork on the table, takeable by one philosopher at a time.
pub struct Fork {
    taken_by: Mutex<Option<AgentId>>,
}

impl Fork {
    pub fn new() -> Fork {
        Fork { taken_by: Mutex::new(None) }
    }

    /// Take the fork if it is free (or already ours).
    pub fn try_take(&self, asker: AgentId) -> bool {
        let mut taken_by = self.taken_by.lock().unwrap_or_else(|e| e.into_inner());
        match *taken_by {
            Some(owner) if owner != asker => false,
            _ => {
                *taken_by = Some(asker);
                true
            }
        }
    }

    /// Put the fork down if we hold it.
    pub fn release(&self, asker: AgentId) {
        let mut taken_by = self.taken_by.lock().unwrap_or_else(|e| e.into_inner());
        if *taken_by == Some(asker) {
            *taken_by = None;
        }
    }
}

// ── Seat reports ──────────────────────────────────────────────────────────────

#[derive(Copy, Clone, PartialEq, Eq, Debug, Default)]
pub enum PhilosopherState {
    #[default]
    Think,
    Hungry,
    Eating,
}

impl fmt::Display for PhilosopherState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let c = match self {
            PhilosopherState::Think => 'T',
            PhilosopherState::Hungry => 'H',
            PhilosopherState::Eating => 'E',
        };
        write!(f, "{c}")
    }
}

/// What a philosopher publishes about itself at the end of each cycle.
#[derive(Copy, Clone, Default)]
pub struct SeatReport {
    pub state: PhilosopherState,
    pub eaten: u64,
    pub hunger: u64,
    pub mean_hunger: f64,
}

// ── Table ─────────────────────────────────────────────────────────────────────

/// The environment: one fork per seat and a report board the philosophers
/// publish into from their expose hook.
pub struct Table {
    seats: usize,
    forks: Vec<Fork>,
    board: Mutex<Vec<SeatReport>>,
}

impl Table {
    pub fn new(seats: usize) -> Table {
        Table { seats, forks: Vec::new(), board: Mutex::new(Vec::new()) }
    }

    pub fn fork(&self, index: usize) -> &Fork {
        &self.forks[index]
    }

    pub fn publish(&self, seat: usize, report: SeatReport) {
        self.board.lock().unwrap_or_else(|e| e.into_inner())[seat] = report;
    }

    pub fn board(&self) -> Vec<SeatReport> {
        self.board.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }
}

impl Environment for Table {
    fn on_initialization(&mut self, _rng: &mut SimRng) {
        // Set one fork per seat on the table.
        self.forks = (0..self.seats).map(|_| Fork::new()).collect();
        *self.board.lock().unwrap_or_else(|e| e.into_inner()) =
            vec![SeatReport::default(); self.seats];
    }
}
