//! philosophers — dining-philosophers demonstration of the amas engine.
//!
//! Eight philosophers share eight forks around a table.  A hungry
//! philosopher takes both adjacent forks only when the local
//! criticality vote (hunger duration) says it is the most urgent eater in
//! its neighborhood; everyone eventually eats without any central
//! coordination.
//!
//! Flags:
//!   --two-phases   run the tick as a strict super-step
//!   --async        free-running philosophers instead of barrier-stepped
//!   --seed N       master RNG seed          (default 42)
//!   --sleep MS     delay between cycles     (default 100)
//!   --meals N      stop once everyone ate N (default 5)
//!   --quiet        no per-cycle report

mod table;

use std::sync::mpsc;

use anyhow::{Result, bail};

use amas_agent::{AgentBehavior, AgentCtx, AgentMode};
use amas_core::ExecutionPolicy;
use amas_engine::{Amas, AmasModel, EngineConfig, Parallelism};
use amas_sched::SchedulerEvent;

use table::{PhilosopherState, SeatReport, Table};

const SEATS: usize = 8;

// ── Philosopher ───────────────────────────────────────────────────────────────

/// One eater: thinks, grows hungry, and competes for its two forks.
struct Philosopher {
    seat: usize,
    left_fork: usize,
    right_fork: usize,
    state: PhilosopherState,
    hunger: u64,
    eaten: u64,
    hunger_durations: Vec<u64>,
}

impl Philosopher {
    fn new(seat: usize, left_fork: usize, right_fork: usize) -> Philosopher {
        Philosopher {
            seat,
            left_fork,
            right_fork,
            state: PhilosopherState::Think,
            hunger: 0,
            eaten: 0,
            hunger_durations: Vec::new(),
        }
    }

    fn mean_hunger(&self) -> f64 {
        if self.hunger_durations.is_empty() {
            return 0.0;
        }
        self.hunger_durations.iter().sum::<u64>() as f64 / self.hunger_durations.len() as f64
    }
}

impl AgentBehavior<Table> for Philosopher {
    fn compute_criticality(&mut self, _ctx: &mut AgentCtx<'_, Table>) -> f64 {
        self.hunger as f64
    }

    fn on_decide_and_act(&mut self, ctx: &mut AgentCtx<'_, Table>) {
        let me = ctx.id;
        self.state = match self.state {
            PhilosopherState::Think => {
                if ctx.rng.gen_bool(0.5) {
                    self.hunger_durations.push(self.hunger);
                    self.hunger = 0;
                    PhilosopherState::Hungry
                } else {
                    PhilosopherState::Think
                }
            }
            PhilosopherState::Hungry => {
                self.hunger += 1;
                let table = ctx.env;
                if ctx.most_critical_neighbor(true) == Some(me)
                    && table.fork(self.left_fork).try_take(me)
                    && table.fork(self.right_fork).try_take(me)
                {
                    PhilosopherState::Eating
                } else {
                    table.fork(self.left_fork).release(me);
                    table.fork(self.right_fork).release(me);
                    PhilosopherState::Hungry
                }
            }
            PhilosopherState::Eating => {
                self.eaten += 1;
                if ctx.rng.gen_bool(0.5) {
                    ctx.env.fork(self.left_fork).release(me);
                    ctx.env.fork(self.right_fork).release(me);
                    PhilosopherState::Think
                } else {
                    PhilosopherState::Eating
                }
            }
        };
    }

    fn on_expose(&mut self, ctx: &mut AgentCtx<'_, Table>) {
        ctx.env.publish(
            self.seat,
            SeatReport {
                state: self.state,
                eaten: self.eaten,
                hunger: self.hunger,
                mean_hunger: self.mean_hunger(),
            },
        );
    }
}

// ── Model ─────────────────────────────────────────────────────────────────────

/// Seats the philosophers, wires the ring, reports, and stops the dinner
/// once everyone has eaten enough.
struct PhiloTable {
    policy: ExecutionPolicy,
    mode: AgentMode,
    target_meals: u64,
    report: bool,
}

impl AmasModel<Table> for PhiloTable {
    fn execution_policy(&self) -> ExecutionPolicy {
        self.policy
    }

    fn stop_condition(&self, amas: &Amas<Table, Self>) -> bool {
        amas.env().board().iter().all(|r| r.eaten >= self.target_meals)
    }

    fn on_initial_agents_creation(&self, amas: &Amas<Table, Self>) {
        // One philosopher per fork; the last one wraps to the first fork.
        let ids: Vec<_> = (0..SEATS)
            .map(|seat| {
                amas.add_agent(Philosopher::new(seat, seat, (seat + 1) % SEATS), self.mode)
            })
            .collect();
        for seat in 0..SEATS {
            let left = ids[(seat + SEATS - 1) % SEATS];
            let right = ids[(seat + 1) % SEATS];
            amas.add_neighbors(ids[seat], &[left, right])
                .expect("ring wiring uses freshly staged ids");
        }
    }

    fn on_cycle_end(&self, amas: &Amas<Table, Self>) {
        if self.report {
            print_cycle(amas.cycle_count(), &amas.env().board());
        }
    }
}

// ── Reporting ─────────────────────────────────────────────────────────────────

fn join<T: ToString>(values: impl Iterator<Item = T>) -> String {
    values.map(|v| v.to_string()).collect::<Vec<_>>().join("  |  ")
}

fn print_cycle(cycle: u64, board: &[SeatReport]) {
    println!("\nCycle: {cycle}");
    println!("======================");
    println!("Philosophers:\t{}", join(0..board.len()));
    println!("Eaten pastas:\t{}", join(board.iter().map(|r| r.eaten)));
    println!("States:      \t{}", join(board.iter().map(|r| r.state)));
    println!("Hunger:      \t{}", join(board.iter().map(|r| r.hunger)));
}

fn print_summary(cycles: u64, board: &[SeatReport]) {
    println!("\nTotal cycles: {cycles}");
    println!("======================");
    println!("Philosophers:\t{}", join(0..board.len()));
    println!("Eaten pastas:\t{}", join(board.iter().map(|r| r.eaten)));
    println!("Mean hunger: \t{}", join(board.iter().map(|r| format!("{:.1}", r.mean_hunger))));
}

// ── CLI ───────────────────────────────────────────────────────────────────────

struct Args {
    two_phases: bool,
    asynchronous: bool,
    seed: u64,
    sleep_ms: u64,
    meals: u64,
    quiet: bool,
}

fn parse_args() -> Result<Args> {
    let mut args = Args {
        two_phases: false,
        asynchronous: false,
        seed: 42,
        sleep_ms: 100,
        meals: 5,
        quiet: false,
    };
    let mut it = std::env::args().skip(1);
    while let Some(flag) = it.next() {
        match flag.as_str() {
            "--two-phases" => args.two_phases = true,
            "--async" => args.asynchronous = true,
            "--quiet" => args.quiet = true,
            "--seed" | "--sleep" | "--meals" => {
                let Some(value) = it.next() else {
                    bail!("{flag} needs a value");
                };
                let value: u64 = value.parse()?;
                match flag.as_str() {
                    "--seed" => args.seed = value,
                    "--sleep" => args.sleep_ms = value,
                    _ => args.meals = value,
                }
            }
            other => bail!("unknown flag: {other}"),
        }
    }
    Ok(args)
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let args = parse_args()?;
    let model = PhiloTable {
        policy: if args.two_phases { ExecutionPolicy::TwoPhases } else { ExecutionPolicy::OnePhase },
        mode: if args.asynchronous { AgentMode::Asynchronous } else { AgentMode::Synchronous },
        target_meals: args.meals,
        report: !args.quiet,
    };

    let amas = Amas::new(
        Table::new(SEATS),
        model,
        EngineConfig { seed: args.seed, parallelism: Parallelism::WorkerPool },
    );

    let (tx, rx) = mpsc::channel();
    amas.scheduler().observe(move |event| {
        if event == SchedulerEvent::Stopped {
            let _ = tx.send(());
        }
    });

    amas.scheduler().start_with(args.sleep_ms);
    rx.recv()?;

    print_summary(amas.cycle_count(), &amas.env().board());
    Ok(())
}
