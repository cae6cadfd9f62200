use crate::desc::SolverKind;
use crate::graph::Cap;
use tracing::{debug, info};

/// Build and solve stages, in the order the orchestrator runs them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    Costs,
    Smoothness,
    Relations,
    Regions,
    Links,
    Finalize,
    Solve,
    Decode,
}

/// Counters reported by the solvers. Each solver fills the ones it uses.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SolveStats {
    pub pushes: u64,
    pub relabels: u64,
    pub global_relabels: u64,
    pub gaps: u64,
    pub merges: u64,
    pub lifted: u64,
    pub cycles_cancelled: u64,
}

/// Receives progress from a solve request. Passed in explicitly; the core
/// keeps no logger of its own.
pub trait SolveObserver {
    /// Called after `stage` completes. `n_arcs` is the number of arc pairs
    /// staged or laid out so far.
    fn on_stage(&mut self, _stage: Stage, _n_arcs: usize) {}

    fn on_margins(&mut self, _surface: usize, _lo: i32, _hi: i32) {}

    fn on_solved(&mut self, _kind: SolverKind, _flow: Cap, _stats: &SolveStats) {}
}

/// Drops everything.
pub struct NullObserver;

impl SolveObserver for NullObserver {}

/// Forwards events to `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingObserver;

impl SolveObserver for TracingObserver {
    fn on_stage(&mut self, stage: Stage, n_arcs: usize) {
        debug!(?stage, n_arcs, "stage complete");
    }

    fn on_margins(&mut self, surface: usize, lo: i32, hi: i32) {
        debug!(surface, lo, hi, "surface margins");
    }

    fn on_solved(&mut self, kind: SolverKind, flow: Cap, stats: &SolveStats) {
        info!(
            ?kind,
            flow,
            pushes = stats.pushes,
            relabels = stats.relabels,
            global_relabels = stats.global_relabels,
            gaps = stats.gaps,
            merges = stats.merges,
            lifted = stats.lifted,
            "max-flow solved"
        );
    }
}

/// Keeps every event; used by tests and by callers that want a summary.
#[derive(Debug, Default, Clone)]
pub struct RecordingObserver {
    pub stages: Vec<(Stage, usize)>,
    pub margins: Vec<(usize, i32, i32)>,
    pub solved: Option<(SolverKind, Cap, SolveStats)>,
}

impl SolveObserver for RecordingObserver {
    fn on_stage(&mut self, stage: Stage, n_arcs: usize) {
        self.stages.push((stage, n_arcs));
    }

    fn on_margins(&mut self, surface: usize, lo: i32, hi: i32) {
        self.margins.push((surface, lo, hi));
    }

    fn on_solved(&mut self, kind: SolverKind, flow: Cap, stats: &SolveStats) {
        self.solved = Some((kind, flow, *stats));
    }
}
