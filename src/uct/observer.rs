//! What a run publishes to the presentation layer.

use super::game::{Outcome, Side, State};
use super::tree::{MoveStats, Tree};
use log::debug;
use serde::Serialize;
use std::fmt::Debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub enum Phase {
    #[default]
    Idle,
    Selection,
    Expansion,
    Simulation,
    Backpropagation,
}

/// Emitted by visible iterations only.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum SearchEvent<A> {
    PhaseChanged(Phase),
    /// Selection moved one level down. `root_move` is the root child the path
    /// goes through.
    Descended { action: A, root_move: Option<A> },
    Expanded { action: A, root_move: Option<A> },
    RolloutMove { action: A, side: Side },
    /// `reward` is measured for the root's side to move.
    Backpropagated { outcome: Outcome, reward: f64 },
}

/// Read-only view of the search state, published after visible steps and batches.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Snapshot<A> {
    pub phase: Phase,
    pub iterations: u32,
    pub root_visits: u32,
    pub tree_size: usize,
    pub moves: Vec<MoveStats<A>>,
    pub best_move: Option<A>,
    /// Moves of the rollout currently being played, for overlays.
    pub rollout_trace: Vec<A>,
}

impl<A> Default for Snapshot<A> {
    fn default() -> Self {
        Snapshot {
            phase: Phase::Idle,
            iterations: 0,
            root_visits: 0,
            tree_size: 0,
            moves: Vec::new(),
            best_move: None,
            rollout_trace: Vec::new(),
        }
    }
}

impl<A: Copy> Snapshot<A> {
    pub fn of<S: State<ActionType = A>>(tree: &Tree<S>, iterations: u32) -> Snapshot<A> {
        Snapshot {
            phase: Phase::Idle,
            iterations,
            root_visits: tree.root_node().visit_count(),
            tree_size: tree.len(),
            moves: tree.move_stats(),
            best_move: tree.best_action(),
            rollout_trace: Vec::new(),
        }
    }
}

///
/// Receives events and snapshots on the thread running the search.
///
/// Callbacks run while the controller holds its session lock. An observer must
/// not call `Controller::board`, `config`, `inspect` or any run or board
/// method of the controller it is watching, or the run deadlocks. `snapshot`,
/// `best_action` and the pause/resume/cancel controls are safe.
pub trait Observer<A> {
    fn on_event(&mut self, event: &SearchEvent<A>);

    fn on_snapshot(&mut self, _snapshot: &Snapshot<A>) {}
}

/// Ignores everything.
impl<A> Observer<A> for () {
    fn on_event(&mut self, _event: &SearchEvent<A>) {}
}

/// Writes events to the `debug` log.
#[derive(Debug, Default)]
pub struct LogObserver;

impl<A: Debug> Observer<A> for LogObserver {
    fn on_event(&mut self, event: &SearchEvent<A>) {
        debug!("{:?}", event);
    }

    fn on_snapshot(&mut self, snapshot: &Snapshot<A>) {
        debug!(
            "Snapshot after {} iterations: root visits {}, best {:?}",
            snapshot.iterations, snapshot.root_visits, snapshot.best_move
        );
    }
}

/// Keeps every event and snapshot in order.
#[derive(Debug, Clone, Serialize)]
pub struct Recorder<A> {
    pub events: Vec<SearchEvent<A>>,
    pub snapshots: Vec<Snapshot<A>>,
}

impl<A> Default for Recorder<A> {
    fn default() -> Self {
        Recorder {
            events: Vec::new(),
            snapshots: Vec::new(),
        }
    }
}

impl<A> Recorder<A> {
    pub fn new() -> Recorder<A> {
        Recorder::default()
    }

    pub fn phases(&self) -> Vec<Phase> {
        self.events
            .iter()
            .filter_map(|event| match event {
                SearchEvent::PhaseChanged(phase) => Some(*phase),
                _ => None,
            })
            .collect()
    }
}

impl<A: Clone> Observer<A> for Recorder<A> {
    fn on_event(&mut self, event: &SearchEvent<A>) {
        self.events.push(event.clone());
    }

    fn on_snapshot(&mut self, snapshot: &Snapshot<A>) {
        self.snapshots.push(snapshot.clone());
    }
}
