//! Monte Carlo tree search with UCT selection for two player alternating games.
//!
//! Every iteration adds one random playout to the tree:
//!
//! 1. **Selection**: descend through fully expanded nodes by UCT score
//! 2. **Expansion**: add one untried action as a new child
//! 3. **Simulation**: play uniformly random moves to the end of the game
//! 4. **Backpropagation**: record the outcome, from the root side's point of
//!    view, on every node back up to the root
//!
//! The [`Controller`] runs iterations one at a time with every phase visible,
//! as fast batches, or as batches where only some iterations are visible. All
//! randomness comes from one [`SearchRng`] reseeded at the start of each run,
//! so runs with the same seed, board and parameters reproduce exactly.

pub mod controller;
pub mod error;
pub mod game;
pub mod node;
pub mod observer;
pub mod random;
pub mod score;
pub mod search;
pub mod token;
pub mod tree;

pub use controller::{Cadence, ControlHandle, Controller, RunOutcome, SearchConfig};
pub use error::{ConfigError, EngineError, GameError};
pub use game::{Action, Category, Outcome, Side, State};
pub use node::{Node, NodeId};
pub use observer::{LogObserver, Observer, Phase, Recorder, SearchEvent, Snapshot};
pub use random::SearchRng;
pub use score::uct_score;
pub use token::{Cancelled, RunToken};
pub use tree::{MoveStats, Tree, TreeStats};

use std::sync::{Mutex, MutexGuard, PoisonError};

/// Locks ignoring poisoning; every critical section leaves its data consistent.
pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

///
/// Searches `state` from scratch for `iterations` fast iterations and returns
/// the most visited move, or `None` when the game is already over.
///
pub fn calculate_best_turn<S: State>(
    state: S,
    iterations: u32,
    config: SearchConfig,
) -> Result<Option<S::ActionType>, EngineError> {
    let controller = Controller::new(state, config)?;
    match controller.run_batch(iterations, true, &mut ())? {
        RunOutcome::AlreadyTerminal => Ok(None),
        _ => Ok(controller.best_action()),
    }
}
