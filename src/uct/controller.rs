//! Drives iterations under the three run modes and owns the tree while doing so.

use super::error::{ConfigError, EngineError};
use super::game::State;
use super::lock;
use super::observer::{Observer, Snapshot};
use super::random::SearchRng;
use super::search::{iterate, SearchError, Silent, Visible};
use super::token::RunToken;
use super::tree::Tree;
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Which iterations of an animated batch are visible.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Cadence {
    /// The first, the last and every k-th iteration.
    Every(u32),
    /// Only the last iteration.
    FinalOnly,
}

impl Cadence {
    pub fn validate(self) -> Result<Cadence, ConfigError> {
        match self {
            Cadence::Every(0) => Err(ConfigError::ZeroCadence),
            _ => Ok(self),
        }
    }

    /// `iteration` counts from 1 up to `total`. An unvalidated `Every(0)`
    /// behaves like `FinalOnly`.
    pub fn is_visible(self, iteration: u32, total: u32) -> bool {
        match self {
            Cadence::FinalOnly | Cadence::Every(0) => iteration == total,
            Cadence::Every(k) => iteration == 1 || iteration == total || iteration % k == 0,
        }
    }
}

impl FromStr for Cadence {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "final" | "final-only" => Ok(Cadence::FinalOnly),
            other => other
                .parse::<u32>()
                .map_err(|_| ConfigError::UnparsableCadence(other.to_string()))
                .and_then(|k| Cadence::Every(k).validate()),
        }
    }
}

impl fmt::Display for Cadence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Cadence::Every(k) => write!(f, "{}", k),
            Cadence::FinalOnly => write!(f, "final"),
        }
    }
}

/// Search parameters shared by every run of a controller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    /// C in the UCT formula. 0 is pure exploitation.
    pub exploration_constant: f64,

    /// The random stream is reseeded with this at the start of every run.
    pub seed: u64,

    /// Animation pause after each phase change of a visible iteration.
    pub phase_delay_ms: u64,

    /// Animation pause after each rollout move of a visible iteration.
    pub move_delay_ms: u64,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            exploration_constant: std::f64::consts::SQRT_2,
            seed: 42,
            phase_delay_ms: 0,
            move_delay_ms: 0,
        }
    }
}

impl SearchConfig {
    pub fn with_exploration_constant(mut self, c: f64) -> Self {
        self.exploration_constant = c;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn with_phase_delay(mut self, delay: Duration) -> Self {
        self.phase_delay_ms = delay.as_millis() as u64;
        self
    }

    pub fn with_move_delay(mut self, delay: Duration) -> Self {
        self.move_delay_ms = delay.as_millis() as u64;
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let c = self.exploration_constant;
        if !c.is_finite() || c < 0.0 {
            return Err(ConfigError::ExplorationConstant(c));
        }
        Ok(())
    }
}

/// How a run request ended. Cancellation is an outcome, not an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum RunOutcome {
    Completed { iterations: u32 },
    Cancelled { completed: u32 },
    /// The position is already decided; nothing was searched.
    AlreadyTerminal,
}

impl RunOutcome {
    pub fn iterations(self) -> u32 {
        match self {
            RunOutcome::Completed { iterations } => iterations,
            RunOutcome::Cancelled { completed } => completed,
            RunOutcome::AlreadyTerminal => 0,
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum Schedule {
    Step,
    Batch,
    Animated(Cadence),
}

impl Schedule {
    fn is_visible(self, iteration: u32, total: u32) -> bool {
        match self {
            Schedule::Step => true,
            Schedule::Batch => false,
            Schedule::Animated(cadence) => cadence.is_visible(iteration, total),
        }
    }
}

struct Session<S: State> {
    board: S,
    tree: Tree<S>,
    config: SearchConfig,
    rng: SearchRng,
}

type ActiveSlot = Arc<Mutex<Option<RunToken>>>;

/// Holds the run slot for as long as it lives.
struct ActiveRun<'a> {
    slot: &'a Mutex<Option<RunToken>>,
    token: RunToken,
}

impl Drop for ActiveRun<'_> {
    fn drop(&mut self) {
        *lock(self.slot) = None;
    }
}

/// Pause, resume and cancel for whatever run a controller has in flight.
/// Cheap to clone and safe to use from other threads.
#[derive(Debug, Clone)]
pub struct ControlHandle {
    active: ActiveSlot,
}

impl ControlHandle {
    fn with_token(&self, request: &str, f: impl FnOnce(&RunToken)) -> bool {
        match lock(&self.active).as_ref() {
            Some(token) => {
                debug!("{} requested", request);
                f(token);
                true
            }
            None => {
                warn!("{} ignored: no run is active", request);
                false
            }
        }
    }

    /// Returns whether a run was active.
    pub fn pause(&self) -> bool {
        self.with_token("Pause", RunToken::pause)
    }

    pub fn resume(&self) -> bool {
        self.with_token("Resume", RunToken::resume)
    }

    pub fn cancel(&self) -> bool {
        self.with_token("Cancel", RunToken::cancel)
    }

    pub fn is_running(&self) -> bool {
        lock(&self.active).is_some()
    }

    pub fn is_paused(&self) -> bool {
        lock(&self.active)
            .as_ref()
            .map(RunToken::is_paused)
            .unwrap_or(false)
    }
}

///
/// Owns the board, the tree rooted at it and the random stream, and runs
/// iterations against them one run at a time.
///
/// The tree persists across runs until the board changes, `reset` is called or
/// a run asks to discard it. Observers read the published [`Snapshot`]; methods
/// that look at the session itself (`board`, `inspect`) wait for an active run
/// to finish.
pub struct Controller<S: State> {
    session: Mutex<Session<S>>,
    active: ActiveSlot,
    published: Mutex<Snapshot<S::ActionType>>,
}

impl<S: State> Controller<S> {
    pub fn new(board: S, config: SearchConfig) -> Result<Controller<S>, EngineError> {
        config.validate()?;
        let tree = Tree::new(board.clone());
        let published = Snapshot::of(&tree, 0);
        Ok(Controller {
            session: Mutex::new(Session {
                board,
                tree,
                rng: SearchRng::new(config.seed),
                config,
            }),
            active: Arc::new(Mutex::new(None)),
            published: Mutex::new(published),
        })
    }

    pub fn handle(&self) -> ControlHandle {
        ControlHandle {
            active: Arc::clone(&self.active),
        }
    }

    fn claim(&self) -> Result<ActiveRun<'_>, EngineError> {
        let mut slot = lock(&self.active);
        if slot.is_some() {
            return Err(EngineError::RunAlreadyActive);
        }
        let token = RunToken::new();
        *slot = Some(token.clone());
        Ok(ActiveRun {
            slot: &self.active,
            token,
        })
    }

    pub fn board(&self) -> S {
        lock(&self.session).board.clone()
    }

    pub fn config(&self) -> SearchConfig {
        lock(&self.session).config.clone()
    }

    /// Replaces the position and starts a new tree at it.
    pub fn set_board(&self, board: S) -> Result<(), EngineError> {
        let _run = self.claim()?;
        let mut session = lock(&self.session);
        session.board = board;
        self.replace_tree(&mut session);
        Ok(())
    }

    /// Plays `action` for the side to move; the tree restarts at the new position.
    pub fn play(&self, action: S::ActionType) -> Result<(), EngineError> {
        let _run = self.claim()?;
        let mut session = lock(&self.session);
        let side = session.board.next_actor();
        session.board = session.board.apply(action, side)?;
        info!("{} played {}", side, action);
        self.replace_tree(&mut session);
        Ok(())
    }

    /// Throws away all search statistics.
    pub fn reset(&self) -> Result<(), EngineError> {
        let _run = self.claim()?;
        let mut session = lock(&self.session);
        self.replace_tree(&mut session);
        Ok(())
    }

    fn replace_tree(&self, session: &mut Session<S>) {
        session.tree = Tree::new(session.board.clone());
        *lock(&self.published) = Snapshot::of(&session.tree, 0);
    }

    pub fn set_exploration_constant(&self, c: f64) -> Result<(), EngineError> {
        let _run = self.claim()?;
        let mut session = lock(&self.session);
        let config = session.config.clone().with_exploration_constant(c);
        config.validate()?;
        session.config = config;
        Ok(())
    }

    pub fn set_seed(&self, seed: u64) -> Result<(), EngineError> {
        let _run = self.claim()?;
        lock(&self.session).config.seed = seed;
        Ok(())
    }

    /// One fully visible iteration on the current tree.
    pub fn step_once(
        &self,
        observer: &mut dyn Observer<S::ActionType>,
    ) -> Result<RunOutcome, EngineError> {
        self.run(1, Schedule::Step, false, observer)
    }

    /// `iterations` fast iterations. Pause and cancel are only honoured between
    /// iterations.
    pub fn run_batch(
        &self,
        iterations: u32,
        discard_prior_tree: bool,
        observer: &mut dyn Observer<S::ActionType>,
    ) -> Result<RunOutcome, EngineError> {
        self.run(iterations, Schedule::Batch, discard_prior_tree, observer)
    }

    /// `iterations` iterations, the ones picked by `cadence` visible.
    pub fn step_many_animated(
        &self,
        iterations: u32,
        cadence: Cadence,
        discard_prior_tree: bool,
        observer: &mut dyn Observer<S::ActionType>,
    ) -> Result<RunOutcome, EngineError> {
        let cadence = cadence.validate()?;
        self.run(
            iterations,
            Schedule::Animated(cadence),
            discard_prior_tree,
            observer,
        )
    }

    fn run(
        &self,
        iterations: u32,
        schedule: Schedule,
        discard_prior_tree: bool,
        observer: &mut dyn Observer<S::ActionType>,
    ) -> Result<RunOutcome, EngineError> {
        if iterations == 0 {
            return Err(ConfigError::NoIterations.into());
        }
        let run = self.claim()?;
        let mut session = lock(&self.session);
        if session.board.terminal() {
            info!("Position is already decided, nothing to search");
            return Ok(RunOutcome::AlreadyTerminal);
        }

        let Session {
            board,
            tree,
            config,
            rng,
        } = &mut *session;
        rng.reseed(config.seed);
        if discard_prior_tree {
            *tree = Tree::new(board.clone());
        }
        debug!(
            "Starting {:?} run of {} iterations (c = {}, seed = {})",
            schedule, iterations, config.exploration_constant, config.seed
        );

        let phase_delay = Duration::from_millis(config.phase_delay_ms);
        let move_delay = Duration::from_millis(config.move_delay_ms);
        let mut completed = 0;
        let mut cancelled = false;
        for iteration in 1..=iterations {
            if run.token.checkpoint().is_err() {
                cancelled = true;
                break;
            }
            let visible = schedule.is_visible(iteration, iterations);
            let result = if visible {
                let mut hooks = Visible {
                    token: &run.token,
                    observer: &mut *observer,
                    published: &self.published,
                    phase_delay,
                    move_delay,
                };
                iterate(tree, rng, config.exploration_constant, &mut hooks)
            } else {
                iterate(tree, rng, config.exploration_constant, &mut Silent)
            };
            match result {
                Ok(_) => completed += 1,
                Err(SearchError::Cancelled) => {
                    cancelled = true;
                    break;
                }
                Err(SearchError::Game(err)) => {
                    self.publish(tree, completed, observer);
                    return Err(err.into());
                }
            }
            if visible && iteration < iterations {
                self.publish(tree, completed, observer);
            }
        }

        self.publish(tree, completed, observer);
        tree.trace_log_children();
        let outcome = if cancelled {
            RunOutcome::Cancelled { completed }
        } else {
            RunOutcome::Completed {
                iterations: completed,
            }
        };
        info!(
            "{:?} after {} of {} iterations, tree has {} nodes",
            outcome,
            completed,
            iterations,
            tree.len()
        );
        Ok(outcome)
    }

    fn publish(
        &self,
        tree: &Tree<S>,
        completed: u32,
        observer: &mut dyn Observer<S::ActionType>,
    ) {
        let snapshot = Snapshot::of(tree, completed);
        *lock(&self.published) = snapshot.clone();
        observer.on_snapshot(&snapshot);
    }

    pub fn pause(&self) -> bool {
        self.handle().pause()
    }

    pub fn resume(&self) -> bool {
        self.handle().resume()
    }

    pub fn cancel(&self) -> bool {
        self.handle().cancel()
    }

    pub fn is_running(&self) -> bool {
        self.handle().is_running()
    }

    /// The most recently published snapshot. Never blocks on a run.
    pub fn snapshot(&self) -> Snapshot<S::ActionType> {
        lock(&self.published).clone()
    }

    /// The recommended move of the latest published snapshot.
    pub fn best_action(&self) -> Option<S::ActionType> {
        lock(&self.published).best_move
    }

    /// Read access to the live tree, after any active run has finished.
    pub fn inspect<R>(&self, f: impl FnOnce(&Tree<S>) -> R) -> R {
        f(&lock(&self.session).tree)
    }
}
