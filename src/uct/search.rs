//! One simulated playout: select -> expand -> simulate -> backpropagate.
//!
//! Fast and visible iterations run the same code; they differ only in the
//! [`Hooks`] passed in. Hooks never draw from the random stream, so a fast and a
//! visible iteration from the same tree and stream leave identical trees.

use super::error::GameError;
use super::game::{Outcome, State};
use super::lock;
use super::node::NodeId;
use super::observer::{Observer, Phase, SearchEvent, Snapshot};
use super::random::SearchRng;
use super::score::uct_score;
use super::token::{Cancelled, RunToken};
use super::tree::Tree;
use log::trace;
use std::sync::Mutex;
use std::time::Duration;
use thiserror::Error;

/// Scores closer than this are treated as equal during selection.
pub const TIE_EPSILON: f64 = 1e-12;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum SearchError {
    #[error("Run cancelled")]
    Cancelled,

    #[error("Game rejected a permitted action: {0}")]
    Game(#[from] GameError),
}

impl From<Cancelled> for SearchError {
    fn from(_: Cancelled) -> Self {
        SearchError::Cancelled
    }
}

/// Suspension points of an iteration.
pub trait Hooks<A> {
    /// Plain cancellation/pause check.
    fn checkpoint(&mut self) -> Result<(), Cancelled>;

    /// Checks, then publishes the event. The closure only runs when somebody
    /// is watching.
    fn suspend<F>(&mut self, event: F) -> Result<(), Cancelled>
    where
        F: FnOnce() -> SearchEvent<A>;
}

/// Fast mode: no suspension points.
#[derive(Debug, Default, Clone, Copy)]
pub struct Silent;

impl<A> Hooks<A> for Silent {
    #[inline]
    fn checkpoint(&mut self) -> Result<(), Cancelled> {
        Ok(())
    }

    #[inline]
    fn suspend<F>(&mut self, _event: F) -> Result<(), Cancelled>
    where
        F: FnOnce() -> SearchEvent<A>,
    {
        Ok(())
    }
}

/// Visible mode: honours the run token, keeps the published snapshot's phase
/// and rollout trace current, forwards events and paces the animation.
pub struct Visible<'a, A> {
    pub token: &'a RunToken,
    pub observer: &'a mut dyn Observer<A>,
    pub published: &'a Mutex<Snapshot<A>>,
    pub phase_delay: Duration,
    pub move_delay: Duration,
}

impl<A: Copy> Hooks<A> for Visible<'_, A> {
    fn checkpoint(&mut self) -> Result<(), Cancelled> {
        self.token.checkpoint()
    }

    fn suspend<F>(&mut self, event: F) -> Result<(), Cancelled>
    where
        F: FnOnce() -> SearchEvent<A>,
    {
        self.token.checkpoint()?;
        let event = event();
        {
            let mut published = lock(self.published);
            match &event {
                SearchEvent::PhaseChanged(phase) => {
                    published.phase = *phase;
                    if *phase == Phase::Simulation {
                        published.rollout_trace.clear();
                    }
                }
                SearchEvent::RolloutMove { action, .. } => published.rollout_trace.push(*action),
                _ => {}
            }
        }
        self.observer.on_event(&event);
        let delay = match event {
            SearchEvent::PhaseChanged(_) => self.phase_delay,
            SearchEvent::RolloutMove { .. } => self.move_delay,
            _ => Duration::ZERO,
        };
        self.token.wait(delay)
    }
}

///
/// Adds one simulated game to the tree.
///
/// A cancellation observed before backpropagation abandons the iteration
/// without touching any statistics. Once backpropagation has run the iteration
/// counts as complete, even if a cancel is noticed straight after.
pub fn iterate<S, H>(
    tree: &mut Tree<S>,
    rng: &mut SearchRng,
    exploration_constant: f64,
    hooks: &mut H,
) -> Result<Outcome, SearchError>
where
    S: State,
    H: Hooks<S::ActionType>,
{
    let selected = select(tree, rng, exploration_constant, hooks)?;
    let leaf = expand(tree, selected, rng, hooks)?;
    let outcome = simulate(tree.get(leaf).state(), rng, hooks)?;

    hooks.suspend(|| SearchEvent::PhaseChanged(Phase::Backpropagation))?;
    tree.backpropagate(leaf, outcome);
    let reward = outcome.reward_for(tree.root_side());
    if hooks
        .suspend(|| SearchEvent::Backpropagated { outcome, reward })
        .is_err()
    {
        trace!("Cancelled after backpropagation, keeping the iteration");
    }
    Ok(outcome)
}

/// Walks down through fully expanded nodes, taking the best UCT child each time.
pub fn select<S, H>(
    tree: &Tree<S>,
    rng: &mut SearchRng,
    exploration_constant: f64,
    hooks: &mut H,
) -> Result<NodeId, Cancelled>
where
    S: State,
    H: Hooks<S::ActionType>,
{
    hooks.suspend(|| SearchEvent::PhaseChanged(Phase::Selection))?;
    let mut current = tree.root();
    while tree.get(current).selectable() {
        let (action, child) = match best_child(tree, current, exploration_constant, rng, hooks)? {
            Some(best) => best,
            None => break,
        };
        current = child;
        hooks.suspend(|| SearchEvent::Descended {
            action,
            root_move: tree.root_move_of(child),
        })?;
    }
    Ok(current)
}

///
/// The child with the highest UCT score.
///
/// Ties within [`TIE_EPSILON`] are broken uniformly at random, one draw per
/// tied candidate after the first, so earlier expanded children get no edge.
/// `hooks` is checked before every comparison.
pub fn best_child<S, H>(
    tree: &Tree<S>,
    parent: NodeId,
    exploration_constant: f64,
    rng: &mut SearchRng,
    hooks: &mut H,
) -> Result<Option<(S::ActionType, NodeId)>, Cancelled>
where
    S: State,
    H: Hooks<S::ActionType>,
{
    let node = tree.get(parent);
    let mut best: Option<(S::ActionType, NodeId)> = None;
    let mut best_score = f64::NEG_INFINITY;
    let mut tied = 0;

    for (action, child_id) in node.children() {
        hooks.checkpoint()?;
        let child = tree.get(*child_id);
        let score = uct_score(
            node.visit_count(),
            child.visit_count(),
            child.total_reward(),
            exploration_constant,
        );
        trace!(
            "UCT action: {}, reward: {}, visits: {}, parent visits: {}, c: {}, score: {}",
            action,
            child.total_reward(),
            child.visit_count(),
            node.visit_count(),
            exploration_constant,
            score
        );
        if best.is_none() || score > best_score + TIE_EPSILON {
            best = Some((*action, *child_id));
            best_score = score;
            tied = 1;
        } else if (score - best_score).abs() <= TIE_EPSILON {
            tied += 1;
            if rng.replace_tie(tied) {
                best = Some((*action, *child_id));
            }
        }
    }
    Ok(best)
}

/// Expands one random untried action of `leaf`. Terminal and fully expanded
/// leaves are returned unchanged.
pub fn expand<S, H>(
    tree: &mut Tree<S>,
    leaf: NodeId,
    rng: &mut SearchRng,
    hooks: &mut H,
) -> Result<NodeId, SearchError>
where
    S: State,
    H: Hooks<S::ActionType>,
{
    hooks.suspend(|| SearchEvent::PhaseChanged(Phase::Expansion))?;
    let node = tree.get(leaf);
    if node.is_terminal() || node.untried().is_empty() {
        return Ok(leaf);
    }
    let action = node.untried()[rng.index(node.untried().len())];
    let state = node.state().apply(action, node.to_move())?;
    let child = tree.add_child(leaf, action, state);
    hooks.suspend(|| SearchEvent::Expanded {
        action,
        root_move: tree.root_move_of(child),
    })?;
    Ok(child)
}

///
/// Plays uniformly random legal moves for both sides until the game ends.
///
/// Moves are reported through `hooks`; an already finished `state` plays
/// nothing.
pub fn simulate<S, H>(
    state: &S,
    rng: &mut SearchRng,
    hooks: &mut H,
) -> Result<Outcome, SearchError>
where
    S: State,
    H: Hooks<S::ActionType>,
{
    hooks.suspend(|| SearchEvent::PhaseChanged(Phase::Simulation))?;
    let mut moves = 0;
    let mut current = state.clone();
    loop {
        if let Some(outcome) = current.outcome() {
            trace!("Rollout of {} moves ended in {:?}", moves, outcome);
            return Ok(outcome);
        }
        let permitted_actions = current.permitted_actions();
        if permitted_actions.is_empty() {
            // A finished game must report an outcome
            return Err(SearchError::Game(GameError::GameOver));
        }
        let side = current.next_actor();
        let action = permitted_actions[rng.index(permitted_actions.len())];
        current = current.apply(action, side)?;
        moves += 1;
        hooks.suspend(|| SearchEvent::RolloutMove { action, side })?;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test::injectable_game::{TestGameAction, TestGameState};
    use crate::uct::game::Side;

    /// Counts checkpoints and keeps every event, cancelling once `cancel_at`
    /// checkpoints have passed.
    #[derive(Default)]
    struct Tally {
        checkpoints: usize,
        cancel_at: Option<usize>,
        events: Vec<SearchEvent<TestGameAction>>,
    }

    impl Hooks<TestGameAction> for Tally {
        fn checkpoint(&mut self) -> Result<(), Cancelled> {
            if self.cancel_at == Some(self.checkpoints) {
                return Err(Cancelled);
            }
            self.checkpoints += 1;
            Ok(())
        }

        fn suspend<F>(&mut self, event: F) -> Result<(), Cancelled>
        where
            F: FnOnce() -> SearchEvent<TestGameAction>,
        {
            self.events.push(event());
            Ok(())
        }
    }

    fn rollout_moves(tally: &Tally) -> Vec<TestGameAction> {
        tally
            .events
            .iter()
            .filter_map(|event| match event {
                SearchEvent::RolloutMove { action, .. } => Some(*action),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn test_first_iteration_expands_one_root_child() {
        let mut tree = Tree::new(TestGameState::branching(3));
        let mut rng = SearchRng::new(42);
        iterate(&mut tree, &mut rng, 1.0, &mut Silent).unwrap();

        let root = tree.root_node();
        assert_eq!(root.visit_count(), 1);
        assert_eq!(root.children().len(), 1);
        assert_eq!(root.untried().len(), 2);
        assert_eq!(tree.get(root.children()[0].1).visit_count(), 1);
    }

    #[test]
    fn test_selection_descends_only_through_fully_expanded_nodes() {
        let mut tree = Tree::new(TestGameState::branching(2));
        let mut rng = SearchRng::new(1);
        iterate(&mut tree, &mut rng, 1.0, &mut Silent).unwrap();
        // Root still has an untried action, so selection stops there
        assert_eq!(select(&tree, &mut rng, 1.0, &mut Silent), Ok(tree.root()));

        iterate(&mut tree, &mut rng, 1.0, &mut Silent).unwrap();
        let selected = select(&tree, &mut rng, 1.0, &mut Silent).unwrap();
        assert_eq!(tree.get(selected).parent(), Some(tree.root()));
    }

    #[test]
    fn test_best_child_prefers_unvisited_with_large_constant() {
        let mut tree = Tree::new(TestGameState::branching(2));
        let mut rng = SearchRng::new(3);
        iterate(&mut tree, &mut rng, 1.0, &mut Silent).unwrap();
        let visited = tree.root_node().children()[0].0;
        let fresh = tree.root_node().untried()[0];
        let state = tree.root_node().state().apply(fresh, Side::First).unwrap();
        tree.add_child(tree.root(), fresh, state);

        let (chosen, _) = best_child(&tree, tree.root(), 100.0, &mut rng, &mut Silent)
            .unwrap()
            .unwrap();
        assert_eq!(chosen, fresh);
        assert_ne!(chosen, visited);
    }

    #[test]
    fn test_every_uct_comparison_is_a_checkpoint() {
        let mut tree = Tree::new(TestGameState::branching(4));
        for action in (0..4).map(TestGameAction::WinInXTurns) {
            let state = tree.root_node().state().apply(action, Side::First).unwrap();
            tree.add_child(tree.root(), action, state);
        }
        let mut rng = SearchRng::new(9);

        let mut tally = Tally::default();
        assert!(best_child(&tree, tree.root(), 1.0, &mut rng, &mut tally)
            .unwrap()
            .is_some());
        assert_eq!(tally.checkpoints, 4);

        let mut tally = Tally {
            cancel_at: Some(2),
            ..Tally::default()
        };
        assert_eq!(
            best_child(&tree, tree.root(), 1.0, &mut rng, &mut tally),
            Err(Cancelled)
        );
        assert_eq!(tally.checkpoints, 2);
    }

    #[test]
    fn test_ties_are_not_biased_to_insertion_order() {
        let mut tree = Tree::new(TestGameState::branching(4));
        for action in (0..4).map(TestGameAction::WinInXTurns) {
            let state = tree.root_node().state().apply(action, Side::First).unwrap();
            tree.add_child(tree.root(), action, state);
        }
        let mut rng = SearchRng::new(9);
        let mut counts = [0usize; 4];
        for _ in 0..4000 {
            if let Ok(Some((TestGameAction::WinInXTurns(i), _))) =
                best_child(&tree, tree.root(), 1.0, &mut rng, &mut Silent)
            {
                counts[i as usize] += 1;
            }
        }
        for count in counts {
            assert!(count > 700, "{:?}", counts);
        }
    }

    #[test]
    fn test_terminal_root_plays_nothing() {
        let mut tree = Tree::new(TestGameState::finished(Outcome::Winner(Side::Second)));
        let mut rng = SearchRng::new(5);
        let outcome = iterate(&mut tree, &mut rng, 1.0, &mut Silent).unwrap();
        assert_eq!(outcome, Outcome::Winner(Side::Second));
        assert_eq!(tree.len(), 1);
        assert_eq!(tree.root_node().visit_count(), 1);
        assert_eq!(tree.root_node().losses(), 1);
    }

    #[test]
    fn test_simulate_plays_to_the_end() {
        let state = TestGameState {
            injected_outcome: None,
            injected_permitted_actions: vec![TestGameAction::WinInXTurns(3)],
            next_player: Side::First,
        };
        let mut rng = SearchRng::new(11);
        let mut tally = Tally::default();
        let outcome = simulate(&state, &mut rng, &mut tally).unwrap();
        let rollout = rollout_moves(&tally);
        // 3, 2, 1, 0 then Win: five moves, the last by First
        assert_eq!(rollout.len(), 5);
        assert_eq!(rollout.last(), Some(&TestGameAction::Win));
        assert_eq!(outcome, Outcome::Winner(Side::First));
    }

    #[test]
    fn test_iterations_are_reproducible() {
        let run = || {
            let mut tree = Tree::new(TestGameState {
                injected_outcome: None,
                injected_permitted_actions: vec![
                    TestGameAction::NextTurnInjectActionCount(4),
                    TestGameAction::WinInXTurns(2),
                    TestGameAction::Draw,
                ],
                next_player: Side::First,
            });
            let mut rng = SearchRng::new(42);
            for _ in 0..200 {
                iterate(&mut tree, &mut rng, 1.4, &mut Silent).unwrap();
            }
            tree.move_stats()
        };
        assert_eq!(run(), run());
    }
}
