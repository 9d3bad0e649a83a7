use super::game::{Category, Outcome, Side, State};
use serde::Serialize;

/// Index into the tree's node arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct NodeId(pub u32);

impl NodeId {
    #[inline]
    pub(crate) fn index(self) -> usize {
        self.0 as usize
    }
}

///
/// A vertex of the search tree.
///
/// Children are owned through the arena and listed in expansion order. `parent`
/// is only a back link for backpropagation and never implies ownership.
#[derive(Debug, Clone)]
pub struct Node<S: State> {
    pub(crate) state: S,
    pub(crate) to_move: Side,
    pub(crate) parent: Option<NodeId>,
    pub(crate) action: Option<S::ActionType>,
    pub(crate) depth: u32,
    pub(crate) children: Vec<(S::ActionType, NodeId)>,
    /// Legal actions not yet expanded. Shrinks monotonically.
    pub(crate) untried: Vec<S::ActionType>,
    pub(crate) visit_count: u32,
    /// Sum of rewards from the root's to-move perspective.
    pub(crate) total_reward: f64,
    pub(crate) wins: u32,
    pub(crate) draws: u32,
    pub(crate) losses: u32,
    pub(crate) terminal: Option<Outcome>,
}

impl<S: State> Node<S> {
    pub(crate) fn new_root(state: S) -> Node<S> {
        Self::create(state, None, None, 0)
    }

    pub(crate) fn new_child(
        state: S,
        parent: NodeId,
        action: S::ActionType,
        depth: u32,
    ) -> Node<S> {
        Self::create(state, Some(parent), Some(action), depth)
    }

    fn create(
        state: S,
        parent: Option<NodeId>,
        action: Option<S::ActionType>,
        depth: u32,
    ) -> Node<S> {
        let terminal = state.outcome();
        let untried = if terminal.is_some() {
            Vec::new()
        } else {
            state.permitted_actions()
        };
        Node {
            to_move: state.next_actor(),
            state,
            parent,
            action,
            depth,
            children: Vec::new(),
            untried,
            visit_count: 0,
            total_reward: 0.0,
            wins: 0,
            draws: 0,
            losses: 0,
            terminal,
        }
    }

    /// Counts one finished rollout through this node.
    pub(crate) fn record(&mut self, outcome: Outcome, root_side: Side) {
        self.visit_count += 1;
        self.total_reward += outcome.reward_for(root_side);
        match outcome.category_for(root_side) {
            Category::Win => self.wins += 1,
            Category::Draw => self.draws += 1,
            Category::Loss => self.losses += 1,
        }
    }

    pub fn state(&self) -> &S {
        &self.state
    }

    pub fn to_move(&self) -> Side {
        self.to_move
    }

    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    /// The action that produced this node, `None` at the root.
    pub fn action(&self) -> Option<S::ActionType> {
        self.action
    }

    pub fn depth(&self) -> u32 {
        self.depth
    }

    pub fn children(&self) -> &[(S::ActionType, NodeId)] {
        &self.children
    }

    pub fn untried(&self) -> &[S::ActionType] {
        &self.untried
    }

    pub fn child(&self, action: S::ActionType) -> Option<NodeId> {
        self.children
            .iter()
            .find(|(child_action, _)| *child_action == action)
            .map(|(_, id)| *id)
    }

    pub fn visit_count(&self) -> u32 {
        self.visit_count
    }

    pub fn total_reward(&self) -> f64 {
        self.total_reward
    }

    pub fn wins(&self) -> u32 {
        self.wins
    }

    pub fn draws(&self) -> u32 {
        self.draws
    }

    pub fn losses(&self) -> u32 {
        self.losses
    }

    pub fn terminal(&self) -> Option<Outcome> {
        self.terminal
    }

    pub fn is_terminal(&self) -> bool {
        self.terminal.is_some()
    }

    /// Average reward, 0 when unvisited.
    pub fn mean_value(&self) -> f64 {
        if self.visit_count == 0 {
            0.0
        } else {
            self.total_reward / self.visit_count as f64
        }
    }

    pub fn fully_expanded(&self) -> bool {
        self.untried.is_empty()
    }

    /// Selection keeps descending only through nodes where this holds.
    pub fn selectable(&self) -> bool {
        !self.is_terminal() && self.fully_expanded() && !self.children.is_empty()
    }
}
