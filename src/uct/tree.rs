//! Search tree with arena allocation.
//!
//! Nodes live in one `Vec` and refer to each other by `NodeId`; the root is
//! always `NodeId(0)`. A tree is never re-rooted: when the position changes the
//! whole tree is replaced.

use super::game::{Outcome, Side, State};
use super::node::{Node, NodeId};
use log::trace;
use serde::Serialize;

#[derive(Debug, Clone)]
pub struct Tree<S: State> {
    nodes: Vec<Node<S>>,
    root_side: Side,
}

/// Statistics of one expanded root action.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MoveStats<A> {
    pub action: A,
    pub visit_count: u32,
    pub total_reward: f64,
    pub wins: u32,
    pub draws: u32,
    pub losses: u32,
    pub mean_value: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TreeStats {
    pub total_nodes: usize,
    pub root_visits: u32,
    pub root_value: f64,
    pub max_depth: u32,
}

impl<S: State> Tree<S> {
    pub fn new(state: S) -> Tree<S> {
        let root = Node::new_root(state);
        Tree {
            root_side: root.to_move,
            nodes: vec![root],
        }
    }

    #[inline]
    pub fn root(&self) -> NodeId {
        NodeId(0)
    }

    pub fn root_node(&self) -> &Node<S> {
        &self.nodes[0]
    }

    /// The side every reward in this tree is measured for.
    pub fn root_side(&self) -> Side {
        self.root_side
    }

    #[inline]
    pub fn get(&self, id: NodeId) -> &Node<S> {
        &self.nodes[id.index()]
    }

    #[inline]
    pub(crate) fn get_mut(&mut self, id: NodeId) -> &mut Node<S> {
        &mut self.nodes[id.index()]
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn arena(&self) -> &[Node<S>] {
        &self.nodes
    }

    /// Moves `action` from the parent's untried set into a new child holding
    /// `state`. The caller has already applied the action.
    pub(crate) fn add_child(&mut self, parent: NodeId, action: S::ActionType, state: S) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        let depth = self.get(parent).depth + 1;
        self.nodes.push(Node::new_child(state, parent, action, depth));

        let parent_node = self.get_mut(parent);
        parent_node.untried.retain(|untried| *untried != action);
        parent_node.children.push((action, id));
        id
    }

    /// Records `outcome` on `leaf` and every ancestor up to the root, always
    /// from the root side's perspective.
    pub fn backpropagate(&mut self, leaf: NodeId, outcome: Outcome) {
        let root_side = self.root_side;
        let mut current = Some(leaf);
        while let Some(id) = current {
            let node = self.get_mut(id);
            node.record(outcome, root_side);
            current = node.parent;
        }
    }

    /// The root child `id` descends from, `None` for the root itself.
    pub fn root_move_of(&self, id: NodeId) -> Option<S::ActionType> {
        let mut current = id;
        loop {
            let node = self.get(current);
            match node.parent {
                None => return None,
                Some(parent) if parent == self.root() => return node.action,
                Some(parent) => current = parent,
            }
        }
    }

    ///
    /// The robust child: the root action with the most visits.
    ///
    /// Equal visit counts go to the lowest action so the answer never depends
    /// on expansion order.
    pub fn best_action(&self) -> Option<S::ActionType> {
        self.root_node()
            .children
            .iter()
            .map(|(action, id)| (*action, self.get(*id).visit_count))
            .max_by(|(a_action, a_visits), (b_action, b_visits)| {
                a_visits.cmp(b_visits).then_with(|| b_action.cmp(a_action))
            })
            .map(|(action, _)| action)
    }

    /// Per root action statistics, ordered by action.
    pub fn move_stats(&self) -> Vec<MoveStats<S::ActionType>> {
        let mut stats: Vec<MoveStats<S::ActionType>> = self
            .root_node()
            .children
            .iter()
            .map(|(action, id)| {
                let child = self.get(*id);
                MoveStats {
                    action: *action,
                    visit_count: child.visit_count,
                    total_reward: child.total_reward,
                    wins: child.wins,
                    draws: child.draws,
                    losses: child.losses,
                    mean_value: child.mean_value(),
                }
            })
            .collect();
        stats.sort_by(|a, b| a.action.cmp(&b.action));
        stats
    }

    pub fn stats(&self) -> TreeStats {
        let root = self.root_node();
        TreeStats {
            total_nodes: self.nodes.len(),
            root_visits: root.visit_count,
            root_value: root.mean_value(),
            max_depth: self.nodes.iter().map(|node| node.depth).max().unwrap_or(0),
        }
    }

    pub fn trace_log_children(&self) {
        if log::log_enabled!(log::Level::Trace) {
            self.trace_log_node(self.root(), 0);
        }
    }

    fn trace_log_node(&self, id: NodeId, level: usize) {
        for (action, child_id) in self.get(id).children.iter() {
            let child = self.get(*child_id);
            trace!("{} {}", "         |-".repeat(level), action);
            trace!(
                "{} {:.6} {} ({}/{}/{})",
                "         | ".repeat(level),
                child.total_reward,
                child.visit_count,
                child.wins,
                child.draws,
                child.losses
            );
            self.trace_log_node(*child_id, level + 1);
        }
    }
}
