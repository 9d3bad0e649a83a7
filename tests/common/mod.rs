use uct_rs::games::MnkState;
use uct_rs::uct::{State, Tree};

pub fn board(s: &str) -> MnkState {
    s.parse().expect("test board should parse")
}

/// Checks the statistics and shape of every node in the arena.
pub fn assert_tree_invariants(tree: &Tree<MnkState>) {
    for (index, node) in tree.arena().iter().enumerate() {
        assert_eq!(
            node.wins() + node.draws() + node.losses(),
            node.visit_count(),
            "node {} outcome counts",
            index
        );
        assert!(node.total_reward() >= 0.0, "node {} reward", index);
        assert!(
            node.total_reward() <= node.visit_count() as f64,
            "node {} reward",
            index
        );

        let mut actions: Vec<_> = node
            .children()
            .iter()
            .map(|(action, _)| *action)
            .chain(node.untried().iter().copied())
            .collect();
        actions.sort();
        assert_eq!(actions, node.state().permitted_actions(), "node {} moves", index);

        let child_visits: u32 = node
            .children()
            .iter()
            .map(|(_, child)| {
                let child_node = tree.get(*child);
                assert_eq!(child_node.parent().map(|p| p.0 as usize), Some(index));
                assert_eq!(child_node.depth(), node.depth() + 1);
                child_node.visit_count()
            })
            .sum();
        if node.parent().is_none() {
            assert_eq!(child_visits, node.visit_count(), "root visits");
        } else if !node.is_terminal() && node.visit_count() > 0 {
            assert_eq!(child_visits + 1, node.visit_count(), "node {} visits", index);
        }
    }
}
