/// UCT score of a child:
///
/// `Q + c * sqrt(ln(parent_visits + 1) / (child_visits + 1))`
///
/// with `Q = child_reward / child_visits`, or 0 for an unvisited child. The `+ 1`
/// offsets keep unvisited children finite without a visit-each-child-first pass.
/// `child_reward` must be accumulated from the root's to-move perspective.
pub fn uct_score(
    parent_visits: u32,
    child_visits: u32,
    child_reward: f64,
    exploration_constant: f64,
) -> f64 {
    let q = if child_visits > 0 {
        child_reward / child_visits as f64
    } else {
        0.0
    };
    let u = ((parent_visits as f64 + 1.0).ln() / (child_visits as f64 + 1.0)).sqrt();
    q + exploration_constant * u
}
