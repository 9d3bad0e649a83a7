use super::error::GameError;
use serde::{Deserialize, Serialize};
use std::fmt::{Debug, Display};
use std::hash::Hash;

///
/// One of the two players of an alternating game.
///
/// `First` is rendered as `X` and `Second` as `O`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Side {
    First,
    Second,
}

impl Side {
    pub fn other(self) -> Side {
        match self {
            Side::First => Side::Second,
            Side::Second => Side::First,
        }
    }

    pub fn mark(self) -> char {
        match self {
            Side::First => 'X',
            Side::Second => 'O',
        }
    }
}

impl Display for Side {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.mark())
    }
}

/// How a finished game ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Outcome {
    Winner(Side),
    Draw,
}

/// An outcome judged from one side's point of view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Category {
    Win,
    Draw,
    Loss,
}

impl Outcome {
    pub fn category_for(self, side: Side) -> Category {
        match self {
            Outcome::Winner(winner) if winner == side => Category::Win,
            Outcome::Winner(_) => Category::Loss,
            Outcome::Draw => Category::Draw,
        }
    }

    /// Win = 1, draw = 0.5, loss = 0.
    pub fn reward_for(self, side: Side) -> f64 {
        match self.category_for(side) {
            Category::Win => 1.0,
            Category::Draw => 0.5,
            Category::Loss => 0.0,
        }
    }
}

pub trait Action: Debug + Display + Clone + Copy + Eq + Ord + Hash + Serialize {
    type StateType: State<ActionType = Self>;

    /// Applies the action for whichever side is to move in `state`.
    fn execute(&self, state: &Self::StateType) -> Result<Self::StateType, GameError> {
        state.apply(*self, state.next_actor())
    }
}

///
/// A finite, fully observable, two player alternating game position.
///
/// Implementations must be pure: `outcome` and `permitted_actions` depend on the
/// position alone, never on how it was reached.
pub trait State: Clone + Debug {
    type ActionType: Action<StateType = Self>;

    /// Legal actions in ascending order. Empty once the game is over.
    fn permitted_actions(&self) -> Vec<Self::ActionType>;

    fn next_actor(&self) -> Side;

    /// `None` while the game is still being played.
    fn outcome(&self) -> Option<Outcome>;

    /// Produces the successor position. Fails on occupied or unknown cells and
    /// when `side` is not the side to move.
    fn apply(&self, action: Self::ActionType, side: Side) -> Result<Self, GameError>;

    fn terminal(&self) -> bool {
        self.outcome().is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reward_is_fixed_per_perspective() {
        let x_wins = Outcome::Winner(Side::First);
        assert_eq!(x_wins.reward_for(Side::First), 1.0);
        assert_eq!(x_wins.reward_for(Side::Second), 0.0);
        assert_eq!(Outcome::Draw.reward_for(Side::First), 0.5);
        assert_eq!(Outcome::Draw.reward_for(Side::Second), 0.5);
    }

    #[test]
    fn test_category() {
        let o_wins = Outcome::Winner(Side::Second);
        assert_eq!(o_wins.category_for(Side::Second), Category::Win);
        assert_eq!(o_wins.category_for(Side::First), Category::Loss);
        assert_eq!(Outcome::Draw.category_for(Side::First), Category::Draw);
    }

    #[test]
    fn test_side_other() {
        assert_eq!(Side::First.other(), Side::Second);
        assert_eq!(Side::Second.other().other(), Side::Second);
        assert_eq!(Side::First.to_string(), "X");
    }
}
