use super::game::Side;
use thiserror::Error;

/// Rejections raised at the game-state boundary.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum GameError {
    #[error("Cell {0} is already occupied")]
    Occupied(usize),

    #[error("Cell {cell} is outside a board of {cells} cells")]
    OutOfBounds { cell: usize, cells: usize },

    #[error("Action {0} is not legal in this position")]
    Illegal(String),

    #[error("The game is already over")]
    GameOver,

    #[error("It is {expected}'s turn, not {attempted}'s")]
    WrongSide { expected: Side, attempted: Side },

    #[error("Invalid board: {0}")]
    Parse(String),
}

/// Parameters that may never reach the iteration algorithm.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("Exploration constant must be finite and non-negative, got {0}")]
    ExplorationConstant(f64),

    #[error("Iteration count must be positive")]
    NoIterations,

    #[error("Animation cadence must be positive")]
    ZeroCadence,

    #[error("Invalid cadence {0:?}: expected a positive integer or \"final\"")]
    UnparsableCadence(String),
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum EngineError {
    #[error("Invalid move: {0}")]
    InvalidMove(#[from] GameError),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(#[from] ConfigError),

    #[error("A run is already in progress; cancel it or wait for it to finish")]
    RunAlreadyActive,
}
