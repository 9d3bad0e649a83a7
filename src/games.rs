pub mod mnk;

pub use mnk::{MnkAction, MnkGame, MnkState};

use clap::ValueEnum;
use serde::Deserialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Deserialize)]
pub enum Games {
    /// 3x3, three in a row
    TicTacToe,
    /// 4x4, four in a row
    FourByFour,
    /// 6x6, four in a row
    SixBySix,
}

impl Games {
    pub fn game(self) -> MnkGame {
        match self {
            Games::TicTacToe => MnkGame::new(3, 3, 3),
            Games::FourByFour => MnkGame::new(4, 4, 4),
            Games::SixBySix => MnkGame::new(6, 6, 4),
        }
    }
}
