use crate::uct::{Action, GameError, State};
use std::io::BufRead;

pub trait Game {
    type StateType: State<ActionType = Self::ActionType>;
    type ActionType: Action<StateType = Self::StateType>;

    /// Reads one move for the side to move from `input`.
    fn get_human_turn(
        &self,
        state: &Self::StateType,
        input: &mut dyn BufRead,
    ) -> Result<Self::ActionType, GameError>;

    fn init_game(&self) -> Self::StateType;

    fn visualise_state(&self, state: &Self::StateType);
}
