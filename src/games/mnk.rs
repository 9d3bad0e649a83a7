//! Tic-tac-toe style games: a `width` x `height` board where `k` marks in a row
//! win.

use std::fmt;
use std::io::BufRead;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::game::Game;
use crate::uct::{Action, GameError, Outcome, Side, State};

pub const MAX_DIMENSION: u8 = 16;

#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Serialize, Deserialize)]
pub enum MnkAction {
    /// Mark the cell with this row-major index.
    Place(u8),
}

impl MnkAction {
    pub fn cell(self) -> usize {
        match self {
            MnkAction::Place(cell) => cell as usize,
        }
    }
}

impl fmt::Display for MnkAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.cell())
    }
}

impl Action for MnkAction {
    type StateType = MnkState;
}

#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug)]
pub enum Cell {
    Empty,
    Marked(Side),
}

///
/// A position. The side to move is derived from the marks: whoever has fewer
/// moves next, and `first` moves when the counts are equal.
///
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct MnkState {
    width: u8,
    height: u8,
    k: u8,
    cells: Vec<Cell>,
    first: Side,
    outcome: Option<Outcome>,
}

fn check_dimensions(width: u8, height: u8, k: u8) -> Result<(), GameError> {
    if width == 0 || height == 0 || width > MAX_DIMENSION || height > MAX_DIMENSION {
        return Err(GameError::Parse(format!(
            "board must be between 1x1 and {0}x{0}, got {1}x{2}",
            MAX_DIMENSION, width, height
        )));
    }
    if k == 0 || k > width.max(height) {
        return Err(GameError::Parse(format!(
            "{} in a row cannot fit on a {}x{} board",
            k, width, height
        )));
    }
    Ok(())
}

impl MnkState {
    pub fn new(width: u8, height: u8, k: u8) -> Result<MnkState, GameError> {
        check_dimensions(width, height, k)?;
        Ok(Self::empty(width, height, k))
    }

    fn empty(width: u8, height: u8, k: u8) -> MnkState {
        MnkState {
            width,
            height,
            k,
            cells: vec![Cell::Empty; width as usize * height as usize],
            first: Side::First,
            outcome: None,
        }
    }

    pub fn tic_tac_toe() -> MnkState {
        Self::empty(3, 3, 3)
    }

    /// Builds a position from row-major cells. Mark counts may differ by at most one.
    pub fn from_cells(
        width: u8,
        height: u8,
        k: u8,
        cells: Vec<Cell>,
        first: Side,
    ) -> Result<MnkState, GameError> {
        check_dimensions(width, height, k)?;
        if cells.len() != width as usize * height as usize {
            return Err(GameError::Parse(format!(
                "expected {} cells, got {}",
                width as usize * height as usize,
                cells.len()
            )));
        }
        let count = |side| cells.iter().filter(|c| **c == Cell::Marked(side)).count();
        let (firsts, seconds) = (count(Side::First), count(Side::Second));
        if firsts.abs_diff(seconds) > 1 {
            return Err(GameError::Parse(format!(
                "{} X marks and {} O marks cannot arise from alternating play",
                firsts, seconds
            )));
        }
        let outcome = decide(&cells, width, height, k);
        Ok(MnkState {
            width,
            height,
            k,
            cells,
            first,
            outcome,
        })
    }

    pub fn with_first(mut self, first: Side) -> MnkState {
        self.first = first;
        self
    }

    pub fn width(&self) -> u8 {
        self.width
    }

    pub fn height(&self) -> u8 {
        self.height
    }

    pub fn k(&self) -> u8 {
        self.k
    }

    pub fn cells(&self) -> &[Cell] {
        &self.cells
    }

    pub fn cell(&self, index: usize) -> Option<Cell> {
        self.cells.get(index).copied()
    }

    pub fn empty_cells(&self) -> usize {
        self.cells.iter().filter(|c| **c == Cell::Empty).count()
    }

    /// Rows joined by `/`, e.g. `XO_/_X_/O__`.
    pub fn compact(&self) -> String {
        self.rows()
            .map(|row| row.iter().map(|c| cell_char(*c)).collect::<String>())
            .collect::<Vec<_>>()
            .join("/")
    }

    fn rows(&self) -> impl Iterator<Item = &[Cell]> {
        self.cells.chunks(self.width as usize)
    }
}

fn cell_char(cell: Cell) -> char {
    match cell {
        Cell::Empty => '_',
        Cell::Marked(side) => side.mark(),
    }
}

/// Winner from marks alone; a full board without one is a draw.
fn decide(cells: &[Cell], width: u8, height: u8, k: u8) -> Option<Outcome> {
    if let Some(side) = winner(cells, width as i32, height as i32, k as i32) {
        return Some(Outcome::Winner(side));
    }
    if cells.iter().all(|&cell| cell != Cell::Empty) {
        return Some(Outcome::Draw);
    }
    None
}

fn winner(cells: &[Cell], width: i32, height: i32, k: i32) -> Option<Side> {
    // Horizontal, vertical, \ and /
    const DIRECTIONS: [(i32, i32); 4] = [(1, 0), (0, 1), (1, 1), (1, -1)];
    for row in 0..height {
        for column in 0..width {
            let side = match cells[(row * width + column) as usize] {
                Cell::Marked(side) => side,
                Cell::Empty => continue,
            };
            for (dx, dy) in DIRECTIONS {
                let (end_x, end_y) = (column + dx * (k - 1), row + dy * (k - 1));
                if end_x < 0 || end_x >= width || end_y < 0 || end_y >= height {
                    continue;
                }
                if (1..k).all(|step| {
                    let (x, y) = (column + dx * step, row + dy * step);
                    cells[(y * width + x) as usize] == Cell::Marked(side)
                }) {
                    return Some(side);
                }
            }
        }
    }
    None
}

impl State for MnkState {
    type ActionType = MnkAction;

    fn permitted_actions(&self) -> Vec<MnkAction> {
        if self.outcome.is_some() {
            return Vec::new();
        }
        self.cells
            .iter()
            .enumerate()
            .filter(|(_, cell)| **cell == Cell::Empty)
            .map(|(i, _)| MnkAction::Place(i as u8))
            .collect()
    }

    fn next_actor(&self) -> Side {
        let firsts = self
            .cells
            .iter()
            .filter(|c| **c == Cell::Marked(Side::First))
            .count();
        let seconds = self
            .cells
            .iter()
            .filter(|c| **c == Cell::Marked(Side::Second))
            .count();
        match firsts.cmp(&seconds) {
            std::cmp::Ordering::Less => Side::First,
            std::cmp::Ordering::Greater => Side::Second,
            std::cmp::Ordering::Equal => self.first,
        }
    }

    fn outcome(&self) -> Option<Outcome> {
        self.outcome
    }

    fn apply(&self, action: MnkAction, side: Side) -> Result<MnkState, GameError> {
        if self.outcome.is_some() {
            return Err(GameError::GameOver);
        }
        let cell = action.cell();
        match self.cells.get(cell) {
            None => {
                return Err(GameError::OutOfBounds {
                    cell,
                    cells: self.cells.len(),
                })
            }
            Some(Cell::Marked(_)) => return Err(GameError::Occupied(cell)),
            Some(Cell::Empty) => {}
        }
        let expected = self.next_actor();
        if side != expected {
            return Err(GameError::WrongSide {
                expected,
                attempted: side,
            });
        }
        let mut cells = self.cells.clone();
        cells[cell] = Cell::Marked(side);
        let outcome = decide(&cells, self.width, self.height, self.k);
        Ok(MnkState {
            cells,
            outcome,
            ..self.clone()
        })
    }
}

impl fmt::Display for MnkState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, row) in self.rows().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            for cell in row {
                write!(f, "{}", cell_char(*cell))?;
            }
        }
        Ok(())
    }
}

///
/// Parses rows of `X`, `O` and `_` (or `.`). Rows are separated by whitespace,
/// `/` or `|`; commas are ignored. A single row whose length is a square number
/// is read as a square board. The win length is the shorter side, capped at 4.
///
impl FromStr for MnkState {
    type Err = GameError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut rows: Vec<Vec<Cell>> = Vec::new();
        for chunk in s.split(|c: char| c.is_whitespace() || c == '/' || c == '|') {
            let row = chunk
                .chars()
                .filter(|c| *c != ',')
                .map(|c| match c.to_ascii_uppercase() {
                    'X' => Ok(Cell::Marked(Side::First)),
                    'O' => Ok(Cell::Marked(Side::Second)),
                    '_' | '.' | '-' => Ok(Cell::Empty),
                    other => Err(GameError::Parse(format!("unexpected character {:?}", other))),
                })
                .collect::<Result<Vec<Cell>, GameError>>()?;
            if !row.is_empty() {
                rows.push(row);
            }
        }
        if rows.len() == 1 {
            let cells = rows.remove(0);
            let side = (cells.len() as f64).sqrt().round() as usize;
            if side < 2 || side * side != cells.len() {
                return Err(GameError::Parse(format!(
                    "a single row of {} cells is not a square board",
                    cells.len()
                )));
            }
            rows = cells.chunks(side).map(|row| row.to_vec()).collect();
        }
        let height = rows.len();
        let width = rows.first().map(Vec::len).unwrap_or(0);
        if rows.iter().any(|row| row.len() != width) {
            return Err(GameError::Parse("rows have different lengths".to_string()));
        }
        if width == 0 || width > MAX_DIMENSION as usize || height > MAX_DIMENSION as usize {
            return Err(GameError::Parse(format!(
                "unsupported board size {}x{}",
                width, height
            )));
        }
        let (width, height) = (width as u8, height as u8);
        let k = width.min(height).min(4);
        MnkState::from_cells(width, height, k, rows.concat(), Side::First)
    }
}

/// Starting positions for the binaries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MnkGame {
    pub width: u8,
    pub height: u8,
    pub k: u8,
}

impl MnkGame {
    pub(crate) const fn new(width: u8, height: u8, k: u8) -> MnkGame {
        MnkGame { width, height, k }
    }

    pub fn try_new(width: u8, height: u8, k: u8) -> Result<MnkGame, GameError> {
        check_dimensions(width, height, k)?;
        Ok(Self::new(width, height, k))
    }
}

impl Game for MnkGame {
    type StateType = MnkState;
    type ActionType = MnkAction;

    fn get_human_turn(
        &self,
        state: &MnkState,
        input: &mut dyn BufRead,
    ) -> Result<MnkAction, GameError> {
        let mut line = String::new();
        input
            .read_line(&mut line)
            .map_err(|err| GameError::Parse(err.to_string()))?;
        let cell: u8 = line
            .trim()
            .parse()
            .map_err(|_| GameError::Parse(format!("{:?} is not a cell index", line.trim())))?;
        let action = MnkAction::Place(cell);
        // Reject now rather than when the move is played
        state.apply(action, state.next_actor())?;
        Ok(action)
    }

    fn init_game(&self) -> MnkState {
        MnkState::empty(self.width, self.height, self.k)
    }

    fn visualise_state(&self, state: &MnkState) {
        println!("{}", state);
    }
}
