//! Gomoku board representation.
//!
//! Cells are addressed by [`GridPosition`] `(x, y)` with `x < width` and
//! `y < height`. The flat action index used by the environment and the search
//! is `x * height + y`, so row `x` of the rendering is a contiguous slice of
//! the action space.

use std::fmt;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::constants::DEFAULT_BOARD_SIZE;
use crate::error::{GomokuError, Result};

/// A player (stone color). Black moves first.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Player {
    #[serde(rename = "B")]
    Black,
    #[serde(rename = "W")]
    White,
}

impl Player {
    pub fn opponent(self) -> Player {
        match self {
            Player::Black => Player::White,
            Player::White => Player::Black,
        }
    }

    /// Single-letter symbol used in renderings and game records.
    pub fn symbol(self) -> char {
        match self {
            Player::Black => 'B',
            Player::White => 'W',
        }
    }
}

impl fmt::Display for Player {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Player::Black => write!(f, "Black"),
            Player::White => write!(f, "White"),
        }
    }
}

/// A point on the board. Serialized as a two-element array `[x, y]`.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "(usize, usize)", into = "(usize, usize)")]
pub struct GridPosition {
    pub x: usize,
    pub y: usize,
}

impl GridPosition {
    pub fn new(x: usize, y: usize) -> Self {
        Self { x, y }
    }

    /// Decode a flat action index for a board of the given `(width, height)`.
    pub fn from_action(action: usize, size: (usize, usize)) -> Self {
        let (_, height) = size;
        Self {
            x: action / height,
            y: action % height,
        }
    }

    /// Encode this position as a flat action index.
    pub fn to_action(self, size: (usize, usize)) -> usize {
        let (_, height) = size;
        self.x * height + self.y
    }
}

impl From<(usize, usize)> for GridPosition {
    fn from((x, y): (usize, usize)) -> Self {
        Self { x, y }
    }
}

impl From<GridPosition> for (usize, usize) {
    fn from(pos: GridPosition) -> Self {
        (pos.x, pos.y)
    }
}

/// A stone placed by `player` at `position`.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Move {
    pub player: Player,
    pub position: GridPosition,
}

impl Move {
    pub fn new(player: Player, position: GridPosition) -> Self {
        Self { player, position }
    }

    pub fn at(player: Player, x: usize, y: usize) -> Self {
        Self::new(player, GridPosition::new(x, y))
    }
}

/// A rectangular Gomoku board.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Board {
    width: usize,
    height: usize,
    cells: Vec<Option<Player>>,
}

impl Default for Board {
    fn default() -> Self {
        Self::new(DEFAULT_BOARD_SIZE)
    }
}

impl Board {
    /// Create an empty square board.
    pub fn new(size: usize) -> Self {
        Self::with_size(size, size)
    }

    /// Create an empty `width` x `height` board.
    pub fn with_size(width: usize, height: usize) -> Self {
        Self {
            width,
            height,
            cells: vec![None; width * height],
        }
    }

    /// Board dimensions as `(width, height)`.
    pub fn size(&self) -> (usize, usize) {
        (self.width, self.height)
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    /// Number of cells, which is also the size of the action space.
    pub fn area(&self) -> usize {
        self.width * self.height
    }

    #[inline]
    fn idx(&self, x: usize, y: usize) -> usize {
        x * self.height + y
    }

    /// Whether signed coordinates fall inside the board.
    #[inline]
    pub fn contains(&self, x: isize, y: isize) -> bool {
        x >= 0 && y >= 0 && (x as usize) < self.width && (y as usize) < self.height
    }

    /// Owner of the cell at `pos`, or `None` when empty or off the board.
    pub fn get(&self, pos: GridPosition) -> Option<Player> {
        if pos.x >= self.width || pos.y >= self.height {
            return None;
        }
        self.cells[self.idx(pos.x, pos.y)]
    }

    /// Owner of the cell at signed coordinates, `None` when empty or off the board.
    #[inline]
    pub fn get_signed(&self, x: isize, y: isize) -> Option<Player> {
        if !self.contains(x, y) {
            return None;
        }
        self.cells[self.idx(x as usize, y as usize)]
    }

    /// Check that a move targets an empty cell on the board.
    pub fn check_valid_move(&self, mv: &Move) -> Result<()> {
        let GridPosition { x, y } = mv.position;
        if x >= self.width || y >= self.height {
            return Err(GomokuError::OutOfBounds {
                x,
                y,
                width: self.width,
                height: self.height,
            });
        }
        if self.cells[self.idx(x, y)].is_some() {
            return Err(GomokuError::Occupied { x, y });
        }
        Ok(())
    }

    /// Place a stone. The board is left unchanged if the move is invalid.
    pub fn make_move(&mut self, mv: &Move) -> Result<()> {
        self.check_valid_move(mv)?;
        let i = self.idx(mv.position.x, mv.position.y);
        self.cells[i] = Some(mv.player);
        Ok(())
    }

    /// All empty positions, in action order.
    pub fn available_positions(&self) -> Vec<GridPosition> {
        self.cells
            .iter()
            .enumerate()
            .filter(|(_, c)| c.is_none())
            .map(|(i, _)| GridPosition::from_action(i, self.size()))
            .collect()
    }

    /// `true` for every empty cell, indexed by action.
    pub fn available_mask(&self) -> Vec<bool> {
        self.cells.iter().map(Option::is_none).collect()
    }

    /// Flat indices of all empty cells.
    pub fn valid_actions(&self) -> Vec<usize> {
        self.cells
            .iter()
            .enumerate()
            .filter_map(|(i, c)| c.is_none().then_some(i))
            .collect()
    }

    pub fn stone_count(&self) -> usize {
        self.cells.iter().filter(|c| c.is_some()).count()
    }

    pub fn is_full(&self) -> bool {
        self.cells.iter().all(Option::is_some)
    }

    /// Board state as a flat vector indexed by action: 0 empty, 1 black, 2 white.
    pub fn observation(&self) -> Vec<i8> {
        self.cells
            .iter()
            .map(|c| match c {
                None => 0,
                Some(Player::Black) => 1,
                Some(Player::White) => 2,
            })
            .collect()
    }

    /// Write the text rendering of the board to a file.
    pub fn store_board(&self, path: impl AsRef<Path>) -> Result<()> {
        std::fs::write(path, self.to_string())?;
        Ok(())
    }
}

impl fmt::Display for Board {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rule = "=".repeat((self.height + 2) * 4);
        let mut header = String::from("   ");
        for y in 0..self.height {
            header.push_str(&format!(" {y:2} "));
        }

        writeln!(f, "{header}")?;
        writeln!(f, "{rule}")?;
        for x in 0..self.width {
            let row: Vec<String> = (0..self.height)
                .map(|y| match self.cells[self.idx(x, y)] {
                    Some(p) => p.symbol().to_string(),
                    None => " ".to_string(),
                })
                .collect();
            writeln!(f, "{x:2} | {} | {x:2}", row.join(" | "))?;
            writeln!(f, "{rule}")?;
        }
        write!(f, "{header}")
    }
}
