//! Board evaluators used as environment rewards.
//!
//! An evaluator scores a board from one player's perspective. The environment
//! calls it after every step with `end_game` set once the game has finished.

use crate::board::{Board, Player};
use crate::constants::{MAX_END_GAME_SCORE, NEIGHBOR_DIRECTIONS, SCORE_WEIGHTS};

/// Scores a board for `from_player`.
pub trait Evaluator: Send {
    fn evaluate(&self, board: &Board, from_player: Player, end_game: bool) -> f64;
}

/// Always scores zero. Useful for driving the environment without rewards.
#[derive(Debug, Default, Clone, Copy)]
pub struct DummyEvaluator;

impl Evaluator for DummyEvaluator {
    fn evaluate(&self, _board: &Board, _from_player: Player, _end_game: bool) -> f64 {
        0.0
    }
}

/// Scores 1 at the end of a game and 0 otherwise.
#[derive(Debug, Default, Clone, Copy)]
pub struct SparseEvaluator;

impl Evaluator for SparseEvaluator {
    fn evaluate(&self, _board: &Board, _from_player: Player, end_game: bool) -> f64 {
        if end_game { 1.0 } else { 0.0 }
    }
}

/// Scores the board area at the end of a game and 0 otherwise.
#[derive(Debug, Default, Clone, Copy)]
pub struct AreaEvaluator;

impl Evaluator for AreaEvaluator {
    fn evaluate(&self, board: &Board, _from_player: Player, end_game: bool) -> f64 {
        if end_game { board.area() as f64 } else { 0.0 }
    }
}

/// Chain-based positional heuristic.
///
/// Every empty cell looks along the eight directions for the run of stones
/// that starts at its neighbor. A run is worth `open_ends * SCORE_WEIGHTS[len]`,
/// where an end is open when the cell behind the origin, or the cell just past
/// the run, is an empty on-board cell. The cell takes the strongest run,
/// positive if `from_player` owns it and negative otherwise, and the board
/// score is the sum over all empty cells.
#[derive(Debug, Default, Clone, Copy)]
pub struct HeuristicEvaluator;

impl HeuristicEvaluator {
    pub fn new() -> Self {
        Self
    }

    /// Per-cell values, indexed by action. Occupied cells are 0.
    pub fn value_table(&self, board: &Board, from_player: Player) -> Vec<i64> {
        let (width, height) = board.size();
        let mut table = vec![0i64; width * height];
        for x in 0..width {
            for y in 0..height {
                if board.get_signed(x as isize, y as isize).is_none() {
                    table[x * height + y] = cell_value(board, x as isize, y as isize, from_player);
                }
            }
        }
        table
    }

    /// Mid-game score: the sum of the value table.
    pub fn score(&self, board: &Board, from_player: Player) -> i64 {
        self.value_table(board, from_player).iter().sum()
    }
}

impl Evaluator for HeuristicEvaluator {
    fn evaluate(&self, board: &Board, from_player: Player, end_game: bool) -> f64 {
        if end_game {
            return MAX_END_GAME_SCORE as f64;
        }
        self.score(board, from_player) as f64
    }
}

/// Strongest run seen from an empty cell, signed for `from_player`.
fn cell_value(board: &Board, x: isize, y: isize, from_player: Player) -> i64 {
    let mut best: Option<(i64, Option<Player>)> = None;
    for &(dx, dy) in &NEIGHBOR_DIRECTIONS {
        let chain = chain_value(board, x, y, dx, dy);
        // Ties keep the earliest direction
        if best.is_none_or(|(v, _)| chain.0 > v) {
            best = Some(chain);
        }
    }
    match best {
        Some((value, owner)) if owner == Some(from_player) => value,
        Some((value, _)) => -value,
        None => 0,
    }
}

/// Value and owner of the run starting next to `(x, y)` in direction `(dx, dy)`.
fn chain_value(board: &Board, x: isize, y: isize, dx: isize, dy: isize) -> (i64, Option<Player>) {
    let mut open_ends = 0;
    if board.contains(x - dx, y - dy) && board.get_signed(x - dx, y - dy).is_none() {
        open_ends += 1;
    }

    let mut owner: Option<Player> = None;
    let mut length = 0usize;
    let (mut cx, mut cy) = (x, y);
    loop {
        cx += dx;
        cy += dy;
        if !board.contains(cx, cy) {
            break;
        }
        let Some(stone) = board.get_signed(cx, cy) else {
            open_ends += 1;
            break;
        };
        match owner {
            None => owner = Some(stone),
            Some(o) if o != stone => break,
            Some(_) => {}
        }
        length += 1;
    }

    let weight = SCORE_WEIGHTS[length.min(SCORE_WEIGHTS.len() - 1)];
    (open_ends * weight, owner)
}
