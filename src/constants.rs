//! Constants for board geometry, search parameters, and evaluation weights.
//!
//! Runtime knobs live in [`crate::mcts::MctsConfig`] and
//! [`crate::env::EnvConfig`]; the values here are their defaults.

// =============================================================================
// Board Geometry
// =============================================================================

/// Default board size (NxN). Standard Gomoku is played on 15x15.
pub const DEFAULT_BOARD_SIZE: usize = 15;

/// Number of stones in an unbroken line needed to win.
pub const WIN_LENGTH: usize = 5;

/// Line directions checked for a win: vertical, horizontal, and both diagonals.
pub const LINE_DIRECTIONS: [(isize, isize); 4] = [(1, 0), (0, 1), (1, 1), (1, -1)];

// =============================================================================
// MCTS Parameters
// =============================================================================

/// Default number of simulations per move.
pub const N_SIMULATIONS: usize = 80;

/// Exploration constant for the prior-weighted UCB term.
pub const EXPLORATION_CT: f64 = 1.0;

/// Dirichlet noise concentration at the root.
pub const DIRICHLET_ALPHA: f64 = 0.03;

/// Fraction of root prior replaced by Dirichlet noise.
pub const EXPLORATION_FRACTION: f64 = 0.25;

/// Temperature for visit-count sampling of the final move.
pub const TEMPERATURE: f64 = 1.0;

/// Base exploration constant of the MuZero UCB variant.
pub const MU_CT: f64 = 1.25;

/// Log-correction constant of the MuZero UCB variant.
pub const MU_CT_SECOND: f64 = 19652.0;

// =============================================================================
// Evaluation
// =============================================================================

/// Chain weights indexed by chain length (lengths above 5 use the last entry).
pub const SCORE_WEIGHTS: [i64; 6] = [0, 1, 3, 9, 27, 1000];

/// Score the heuristic evaluator assigns to a finished game.
pub const MAX_END_GAME_SCORE: i64 = 10_000;

/// All eight neighbor directions, in the order the heuristic scans them.
pub const NEIGHBOR_DIRECTIONS: [(isize, isize); 8] = [
    (-1, -1),
    (-1, 0),
    (-1, 1),
    (0, -1),
    (0, 1),
    (1, -1),
    (1, 0),
    (1, 1),
];
