//! Error type shared by the engine modules.

use thiserror::Error;

/// Errors produced by the board, game, environment, and search layers.
#[derive(Error, Debug)]
pub enum GomokuError {
    #[error("position ({x}, {y}) is outside the {width}x{height} board")]
    OutOfBounds {
        x: usize,
        y: usize,
        width: usize,
        height: usize,
    },

    #[error("cell ({x}, {y}) is already occupied")]
    Occupied { x: usize, y: usize },

    #[error("game has not been started, call reset() first")]
    GameNotStarted,

    #[error("game is already over")]
    GameOver,

    #[error("invalid action {action}, action space has {size} entries")]
    InvalidAction { action: usize, size: usize },

    #[error("no valid actions left to play")]
    NoValidActions,

    #[error("starting rule {0} is not supported")]
    UnsupportedRule(String),

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result alias for engine operations.
pub type Result<T> = std::result::Result<T, GomokuError>;
