//! Alpha-Gomoku: a Gomoku engine with Monte Carlo Tree Search.
//!
//! ## Modules
//!
//! - [`constants`] - Board dimensions and engine parameters
//! - [`board`] - Board, players, positions, and moves
//! - [`game`] - Turn order, win detection, and game records
//! - [`evaluator`] - Board scoring used as environment reward
//! - [`env`] - Step-based environment over a game
//! - [`mcts`] - Monte Carlo Tree Search with prior-weighted UCB
//! - [`player`] - Random, human, and search-driven players
//! - [`matchplay`] - Games and series between two players
//! - [`experiment`] - Experiment logging sinks
//! - [`protocol`] - Gomocup text protocol for tournament managers
//!
//! ## Example
//!
//! ```
//! use alpha_gomoku::board::{Move, Player};
//! use alpha_gomoku::game::Game;
//! use alpha_gomoku::mcts::{Mcts, MctsConfig};
//!
//! // Create a new game and play the opening move
//! let mut game = Game::default();
//! game.reset_with(Move::at(Player::Black, 7, 7)).unwrap();
//!
//! // Run MCTS to find a response
//! let mut mcts = Mcts::new(MctsConfig::with_simulations(50));
//! let result = mcts.search(&game).unwrap();
//! game.play_action(result.best_action).unwrap();
//! ```

pub mod board;
pub mod constants;
pub mod env;
pub mod error;
pub mod evaluator;
pub mod experiment;
pub mod game;
pub mod matchplay;
pub mod mcts;
pub mod player;
pub mod protocol;

pub use error::{GomokuError, Result};
