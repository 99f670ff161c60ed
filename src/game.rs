//! Game rules: turn order, move history, and win detection.
//!
//! A game must be started with [`Game::reset`] before moves are accepted.
//! Each accepted move is appended to the [`GameData`] record, which can be
//! stored as JSON and replayed later.

use std::fmt;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::board::{Board, GridPosition, Move, Player};
use crate::constants::{DEFAULT_BOARD_SIZE, LINE_DIRECTIONS, WIN_LENGTH};
use crate::error::{GomokuError, Result};

/// Opening rule.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum StartingRule {
    #[default]
    Basic,
    Swap,
    Swap2,
}

impl fmt::Display for StartingRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StartingRule::Basic => write!(f, "Basic"),
            StartingRule::Swap => write!(f, "Swap"),
            StartingRule::Swap2 => write!(f, "Swap2"),
        }
    }
}

/// Serializable record of a game.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameData {
    pub moves: Vec<Move>,
    pub winner: Option<Player>,
    pub winning_move: Option<Move>,
}

impl GameData {
    /// Write the record as JSON.
    pub fn store(&self, path: impl AsRef<Path>) -> Result<()> {
        let json = serde_json::to_string(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }

    /// Read a record previously written by [`GameData::store`].
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&text)?)
    }
}

/// A Gomoku game in progress.
#[derive(Clone, Debug)]
pub struct Game {
    starting_rule: StartingRule,
    board: Board,
    data: GameData,
    current_player: Player,
    initialised: bool,
}

impl Default for Game {
    fn default() -> Self {
        Self::new(StartingRule::Basic)
    }
}

impl Game {
    /// Create a game on the default 15x15 board.
    pub fn new(starting_rule: StartingRule) -> Self {
        Self::with_size(DEFAULT_BOARD_SIZE, DEFAULT_BOARD_SIZE, starting_rule)
    }

    pub fn with_size(width: usize, height: usize, starting_rule: StartingRule) -> Self {
        Self {
            starting_rule,
            board: Board::with_size(width, height),
            data: GameData::default(),
            current_player: Player::Black,
            initialised: false,
        }
    }

    pub fn board(&self) -> &Board {
        &self.board
    }

    pub fn data(&self) -> &GameData {
        &self.data
    }

    pub fn current_player(&self) -> Player {
        self.current_player
    }

    pub fn starting_rule(&self) -> StartingRule {
        self.starting_rule
    }

    pub fn is_initialised(&self) -> bool {
        self.initialised
    }

    pub fn winner(&self) -> Option<Player> {
        self.data.winner
    }

    pub fn last_move(&self) -> Option<&Move> {
        self.data.moves.last()
    }

    /// No winner and no empty cell left.
    pub fn is_draw(&self) -> bool {
        self.data.winner.is_none() && self.board.is_full()
    }

    pub fn is_over(&self) -> bool {
        self.data.winner.is_some() || self.board.is_full()
    }

    /// Start a fresh game with Black to move.
    pub fn reset(&mut self) -> Result<()> {
        match self.starting_rule {
            StartingRule::Basic => {}
            rule => return Err(GomokuError::UnsupportedRule(rule.to_string())),
        }
        let (width, height) = self.board.size();
        self.board = Board::with_size(width, height);
        self.data = GameData::default();
        self.current_player = Player::Black;
        self.initialised = true;
        debug!(width, height, rule = %self.starting_rule, "game reset");
        Ok(())
    }

    /// Start a fresh game and play the opening move.
    pub fn reset_with(&mut self, initial_move: Move) -> Result<()> {
        self.reset()?;
        self.make_move(initial_move)?;
        Ok(())
    }

    /// Play a move for the player to move.
    ///
    /// Returns `true` when this move wins the game.
    pub fn make_move(&mut self, mv: Move) -> Result<bool> {
        if !self.initialised {
            return Err(GomokuError::GameNotStarted);
        }
        if self.data.winner.is_some() {
            return Err(GomokuError::GameOver);
        }
        if mv.player != self.current_player {
            return Err(GomokuError::InvalidInput(format!(
                "{} cannot move, it is {}'s turn",
                mv.player, self.current_player
            )));
        }

        self.board.make_move(&mv)?;
        self.data.moves.push(mv);
        if self.check_winner() {
            self.data.winner = Some(mv.player);
            self.data.winning_move = Some(mv);
        }
        self.current_player = self.current_player.opponent();
        Ok(self.data.winner.is_some())
    }

    /// Play a stone for the player to move at a flat action index.
    pub fn play_action(&mut self, action: usize) -> Result<bool> {
        let size = self.board.size();
        if action >= self.board.area() {
            return Err(GomokuError::InvalidAction {
                action,
                size: self.board.area(),
            });
        }
        let mv = Move::new(self.current_player, GridPosition::from_action(action, size));
        self.make_move(mv)
    }

    /// Whether the last move completed a line of at least five stones.
    pub fn check_winner(&self) -> bool {
        self.data
            .moves
            .last()
            .is_some_and(|last| self.completes_line(last))
    }

    /// Whether a placed stone is part of a line of at least five.
    fn completes_line(&self, mv: &Move) -> bool {
        LINE_DIRECTIONS
            .iter()
            .any(|&d| self.count_consecutive(mv, d) >= WIN_LENGTH)
    }

    /// Count stones of the mover's color through the move along one line.
    fn count_consecutive(&self, mv: &Move, (dx, dy): (isize, isize)) -> usize {
        let x = mv.position.x as isize;
        let y = mv.position.y as isize;
        let mut count = 1;
        for sign in [1, -1] {
            for i in 1..WIN_LENGTH as isize {
                let nx = x + sign * i * dx;
                let ny = y + sign * i * dy;
                if self.board.get_signed(nx, ny) == Some(mv.player) {
                    count += 1;
                } else {
                    break;
                }
            }
        }
        count
    }

    /// Rebuild a game from a record on a default-size board.
    pub fn replay(data: GameData) -> Result<Self> {
        Self::replay_sized(data, DEFAULT_BOARD_SIZE, DEFAULT_BOARD_SIZE)
    }

    /// Rebuild a game from a record.
    ///
    /// Moves are placed without turn checks; the player to move is the
    /// opponent of the last mover, or Black for an empty record. A record
    /// without a winner gets one when its stones already hold a line of five.
    pub fn replay_sized(mut data: GameData, width: usize, height: usize) -> Result<Self> {
        let mut game = Self::with_size(width, height, StartingRule::Basic);
        for mv in &data.moves {
            game.board.make_move(mv)?;
        }
        if data.winner.is_none() {
            if let Some(mv) = data.moves.iter().find(|mv| game.completes_line(mv)).copied() {
                debug!(winner = %mv.player, "replayed record already holds five in a row");
                data.winner = Some(mv.player);
                data.winning_move = Some(mv);
            }
        }
        game.current_player = data
            .moves
            .last()
            .map(|m| m.player.opponent())
            .unwrap_or(Player::Black);
        game.data = data;
        game.initialised = true;
        Ok(game)
    }

    /// Load a JSON record and replay it.
    pub fn replay_file(path: impl AsRef<Path>) -> Result<Self> {
        Self::replay(GameData::load(path)?)
    }

    /// Write the move record as JSON.
    pub fn store_game_data(&self, path: impl AsRef<Path>) -> Result<()> {
        self.data.store(path)
    }

    /// Text rendering of the current board.
    pub fn display_board(&self) -> String {
        self.board.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn started_game() -> (Game, Move) {
        let mut game = Game::default();
        let initial = Move::at(Player::Black, 0, 0);
        game.reset_with(initial).unwrap();
        (game, initial)
    }

    #[test]
    fn test_initialise_game() {
        let (game, initial) = started_game();
        assert_eq!(game.winner(), None);
        assert_eq!(game.data().moves, vec![initial]);
        assert_eq!(game.board().size(), (15, 15));
        assert_eq!(game.current_player(), Player::White);
    }

    #[test]
    fn test_move_before_reset_fails() {
        let mut game = Game::default();
        let err = game.make_move(Move::at(Player::Black, 0, 0)).unwrap_err();
        assert!(matches!(err, GomokuError::GameNotStarted));
    }

    #[test]
    fn test_wrong_player_rejected() {
        let (mut game, _) = started_game();
        let err = game.make_move(Move::at(Player::Black, 3, 3)).unwrap_err();
        assert!(matches!(err, GomokuError::InvalidInput(_)));
        assert_eq!(game.data().moves.len(), 1);
    }

    #[test]
    fn test_vertical_win() {
        let (mut game, _) = started_game();
        let script = [
            (Player::White, 0, 1),
            (Player::Black, 1, 0),
            (Player::White, 0, 2),
            (Player::Black, 2, 0),
            (Player::White, 0, 3),
            (Player::Black, 3, 0),
            (Player::White, 0, 4),
        ];
        for (p, x, y) in script {
            assert!(!game.make_move(Move::at(p, x, y)).unwrap());
        }
        let winning = Move::at(Player::Black, 4, 0);
        assert!(game.make_move(winning).unwrap());
        assert_eq!(game.winner(), Some(Player::Black));
        assert_eq!(game.data().winning_move, Some(winning));

        let err = game.make_move(Move::at(Player::White, 9, 9)).unwrap_err();
        assert!(matches!(err, GomokuError::GameOver));
    }

    #[test]
    fn test_diagonal_win_filled_from_middle() {
        let mut game = Game::default();
        game.reset().unwrap();
        // Black builds (2,2) (3,3) (5,5) (6,6) then closes the gap at (4,4)
        let black = [(2, 2), (3, 3), (5, 5), (6, 6), (4, 4)];
        let white = [(0, 10), (1, 10), (2, 10), (3, 10)];
        for i in 0..black.len() {
            let (x, y) = black[i];
            let won = game.make_move(Move::at(Player::Black, x, y)).unwrap();
            if i < white.len() {
                assert!(!won);
                let (wx, wy) = white[i];
                game.make_move(Move::at(Player::White, wx, wy)).unwrap();
            } else {
                assert!(won);
            }
        }
        assert_eq!(game.winner(), Some(Player::Black));
    }

    #[test]
    fn test_anti_diagonal_win() {
        let mut game = Game::default();
        game.reset().unwrap();
        let black = [(10, 0), (9, 1), (8, 2), (7, 3), (6, 4)];
        let white = [(0, 0), (0, 1), (0, 2), (0, 3)];
        for i in 0..black.len() {
            let (x, y) = black[i];
            game.make_move(Move::at(Player::Black, x, y)).unwrap();
            if i < white.len() {
                let (wx, wy) = white[i];
                game.make_move(Move::at(Player::White, wx, wy)).unwrap();
            }
        }
        assert_eq!(game.winner(), Some(Player::Black));
    }

    #[test]
    fn test_four_is_not_a_win() {
        let mut game = Game::default();
        game.reset().unwrap();
        for i in 0..4 {
            assert!(!game.make_move(Move::at(Player::Black, 7, i)).unwrap());
            assert!(!game.make_move(Move::at(Player::White, 8, i + 5)).unwrap());
        }
        assert!(!game.check_winner());
        assert_eq!(game.winner(), None);
    }

    #[test]
    fn test_overline_wins() {
        let mut game = Game::default();
        game.reset().unwrap();
        // Black holds (0,0..2) and (0,4..5); closing (0,3) makes six
        let black = [(0, 0), (0, 1), (0, 2), (0, 4), (0, 5)];
        for (i, &(x, y)) in black.iter().enumerate() {
            assert!(!game.make_move(Move::at(Player::Black, x, y)).unwrap());
            game.make_move(Move::at(Player::White, 5, 2 * i)).unwrap();
        }
        assert!(game.make_move(Move::at(Player::Black, 0, 3)).unwrap());
        assert_eq!(game.winner(), Some(Player::Black));
        assert_eq!(game.data().winning_move, Some(Move::at(Player::Black, 0, 3)));
    }

    #[test]
    fn test_swap_rules_unsupported() {
        let mut game = Game::new(StartingRule::Swap2);
        let err = game.reset().unwrap_err();
        assert!(matches!(err, GomokuError::UnsupportedRule(ref r) if r == "Swap2"));
        assert!(!game.is_initialised());
    }

    #[test]
    fn test_draw_on_full_board() {
        let mut game = Game::with_size(2, 2, StartingRule::Basic);
        game.reset().unwrap();
        for action in 0..4 {
            game.play_action(action).unwrap();
        }
        assert!(game.is_draw());
        assert!(game.is_over());
    }

    #[test]
    fn test_play_action_out_of_range() {
        let mut game = Game::default();
        game.reset().unwrap();
        let err = game.play_action(225).unwrap_err();
        assert!(matches!(err, GomokuError::InvalidAction { action: 225, size: 225 }));
    }

    #[test]
    fn test_replay_sets_player_to_move() {
        let (mut game, _) = started_game();
        game.make_move(Move::at(Player::White, 1, 1)).unwrap();
        let replayed = Game::replay(game.data().clone()).unwrap();
        assert_eq!(replayed.current_player(), Player::Black);
        assert_eq!(replayed.board(), game.board());

        let empty = Game::replay(GameData::default()).unwrap();
        assert_eq!(empty.current_player(), Player::Black);
    }

    #[test]
    fn test_replay_finds_existing_five() {
        // A record with five in a row already on the board but no winner set
        let mut moves: Vec<Move> = (0..5).map(|y| Move::at(Player::White, 0, y)).collect();
        moves.extend((0..4).map(|y| Move::at(Player::Black, 3, y)));
        let data = GameData {
            moves,
            ..GameData::default()
        };
        let mut game = Game::replay_sized(data, 9, 9).unwrap();
        assert_eq!(game.winner(), Some(Player::White));
        assert_eq!(game.data().winning_move, Some(Move::at(Player::White, 0, 0)));
        assert!(game.is_over());
        let err = game.make_move(Move::at(Player::White, 5, 5)).unwrap_err();
        assert!(matches!(err, GomokuError::GameOver));
    }
}
