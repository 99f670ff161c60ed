//! Players that choose and play moves in a [`GomokuEnv`].

use std::fmt;
use std::io::{BufRead, Write};

use tracing::{debug, warn};

use crate::env::GomokuEnv;
use crate::error::{GomokuError, Result};
use crate::mcts::{Mcts, MctsConfig};

/// A participant in a match.
pub trait GomokuPlayer {
    fn name(&self) -> &str;

    /// Pick an action for the player to move.
    fn choose_action(&mut self, env: &GomokuEnv) -> Result<usize>;

    /// Choose and play an action. Returns whether the game is done.
    fn play_turn(&mut self, env: &mut GomokuEnv) -> Result<bool> {
        let action = self.choose_action(env)?;
        let step = env.step(action)?;
        Ok(step.done)
    }
}

/// Plays uniformly random legal moves.
pub struct RandomPlayer {
    rng: fastrand::Rng,
}

impl Default for RandomPlayer {
    fn default() -> Self {
        Self::new()
    }
}

impl RandomPlayer {
    pub fn new() -> Self {
        Self {
            rng: fastrand::Rng::new(),
        }
    }

    pub fn with_seed(seed: u64) -> Self {
        Self {
            rng: fastrand::Rng::with_seed(seed),
        }
    }
}

impl GomokuPlayer for RandomPlayer {
    fn name(&self) -> &str {
        "random"
    }

    fn choose_action(&mut self, env: &GomokuEnv) -> Result<usize> {
        let actions = env.valid_actions();
        self.rng
            .choice(actions)
            .ok_or(GomokuError::NoValidActions)
    }
}

/// Plays the move chosen by a tree search.
pub struct MctsPlayer {
    mcts: Mcts,
}

impl MctsPlayer {
    pub fn new(config: MctsConfig) -> Self {
        Self {
            mcts: Mcts::new(config),
        }
    }

    pub fn from_search(mcts: Mcts) -> Self {
        Self { mcts }
    }
}

impl GomokuPlayer for MctsPlayer {
    fn name(&self) -> &str {
        "mcts"
    }

    fn choose_action(&mut self, env: &GomokuEnv) -> Result<usize> {
        let action = self.mcts.choose_action(env.game())?;
        debug!(action, sims = self.mcts.config().num_simulations, "mcts move");
        Ok(action)
    }
}

/// Reads `row,col` moves from a text stream.
///
/// Malformed or illegal input is reported on the output stream and asked
/// for again. End of input is an error.
pub struct HumanPlayer<R, W> {
    input: R,
    output: W,
}

impl<R: BufRead, W: Write> HumanPlayer<R, W> {
    pub fn new(input: R, output: W) -> Self {
        Self { input, output }
    }

    fn parse_move(line: &str, env: &GomokuEnv) -> std::result::Result<usize, String> {
        let (row, col) = line
            .trim()
            .split_once(',')
            .ok_or_else(|| format!("expected 'row,col', got '{}'", line.trim()))?;
        let row: usize = row.trim().parse().map_err(|_| format!("bad row '{}'", row.trim()))?;
        let col: usize = col.trim().parse().map_err(|_| format!("bad column '{}'", col.trim()))?;

        let (width, height) = env.observation_shape();
        if row >= width || col >= height {
            return Err(format!("({row}, {col}) is off the {width}x{height} board"));
        }
        let action = row * height + col;
        if !env.game().board().available_mask()[action] {
            return Err(format!("({row}, {col}) is already occupied"));
        }
        Ok(action)
    }
}

impl<R: BufRead, W: Write> GomokuPlayer for HumanPlayer<R, W> {
    fn name(&self) -> &str {
        "human"
    }

    fn choose_action(&mut self, env: &GomokuEnv) -> Result<usize> {
        loop {
            write!(self.output, "Enter the move to play with coords (row, column): ")?;
            self.output.flush()?;

            let mut line = String::new();
            if self.input.read_line(&mut line)? == 0 {
                return Err(GomokuError::InvalidInput("input closed".to_string()));
            }
            match Self::parse_move(&line, env) {
                Ok(action) => return Ok(action),
                Err(msg) => {
                    warn!(%msg, "rejected human move");
                    writeln!(self.output, "{msg}")?;
                }
            }
        }
    }
}

/// Player types selectable from the command line.
#[derive(Copy, Clone, Debug, PartialEq, Eq, clap::ValueEnum)]
pub enum PlayerKind {
    Random,
    Mcts,
    Human,
}

impl fmt::Display for PlayerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PlayerKind::Random => write!(f, "random"),
            PlayerKind::Mcts => write!(f, "mcts"),
            PlayerKind::Human => write!(f, "human"),
        }
    }
}

impl PlayerKind {
    /// Build a player reading from stdin for the human kind.
    pub fn build(self, config: &MctsConfig, seed: Option<u64>) -> Box<dyn GomokuPlayer> {
        match self {
            PlayerKind::Random => match seed {
                Some(s) => Box::new(RandomPlayer::with_seed(s)),
                None => Box::new(RandomPlayer::new()),
            },
            PlayerKind::Mcts => Box::new(MctsPlayer::new(MctsConfig {
                seed,
                ..config.clone()
            })),
            PlayerKind::Human => Box::new(HumanPlayer::new(
                std::io::BufReader::new(std::io::stdin()),
                std::io::stdout(),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::Player;
    use crate::evaluator::DummyEvaluator;
    use std::io::Cursor;

    fn started_env() -> GomokuEnv {
        let mut env = GomokuEnv::with_evaluator(DummyEvaluator);
        env.reset().unwrap();
        env
    }

    #[test]
    fn test_random_player_plays_valid_moves() {
        let mut env = started_env();
        let mut player = RandomPlayer::with_seed(5);
        for _ in 0..20 {
            player.play_turn(&mut env).unwrap();
        }
        assert_eq!(env.steps(), 20);
        assert_eq!(env.game().board().stone_count(), 20);
    }

    #[test]
    fn test_random_player_without_moves() {
        let mut env = GomokuEnv::new(crate::env::EnvConfig::square(1), Box::new(DummyEvaluator));
        env.reset().unwrap();
        env.step(0).unwrap();
        let mut player = RandomPlayer::with_seed(1);
        assert!(matches!(player.choose_action(&env), Err(GomokuError::NoValidActions)));
    }

    #[test]
    fn test_human_player_retries_bad_input() {
        let mut env = started_env();
        env.step(0).unwrap();
        let input = Cursor::new("nonsense\n20,3\n0,0\n2,3\n");
        let mut output = Vec::new();
        let action = {
            let mut player = HumanPlayer::new(input, &mut output);
            player.choose_action(&env).unwrap()
        };
        assert_eq!(action, 2 * 15 + 3);
        let text = String::from_utf8(output).unwrap();
        assert!(text.contains("expected 'row,col'"));
        assert!(text.contains("off the 15x15 board"));
        assert!(text.contains("already occupied"));
    }

    #[test]
    fn test_human_player_eof() {
        let env = started_env();
        let mut player = HumanPlayer::new(Cursor::new(""), Vec::new());
        assert!(matches!(player.choose_action(&env), Err(GomokuError::InvalidInput(_))));
    }

    #[test]
    fn test_mcts_player_turn() {
        let mut env = GomokuEnv::new(crate::env::EnvConfig::square(6), Box::new(DummyEvaluator));
        env.reset().unwrap();
        let mut player = MctsPlayer::new(MctsConfig {
            num_simulations: 20,
            seed: Some(9),
            ..MctsConfig::default()
        });
        let done = player.play_turn(&mut env).unwrap();
        assert!(!done);
        assert_eq!(env.current_player(), Player::White);
    }
}
