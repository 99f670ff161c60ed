//! Step-based environment wrapping a [`Game`].
//!
//! Actions are flat cell indices (`x * height + y`). Observations are the
//! board encoded as 0 (empty), 1 (black), 2 (white) in action order. Each
//! step returns the evaluator's score for the player who just moved.

use std::path::PathBuf;

use tracing::{debug, info, warn};

use crate::board::Player;
use crate::constants::DEFAULT_BOARD_SIZE;
use crate::error::{GomokuError, Result};
use crate::evaluator::{Evaluator, HeuristicEvaluator};
use crate::game::{Game, StartingRule};

/// Environment settings.
#[derive(Clone, Debug)]
pub struct EnvConfig {
    pub width: usize,
    pub height: usize,
    pub starting_rule: StartingRule,
    /// Directory that receives the final board and JSON record of each game.
    pub save_dir: Option<PathBuf>,
}

impl Default for EnvConfig {
    fn default() -> Self {
        Self {
            width: DEFAULT_BOARD_SIZE,
            height: DEFAULT_BOARD_SIZE,
            starting_rule: StartingRule::Basic,
            save_dir: None,
        }
    }
}

impl EnvConfig {
    pub fn square(size: usize) -> Self {
        Self {
            width: size,
            height: size,
            ..Self::default()
        }
    }
}

/// Result of a single environment step.
#[derive(Clone, Debug, PartialEq)]
pub struct Step {
    pub observation: Vec<i8>,
    pub reward: f64,
    /// The game ended with a win or a full board.
    pub done: bool,
    pub terminated: bool,
}

pub struct GomokuEnv {
    config: EnvConfig,
    game: Game,
    evaluator: Box<dyn Evaluator>,
    is_reset: bool,
    is_done: bool,
    steps: usize,
    episode: usize,
}

impl Default for GomokuEnv {
    fn default() -> Self {
        Self::new(EnvConfig::default(), Box::new(HeuristicEvaluator::new()))
    }
}

impl GomokuEnv {
    pub fn new(config: EnvConfig, evaluator: Box<dyn Evaluator>) -> Self {
        let game = Game::with_size(config.width, config.height, config.starting_rule);
        Self {
            config,
            game,
            evaluator,
            is_reset: false,
            is_done: false,
            steps: 0,
            episode: 0,
        }
    }

    pub fn with_evaluator(evaluator: impl Evaluator + 'static) -> Self {
        Self::new(EnvConfig::default(), Box::new(evaluator))
    }

    pub fn config(&self) -> &EnvConfig {
        &self.config
    }

    pub fn game(&self) -> &Game {
        &self.game
    }

    /// Number of discrete actions (one per cell).
    pub fn action_space_size(&self) -> usize {
        self.config.width * self.config.height
    }

    /// Observation shape as `(width, height)`.
    pub fn observation_shape(&self) -> (usize, usize) {
        (self.config.width, self.config.height)
    }

    pub fn current_player(&self) -> Player {
        self.game.current_player()
    }

    pub fn steps(&self) -> usize {
        self.steps
    }

    pub fn is_reset(&self) -> bool {
        self.is_reset
    }

    pub fn is_done(&self) -> bool {
        self.is_done
    }

    /// There is no termination separate from the end of the game.
    pub fn is_terminated(&self) -> bool {
        self.is_done
    }

    pub fn valid_actions(&self) -> Vec<usize> {
        self.game.board().valid_actions()
    }

    /// Start a new episode and return the empty observation.
    pub fn reset(&mut self) -> Result<Vec<i8>> {
        self.game.reset()?;
        self.is_reset = true;
        self.is_done = false;
        self.steps = 0;
        self.episode += 1;
        debug!(episode = self.episode, "environment reset");
        Ok(self.game.board().observation())
    }

    /// Place a stone for the player to move.
    pub fn step(&mut self, action: usize) -> Result<Step> {
        if !self.is_reset {
            return Err(GomokuError::GameNotStarted);
        }
        if action >= self.action_space_size() {
            return Err(GomokuError::InvalidAction {
                action,
                size: self.action_space_size(),
            });
        }
        if self.is_done {
            return Err(GomokuError::GameOver);
        }

        let mover = self.game.current_player();
        self.game.play_action(action)?;
        self.steps += 1;
        self.is_done = self.game.is_over();

        let reward = self
            .evaluator
            .evaluate(self.game.board(), mover, self.is_done);

        if self.is_done {
            info!(
                episode = self.episode,
                steps = self.steps,
                winner = ?self.game.winner(),
                "game finished"
            );
            // The move is committed; keep the step and report the failed save
            if let Err(e) = self.save_episode() {
                warn!(episode = self.episode, error = %e, "failed to store finished game");
            }
        }

        Ok(Step {
            observation: self.game.board().observation(),
            reward,
            done: self.is_done,
            terminated: self.is_terminated(),
        })
    }

    fn save_episode(&self) -> Result<()> {
        let Some(dir) = &self.config.save_dir else {
            return Ok(());
        };
        std::fs::create_dir_all(dir)?;
        let board_path = dir.join(format!("board_{:04}.txt", self.episode));
        let data_path = dir.join(format!("gamedata_{:04}.json", self.episode));
        self.game.board().store_board(&board_path)?;
        self.game.store_game_data(&data_path)?;
        debug!(path = %data_path.display(), "stored game record");
        Ok(())
    }

    /// Text rendering of the board.
    pub fn render(&self) -> String {
        self.game.display_board()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::evaluator::DummyEvaluator;

    fn dummy_env() -> GomokuEnv {
        GomokuEnv::with_evaluator(DummyEvaluator)
    }

    #[test]
    fn test_env_initialise() {
        let env = dummy_env();
        assert_eq!(env.game().board().size(), (15, 15));
        assert_eq!(env.action_space_size(), 225);
        assert_eq!(env.observation_shape(), (15, 15));
        assert!(!env.is_reset());
    }

    #[test]
    fn test_step_before_reset() {
        let mut env = dummy_env();
        assert!(matches!(env.step(0), Err(GomokuError::GameNotStarted)));
        env.reset().unwrap();
        assert!(env.is_reset());
        assert_eq!(env.steps(), 0);
    }

    #[test]
    fn test_take_step() {
        let mut env = dummy_env();
        env.reset().unwrap();
        let step = env.step(0).unwrap();
        assert_eq!(step.observation.len(), 225);
        assert_eq!(step.observation[0], 1);
        assert_eq!(step.reward, 0.0);
        assert!(!step.done);
        assert_eq!(env.steps(), 1);
        assert_eq!(env.current_player(), Player::White);
    }

    #[test]
    fn test_invalid_actions() {
        let mut env = dummy_env();
        env.reset().unwrap();
        assert!(matches!(
            env.step(225),
            Err(GomokuError::InvalidAction { action: 225, .. })
        ));
        env.step(0).unwrap();
        assert!(matches!(env.step(0), Err(GomokuError::Occupied { .. })));
        env.step(1).unwrap();
        assert_eq!(env.steps(), 2);
    }

    #[test]
    fn test_game_done_and_reset() {
        let mut env = dummy_env();
        env.reset().unwrap();
        for i in 0..9 {
            let action = if i % 2 == 0 { i / 2 } else { i + 100 };
            env.step(action).unwrap();
        }
        assert!(env.is_done());
        assert_eq!(env.game().winner(), Some(Player::Black));
        assert!(matches!(env.step(5), Err(GomokuError::GameOver)));

        env.reset().unwrap();
        assert_eq!(env.game().winner(), None);
        assert_eq!(env.steps(), 0);
        assert_eq!(env.current_player(), Player::Black);
    }

    #[test]
    fn test_failed_save_still_returns_step() {
        // A regular file where the save directory should be
        let file = tempfile::NamedTempFile::new().unwrap();
        let config = EnvConfig {
            save_dir: Some(file.path().to_path_buf()),
            ..EnvConfig::default()
        };
        let mut env = GomokuEnv::new(config, Box::new(DummyEvaluator));
        env.reset().unwrap();
        for i in 0..4 {
            env.step(i).unwrap();
            env.step(15 + i).unwrap();
        }
        let step = env.step(4).unwrap();
        assert!(step.done);
        assert_eq!(step.observation[4], 1);
        assert_eq!(env.steps(), 9);
        assert_eq!(env.game().winner(), Some(Player::Black));
    }

    #[test]
    fn test_reward_uses_mover_perspective() {
        let mut env = GomokuEnv::with_evaluator(HeuristicEvaluator::new());
        env.reset().unwrap();
        let step = env.step(7 * 15 + 7).unwrap();
        assert_eq!(step.reward, 16.0);
    }
}
