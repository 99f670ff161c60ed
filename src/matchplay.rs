//! Matches between two players.

use serde::Serialize;
use serde_json::json;
use tracing::info;

use crate::board::{Move, Player};
use crate::env::GomokuEnv;
use crate::error::Result;
use crate::experiment::LoggingConnector;
use crate::player::GomokuPlayer;

/// Result of a single game.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct MatchOutcome {
    pub winner: Option<Player>,
    pub moves: Vec<Move>,
    pub steps: usize,
}

/// Win/draw tally over a series of games.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct SeriesSummary {
    pub games: usize,
    pub black_wins: usize,
    pub white_wins: usize,
    pub draws: usize,
}

impl SeriesSummary {
    pub fn record(&mut self, outcome: &MatchOutcome) {
        self.games += 1;
        match outcome.winner {
            Some(Player::Black) => self.black_wins += 1,
            Some(Player::White) => self.white_wins += 1,
            None => self.draws += 1,
        }
    }
}

pub struct GomokuMatch {
    black: Box<dyn GomokuPlayer>,
    white: Box<dyn GomokuPlayer>,
    render: bool,
}

impl GomokuMatch {
    pub fn new(black: Box<dyn GomokuPlayer>, white: Box<dyn GomokuPlayer>) -> Self {
        Self {
            black,
            white,
            render: false,
        }
    }

    /// Print the board to stdout after every move.
    pub fn with_render(mut self, render: bool) -> Self {
        self.render = render;
        self
    }

    /// Reset the environment and play one game to the end.
    pub fn play(&mut self, env: &mut GomokuEnv) -> Result<MatchOutcome> {
        env.reset()?;
        let mut done = false;
        while !done {
            done = match env.current_player() {
                Player::Black => self.black.play_turn(env)?,
                Player::White => self.white.play_turn(env)?,
            };
            if self.render {
                println!("{}\n", env.render());
            }
        }

        let outcome = MatchOutcome {
            winner: env.game().winner(),
            moves: env.game().data().moves.clone(),
            steps: env.steps(),
        };
        match outcome.winner {
            Some(winner) => info!(
                black = self.black.name(),
                white = self.white.name(),
                %winner,
                steps = outcome.steps,
                "match finished"
            ),
            None => info!(
                black = self.black.name(),
                white = self.white.name(),
                steps = outcome.steps,
                "match drawn"
            ),
        }
        Ok(outcome)
    }

    /// Play `games` games, logging each result and the final tally.
    pub fn run_series(
        &mut self,
        env: &mut GomokuEnv,
        games: usize,
        logger: &mut dyn LoggingConnector,
    ) -> Result<SeriesSummary> {
        logger.start(json!({
            "black": self.black.name(),
            "white": self.white.name(),
            "games": games,
            "board": env.observation_shape(),
        }))?;

        let mut summary = SeriesSummary::default();
        for game in 0..games {
            let outcome = self.play(env)?;
            summary.record(&outcome);
            logger.log(json!({
                "game": game,
                "winner": outcome.winner,
                "steps": outcome.steps,
            }))?;
        }
        logger.log(serde_json::to_value(&summary)?)?;
        logger.finish()?;
        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::env::EnvConfig;
    use crate::evaluator::DummyEvaluator;
    use crate::experiment::NoopConnector;
    use crate::player::RandomPlayer;

    #[test]
    fn test_random_match_finishes() {
        let mut env = GomokuEnv::with_evaluator(DummyEvaluator);
        let mut m = GomokuMatch::new(
            Box::new(RandomPlayer::with_seed(1)),
            Box::new(RandomPlayer::with_seed(2)),
        );
        let outcome = m.play(&mut env).unwrap();
        assert!(env.is_done());
        assert_eq!(outcome.moves.len(), outcome.steps);
        assert_eq!(outcome.moves[0].player, Player::Black);
        if outcome.winner.is_none() {
            assert_eq!(outcome.steps, 225);
        }
    }

    #[test]
    fn test_series_summary_counts() {
        let mut env = GomokuEnv::new(EnvConfig::square(4), Box::new(DummyEvaluator));
        let mut m = GomokuMatch::new(
            Box::new(RandomPlayer::with_seed(3)),
            Box::new(RandomPlayer::with_seed(4)),
        );
        // Five in a row is impossible on 4x4, so every game is a draw
        let summary = m.run_series(&mut env, 3, &mut NoopConnector).unwrap();
        assert_eq!(
            summary,
            SeriesSummary {
                games: 3,
                black_wins: 0,
                white_wins: 0,
                draws: 3
            }
        );
    }
}
