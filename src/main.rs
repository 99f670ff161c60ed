//! Alpha-Gomoku: a Gomoku MCTS engine.
//!
//! ## Usage
//!
//! - `alpha-gomoku` - Show a demo
//! - `alpha-gomoku match --black mcts --white random` - Play engine matches
//! - `alpha-gomoku play --human black` - Play against the engine
//! - `alpha-gomoku replay game.json` - Show a stored game
//! - `alpha-gomoku protocol` - Start the Gomocup protocol loop

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use tracing::info;
use tracing_subscriber::EnvFilter;

use alpha_gomoku::board::Player;
use alpha_gomoku::constants::{DEFAULT_BOARD_SIZE, N_SIMULATIONS};
use alpha_gomoku::env::{EnvConfig, GomokuEnv};
use alpha_gomoku::evaluator::HeuristicEvaluator;
use alpha_gomoku::experiment::{JsonlConnector, LoggingConnector, NoopConnector};
use alpha_gomoku::game::{Game, GameData};
use alpha_gomoku::matchplay::GomokuMatch;
use alpha_gomoku::mcts::{Mcts, MctsConfig};
use alpha_gomoku::player::PlayerKind;
use alpha_gomoku::protocol::ProtocolEngine;

/// Alpha-Gomoku: a Gomoku MCTS engine
#[derive(Parser)]
#[command(name = "alpha-gomoku")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a short engine demo
    Demo {
        #[command(flatten)]
        search: SearchArgs,
    },
    /// Play one or more games between two players
    Match {
        #[arg(long, value_enum, default_value_t = PlayerKind::Mcts)]
        black: PlayerKind,
        #[arg(long, value_enum, default_value_t = PlayerKind::Random)]
        white: PlayerKind,
        /// Number of games to play
        #[arg(long, default_value_t = 1)]
        games: usize,
        #[arg(long, default_value_t = DEFAULT_BOARD_SIZE)]
        size: usize,
        /// Write per-game results as JSON lines to this file
        #[arg(long)]
        log: Option<PathBuf>,
        /// Store the final board and game record of every game here
        #[arg(long)]
        save_dir: Option<PathBuf>,
        /// Do not print the board after each move
        #[arg(long)]
        quiet: bool,
        #[command(flatten)]
        search: SearchArgs,
    },
    /// Play against the engine on the terminal
    Play {
        /// Color played by the human
        #[arg(long, value_enum, default_value_t = Side::Black)]
        human: Side,
        #[arg(long, default_value_t = DEFAULT_BOARD_SIZE)]
        size: usize,
        #[command(flatten)]
        search: SearchArgs,
    },
    /// Print a stored game record
    Replay {
        file: PathBuf,
        #[arg(long, default_value_t = DEFAULT_BOARD_SIZE)]
        size: usize,
    },
    /// Start the Gomocup protocol loop on stdin/stdout
    Protocol {
        #[command(flatten)]
        search: SearchArgs,
    },
}

#[derive(clap::Args, Clone)]
struct SearchArgs {
    /// Simulations per move
    #[arg(long, env = "GOMOKU_SIMS", default_value_t = N_SIMULATIONS)]
    sims: usize,
    /// RNG seed for reproducible games
    #[arg(long, env = "GOMOKU_SEED")]
    seed: Option<u64>,
    /// Use the MuZero exploration formula
    #[arg(long)]
    muzero: bool,
    /// Always play the most visited move, without root noise
    #[arg(long)]
    deterministic: bool,
}

impl SearchArgs {
    fn config(&self) -> MctsConfig {
        MctsConfig {
            num_simulations: self.sims,
            seed: self.seed,
            use_muzero: self.muzero,
            deterministic: self.deterministic,
            ..MctsConfig::default()
        }
    }
}

#[derive(Copy, Clone, ValueEnum)]
enum Side {
    Black,
    White,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Some(Commands::Match {
            black,
            white,
            games,
            size,
            log,
            save_dir,
            quiet,
            search,
        }) => run_match(black, white, games, size, log, save_dir, quiet, &search),
        Some(Commands::Play { human, size, search }) => {
            let (black, white) = match human {
                Side::Black => (PlayerKind::Human, PlayerKind::Mcts),
                Side::White => (PlayerKind::Mcts, PlayerKind::Human),
            };
            run_match(black, white, 1, size, None, None, false, &search)
        }
        Some(Commands::Replay { file, size }) => run_replay(&file, size),
        Some(Commands::Protocol { search }) => {
            let config = MctsConfig {
                deterministic: true,
                ..search.config()
            };
            ProtocolEngine::new(config)
                .run()
                .context("protocol loop failed")
        }
        Some(Commands::Demo { search }) => run_demo(&search),
        None => run_demo(&SearchArgs {
            sims: 200,
            seed: None,
            muzero: false,
            deterministic: false,
        }),
    }
}

#[allow(clippy::too_many_arguments)]
fn run_match(
    black: PlayerKind,
    white: PlayerKind,
    games: usize,
    size: usize,
    log: Option<PathBuf>,
    save_dir: Option<PathBuf>,
    quiet: bool,
    search: &SearchArgs,
) -> Result<()> {
    let config = search.config();
    let env_config = EnvConfig {
        save_dir,
        ..EnvConfig::square(size)
    };
    let mut env = GomokuEnv::new(env_config, Box::new(HeuristicEvaluator::new()));

    // Offset the second seed so both sides do not mirror each other
    let black_player = black.build(&config, search.seed);
    let white_player = white.build(&config, search.seed.map(|s| s.wrapping_add(1)));
    let mut game_match = GomokuMatch::new(black_player, white_player).with_render(!quiet);

    let mut logger: Box<dyn LoggingConnector> = match log {
        Some(path) => Box::new(JsonlConnector::new(path)),
        None => Box::new(NoopConnector),
    };

    info!(%black, %white, games, size, sims = config.num_simulations, "starting match");
    let summary = game_match
        .run_series(&mut env, games, logger.as_mut())
        .context("match failed")?;

    println!(
        "games: {}  black wins: {}  white wins: {}  draws: {}",
        summary.games, summary.black_wins, summary.white_wins, summary.draws
    );
    Ok(())
}

fn run_replay(file: &Path, size: usize) -> Result<()> {
    let data = GameData::load(file).with_context(|| format!("reading {}", file.display()))?;
    let game = Game::replay_sized(data, size, size).context("replaying game")?;
    println!("{}", game.display_board());
    println!("moves: {}", game.data().moves.len());
    match game.winner() {
        Some(winner) => println!("winner: {winner}"),
        None => println!("winner: none"),
    }
    Ok(())
}

fn run_demo(search: &SearchArgs) -> Result<()> {
    println!("Alpha-Gomoku: Gomoku MCTS Engine\n");

    let mut game = Game::default();
    game.reset()?;
    game.play_action(7 * DEFAULT_BOARD_SIZE + 7)?;
    println!("{}\n", game.display_board());

    let config = search.config();
    println!("Running {} MCTS simulations for White...", config.num_simulations);
    let mut mcts = Mcts::new(config);
    let result = mcts.search(&game)?;
    let pos = alpha_gomoku::board::GridPosition::from_action(result.best_action, game.board().size());
    println!("Best move: ({}, {})", pos.x, pos.y);
    println!("Root value for {}: {:+.3}", Player::White, result.root_value);
    Ok(())
}
