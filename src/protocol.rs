//! Gomocup (piskvork) text protocol.
//!
//! The protocol is used by Gomoku tournament managers and GUIs. The manager
//! sends one command per line on stdin; the engine answers on stdout.
//!
//! ## Supported Commands
//!
//! - `START <size>` - New game on a square board
//! - `RECTSTART <w>,<h>` - New game on a rectangular board
//! - `RESTART` - New game on the current board size
//! - `BEGIN` - Engine plays the first move
//! - `TURN <x>,<y>` - Opponent's move; engine replies with its own
//! - `BOARD` ... `DONE` - Load a position (`x,y,who`, who 1 = own, 2 = opponent), then move
//! - `INFO <key> <value>` - Settings (`timeout_turn` in ms, `max_sims`); no reply
//! - `ABOUT` - Engine description
//! - `END` - Exit
//!
//! ## Example
//!
//! ```ignore
//! use alpha_gomoku::protocol::ProtocolEngine;
//! let mut engine = ProtocolEngine::new(Default::default());
//! engine.run()?;
//! ```

use std::io::{self, BufRead, Write};
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::board::{GridPosition, Move, Player};
use crate::game::{Game, GameData, StartingRule};
use crate::mcts::{Mcts, MctsConfig};

/// Smallest board the engine accepts.
const MIN_BOARD_SIZE: usize = 5;

/// Largest board the engine accepts.
const MAX_BOARD_SIZE: usize = 100;

/// `who` field of a BOARD line for the engine's stones.
const OWN_STONE: u8 = 1;

/// `who` field of a BOARD line for the opponent's stones.
const OPPONENT_STONE: u8 = 2;

/// Share of the turn timeout spent searching.
const TIME_SAFETY_FACTOR: f64 = 0.8;

/// Protocol engine state.
pub struct ProtocolEngine {
    /// Current game (None until START)
    game: Option<Game>,
    /// Board size from the last START/RECTSTART
    size: (usize, usize),
    config: MctsConfig,
    mcts: Mcts,
    /// Stones collected between BOARD and DONE
    pending_board: Option<Vec<(usize, usize, u8)>>,
}

impl ProtocolEngine {
    pub fn new(config: MctsConfig) -> Self {
        Self {
            game: None,
            size: (0, 0),
            mcts: Mcts::new(config.clone()),
            config,
            pending_board: None,
        }
    }

    /// Run the command loop on stdin/stdout.
    pub fn run(&mut self) -> io::Result<()> {
        let stdin = io::stdin();
        let stdout = io::stdout();
        self.run_with(stdin.lock(), stdout.lock())
    }

    /// Run the command loop until `END` or end of input.
    pub fn run_with<R: BufRead, W: Write>(&mut self, input: R, mut output: W) -> io::Result<()> {
        for line in input.lines() {
            let line = line?;
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            debug!(command = line, "protocol input");

            if line.eq_ignore_ascii_case("END") {
                break;
            }
            if let Some(response) = self.execute(line) {
                writeln!(output, "{response}")?;
                output.flush()?;
            }
        }
        Ok(())
    }

    /// Execute one input line and return the reply, if any.
    fn execute(&mut self, line: &str) -> Option<String> {
        if self.pending_board.is_some() {
            return self.board_line(line);
        }

        let (command, args) = match line.split_once(char::is_whitespace) {
            Some((c, a)) => (c.to_uppercase(), a.trim()),
            None => (line.to_uppercase(), ""),
        };

        match command.as_str() {
            "START" => Some(match args.parse::<usize>() {
                Ok(size) => self.start(size, size),
                Err(_) => format!("ERROR invalid board size '{args}'"),
            }),

            "RECTSTART" => Some(match parse_pair(args) {
                Some((w, h)) => self.start(w, h),
                None => format!("ERROR invalid board size '{args}'"),
            }),

            "RESTART" => Some(if self.size.0 == 0 {
                "ERROR no game started".to_string()
            } else {
                self.start(self.size.0, self.size.1)
            }),

            "BEGIN" => Some(self.begin()),

            "TURN" => Some(match parse_pair(args) {
                Some((x, y)) => self.turn(x, y),
                None => format!("ERROR invalid move '{args}'"),
            }),

            "BOARD" => {
                if self.size.0 == 0 {
                    return Some("ERROR no game started".to_string());
                }
                self.pending_board = Some(Vec::new());
                None
            }

            "INFO" => {
                self.info(args);
                None
            }

            "ABOUT" => Some(format!(
                "name=\"alpha-gomoku\", version=\"{}\", author=\"alpha-gomoku developers\", country=\"-\"",
                env!("CARGO_PKG_VERSION")
            )),

            _ => Some(format!("UNKNOWN command {command}")),
        }
    }

    fn start(&mut self, width: usize, height: usize) -> String {
        if !(MIN_BOARD_SIZE..=MAX_BOARD_SIZE).contains(&width)
            || !(MIN_BOARD_SIZE..=MAX_BOARD_SIZE).contains(&height)
        {
            return format!("ERROR unsupported board size {width}x{height}");
        }
        let mut game = Game::with_size(width, height, StartingRule::Basic);
        if let Err(e) = game.reset() {
            return format!("ERROR {e}");
        }
        self.size = (width, height);
        self.game = Some(game);
        info!(width, height, "protocol game started");
        "OK".to_string()
    }

    fn begin(&mut self) -> String {
        let empty = match &self.game {
            Some(game) => game.data().moves.is_empty(),
            None => return "ERROR no game started".to_string(),
        };
        if !empty {
            return "ERROR BEGIN is only valid on an empty board".to_string();
        }
        self.genmove()
    }

    fn turn(&mut self, x: usize, y: usize) -> String {
        let Some(game) = self.game.as_mut() else {
            return "ERROR no game started".to_string();
        };
        let mv = Move::new(game.current_player(), GridPosition::new(x, y));
        match game.make_move(mv) {
            Ok(_) => self.genmove(),
            Err(e) => format!("ERROR {e}"),
        }
    }

    /// Handle a line inside a BOARD block.
    fn board_line(&mut self, line: &str) -> Option<String> {
        if line.eq_ignore_ascii_case("DONE") {
            let stones = self.pending_board.take().unwrap_or_default();
            return Some(self.load_board(&stones));
        }

        let parts: Vec<&str> = line.split(',').map(str::trim).collect();
        let parsed: Option<(usize, usize, u8)> = match parts.as_slice() {
            [x, y, who] => match (x.parse::<usize>(), y.parse::<usize>(), who.parse::<u8>()) {
                (Ok(x), Ok(y), Ok(who @ (OWN_STONE | OPPONENT_STONE))) => Some((x, y, who)),
                _ => None,
            },
            _ => None,
        };
        match (parsed, self.pending_board.as_mut()) {
            (Some(stone), Some(stones)) => stones.push(stone),
            _ => warn!(line, "ignoring malformed BOARD line"),
        }
        None
    }

    /// Rebuild the game from BOARD stones and reply with a move.
    ///
    /// The engine plays Black when both sides have the same number of stones
    /// and White when the opponent has one more. Any other count, or a
    /// position that is already won, is an error.
    fn load_board(&mut self, stones: &[(usize, usize, u8)]) -> String {
        let (own, opp): (Vec<_>, Vec<_>) = stones.iter().partition(|s| s.2 == OWN_STONE);
        let engine = if own.len() == opp.len() {
            Player::Black
        } else if opp.len() == own.len() + 1 {
            Player::White
        } else {
            return format!(
                "ERROR stone counts {} (engine) and {} (opponent) do not fit either color",
                own.len(),
                opp.len()
            );
        };

        // Own stones first so that the last recorded move is the opponent's
        let moves = own
            .iter()
            .map(|&&(x, y, _)| Move::at(engine, x, y))
            .chain(opp.iter().map(|&&(x, y, _)| Move::at(engine.opponent(), x, y)))
            .collect();

        let data = GameData {
            moves,
            ..GameData::default()
        };
        match Game::replay_sized(data, self.size.0, self.size.1) {
            Ok(game) => {
                let winner = game.winner();
                self.game = Some(game);
                match winner {
                    Some(player) => format!("ERROR position is already won by {player}"),
                    None => self.genmove(),
                }
            }
            Err(e) => format!("ERROR {e}"),
        }
    }

    fn info(&mut self, args: &str) {
        let Some((key, value)) = args.split_once(char::is_whitespace) else {
            return;
        };
        match key.to_lowercase().as_str() {
            "timeout_turn" => {
                if let Ok(ms) = value.trim().parse::<u64>() {
                    self.config.time_limit = (ms > 0)
                        .then(|| Duration::from_millis((ms as f64 * TIME_SAFETY_FACTOR) as u64));
                    self.mcts = Mcts::new(self.config.clone());
                }
            }
            "max_sims" => {
                if let Ok(sims) = value.trim().parse::<usize>() {
                    self.config.num_simulations = sims.max(1);
                    self.mcts = Mcts::new(self.config.clone());
                }
            }
            other => debug!(key = other, "ignoring INFO key"),
        }
    }

    /// Search, play, and format the engine's move.
    fn genmove(&mut self) -> String {
        let Some(game) = self.game.as_mut() else {
            return "ERROR no game started".to_string();
        };
        let action = match self.mcts.choose_action(game) {
            Ok(a) => a,
            Err(e) => return format!("ERROR {e}"),
        };
        if let Err(e) = game.play_action(action) {
            return format!("ERROR {e}");
        }
        let pos = GridPosition::from_action(action, game.board().size());
        format!("{},{}", pos.x, pos.y)
    }
}

fn parse_pair(args: &str) -> Option<(usize, usize)> {
    let (a, b) = args.split_once(',')?;
    Some((a.trim().parse().ok()?, b.trim().parse().ok()?))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn engine() -> ProtocolEngine {
        ProtocolEngine::new(MctsConfig {
            num_simulations: 30,
            deterministic: true,
            seed: Some(1),
            ..MctsConfig::default()
        })
    }

    fn parse_reply(reply: &str) -> (usize, usize) {
        parse_pair(reply).unwrap_or_else(|| panic!("not a move: {reply}"))
    }

    #[test]
    fn test_parse_pair() {
        assert_eq!(parse_pair("3,4"), Some((3, 4)));
        assert_eq!(parse_pair(" 10 , 2 "), Some((10, 2)));
        assert_eq!(parse_pair("3"), None);
        assert_eq!(parse_pair("a,b"), None);
    }

    #[test]
    fn test_start_sizes() {
        let mut e = engine();
        assert_eq!(e.execute("START 15").as_deref(), Some("OK"));
        assert!(e.execute("START 2").unwrap().starts_with("ERROR"));
        assert!(e.execute("START x").unwrap().starts_with("ERROR"));
        assert_eq!(e.execute("RECTSTART 10,12").as_deref(), Some("OK"));
        assert_eq!(e.size, (10, 12));
        assert_eq!(e.execute("restart").as_deref(), Some("OK"));
    }

    #[test]
    fn test_begin_and_turn() {
        let mut e = engine();
        e.execute("START 9");
        let (x, y) = parse_reply(&e.execute("BEGIN").unwrap());
        assert!(x < 9 && y < 9);

        let reply = e.execute(if (x, y) == (0, 0) { "TURN 1,1" } else { "TURN 0,0" }).unwrap();
        parse_reply(&reply);
        let game = e.game.as_ref().unwrap();
        assert_eq!(game.data().moves.len(), 3);
        assert_eq!(game.current_player(), Player::White);
    }

    #[test]
    fn test_turn_on_occupied_cell() {
        let mut e = engine();
        e.execute("START 9");
        let reply = e.execute("BEGIN").unwrap();
        assert!(e.execute(&format!("TURN {reply}")).unwrap().starts_with("ERROR"));
    }

    #[test]
    fn test_board_block_loads_position() {
        let mut e = engine();
        e.execute("START 9");
        // Opponent (Black) has one stone more, so the engine plays White
        assert_eq!(e.execute("BOARD"), None);
        for line in ["0,0,2", "1,0,2", "2,0,2", "3,0,2", "5,5,1", "6,6,1", "7,7,1"] {
            assert_eq!(e.execute(line), None);
        }
        let reply = e.execute("DONE").unwrap();
        let game = e.game.as_ref().unwrap();
        assert_eq!(game.data().moves.len(), 8);
        assert_eq!(game.board().get(GridPosition::new(0, 0)), Some(Player::Black));
        assert_eq!(game.board().get(GridPosition::new(5, 5)), Some(Player::White));
        let (x, y) = parse_reply(&reply);
        assert!(x < 9 && y < 9);
    }

    #[test]
    fn test_board_block_rejects_impossible_counts() {
        let mut e = engine();
        e.execute("START 9");
        e.execute("BOARD");
        e.execute("5,5,1");
        let reply = e.execute("DONE").unwrap();
        assert!(reply.starts_with("ERROR"), "{reply}");
        assert_eq!(e.game.as_ref().unwrap().data().moves.len(), 0);

        e.execute("BOARD");
        for line in ["0,0,2", "1,1,2", "2,2,2"] {
            e.execute(line);
        }
        assert!(e.execute("DONE").unwrap().starts_with("ERROR"));
    }

    #[test]
    fn test_board_block_engine_plays_black_on_even_counts() {
        let mut e = engine();
        e.execute("START 9");
        e.execute("BOARD");
        e.execute("4,4,1");
        e.execute("0,0,2");
        let (x, y) = parse_reply(&e.execute("DONE").unwrap());
        let game = e.game.as_ref().unwrap();
        assert_eq!(game.board().get(GridPosition::new(4, 4)), Some(Player::Black));
        assert_eq!(game.board().get(GridPosition::new(x, y)), Some(Player::Black));
        assert_eq!(game.current_player(), Player::White);
    }

    #[test]
    fn test_board_block_already_won() {
        let mut e = engine();
        e.execute("START 9");
        e.execute("BOARD");
        for y in 0..5 {
            e.execute(&format!("0,{y},2"));
        }
        for y in 0..4 {
            e.execute(&format!("4,{y},1"));
        }
        let reply = e.execute("DONE").unwrap();
        assert!(reply.starts_with("ERROR"), "{reply}");
        let game = e.game.as_ref().unwrap();
        assert_eq!(game.winner(), Some(Player::Black));
        assert_eq!(game.data().moves.len(), 9);
        assert!(e.execute("TURN 8,8").unwrap().starts_with("ERROR"));
    }

    #[test]
    fn test_board_line_with_unknown_owner_is_ignored() {
        let mut e = engine();
        e.execute("START 9");
        e.execute("BOARD");
        e.execute("3,3,3");
        e.execute("4,4,2");
        parse_reply(&e.execute("DONE").unwrap());
        let game = e.game.as_ref().unwrap();
        assert_eq!(game.board().get(GridPosition::new(3, 3)), None);
        assert_eq!(game.board().get(GridPosition::new(4, 4)), Some(Player::Black));
        assert_eq!(game.data().moves.len(), 2);
    }

    #[test]
    fn test_info_updates_config() {
        let mut e = engine();
        assert_eq!(e.execute("INFO timeout_turn 1000"), None);
        assert_eq!(e.config.time_limit, Some(Duration::from_millis(800)));
        assert_eq!(e.execute("INFO max_sims 12"), None);
        assert_eq!(e.mcts.config().num_simulations, 12);
        assert_eq!(e.execute("INFO rule 1"), None);
    }

    #[test]
    fn test_about_and_unknown() {
        let mut e = engine();
        assert!(e.execute("ABOUT").unwrap().contains("alpha-gomoku"));
        assert!(e.execute("FOO").unwrap().starts_with("UNKNOWN"));
        assert!(e.execute("BEGIN").unwrap().starts_with("ERROR"));
    }

    #[test]
    fn test_run_with_stops_at_end() {
        let mut e = engine();
        let input = "START 9\nABOUT\nEND\nSTART 10\n";
        let mut output = Vec::new();
        e.run_with(input.as_bytes(), &mut output).unwrap();
        let text = String::from_utf8(output).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0], "OK");
        assert_eq!(e.size, (9, 9));
    }
}
