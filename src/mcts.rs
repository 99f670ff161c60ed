//! Monte Carlo Tree Search (MCTS) with prior-weighted UCB selection.
//!
//! This module implements MCTS with:
//! - Prior-weighted UCB selection, either in the plain form
//!   `ct * P(s,a) * sqrt(N(s)) / (1 + N(s,a)) + Q(s,a)` or in the MuZero form
//!   with a log-correction on the exploration constant and min-max normalized
//!   values (appendix B.2 of the MuZero paper)
//! - Expansion of every new leaf, with priors from a [`PolicyModel`]
//! - Uniform random playouts to the end of the game for leaf evaluation
//! - Dirichlet noise on the root priors for exploration
//!
//! Node values are stored from the perspective of the player who made the
//! move leading into the node, so a parent always picks the child with the
//! highest value for itself.

use std::time::{Duration, Instant};

use tracing::debug;

use crate::board::{GridPosition, Player};
use crate::constants::{
    DIRICHLET_ALPHA, EXPLORATION_CT, EXPLORATION_FRACTION, MU_CT, MU_CT_SECOND, N_SIMULATIONS,
    TEMPERATURE,
};
use crate::error::{GomokuError, Result};
use crate::game::Game;

/// Search parameters.
#[derive(Clone, Debug, PartialEq)]
pub struct MctsConfig {
    /// Number of simulations per search.
    pub num_simulations: usize,
    /// Exploration constant of the plain UCB formula.
    pub ct: f64,
    /// Dirichlet noise concentration.
    pub dirichlet_alpha: f64,
    /// Fraction of each root prior replaced by noise.
    pub exploration_fraction: f64,
    /// Temperature for sampling the played move from visit counts.
    pub temperature: f64,
    /// Skip root noise and always play the most visited move.
    pub deterministic: bool,
    /// Use the MuZero UCB formula.
    pub use_muzero: bool,
    /// MuZero base exploration constant (c1).
    pub mu_ct: f64,
    /// MuZero log-correction constant (c2).
    pub mu_ct_second: f64,
    /// RNG seed for noise, playouts, and move sampling.
    pub seed: Option<u64>,
    /// Stop simulating once this much time has passed, even with simulations left.
    pub time_limit: Option<Duration>,
}

impl Default for MctsConfig {
    fn default() -> Self {
        Self {
            num_simulations: N_SIMULATIONS,
            ct: EXPLORATION_CT,
            dirichlet_alpha: DIRICHLET_ALPHA,
            exploration_fraction: EXPLORATION_FRACTION,
            temperature: TEMPERATURE,
            deterministic: false,
            use_muzero: false,
            mu_ct: MU_CT,
            mu_ct_second: MU_CT_SECOND,
            seed: None,
            time_limit: None,
        }
    }
}

impl MctsConfig {
    pub fn with_simulations(num_simulations: usize) -> Self {
        Self {
            num_simulations,
            ..Self::default()
        }
    }
}

/// Running minimum and maximum of node values seen during a search.
#[derive(Clone, Debug, PartialEq)]
pub struct TreeStats {
    pub maximum: f64,
    pub minimum: f64,
}

impl Default for TreeStats {
    fn default() -> Self {
        Self {
            maximum: f64::NEG_INFINITY,
            minimum: f64::INFINITY,
        }
    }
}

impl TreeStats {
    pub fn update(&mut self, value: f64) {
        self.maximum = self.maximum.max(value);
        self.minimum = self.minimum.min(value);
    }

    /// Scale into [0, 1] once a range is known, identity before that.
    pub fn normalize(&self, value: f64) -> f64 {
        if self.maximum > self.minimum {
            (value - self.minimum) / (self.maximum - self.minimum)
        } else {
            value
        }
    }
}

/// A node in the MCTS search tree.
#[derive(Clone, Debug)]
pub struct TreeNode {
    /// Action leading into this node (`None` at the root)
    pub action: Option<usize>,
    /// Prior probability of selecting this node from its parent
    pub prior: f64,
    pub visit_count: u32,
    /// Sum of playout outcomes, from the perspective of the player who moved into this node
    pub value_sum: f64,
    /// Player to move at this node, set on expansion
    pub to_play: Option<Player>,
    /// Immediate outcome of the move into this node (1 for a winning move)
    pub reward: f64,
    pub children: Vec<TreeNode>,
}

impl TreeNode {
    pub fn new(action: Option<usize>, prior: f64) -> Self {
        Self {
            action,
            prior,
            visit_count: 0,
            value_sum: 0.0,
            to_play: None,
            reward: 0.0,
            children: Vec::new(),
        }
    }

    /// Root node for a position with `to_play` to move.
    pub fn root(to_play: Player) -> Self {
        let mut node = Self::new(None, 1.0);
        node.to_play = Some(to_play);
        node
    }

    #[inline]
    pub fn is_expanded(&self) -> bool {
        !self.children.is_empty()
    }

    /// Mean playout value, 0 for unvisited nodes.
    #[inline]
    pub fn value(&self) -> f64 {
        if self.visit_count == 0 {
            0.0
        } else {
            self.value_sum / self.visit_count as f64
        }
    }

    /// Add one child per action, with priors from a softmax over `logits`.
    ///
    /// Missing or mismatched logits give uniform priors.
    pub fn expand(&mut self, to_play: Player, actions: &[usize], logits: Option<&[f64]>, reward: f64) {
        self.to_play = Some(to_play);
        self.reward = reward;
        let priors = match logits {
            Some(l) if l.len() == actions.len() => softmax(l),
            _ => vec![1.0 / actions.len().max(1) as f64; actions.len()],
        };
        self.children = actions
            .iter()
            .zip(priors)
            .map(|(&a, p)| TreeNode::new(Some(a), p))
            .collect();
    }

    /// Mix Dirichlet noise into the children's priors.
    pub fn add_exploration_noise(&mut self, dirichlet_alpha: f64, exploration_fraction: f64, rng: &mut fastrand::Rng) {
        if self.children.is_empty() {
            return;
        }
        let noise = sample_dirichlet(rng, dirichlet_alpha, self.children.len());
        for (child, n) in self.children.iter_mut().zip(noise) {
            child.prior = child.prior * (1.0 - exploration_fraction) + n * exploration_fraction;
        }
    }
}

/// Supplies prior logits for the actions of a position.
///
/// This is the seam where a trained policy network would plug in.
pub trait PolicyModel: Send {
    fn logits(&self, game: &Game, actions: &[usize]) -> Vec<f64>;
}

/// Equal logits for every action.
#[derive(Debug, Default, Clone, Copy)]
pub struct UniformPolicy;

impl PolicyModel for UniformPolicy {
    fn logits(&self, _game: &Game, actions: &[usize]) -> Vec<f64> {
        vec![0.0; actions.len()]
    }
}

/// Root statistics after a search.
#[derive(Clone, Debug, PartialEq)]
pub struct SearchResult {
    /// Most visited root action
    pub best_action: usize,
    /// `(action, visit_count)` for every root child
    pub visits: Vec<(usize, u32)>,
    /// Mean value of the root for the player to move
    pub root_value: f64,
}

impl SearchResult {
    /// Pick the move to play.
    ///
    /// A non-positive temperature plays the most visited action; otherwise
    /// actions are sampled with probability proportional to `visits^(1/T)`.
    pub fn select_action(&self, temperature: f64, rng: &mut fastrand::Rng) -> usize {
        if temperature <= 0.0 {
            return self.best_action;
        }
        let weights: Vec<f64> = self
            .visits
            .iter()
            .map(|&(_, v)| (v as f64).powf(1.0 / temperature))
            .collect();
        let total: f64 = weights.iter().sum();
        if !total.is_finite() || total <= 0.0 {
            return self.best_action;
        }

        let mut target = rng.f64() * total;
        for (&(action, _), w) in self.visits.iter().zip(&weights) {
            if target < *w {
                return action;
            }
            target -= w;
        }
        self.best_action
    }
}

/// Plain UCB: prior-weighted exploration plus the child's value once visited.
pub fn ucb_score(config: &MctsConfig, child: &TreeNode, parent_visits: u32) -> f64 {
    let prior_score =
        config.ct * child.prior * (parent_visits as f64).sqrt() / (1.0 + child.visit_count as f64);
    if child.visit_count == 0 {
        return prior_score;
    }
    prior_score + child.value()
}

/// MuZero UCB with log-corrected exploration and normalized value.
pub fn muzero_ucb_score(config: &MctsConfig, child: &TreeNode, parent_visits: u32, stats: &TreeStats) -> f64 {
    let n = parent_visits as f64;
    let ucb_frac = n.sqrt() / (1.0 + child.visit_count as f64);
    let log_correction = ((n + config.mu_ct_second + 1.0) / config.mu_ct_second).ln();
    let exploration = child.prior * ucb_frac * (config.mu_ct + log_correction);
    exploration + stats.normalize(child.value())
}

/// The search driver. Owns its configuration, prior model, and RNG.
pub struct Mcts {
    config: MctsConfig,
    policy: Box<dyn PolicyModel>,
    rng: fastrand::Rng,
}

impl Default for Mcts {
    fn default() -> Self {
        Self::new(MctsConfig::default())
    }
}

impl Mcts {
    pub fn new(config: MctsConfig) -> Self {
        Self::with_policy(config, Box::new(UniformPolicy))
    }

    pub fn with_policy(config: MctsConfig, policy: Box<dyn PolicyModel>) -> Self {
        let rng = match config.seed {
            Some(seed) => fastrand::Rng::with_seed(seed),
            None => fastrand::Rng::new(),
        };
        Self { config, policy, rng }
    }

    pub fn config(&self) -> &MctsConfig {
        &self.config
    }

    /// Run the configured number of simulations from `game`.
    pub fn search(&mut self, game: &Game) -> Result<SearchResult> {
        let root = self.build_tree(game)?;
        let best_action = best_action(&root).ok_or(GomokuError::NoValidActions)?;
        log_children(&root, game);

        Ok(SearchResult {
            best_action,
            visits: root
                .children
                .iter()
                .filter_map(|c| c.action.map(|a| (a, c.visit_count)))
                .collect(),
            root_value: -root.value(),
        })
    }

    /// Search and pick the move to play using the configured temperature.
    pub fn choose_action(&mut self, game: &Game) -> Result<usize> {
        let result = self.search(game)?;
        let temperature = if self.config.deterministic {
            0.0
        } else {
            self.config.temperature
        };
        Ok(result.select_action(temperature, &mut self.rng))
    }

    /// Build and return the search tree rooted at `game`.
    pub fn build_tree(&mut self, game: &Game) -> Result<TreeNode> {
        if !game.is_initialised() {
            return Err(GomokuError::GameNotStarted);
        }
        if game.winner().is_some() {
            return Err(GomokuError::GameOver);
        }
        let actions = game.board().valid_actions();
        if actions.is_empty() {
            return Err(GomokuError::NoValidActions);
        }

        let mut root = TreeNode::root(game.current_player());
        let logits = self.policy.logits(game, &actions);
        root.expand(game.current_player(), &actions, Some(logits.as_slice()), 0.0);
        if !self.config.deterministic {
            root.add_exploration_noise(
                self.config.dirichlet_alpha,
                self.config.exploration_fraction,
                &mut self.rng,
            );
        }

        let start = Instant::now();
        let mut stats = TreeStats::default();
        for i in 0..self.config.num_simulations {
            self.simulate(&mut root, game, &mut stats)?;

            // Always finish at least one simulation so there is a move to return
            if self.config.time_limit.is_some_and(|limit| start.elapsed() >= limit) {
                debug!(simulations = i + 1, "search stopped on time limit");
                break;
            }
        }
        Ok(root)
    }

    /// One selection / expansion / playout / backpropagation pass.
    fn simulate(&mut self, root: &mut TreeNode, game: &Game, stats: &mut TreeStats) -> Result<()> {
        let mut scratch = game.clone();
        let path = self.tree_descend(root, &mut scratch, stats)?;

        let leaf = node_at_mut(root, &path);
        let winner = if scratch.is_over() {
            leaf.reward = if scratch.winner().is_some() { 1.0 } else { 0.0 };
            scratch.winner()
        } else {
            let actions = scratch.board().valid_actions();
            let logits = self.policy.logits(&scratch, &actions);
            leaf.expand(scratch.current_player(), &actions, Some(logits.as_slice()), 0.0);
            self.playout(&mut scratch)?
        };

        tree_update(root, &path, winner, stats);
        Ok(())
    }

    /// Descend through expanded nodes, playing each chosen action on `scratch`.
    ///
    /// Returns the path of child indices from the root to the leaf.
    fn tree_descend(&self, root: &TreeNode, scratch: &mut Game, stats: &TreeStats) -> Result<Vec<usize>> {
        let mut path = Vec::new();
        let mut node = root;
        while node.is_expanded() && !scratch.is_over() {
            let idx = self.most_urgent(node, stats);
            let child = &node.children[idx];
            if let Some(action) = child.action {
                scratch.play_action(action)?;
            }
            path.push(idx);
            node = child;
        }
        Ok(path)
    }

    /// Index of the child with the highest UCB score (first one on ties).
    fn most_urgent(&self, node: &TreeNode, stats: &TreeStats) -> usize {
        let mut best_idx = 0;
        let mut best_score = f64::NEG_INFINITY;
        for (i, child) in node.children.iter().enumerate() {
            let score = if self.config.use_muzero {
                muzero_ucb_score(&self.config, child, node.visit_count, stats)
            } else {
                ucb_score(&self.config, child, node.visit_count)
            };
            if score > best_score {
                best_score = score;
                best_idx = i;
            }
        }
        best_idx
    }

    /// Play uniformly random moves until the game ends. Returns the winner.
    fn playout(&mut self, game: &mut Game) -> Result<Option<Player>> {
        let mut actions = game.board().valid_actions();
        self.rng.shuffle(&mut actions);
        for action in actions {
            if game.play_action(action)? {
                break;
            }
        }
        Ok(game.winner())
    }
}

fn node_at_mut<'a>(root: &'a mut TreeNode, path: &[usize]) -> &'a mut TreeNode {
    path.iter().fold(root, |node, &idx| &mut node.children[idx])
}

/// Outcome for the player who moved into a node: +1 win, -1 loss, 0 draw.
fn outcome_for(mover: Option<Player>, winner: Option<Player>) -> f64 {
    match (mover, winner) {
        (Some(m), Some(w)) if m == w => 1.0,
        (Some(_), Some(_)) => -1.0,
        _ => 0.0,
    }
}

/// Propagate a playout result from the root down the visited path.
fn tree_update(root: &mut TreeNode, path: &[usize], winner: Option<Player>, stats: &mut TreeStats) {
    let mut mover = root.to_play.map(Player::opponent);
    let mut node = root;
    node.value_sum += outcome_for(mover, winner);
    node.visit_count += 1;
    stats.update(node.value());

    for &idx in path {
        mover = node.to_play;
        node = &mut node.children[idx];
        node.value_sum += outcome_for(mover, winner);
        node.visit_count += 1;
        stats.update(node.value());
    }
}

/// Most visited child's action (first one on ties).
fn best_action(root: &TreeNode) -> Option<usize> {
    let mut best: Option<&TreeNode> = None;
    for child in &root.children {
        if best.is_none_or(|b| child.visit_count > b.visit_count) {
            best = Some(child);
        }
    }
    best.and_then(|c| c.action)
}

/// Print the most visited root children at debug level.
fn log_children(root: &TreeNode, game: &Game) {
    let size = game.board().size();
    let mut children: Vec<&TreeNode> = root.children.iter().collect();
    children.sort_by(|a, b| b.visit_count.cmp(&a.visit_count));
    for child in children.iter().take(5) {
        if let Some(action) = child.action {
            let pos = GridPosition::from_action(action, size);
            debug!(
                x = pos.x,
                y = pos.y,
                visits = child.visit_count,
                value = child.value(),
                prior = child.prior,
                "root child"
            );
        }
    }
}

fn softmax(logits: &[f64]) -> Vec<f64> {
    let max = logits.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let exps: Vec<f64> = logits.iter().map(|l| (l - max).exp()).collect();
    let sum: f64 = exps.iter().sum();
    exps.into_iter().map(|e| e / sum).collect()
}

// =============================================================================
// Dirichlet sampling
// =============================================================================

/// Standard normal variate (Box-Muller).
fn sample_standard_normal(rng: &mut fastrand::Rng) -> f64 {
    let u1 = 1.0 - rng.f64();
    let u2 = rng.f64();
    (-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos()
}

/// Gamma(shape, 1) variate (Marsaglia-Tsang).
fn sample_gamma(rng: &mut fastrand::Rng, shape: f64) -> f64 {
    if shape < 1.0 {
        let u = 1.0 - rng.f64();
        return sample_gamma(rng, shape + 1.0) * u.powf(1.0 / shape);
    }
    let d = shape - 1.0 / 3.0;
    let c = 1.0 / (9.0 * d).sqrt();
    loop {
        let x = sample_standard_normal(rng);
        let v = (1.0 + c * x).powi(3);
        if v <= 0.0 {
            continue;
        }
        let u = 1.0 - rng.f64();
        if u.ln() < 0.5 * x * x + d - d * v + d * v.ln() {
            return d * v;
        }
    }
}

/// Symmetric Dirichlet(alpha) sample of dimension `n`.
fn sample_dirichlet(rng: &mut fastrand::Rng, alpha: f64, n: usize) -> Vec<f64> {
    let draws: Vec<f64> = (0..n).map(|_| sample_gamma(rng, alpha)).collect();
    let sum: f64 = draws.iter().sum();
    if sum <= 0.0 || !sum.is_finite() {
        return vec![1.0 / n as f64; n];
    }
    draws.into_iter().map(|d| d / sum).collect()
}
