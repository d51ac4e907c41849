//! Configuration options for the Dyna-Q solver.
//!
//! All learning parameters are externally settable; the defaults are the
//! calibrated values the reference policies were produced with. Only the
//! discount factor is fixed.

use serde::{Deserialize, Serialize};

/// Discount factor γ of the value updates. Fixed by design: the reward
/// model's constants are tuned against it.
pub const DISCOUNT: f64 = 0.99;

/// Configuration for [`DynaQSolver`](crate::dynaq::DynaQSolver).
///
/// # Example
/// ```
/// use fingering_solver::dynaq::DynaQConfig;
///
/// let config = DynaQConfig::default().with_seed(7).with_episodes(2_000);
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DynaQConfig {
    /// Episode budget per solver instance.
    pub episodes: u32,

    /// Hard cap on steps within one episode.
    pub max_episode_steps: u32,

    /// Learning rate α of the Q-update.
    pub learning_rate: f64,

    /// ε of the ε-greedy behavior policy: probability of choosing a
    /// uniformly random action during training.
    pub exploration: f64,

    /// Seed of the pseudo-random exploration sequence. The solver never
    /// reads platform entropy: identical seed, input and configuration
    /// yield bit-identical value tables and policies.
    pub seed: u64,

    /// Episodes between greedy evaluation checkpoints.
    pub eval_interval: u32,

    /// Greedy rollouts averaged per evaluation checkpoint.
    pub eval_trajectories: u32,

    /// Threshold θ a predecessor's TD error must exceed to be re-queued
    /// during prioritized sweeping.
    pub priority_threshold: f64,

    /// Decimal places the checkpoint average is rounded to before the
    /// convergence comparison.
    pub convergence_decimals: u32,
}

impl Default for DynaQConfig {
    fn default() -> Self {
        Self {
            episodes: 10_000,
            max_episode_steps: 100,
            learning_rate: 0.99,
            exploration: 0.8,
            seed: 42,
            eval_interval: 300,
            eval_trajectories: 20,
            priority_threshold: 3.0,
            convergence_decimals: 1,
        }
    }
}

impl DynaQConfig {
    /// Create a configuration with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder method: set the episode budget.
    pub fn with_episodes(mut self, episodes: u32) -> Self {
        self.episodes = episodes;
        self
    }

    /// Builder method: set the per-episode step cap.
    pub fn with_max_episode_steps(mut self, steps: u32) -> Self {
        self.max_episode_steps = steps;
        self
    }

    /// Builder method: set the learning rate.
    pub fn with_learning_rate(mut self, rate: f64) -> Self {
        self.learning_rate = rate;
        self
    }

    /// Builder method: set the exploration probability.
    pub fn with_exploration(mut self, exploration: f64) -> Self {
        self.exploration = exploration.clamp(0.0, 1.0);
        self
    }

    /// Builder method: set the random seed.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Builder method: set the evaluation interval.
    pub fn with_eval_interval(mut self, interval: u32) -> Self {
        self.eval_interval = interval;
        self
    }

    /// Builder method: set the sweeping priority threshold.
    pub fn with_priority_threshold(mut self, theta: f64) -> Self {
        self.priority_threshold = theta;
        self
    }

    /// Validate the configuration and return any errors.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.episodes == 0 {
            return Err(ConfigError::ZeroEpisodes);
        }
        if self.max_episode_steps == 0 {
            return Err(ConfigError::ZeroEpisodeSteps);
        }
        if self.eval_interval == 0 || self.eval_trajectories == 0 {
            return Err(ConfigError::ZeroEvalInterval);
        }
        if !(0.0..=1.0).contains(&self.exploration) {
            return Err(ConfigError::InvalidExploration(self.exploration));
        }
        if !(self.learning_rate > 0.0 && self.learning_rate <= 1.0) {
            return Err(ConfigError::InvalidLearningRate(self.learning_rate));
        }
        if self.priority_threshold < 0.0 {
            return Err(ConfigError::InvalidThreshold(self.priority_threshold));
        }
        Ok(())
    }

    /// Rounding factor of the convergence comparison.
    pub(crate) fn convergence_factor(&self) -> f64 {
        10f64.powi(self.convergence_decimals as i32)
    }
}

/// Errors that can occur when validating solver configuration.
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigError {
    /// Episode budget is zero.
    ZeroEpisodes,
    /// Per-episode step cap is zero.
    ZeroEpisodeSteps,
    /// Evaluation interval or trajectory count is zero.
    ZeroEvalInterval,
    /// Exploration probability is out of range [0, 1].
    InvalidExploration(f64),
    /// Learning rate is out of range (0, 1].
    InvalidLearningRate(f64),
    /// Priority threshold is negative.
    InvalidThreshold(f64),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::ZeroEpisodes => write!(f, "episode budget must be positive"),
            ConfigError::ZeroEpisodeSteps => write!(f, "episode step cap must be positive"),
            ConfigError::ZeroEvalInterval => {
                write!(f, "evaluation interval and trajectory count must be positive")
            }
            ConfigError::InvalidExploration(v) => {
                write!(f, "exploration probability {} is out of range [0, 1]", v)
            }
            ConfigError::InvalidLearningRate(v) => {
                write!(f, "learning rate {} is out of range (0, 1]", v)
            }
            ConfigError::InvalidThreshold(v) => {
                write!(f, "priority threshold {} must be non-negative", v)
            }
        }
    }
}

impl std::error::Error for ConfigError {}

/// Statistics tracked during a solve.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SolverStats {
    /// Episodes actually run (may stop short of the budget).
    pub episodes: u32,

    /// Number of `(state, action)` pairs in the value table.
    pub state_actions: usize,

    /// Whether two consecutive checkpoints agreed before the budget ran out.
    pub converged: bool,

    /// Average greedy return at the last evaluation checkpoint.
    pub last_return: Option<f64>,

    /// Total time spent training, in seconds.
    pub elapsed_seconds: f64,

    /// Training speed.
    pub episodes_per_second: f64,
}

impl SolverStats {
    /// Create new empty stats.
    pub fn new() -> Self {
        Self::default()
    }

    /// Update episodes per second from elapsed time.
    pub fn update_rate(&mut self) {
        if self.elapsed_seconds > 0.0 {
            self.episodes_per_second = self.episodes as f64 / self.elapsed_seconds;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        assert!(DynaQConfig::default().validate().is_ok());
    }

    #[test]
    fn invalid_exploration_is_rejected() {
        let mut config = DynaQConfig::default();
        config.exploration = 1.5;
        assert_eq!(
            config.validate(),
            Err(ConfigError::InvalidExploration(1.5))
        );
    }

    #[test]
    fn zero_episode_budget_is_rejected() {
        let config = DynaQConfig::default().with_episodes(0);
        assert_eq!(config.validate(), Err(ConfigError::ZeroEpisodes));
    }
}
