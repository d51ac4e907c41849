//! Generic Dyna-Q reinforcement learning over deterministic MDPs.
//!
//! The solver is domain-agnostic: implement [`Mdp`] for any
//! deterministic, finite-horizon decision process and
//! [`DynaQSolver`] will learn a value table for it. Prioritized
//! sweeping makes planning effort proportional to surprise rather
//! than to the size of the model.

pub mod config;
pub mod mdp;
pub mod solver;
pub mod storage;

pub use config::{ConfigError, DynaQConfig, SolverStats, DISCOUNT};
pub use mdp::Mdp;
pub use solver::{greedy_policy, DynaQSolver};
pub use storage::{PredecessorIndex, PriorityQueue, TransitionModel, ValueTable};
