//! MDP trait definition for the Dyna-Q solver.
//!
//! Any deterministic, finite-horizon decision process that implements
//! [`Mdp`] can be solved with [`DynaQSolver`](crate::dynaq::DynaQSolver).
//! This keeps the learning algorithm free of domain knowledge.

use std::fmt::Debug;
use std::hash::Hash;

/// A deterministic Markov Decision Process.
///
/// States and actions must be cheap to clone and structurally hashable:
/// the solver keys its value table, transition model and predecessor
/// index directly on `(State, Action)` pairs, so two structurally equal
/// states must hash identically regardless of how they were constructed.
///
/// # Example
/// ```ignore
/// struct MyProcess;
///
/// impl Mdp for MyProcess {
///     type State = MyState;
///     type Action = MyAction;
///
///     // ... implement required methods
/// }
/// ```
pub trait Mdp: Clone + Send + Sync {
    /// The state type. Equality and hashing define state identity.
    type State: Clone + Eq + Hash + Debug + Send + Sync;

    /// The action type.
    type Action: Clone + Eq + Hash + Debug + Send + Sync;

    /// The state every episode starts from.
    fn initial_state(&self) -> Self::State;

    /// True when no further actions exist and an episode is complete.
    fn is_terminal(&self, state: &Self::State) -> bool;

    /// Legal actions at a state.
    ///
    /// Returns an empty vector for terminal states. A non-terminal state
    /// may also yield no actions; the solver treats that as episode
    /// truncation, not an error.
    fn actions(&self, state: &Self::State) -> Vec<Self::Action>;

    /// Immediate reward of taking `action` in `state`.
    fn reward(&self, state: &Self::State, action: &Self::Action) -> f64;

    /// Deterministic successor of taking `action` in `state`.
    ///
    /// Must not modify the input state.
    fn transition(&self, state: &Self::State, action: &Self::Action) -> Self::State;

    /// Fallback action for policy extraction when a state has no legal
    /// actions. `None` truncates the extracted policy instead.
    fn default_action(&self, _state: &Self::State) -> Option<Self::Action> {
        None
    }
}
