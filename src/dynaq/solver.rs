//! Dyna-Q solver with prioritized sweeping.
//!
//! One real ε-greedy step per iteration feeds a deterministic transition
//! model; planning then drains a priority queue of `(state, action)`
//! pairs ordered by absolute TD error, rippling updates backwards
//! through recorded predecessors. Training stops early when two
//! consecutive greedy evaluation checkpoints round to the same average
//! return.

use std::time::Instant;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rustc_hash::FxHashSet;

use super::config::{DynaQConfig, SolverStats, DISCOUNT};
use super::mdp::Mdp;
use super::storage::{PredecessorIndex, PriorityQueue, TransitionModel, ValueTable};

/// Tabular Dyna-Q learner over an [`Mdp`].
///
/// Each instance owns its value table, model and queue; instances never
/// share state, so replicas of the same process can train concurrently
/// without synchronization.
pub struct DynaQSolver<M: Mdp> {
    mdp: M,
    config: DynaQConfig,
    values: ValueTable<M::State, M::Action>,
    model: TransitionModel<M::State, M::Action>,
    predecessors: PredecessorIndex<M::State, M::Action>,
    queue: PriorityQueue<(M::State, M::Action)>,
    initial_states: FxHashSet<M::State>,
    rng: StdRng,
    stats: SolverStats,
}

impl<M: Mdp> DynaQSolver<M> {
    /// Create a solver for the given process.
    pub fn new(mdp: M, config: DynaQConfig) -> Self {
        let rng = StdRng::seed_from_u64(config.seed);
        let mut initial_states = FxHashSet::default();
        initial_states.insert(mdp.initial_state());
        Self {
            mdp,
            config,
            values: ValueTable::new(),
            model: TransitionModel::new(),
            predecessors: PredecessorIndex::new(),
            queue: PriorityQueue::new(),
            initial_states,
            rng,
            stats: SolverStats::new(),
        }
    }

    /// Train until the episode budget runs out or evaluation converges.
    pub fn solve(&mut self) {
        self.solve_with_callback(|_| {});
    }

    /// Like [`solve`](Self::solve), invoking `checkpoint` with the
    /// average greedy return after each evaluation.
    pub fn solve_with_callback<F>(&mut self, mut checkpoint: F)
    where
        F: FnMut(f64),
    {
        let start = Instant::now();
        let factor = self.config.convergence_factor();
        let mut previous_return = 0.0;

        for episode in 1..=self.config.episodes {
            self.run_episode();
            self.stats.episodes = episode;

            if episode % self.config.eval_interval != 0 {
                continue;
            }
            let average = self.evaluate();
            checkpoint(average);
            self.stats.last_return = Some(average);

            if (previous_return * factor).round() == (average * factor).round() {
                self.stats.converged = true;
                break;
            }
            previous_return = average;
        }

        self.stats.state_actions = self.values.len();
        self.stats.elapsed_seconds = start.elapsed().as_secs_f64();
        self.stats.update_rate();
    }

    /// One ε-greedy episode with prioritized sweeping after every step.
    fn run_episode(&mut self) {
        let mut state = self.mdp.initial_state();

        for _ in 0..self.config.max_episode_steps {
            if self.mdp.is_terminal(&state) {
                break;
            }
            let actions = self.mdp.actions(&state);
            if actions.is_empty() {
                // Dead end; the episode simply truncates here.
                break;
            }

            let action = self.select_action(&state, &actions);
            let reward = self.mdp.reward(&state, &action);
            let next = self.mdp.transition(&state, &action);

            self.model
                .record(state.clone(), action.clone(), next.clone(), reward);
            self.predecessors
                .register(next.clone(), state.clone(), action.clone());

            let td = self.td_error(&state, &action, &next, reward);
            self.queue.push((state.clone(), action.clone()), td.abs());
            self.sweep();

            state = next;
        }
    }

    /// Drain the planning queue, updating values and rippling surprise
    /// backwards to recorded predecessors.
    fn sweep(&mut self) {
        while let Some(((state, action), _)) = self.queue.pop() {
            let Some((next, reward)) = self.model.get(&(state.clone(), action.clone())).cloned()
            else {
                continue;
            };

            let target = reward + DISCOUNT * self.best_value(&next);
            let q = self.values.get(&state, &action);
            self.values
                .set(state.clone(), action.clone(), q + self.config.learning_rate * (target - q));

            // Episode-initial states have no predecessors worth visiting.
            if self.initial_states.contains(&state) {
                continue;
            }
            let Some(preds) = self.predecessors.get(&state) else {
                continue;
            };
            let candidates: Vec<(M::State, M::Action)> = preds.iter().cloned().collect();
            for key in candidates {
                let Some((pred_next, pred_reward)) = self.model.get(&key).cloned() else {
                    continue;
                };
                let td = pred_reward + DISCOUNT * self.best_value(&pred_next)
                    - self.values.get_key(&key);
                if td.abs() > self.config.priority_threshold {
                    self.queue.push(key, td.abs());
                }
            }
        }
    }

    /// TD error of one observed step against the current table.
    fn td_error(&self, state: &M::State, action: &M::Action, next: &M::State, reward: f64) -> f64 {
        reward + DISCOUNT * self.best_value(next) - self.values.get(state, action)
    }

    /// Max action value at a state, 0.0 for terminal or actionless states.
    fn best_value(&self, state: &M::State) -> f64 {
        self.mdp
            .actions(state)
            .iter()
            .map(|a| self.values.get(state, a))
            .fold(None, |best: Option<f64>, v| {
                Some(best.map_or(v, |b| b.max(v)))
            })
            .unwrap_or(0.0)
    }

    /// ε-greedy action selection. Greedy ties break to the first action
    /// in declaration order, which keeps runs reproducible.
    fn select_action(&mut self, state: &M::State, actions: &[M::Action]) -> M::Action {
        if self.rng.gen::<f64>() < self.config.exploration {
            let i = self.rng.gen_range(0..actions.len());
            return actions[i].clone();
        }
        greedy_action(&self.values, state, actions)
    }

    /// Average return of greedy rollouts from the initial state.
    fn evaluate(&self) -> f64 {
        let total: f64 = (0..self.config.eval_trajectories)
            .map(|_| self.rollout_return())
            .sum();
        total / self.config.eval_trajectories as f64
    }

    /// Undiscounted return of one greedy rollout.
    fn rollout_return(&self) -> f64 {
        let mut state = self.mdp.initial_state();
        let mut total = 0.0;
        for _ in 0..self.config.max_episode_steps {
            if self.mdp.is_terminal(&state) {
                break;
            }
            let actions = self.mdp.actions(&state);
            if actions.is_empty() {
                break;
            }
            let action = greedy_action(&self.values, &state, &actions);
            total += self.mdp.reward(&state, &action);
            state = self.mdp.transition(&state, &action);
        }
        total
    }

    /// Greedy action sequence from the initial state under the learned
    /// table. See [`greedy_policy`] for extraction from a merged table.
    pub fn extract_policy(&self) -> Vec<M::Action> {
        greedy_policy(&self.mdp, &self.values)
    }

    /// The learned value table.
    pub fn values(&self) -> &ValueTable<M::State, M::Action> {
        &self.values
    }

    /// Consume the solver, yielding its value table.
    pub fn into_values(self) -> ValueTable<M::State, M::Action> {
        self.values
    }

    /// Training statistics.
    pub fn stats(&self) -> &SolverStats {
        &self.stats
    }
}

/// Greedy walk from the initial state under `values`.
///
/// States with no legal actions fall back to the process's
/// [`default_action`](Mdp::default_action); the walk stops when neither
/// exists or on reaching a terminal state.
pub fn greedy_policy<M: Mdp>(mdp: &M, values: &ValueTable<M::State, M::Action>) -> Vec<M::Action> {
    let mut policy = Vec::new();
    let mut state = mdp.initial_state();
    // Bounded by the state space in practice; the cap guards cyclic processes.
    for _ in 0..100_000 {
        if mdp.is_terminal(&state) {
            break;
        }
        let actions = mdp.actions(&state);
        let action = if actions.is_empty() {
            match mdp.default_action(&state) {
                Some(a) => a,
                None => break,
            }
        } else {
            greedy_action(values, &state, &actions)
        };
        state = mdp.transition(&state, &action);
        policy.push(action);
    }
    policy
}

/// Highest-valued action; ties break to the earliest in the slice.
fn greedy_action<S, A>(values: &ValueTable<S, A>, state: &S, actions: &[A]) -> A
where
    S: Clone + Eq + std::hash::Hash,
    A: Clone + Eq + std::hash::Hash,
{
    let mut best = &actions[0];
    let mut best_value = values.get(state, best);
    for action in &actions[1..] {
        let value = values.get(state, action);
        if value > best_value {
            best = action;
            best_value = value;
        }
    }
    best.clone()
}
