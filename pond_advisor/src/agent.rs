//! Tabular Q-learning agent trained against the pond simulator.

use rand::{rngs::StdRng, Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument};

use crate::action::{Action, ACTION_COUNT};
use crate::discretizer::{DiscretizedState, Discretizer};
use crate::environment::PondEnvironment;
use crate::policy::PolicyTable;

/// Hyper-parameters for the Q-learning agent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QLearningConfig {
    pub learning_rate: f64,
    pub discount_factor: f64,
    /// Exploration rate. Constant for the whole run.
    pub epsilon: f64,
    pub episodes: usize,
    pub max_steps: usize,
}

impl Default for QLearningConfig {
    fn default() -> Self {
        Self {
            learning_rate: 0.1,
            discount_factor: 0.9,
            epsilon: 0.1,
            episodes: 500,
            max_steps: 50,
        }
    }
}

/// Epsilon-greedy policy chooses the best action with probability 1-eps
/// and a uniformly random action with probability eps.
pub struct EpsilonGreedyPolicy {
    epsilon: f64,
    rng: StdRng,
}

impl EpsilonGreedyPolicy {
    pub fn new(epsilon: f64, rng: StdRng) -> Self {
        Self { epsilon, rng }
    }

    pub fn choose_action(&mut self, table: &PolicyTable, state: &DiscretizedState) -> Action {
        if self.rng.gen::<f64>() < self.epsilon {
            Action::ALL[self.rng.gen_range(0..ACTION_COUNT)]
        } else {
            table.get_or_default(state).best_action()
        }
    }
}

/// One-step Q-learning update of `Q[state][action]`. Returns the new value.
pub fn q_update(
    table: &mut PolicyTable,
    state: DiscretizedState,
    action: Action,
    reward: f64,
    next_state: DiscretizedState,
    learning_rate: f64,
    discount_factor: f64,
) -> f64 {
    let next_max = table.get_or_default(&next_state).max();
    let row = table.row_mut(state);
    let old = row.get(action);
    let new = old + learning_rate * (reward + discount_factor * next_max - old);
    debug_assert!(
        new.is_finite(),
        "non-finite Q-value for {} {:?}: {} -> {}",
        state,
        action,
        old,
        new
    );
    row.set(action, new);
    new
}

/// A single (s, a, r, s', done) step of an episode.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transition {
    pub state: DiscretizedState,
    pub action: Action,
    pub reward: f64,
    pub next_state: DiscretizedState,
    pub done: bool,
}

/// Ordered transitions of one simulated trial.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Episode {
    pub transitions: Vec<Transition>,
}

impl Episode {
    pub fn total_reward(&self) -> f64 {
        self.transitions.iter().map(|t| t.reward).sum()
    }

    pub fn len(&self) -> usize {
        self.transitions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.transitions.is_empty()
    }
}

/// Result of a full training run.
#[derive(Debug, Clone)]
pub struct TrainingOutcome {
    pub table: PolicyTable,
    /// Total reward per episode, in order.
    pub reward_history: Vec<f64>,
}

impl TrainingOutcome {
    /// Mean total reward over the last `window` episodes.
    pub fn trailing_mean(&self, window: usize) -> Option<f64> {
        let n = window.min(self.reward_history.len());
        if n == 0 {
            return None;
        }
        let tail = &self.reward_history[self.reward_history.len() - n..];
        Some(tail.iter().sum::<f64>() / n as f64)
    }
}

/// Tabular Q-learning agent. Owns the table while it trains.
pub struct QLearningAgent {
    config: QLearningConfig,
    discretizer: Discretizer,
    table: PolicyTable,
    policy: EpsilonGreedyPolicy,
}

impl QLearningAgent {
    pub fn new(config: QLearningConfig) -> Self {
        Self::with_rng(config, StdRng::from_entropy())
    }

    /// Agent whose exploration draws are reproducible.
    pub fn with_seed(config: QLearningConfig, seed: u64) -> Self {
        Self::with_rng(config, StdRng::seed_from_u64(seed))
    }

    fn with_rng(config: QLearningConfig, rng: StdRng) -> Self {
        let policy = EpsilonGreedyPolicy::new(config.epsilon, rng);
        Self {
            config,
            discretizer: Discretizer::standard(),
            table: PolicyTable::new(),
            policy,
        }
    }

    /// Continue training from an existing table.
    pub fn with_table(mut self, table: PolicyTable) -> Self {
        self.table = table;
        self
    }

    pub fn config(&self) -> &QLearningConfig {
        &self.config
    }

    pub fn table(&self) -> &PolicyTable {
        &self.table
    }

    pub fn into_table(self) -> PolicyTable {
        self.table
    }

    /// Run one episode, updating the table after every step.
    pub fn run_episode(&mut self, env: &mut PondEnvironment) -> Episode {
        let mut episode = Episode::default();
        let mut state = self.discretizer.discretize(&env.reset());

        for _ in 0..self.config.max_steps {
            self.table.row_mut(state);
            let action = self.policy.choose_action(&self.table, &state);

            let result = env.step(action);
            let next_state = self.discretizer.discretize(&result.state);
            self.table.row_mut(next_state);

            q_update(
                &mut self.table,
                state,
                action,
                result.reward,
                next_state,
                self.config.learning_rate,
                self.config.discount_factor,
            );

            episode.transitions.push(Transition {
                state,
                action,
                reward: result.reward,
                next_state,
                done: result.done,
            });
            state = next_state;

            if result.done {
                break;
            }
        }

        episode
    }

    /// Train for exactly the configured number of episodes.
    #[instrument(skip(self, env), fields(episodes = self.config.episodes))]
    pub fn train(mut self, env: &mut PondEnvironment) -> TrainingOutcome {
        let mut reward_history = Vec::with_capacity(self.config.episodes);

        for episode_index in 0..self.config.episodes {
            let episode = self.run_episode(env);
            let total = episode.total_reward();
            debug!(episode = episode_index, steps = episode.len(), total_reward = total);
            reward_history.push(total);

            if (episode_index + 1) % 100 == 0 {
                info!(
                    "Episode {}: total reward={:.2}, states learned={}",
                    episode_index + 1,
                    total,
                    self.table.len()
                );
            }
        }

        TrainingOutcome {
            table: self.table,
            reward_history,
        }
    }
}
