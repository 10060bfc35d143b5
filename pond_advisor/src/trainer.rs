//! Offline training run: simulate, learn, persist.

use anyhow::Result;
use std::path::PathBuf;
use std::time::Instant;
use tracing::{info, instrument};

use crate::agent::{QLearningAgent, TrainingOutcome};
use crate::diagnostics::write_reward_history;
use crate::discretizer::Discretizer;
use crate::environment::PondEnvironment;
use crate::settings::TrainingConfig;

/// Where a training run writes its artifacts.
#[derive(Debug, Clone)]
pub struct TrainingOutputs {
    pub policy: PathBuf,
    pub reward_history: Option<PathBuf>,
}

/// Simulator for a training run. Episodes end after `max_steps` steps.
fn build_environment(config: &TrainingConfig) -> PondEnvironment {
    let env = match config.environment_seed {
        Some(seed) => PondEnvironment::with_seed(seed),
        None => PondEnvironment::new(),
    };
    env.with_episode_length(config.max_steps)
}

fn build_agent(config: &TrainingConfig) -> QLearningAgent {
    match config.exploration_seed {
        Some(seed) => QLearningAgent::with_seed(config.q_learning(), seed),
        None => QLearningAgent::new(config.q_learning()),
    }
}

/// Train in memory. Environment and exploration use independent RNGs.
pub fn train(config: &TrainingConfig) -> TrainingOutcome {
    let mut env = build_environment(config);
    build_agent(config).train(&mut env)
}

/// Train, then write the policy table and reward history.
#[instrument(skip(config))]
pub fn train_and_save(
    config: &TrainingConfig,
    outputs: &TrainingOutputs,
) -> Result<TrainingOutcome> {
    info!(
        episodes = config.episodes,
        alpha = config.learning_rate,
        gamma = config.discount_factor,
        epsilon = config.epsilon,
        "Starting training"
    );
    let started = Instant::now();

    let outcome = train(config);

    info!(
        "Training complete in {:.2?}: {} states learned, mean reward over last 50 episodes {:.2}",
        started.elapsed(),
        outcome.table.len(),
        outcome.trailing_mean(50).unwrap_or_default()
    );

    save_outcome(&outcome, outputs)?;
    Ok(outcome)
}

fn save_outcome(outcome: &TrainingOutcome, outputs: &TrainingOutputs) -> Result<()> {
    outcome
        .table
        .save(&outputs.policy, &Discretizer::standard())?;
    if let Some(path) = outputs.reward_history.as_deref() {
        write_reward_history(path, &outcome.reward_history)?;
    }
    Ok(())
}
