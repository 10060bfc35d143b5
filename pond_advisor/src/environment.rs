//! Synthetic pond simulator used to train the advisor.
//!
//! The simulator owns one pond's temperature, pH and dissolved-oxygen
//! readings. Each step applies natural drift, then the operator's
//! intervention, then clamps every reading back into its legal bounds.

use rand::{rngs::StdRng, Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::ops::RangeInclusive;

use crate::action::Action;

pub const TEMPERATURE_BOUNDS: RangeInclusive<f64> = 20.0..=35.0;
pub const PH_BOUNDS: RangeInclusive<f64> = 5.5..=9.5;
pub const DISSOLVED_OXYGEN_BOUNDS: RangeInclusive<f64> = 0.0..=10.0;

/// Ideal sub-ranges: a reading inside earns +1 reward.
pub const IDEAL_TEMPERATURE: RangeInclusive<f64> = 26.0..=30.0;
pub const IDEAL_PH: RangeInclusive<f64> = 6.5..=8.0;
pub const IDEAL_DISSOLVED_OXYGEN: RangeInclusive<f64> = 5.0..=10.0;

const TEMPERATURE_TARGET: f64 = 28.0;
const TEMPERATURE_SCALE: f64 = 5.0;
const PH_TARGET: f64 = 7.2;
const PH_SCALE: f64 = 1.5;
const OXYGEN_FLOOR: f64 = 5.0;
const OXYGEN_SCALE: f64 = 3.0;

/// Best achievable per-step reward.
pub const MAX_REWARD: f64 = 3.0;

pub const DEFAULT_EPISODE_LENGTH: usize = 50;

/// One set of pond readings.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ContinuousState {
    /// Water temperature in °C.
    pub temperature: f64,
    pub ph: f64,
    /// Dissolved oxygen in mg/L.
    pub dissolved_oxygen: f64,
}

impl ContinuousState {
    pub fn new(temperature: f64, ph: f64, dissolved_oxygen: f64) -> Self {
        Self {
            temperature,
            ph,
            dissolved_oxygen,
        }
    }

    pub fn as_array(&self) -> [f64; 3] {
        [self.temperature, self.ph, self.dissolved_oxygen]
    }

    /// Clamp every reading into its legal bounds.
    pub fn clamped(self) -> Self {
        Self {
            temperature: clamp_to(self.temperature, &TEMPERATURE_BOUNDS),
            ph: clamp_to(self.ph, &PH_BOUNDS),
            dissolved_oxygen: clamp_to(self.dissolved_oxygen, &DISSOLVED_OXYGEN_BOUNDS),
        }
    }

    pub fn is_within_bounds(&self) -> bool {
        TEMPERATURE_BOUNDS.contains(&self.temperature)
            && PH_BOUNDS.contains(&self.ph)
            && DISSOLVED_OXYGEN_BOUNDS.contains(&self.dissolved_oxygen)
    }
}

fn clamp_to(value: f64, bounds: &RangeInclusive<f64>) -> f64 {
    value.clamp(*bounds.start(), *bounds.end())
}

/// Reward for being in `state`. Depends on nothing but the readings.
pub fn reward(state: &ContinuousState) -> f64 {
    let mut reward = 0.0;

    if IDEAL_TEMPERATURE.contains(&state.temperature) {
        reward += 1.0;
    } else {
        reward -= (state.temperature - TEMPERATURE_TARGET).abs() / TEMPERATURE_SCALE;
    }

    if IDEAL_PH.contains(&state.ph) {
        reward += 1.0;
    } else {
        reward -= (state.ph - PH_TARGET).abs() / PH_SCALE;
    }

    // Excess oxygen is never penalised.
    if state.dissolved_oxygen >= OXYGEN_FLOOR {
        reward += 1.0;
    } else {
        reward -= (OXYGEN_FLOOR - state.dissolved_oxygen) / OXYGEN_SCALE;
    }

    reward
}

/// Magnitude of the natural per-step drift.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Drift {
    /// Temperature moves by U(-t, t).
    pub temperature: f64,
    /// pH moves by U(-p, p).
    pub ph: f64,
    /// Dissolved oxygen always falls, by U(lo, hi).
    pub oxygen_loss: (f64, f64),
}

impl Default for Drift {
    fn default() -> Self {
        Self {
            temperature: 0.2,
            ph: 0.1,
            oxygen_loss: (0.1, 0.3),
        }
    }
}

impl Drift {
    /// No natural drift at all; action effects still apply.
    pub fn none() -> Self {
        Self {
            temperature: 0.0,
            ph: 0.0,
            oxygen_loss: (0.0, 0.0),
        }
    }

    /// Day-scale drift used by the dashboard's "simulate next day".
    pub fn daily() -> Self {
        Self {
            temperature: 0.3,
            ph: 0.2,
            oxygen_loss: (0.1, 0.3),
        }
    }

    /// Apply one draw of drift to `state`. Does not clamp.
    pub fn apply<R: Rng + ?Sized>(&self, state: &mut ContinuousState, rng: &mut R) {
        state.temperature += rng.gen_range(-self.temperature..=self.temperature);
        state.ph += rng.gen_range(-self.ph..=self.ph);
        state.dissolved_oxygen -= rng.gen_range(self.oxygen_loss.0..=self.oxygen_loss.1);
    }
}

/// Apply the direct effect of `action` to `state`. Does not clamp.
pub fn apply_action<R: Rng + ?Sized>(state: &mut ContinuousState, action: Action, rng: &mut R) {
    match action {
        Action::NoOp => {}
        Action::Aerate => {
            state.dissolved_oxygen += 1.0;
            state.temperature += 0.2;
        }
        Action::BufferPh => {
            state.ph += if state.ph < 7.5 { 0.5 } else { -0.5 };
        }
        Action::DrainAndRefill => {
            state.temperature = rng.gen_range(26.0..=28.0);
            state.ph = rng.gen_range(7.0..=7.5);
            state.dissolved_oxygen = rng.gen_range(5.5..=6.5);
        }
    }
}

/// Outcome of a single environment step.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StepResult {
    pub state: ContinuousState,
    pub reward: f64,
    pub done: bool,
}

/// Stateful pond simulator.
pub struct PondEnvironment {
    state: ContinuousState,
    steps: usize,
    episode_length: usize,
    drift: Drift,
    rng: StdRng,
}

impl PondEnvironment {
    pub fn new() -> Self {
        Self::with_rng(StdRng::from_entropy())
    }

    /// Environment whose drift and resets are reproducible.
    pub fn with_seed(seed: u64) -> Self {
        Self::with_rng(StdRng::seed_from_u64(seed))
    }

    fn with_rng(mut rng: StdRng) -> Self {
        let state = Self::draw_initial_state(&mut rng);
        Self {
            state,
            steps: 0,
            episode_length: DEFAULT_EPISODE_LENGTH,
            drift: Drift::default(),
            rng,
        }
    }

    pub fn with_drift(mut self, drift: Drift) -> Self {
        self.drift = drift;
        self
    }

    pub fn with_episode_length(mut self, episode_length: usize) -> Self {
        self.episode_length = episode_length;
        self
    }

    fn draw_initial_state(rng: &mut StdRng) -> ContinuousState {
        ContinuousState {
            temperature: rng.gen_range(25.0..=32.0),
            ph: rng.gen_range(6.0..=9.0),
            dissolved_oxygen: rng.gen_range(3.0..=7.0),
        }
    }

    /// Start a new episode from a random comfortable state.
    pub fn reset(&mut self) -> ContinuousState {
        self.state = Self::draw_initial_state(&mut self.rng);
        self.steps = 0;
        self.state
    }

    /// Place the pond at an exact state, e.g. to replay a known scenario.
    /// The step counter is left untouched.
    pub fn set_state(&mut self, state: ContinuousState) {
        self.state = state.clamped();
    }

    pub fn state(&self) -> ContinuousState {
        self.state
    }

    pub fn steps(&self) -> usize {
        self.steps
    }

    /// Advance the pond by one step under `action`.
    pub fn step(&mut self, action: Action) -> StepResult {
        self.drift.apply(&mut self.state, &mut self.rng);
        apply_action(&mut self.state, action, &mut self.rng);
        self.state = self.state.clamped();

        self.steps += 1;
        StepResult {
            state: self.state,
            reward: reward(&self.state),
            done: self.steps >= self.episode_length,
        }
    }
}

impl Default for PondEnvironment {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const EPS: f64 = 1e-9;

    #[test]
    fn test_reset_draws_comfortable_state() {
        let mut env = PondEnvironment::with_seed(7);
        for _ in 0..200 {
            let s = env.reset();
            assert!((25.0..=32.0).contains(&s.temperature));
            assert!((6.0..=9.0).contains(&s.ph));
            assert!((3.0..=7.0).contains(&s.dissolved_oxygen));
            assert_eq!(env.steps(), 0);
        }
    }

    #[test]
    fn test_ideal_state_earns_max_reward() {
        let mut env = PondEnvironment::with_seed(1).with_drift(Drift::none());
        env.reset();
        env.set_state(ContinuousState::new(28.0, 7.2, 6.0));

        let result = env.step(Action::NoOp);
        assert_eq!(result.state, ContinuousState::new(28.0, 7.2, 6.0));
        assert!(result.state.is_within_bounds());
        assert!((result.reward - MAX_REWARD).abs() < EPS);
        assert!(!result.done);
    }

    #[test]
    fn test_aerate_raises_oxygen_and_temperature() {
        let mut rng = StdRng::seed_from_u64(0);
        let mut state = ContinuousState::new(20.0, 7.0, 2.0);
        apply_action(&mut state, Action::Aerate, &mut rng);
        assert!((state.dissolved_oxygen - 3.0).abs() < EPS);
        assert!((state.temperature - 20.2).abs() < EPS);
        assert!((state.ph - 7.0).abs() < EPS);

        let mut env = PondEnvironment::with_seed(0).with_drift(Drift::none());
        env.set_state(ContinuousState::new(20.0, 7.0, 2.0));
        let result = env.step(Action::Aerate);
        assert!((result.state.dissolved_oxygen - 3.0).abs() < EPS);
        assert!((result.state.temperature - 20.2).abs() < EPS);
    }

    #[test]
    fn test_buffer_nudges_ph_toward_neutral() {
        let mut rng = StdRng::seed_from_u64(0);
        let mut acidic = ContinuousState::new(28.0, 6.0, 6.0);
        apply_action(&mut acidic, Action::BufferPh, &mut rng);
        assert!((acidic.ph - 6.5).abs() < EPS);

        let mut alkaline = ContinuousState::new(28.0, 8.5, 6.0);
        apply_action(&mut alkaline, Action::BufferPh, &mut rng);
        assert!((alkaline.ph - 8.0).abs() < EPS);

        // 7.5 itself is on the "high" side.
        let mut edge = ContinuousState::new(28.0, 7.5, 6.0);
        apply_action(&mut edge, Action::BufferPh, &mut rng);
        assert!((edge.ph - 7.0).abs() < EPS);
    }

    #[test]
    fn test_drain_and_refill_resets_near_ideal() {
        let mut env = PondEnvironment::with_seed(3).with_drift(Drift::none());
        env.set_state(ContinuousState::new(34.0, 9.4, 0.5));
        let result = env.step(Action::DrainAndRefill);
        assert!((26.0..=28.0).contains(&result.state.temperature));
        assert!((7.0..=7.5).contains(&result.state.ph));
        assert!((5.5..=6.5).contains(&result.state.dissolved_oxygen));
        assert!((result.reward - MAX_REWARD).abs() < EPS);
    }

    #[test]
    fn test_episode_ends_after_fifty_steps() {
        let mut env = PondEnvironment::with_seed(11);
        env.reset();
        for i in 1..=DEFAULT_EPISODE_LENGTH {
            let result = env.step(Action::NoOp);
            assert_eq!(result.done, i == DEFAULT_EPISODE_LENGTH);
        }
        env.reset();
        assert_eq!(env.steps(), 0);
    }

    #[test]
    fn test_reward_penalties() {
        // Only temperature out of range: 2 - |34 - 28| / 5
        let r = reward(&ContinuousState::new(34.0, 7.0, 6.0));
        assert!((r - (2.0 - 6.0 / 5.0)).abs() < EPS);

        // Only pH out of range: 2 - |5.7 - 7.2| / 1.5
        let r = reward(&ContinuousState::new(28.0, 5.7, 6.0));
        assert!((r - (2.0 - 1.5 / 1.5)).abs() < EPS);

        // Only oxygen low: 2 - (5 - 2) / 3
        let r = reward(&ContinuousState::new(28.0, 7.0, 2.0));
        assert!((r - 1.0).abs() < EPS);

        // Lots of oxygen is fine.
        let r = reward(&ContinuousState::new(28.0, 7.0, 10.0));
        assert!((r - MAX_REWARD).abs() < EPS);
    }

    proptest! {
        #[test]
        fn prop_step_keeps_state_in_bounds(
            seed in any::<u64>(),
            t in 20.0f64..=35.0,
            p in 5.5f64..=9.5,
            o in 0.0f64..=10.0,
            actions in proptest::collection::vec(0usize..4, 1..60),
        ) {
            let mut env = PondEnvironment::with_seed(seed);
            env.set_state(ContinuousState::new(t, p, o));
            for a in actions {
                let result = env.step(Action::from_index(a).unwrap());
                prop_assert!(result.state.is_within_bounds());
            }
        }

        #[test]
        fn prop_reward_never_exceeds_max(
            t in -100.0f64..100.0,
            p in -20.0f64..20.0,
            o in -20.0f64..20.0,
        ) {
            prop_assert!(reward(&ContinuousState::new(t, p, o)) <= MAX_REWARD);
        }
    }
}
