//! Inference over a persisted policy table.

use anyhow::{anyhow, Result};
use std::path::Path;
use tracing::{info, instrument};

use crate::action::Action;
use crate::discretizer::{DiscretizedState, Discretizer};
use crate::environment::ContinuousState;
use crate::policy::PolicyTable;

/// Answer to a recommendation request.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Recommendation {
    Act {
        action: Action,
        state: DiscretizedState,
    },
    /// The readings bin to a state the agent never visited during training.
    UnknownCondition { state: DiscretizedState },
}

impl Recommendation {
    pub fn action(&self) -> Option<Action> {
        match self {
            Recommendation::Act { action, .. } => Some(*action),
            Recommendation::UnknownCondition { .. } => None,
        }
    }

    pub fn state(&self) -> DiscretizedState {
        match self {
            Recommendation::Act { state, .. } | Recommendation::UnknownCondition { state } => {
                *state
            }
        }
    }
}

/// Read-only policy lookup. Safe to share between any number of readers.
#[derive(Debug, Clone)]
pub struct Advisor {
    table: PolicyTable,
    discretizer: Discretizer,
}

impl Advisor {
    pub fn new(table: PolicyTable) -> Self {
        Self {
            table,
            discretizer: Discretizer::standard(),
        }
    }

    /// Load the policy written by training. Missing or corrupt files are fatal.
    #[instrument]
    pub fn load(path: &Path) -> Result<Self> {
        let discretizer = Discretizer::standard();
        let table = PolicyTable::load(path, &discretizer)?;
        info!(states = table.len(), "Advisor loaded policy from {:?}", path);
        Ok(Self { table, discretizer })
    }

    pub fn table(&self) -> &PolicyTable {
        &self.table
    }

    pub fn recommend(&self, readings: &ContinuousState) -> Recommendation {
        let state = self.discretizer.discretize(readings);
        match self.table.get(&state) {
            Some(row) => Recommendation::Act {
                action: row.best_action(),
                state,
            },
            None => Recommendation::UnknownCondition { state },
        }
    }
}

/// Raw readings as typed by a user, before validation.
#[derive(Debug, Clone)]
pub struct RawReadings<'a> {
    pub temperature: &'a str,
    pub ph: &'a str,
    pub dissolved_oxygen: &'a str,
}

impl RawReadings<'_> {
    /// Parse all three readings; a single bad field rejects the request.
    pub fn parse(&self) -> Result<ContinuousState> {
        Ok(ContinuousState::new(
            parse_reading("temperature", self.temperature)?,
            parse_reading("pH", self.ph)?,
            parse_reading("dissolved oxygen", self.dissolved_oxygen)?,
        ))
    }
}

/// Parse one numeric reading. Rejects text, NaN and infinities.
pub fn parse_reading(name: &str, raw: &str) -> Result<f64> {
    let raw = raw.trim();
    let value: f64 = raw.parse().map_err(|_| {
        anyhow!("Invalid {} reading {:?}: please enter a numeric value", name, raw)
    })?;
    if !value.is_finite() {
        return Err(anyhow!("Invalid {} reading {:?}: value must be finite", name, raw));
    }
    Ok(value)
}

/// Check that `readings` are finite, for callers that already hold numbers.
pub fn validate_readings(readings: &ContinuousState) -> Result<()> {
    let names = ["temperature", "pH", "dissolved oxygen"];
    for (name, value) in names.iter().zip(readings.as_array()) {
        if !value.is_finite() {
            return Err(anyhow!("Invalid {} reading: value must be finite", name));
        }
    }
    Ok(())
}
