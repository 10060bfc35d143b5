//! The closed set of pond interventions the advisor can recommend.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Number of interventions. Every value row in the policy table has this length.
pub const ACTION_COUNT: usize = 4;

/// Operator intervention applied to the pond for one step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    NoOp = 0,
    Aerate = 1,
    BufferPh = 2,
    DrainAndRefill = 3,
}

impl Action {
    pub const ALL: [Action; ACTION_COUNT] = [
        Action::NoOp,
        Action::Aerate,
        Action::BufferPh,
        Action::DrainAndRefill,
    ];

    /// Column of this action in a value row.
    pub fn index(self) -> usize {
        self as usize
    }

    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }

    /// Human-readable recommendation shown by the chat and the dashboard.
    pub fn label(self) -> &'static str {
        match self {
            Action::NoOp => "Do nothing — conditions are acceptable",
            Action::Aerate => "Aerate the pond — low dissolved oxygen detected",
            Action::BufferPh => "Add chemical buffer — pH is outside safe range",
            Action::DrainAndRefill => "Drain and partially refill pond — severe imbalance",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}
