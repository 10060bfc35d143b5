//! Pond Advisor - Core Library
//!
//! Learns a tabular Q-learning policy for catfish pond water management
//! against a synthetic pond simulator, and serves it to a terminal chat and
//! a dashboard API.

pub mod action;
pub mod advisor;
pub mod agent;
pub mod assessment;
pub mod chat;
pub mod cli;
pub mod diagnostics;
pub mod discretizer;
pub mod environment;
pub mod policy;
pub mod server;
pub mod settings;
pub mod telemetry;
pub mod trainer;

pub use action::Action;
pub use advisor::{Advisor, Recommendation};
pub use agent::{QLearningAgent, QLearningConfig};
pub use discretizer::{DiscretizedState, Discretizer};
pub use environment::{ContinuousState, PondEnvironment};
pub use policy::{ActionValueRow, PolicyTable};
