//! Binning of continuous readings into policy-table keys.
//!
//! Training and inference must bin identically, so the edge configuration is
//! versioned and persisted next to every policy table.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::environment::ContinuousState;

/// Bump whenever the edges of [`Discretizer::standard`] change.
pub const DISCRETIZER_VERSION: u32 = 1;

/// Bucket indices for (temperature, pH, dissolved oxygen).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct DiscretizedState(pub [u8; 3]);

impl DiscretizedState {
    pub fn new(temperature: u8, ph: u8, dissolved_oxygen: u8) -> Self {
        Self([temperature, ph, dissolved_oxygen])
    }
}

impl fmt::Display for DiscretizedState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [t, p, o] = self.0;
        write!(f, "({}, {}, {})", t, p, o)
    }
}

/// `n` evenly spaced points from `start` to `stop`, both included.
pub fn linspace(start: f64, stop: f64, n: usize) -> Vec<f64> {
    match n {
        0 => Vec::new(),
        1 => vec![start],
        _ => {
            let step = (stop - start) / (n - 1) as f64;
            let mut points: Vec<f64> = (0..n).map(|i| start + i as f64 * step).collect();
            points[n - 1] = stop;
            points
        }
    }
}

/// Fixed, monotonically increasing bin edges for each reading.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Discretizer {
    pub version: u32,
    pub temperature: Vec<f64>,
    pub ph: Vec<f64>,
    pub dissolved_oxygen: Vec<f64>,
}

impl Discretizer {
    /// The edges every trained table uses.
    pub fn standard() -> Self {
        Self {
            version: DISCRETIZER_VERSION,
            temperature: linspace(20.0, 35.0, 6),
            ph: linspace(5.5, 9.5, 5),
            dissolved_oxygen: linspace(0.0, 10.0, 6),
        }
    }

    pub fn edges(&self) -> [&[f64]; 3] {
        [&self.temperature, &self.ph, &self.dissolved_oxygen]
    }

    /// Number of distinct buckets per reading (edge count + 1).
    pub fn bucket_counts(&self) -> [usize; 3] {
        self.edges().map(|e| e.len() + 1)
    }

    /// Map readings to their bucket key. A value exactly on an edge lands in
    /// the bucket to the right of it.
    pub fn discretize(&self, state: &ContinuousState) -> DiscretizedState {
        let values = state.as_array();
        let edges = self.edges();
        let mut key = [0u8; 3];
        for (slot, (value, edges)) in key.iter_mut().zip(values.iter().zip(edges)) {
            *slot = bucket(*value, edges);
        }
        DiscretizedState(key)
    }

    /// Whether `key` could have been produced by this discretizer.
    pub fn contains(&self, key: &DiscretizedState) -> bool {
        key.0
            .iter()
            .zip(self.bucket_counts())
            .all(|(&k, count)| (k as usize) < count)
    }
}

impl Default for Discretizer {
    fn default() -> Self {
        Self::standard()
    }
}

fn bucket(value: f64, edges: &[f64]) -> u8 {
    edges.partition_point(|edge| *edge <= value) as u8
}
