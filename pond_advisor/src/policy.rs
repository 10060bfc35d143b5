//! The learned policy table and its on-disk form.

use anyhow::{anyhow, bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::Path;
use tracing::{debug, info, instrument};

use crate::action::{Action, ACTION_COUNT};
use crate::discretizer::{DiscretizedState, Discretizer};

/// Bump whenever the JSON layout below changes.
pub const POLICY_FORMAT_VERSION: u32 = 1;

/// One estimated long-run value per action.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ActionValueRow(pub [f64; ACTION_COUNT]);

impl ActionValueRow {
    pub fn zeros() -> Self {
        Self([0.0; ACTION_COUNT])
    }

    pub fn get(&self, action: Action) -> f64 {
        self.0[action.index()]
    }

    pub fn set(&mut self, action: Action, value: f64) {
        self.0[action.index()] = value;
    }

    pub fn max(&self) -> f64 {
        self.0.iter().copied().fold(f64::NEG_INFINITY, f64::max)
    }

    /// Highest-valued action; ties go to the lowest index.
    pub fn best_action(&self) -> Action {
        let mut best = 0;
        for (i, value) in self.0.iter().enumerate().skip(1) {
            if *value > self.0[best] {
                best = i;
            }
        }
        Action::ALL[best]
    }
}

/// Sparse mapping from visited states to their action values.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PolicyTable {
    rows: HashMap<DiscretizedState, ActionValueRow>,
}

impl PolicyTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn contains(&self, state: &DiscretizedState) -> bool {
        self.rows.contains_key(state)
    }

    pub fn get(&self, state: &DiscretizedState) -> Option<&ActionValueRow> {
        self.rows.get(state)
    }

    /// Row for `state`, or zeros if it was never visited. Never inserts.
    pub fn get_or_default(&self, state: &DiscretizedState) -> ActionValueRow {
        self.rows.get(state).copied().unwrap_or_default()
    }

    /// Mutable row for `state`, materialising a zero row on first use.
    pub fn row_mut(&mut self, state: DiscretizedState) -> &mut ActionValueRow {
        self.rows.entry(state).or_insert_with(ActionValueRow::zeros)
    }

    pub fn insert(&mut self, state: DiscretizedState, row: ActionValueRow) {
        self.rows.insert(state, row);
    }

    pub fn iter(&self) -> impl Iterator<Item = (&DiscretizedState, &ActionValueRow)> {
        self.rows.iter()
    }

    /// Keys in ascending order.
    pub fn states(&self) -> Vec<DiscretizedState> {
        let mut states: Vec<_> = self.rows.keys().copied().collect();
        states.sort_unstable();
        states
    }

    /// Serialize together with the discretizer that produced the keys.
    pub fn to_document(&self, discretizer: &Discretizer) -> PolicyDocument {
        let entries = self
            .states()
            .into_iter()
            .map(|state| PolicyEntry {
                state,
                values: self.rows[&state],
            })
            .collect();

        PolicyDocument {
            format_version: POLICY_FORMAT_VERSION,
            discretizer: discretizer.clone(),
            entries,
        }
    }

    /// Rebuild a table from a document, checking it was binned with `expected`.
    pub fn from_document(document: PolicyDocument, expected: &Discretizer) -> Result<Self> {
        if document.format_version != POLICY_FORMAT_VERSION {
            bail!(
                "Unsupported policy format version {} (expected {})",
                document.format_version,
                POLICY_FORMAT_VERSION
            );
        }
        if &document.discretizer != expected {
            bail!(
                "Policy was trained with discretizer v{} {:?}, which does not match v{} {:?}",
                document.discretizer.version,
                document.discretizer.edges(),
                expected.version,
                expected.edges()
            );
        }

        let mut table = PolicyTable::new();
        for entry in document.entries {
            if !expected.contains(&entry.state) {
                bail!("Policy entry {} is outside the discretizer range", entry.state);
            }
            if entry.values.0.iter().any(|v| !v.is_finite()) {
                bail!("Policy entry {} holds a non-finite value", entry.state);
            }
            if table.rows.insert(entry.state, entry.values).is_some() {
                bail!("Policy entry {} appears more than once", entry.state);
            }
        }
        Ok(table)
    }

    /// Write the table as JSON to `path`.
    #[instrument(skip(self, discretizer))]
    pub fn save(&self, path: &Path, discretizer: &Discretizer) -> Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory: {:?}", parent))?;
        }

        let json = serde_json::to_string_pretty(&self.to_document(discretizer))
            .context("Failed to serialize policy table")?;
        fs::write(path, json)
            .with_context(|| format!("Failed to write policy table to: {:?}", path))?;

        info!(states = self.len(), "Policy table saved to: {:?}", path);
        Ok(())
    }

    /// Load a table written by [`PolicyTable::save`]. Any problem is fatal.
    #[instrument(skip(expected))]
    pub fn load(path: &Path, expected: &Discretizer) -> Result<Self> {
        let raw = fs::read_to_string(path)
            .with_context(|| format!("Failed to read policy table: {:?}", path))?;
        let document: PolicyDocument = serde_json::from_str(&raw)
            .map_err(|e| anyhow!("Corrupt policy table {:?}: {}", path, e))?;
        let table = Self::from_document(document, expected)
            .with_context(|| format!("Rejected policy table: {:?}", path))?;

        debug!(states = table.len(), "Policy table loaded");
        Ok(table)
    }
}

/// On-disk policy layout.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PolicyDocument {
    pub format_version: u32,
    pub discretizer: Discretizer,
    pub entries: Vec<PolicyEntry>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PolicyEntry {
    pub state: DiscretizedState,
    pub values: ActionValueRow,
}
