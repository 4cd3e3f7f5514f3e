//! # State Entities
//!
//! - [`Space`]: which state space an instruction targets.
//! - [`StateSpace`]: table name to [`Table`].
//! - [`Table`]: ordered rows plus the ordered hashes that produced them.

use serde::{Deserialize, Serialize};
use shared_types::Hash;
use std::collections::BTreeMap;
use std::fmt;

/// Column name to value, zipped positionally from an INSERT statement.
pub type Row = BTreeMap<String, String>;

/// The two state spaces a node maintains.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Space {
    /// Only instructions included in the chain.
    Mainnet,
    /// Mainnet plus pending instructions accepted during the current scan.
    Mempool,
}

impl Space {
    pub fn as_str(&self) -> &'static str {
        match self {
            Space::Mainnet => "mainnet",
            Space::Mempool => "mempool",
        }
    }
}

impl fmt::Display for Space {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How an application is carried out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ApplyMode {
    /// Run every check and mutate the space.
    #[default]
    Commit,
    /// Run every check, mutate nothing.
    DryRun,
}

/// A lazily created table.
///
/// `applied_hashes` only grows and never holds the same hash twice.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Table {
    pub rows: Vec<Row>,
    pub applied_hashes: Vec<Hash>,
}

impl Table {
    pub fn has_applied(&self, hash: &str) -> bool {
        self.applied_hashes.iter().any(|h| h == hash)
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// A named collection of tables.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StateSpace {
    tables: BTreeMap<String, Table>,
}

impl StateSpace {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn table(&self, name: &str) -> Option<&Table> {
        self.tables.get(name)
    }

    pub(crate) fn table_mut(&mut self, name: &str) -> &mut Table {
        self.tables.entry(name.to_string()).or_default()
    }

    /// Tables in name order.
    pub fn tables(&self) -> impl Iterator<Item = (&String, &Table)> {
        self.tables.iter()
    }

    /// True if any table has applied `hash`.
    pub fn contains_hash(&self, hash: &str) -> bool {
        self.tables.values().any(|t| t.has_applied(hash))
    }

    pub fn row_count(&self) -> usize {
        self.tables.values().map(Table::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }
}
