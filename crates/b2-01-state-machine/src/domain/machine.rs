//! # State Machine
//!
//! Owns the `mainnet` and `mempool` spaces and applies instructions to them
//! one at a time.

use super::entities::{ApplyMode, Space, StateSpace, Table};
use super::errors::StateError;
use super::parser::InsertStatement;
use shared_types::{commitment, VerifiedInstruction};
use tracing::trace;

/// Apply `instruction` to `space`.
///
/// Checks run in a fixed order: commitment, statement form, column arity,
/// then duplicate hash. `DryRun` stops after the checks.
pub fn apply_to_space(
    space: &mut StateSpace,
    instruction: &VerifiedInstruction,
    mode: ApplyMode,
) -> Result<(), StateError> {
    let computed = commitment(&instruction.data, instruction.nonce);
    if computed != instruction.hash {
        return Err(StateError::InvalidHash {
            declared: instruction.hash.clone(),
            computed,
        });
    }

    let InsertStatement { table, row } = InsertStatement::parse(&instruction.data)?;

    if space
        .table(&table)
        .is_some_and(|t| t.has_applied(&instruction.hash))
    {
        return Err(StateError::DuplicateInstruction {
            table,
            hash: instruction.hash.clone(),
        });
    }

    if mode == ApplyMode::DryRun {
        return Ok(());
    }

    let target = space.table_mut(&table);
    target.rows.push(row);
    target.applied_hashes.push(instruction.hash.clone());
    Ok(())
}

/// Holder of both state spaces.
#[derive(Debug, Clone, Default)]
pub struct StateMachine {
    mainnet: StateSpace,
    mempool: StateSpace,
}

impl StateMachine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply `instruction` to the space named by `space`.
    pub fn apply(
        &mut self,
        space: Space,
        instruction: &VerifiedInstruction,
        mode: ApplyMode,
    ) -> Result<(), StateError> {
        let result = apply_to_space(self.space_mut(space), instruction, mode);
        if let Err(ref e) = result {
            trace!(space = %space, hash = instruction.short_hash(), error = %e, "Instruction refused");
        }
        result
    }

    pub fn space(&self, space: Space) -> &StateSpace {
        match space {
            Space::Mainnet => &self.mainnet,
            Space::Mempool => &self.mempool,
        }
    }

    fn space_mut(&mut self, space: Space) -> &mut StateSpace {
        match space {
            Space::Mainnet => &mut self.mainnet,
            Space::Mempool => &mut self.mempool,
        }
    }

    pub fn table(&self, space: Space, name: &str) -> Option<&Table> {
        self.space(space).table(name)
    }

    /// Empty `space`.
    pub fn reset(&mut self, space: Space) {
        *self.space_mut(space) = StateSpace::new();
    }

    /// Swap in a space built elsewhere, e.g. a scratch copy that took a whole
    /// block without error.
    pub fn replace(&mut self, space: Space, contents: StateSpace) {
        *self.space_mut(space) = contents;
    }

    /// Replace `to` with a copy of `from`.
    pub fn mirror(&mut self, from: Space, to: Space) {
        if from != to {
            let copy = self.space(from).clone();
            *self.space_mut(to) = copy;
        }
    }

    pub fn contains_hash(&self, space: Space, hash: &str) -> bool {
        self.space(space).contains_hash(hash)
    }
}
