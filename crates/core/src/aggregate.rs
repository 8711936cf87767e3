//! Aggregate contract for event-sourced domain models.

use crate::error::{DomainError, DomainResult};

/// Aggregate root marker + minimal interface.
///
/// Intentionally small so each master-data module can decide how it models
/// state transitions (pure functions, event application) without pulling in
/// any infrastructure concerns.
pub trait AggregateRoot {
    /// Strongly-typed aggregate identifier.
    type Id: Clone + Eq + core::hash::Hash + core::fmt::Debug;

    /// Returns the aggregate identifier.
    fn id(&self) -> &Self::Id;

    /// Monotonically increasing revision of the aggregate's state.
    ///
    /// Corresponds to the number of events applied: 0 until the creation
    /// event lands, then +1 per applied event.
    fn revision(&self) -> u64;
}

/// Optimistic concurrency expectation for an aggregate write.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ExpectedRevision {
    /// Skip the revision check (idempotent commands, migrations).
    Any,
    /// Require the aggregate to be at an exact revision.
    Exact(u64),
}

impl ExpectedRevision {
    pub fn matches(self, actual: u64) -> bool {
        match self {
            ExpectedRevision::Any => true,
            ExpectedRevision::Exact(v) => v == actual,
        }
    }

    pub fn check(self, actual: u64) -> DomainResult<()> {
        if self.matches(actual) {
            Ok(())
        } else {
            Err(DomainError::conflict(format!(
                "optimistic concurrency check failed (expected: {self:?}, actual: {actual})"
            )))
        }
    }
}

/// Aggregate execution semantics (pure, deterministic).
///
/// - **Decision logic**: `handle(&self, cmd)` returns events.
/// - **State mutation**: `apply(&mut self, event)` evolves state.
///
/// Aggregates must not perform IO or side effects. They only return events
/// describing what happened.
pub trait Aggregate: AggregateRoot {
    type Command: Clone + core::fmt::Debug;
    type Event: Clone + core::fmt::Debug;
    type Error: core::fmt::Debug;

    /// Evolve in-memory state from a single event.
    ///
    /// Implementations must stay deterministic and keep `revision()` in step
    /// with the number of applied events.
    fn apply(&mut self, event: &Self::Event);

    /// Decide which events to emit given the current state and a command.
    ///
    /// Must not mutate state. State evolution goes through `apply`.
    fn handle(&self, command: &Self::Command) -> Result<Vec<Self::Event>, Self::Error>;
}
