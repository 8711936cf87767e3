use mdm_core::Aggregate;

/// Execute an aggregate command deterministically (no IO, no async).
///
/// The canonical event-sourced lifecycle in one step:
///
/// 1. **Decide**: `aggregate.handle(command)` returns events (pure, no mutation).
/// 2. **Evolve**: each event is applied via `aggregate.apply(event)`.
///
/// The aggregate keeps its own revision tracking consistent during `apply()`
/// (+1 per event). Persistence and publication are the caller's business;
/// this helper only runs the in-memory transition.
pub fn execute<A>(aggregate: &mut A, command: &A::Command) -> Result<Vec<A::Event>, A::Error>
where
    A: Aggregate,
{
    let events = A::handle(aggregate, command)?;
    for ev in &events {
        A::apply(aggregate, ev);
    }
    Ok(events)
}
