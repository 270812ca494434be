//! The audit trail: an in-memory scenario trace plus the on-disk recycling
//! journal. Events are NDJSON, one per line, written eagerly enough that the
//! journal survives a crash of the target under test.

#[macro_use]
extern crate tracing;

mod event;
pub use event::{Phase, TraceEvent, STACK_LINE_LIMIT};

mod sink;
pub use sink::{RecyclingFileSink, SNAPSHOT_FAILED};

mod trace;
pub use trace::ScenarioTrace;
