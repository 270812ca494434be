//! The in-memory scenario trace.

use std::collections::BTreeMap;

use parking_lot::Mutex;
use uuid::Uuid;

use crate::event::TraceEvent;

/// Concurrent, append-only event log for a single test execution.
///
/// The run id is stable for the lifetime of the test. Any thread spawned
/// within the test may append; ordering is the order `record` was called.
/// Generated arguments live in a sorted map so snapshots are stable.
#[derive(Debug)]
pub struct ScenarioTrace {
    run_id: Uuid,
    events: Mutex<Vec<TraceEvent>>,
    generated_arguments: Mutex<BTreeMap<String, String>>,
}

impl ScenarioTrace {
    pub fn new(run_id: Uuid) -> Self {
        Self {
            run_id,
            events: Mutex::new(Vec::new()),
            generated_arguments: Mutex::new(BTreeMap::new()),
        }
    }

    pub fn run_id(&self) -> Uuid {
        self.run_id
    }

    pub fn record(&self, event: TraceEvent) {
        self.events.lock().push(event);
    }

    /// Records one generated argument under its namespaced key, before the
    /// invocation happens. On a crash this map is the authoritative forensic
    /// record of what went in.
    pub fn record_argument(&self, key: &str, rendered: &str) {
        self.generated_arguments
            .lock()
            .insert(key.to_owned(), rendered.to_owned());
    }

    pub fn event_count(&self) -> usize {
        self.events.lock().len()
    }

    /// Snapshot of all events recorded so far, in append order.
    pub fn snapshot_events(&self) -> Vec<TraceEvent> {
        self.events.lock().clone()
    }

    /// Snapshot of the generated arguments in key code-point order.
    pub fn snapshot_arguments(&self) -> BTreeMap<String, String> {
        self.generated_arguments.lock().clone()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;

    #[test]
    fn append_order_is_preserved() {
        let trace = ScenarioTrace::new(Uuid::nil());
        for index in 0..5 {
            trace.record(TraceEvent::Design {
                subject: format!("s{index}"),
                strategy: "IntStrategy".into(),
                value: index.to_string(),
                ts: index,
            });
        }
        let subjects: Vec<i64> = trace
            .snapshot_events()
            .iter()
            .map(TraceEvent::timestamp)
            .collect();
        assert_eq!(subjects, vec![0, 1, 2, 3, 4]);
    }

    #[test]
    fn arguments_sort_by_code_point() {
        let trace = ScenarioTrace::new(Uuid::nil());
        trace.record_argument("user.b", "2");
        trace.record_argument("user.a", "1");
        let keys: Vec<String> = trace.snapshot_arguments().into_keys().collect();
        assert_eq!(keys, vec!["user.a".to_owned(), "user.b".to_owned()]);
    }

    #[test]
    fn concurrent_appends_do_not_lose_events() {
        let trace = Arc::new(ScenarioTrace::new(Uuid::nil()));
        let handles: Vec<_> = (0..4)
            .map(|worker| {
                let trace = Arc::clone(&trace);
                std::thread::spawn(move || {
                    for index in 0..50 {
                        trace.record(TraceEvent::Design {
                            subject: format!("w{worker}.{index}"),
                            strategy: "IntStrategy".into(),
                            value: "0".into(),
                            ts: 0,
                        });
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(trace.event_count(), 200);
    }
}
