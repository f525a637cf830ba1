//! Thread-safe collection of dependency edges from parallel compile units.

use parking_lot::Mutex;
use recast_state::DependencyData;
use std::sync::atomic::{AtomicUsize, Ordering};

/// An append-only accumulator for the edges reported by compile units.
///
/// Units running on different workers call [`record`](Self::record)
/// concurrently. The coordinator drains the sink with
/// [`take_all`](Self::take_all) once the batch is over.
pub struct DependencySink {
    edges: Mutex<Vec<DependencyData>>,
    recorded: AtomicUsize,
}

impl DependencySink {
    /// Creates a new empty sink.
    pub fn new() -> Self {
        Self {
            edges: Mutex::new(Vec::new()),
            recorded: AtomicUsize::new(0),
        }
    }

    /// Records the edge of one compiled main file.
    pub fn record(&self, edge: DependencyData) {
        self.recorded.fetch_add(1, Ordering::Relaxed);
        self.edges.lock().push(edge);
    }

    /// Total number of edges recorded since creation.
    pub fn recorded(&self) -> usize {
        self.recorded.load(Ordering::Relaxed)
    }

    /// Takes all accumulated edges, leaving the sink empty.
    pub fn take_all(&self) -> Vec<DependencyData> {
        std::mem::take(&mut *self.edges.lock())
    }
}

impl Default for DependencySink {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_sink() {
        let sink = DependencySink::new();
        assert_eq!(sink.recorded(), 0);
        assert!(sink.take_all().is_empty());
    }

    #[test]
    fn take_all_drains() {
        let sink = DependencySink::new();
        sink.record(DependencyData::new("a.aidl"));
        sink.record(DependencyData::new("b.aidl"));
        assert_eq!(sink.take_all().len(), 2);
        assert!(sink.take_all().is_empty());
        // The counter is cumulative.
        assert_eq!(sink.recorded(), 2);
    }

    #[test]
    fn thread_safety() {
        use std::sync::Arc;
        use std::thread;

        let sink = Arc::new(DependencySink::new());
        let mut handles = Vec::new();

        for t in 0..10 {
            let sink = Arc::clone(&sink);
            handles.push(thread::spawn(move || {
                for i in 0..100 {
                    sink.record(DependencyData::new(format!("t{t}/f{i}.aidl")));
                }
            }));
        }

        for h in handles {
            h.join().unwrap();
        }

        assert_eq!(sink.recorded(), 1000);
        assert_eq!(sink.take_all().len(), 1000);
    }
}
