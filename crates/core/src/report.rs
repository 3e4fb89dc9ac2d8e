//! Build-time reporting.
//!
//! The store never logs through a global on its own. Whoever builds a tree
//! hands the builder a [`BuildReporter`] and owns its lifetime.

use tracing::{debug, info};

/// Receives progress events while a tree is being built.
///
/// Every method has a no-op default, so implementors only override what they
/// care about.
pub trait BuildReporter {
    /// A build from `origin` (a directory, a file list) is starting.
    fn build_started(&self, _origin: &str) {}

    /// A source (file, stream, fixture) is about to be parsed.
    fn source_started(&self, _source: &str, _format: &str) {}

    /// One top-level record was ingested, adding `values` records.
    fn record_ingested(&self, _domain: &str, _values: usize) {}

    /// The build finished.
    fn build_finished(&self, _nodes: usize, _records: usize) {}
}

/// Forwards build events to `tracing` under the `histree` target.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingReporter;

impl BuildReporter for TracingReporter {
    fn build_started(&self, origin: &str) {
        info!(target: "histree", "Building database from data in {origin} ...");
    }

    fn source_started(&self, source: &str, format: &str) {
        info!(target: "histree", "Parsing {source} as {format} ...");
    }

    fn record_ingested(&self, domain: &str, values: usize) {
        debug!(target: "histree", domain, values, "record ingested");
    }

    fn build_finished(&self, nodes: usize, records: usize) {
        info!(target: "histree", nodes, records, "history tree built");
    }
}

/// Drops every event.
#[derive(Debug, Clone, Copy, Default)]
pub struct SilentReporter;

impl BuildReporter for SilentReporter {}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    #[derive(Default)]
    struct FinishOnly {
        finished: Cell<Option<(usize, usize)>>,
    }

    impl BuildReporter for FinishOnly {
        fn build_finished(&self, nodes: usize, records: usize) {
            self.finished.set(Some((nodes, records)));
        }
    }

    #[test]
    fn unimplemented_events_fall_through_to_defaults() {
        let reporter = FinishOnly::default();
        reporter.build_started("data/");
        reporter.source_started("data/a.csv", "csv");
        reporter.record_ingested("a", 1);
        assert_eq!(reporter.finished.get(), None);

        reporter.build_finished(2, 1);
        assert_eq!(reporter.finished.get(), Some((2, 1)));
    }
}
