//! Record ingestion with domain and time-range inheritance.
//!
//! Source parsers produce [`IngestionRecord`]s: a domain fragment, an optional
//! time range, a set of values and nested child records. A child inherits its
//! parent's domain as a prefix and its parent's time range unless it names its
//! own. The inherited state travels down as an explicit [`IngestContext`].

use crate::report::BuildReporter;
use crate::timestamp::{Timelike, ToTimeRange};
use crate::{domain, HistoryTree, HistreeError, Result, TimeRange, Value};

/// One unit of source data, as produced by a CSV or YAML parser.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IngestionRecord {
    /// Domain fragment, joined onto the inherited domain. May be empty.
    pub domain: String,
    /// Own time range. `None` inherits the context's.
    pub time_range: Option<(Timelike, Timelike)>,
    /// Key/value pairs, added in order under the effective domain.
    pub values: Vec<(String, Value)>,
    pub children: Vec<IngestionRecord>,
}

impl IngestionRecord {
    pub fn new(domain: impl Into<String>) -> Self {
        Self {
            domain: domain.into(),
            ..Self::default()
        }
    }

    pub fn with_time_range(
        mut self,
        start: impl Into<Timelike>,
        end: impl Into<Timelike>,
    ) -> Self {
        self.time_range = Some((start.into(), end.into()));
        self
    }

    pub fn with_value(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.values.push((key.into(), value.into()));
        self
    }

    pub fn with_child(mut self, child: IngestionRecord) -> Self {
        self.children.push(child);
        self
    }
}

/// Domain and time range inherited from enclosing records.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IngestContext {
    pub domain: String,
    pub time_range: Option<TimeRange>,
}

impl IngestContext {
    /// Empty domain, no time range.
    pub fn root() -> Self {
        Self::default()
    }

    /// The context that applies inside `record`.
    pub fn resolve(&self, record: &IngestionRecord) -> Result<IngestContext> {
        let time_range = match &record.time_range {
            Some(raw) => Some(raw.to_time_range()?),
            None => self.time_range,
        };
        Ok(IngestContext {
            domain: domain::join(&self.domain, &record.domain),
            time_range,
        })
    }
}

/// Add every value in `record` and its descendants to `tree`.
///
/// Returns the number of values added. Fails with
/// [`HistreeError::MissingTimeRange`] on the first value that has no time
/// range anywhere up its ancestor chain; values added before the failure
/// stay in the tree.
pub fn ingest(
    tree: &mut HistoryTree,
    record: &IngestionRecord,
    context: &IngestContext,
) -> Result<usize> {
    let scope = context.resolve(record)?;
    let mut added = 0;
    for (key, value) in &record.values {
        let path = domain::join(&scope.domain, key);
        let Some(time_range) = scope.time_range else {
            return Err(HistreeError::MissingTimeRange(path));
        };
        tree.add(&path, value.clone(), time_range)?;
        added += 1;
    }
    for child in &record.children {
        added += ingest(tree, child, &scope)?;
    }
    Ok(added)
}

// ---------------------------------------------------------------------------
// Builder
// ---------------------------------------------------------------------------

/// Accumulates records into a fresh [`HistoryTree`], reporting progress.
pub struct TreeBuilder<'r> {
    tree: HistoryTree,
    reporter: &'r dyn BuildReporter,
}

impl<'r> TreeBuilder<'r> {
    pub fn new(reporter: &'r dyn BuildReporter) -> Self {
        Self {
            tree: HistoryTree::new(),
            reporter,
        }
    }

    pub fn reporter(&self) -> &'r dyn BuildReporter {
        self.reporter
    }

    /// Ingest a top-level record with the root context.
    pub fn ingest(&mut self, record: &IngestionRecord) -> Result<usize> {
        let added = self.tree.ingest(record)?;
        self.reporter.record_ingested(&record.domain, added);
        Ok(added)
    }

    pub fn tree(&self) -> &HistoryTree {
        &self.tree
    }

    pub fn finish(self) -> HistoryTree {
        self.reporter
            .build_finished(self.tree.node_count(), self.tree.record_count());
        self.tree
    }
}

/// Build a tree from top-level records.
pub fn build<I>(records: I, reporter: &dyn BuildReporter) -> Result<HistoryTree>
where
    I: IntoIterator<Item = IngestionRecord>,
{
    let mut builder = TreeBuilder::new(reporter);
    for record in records {
        builder.ingest(&record)?;
    }
    Ok(builder.finish())
}
