//! histree: in-memory hierarchical history store.
//!
//! The core primitive is a [`ValueRecord`]: a value paired with the half-open
//! [`TimeRange`] during which it held. Records live on the nodes of a tree
//! addressed by dotted domain paths (`observatory.therm1.ch1`), and every node
//! keeps its own chronological history.
//!
//! Two query modes are supported:
//!
//! - **Snapshot** ([`HistoryTree::get`]): for one instant, the live value of
//!   every node in a subtree, keyed by path relative to the subtree root.
//! - **History** ([`HistoryTree::get_history`]): every record ever stored on
//!   one exact path, in chronological order.
//!
//! # Quick start
//!
//! ```rust
//! use histree::HistoryTree;
//!
//! let mut tree = HistoryTree::new();
//! tree.add("sensor.temp", 5.0, (1000, 2000)).unwrap();
//! tree.add("sensor.humid", 60, ("2022-03-01", "2022-03-02")).unwrap();
//!
//! let snapshot = tree.get("sensor", 1600).unwrap();
//! assert_eq!(snapshot.len(), 1);
//!
//! let history = tree.get_history("sensor.temp");
//! assert_eq!(history.len(), 1);
//! ```
//!
//! # Overlapping intervals
//!
//! The store does not reject overlapping intervals on one node. When several
//! records cover the queried instant, the one inserted first wins. Callers that
//! need a different policy must order their `add` calls accordingly.

pub mod browse;
pub mod domain;
pub mod ingest;
pub mod report;
pub mod timestamp;

pub use browse::TreeBrowser;
pub use ingest::{build, IngestContext, IngestionRecord, TreeBuilder};
pub use report::{BuildReporter, SilentReporter, TracingReporter};
pub use timestamp::{Timelike, TimestampFormat, ToTimeRange};

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BTreeMap;

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum HistreeError {
    #[error("invalid timestamp: \"{0}\"")]
    InvalidTimestamp(String),
    #[error("invalid time range [{start}, {end}): start must be before end")]
    InvalidTimeRange { start: f64, end: f64 },
    #[error("no time range established for value at {0}")]
    MissingTimeRange(String),
    #[error("unknown segment \"{segment}\" under \"{path}\"")]
    UnknownSegment { path: String, segment: String },
}

pub type Result<T> = std::result::Result<T, HistreeError>;

// ---------------------------------------------------------------------------
// Core types
// ---------------------------------------------------------------------------

/// The payload stored in a [`ValueRecord`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value")]
pub enum Value {
    /// An explicitly absent value.
    Null,
    /// A boolean.
    Boolean(bool),
    /// An integral number.
    Integer(i64),
    /// A floating-point number.
    Number(f64),
    /// A text string.
    Text(String),
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_string())
    }
}
impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Text(s)
    }
}
impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Number(n)
    }
}
impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Integer(n)
    }
}
impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Value::Integer(n.into())
    }
}
impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Boolean(b)
    }
}
impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map_or(Value::Null, Into::into)
    }
}

impl std::fmt::Display for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Value::Null => write!(f, "null"),
            Value::Boolean(b) => write!(f, "{b}"),
            Value::Integer(n) => write!(f, "{n}"),
            Value::Number(n) => write!(f, "{n:?}"),
            Value::Text(s) => write!(f, "{s}"),
        }
    }
}

/// A half-open interval `[start, end)` in epoch seconds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TimeRange {
    pub start: f64,
    pub end: f64,
}

impl TimeRange {
    /// Build a range, rejecting `start >= end` (and NaN bounds).
    pub fn new(start: f64, end: f64) -> Result<Self> {
        let range = Self { start, end };
        range.validate()?;
        Ok(range)
    }

    pub fn validate(&self) -> Result<()> {
        if self.start < self.end {
            Ok(())
        } else {
            Err(HistreeError::InvalidTimeRange {
                start: self.start,
                end: self.end,
            })
        }
    }

    /// Does this range cover `t`? The lower bound is inclusive, the upper
    /// bound exclusive.
    pub fn contains(&self, t: f64) -> bool {
        self.start <= t && t < self.end
    }

    /// Order by `start`, then `end`.
    pub fn cmp_chronological(&self, other: &Self) -> Ordering {
        self.start
            .total_cmp(&other.start)
            .then_with(|| self.end.total_cmp(&other.end))
    }
}

impl std::fmt::Display for TimeRange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}, {})", self.start, self.end)
    }
}

/// One entry in a node's history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValueRecord {
    pub time_range: TimeRange,
    pub value: Value,
}

/// A node of the [`HistoryTree`].
///
/// Children are owned exclusively and keyed by segment name (never containing
/// a dot). A node may carry a history, children, or both.
#[derive(Debug, Clone, Default)]
pub struct TreeNode {
    children: BTreeMap<String, TreeNode>,
    history: Vec<ValueRecord>,
}

impl TreeNode {
    pub fn child(&self, segment: &str) -> Option<&TreeNode> {
        self.children.get(segment)
    }

    pub fn child_names(&self) -> impl Iterator<Item = &str> {
        self.children.keys().map(String::as_str)
    }

    /// Records in insertion order.
    pub fn history(&self) -> &[ValueRecord] {
        &self.history
    }

    /// The first record, in insertion order, whose range covers `t`.
    pub fn value_at(&self, t: f64) -> Option<&Value> {
        self.history
            .iter()
            .find(|r| r.time_range.contains(t))
            .map(|r| &r.value)
    }

    fn child_or_insert(&mut self, segment: &str) -> &mut TreeNode {
        self.children.entry(segment.to_string()).or_default()
    }

    fn collect_at(&self, t: f64, prefix: &str, out: &mut BTreeMap<String, Value>) {
        if let Some(value) = self.value_at(t) {
            out.insert(prefix.to_string(), value.clone());
        }
        for (segment, child) in &self.children {
            child.collect_at(t, &domain::join(prefix, segment), out);
        }
    }

    fn node_count(&self) -> usize {
        self.children
            .values()
            .map(|c| 1 + c.node_count())
            .sum()
    }

    fn record_count(&self) -> usize {
        self.history.len()
            + self
                .children
                .values()
                .map(TreeNode::record_count)
                .sum::<usize>()
    }
}

// ---------------------------------------------------------------------------
// Store
// ---------------------------------------------------------------------------

/// The history store.
///
/// Nodes are created lazily by [`add`] and never removed. The tree is built
/// once from source records and then queried read-only; `&mut self` on `add`
/// is the only writer exclusion it needs.
///
/// # Example
///
/// ```rust
/// use histree::{HistoryTree, Value};
///
/// let mut tree = HistoryTree::new();
/// tree.add("sensor.temp", 5.0, (1000, 2000)).unwrap();
/// tree.add("sensor.humid", 60, (1500, 2500)).unwrap();
///
/// let at = tree.get("sensor", 1600).unwrap();
/// assert_eq!(at["temp"], Value::Number(5.0));
/// assert_eq!(at["humid"], Value::Integer(60));
/// ```
///
/// [`add`]: HistoryTree::add
#[derive(Debug, Clone, Default)]
pub struct HistoryTree {
    root: TreeNode,
}

impl HistoryTree {
    /// Create an empty tree.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `value` over `time_range` to the history at `path`.
    ///
    /// Missing nodes along the path are created. The range is normalized
    /// first, so a bad timestamp or an empty range leaves the tree untouched.
    /// Records are kept in call order; nothing is sorted at insert time.
    pub fn add(
        &mut self,
        path: &str,
        value: impl Into<Value>,
        time_range: impl ToTimeRange,
    ) -> Result<()> {
        let time_range = time_range.to_time_range()?;
        time_range.validate()?;

        let mut node = &mut self.root;
        for segment in domain::segments(path) {
            node = node.child_or_insert(segment);
        }
        node.history.push(ValueRecord {
            time_range,
            value: value.into(),
        });
        Ok(())
    }

    /// Resolve `path` to its node without creating anything.
    pub fn seek(&self, path: &str) -> Option<&TreeNode> {
        domain::segments(path).try_fold(&self.root, |node, segment| node.child(segment))
    }

    pub fn seek_segments<S: AsRef<str>>(&self, segments: &[S]) -> Option<&TreeNode> {
        segments
            .iter()
            .try_fold(&self.root, |node, segment| node.child(segment.as_ref()))
    }

    /// Snapshot of the subtree at `path` at instant `timestamp`.
    ///
    /// Every node in the subtree (the node at `path` included) whose history
    /// covers `timestamp` contributes one entry, keyed by its path relative to
    /// `path`. The node at `path` itself is keyed by the empty string. An
    /// unknown `path` yields an empty map.
    pub fn get(
        &self,
        path: &str,
        timestamp: impl Into<Timelike>,
    ) -> Result<BTreeMap<String, Value>> {
        self.get_with_prefix(path, timestamp, "")
    }

    /// Like [`get`](HistoryTree::get), with result keys rooted at `reprefix`.
    pub fn get_with_prefix(
        &self,
        path: &str,
        timestamp: impl Into<Timelike>,
        reprefix: &str,
    ) -> Result<BTreeMap<String, Value>> {
        let t = crate::timestamp::normalize(&timestamp.into())?;
        let mut results = BTreeMap::new();
        if let Some(node) = self.seek(path) {
            node.collect_at(t, reprefix, &mut results);
        }
        Ok(results)
    }

    /// Every record stored at exactly `path`, ordered by `(start, end)`.
    ///
    /// Records with equal ranges keep their insertion order. An unknown path
    /// yields an empty list, the same way [`get`](HistoryTree::get) does.
    pub fn get_history(&self, path: &str) -> Vec<(Value, TimeRange)> {
        let Some(node) = self.seek(path) else {
            return Vec::new();
        };
        let mut records: Vec<&ValueRecord> = node.history.iter().collect();
        records.sort_by(|a, b| a.time_range.cmp_chronological(&b.time_range));
        records
            .into_iter()
            .map(|r| (r.value.clone(), r.time_range))
            .collect()
    }

    /// Browse from the root.
    pub fn browse(&self) -> TreeBrowser<'_> {
        TreeBrowser::new(&self.root, String::new())
    }

    /// Browse from `path`, if it exists.
    pub fn browse_at(&self, path: &str) -> Option<TreeBrowser<'_>> {
        let node = self.seek(path)?;
        Some(TreeBrowser::new(node, path.to_string()))
    }

    /// Ingest one record with the root context.
    pub fn ingest(&mut self, record: &IngestionRecord) -> Result<usize> {
        ingest::ingest(self, record, &IngestContext::root())
    }

    /// Number of nodes below the root.
    pub fn node_count(&self) -> usize {
        self.root.node_count()
    }

    /// Number of records across all nodes.
    pub fn record_count(&self) -> usize {
        self.root.record_count()
    }

    pub fn is_empty(&self) -> bool {
        self.root.children.is_empty() && self.root.history.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
