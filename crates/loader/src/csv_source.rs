//! CSV sources.
//!
//! The first row is a header naming at least the `domain`, `start`, `end`,
//! `key` and `value` columns, in any order. Every following row updates a
//! running context: a non-empty `domain` replaces the current domain and a
//! non-empty `start` replaces the current time range with `(start, end)`.
//! Rows with a non-empty `key` then emit one value under that context. An
//! empty `value` is stored as [`Value::Null`].
//!
//! ```text
//! "domain","start","end","key","value"
//! "so_obsdb.sat1","2022-03-01","2022-03-02","mode","tracking"
//! "","","","az","180"
//! ```

use crate::{LoaderError, Result};
use histree::timestamp;
use histree::{IngestionRecord, Timelike, Value};
use std::io::Read;

const COLUMNS: [&str; 5] = ["domain", "start", "end", "key", "value"];

#[derive(Debug, Default)]
struct RowContext {
    domain: String,
    time_range: Option<(f64, f64)>,
}

/// Parse CSV text into one record per keyed row.
pub fn parse_csv<R: Read>(reader: R) -> Result<Vec<IngestionRecord>> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(b',')
        .quote(b'"')
        .has_headers(true)
        .flexible(true)
        .from_reader(reader);

    let headers = reader.headers()?.clone();
    if headers.is_empty() {
        return Ok(Vec::new());
    }
    let mut index = [0usize; 5];
    for (slot, column) in index.iter_mut().zip(COLUMNS) {
        *slot = headers
            .iter()
            .position(|h| h == column)
            .ok_or_else(|| LoaderError::MissingColumn(column.to_string()))?;
    }
    let [domain_at, start_at, end_at, key_at, value_at] = index;

    let mut context = RowContext::default();
    let mut records = Vec::new();
    for row in reader.records() {
        let row = row?;
        let field = |at: usize| row.get(at).unwrap_or_default();

        if !field(domain_at).is_empty() {
            context.domain = field(domain_at).to_string();
        }
        if !field(start_at).is_empty() {
            context.time_range = Some((
                timestamp::parse_str(field(start_at))?,
                timestamp::parse_str(field(end_at))?,
            ));
        }

        let key = field(key_at);
        if key.is_empty() {
            continue;
        }
        let value = match field(value_at) {
            "" => Value::Null,
            text => Value::Text(text.to_string()),
        };
        records.push(IngestionRecord {
            domain: context.domain.clone(),
            time_range: context
                .time_range
                .map(|(start, end)| (Timelike::Seconds(start), Timelike::Seconds(end))),
            values: vec![(key.to_string(), value)],
            children: Vec::new(),
        });
    }
    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;
    use histree::{HistoryTree, HistreeError};

    fn load(text: &str) -> HistoryTree {
        let mut tree = HistoryTree::new();
        for record in parse_csv(text.as_bytes()).unwrap() {
            tree.ingest(&record).unwrap();
        }
        tree
    }

    #[test]
    fn context_carries_across_rows() {
        let tree = load(
            "\"domain\",\"start\",\"end\",\"key\",\"value\"\r\n\
             \"so_obsdb.sat1\",\"2022-03-01\",\"2022-03-02\",\"mode\",\"tracking\"\r\n\
             \"\",\"\",\"\",\"az\",\"180\"\r\n\
             \"so_obsdb.sat2\",\"\",\"\",\"mode\",\"\"\r\n",
        );

        let sat1 = tree.get("so_obsdb.sat1", "2022-03-01 12:00").unwrap();
        assert_eq!(sat1["mode"], Value::Text("tracking".into()));
        assert_eq!(sat1["az"], Value::Text("180".into()));

        let sat2 = tree.get("so_obsdb.sat2", "2022-03-01 12:00").unwrap();
        assert_eq!(sat2["mode"], Value::Null);
    }

    #[test]
    fn context_only_rows_emit_nothing() {
        let records = parse_csv(
            "domain,start,end,key,value\n\
             a,1970-01-01,1970-01-02,,\n\
             ,,,k,v\n"
                .as_bytes(),
        )
        .unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].domain, "a");
        assert_eq!(
            records[0].time_range,
            Some((Timelike::Seconds(0.0), Timelike::Seconds(86_400.0)))
        );
    }

    #[test]
    fn later_time_range_replaces_earlier() {
        let tree = load(
            "domain,start,end,key,value\n\
             d,1970-01-01,1970-01-02,k,first\n\
             ,1970-01-02,1970-01-03,k,second\n",
        );
        let history = tree.get_history("d.k");
        assert_eq!(history.len(), 2);
        assert_eq!(history[1].0, Value::Text("second".into()));
        assert_eq!(history[1].1.start, 86_400.0);
    }

    #[test]
    fn columns_are_found_by_name() {
        let tree = load(
            "value,key,end,start,domain,comment\n\
             42,k,1970-01-02,1970-01-01,d,ignored\n",
        );
        assert_eq!(tree.get_history("d.k")[0].0, Value::Text("42".into()));
    }

    #[test]
    fn rows_may_be_longer_or_shorter_than_the_header() {
        let tree = load(
            "domain,start,end,key,value,comment\n\
             d,1970-01-01,1970-01-02,long,v,note,extra\n\
             d,1970-01-01,1970-01-02,short,w\n\
             d,1970-01-01,1970-01-02,bare\n",
        );
        let at = tree.get("d", 100).unwrap();
        assert_eq!(at["long"], Value::Text("v".into()));
        assert_eq!(at["short"], Value::Text("w".into()));
        assert_eq!(at["bare"], Value::Null);
    }

    #[test]
    fn missing_column_is_reported() {
        let err = parse_csv("domain,start,key,value\n".as_bytes()).unwrap_err();
        assert!(matches!(err, LoaderError::MissingColumn(ref c) if c == "end"));
    }

    #[test]
    fn bad_timestamp_is_reported_on_its_row() {
        let err = parse_csv("domain,start,end,key,value\nd,someday,,,\n".as_bytes()).unwrap_err();
        assert!(matches!(
            err,
            LoaderError::Histree(HistreeError::InvalidTimestamp(ref s)) if s == "someday"
        ));
    }

    #[test]
    fn keyed_row_before_any_time_range_has_none() {
        let records = parse_csv("domain,start,end,key,value\nd,,,k,v\n".as_bytes()).unwrap();
        assert_eq!(records[0].time_range, None);

        let mut tree = HistoryTree::new();
        assert_eq!(
            tree.ingest(&records[0]).unwrap_err(),
            HistreeError::MissingTimeRange("d.k".into())
        );
    }
}
