//! YAML sources.
//!
//! A document is one nested record:
//!
//! ```yaml
//! domain: so_hk.labs          # optional, joined onto the parent's domain
//! time_range: [2022-03-01, 2022-04-01]   # optional, inherited when absent
//! values:                     # optional scalar values
//!   site: New Haven
//! data:                       # optional nested records of the same shape
//!   - domain: yale.observatory
//!     values: { therm1: 4.2 }
//! ```
//!
//! `time_range: null` is treated as absent. An empty document yields no
//! record.

use crate::{LoaderError, Result};
use histree::{IngestionRecord, Timelike, Value};
use serde_yaml::{Mapping, Value as YamlValue};

/// Parse one YAML document.
pub fn parse_yaml(text: &str) -> Result<Option<IngestionRecord>> {
    let doc: YamlValue = serde_yaml::from_str(text)?;
    if doc.is_null() {
        return Ok(None);
    }
    record_from_yaml(&doc, "document").map(Some)
}

fn record_from_yaml(node: &YamlValue, at: &str) -> Result<IngestionRecord> {
    let Some(map) = node.as_mapping() else {
        return Err(shape(at, "expected a mapping"));
    };

    let domain = match field(map, "domain") {
        None => String::new(),
        Some(YamlValue::String(s)) => s.clone(),
        Some(_) => return Err(shape(at, "domain must be a string")),
    };

    let time_range = match field(map, "time_range") {
        None => None,
        Some(YamlValue::Sequence(items)) if items.len() == 2 => {
            Some((timelike(&items[0], at)?, timelike(&items[1], at)?))
        }
        Some(_) => return Err(shape(at, "time_range must be a two-element list")),
    };

    let values = match field(map, "values") {
        None => Vec::new(),
        Some(YamlValue::Mapping(values)) => values
            .iter()
            .map(|(k, v)| -> Result<(String, Value)> {
                let key = key_string(k).ok_or_else(|| shape(at, "value keys must be scalars"))?;
                let value = scalar(v).ok_or_else(|| {
                    shape(at, &format!("value for \"{key}\" must be a scalar"))
                })?;
                Ok((key, value))
            })
            .collect::<Result<Vec<_>>>()?,
        Some(_) => return Err(shape(at, "values must be a mapping")),
    };

    let children = match field(map, "data") {
        None => Vec::new(),
        Some(YamlValue::Sequence(items)) => items
            .iter()
            .enumerate()
            .map(|(i, item)| record_from_yaml(item, &format!("{at}.data[{i}]")))
            .collect::<Result<Vec<_>>>()?,
        Some(_) => return Err(shape(at, "data must be a list")),
    };

    Ok(IngestionRecord {
        domain,
        time_range,
        values,
        children,
    })
}

/// A present, non-null field.
fn field<'a>(map: &'a Mapping, name: &str) -> Option<&'a YamlValue> {
    map.get(name).filter(|v| !v.is_null())
}

fn timelike(node: &YamlValue, at: &str) -> Result<Timelike> {
    match node {
        YamlValue::Number(n) => n
            .as_f64()
            .map(Timelike::Seconds)
            .ok_or_else(|| shape(at, "time_range bound out of range")),
        YamlValue::String(s) => Ok(Timelike::Text(s.clone())),
        _ => Err(shape(at, "time_range bounds must be numbers or strings")),
    }
}

fn key_string(node: &YamlValue) -> Option<String> {
    match node {
        YamlValue::String(s) => Some(s.clone()),
        YamlValue::Number(n) => Some(n.to_string()),
        YamlValue::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn scalar(node: &YamlValue) -> Option<Value> {
    match node {
        YamlValue::Null => Some(Value::Null),
        YamlValue::Bool(b) => Some(Value::Boolean(*b)),
        YamlValue::Number(n) => n
            .as_i64()
            .map(Value::Integer)
            .or_else(|| n.as_f64().map(Value::Number)),
        YamlValue::String(s) => Some(Value::Text(s.clone())),
        _ => None,
    }
}

fn shape(at: &str, message: &str) -> LoaderError {
    LoaderError::Shape(format!("{at}: {message}"))
}
