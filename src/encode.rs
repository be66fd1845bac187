//! Result encoder: the coercion table turning domain values into JSON.
//!
//! Techniques build a [`Report`] out of [`Raw`] values; the pipeline encodes
//! it into the wire [`Envelope`] exactly once, at its boundary. `Raw` is a
//! closed enum, so there is no "unconvertible type" branch to reach at
//! runtime.
//!
//! [`Envelope`]: crate::envelope::Envelope

use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde_json::{Map, Number, Value};

use crate::envelope::Envelope;

/// The domain of encodable values.
#[derive(Debug, Clone, PartialEq)]
pub enum Raw {
    Int(i64),
    Float(f64),
    Bool(bool),
    Text(String),
    Date(NaiveDate),
    Seq(Vec<Raw>),
    Map(BTreeMap<String, Raw>),
}

impl Raw {
    /// A map entry list in one expression, for report sections built inline.
    pub fn map<I, K>(entries: I) -> Raw
    where
        I: IntoIterator<Item = (K, Raw)>,
        K: Into<String>,
    {
        Raw::Map(entries.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }
}

impl From<i64> for Raw {
    fn from(v: i64) -> Self {
        Raw::Int(v)
    }
}

impl From<usize> for Raw {
    fn from(v: usize) -> Self {
        Raw::Int(v as i64)
    }
}

impl From<f64> for Raw {
    fn from(v: f64) -> Self {
        Raw::Float(v)
    }
}

impl From<bool> for Raw {
    fn from(v: bool) -> Self {
        Raw::Bool(v)
    }
}

impl From<&str> for Raw {
    fn from(v: &str) -> Self {
        Raw::Text(v.to_string())
    }
}

impl From<String> for Raw {
    fn from(v: String) -> Self {
        Raw::Text(v)
    }
}

impl From<NaiveDate> for Raw {
    fn from(v: NaiveDate) -> Self {
        Raw::Date(v)
    }
}

impl<T: Into<Raw>> From<Vec<T>> for Raw {
    fn from(v: Vec<T>) -> Self {
        Raw::Seq(v.into_iter().map(Into::into).collect())
    }
}

/// Apply the coercion table to one value.
///
/// | input | output |
/// |---|---|
/// | `Int` | JSON integer |
/// | `Float` | JSON number; non-finite becomes null |
/// | `Bool` | JSON boolean |
/// | `Text` | JSON string |
/// | `Date` | `"YYYY-MM-DD"` string |
/// | `Seq` / `Map` | recursively converted |
pub fn to_json(raw: &Raw) -> Value {
    match raw {
        Raw::Int(v) => Value::Number(Number::from(*v)),
        Raw::Float(v) => Number::from_f64(*v).map(Value::Number).unwrap_or(Value::Null),
        Raw::Bool(v) => Value::Bool(*v),
        Raw::Text(v) => Value::String(v.clone()),
        Raw::Date(v) => Value::String(v.format("%Y-%m-%d").to_string()),
        Raw::Seq(items) => Value::Array(items.iter().map(to_json).collect()),
        Raw::Map(entries) => {
            let mut obj = Map::new();
            for (key, value) in entries {
                obj.insert(key.clone(), to_json(value));
            }
            Value::Object(obj)
        }
    }
}

/// The raw, pre-encoding response a technique returns.
#[derive(Debug, Clone, Default)]
pub struct Report {
    pub charts: BTreeMap<String, Raw>,
    pub stats: BTreeMap<String, Raw>,
    pub tables: BTreeMap<String, Raw>,
    pub explanation: String,
}

impl Report {
    pub fn new(explanation: impl Into<String>) -> Self {
        Report { explanation: explanation.into(), ..Default::default() }
    }

    pub fn chart(mut self, key: &str, value: impl Into<Raw>) -> Self {
        self.charts.insert(key.to_string(), value.into());
        self
    }

    pub fn stat(mut self, key: &str, value: impl Into<Raw>) -> Self {
        self.stats.insert(key.to_string(), value.into());
        self
    }

    pub fn table(mut self, key: &str, value: impl Into<Raw>) -> Self {
        self.tables.insert(key.to_string(), value.into());
        self
    }
}

/// Encode a full report into the wire envelope.
pub fn encode_report(report: &Report) -> Envelope {
    let section = |entries: &BTreeMap<String, Raw>| {
        let mut obj = Map::new();
        for (key, value) in entries {
            obj.insert(key.clone(), to_json(value));
        }
        obj
    };
    Envelope {
        charts: section(&report.charts),
        stats: section(&report.stats),
        tables: section(&report.tables),
        explanation: report.explanation.clone(),
        supported_techniques: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scalars_encode_to_native_json() {
        assert_eq!(to_json(&Raw::Int(5)), serde_json::json!(5));
        assert_eq!(to_json(&Raw::Float(0.5)), serde_json::json!(0.5));
        assert_eq!(to_json(&Raw::Bool(true)), serde_json::json!(true));
        assert_eq!(to_json(&Raw::Text("ward".into())), serde_json::json!("ward"));
    }

    #[test]
    fn dates_encode_as_iso_strings() {
        let date = NaiveDate::from_ymd_opt(2024, 3, 9).unwrap();
        assert_eq!(to_json(&Raw::Date(date)), serde_json::json!("2024-03-09"));
    }

    #[test]
    fn non_finite_floats_become_null() {
        assert_eq!(to_json(&Raw::Float(f64::NAN)), Value::Null);
        assert_eq!(to_json(&Raw::Float(f64::INFINITY)), Value::Null);
    }

    #[test]
    fn nested_sequences_and_maps() {
        let raw = Raw::map([
            ("xs", Raw::from(vec![1.0_f64, 2.0])),
            ("n", Raw::from(3_i64)),
        ]);
        assert_eq!(to_json(&raw), serde_json::json!({"xs": [1.0, 2.0], "n": 3}));
    }

    #[test]
    fn report_sections_always_serialize() {
        let envelope = encode_report(&Report::new("done"));
        let doc = serde_json::to_value(&envelope).unwrap();
        assert!(doc.get("charts").unwrap().is_object());
        assert!(doc.get("stats").unwrap().is_object());
        assert!(doc.get("tables").unwrap().is_object());
        assert_eq!(doc.get("explanation").unwrap(), "done");
        assert!(doc.get("supported_techniques").is_none());
    }
}
