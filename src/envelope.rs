//! The uniform four-key response envelope and the shared error builder.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// The universal response shape: `charts`, `stats` and `tables` are always
/// present (possibly empty), `explanation` is always a string. Failed
/// executions are not a separate type: they are envelopes whose `stats`
/// carry an `"error"` key, so callers never special-case.
///
/// `supported_techniques` only serializes on the unsupported-identifier
/// path, where the caller is handed the full allow-list to self-correct.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Envelope {
    pub charts: Map<String, Value>,
    pub stats: Map<String, Value>,
    pub tables: Map<String, Value>,
    pub explanation: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub supported_techniques: Option<Vec<String>>,
}

impl Envelope {
    /// The error message, when this envelope represents a failure.
    pub fn error_message(&self) -> Option<&str> {
        self.stats.get("error").and_then(Value::as_str)
    }

    pub fn is_error(&self) -> bool {
        self.stats.contains_key("error")
    }
}

/// Build the standard failure envelope: empty charts/tables, the message
/// under `stats.error`, and an explanation naming the technique when known.
/// Every failure branch of the pipeline goes through here so failures look
/// the same regardless of which step produced them.
pub fn error_envelope(message: impl Into<String>, technique: Option<&str>) -> Envelope {
    let mut stats = Map::new();
    stats.insert("error".to_string(), Value::String(message.into()));
    let explanation = match technique {
        Some(id) => format!("An error occurred during {id}."),
        None => "An error occurred.".to_string(),
    };
    Envelope {
        charts: Map::new(),
        stats,
        tables: Map::new(),
        explanation,
        supported_techniques: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_envelope_shape() {
        let envelope = error_envelope("singular matrix", Some("ridge_regression"));
        assert!(envelope.charts.is_empty());
        assert!(envelope.tables.is_empty());
        assert_eq!(envelope.error_message(), Some("singular matrix"));
        assert_eq!(envelope.explanation, "An error occurred during ridge_regression.");
    }

    #[test]
    fn error_envelope_without_technique() {
        let envelope = error_envelope("boom", None);
        assert_eq!(envelope.explanation, "An error occurred.");
    }

    #[test]
    fn four_keys_always_serialize() {
        let envelope = error_envelope("x", None);
        let doc = serde_json::to_value(&envelope).unwrap();
        let obj = doc.as_object().unwrap();
        assert_eq!(obj.len(), 4);
        for key in ["charts", "stats", "tables", "explanation"] {
            assert!(obj.contains_key(key));
        }
    }
}
