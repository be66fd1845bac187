//! The execution pipeline: validate, load, preprocess, resolve, invoke,
//! encode. Every failure along the way folds into an error envelope; the
//! function itself is infallible and holds no state across calls.

use tracing::{debug, warn};

use crate::catalog;
use crate::encode;
use crate::envelope::{error_envelope, Envelope};
use crate::params::{ParamValue, Params};
use crate::registry::Registry;
use crate::table::{DataFrame, DatasetSource};

/// Run one technique over one dataset. Always returns an envelope: failures
/// are represented in `stats.error`, never raised. Techniques report their
/// own failures through `Result`, so nothing below this boundary unwinds.
pub fn execute(
    registry: &Registry,
    technique_id: &str,
    source: &DatasetSource,
    mut params: Params,
) -> Envelope {
    if !catalog::is_supported(technique_id) {
        let mut envelope = error_envelope(
            format!("Technique '{technique_id}' is not supported"),
            Some(technique_id),
        );
        envelope.supported_techniques = Some(catalog::list_supported());
        return envelope;
    }

    let df = match DataFrame::load(source) {
        Ok(df) => df,
        Err(e) => {
            return error_envelope(format!("Failed to read dataset file: {e}"), Some(technique_id))
        }
    };

    // Move the named target column into the `target_data` side channel so
    // techniques can treat it as the dependent variable. A missing column is
    // a soft warning, not a failure.
    if let Some(target) = params.get_str("target_column").map(str::to_string) {
        match df.column(&target) {
            Some(column) => {
                debug!(column = %target, "using column as target variable");
                params.insert("target_data", ParamValue::Series(column.values.clone()));
            }
            None => {
                warn!(column = %target, "target column not found in dataset");
            }
        }
    }

    let technique = match registry.resolve(technique_id) {
        Some(technique) => {
            debug!(technique = technique_id, "resolved implementation");
            technique
        }
        None => {
            return error_envelope(
                format!("no implementation registered for technique: {technique_id}"),
                Some(technique_id),
            )
        }
    };

    match technique.run(&df, &params) {
        Ok(report) => encode::encode_report(&report),
        Err(e) => error_envelope(e.to_string(), Some(technique_id)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encode::Report;
    use crate::error::TechniqueError;

    fn inline(text: &str) -> DatasetSource {
        DatasetSource::Inline(text.to_string())
    }

    #[test]
    fn unknown_identifier_lists_the_catalog() {
        let registry = Registry::empty();
        let envelope = execute(&registry, "not_a_real_technique", &inline("x\n1\n"), Params::new());
        assert!(envelope.error_message().unwrap().contains("not_a_real_technique"));
        let supported = envelope.supported_techniques.unwrap();
        assert_eq!(supported.len(), catalog::SUPPORTED_TECHNIQUES.len());
    }

    #[test]
    fn supported_but_unregistered_yields_clean_envelope() {
        let registry = Registry::empty();
        let envelope = execute(&registry, "kmeans", &inline("x,y\n1,2\n"), Params::new());
        assert!(envelope.charts.is_empty());
        assert!(envelope.tables.is_empty());
        assert!(envelope.error_message().unwrap().contains("kmeans"));
        assert!(envelope.supported_techniques.is_none());
    }

    #[test]
    fn technique_failure_is_folded_into_the_envelope() {
        let mut registry = Registry::empty();
        registry.register(
            "kmeans",
            Box::new(|_: &DataFrame, _: &Params| -> Result<Report, TechniqueError> {
                Err(TechniqueError::computation("singular matrix"))
            }),
        );
        let envelope = execute(&registry, "kmeans", &inline("x,y\n1,2\n"), Params::new());
        assert_eq!(envelope.error_message(), Some("singular matrix"));
        assert_eq!(envelope.explanation, "An error occurred during kmeans.");
    }

    #[test]
    fn unreadable_dataset_is_a_read_error() {
        let registry = Registry::builtin();
        let source = DatasetSource::File("/nonexistent/data.csv".into());
        let envelope = execute(&registry, "kmeans", &source, Params::new());
        assert!(envelope.error_message().unwrap().starts_with("Failed to read dataset file:"));
    }

    #[test]
    fn target_data_side_channel_is_injected() {
        let mut registry = Registry::empty();
        registry.register(
            "svc",
            Box::new(|_: &DataFrame, params: &Params| -> Result<Report, TechniqueError> {
                assert!(params.get_series("target_data").is_some());
                Ok(Report::new("saw target"))
            }),
        );
        let mut params = Params::new();
        params.insert("target_column", ParamValue::Str("y".into()));
        let envelope = execute(&registry, "svc", &inline("x,y\n1,2\n3,4\n"), params);
        assert_eq!(envelope.explanation, "saw target");
    }

    #[test]
    fn missing_target_column_is_soft() {
        let mut registry = Registry::empty();
        registry.register(
            "svc",
            Box::new(|_: &DataFrame, params: &Params| -> Result<Report, TechniqueError> {
                assert!(params.get_series("target_data").is_none());
                Ok(Report::new("no target"))
            }),
        );
        let mut params = Params::new();
        params.insert("target_column", ParamValue::Str("absent".into()));
        let envelope = execute(&registry, "svc", &inline("x,y\n1,2\n"), params);
        assert!(!envelope.is_error());
    }
}
