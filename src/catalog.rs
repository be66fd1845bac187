//! Static allow-list of technique identifiers.
//!
//! Only identifiers in this catalog may be dispatched; everything else is
//! rejected before any implementation is looked up.

/// The fixed set of dispatchable techniques, decided at build time.
pub const SUPPORTED_TECHNIQUES: &[&str] = &[
    "kmeans",
    "isolation_forest",
    "linear_regression",
    "random_forest_classifier",
    "dbscan",
    "ridge_regression",
    "lasso_regression",
    "svc",
    "svr",
    "hierarchical_clustering",
    "gaussian_nb",
    "gradient_boosting_classifier",
    "gradient_boosting_regressor",
    "prophet_forecasting",
    "kernel_pca",
];

pub fn is_supported(technique: &str) -> bool {
    SUPPORTED_TECHNIQUES.contains(&technique)
}

pub fn list_supported() -> Vec<String> {
    SUPPORTED_TECHNIQUES.iter().map(|s| s.to_string()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_identifiers_are_supported() {
        assert!(is_supported("kmeans"));
        assert!(is_supported("kernel_pca"));
        assert!(!is_supported("not_a_real_technique"));
        assert!(!is_supported("KMEANS"));
    }

    #[test]
    fn list_matches_the_static_set() {
        let listed = list_supported();
        assert_eq!(listed.len(), SUPPORTED_TECHNIQUES.len());
        assert_eq!(listed[0], "kmeans");
    }
}
