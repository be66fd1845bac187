//! Built-in technique implementations, one module per algorithm family.
//!
//! Every public function here satisfies the `Technique` contract and is
//! registered by [`install`]. Shared input handling (numeric-column guards,
//! target selection, train/test splitting) lives in this module so the
//! individual techniques agree on their conventions.

pub mod boosting;
pub mod clustering;
pub mod decomposition;
pub mod ensemble;
pub mod forecast;
pub mod linear_model;
pub mod naive_bayes;
pub mod svm;

mod linalg;
mod metrics;
mod tree;

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

use crate::error::TechniqueError;
use crate::params::Params;
use crate::registry::Registry;
use crate::table::{DataFrame, Datum};

/// Register the full built-in technique set.
pub fn install(registry: &mut Registry) {
    registry.register("kmeans", Box::new(clustering::kmeans));
    registry.register("dbscan", Box::new(clustering::dbscan));
    registry.register("hierarchical_clustering", Box::new(clustering::hierarchical_clustering));
    registry.register("isolation_forest", Box::new(ensemble::isolation_forest));
    registry.register("random_forest_classifier", Box::new(ensemble::random_forest_classifier));
    registry.register("linear_regression", Box::new(linear_model::linear_regression));
    registry.register("ridge_regression", Box::new(linear_model::ridge_regression));
    registry.register("lasso_regression", Box::new(linear_model::lasso_regression));
    registry.register("svc", Box::new(svm::svc));
    registry.register("svr", Box::new(svm::svr));
    registry.register("gaussian_nb", Box::new(naive_bayes::gaussian_nb));
    registry.register("gradient_boosting_classifier", Box::new(boosting::gradient_boosting_classifier));
    registry.register("gradient_boosting_regressor", Box::new(boosting::gradient_boosting_regressor));
    registry.register("prophet_forecasting", Box::new(forecast::prophet_forecasting));
    registry.register("kernel_pca", Box::new(decomposition::kernel_pca));
}

/// Seed every stochastic technique from `random_state` (default 42).
pub(crate) fn seeded_rng(params: &Params) -> StdRng {
    StdRng::seed_from_u64(params.get_u64("random_state", 42))
}

/// Supervised data with a numeric target.
pub(crate) struct Regression {
    pub feature_names: Vec<String>,
    pub x: Vec<Vec<f64>>,
    pub y: Vec<f64>,
}

/// Supervised data with a label-encoded target.
pub(crate) struct Classification {
    pub feature_names: Vec<String>,
    pub x: Vec<Vec<f64>>,
    pub y: Vec<usize>,
    pub classes: Vec<String>,
}

/// The shared target rule: the column named by `target_column` when it
/// exists, otherwise the first numeric column. Returns the target name and
/// its cells (preferring the pipeline-injected `target_data` side channel).
fn select_target(
    df: &DataFrame,
    params: &Params,
    numeric_cols: &[String],
) -> (String, Vec<Datum>) {
    let name = params
        .get_str("target_column")
        .filter(|name| df.has_column(name))
        .unwrap_or(&numeric_cols[0])
        .to_string();
    let values = match params.get_series("target_data") {
        Some(series) => series.to_vec(),
        None => df.column(&name).map(|c| c.values.clone()).unwrap_or_default(),
    };
    (name, values)
}

/// Features + numeric target, rows with missing values dropped.
pub(crate) fn regression_xy(df: &DataFrame, params: &Params) -> Result<Regression, TechniqueError> {
    let numeric_cols = df.numeric_column_names();
    if numeric_cols.len() < 2 {
        return Err(TechniqueError::NotEnoughNumericColumns { required: 2 });
    }

    let (target, target_values) = select_target(df, params, &numeric_cols);
    if target_values.iter().any(|v| !v.is_null() && v.as_f64().is_none()) {
        return Err(TechniqueError::computation(format!(
            "target column '{target}' is not numeric"
        )));
    }

    let feature_names: Vec<String> =
        numeric_cols.iter().filter(|c| **c != target).cloned().collect();
    let features: Vec<&[Datum]> = feature_names
        .iter()
        .map(|name| df.column(name).expect("numeric column exists").values.as_slice())
        .collect();

    let mut x = Vec::new();
    let mut y = Vec::new();
    'rows: for i in 0..df.n_rows() {
        let Some(target_value) = target_values.get(i).and_then(Datum::as_f64) else {
            continue;
        };
        let mut row = Vec::with_capacity(features.len());
        for column in &features {
            match column[i].as_f64() {
                Some(v) => row.push(v),
                None => continue 'rows,
            }
        }
        x.push(row);
        y.push(target_value);
    }
    if x.is_empty() {
        return Err(TechniqueError::EmptySelection);
    }
    Ok(Regression { feature_names, x, y })
}

/// Features + label-encoded target. Non-numeric targets are label-encoded
/// the way the original modules did; numeric classes sort numerically,
/// text classes lexically.
pub(crate) fn classification_xy(
    df: &DataFrame,
    params: &Params,
) -> Result<Classification, TechniqueError> {
    let numeric_cols = df.numeric_column_names();
    if numeric_cols.len() < 2 {
        return Err(TechniqueError::NotEnoughNumericColumns { required: 2 });
    }

    let (target, target_values) = select_target(df, params, &numeric_cols);
    let feature_names: Vec<String> =
        numeric_cols.iter().filter(|c| **c != target).cloned().collect();
    let features: Vec<&[Datum]> = feature_names
        .iter()
        .map(|name| df.column(name).expect("numeric column exists").values.as_slice())
        .collect();

    let mut kept: Vec<(usize, &Datum)> = Vec::new();
    'rows: for i in 0..df.n_rows() {
        let Some(value) = target_values.get(i) else { continue };
        if value.is_null() {
            continue;
        }
        for column in &features {
            if column[i].as_f64().is_none() {
                continue 'rows;
            }
        }
        kept.push((i, value));
    }
    if kept.is_empty() {
        return Err(TechniqueError::EmptySelection);
    }

    let mut classes: Vec<(String, Option<f64>)> = Vec::new();
    for (_, value) in &kept {
        let label = value.label();
        if !classes.iter().any(|(l, _)| *l == label) {
            classes.push((label, value.as_f64()));
        }
    }
    if classes.iter().all(|(_, v)| v.is_some()) {
        classes.sort_by(|a, b| a.1.unwrap().total_cmp(&b.1.unwrap()));
    } else {
        classes.sort_by(|a, b| a.0.cmp(&b.0));
    }
    let class_labels: Vec<String> = classes.into_iter().map(|(l, _)| l).collect();

    let mut x = Vec::with_capacity(kept.len());
    let mut y = Vec::with_capacity(kept.len());
    for (i, value) in kept {
        let label = value.label();
        let class = class_labels.iter().position(|l| *l == label).expect("label collected");
        x.push(features.iter().map(|column| column[i].as_f64().expect("checked")).collect());
        y.push(class);
    }
    Ok(Classification { feature_names, x, y, classes: class_labels })
}

/// Shuffled train/test index split; the test share is rounded up.
pub(crate) fn train_test_split(
    n: usize,
    test_fraction: f64,
    rng: &mut StdRng,
) -> Result<(Vec<usize>, Vec<usize>), TechniqueError> {
    let n_test = (n as f64 * test_fraction).ceil() as usize;
    if n_test == 0 || n_test >= n {
        return Err(TechniqueError::computation(
            "not enough rows to split into train and test sets",
        ));
    }
    let mut indices: Vec<usize> = (0..n).collect();
    indices.shuffle(rng);
    let test = indices.split_off(n - n_test);
    Ok((indices, test))
}
