//! Gradient boosting over shallow regression trees.

use crate::encode::{Raw, Report};
use crate::error::TechniqueError;
use crate::params::Params;
use crate::table::DataFrame;

use super::metrics::{classification_report, mean_squared_error, r2_score};
use super::tree::{Tree, TreeParams};
use super::{classification_xy, regression_xy, seeded_rng, train_test_split};

const LEARNING_RATE: f64 = 0.1;

fn boosting_tree_params() -> TreeParams {
    TreeParams { max_depth: 3, min_samples_split: 2, max_features: None }
}

struct BoostedStage {
    trees: Vec<Tree>,
    base: f64,
}

impl BoostedStage {
    fn score(&self, row: &[f64]) -> f64 {
        self.base + self.trees.iter().map(|t| LEARNING_RATE * t.predict(row)).sum::<f64>()
    }
}

/// Fit one boosted ensemble against continuous targets (squared loss).
fn boost_regression(
    x: &[Vec<f64>],
    y: &[f64],
    n_estimators: usize,
    rng: &mut rand::rngs::StdRng,
) -> BoostedStage {
    let base = y.iter().sum::<f64>() / y.len() as f64;
    let params = boosting_tree_params();
    let mut stage = BoostedStage { trees: Vec::with_capacity(n_estimators), base };
    let mut current: Vec<f64> = vec![base; y.len()];

    for _ in 0..n_estimators {
        let residuals: Vec<f64> = y.iter().zip(&current).map(|(t, c)| t - c).collect();
        if residuals.iter().all(|r| r.abs() < 1e-12) {
            break;
        }
        let tree = Tree::fit_regression(x, &residuals, &params, rng);
        for (c, row) in current.iter_mut().zip(x) {
            *c += LEARNING_RATE * tree.predict(row);
        }
        stage.trees.push(tree);
    }
    stage
}

fn sigmoid(v: f64) -> f64 {
    1.0 / (1.0 + (-v).exp())
}

/// Fit one binary logistic ensemble; `y` holds 0/1 targets.
fn boost_binary(
    x: &[Vec<f64>],
    y: &[f64],
    n_estimators: usize,
    rng: &mut rand::rngs::StdRng,
) -> BoostedStage {
    let positive = y.iter().sum::<f64>() / y.len() as f64;
    let base = (positive.clamp(1e-6, 1.0 - 1e-6) / (1.0 - positive.clamp(1e-6, 1.0 - 1e-6))).ln();
    let params = boosting_tree_params();
    let mut stage = BoostedStage { trees: Vec::with_capacity(n_estimators), base };
    let mut current: Vec<f64> = vec![base; y.len()];

    for _ in 0..n_estimators {
        let residuals: Vec<f64> =
            y.iter().zip(&current).map(|(t, c)| t - sigmoid(*c)).collect();
        if residuals.iter().all(|r| r.abs() < 1e-9) {
            break;
        }
        let tree = Tree::fit_regression(x, &residuals, &params, rng);
        for (c, row) in current.iter_mut().zip(x) {
            *c += LEARNING_RATE * tree.predict(row);
        }
        stage.trees.push(tree);
    }
    stage
}

fn combined_importances(stages: &[&BoostedStage], d: usize) -> Vec<f64> {
    let mut importances = vec![0.0; d];
    for stage in stages {
        for tree in &stage.trees {
            for (total, v) in importances.iter_mut().zip(&tree.importances) {
                *total += v;
            }
        }
    }
    let sum: f64 = importances.iter().sum();
    if sum > 0.0 {
        importances.iter_mut().for_each(|v| *v /= sum);
    }
    importances
}

fn importance_map(names: &[String], importances: &[f64]) -> Raw {
    Raw::map(
        names
            .iter()
            .zip(importances)
            .map(|(name, v)| (name.clone(), Raw::Float(*v))),
    )
}

/// Boosted trees on squared loss, fitted and scored on the full data.
pub fn gradient_boosting_regressor(
    df: &DataFrame,
    params: &Params,
) -> Result<Report, TechniqueError> {
    let data = regression_xy(df, params)?;
    let n_estimators = params.get_usize("n_estimators", 100);
    let mut rng = seeded_rng(params);

    let stage = boost_regression(&data.x, &data.y, n_estimators, &mut rng);
    let predictions: Vec<f64> = data.x.iter().map(|row| stage.score(row)).collect();
    let pairs: Vec<Raw> = predictions
        .iter()
        .zip(&data.y)
        .map(|(p, a)| Raw::from(vec![*p, *a]))
        .collect();
    let importances = combined_importances(&[&stage], data.feature_names.len());

    Ok(Report::new(
        "Gradient Boosting Regressor builds models sequentially, minimizing the error of the \
         previous model using decision trees.",
    )
    .chart("predicted_vs_actual", Raw::Seq(pairs))
    .stat("r2", r2_score(&data.y, &predictions))
    .stat("mse", mean_squared_error(&data.y, &predictions))
    .table("feature_importances", importance_map(&data.feature_names, &importances)))
}

/// One-vs-rest boosted logistic trees evaluated on a held-out 30% split.
pub fn gradient_boosting_classifier(
    df: &DataFrame,
    params: &Params,
) -> Result<Report, TechniqueError> {
    let data = classification_xy(df, params)?;
    let n_estimators = params.get_usize("n_estimators", 100);
    let mut rng = seeded_rng(params);
    let (train_idx, test_idx) = train_test_split(data.x.len(), 0.3, &mut rng)?;

    let x_train: Vec<Vec<f64>> = train_idx.iter().map(|&i| data.x[i].clone()).collect();
    let y_train: Vec<usize> = train_idx.iter().map(|&i| data.y[i]).collect();
    let x_test: Vec<Vec<f64>> = test_idx.iter().map(|&i| data.x[i].clone()).collect();
    let y_test: Vec<usize> = test_idx.iter().map(|&i| data.y[i]).collect();

    let stages: Vec<BoostedStage> = (0..data.classes.len())
        .map(|class| {
            let targets: Vec<f64> = y_train
                .iter()
                .map(|&y| if y == class { 1.0 } else { 0.0 })
                .collect();
            boost_binary(&x_train, &targets, n_estimators, &mut rng)
        })
        .collect();

    let predictions: Vec<usize> = x_test
        .iter()
        .map(|row| {
            stages
                .iter()
                .enumerate()
                .max_by(|(_, a), (_, b)| a.score(row).total_cmp(&b.score(row)))
                .map(|(class, _)| class)
                .unwrap_or(0)
        })
        .collect();

    let stage_refs: Vec<&BoostedStage> = stages.iter().collect();
    let importances = combined_importances(&stage_refs, data.feature_names.len());
    let hits = y_test.iter().zip(&predictions).filter(|(a, p)| a == p).count();
    let accuracy = hits as f64 / y_test.len().max(1) as f64;

    Ok(Report::new(
        "Gradient Boosting Classifier combines weak learners (typically decision trees) into a \
         strong classifier through boosting.",
    )
    .chart("feature_importances", importance_map(&data.feature_names, &importances))
    .stat("accuracy", accuracy)
    .table(
        "classification_report",
        classification_report(&y_test, &predictions, &data.classes),
    ))
}
