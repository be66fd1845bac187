//! Linear support-vector techniques trained with seeded subgradient descent.

use rand::rngs::StdRng;
use rand::seq::SliceRandom;

use crate::encode::{Raw, Report};
use crate::error::TechniqueError;
use crate::params::Params;
use crate::table::DataFrame;

use super::linalg::standardize;
use super::metrics::{accuracy, classification_report, mean_squared_error, r2_score, round4};
use super::{classification_xy, regression_xy, seeded_rng, train_test_split};

const EPOCHS: usize = 100;

struct LinearModel {
    w: Vec<f64>,
    b: f64,
}

impl LinearModel {
    fn score(&self, row: &[f64]) -> f64 {
        self.b + row.iter().zip(&self.w).map(|(x, w)| x * w).sum::<f64>()
    }
}

/// Pegasos-style hinge-loss training for one binary problem (`y` in ±1).
fn fit_hinge(x: &[Vec<f64>], y: &[f64], rng: &mut StdRng) -> LinearModel {
    let n = x.len();
    let d = x.first().map_or(0, Vec::len);
    let lambda = 1.0 / n as f64;
    let mut model = LinearModel { w: vec![0.0; d], b: 0.0 };
    let mut order: Vec<usize> = (0..n).collect();
    let mut t = 0usize;

    for _ in 0..EPOCHS {
        order.shuffle(rng);
        for &i in &order {
            t += 1;
            let eta = 1.0 / (lambda * t as f64);
            let margin = y[i] * model.score(&x[i]);
            let scale = 1.0 - eta * lambda;
            model.w.iter_mut().for_each(|w| *w *= scale);
            if margin < 1.0 {
                for (w, v) in model.w.iter_mut().zip(&x[i]) {
                    *w += eta * y[i] * v;
                }
                model.b += eta * y[i];
            }
        }
    }
    model
}

/// Epsilon-insensitive subgradient training on standardized data.
fn fit_epsilon(x: &[Vec<f64>], y: &[f64], epsilon: f64, rng: &mut StdRng) -> LinearModel {
    let n = x.len();
    let d = x.first().map_or(0, Vec::len);
    let lambda = 1.0 / n as f64;
    let mut model = LinearModel { w: vec![0.0; d], b: 0.0 };
    let mut order: Vec<usize> = (0..n).collect();
    let mut t = 0usize;

    for _ in 0..EPOCHS {
        order.shuffle(rng);
        for &i in &order {
            t += 1;
            let eta = 1.0 / (lambda * t as f64);
            let err = y[i] - model.score(&x[i]);
            let scale = 1.0 - eta * lambda;
            model.w.iter_mut().for_each(|w| *w *= scale);
            if err.abs() > epsilon {
                let sign = err.signum();
                for (w, v) in model.w.iter_mut().zip(&x[i]) {
                    *w += eta * sign * v;
                }
                model.b += eta * sign;
            }
        }
    }
    model
}

/// One-vs-rest linear SVC evaluated on a held-out 25% split.
pub fn svc(df: &DataFrame, params: &Params) -> Result<Report, TechniqueError> {
    let data = classification_xy(df, params)?;
    let mut rng = seeded_rng(params);
    let (train_idx, test_idx) = train_test_split(data.x.len(), 0.25, &mut rng)?;

    let mut x_train: Vec<Vec<f64>> = train_idx.iter().map(|&i| data.x[i].clone()).collect();
    let y_train: Vec<usize> = train_idx.iter().map(|&i| data.y[i]).collect();
    let (means, stds) = standardize(&mut x_train);
    let x_test: Vec<Vec<f64>> = test_idx
        .iter()
        .map(|&i| {
            data.x[i]
                .iter()
                .zip(means.iter().zip(&stds))
                .map(|(v, (m, s))| (v - m) / s)
                .collect()
        })
        .collect();
    let y_test: Vec<usize> = test_idx.iter().map(|&i| data.y[i]).collect();

    let models: Vec<LinearModel> = (0..data.classes.len())
        .map(|class| {
            let signed: Vec<f64> = y_train
                .iter()
                .map(|&y| if y == class { 1.0 } else { -1.0 })
                .collect();
            fit_hinge(&x_train, &signed, &mut rng)
        })
        .collect();

    let predictions: Vec<usize> = x_test
        .iter()
        .map(|row| {
            models
                .iter()
                .enumerate()
                .max_by(|(_, a), (_, b)| a.score(row).total_cmp(&b.score(row)))
                .map(|(class, _)| class)
                .unwrap_or(0)
        })
        .collect();

    Ok(Report::new(
        "Support Vector Classifier finds an optimal separating hyperplane in high-dimensional \
         space for classification.",
    )
    .stat("accuracy", round4(accuracy(&y_test, &predictions)))
    .table(
        "classification_report",
        classification_report(&y_test, &predictions, &data.classes),
    ))
}

/// Linear epsilon-insensitive SVR fitted and evaluated on the full data.
pub fn svr(df: &DataFrame, params: &Params) -> Result<Report, TechniqueError> {
    let data = regression_xy(df, params)?;
    let epsilon = params.get_f64("epsilon", 0.1);
    let mut rng = seeded_rng(params);

    let mut x = data.x.clone();
    let (x_means, x_stds) = standardize(&mut x);
    let y_mean = data.y.iter().sum::<f64>() / data.y.len() as f64;
    let y_std = {
        let var =
            data.y.iter().map(|v| (v - y_mean) * (v - y_mean)).sum::<f64>() / data.y.len() as f64;
        let std = var.sqrt();
        if std < 1e-12 {
            1.0
        } else {
            std
        }
    };
    let y_scaled: Vec<f64> = data.y.iter().map(|v| (v - y_mean) / y_std).collect();

    let model = fit_epsilon(&x, &y_scaled, epsilon, &mut rng);

    // Map the standardized weights back to the original feature space.
    let coefficients: Vec<f64> = model
        .w
        .iter()
        .zip(&x_stds)
        .map(|(w, s)| w * y_std / s)
        .collect();
    let intercept = y_mean + y_std * model.b
        - coefficients.iter().zip(&x_means).map(|(w, m)| w * m).sum::<f64>();

    let predictions: Vec<f64> = data
        .x
        .iter()
        .map(|row| {
            intercept + row.iter().zip(&coefficients).map(|(v, w)| v * w).sum::<f64>()
        })
        .collect();
    let pairs: Vec<Raw> = predictions
        .iter()
        .zip(&data.y)
        .map(|(p, a)| Raw::from(vec![*p, *a]))
        .collect();
    let coefficient_table = Raw::map(
        data.feature_names
            .iter()
            .zip(&coefficients)
            .map(|(name, w)| (name.clone(), Raw::Float(*w))),
    );

    Ok(Report::new(
        "Support Vector Regression fits a linear model that tolerates errors inside an epsilon \
         margin and penalizes only larger deviations.",
    )
    .chart("predicted_vs_actual", Raw::Seq(pairs))
    .stat("r2", round4(r2_score(&data.y, &predictions)))
    .stat("mse", round4(mean_squared_error(&data.y, &predictions)))
    .table("coefficients", coefficient_table))
}
