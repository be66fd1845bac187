//! Gaussian naive Bayes.

use std::f64::consts::PI;

use crate::encode::{Raw, Report};
use crate::error::TechniqueError;
use crate::params::Params;
use crate::table::DataFrame;

use super::classification_xy;
use super::metrics::{accuracy, per_class_stats, round4, weighted_average};

struct ClassModel {
    prior: f64,
    means: Vec<f64>,
    variances: Vec<f64>,
}

impl ClassModel {
    fn log_likelihood(&self, row: &[f64]) -> f64 {
        let mut ll = self.prior.ln();
        for ((x, m), v) in row.iter().zip(&self.means).zip(&self.variances) {
            ll += -0.5 * ((x - m) * (x - m) / v + (2.0 * PI * v).ln());
        }
        ll
    }
}

/// Fit on the full data and score the training predictions, as the original
/// module did.
pub fn gaussian_nb(df: &DataFrame, params: &Params) -> Result<Report, TechniqueError> {
    let data = classification_xy(df, params)?;
    let n = data.x.len() as f64;
    let d = data.feature_names.len();

    // Variance smoothing keeps degenerate features from zeroing the density.
    let mut max_variance: f64 = 0.0;
    for j in 0..d {
        let mean = data.x.iter().map(|row| row[j]).sum::<f64>() / n;
        let var = data.x.iter().map(|row| (row[j] - mean).powi(2)).sum::<f64>() / n;
        max_variance = max_variance.max(var);
    }
    let smoothing = 1e-9 * max_variance.max(1.0);

    let models: Vec<ClassModel> = (0..data.classes.len())
        .map(|class| {
            let rows: Vec<&Vec<f64>> = data
                .x
                .iter()
                .zip(&data.y)
                .filter(|(_, &y)| y == class)
                .map(|(row, _)| row)
                .collect();
            let count = rows.len() as f64;
            let means: Vec<f64> = (0..d)
                .map(|j| rows.iter().map(|row| row[j]).sum::<f64>() / count)
                .collect();
            let variances: Vec<f64> = (0..d)
                .map(|j| {
                    rows.iter().map(|row| (row[j] - means[j]).powi(2)).sum::<f64>() / count
                        + smoothing
                })
                .collect();
            ClassModel { prior: count / n, means, variances }
        })
        .collect();

    let predictions: Vec<usize> = data
        .x
        .iter()
        .map(|row| {
            models
                .iter()
                .enumerate()
                .max_by(|(_, a), (_, b)| a.log_likelihood(row).total_cmp(&b.log_likelihood(row)))
                .map(|(class, _)| class)
                .unwrap_or(0)
        })
        .collect();

    let stats = per_class_stats(&data.y, &predictions, data.classes.len());
    let weighted = weighted_average(&stats);
    let priors = Raw::map(
        data.classes
            .iter()
            .zip(&models)
            .map(|(label, model)| (label.clone(), Raw::Float(model.prior))),
    );

    Ok(Report::new(
        "Naive Bayes applies Bayes' theorem with strong independence assumptions between \
         features. It's often used for text classification and spam filtering.",
    )
    .stat("accuracy", round4(accuracy(&data.y, &predictions)))
    .stat("precision", round4(weighted.precision))
    .stat("recall", round4(weighted.recall))
    .stat("f1", round4(weighted.f1))
    .stat("class_priors", priors))
}
