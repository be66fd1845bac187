//! Linear regressors: ordinary least squares, ridge and lasso.

use crate::encode::{Raw, Report};
use crate::error::TechniqueError;
use crate::params::Params;
use crate::table::DataFrame;

use super::linalg::{column_means, solve};
use super::metrics::{mean_squared_error, r2_score, round4};
use super::{regression_xy, Regression};

struct LinearFit {
    coefficients: Vec<f64>,
    intercept: f64,
}

impl LinearFit {
    fn predict(&self, row: &[f64]) -> f64 {
        self.intercept + row.iter().zip(&self.coefficients).map(|(x, w)| x * w).sum::<f64>()
    }
}

fn centered(data: &Regression) -> (Vec<Vec<f64>>, Vec<f64>, Vec<f64>, f64) {
    let x_means = column_means(&data.x);
    let y_mean = data.y.iter().sum::<f64>() / data.y.len() as f64;
    let xc: Vec<Vec<f64>> = data
        .x
        .iter()
        .map(|row| row.iter().zip(&x_means).map(|(v, m)| v - m).collect())
        .collect();
    let yc: Vec<f64> = data.y.iter().map(|v| v - y_mean).collect();
    (xc, yc, x_means, y_mean)
}

/// Solve the (optionally L2-regularized) normal equations; the intercept is
/// recovered from the means and never penalized.
fn fit_least_squares(data: &Regression, alpha: f64) -> Result<LinearFit, TechniqueError> {
    let (xc, yc, x_means, y_mean) = centered(data);
    let d = data.feature_names.len();

    let mut gram = vec![vec![0.0; d]; d];
    let mut rhs = vec![0.0; d];
    for (row, &target) in xc.iter().zip(&yc) {
        for i in 0..d {
            rhs[i] += row[i] * target;
            for j in i..d {
                gram[i][j] += row[i] * row[j];
            }
        }
    }
    for i in 0..d {
        for j in 0..i {
            gram[i][j] = gram[j][i];
        }
        gram[i][i] += alpha;
    }

    let coefficients = solve(gram, rhs)?;
    let intercept =
        y_mean - coefficients.iter().zip(&x_means).map(|(w, m)| w * m).sum::<f64>();
    Ok(LinearFit { coefficients, intercept })
}

/// Cyclic coordinate descent on the lasso objective
/// `1/(2n) * ||y - Xw||^2 + alpha * ||w||_1`.
fn fit_lasso(data: &Regression, alpha: f64) -> LinearFit {
    let (xc, yc, x_means, y_mean) = centered(data);
    let n = data.x.len() as f64;
    let d = data.feature_names.len();

    let z: Vec<f64> = (0..d)
        .map(|j| xc.iter().map(|row| row[j] * row[j]).sum::<f64>())
        .collect();
    let mut w = vec![0.0; d];
    let mut residual = yc;

    for _ in 0..1000 {
        let mut max_delta: f64 = 0.0;
        for j in 0..d {
            if z[j] <= 1e-12 {
                continue; // constant feature
            }
            let rho: f64 = xc
                .iter()
                .zip(&residual)
                .map(|(row, r)| row[j] * r)
                .sum::<f64>()
                + z[j] * w[j];
            let updated = soft_threshold(rho / n, alpha) / (z[j] / n);
            let delta = updated - w[j];
            if delta != 0.0 {
                for (row, r) in xc.iter().zip(residual.iter_mut()) {
                    *r -= row[j] * delta;
                }
                w[j] = updated;
            }
            max_delta = max_delta.max(delta.abs());
        }
        if max_delta < 1e-4 {
            break;
        }
    }

    let intercept = y_mean - w.iter().zip(&x_means).map(|(w, m)| w * m).sum::<f64>();
    LinearFit { coefficients: w, intercept }
}

fn soft_threshold(v: f64, threshold: f64) -> f64 {
    if v > threshold {
        v - threshold
    } else if v < -threshold {
        v + threshold
    } else {
        0.0
    }
}

fn regression_report(data: &Regression, fit: &LinearFit, explanation: &str) -> Report {
    let predictions: Vec<f64> = data.x.iter().map(|row| fit.predict(row)).collect();
    let pairs: Vec<Raw> = predictions
        .iter()
        .zip(&data.y)
        .map(|(p, a)| Raw::from(vec![*p, *a]))
        .collect();
    let coefficients = Raw::map(
        data.feature_names
            .iter()
            .zip(&fit.coefficients)
            .map(|(name, w)| (name.clone(), Raw::Float(*w))),
    );

    Report::new(explanation)
        .chart("predicted_vs_actual", Raw::Seq(pairs))
        .stat("r2", round4(r2_score(&data.y, &predictions)))
        .stat("mse", round4(mean_squared_error(&data.y, &predictions)))
        .table("coefficients", coefficients)
}

pub fn linear_regression(df: &DataFrame, params: &Params) -> Result<Report, TechniqueError> {
    let data = regression_xy(df, params)?;
    let fit = fit_least_squares(&data, 0.0)?;
    Ok(regression_report(
        &data,
        &fit,
        "Linear Regression fits an ordinary least squares model expressing the target as a \
         linear combination of the feature columns.",
    ))
}

pub fn ridge_regression(df: &DataFrame, params: &Params) -> Result<Report, TechniqueError> {
    let data = regression_xy(df, params)?;
    let alpha = params.get_f64("alpha", 1.0);
    let fit = fit_least_squares(&data, alpha)?;
    Ok(regression_report(
        &data,
        &fit,
        "Ridge Regression adds L2 regularization to penalize large coefficients and reduce \
         overfitting.",
    ))
}

pub fn lasso_regression(df: &DataFrame, params: &Params) -> Result<Report, TechniqueError> {
    let data = regression_xy(df, params)?;
    let alpha = params.get_f64("alpha", 1.0);
    let fit = fit_lasso(&data, alpha);
    Ok(regression_report(
        &data,
        &fit,
        "Lasso Regression adds L1 regularization that can shrink coefficients to exactly zero, \
         dropping uninformative features.",
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params::ParamValue;

    /// y = 2x + 1 with a second informative feature column.
    fn line_frame() -> DataFrame {
        let mut csv = String::from("y,x\n");
        for i in 0..12 {
            let x = i as f64;
            csv.push_str(&format!("{},{}\n", 2.0 * x + 1.0, x));
        }
        DataFrame::from_csv(&csv).unwrap()
    }

    #[test]
    fn ols_recovers_the_line() {
        let mut params = Params::new();
        params.insert("target_column", ParamValue::Str("y".into()));
        let report = linear_regression(&line_frame(), &params).unwrap();
        assert_eq!(report.stats.get("r2"), Some(&Raw::Float(1.0)));
        let Some(Raw::Map(coefs)) = report.tables.get("coefficients") else {
            panic!("coefficients missing")
        };
        let Some(Raw::Float(slope)) = coefs.get("x") else { panic!("slope missing") };
        assert!((slope - 2.0).abs() < 1e-8);
    }

    #[test]
    fn ridge_shrinks_towards_zero() {
        let mut params = Params::new();
        params.insert("target_column", ParamValue::Str("y".into()));
        params.insert("alpha", ParamValue::Float(1000.0));
        let report = ridge_regression(&line_frame(), &params).unwrap();
        let Some(Raw::Map(coefs)) = report.tables.get("coefficients") else {
            panic!("coefficients missing")
        };
        let Some(Raw::Float(slope)) = coefs.get("x") else { panic!("slope missing") };
        assert!(*slope < 2.0 && *slope > 0.0);
    }

    #[test]
    fn strong_lasso_zeroes_the_coefficient() {
        let mut params = Params::new();
        params.insert("target_column", ParamValue::Str("y".into()));
        params.insert("alpha", ParamValue::Float(1e6));
        let report = lasso_regression(&line_frame(), &params).unwrap();
        let Some(Raw::Map(coefs)) = report.tables.get("coefficients") else {
            panic!("coefficients missing")
        };
        assert_eq!(coefs.get("x"), Some(&Raw::Float(0.0)));
    }

    #[test]
    fn single_numeric_column_is_rejected() {
        let df = DataFrame::from_csv("x,tag\n1,a\n2,b\n").unwrap();
        let err = linear_regression(&df, &Params::new()).unwrap_err();
        assert_eq!(err.to_string(), "At least 2 numeric columns required");
    }
}
