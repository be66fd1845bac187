//! Kernel PCA: two-component non-linear projection.

use crate::encode::{Raw, Report};
use crate::error::TechniqueError;
use crate::params::Params;
use crate::table::DataFrame;

use super::linalg::symmetric_eigen;

enum Kernel {
    Rbf,
    Linear,
    Poly,
}

impl Kernel {
    fn parse(name: &str) -> Result<Self, TechniqueError> {
        match name {
            "rbf" => Ok(Kernel::Rbf),
            "linear" => Ok(Kernel::Linear),
            "poly" => Ok(Kernel::Poly),
            other => Err(TechniqueError::InvalidParam {
                name: "kernel",
                reason: format!("unknown kernel '{other}'"),
            }),
        }
    }

    fn apply(&self, a: &[f64], b: &[f64], gamma: f64) -> f64 {
        match self {
            Kernel::Rbf => {
                let d2: f64 = a.iter().zip(b).map(|(x, y)| (x - y) * (x - y)).sum();
                (-gamma * d2).exp()
            }
            Kernel::Linear => a.iter().zip(b).map(|(x, y)| x * y).sum(),
            Kernel::Poly => {
                let dot: f64 = a.iter().zip(b).map(|(x, y)| x * y).sum();
                (gamma * dot + 1.0).powi(3)
            }
        }
    }
}

pub fn kernel_pca(df: &DataFrame, params: &Params) -> Result<Report, TechniqueError> {
    let (names, rows) = df.numeric_matrix();
    if names.len() < 2 {
        return Err(TechniqueError::NotEnoughNumericColumns { required: 2 });
    }
    if rows.len() < 2 {
        return Err(TechniqueError::computation(
            "at least 2 complete rows are required for a 2-component projection",
        ));
    }

    let kernel_name = params.get_str("kernel").unwrap_or("rbf");
    let kernel = Kernel::parse(kernel_name)?;
    let gamma = 1.0 / names.len() as f64;

    let n = rows.len();
    let mut k = vec![vec![0.0; n]; n];
    for i in 0..n {
        for j in i..n {
            let v = kernel.apply(&rows[i], &rows[j], gamma);
            k[i][j] = v;
            k[j][i] = v;
        }
    }

    // Center the kernel matrix in feature space.
    let row_means: Vec<f64> = k.iter().map(|row| row.iter().sum::<f64>() / n as f64).collect();
    let total_mean: f64 = row_means.iter().sum::<f64>() / n as f64;
    for i in 0..n {
        for j in 0..n {
            k[i][j] = k[i][j] - row_means[i] - row_means[j] + total_mean;
        }
    }

    let (values, vectors) = symmetric_eigen(k);
    let projection: Vec<Raw> = (0..n)
        .map(|i| {
            let coords: Vec<f64> = (0..2)
                .map(|c| {
                    let scale = values[c].max(0.0).sqrt();
                    vectors[i][c] * scale
                })
                .collect();
            Raw::from(coords)
        })
        .collect();

    let explanation = format!(
        "Kernel PCA reduces dimensionality using a {} kernel, capturing non-linear feature \
         interactions.",
        kernel_name.to_uppercase()
    );
    Ok(Report::new(explanation).chart("projection_2D", Raw::Seq(projection)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params::ParamValue;

    fn frame() -> DataFrame {
        DataFrame::from_csv("x,y,z\n1,2,1\n2,3,0\n3,5,2\n4,4,1\n5,7,3\n6,8,2\n").unwrap()
    }

    #[test]
    fn projects_every_row_into_two_components() {
        let report = kernel_pca(&frame(), &Params::new()).unwrap();
        let Some(Raw::Seq(projection)) = report.charts.get("projection_2D") else {
            panic!("projection missing")
        };
        assert_eq!(projection.len(), 6);
        let Raw::Seq(first) = &projection[0] else { panic!("row must be a pair") };
        assert_eq!(first.len(), 2);
        assert!(report.stats.is_empty());
        assert!(report.tables.is_empty());
    }

    #[test]
    fn one_numeric_column_is_rejected() {
        let df = DataFrame::from_csv("x,tag\n1,a\n2,b\n3,c\n").unwrap();
        let err = kernel_pca(&df, &Params::new()).unwrap_err();
        assert_eq!(err.to_string(), "At least 2 numeric columns required");
    }

    #[test]
    fn unknown_kernel_is_rejected() {
        let mut params = Params::new();
        params.insert("kernel", ParamValue::Str("sigmoid".into()));
        assert!(kernel_pca(&frame(), &params).is_err());
    }

    #[test]
    fn linear_kernel_mentions_itself() {
        let mut params = Params::new();
        params.insert("kernel", ParamValue::Str("linear".into()));
        let report = kernel_pca(&frame(), &params).unwrap();
        assert!(report.explanation.contains("LINEAR"));
    }
}
