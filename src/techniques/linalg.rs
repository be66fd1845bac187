//! Small dense linear-algebra helpers shared by the technique bodies.

use crate::error::TechniqueError;

/// Solve `a * x = b` by Gaussian elimination with partial pivoting.
/// `a` is row-major and square.
pub(crate) fn solve(mut a: Vec<Vec<f64>>, mut b: Vec<f64>) -> Result<Vec<f64>, TechniqueError> {
    let n = a.len();
    for col in 0..n {
        let pivot = (col..n)
            .max_by(|&i, &j| a[i][col].abs().total_cmp(&a[j][col].abs()))
            .unwrap_or(col);
        if a[pivot][col].abs() < 1e-12 {
            return Err(TechniqueError::computation("matrix is singular"));
        }
        a.swap(col, pivot);
        b.swap(col, pivot);

        for row in (col + 1)..n {
            let factor = a[row][col] / a[col][col];
            if factor == 0.0 {
                continue;
            }
            for k in col..n {
                a[row][k] -= factor * a[col][k];
            }
            b[row] -= factor * b[col];
        }
    }

    let mut x = vec![0.0; n];
    for row in (0..n).rev() {
        let mut sum = b[row];
        for k in (row + 1)..n {
            sum -= a[row][k] * x[k];
        }
        x[row] = sum / a[row][row];
    }
    Ok(x)
}

/// Eigen-decomposition of a symmetric matrix by cyclic Jacobi rotation.
/// Returns `(eigenvalues, eigenvectors)` with eigenvectors as columns,
/// sorted by descending eigenvalue.
pub(crate) fn symmetric_eigen(mut a: Vec<Vec<f64>>) -> (Vec<f64>, Vec<Vec<f64>>) {
    let n = a.len();
    let mut v = vec![vec![0.0; n]; n];
    for (i, row) in v.iter_mut().enumerate() {
        row[i] = 1.0;
    }

    for _ in 0..100 {
        let mut off = 0.0;
        for i in 0..n {
            for j in (i + 1)..n {
                off += a[i][j] * a[i][j];
            }
        }
        if off.sqrt() < 1e-10 {
            break;
        }

        for p in 0..n {
            for q in (p + 1)..n {
                if a[p][q].abs() < 1e-14 {
                    continue;
                }
                let theta = (a[q][q] - a[p][p]) / (2.0 * a[p][q]);
                let t = theta.signum() / (theta.abs() + (theta * theta + 1.0).sqrt());
                let c = 1.0 / (t * t + 1.0).sqrt();
                let s = t * c;

                for k in 0..n {
                    let akp = a[k][p];
                    let akq = a[k][q];
                    a[k][p] = c * akp - s * akq;
                    a[k][q] = s * akp + c * akq;
                }
                for k in 0..n {
                    let apk = a[p][k];
                    let aqk = a[q][k];
                    a[p][k] = c * apk - s * aqk;
                    a[q][k] = s * apk + c * aqk;
                }
                for k in 0..n {
                    let vkp = v[k][p];
                    let vkq = v[k][q];
                    v[k][p] = c * vkp - s * vkq;
                    v[k][q] = s * vkp + c * vkq;
                }
            }
        }
    }

    let mut order: Vec<usize> = (0..n).collect();
    order.sort_by(|&i, &j| a[j][j].total_cmp(&a[i][i]));

    let values: Vec<f64> = order.iter().map(|&i| a[i][i]).collect();
    let mut vectors = vec![vec![0.0; n]; n];
    for (new_col, &old_col) in order.iter().enumerate() {
        for row in 0..n {
            vectors[row][new_col] = v[row][old_col];
        }
    }
    (values, vectors)
}

/// Column means of row-major data.
pub(crate) fn column_means(rows: &[Vec<f64>]) -> Vec<f64> {
    let d = rows.first().map_or(0, Vec::len);
    let mut means = vec![0.0; d];
    for row in rows {
        for (m, v) in means.iter_mut().zip(row) {
            *m += v;
        }
    }
    let n = rows.len().max(1) as f64;
    means.iter_mut().for_each(|m| *m /= n);
    means
}

/// Standardize columns in place; zero-variance columns are left centered.
/// Returns `(means, stds)`.
pub(crate) fn standardize(rows: &mut [Vec<f64>]) -> (Vec<f64>, Vec<f64>) {
    let means = column_means(rows);
    let d = means.len();
    let n = rows.len().max(1) as f64;
    let mut stds = vec![0.0; d];
    for row in rows.iter() {
        for j in 0..d {
            let diff = row[j] - means[j];
            stds[j] += diff * diff;
        }
    }
    for s in stds.iter_mut() {
        *s = (*s / n).sqrt();
        if *s < 1e-12 {
            *s = 1.0;
        }
    }
    for row in rows.iter_mut() {
        for j in 0..d {
            row[j] = (row[j] - means[j]) / stds[j];
        }
    }
    (means, stds)
}

pub(crate) fn euclidean(a: &[f64], b: &[f64]) -> f64 {
    a.iter()
        .zip(b)
        .map(|(x, y)| (x - y) * (x - y))
        .sum::<f64>()
        .sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn solves_a_small_system() {
        let a = vec![vec![2.0, 1.0], vec![1.0, 3.0]];
        let x = solve(a, vec![3.0, 5.0]).unwrap();
        assert!((x[0] - 0.8).abs() < 1e-9);
        assert!((x[1] - 1.4).abs() < 1e-9);
    }

    #[test]
    fn singular_systems_are_reported() {
        let a = vec![vec![1.0, 2.0], vec![2.0, 4.0]];
        assert!(solve(a, vec![1.0, 2.0]).is_err());
    }

    #[test]
    fn eigen_of_a_diagonal_matrix() {
        let a = vec![vec![3.0, 0.0], vec![0.0, 1.0]];
        let (values, vectors) = symmetric_eigen(a);
        assert!((values[0] - 3.0).abs() < 1e-8);
        assert!((values[1] - 1.0).abs() < 1e-8);
        assert!((vectors[0][0].abs() - 1.0).abs() < 1e-8);
    }

    #[test]
    fn standardize_centers_and_scales() {
        let mut rows = vec![vec![1.0], vec![3.0]];
        standardize(&mut rows);
        assert!((rows[0][0] + 1.0).abs() < 1e-9);
        assert!((rows[1][0] - 1.0).abs() < 1e-9);
    }
}
