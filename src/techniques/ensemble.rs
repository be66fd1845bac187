//! Tree ensembles: isolation forest and random forest.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;

use crate::encode::{Raw, Report};
use crate::error::TechniqueError;
use crate::params::Params;
use crate::table::DataFrame;

use super::metrics::classification_report;
use super::tree::{Tree, TreeParams};
use super::{classification_xy, seeded_rng, train_test_split};

const N_TREES: usize = 100;

/// Average unsuccessful-search path length of a binary search tree of `m`
/// nodes; the normalization constant of the isolation-forest score.
fn average_path_length(m: usize) -> f64 {
    match m {
        0 | 1 => 0.0,
        2 => 1.0,
        _ => {
            let m = m as f64;
            let harmonic = (m - 1.0).ln() + 0.577_215_664_901_532_9;
            2.0 * harmonic - 2.0 * (m - 1.0) / m
        }
    }
}

enum IsoNode {
    Leaf { size: usize },
    Split { feature: usize, threshold: f64, left: usize, right: usize },
}

struct IsoTree {
    nodes: Vec<IsoNode>,
}

impl IsoTree {
    fn fit(rows: &[Vec<f64>], sample: &[usize], depth_limit: usize, rng: &mut StdRng) -> IsoTree {
        let mut tree = IsoTree { nodes: Vec::new() };
        tree.grow(rows, sample.to_vec(), 0, depth_limit, rng);
        tree
    }

    fn grow(
        &mut self,
        rows: &[Vec<f64>],
        indices: Vec<usize>,
        depth: usize,
        depth_limit: usize,
        rng: &mut StdRng,
    ) -> usize {
        let d = rows.first().map_or(0, Vec::len);
        if depth >= depth_limit || indices.len() <= 1 {
            self.nodes.push(IsoNode::Leaf { size: indices.len() });
            return self.nodes.len() - 1;
        }

        // Pick a feature that still varies within this node.
        let start = rng.gen_range(0..d);
        let mut chosen = None;
        for offset in 0..d {
            let feature = (start + offset) % d;
            let mut lo = f64::INFINITY;
            let mut hi = f64::NEG_INFINITY;
            for &i in &indices {
                lo = lo.min(rows[i][feature]);
                hi = hi.max(rows[i][feature]);
            }
            if hi > lo {
                chosen = Some((feature, lo, hi));
                break;
            }
        }
        let Some((feature, lo, hi)) = chosen else {
            self.nodes.push(IsoNode::Leaf { size: indices.len() });
            return self.nodes.len() - 1;
        };

        let threshold = lo + rng.gen::<f64>() * (hi - lo);
        let (left_idx, right_idx): (Vec<usize>, Vec<usize>) =
            indices.iter().copied().partition(|&i| rows[i][feature] < threshold);

        let id = self.nodes.len();
        self.nodes.push(IsoNode::Leaf { size: 0 });
        let left = self.grow(rows, left_idx, depth + 1, depth_limit, rng);
        let right = self.grow(rows, right_idx, depth + 1, depth_limit, rng);
        self.nodes[id] = IsoNode::Split { feature, threshold, left, right };
        id
    }

    fn path_length(&self, row: &[f64]) -> f64 {
        let mut node = 0;
        let mut depth = 0.0;
        loop {
            match &self.nodes[node] {
                IsoNode::Leaf { size } => return depth + average_path_length(*size),
                IsoNode::Split { feature, threshold, left, right } => {
                    depth += 1.0;
                    node = if row[*feature] < *threshold { *left } else { *right };
                }
            }
        }
    }
}

/// Isolation forest anomaly detection. Scores follow the usual convention:
/// lower means more anomalous; flagged rows get label −1.
pub fn isolation_forest(df: &DataFrame, params: &Params) -> Result<Report, TechniqueError> {
    let (names, rows) = df.numeric_matrix();
    if names.is_empty() {
        return Err(TechniqueError::NoNumericColumns);
    }
    if rows.is_empty() {
        return Err(TechniqueError::EmptySelection);
    }

    let contamination = params.get_f64("contamination", 0.1);
    if contamination <= 0.0 || contamination > 0.5 {
        return Err(TechniqueError::InvalidParam {
            name: "contamination",
            reason: "must be in (0, 0.5]".to_string(),
        });
    }

    let n = rows.len();
    let subsample = n.min(256);
    let depth_limit = (subsample as f64).log2().ceil() as usize;
    let mut rng = seeded_rng(params);

    let trees: Vec<IsoTree> = (0..N_TREES)
        .map(|_| {
            let sample: Vec<usize> = (0..subsample).map(|_| rng.gen_range(0..n)).collect();
            IsoTree::fit(&rows, &sample, depth_limit.max(1), &mut rng)
        })
        .collect();

    let normalizer = average_path_length(subsample).max(1.0);
    let decisions: Vec<f64> = rows
        .par_iter()
        .map(|row| {
            let mean_path =
                trees.iter().map(|t| t.path_length(row)).sum::<f64>() / trees.len() as f64;
            let score = 2f64.powf(-mean_path / normalizer);
            0.5 - score
        })
        .collect();

    let n_outliers = (contamination * n as f64).round() as usize;
    let mut order: Vec<usize> = (0..n).collect();
    order.sort_by(|&a, &b| decisions[a].total_cmp(&decisions[b]));
    let mut labels = vec![1i64; n];
    for &i in order.iter().take(n_outliers) {
        labels[i] = -1;
    }

    let outliers: Vec<Raw> = labels
        .iter()
        .enumerate()
        .map(|(i, &label)| Raw::map([("Index", Raw::Int(i as i64)), ("Anomaly", Raw::Int(label))]))
        .collect();

    Ok(Report::new(
        "Isolation Forest isolates anomalies instead of profiling normal data. It is effective \
         for unsupervised anomaly detection.",
    )
    .chart("anomaly_scores", decisions)
    .stat("n_outliers", n_outliers)
    .stat("n_samples", n)
    .table("outliers", Raw::Seq(outliers)))
}

/// Bagged CART classifier evaluated on a held-out 30% split.
pub fn random_forest_classifier(df: &DataFrame, params: &Params) -> Result<Report, TechniqueError> {
    let data = classification_xy(df, params)?;
    let mut rng = seeded_rng(params);
    let (train_idx, test_idx) = train_test_split(data.x.len(), 0.3, &mut rng)?;

    let x_train: Vec<Vec<f64>> = train_idx.iter().map(|&i| data.x[i].clone()).collect();
    let y_train: Vec<usize> = train_idx.iter().map(|&i| data.y[i]).collect();
    let x_test: Vec<Vec<f64>> = test_idx.iter().map(|&i| data.x[i].clone()).collect();
    let y_test: Vec<usize> = test_idx.iter().map(|&i| data.y[i]).collect();

    let d = data.feature_names.len();
    let tree_params = TreeParams {
        max_depth: 10,
        min_samples_split: 2,
        max_features: Some(((d as f64).sqrt().ceil() as usize).max(1)),
    };

    // Per-tree seeds drawn up front keep the forest deterministic however
    // rayon schedules the work.
    let seeds: Vec<u64> = (0..N_TREES).map(|_| rng.gen()).collect();
    let n_train = x_train.len();
    let trees: Vec<Tree> = seeds
        .par_iter()
        .map(|&seed| {
            let mut tree_rng = StdRng::seed_from_u64(seed);
            let sample: Vec<usize> =
                (0..n_train).map(|_| tree_rng.gen_range(0..n_train)).collect();
            let bx: Vec<Vec<f64>> = sample.iter().map(|&i| x_train[i].clone()).collect();
            let by: Vec<usize> = sample.iter().map(|&i| y_train[i]).collect();
            Tree::fit_classification(&bx, &by, data.classes.len(), &tree_params, &mut tree_rng)
        })
        .collect();

    let predictions: Vec<usize> = x_test
        .iter()
        .map(|row| {
            let mut votes = vec![0usize; data.classes.len()];
            for tree in &trees {
                votes[tree.predict_class(row)] += 1;
            }
            votes
                .iter()
                .enumerate()
                .max_by_key(|&(_, v)| *v)
                .map(|(class, _)| class)
                .unwrap_or(0)
        })
        .collect();

    let mut importances = vec![0.0; d];
    for tree in &trees {
        for (total, v) in importances.iter_mut().zip(&tree.importances) {
            *total += v;
        }
    }
    let sum: f64 = importances.iter().sum();
    if sum > 0.0 {
        importances.iter_mut().for_each(|v| *v /= sum);
    }
    let importance_map = Raw::map(
        data.feature_names
            .iter()
            .zip(&importances)
            .map(|(name, v)| (name.clone(), Raw::Float(*v))),
    );

    let hits = y_test.iter().zip(&predictions).filter(|(a, p)| a == p).count();
    let accuracy = hits as f64 / y_test.len().max(1) as f64;

    Ok(Report::new(
        "Random Forest is an ensemble of decision trees that improves accuracy and reduces \
         overfitting.",
    )
    .chart("feature_importances", importance_map)
    .stat("accuracy", accuracy)
    .table(
        "classification_report",
        classification_report(&y_test, &predictions, &data.classes),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params::ParamValue;

    #[test]
    fn isolation_forest_flags_the_far_point() {
        let mut csv = String::from("x,y\n");
        for i in 0..19 {
            csv.push_str(&format!("{},{}\n", i as f64 * 0.05, i as f64 * 0.05));
        }
        csv.push_str("50,50\n");
        let df = DataFrame::from_csv(&csv).unwrap();
        let mut params = Params::new();
        params.insert("contamination", ParamValue::Float(0.05));

        let report = isolation_forest(&df, &params).unwrap();
        assert_eq!(report.stats.get("n_outliers"), Some(&Raw::Int(1)));
        assert_eq!(report.stats.get("n_samples"), Some(&Raw::Int(20)));
        let Some(Raw::Seq(outliers)) = report.tables.get("outliers") else {
            panic!("outliers missing")
        };
        let Raw::Map(last) = &outliers[19] else { panic!("row must be a map") };
        assert_eq!(last.get("Anomaly"), Some(&Raw::Int(-1)));
    }

    #[test]
    fn random_forest_classifies_separable_data() {
        let mut csv = String::from("label,x,y\n");
        for i in 0..12 {
            csv.push_str(&format!("0,{},{}\n", i as f64 * 0.1, i as f64 * 0.1));
        }
        for i in 0..12 {
            csv.push_str(&format!("1,{},{}\n", 5.0 + i as f64 * 0.1, 5.0 + i as f64 * 0.1));
        }
        let df = DataFrame::from_csv(&csv).unwrap();
        let report = random_forest_classifier(&df, &Params::new()).unwrap();
        let Some(Raw::Float(acc)) = report.stats.get("accuracy") else {
            panic!("accuracy missing")
        };
        assert!(*acc > 0.8, "separable data should classify well, got {acc}");
        assert!(report.charts.contains_key("feature_importances"));
    }

    #[test]
    fn forest_runs_are_reproducible() {
        let mut csv = String::from("label,x,y\n");
        for i in 0..20 {
            csv.push_str(&format!("{},{},{}\n", i % 2, i as f64, (i * 7 % 13) as f64));
        }
        let df = DataFrame::from_csv(&csv).unwrap();
        let a = random_forest_classifier(&df, &Params::new()).unwrap();
        let b = random_forest_classifier(&df, &Params::new()).unwrap();
        assert_eq!(a.stats, b.stats);
        assert_eq!(a.charts, b.charts);
    }
}
