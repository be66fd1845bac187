//! Regression, classification and clustering metrics.

use std::collections::BTreeMap;

use rayon::prelude::*;

use crate::encode::Raw;

use super::linalg::euclidean;

pub(crate) fn mean_squared_error(actual: &[f64], predicted: &[f64]) -> f64 {
    let n = actual.len().max(1) as f64;
    actual
        .iter()
        .zip(predicted)
        .map(|(a, p)| (a - p) * (a - p))
        .sum::<f64>()
        / n
}

/// Coefficient of determination. NaN when the target has zero variance,
/// which the encoder later maps to null.
pub(crate) fn r2_score(actual: &[f64], predicted: &[f64]) -> f64 {
    let mean = actual.iter().sum::<f64>() / actual.len().max(1) as f64;
    let ss_tot: f64 = actual.iter().map(|a| (a - mean) * (a - mean)).sum();
    let ss_res: f64 = actual
        .iter()
        .zip(predicted)
        .map(|(a, p)| (a - p) * (a - p))
        .sum();
    1.0 - ss_res / ss_tot
}

pub(crate) fn accuracy(actual: &[usize], predicted: &[usize]) -> f64 {
    if actual.is_empty() {
        return 0.0;
    }
    let hits = actual.iter().zip(predicted).filter(|(a, p)| a == p).count();
    hits as f64 / actual.len() as f64
}

/// Per-class precision/recall/f1/support.
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct ClassStats {
    pub precision: f64,
    pub recall: f64,
    pub f1: f64,
    pub support: usize,
}

pub(crate) fn per_class_stats(
    actual: &[usize],
    predicted: &[usize],
    n_classes: usize,
) -> Vec<ClassStats> {
    let mut tp = vec![0usize; n_classes];
    let mut fp = vec![0usize; n_classes];
    let mut support = vec![0usize; n_classes];
    for (&a, &p) in actual.iter().zip(predicted) {
        support[a] += 1;
        if a == p {
            tp[p] += 1;
        } else {
            fp[p] += 1;
        }
    }

    (0..n_classes)
        .map(|k| {
            let predicted_k = tp[k] + fp[k];
            let precision = if predicted_k > 0 { tp[k] as f64 / predicted_k as f64 } else { 0.0 };
            let recall = if support[k] > 0 { tp[k] as f64 / support[k] as f64 } else { 0.0 };
            let f1 = if precision + recall > 0.0 {
                2.0 * precision * recall / (precision + recall)
            } else {
                0.0
            };
            ClassStats { precision, recall, f1, support: support[k] }
        })
        .collect()
}

/// Support-weighted average of per-class stats.
pub(crate) fn weighted_average(stats: &[ClassStats]) -> ClassStats {
    let total: usize = stats.iter().map(|s| s.support).sum();
    if total == 0 {
        return ClassStats::default();
    }
    let mut avg = ClassStats { support: total, ..Default::default() };
    for s in stats {
        let w = s.support as f64 / total as f64;
        avg.precision += w * s.precision;
        avg.recall += w * s.recall;
        avg.f1 += w * s.f1;
    }
    avg
}

fn stats_entry(s: &ClassStats) -> Raw {
    Raw::map([
        ("precision", Raw::Float(s.precision)),
        ("recall", Raw::Float(s.recall)),
        ("f1-score", Raw::Float(s.f1)),
        ("support", Raw::Float(s.support as f64)),
    ])
}

/// The per-class report consumed by the classifier envelopes: one entry per
/// class label, plus `accuracy`, `macro avg` and `weighted avg` rows.
pub(crate) fn classification_report(
    actual: &[usize],
    predicted: &[usize],
    classes: &[String],
) -> Raw {
    let stats = per_class_stats(actual, predicted, classes.len());
    let mut report: BTreeMap<String, Raw> = BTreeMap::new();
    for (label, s) in classes.iter().zip(&stats) {
        report.insert(label.clone(), stats_entry(s));
    }

    let n = stats.len().max(1) as f64;
    let macro_avg = ClassStats {
        precision: stats.iter().map(|s| s.precision).sum::<f64>() / n,
        recall: stats.iter().map(|s| s.recall).sum::<f64>() / n,
        f1: stats.iter().map(|s| s.f1).sum::<f64>() / n,
        support: stats.iter().map(|s| s.support).sum(),
    };
    report.insert("accuracy".to_string(), Raw::Float(accuracy(actual, predicted)));
    report.insert("macro avg".to_string(), stats_entry(&macro_avg));
    report.insert("weighted avg".to_string(), stats_entry(&weighted_average(&stats)));
    Raw::Map(report)
}

/// Mean silhouette coefficient over all samples. Samples in singleton
/// clusters contribute zero, matching the usual convention.
pub(crate) fn silhouette_score(rows: &[Vec<f64>], labels: &[usize]) -> f64 {
    let n = rows.len();
    if n == 0 {
        return 0.0;
    }
    let clusters: Vec<usize> = {
        let mut c: Vec<usize> = labels.to_vec();
        c.sort_unstable();
        c.dedup();
        c
    };
    if clusters.len() < 2 {
        return 0.0;
    }

    // Collect per-sample scores first; summing sequentially keeps the
    // result bit-identical between runs.
    let scores: Vec<f64> = (0..n)
        .into_par_iter()
        .map(|i| {
            let own = labels[i];
            let mut sums: BTreeMap<usize, (f64, usize)> = BTreeMap::new();
            for j in 0..n {
                if i == j {
                    continue;
                }
                let entry = sums.entry(labels[j]).or_insert((0.0, 0));
                entry.0 += euclidean(&rows[i], &rows[j]);
                entry.1 += 1;
            }
            let a = match sums.get(&own) {
                Some(&(sum, count)) if count > 0 => sum / count as f64,
                _ => return 0.0,
            };
            let b = sums
                .iter()
                .filter(|(&label, _)| label != own)
                .map(|(_, &(sum, count))| sum / count.max(1) as f64)
                .fold(f64::INFINITY, f64::min);
            if b.is_finite() {
                (b - a) / a.max(b)
            } else {
                0.0
            }
        })
        .collect();
    scores.iter().sum::<f64>() / n as f64
}

/// Round to four decimal places, the precision the stats blocks report.
pub(crate) fn round4(v: f64) -> f64 {
    (v * 10_000.0).round() / 10_000.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn perfect_predictions() {
        let y = [1.0, 2.0, 3.0];
        assert!((r2_score(&y, &y) - 1.0).abs() < 1e-12);
        assert_eq!(mean_squared_error(&y, &y), 0.0);
    }

    #[test]
    fn accuracy_counts_hits() {
        assert!((accuracy(&[0, 1, 1, 0], &[0, 1, 0, 0]) - 0.75).abs() < 1e-12);
    }

    #[test]
    fn report_carries_weighted_average() {
        let actual = [0, 0, 1, 1];
        let predicted = [0, 0, 1, 0];
        let classes = ["a".to_string(), "b".to_string()];
        let report = classification_report(&actual, &predicted, &classes);
        let Raw::Map(map) = report else { panic!("report must be a map") };
        assert!(map.contains_key("a"));
        assert!(map.contains_key("weighted avg"));
        assert_eq!(map.get("accuracy"), Some(&Raw::Float(0.75)));
    }

    #[test]
    fn silhouette_separated_clusters() {
        let rows = vec![
            vec![0.0, 0.0],
            vec![0.1, 0.0],
            vec![10.0, 10.0],
            vec![10.1, 10.0],
        ];
        let score = silhouette_score(&rows, &[0, 0, 1, 1]);
        assert!(score > 0.9, "well-separated clusters should score high, got {score}");
    }

    #[test]
    fn rounding() {
        assert_eq!(round4(0.123_456), 0.1235);
    }
}
