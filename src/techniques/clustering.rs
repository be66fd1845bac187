//! Clustering techniques: k-means, DBSCAN and agglomerative clustering.

use std::collections::HashMap;

use rand::rngs::StdRng;
use rand::Rng;
use rayon::prelude::*;

use crate::encode::{Raw, Report};
use crate::error::TechniqueError;
use crate::params::Params;
use crate::table::DataFrame;

use super::linalg::euclidean;
use super::metrics::silhouette_score;
use super::seeded_rng;

fn assignment_table(labels: impl Iterator<Item = i64>) -> Raw {
    Raw::Seq(
        labels
            .enumerate()
            .map(|(i, label)| {
                Raw::map([("Index", Raw::Int(i as i64)), ("Cluster", Raw::Int(label))])
            })
            .collect(),
    )
}

/// K-means with k-means++ seeding, restarted `n_init` times.
pub fn kmeans(df: &DataFrame, params: &Params) -> Result<Report, TechniqueError> {
    let (names, rows) = df.numeric_matrix();
    if names.is_empty() || rows.is_empty() {
        return Err(TechniqueError::NoNumericData);
    }

    let n_clusters = params.get_usize("n_clusters", 3);
    if n_clusters == 0 {
        return Err(TechniqueError::InvalidParam {
            name: "n_clusters",
            reason: "must be at least 1".to_string(),
        });
    }
    if n_clusters > rows.len() {
        return Err(TechniqueError::computation(format!(
            "n_clusters={} cannot exceed the number of samples ({})",
            n_clusters,
            rows.len()
        )));
    }

    let mut rng = seeded_rng(params);
    let mut best: Option<KMeansFit> = None;
    for _ in 0..10 {
        let fit = lloyd(&rows, n_clusters, &mut rng);
        if best.as_ref().map_or(true, |b| fit.inertia < b.inertia) {
            best = Some(fit);
        }
    }
    let fit = best.expect("at least one restart ran");

    let silhouette = if n_clusters > 1 && n_clusters < rows.len() {
        silhouette_score(&rows, &fit.labels)
    } else {
        0.0
    };

    let labels: Vec<i64> = fit.labels.iter().map(|&l| l as i64).collect();
    let centroids: Vec<Raw> = fit.centroids.iter().map(|c| Raw::from(c.clone())).collect();
    let explanation = format!(
        "KMeans clustering with {} clusters applied to {} data points with {} features.",
        n_clusters,
        rows.len(),
        names.len()
    );

    Ok(Report::new(explanation)
        .chart("cluster_labels", labels.clone())
        .chart("centroids", Raw::Seq(centroids))
        .stat("inertia", fit.inertia)
        .stat("silhouette_score", silhouette)
        .stat("iterations", fit.iterations)
        .stat("n_clusters", n_clusters)
        .table("cluster_assignments", assignment_table(labels.into_iter())))
}

struct KMeansFit {
    labels: Vec<usize>,
    centroids: Vec<Vec<f64>>,
    inertia: f64,
    iterations: usize,
}

fn lloyd(rows: &[Vec<f64>], k: usize, rng: &mut StdRng) -> KMeansFit {
    let mut centroids = plus_plus_init(rows, k, rng);
    let mut labels = vec![0usize; rows.len()];
    let mut iterations = 0;

    for iter in 0..300 {
        iterations = iter + 1;
        labels = rows
            .par_iter()
            .map(|row| nearest(row, &centroids).0)
            .collect();

        let mut sums = vec![vec![0.0; rows[0].len()]; k];
        let mut counts = vec![0usize; k];
        for (row, &label) in rows.iter().zip(&labels) {
            counts[label] += 1;
            for (s, v) in sums[label].iter_mut().zip(row) {
                *s += v;
            }
        }

        let mut shift = 0.0;
        for c in 0..k {
            if counts[c] == 0 {
                continue; // empty cluster keeps its centroid
            }
            let new: Vec<f64> = sums[c].iter().map(|s| s / counts[c] as f64).collect();
            shift += euclidean(&centroids[c], &new);
            centroids[c] = new;
        }
        if shift < 1e-4 {
            break;
        }
    }

    let inertia = rows
        .iter()
        .zip(&labels)
        .map(|(row, &label)| {
            let d = euclidean(row, &centroids[label]);
            d * d
        })
        .sum();
    KMeansFit { labels, centroids, inertia, iterations }
}

fn plus_plus_init(rows: &[Vec<f64>], k: usize, rng: &mut StdRng) -> Vec<Vec<f64>> {
    let mut centroids = vec![rows[rng.gen_range(0..rows.len())].clone()];
    while centroids.len() < k {
        let weights: Vec<f64> = rows
            .iter()
            .map(|row| {
                let d = nearest(row, &centroids).1;
                d * d
            })
            .collect();
        let total: f64 = weights.iter().sum();
        if total <= 0.0 {
            // All remaining points coincide with a centroid.
            centroids.push(rows[rng.gen_range(0..rows.len())].clone());
            continue;
        }
        let mut draw = rng.gen::<f64>() * total;
        let mut chosen = rows.len() - 1;
        for (i, w) in weights.iter().enumerate() {
            draw -= w;
            if draw <= 0.0 {
                chosen = i;
                break;
            }
        }
        centroids.push(rows[chosen].clone());
    }
    centroids
}

fn nearest(row: &[f64], centroids: &[Vec<f64>]) -> (usize, f64) {
    let mut best = (0, f64::INFINITY);
    for (i, c) in centroids.iter().enumerate() {
        let d = euclidean(row, c);
        if d < best.1 {
            best = (i, d);
        }
    }
    best
}

/// Density clustering. Noise points get label −1.
pub fn dbscan(df: &DataFrame, params: &Params) -> Result<Report, TechniqueError> {
    let (names, rows) = df.numeric_matrix();
    if names.len() < 2 {
        return Err(TechniqueError::NotEnoughNumericColumns { required: 2 });
    }
    if rows.is_empty() {
        return Err(TechniqueError::EmptySelection);
    }

    let eps = params.get_f64("eps", 0.5);
    let min_samples = params.get_usize("min_samples", 5);
    if eps <= 0.0 {
        return Err(TechniqueError::InvalidParam {
            name: "eps",
            reason: "must be positive".to_string(),
        });
    }

    let n = rows.len();
    let neighborhoods: Vec<Vec<usize>> = (0..n)
        .into_par_iter()
        .map(|i| {
            (0..n)
                .filter(|&j| euclidean(&rows[i], &rows[j]) <= eps)
                .collect()
        })
        .collect();

    const UNVISITED: i64 = -2;
    const NOISE: i64 = -1;
    let mut labels = vec![UNVISITED; n];
    let mut cluster = 0i64;

    for i in 0..n {
        if labels[i] != UNVISITED {
            continue;
        }
        if neighborhoods[i].len() < min_samples {
            labels[i] = NOISE;
            continue;
        }
        labels[i] = cluster;
        let mut queue: Vec<usize> = neighborhoods[i].clone();
        let mut head = 0;
        while head < queue.len() {
            let j = queue[head];
            head += 1;
            if labels[j] == NOISE {
                labels[j] = cluster;
            }
            if labels[j] != UNVISITED {
                continue;
            }
            labels[j] = cluster;
            if neighborhoods[j].len() >= min_samples {
                queue.extend(neighborhoods[j].iter().copied());
            }
        }
        cluster += 1;
    }

    let n_noise = labels.iter().filter(|&&l| l == NOISE).count();
    let explanation = "DBSCAN clusters data based on density. It identifies core samples and \
                       expands clusters from them, treating outliers as noise.";

    Ok(Report::new(explanation)
        .chart("cluster_labels", labels.clone())
        .stat("n_clusters", cluster)
        .stat("n_noise", n_noise)
        .table("cluster_assignments", assignment_table(labels.into_iter())))
}

/// Agglomerative clustering with a Lance–Williams distance update, cut into
/// three flat clusters. The linkage matrix rows are `[id_a, id_b, distance,
/// size]` with merged clusters numbered from `n` upward.
pub fn hierarchical_clustering(df: &DataFrame, params: &Params) -> Result<Report, TechniqueError> {
    let (names, rows) = df.numeric_matrix();
    if names.len() < 2 {
        return Err(TechniqueError::NotEnoughNumericColumns { required: 2 });
    }
    if rows.is_empty() {
        return Err(TechniqueError::EmptySelection);
    }

    let method = params.get_str("method").unwrap_or("ward");
    let linkage = Linkage::parse(method)?;

    let n = rows.len();
    let merges = agglomerate(&rows, linkage);

    // Flat cut: applying the first n - k merges leaves k clusters.
    let k = 3.min(n);
    let mut parent: Vec<usize> = (0..n).collect();
    fn find(parent: &mut Vec<usize>, mut i: usize) -> usize {
        while parent[i] != i {
            parent[i] = parent[parent[i]];
            i = parent[i];
        }
        i
    }
    let mut roots: HashMap<usize, usize> = (0..n).map(|i| (i, i)).collect();
    for (step, merge) in merges.iter().take(n - k).enumerate() {
        let ra = find(&mut parent, roots[&merge.a]);
        let rb = find(&mut parent, roots[&merge.b]);
        parent[rb] = ra;
        roots.insert(n + step, ra);
    }

    let mut labels = vec![0i64; n];
    let mut next_label = 1i64;
    let mut label_of_root: HashMap<usize, i64> = HashMap::new();
    for i in 0..n {
        let root = find(&mut parent, i);
        let label = *label_of_root.entry(root).or_insert_with(|| {
            let l = next_label;
            next_label += 1;
            l
        });
        labels[i] = label;
    }

    let linkage_matrix: Vec<Raw> = merges
        .iter()
        .map(|m| {
            Raw::from(vec![m.a as f64, m.b as f64, m.distance, m.size as f64])
        })
        .collect();
    let n_clusters = (next_label - 1) as usize;
    let explanation = "Hierarchical Clustering builds nested clusters by merging or splitting \
                       them successively using a chosen linkage method.";

    Ok(Report::new(explanation)
        .chart("linkage_matrix", Raw::Seq(linkage_matrix))
        .stat("n_clusters", n_clusters)
        .table("cluster_assignments", assignment_table(labels.into_iter())))
}

#[derive(Clone, Copy, PartialEq)]
enum Linkage {
    Ward,
    Single,
    Complete,
    Average,
}

impl Linkage {
    fn parse(method: &str) -> Result<Self, TechniqueError> {
        match method {
            "ward" => Ok(Linkage::Ward),
            "single" => Ok(Linkage::Single),
            "complete" => Ok(Linkage::Complete),
            "average" => Ok(Linkage::Average),
            other => Err(TechniqueError::InvalidParam {
                name: "method",
                reason: format!("unknown linkage method '{other}'"),
            }),
        }
    }
}

struct Merge {
    a: usize,
    b: usize,
    distance: f64,
    size: usize,
}

fn agglomerate(rows: &[Vec<f64>], linkage: Linkage) -> Vec<Merge> {
    let n = rows.len();
    // For ward the recurrence runs on squared distances; the reported
    // linkage distance is the square root.
    let squared = linkage == Linkage::Ward;

    struct Cluster {
        id: usize,
        size: usize,
    }
    let mut active: Vec<Cluster> = (0..n).map(|i| Cluster { id: i, size: 1 }).collect();
    let mut dist: HashMap<(usize, usize), f64> = HashMap::new();
    for i in 0..n {
        for j in (i + 1)..n {
            let d = euclidean(&rows[i], &rows[j]);
            dist.insert((i, j), if squared { d * d } else { d });
        }
    }
    let key = |a: usize, b: usize| if a < b { (a, b) } else { (b, a) };

    let mut merges = Vec::with_capacity(n.saturating_sub(1));
    for step in 0..n.saturating_sub(1) {
        let (mut pi, mut pj, mut best) = (0usize, 1usize, f64::INFINITY);
        for i in 0..active.len() {
            for j in (i + 1)..active.len() {
                let d = dist[&key(active[i].id, active[j].id)];
                if d < best {
                    best = d;
                    pi = i;
                    pj = j;
                }
            }
        }

        let (a, b) = (active[pi].id, active[pj].id);
        let (na, nb) = (active[pi].size, active[pj].size);
        let new_id = n + step;
        let new_size = na + nb;
        let d_ab = dist[&key(a, b)];

        for c in active.iter() {
            if c.id == a || c.id == b {
                continue;
            }
            let d_ca = dist[&key(c.id, a)];
            let d_cb = dist[&key(c.id, b)];
            let updated = match linkage {
                Linkage::Single => d_ca.min(d_cb),
                Linkage::Complete => d_ca.max(d_cb),
                Linkage::Average => {
                    (na as f64 * d_ca + nb as f64 * d_cb) / (na + nb) as f64
                }
                Linkage::Ward => {
                    let nc = c.size as f64;
                    let (na, nb) = (na as f64, nb as f64);
                    ((na + nc) * d_ca + (nb + nc) * d_cb - nc * d_ab) / (na + nb + nc)
                }
            };
            dist.insert(key(c.id, new_id), updated);
        }

        merges.push(Merge {
            a,
            b,
            distance: if squared { d_ab.sqrt() } else { d_ab },
            size: new_size,
        });
        active.retain(|c| c.id != a && c.id != b);
        active.push(Cluster { id: new_id, size: new_size });
    }
    merges
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::DataFrame;

    fn two_blobs() -> DataFrame {
        DataFrame::from_csv(
            "x,y\n0.0,0.1\n0.1,0.0\n0.2,0.1\n0.1,0.2\n0.0,0.0\n9.0,9.1\n9.1,9.0\n9.2,9.1\n9.1,9.2\n9.0,9.0\n",
        )
        .unwrap()
    }

    #[test]
    fn kmeans_finds_two_blobs() {
        let mut params = Params::new();
        params.insert("n_clusters", crate::params::ParamValue::Int(2));
        let report = kmeans(&two_blobs(), &params).unwrap();
        assert_eq!(report.stats.get("n_clusters"), Some(&Raw::Int(2)));
        let Some(Raw::Seq(labels)) = report.charts.get("cluster_labels") else {
            panic!("labels missing")
        };
        assert_eq!(labels.len(), 10);
        assert_ne!(labels[0], labels[9], "the blobs must land in different clusters");
    }

    #[test]
    fn kmeans_is_deterministic_for_a_fixed_seed() {
        let params = Params::new();
        let a = kmeans(&two_blobs(), &params).unwrap();
        let b = kmeans(&two_blobs(), &params).unwrap();
        assert_eq!(a.stats, b.stats);
        assert_eq!(a.charts, b.charts);
    }

    #[test]
    fn dbscan_labels_every_row() {
        let mut params = Params::new();
        params.insert("eps", crate::params::ParamValue::Float(0.5));
        params.insert("min_samples", crate::params::ParamValue::Int(2));
        let report = dbscan(&two_blobs(), &params).unwrap();
        let Some(Raw::Seq(assignments)) = report.tables.get("cluster_assignments") else {
            panic!("assignments missing")
        };
        assert_eq!(assignments.len(), 10);
        assert_eq!(report.stats.get("n_clusters"), Some(&Raw::Int(2)));
        assert_eq!(report.stats.get("n_noise"), Some(&Raw::Int(0)));
    }

    #[test]
    fn dbscan_requires_two_numeric_columns() {
        let df = DataFrame::from_csv("x\n1\n2\n").unwrap();
        let err = dbscan(&df, &Params::new()).unwrap_err();
        assert_eq!(err.to_string(), "At least 2 numeric columns required");
    }

    #[test]
    fn hierarchical_produces_linkage_and_flat_cut() {
        let report = hierarchical_clustering(&two_blobs(), &Params::new()).unwrap();
        let Some(Raw::Seq(linkage)) = report.charts.get("linkage_matrix") else {
            panic!("linkage missing")
        };
        assert_eq!(linkage.len(), 9);
        assert_eq!(report.stats.get("n_clusters"), Some(&Raw::Int(3)));
    }

    #[test]
    fn hierarchical_rejects_unknown_method() {
        let mut params = Params::new();
        params.insert("method", crate::params::ParamValue::Str("median".into()));
        assert!(hierarchical_clustering(&two_blobs(), &params).is_err());
    }
}
