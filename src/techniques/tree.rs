//! CART decision trees shared by the forest and boosting techniques.

use rand::rngs::StdRng;
use rand::seq::index::sample;

#[derive(Debug, Clone)]
pub(crate) struct TreeParams {
    pub max_depth: usize,
    pub min_samples_split: usize,
    /// Features considered per split; `None` means all of them.
    pub max_features: Option<usize>,
}

impl Default for TreeParams {
    fn default() -> Self {
        TreeParams { max_depth: 10, min_samples_split: 2, max_features: None }
    }
}

#[derive(Debug, Clone)]
enum Node {
    Leaf { value: f64 },
    Split { feature: usize, threshold: f64, left: usize, right: usize },
}

trait Criterion {
    fn impurity(&self, indices: &[usize]) -> f64;
    fn leaf_value(&self, indices: &[usize]) -> f64;
}

struct Variance<'a> {
    y: &'a [f64],
}

impl Criterion for Variance<'_> {
    fn impurity(&self, indices: &[usize]) -> f64 {
        let n = indices.len() as f64;
        let mean = indices.iter().map(|&i| self.y[i]).sum::<f64>() / n;
        indices.iter().map(|&i| (self.y[i] - mean).powi(2)).sum::<f64>() / n
    }

    fn leaf_value(&self, indices: &[usize]) -> f64 {
        indices.iter().map(|&i| self.y[i]).sum::<f64>() / indices.len() as f64
    }
}

struct Gini<'a> {
    y: &'a [usize],
    n_classes: usize,
}

impl Gini<'_> {
    fn counts(&self, indices: &[usize]) -> Vec<usize> {
        let mut counts = vec![0usize; self.n_classes];
        for &i in indices {
            counts[self.y[i]] += 1;
        }
        counts
    }
}

impl Criterion for Gini<'_> {
    fn impurity(&self, indices: &[usize]) -> f64 {
        let n = indices.len() as f64;
        let sum_sq: f64 = self
            .counts(indices)
            .iter()
            .map(|&c| {
                let p = c as f64 / n;
                p * p
            })
            .sum();
        1.0 - sum_sq
    }

    fn leaf_value(&self, indices: &[usize]) -> f64 {
        let counts = self.counts(indices);
        let majority = counts
            .iter()
            .enumerate()
            .max_by_key(|&(_, c)| *c)
            .map(|(k, _)| k)
            .unwrap_or(0);
        majority as f64
    }
}

/// A fitted tree. Regression leaves hold means, classification leaves hold
/// the majority class index.
#[derive(Debug, Clone)]
pub(crate) struct Tree {
    nodes: Vec<Node>,
    pub importances: Vec<f64>,
}

impl Tree {
    pub fn fit_regression(
        x: &[Vec<f64>],
        y: &[f64],
        params: &TreeParams,
        rng: &mut StdRng,
    ) -> Tree {
        let criterion = Variance { y };
        Tree::grow(x, &criterion, params, rng)
    }

    pub fn fit_classification(
        x: &[Vec<f64>],
        y: &[usize],
        n_classes: usize,
        params: &TreeParams,
        rng: &mut StdRng,
    ) -> Tree {
        let criterion = Gini { y, n_classes };
        Tree::grow(x, &criterion, params, rng)
    }

    fn grow<C: Criterion>(x: &[Vec<f64>], criterion: &C, params: &TreeParams, rng: &mut StdRng) -> Tree {
        let n_features = x.first().map_or(0, Vec::len);
        let mut tree = Tree { nodes: Vec::new(), importances: vec![0.0; n_features] };
        let indices: Vec<usize> = (0..x.len()).collect();
        tree.grow_node(x, criterion, params, rng, indices, 0);

        let total: f64 = tree.importances.iter().sum();
        if total > 0.0 {
            tree.importances.iter_mut().for_each(|v| *v /= total);
        }
        tree
    }

    fn grow_node<C: Criterion>(
        &mut self,
        x: &[Vec<f64>],
        criterion: &C,
        params: &TreeParams,
        rng: &mut StdRng,
        indices: Vec<usize>,
        depth: usize,
    ) -> usize {
        let impurity = criterion.impurity(&indices);
        let stop = depth >= params.max_depth
            || indices.len() < params.min_samples_split
            || impurity < 1e-12;

        let split = if stop { None } else { self.best_split(x, criterion, params, rng, &indices, impurity) };

        match split {
            None => {
                let value = criterion.leaf_value(&indices);
                self.nodes.push(Node::Leaf { value });
                self.nodes.len() - 1
            }
            Some(found) => {
                self.importances[found.feature] += found.gain * indices.len() as f64;
                // Reserve the slot before the children claim theirs.
                let id = self.nodes.len();
                self.nodes.push(Node::Leaf { value: 0.0 });
                let left = self.grow_node(x, criterion, params, rng, found.left, depth + 1);
                let right = self.grow_node(x, criterion, params, rng, found.right, depth + 1);
                self.nodes[id] =
                    Node::Split { feature: found.feature, threshold: found.threshold, left, right };
                id
            }
        }
    }

    fn best_split<C: Criterion>(
        &self,
        x: &[Vec<f64>],
        criterion: &C,
        params: &TreeParams,
        rng: &mut StdRng,
        indices: &[usize],
        parent_impurity: f64,
    ) -> Option<FoundSplit> {
        let n_features = x.first().map_or(0, Vec::len);
        let features: Vec<usize> = match params.max_features {
            Some(k) if k < n_features => sample(rng, n_features, k).into_vec(),
            _ => (0..n_features).collect(),
        };

        let mut best: Option<FoundSplit> = None;
        for feature in features {
            let mut ordered: Vec<usize> = indices.to_vec();
            ordered.sort_by(|&a, &b| x[a][feature].total_cmp(&x[b][feature]));

            for cut in 1..ordered.len() {
                let lo = x[ordered[cut - 1]][feature];
                let hi = x[ordered[cut]][feature];
                if lo == hi {
                    continue;
                }
                let threshold = (lo + hi) / 2.0;
                let (left, right) = (&ordered[..cut], &ordered[cut..]);
                let n = indices.len() as f64;
                let weighted = criterion.impurity(left) * left.len() as f64 / n
                    + criterion.impurity(right) * right.len() as f64 / n;
                let gain = parent_impurity - weighted;
                if gain > 1e-12 && best.as_ref().map_or(true, |b| gain > b.gain) {
                    best = Some(FoundSplit {
                        feature,
                        threshold,
                        gain,
                        left: left.to_vec(),
                        right: right.to_vec(),
                    });
                }
            }
        }
        best
    }

    pub fn predict(&self, row: &[f64]) -> f64 {
        let mut node = 0;
        loop {
            match &self.nodes[node] {
                Node::Leaf { value } => return *value,
                Node::Split { feature, threshold, left, right } => {
                    node = if row[*feature] <= *threshold { *left } else { *right };
                }
            }
        }
    }

    pub fn predict_class(&self, row: &[f64]) -> usize {
        self.predict(row) as usize
    }
}

struct FoundSplit {
    feature: usize,
    threshold: f64,
    gain: f64,
    left: Vec<usize>,
    right: Vec<usize>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    #[test]
    fn regression_tree_fits_a_step_function() {
        let x: Vec<Vec<f64>> = (0..10).map(|i| vec![i as f64]).collect();
        let y: Vec<f64> = (0..10).map(|i| if i < 5 { 0.0 } else { 10.0 }).collect();
        let mut rng = StdRng::seed_from_u64(0);
        let tree = Tree::fit_regression(&x, &y, &TreeParams::default(), &mut rng);
        assert_eq!(tree.predict(&[2.0]), 0.0);
        assert_eq!(tree.predict(&[7.0]), 10.0);
    }

    #[test]
    fn classification_tree_separates_classes() {
        let x: Vec<Vec<f64>> = vec![
            vec![0.0, 1.0],
            vec![0.5, 1.5],
            vec![5.0, 5.0],
            vec![5.5, 5.5],
        ];
        let y = vec![0, 0, 1, 1];
        let mut rng = StdRng::seed_from_u64(0);
        let tree = Tree::fit_classification(&x, &y, 2, &TreeParams::default(), &mut rng);
        assert_eq!(tree.predict_class(&[0.2, 1.2]), 0);
        assert_eq!(tree.predict_class(&[5.2, 5.2]), 1);
        let split_feature_importance: f64 = tree.importances.iter().sum();
        assert!((split_feature_importance - 1.0).abs() < 1e-9);
    }

    #[test]
    fn pure_node_becomes_a_leaf() {
        let x = vec![vec![1.0], vec![2.0]];
        let y = vec![3.0, 3.0];
        let mut rng = StdRng::seed_from_u64(0);
        let tree = Tree::fit_regression(&x, &y, &TreeParams::default(), &mut rng);
        assert_eq!(tree.predict(&[1.5]), 3.0);
    }
}
