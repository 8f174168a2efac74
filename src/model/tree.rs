// File: src/model/tree.rs
use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};

/// One node of a fitted CART tree, stored in a flat arena.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum TreeNode {
    Split {
        feature: usize,
        threshold: f64,
        /// Taken when `features[feature] <= threshold`.
        left: usize,
        right: usize,
    },
    Leaf {
        /// Class probabilities, summing to 1.
        distribution: Vec<f64>,
    },
}

/// Growth limits shared by every tree of a forest.
#[derive(Debug, Clone, Copy)]
pub struct TreeLimits {
    pub max_depth: usize,
    pub min_samples_split: usize,
    pub min_samples_leaf: usize,
    /// Non-constant features examined per split.
    pub max_features: usize,
}

/// Borrowed view of a training matrix plus per-class sample weights.
pub struct TrainingView<'a> {
    pub rows: &'a [Vec<f64>],
    pub targets: &'a [usize],
    pub class_weights: &'a [f64],
    pub n_features: usize,
}

impl TrainingView<'_> {
    fn n_classes(&self) -> usize {
        self.class_weights.len()
    }

    fn histogram(&self, samples: &[usize]) -> Vec<f64> {
        let mut hist = vec![0.0; self.n_classes()];
        for &s in samples {
            let class = self.targets[s];
            hist[class] += self.class_weights[class];
        }
        hist
    }
}

fn gini(hist: &[f64], total: f64) -> f64 {
    if total <= 0.0 {
        return 0.0;
    }
    1.0 - hist.iter().map(|&w| (w / total) * (w / total)).sum::<f64>()
}

struct BestSplit {
    feature: usize,
    threshold: f64,
    score: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionTree {
    nodes: Vec<TreeNode>,
}

impl DecisionTree {
    /// Grows a Gini-impurity CART tree over `samples` (indices into the view,
    /// repeats allowed for bootstrap draws).
    pub fn fit<R: Rng>(data: &TrainingView<'_>, samples: Vec<usize>, limits: &TreeLimits, rng: &mut R) -> Self {
        let mut tree = DecisionTree { nodes: Vec::new() };
        tree.grow(data, samples, 0, limits, rng);
        tree
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Leaf distribution reached by `features`.
    pub fn predict_distribution(&self, features: &[f64]) -> &[f64] {
        let mut idx = 0;
        loop {
            match &self.nodes[idx] {
                TreeNode::Leaf { distribution } => return distribution,
                TreeNode::Split { feature, threshold, left, right } => {
                    let value = features.get(*feature).copied().unwrap_or(0.0);
                    idx = if value <= *threshold { *left } else { *right };
                }
            }
        }
    }

    fn push_leaf(&mut self, hist: Vec<f64>) -> usize {
        let total: f64 = hist.iter().sum();
        let distribution = if total > 0.0 {
            hist.into_iter().map(|w| w / total).collect()
        } else {
            let n = hist.len().max(1) as f64;
            vec![1.0 / n; hist.len()]
        };
        self.nodes.push(TreeNode::Leaf { distribution });
        self.nodes.len() - 1
    }

    fn grow<R: Rng>(
        &mut self,
        data: &TrainingView<'_>,
        samples: Vec<usize>,
        depth: usize,
        limits: &TreeLimits,
        rng: &mut R,
    ) -> usize {
        let hist = data.histogram(&samples);
        let classes_present = hist.iter().filter(|&&w| w > 0.0).count();
        if depth >= limits.max_depth || samples.len() < limits.min_samples_split || classes_present <= 1 {
            return self.push_leaf(hist);
        }

        let Some(best) = self.best_split(data, &samples, &hist, limits, rng) else {
            return self.push_leaf(hist);
        };

        let (left_samples, right_samples): (Vec<usize>, Vec<usize>) = samples
            .into_iter()
            .partition(|&s| data.rows[s][best.feature] <= best.threshold);

        // Reserve the slot so children land after their parent.
        let node_idx = self.nodes.len();
        self.nodes.push(TreeNode::Leaf { distribution: Vec::new() });
        let left = self.grow(data, left_samples, depth + 1, limits, rng);
        let right = self.grow(data, right_samples, depth + 1, limits, rng);
        self.nodes[node_idx] = TreeNode::Split {
            feature: best.feature,
            threshold: best.threshold,
            left,
            right,
        };
        node_idx
    }

    /// Visits features in random order until `max_features` non-constant ones
    /// have been scored, and keeps the split with the lowest weighted impurity.
    fn best_split<R: Rng>(
        &self,
        data: &TrainingView<'_>,
        samples: &[usize],
        parent_hist: &[f64],
        limits: &TreeLimits,
        rng: &mut R,
    ) -> Option<BestSplit> {
        let parent_total: f64 = parent_hist.iter().sum();
        let parent_score = parent_total * gini(parent_hist, parent_total);

        let mut features: Vec<usize> = (0..data.n_features).collect();
        features.shuffle(rng);

        let mut best: Option<BestSplit> = None;
        let mut examined = 0;
        let mut column: Vec<(f64, usize)> = Vec::with_capacity(samples.len());

        for feature in features {
            if examined >= limits.max_features {
                break;
            }
            column.clear();
            column.extend(samples.iter().map(|&s| (data.rows[s][feature], data.targets[s])));
            column.sort_by(|a, b| a.0.total_cmp(&b.0));
            if column.first().map(|c| c.0) == column.last().map(|c| c.0) {
                continue;
            }
            examined += 1;

            let mut left = vec![0.0; data.n_classes()];
            let mut left_total = 0.0;
            for i in 0..column.len() - 1 {
                let (value, class) = column[i];
                let w = data.class_weights[class];
                left[class] += w;
                left_total += w;

                let next_value = column[i + 1].0;
                if value == next_value {
                    continue;
                }
                let left_count = i + 1;
                let right_count = column.len() - left_count;
                if left_count < limits.min_samples_leaf || right_count < limits.min_samples_leaf {
                    continue;
                }

                let right: Vec<f64> = parent_hist.iter().zip(&left).map(|(p, l)| p - l).collect();
                let right_total = parent_total - left_total;
                let score = left_total * gini(&left, left_total) + right_total * gini(&right, right_total);
                if parent_score - score <= 1e-12 {
                    continue;
                }
                if best.as_ref().map_or(true, |b| score < b.score) {
                    best = Some(BestSplit {
                        feature,
                        threshold: (value + next_value) / 2.0,
                        score,
                    });
                }
            }
        }
        best
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn limits() -> TreeLimits {
        TreeLimits {
            max_depth: 10,
            min_samples_split: 2,
            min_samples_leaf: 1,
            max_features: 3,
        }
    }

    #[test]
    fn separable_data_is_learned_exactly() {
        let rows = vec![
            vec![1.0, 0.0, 0.0],
            vec![1.0, 1.0, 0.0],
            vec![0.0, 0.0, 1.0],
            vec![0.0, 1.0, 1.0],
        ];
        let targets = vec![0, 0, 1, 1];
        let weights = vec![1.0, 1.0];
        let view = TrainingView {
            rows: &rows,
            targets: &targets,
            class_weights: &weights,
            n_features: 3,
        };
        let mut rng = StdRng::seed_from_u64(7);
        let tree = DecisionTree::fit(&view, (0..4).collect(), &limits(), &mut rng);
        assert_eq!(tree.predict_distribution(&[1.0, 0.0, 0.0]), &[1.0, 0.0]);
        assert_eq!(tree.predict_distribution(&[0.0, 0.0, 1.0]), &[0.0, 1.0]);
        assert_eq!(tree.node_count(), 3);
    }

    #[test]
    fn pure_node_becomes_single_leaf() {
        let rows = vec![vec![1.0], vec![0.0]];
        let targets = vec![1, 1];
        let weights = vec![1.0, 1.0];
        let view = TrainingView {
            rows: &rows,
            targets: &targets,
            class_weights: &weights,
            n_features: 1,
        };
        let mut rng = StdRng::seed_from_u64(1);
        let tree = DecisionTree::fit(&view, vec![0, 1], &limits(), &mut rng);
        assert_eq!(tree.node_count(), 1);
        assert_eq!(tree.predict_distribution(&[0.0]), &[0.0, 1.0]);
    }

    #[test]
    fn depth_limit_yields_mixed_leaf() {
        let rows = vec![vec![0.0], vec![0.0], vec![1.0]];
        let targets = vec![0, 1, 1];
        let weights = vec![1.0, 1.0];
        let view = TrainingView {
            rows: &rows,
            targets: &targets,
            class_weights: &weights,
            n_features: 1,
        };
        let mut rng = StdRng::seed_from_u64(1);
        let shallow = TreeLimits { max_depth: 0, ..limits() };
        let tree = DecisionTree::fit(&view, vec![0, 1, 2], &shallow, &mut rng);
        let dist = tree.predict_distribution(&[1.0]);
        assert!((dist[0] - 1.0 / 3.0).abs() < 1e-12);
        assert!((dist[1] - 2.0 / 3.0).abs() < 1e-12);
    }
}
