use leafcast_core::{Matrix, ModelError, ModelResult};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

/// A node in the regression tree.
///
/// Every leaf carries a stable identifier assigned at build time, so a
/// fitted tree can report *which* terminal node a sample reached, not just
/// the value stored there.
#[derive(Debug, Clone, Serialize, Deserialize)]
enum TreeNode {
    Split {
        feature: usize,
        threshold: f64,
        left: Box<TreeNode>,
        right: Box<TreeNode>,
    },
    Leaf {
        id: u32,
        value: f64,
    },
}

/// CART regression tree (MSE criterion) with leaf-identifier routing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegressionTree {
    pub max_depth: usize,
    pub min_samples_split: usize,
    pub min_samples_leaf: usize,
    root: Option<TreeNode>,
    n_leaves: u32,
}

impl RegressionTree {
    pub fn new(max_depth: usize, min_samples_split: usize, min_samples_leaf: usize) -> Self {
        RegressionTree {
            max_depth,
            min_samples_split,
            min_samples_leaf,
            root: None,
            n_leaves: 0,
        }
    }

    pub fn fit(&mut self, x: &Matrix, targets: &[f64]) -> ModelResult<()> {
        if x.is_empty() || targets.is_empty() {
            return Err(ModelError::EmptyInput);
        }
        if x.rows() != targets.len() {
            return Err(ModelError::DimensionMismatch {
                expected: x.rows(),
                got: targets.len(),
            });
        }
        let indices: Vec<usize> = (0..x.rows()).collect();
        let mut next_leaf = 0u32;
        self.root = Some(self.build_node(x, targets, &indices, 0, &mut next_leaf));
        self.n_leaves = next_leaf;
        Ok(())
    }

    fn build_node(
        &self,
        x: &Matrix,
        targets: &[f64],
        indices: &[usize],
        depth: usize,
        next_leaf: &mut u32,
    ) -> TreeNode {
        if depth >= self.max_depth || indices.len() < self.min_samples_split || indices.len() < 2 {
            return Self::make_leaf(targets, indices, next_leaf);
        }

        let split = match self.best_split(x, targets, indices) {
            Some(s) => s,
            None => return Self::make_leaf(targets, indices, next_leaf),
        };

        let mut left = Vec::new();
        let mut right = Vec::new();
        for &i in indices {
            if x.get(i, split.0) <= split.1 {
                left.push(i);
            } else {
                right.push(i);
            }
        }
        if left.is_empty() || right.is_empty() {
            return Self::make_leaf(targets, indices, next_leaf);
        }

        let left_node = self.build_node(x, targets, &left, depth + 1, next_leaf);
        let right_node = self.build_node(x, targets, &right, depth + 1, next_leaf);

        TreeNode::Split {
            feature: split.0,
            threshold: split.1,
            left: Box::new(left_node),
            right: Box::new(right_node),
        }
    }

    fn make_leaf(targets: &[f64], indices: &[usize], next_leaf: &mut u32) -> TreeNode {
        let id = *next_leaf;
        *next_leaf += 1;
        TreeNode::Leaf {
            id,
            value: Self::mean(targets, indices),
        }
    }

    fn mean(targets: &[f64], indices: &[usize]) -> f64 {
        if indices.is_empty() {
            return 0.0;
        }
        let sum: f64 = indices.iter().map(|&i| targets[i]).sum();
        sum / indices.len() as f64
    }

    /// Best (feature, threshold) by weighted MSE, searched in parallel
    /// across features.
    fn best_split(&self, x: &Matrix, targets: &[f64], indices: &[usize]) -> Option<(usize, f64)> {
        (0..x.cols())
            .into_par_iter()
            .filter_map(|feature| {
                let mut values: Vec<f64> = indices.iter().map(|&i| x.get(i, feature)).collect();
                values.sort_by(f64::total_cmp);
                values.dedup();

                let mut best: Option<(f64, f64)> = None; // (score, threshold)
                for w in values.windows(2) {
                    let threshold = (w[0] + w[1]) / 2.0;
                    if let Some(score) =
                        self.split_score(x, targets, indices, feature, threshold)
                    {
                        if best.map_or(true, |(s, _)| score < s) {
                            best = Some((score, threshold));
                        }
                    }
                }
                best.map(|(score, threshold)| (feature, threshold, score))
            })
            .min_by(|a, b| a.2.total_cmp(&b.2))
            .map(|(feature, threshold, _)| (feature, threshold))
    }

    /// Weighted MSE of a candidate split, or `None` when either side falls
    /// below `min_samples_leaf`.
    fn split_score(
        &self,
        x: &Matrix,
        targets: &[f64],
        indices: &[usize],
        feature: usize,
        threshold: f64,
    ) -> Option<f64> {
        let mut left = Vec::new();
        let mut right = Vec::new();
        for &i in indices {
            if x.get(i, feature) <= threshold {
                left.push(targets[i]);
            } else {
                right.push(targets[i]);
            }
        }
        if left.len() < self.min_samples_leaf || right.len() < self.min_samples_leaf {
            return None;
        }
        let total = indices.len() as f64;
        let lw = left.len() as f64 / total;
        let rw = right.len() as f64 / total;
        Some(lw * Self::mse(&left) + rw * Self::mse(&right))
    }

    fn mse(values: &[f64]) -> f64 {
        if values.is_empty() {
            return 0.0;
        }
        let n = values.len() as f64;
        let mean: f64 = values.iter().sum::<f64>() / n;
        values.iter().map(|v| (v - mean) * (v - mean)).sum::<f64>() / n
    }

    /// Route each sample to its terminal node and return the leaf
    /// identifiers (not the leaf values).
    pub fn apply(&self, x: &Matrix) -> ModelResult<Vec<u32>> {
        let root = self.root.as_ref().ok_or(ModelError::ModelNotTrained)?;
        Ok((0..x.rows()).map(|i| Self::route(root, x.row(i)).0).collect())
    }

    /// Predict the stored leaf value for each sample.
    pub fn predict(&self, x: &Matrix) -> ModelResult<Vec<f64>> {
        let root = self.root.as_ref().ok_or(ModelError::ModelNotTrained)?;
        Ok((0..x.rows()).map(|i| Self::route(root, x.row(i)).1).collect())
    }

    fn route(node: &TreeNode, row: &[f64]) -> (u32, f64) {
        match node {
            TreeNode::Leaf { id, value } => (*id, *value),
            TreeNode::Split {
                feature,
                threshold,
                left,
                right,
            } => {
                if row[*feature] <= *threshold {
                    Self::route(left, row)
                } else {
                    Self::route(right, row)
                }
            }
        }
    }

    pub fn n_leaves(&self) -> u32 {
        self.n_leaves
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn step_data() -> (Matrix, Vec<f64>) {
        let x = Matrix::from_rows(&[
            vec![1.0],
            vec![2.0],
            vec![3.0],
            vec![4.0],
            vec![5.0],
            vec![6.0],
            vec![7.0],
            vec![8.0],
        ])
        .unwrap();
        let y = vec![0.0, 0.0, 0.0, 0.0, 10.0, 10.0, 10.0, 10.0];
        (x, y)
    }

    #[test]
    fn test_fit_predict_step_function() {
        let (x, y) = step_data();
        let mut tree = RegressionTree::new(4, 2, 1);
        tree.fit(&x, &y).unwrap();
        let pred = tree.predict(&x).unwrap();
        for i in 0..8 {
            assert!((pred[i] - y[i]).abs() < 1.0, "bad prediction at {}", i);
        }
    }

    #[test]
    fn test_apply_returns_identifiers_not_values() {
        let (x, y) = step_data();
        let mut tree = RegressionTree::new(4, 2, 1);
        tree.fit(&x, &y).unwrap();
        let leaves = tree.apply(&x).unwrap();
        assert_eq!(leaves.len(), 8);
        // Samples in the same half of the step land in the same leaf,
        // samples in opposite halves do not.
        assert_ne!(leaves[0], leaves[7]);
        for &leaf in &leaves {
            assert!(leaf < tree.n_leaves());
        }
    }

    #[test]
    fn test_apply_before_fit_fails() {
        let tree = RegressionTree::new(3, 2, 1);
        let x = Matrix::from_rows(&[vec![1.0]]).unwrap();
        assert!(matches!(tree.apply(&x), Err(ModelError::ModelNotTrained)));
    }

    #[test]
    fn test_fit_rejects_mismatched_lengths() {
        let x = Matrix::from_rows(&[vec![1.0], vec![2.0]]).unwrap();
        let mut tree = RegressionTree::new(3, 2, 1);
        assert!(matches!(
            tree.fit(&x, &[1.0]),
            Err(ModelError::DimensionMismatch { expected: 2, got: 1 })
        ));
    }
}
