use crate::regression_tree::RegressionTree;
use leafcast_core::{LeafMatrix, Matrix, ModelError, ModelResult};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};

/// Metric evaluated on the eval set after every boosting round.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EvalMetric {
    LogLoss,
    ErrorRate,
}

/// One binary boosting chain: an initial log-odds plus a sequence of trees
/// fitted to log-loss pseudo-residuals.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct BoostingChain {
    initial_log_odds: f64,
    trees: Vec<RegressionTree>,
}

/// Gradient-boosted trees for classification.
///
/// Binary labels train a single log-loss chain; K > 2 classes train one
/// one-vs-rest chain per class. The ensemble doubles as a feature
/// transformer: `predict_leaf_indices` reports, per sample, the leaf
/// identifier reached in every tree.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GradientBoostedTrees {
    pub n_estimators: usize,
    pub learning_rate: f64,
    pub max_depth: usize,
    pub min_samples_split: usize,
    pub subsample: f64,
    pub seed: Option<u64>,
    chains: Vec<BoostingChain>,
    n_classes: usize,
    eval_history: Vec<f64>,
}

impl GradientBoostedTrees {
    pub fn new(
        n_estimators: usize,
        learning_rate: f64,
        max_depth: usize,
        min_samples_split: usize,
        subsample: f64,
        seed: Option<u64>,
    ) -> Self {
        GradientBoostedTrees {
            n_estimators: if n_estimators == 0 { 1 } else { n_estimators },
            learning_rate,
            max_depth: if max_depth == 0 { 3 } else { max_depth },
            min_samples_split: if min_samples_split == 0 { 2 } else { min_samples_split },
            subsample: subsample.clamp(0.1, 1.0),
            seed,
            chains: Vec::new(),
            n_classes: 0,
            eval_history: Vec::new(),
        }
    }

    fn sigmoid(x: f64) -> f64 {
        1.0 / (1.0 + (-x).exp())
    }

    /// Fit the ensemble on class indices in `0..n_classes`, evaluating the
    /// configured metric on `eval_set` after every round.
    pub fn fit(
        &mut self,
        x: &Matrix,
        y: &[usize],
        n_classes: usize,
        metric: EvalMetric,
        eval_set: (&Matrix, &[usize]),
    ) -> ModelResult<()> {
        if x.is_empty() || y.is_empty() {
            return Err(ModelError::EmptyInput);
        }
        if x.rows() != y.len() {
            return Err(ModelError::DimensionMismatch {
                expected: x.rows(),
                got: y.len(),
            });
        }
        if n_classes < 2 {
            return Err(ModelError::FitFailure(
                "at least two classes are required".to_string(),
            ));
        }
        if let Some(&bad) = y.iter().find(|&&c| c >= n_classes) {
            return Err(ModelError::FitFailure(format!(
                "label {} out of range for {} classes",
                bad, n_classes
            )));
        }
        let (eval_x, eval_y) = eval_set;
        if eval_x.rows() != eval_y.len() {
            return Err(ModelError::DimensionMismatch {
                expected: eval_x.rows(),
                got: eval_y.len(),
            });
        }

        let n = x.rows();
        let n_chains = if n_classes == 2 { 1 } else { n_classes };
        let mut rng = match self.seed {
            Some(s) => StdRng::seed_from_u64(s),
            None => StdRng::from_entropy(),
        };

        // Binary targets per chain: for the single binary chain the positive
        // class is class 1; for one-vs-rest chain k it is class k.
        let targets: Vec<Vec<f64>> = (0..n_chains)
            .map(|k| {
                let positive = if n_chains == 1 { 1 } else { k };
                y.iter()
                    .map(|&c| if c == positive { 1.0 } else { 0.0 })
                    .collect()
            })
            .collect();

        let mut chains: Vec<BoostingChain> = targets
            .iter()
            .map(|t| {
                let pos: f64 = t.iter().sum();
                let neg = n as f64 - pos;
                let initial_log_odds = if neg > 0.0 {
                    (pos / neg).max(1e-10).ln()
                } else {
                    0.0
                };
                BoostingChain {
                    initial_log_odds,
                    trees: Vec::new(),
                }
            })
            .collect();

        let mut raw_train: Vec<Vec<f64>> = chains
            .iter()
            .map(|c| vec![c.initial_log_odds; n])
            .collect();
        let mut raw_eval: Vec<Vec<f64>> = chains
            .iter()
            .map(|c| vec![c.initial_log_odds; eval_x.rows()])
            .collect();

        self.eval_history.clear();

        for _round in 0..self.n_estimators {
            for k in 0..n_chains {
                let residuals: Vec<f64> = targets[k]
                    .iter()
                    .zip(raw_train[k].iter())
                    .map(|(&t, &r)| t - Self::sigmoid(r))
                    .collect();

                let mut tree = RegressionTree::new(self.max_depth, self.min_samples_split, 1);
                if self.subsample < 1.0 {
                    let take = ((n as f64 * self.subsample).round() as usize).max(1);
                    let mut idx: Vec<usize> = (0..n).collect();
                    idx.shuffle(&mut rng);
                    idx.truncate(take);
                    let sub_x = x.select_rows(&idx);
                    let sub_r: Vec<f64> = idx.iter().map(|&i| residuals[i]).collect();
                    tree.fit(&sub_x, &sub_r)?;
                } else {
                    tree.fit(x, &residuals)?;
                }

                let train_step = tree.predict(x)?;
                for i in 0..n {
                    raw_train[k][i] += self.learning_rate * train_step[i];
                }
                let eval_step = tree.predict(eval_x)?;
                for i in 0..eval_x.rows() {
                    raw_eval[k][i] += self.learning_rate * eval_step[i];
                }

                chains[k].trees.push(tree);
            }

            let score = Self::evaluate(metric, &raw_eval, eval_y, n_classes)?;
            if !score.is_finite() {
                return Err(ModelError::FitFailure(format!(
                    "non-finite evaluation score {} during boosting",
                    score
                )));
            }
            self.eval_history.push(score);
        }

        self.chains = chains;
        self.n_classes = n_classes;
        Ok(())
    }

    fn evaluate(
        metric: EvalMetric,
        raw: &[Vec<f64>],
        y: &[usize],
        n_classes: usize,
    ) -> ModelResult<f64> {
        let proba = Self::proba_from_raw(raw, n_classes)?;
        let score = match metric {
            EvalMetric::LogLoss => leafcast_metrics::multiclass_log_loss(y, &proba),
            EvalMetric::ErrorRate => {
                let preds = Self::argmax_rows(&proba);
                leafcast_metrics::error_rate(y, &preds)
            }
        };
        Ok(score)
    }

    /// Per-class probabilities from raw chain scores. The single binary
    /// chain yields (1-p, p); one-vs-rest sigmoids are normalized per row.
    fn proba_from_raw(raw: &[Vec<f64>], n_classes: usize) -> ModelResult<Matrix> {
        let n = raw[0].len();
        let mut out = Matrix::zeros(n, n_classes);
        if raw.len() == 1 {
            for i in 0..n {
                let p = Self::sigmoid(raw[0][i]);
                out.set(i, 0, 1.0 - p);
                out.set(i, 1, p);
            }
        } else {
            for i in 0..n {
                let scores: Vec<f64> = raw.iter().map(|r| Self::sigmoid(r[i])).collect();
                let sum: f64 = scores.iter().sum();
                for (k, &s) in scores.iter().enumerate() {
                    let p = if sum > 0.0 { s / sum } else { 1.0 / n_classes as f64 };
                    out.set(i, k, p);
                }
            }
        }
        Ok(out)
    }

    fn argmax_rows(proba: &Matrix) -> Vec<usize> {
        (0..proba.rows())
            .map(|i| {
                let row = proba.row(i);
                let mut best = 0;
                for (k, &v) in row.iter().enumerate() {
                    if v > row[best] {
                        best = k;
                    }
                }
                best
            })
            .collect()
    }

    /// Leaf-index matrix for `x`: one column per tree in the fitted
    /// ensemble, chain-major order, using the already-fitted trees.
    pub fn predict_leaf_indices(&self, x: &Matrix) -> ModelResult<LeafMatrix> {
        if self.chains.is_empty() {
            return Err(ModelError::ModelNotTrained);
        }
        let mut columns = Vec::with_capacity(self.n_trees());
        for chain in &self.chains {
            for tree in &chain.trees {
                columns.push(tree.apply(x)?);
            }
        }
        LeafMatrix::from_columns(&columns)
    }

    /// Class probabilities from the ensemble's native additive prediction.
    pub fn predict_proba(&self, x: &Matrix) -> ModelResult<Matrix> {
        if self.chains.is_empty() {
            return Err(ModelError::ModelNotTrained);
        }
        let n = x.rows();
        let mut raw: Vec<Vec<f64>> = self
            .chains
            .iter()
            .map(|c| vec![c.initial_log_odds; n])
            .collect();
        for (k, chain) in self.chains.iter().enumerate() {
            for tree in &chain.trees {
                let step = tree.predict(x)?;
                for i in 0..n {
                    raw[k][i] += self.learning_rate * step[i];
                }
            }
        }
        Self::proba_from_raw(&raw, self.n_classes)
    }

    pub fn predict(&self, x: &Matrix) -> ModelResult<Vec<usize>> {
        let proba = self.predict_proba(x)?;
        Ok(Self::argmax_rows(&proba))
    }

    /// Total number of trees across all chains.
    pub fn n_trees(&self) -> usize {
        self.chains.iter().map(|c| c.trees.len()).sum()
    }

    pub fn n_classes(&self) -> usize {
        self.n_classes
    }

    /// Metric values recorded after each boosting round.
    pub fn eval_history(&self) -> &[f64] {
        &self.eval_history
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn binary_data() -> (Matrix, Vec<usize>) {
        let x = Matrix::from_rows(&[
            vec![0.0, 0.1],
            vec![0.2, 0.0],
            vec![0.1, 0.2],
            vec![0.3, 0.1],
            vec![0.9, 1.0],
            vec![1.0, 0.8],
            vec![0.8, 0.9],
            vec![1.1, 1.0],
        ])
        .unwrap();
        let y = vec![0, 0, 0, 0, 1, 1, 1, 1];
        (x, y)
    }

    #[test]
    fn test_binary_fit_predict() {
        let (x, y) = binary_data();
        let mut model = GradientBoostedTrees::new(20, 0.3, 3, 2, 1.0, Some(7));
        model.fit(&x, &y, 2, EvalMetric::LogLoss, (&x, &y)).unwrap();
        assert_eq!(model.predict(&x).unwrap(), y);
    }

    #[test]
    fn test_eval_history_length_and_improvement() {
        let (x, y) = binary_data();
        let mut model = GradientBoostedTrees::new(15, 0.3, 3, 2, 1.0, Some(7));
        model.fit(&x, &y, 2, EvalMetric::LogLoss, (&x, &y)).unwrap();
        let history = model.eval_history();
        assert_eq!(history.len(), 15);
        assert!(history[history.len() - 1] < history[0]);
    }

    #[test]
    fn test_leaf_matrix_shape_binary() {
        let (x, y) = binary_data();
        let mut model = GradientBoostedTrees::new(5, 0.3, 3, 2, 1.0, Some(1));
        model.fit(&x, &y, 2, EvalMetric::LogLoss, (&x, &y)).unwrap();
        let leaves = model.predict_leaf_indices(&x).unwrap();
        assert_eq!(leaves.rows(), x.rows());
        assert_eq!(leaves.cols(), model.n_trees());
        assert_eq!(model.n_trees(), 5);
    }

    #[test]
    fn test_subsampled_fit_is_reproducible_with_seed() {
        let (x, y) = binary_data();
        let mut first = GradientBoostedTrees::new(12, 0.3, 3, 2, 0.5, Some(11));
        first.fit(&x, &y, 2, EvalMetric::LogLoss, (&x, &y)).unwrap();
        assert_eq!(first.n_trees(), 12);
        assert_eq!(first.eval_history().len(), 12);

        // Same seed, same data: the row draws repeat exactly.
        let mut second = GradientBoostedTrees::new(12, 0.3, 3, 2, 0.5, Some(11));
        second.fit(&x, &y, 2, EvalMetric::LogLoss, (&x, &y)).unwrap();
        assert_eq!(first.eval_history(), second.eval_history());
        assert_eq!(
            first.predict_proba(&x).unwrap(),
            second.predict_proba(&x).unwrap()
        );
        assert_eq!(
            first.predict_leaf_indices(&x).unwrap(),
            second.predict_leaf_indices(&x).unwrap()
        );
    }

    #[test]
    fn test_multiclass_one_vs_rest() {
        let x = Matrix::from_rows(&[
            vec![0.0],
            vec![0.1],
            vec![0.2],
            vec![5.0],
            vec![5.1],
            vec![5.2],
            vec![10.0],
            vec![10.1],
            vec![10.2],
        ])
        .unwrap();
        let y = vec![0, 0, 0, 1, 1, 1, 2, 2, 2];
        let mut model = GradientBoostedTrees::new(10, 0.5, 3, 2, 1.0, Some(3));
        model.fit(&x, &y, 3, EvalMetric::ErrorRate, (&x, &y)).unwrap();
        assert_eq!(model.predict(&x).unwrap(), y);
        // One chain per class: 10 rounds x 3 chains.
        let leaves = model.predict_leaf_indices(&x).unwrap();
        assert_eq!(leaves.cols(), 30);
    }

    #[test]
    fn test_predict_before_fit_fails() {
        let model = GradientBoostedTrees::new(5, 0.1, 3, 2, 1.0, None);
        let x = Matrix::from_rows(&[vec![1.0]]).unwrap();
        assert!(matches!(
            model.predict_leaf_indices(&x),
            Err(ModelError::ModelNotTrained)
        ));
    }

    #[test]
    fn test_out_of_range_label_is_fit_failure() {
        let (x, _) = binary_data();
        let y = vec![0, 0, 0, 0, 1, 1, 1, 5];
        let mut model = GradientBoostedTrees::new(5, 0.1, 3, 2, 1.0, None);
        assert!(matches!(
            model.fit(&x, &y, 2, EvalMetric::LogLoss, (&x, &y)),
            Err(ModelError::FitFailure(_))
        ));
    }
}
