use leafcast_core::{Matrix, ModelError, ModelResult};
use serde::{Deserialize, Serialize};

/// Multinomial logistic regression trained with full-batch gradient
/// descent. Binary classification is the K = 2 case.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogisticRegression {
    pub learning_rate: f64,
    pub max_iter: usize,
    pub tol: f64,
    weights: Option<Matrix>, // K x p
    bias: Vec<f64>,          // K
    n_classes: usize,
}

impl LogisticRegression {
    pub fn new(learning_rate: f64, max_iter: usize) -> Self {
        LogisticRegression {
            learning_rate,
            max_iter,
            tol: 1e-6,
            weights: None,
            bias: Vec::new(),
            n_classes: 0,
        }
    }

    /// Row-wise softmax with the max subtracted for stability.
    fn softmax(scores: &mut [f64]) {
        let max = scores.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        let mut sum = 0.0;
        for s in scores.iter_mut() {
            *s = (*s - max).exp();
            sum += *s;
        }
        for s in scores.iter_mut() {
            *s /= sum;
        }
    }

    pub fn fit(&mut self, x: &Matrix, y: &[usize], n_classes: usize) -> ModelResult<()> {
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

        let n = x.rows();
        let p = x.cols();
        let n_f = n as f64;

        let mut w = Matrix::zeros(n_classes, p);
        let mut b = vec![0.0; n_classes];

        for _iter in 0..self.max_iter {
            let mut dw = Matrix::zeros(n_classes, p);
            let mut db = vec![0.0; n_classes];
            let mut total_loss = 0.0;

            for i in 0..n {
                let row = x.row(i);
                let mut scores: Vec<f64> = (0..n_classes)
                    .map(|k| {
                        let mut z = b[k];
                        for j in 0..p {
                            z += w.get(k, j) * row[j];
                        }
                        z
                    })
                    .collect();
                Self::softmax(&mut scores);

                for k in 0..n_classes {
                    let target = if y[i] == k { 1.0 } else { 0.0 };
                    let error = scores[k] - target;
                    for j in 0..p {
                        dw.set(k, j, dw.get(k, j) + error * row[j]);
                    }
                    db[k] += error;
                }

                total_loss -= scores[y[i]].max(1e-15).ln();
            }

            if !total_loss.is_finite() {
                return Err(ModelError::FitFailure(format!(
                    "non-finite loss {} during gradient descent",
                    total_loss
                )));
            }

            let mut max_grad = 0.0f64;
            for k in 0..n_classes {
                for j in 0..p {
                    let grad = dw.get(k, j) / n_f;
                    w.set(k, j, w.get(k, j) - self.learning_rate * grad);
                    max_grad = max_grad.max(grad.abs());
                }
                b[k] -= self.learning_rate * (db[k] / n_f);
            }

            if max_grad < self.tol {
                break;
            }
        }

        self.weights = Some(w);
        self.bias = b;
        self.n_classes = n_classes;
        Ok(())
    }

    /// Class probabilities, one row per sample.
    pub fn predict_proba(&self, x: &Matrix) -> ModelResult<Matrix> {
        let w = self.weights.as_ref().ok_or(ModelError::ModelNotTrained)?;
        if x.cols() != w.cols() {
            return Err(ModelError::DimensionMismatch {
                expected: w.cols(),
                got: x.cols(),
            });
        }
        let n = x.rows();
        let mut out = Matrix::zeros(n, self.n_classes);
        for i in 0..n {
            let row = x.row(i);
            let mut scores: Vec<f64> = (0..self.n_classes)
                .map(|k| {
                    let mut z = self.bias[k];
                    for j in 0..x.cols() {
                        z += w.get(k, j) * row[j];
                    }
                    z
                })
                .collect();
            Self::softmax(&mut scores);
            for (k, &s) in scores.iter().enumerate() {
                out.set(i, k, s);
            }
        }
        Ok(out)
    }

    /// Class index with the highest probability, per sample.
    pub fn predict(&self, x: &Matrix) -> ModelResult<Vec<usize>> {
        let proba = self.predict_proba(x)?;
        Ok((0..proba.rows())
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
            .collect())
    }

    pub fn n_classes(&self) -> usize {
        self.n_classes
    }
}
