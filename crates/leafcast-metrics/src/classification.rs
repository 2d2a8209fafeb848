use leafcast_core::Matrix;

/// Fraction of correct predictions.
pub fn accuracy(y_true: &[usize], y_pred: &[usize]) -> f64 {
    assert_eq!(y_true.len(), y_pred.len(), "length mismatch");
    if y_true.is_empty() {
        return 0.0;
    }
    let correct = y_true
        .iter()
        .zip(y_pred.iter())
        .filter(|(a, b)| a == b)
        .count();
    correct as f64 / y_true.len() as f64
}

/// Fraction of incorrect predictions.
pub fn error_rate(y_true: &[usize], y_pred: &[usize]) -> f64 {
    1.0 - accuracy(y_true, y_pred)
}

/// Binary log loss over positive-class probabilities.
///
/// L = -mean(y * log(p) + (1-y) * log(1-p)), probabilities clamped away
/// from 0 and 1.
pub fn log_loss(y_true: &[usize], p_positive: &[f64]) -> f64 {
    assert_eq!(y_true.len(), p_positive.len(), "length mismatch");
    let eps = 1e-15;
    let n = y_true.len();
    let mut total = 0.0;
    for i in 0..n {
        let y = if y_true[i] == 1 { 1.0 } else { 0.0 };
        let p = p_positive[i].clamp(eps, 1.0 - eps);
        total -= y * p.ln() + (1.0 - y) * (1.0 - p).ln();
    }
    total / n as f64
}

/// Multiclass log loss over an n x K probability matrix.
///
/// Each row of `proba` holds the class probabilities for one sample;
/// `y_true[i]` indexes the column of the true class.
pub fn multiclass_log_loss(y_true: &[usize], proba: &Matrix) -> f64 {
    assert_eq!(y_true.len(), proba.rows(), "length mismatch");
    let eps = 1e-15;
    let n = y_true.len();
    let mut total = 0.0;
    for (i, &cls) in y_true.iter().enumerate() {
        let p = proba.get(i, cls).clamp(eps, 1.0 - eps);
        total -= p.ln();
    }
    total / n as f64
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_accuracy() {
        let y_true = vec![0, 1, 2, 1, 0];
        let y_pred = vec![0, 1, 2, 0, 0];
        assert_relative_eq!(accuracy(&y_true, &y_pred), 0.8);
        assert_relative_eq!(error_rate(&y_true, &y_pred), 0.2, epsilon = 1e-12);
    }

    #[test]
    fn test_log_loss_perfect_predictions() {
        let y_true = vec![0, 1, 1, 0];
        let p = vec![0.0, 1.0, 1.0, 0.0];
        // Clamped, so loss is tiny but nonzero
        assert!(log_loss(&y_true, &p) < 1e-10);
    }

    #[test]
    fn test_log_loss_uninformative() {
        let y_true = vec![0, 1];
        let p = vec![0.5, 0.5];
        assert_relative_eq!(log_loss(&y_true, &p), 2.0_f64.ln(), epsilon = 1e-12);
    }

    #[test]
    fn test_multiclass_log_loss() {
        let proba = Matrix::from_rows(&[
            vec![0.7, 0.2, 0.1],
            vec![0.1, 0.8, 0.1],
        ])
        .unwrap();
        let y_true = vec![0, 1];
        let expected = -(0.7_f64.ln() + 0.8_f64.ln()) / 2.0;
        assert_relative_eq!(multiclass_log_loss(&y_true, &proba), expected, epsilon = 1e-12);
    }
}
