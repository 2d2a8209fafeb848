use leafcast_encoding::OovPolicy;
use leafcast_tree::EvalMetric;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Configuration for [`LeafEncodedClassifier`](crate::LeafEncodedClassifier).
///
/// The boosting block mirrors the ensemble parameters. `eval_metric` is
/// evaluated after every round against the training set, which doubles as
/// the sole evaluation set. `oov_policy` governs leaf identifiers at
/// predict time that were never seen during training.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LeafCastConfig {
    pub n_estimators: usize,
    pub learning_rate: f64,
    pub max_depth: usize,
    pub min_samples_split: usize,
    /// Fraction of rows sampled per boosting round, clamped to [0.1, 1.0].
    pub subsample: f64,
    pub seed: Option<u64>,
    pub eval_metric: EvalMetric,
    pub oov_policy: OovPolicy,
    pub lr_learning_rate: f64,
    pub lr_max_iter: usize,
    /// Location of a persisted model bundle. When set, `predict` on an
    /// untrained instance restores from here before failing.
    pub model_path: Option<PathBuf>,
}

impl Default for LeafCastConfig {
    fn default() -> Self {
        LeafCastConfig {
            n_estimators: 50,
            learning_rate: 0.1,
            max_depth: 3,
            min_samples_split: 2,
            subsample: 1.0,
            seed: None,
            eval_metric: EvalMetric::LogLoss,
            oov_policy: OovPolicy::ZeroFill,
            lr_learning_rate: 0.1,
            lr_max_iter: 500,
            model_path: None,
        }
    }
}
