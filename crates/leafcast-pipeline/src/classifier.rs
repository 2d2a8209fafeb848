use crate::config::LeafCastConfig;
use leafcast_core::{LeafMatrix, Matrix, ModelError, ModelResult};
use leafcast_encoding::LeafOneHotEncoder;
use leafcast_linear::LogisticRegression;
use leafcast_tree::GradientBoostedTrees;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

/// On-disk bundle format version. Bumped whenever the serialized layout of
/// any sub-model changes.
const FORMAT_VERSION: u32 = 1;

/// Everything a trained classifier owns: the boosted ensemble, the fixed
/// one-hot vocabulary, the linear weights, the label vocabulary, and the
/// training feature width.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct FittedModel {
    booster: GradientBoostedTrees,
    encoder: LeafOneHotEncoder,
    linear: LogisticRegression,
    /// Class index -> original label value, sorted ascending.
    labels: Vec<usize>,
    n_features: usize,
}

/// Versioned persistence bundle for the full fitted state.
#[derive(Serialize, Deserialize)]
struct ModelBundle {
    version: u32,
    model: FittedModel,
}

/// Lifecycle of the classifier. Illegal calls (predicting before training)
/// are an explicit match arm, not an ad hoc flag check.
enum State {
    Untrained,
    Trained(FittedModel),
}

/// Two-stage classifier: a gradient-boosted ensemble used purely as a
/// feature transformation (each sample becomes the tuple of leaves it
/// reaches), one-hot encoded against a fixed fit-time vocabulary, then
/// classified by logistic regression.
///
/// `train` and `predict` are synchronous and blocking; an instance owns its
/// sub-models exclusively and callers serialize shared access externally.
pub struct LeafEncodedClassifier {
    config: LeafCastConfig,
    state: State,
}

impl LeafEncodedClassifier {
    pub fn new(config: LeafCastConfig) -> Self {
        LeafEncodedClassifier {
            config,
            state: State::Untrained,
        }
    }

    pub fn config(&self) -> &LeafCastConfig {
        &self.config
    }

    pub fn is_trained(&self) -> bool {
        matches!(self.state, State::Trained(_))
    }

    /// Fit the full three-stage pipeline. The new fitted state is built off
    /// to the side and swapped in wholesale on success; a failed fit leaves
    /// any previously trained model untouched and usable.
    pub fn train(&mut self, x: &Matrix, y: &[usize]) -> ModelResult<()> {
        if x.is_empty() || y.is_empty() {
            return Err(ModelError::EmptyInput);
        }
        if x.rows() != y.len() {
            return Err(ModelError::DimensionMismatch {
                expected: x.rows(),
                got: y.len(),
            });
        }

        // Label vocabulary: sorted distinct labels -> class indices.
        let mut labels: Vec<usize> = y.to_vec();
        labels.sort_unstable();
        labels.dedup();
        if labels.len() < 2 {
            return Err(ModelError::FitFailure(
                "training labels must contain at least two distinct classes".to_string(),
            ));
        }
        let index_of: BTreeMap<usize, usize> =
            labels.iter().enumerate().map(|(i, &l)| (l, i)).collect();
        let class_indices: Vec<usize> = y.iter().map(|l| index_of[l]).collect();
        let n_classes = labels.len();

        // Stage 1: boosted ensemble, the training set as the sole eval set.
        let mut booster = GradientBoostedTrees::new(
            self.config.n_estimators,
            self.config.learning_rate,
            self.config.max_depth,
            self.config.min_samples_split,
            self.config.subsample,
            self.config.seed,
        );
        booster.fit(
            x,
            &class_indices,
            n_classes,
            self.config.eval_metric,
            (x, &class_indices),
        )?;

        // Stage 2: leaf identifiers -> fixed one-hot vocabulary.
        let leaves = booster.predict_leaf_indices(x)?;
        let mut encoder = LeafOneHotEncoder::new(self.config.oov_policy);
        let one_hot = encoder.fit_transform(&leaves)?;

        // Stage 3: linear classifier on the binary leaf features.
        let mut linear =
            LogisticRegression::new(self.config.lr_learning_rate, self.config.lr_max_iter);
        linear.fit(&one_hot, &class_indices, n_classes)?;

        self.state = State::Trained(FittedModel {
            booster,
            encoder,
            linear,
            labels,
            n_features: x.cols(),
        });
        Ok(())
    }

    /// Predict one label per input row, drawn from the training label set.
    ///
    /// An untrained instance first tries to restore a persisted bundle from
    /// `config.model_path`; with no path configured or no file present, the
    /// call fails with `ModelNotTrained`.
    pub fn predict(&mut self, x: &Matrix) -> ModelResult<Vec<usize>> {
        if !self.is_trained() {
            let has_bundle = self
                .config
                .model_path
                .as_deref()
                .map(|p| p.exists())
                .unwrap_or(false);
            if !has_bundle {
                return Err(ModelError::ModelNotTrained);
            }
            self.load_model()?;
        }
        let model = match &self.state {
            State::Trained(m) => m,
            State::Untrained => return Err(ModelError::ModelNotTrained),
        };

        if x.cols() != model.n_features {
            return Err(ModelError::DimensionMismatch {
                expected: model.n_features,
                got: x.cols(),
            });
        }

        let leaves = model.booster.predict_leaf_indices(x)?;
        let one_hot = model.encoder.transform(&leaves)?;
        let class_indices = model.linear.predict(&one_hot)?;
        Ok(class_indices.iter().map(|&i| model.labels[i]).collect())
    }

    /// Leaf-index matrix for `x` under the fitted ensemble, one column per
    /// tree. Exposed so callers can reuse the ensemble as a standalone
    /// feature transformer.
    pub fn transform_leaves(&self, x: &Matrix) -> ModelResult<LeafMatrix> {
        let model = match &self.state {
            State::Trained(m) => m,
            State::Untrained => return Err(ModelError::ModelNotTrained),
        };
        if x.cols() != model.n_features {
            return Err(ModelError::DimensionMismatch {
                expected: model.n_features,
                got: x.cols(),
            });
        }
        model.booster.predict_leaf_indices(x)
    }

    /// Width of the fixed one-hot vocabulary, once trained.
    pub fn leaf_vocabulary_size(&self) -> Option<usize> {
        match &self.state {
            State::Trained(m) => Some(m.encoder.n_output_columns()),
            State::Untrained => None,
        }
    }

    /// Per-round metric values from the last boosting fit. Empty until
    /// trained.
    pub fn eval_history(&self) -> &[f64] {
        match &self.state {
            State::Trained(m) => m.booster.eval_history(),
            State::Untrained => &[],
        }
    }

    /// Persist the fitted state as a single versioned JSON bundle.
    pub fn save_model(&self, path: &Path) -> ModelResult<()> {
        let model = match &self.state {
            State::Trained(m) => m,
            State::Untrained => return Err(ModelError::ModelNotTrained),
        };
        let bundle = ModelBundle {
            version: FORMAT_VERSION,
            model: model.clone(),
        };
        leafcast_io::save_json(&bundle, path)
    }

    /// Restore a previously persisted bundle from `config.model_path`.
    pub fn load_model(&mut self) -> ModelResult<()> {
        let path = match &self.config.model_path {
            Some(p) => p.clone(),
            None => return Err(ModelError::ModelNotTrained),
        };
        if !path.exists() {
            return Err(ModelError::ModelNotTrained);
        }
        let bundle: ModelBundle = leafcast_io::load_json(&path)?;
        if bundle.version != FORMAT_VERSION {
            return Err(ModelError::Serialization(format!(
                "unsupported bundle version {} (expected {})",
                bundle.version, FORMAT_VERSION
            )));
        }
        self.state = State::Trained(bundle.model);
        Ok(())
    }
}

impl Default for LeafEncodedClassifier {
    fn default() -> Self {
        Self::new(LeafCastConfig::default())
    }
}
