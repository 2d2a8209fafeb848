//! # leafcast
//!
//! A two-stage classifier: a gradient-boosted tree ensemble used purely as
//! a feature transformation (each sample is described by the leaf it
//! reaches in every tree), a one-hot encoding of those leaf identifiers
//! against a fixed fit-time vocabulary, and a logistic regression fitted on
//! the resulting binary matrix.
//!
//! ## Modules
//!
//! - **core** — `Matrix` / `LeafMatrix` types and the shared error taxonomy
//! - **tree** — CART regression trees with stable leaf identifiers, the
//!   gradient-boosted ensemble with per-round evaluation
//! - **encoding** — leaf-index one-hot encoder with an explicit
//!   out-of-vocabulary policy
//! - **linear** — multinomial logistic regression (softmax, gradient descent)
//! - **metrics** — accuracy, error rate, log loss, multiclass log loss
//! - **io** — CSV dataset loading, JSON model-state serialization
//! - **pipeline** — `LeafEncodedClassifier`: train/predict orchestration,
//!   lifecycle state, and versioned persistence

/// Matrix types and error taxonomy.
pub use leafcast_core as core;

/// Tree models and the boosted ensemble.
pub use leafcast_tree as tree;

/// Leaf-index one-hot encoding.
pub use leafcast_encoding as encoding;

/// Linear models.
pub use leafcast_linear as linear;

/// Evaluation metrics.
pub use leafcast_metrics as metrics;

/// I/O utilities.
pub use leafcast_io as io;

/// The two-stage classifier pipeline.
pub use leafcast_pipeline as pipeline;

pub use leafcast_core::{LeafMatrix, Matrix, ModelError, ModelResult};
pub use leafcast_pipeline::{LeafCastConfig, LeafEncodedClassifier};
