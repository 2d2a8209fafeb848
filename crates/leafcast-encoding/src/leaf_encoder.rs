use leafcast_core::{LeafMatrix, Matrix, ModelError, ModelResult};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// How to treat a leaf identifier at transform time that was never seen
/// during fitting. The choice is always explicit configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OovPolicy {
    /// Fail with `UnknownCategory`.
    Strict,
    /// Emit an all-zero indicator for that tree's columns.
    ZeroFill,
}

/// One-hot encoder over leaf-index matrices.
///
/// `fit` establishes, per tree column, the vocabulary of distinct leaf
/// identifiers and a fixed (tree, identifier) -> output-column mapping.
/// `transform` reuses that layout unchanged; it never extends it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LeafOneHotEncoder {
    policy: OovPolicy,
    /// Per input column: leaf identifier -> local index within that
    /// column's block. BTreeMap keeps the layout deterministic.
    vocabularies: Vec<BTreeMap<u32, usize>>,
    /// Prefix-sum start offset of each column's block.
    offsets: Vec<usize>,
    n_output_columns: usize,
}

impl LeafOneHotEncoder {
    pub fn new(policy: OovPolicy) -> Self {
        LeafOneHotEncoder {
            policy,
            vocabularies: Vec::new(),
            offsets: Vec::new(),
            n_output_columns: 0,
        }
    }

    pub fn policy(&self) -> OovPolicy {
        self.policy
    }

    pub fn is_fitted(&self) -> bool {
        !self.vocabularies.is_empty()
    }

    /// Total width of the one-hot output: the sum over trees of the number
    /// of distinct leaf identifiers observed at fit time.
    pub fn n_output_columns(&self) -> usize {
        self.n_output_columns
    }

    pub fn fit(&mut self, leaves: &LeafMatrix) -> ModelResult<()> {
        if leaves.is_empty() {
            return Err(ModelError::EmptyInput);
        }
        let mut vocabularies = Vec::with_capacity(leaves.cols());
        let mut offsets = Vec::with_capacity(leaves.cols());
        let mut total = 0usize;
        for j in 0..leaves.cols() {
            let distinct: BTreeSet<u32> = leaves.column(j).collect();
            let vocab: BTreeMap<u32, usize> = distinct
                .into_iter()
                .enumerate()
                .map(|(local, leaf)| (leaf, local))
                .collect();
            offsets.push(total);
            total += vocab.len();
            vocabularies.push(vocab);
        }
        self.vocabularies = vocabularies;
        self.offsets = offsets;
        self.n_output_columns = total;
        Ok(())
    }

    pub fn transform(&self, leaves: &LeafMatrix) -> ModelResult<Matrix> {
        if !self.is_fitted() {
            return Err(ModelError::ModelNotTrained);
        }
        if leaves.cols() != self.vocabularies.len() {
            return Err(ModelError::DimensionMismatch {
                expected: self.vocabularies.len(),
                got: leaves.cols(),
            });
        }

        let mut out = Matrix::zeros(leaves.rows(), self.n_output_columns);
        for i in 0..leaves.rows() {
            for (j, vocab) in self.vocabularies.iter().enumerate() {
                let leaf = leaves.get(i, j);
                match vocab.get(&leaf) {
                    Some(&local) => out.set(i, self.offsets[j] + local, 1.0),
                    None => match self.policy {
                        OovPolicy::Strict => {
                            return Err(ModelError::UnknownCategory {
                                column: j,
                                value: leaf,
                            })
                        }
                        OovPolicy::ZeroFill => {}
                    },
                }
            }
        }
        Ok(out)
    }

    pub fn fit_transform(&mut self, leaves: &LeafMatrix) -> ModelResult<Matrix> {
        self.fit(leaves)?;
        self.transform(leaves)
    }
}
