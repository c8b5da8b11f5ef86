//! Function-approximator abstraction consumed by the learning core.
//!
//! The training loop never sees network internals - only this capability
//! surface. Two independently owned instances exist at runtime: the online
//! model (updated every optimization step) and the target model (updated only
//! at synchronization points).

pub mod linear;

use std::fs;
use std::path::Path;

use ndarray::{Array2, ArrayD};
use serde::{Deserialize, Serialize};

use crate::error::{OptimizationError, PersistenceError};

pub use linear::LinearQModel;

/// Options for one call to [QModel::fit].
#[derive(Debug, Clone)]
pub struct FitOptions {
    pub epochs: usize,
    pub batch_size: usize,
    pub shuffle: bool,
}

impl Default for FitOptions {
    fn default() -> Self {
        Self {
            epochs: 1,
            batch_size: 32,
            shuffle: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OptimizerConfig {
    pub learning_rate: f32,
}

impl Default for OptimizerConfig {
    fn default() -> Self {
        Self { learning_rate: 1e-3 }
    }
}

/// Ordered list of weight tensors, as handed between the online and the target
/// model and persisted in checkpoints.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelWeights(pub Vec<ArrayD<f32>>);

/// 'Physical' model abstraction: maps a batch of feature rows to a batch of
/// action-value rows and can be trained against target rows.
pub trait QModel {
    /// Batched forward pass: `(n, FEATURE_SIZE)` in, `(n, ACTION_SPACE)` out.
    fn apply(
        &self,
        inputs: &Array2<f32>,
    ) -> Array2<f32>;

    /// Trains against a batch of (input, target) rows and returns the mean loss.
    fn fit(
        &mut self,
        inputs: &Array2<f32>,
        targets: &Array2<f32>,
        options: &FitOptions,
    ) -> Result<f32, OptimizationError>;

    fn weights(&self) -> ModelWeights;

    /// Fails when the snapshot does not match the model's architecture.
    fn set_weights(
        &mut self,
        weights: ModelWeights,
    ) -> Result<(), PersistenceError>;

    fn compile(
        &mut self,
        optimizer: OptimizerConfig,
    );

    /// Persists the weight snapshot. Writes go to a scratch file first and are
    /// promoted by rename, so an interrupted save leaves a previously valid
    /// checkpoint intact.
    fn save(
        &self,
        file: &Path,
    ) -> Result<(), PersistenceError> {
        let scratch = file.with_extension("tmp");
        fs::write(&scratch, serde_json::to_vec(&self.weights())?)?;
        fs::rename(&scratch, file)?;
        Ok(())
    }

    fn load(
        &mut self,
        file: &Path,
    ) -> Result<(), PersistenceError> {
        let weights: ModelWeights = serde_json::from_slice(&fs::read(file)?)?;
        self.set_weights(weights)
    }
}
