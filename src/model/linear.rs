//! ndarray-backed linear Q-value approximator.
//!
//! Small enough to run an optimization step well inside the inter-state window,
//! which makes it the default plug-in for the training loop and the vehicle for
//! the crate's tests. Heavier network backends implement [QModel] the same way.

use ndarray::{Array1, Array2, Axis, Ix1, Ix2};
use rand::seq::SliceRandom;
use rand::Rng;

use crate::error::{OptimizationError, PersistenceError};
use crate::prelude::ACTION_SPACE;
use crate::state::FEATURE_SIZE;

use super::{FitOptions, ModelWeights, OptimizerConfig, QModel};

const ACTIONS: usize = ACTION_SPACE as usize;
const INIT_SPREAD: f32 = 0.05;

pub struct LinearQModel {
    weights: Array2<f32>,
    bias: Array1<f32>,
    optimizer: OptimizerConfig,
}

impl LinearQModel {
    pub fn new() -> Self {
        let mut rng = rand::thread_rng();
        Self {
            weights: Array2::from_shape_fn((FEATURE_SIZE, ACTIONS), |_| {
                rng.gen_range(-INIT_SPREAD..INIT_SPREAD)
            }),
            bias: Array1::zeros(ACTIONS),
            optimizer: OptimizerConfig::default(),
        }
    }
}

impl Default for LinearQModel {
    fn default() -> Self { LinearQModel::new() }
}

impl QModel for LinearQModel {
    fn apply(
        &self,
        inputs: &Array2<f32>,
    ) -> Array2<f32> {
        inputs.dot(&self.weights) + &self.bias
    }

    fn fit(
        &mut self,
        inputs: &Array2<f32>,
        targets: &Array2<f32>,
        options: &FitOptions,
    ) -> Result<f32, OptimizationError> {
        if inputs.nrows() != targets.nrows() || inputs.ncols() != FEATURE_SIZE || targets.ncols() != ACTIONS {
            return Err(OptimizationError::ShapeMismatch {
                expected: format!("inputs (n, {FEATURE_SIZE}), targets (n, {ACTIONS})"),
                actual: format!(
                    "inputs ({}, {}), targets ({}, {})",
                    inputs.nrows(),
                    inputs.ncols(),
                    targets.nrows(),
                    targets.ncols()
                ),
            });
        }

        let mut rng = rand::thread_rng();
        let mut order: Vec<usize> = (0..inputs.nrows()).collect();
        let minibatch_len = options.batch_size.max(1);

        let mut loss_sum = 0.0_f32;
        let mut minibatches = 0_usize;

        for _ in 0..options.epochs {
            if options.shuffle {
                order.shuffle(&mut rng);
            }
            for chunk in order.chunks(minibatch_len) {
                let x = inputs.select(Axis(0), chunk);
                let t = targets.select(Axis(0), chunk);

                let error = x.dot(&self.weights) + &self.bias - &t;
                let loss = error.mapv(|e| e * e).mean().unwrap_or(0.0);
                if !loss.is_finite() {
                    return Err(OptimizationError::NonFiniteLoss(loss));
                }

                // squared-error gradient, averaged over the minibatch
                let grad_out = &error * (2.0 / chunk.len() as f32);
                self.weights.scaled_add(-self.optimizer.learning_rate, &x.t().dot(&grad_out));
                self.bias.scaled_add(-self.optimizer.learning_rate, &grad_out.sum_axis(Axis(0)));

                loss_sum += loss;
                minibatches += 1;
            }
        }

        Ok(loss_sum / minibatches.max(1) as f32)
    }

    fn weights(&self) -> ModelWeights {
        ModelWeights(vec![self.weights.clone().into_dyn(), self.bias.clone().into_dyn()])
    }

    fn set_weights(
        &mut self,
        weights: ModelWeights,
    ) -> Result<(), PersistenceError> {
        let incompatible = |msg: String| PersistenceError::IncompatibleWeights(msg);

        let mut tensors = weights.0.into_iter();
        let (Some(w), Some(b), None) = (tensors.next(), tensors.next(), tensors.next()) else {
            return Err(incompatible("expected exactly 2 weight tensors".to_string()));
        };

        let w = w
            .into_dimensionality::<Ix2>()
            .map_err(|e| incompatible(format!("weight matrix: {e}")))?;
        let b = b
            .into_dimensionality::<Ix1>()
            .map_err(|e| incompatible(format!("bias vector: {e}")))?;

        if w.dim() != (FEATURE_SIZE, ACTIONS) || b.dim() != ACTIONS {
            return Err(incompatible(format!(
                "got weight matrix {:?} and bias {:?}, model is ({FEATURE_SIZE}, {ACTIONS})",
                w.dim(),
                b.dim()
            )));
        }

        self.weights = w;
        self.bias = b;
        Ok(())
    }

    fn compile(
        &mut self,
        optimizer: OptimizerConfig,
    ) {
        self.optimizer = optimizer;
    }
}
