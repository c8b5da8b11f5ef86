//! Double-DQN optimization step.
//!
//! Action selection for the bootstrap uses the ONLINE model, value estimation
//! uses the TARGET model. Decoupling the two is what distinguishes Double DQN
//! from vanilla DQN and reduces overestimation bias.

use ndarray::{Array2, ArrayView1};

use crate::error::OptimizationError;
use crate::model::{FitOptions, QModel};
use crate::policy::argmax_first;
use crate::replay::Transition;
use crate::state::{FeatureVector, FEATURE_SIZE};

fn feature_matrix<'a>(rows: impl ExactSizeIterator<Item = &'a FeatureVector>) -> Array2<f32> {
    let mut matrix = Array2::zeros((rows.len(), FEATURE_SIZE));
    for (i, row) in rows.enumerate() {
        matrix.row_mut(i).assign(&ArrayView1::from(&row[..]));
    }
    matrix
}

/// Builds the regression target matrix for a sampled batch.
///
/// Each row starts as the online model's current prediction for the transition's
/// state; only the taken action's component is overwritten - with the plain
/// reward on terminal transitions (no bootstrap), otherwise with
/// `reward + gamma * target(next)[argmax_a online(next)[a]]`. The untaken
/// action's component keeps the model's own prediction, so its gradient
/// contribution is zero.
pub fn double_dqn_targets<M: QModel>(
    online: &M,
    target: &M,
    batch: &[&Transition],
    gamma: f32,
) -> Array2<f32> {
    let next_states = feature_matrix(batch.iter().map(|t| &t.next_state));
    let q_next_online = online.apply(&next_states);
    let q_next_target = target.apply(&next_states);

    let states = feature_matrix(batch.iter().map(|t| &t.state));
    let mut targets = online.apply(&states);

    for (i, transition) in batch.iter().enumerate() {
        let value = if transition.done {
            transition.reward
        } else {
            let next_action = argmax_first(q_next_online.row(i));
            transition.reward + gamma * q_next_target[(i, next_action)]
        };
        targets[(i, transition.action.numeric() as usize)] = value;
    }
    targets
}

/// Runs one optimization step on the online model: computes the Double-DQN
/// targets for the batch and fits for exactly one shuffled epoch.
///
/// One batched forward/backward pass - the online model is read twice (current
/// prediction and next-action argmax) against the same weight snapshot.
pub fn optimize<M: QModel>(
    online: &mut M,
    target: &M,
    batch: &[&Transition],
    gamma: f32,
) -> Result<f32, OptimizationError> {
    let states = feature_matrix(batch.iter().map(|t| &t.state));
    let targets = double_dqn_targets(online, target, batch, gamma);
    let options = FitOptions {
        epochs: 1,
        batch_size: batch.len().max(1),
        shuffle: true,
    };
    online.fit(&states, &targets, &options)
}
