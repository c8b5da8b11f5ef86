//! Epsilon-greedy action selection.

use ndarray::{Array2, ArrayView1};
use rand::Rng;

use crate::model::QModel;
use crate::prelude::RunnerAction;
use crate::state::{FeatureVector, FEATURE_SIZE};

/// Index of the first (lowest-index) maximum in an action-value row.
///
/// Ties break towards the lower action index. This is deliberate and must stay
/// stable: it keeps greedy decisions reproducible against logged feature vectors.
pub(crate) fn argmax_first(row: ArrayView1<'_, f32>) -> usize {
    let mut best = 0;
    for (i, &value) in row.iter().enumerate() {
        if value > row[best] {
            best = i;
        }
    }
    best
}

/// Selects the next action: with probability `epsilon` a uniformly random one
/// (pure exploration), otherwise the greedy argmax of the model's prediction.
///
/// Stateless - the exploration rate is owned by the caller and passed in.
pub fn select_action<M: QModel, R: Rng>(
    model: &M,
    features: &FeatureVector,
    epsilon: f64,
    rng: &mut R,
) -> RunnerAction {
    if rng.gen_range(0.0..1.0) < epsilon {
        return if rng.gen_bool(0.5) { RunnerAction::Jump } else { RunnerAction::Run };
    }

    let input = Array2::from_shape_fn((1, FEATURE_SIZE), |(_, j)| features[j]);
    let values = model.apply(&input);
    match argmax_first(values.row(0)) {
        0 => RunnerAction::Run,
        _ => RunnerAction::Jump,
    }
}

#[cfg(test)]
mod tests {
    use ndarray::arr1;

    use super::*;
    use crate::model::{LinearQModel, ModelWeights, QModel};

    /// A model whose prediction prefers the given action for every input.
    fn model_preferring(action: RunnerAction) -> LinearQModel {
        let mut model = LinearQModel::new();
        let mut weights = model.weights();
        weights.0[0].fill(0.0);
        weights.0[1].fill(0.0);
        weights.0[1][[action.numeric() as usize]] = 1.0;
        model.set_weights(weights).unwrap();
        model
    }

    #[test]
    fn greedy_when_epsilon_is_zero() {
        let mut rng = rand::thread_rng();
        let features = [0.0; FEATURE_SIZE];

        let model = model_preferring(RunnerAction::Jump);
        for _ in 0..20 {
            assert_eq!(select_action(&model, &features, 0.0, &mut rng), RunnerAction::Jump);
        }

        let model = model_preferring(RunnerAction::Run);
        for _ in 0..20 {
            assert_eq!(select_action(&model, &features, 0.0, &mut rng), RunnerAction::Run);
        }
    }

    #[test]
    fn explores_both_actions_when_epsilon_is_one() {
        let mut rng = rand::thread_rng();
        let features = [0.0; FEATURE_SIZE];
        let model = model_preferring(RunnerAction::Jump);

        let mut seen_run = false;
        let mut seen_jump = false;
        for _ in 0..200 {
            match select_action(&model, &features, 1.0, &mut rng) {
                RunnerAction::Run => seen_run = true,
                RunnerAction::Jump => seen_jump = true,
            }
        }
        assert!(seen_run && seen_jump);
    }

    #[test]
    fn ties_break_towards_the_first_maximum() {
        assert_eq!(argmax_first(arr1(&[0.5, 0.5]).view()), 0);
        assert_eq!(argmax_first(arr1(&[0.5, 0.6]).view()), 1);
        assert_eq!(argmax_first(arr1(&[0.7, 0.6]).view()), 0);

        // a zero-weight model predicts equal values: greedy choice must be Run
        let mut model = LinearQModel::new();
        let zeros: ModelWeights = {
            let mut w = model.weights();
            w.0[0].fill(0.0);
            w.0[1].fill(0.0);
            w
        };
        model.set_weights(zeros).unwrap();

        let mut rng = rand::thread_rng();
        assert_eq!(select_action(&model, &[0.0; FEATURE_SIZE], 0.0, &mut rng), RunnerAction::Run);
    }
}
