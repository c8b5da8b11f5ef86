use thiserror::Error;

/// The game environment is unreachable or produced a state we cannot work with.
/// Fatal for the running session - surfaced to the operator.
#[derive(Error, Debug)]
pub enum EnvironmentError {
    #[error("environment unreachable: {0}")]
    Unreachable(String),
    #[error("malformed environment state: {0}")]
    MalformedState(String),
}

/// Sampling was requested before the replay memory held enough transitions.
/// The training loop guards against this, so hitting it indicates a caller bug.
#[derive(Error, Debug)]
#[error("replay memory holds {available} transitions, {requested} requested")]
pub struct InsufficientDataError {
    pub requested: usize,
    pub available: usize,
}

/// Numerical or shape failure during a fit step. Recovered locally: the step is
/// logged and skipped, training continues.
#[derive(Error, Debug)]
pub enum OptimizationError {
    #[error("shape mismatch: expected {expected}, got {actual}")]
    ShapeMismatch { expected: String, actual: String },
    #[error("non-finite training loss: {0}")]
    NonFiniteLoss(f32),
}

/// Checkpoint save/load failure. Losing one checkpoint is preferable to losing
/// the whole run, so these are logged and training continues on in-memory state.
#[derive(Error, Debug)]
pub enum PersistenceError {
    #[error("checkpoint I/O: {0}")]
    Io(#[from] std::io::Error),
    #[error("checkpoint encoding: {0}")]
    Encoding(#[from] serde_json::Error),
    #[error("incompatible weight snapshot: {0}")]
    IncompatibleWeights(String),
}
