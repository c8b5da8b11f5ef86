use std::fmt::{Display, Formatter};

use anyhow::{bail, Result};

use crate::error::EnvironmentError;
use crate::state::RunnerState;

/// Data type we use to encode an action when feeding the model.
pub type ModelActionType = u8;

/// Number of possible actions
pub const ACTION_SPACE: ModelActionType = 2;

/// The runner's binary control input.
#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq)]
pub enum RunnerAction {
    /// Keep running
    Run,
    /// Jump over the next obstacle
    Jump,
}

impl RunnerAction {
    /// Identifies the action as a unique value in range (0..[ACTION_SPACE])
    pub fn numeric(&self) -> ModelActionType {
        match self {
            RunnerAction::Run => 0,
            RunnerAction::Jump => 1,
        }
    }

    pub fn try_from_numeric(value: ModelActionType) -> Result<Self> {
        match value {
            0 => Ok(RunnerAction::Run),
            1 => Ok(RunnerAction::Jump),
            _ => bail!("action value {} out of range", value),
        }
    }
}

impl Display for RunnerAction {
    fn fmt(
        &self,
        f: &mut Formatter<'_>,
    ) -> std::fmt::Result {
        match self {
            RunnerAction::Run => f.write_str("run"),
            RunnerAction::Jump => f.write_str("jump"),
        }
    }
}

/// The live game as seen from the training loop.
///
/// Implementations wrap whatever drives the actual game (usually a scripted
/// browser page). The environment has exactly one current state, so calls must
/// never be issued concurrently - the training loop sequences them.
pub trait Environment {
    /// Begins a fresh episode.
    fn restart(&mut self) -> Result<(), EnvironmentError>;

    /// Non-blocking snapshot of the current game state.
    fn state(&mut self) -> Result<RunnerState, EnvironmentError>;

    /// Fire-and-forget control input. Returns as soon as the input is dispatched,
    /// not when its effect becomes visible.
    fn perform_action(
        &mut self,
        action: RunnerAction,
    ) -> Result<(), EnvironmentError>;
}
