//! Target-network synchronization and checkpointing.

use crate::error::PersistenceError;
use crate::model::QModel;
use crate::storage::{CheckpointStore, MAIN_NAMESPACE, TARGET_NAMESPACE};

/// Copies the online model's weights into the target model in place, then
/// persists both models under their namespaces.
///
/// Freezing the bootstrap source for a window of updates is the standard DQN
/// stabilization step: without it the same weights would generate both the
/// predictions and the values used to correct them.
pub fn sync<M: QModel>(
    online: &M,
    target: &mut M,
    store: &CheckpointStore,
) -> Result<(), PersistenceError> {
    target.set_weights(online.weights())?;
    store.save(MAIN_NAMESPACE, online)?;
    store.save(TARGET_NAMESPACE, target)?;
    Ok(())
}
