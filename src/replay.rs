//! Bounded experience-replay memory with uniform random sampling.

use std::collections::VecDeque;

use rand::Rng;

use crate::error::InsufficientDataError;
use crate::prelude::RunnerAction;
use crate::state::FeatureVector;

/// One (state, action, reward, next state, done) record of interaction with the
/// environment. Immutable once stored.
#[derive(Debug, Clone, PartialEq)]
pub struct Transition {
    pub state: FeatureVector,
    pub action: RunnerAction,
    pub reward: f32,
    pub next_state: FeatureVector,
    pub done: bool,
}

/// FIFO store of past transitions, bounded by a fixed capacity. When full, the
/// oldest transition is evicted to admit a new one.
pub struct ReplayMemory {
    capacity: usize,
    buffer: VecDeque<Transition>,
}

impl ReplayMemory {
    pub fn new(capacity: usize) -> Self {
        assert!(capacity > 0);
        Self {
            capacity,
            buffer: VecDeque::with_capacity(capacity),
        }
    }

    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    pub fn add(
        &mut self,
        transition: Transition,
    ) {
        if self.buffer.len() + 1 > self.capacity {
            self.buffer.pop_front();
        }
        self.buffer.push_back(transition);
    }

    /// Draws `n` transitions independently and uniformly at random - with
    /// replacement, so duplicates within one batch are permitted. No ordering
    /// guarantee on the returned batch.
    pub fn sample<R: Rng>(
        &self,
        n: usize,
        rng: &mut R,
    ) -> Result<Vec<&Transition>, InsufficientDataError> {
        if self.buffer.len() < n {
            return Err(InsufficientDataError {
                requested: n,
                available: self.buffer.len(),
            });
        }
        Ok((0..n).map(|_| &self.buffer[rng.gen_range(0..self.buffer.len())]).collect())
    }

    pub fn transitions(&self) -> impl Iterator<Item = &Transition> {
        self.buffer.iter()
    }
}
