//! Double-DQN training core for an endless side-scrolling runner game.
//!
//! The agent observes numeric game state each control tick and chooses between
//! jumping and running on. This crate covers the online learning machinery:
//! feature encoding, epsilon-greedy action selection, experience replay, the
//! Double-DQN optimization step, periodic target-network synchronization with
//! durable checkpoints, and the episode-driving training loop.
//!
//! The live game is abstracted behind [prelude::Environment]; the function
//! approximator behind [model::QModel].

pub mod error;
pub mod learn;
pub mod log;
pub mod model;
pub mod policy;
pub mod prelude;
pub mod replay;
pub mod state;
pub mod storage;
