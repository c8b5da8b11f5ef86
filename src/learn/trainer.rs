//! The episode driver: interacts with the live game, feeds the replay memory,
//! runs optimization steps and triggers target synchronization on schedule.

use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use anyhow::Result;
use itertools::Itertools;
use num_format::{Locale, ToFormattedString};
use rand::rngs::ThreadRng;
use rustc_hash::FxHashMap;

use crate::error::EnvironmentError;
use crate::learn::learner::optimize;
use crate::learn::sync::sync;
use crate::model::QModel;
use crate::policy::select_action;
use crate::prelude::{Environment, RunnerAction};
use crate::replay::{ReplayMemory, Transition};
use crate::state::{encode, RunnerState};
use crate::storage::{CheckpointStore, EpisodeLog, MAIN_NAMESPACE, TARGET_NAMESPACE};

const EPISODE_LOG_FILE: &str = "training.log";

pub struct Parameter {
    /// Number of episodes to run in one session
    pub episodes: usize,
    /// Maximum number of transitions held in replay memory
    pub memory_capacity: usize,
    /// Number of transitions sampled per optimization step
    pub batch_size: usize,
    /// Discount factor; (0 <= 𝛾 <= 1) represents the value of future rewards
    pub gamma: f32,
    /// Maximum epsilon greedy parameter
    pub epsilon_start: f64,
    /// Minimum epsilon greedy parameter
    pub epsilon_end: f64,
    /// Episode-indexed exponential decay constant
    pub epsilon_decay: f64,
    /// Completed episodes between target-network syncs
    pub target_update_frequency: usize,
    /// Lower bound of the accepted inter-state game-time window (ms).
    /// Below it the action's effect cannot be observable in the next sample.
    pub min_state_delta_ms: f64,
    /// Upper bound of the accepted window (ms); above it the game stalled
    pub max_state_delta_ms: f64,
    /// Pause between state polls while waiting for the next observable state
    pub poll_interval: Duration,
    /// Reward on the terminal transition
    pub crash_reward: f32,
    /// Reward for a step where the agent jumped.
    /// Deliberately non-positive to discourage gratuitous jumping.
    pub jump_reward: f32,
    /// Shaping reward for surviving a step without jumping
    pub tick_reward: f32,
    /// Episodes between stats log lines
    pub stats_after_episodes: usize,
}

impl Default for Parameter {
    fn default() -> Self {
        Self {
            episodes: 1_000,
            memory_capacity: 40_000,
            batch_size: 32,
            gamma: 0.9,
            epsilon_start: 1.0,
            epsilon_end: 0.01,
            epsilon_decay: 200.0,
            target_update_frequency: 10,
            min_state_delta_ms: 40.0,
            max_state_delta_ms: 60.0,
            poll_interval: Duration::from_millis(5),
            crash_reward: -1.0,
            jump_reward: 0.0,
            tick_reward: 0.1,
            stats_after_episodes: 25,
        }
    }
}

/// Mutable per-session learning state. Held as an explicit context passed
/// through the loop rather than as ambient globals, so parallel test harnesses
/// and checkpoint/restore stay clean.
#[derive(Debug, Clone)]
pub struct SessionContext {
    /// Completed episodes in this session
    pub episode: usize,
    /// Current exploration rate; mutated once per accepted transition
    pub epsilon: f64,
    /// Reward accumulated in the running episode
    pub episode_reward: f32,
}

/// Cooperative cancellation flag, checked between steps. Cancelling requests a
/// checkpoint-and-exit, never an abort mid-write.
#[derive(Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst)
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Whether an observed step makes it into replay memory.
#[derive(Debug, PartialEq, Eq)]
enum StepDisposition {
    Accept,
    /// Outside the accepted timing window. Early-arriving terminal states are
    /// expected, everything else deserves a warning.
    Discard { warn: bool },
}

fn step_disposition(
    delta_ms: f64,
    done: bool,
    param: &Parameter,
) -> StepDisposition {
    if delta_ms < param.min_state_delta_ms || delta_ms > param.max_state_delta_ms {
        StepDisposition::Discard { warn: !done }
    } else {
        StepDisposition::Accept
    }
}

fn decayed_epsilon(
    param: &Parameter,
    episode: usize,
) -> f64 {
    param.epsilon_end + (param.epsilon_start - param.epsilon_end) * (-(episode as f64) / param.epsilon_decay).exp()
}

/// Drives the training session episode by episode.
///
/// Single logical thread of control: environment calls, optimization steps and
/// checkpoint writes are sequenced, never concurrent. The optimization step is
/// deliberately run while the environment transitions to its next observable
/// state, so that compute fills otherwise idle wall-clock time.
pub struct Trainer<E: Environment, M: QModel> {
    environment: E,
    param: Parameter,
    online: M,
    target: M,
    memory: ReplayMemory,
    store: CheckpointStore,
    episode_log: EpisodeLog,
    session: SessionContext,
    rng: ThreadRng,
}

impl<E: Environment, M: QModel> Trainer<E, M> {
    /// Sets up a session, resuming both models from the checkpoint directory
    /// when checkpoints exist. A missing target checkpoint defaults from the
    /// main one, so a first run after an interrupt starts from aligned models.
    /// A corrupt or unreadable checkpoint is logged and skipped - the session
    /// starts on the freshly constructed model instead.
    pub fn new(
        environment: E,
        mut online: M,
        mut target: M,
        param: Parameter,
        storage_dir: &Path,
    ) -> Result<Self> {
        let store = CheckpointStore::new(storage_dir)?;

        let resumed_main = Self::try_load(&store, MAIN_NAMESPACE, &mut online);
        let resumed_target = Self::try_load(&store, TARGET_NAMESPACE, &mut target);
        if resumed_main && !resumed_target {
            target.set_weights(online.weights())?;
            log::info!("no '{TARGET_NAMESPACE}' checkpoint found, target model defaults from '{MAIN_NAMESPACE}'");
        }

        let episode_log = EpisodeLog::open(&storage_dir.join(EPISODE_LOG_FILE))?;
        let session = SessionContext {
            episode: 0,
            epsilon: param.epsilon_start,
            episode_reward: 0.0,
        };

        Ok(Self {
            environment,
            memory: ReplayMemory::new(param.memory_capacity),
            param,
            online,
            target,
            store,
            episode_log,
            session,
            rng: rand::thread_rng(),
        })
    }

    /// Loads a checkpoint into `model` if one exists, reporting whether it did.
    /// Losing a checkpoint is preferable to losing the session, so load
    /// failures degrade to a warning.
    fn try_load(
        store: &CheckpointStore,
        namespace: &str,
        model: &mut M,
    ) -> bool {
        match store.load(namespace, model) {
            Ok(true) => {
                log::info!("resumed model from '{namespace}' checkpoint");
                true
            }
            Ok(false) => false,
            Err(e) => {
                log::warn!("failed to load '{namespace}' checkpoint, continuing with a fresh model: {e}");
                false
            }
        }
    }

    pub fn session(&self) -> &SessionContext {
        &self.session
    }

    pub fn environment(&self) -> &E {
        &self.environment
    }

    pub fn memory(&self) -> &ReplayMemory {
        &self.memory
    }

    pub fn online_model(&self) -> &M {
        &self.online
    }

    pub fn target_model(&self) -> &M {
        &self.target
    }

    /// Runs up to [Parameter::episodes] episodes, or fewer when `cancel` fires.
    ///
    /// Both models are checkpointed on every exit path - normal completion,
    /// cancellation, or an environment failure - before the result is returned.
    pub fn train(
        &mut self,
        cancel: &CancelToken,
    ) -> Result<()> {
        let result = self.run_episodes(cancel);

        if let Err(e) = self.store.save(MAIN_NAMESPACE, &self.online) {
            log::error!("failed to persist online model: {e}");
        }
        if let Err(e) = self.store.save(TARGET_NAMESPACE, &self.target) {
            log::error!("failed to persist target model: {e}");
        }

        result
    }

    fn run_episodes(
        &mut self,
        cancel: &CancelToken,
    ) -> Result<()> {
        for _ in 0..self.param.episodes {
            if cancel.is_cancelled() {
                log::info!("cancellation requested, stopping after {} episodes", self.session.episode);
                break;
            }
            self.run_episode(cancel)?;

            if self.session.episode % self.param.stats_after_episodes == 0 {
                self.stats_log();
            }
        }
        Ok(())
    }

    /// One episode end-to-end: RESET, then step until the game reports done.
    ///
    /// A cancellation mid-episode abandons the episode after the in-flight
    /// step: no episode log line, no counter bump, no off-schedule sync.
    pub fn run_episode(
        &mut self,
        cancel: &CancelToken,
    ) -> Result<()> {
        self.environment.restart()?;
        let mut current = self.environment.state()?;
        self.session.episode_reward = 0.0;
        log::trace!("started episode {}", self.session.episode);

        let mut abandoned = false;
        while !current.done {
            if cancel.is_cancelled() {
                abandoned = true;
                break;
            }

            let features = encode(&current);
            let action = select_action(&self.online, &features, self.session.epsilon, &mut self.rng);
            self.environment.perform_action(action)?;

            // One optimization step overlaps the environment's transition time.
            // A failed step is logged and skipped; training continues.
            if self.memory.len() >= self.param.batch_size {
                match self.memory.sample(self.param.batch_size, &mut self.rng) {
                    Ok(batch) => match optimize(&mut self.online, &self.target, &batch, self.param.gamma) {
                        Ok(loss) => log::trace!("optimization step loss: {loss}"),
                        Err(e) => log::warn!("optimization step skipped: {e}"),
                    },
                    Err(e) => log::warn!("replay sampling failed despite guard: {e}"),
                }
            }

            let next = self.poll_next_state(&current)?;
            let delta_ms = next.timestamp - current.timestamp;

            match step_disposition(delta_ms, next.done, &self.param) {
                StepDisposition::Discard { warn } => {
                    if warn {
                        log::warn!(
                            "inter-state delta {:.1}ms outside accepted window [{:.0}ms, {:.0}ms], step discarded",
                            delta_ms,
                            self.param.min_state_delta_ms,
                            self.param.max_state_delta_ms
                        );
                    }
                }
                StepDisposition::Accept => {
                    let reward = self.step_reward(action, next.done);
                    self.session.episode_reward += reward;
                    self.memory.add(Transition {
                        state: features,
                        action,
                        reward,
                        next_state: encode(&next),
                        done: next.done,
                    });
                    self.session.epsilon = decayed_epsilon(&self.param, self.session.episode);
                }
            }

            current = next;
        }

        if abandoned {
            log::info!("episode {} abandoned on cancellation", self.session.episode);
        } else {
            self.finish_episode();
        }
        Ok(())
    }

    /// Polls until the game reports a terminal state or at least the minimum
    /// game-time has elapsed since `current`, so the dispatched action's effect
    /// is observable in the returned sample.
    fn poll_next_state(
        &mut self,
        current: &RunnerState,
    ) -> Result<RunnerState, EnvironmentError> {
        loop {
            let next = self.environment.state()?;
            if next.done || next.timestamp - current.timestamp >= self.param.min_state_delta_ms {
                return Ok(next);
            }
            thread::sleep(self.param.poll_interval);
        }
    }

    fn step_reward(
        &self,
        action: RunnerAction,
        done: bool,
    ) -> f32 {
        if done {
            self.param.crash_reward
        } else if action == RunnerAction::Jump {
            self.param.jump_reward
        } else {
            self.param.tick_reward
        }
    }

    fn finish_episode(&mut self) {
        if let Err(e) = self
            .episode_log
            .append(self.session.episode, self.session.epsilon, self.session.episode_reward)
        {
            log::warn!("episode log write failed: {e}");
        }
        log::info!(
            "Episode: {}, Epsilon: {:.3}, Total Reward: {:.2}",
            self.session.episode,
            self.session.epsilon,
            self.session.episode_reward
        );

        self.session.episode += 1;
        self.session.episode_reward = 0.0;

        if self.session.episode % self.param.target_update_frequency == 0 {
            if let Err(e) = sync(&self.online, &mut self.target, &self.store) {
                log::warn!("target sync checkpointing failed: {e}");
            }
        }
    }

    fn stats_log(&self) {
        if self.memory.is_empty() {
            return;
        }

        let mut action_counts = FxHashMap::<RunnerAction, usize>::default();
        for transition in self.memory.transitions() {
            *action_counts.entry(transition.action).or_insert(0) += 1;
        }
        let total = self.memory.len();
        let action_distribution = action_counts
            .iter()
            .map(|(action, count)| format!("{} {:.1}%", action, 100.0 * *count as f32 / total as f32))
            .join(", ");

        log::info!(
            "episode: {}, 𝛾={:.2}, 𝜀={:.3}, replay memory: {}, action_distribution: {}",
            self.session.episode.to_formatted_string(&Locale::en),
            self.param.gamma,
            self.session.epsilon,
            total.to_formatted_string(&Locale::en),
            action_distribution
        );
    }
}
