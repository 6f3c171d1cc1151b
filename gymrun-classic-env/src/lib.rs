//! Classic control environments for gymrun.
//!
//! [`ClassicEnv`] implements [`gymrun_core::Env`] on simulated tasks registered by
//! id (`CartPole-v0`, `Pendulum-v0`). It keeps the transitions of rollout episodes
//! in a [`ReplayMemory`] and hands them to trainers either as sampled memories or
//! as a [`TrainingBatch`] staged in a [`TrainingDataSlot`].
mod config;
pub mod dynamics;
mod env;
mod memory;
mod predictor;
mod training_data;
pub use config::ClassicEnvConfig;
pub use env::ClassicEnv;
pub use memory::{ReplayMemory, Transition};
pub use predictor::{Predict, Predictor};
pub use training_data::{TrainingBatch, TrainingDataSlot};
