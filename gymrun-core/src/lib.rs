#![warn(missing_docs)]
//! Core of gymrun: the episodic training loop and the interfaces it drives.
//!
//! * [`Env`] runs episodes with a predictor and produces training data.
//! * [`Trainer`] owns a model, hands out its predictor and learns from the data.
//! * [`Runner`] interleaves rollouts, training and evaluation according to a
//!   [`RunSchedule`] and returns the averaged reward history.
//! * [`params`] holds the hyperparameter schemas of the trainer variants.
pub mod dummy;
pub mod error;
pub mod normalization;
pub mod params;

mod base;
pub use base::{
    ActionSpace, DevicePlacement, Env, EnvDetails, EnvGeometry, ModelType, RewardHistory,
    Trainer,
};

mod evaluator;
pub use evaluator::{round2, Evaluator};

mod runner;
pub use runner::{RunSchedule, Runner};
