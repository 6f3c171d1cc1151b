//! Configuration-driven training and evaluation of reinforcement learning agents.
//!
//! A parameter file names an environment, a model type and the hyperparameters of
//! the trainer. [`dispatch`] selects the trainer variant, builds it with a
//! [`Backend`] and runs the loop of [`gymrun_core::Runner`].
//!
//! ```ignore
//! let params = load_params("configs/cartpole_discrete.json")?;
//! let history = dispatch(&mut ReferenceBackend::default(), params, Some(195.0), DevicePlacement::Cpu)?;
//! ```
mod backend;
pub mod config;
mod dispatch;
pub use backend::{Backend, BoxedTrainer, ReferenceBackend};
pub use config::load_params;
pub use dispatch::{build_trainer, dispatch, trainer_config};
