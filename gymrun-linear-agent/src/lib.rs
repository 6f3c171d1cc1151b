//! Linear reference trainers for gymrun.
//!
//! The trainers run on [`ClassicEnv`](gymrun_classic_env::ClassicEnv) and keep
//! their models in [`ndarray`] arrays on the host:
//!
//! * [`DiscreteActionTrainer`] for [`ModelType::DiscreteAction`](gymrun_core::ModelType),
//! * [`ParametricActionTrainer`] for [`ModelType::ParametricAction`](gymrun_core::ModelType),
//! * [`DdpgTrainer`] for [`ModelType::ContinuousAction`](gymrun_core::ModelType).
mod ddpg;
mod discrete;
mod lr;
pub mod model;
mod parametric;
pub use ddpg::DdpgTrainer;
pub use discrete::DiscreteActionTrainer;
pub use lr::{LrPolicy, LrSchedule};
pub use parametric::ParametricActionTrainer;

use gymrun_core::DevicePlacement;
use log::warn;

/// Seed of weight initialization.
const SEED: u64 = 42;

/// Scale of the initial weights of Q-functions.
const Q_INIT_SCALE: f32 = 0.1;

fn check_device(device: DevicePlacement) {
    if !device.is_cpu() {
        warn!("Linear trainers run on the host, ignoring {:?}", device);
    }
}
