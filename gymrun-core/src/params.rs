//! Hyperparameter schemas of trainers.
//!
//! Every struct deserializes from a bundle of a parameter file. Absent fields take
//! their defaults and unknown fields are rejected.
mod cnn;
mod ddpg;
mod knn;
mod model;
mod rl;
mod training;
pub use cnn::CnnParameters;
pub use ddpg::{DdpgModelParameters, DdpgNetworkParameters, DdpgTrainingParameters};
pub use knn::KnnParameters;
pub use model::{
    ContinuousActionModelParameters, DiscreteActionConvModelParameters,
    DiscreteActionModelParameters, TrainerConfig,
};
pub use rl::RlParameters;
pub use training::TrainingParameters;

use crate::error::GymRunError;
use anyhow::Result;

/// Sets the first and the last entries of a layer list.
///
/// `-1` entries in parameter files are placeholders filled here with the
/// dimensions of the environment.
pub(crate) fn fit_layers(layers: &mut [i64], in_dim: usize, out_dim: usize) -> Result<()> {
    if layers.len() < 2 {
        return Err(GymRunError::InvalidConfig(format!(
            "layers must have at least two entries, got {:?}",
            layers
        ))
        .into());
    }
    let n = layers.len();
    layers[0] = in_dim as i64;
    layers[n - 1] = out_dim as i64;
    Ok(())
}
