//! Environment.
use super::ModelType;
use crate::normalization::NormalizationTable;
use anyhow::Result;

/// Represents an environment the loop driver interacts with.
///
/// An environment runs whole episodes with a predictor and owns the replay memory
/// of the transitions collected in non-test episodes. Two ways of handing those
/// transitions to trainers exist, see [`Env::sample_memories`] and
/// [`Env::sample_and_load_training_data`].
pub trait Env {
    /// Handle of the model used to select actions.
    ///
    /// It is obtained from [`Trainer::predictor`](super::Trainer::predictor) once per
    /// run and reflects the updates made by the trainer.
    type Predictor;

    /// Batch of transitions returned by [`Env::sample_memories`].
    type Memories;

    /// Runs an episode and returns its cumulative reward.
    ///
    /// `test == true` disables exploration. The episode stops after `max_steps` steps
    /// if given.
    fn run_episode(
        &mut self,
        model_type: ModelType,
        predictor: &Self::Predictor,
        max_steps: Option<usize>,
        test: bool,
        render: bool,
    ) -> Result<f32>;

    /// Samples transitions from the replay memory and returns them.
    ///
    /// Used for [`ModelType::ContinuousAction`] only.
    fn sample_memories(&mut self, batch_size: usize) -> Result<Self::Memories>;

    /// Samples transitions from the replay memory and stages them for the trainer.
    ///
    /// Used for every model type except [`ModelType::ContinuousAction`]. The trainer
    /// reads the staged data in [`Trainer::train`](super::Trainer::train).
    fn sample_and_load_training_data(
        &mut self,
        batch_size: usize,
        model_type: ModelType,
        maxq_learning: bool,
    ) -> Result<()>;
}

/// Bounds of a continuous action space.
#[derive(Debug, Clone, PartialEq)]
pub struct ActionSpace {
    /// Lower bounds.
    pub low: Vec<f32>,

    /// Upper bounds.
    pub high: Vec<f32>,
}

/// Static geometry and normalization metadata of an environment.
pub trait EnvGeometry {
    /// Names of the discrete actions.
    fn actions(&self) -> Vec<String>;

    /// Normalization of state features.
    fn normalization(&self) -> &NormalizationTable;

    /// Normalization of action features.
    fn normalization_action(&self) -> &NormalizationTable;

    /// `true` if observations are images.
    fn img(&self) -> bool;

    /// Number of channels of image observations.
    fn num_input_channels(&self) -> usize;

    /// Height of image observations.
    fn height(&self) -> usize;

    /// Width of image observations.
    fn width(&self) -> usize;

    /// Dimension of the state.
    fn state_dim(&self) -> usize;

    /// Dimension of continuous actions.
    fn action_dim(&self) -> usize;

    /// Bounds of continuous actions.
    fn action_space(&self) -> ActionSpace;
}
