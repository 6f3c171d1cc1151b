//! Construction of environments and trainers.
use anyhow::{anyhow, Result};
use gymrun_classic_env::{ClassicEnv, ClassicEnvConfig, TrainingDataSlot};
use gymrun_core::{
    error::GymRunError,
    normalization::NormalizationTable,
    params::{
        ContinuousActionModelParameters, DdpgModelParameters, DiscreteActionConvModelParameters,
        DiscreteActionModelParameters,
    },
    DevicePlacement, Env, EnvDetails, EnvGeometry, Trainer,
};
use gymrun_linear_agent::{DdpgTrainer, DiscreteActionTrainer, ParametricActionTrainer};

/// Boxed trainer on environment `E`.
pub type BoxedTrainer<E> = Box<dyn Trainer<E>>;

/// Builds the environment and the trainer of a run.
///
/// [`dispatch`](crate::dispatch) calls [`Backend::build_env`] once, then exactly one
/// of the trainer constructors.
pub trait Backend {
    /// Environment of the backend.
    type Env: Env + EnvGeometry;

    /// Builds the environment registered under `env_id`.
    fn build_env(&mut self, env_id: &str, epsilon: f64) -> Result<Self::Env>;

    /// Builds a trainer with one Q-value output per discrete action.
    fn discrete_action_trainer(
        &mut self,
        params: DiscreteActionModelParameters,
        state_normalization: &NormalizationTable,
        device: DevicePlacement,
    ) -> Result<BoxedTrainer<Self::Env>>;

    /// Builds a discrete-action trainer on image observations.
    fn discrete_action_conv_trainer(
        &mut self,
        params: DiscreteActionConvModelParameters,
        state_normalization: &NormalizationTable,
        device: DevicePlacement,
    ) -> Result<BoxedTrainer<Self::Env>>;

    /// Builds a trainer of a Q-function over state and action features.
    fn parametric_action_trainer(
        &mut self,
        params: ContinuousActionModelParameters,
        state_normalization: &NormalizationTable,
        action_normalization: &NormalizationTable,
        device: DevicePlacement,
    ) -> Result<BoxedTrainer<Self::Env>>;

    /// Builds an actor-critic trainer.
    fn ddpg_trainer(
        &mut self,
        params: DdpgModelParameters,
        env_details: EnvDetails,
    ) -> Result<BoxedTrainer<Self::Env>>;
}

/// Backend of [`ClassicEnv`] and the linear trainers.
///
/// Trainers reading staged training data are connected to the slot of the last
/// environment built.
pub struct ReferenceBackend {
    seed: u64,
    max_replay_memory_size: usize,
    slot: Option<TrainingDataSlot>,
}

impl Default for ReferenceBackend {
    fn default() -> Self {
        Self {
            seed: 42,
            max_replay_memory_size: 10000,
            slot: None,
        }
    }
}

impl ReferenceBackend {
    /// Sets the random seed of environments.
    pub fn seed(mut self, v: u64) -> Self {
        self.seed = v;
        self
    }

    /// Sets the capacity of replay memories.
    pub fn max_replay_memory_size(mut self, v: usize) -> Self {
        self.max_replay_memory_size = v;
        self
    }

    fn slot(&self) -> Result<TrainingDataSlot> {
        self.slot
            .clone()
            .ok_or_else(|| anyhow!("Trainers need an environment built beforehand"))
    }
}

impl Backend for ReferenceBackend {
    type Env = ClassicEnv;

    fn build_env(&mut self, env_id: &str, epsilon: f64) -> Result<ClassicEnv> {
        let config = ClassicEnvConfig::default()
            .name(env_id)
            .epsilon(epsilon)
            .seed(self.seed)
            .max_replay_memory_size(self.max_replay_memory_size);
        let env = ClassicEnv::build(&config)?;
        self.slot = Some(env.training_data_slot());
        Ok(env)
    }

    fn discrete_action_trainer(
        &mut self,
        params: DiscreteActionModelParameters,
        state_normalization: &NormalizationTable,
        device: DevicePlacement,
    ) -> Result<BoxedTrainer<Self::Env>> {
        let trainer =
            DiscreteActionTrainer::build(params, state_normalization, self.slot()?, device)?;
        Ok(Box::new(trainer))
    }

    fn discrete_action_conv_trainer(
        &mut self,
        _params: DiscreteActionConvModelParameters,
        _state_normalization: &NormalizationTable,
        _device: DevicePlacement,
    ) -> Result<BoxedTrainer<Self::Env>> {
        Err(GymRunError::Unsupported("discrete-action trainers on images".to_string()).into())
    }

    fn parametric_action_trainer(
        &mut self,
        params: ContinuousActionModelParameters,
        state_normalization: &NormalizationTable,
        action_normalization: &NormalizationTable,
        device: DevicePlacement,
    ) -> Result<BoxedTrainer<Self::Env>> {
        let trainer = ParametricActionTrainer::build(
            params,
            state_normalization,
            action_normalization,
            self.slot()?,
            device,
        )?;
        Ok(Box::new(trainer))
    }

    fn ddpg_trainer(
        &mut self,
        params: DdpgModelParameters,
        env_details: EnvDetails,
    ) -> Result<BoxedTrainer<Self::Env>> {
        Ok(Box::new(DdpgTrainer::build(params, env_details)?))
    }
}
