//! Simulated control tasks.
mod cartpole;
mod pendulum;
use anyhow::Result;
pub use cartpole::CartPole;
use gymrun_core::{error::GymRunError, normalization::NormalizationTable, ActionSpace};
pub use pendulum::Pendulum;
use rand::rngs::SmallRng;

/// Action applied to a task.
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    /// Index of a discrete action.
    Discrete(usize),

    /// Continuous action.
    Continuous(Vec<f32>),
}

/// Outcome of a step.
#[derive(Debug, Clone, PartialEq)]
pub struct StepOutcome {
    /// Observation after the step.
    pub obs: Vec<f32>,

    /// Reward of the step.
    pub reward: f32,

    /// `true` if the task reached a terminal state.
    pub terminal: bool,
}

/// Physics and metadata of a control task.
pub trait Dynamics {
    /// Id of the task.
    fn name(&self) -> &'static str;

    /// Names of the discrete actions, empty for continuous tasks.
    fn actions(&self) -> Vec<String>;

    /// Normalization of the observation.
    fn state_normalization(&self) -> NormalizationTable;

    /// Normalization of the action features.
    fn action_normalization(&self) -> NormalizationTable;

    /// Bounds of continuous actions, empty for discrete tasks.
    fn action_space(&self) -> ActionSpace;

    /// Dimension of the observation.
    fn state_dim(&self) -> usize;

    /// The number of steps after which an episode is cut.
    fn time_limit(&self) -> usize {
        200
    }

    /// Samples an initial state and returns its observation.
    fn reset(&mut self, rng: &mut SmallRng) -> Vec<f32>;

    /// Applies an action.
    fn step(&mut self, action: &Action) -> Result<StepOutcome>;

    /// Text describing the current state.
    fn render(&self) -> String;
}

/// Builds the task registered under `name`.
pub fn make(name: &str) -> Result<Box<dyn Dynamics>> {
    match name {
        "CartPole-v0" => Ok(Box::new(CartPole::default())),
        "Pendulum-v0" => Ok(Box::new(Pendulum::default())),
        _ => Err(GymRunError::UnknownEnv(name.to_string()).into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_make() {
        assert_eq!(make("CartPole-v0").map(|d| d.name()).ok(), Some("CartPole-v0"));
        assert_eq!(make("Pendulum-v0").map(|d| d.name()).ok(), Some("Pendulum-v0"));
        let err = make("MountainCar-v0").err().map(|e| e.to_string());
        assert_eq!(err, Some("Unknown environment: MountainCar-v0".to_string()));
    }
}
