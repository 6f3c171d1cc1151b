//! Predictors consumed by [`ClassicEnv`](super::ClassicEnv).
use anyhow::Result;
use gymrun_core::error::GymRunError;
use std::rc::Rc;

/// Selects actions for the environment.
///
/// A trainer implements the methods of its model type; the others return
/// [`GymRunError::Unsupported`]. Discrete and parametric predictors receive normalized
/// state features, continuous ones receive raw observations.
pub trait Predict {
    /// Values of the discrete actions in a state.
    #[allow(unused_variables)]
    fn q_values(&self, state: &[f32]) -> Result<Vec<f32>> {
        Err(GymRunError::Unsupported("q_values".to_string()).into())
    }

    /// Value of a state-action pair, the action given as features.
    #[allow(unused_variables)]
    fn q_value(&self, state: &[f32], action: &[f32]) -> Result<f32> {
        Err(GymRunError::Unsupported("q_value".to_string()).into())
    }

    /// Continuous action of the policy.
    #[allow(unused_variables)]
    fn action(&self, obs: &[f32]) -> Result<Vec<f32>> {
        Err(GymRunError::Unsupported("action".to_string()).into())
    }
}

/// Shared handle of a predictor.
pub type Predictor = Rc<dyn Predict>;
