use super::EnvGeometry;
use serde::{Deserialize, Serialize};

/// Geometry of an environment consumed by actor-critic trainers.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct EnvDetails {
    /// Dimension of the state.
    pub state_dim: usize,

    /// Dimension of the action.
    pub action_dim: usize,

    /// Lower and upper bounds of the action.
    pub action_range: (Vec<f32>, Vec<f32>),
}

impl EnvDetails {
    /// Reads the geometry of the given environment.
    pub fn from_env<E: EnvGeometry + ?Sized>(env: &E) -> Self {
        let space = env.action_space();
        Self {
            state_dim: env.state_dim(),
            action_dim: env.action_dim(),
            action_range: (space.low, space.high),
        }
    }

    /// Lower bounds of the action.
    pub fn action_low(&self) -> &[f32] {
        &self.action_range.0
    }

    /// Upper bounds of the action.
    pub fn action_high(&self) -> &[f32] {
        &self.action_range.1
    }
}
