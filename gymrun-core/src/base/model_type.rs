//! Model type tag.
use crate::error::GymRunError;
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

/// Selects the trainer variant and the way the loop feeds it with training data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
pub enum ModelType {
    /// Q-learning over a fixed, enumerable set of actions.
    #[serde(rename = "discrete")]
    DiscreteAction,

    /// Q-learning where actions are described by feature vectors.
    #[serde(rename = "parametric")]
    ParametricAction,

    /// Actor-critic (DDPG-style) learning over continuous actions.
    #[serde(rename = "continuous")]
    ContinuousAction,
}

impl ModelType {
    /// Tag used in configuration files.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::DiscreteAction => "discrete",
            Self::ParametricAction => "parametric",
            Self::ContinuousAction => "continuous",
        }
    }
}

impl fmt::Display for ModelType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ModelType {
    type Err = GymRunError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "discrete" => Ok(Self::DiscreteAction),
            "parametric" => Ok(Self::ParametricAction),
            "continuous" => Ok(Self::ContinuousAction),
            _ => Err(GymRunError::UnsupportedModelType(s.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_tags() {
        assert_eq!("discrete".parse(), Ok(ModelType::DiscreteAction));
        assert_eq!("parametric".parse(), Ok(ModelType::ParametricAction));
        assert_eq!("continuous".parse(), Ok(ModelType::ContinuousAction));
        assert_eq!(
            "quantum".parse::<ModelType>(),
            Err(GymRunError::UnsupportedModelType("quantum".to_string()))
        );
    }

    #[test]
    fn test_serde_matches_display() {
        for t in [
            ModelType::DiscreteAction,
            ModelType::ParametricAction,
            ModelType::ContinuousAction,
        ] {
            let json = serde_json::to_string(&t).unwrap();
            assert_eq!(json, format!("\"{}\"", t));
        }
    }
}
