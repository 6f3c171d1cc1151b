use super::{
    fit_layers, CnnParameters, DdpgModelParameters, KnnParameters, RlParameters,
    TrainingParameters,
};
use crate::{
    error::GymRunError,
    normalization::{num_output_features, overlapping_features, NormalizationTable},
    ModelType,
};
use anyhow::Result;
use serde::{Deserialize, Serialize};

/// Parameters of discrete-action trainers.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize, Default)]
pub struct DiscreteActionModelParameters {
    /// Names of the actions; the Q-network has one output per action.
    pub actions: Vec<String>,

    /// RL parameters.
    pub rl: RlParameters,

    /// Training parameters.
    pub training: TrainingParameters,
}

impl DiscreteActionModelParameters {
    /// Fits the layers to the state features and the actions.
    pub fn fit_to_features(&mut self, state_normalization: &NormalizationTable) -> Result<()> {
        fit_layers(
            &mut self.training.layers,
            num_output_features(state_normalization),
            self.actions.len(),
        )
    }
}

/// Parameters of image-based discrete-action trainers.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct DiscreteActionConvModelParameters {
    /// Parameters of the fully connected part.
    pub fc_parameters: DiscreteActionModelParameters,

    /// Parameters of the convolutional part.
    pub cnn_parameters: CnnParameters,

    /// Channels of the input image.
    pub num_input_channels: usize,

    /// Height of the input image.
    pub img_height: usize,

    /// Width of the input image.
    pub img_width: usize,
}

impl DiscreteActionConvModelParameters {
    /// Checks the CNN shape and sets its input channels to those of the image.
    pub fn fit_to_image(&mut self) -> Result<()> {
        self.cnn_parameters.validate()?;
        self.cnn_parameters.conv_dims[0] = self.num_input_channels;
        Ok(())
    }
}

/// Parameters of parametric-action (state-action Q-network) trainers.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize, Default)]
pub struct ContinuousActionModelParameters {
    /// RL parameters.
    pub rl: RlParameters,

    /// Training parameters.
    pub training: TrainingParameters,

    /// Nearest-neighbor parameters.
    pub knn: KnnParameters,
}

impl ContinuousActionModelParameters {
    /// Fits the layers to concatenated state and action features.
    ///
    /// Fails if a feature id appears in both tables.
    pub fn fit_to_features(
        &mut self,
        state_normalization: &NormalizationTable,
        action_normalization: &NormalizationTable,
    ) -> Result<()> {
        let overlapping = overlapping_features(state_normalization, action_normalization);
        if !overlapping.is_empty() {
            return Err(GymRunError::OverlappingFeatures(overlapping).into());
        }
        let num_features =
            num_output_features(state_normalization) + num_output_features(action_normalization);
        fit_layers(&mut self.training.layers, num_features, 1)
    }
}

/// Fully parameterized configuration of one trainer variant.
///
/// Exactly one is built per run.
#[derive(Debug, Clone, PartialEq)]
pub enum TrainerConfig {
    /// Discrete actions on vector observations.
    DiscreteAction(DiscreteActionModelParameters),

    /// Discrete actions on image observations.
    DiscreteActionConv(DiscreteActionConvModelParameters),

    /// Actions described by features.
    ParametricAction(ContinuousActionModelParameters),

    /// Continuous actions with an actor and a critic.
    ContinuousAction(DdpgModelParameters),
}

impl TrainerConfig {
    /// The model type this configuration belongs to.
    pub fn model_type(&self) -> ModelType {
        match self {
            Self::DiscreteAction(_) | Self::DiscreteActionConv(_) => ModelType::DiscreteAction,
            Self::ParametricAction(_) => ModelType::ParametricAction,
            Self::ContinuousAction(_) => ModelType::ContinuousAction,
        }
    }

    /// RL parameters of the configuration.
    pub fn rl(&self) -> &RlParameters {
        match self {
            Self::DiscreteAction(p) => &p.rl,
            Self::DiscreteActionConv(p) => &p.fc_parameters.rl,
            Self::ParametricAction(p) => &p.rl,
            Self::ContinuousAction(p) => &p.rl,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::normalization::NormalizationParameters;

    fn state_table() -> NormalizationTable {
        (0..4)
            .map(|i| (i, NormalizationParameters::continuous(0.0, 1.0)))
            .collect()
    }

    #[test]
    fn test_discrete_fit_to_features() -> Result<()> {
        let mut p = DiscreteActionModelParameters {
            actions: vec!["0".into(), "1".into()],
            ..Default::default()
        };
        p.fit_to_features(&state_table())?;
        assert_eq!(p.training.layers, vec![4, 512, 256, 128, 2]);
        Ok(())
    }

    #[test]
    fn test_parametric_fit_to_features() -> Result<()> {
        let mut action_table = NormalizationTable::new();
        action_table.insert(10, NormalizationParameters::enumeration(vec![0, 1, 2]));

        let mut p = ContinuousActionModelParameters::default();
        p.training.layers = vec![-1, 16, -1];
        p.fit_to_features(&state_table(), &action_table)?;
        assert_eq!(p.training.layers, vec![7, 16, 1]);
        Ok(())
    }

    #[test]
    fn test_parametric_rejects_overlapping_features() {
        let mut action_table = NormalizationTable::new();
        action_table.insert(3, NormalizationParameters::binary());

        let mut p = ContinuousActionModelParameters::default();
        let err = p.fit_to_features(&state_table(), &action_table).unwrap_err();
        assert_eq!(
            err.downcast_ref::<GymRunError>(),
            Some(&GymRunError::OverlappingFeatures(vec![3]))
        );
    }

    #[test]
    fn test_conv_fit_to_image() -> Result<()> {
        let mut p = DiscreteActionConvModelParameters {
            fc_parameters: Default::default(),
            cnn_parameters: Default::default(),
            num_input_channels: 3,
            img_height: 84,
            img_width: 84,
        };
        p.fit_to_image()?;
        assert_eq!(p.cnn_parameters.conv_dims[0], 3);
        Ok(())
    }
}
