//! Errors in the library.
use thiserror::Error;

/// Errors in the library.
///
/// Functions in this workspace return [`anyhow::Result`]; values of this type are
/// raised with `bail!` or `?` and can be recovered with `downcast_ref`.
#[derive(Error, Debug, PartialEq)]
pub enum GymRunError {
    /// The `model_type` of a configuration is not one of the known tags.
    #[error("Model of type {0} not supported")]
    UnsupportedModelType(String),

    /// A required bundle is absent from the configuration.
    #[error("Missing configuration bundle: {0}")]
    MissingBundle(String),

    /// A required field is absent from a configuration bundle.
    #[error("Missing field {field} in configuration bundle {bundle}")]
    MissingField {
        /// Name of the bundle.
        bundle: String,

        /// Name of the missing field.
        field: String,
    },

    /// A configuration value has the wrong shape or an invalid value.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// A run schedule that can not drive the loop.
    #[error("Invalid run schedule: {0}")]
    InvalidSchedule(String),

    /// State and action normalization tables share feature ids.
    #[error("There are some overlapping state and action features: {0:?}")]
    OverlappingFeatures(Vec<usize>),

    /// A trainer was asked to train on input it does not consume.
    #[error("Trainer {trainer} does not accept {input}")]
    TrainInputMismatch {
        /// Name of the trainer.
        trainer: String,

        /// Kind of the input given to the trainer.
        input: String,
    },

    /// No environment is registered under the given id.
    #[error("Unknown environment: {0}")]
    UnknownEnv(String),

    /// The backend can not build the requested object.
    #[error("Not supported by the backend: {0}")]
    Unsupported(String),
}
