//! Trainer.
use super::Env;
use crate::error::GymRunError;
use anyhow::Result;

/// Represents a trainable model on an environment.
///
/// Trainers take training data in one of two shapes. Actor-critic trainers receive
/// memories sampled by the loop driver in [`Trainer::train_on_memories`]; all other
/// trainers read data the environment staged for them in [`Trainer::train`].
/// A trainer implements the method matching its input and leaves the other one
/// returning [`GymRunError::TrainInputMismatch`].
pub trait Trainer<E: Env> {
    /// Name of the trainer, used in logs and errors.
    fn name(&self) -> &str;

    /// Returns the handle used to select actions.
    ///
    /// The handle shares the model with the trainer: updates made by later calls of
    /// the training methods are visible through it.
    fn predictor(&self) -> E::Predictor;

    /// Performs an optimization step on the data staged by
    /// [`Env::sample_and_load_training_data`].
    fn train(&mut self) -> Result<()> {
        Err(GymRunError::TrainInputMismatch {
            trainer: self.name().to_string(),
            input: "staged training data".to_string(),
        }
        .into())
    }

    /// Performs an optimization step on memories returned by [`Env::sample_memories`].
    #[allow(unused_variables)]
    fn train_on_memories(&mut self, predictor: &E::Predictor, memories: E::Memories) -> Result<()> {
        Err(GymRunError::TrainInputMismatch {
            trainer: self.name().to_string(),
            input: "sampled memories".to_string(),
        }
        .into())
    }

    /// Number of transitions in a minibatch.
    fn minibatch_size(&self) -> usize;

    /// If `true`, targets use the maximum action value over possible next actions.
    fn maxq_learning(&self) -> bool;
}

impl<E: Env, T: Trainer<E> + ?Sized> Trainer<E> for Box<T> {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn predictor(&self) -> E::Predictor {
        (**self).predictor()
    }

    fn train(&mut self) -> Result<()> {
        (**self).train()
    }

    fn train_on_memories(&mut self, predictor: &E::Predictor, memories: E::Memories) -> Result<()> {
        (**self).train_on_memories(predictor, memories)
    }

    fn minibatch_size(&self) -> usize {
        (**self).minibatch_size()
    }

    fn maxq_learning(&self) -> bool {
        (**self).maxq_learning()
    }
}
