//! Training data staged for trainers.
use crate::Transition;
use anyhow::{bail, Result};
use gymrun_core::ModelType;
use ndarray::{Array1, Array2};
use std::{cell::RefCell, rc::Rc};

/// Minibatch staged by
/// [`Env::sample_and_load_training_data`](gymrun_core::Env::sample_and_load_training_data).
///
/// Rows are transitions. States are normalized. Actions are one-hot for
/// [`ModelType::DiscreteAction`] and action features for
/// [`ModelType::ParametricAction`].
#[derive(Debug, Clone, PartialEq)]
pub struct TrainingBatch {
    /// Model type the batch was built for.
    pub model_type: ModelType,

    /// If `true`, targets use the maximum over possible next actions, otherwise the
    /// next action taken.
    pub maxq_learning: bool,

    /// States.
    pub states: Array2<f32>,

    /// Actions taken.
    pub actions: Array2<f32>,

    /// Rewards.
    pub rewards: Array1<f32>,

    /// Next states.
    pub next_states: Array2<f32>,

    /// Actions taken in the next states.
    pub next_actions: Array2<f32>,

    /// Mask of the discrete actions possible in the next states.
    pub possible_next_actions: Array2<f32>,

    /// `0` for terminal transitions, `1` otherwise.
    pub not_terminals: Array1<f32>,
}

fn stack<F>(transitions: &[Transition], f: F) -> Result<Array2<f32>>
where
    F: Fn(&Transition) -> Vec<f32>,
{
    let rows: Vec<Vec<f32>> = transitions.iter().map(&f).collect();
    let n = rows.len();
    let d = rows.first().map_or(0, |r| r.len());
    if rows.iter().any(|r| r.len() != d) {
        bail!("Rows of a training batch must have the same length");
    }
    Ok(Array2::from_shape_vec((n, d), rows.concat())?)
}

impl TrainingBatch {
    /// Builds a batch from transitions.
    ///
    /// `state_features` and `action_features` map raw states and stored actions to
    /// the features trainers consume.
    pub fn from_transitions(
        transitions: &[Transition],
        model_type: ModelType,
        maxq_learning: bool,
        state_features: impl Fn(&[f32]) -> Vec<f32>,
        action_features: impl Fn(&[f32]) -> Vec<f32>,
    ) -> Result<Self> {
        Ok(Self {
            model_type,
            maxq_learning,
            states: stack(transitions, |t| state_features(&t.state))?,
            actions: stack(transitions, |t| action_features(&t.action))?,
            rewards: transitions.iter().map(|t| t.reward).collect(),
            next_states: stack(transitions, |t| state_features(&t.next_state))?,
            next_actions: stack(transitions, |t| action_features(&t.next_action))?,
            possible_next_actions: stack(transitions, |t| t.possible_next_actions.clone())?,
            not_terminals: transitions
                .iter()
                .map(|t| if t.terminal { 0.0 } else { 1.0 })
                .collect(),
        })
    }

    /// The number of transitions.
    pub fn len(&self) -> usize {
        self.rewards.len()
    }

    /// Returns `true` if the batch has no transition.
    pub fn is_empty(&self) -> bool {
        self.rewards.is_empty()
    }
}

/// Slot shared by an environment and a trainer.
///
/// The environment stages a minibatch; the trainer takes it in its next
/// optimization step.
#[derive(Debug, Clone, Default)]
pub struct TrainingDataSlot(Rc<RefCell<Option<TrainingBatch>>>);

impl TrainingDataSlot {
    /// Stages a batch, replacing the one not taken yet.
    pub fn stage(&self, batch: TrainingBatch) {
        *self.0.borrow_mut() = Some(batch);
    }

    /// Takes the staged batch.
    pub fn take(&self) -> Option<TrainingBatch> {
        self.0.borrow_mut().take()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn transition(terminal: bool) -> Transition {
        Transition {
            state: vec![2.0, 4.0],
            action: vec![0.0, 1.0],
            reward: 1.0,
            next_state: vec![4.0, 6.0],
            next_action: if terminal { vec![0.0, 0.0] } else { vec![1.0, 0.0] },
            possible_next_actions: if terminal { vec![0.0, 0.0] } else { vec![1.0, 1.0] },
            terminal,
        }
    }

    #[test]
    fn test_from_transitions() -> Result<()> {
        let batch = TrainingBatch::from_transitions(
            &[transition(false), transition(true)],
            ModelType::DiscreteAction,
            true,
            |s| s.iter().map(|v| v / 2.0).collect(),
            |a| a.to_vec(),
        )?;
        assert_eq!(batch.len(), 2);
        assert_eq!(batch.states.row(0).to_vec(), vec![1.0, 2.0]);
        assert_eq!(batch.next_states.row(1).to_vec(), vec![2.0, 3.0]);
        assert_eq!(batch.not_terminals.to_vec(), vec![1.0, 0.0]);
        assert_eq!(batch.possible_next_actions.row(1).to_vec(), vec![0.0, 0.0]);
        Ok(())
    }

    #[test]
    fn test_slot_is_shared() -> Result<()> {
        let slot = TrainingDataSlot::default();
        let other = slot.clone();
        let batch = TrainingBatch::from_transitions(
            &[transition(false)],
            ModelType::ParametricAction,
            false,
            |s| s.to_vec(),
            |a| a.to_vec(),
        )?;
        slot.stage(batch.clone());
        assert_eq!(other.take(), Some(batch));
        assert_eq!(slot.take(), None);
        Ok(())
    }
}
