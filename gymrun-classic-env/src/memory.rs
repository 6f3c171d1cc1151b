//! Replay memory.
use anyhow::{bail, Result};
use rand::{rngs::SmallRng, seq::index, SeedableRng};

/// Transition collected in a rollout episode.
///
/// States are raw observations. Actions are stored as feature vectors: one-hot
/// over the actions for discrete environments, the action itself for continuous
/// ones.
#[derive(Debug, Clone, PartialEq)]
pub struct Transition {
    /// Observation before the action.
    pub state: Vec<f32>,

    /// Action taken.
    pub action: Vec<f32>,

    /// Reward of the step.
    pub reward: f32,

    /// Observation after the action.
    pub next_state: Vec<f32>,

    /// Action taken at the next step, zeros after the last step of an episode.
    pub next_action: Vec<f32>,

    /// Mask of the actions possible in the next state, all zeros at terminal steps.
    /// Empty for continuous environments.
    pub possible_next_actions: Vec<f32>,

    /// `true` if the episode ended with this step.
    pub terminal: bool,
}

/// Bounded FIFO memory of transitions.
///
/// The oldest transition is overwritten once the memory is full.
pub struct ReplayMemory<T> {
    capacity: usize,
    i: usize,
    items: Vec<T>,
    rng: SmallRng,
}

impl<T: Clone> ReplayMemory<T> {
    /// Constructs an empty memory.
    pub fn new(capacity: usize, seed: u64) -> Self {
        Self {
            capacity,
            i: 0,
            items: Vec::with_capacity(capacity.min(1 << 16)),
            rng: SmallRng::seed_from_u64(seed),
        }
    }

    /// The number of transitions in the memory.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Returns `true` if the memory holds no transition.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Adds an item, overwriting the oldest one if full.
    pub fn push(&mut self, item: T) {
        if self.capacity == 0 {
            return;
        }
        if self.items.len() < self.capacity {
            self.items.push(item);
        } else {
            self.items[self.i] = item;
        }
        self.i = (self.i + 1) % self.capacity;
    }

    /// Draws distinct items uniformly at random.
    ///
    /// Returns at most [`ReplayMemory::len`] items.
    pub fn sample(&mut self, batch_size: usize) -> Result<Vec<T>> {
        if self.is_empty() {
            bail!("Can not sample from an empty replay memory");
        }
        let len = self.len();
        let n = batch_size.min(len);
        let ixs = index::sample(&mut self.rng, len, n);
        Ok(ixs.into_iter().map(|ix| self.items[ix].clone()).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;

    #[test]
    fn test_fifo_eviction() {
        let mut memory = ReplayMemory::new(3, 0);
        for v in 0..5 {
            memory.push(v);
        }
        assert_eq!(memory.len(), 3);
        let mut items = memory.sample(10).unwrap();
        items.sort();
        assert_eq!(items, vec![2, 3, 4]);
    }

    #[test]
    fn test_sample_is_distinct() -> Result<()> {
        let mut memory = ReplayMemory::new(100, 1);
        for v in 0..50 {
            memory.push(v);
        }
        let items = memory.sample(20)?;
        assert_eq!(items.len(), 20);
        assert_eq!(items.iter().collect::<BTreeSet<_>>().len(), 20);
        Ok(())
    }

    #[test]
    fn test_sample_from_empty_memory_fails() {
        let mut memory = ReplayMemory::<usize>::new(10, 0);
        assert!(memory.sample(1).is_err());
    }
}
