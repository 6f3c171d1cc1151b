//! Configuration of [`Runner`](super::Runner).
use crate::error::GymRunError;
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::{
    fs::File,
    io::{BufReader, Write},
    path::Path,
};

/// Cadence of rollouts, training and evaluation of a run.
///
/// Fields absent from a parameter file take their defaults; unknown fields are
/// rejected.
#[derive(Debug, Deserialize, Serialize, PartialEq, Clone)]
#[serde(default, deny_unknown_fields)]
pub struct RunSchedule {
    /// The number of rollout episodes.
    pub num_episodes: usize,

    /// The maximum number of steps of an episode, unbounded if `None`.
    pub max_steps: Option<usize>,

    /// Interval of training in episodes.
    pub train_every: usize,

    /// Training starts at the first cadence episode after this one.
    pub train_after: usize,

    /// Interval of evaluation in episodes.
    pub test_every: usize,

    /// Evaluation on cadence starts after this episode.
    pub test_after: usize,

    /// The number of minibatches trained on at a training step.
    pub num_train_batches: usize,

    /// The number of test episodes averaged at an evaluation step.
    pub avg_over_num_episodes: usize,

    /// Render episodes.
    pub render: bool,

    /// Interval of rendering in episodes.
    pub render_every: usize,
}

impl Default for RunSchedule {
    fn default() -> Self {
        Self {
            num_episodes: 301,
            max_steps: None,
            train_every: 10,
            train_after: 10,
            test_every: 100,
            test_after: 10,
            num_train_batches: 100,
            avg_over_num_episodes: 100,
            render: false,
            render_every: 10,
        }
    }
}

impl RunSchedule {
    /// Sets the number of rollout episodes.
    pub fn num_episodes(mut self, v: usize) -> Self {
        self.num_episodes = v;
        self
    }

    /// Sets the maximum number of steps of an episode.
    pub fn max_steps(mut self, v: Option<usize>) -> Self {
        self.max_steps = v;
        self
    }

    /// Sets the interval of training in episodes.
    pub fn train_every(mut self, v: usize) -> Self {
        self.train_every = v;
        self
    }

    /// Sets the episode after which training starts.
    pub fn train_after(mut self, v: usize) -> Self {
        self.train_after = v;
        self
    }

    /// Sets the interval of evaluation in episodes.
    pub fn test_every(mut self, v: usize) -> Self {
        self.test_every = v;
        self
    }

    /// Sets the episode after which evaluation on cadence starts.
    pub fn test_after(mut self, v: usize) -> Self {
        self.test_after = v;
        self
    }

    /// Sets the number of minibatches per training step.
    pub fn num_train_batches(mut self, v: usize) -> Self {
        self.num_train_batches = v;
        self
    }

    /// Sets the number of test episodes per evaluation.
    pub fn avg_over_num_episodes(mut self, v: usize) -> Self {
        self.avg_over_num_episodes = v;
        self
    }

    /// Sets rendering and its interval.
    pub fn render(mut self, render: bool, render_every: usize) -> Self {
        self.render = render;
        self.render_every = render_every;
        self
    }

    /// Checks the values used as divisors.
    pub fn validate(&self) -> Result<()> {
        let check = |name: &str, v: usize| -> Result<()> {
            if v == 0 {
                Err(GymRunError::InvalidSchedule(format!("{} must be positive", name)).into())
            } else {
                Ok(())
            }
        };
        check("train_every", self.train_every)?;
        check("test_every", self.test_every)?;
        check("avg_over_num_episodes", self.avg_over_num_episodes)?;
        if self.render {
            check("render_every", self.render_every)?;
        }
        Ok(())
    }

    /// Builds a schedule from a `run_details` bundle and validates it.
    pub fn from_value(value: serde_json::Value) -> Result<Self> {
        let schedule: Self = serde_json::from_value(value)
            .map_err(|e| GymRunError::InvalidSchedule(e.to_string()))?;
        schedule.validate()?;
        Ok(schedule)
    }

    /// Constructs [`RunSchedule`] from YAML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let file = File::open(path)?;
        let rdr = BufReader::new(file);
        let schedule: Self = serde_yaml::from_reader(rdr)?;
        schedule.validate()?;
        Ok(schedule)
    }

    /// Saves [`RunSchedule`].
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let mut file = File::create(path)?;
        file.write_all(serde_yaml::to_string(&self)?.as_bytes())?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempdir::TempDir;

    #[test]
    fn test_partial_bundle_takes_defaults() -> Result<()> {
        let schedule = RunSchedule::from_value(json!({
            "num_episodes": 5,
            "max_steps": 200,
            "render": true,
        }))?;
        assert_eq!(
            schedule,
            RunSchedule::default()
                .num_episodes(5)
                .max_steps(Some(200))
                .render(true, 10)
        );
        Ok(())
    }

    #[test]
    fn test_null_max_steps_is_unbounded() -> Result<()> {
        let schedule = RunSchedule::from_value(json!({"max_steps": null}))?;
        assert_eq!(schedule.max_steps, None);
        Ok(())
    }

    #[test]
    fn test_unknown_key_is_rejected() {
        let err = RunSchedule::from_value(json!({"num_epsiodes": 5})).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<GymRunError>(),
            Some(GymRunError::InvalidSchedule(_))
        ));
    }

    #[test]
    fn test_zero_divisors_are_rejected() {
        for key in ["train_every", "test_every", "avg_over_num_episodes"] {
            let mut bundle = serde_json::Map::new();
            bundle.insert(key.to_string(), json!(0));
            let err = RunSchedule::from_value(bundle.into()).unwrap_err();
            assert!(err.to_string().contains(key));
        }
        // Only checked when rendering.
        assert!(RunSchedule::from_value(json!({"render_every": 0})).is_ok());
        assert!(RunSchedule::from_value(json!({"render_every": 0, "render": true})).is_err());
    }

    #[test]
    fn test_serde_run_schedule() -> Result<()> {
        let schedule = RunSchedule::default()
            .num_episodes(100)
            .train_every(2)
            .test_every(50);

        let dir = TempDir::new("run_schedule")?;
        let path = dir.path().join("run_schedule.yaml");
        schedule.save(&path)?;
        let schedule_ = RunSchedule::load(&path)?;
        assert_eq!(schedule, schedule_);
        Ok(())
    }
}
