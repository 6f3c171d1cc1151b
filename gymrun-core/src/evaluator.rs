//! Evaluation of the predictor of a trainer.
//!
//! An evaluation runs a fixed number of test episodes, in which exploration is
//! disabled, and reports the average return rounded to two decimals.
use crate::{Env, ModelType};
use anyhow::Result;
use log::trace;

/// Runs test episodes and averages their returns.
///
/// # Examples
///
/// ```ignore
/// let evaluator = Evaluator::new(100).render(true, 10);
/// let avg_reward = evaluator.evaluate(&mut env, model_type, &predictor, None)?;
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct Evaluator {
    /// The number of episodes to run during evaluation.
    n_episodes: usize,

    /// Render test episodes.
    render: bool,

    /// Interval of rendering, counted in test episodes of a single evaluation.
    render_every: usize,
}

impl Evaluator {
    /// Constructs an evaluator running `n_episodes` test episodes.
    pub fn new(n_episodes: usize) -> Self {
        Self {
            n_episodes,
            render: false,
            render_every: 1,
        }
    }

    /// Sets rendering of test episodes.
    pub fn render(mut self, render: bool, render_every: usize) -> Self {
        self.render = render;
        self.render_every = render_every;
        self
    }

    /// The number of test episodes of an evaluation.
    pub fn n_episodes(&self) -> usize {
        self.n_episodes
    }

    /// Evaluates the predictor and returns the average return.
    ///
    /// The render cadence uses the index of the test episode within this evaluation.
    /// Errors of the environment are returned as is.
    pub fn evaluate<E: Env>(
        &self,
        env: &mut E,
        model_type: ModelType,
        predictor: &E::Predictor,
        max_steps: Option<usize>,
    ) -> Result<f64> {
        let mut r_total = 0f64;

        for ix in 0..self.n_episodes {
            let render = self.render && ix % self.render_every == 0;
            let r = env.run_episode(model_type, predictor, max_steps, true, render)?;
            trace!("Test episode {}: return = {}", ix, r);
            r_total += r as f64;
        }

        Ok(round2(r_total / self.n_episodes as f64))
    }
}

/// Rounds to two decimal places.
pub fn round2(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}
