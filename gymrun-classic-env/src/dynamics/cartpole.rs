use super::{Action, Dynamics, StepOutcome};
use anyhow::{bail, Result};
use gymrun_core::{
    normalization::{NormalizationParameters, NormalizationTable},
    ActionSpace,
};
use rand::{rngs::SmallRng, Rng};

const GRAVITY: f32 = 9.8;
const MASS_CART: f32 = 1.0;
const MASS_POLE: f32 = 0.1;
const TOTAL_MASS: f32 = MASS_CART + MASS_POLE;
const HALF_LENGTH: f32 = 0.5;
const POLE_MASS_LENGTH: f32 = MASS_POLE * HALF_LENGTH;
const FORCE_MAG: f32 = 10.0;
const TAU: f32 = 0.02;
const THETA_THRESHOLD: f32 = 12.0 * 2.0 * std::f32::consts::PI / 360.0;
const X_THRESHOLD: f32 = 2.4;

/// Pole balanced on a cart pushed left or right.
///
/// The observation is `(x, x_dot, theta, theta_dot)`. Each step not ending the
/// episode yields reward 1. Action `0` pushes left and `1` pushes right.
#[derive(Debug, Default)]
pub struct CartPole {
    state: [f32; 4],
}

impl CartPole {
    /// Id of the action feature, following the state features.
    pub const ACTION_FEATURE_ID: usize = 4;
}

impl Dynamics for CartPole {
    fn name(&self) -> &'static str {
        "CartPole-v0"
    }

    fn actions(&self) -> Vec<String> {
        vec!["0".to_string(), "1".to_string()]
    }

    fn state_normalization(&self) -> NormalizationTable {
        [(0, 2.4), (1, 2.0), (2, 0.21), (3, 2.0)]
            .into_iter()
            .map(|(id, stddev)| (id, NormalizationParameters::continuous(0.0, stddev)))
            .collect()
    }

    fn action_normalization(&self) -> NormalizationTable {
        let mut table = NormalizationTable::new();
        table.insert(
            Self::ACTION_FEATURE_ID,
            NormalizationParameters::enumeration(vec![0, 1]),
        );
        table
    }

    fn action_space(&self) -> ActionSpace {
        ActionSpace {
            low: vec![],
            high: vec![],
        }
    }

    fn state_dim(&self) -> usize {
        4
    }

    fn reset(&mut self, rng: &mut SmallRng) -> Vec<f32> {
        for v in self.state.iter_mut() {
            *v = rng.gen_range(-0.05..0.05);
        }
        self.state.to_vec()
    }

    fn step(&mut self, action: &Action) -> Result<StepOutcome> {
        let force = match action {
            Action::Discrete(0) => -FORCE_MAG,
            Action::Discrete(1) => FORCE_MAG,
            _ => bail!("Invalid action for {}: {:?}", self.name(), action),
        };
        let [x, x_dot, theta, theta_dot] = self.state;
        let (sin, cos) = theta.sin_cos();
        let temp = (force + POLE_MASS_LENGTH * theta_dot * theta_dot * sin) / TOTAL_MASS;
        let theta_acc = (GRAVITY * sin - cos * temp)
            / (HALF_LENGTH * (4.0 / 3.0 - MASS_POLE * cos * cos / TOTAL_MASS));
        let x_acc = temp - POLE_MASS_LENGTH * theta_acc * cos / TOTAL_MASS;

        self.state = [
            x + TAU * x_dot,
            x_dot + TAU * x_acc,
            theta + TAU * theta_dot,
            theta_dot + TAU * theta_acc,
        ];
        let terminal = self.state[0].abs() > X_THRESHOLD || self.state[2].abs() > THETA_THRESHOLD;

        Ok(StepOutcome {
            obs: self.state.to_vec(),
            reward: 1.0,
            terminal,
        })
    }

    fn render(&self) -> String {
        let [x, x_dot, theta, theta_dot] = self.state;
        format!(
            "x = {:+.3}, x_dot = {:+.3}, theta = {:+.3}, theta_dot = {:+.3}",
            x, x_dot, theta, theta_dot
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    #[test]
    fn test_pole_falls_when_pushed_one_way() -> Result<()> {
        let mut task = CartPole::default();
        let mut rng = SmallRng::seed_from_u64(0);
        let obs = task.reset(&mut rng);
        assert!(obs.iter().all(|v| v.abs() <= 0.05));

        let mut n_steps = 0;
        loop {
            let outcome = task.step(&Action::Discrete(1))?;
            assert_eq!(outcome.reward, 1.0);
            n_steps += 1;
            if outcome.terminal {
                break;
            }
            assert!(n_steps < 200);
        }
        assert!(n_steps > 1);
        Ok(())
    }

    #[test]
    fn test_rejects_continuous_action() {
        let mut task = CartPole::default();
        assert!(task.step(&Action::Continuous(vec![0.5])).is_err());
        assert!(task.step(&Action::Discrete(2)).is_err());
    }
}
