//! Selection and construction of the trainer of a run.
use crate::{
    config::{into_raw_params, parse_bundle, rename_key, take_bundle, take_str, RawParams},
    Backend, BoxedTrainer,
};
use anyhow::Result;
use gymrun_core::{
    error::GymRunError,
    params::{
        CnnParameters, ContinuousActionModelParameters, DdpgModelParameters,
        DdpgNetworkParameters, DdpgTrainingParameters, DiscreteActionConvModelParameters,
        DiscreteActionModelParameters, KnnParameters, RlParameters, TrainerConfig,
        TrainingParameters,
    },
    DevicePlacement, EnvDetails, EnvGeometry, ModelType, RewardHistory, RunSchedule, Runner,
};
use log::info;
use serde_json::Value;

fn training_parameters(raw: &mut RawParams, name: &str) -> Result<RawParams> {
    let mut bundle = take_bundle(raw, name)?;
    rename_key(&mut bundle, name, "learning_rate_decay", "gamma")?;
    Ok(bundle)
}

/// Builds the configuration of the trainer variant selected by the model type and,
/// for discrete actions, by the observation kind of the environment.
///
/// The `cnn` bundle is read only for image observations, and is checked against
/// the channels of the environment.
pub fn trainer_config<E: EnvGeometry + ?Sized>(
    model_type: ModelType,
    rl: RlParameters,
    raw: &mut RawParams,
    env: &E,
) -> Result<TrainerConfig> {
    let config = match model_type {
        ModelType::DiscreteAction => {
            let training: TrainingParameters =
                parse_bundle("training", training_parameters(raw, "training")?)?;
            let fc_parameters = DiscreteActionModelParameters {
                actions: env.actions(),
                rl,
                training,
            };
            if env.img() {
                let cnn_parameters: CnnParameters = parse_bundle("cnn", take_bundle(raw, "cnn")?)?;
                let mut params = DiscreteActionConvModelParameters {
                    fc_parameters,
                    cnn_parameters,
                    num_input_channels: env.num_input_channels(),
                    img_height: env.height(),
                    img_width: env.width(),
                };
                params.fit_to_image()?;
                TrainerConfig::DiscreteActionConv(params)
            } else {
                TrainerConfig::DiscreteAction(fc_parameters)
            }
        }
        ModelType::ParametricAction => {
            let training: TrainingParameters =
                parse_bundle("training", training_parameters(raw, "training")?)?;
            TrainerConfig::ParametricAction(ContinuousActionModelParameters {
                rl,
                training,
                knn: KnnParameters::dqn(),
            })
        }
        ModelType::ContinuousAction => {
            let shared_training: DdpgTrainingParameters = parse_bundle(
                "shared_training",
                training_parameters(raw, "shared_training")?,
            )?;
            let actor_training: DdpgNetworkParameters =
                parse_bundle("actor_training", take_bundle(raw, "actor_training")?)?;
            let critic_training: DdpgNetworkParameters =
                parse_bundle("critic_training", take_bundle(raw, "critic_training")?)?;
            TrainerConfig::ContinuousAction(DdpgModelParameters {
                rl,
                shared_training,
                actor_training,
                critic_training,
            })
        }
    };
    Ok(config)
}

/// Builds the trainer of a configuration.
pub fn build_trainer<B: Backend>(
    backend: &mut B,
    config: TrainerConfig,
    env: &B::Env,
    device: DevicePlacement,
) -> Result<BoxedTrainer<B::Env>> {
    match config {
        TrainerConfig::DiscreteAction(params) => {
            backend.discrete_action_trainer(params, env.normalization(), device)
        }
        TrainerConfig::DiscreteActionConv(params) => {
            backend.discrete_action_conv_trainer(params, env.normalization(), device)
        }
        TrainerConfig::ParametricAction(params) => backend.parametric_action_trainer(
            params,
            env.normalization(),
            env.normalization_action(),
            device,
        ),
        TrainerConfig::ContinuousAction(params) => {
            backend.ddpg_trainer(params, EnvDetails::from_env(env))
        }
    }
}

/// Runs training and evaluation as described by a parameter value.
///
/// The model type and the run schedule are checked before the environment is built.
/// `rl.epsilon` has no default here, unlike the other RL parameters.
/// Returns the averaged evaluation rewards.
pub fn dispatch<B: Backend>(
    backend: &mut B,
    params: Value,
    score_bar: Option<f64>,
    device: DevicePlacement,
) -> Result<RewardHistory> {
    let mut raw = into_raw_params(params)?;
    let model_type: ModelType = take_str(&mut raw, "model_type")?.parse()?;
    let schedule = match raw.remove("run_details") {
        Some(v) => RunSchedule::from_value(v)?,
        None => RunSchedule::default(),
    };
    let runner = Runner::build(schedule)?;

    let mut rl = take_bundle(&mut raw, "rl")?;
    rename_key(&mut rl, "rl", "reward_discount_factor", "gamma")?;
    if !rl.contains_key("epsilon") {
        return Err(GymRunError::MissingField {
            bundle: "rl".to_string(),
            field: "epsilon".to_string(),
        }
        .into());
    }
    let rl: RlParameters = parse_bundle("rl", rl)?;

    let env_id = take_str(&mut raw, "env")?;
    let mut env = backend.build_env(&env_id, rl.epsilon)?;

    let config = trainer_config(model_type, rl, &mut raw, &env)?;
    info!(
        "Build {} trainer for {} with gamma = {}",
        config.model_type(),
        env_id,
        config.rl().gamma
    );
    let mut trainer = build_trainer(backend, config, &env, device)?;

    runner.run(
        &mut env,
        model_type,
        &mut trainer,
        &format!("{} test run", env_id),
        score_bar,
    )
}
