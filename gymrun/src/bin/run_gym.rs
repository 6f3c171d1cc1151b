use anyhow::Result;
use clap::Parser;
use gymrun::{dispatch, load_params, ReferenceBackend};
use gymrun_core::DevicePlacement;
use std::path::PathBuf;

/// Train and evaluate an agent on a classic control environment.
#[derive(Parser, Debug)]
#[command(version, about)]
struct Args {
    /// Parameter file, JSON or YAML
    #[arg(short = 'p', long)]
    parameters: PathBuf,

    /// Stop once the average evaluation reward exceeds this value
    #[arg(short = 's', long = "score-bar", allow_negative_numbers = true)]
    score_bar: Option<f64>,

    /// Accelerator id, -1 for CPU
    #[arg(
        short = 'g',
        long = "gpu_id",
        default_value_t = DevicePlacement::USE_CPU,
        allow_negative_numbers = true
    )]
    gpu_id: i64,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    let params = load_params(&args.parameters)?;
    let device = DevicePlacement::from_gpu_id(args.gpu_id);
    let history = dispatch(&mut ReferenceBackend::default(), params, args.score_bar, device)?;
    println!("{:?}", history);

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::error::ErrorKind;

    #[test]
    fn test_parse_args() {
        let args = Args::try_parse_from(["run_gym", "-p", "configs/cartpole_discrete.json"]).unwrap();
        assert_eq!(args.parameters, PathBuf::from("configs/cartpole_discrete.json"));
        assert_eq!(args.score_bar, None);
        assert_eq!(args.gpu_id, DevicePlacement::USE_CPU);

        let args = Args::try_parse_from([
            "run_gym",
            "--parameters",
            "params.yaml",
            "--score-bar",
            "-150.5",
            "--gpu_id",
            "1",
        ])
        .unwrap();
        assert_eq!(args.score_bar, Some(-150.5));
        assert_eq!(DevicePlacement::from_gpu_id(args.gpu_id), DevicePlacement::Gpu(1));
    }

    #[test]
    fn test_negative_values() {
        let args = Args::try_parse_from(["run_gym", "-p", "a.json", "-s", "-200", "-g", "-3"]).unwrap();
        assert_eq!(args.score_bar, Some(-200.0));
        assert_eq!(DevicePlacement::from_gpu_id(args.gpu_id), DevicePlacement::Cpu);
    }

    #[test]
    fn test_parameters_are_required() {
        let err = Args::try_parse_from(["run_gym", "-s", "195"]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MissingRequiredArgument);

        let err = Args::try_parse_from(["run_gym", "-p", "a.json", "-s", "high"]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ValueValidation);
    }
}
