//! Parameter files and their bundles.
//!
//! A parameter file is a mapping from bundle names (`env`, `model_type`, `rl`,
//! `training`, ...) to values. Bundles are taken out of the mapping as they are
//! consumed, so a bundle that is never needed is never inspected.
use anyhow::Result;
use gymrun_core::error::GymRunError;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use std::{fs::File, io::BufReader, path::Path};

/// Raw parameters.
pub type RawParams = Map<String, Value>;

/// Loads a parameter file.
///
/// Files with extension `yaml` or `yml` are read as YAML, others as JSON.
pub fn load_params(path: impl AsRef<Path>) -> Result<Value> {
    let path = path.as_ref();
    let rdr = BufReader::new(File::open(path)?);
    match path.extension().and_then(|e| e.to_str()) {
        Some("yaml") | Some("yml") => Ok(serde_yaml::from_reader(rdr)?),
        _ => Ok(serde_json::from_reader(rdr)?),
    }
}

/// Converts a parameter value into a mapping of bundles.
pub fn into_raw_params(params: Value) -> Result<RawParams> {
    match params {
        Value::Object(map) => Ok(map),
        v => Err(GymRunError::InvalidConfig(format!("parameters must be a mapping, got {}", v)).into()),
    }
}

/// Takes a string-valued bundle, such as `env` or `model_type`.
pub fn take_str(raw: &mut RawParams, name: &str) -> Result<String> {
    match raw.remove(name) {
        None => Err(GymRunError::MissingBundle(name.to_string()).into()),
        Some(Value::String(s)) => Ok(s),
        Some(v) => Err(GymRunError::InvalidConfig(format!("{} must be a string, got {}", name, v)).into()),
    }
}

/// Takes a mapping-valued bundle.
pub fn take_bundle(raw: &mut RawParams, name: &str) -> Result<RawParams> {
    match raw.remove(name) {
        None => Err(GymRunError::MissingBundle(name.to_string()).into()),
        Some(Value::Object(map)) => Ok(map),
        Some(v) => Err(GymRunError::InvalidConfig(format!("{} must be a mapping, got {}", name, v)).into()),
    }
}

/// Moves the value of key `from` to key `to` in a bundle.
///
/// `from` no longer exists afterwards. A missing `from` is an error.
pub fn rename_key(bundle: &mut RawParams, bundle_name: &str, from: &str, to: &str) -> Result<()> {
    let value = bundle.remove(from).ok_or_else(|| GymRunError::MissingField {
        bundle: bundle_name.to_string(),
        field: from.to_string(),
    })?;
    bundle.insert(to.to_string(), value);
    Ok(())
}

/// Deserializes a bundle into its parameter type.
pub fn parse_bundle<T: DeserializeOwned>(name: &str, bundle: RawParams) -> Result<T> {
    serde_json::from_value(Value::Object(bundle))
        .map_err(|e| GymRunError::InvalidConfig(format!("{}: {}", name, e)).into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use gymrun_core::params::RlParameters;
    use serde_json::json;
    use std::io::Write;
    use tempdir::TempDir;

    fn raw(v: Value) -> RawParams {
        into_raw_params(v).unwrap()
    }

    #[test]
    fn test_rename_key() -> Result<()> {
        let mut bundle = raw(json!({"reward_discount_factor": 0.99, "epsilon": 0.2}));
        rename_key(&mut bundle, "rl", "reward_discount_factor", "gamma")?;
        assert!(!bundle.contains_key("reward_discount_factor"));
        assert_eq!(bundle.get("gamma"), Some(&json!(0.99)));

        let err = rename_key(&mut bundle, "rl", "reward_discount_factor", "gamma").unwrap_err();
        assert_eq!(
            err.downcast_ref::<GymRunError>(),
            Some(&GymRunError::MissingField {
                bundle: "rl".to_string(),
                field: "reward_discount_factor".to_string()
            })
        );
        Ok(())
    }

    #[test]
    fn test_take_bundle() -> Result<()> {
        let mut params = raw(json!({"rl": {"epsilon": 0.3}, "env": "CartPole-v0", "cnn": 5}));
        let rl: RlParameters = parse_bundle("rl", take_bundle(&mut params, "rl")?)?;
        assert_eq!(rl, RlParameters::default().epsilon(0.3));
        assert!(!params.contains_key("rl"));
        assert_eq!(take_str(&mut params, "env")?, "CartPole-v0");

        assert!(take_bundle(&mut params, "cnn").is_err());
        let err = take_bundle(&mut params, "training").unwrap_err();
        assert_eq!(
            err.downcast_ref::<GymRunError>(),
            Some(&GymRunError::MissingBundle("training".to_string()))
        );
        Ok(())
    }

    #[test]
    fn test_unknown_fields_are_rejected() {
        let bundle = raw(json!({"reward_discount_factor": 0.99}));
        assert!(parse_bundle::<RlParameters>("rl", bundle).is_err());
    }

    #[test]
    fn test_load_params() -> Result<()> {
        let dir = TempDir::new("load_params")?;

        let path = dir.path().join("params.yaml");
        let mut file = File::create(&path)?;
        file.write_all(b"env: CartPole-v0\nmodel_type: discrete\nrl:\n  epsilon: 0.2\n")?;
        let params = load_params(&path)?;
        assert_eq!(params["env"], json!("CartPole-v0"));
        assert_eq!(params["rl"]["epsilon"], json!(0.2));

        let path = dir.path().join("params.json");
        let mut file = File::create(&path)?;
        file.write_all(br#"{"env": "Pendulum-v0", "model_type": "continuous"}"#)?;
        let params = load_params(&path)?;
        assert_eq!(params["model_type"], json!("continuous"));

        assert!(load_params(dir.path().join("missing.json")).is_err());
        Ok(())
    }
}
