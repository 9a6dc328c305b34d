use config::{Config, Environment};
use serde::de::DeserializeOwned;
use tracing::info;

/// Custom error type for config loading.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("configuration error: {0}")]
    Config(#[from] config::ConfigError),
}

/// Loads configuration for `T` from process environment variables.
///
/// Variable names map onto field names case-insensitively (`MQTT_ADDRESS`
/// fills `mqtt_address`). Fields with serde defaults fall back to them when
/// the variable is absent; a missing required field is a [`ConfigError`].
///
/// # Errors
/// Returns an error if a required variable is absent or a value does not
/// deserialize into the matching field of `T`.
pub fn load_config<T>() -> Result<T, ConfigError>
where
    T: DeserializeOwned,
{
    info!("Loading configuration from environment");
    from_source(Environment::default())
}

fn from_source<T>(env: Environment) -> Result<T, ConfigError>
where
    T: DeserializeOwned,
{
    let config = Config::builder().add_source(env).build()?.try_deserialize::<T>()?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Deserialize)]
    struct TestConfig {
        broker: String,
        #[serde(default = "default_port")]
        port: u16,
    }

    const fn default_port() -> u16 {
        4242
    }

    fn env_with(vars: &[(&str, &str)]) -> Environment {
        let mut map = config::Map::new();
        for (key, value) in vars {
            map.insert((*key).to_owned(), (*value).to_owned());
        }
        Environment::default().source(Some(map))
    }

    #[test]
    fn loads_required_and_defaulted_fields() {
        let cfg: TestConfig = from_source(env_with(&[("BROKER", "broker.local")])).unwrap();
        assert_eq!(cfg.broker, "broker.local");
        assert_eq!(cfg.port, 4242);
    }

    #[test]
    fn overrides_win_over_defaults() {
        let cfg: TestConfig =
            from_source(env_with(&[("BROKER", "broker.local"), ("PORT", "8080")])).unwrap();
        assert_eq!(cfg.port, 8080);
    }

    #[test]
    fn missing_required_field_fails() {
        let err = from_source::<TestConfig>(env_with(&[])).unwrap_err();
        assert!(err.to_string().contains("broker"));
    }

    #[test]
    fn unrelated_variables_are_ignored() {
        let cfg: TestConfig =
            from_source(env_with(&[("BROKER", "broker.local"), ("UNRELATED", "x")])).unwrap();
        assert_eq!(cfg.broker, "broker.local");
    }
}
