use serde::Deserialize;
use std::path::PathBuf;

/// Where the firmware build drops its image, relative to the project root.
const DEFAULT_FIRMWARE_PATH: &str = ".pio/build/esp32dev/firmware.bin";
/// TCP port the one-shot file server binds by default.
const DEFAULT_PORT: u16 = 3333;
/// Topic the device subscribes to for download URLs.
const DEFAULT_TOPIC: &str = "home/espresso/update_url";

/// Runtime configuration, sourced from environment variables.
///
/// Only `MQTT_ADDRESS` is required; every other value defaults to the
/// firmware project this tool ships images for.
#[derive(Debug, Clone, Deserialize)]
pub struct OtaConfig {
    /// `MQTT_ADDRESS`: broker address as `host[:port]`.
    pub mqtt_address: String,

    /// `ADDRESS`: skips address auto-detection. Used verbatim in the
    /// announced URL, no validation.
    #[serde(default)]
    pub address: Option<String>,

    /// `FIRMWARE`: path of the firmware image to serve.
    #[serde(default = "default_firmware")]
    pub firmware: PathBuf,

    /// `PORT`: TCP port to serve the image on.
    #[serde(default = "default_port")]
    pub port: u16,

    /// `TOPIC`: topic the download URL is published to.
    #[serde(default = "default_topic")]
    pub topic: String,
}

fn default_firmware() -> PathBuf {
    PathBuf::from(DEFAULT_FIRMWARE_PATH)
}

const fn default_port() -> u16 {
    DEFAULT_PORT
}

fn default_topic() -> String {
    DEFAULT_TOPIC.to_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use config::{Config, Environment};

    fn from_env(vars: &[(&str, &str)]) -> Result<OtaConfig, config::ConfigError> {
        let mut map = config::Map::new();
        for (key, value) in vars {
            map.insert((*key).to_owned(), (*value).to_owned());
        }
        Config::builder()
            .add_source(Environment::default().source(Some(map)))
            .build()?
            .try_deserialize()
    }

    #[test]
    fn minimal_environment_uses_defaults() {
        let cfg = from_env(&[("MQTT_ADDRESS", "broker.local")]).unwrap();
        assert_eq!(cfg.mqtt_address, "broker.local");
        assert_eq!(cfg.address, None);
        assert_eq!(cfg.firmware, PathBuf::from(".pio/build/esp32dev/firmware.bin"));
        assert_eq!(cfg.port, 3333);
        assert_eq!(cfg.topic, "home/espresso/update_url");
    }

    #[test]
    fn missing_broker_address_fails() {
        let err = from_env(&[]).unwrap_err();
        assert!(err.to_string().contains("mqtt_address"));
    }

    #[test]
    fn every_value_can_be_overridden() {
        let cfg = from_env(&[
            ("MQTT_ADDRESS", "broker.local:1884"),
            ("ADDRESS", "10.0.0.5"),
            ("FIRMWARE", "build/out.bin"),
            ("PORT", "8080"),
            ("TOPIC", "home/espresso/testing"),
        ])
        .unwrap();
        assert_eq!(cfg.address.as_deref(), Some("10.0.0.5"));
        assert_eq!(cfg.firmware, PathBuf::from("build/out.bin"));
        assert_eq!(cfg.port, 8080);
        assert_eq!(cfg.topic, "home/espresso/testing");
    }
}
