//! Environment-driven client configuration.
//!
//! `MYICOMFORT_USERNAME` and `MYICOMFORT_PASSWORD` are required. Optional:
//! `MYICOMFORT_SYSTEM`, `MYICOMFORT_ZONE` (indices, default 0),
//! `MYICOMFORT_SERVICE` (`myicomfort` or `lennox`), `MYICOMFORT_UNITS`
//! (`device`, `f`, `c`, or an upstream unit code) and `MYICOMFORT_BASE_URL`.

use crate::client::ThermostatClientBuilder;
use crate::protocol::Service;
use crate::types::{TemperatureUnits, UnitPreference};
use crate::{Error, Result};

#[derive(Debug, Clone, PartialEq)]
pub struct ClientConfig {
    pub username: String,
    pub password: String,
    pub system: usize,
    pub zone: usize,
    pub service: Service,
    pub units: UnitPreference,
    pub base_url: Option<String>,
}

impl ClientConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds a config from any key lookup; blank values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let username = get("MYICOMFORT_USERNAME")
            .ok_or_else(|| Error::Config("MYICOMFORT_USERNAME is not set".to_string()))?;
        let password = get("MYICOMFORT_PASSWORD")
            .ok_or_else(|| Error::Config("MYICOMFORT_PASSWORD is not set".to_string()))?;

        let index = |key: &str| -> Result<usize> {
            match get(key) {
                Some(v) => v
                    .parse()
                    .map_err(|_| Error::Config(format!("{key} must be a non-negative integer, got {v:?}"))),
                None => Ok(0),
            }
        };
        let system = index("MYICOMFORT_SYSTEM")?;
        let zone = index("MYICOMFORT_ZONE")?;

        let service = match get("MYICOMFORT_SERVICE").map(|v| v.to_ascii_lowercase()) {
            None => Service::default(),
            Some(v) if v == "myicomfort" => Service::MyIComfort,
            Some(v) if v == "lennox" => Service::Lennox,
            Some(v) => {
                return Err(Error::Config(format!(
                    "MYICOMFORT_SERVICE must be \"myicomfort\" or \"lennox\", got {v:?}"
                )));
            }
        };

        Ok(ClientConfig {
            username,
            password,
            system,
            zone,
            service,
            units: get("MYICOMFORT_UNITS").map_or(UnitPreference::Device, |v| parse_units(&v)),
            base_url: get("MYICOMFORT_BASE_URL"),
        })
    }

    pub fn into_builder(self) -> ThermostatClientBuilder {
        let mut builder = ThermostatClientBuilder::new(self.username, self.password)
            .system(self.system)
            .zone(self.zone)
            .service(self.service)
            .units(self.units);
        if let Some(url) = self.base_url {
            builder = builder.base_url(url);
        }
        builder
    }
}

// Unrecognized values fall back to the thermostat's own preference.
fn parse_units(value: &str) -> UnitPreference {
    match value.to_ascii_lowercase().as_str() {
        "f" | "fahrenheit" => UnitPreference::Fixed(TemperatureUnits::Fahrenheit),
        "c" | "celsius" => UnitPreference::Fixed(TemperatureUnits::Celsius),
        other => other
            .parse::<u8>()
            .map_or(UnitPreference::Device, UnitPreference::from_code),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config(pairs: &[(&str, &str)]) -> Result<ClientConfig> {
        let env: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        ClientConfig::from_lookup(|key| env.get(key).cloned())
    }

    const CREDS: [(&str, &str); 2] = [
        ("MYICOMFORT_USERNAME", "jane@example.com"),
        ("MYICOMFORT_PASSWORD", "hunter2"),
    ];

    #[test]
    fn defaults() {
        let cfg = config(&CREDS).unwrap();
        assert_eq!(cfg.username, "jane@example.com");
        assert_eq!(cfg.system, 0);
        assert_eq!(cfg.zone, 0);
        assert_eq!(cfg.service, Service::MyIComfort);
        assert_eq!(cfg.units, UnitPreference::Device);
        assert_eq!(cfg.base_url, None);
    }

    #[test]
    fn missing_password_is_an_error() {
        let err = config(&CREDS[..1]).unwrap_err();
        assert!(matches!(err, Error::Config(msg) if msg.contains("MYICOMFORT_PASSWORD")));
    }

    #[test]
    fn explicit_selection() {
        let mut pairs = CREDS.to_vec();
        pairs.extend([
            ("MYICOMFORT_SYSTEM", "1"),
            ("MYICOMFORT_ZONE", " 2 "),
            ("MYICOMFORT_SERVICE", "Lennox"),
            ("MYICOMFORT_UNITS", "c"),
            ("MYICOMFORT_BASE_URL", "http://localhost:9000/"),
        ]);
        let cfg = config(&pairs).unwrap();
        assert_eq!(cfg.system, 1);
        assert_eq!(cfg.zone, 2);
        assert_eq!(cfg.service, Service::Lennox);
        assert_eq!(cfg.units, UnitPreference::Fixed(TemperatureUnits::Celsius));
        assert_eq!(cfg.base_url.as_deref(), Some("http://localhost:9000/"));
    }

    #[test]
    fn bad_index_is_an_error() {
        let mut pairs = CREDS.to_vec();
        pairs.push(("MYICOMFORT_ZONE", "-1"));
        assert!(matches!(config(&pairs), Err(Error::Config(_))));
    }

    #[test]
    fn unit_codes() {
        assert_eq!(parse_units("0"), UnitPreference::Fixed(TemperatureUnits::Fahrenheit));
        assert_eq!(parse_units("1"), UnitPreference::Fixed(TemperatureUnits::Celsius));
        assert_eq!(parse_units("9"), UnitPreference::Device);
        assert_eq!(parse_units("device"), UnitPreference::Device);
    }
}
