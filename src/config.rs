//! Конфигурация сервера и аллокатора
//!
//! Базовые значения берутся из RON-файла (путь в `VAXISHARE_CONFIG`), если он
//! задан, затем отдельные поля переопределяются переменными окружения.

use std::net::SocketAddr;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::policy::NeedWeights;
use crate::resources::HospitalId;
use crate::starvation::StarvationThresholds;
use crate::AllocError;

pub const CONFIG_PATH_ENV: &str = "VAXISHARE_CONFIG";
pub const ADDR_ENV: &str = "VAXISHARE_ADDR";
pub const INITIAL_VACCINES_ENV: &str = "VAXISHARE_INITIAL_VACCINES";
pub const LOG_ENV: &str = "VAXISHARE_LOG";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub listen_addr: String,
    pub log_level: String,
    pub initial_vaccines: u64,
    pub starvation: StarvationThresholds,
    /// Внеочередная выдача голодающей больнице до основного плана; 0 отключает
    pub relief_units: u64,
    pub need_weights: NeedWeights,
    pub hospitals: Vec<HospitalSeed>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HospitalSeed {
    pub id: HospitalId,
    pub name: String,
    pub priority: i32,
    #[serde(default)]
    pub high_risk_population: u64,
}

impl HospitalSeed {
    fn new(id: HospitalId, name: &str, priority: i32, high_risk_population: u64) -> Self {
        Self {
            id,
            name: name.to_string(),
            priority,
            high_risk_population,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            listen_addr: "0.0.0.0:8080".to_string(),
            log_level: "info".to_string(),
            initial_vaccines: 10_000,
            starvation: StarvationThresholds::default(),
            relief_units: 10,
            need_weights: NeedWeights::default(),
            hospitals: vec![
                HospitalSeed::new(1, "City General Hospital", 3, 5000),
                HospitalSeed::new(2, "Community Health Center", 2, 2000),
                HospitalSeed::new(3, "Metropolitan Medical", 5, 8000),
                HospitalSeed::new(4, "Regional Hospital", 4, 6000),
                HospitalSeed::new(5, "Rural Clinic", 1, 1000),
            ],
        }
    }
}

impl Config {
    pub fn from_ron_str(source: &str) -> Result<Self, AllocError> {
        let config: Config = ron::from_str(source)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, AllocError> {
        let source = std::fs::read_to_string(path)?;
        Self::from_ron_str(&source)
    }

    pub fn from_env() -> Result<Self, AllocError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// То же, что [`Config::from_env`], но с произвольным источником переменных
    pub fn from_lookup<F>(lookup: F) -> Result<Self, AllocError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = match lookup(CONFIG_PATH_ENV) {
            Some(path) => Self::load(path)?,
            None => Self::default(),
        };

        if let Some(addr) = lookup(ADDR_ENV) {
            config.listen_addr = addr;
        }
        if let Some(initial) = lookup(INITIAL_VACCINES_ENV) {
            config.initial_vaccines = initial.trim().parse().map_err(|e| {
                AllocError::Config(format!("{} is not a valid count: {}", INITIAL_VACCINES_ENV, e))
            })?;
        }
        if let Some(level) = lookup(LOG_ENV) {
            config.log_level = level;
        }

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), AllocError> {
        self.starvation.validate()?;
        self.socket_addr()?;

        let mut seen = std::collections::HashSet::new();
        for seed in &self.hospitals {
            if seed.id == 0 {
                return Err(AllocError::Config(format!(
                    "hospital '{}' must have a positive id",
                    seed.name
                )));
            }
            if !seen.insert(seed.id) {
                return Err(AllocError::Config(format!(
                    "hospital id {} listed twice",
                    seed.id
                )));
            }
        }
        Ok(())
    }

    pub fn socket_addr(&self) -> Result<SocketAddr, AllocError> {
        self.listen_addr.parse().map_err(|e| {
            AllocError::Config(format!("invalid listen address '{}': {}", self.listen_addr, e))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    #[test]
    fn test_defaults_seed_five_hospitals() {
        let config = Config::default();
        config.validate().unwrap();
        assert_eq!(config.initial_vaccines, 10_000);
        assert_eq!(config.hospitals.len(), 5);
        assert_eq!(config.socket_addr().unwrap().port(), 8080);
    }

    #[test]
    fn test_partial_ron_keeps_defaults() {
        let config = Config::from_ron_str(
            r#"(
                listen_addr: "127.0.0.1:9100",
                initial_vaccines: 500,
                starvation: (wait_time: 3.0),
                hospitals: [
                    (id: 7, name: "Harbor Clinic", priority: 2),
                ],
            )"#,
        )
        .unwrap();

        assert_eq!(config.initial_vaccines, 500);
        assert_eq!(config.starvation.wait_time, 3.0);
        assert_eq!(config.starvation.unmet_ratio, 1.0);
        assert_eq!(config.relief_units, 10);
        assert_eq!(config.need_weights, NeedWeights::default());
        assert_eq!(config.hospitals.len(), 1);
        assert_eq!(config.hospitals[0].high_risk_population, 0);
    }

    #[test]
    fn test_rejects_bad_values() {
        assert!(matches!(
            Config::from_ron_str("(starvation: (wait_time: 0.0))"),
            Err(AllocError::Config(_))
        ));
        assert!(matches!(
            Config::from_ron_str(r#"(listen_addr: "nowhere")"#),
            Err(AllocError::Config(_))
        ));
        assert!(matches!(
            Config::from_ron_str(
                r#"(hospitals: [(id: 1, name: "A", priority: 1), (id: 1, name: "B", priority: 2)])"#
            ),
            Err(AllocError::Config(_))
        ));
        assert!(matches!(
            Config::from_ron_str("(initial_vaccines: \"lots\")"),
            Err(AllocError::ConfigParse(_))
        ));
    }

    #[test]
    fn test_file_and_env_overrides() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "(initial_vaccines: 250, relief_units: 0)").unwrap();

        let vars: HashMap<&str, String> = HashMap::from([
            (CONFIG_PATH_ENV, file.path().display().to_string()),
            (ADDR_ENV, "127.0.0.1:0".to_string()),
            (LOG_ENV, "debug".to_string()),
        ]);
        let config = Config::from_lookup(|key| vars.get(key).cloned()).unwrap();

        assert_eq!(config.initial_vaccines, 250);
        assert_eq!(config.relief_units, 0);
        assert_eq!(config.listen_addr, "127.0.0.1:0");
        assert_eq!(config.log_level, "debug");

        let vars: HashMap<&str, String> =
            HashMap::from([(INITIAL_VACCINES_ENV, "-3".to_string())]);
        assert!(matches!(
            Config::from_lookup(|key| vars.get(key).cloned()),
            Err(AllocError::Config(_))
        ));
    }

    #[test]
    fn test_missing_file_is_io_error() {
        assert!(matches!(
            Config::load("/definitely/not/here.ron"),
            Err(AllocError::Io(_))
        ));
    }
}
