use crate::sensor::{Celsius, SmokeLevel, Thresholds};
use eyre::Context;
use std::{
    convert::TryFrom,
    net::{IpAddr, Ipv4Addr},
    path::PathBuf,
    time::Duration,
};

#[derive(serde::Deserialize, Debug)]
struct EnvConfig {
    #[serde(default = "default_host")]
    host: IpAddr,
    #[serde(default = "default_port")]
    port: u16,
    #[serde(default)]
    demo: bool,
    seed_file: Option<PathBuf>,
    #[serde(default = "default_offline_timeout_secs")]
    offline_timeout_secs: u64,
    #[serde(default = "default_sweep_interval_secs")]
    sweep_interval_secs: u64,
    #[serde(default = "default_warning_smoke")]
    warning_smoke: f64,
    #[serde(default = "default_critical_smoke")]
    critical_smoke: f64,
    #[serde(default = "default_warning_temperature")]
    warning_temperature: f64,
    #[serde(default = "default_critical_temperature")]
    critical_temperature: f64,
}

fn default_host() -> IpAddr {
    Ipv4Addr::LOCALHOST.into()
}

fn default_port() -> u16 {
    8080
}

fn default_offline_timeout_secs() -> u64 {
    5 * 60
}

fn default_sweep_interval_secs() -> u64 {
    30
}

fn default_warning_smoke() -> f64 {
    Thresholds::DEFAULT_WARNING_SMOKE
}

fn default_critical_smoke() -> f64 {
    Thresholds::DEFAULT_CRITICAL_SMOKE
}

fn default_warning_temperature() -> f64 {
    Thresholds::DEFAULT_WARNING_TEMPERATURE
}

fn default_critical_temperature() -> f64 {
    Thresholds::DEFAULT_CRITICAL_TEMPERATURE
}

#[derive(Debug)]
pub(crate) struct Config {
    pub host: IpAddr,
    pub port: u16,
    pub demo: bool,
    pub seed_file: Option<PathBuf>,
    pub offline_timeout: Duration,
    pub sweep_interval: Duration,
    pub thresholds: Thresholds,
}

impl Config {
    pub const ENV_PREFIX: &'static str = "FIREGUARD_";

    pub fn from_env() -> Result<Self, eyre::Error> {
        let env_config: EnvConfig = envy::prefixed(Self::ENV_PREFIX)
            .from_env()
            .context("Could not read config from environment")?;
        Self::from_env_config(env_config)
    }

    fn from_env_config(env_config: EnvConfig) -> Result<Self, eyre::Error> {
        if env_config.sweep_interval_secs == 0 {
            return Err(eyre::format_err!(
                "{}SWEEP_INTERVAL_SECS must be at least 1",
                Self::ENV_PREFIX
            ));
        }

        let thresholds = Thresholds::new(
            SmokeLevel::try_from(env_config.warning_smoke)?,
            SmokeLevel::try_from(env_config.critical_smoke)?,
            Celsius::try_from(env_config.warning_temperature)?,
            Celsius::try_from(env_config.critical_temperature)?,
        )
        .context("Invalid status thresholds")?;

        Ok(Self {
            host: env_config.host,
            port: env_config.port,
            demo: env_config.demo,
            seed_file: env_config.seed_file,
            offline_timeout: Duration::from_secs(env_config.offline_timeout_secs),
            sweep_interval: Duration::from_secs(env_config.sweep_interval_secs),
            thresholds,
        })
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn from_vars(vars: &[(&str, &str)]) -> Result<Config, eyre::Error> {
        let env_config: EnvConfig = envy::from_iter(
            vars.iter()
                .map(|(k, v)| (k.to_string(), v.to_string())),
        )?;
        Config::from_env_config(env_config)
    }

    #[test]
    fn defaults() {
        let config = from_vars(&[]).unwrap();
        assert_eq!(config.host, IpAddr::from(Ipv4Addr::LOCALHOST));
        assert_eq!(config.port, 8080);
        assert!(!config.demo);
        assert!(config.seed_file.is_none());
        assert_eq!(config.offline_timeout, Duration::from_secs(300));
        assert_eq!(config.thresholds, Thresholds::default());
    }

    #[test]
    fn overrides() {
        let config = from_vars(&[
            ("PORT", "9000"),
            ("DEMO", "true"),
            ("SEED_FILE", "/etc/fireguard/seed.json"),
            ("OFFLINE_TIMEOUT_SECS", "60"),
        ])
        .unwrap();
        assert_eq!(config.port, 9000);
        assert!(config.demo);
        assert_eq!(
            config.seed_file,
            Some(PathBuf::from("/etc/fireguard/seed.json"))
        );
        assert_eq!(config.offline_timeout, Duration::from_secs(60));
    }

    #[test]
    fn rejects_inverted_thresholds() {
        assert!(from_vars(&[("WARNING_SMOKE", "40")]).is_err());
        assert!(from_vars(&[("CRITICAL_SMOKE", "140")]).is_err());
        assert!(from_vars(&[("SWEEP_INTERVAL_SECS", "0")]).is_err());
    }
}
