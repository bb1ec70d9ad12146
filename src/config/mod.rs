use serde::Deserialize;
use serde_with::serde_as;
use serde_with::DurationSecondsWithFrac;
use std::path::{Path, PathBuf};
use std::time::Duration;
use std::{fs, io};
use log::info;
use thiserror::Error;

use crate::mcp23017::{DEFAULT_ADDRESS, MAX_ADDRESS};
use crate::pusher::{HoldDurations, DEFAULT_POWER_OFF_HOLD, DEFAULT_POWER_ON_HOLD};

pub const CONFIG_FILE: &str = "power_pusher.toml";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path:?}: {source}")]
    Io { path: PathBuf, source: io::Error },
    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("Bus address {0:#04x} is not a 7-bit address")]
    InvalidAddress(u8),
}

#[derive(Deserialize, Clone, Debug, Default, PartialEq)]
#[serde(default)]
pub struct Config {
    bus: BusConfig,
    holds: HoldConfig,
    pins: PinsConfig,
}

impl Config {
    /// Reads the config at `path`. A missing file is not an error, the defaults are used.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let config_str = match fs::read_to_string(path) {
            Ok(s) => s,
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                info!("No config at {:?}, using defaults", path);
                return Ok(Config::default());
            }
            Err(source) => return Err(ConfigError::Io { path: path.to_owned(), source }),
        };
        Self::parse(&config_str)
    }

    pub fn parse(config_str: &str) -> Result<Self, ConfigError> {
        let config: Config = toml::from_str(config_str)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.bus.address > MAX_ADDRESS {
            return Err(ConfigError::InvalidAddress(self.bus.address));
        }
        Ok(())
    }

    pub fn get_bus(&self) -> &BusConfig {
        &self.bus
    }

    pub fn get_holds(&self) -> &HoldConfig {
        &self.holds
    }

    pub fn get_pins(&self) -> &PinsConfig {
        &self.pins
    }
}

#[derive(Deserialize, Clone, Debug, PartialEq)]
#[serde(default)]
pub struct BusConfig {
    /// I2C character device the expander hangs off.
    device: String,
    /// 7-bit address of the expander, 0x20 to 0x27 depending on the A0..A2 straps.
    address: u8,
}

impl Default for BusConfig {
    fn default() -> Self {
        Self {
            device: "/dev/i2c-1".to_owned(),
            address: DEFAULT_ADDRESS,
        }
    }
}

impl BusConfig {
    pub fn get_device(&self) -> &str {
        &self.device
    }

    pub fn get_address(&self) -> u8 {
        self.address
    }
}

#[serde_as]
#[derive(Deserialize, Clone, Debug, PartialEq)]
#[serde(default)]
pub struct HoldConfig {
    /// How long (in seconds) `power-on` holds the button when not told otherwise.
    #[serde_as(as = "DurationSecondsWithFrac<f64>")]
    power_on_secs: Duration,
    /// How long (in seconds) `power-off` holds the button when not told otherwise.
    #[serde_as(as = "DurationSecondsWithFrac<f64>")]
    power_off_secs: Duration,
}

impl Default for HoldConfig {
    fn default() -> Self {
        Self {
            power_on_secs: DEFAULT_POWER_ON_HOLD,
            power_off_secs: DEFAULT_POWER_OFF_HOLD,
        }
    }
}

impl HoldConfig {
    pub fn to_hold_durations(&self) -> HoldDurations {
        HoldDurations {
            power_on: self.power_on_secs,
            power_off: self.power_off_secs,
        }
    }
}

#[derive(Deserialize, Clone, Debug, PartialEq)]
#[serde(default)]
pub struct PinsConfig {
    /// Write the pin directions and clear the outputs before every press.
    setup_before_hold: bool,
}

impl Default for PinsConfig {
    fn default() -> Self {
        Self { setup_before_hold: true }
    }
}

impl PinsConfig {
    pub fn setup_before_hold(&self) -> bool {
        self.setup_before_hold
    }
}
