use crate::grid::{SlotLayout, DEFAULT_SLOT_MINUTES};
use crate::storage::StoreLocation;
use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;
use std::time::Duration;

pub const CONFIG_VERSION: u32 = 1;

const CONFIG_FILE: &str = "config.yml";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_version")]
    pub version: u32,
    #[serde(default = "default_slot_minutes")]
    pub slot_minutes: u32,
    #[serde(default = "default_tick_seconds")]
    pub tick_seconds: u64,
    #[serde(default = "default_notifications")]
    pub notifications: bool,
}

fn default_version() -> u32 {
    CONFIG_VERSION
}

fn default_slot_minutes() -> u32 {
    DEFAULT_SLOT_MINUTES
}

fn default_tick_seconds() -> u64 {
    60
}

fn default_notifications() -> bool {
    true
}

impl Default for Config {
    fn default() -> Self {
        Config {
            version: CONFIG_VERSION,
            slot_minutes: default_slot_minutes(),
            tick_seconds: default_tick_seconds(),
            notifications: default_notifications(),
        }
    }
}

impl Config {
    pub fn parse(raw: &str) -> Result<Self> {
        let config: Config = serde_yaml::from_str(raw).context("parsing config.yml")?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.version != CONFIG_VERSION {
            bail!(
                "config.yml version {} is not supported (expected {})",
                self.version,
                CONFIG_VERSION
            );
        }
        if SlotLayout::new(self.slot_minutes).is_none() {
            bail!(
                "slot_minutes must divide 60 evenly, got {}",
                self.slot_minutes
            );
        }
        if self.tick_seconds == 0 {
            bail!("tick_seconds must be greater than zero");
        }
        Ok(())
    }

    pub fn layout(&self) -> SlotLayout {
        SlotLayout::new(self.slot_minutes).unwrap_or_default()
    }

    pub fn tick_interval(&self) -> Duration {
        Duration::from_secs(self.tick_seconds)
    }
}

pub fn config_path(location: &StoreLocation) -> PathBuf {
    location.dir.join(CONFIG_FILE)
}

pub fn load_config(location: &StoreLocation) -> Result<Config> {
    let path = config_path(location);
    if !path.exists() {
        log::debug!("no config at {:?}, using defaults", path);
        return Ok(Config::default());
    }
    let raw = fs::read_to_string(&path).with_context(|| format!("reading {:?}", path))?;
    Config::parse(&raw).with_context(|| format!("loading {:?}", path))
}

pub fn write_default_config(location: &StoreLocation) -> Result<PathBuf> {
    let path = config_path(location);
    if !path.exists() {
        let serialized = serde_yaml::to_string(&Config::default()).context("serializing config")?;
        fs::write(&path, serialized).with_context(|| format!("writing {:?}", path))?;
    }
    Ok(path)
}
