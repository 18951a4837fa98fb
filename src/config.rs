use crate::classify::KeywordTable;
use crate::parser::ParserOptions;
use crate::aggregate::MAX_ROLLING_DAYS;
use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub parser: ParserOptions,
    #[serde(default)]
    pub classifier: KeywordTable,
    #[serde(default)]
    pub attribution: Attribution,
    #[serde(default)]
    pub aggregation: Aggregation,
    #[serde(default)]
    pub logging: Logging,
}

impl Config {
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("reading config: {}", path.display()))?;
        let cfg: Config = toml::from_str(&raw).with_context(|| "parsing TOML")?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<()> {
        let days = self.aggregation.rolling_days;
        if !(1..=MAX_ROLLING_DAYS).contains(&days) {
            bail!("aggregation.rolling_days must be between 1 and {MAX_ROLLING_DAYS}, got {days}");
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Attribution {
    pub unassigned_label: String,
}
impl Default for Attribution {
    fn default() -> Self {
        Self { unassigned_label: "Unassigned".into() }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Aggregation {
    pub rolling_days: u32,
    pub recent_activity: usize,
}
impl Default for Aggregation {
    fn default() -> Self {
        Self { rolling_days: 14, recent_activity: 5 }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Logging {
    pub level: String,
    pub json: bool,
}
impl Default for Logging {
    fn default() -> Self {
        Self { level: "info".into(), json: false }
    }
}
