use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::{
    fmt,
    path::{Path, PathBuf},
    str::FromStr,
};

use crate::{
    errors::{LedgerError, Result},
    ledger::RecurrenceHorizon,
    utils::{
        app_data_dir, ensure_dir,
        persistence::{read_json, write_json_atomic},
    },
};

const CONFIG_DIR: &str = "config";
const CONFIG_FILE: &str = "config.json";

/// Currencies the presentation layer knows how to format.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "UPPERCASE")]
pub enum CurrencyCode {
    Brl,
    #[default]
    Usd,
    Eur,
}

impl CurrencyCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            CurrencyCode::Brl => "BRL",
            CurrencyCode::Usd => "USD",
            CurrencyCode::Eur => "EUR",
        }
    }
}

impl fmt::Display for CurrencyCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CurrencyCode {
    type Err = LedgerError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_uppercase().as_str() {
            "BRL" => Ok(CurrencyCode::Brl),
            "USD" => Ok(CurrencyCode::Usd),
            "EUR" => Ok(CurrencyCode::Eur),
            other => Err(LedgerError::Config(format!("unsupported currency `{other}`"))),
        }
    }
}

/// How new recurring transactions are stored.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum SeriesStrategy {
    /// One record holding the rule, expanded per query.
    #[default]
    Lazy,
    /// One record per occurrence, linked by a group id.
    Eager,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    pub locale: String,
    pub currency: CurrencyCode,
    pub emergency_fund_total: Decimal,
    pub recurrence_horizon_months: u32,
    pub series_strategy: SeriesStrategy,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            locale: "en-US".into(),
            currency: CurrencyCode::default(),
            emergency_fund_total: Decimal::ZERO,
            recurrence_horizon_months: RecurrenceHorizon::DEFAULT_MONTHS,
            series_strategy: SeriesStrategy::default(),
        }
    }
}

impl Config {
    pub fn validate(&self) -> Result<()> {
        if self.recurrence_horizon_months == 0 {
            return Err(LedgerError::Config(
                "recurrence_horizon_months must be at least 1".into(),
            ));
        }
        if self.emergency_fund_total.is_sign_negative() {
            return Err(LedgerError::Config(
                "emergency_fund_total cannot be negative".into(),
            ));
        }
        if self.locale.trim().is_empty() {
            return Err(LedgerError::Config("locale cannot be empty".into()));
        }
        Ok(())
    }

    pub fn horizon(&self) -> RecurrenceHorizon {
        RecurrenceHorizon::months(self.recurrence_horizon_months)
    }
}

pub struct ConfigManager {
    path: PathBuf,
}

impl ConfigManager {
    pub fn new() -> Result<Self> {
        Self::from_base(app_data_dir())
    }

    pub fn with_base_dir(base: impl Into<PathBuf>) -> Result<Self> {
        Self::from_base(base.into())
    }

    fn from_base(base: PathBuf) -> Result<Self> {
        let config_root = base.join(CONFIG_DIR);
        ensure_dir(&config_root)?;
        Ok(Self {
            path: config_root.join(CONFIG_FILE),
        })
    }

    /// Stored configuration, or defaults when nothing was saved yet.
    pub fn load(&self) -> Result<Config> {
        let config = read_json::<Config>(&self.path)
            .map_err(|err| LedgerError::Config(format!("{}: {err}", self.path.display())))?
            .unwrap_or_default();
        config.validate()?;
        Ok(config)
    }

    pub fn save(&self, config: &Config) -> Result<()> {
        config.validate()?;
        write_json_atomic(&self.path, config)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}
