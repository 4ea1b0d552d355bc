//! Settings loading and the Settings Provider port.
//!
//! Settings are layered:
//! 1. defaults in code
//! 2. an optional TOML file (`stockbook.toml` unless a path is given)
//! 3. environment overrides with the `STOCKBOOK_` prefix, nested keys joined
//!    by `__` (e.g. `STOCKBOOK_BACKEND__URL`)

use std::sync::{Arc, PoisonError, RwLock};

use config::builder::DefaultState;
use config::{Config, ConfigBuilder, ConfigError, Environment, File, FileFormat};
use serde::Deserialize;
use thiserror::Error;

use stockbook_inventory::StockPolicy;

/// Source of the stock policy flags.
pub trait SettingsProvider: Send + Sync {
    fn count_non_usable_as_outgoing(&self) -> bool;

    fn allow_negative_stock(&self) -> bool;

    /// Snapshot of both flags.
    fn policy(&self) -> StockPolicy {
        StockPolicy::new(self.count_non_usable_as_outgoing(), self.allow_negative_stock())
    }
}

impl SettingsProvider for StockPolicy {
    fn count_non_usable_as_outgoing(&self) -> bool {
        self.count_non_usable_as_outgoing
    }

    fn allow_negative_stock(&self) -> bool {
        self.allow_negative_stock
    }

    fn policy(&self) -> StockPolicy {
        *self
    }
}

impl<S> SettingsProvider for Arc<S>
where
    S: SettingsProvider + ?Sized,
{
    fn count_non_usable_as_outgoing(&self) -> bool {
        (**self).count_non_usable_as_outgoing()
    }

    fn allow_negative_stock(&self) -> bool {
        (**self).allow_negative_stock()
    }

    fn policy(&self) -> StockPolicy {
        (**self).policy()
    }
}

/// Policy flags that can be changed while the application runs.
#[derive(Debug, Default)]
pub struct RuntimeSettings {
    policy: RwLock<StockPolicy>,
}

impl RuntimeSettings {
    pub fn new(policy: StockPolicy) -> Self {
        Self {
            policy: RwLock::new(policy),
        }
    }

    pub fn set_policy(&self, policy: StockPolicy) {
        *self.policy.write().unwrap_or_else(PoisonError::into_inner) = policy;
    }

    pub fn set_count_non_usable_as_outgoing(&self, value: bool) {
        let mut policy = self.policy.write().unwrap_or_else(PoisonError::into_inner);
        policy.count_non_usable_as_outgoing = value;
    }

    pub fn set_allow_negative_stock(&self, value: bool) {
        let mut policy = self.policy.write().unwrap_or_else(PoisonError::into_inner);
        policy.allow_negative_stock = value;
    }
}

impl SettingsProvider for RuntimeSettings {
    fn count_non_usable_as_outgoing(&self) -> bool {
        self.policy().count_non_usable_as_outgoing
    }

    fn allow_negative_stock(&self) -> bool {
        self.policy().allow_negative_stock
    }

    fn policy(&self) -> StockPolicy {
        *self.policy.read().unwrap_or_else(PoisonError::into_inner)
    }
}

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("failed to load settings: {0}")]
    Load(#[from] ConfigError),

    #[error("invalid settings: {0}")]
    Invalid(String),
}

/// Remote backend connection settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct BackendSettings {
    pub url: String,
    pub api_key: String,
}

/// Application settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Settings {
    pub count_non_usable_as_outgoing: bool,
    pub allow_negative_stock: bool,
    /// First day of the week for date pickers/reports, 1 = Monday ... 7 = Sunday.
    pub week_start_day: u8,
    pub backend: BackendSettings,
}

impl Settings {
    pub const ENV_PREFIX: &'static str = "STOCKBOOK";
    pub const DEFAULT_FILE: &'static str = "stockbook";

    /// Load defaults, `stockbook.toml` (if present) and the environment.
    pub fn load() -> Result<Self, SettingsError> {
        Self::load_from(Self::DEFAULT_FILE)
    }

    /// Like [`Settings::load`] with an explicit file path. A missing file is not an error.
    pub fn load_from(path: &str) -> Result<Self, SettingsError> {
        let config = Self::defaults()?
            .add_source(File::with_name(path).required(false))
            .add_source(
                Environment::with_prefix(Self::ENV_PREFIX)
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;
        Self::finish(config)
    }

    /// Defaults overlaid with an inline TOML document (no file, no environment).
    pub fn from_toml_str(toml: &str) -> Result<Self, SettingsError> {
        let config = Self::defaults()?
            .add_source(File::from_str(toml, FileFormat::Toml))
            .build()?;
        Self::finish(config)
    }

    pub fn policy(&self) -> StockPolicy {
        StockPolicy::new(self.count_non_usable_as_outgoing, self.allow_negative_stock)
    }

    fn defaults() -> Result<ConfigBuilder<DefaultState>, ConfigError> {
        let defaults = StockPolicy::default();
        Config::builder()
            .set_default(
                "count_non_usable_as_outgoing",
                defaults.count_non_usable_as_outgoing,
            )?
            .set_default("allow_negative_stock", defaults.allow_negative_stock)?
            .set_default("week_start_day", 1_i64)?
            .set_default("backend.url", "https://your-project.supabase.co")?
            .set_default("backend.api_key", "")
    }

    fn finish(config: Config) -> Result<Self, SettingsError> {
        let settings: Settings = config.try_deserialize()?;
        settings.validate()?;
        tracing::debug!(
            count_non_usable_as_outgoing = settings.count_non_usable_as_outgoing,
            allow_negative_stock = settings.allow_negative_stock,
            backend_url = %settings.backend.url,
            "settings loaded"
        );
        Ok(settings)
    }

    fn validate(&self) -> Result<(), SettingsError> {
        if !(1..=7).contains(&self.week_start_day) {
            return Err(SettingsError::Invalid(format!(
                "week_start_day must be between 1 and 7 (got {})",
                self.week_start_day
            )));
        }
        if self.backend.url.trim().is_empty() {
            return Err(SettingsError::Invalid("backend.url cannot be empty".to_string()));
        }
        Ok(())
    }
}

impl SettingsProvider for Settings {
    fn count_non_usable_as_outgoing(&self) -> bool {
        self.count_non_usable_as_outgoing
    }

    fn allow_negative_stock(&self) -> bool {
        self.allow_negative_stock
    }
}
