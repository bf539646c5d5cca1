pub mod types;

pub use types::*;

use crate::registry::InstrumentRegistry;
use crate::trade::ExchangeCode;
use anyhow::{Context, Result};
use config::{Config as ConfigLoader, Environment, File};
use std::collections::HashSet;
use std::path::Path;

/// Prefix for environment overrides, e.g. `BOURSE__ASX__BROKERAGE_CENTS=7`
pub const ENV_PREFIX: &str = "BOURSE";

impl Config {
    /// Load configuration: built-in defaults, then the TOML file if one is
    /// given, then `BOURSE__`-prefixed environment variables.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let asx = ExchangeSettings::for_exchange(ExchangeCode::Asx);
        let cxa = ExchangeSettings::for_exchange(ExchangeCode::Cxa);

        let mut builder = ConfigLoader::builder()
            // Start with default values
            .set_default("logging.level", "info")?
            .set_default("logging.json", false)?
            .set_default("market.instruments", MarketConfig::default().instruments)?
            .set_default("asx.brokerage_cents", i64::from(asx.brokerage_cents))?
            .set_default("asx.journal_path", path_default(&asx.journal_path))?
            .set_default("asx.lock_path", path_default(&asx.lock_path))?
            .set_default("cxa.brokerage_cents", i64::from(cxa.brokerage_cents))?
            .set_default("cxa.journal_path", path_default(&cxa.journal_path))?
            .set_default("cxa.lock_path", path_default(&cxa.lock_path))?;

        // Load from TOML file
        if let Some(path) = path {
            builder = builder.add_source(File::from(path));
        }

        let config = builder
            // Override with environment variables (BOURSE__)
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .context("Failed to build configuration")?;

        // Deserialize into Config struct
        let cfg: Config = config
            .try_deserialize()
            .context("Failed to deserialize configuration")?;

        // Validate configuration
        cfg.validate()?;

        Ok(cfg)
    }

    /// Settings for one exchange
    pub fn exchange(&self, code: ExchangeCode) -> &ExchangeSettings {
        match code {
            ExchangeCode::Asx => &self.asx,
            ExchangeCode::Cxa => &self.cxa,
        }
    }

    /// The configured instrument registry
    pub fn registry(&self) -> Result<InstrumentRegistry> {
        InstrumentRegistry::new(&self.market.instruments)
            .context("Invalid market.instruments")
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        // Validate log level
        let valid_log_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_log_levels.contains(&self.logging.level.as_str()) {
            anyhow::bail!(
                "Invalid log level '{}', must be one of: {:?}",
                self.logging.level,
                valid_log_levels
            );
        }

        self.registry()?;

        // Each exchange owns its journal and lock outright
        let mut seen = HashSet::new();
        for code in ExchangeCode::ALL {
            let settings = self.exchange(code);
            if settings.journal_path == settings.lock_path {
                anyhow::bail!(
                    "{} journal and lock cannot share the path {}",
                    code,
                    settings.journal_path.display()
                );
            }
            for path in [&settings.journal_path, &settings.lock_path] {
                if !seen.insert(path) {
                    anyhow::bail!(
                        "{} path {} is already used by another exchange",
                        code,
                        path.display()
                    );
                }
            }
        }

        Ok(())
    }
}

fn path_default(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::path::PathBuf;
    use tempfile::NamedTempFile;

    fn write_toml(contents: &str) -> NamedTempFile {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_defaults_without_file() {
        let config = Config::load(None).unwrap();
        assert_eq!(config.logging.level, "info");
        assert_eq!(config.market.instruments, vec!["QAN", "CBA", "NAB"]);
        assert_eq!(config.asx.journal_path, PathBuf::from("data/asx_journal.csv"));
        assert_eq!(config.asx.lock_path, PathBuf::from("data/asx_journal.lock"));
        assert_eq!(config.cxa.journal_path, PathBuf::from("data/cxa_journal.csv"));
        assert_eq!(config.asx.brokerage_cents, DEFAULT_BROKERAGE_CENTS);
    }

    #[test]
    fn test_default_impl_matches_loader_defaults() {
        let defaults = Config::default();
        assert!(defaults.validate().is_ok());
        assert_eq!(defaults.exchange(ExchangeCode::Cxa), &defaults.cxa);
        assert_eq!(defaults.asx, ExchangeSettings::for_exchange(ExchangeCode::Asx));
    }

    #[test]
    fn test_file_overrides_defaults() {
        let file = write_toml(
            r#"
[market]
instruments = ["BHP", "WES"]

[asx]
brokerage_cents = 3
journal_path = "/tmp/bourse/asx.csv"
lock_path = "/tmp/bourse/asx.lock"
"#,
        );

        let config = Config::load(Some(file.path())).unwrap();
        assert_eq!(config.asx.brokerage_cents, 3);
        assert_eq!(config.asx.journal_path, PathBuf::from("/tmp/bourse/asx.csv"));
        // untouched sections keep their defaults
        assert_eq!(config.cxa.journal_path, PathBuf::from("data/cxa_journal.csv"));

        let registry = config.registry().unwrap();
        assert!(registry.contains("BHP"));
        assert!(!registry.contains("CBA"));
    }

    #[test]
    fn test_missing_file_is_an_error() {
        let dir = tempfile::TempDir::new().unwrap();
        assert!(Config::load(Some(&dir.path().join("absent.toml"))).is_err());
    }

    #[test]
    fn test_negative_brokerage_rejected() {
        let file = write_toml("[cxa]\nbrokerage_cents = -1\n");
        assert!(Config::load(Some(file.path())).is_err());
    }

    #[test]
    fn test_env_override() {
        std::env::set_var("BOURSE__LOGGING__JSON", "true");
        let config = Config::load(None);
        std::env::remove_var("BOURSE__LOGGING__JSON");
        assert!(config.unwrap().logging.json);
    }

    #[test]
    fn test_config_validation() {
        let mut config = Config::default();
        assert!(config.validate().is_ok());

        // Invalid log level
        config.logging.level = "loud".to_string();
        assert!(config.validate().is_err());
        config.logging.level = "debug".to_string();

        // Journal doubling as its own lock
        config.asx.lock_path = config.asx.journal_path.clone();
        assert!(config.validate().is_err());
        config.asx = ExchangeSettings::for_exchange(ExchangeCode::Asx);

        // Two exchanges sharing a journal
        config.cxa.journal_path = config.asx.journal_path.clone();
        assert!(config.validate().is_err());
        config.cxa = ExchangeSettings::for_exchange(ExchangeCode::Cxa);

        // Lock of one exchange is the journal of the other
        config.cxa.lock_path = config.asx.journal_path.clone();
        assert!(config.validate().is_err());
        config.cxa = ExchangeSettings::for_exchange(ExchangeCode::Cxa);

        // Instruments that cannot round-trip through the journal
        config.market.instruments = vec!["cba".to_string()];
        assert!(config.validate().is_err());
        config.market.instruments.clear();
        assert!(config.validate().is_err());
    }
}
