use anyhow::{Context, Result};
use config::{Config, ConfigError, Environment, File as ConfigFile};
use notary_registry::RegistryPolicy;
use std::path::{Path, PathBuf};

/// Configuration file picked up from the working directory when `--config`
/// is not given.
pub const DEFAULT_CONFIG_FILE: &str = "notary.toml";
pub const DEFAULT_STATE_FILE: &str = "notary-state.json";
pub const DEFAULT_LOG_LEVEL: &str = "warn";
pub const DEFAULT_LOG_FORMAT: &str = "pretty";

const LOG_FORMATS: [&str; 2] = ["pretty", "json"];

/// Resolved CLI configuration.
///
/// Layers, lowest precedence first: built-in defaults, the TOML file,
/// `NOTARY_*` environment variables, then command-line flags (see
/// [`AppConfig::apply_overrides`]). Nested policy keys use a double
/// underscore in the environment, e.g. `NOTARY_POLICY__RESOLVER=owner`.
#[derive(Debug, Clone, PartialEq)]
pub struct AppConfig {
    pub state_path: PathBuf,
    pub log_level: String,
    pub log_format: String,
    pub policy: RegistryPolicy,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            state_path: PathBuf::from(DEFAULT_STATE_FILE),
            log_level: DEFAULT_LOG_LEVEL.to_string(),
            log_format: DEFAULT_LOG_FORMAT.to_string(),
            policy: RegistryPolicy::default(),
        }
    }
}

/// Command-line values that win over every other layer.
#[derive(Debug, Default, Clone)]
pub struct Overrides {
    pub state_path: Option<PathBuf>,
    pub log_level: Option<String>,
    pub log_format: Option<String>,
}

impl AppConfig {
    pub fn load(config_path_override: Option<&Path>) -> Result<Self> {
        let resolved_path = if let Some(path) = config_path_override {
            if !path.exists() {
                anyhow::bail!(
                    "Configuration file {} not found (specified via --config)",
                    path.display()
                );
            }
            Some(path.to_path_buf())
        } else {
            let path = PathBuf::from(DEFAULT_CONFIG_FILE);
            path.exists().then_some(path)
        };

        Self::from_sources(resolved_path.as_deref(), Some(environment()))
    }

    fn from_sources(path: Option<&Path>, env: Option<Environment>) -> Result<Self> {
        let mut builder = Config::builder();

        if let Some(path) = path {
            builder = builder.add_source(ConfigFile::from(path));
        }
        if let Some(env) = env {
            builder = builder.add_source(env);
        }

        let config = builder.build().context("failed to read configuration")?;
        let defaults = AppConfig::default();

        let policy = match config.get::<RegistryPolicy>("policy") {
            Ok(policy) => policy,
            Err(ConfigError::NotFound(_)) => defaults.policy,
            Err(err) => return Err(err).context("invalid [policy] section"),
        };

        let app = AppConfig {
            state_path: config
                .get_string("state_path")
                .map(PathBuf::from)
                .unwrap_or(defaults.state_path),
            log_level: config
                .get_string("log_level")
                .unwrap_or(defaults.log_level),
            log_format: config
                .get_string("log_format")
                .unwrap_or(defaults.log_format),
            policy,
        };
        app.validate()?;
        Ok(app)
    }

    pub fn apply_overrides(&mut self, overrides: &Overrides) -> Result<()> {
        if let Some(state_path) = &overrides.state_path {
            self.state_path = state_path.clone();
        }
        if let Some(log_level) = &overrides.log_level {
            self.log_level = log_level.clone();
        }
        if let Some(log_format) = &overrides.log_format {
            self.log_format = log_format.clone();
        }
        self.validate()
    }

    fn validate(&self) -> Result<()> {
        if !LOG_FORMATS.contains(&self.log_format.as_str()) {
            anyhow::bail!(
                "unsupported log_format {:?} (expected one of {:?})",
                self.log_format,
                LOG_FORMATS
            );
        }
        if self.state_path.as_os_str().is_empty() {
            anyhow::bail!("state_path must not be empty");
        }
        Ok(())
    }
}

fn environment() -> Environment {
    Environment::with_prefix("NOTARY")
        .prefix_separator("_")
        .separator("__")
        .list_separator(",")
        .with_list_parse_key("policy.arbitrators")
        .try_parsing(true)
}
