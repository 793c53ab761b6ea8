//! Framework configuration based on the [config] crate. Configuration is read from an optional
//! `hartshorn.json` file and environment variables prefixed with `HARTSHORN_` (nested names are
//! separated with `__`, e.g. `HARTSHORN_FACTORY__MODIFIED=true` becomes `factory.modified`).
//!
//! The same configuration serves two purposes:
//!
//! * [ApplicationConfig] configures the [Application](crate::application::Application) itself and
//!   is bound as an injectable instance.
//! * [ConfigPropertySource] flattens every scalar value into a dotted property name and feeds the
//!   application context property store, so components and registration conditions can consult
//!   them.

use config::builder::DefaultState;
use config::{Config, ConfigBuilder, ConfigError, Environment, File, Map, Source, Value, ValueKind};
use hartshorn_di::instance_provider::{error_ptr, ErrorPtr};
use hartshorn_di::properties::PropertySource;
use serde::Deserialize;
use tracing::debug;

const CONFIG_ENV_PREFIX: &str = "HARTSHORN";

const CONFIG_ENV_SEPARATOR: &str = "__";

/// Name of the default config file.
pub const CONFIG_FILE: &str = "hartshorn.json";

/// Creates a config builder with the default file and environment sources. Additional sources
/// added to the builder take precedence over the defaults.
pub fn default_config_builder() -> ConfigBuilder<DefaultState> {
    Config::builder()
        .add_source(File::with_name(CONFIG_FILE).required(false))
        .add_source(
            Environment::with_prefix(CONFIG_ENV_PREFIX)
                .prefix_separator("_")
                .separator(CONFIG_ENV_SEPARATOR),
        )
}

/// Framework configuration.
#[non_exhaustive]
#[derive(Clone, Debug)]
pub struct ApplicationConfig {
    /// Should a default tracing logger be installed in the scope of the application.
    pub install_tracing_logger: bool,
}

impl Default for ApplicationConfig {
    fn default() -> Self {
        Self {
            install_tracing_logger: true,
        }
    }
}

impl From<OptionalApplicationConfig> for ApplicationConfig {
    fn from(value: OptionalApplicationConfig) -> Self {
        let default = Self::default();
        Self {
            install_tracing_logger: value
                .install_tracing_logger
                .unwrap_or(default.install_tracing_logger),
        }
    }
}

impl TryFrom<&Config> for ApplicationConfig {
    type Error = ConfigError;

    fn try_from(config: &Config) -> Result<Self, Self::Error> {
        config
            .clone()
            .try_deserialize::<OptionalApplicationConfig>()
            .map(|config| config.into())
    }
}

#[derive(Deserialize)]
struct OptionalApplicationConfig {
    install_tracing_logger: Option<bool>,
}

/// [PropertySource] exposing a [Config] as flat properties. Nested tables are joined with `.` and
/// array elements are suffixed with their index, e.g. `servers[0]`. Empty values are skipped.
#[derive(Clone, Debug)]
pub struct ConfigPropertySource {
    config: Config,
}

impl ConfigPropertySource {
    pub fn new(config: Config) -> Self {
        Self { config }
    }

    /// Creates a source from the default file and environment sources.
    pub fn from_environment() -> Result<Self, ConfigError> {
        default_config_builder().build().map(Self::new)
    }
}

impl PropertySource for ConfigPropertySource {
    fn properties(&self) -> Result<Vec<(String, String)>, ErrorPtr> {
        let table = self.config.collect().map_err(error_ptr)?;

        let mut properties = Vec::new();
        flatten_table(None, table, &mut properties).map_err(error_ptr)?;
        properties.sort();

        debug!(count = properties.len(), "Flattened configuration.");

        Ok(properties)
    }
}

fn join(prefix: Option<&str>, name: &str) -> String {
    match prefix {
        Some(prefix) => format!("{prefix}.{name}"),
        None => name.to_string(),
    }
}

fn flatten_table(
    prefix: Option<&str>,
    table: Map<String, Value>,
    properties: &mut Vec<(String, String)>,
) -> Result<(), ConfigError> {
    for (name, value) in table {
        flatten_value(join(prefix, &name), value, properties)?;
    }

    Ok(())
}

fn flatten_value(
    name: String,
    value: Value,
    properties: &mut Vec<(String, String)>,
) -> Result<(), ConfigError> {
    match value.kind {
        ValueKind::Nil => Ok(()),
        ValueKind::Table(table) => flatten_table(Some(&name), table, properties),
        ValueKind::Array(values) => {
            for (index, value) in values.into_iter().enumerate() {
                flatten_value(format!("{name}[{index}]"), value, properties)?;
            }

            Ok(())
        }
        _ => {
            properties.push((name, value.into_string()?));
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::config::{ApplicationConfig, ConfigPropertySource};
    use config::{Config, File, FileFormat};
    use hartshorn_di::properties::PropertySource;

    fn json_config(json: &str) -> Config {
        Config::builder()
            .add_source(File::from_str(json, FileFormat::Json))
            .build()
            .unwrap()
    }

    #[test]
    fn should_flatten_nested_values() {
        let source = ConfigPropertySource::new(json_config(
            r#"{
                "factory": { "modified": true, "pool": { "size": 4 } },
                "servers": ["alpha", "beta"],
                "name": "demo",
                "missing": null
            }"#,
        ));

        assert_eq!(
            source.properties().unwrap(),
            vec![
                ("factory.modified".to_string(), "true".to_string()),
                ("factory.pool.size".to_string(), "4".to_string()),
                ("name".to_string(), "demo".to_string()),
                ("servers[0]".to_string(), "alpha".to_string()),
                ("servers[1]".to_string(), "beta".to_string()),
            ]
        );
    }

    #[test]
    fn should_use_default_application_config() {
        let config = ApplicationConfig::try_from(&json_config("{}")).unwrap();
        assert!(config.install_tracing_logger);

        let config =
            ApplicationConfig::try_from(&json_config(r#"{ "install_tracing_logger": false }"#))
                .unwrap();
        assert!(!config.install_tracing_logger);
    }
}
