//! Core application framework functionality.

use crate::config::{default_config_builder, ApplicationConfig, ConfigPropertySource};
use crate::runner::ApplicationRunnerPtr;
use config::ConfigError;
use derive_more::Constructor;
use hartshorn_di::application_context::{ApplicationContext, ApplicationContextBuilder};
use hartshorn_di::error::ScanError;
use hartshorn_di::instance_provider::ErrorPtr;
use hartshorn_di::key::Key;
use hartshorn_di::provider::Provider;
use std::cmp::Reverse;
use thiserror::Error;
use tracing::info;
use tracing_subscriber::EnvFilter;

const DEFAULT_LOG_FILTER: &str = "info";

#[derive(Error, Debug)]
pub enum ApplicationError {
    #[error("Error loading configuration: {0}")]
    Config(#[from] ConfigError),
    #[error("Error creating application context: {0}")]
    Scan(#[from] ScanError),
    #[error("Error retrieving runners: {0}")]
    RunnerInjection(ErrorPtr),
    #[error("Runner error: {0}")]
    Runner(ErrorPtr),
}

/// Creates an [Application] with statically registered components and configuration read from
/// the default sources (see [config](crate::config)).
pub fn create_default() -> Result<Application, ApplicationError> {
    create_with_builder(ApplicationContextBuilder::new().with_static_components())
}

/// Creates an [Application] using a preconfigured context builder, e.g. with an explicit
/// component manifest. Configuration from the default sources is added to the builder and
/// [ApplicationConfig] is bound as an injectable instance.
pub fn create_with_builder(
    builder: ApplicationContextBuilder,
) -> Result<Application, ApplicationError> {
    let config = default_config_builder().build()?;
    let application_config = ApplicationConfig::try_from(&config)?;

    let context = builder
        .with_property_source(Box::new(ConfigPropertySource::new(config)))
        .with_binding(
            Key::of::<ApplicationConfig>(),
            Provider::instance(application_config.clone()),
        )
        .build()?;

    Ok(Application::new(context, application_config))
}

/// Main entrypoint for the application. Bootstraps the application and runs
/// [ApplicationRunners](crate::runner::ApplicationRunner).
#[derive(Constructor)]
pub struct Application {
    context: ApplicationContext,
    config: ApplicationConfig,
}

impl Application {
    #[inline]
    pub fn context(&self) -> &ApplicationContext {
        &self.context
    }

    /// Runs all runners in descending priority order and shuts the context down afterwards,
    /// regardless of the outcome. The first failing runner aborts the run.
    pub fn run(&self) -> Result<(), ApplicationError> {
        let result = if self.config.install_tracing_logger {
            let subscriber = tracing_subscriber::fmt()
                .with_env_filter(
                    EnvFilter::try_from_default_env()
                        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER)),
                )
                .finish();

            tracing::subscriber::with_default(subscriber, || self.run_runners())
        } else {
            self.run_runners()
        };

        self.context.shutdown();
        result
    }

    fn run_runners(&self) -> Result<(), ApplicationError> {
        info!("Searching for application runners...");

        let mut runners = self
            .context
            .resolve_all::<ApplicationRunnerPtr>()
            .map_err(ApplicationError::RunnerInjection)?;

        runners.sort_by_key(|runner| Reverse(runner.priority()));

        info!(count = runners.len(), "Running application runners...");

        for runner in &runners {
            runner.run().map_err(ApplicationError::Runner)?;
        }

        Ok(())
    }
}
