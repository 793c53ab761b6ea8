//! Runners executing actual application logic.

#[cfg(test)]
use mockall::automock;
pub use hartshorn_di::instance_provider::ErrorPtr;

pub type ApplicationRunnerPtr = dyn ApplicationRunner + Send + Sync;

/// Runs application logic. Runners are run by the [Application](crate::application::Application)
/// and are discovered through bindings of [ApplicationRunnerPtr], e.g. by deriving a component with
/// `provides = ["dyn ApplicationRunner + Send + Sync"]`.
#[cfg_attr(test, automock)]
pub trait ApplicationRunner {
    /// Runs any application code.
    fn run(&self) -> Result<(), ErrorPtr>;

    /// Returns the priority for this runner. Higher priorities get run first. Default 0.
    fn priority(&self) -> i8 {
        0
    }
}
