use crate::instance_provider::ErrorPtr;
use crate::key::Key;
use std::any::Any;
use thiserror::Error;

/// Errors related to resolving instances. These never escape a resolution as a panic - they are
/// carried as the cause of a failed [Exceptional](crate::exceptional::Exceptional).
#[derive(Error, Clone, Debug)]
pub enum ResolutionError {
    #[error("No binding available for mandatory capability: {0}")]
    MissingMandatory(Key),
    #[error("Ambiguous constructor selection for {key}: {candidates} candidates satisfy {arity} parameters")]
    AmbiguousBinding {
        key: Key,
        arity: usize,
        candidates: usize,
    },
    #[error("None of the constructor candidates for {0} can be satisfied")]
    UnsatisfiedConstructor(Key),
    #[error("Dependency cycle detected: {}", .0.join(" -> "))]
    DependencyCycle(Vec<String>),
    #[error("Alias cycle detected: {}", .0.join(" -> "))]
    AliasCycle(Vec<String>),
    #[error("Instance bound to {key} is incompatible with requested type: {requested}")]
    IncompatibleInstance { key: Key, requested: &'static str },
    #[error("Error constructing {key}: {cause}")]
    ConstructionFailed { key: Key, cause: ErrorPtr },
    #[error("Constructor for {key} panicked: {message}")]
    ConstructionPanicked { key: Key, message: String },
    #[error("Injection point rejected instance of {key}: {cause}")]
    InterceptorFailed { key: Key, cause: ErrorPtr },
}

/// Fatal errors found while scanning components at startup.
#[derive(Error, Clone, Eq, PartialEq, Debug)]
pub enum ScanError {
    #[error("Attempted to register a duplicated component with id: {0}")]
    DuplicateComponentId(String),
    #[error("Component '{component}' requires a binding for {key}, but none is registered")]
    MissingMandatoryBinding { component: String, key: Key },
    #[error("Error loading properties: {0}")]
    PropertySourceFailed(String),
}

/// Cause captured when a closure run by
/// [Exceptional::capture](crate::exceptional::Exceptional::capture) panics.
#[derive(Error, Clone, Debug)]
#[error("{0}")]
pub struct CapturedPanic(pub String);

impl CapturedPanic {
    pub(crate) fn from_payload(payload: Box<dyn Any + Send>) -> Self {
        let message = if let Some(message) = payload.downcast_ref::<&str>() {
            message.to_string()
        } else if let Some(message) = payload.downcast_ref::<String>() {
            message.clone()
        } else {
            "unknown panic payload".to_string()
        };

        Self(message)
    }
}
