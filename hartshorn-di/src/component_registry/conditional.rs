//! Conditional component registration support.
//!
//! Conditions are evaluated during scanning, after all unconditional components are registered,
//! in order of descending priority. Each condition sees the state of the registry at the moment
//! of its evaluation, including components registered by earlier conditions.

use crate::component_registry::ComponentDescriptor;
use crate::key::Key;
#[cfg(test)]
use mockall::automock;
use std::sync::Arc;

/// A read-only facade of the registry being scanned, safe to use in registration conditions.
#[cfg_attr(test, automock)]
pub trait ComponentRegistryFacade {
    /// Checks if given key is already bound.
    fn is_bound(&self, key: &Key) -> bool;

    /// Checks if a component with given id is already registered.
    fn is_component_registered(&self, id: &str) -> bool;

    /// Returns the value of a configuration property.
    fn property(&self, name: &str) -> Option<String>;
}

/// Context information for use by condition implementations.
pub trait ConditionContext {
    /// Returns the registry for which the conditional evaluation is taking place.
    fn registry(&self) -> &dyn ComponentRegistryFacade;
}

/// Factory for contexts for conditional component registration.
pub trait ConditionContextFactory {
    /// Creates a new context when starting evaluation.
    fn create_context<'a>(
        &self,
        registry: &'a dyn ComponentRegistryFacade,
    ) -> Box<dyn ConditionContext + 'a>;
}

/// Registration condition which should pass to let given [ComponentDescriptor] be registered.
pub type ComponentCondition =
    Arc<dyn Fn(&dyn ConditionContext, &ComponentDescriptor) -> bool + Send + Sync>;

struct SimpleConditionContext<'a> {
    registry: &'a dyn ComponentRegistryFacade,
}

impl ConditionContext for SimpleConditionContext<'_> {
    fn registry(&self) -> &dyn ComponentRegistryFacade {
        self.registry
    }
}

/// Factory producing contexts containing only the necessary data and nothing more.
#[derive(Default, Debug, Copy, Clone, Eq, PartialEq)]
pub struct SimpleConditionContextFactory;

impl ConditionContextFactory for SimpleConditionContextFactory {
    fn create_context<'a>(
        &self,
        registry: &'a dyn ComponentRegistryFacade,
    ) -> Box<dyn ConditionContext + 'a> {
        Box::new(SimpleConditionContext { registry })
    }
}

/// Simple condition returning true if the given type is already bound without a qualifier.
pub fn bound<T: ?Sized + 'static>(
    context: &dyn ConditionContext,
    _descriptor: &ComponentDescriptor,
) -> bool {
    context.registry().is_bound(&Key::of::<T>())
}

/// Simple condition returning true if the given type is not bound yet.
pub fn unbound<T: ?Sized + 'static>(
    context: &dyn ConditionContext,
    descriptor: &ComponentDescriptor,
) -> bool {
    !bound::<T>(context, descriptor)
}

/// Returns true if none of the keys declared by the component is bound yet. Useful for fallback
/// components, which should only fill in gaps.
pub fn unbound_bindings(context: &dyn ConditionContext, descriptor: &ComponentDescriptor) -> bool {
    let registry = context.registry();
    !descriptor
        .bindings()
        .iter()
        .any(|binding| registry.is_bound(binding.key()))
}

/// Creates a condition checking if given property has the expected value.
pub fn property_equals(name: impl Into<String>, value: impl Into<String>) -> ComponentCondition {
    let name = name.into();
    let value = value.into();

    Arc::new(move |context: &dyn ConditionContext, _: &ComponentDescriptor| {
        context.registry().property(&name).as_deref() == Some(value.as_str())
    })
}

/// Creates a condition checking if given property is set to `true`.
#[inline]
pub fn property_enabled(name: impl Into<String>) -> ComponentCondition {
    property_equals(name, "true")
}
