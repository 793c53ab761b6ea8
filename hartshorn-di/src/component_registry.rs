//! Functionality related to discovering and registering components. Components are described by
//! [ComponentDescriptor]s collected in a [ComponentManifest] - either explicitly or through static
//! registration performed by `#[derive(Component)]`. Scanning the manifest binds every declared
//! binding of registered components in a [BindingRegistry].
//!
//! Scanning order:
//!
//! 1. duplicate ids are rejected
//! 2. disabled components are skipped
//! 3. unconditional components are registered in manifest order
//! 4. conditional components are evaluated by descending priority and registered if their
//! [condition](conditional) passes
//! 5. all `requires` keys of registered components are verified to be bound

pub mod conditional;

use crate::binding_registry::BindingRegistry;
use crate::component::Component;
use crate::component_registry::conditional::{
    ComponentCondition, ComponentRegistryFacade, ConditionContextFactory,
};
use crate::error::ScanError;
use crate::instance_provider::InstancePtr;
use crate::key::Key;
use crate::properties::PropertyStore;
use crate::provider::Provider;
use crate::scope::Scope;
use derivative::Derivative;
use fxhash::{FxHashMap, FxHashSet};
use itertools::Itertools;
use tracing::{debug, info};

/// A [Provider] declared by a component for a given [Key].
#[derive(Clone, Debug)]
pub struct BindingDeclaration {
    key: Key,
    provider: Provider,
}

impl BindingDeclaration {
    pub fn new(key: Key, provider: Provider) -> Self {
        Self { key, provider }
    }

    #[inline]
    pub fn key(&self) -> &Key {
        &self.key
    }

    #[inline]
    pub fn provider(&self) -> &Provider {
        &self.provider
    }
}

/// Description of a single component: its identity, descriptive metadata and the bindings it
/// contributes.
#[derive(Clone, Derivative)]
#[derivative(Debug)]
pub struct ComponentDescriptor {
    id: String,
    name: Option<String>,
    description: Option<String>,
    authors: Vec<String>,
    enabled: bool,
    bindings: Vec<BindingDeclaration>,
    requires: Vec<Key>,
    #[derivative(Debug = "ignore")]
    condition: Option<ComponentCondition>,
    priority: i8,
}

impl ComponentDescriptor {
    /// Creates an enabled descriptor without any bindings.
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: None,
            description: None,
            authors: Vec::new(),
            enabled: true,
            bindings: Vec::new(),
            requires: Vec::new(),
            condition: None,
            priority: 0,
        }
    }

    /// Creates a descriptor binding the component type itself in given scope.
    pub fn of<C: Component>(id: impl Into<String>, scope: Scope) -> Self {
        Self::new(id).binds(
            Key::of::<C>(),
            Provider::constructor(scope, C::create),
        )
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_author(mut self, author: impl Into<String>) -> Self {
        self.authors.push(author.into());
        self
    }

    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    /// Sets the registration condition. Please see [conditional].
    pub fn with_condition(mut self, condition: ComponentCondition) -> Self {
        self.condition = Some(condition);
        self
    }

    /// Sets the evaluation priority of the condition. Higher priorities are evaluated first.
    pub fn with_priority(mut self, priority: i8) -> Self {
        self.priority = priority;
        self
    }

    /// Declares an arbitrary binding.
    pub fn binds(mut self, key: Key, provider: Provider) -> Self {
        self.bindings.push(BindingDeclaration::new(key, provider));
        self
    }

    /// Exposes component `Target` as capability `Source`, qualified with the component id.
    pub fn provides<Source, Target, F>(self, cast: F) -> Self
    where
        Source: ?Sized + Send + Sync + 'static,
        Target: ?Sized + 'static,
        F: Fn(InstancePtr<Target>) -> InstancePtr<Source> + Send + Sync + 'static,
    {
        let key = Key::named::<Source>(self.id.clone());
        self.binds(key, Provider::alias(Key::of::<Target>(), cast))
    }

    /// Like [ComponentDescriptor::provides], but additionally makes this component the primary,
    /// unqualified binding of `Source`.
    pub fn provides_primary<Source, Target, F>(self, cast: F) -> Self
    where
        Source: ?Sized + Send + Sync + 'static,
        Target: ?Sized + 'static,
        F: Fn(InstancePtr<Target>) -> InstancePtr<Source> + Send + Sync + 'static,
    {
        let qualified = Key::named::<Source>(self.id.clone());
        self.provides(cast)
            .binds(Key::of::<Source>(), Provider::redirect(qualified))
    }

    /// Declares a key which must be bound once scanning finishes.
    pub fn requires(mut self, key: Key) -> Self {
        self.requires.push(key);
        self
    }

    /// Typed variant of [ComponentDescriptor::requires] for unqualified keys.
    #[inline]
    pub fn requires_type<T: ?Sized + 'static>(self) -> Self {
        self.requires(Key::of::<T>())
    }

    #[inline]
    pub fn id(&self) -> &str {
        &self.id
    }

    #[inline]
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    #[inline]
    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    #[inline]
    pub fn authors(&self) -> &[String] {
        &self.authors
    }

    #[inline]
    pub fn enabled(&self) -> bool {
        self.enabled
    }

    #[inline]
    pub fn bindings(&self) -> &[BindingDeclaration] {
        &self.bindings
    }

    #[inline]
    pub fn required_keys(&self) -> &[Key] {
        &self.requires
    }

    #[inline]
    pub fn condition(&self) -> Option<&ComponentCondition> {
        self.condition.as_ref()
    }

    #[inline]
    pub fn priority(&self) -> i8 {
        self.priority
    }
}

/// Ordered list of descriptors to scan.
#[derive(Clone, Debug, Default)]
pub struct ComponentManifest {
    descriptors: Vec<ComponentDescriptor>,
}

impl ComponentManifest {
    /// Creates a manifest with all components registered statically by `#[derive(Component)]`.
    pub fn from_static_components() -> Self {
        Self::default().with_static_components()
    }

    pub fn with_component(mut self, descriptor: ComponentDescriptor) -> Self {
        self.descriptors.push(descriptor);
        self
    }

    /// Appends all statically registered components.
    pub fn with_static_components(mut self) -> Self {
        self.descriptors.extend(
            inventory::iter::<internal::ComponentRegisterer>
                .into_iter()
                .map(|registerer| (registerer.register)()),
        );
        self
    }

    #[inline]
    pub fn descriptors(&self) -> &[ComponentDescriptor] {
        &self.descriptors
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.descriptors.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.descriptors.is_empty()
    }
}

impl FromIterator<ComponentDescriptor> for ComponentManifest {
    fn from_iter<T: IntoIterator<Item = ComponentDescriptor>>(iter: T) -> Self {
        Self {
            descriptors: iter.into_iter().collect(),
        }
    }
}

/// Registry of scanned components, queryable by id.
#[derive(Clone, Debug, Default)]
pub struct ComponentRegistry {
    components: Vec<ComponentDescriptor>,
    index: FxHashMap<String, usize>,
}

impl ComponentRegistry {
    /// Scans given manifest, binding declared bindings of all registered components.
    pub fn scan<CF: ConditionContextFactory + ?Sized>(
        manifest: ComponentManifest,
        bindings: &BindingRegistry,
        properties: &PropertyStore,
        context_factory: &CF,
    ) -> Result<Self, ScanError> {
        let mut ids = FxHashSet::default();
        for descriptor in manifest.descriptors() {
            if !ids.insert(descriptor.id()) {
                return Err(ScanError::DuplicateComponentId(descriptor.id.clone()));
            }
        }

        let (conditional, unconditional): (Vec<_>, Vec<_>) = manifest
            .descriptors
            .into_iter()
            .filter(|descriptor| {
                if !descriptor.enabled {
                    debug!(id = %descriptor.id, "Skipping disabled component.");
                }

                descriptor.enabled
            })
            .partition(|descriptor| descriptor.condition.is_some());

        let mut registry = Self::default();
        for descriptor in unconditional {
            registry.register(descriptor, bindings);
        }

        registry.register_conditional_components(conditional, bindings, properties, context_factory);
        registry.verify_requirements(bindings)?;

        info!(count = registry.components.len(), "Registered components.");

        Ok(registry)
    }

    fn register_conditional_components<CF: ConditionContextFactory + ?Sized>(
        &mut self,
        descriptors: Vec<ComponentDescriptor>,
        bindings: &BindingRegistry,
        properties: &PropertyStore,
        context_factory: &CF,
    ) {
        for descriptor in descriptors
            .into_iter()
            .sorted_by_key(|descriptor| -(descriptor.priority as i16))
        {
            let passed = match &descriptor.condition {
                Some(condition) => {
                    let facade = ScanFacade {
                        bindings,
                        properties,
                        registry: self,
                    };

                    let context = context_factory.create_context(&facade);
                    let passed = condition(context.as_ref(), &descriptor);
                    passed
                }
                None => true,
            };

            if passed {
                self.register(descriptor, bindings);
            } else {
                debug!(id = %descriptor.id, "Component condition not met.");
            }
        }
    }

    fn register(&mut self, descriptor: ComponentDescriptor, bindings: &BindingRegistry) {
        debug!(id = %descriptor.id, "Registering component.");

        for binding in &descriptor.bindings {
            bindings.bind(binding.key.clone(), binding.provider.clone());
        }

        self.index
            .insert(descriptor.id.clone(), self.components.len());
        self.components.push(descriptor);
    }

    fn verify_requirements(&self, bindings: &BindingRegistry) -> Result<(), ScanError> {
        for descriptor in &self.components {
            if let Some(key) = descriptor
                .requires
                .iter()
                .find(|key| !bindings.is_bound(key))
            {
                return Err(ScanError::MissingMandatoryBinding {
                    component: descriptor.id.clone(),
                    key: key.clone(),
                });
            }
        }

        Ok(())
    }

    #[inline]
    pub fn component(&self, id: &str) -> Option<&ComponentDescriptor> {
        self.index.get(id).map(|index| &self.components[*index])
    }

    /// Returns registered components in registration order.
    #[inline]
    pub fn components(&self) -> &[ComponentDescriptor] {
        &self.components
    }

    #[inline]
    pub fn contains(&self, id: &str) -> bool {
        self.index.contains_key(id)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.components.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.components.is_empty()
    }
}

struct ScanFacade<'a> {
    bindings: &'a BindingRegistry,
    properties: &'a PropertyStore,
    registry: &'a ComponentRegistry,
}

impl ComponentRegistryFacade for ScanFacade<'_> {
    fn is_bound(&self, key: &Key) -> bool {
        self.bindings.is_bound(key)
    }

    fn is_component_registered(&self, id: &str) -> bool {
        self.registry.contains(id)
    }

    fn property(&self, name: &str) -> Option<String> {
        self.properties.property(name).into_option()
    }
}

#[doc(hidden)]
pub mod internal {
    use crate::component_registry::ComponentDescriptor;
    use inventory::collect;
    pub use inventory::submit;

    pub struct ComponentRegisterer {
        pub register: fn() -> ComponentDescriptor,
    }

    collect!(ComponentRegisterer);
}
