//! The [ApplicationContext] is the entry point of dependency injection - it owns all bindings,
//! registered components, injection points, properties and the root [Context]. It is usually
//! created once at startup and shared as an `Arc`.
//!
//! ```
//! use hartshorn_di::application_context::ApplicationContextBuilder;
//! use hartshorn_di::key::Key;
//! use hartshorn_di::provider::Provider;
//!
//! let context = ApplicationContextBuilder::new()
//!     .with_property("greeting", "Hello")
//!     .build()
//!     .unwrap();
//!
//! context.bind(
//!     Key::of::<String>(),
//!     Provider::singleton(|instance_provider| {
//!         Ok(format!("{}!", instance_provider.property("greeting").or_else_get(String::new)))
//!     }),
//! );
//!
//! assert_eq!(*context.resolve::<String>().into_option().unwrap(), "Hello!");
//! ```

use crate::binding_registry::BindingRegistry;
use crate::component_registry::conditional::{
    ConditionContextFactory, SimpleConditionContextFactory,
};
use crate::component_registry::{ComponentDescriptor, ComponentManifest, ComponentRegistry};
use crate::context::{Context, ContextCarrier};
use crate::error::ScanError;
use crate::exceptional::Exceptional;
use crate::injection_point::{InjectionPointChain, InjectionPointPtr};
use crate::instance_provider::{ErrorPtr, InstancePtr, TypedInstanceProvider};
use crate::key::Key;
use crate::properties::{PropertySource, PropertyStore};
use crate::provider::Provider;
use crate::resolver::Resolver;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, info};

pub type PropertySourcePtr = Box<dyn PropertySource>;

pub type ConditionContextFactoryPtr = Box<dyn ConditionContextFactory>;

/// Builder for [ApplicationContext] with sensible defaults, for easy construction.
pub struct ApplicationContextBuilder {
    manifest: ComponentManifest,
    property_sources: Vec<PropertySourcePtr>,
    properties: Vec<(String, String)>,
    bindings: Vec<(Key, Provider)>,
    injection_points: Vec<InjectionPointPtr>,
    condition_context_factory: ConditionContextFactoryPtr,
}

impl Default for ApplicationContextBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ApplicationContextBuilder {
    /// Creates a new builder with an empty manifest.
    pub fn new() -> Self {
        Self {
            manifest: Default::default(),
            property_sources: Vec::new(),
            properties: Vec::new(),
            bindings: Vec::new(),
            injection_points: Vec::new(),
            condition_context_factory: Box::new(SimpleConditionContextFactory),
        }
    }

    /// Sets new component manifest.
    pub fn with_manifest(mut self, manifest: ComponentManifest) -> Self {
        self.manifest = manifest;
        self
    }

    /// Adds a component to the manifest.
    pub fn with_component(mut self, descriptor: ComponentDescriptor) -> Self {
        self.manifest = self.manifest.with_component(descriptor);
        self
    }

    /// Adds all components registered by `#[derive(Component)]` to the manifest.
    pub fn with_static_components(mut self) -> Self {
        self.manifest = self.manifest.with_static_components();
        self
    }

    /// Adds a property source. Sources are loaded in order, before scanning components.
    pub fn with_property_source(mut self, source: PropertySourcePtr) -> Self {
        self.property_sources.push(source);
        self
    }

    /// Sets a single property, overriding values from property sources.
    pub fn with_property(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.properties.push((name.into(), value.into()));
        self
    }

    /// Adds a binding registered before scanning, thus visible to component conditions.
    pub fn with_binding(mut self, key: Key, provider: Provider) -> Self {
        self.bindings.push((key, provider));
        self
    }

    /// Appends an injection point to the chain.
    pub fn with_injection_point(mut self, injection_point: InjectionPointPtr) -> Self {
        self.injection_points.push(injection_point);
        self
    }

    /// Sets new context factory for evaluating component conditions.
    pub fn with_condition_context_factory(mut self, factory: ConditionContextFactoryPtr) -> Self {
        self.condition_context_factory = factory;
        self
    }

    /// Builds resulting [ApplicationContext]. A failed component scan never yields a context.
    pub fn build(self) -> Result<ApplicationContext, ScanError> {
        let bindings = BindingRegistry::default();
        let properties = PropertyStore::default();

        for source in &self.property_sources {
            properties
                .load(source.as_ref())
                .map_err(|error| ScanError::PropertySourceFailed(error.to_string()))?;
        }

        for (name, value) in self.properties {
            properties.set(name, value);
        }

        for (key, provider) in self.bindings {
            bindings.bind(key, provider);
        }

        let components = ComponentRegistry::scan(
            self.manifest,
            &bindings,
            &properties,
            self.condition_context_factory.as_ref(),
        )?;

        let injection_points = InjectionPointChain::default();
        for injection_point in self.injection_points {
            injection_points.add(injection_point);
        }

        info!(
            components = components.len(),
            bindings = bindings.len(),
            "Application context created."
        );

        Ok(ApplicationContext {
            bindings,
            components,
            injection_points,
            properties,
            root: Arc::new(Context::default()),
            shut_down: AtomicBool::new(false),
        })
    }
}

/// Owner of all dependency injection state. Please see the module documentation for details.
pub struct ApplicationContext {
    bindings: BindingRegistry,
    components: ComponentRegistry,
    injection_points: InjectionPointChain,
    properties: PropertyStore,
    root: Arc<Context>,
    shut_down: AtomicBool,
}

impl ApplicationContext {
    /// Creates a context from all statically registered components.
    pub fn from_static_components() -> Result<Self, ScanError> {
        ApplicationContextBuilder::new()
            .with_static_components()
            .build()
    }

    /// Creates a new request-local resolver. Useful when resolving many instances at once.
    #[inline]
    pub fn resolver(&self) -> Resolver<'_> {
        Resolver::new(&self.bindings, &self.injection_points, &self.properties)
    }

    #[inline]
    pub fn resolve<T: ?Sized + 'static>(&self) -> Exceptional<InstancePtr<T>> {
        self.resolver().resolve::<T>()
    }

    #[inline]
    pub fn resolve_named<T: ?Sized + 'static>(
        &self,
        qualifier: &str,
    ) -> Exceptional<InstancePtr<T>> {
        self.resolver().resolve_named::<T>(qualifier)
    }

    #[inline]
    pub fn resolve_key<T: ?Sized + 'static>(&self, key: &Key) -> Exceptional<InstancePtr<T>> {
        self.resolver().resolve_key::<T>(key)
    }

    #[inline]
    pub fn resolve_required<T: ?Sized + 'static>(&self) -> Result<InstancePtr<T>, ErrorPtr> {
        self.resolver().resolve_required::<T>()
    }

    #[inline]
    pub fn resolve_all<T: ?Sized + 'static>(&self) -> Result<Vec<InstancePtr<T>>, ErrorPtr> {
        self.resolver().resolve_all::<T>()
    }

    /// Registers a provider, replacing any existing one for the same key.
    #[inline]
    pub fn bind(&self, key: Key, provider: Provider) -> bool {
        self.bindings.bind(key, provider)
    }

    #[inline]
    pub fn add_injection_point(&self, injection_point: InjectionPointPtr) {
        self.injection_points.add(injection_point);
    }

    /// Returns the most recently attached root context entry of type `T`.
    #[inline]
    pub fn get<T: ?Sized + 'static>(&self) -> Exceptional<InstancePtr<T>> {
        self.root.get::<T>()
    }

    #[inline]
    pub fn property(&self, name: &str) -> Exceptional<String> {
        self.properties.property(name)
    }

    #[inline]
    pub fn set_property(&self, name: impl Into<String>, value: impl Into<String>) {
        self.properties.set(name, value);
    }

    #[inline]
    pub fn components(&self) -> &ComponentRegistry {
        &self.components
    }

    #[inline]
    pub fn bindings(&self) -> &BindingRegistry {
        &self.bindings
    }

    #[inline]
    pub fn root_context(&self) -> &Arc<Context> {
        &self.root
    }

    /// Creates a context falling back to the root context.
    #[inline]
    pub fn create_child_context(&self) -> Context {
        Context::child_of(self.root.clone())
    }

    #[inline]
    pub fn is_shut_down(&self) -> bool {
        self.shut_down.load(Ordering::Acquire)
    }

    /// Disposes constructed singletons in reverse construction order and releases all state.
    /// Subsequent calls do nothing.
    pub fn shutdown(&self) {
        if self.shut_down.swap(true, Ordering::AcqRel) {
            return;
        }

        info!("Shutting down application context.");

        let disposed = self.bindings.dispose_singletons();
        debug!(disposed, "Disposed singletons.");

        self.root.clear();
        self.injection_points.clear();
        self.properties.clear();
        self.bindings.clear();
    }
}

impl ContextCarrier for ApplicationContext {
    #[inline]
    fn context(&self) -> &Context {
        &self.root
    }
}

impl Drop for ApplicationContext {
    fn drop(&mut self) {
        self.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use crate::application_context::{ApplicationContext, ApplicationContextBuilder};
    use crate::component_registry::ComponentDescriptor;
    use crate::context::ContextCarrier;
    use crate::error::ScanError;
    use crate::instance_provider::error_ptr;
    use crate::key::Key;
    use crate::properties::{MapPropertySource, MockPropertySource};
    use crate::provider::Provider;
    use parking_lot::Mutex;
    use std::sync::Arc;

    fn assert_send_sync<T: Send + Sync>() {}

    #[test]
    fn should_be_shareable() {
        assert_send_sync::<ApplicationContext>();
    }

    #[test]
    fn should_load_properties_before_scanning() {
        let context = ApplicationContextBuilder::new()
            .with_property_source(Box::new(
                MapPropertySource::default()
                    .with_property("mode", "file")
                    .with_property("factory.modified", "false"),
            ))
            .with_property("factory.modified", "true")
            .with_component(
                ComponentDescriptor::new("modified").with_condition(
                    crate::component_registry::conditional::property_enabled("factory.modified"),
                ),
            )
            .build()
            .unwrap();

        assert!(context.components().contains("modified"));
        assert_eq!(context.property("mode").into_option(), Some("file".to_string()));
        assert!(context.property("missing").absent());
    }

    #[test]
    fn should_fail_on_broken_property_source() {
        let mut source = MockPropertySource::new();
        source.expect_properties().times(1).returning(|| {
            Err(error_ptr(ScanError::DuplicateComponentId("x".to_string())))
        });

        assert!(matches!(
            ApplicationContextBuilder::new()
                .with_property_source(Box::new(source))
                .build(),
            Err(ScanError::PropertySourceFailed(_))
        ));
    }

    #[test]
    fn should_attach_to_root_context() {
        let context = ApplicationContextBuilder::new().build().unwrap();
        context.attach(7u8);

        assert_eq!(*context.get::<u8>().into_option().unwrap(), 7);

        let child = context.create_child_context();
        assert_eq!(*child.get::<u8>().into_option().unwrap(), 7);
    }

    #[test]
    fn should_dispose_once_on_shutdown() {
        let disposed = Arc::new(Mutex::new(Vec::new()));
        let context = ApplicationContextBuilder::new().build().unwrap();

        for value in [1u8, 2] {
            let disposed = disposed.clone();
            context.bind(
                Key::named::<u8>(value.to_string()),
                Provider::singleton(move |_| Ok(value)).with_disposer(move |value: &u8| {
                    disposed.lock().push(*value);
                }),
            );
        }

        context.resolve_named::<u8>("1").into_option().unwrap();
        context.resolve_named::<u8>("2").into_option().unwrap();

        context.shutdown();
        context.shutdown();

        assert!(context.is_shut_down());
        assert_eq!(*disposed.lock(), vec![2, 1]);
        assert!(context.resolve_named::<u8>("1").absent());
    }
}
