//! Functionality related to registering [Provider]s for [Key]s. Bindings can be registered
//! automatically by the [component scanner](crate::component_registry) or manually, at any time -
//! registering a binding for an already bound key replaces its provider.

use crate::instance_provider::AnyInstancePtr;
use crate::key::Key;
use crate::provider::{DisposeFunction, Provider};
use crate::scope::{InitializationTracker, Scope, SingletonCell};
use derivative::Derivative;
use fxhash::FxHashMap;
use parking_lot::{Mutex, RwLock};
use std::any::TypeId;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use tracing::{debug, warn};

/// Association between a [Key] and a [Provider]. Singleton instances are cached in the binding
/// itself, so replacing a binding never touches instances created by the previous one.
#[derive(Derivative)]
#[derivative(Debug)]
pub struct Binding {
    key: Key,
    provider: Provider,
    #[derivative(Debug = "ignore")]
    singleton: SingletonCell,
    // (singleton source, intercepted alias instance)
    #[derivative(Debug = "ignore")]
    alias_instance: Mutex<Option<(AnyInstancePtr, AnyInstancePtr)>>,
}

impl Binding {
    fn new(key: Key, provider: Provider) -> Self {
        Self {
            key,
            provider,
            singleton: Default::default(),
            alias_instance: Default::default(),
        }
    }

    #[inline]
    pub fn key(&self) -> &Key {
        &self.key
    }

    #[inline]
    pub fn provider(&self) -> &Provider {
        &self.provider
    }

    #[inline]
    pub fn scope(&self) -> Scope {
        self.provider.scope()
    }

    #[inline]
    pub(crate) fn singleton(&self) -> &SingletonCell {
        &self.singleton
    }

    /// Returns the instance this alias produced for the given singleton source, if any.
    pub(crate) fn alias_instance(&self, source: &AnyInstancePtr) -> Option<AnyInstancePtr> {
        self.alias_instance
            .lock()
            .as_ref()
            .filter(|(cached, _)| Arc::ptr_eq(cached, source))
            .map(|(_, instance)| instance.clone())
    }

    /// Remembers the instance this alias produced for a singleton source. When another thread
    /// already stored an instance for the same source, that one is kept and returned.
    pub(crate) fn store_alias_instance(
        &self,
        source: AnyInstancePtr,
        instance: AnyInstancePtr,
    ) -> AnyInstancePtr {
        let mut alias_instance = self.alias_instance.lock();
        match alias_instance.as_ref() {
            Some((cached, existing)) if Arc::ptr_eq(cached, &source) => existing.clone(),
            _ => {
                *alias_instance = Some((source, instance.clone()));
                instance
            }
        }
    }
}

struct ConstructedSingleton {
    key: Key,
    instance: AnyInstancePtr,
    disposer: DisposeFunction,
}

#[derive(Default)]
struct BindingMap {
    bindings: FxHashMap<Key, Arc<Binding>>,
    keys_by_type: FxHashMap<TypeId, Vec<Key>>,
}

/// Thread-safe map from [Key] to [Binding]. Reads vastly outnumber writes after startup, hence the
/// reader-writer lock.
#[derive(Default, Derivative)]
#[derivative(Debug)]
pub struct BindingRegistry {
    #[derivative(Debug = "ignore")]
    bindings: RwLock<BindingMap>,
    #[derivative(Debug = "ignore")]
    constructed: Mutex<Vec<ConstructedSingleton>>,
    #[derivative(Debug = "ignore")]
    initializations: InitializationTracker,
}

impl BindingRegistry {
    /// Registers a provider for given key, replacing any existing one. Returns `true` if a
    /// binding was replaced.
    pub fn bind(&self, key: Key, provider: Provider) -> bool {
        debug!(key = %key, scope = %provider.scope(), "Binding provider.");

        let binding = Arc::new(Binding::new(key.clone(), provider));
        let mut map = self.bindings.write();

        if map.bindings.insert(key.clone(), binding).is_some() {
            debug!(key = %key, "Replaced existing binding.");
            true
        } else {
            map.keys_by_type
                .entry(key.type_id())
                .or_default()
                .push(key);
            false
        }
    }

    /// Removes the binding for given key. Already created instances are not affected.
    pub fn unbind(&self, key: &Key) -> bool {
        let mut map = self.bindings.write();
        if map.bindings.remove(key).is_none() {
            return false;
        }

        if let Some(keys) = map.keys_by_type.get_mut(&key.type_id()) {
            keys.retain(|existing| existing != key);
        }

        true
    }

    #[inline]
    pub fn binding(&self, key: &Key) -> Option<Arc<Binding>> {
        self.bindings.read().bindings.get(key).cloned()
    }

    #[inline]
    pub fn is_bound(&self, key: &Key) -> bool {
        self.bindings.read().bindings.contains_key(key)
    }

    /// Returns all keys bound for the given capability type, in registration order.
    pub fn keys_of(&self, type_id: TypeId) -> Vec<Key> {
        self.bindings
            .read()
            .keys_by_type
            .get(&type_id)
            .cloned()
            .unwrap_or_default()
    }

    /// Returns all bound keys.
    pub fn keys(&self) -> Vec<Key> {
        self.bindings.read().bindings.keys().cloned().collect()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.bindings.read().bindings.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    #[inline]
    pub(crate) fn initializations(&self) -> &InitializationTracker {
        &self.initializations
    }

    pub(crate) fn record_singleton(&self, binding: &Binding, instance: &AnyInstancePtr) {
        if let Some(disposer) = binding.provider().disposer() {
            self.constructed.lock().push(ConstructedSingleton {
                key: binding.key().clone(),
                instance: instance.clone(),
                disposer: disposer.clone(),
            });
        }
    }

    /// Disposes constructed singletons in reverse construction order. Returns the number of
    /// disposed instances.
    pub(crate) fn dispose_singletons(&self) -> usize {
        let constructed = std::mem::take(&mut *self.constructed.lock());
        let count = constructed.len();

        for singleton in constructed.into_iter().rev() {
            debug!(key = %singleton.key, "Disposing singleton.");

            if catch_unwind(AssertUnwindSafe(|| (singleton.disposer)(&singleton.instance)))
                .is_err()
            {
                warn!(key = %singleton.key, "Singleton disposer panicked.");
            }
        }

        count
    }

    pub(crate) fn clear(&self) {
        let mut map = self.bindings.write();
        map.bindings.clear();
        map.keys_by_type.clear();
    }
}

#[cfg(test)]
mod tests {
    use crate::binding_registry::BindingRegistry;
    use crate::instance_provider::{erase, InstancePtr};
    use crate::key::Key;
    use crate::provider::Provider;
    use crate::scope::Scope;
    use parking_lot::Mutex;
    use std::any::TypeId;
    use std::sync::Arc;

    #[test]
    fn should_register_binding() {
        let registry = BindingRegistry::default();
        assert!(!registry.bind(Key::of::<u8>(), Provider::instance(1u8)));

        assert!(registry.is_bound(&Key::of::<u8>()));
        assert!(!registry.is_bound(&Key::named::<u8>("other")));
        assert_eq!(
            registry.binding(&Key::of::<u8>()).unwrap().scope(),
            Scope::Fixed
        );
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn should_override_binding() {
        let registry = BindingRegistry::default();
        registry.bind(Key::of::<u8>(), Provider::instance(1u8));
        assert!(registry.bind(Key::of::<u8>(), Provider::factory(|_| Ok(2u8))));

        assert_eq!(
            registry.binding(&Key::of::<u8>()).unwrap().scope(),
            Scope::Factory
        );
        assert_eq!(registry.keys_of(TypeId::of::<u8>()).len(), 1);
    }

    #[test]
    fn should_list_qualified_keys_in_order() {
        let registry = BindingRegistry::default();
        registry.bind(Key::named::<u8>("b"), Provider::instance(1u8));
        registry.bind(Key::named::<u8>("a"), Provider::instance(2u8));
        registry.bind(Key::of::<i8>(), Provider::instance(3i8));

        assert_eq!(
            registry.keys_of(TypeId::of::<u8>()),
            vec![Key::named::<u8>("b"), Key::named::<u8>("a")]
        );

        assert!(registry.unbind(&Key::named::<u8>("b")));
        assert!(!registry.unbind(&Key::named::<u8>("b")));
        assert_eq!(
            registry.keys_of(TypeId::of::<u8>()),
            vec![Key::named::<u8>("a")]
        );
    }

    #[test]
    fn should_dispose_in_reverse_order() {
        let disposed = Arc::new(Mutex::new(Vec::new()));
        let registry = BindingRegistry::default();

        for value in [1u8, 2, 3] {
            let disposed = disposed.clone();
            let key = Key::named::<u8>(value.to_string());
            registry.bind(
                key.clone(),
                Provider::singleton(move |_| Ok(value)).with_disposer(move |value: &u8| {
                    disposed.lock().push(*value);
                }),
            );

            let binding = registry.binding(&key).unwrap();
            registry.record_singleton(&binding, &erase(InstancePtr::new(value)));
        }

        assert_eq!(registry.dispose_singletons(), 3);
        assert_eq!(*disposed.lock(), vec![3, 2, 1]);
        assert_eq!(registry.dispose_singletons(), 0);
    }
}
