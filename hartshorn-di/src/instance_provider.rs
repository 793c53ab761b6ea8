use crate::error::ResolutionError;
use crate::exceptional::Exceptional;
use crate::key::Key;
use std::any::{type_name, Any, TypeId};
use std::error::Error;
use std::sync::Arc;

pub type InstancePtr<T> = Arc<T>;

/// Type-erased instance. The erased value is always an [InstancePtr] of the bound capability, which
/// allows unsized capabilities like `dyn Trait` to survive erasure.
pub type AnyInstancePtr = Arc<dyn Any + Send + Sync + 'static>;

pub type ErrorPtr = Arc<dyn Error + Send + Sync + 'static>;

/// Converts an instance to its erased form.
#[inline]
pub fn erase<T: ?Sized + Send + Sync + 'static>(instance: InstancePtr<T>) -> AnyInstancePtr {
    Arc::new(instance) as AnyInstancePtr
}

/// Recovers a typed instance from its erased form, if the types match.
#[inline]
pub fn unerase<T: ?Sized + 'static>(instance: &AnyInstancePtr) -> Option<InstancePtr<T>> {
    instance.downcast_ref::<InstancePtr<T>>().cloned()
}

/// Converts a value into a shared, thread-safe error pointer.
#[inline]
pub fn error_ptr<E: Error + Send + Sync + 'static>(error: E) -> ErrorPtr {
    Arc::new(error) as ErrorPtr
}

pub(crate) fn downcast_instance<T: ?Sized + 'static>(
    key: &Key,
    instance: AnyInstancePtr,
) -> Exceptional<InstancePtr<T>> {
    match unerase::<T>(&instance) {
        Some(instance) => Exceptional::Present(instance),
        None => Exceptional::failed(ResolutionError::IncompatibleInstance {
            key: key.clone(),
            requested: type_name::<T>(),
        }),
    }
}

/// Generic provider for instances. Implementations carry the state of a single resolution, so
/// constructors can request their own dependencies through it.
pub trait InstanceProvider {
    /// Resolves an erased instance for the given key. Missing bindings result in absence.
    fn instance(&mut self, key: &Key) -> Exceptional<AnyInstancePtr>;

    /// Resolves instances for all keys bound to the given capability type, in registration order.
    fn instances(&mut self, type_id: TypeId) -> Result<Vec<(Key, AnyInstancePtr)>, ErrorPtr>;

    /// Looks up a configuration property.
    fn property(&self, name: &str) -> Exceptional<String>;
}

/// Helper trait for [InstanceProvider] providing strongly-typed access.
pub trait TypedInstanceProvider {
    /// Resolves an unqualified instance of `T`.
    fn resolve<T: ?Sized + 'static>(&mut self) -> Exceptional<InstancePtr<T>>;

    /// Resolves an instance of `T` bound under the given qualifier.
    fn resolve_named<T: ?Sized + 'static>(&mut self, qualifier: &str)
        -> Exceptional<InstancePtr<T>>;

    /// Resolves an instance for an arbitrary key, expecting it to be of type `T`.
    fn resolve_key<T: ?Sized + 'static>(&mut self, key: &Key) -> Exceptional<InstancePtr<T>>;

    /// Resolves an unqualified instance of `T`, treating absence as an error.
    fn resolve_required<T: ?Sized + 'static>(&mut self) -> Result<InstancePtr<T>, ErrorPtr>;

    /// Resolves all instances bound for `T`, regardless of qualifier.
    fn resolve_all<T: ?Sized + 'static>(&mut self) -> Result<Vec<InstancePtr<T>>, ErrorPtr>;
}

impl<P: InstanceProvider + ?Sized> TypedInstanceProvider for P {
    #[inline]
    fn resolve<T: ?Sized + 'static>(&mut self) -> Exceptional<InstancePtr<T>> {
        self.resolve_key(&Key::of::<T>())
    }

    #[inline]
    fn resolve_named<T: ?Sized + 'static>(
        &mut self,
        qualifier: &str,
    ) -> Exceptional<InstancePtr<T>> {
        self.resolve_key(&Key::named::<T>(qualifier))
    }

    fn resolve_key<T: ?Sized + 'static>(&mut self, key: &Key) -> Exceptional<InstancePtr<T>> {
        self.instance(key)
            .flat_map(|instance| downcast_instance::<T>(key, instance))
    }

    fn resolve_required<T: ?Sized + 'static>(&mut self) -> Result<InstancePtr<T>, ErrorPtr> {
        let key = Key::of::<T>();
        self.resolve_key::<T>(&key).required(&key)
    }

    fn resolve_all<T: ?Sized + 'static>(&mut self) -> Result<Vec<InstancePtr<T>>, ErrorPtr> {
        self.instances(TypeId::of::<T>())?
            .into_iter()
            .map(|(key, instance)| downcast_instance::<T>(&key, instance).required(&key))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use crate::instance_provider::{erase, unerase, InstancePtr};

    trait Named {
        fn name(&self) -> &str;
    }

    struct Named1;

    impl Named for Named1 {
        fn name(&self) -> &str {
            "n1"
        }
    }

    #[test]
    fn should_erase_unsized_instances() {
        let instance = InstancePtr::new(Named1) as InstancePtr<dyn Named + Send + Sync>;
        let erased = erase(instance.clone());

        let restored = unerase::<dyn Named + Send + Sync>(&erased).unwrap();
        assert_eq!(restored.name(), "n1");
        assert!(InstancePtr::ptr_eq(&instance, &restored));
        assert!(unerase::<Named1>(&erased).is_none());
    }
}
