//! [InjectionPoint]s intercept freshly constructed instances before they reach the caller, e.g. to
//! wrap them in decorators. Points are applied in registration order; each point decides whether
//! it is interested in a given instance via [InjectionPoint::accepts].
//!
//! Only constructed instances are intercepted - fixed instances are returned as registered, and
//! cached singletons are intercepted once, before being cached. An instance resolved through an
//! alias is additionally offered to points accepting the alias key, e.g. a point for
//! `dyn Trait` decorates a concrete component resolved as `dyn Trait`.

use crate::instance_provider::{downcast_instance, erase, AnyInstancePtr, ErrorPtr, InstancePtr};
use crate::key::Key;
#[cfg(test)]
use mockall::automock;
use parking_lot::RwLock;
use std::marker::PhantomData;
use std::sync::Arc;
use tracing::trace;

pub type InjectionPointPtr = Arc<dyn InjectionPoint + Send + Sync>;

/// A post-construction interceptor.
#[cfg_attr(test, automock)]
pub trait InjectionPoint {
    /// Checks if this point should be applied to an instance resolved for the given key.
    fn accepts(&self, key: &Key) -> bool;

    /// Transforms the instance. The result must stay compatible with the key's capability type.
    fn apply(&self, key: &Key, instance: AnyInstancePtr) -> Result<AnyInstancePtr, ErrorPtr>;
}

/// Injection point accepting instances of capability `T`, regardless of qualifier.
pub struct TypedInjectionPoint<T: ?Sized, F> {
    transform: F,
    _phantom: PhantomData<fn(InstancePtr<T>)>,
}

impl<T, F> TypedInjectionPoint<T, F>
where
    T: ?Sized + Send + Sync + 'static,
    F: Fn(InstancePtr<T>) -> Result<InstancePtr<T>, ErrorPtr>,
{
    pub fn new(transform: F) -> Self {
        Self {
            transform,
            _phantom: PhantomData,
        }
    }
}

impl<T, F> InjectionPoint for TypedInjectionPoint<T, F>
where
    T: ?Sized + Send + Sync + 'static,
    F: Fn(InstancePtr<T>) -> Result<InstancePtr<T>, ErrorPtr>,
{
    #[inline]
    fn accepts(&self, key: &Key) -> bool {
        key.is::<T>()
    }

    fn apply(&self, key: &Key, instance: AnyInstancePtr) -> Result<AnyInstancePtr, ErrorPtr> {
        let instance = downcast_instance::<T>(key, instance).required(key)?;
        (self.transform)(instance).map(erase)
    }
}

/// Injection point accepting instances based on an arbitrary key predicate. Since there is no
/// subtyping between capabilities, this is the way to intercept whole families of keys, e.g. all
/// qualified variants or a set of related capabilities.
pub struct PredicateInjectionPoint<P, F> {
    predicate: P,
    transform: F,
}

impl<P, F> PredicateInjectionPoint<P, F>
where
    P: Fn(&Key) -> bool,
    F: Fn(&Key, AnyInstancePtr) -> Result<AnyInstancePtr, ErrorPtr>,
{
    pub fn new(predicate: P, transform: F) -> Self {
        Self {
            predicate,
            transform,
        }
    }
}

impl<P, F> InjectionPoint for PredicateInjectionPoint<P, F>
where
    P: Fn(&Key) -> bool,
    F: Fn(&Key, AnyInstancePtr) -> Result<AnyInstancePtr, ErrorPtr>,
{
    #[inline]
    fn accepts(&self, key: &Key) -> bool {
        (self.predicate)(key)
    }

    #[inline]
    fn apply(&self, key: &Key, instance: AnyInstancePtr) -> Result<AnyInstancePtr, ErrorPtr> {
        (self.transform)(key, instance)
    }
}

/// Ordered list of injection points.
#[derive(Default)]
pub struct InjectionPointChain {
    points: RwLock<Vec<InjectionPointPtr>>,
}

impl InjectionPointChain {
    /// Appends a point at the end of the chain.
    pub fn add(&self, point: InjectionPointPtr) {
        self.points.write().push(point);
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.points.read().len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Runs the instance through all accepting points, in registration order.
    #[inline]
    pub fn apply(&self, key: &Key, instance: AnyInstancePtr) -> Result<AnyInstancePtr, ErrorPtr> {
        self.apply_excluding(key, &[], instance)
    }

    /// Like [InjectionPointChain::apply], but skips points accepting any of the `applied` keys.
    /// Used when an instance reaches the caller through aliases, so each point sees it at most
    /// once.
    pub fn apply_excluding(
        &self,
        key: &Key,
        applied: &[Key],
        instance: AnyInstancePtr,
    ) -> Result<AnyInstancePtr, ErrorPtr> {
        // snapshot, so points never run under the lock
        let points = self.points.read().clone();

        points
            .iter()
            .filter(|point| point.accepts(key))
            .filter(|point| !applied.iter().any(|applied| point.accepts(applied)))
            .try_fold(instance, |instance, point| {
                trace!(key = %key, "Applying injection point.");
                point.apply(key, instance)
            })
    }

    pub(crate) fn clear(&self) {
        self.points.write().clear();
    }
}

#[cfg(test)]
mod tests {
    use crate::error::CapturedPanic;
    use crate::injection_point::{
        InjectionPointChain, InjectionPointPtr, MockInjectionPoint, PredicateInjectionPoint,
        TypedInjectionPoint,
    };
    use crate::instance_provider::{erase, error_ptr, unerase, InstancePtr};
    use crate::key::Key;
    use mockall::predicate::*;
    use std::sync::Arc;

    #[derive(Clone)]
    struct Tagged(Vec<&'static str>);

    fn tagging(tag: &'static str) -> InjectionPointPtr {
        Arc::new(TypedInjectionPoint::new(move |tagged: InstancePtr<Tagged>| {
            let mut tags = tagged.0.clone();
            tags.push(tag);
            Ok(InstancePtr::new(Tagged(tags)))
        }))
    }

    #[test]
    fn should_apply_points_in_registration_order() {
        let chain = InjectionPointChain::default();
        chain.add(tagging("a"));
        chain.add(tagging("b"));

        let key = Key::of::<Tagged>();
        let instance = chain
            .apply(&key, erase(InstancePtr::new(Tagged(vec![]))))
            .unwrap();

        assert_eq!(unerase::<Tagged>(&instance).unwrap().0, vec!["a", "b"]);
    }

    #[test]
    fn should_skip_points_not_accepting_key() {
        let mut skipped = MockInjectionPoint::new();
        skipped
            .expect_accepts()
            .with(eq(Key::of::<u8>()))
            .times(1)
            .return_const(false);
        skipped.expect_apply().never();

        let chain = InjectionPointChain::default();
        chain.add(Arc::new(skipped));
        chain.add(Arc::new(PredicateInjectionPoint::new(
            |key: &Key| key.is::<u8>(),
            |_: &Key, _| Ok(erase(InstancePtr::new(2u8))),
        )));

        let instance = chain
            .apply(&Key::of::<u8>(), erase(InstancePtr::new(1u8)))
            .unwrap();

        assert_eq!(*unerase::<u8>(&instance).unwrap(), 2);
    }

    #[test]
    fn should_stop_on_failure() {
        let chain = InjectionPointChain::default();
        chain.add(Arc::new(PredicateInjectionPoint::new(
            |_: &Key| true,
            |_: &Key, _| Err(error_ptr(CapturedPanic("rejected".to_string()))),
        )));
        chain.add(tagging("a"));

        assert!(chain
            .apply(&Key::of::<Tagged>(), erase(InstancePtr::new(Tagged(vec![]))))
            .is_err());
    }

    #[test]
    fn should_skip_points_already_applied_through_other_keys() {
        let chain = InjectionPointChain::default();
        chain.add(Arc::new(PredicateInjectionPoint::new(
            |key: &Key| key.is::<u8>(),
            |_: &Key, instance| {
                let value = unerase::<u8>(&instance).map_or(0, |value| *value);
                Ok(erase(InstancePtr::new(value + 1)))
            },
        )));

        let instance = chain
            .apply_excluding(
                &Key::named::<u8>("alias"),
                &[Key::of::<u8>()],
                erase(InstancePtr::new(1u8)),
            )
            .unwrap();
        assert_eq!(*unerase::<u8>(&instance).unwrap(), 1);

        let instance = chain
            .apply_excluding(
                &Key::named::<u8>("alias"),
                &[Key::of::<i8>()],
                erase(InstancePtr::new(1u8)),
            )
            .unwrap();
        assert_eq!(*unerase::<u8>(&instance).unwrap(), 2);
    }
}
