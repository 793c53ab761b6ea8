//! A [Context] is an ordered bag of typed attachments owned by some object - its carrier. Any type
//! can become a carrier by holding a context and implementing [ContextCarrier].
//!
//! Lookup rules:
//!
//! * multiple entries of the same type can coexist; the most recently added one wins
//! * [Context::set] can be used to explicitly keep a single entry per type
//! * a context created with [Context::child_of] falls back to its parent's own entries when it has
//! no local match - delegation is single-level, a grandparent is never consulted
//!
//! ```
//! use hartshorn_di::context::{Context, ContextCarrier};
//!
//! struct Session {
//!     context: Context,
//! }
//!
//! impl ContextCarrier for Session {
//!     fn context(&self) -> &Context {
//!         &self.context
//!     }
//! }
//!
//! let session = Session {
//!     context: Context::default(),
//! };
//!
//! session.attach(String::from("first"));
//! session.attach(String::from("second"));
//!
//! assert_eq!(*session.first::<String>().into_option().unwrap(), "second");
//! ```

use crate::exceptional::Exceptional;
use crate::instance_provider::{erase, unerase, AnyInstancePtr, InstancePtr};
use derivative::Derivative;
use parking_lot::RwLock;
use std::any::TypeId;
use std::sync::Arc;

#[derive(Derivative, Clone)]
#[derivative(Debug)]
struct ContextEntry {
    type_id: TypeId,
    name: Option<String>,
    #[derivative(Debug = "ignore")]
    value: AnyInstancePtr,
}

impl ContextEntry {
    #[inline]
    fn matches(&self, type_id: TypeId, name: Option<&str>) -> bool {
        self.type_id == type_id && name.map_or(true, |name| self.name.as_deref() == Some(name))
    }
}

/// Ordered, type-indexed attachment store. Please see the module documentation for lookup rules.
#[derive(Default, Debug)]
pub struct Context {
    entries: RwLock<Vec<ContextEntry>>,
    parent: Option<Arc<Context>>,
}

impl Context {
    /// Creates a context falling back to the given parent's entries.
    pub fn child_of(parent: Arc<Context>) -> Self {
        Self {
            entries: Default::default(),
            parent: Some(parent),
        }
    }

    #[inline]
    pub fn parent(&self) -> Option<&Arc<Context>> {
        self.parent.as_ref()
    }

    /// Appends an entry.
    #[inline]
    pub fn add<T: Send + Sync + 'static>(&self, entry: T) {
        self.add_ptr(InstancePtr::new(entry));
    }

    /// Appends a shared entry, which can also be unsized.
    pub fn add_ptr<T: ?Sized + Send + Sync + 'static>(&self, entry: InstancePtr<T>) {
        self.push::<T>(None, entry);
    }

    /// Appends an entry identified by name in addition to its type.
    pub fn add_named<T: Send + Sync + 'static>(&self, name: impl Into<String>, entry: T) {
        self.push::<T>(Some(name.into()), InstancePtr::new(entry));
    }

    /// Replaces all local entries of the same type with the given one.
    pub fn set<T: Send + Sync + 'static>(&self, entry: T) {
        let mut entries = self.entries.write();
        entries.retain(|existing| existing.type_id != TypeId::of::<T>());
        entries.push(ContextEntry {
            type_id: TypeId::of::<T>(),
            name: None,
            value: erase(InstancePtr::new(entry)),
        });
    }

    /// Returns the most recently added entry of type `T`, falling back to the parent.
    pub fn get<T: ?Sized + 'static>(&self) -> Exceptional<InstancePtr<T>> {
        self.lookup::<T>(None)
    }

    /// Returns the most recently added entry of type `T` with the given name, falling back to the
    /// parent.
    pub fn get_named<T: ?Sized + 'static>(&self, name: &str) -> Exceptional<InstancePtr<T>> {
        self.lookup::<T>(Some(name))
    }

    /// Returns all entries of type `T` in insertion order - local ones first, then the parent's.
    pub fn all<T: ?Sized + 'static>(&self) -> Vec<InstancePtr<T>> {
        let mut entries = self.local_all::<T>();
        if let Some(parent) = &self.parent {
            entries.extend(parent.local_all::<T>());
        }

        entries
    }

    /// Removes all local entries of type `T`. Returns the number of removed entries.
    pub fn remove<T: ?Sized + 'static>(&self) -> usize {
        let mut entries = self.entries.write();
        let before = entries.len();
        entries.retain(|entry| entry.type_id != TypeId::of::<T>());
        before - entries.len()
    }

    /// Number of local entries.
    #[inline]
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub(crate) fn clear(&self) {
        self.entries.write().clear();
    }

    fn push<T: ?Sized + Send + Sync + 'static>(&self, name: Option<String>, entry: InstancePtr<T>) {
        self.entries.write().push(ContextEntry {
            type_id: TypeId::of::<T>(),
            name,
            value: erase(entry),
        });
    }

    fn lookup<T: ?Sized + 'static>(&self, name: Option<&str>) -> Exceptional<InstancePtr<T>> {
        Exceptional::of(self.local_lookup::<T>(name).or_else(|| {
            self.parent
                .as_ref()
                .and_then(|parent| parent.local_lookup::<T>(name))
        }))
    }

    fn local_lookup<T: ?Sized + 'static>(&self, name: Option<&str>) -> Option<InstancePtr<T>> {
        self.entries
            .read()
            .iter()
            .rev()
            .find(|entry| entry.matches(TypeId::of::<T>(), name))
            .and_then(|entry| unerase::<T>(&entry.value))
    }

    fn local_all<T: ?Sized + 'static>(&self) -> Vec<InstancePtr<T>> {
        self.entries
            .read()
            .iter()
            .filter(|entry| entry.type_id == TypeId::of::<T>())
            .filter_map(|entry| unerase::<T>(&entry.value))
            .collect()
    }
}

/// An object owning a [Context]. Attachment operations are delegated to the owned context.
pub trait ContextCarrier {
    fn context(&self) -> &Context;

    #[inline]
    fn attach<T: Send + Sync + 'static>(&self, entry: T) {
        self.context().add(entry);
    }

    #[inline]
    fn attach_named<T: Send + Sync + 'static>(&self, name: impl Into<String>, entry: T) {
        self.context().add_named(name, entry);
    }

    #[inline]
    fn first<T: ?Sized + 'static>(&self) -> Exceptional<InstancePtr<T>> {
        self.context().get::<T>()
    }

    #[inline]
    fn first_named<T: ?Sized + 'static>(&self, name: &str) -> Exceptional<InstancePtr<T>> {
        self.context().get_named::<T>(name)
    }

    #[inline]
    fn all<T: ?Sized + 'static>(&self) -> Vec<InstancePtr<T>> {
        self.context().all::<T>()
    }
}

#[cfg(test)]
mod tests {
    use crate::context::{Context, ContextCarrier};
    use crate::instance_provider::InstancePtr;
    use std::sync::Arc;

    #[derive(Debug, Eq, PartialEq)]
    struct Locale(&'static str);

    trait Channel: Send + Sync {
        fn id(&self) -> u8;
    }

    struct Console;

    impl Channel for Console {
        fn id(&self) -> u8 {
            7
        }
    }

    struct Carrier {
        context: Context,
    }

    impl ContextCarrier for Carrier {
        fn context(&self) -> &Context {
            &self.context
        }
    }

    #[test]
    fn should_return_most_recent_entry() {
        let context = Context::default();
        assert!(context.get::<Locale>().absent());

        context.add(Locale("en"));
        assert_eq!(*context.get::<Locale>().into_option().unwrap(), Locale("en"));

        context.add(Locale("nl"));
        assert_eq!(*context.get::<Locale>().into_option().unwrap(), Locale("nl"));
        assert_eq!(context.all::<Locale>().len(), 2);
        assert_eq!(context.len(), 2);
    }

    #[test]
    fn should_deduplicate_on_set() {
        let context = Context::default();
        context.add(Locale("en"));
        context.add(Locale("nl"));
        context.set(Locale("de"));

        assert_eq!(context.all::<Locale>().len(), 1);
        assert_eq!(*context.get::<Locale>().into_option().unwrap(), Locale("de"));
        assert_eq!(context.remove::<Locale>(), 1);
        assert!(context.is_empty());
    }

    #[test]
    fn should_look_up_named_entries() {
        let context = Context::default();
        context.add_named("primary", Locale("en"));
        context.add(Locale("nl"));

        assert_eq!(
            *context.get_named::<Locale>("primary").into_option().unwrap(),
            Locale("en")
        );
        assert!(context.get_named::<Locale>("secondary").absent());
    }

    #[test]
    fn should_store_unsized_entries() {
        let context = Context::default();
        context.add_ptr(InstancePtr::new(Console) as InstancePtr<dyn Channel>);

        assert_eq!(context.get::<dyn Channel>().into_option().unwrap().id(), 7);
        assert!(context.get::<Console>().absent());
    }

    #[test]
    fn should_fall_back_to_parent_only() {
        let grandparent = Arc::new(Context::default());
        grandparent.add(7u8);

        let parent = Arc::new(Context::child_of(grandparent));
        parent.add(Locale("en"));

        let child = Context::child_of(parent.clone());
        assert_eq!(*child.get::<Locale>().into_option().unwrap(), Locale("en"));
        assert!(child.get::<u8>().absent());
        assert!(parent.get::<u8>().present());

        child.add(Locale("nl"));
        assert_eq!(*child.get::<Locale>().into_option().unwrap(), Locale("nl"));
        assert_eq!(child.all::<Locale>().len(), 2);
    }

    #[test]
    fn should_delegate_from_carrier() {
        let carrier = Carrier {
            context: Context::default(),
        };

        carrier.attach(Locale("en"));
        carrier.attach_named("fallback", Locale("nl"));

        assert_eq!(*carrier.first::<Locale>().into_option().unwrap(), Locale("nl"));
        assert_eq!(
            *carrier.first_named::<Locale>("fallback").into_option().unwrap(),
            Locale("nl")
        );
        assert_eq!(carrier.all::<Locale>().len(), 2);
    }
}
