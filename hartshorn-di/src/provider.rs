//! [Provider]s are construction strategies bound to [Key]s in a
//! [BindingRegistry](crate::binding_registry::BindingRegistry). Each provider is one of:
//!
//! * fixed instance - an instance created elsewhere, returned unconditionally
//! * constructor - a function creating the instance, either cached as a singleton or invoked anew
//! for every request (factory)
//! * bound constructor - a list of eligible constructor candidates, each declaring the keys of its
//! parameters; the candidate with the most satisfiable parameters is selected at resolution time
//! * alias - delegates to another key and casts the result, e.g. from a concrete component to a
//! `dyn Trait` it implements
//!
//! ```
//! use hartshorn_di::instance_provider::InstancePtr;
//! use hartshorn_di::key::Key;
//! use hartshorn_di::provider::Provider;
//!
//! trait Greeter {
//!     fn greet(&self) -> String;
//! }
//!
//! struct English;
//!
//! impl Greeter for English {
//!     fn greet(&self) -> String {
//!         "Hello".to_string()
//!     }
//! }
//!
//! let _concrete = Provider::singleton(|_| Ok(English));
//! let _alias = Provider::alias(Key::of::<English>(), |english: InstancePtr<English>| {
//!     english as InstancePtr<dyn Greeter + Send + Sync>
//! });
//! ```

use crate::instance_provider::{
    downcast_instance, erase, error_ptr, unerase, AnyInstancePtr, ErrorPtr, InstanceProvider,
    InstancePtr,
};
use crate::key::Key;
use crate::scope::Scope;
use derivative::Derivative;
use std::fmt::{Debug, Formatter};
use std::sync::Arc;

/// Type-erased constructor.
pub type Constructor =
    Arc<dyn Fn(&mut dyn InstanceProvider) -> Result<AnyInstancePtr, ErrorPtr> + Send + Sync>;

/// Type-erased cast from an aliased instance to the alias capability. Returns `None` if the
/// instance is not of the expected type.
pub type CastFunction = Arc<dyn Fn(AnyInstancePtr) -> Option<AnyInstancePtr> + Send + Sync>;

/// Type-erased disposal function called on shutdown for constructed singletons.
pub type DisposeFunction = Arc<dyn Fn(&AnyInstancePtr) + Send + Sync>;

type CandidateConstructor = Arc<dyn Fn(Arguments) -> Result<AnyInstancePtr, ErrorPtr> + Send + Sync>;

/// Components which need to release resources when the application context shuts down.
pub trait Disposable {
    fn dispose(&self);
}

/// Construction strategy of a [Provider].
#[derive(Clone)]
pub enum Strategy {
    Fixed(AnyInstancePtr),
    Constructor(Constructor),
    BoundConstructor(Vec<ConstructorCandidate>),
    Alias { target: Key, cast: CastFunction },
}

impl Debug for Strategy {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Strategy::Fixed(_) => f.write_str("Fixed"),
            Strategy::Constructor(_) => f.write_str("Constructor"),
            Strategy::BoundConstructor(candidates) => f
                .debug_tuple("BoundConstructor")
                .field(candidates)
                .finish(),
            Strategy::Alias { target, .. } => {
                f.debug_struct("Alias").field("target", target).finish()
            }
        }
    }
}

/// Construction strategy with an associated [Scope]. Please see the module documentation for
/// information about available strategies.
#[derive(Derivative, Clone)]
#[derivative(Debug)]
pub struct Provider {
    scope: Scope,
    strategy: Strategy,
    #[derivative(Debug = "ignore")]
    disposer: Option<DisposeFunction>,
}

impl Provider {
    /// Always returns given instance.
    pub fn fixed<T: ?Sized + Send + Sync + 'static>(instance: InstancePtr<T>) -> Self {
        Self::new(Scope::Fixed, Strategy::Fixed(erase(instance)))
    }

    /// Convenience variant of [Provider::fixed] taking ownership of a value.
    #[inline]
    pub fn instance<T: Send + Sync + 'static>(value: T) -> Self {
        Self::fixed(InstancePtr::new(value))
    }

    /// Constructs the instance on first request and shares it afterwards.
    pub fn singleton<T, F>(constructor: F) -> Self
    where
        T: Send + Sync + 'static,
        F: Fn(&mut dyn InstanceProvider) -> Result<T, ErrorPtr> + Send + Sync + 'static,
    {
        Self::constructor(Scope::Singleton, constructor)
    }

    /// Constructs a new instance for each request.
    pub fn factory<T, F>(constructor: F) -> Self
    where
        T: Send + Sync + 'static,
        F: Fn(&mut dyn InstanceProvider) -> Result<T, ErrorPtr> + Send + Sync + 'static,
    {
        Self::constructor(Scope::Factory, constructor)
    }

    /// Constructs instances in the given scope. The constructor returns a value, which is then
    /// wrapped in an [InstancePtr].
    pub fn constructor<T, F>(scope: Scope, constructor: F) -> Self
    where
        T: Send + Sync + 'static,
        F: Fn(&mut dyn InstanceProvider) -> Result<T, ErrorPtr> + Send + Sync + 'static,
    {
        Self::pointer_constructor(scope, move |instance_provider| {
            constructor(instance_provider).map(InstancePtr::new)
        })
    }

    /// Like [Provider::constructor], but for constructors returning pointers, which is needed for
    /// unsized capabilities, e.g. `dyn Trait`.
    pub fn pointer_constructor<T, F>(scope: Scope, constructor: F) -> Self
    where
        T: ?Sized + Send + Sync + 'static,
        F: Fn(&mut dyn InstanceProvider) -> Result<InstancePtr<T>, ErrorPtr>
            + Send
            + Sync
            + 'static,
    {
        let constructor: Constructor =
            Arc::new(move |instance_provider: &mut dyn InstanceProvider| {
                constructor(instance_provider).map(erase)
            });
        Self::new(normalize_scope(scope), Strategy::Constructor(constructor))
    }

    /// Selects one of the candidates at resolution time. Please see [ConstructorCandidate].
    pub fn bound(scope: Scope, candidates: Vec<ConstructorCandidate>) -> Self {
        Self::new(normalize_scope(scope), Strategy::BoundConstructor(candidates))
    }

    /// Resolves `target` and casts the result to the alias capability.
    pub fn alias<Source, Target, F>(target: Key, cast: F) -> Self
    where
        Source: ?Sized + Send + Sync + 'static,
        Target: ?Sized + 'static,
        F: Fn(InstancePtr<Target>) -> InstancePtr<Source> + Send + Sync + 'static,
    {
        let cast: CastFunction = Arc::new(move |instance: AnyInstancePtr| {
            unerase::<Target>(&instance).map(|instance| erase(cast(instance)))
        });
        Self::new(Scope::Factory, Strategy::Alias { target, cast })
    }

    /// Resolves `target` as-is. Useful for exposing a binding under another qualifier.
    pub fn redirect(target: Key) -> Self {
        let cast: CastFunction = Arc::new(|instance: AnyInstancePtr| Some(instance));
        Self::new(Scope::Factory, Strategy::Alias { target, cast })
    }

    /// Calls given function when a singleton constructed by this provider is disposed.
    pub fn with_disposer<T, F>(mut self, disposer: F) -> Self
    where
        T: ?Sized + 'static,
        F: Fn(&T) + Send + Sync + 'static,
    {
        self.disposer = Some(Arc::new(move |instance: &AnyInstancePtr| {
            if let Some(instance) = unerase::<T>(instance) {
                disposer(&instance);
            }
        }));
        self
    }

    /// Calls [Disposable::dispose] when a singleton constructed by this provider is disposed.
    #[inline]
    pub fn disposable<T: Disposable + ?Sized + 'static>(self) -> Self {
        self.with_disposer(|instance: &T| instance.dispose())
    }

    #[inline]
    pub fn scope(&self) -> Scope {
        self.scope
    }

    #[inline]
    pub fn strategy(&self) -> &Strategy {
        &self.strategy
    }

    #[inline]
    pub(crate) fn disposer(&self) -> Option<&DisposeFunction> {
        self.disposer.as_ref()
    }

    fn new(scope: Scope, strategy: Strategy) -> Self {
        Self {
            scope,
            strategy,
            disposer: None,
        }
    }
}

// constructors always create something, so a fixed scope degrades to singleton
fn normalize_scope(scope: Scope) -> Scope {
    if scope == Scope::Fixed {
        Scope::Singleton
    } else {
        scope
    }
}

/// A single eligible constructor of a bound-constructor [Provider]. Declares the keys of all its
/// parameters, which are resolved before calling the constructor.
#[derive(Derivative, Clone)]
#[derivative(Debug)]
pub struct ConstructorCandidate {
    parameters: Vec<Key>,
    #[derivative(Debug = "ignore")]
    constructor: CandidateConstructor,
}

impl ConstructorCandidate {
    pub fn new<T, F>(parameters: Vec<Key>, constructor: F) -> Self
    where
        T: Send + Sync + 'static,
        F: Fn(Arguments) -> Result<T, ErrorPtr> + Send + Sync + 'static,
    {
        Self {
            parameters,
            constructor: Arc::new(move |arguments: Arguments| {
                constructor(arguments).map(|instance| erase(InstancePtr::new(instance)))
            }),
        }
    }

    #[inline]
    pub fn parameters(&self) -> &[Key] {
        &self.parameters
    }

    #[inline]
    pub fn arity(&self) -> usize {
        self.parameters.len()
    }

    #[inline]
    pub(crate) fn construct(&self, arguments: Arguments) -> Result<AnyInstancePtr, ErrorPtr> {
        (self.constructor)(arguments)
    }
}

/// Resolved parameters passed to a [ConstructorCandidate], in declaration order.
#[derive(Derivative, Clone, Default)]
#[derivative(Debug)]
pub struct Arguments {
    #[derivative(Debug = "ignore")]
    values: Vec<(Key, AnyInstancePtr)>,
}

impl Arguments {
    pub(crate) fn new(values: Vec<(Key, AnyInstancePtr)>) -> Self {
        Self { values }
    }

    /// Returns the argument at given position, or an error if it doesn't exist or has a different
    /// type.
    pub fn get<T: ?Sized + 'static>(&self, index: usize) -> Result<InstancePtr<T>, ErrorPtr> {
        let (key, instance) = self
            .values
            .get(index)
            .ok_or_else(|| error_ptr(MissingArgument(index)))?;

        downcast_instance::<T>(key, instance.clone()).required(key)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

#[derive(thiserror::Error, Clone, Debug)]
#[error("Missing constructor argument at index {0}")]
struct MissingArgument(usize);
