//! One of the basic blocks of dependency injection is a [Component]. Components are injectable
//! objects, which themselves can contain dependencies to other components.
//!
//! ## Registering components
//!
//! Components are described by a [ComponentDescriptor](crate::component_registry::ComponentDescriptor)
//! and registered during startup scanning. For convenience, both the [Component] trait and the
//! descriptor can be automatically derived, if the `derive` feature is enabled:
//!
//! ```
//! use hartshorn_di::instance_provider::InstancePtr;
//! use hartshorn_di::Component;
//!
//! trait Storage {
//!     fn load(&self, id: u32) -> Option<String>;
//! }
//!
//! #[derive(Component)]
//! #[component(id = "memory-storage", provides = ["dyn Storage + Send + Sync"], primary)]
//! struct MemoryStorage;
//!
//! impl Storage for MemoryStorage {
//!     fn load(&self, _id: u32) -> Option<String> {
//!         None
//!     }
//! }
//!
//! #[derive(Component)]
//! #[component(
//!     id = "user-service",
//!     name = "User service",
//!     description = "Looks up users.",
//!     authors = ["Jane Doe"]
//! )]
//! struct UserService {
//!     // primary dyn Trait dependency
//!     storage: InstancePtr<dyn Storage + Send + Sync>,
//!     // optional dependency - don't fail, when not present
//!     cache: Option<InstancePtr<MemoryStorage>>,
//!     // all registered dependencies of given type
//!     all_storages: Vec<InstancePtr<dyn Storage + Send + Sync>>,
//!     // qualified dependency
//!     #[component(name = "memory-storage")]
//!     named_storage: InstancePtr<dyn Storage + Send + Sync>,
//!     #[component(default)]
//!     retries: u8,
//!     #[component(default = "default_timeout")]
//!     timeout: u32,
//! }
//!
//! fn default_timeout() -> u32 {
//!     30
//! }
//! ```
//!
//! ### Supported `#[component]` struct configuration
//!
//! * `id = "id"` - unique component id; defaults to the snake case type name
//! * `name`, `description`, `authors = ["..."]` - descriptive metadata
//! * `enabled = false` - keep the component out of the registry
//! * `scope = "singleton" | "factory"` - construction scope; singleton by default
//! * `provides = ["dyn Trait + Send + Sync"]` - also bind the component as given capabilities,
//! qualified with the component id
//! * `primary` - additionally bind provided capabilities without a qualifier
//! * `requires = ["Type"]` - capabilities which must be bound after scanning, or startup fails
//! * `condition = "expr"` - evaluate `expr` to decide whether to register the component; see
//! [crate::component_registry::conditional]
//! * `priority = number` - ordering of conditional components (i8; higher is first; default 0)
//!
//! ### Supported `#[component]` field configuration
//!
//! * `default` - use `Default::default()` initialization
//! * `default = "expr"` - call `expr()` for initialization
//! * `name = "qualifier"` - inject the instance bound under given qualifier; rejected on `Vec`
//! fields, which always receive every binding of their type

use crate::instance_provider::{ErrorPtr, InstanceProvider, InstancePtr, TypedInstanceProvider};
use crate::key::Key;

/// Base trait for components for dependency injection.
///
/// Components might depend on other components, which forms the basis for dependency injection.
/// Please see the module-level documentation for more information.
pub trait Component: Sized + Send + Sync + 'static {
    /// Creates an instance of this component using dependencies from given [InstanceProvider].
    fn create(instance_provider: &mut dyn InstanceProvider) -> Result<Self, ErrorPtr>;
}

/// Types which can be injected into component fields.
pub trait Injected: Sized {
    fn inject(
        instance_provider: &mut dyn InstanceProvider,
        qualifier: Option<&str>,
    ) -> Result<Self, ErrorPtr>;
}

impl<T: ?Sized + 'static> Injected for InstancePtr<T> {
    fn inject(
        instance_provider: &mut dyn InstanceProvider,
        qualifier: Option<&str>,
    ) -> Result<Self, ErrorPtr> {
        let key = Key::qualified::<T>(qualifier);
        instance_provider.resolve_key::<T>(&key).required(&key)
    }
}

impl<T: ?Sized + 'static> Injected for Option<InstancePtr<T>> {
    fn inject(
        instance_provider: &mut dyn InstanceProvider,
        qualifier: Option<&str>,
    ) -> Result<Self, ErrorPtr> {
        instance_provider
            .resolve_key::<T>(&Key::qualified::<T>(qualifier))
            .into_result()
    }
}

/// Receives every binding of `T`, so there is nothing to qualify.
impl<T: ?Sized + 'static> Injected for Vec<InstancePtr<T>> {
    fn inject(
        instance_provider: &mut dyn InstanceProvider,
        _qualifier: Option<&str>,
    ) -> Result<Self, ErrorPtr> {
        instance_provider.resolve_all::<T>()
    }
}
