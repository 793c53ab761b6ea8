//! Dependency binding and object graph resolution engine.
//!
//! Capabilities are identified by [Key](key::Key)s - a type with an optional qualifier - and bound
//! to [Provider](provider::Provider)s in a [BindingRegistry](binding_registry::BindingRegistry).
//! Resolution never panics and never uses a sentinel: it yields an
//! [Exceptional](exceptional::Exceptional), which is either present, absent or failed with a
//! cause. Freshly constructed instances pass through an
//! [InjectionPoint](injection_point::InjectionPoint) chain, while any object can carry typed
//! attachments by implementing [ContextCarrier](context::ContextCarrier).
//!
//! The [ApplicationContext](application_context::ApplicationContext) ties everything together,
//! populating bindings from [components](component) discovered at startup.

pub mod application_context;
pub mod binding_registry;
pub mod component;
pub mod component_registry;
pub mod context;
pub mod error;
pub mod exceptional;
pub mod injection_point;
pub mod instance_provider;
pub mod key;
pub mod properties;
pub mod provider;
pub mod resolver;
pub mod scope;

#[cfg(feature = "derive")]
pub use hartshorn_di_derive::Component;
