//! Application framework based on [hartshorn_di] dependency injection.
//!
//! With dependency injection in place, application components form a dependency graph managed by
//! an [ApplicationContext](hartshorn_di::application_context::ApplicationContext) instead of being
//! created and passed around in `main()`. This crate provides the entrypoint for such applications
//! in the form of [Application](application::Application): it loads configuration into the context
//! property store, scans registered components, installs supporting infrastructure (e.g. logging)
//! and runs [ApplicationRunners](runner::ApplicationRunner).

pub mod application;
pub mod config;
pub mod runner;
