use hartshorn_di::application_context::ApplicationContextBuilder;
use hartshorn_di::component_registry::conditional::ConditionContext;
use hartshorn_di::component_registry::ComponentDescriptor;
use hartshorn_di::instance_provider::InstancePtr;
use hartshorn_di::Component;

trait Storage {
    fn name(&self) -> &'static str;
}

#[derive(Component)]
// sometimes components may want to be conditionally registered, based on some runtime logic
// in such cases, condition expressions to call can be specified on components
#[component(
    provides = ["dyn Storage + Send + Sync"],
    primary,
    condition = "is_disk_storage_enabled"
)]
struct DiskStorage;

impl Storage for DiskStorage {
    fn name(&self) -> &'static str {
        "disk"
    }
}

// conditional components are evaluated by descending priority, after all unconditional ones, so a
// low priority component can act as a fallback
#[derive(Component)]
#[component(
    provides = ["dyn Storage + Send + Sync"],
    primary,
    condition = "hartshorn_di::component_registry::conditional::unbound::<dyn Storage + Send + Sync>",
    priority = -10
)]
struct MemoryStorage;

impl Storage for MemoryStorage {
    fn name(&self) -> &'static str {
        "memory"
    }
}

fn is_disk_storage_enabled(context: &dyn ConditionContext, _descriptor: &ComponentDescriptor) -> bool {
    // conditions can consult configuration properties
    context.registry().property("storage.disk").as_deref() == Some("true")
}

// note: for the sake of simplicity, errors are unwrapped, rather than gracefully handled
fn main() {
    for disk in ["true", "false"] {
        let context = ApplicationContextBuilder::new()
            .with_property("storage.disk", disk)
            .with_static_components()
            .build()
            .expect("error scanning components");

        let storage: InstancePtr<dyn Storage + Send + Sync> = context
            .resolve()
            .into_option()
            .expect("error resolving storage");

        // prints "disk", then "memory"
        println!("{}", storage.name());
    }
}
