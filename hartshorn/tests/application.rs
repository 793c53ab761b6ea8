use hartshorn::application::{create_default, create_with_builder};
use hartshorn::config::ApplicationConfig;
use hartshorn::runner::{ApplicationRunner, ErrorPtr};
use hartshorn_di::application_context::ApplicationContextBuilder;
use hartshorn_di::component_registry::ComponentManifest;
use hartshorn_di::instance_provider::InstancePtr;
use hartshorn_di::Component;
use std::sync::atomic::{AtomicUsize, Ordering};

static RUNS: AtomicUsize = AtomicUsize::new(0);

#[derive(Component)]
#[component(provides = ["dyn ApplicationRunner + Send + Sync"])]
struct CountingRunner {
    config: InstancePtr<ApplicationConfig>,
}

impl ApplicationRunner for CountingRunner {
    fn run(&self) -> Result<(), ErrorPtr> {
        if self.config.install_tracing_logger {
            tracing::info!("Counting run.");
        }

        RUNS.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[test]
fn should_run_static_runners() {
    let application = create_default().unwrap();
    assert!(application
        .context()
        .resolve::<ApplicationConfig>()
        .present());

    application.run().unwrap();

    assert_eq!(RUNS.load(Ordering::SeqCst), 1);
    assert!(application.context().is_shut_down());
}

#[test]
fn should_keep_explicit_properties() {
    let application = create_with_builder(
        ApplicationContextBuilder::new()
            .with_manifest(ComponentManifest::default())
            .with_property("greeting.target", "world"),
    )
    .unwrap();

    assert_eq!(
        application
            .context()
            .property("greeting.target")
            .into_option()
            .as_deref(),
        Some("world")
    );
    assert!(application.context().components().is_empty());
}
