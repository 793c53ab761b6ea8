// note: this example assumes you've analyzed the previous one

use hartshorn::application;
use hartshorn::config::ApplicationConfig;
use hartshorn::runner::{ApplicationRunner, ErrorPtr};
use hartshorn_di::instance_provider::InstancePtr;
use hartshorn_di::Component;

// application config is read from environment variables prefixed with HARTSHORN_ and an optional
// hartshorn.json file; every value is also available as a property, e.g. running with
// HARTSHORN_GREETING__TARGET=config makes "greeting.target" available
#[derive(Component)]
#[component(provides = ["dyn ApplicationRunner + Send + Sync"])]
struct ConfigPrinterRunner {
    // the framework config is bound as an instance
    config: InstancePtr<ApplicationConfig>,
}

impl ApplicationRunner for ConfigPrinterRunner {
    fn run(&self) -> Result<(), ErrorPtr> {
        println!("Using built-in logger: {}", self.config.install_tracing_logger);
        Ok(())
    }
}

fn main() {
    let application = application::create_default().expect("unable to create default application");

    let target = application
        .context()
        .property("greeting.target")
        .or_else_get(String::new);
    println!("Configured greeting target: {target:?}");

    application.run().expect("error running application");
}
