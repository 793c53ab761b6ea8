use hartshorn::application;
use hartshorn::runner::{ApplicationRunner, ErrorPtr};
use hartshorn_di::Component;

// this is an application runner, which will run when the application starts; the framework will
// automatically discover it through the capability it provides
#[derive(Component)]
#[component(provides = ["dyn ApplicationRunner + Send + Sync"])]
struct HelloWorldRunner;

impl ApplicationRunner for HelloWorldRunner {
    fn run(&self) -> Result<(), ErrorPtr> {
        println!("Hello world!");
        Ok(())
    }
}

// note: for the sake of simplicity, errors are unwrapped, rather than gracefully handled
fn main() {
    // create our application, which will detect all runners
    let application = application::create_default().expect("unable to create default application");

    // prints "Hello world!"
    application.run().expect("error running application");
}
