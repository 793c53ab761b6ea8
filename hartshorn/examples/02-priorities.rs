// note: this example assumes you've analyzed the previous one

use hartshorn::application;
use hartshorn::runner::{ApplicationRunner, ErrorPtr};
use hartshorn_di::Component;

#[derive(Component)]
#[component(provides = ["dyn ApplicationRunner + Send + Sync"])]
struct PrintHelloRunner;

impl ApplicationRunner for PrintHelloRunner {
    fn run(&self) -> Result<(), ErrorPtr> {
        print!("Hello ");
        Ok(())
    }

    // for ordered execution of application runners, priorities can be used
    fn priority(&self) -> i8 {
        3
    }
}

#[derive(Component)]
#[component(provides = ["dyn ApplicationRunner + Send + Sync"])]
struct PrintWorldRunner;

impl ApplicationRunner for PrintWorldRunner {
    fn run(&self) -> Result<(), ErrorPtr> {
        print!("world");
        Ok(())
    }

    fn priority(&self) -> i8 {
        2
    }
}

#[derive(Component)]
#[component(provides = ["dyn ApplicationRunner + Send + Sync"])]
struct PrintExclamationRunner;

impl ApplicationRunner for PrintExclamationRunner {
    fn run(&self) -> Result<(), ErrorPtr> {
        println!("!");
        Ok(())
    }

    fn priority(&self) -> i8 {
        1
    }
}

fn main() {
    let application = application::create_default().expect("unable to create default application");

    // prints "Hello world!"
    application.run().expect("error running application");
}
