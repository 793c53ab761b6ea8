use hartshorn_di::application_context::ApplicationContextBuilder;
use hartshorn_di::instance_provider::{InstancePtr, TypedInstanceProvider};
use hartshorn_di::key::Key;
use hartshorn_di::provider::{ConstructorCandidate, Provider};
use hartshorn_di::scope::Scope;

trait Greeter {
    fn greet(&self) -> String;
}

struct Formal {
    title: InstancePtr<String>,
    name: Option<InstancePtr<String>>,
}

impl Greeter for Formal {
    fn greet(&self) -> String {
        match &self.name {
            Some(name) => format!("Good day, {} {}.", self.title, name),
            None => format!("Good day, {}.", self.title),
        }
    }
}

// note: for the sake of simplicity, errors are unwrapped, rather than gracefully handled
fn main() {
    let context = ApplicationContextBuilder::new()
        .build()
        .expect("error building context");

    // fixed instances are returned as-is
    context.bind(Key::named::<String>("title"), Provider::instance("Dr.".to_string()));

    // bound constructors list all eligible candidates - the one with the most satisfiable
    // parameters wins, while ties are reported as errors
    context.bind(
        Key::of::<Formal>(),
        Provider::bound(
            Scope::Factory,
            vec![
                ConstructorCandidate::new(vec![Key::named::<String>("title")], |arguments| {
                    Ok(Formal {
                        title: arguments.get(0)?,
                        name: None,
                    })
                }),
                ConstructorCandidate::new(
                    vec![Key::named::<String>("title"), Key::named::<String>("name")],
                    |arguments| {
                        Ok(Formal {
                            title: arguments.get(0)?,
                            name: Some(arguments.get(1)?),
                        })
                    },
                ),
            ],
        ),
    );

    // aliases expose a binding as another capability
    context.bind(
        Key::of::<dyn Greeter + Send + Sync>(),
        Provider::alias(Key::of::<Formal>(), |formal: InstancePtr<Formal>| {
            formal as InstancePtr<dyn Greeter + Send + Sync>
        }),
    );

    // prints "Good day, Dr.."
    let greeter = context
        .resolve::<dyn Greeter + Send + Sync>()
        .into_option()
        .expect("error resolving greeter");
    println!("{}", greeter.greet());

    // rebinding takes effect for all subsequent resolutions
    context.bind(Key::named::<String>("name"), Provider::instance("Who".to_string()));

    // multiple resolutions can share a single resolver
    let mut resolver = context.resolver();
    let greeter = resolver
        .resolve_required::<dyn Greeter + Send + Sync>()
        .expect("error resolving greeter");

    // prints "Good day, Dr. Who."
    println!("{}", greeter.greet());
}
