use hartshorn_di::application_context::ApplicationContextBuilder;
use hartshorn_di::instance_provider::InstancePtr;
use hartshorn_di::Component;

// this is a trait we would like to use in our component
trait TestTrait {
    fn foo(&self);
}

// this is a dependency which implements the above trait and also is an injectable component
// we're telling the framework to provide TestDependency when asked for dyn TestTrait
#[derive(Component)]
#[component(provides = ["dyn TestTrait + Send + Sync"], primary)]
struct TestDependency;

impl TestTrait for TestDependency {
    fn foo(&self) {
        println!("Hello world!");
    }
}

// this is another component, but with a dependency
#[derive(Component)]
struct TestComponent {
    // the framework will know how to inject dyn TestTrait, when asked for TestComponent
    dependency: InstancePtr<dyn TestTrait + Send + Sync>,
    // alternatively, you can inject the concrete type
    // dependency: InstancePtr<TestDependency>,
}

impl TestComponent {
    fn call_foo(&self) {
        self.dependency.foo();
    }
}

// note: for the sake of simplicity, errors are unwrapped, rather than gracefully handled
fn main() {
    // all state lives in an ApplicationContext, which scans statically registered components
    let context = ApplicationContextBuilder::new()
        .with_static_components()
        .build()
        .expect("error scanning components");

    // resolution never panics - it yields an Exceptional, which is present, absent or failed
    let component = context
        .resolve::<TestComponent>()
        .into_option()
        .expect("error creating TestComponent");

    // prints "Hello world!"
    component.call_foo();
}
