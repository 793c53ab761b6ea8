use hartshorn_di::application_context::ApplicationContextBuilder;
use hartshorn_di::context::{Context, ContextCarrier};
use hartshorn_di::injection_point::TypedInjectionPoint;
use hartshorn_di::instance_provider::InstancePtr;
use hartshorn_di::key::Key;
use hartshorn_di::provider::Provider;
use std::sync::Arc;

#[derive(Debug)]
struct Locale(&'static str);

// any object can carry typed attachments by owning a Context
struct Request {
    context: Context,
}

impl ContextCarrier for Request {
    fn context(&self) -> &Context {
        &self.context
    }
}

#[derive(Debug)]
struct Message(String);

// note: for the sake of simplicity, errors are unwrapped, rather than gracefully handled
fn main() {
    let context = ApplicationContextBuilder::new()
        // injection points intercept every freshly constructed instance
        .with_injection_point(Arc::new(TypedInjectionPoint::new(
            |message: InstancePtr<Message>| Ok(InstancePtr::new(Message(message.0.to_uppercase()))),
        )))
        .with_binding(
            Key::of::<Message>(),
            Provider::factory(|_| Ok(Message("hello".to_string()))),
        )
        .build()
        .expect("error building context");

    // prints "HELLO"
    println!("{}", context.resolve::<Message>().into_option().unwrap().0);

    // the application context is a carrier itself - its root context is shared by all children
    context.attach(Locale("en"));

    let request = Request {
        context: context.create_child_context(),
    };

    // prints "Locale("en")", since the request falls back to the root context
    println!("{:?}", request.first::<Locale>().into_option().unwrap());

    // most recently attached entries win
    request.attach(Locale("nl"));

    // prints "Locale("nl")"
    println!("{:?}", request.first::<Locale>().into_option().unwrap());
}
