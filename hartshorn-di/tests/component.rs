#[cfg(feature = "derive")]
mod component_derive_test {
    use hartshorn_di::application_context::ApplicationContextBuilder;
    use hartshorn_di::component::Component;
    use hartshorn_di::component_registry::conditional::ConditionContext;
    use hartshorn_di::component_registry::{ComponentDescriptor, ComponentManifest};
    use hartshorn_di::instance_provider::InstancePtr;
    use hartshorn_di::key::Key;
    use hartshorn_di::provider::Disposable;
    use hartshorn_di::Component;
    use std::sync::atomic::{AtomicBool, Ordering};

    trait TestTrait: Send + Sync {
        fn value(&self) -> i8;
    }

    #[derive(Component)]
    #[component(id = "test-dependency", provides = ["dyn TestTrait"], primary)]
    struct TestDependency;

    impl TestTrait for TestDependency {
        fn value(&self) -> i8 {
            1
        }
    }

    #[derive(Component)]
    #[component(id = "other-dependency", provides = ["dyn TestTrait"], scope = "factory")]
    struct OtherDependency;

    impl TestTrait for OtherDependency {
        fn value(&self) -> i8 {
            2
        }
    }

    #[derive(Component)]
    #[component(
        id = "test-component",
        name = "Test component",
        description = "Component exercising all injected field kinds.",
        authors = ["Alice", "Bob"],
        requires = ["TestDependency"]
    )]
    struct TestComponent {
        dependency: InstancePtr<TestDependency>,
        primary: InstancePtr<dyn TestTrait>,
        optional: Option<InstancePtr<u64>>,
        #[component(name = "other-dependency")]
        named: InstancePtr<dyn TestTrait>,
        all: Vec<InstancePtr<dyn TestTrait>>,
        #[component(default)]
        default: i8,
        #[component(default = "dummy_expr")]
        default_expr: i8,
    }

    fn dummy_expr() -> i8 {
        -1
    }

    #[derive(Component)]
    #[component(id = "disabled", enabled = false)]
    struct DisabledComponent;

    #[derive(Component)]
    #[component(id = "never", condition = "never_registered", priority = -5)]
    struct ConditionalComponent(#[component(default)] u8);

    fn never_registered(_context: &dyn ConditionContext, _descriptor: &ComponentDescriptor) -> bool {
        false
    }

    #[derive(Component)]
    #[component(
        id = "fallback",
        condition = "hartshorn_di::component_registry::conditional::unbound::<TestDependency>"
    )]
    struct FallbackComponent;

    static DISPOSED: AtomicBool = AtomicBool::new(false);

    #[derive(Component)]
    #[component(id = "disposable", disposable)]
    struct DisposableComponent;

    impl Disposable for DisposableComponent {
        fn dispose(&self) {
            DISPOSED.store(true, Ordering::SeqCst);
        }
    }

    #[test]
    fn should_register_static_components() {
        let context = ApplicationContextBuilder::new()
            .with_static_components()
            .build()
            .unwrap();

        let components = context.components();
        assert!(components.contains("test-dependency"));
        assert!(components.contains("test-component"));
        assert!(!components.contains("disabled"));
        assert!(!components.contains("never"));
        assert!(!components.contains("fallback"));

        let descriptor = components.component("test-component").unwrap();
        assert_eq!(descriptor.name(), Some("Test component"));
        assert_eq!(descriptor.authors(), ["Alice".to_string(), "Bob".to_string()]);
        assert_eq!(descriptor.required_keys(), [Key::of::<TestDependency>()]);
    }

    #[test]
    fn should_inject_fields() {
        let context = ApplicationContextBuilder::new()
            .with_static_components()
            .build()
            .unwrap();

        let component = context.resolve::<TestComponent>().into_option().unwrap();
        let dependency = context.resolve::<TestDependency>().into_option().unwrap();

        assert!(InstancePtr::ptr_eq(&component.dependency, &dependency));
        assert_eq!(component.primary.value(), 1);
        assert!(component.optional.is_none());
        assert_eq!(component.named.value(), 2);
        // static registration order is unspecified
        let mut values: Vec<_> = component
            .all
            .iter()
            .map(|instance| instance.value())
            .collect();
        values.sort();
        assert_eq!(values, vec![1, 2]);
        assert_eq!(component.default, 0);
        assert_eq!(component.default_expr, -1);
    }

    #[test]
    fn should_build_descriptor_manually() {
        let manifest = ComponentManifest::default().with_component(
            ComponentDescriptor::of::<TestDependency>("manual", Default::default()),
        );

        let context = ApplicationContextBuilder::new()
            .with_manifest(manifest)
            .build()
            .unwrap();

        assert!(context.resolve::<TestDependency>().present());
        assert!(context.resolve::<dyn TestTrait>().absent());
        assert!(TestDependency::create(&mut context.resolver()).is_ok());
    }

    #[test]
    fn should_dispose_derived_components() {
        let context = ApplicationContextBuilder::new()
            .with_static_components()
            .build()
            .unwrap();

        context
            .resolve::<DisposableComponent>()
            .into_option()
            .unwrap();
        context.shutdown();

        assert!(DISPOSED.load(Ordering::SeqCst));
    }
}
