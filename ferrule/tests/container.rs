use std::sync::{Arc, Mutex};

use ferrule::{
    AppProperties, Component, Config, Container, ContainerError, Late, configuration,
};

struct Foo {
    value: i32,
}

impl Component for Foo {}

#[derive(Default, Component)]
struct BarConfiguration;

struct Bar {
    tag: &'static str,
}

impl Component for Bar {}

#[configuration]
impl BarConfiguration {
    #[bean]
    fn bar(&self) -> Bar {
        Bar { tag: "from-bean" }
    }
}

#[derive(Default, Component)]
struct TokenConfiguration {
    #[property(value = "${token.secret:changeme}")]
    secret: String,
}

struct TokenService {
    secret: String,
}

impl Component for TokenService {}

struct TokenClient {
    service: Arc<TokenService>,
}

impl Component for TokenClient {}

#[configuration]
impl TokenConfiguration {
    #[bean]
    fn token_service(&self) -> TokenService {
        TokenService {
            secret: self.secret.clone(),
        }
    }

    #[bean]
    fn token_client(&self, service: Arc<TokenService>) -> TokenClient {
        TokenClient { service }
    }
}

#[derive(Default, Component)]
struct FlakyConfiguration;

struct Good;

impl Component for Good {}

struct Bad;

impl Component for Bad {}

#[configuration]
impl FlakyConfiguration {
    #[bean]
    fn good(&self) -> Good {
        Good
    }

    #[bean]
    fn bad(&self) -> Result<Bad, String> {
        Err("bad bean".to_string())
    }
}

#[derive(Default, Component)]
struct DevConfiguration;

struct DevMarker;

impl Component for DevMarker {}

#[configuration(profile = "dev")]
impl DevConfiguration {
    #[bean]
    fn dev_marker(&self) -> DevMarker {
        DevMarker
    }
}

#[test]
fn test_bean_retrievable_without_explicit_register() {
    // Scenario: a configuration exposing a factory method makes the bean
    // retrievable under the method's name after build.
    let mut container = Container::new();
    container.register_configuration::<BarConfiguration>().unwrap();
    container.build().unwrap();

    let bar = container.get_instance_named::<Bar>("bar").unwrap();
    assert_eq!(bar.tag, "from-bean");
}

#[test]
fn test_configuration_fields_are_injected() {
    let mut container = Container::new();
    container
        .register_configuration::<TokenConfiguration>()
        .unwrap();
    container.build().unwrap();

    let service = container
        .get_instance_named::<TokenService>("tokenService")
        .unwrap();
    assert_eq!(service.secret, "changeme");
}

#[test]
fn test_configuration_fields_resolve_references() {
    let mut container = Container::new();
    container
        .add_property_source(Config::parse(r#"{"token": {"secret": "s3cr3t"}}"#).unwrap());
    container
        .register_configuration::<TokenConfiguration>()
        .unwrap();
    container.build().unwrap();

    let service = container
        .get_instance_named::<TokenService>("tokenService")
        .unwrap();
    assert_eq!(service.secret, "s3cr3t");
}

#[test]
fn test_bean_with_arc_parameter() {
    let mut container = Container::new();
    container
        .register_configuration::<TokenConfiguration>()
        .unwrap();
    container.build().unwrap();

    let service = container.get_instance::<TokenService>().unwrap();
    let client = container.get_instance::<TokenClient>().unwrap();
    assert!(Arc::ptr_eq(&client.service, &service));
}

#[test]
fn test_bean_failure_is_isolated() {
    let mut container = Container::new();
    container
        .register_configuration::<FlakyConfiguration>()
        .unwrap();
    container.build().unwrap();

    // The failing bean is skipped, the rest of the graph still builds.
    assert!(container.get_instance_named::<Good>("good").is_ok());
    assert!(container.get_instance_named::<Bad>("bad").is_err());
}

#[test]
fn test_profile_gated_configuration_inactive() {
    let mut container = Container::new();
    container.register_configuration::<DevConfiguration>().unwrap();
    container.build().unwrap();

    assert!(container.get_instance_named::<DevMarker>("devMarker").is_err());
}

#[test]
fn test_profile_gated_configuration_active() {
    let mut container = Container::new();
    container.set_active_profiles(["dev"]);
    container.register_configuration::<DevConfiguration>().unwrap();
    container.build().unwrap();

    assert!(container.get_instance_named::<DevMarker>("devMarker").is_ok());
}

#[test]
fn test_profiles_activated_from_property_source() {
    let mut container = Container::new();
    container.add_property_source(
        Config::parse(r#"{"app": {"profiles": {"active": ["dev"]}}}"#).unwrap(),
    );
    container.register_configuration::<DevConfiguration>().unwrap();
    container.build().unwrap();

    assert!(container.get_instance_named::<DevMarker>("devMarker").is_ok());
}

#[test]
fn test_included_profiles_merge_sources() {
    let mut container = Container::new();
    container.add_property_source(Config::parse(r#"{"app": {"name": "base"}}"#).unwrap());
    container.add_profile_property_source(
        "staging",
        Config::parse(r#"{"app": {"name": "staging"}}"#).unwrap(),
    );
    container.include_profiles(["staging"]);
    container.build().unwrap();

    let app = container.get_instance::<AppProperties>().unwrap();
    assert_eq!(app.name, "staging");
}

#[test]
fn test_app_properties_defaults() {
    let mut container = Container::new();
    container.build().unwrap();

    let app = container.get_instance::<AppProperties>().unwrap();
    assert_eq!(app.name, "app");
}

#[test]
fn test_configuration_phase_order() {
    static BUILD_ORDER: Mutex<Vec<&'static str>> = Mutex::new(Vec::new());

    struct PreSetup;

    impl Default for PreSetup {
        fn default() -> Self {
            BUILD_ORDER.lock().unwrap().push("pre");
            Self
        }
    }

    impl Component for PreSetup {}

    #[configuration(role = "pre")]
    impl PreSetup {}

    struct MainSetup;

    impl Default for MainSetup {
        fn default() -> Self {
            BUILD_ORDER.lock().unwrap().push("main");
            Self
        }
    }

    impl Component for MainSetup {}

    #[configuration]
    impl MainSetup {}

    struct PostSetup;

    impl Default for PostSetup {
        fn default() -> Self {
            BUILD_ORDER.lock().unwrap().push("post");
            Self
        }
    }

    impl Component for PostSetup {}

    #[configuration(role = "post")]
    impl PostSetup {}

    let mut container = Container::new();
    // Registration order must not matter across role buckets.
    container.register_configuration::<PostSetup>().unwrap();
    container.register_configuration::<MainSetup>().unwrap();
    container.register_configuration::<PreSetup>().unwrap();
    container.build().unwrap();

    assert_eq!(*BUILD_ORDER.lock().unwrap(), vec!["pre", "main", "post"]);
}

#[test]
fn test_late_wiring_of_mutual_references() {
    #[derive(Default, Component)]
    struct Parent {
        #[inject]
        child: Option<Arc<Child>>,
    }

    #[derive(Default, Component)]
    struct Child {
        #[inject]
        parent: Late<Parent>,
    }

    let mut container = Container::new();
    container.provide(|| Parent::default()).unwrap();
    container.provide(|| Child::default()).unwrap();
    container.build().unwrap();

    let parent = container.get_instance::<Parent>().unwrap();
    let child = container.get_instance::<Child>().unwrap();
    assert!(Arc::ptr_eq(parent.child.as_ref().unwrap(), &child));
    assert!(Arc::ptr_eq(child.parent.get().unwrap(), &parent));
}

#[test]
fn test_constructor_cycle_is_fatal() {
    struct Chicken {
        _egg: Arc<Egg>,
    }

    impl Component for Chicken {}

    struct Egg {
        _chicken: Arc<Chicken>,
    }

    impl Component for Egg {}

    let mut container = Container::new();
    container.provide(|egg: Arc<Egg>| Chicken { _egg: egg }).unwrap();
    container
        .provide(|chicken: Arc<Chicken>| Egg { _chicken: chicken })
        .unwrap();

    let err = container.build().unwrap_err();
    match err {
        ContainerError::CircularDependency(chain) => {
            assert!(chain.contains("chicken"));
            assert!(chain.contains("egg"));
        }
        err => panic!("Expected circular dependency, got: {err}"),
    }
}

#[test]
fn test_fallible_constructor_is_fatal() {
    struct Widget;

    impl Component for Widget {}

    let mut container = Container::new();
    container
        .provide(|| -> Result<Widget, String> { Err("no widget".to_string()) })
        .unwrap();

    let err = container.build().unwrap_err();
    assert!(matches!(err, ContainerError::Constructor { .. }));
}

#[test]
fn test_second_build_is_rejected() {
    let mut container = Container::new();
    container.build().unwrap();

    let err = container.build().unwrap_err();
    assert!(matches!(err, ContainerError::AlreadyBuilt));
}

#[test]
fn test_get_instances_returns_all_of_type() {
    let mut container = Container::new();
    container.register_named("left", Foo { value: 1 }).unwrap();
    container.register_named("right", Foo { value: 2 }).unwrap();
    container.build().unwrap();

    let values: Vec<i32> = container
        .get_instances::<Foo>()
        .iter()
        .map(|foo| foo.value)
        .collect();
    assert_eq!(values, vec![1, 2]);
}

#[test]
fn test_with_eliminators() {
    struct AuditService;

    impl Component for AuditService {}

    let container = Container::new().with_eliminators(["Service"]);
    container.register(AuditService).unwrap();

    assert!(container.get_instance_named::<AuditService>("audit").is_ok());
}

#[test]
fn test_build_resolves_eagerly() {
    static CONSTRUCTED: Mutex<u32> = Mutex::new(0);

    struct Counter;

    impl Component for Counter {}

    let mut container = Container::new();
    container
        .provide(|| {
            *CONSTRUCTED.lock().unwrap() += 1;
            Counter
        })
        .unwrap();
    container.build().unwrap();

    assert_eq!(*CONSTRUCTED.lock().unwrap(), 1);
    container.get_instance::<Counter>().unwrap();
    assert_eq!(*CONSTRUCTED.lock().unwrap(), 1);
}
