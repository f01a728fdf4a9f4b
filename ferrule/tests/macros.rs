use std::sync::Arc;

use ferrule::{Component, Container, configuration};
use serde::{Deserialize, Serialize};

#[derive(Component)]
#[component(name = "primaryStore")]
struct Store;

struct Database {
    dsn: &'static str,
}

impl Component for Database {}

#[derive(Default, Component)]
struct Auditor {
    #[inject]
    db: Option<Arc<Database>>,
}

#[derive(Default, Component)]
struct Connector {
    #[inject(name = "replica")]
    db: Option<Arc<Database>>,
}

#[derive(Clone, Default, Serialize, Deserialize, Component)]
struct Limits {
    retries: u32,
    burst: u32,
}

#[derive(Default, Component)]
struct Client {
    #[inject(default = "retries=3")]
    limits: Option<Arc<Limits>>,
}

#[test]
fn test_component_explicit_name() {
    let container = Container::new();
    container.register(Store).unwrap();

    assert!(container.get_instance_named::<Store>("primaryStore").is_ok());
    assert!(container.get_instance_named::<Store>("store").is_err());
}

#[test]
fn test_inject_by_type() {
    let mut container = Container::new();
    container.register(Database { dsn: "primary" }).unwrap();
    container.provide(Auditor::default as fn() -> Auditor).unwrap();
    container.build().unwrap();

    let auditor = container.get_instance::<Auditor>().unwrap();
    assert_eq!(auditor.db.as_ref().unwrap().dsn, "primary");
}

#[test]
fn test_inject_by_name() {
    let mut container = Container::new();
    container
        .register_named("primary", Database { dsn: "primary" })
        .unwrap();
    container
        .register_named("replica", Database { dsn: "replica" })
        .unwrap();
    container
        .provide(Connector::default as fn() -> Connector)
        .unwrap();
    container.build().unwrap();

    let connector = container.get_instance::<Connector>().unwrap();
    assert_eq!(connector.db.as_ref().unwrap().dsn, "replica");
}

#[test]
fn test_inject_missing_dependency_is_fatal() {
    let mut container = Container::new();
    container.provide(Auditor::default as fn() -> Auditor).unwrap();

    assert!(container.build().is_err());
}

#[test]
fn test_inject_default_falls_back_to_seeded_value() {
    let mut container = Container::new();
    container.provide(Client::default as fn() -> Client).unwrap();
    container.build().unwrap();

    let client = container.get_instance::<Client>().unwrap();
    let limits = client.limits.as_ref().unwrap();
    assert_eq!(limits.retries, 3);
    assert_eq!(limits.burst, 0);
}

#[test]
fn test_inject_default_prefers_registration() {
    let mut container = Container::new();
    container.register(Limits { retries: 9, burst: 1 }).unwrap();
    container.provide(Client::default as fn() -> Client).unwrap();
    container.build().unwrap();

    let client = container.get_instance::<Client>().unwrap();
    let registered = container.get_instance::<Limits>().unwrap();
    assert!(Arc::ptr_eq(client.limits.as_ref().unwrap(), &registered));
    assert_eq!(client.limits.as_ref().unwrap().retries, 9);
}

#[derive(Default, Component)]
struct NamingConfiguration;

struct Token;

impl Component for Token {}

#[configuration]
impl NamingConfiguration {
    #[bean(name = "specialToken")]
    fn make_token(&self) -> Token {
        Token
    }
}

#[test]
fn test_bean_explicit_name() {
    let mut container = Container::new();
    container
        .register_configuration::<NamingConfiguration>()
        .unwrap();
    container.build().unwrap();

    assert!(container.get_instance_named::<Token>("specialToken").is_ok());
    assert!(container.get_instance_named::<Token>("makeToken").is_err());
}
