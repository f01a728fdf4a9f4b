use std::fs;

use ferrule::{Config, PropertySources, resolve_references};
use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;

#[derive(Debug, Serialize, Deserialize, PartialEq)]
struct ServerConfig {
    bind_addr: String,
    workers: u32,
}

#[test]
fn test_config_new() {
    let config = Config::new();
    assert!(config.is_empty());
}

#[test]
fn test_config_set_and_get() {
    let mut config = Config::new();

    let server = ServerConfig {
        bind_addr: "127.0.0.1:8080".to_string(),
        workers: 4,
    };
    config.set("server", &server).unwrap();

    let retrieved: ServerConfig = config.get("server").unwrap();
    assert_eq!(retrieved, server);
    assert_eq!(config.len(), 1);
}

#[test]
fn test_config_get_nonexistent() {
    let config = Config::new();

    let result: Option<String> = config.get("nonexistent").unwrap();
    assert_eq!(result, None);
}

#[test]
fn test_config_parse_from_string() {
    let config = Config::parse(
        r#"
    {
        "server": {
            "bind_addr": "0.0.0.0:9090",
            "workers": 2
        }
    }
    "#,
    )
    .unwrap();

    let server: ServerConfig = config.get("server").unwrap();
    assert_eq!(server.bind_addr, "0.0.0.0:9090");
    assert_eq!(server.workers, 2);
}

#[test]
fn test_config_parse_invalid_json() {
    let result = Config::parse(r#"{ "invalid": json }"#);
    assert!(result.is_err());
}

#[test]
fn test_config_parse_file() {
    let temp_file = NamedTempFile::new().unwrap();
    fs::write(
        temp_file.path(),
        r#"{"server": {"bind_addr": "localhost:8080", "workers": 1}}"#,
    )
    .unwrap();

    let config = Config::parse_file(temp_file.path()).unwrap();
    let server: ServerConfig = config.get("server").unwrap();
    assert_eq!(server.bind_addr, "localhost:8080");
}

#[test]
fn test_config_parse_file_not_found() {
    let result = Config::parse_file("nonexistent_file.json");
    assert!(result.is_err());
}

#[test]
fn test_config_merge_objects() {
    let mut base = Config::parse(
        r#"{"database": {"host": "localhost", "port": 5432}}"#,
    )
    .unwrap();
    let overlay = Config::parse(
        r#"{"database": {"port": 3306, "ssl": true}, "cache": {"enabled": true}}"#,
    )
    .unwrap();

    base.merge_from(overlay);

    let database: serde_json::Value = base.get("database").unwrap();
    assert_eq!(database["host"].as_str().unwrap(), "localhost");
    assert_eq!(database["port"].as_u64().unwrap(), 3306);
    assert_eq!(database["ssl"].as_bool().unwrap(), true);
    let cache: serde_json::Value = base.get("cache").unwrap();
    assert_eq!(cache["enabled"].as_bool().unwrap(), true);
}

#[test]
fn test_config_merge_arrays_extend() {
    let mut base = Config::parse(r#"{"tags": ["production", "web"]}"#).unwrap();
    let overlay = Config::parse(r#"{"tags": ["monitoring"]}"#).unwrap();

    base.merge_from(overlay);

    let tags: Vec<String> = base.get("tags").unwrap();
    assert_eq!(tags, vec!["production", "web", "monitoring"]);
}

#[test]
fn test_config_merge_replace_primitives() {
    let mut base = Config::parse(r#"{"port": 8080, "name": "old"}"#).unwrap();
    let overlay = Config::parse(r#"{"port": 9090, "name": "new"}"#).unwrap();

    base.merge_from(overlay);

    let port: u16 = base.get("port").unwrap();
    let name: String = base.get("name").unwrap();
    assert_eq!(port, 9090);
    assert_eq!(name, "new");
}

#[test]
fn test_config_lookup_dotted_path() {
    let config = Config::parse(
        r#"{"app": {"profiles": {"active": ["dev"]}, "name": "demo"}}"#,
    )
    .unwrap();

    assert_eq!(
        config.lookup("app.name").and_then(|v| v.as_str()),
        Some("demo")
    );
    assert_eq!(
        config.lookup("app.profiles.active").map(|v| v.is_array()),
        Some(true)
    );
    assert_eq!(config.lookup("app.missing"), None);
    assert_eq!(config.lookup("missing.name"), None);
}

#[test]
fn test_config_set_path() {
    let mut config = Config::new();
    config.set_path("server.tls.enabled", serde_json::Value::Bool(true));
    config.set_path("server.port", serde_json::json!(8443));

    assert_eq!(
        config.lookup("server.tls.enabled").and_then(|v| v.as_bool()),
        Some(true)
    );
    assert_eq!(
        config.lookup("server.port").and_then(|v| v.as_u64()),
        Some(8443)
    );
}

#[test]
fn test_config_set_path_replaces_non_objects() {
    let mut config = Config::new();
    config.set_path("server", serde_json::json!(8080));
    config.set_path("server.port", serde_json::json!(9090));

    assert_eq!(
        config.lookup("server.port").and_then(|v| v.as_u64()),
        Some(9090)
    );
}

#[test]
fn test_config_fold() {
    let mut config = Config::parse(r#"{"jwt": {"issuer": "a"}}"#).unwrap();
    config.fold("jwt", serde_json::json!({"expires": 3600}));

    assert_eq!(
        config.lookup("jwt.issuer").and_then(|v| v.as_str()),
        Some("a")
    );
    assert_eq!(
        config.lookup("jwt.expires").and_then(|v| v.as_u64()),
        Some(3600)
    );
}

#[test]
fn test_property_sources_base_order() {
    let mut sources = PropertySources::new();
    sources.add(Config::parse(r#"{"server": {"port": 8080, "host": "a"}}"#).unwrap());
    sources.add(Config::parse(r#"{"server": {"port": 9090}}"#).unwrap());

    let merged = sources.merged(&[]);
    assert_eq!(
        merged.lookup("server.port").and_then(|v| v.as_u64()),
        Some(9090)
    );
    assert_eq!(
        merged.lookup("server.host").and_then(|v| v.as_str()),
        Some("a")
    );
}

#[test]
fn test_property_sources_profile_overlay() {
    let mut sources = PropertySources::new();
    sources.add(Config::parse(r#"{"server": {"port": 8080}}"#).unwrap());
    sources.add_profile(
        "dev",
        Config::parse(r#"{"server": {"port": 3000}}"#).unwrap(),
    );

    let inactive = sources.merged(&[]);
    assert_eq!(
        inactive.lookup("server.port").and_then(|v| v.as_u64()),
        Some(8080)
    );

    let active = sources.merged(&["dev".to_string()]);
    assert_eq!(
        active.lookup("server.port").and_then(|v| v.as_u64()),
        Some(3000)
    );
}

#[test]
fn test_property_sources_overrides_win() {
    let mut sources = PropertySources::new();
    sources.add(Config::parse(r#"{"server": {"port": 8080}}"#).unwrap());
    sources.add_profile(
        "dev",
        Config::parse(r#"{"server": {"port": 3000}}"#).unwrap(),
    );
    sources.set_override("server.port", serde_json::json!(1234));

    let merged = sources.merged(&["dev".to_string()]);
    assert_eq!(
        merged.lookup("server.port").and_then(|v| v.as_u64()),
        Some(1234)
    );
}

#[test]
fn test_resolve_references_simple() {
    let tree = Config::parse(r#"{"app": {"name": "demo"}}"#).unwrap();
    assert_eq!(resolve_references("${app.name}", &tree), "demo");
    assert_eq!(
        resolve_references("hello ${app.name}!", &tree),
        "hello demo!"
    );
}

#[test]
fn test_resolve_references_default_fallback() {
    let tree = Config::parse(r#"{"other": {}}"#).unwrap();
    assert_eq!(
        resolve_references("${other.name:fallback}", &tree),
        "fallback"
    );
    assert_eq!(resolve_references("${missing.key:}", &tree), "");
    assert_eq!(resolve_references("${missing.key}", &tree), "");
}

#[test]
fn test_resolve_references_numbers_and_bools() {
    let tree = Config::parse(r#"{"server": {"port": 8080, "tls": false}}"#).unwrap();
    assert_eq!(
        resolve_references("${server.port}:${server.tls}", &tree),
        "8080:false"
    );
}

#[test]
fn test_resolve_references_idempotent_without_tokens() {
    let tree = Config::new();
    assert_eq!(resolve_references("plain text", &tree), "plain text");
    assert_eq!(resolve_references("", &tree), "");
}

#[test]
fn test_resolve_references_unterminated_token() {
    let tree = Config::parse(r#"{"app": {"name": "demo"}}"#).unwrap();
    assert_eq!(resolve_references("${app.name", &tree), "${app.name");
    assert_eq!(
        resolve_references("${app.name} ${oops", &tree),
        "demo ${oops"
    );
}
