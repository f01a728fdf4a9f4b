//! # ferrule
//!
//! A dependency-injection and auto-configuration container for Rust
//! applications: registered constructors, instances and configuration
//! objects become a fully wired graph of shared singletons, with
//! profile-gated activation and declarative field binding from layered
//! property sources.
//!
//! ## Core Concepts
//!
//! - **Container**: an explicit value holding the metadata registry and
//!   the resolved instance map; independent containers never share state
//! - **Component**: the base trait for managed objects, usually derived
//! - **Constructor**: a plain function or closure taking `Arc<T>`
//!   parameters; the container resolves the parameters by type
//! - **Properties**: a struct bound from one section of the merged
//!   configuration tree, with `default`/`value` tag semantics
//! - **Configuration**: a component built in a dedicated phase whose
//!   `#[bean]` methods produce more components
//!
//! ## Basic Usage
//!
//! ```rust
//! use std::sync::Arc;
//!
//! use ferrule::{Component, Container};
//!
//! struct Settings {
//!     url: String,
//! }
//!
//! impl Component for Settings {}
//!
//! struct Repository {
//!     settings: Arc<Settings>,
//! }
//!
//! impl Component for Repository {}
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut container = Container::new();
//!     container.register(Settings {
//!         url: "sqlite::memory:".to_string(),
//!     })?;
//!     container.provide(|settings: Arc<Settings>| Repository { settings })?;
//!     container.build()?;
//!
//!     let repository = container.get_instance::<Repository>()?;
//!     println!("Connected to {}", repository.settings.url);
//!     Ok(())
//! }
//! ```
//!
//! ## Properties Binding
//!
//! A properties struct is bound from the section named by its prefix;
//! `default` tags fill fields still at their zero value and `value` tags
//! resolve `${path:default}` references against the merged tree:
//!
//! ```rust
//! use ferrule::{Config, Container, Properties};
//! use serde::{Deserialize, Serialize};
//!
//! #[derive(Clone, Default, Serialize, Deserialize, Properties)]
//! #[serde(default)]
//! #[properties(prefix = "jwt")]
//! struct JwtProperties {
//!     #[property(default = "https://example.com")]
//!     issuer: String,
//!     #[property(value = "${jwt.expires:3600}")]
//!     expires: u64,
//! }
//!
//! fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
//!     let mut container = Container::new();
//!     container.add_property_source(Config::parse(
//!         r#"{"jwt": {"issuer": "https://auth.local"}}"#,
//!     )?);
//!     container.register_properties::<JwtProperties>();
//!     container.build()?;
//!
//!     let jwt = container.get_instance::<JwtProperties>()?;
//!     assert_eq!(jwt.issuer, "https://auth.local");
//!     assert_eq!(jwt.expires, 3600);
//!     Ok(())
//! }
//! ```
//!
//! ## Configurations and Beans
//!
//! A `#[configuration]` impl block runs in the configuration phase of the
//! build; its `#[bean]` methods register components named after the
//! method:
//!
//! ```rust
//! use ferrule::{Component, Container, configuration};
//!
//! #[derive(Default, Component)]
//! struct TokenConfiguration {
//!     #[property(value = "${token.secret:changeme}")]
//!     secret: String,
//! }
//!
//! struct TokenService {
//!     secret: String,
//! }
//!
//! impl Component for TokenService {}
//!
//! #[configuration]
//! impl TokenConfiguration {
//!     #[bean]
//!     fn token_service(&self) -> TokenService {
//!         TokenService {
//!             secret: self.secret.clone(),
//!         }
//!     }
//! }
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut container = Container::new();
//!     container.register_configuration::<TokenConfiguration>()?;
//!     container.build()?;
//!
//!     let service = container.get_instance_named::<TokenService>("tokenService")?;
//!     assert_eq!(service.secret, "changeme");
//!     Ok(())
//! }
//! ```
//!
//! ## Features
//!
//! - `macros` (default): enables the `Component` and `Properties` derives
//!   and the `#[configuration]` attribute

mod component;
mod config;
mod configuration;
mod constructor;
mod container;
mod error;
mod factory;
mod logging;
mod properties;
mod registry;
mod resolver;
mod tags;

pub use component::*;
pub use config::*;
pub use configuration::*;
pub use constructor::*;
pub use container::*;
pub use error::*;
pub use factory::*;
pub use properties::*;
pub use registry::*;
pub use resolver::*;
pub use tags::*;

#[cfg(feature = "macros")]
pub use ferrule_macros::*;
