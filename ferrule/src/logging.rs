use std::str::FromStr as _;

use tracing_subscriber::filter::{Directive, EnvFilter};
use tracing_subscriber::layer::SubscriberExt as _;
use tracing_subscriber::util::SubscriberInitExt as _;

use crate::properties::LoggingProperties;
use crate::{ContainerError, StdError};

/// Initializes the global tracing subscriber from the bound `logging`
/// section. Uses `try_init` so a container embedded next to another
/// subscriber, or a second container in the same process, keeps the one
/// already installed.
pub(crate) fn init(properties: &LoggingProperties) -> Result<(), ContainerError> {
    let env_filter = new_env_filter(properties).map_err(|source| ContainerError::Bind {
        section: "logging".to_owned(),
        source,
    })?;
    let _ = tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::Layer::default())
        .try_init();
    Ok(())
}

fn new_env_filter(properties: &LoggingProperties) -> Result<EnvFilter, StdError> {
    let level = tracing::Level::from_str(&properties.level).map_err(Box::new)?;
    let mut filter = EnvFilter::default().add_directive(level.into());
    for directive in &properties.directives {
        let directive: Directive = directive.parse().map_err(Box::new)?;
        filter = filter.add_directive(directive);
    }
    Ok(filter)
}
