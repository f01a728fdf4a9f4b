/// Type alias for boxed errors that can be sent across threads.
///
/// This is the standard error type for fallible constructors and bean
/// factory methods managed by the container.
pub type StdError = Box<dyn std::error::Error + Send + Sync>;

/// Errors that can occur during registration, binding or resolution.
#[derive(Debug)]
pub enum ContainerError {
    /// A subject that cannot be managed was registered, for example a
    /// role-less object passed to the configuration entry point or a type
    /// whose derived name is empty.
    InvalidObjectType(String),
    /// A registration name is already taken within its role bucket.
    NameIsTaken(String),
    /// A required dependency could not be resolved.
    MissingDependency {
        /// Name of the component that requested the dependency.
        component: String,
        /// Type or registration name of the missing dependency.
        dependency: String,
    },
    /// A registration requires itself, directly or transitively, through
    /// constructor parameters. The payload is the resolution chain.
    CircularDependency(String),
    /// A configuration section failed to bind onto its properties struct.
    Bind { section: String, source: StdError },
    /// A constructor or bean factory method returned an error.
    Constructor { name: String, source: StdError },
    /// `build` was called on a container that has already been built.
    AlreadyBuilt,
}

impl std::fmt::Display for ContainerError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ContainerError::InvalidObjectType(v) => write!(f, "Invalid object type: {v}"),
            ContainerError::NameIsTaken(v) => write!(f, "Name is already taken: {v}"),
            ContainerError::MissingDependency {
                component,
                dependency,
            } => write!(f, "Component {component} requires missing dependency {dependency}"),
            ContainerError::CircularDependency(v) => {
                write!(f, "Circular dependency detected: {v}")
            }
            ContainerError::Bind { section, source } => {
                write!(f, "Cannot bind configuration section {section}: {source}")
            }
            ContainerError::Constructor { name, source } => {
                write!(f, "Constructor for {name} failed: {source}")
            }
            ContainerError::AlreadyBuilt => write!(f, "Container is already built"),
        }
    }
}

impl std::error::Error for ContainerError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ContainerError::Bind { source, .. } => Some(source.as_ref()),
            ContainerError::Constructor { source, .. } => Some(source.as_ref()),
            _ => None,
        }
    }
}
