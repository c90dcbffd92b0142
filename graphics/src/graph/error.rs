//! Render graph errors.

use crate::error::GraphicsError;

/// Errors raised while building, loading or compiling a render graph.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GraphError {
    /// The graph contains a cycle through `node`.
    ///
    /// Render graphs must be directed acyclic graphs; the previous
    /// execution order is kept.
    CyclicDependency { node: String },
    /// A node with this name already exists.
    DuplicateNode(String),
    /// The node pool is full.
    NodeCapacity(u32),
    /// The resource pool is full.
    ResourceCapacity(u32),
    /// The graph description is malformed.
    InvalidDescription(String),
    /// A resource `type` string is not one of the known resource types.
    UnknownResourceType(String),
    /// A `format` string does not name a texture format.
    UnknownFormat(String),
    /// The description file could not be read.
    Io(String),
    /// Creating a backing GPU object failed.
    Graphics(GraphicsError),
}

impl std::fmt::Display for GraphError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::CyclicDependency { node } => {
                write!(f, "render graph contains cyclic dependency through node {node}")
            }
            Self::DuplicateNode(name) => write!(f, "node {name} already exists"),
            Self::NodeCapacity(capacity) => {
                write!(f, "render graph node limit of {capacity} reached")
            }
            Self::ResourceCapacity(capacity) => {
                write!(f, "render graph resource limit of {capacity} reached")
            }
            Self::InvalidDescription(msg) => write!(f, "invalid render graph description: {msg}"),
            Self::UnknownResourceType(name) => write!(f, "unknown resource type: {name}"),
            Self::UnknownFormat(name) => write!(f, "unknown texture format: {name}"),
            Self::Io(msg) => write!(f, "failed to read render graph description: {msg}"),
            Self::Graphics(err) => write!(f, "graphics error: {err}"),
        }
    }
}

impl std::error::Error for GraphError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Graphics(err) => Some(err),
            _ => None,
        }
    }
}

impl From<GraphicsError> for GraphError {
    fn from(err: GraphicsError) -> Self {
        Self::Graphics(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = GraphError::CyclicDependency {
            node: "lighting".into(),
        };
        assert_eq!(
            err.to_string(),
            "render graph contains cyclic dependency through node lighting"
        );

        let err: GraphError = GraphicsError::PoolExhausted("texture").into();
        assert_eq!(err.to_string(), "graphics error: texture pool exhausted");
        assert!(std::error::Error::source(&err).is_some());
    }
}
