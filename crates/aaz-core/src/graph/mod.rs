pub mod operation;
pub mod types;

pub use operation::*;
pub use types::*;

use crate::error::ParseError;

/// Parse a type graph from YAML.
pub fn from_yaml(input: &str) -> Result<TypeGraph, ParseError> {
    let graph: TypeGraph = serde_yaml_ng::from_str(input)?;
    validate_version(&graph)?;
    Ok(graph)
}

/// Parse a type graph from JSON.
pub fn from_json(input: &str) -> Result<TypeGraph, ParseError> {
    let graph: TypeGraph = serde_json::from_str(input)?;
    validate_version(&graph)?;
    Ok(graph)
}

fn validate_version(graph: &TypeGraph) -> Result<(), ParseError> {
    if !graph.version.starts_with("1.") {
        return Err(ParseError::UnsupportedVersion(graph.version.clone()));
    }
    Ok(())
}
