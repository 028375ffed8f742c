pub mod config;
pub mod convert;
pub mod diagnostics;
pub mod error;
pub mod graph;
pub mod resources;
pub mod wire;

use crate::diagnostics::Diagnostics;
use crate::graph::TypeGraph;

/// An emitted file with path and content.
#[derive(Debug, Clone)]
pub struct EmittedFile {
    pub path: String,
    pub content: String,
}

/// Trait for emitters that produce files from one or more type graphs.
pub trait Emitter {
    type Error: std::error::Error;
    fn emit(
        &self,
        graphs: &[TypeGraph],
        diagnostics: &mut Diagnostics,
    ) -> Result<Vec<EmittedFile>, Self::Error>;
}
