//! Type-graph to wire-schema conversion.

pub mod cls;
mod discriminator;
pub mod format;
pub mod naming;
pub mod operation;
pub mod orchestrator;
pub mod scalar;
pub mod schema;
pub mod visibility;

pub use cls::ClsTable;
pub use operation::OperationAssembler;
pub use orchestrator::{convert_operation, pageable};
pub use schema::{ConvertContext, SchemaConverter};
pub use visibility::{EffectivePayload, EffectiveProperty, effective_payload};
