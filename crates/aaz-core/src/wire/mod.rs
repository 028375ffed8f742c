//! Wire schema: the JSON shapes consumed by the command-line generator.

pub mod operation;
pub mod schema;

pub use operation::*;
pub use schema::*;
