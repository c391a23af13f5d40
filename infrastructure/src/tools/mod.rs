//! Tool catalogue
//!
//! - [`ToolRegistry`]: every connected provider's tools, behind
//!   [`ToolCatalogPort`](conductor_application::ToolCatalogPort)
//! - [`JsonSchemaToolConverter`]: descriptors as function-calling schemas

mod registry;
mod schema;

pub use registry::{RegistryStats, ToolHandle, ToolRegistry};
pub use schema::JsonSchemaToolConverter;
