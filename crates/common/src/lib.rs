//! CiProbe Common Library
//!
//! Test data generation and entity cleanup for build server API tests:
//! - [`schema`] describes models declaratively (fields and directives)
//! - [`generator`] populates models from their schema and an override list
//! - [`registry`] records created entities and deletes them at teardown

pub mod error;
pub mod generator;
pub mod models;
pub mod random;
pub mod registry;
pub mod schema;
pub mod types;

// Re-export commonly used types
pub use error::{Error, Result};
pub use generator::{generate, generate_bundle, generate_default, KnownModels};
pub use models::*;
pub use registry::{EntityRegistry, EntityTransport, FlushReport};
pub use schema::{Entity, Field, FieldKind, Model, ModelSchema};
pub use types::Category;

/// CiProbe version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
