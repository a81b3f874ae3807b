//! Field-tree schema compiler.
//!
//! Compiles declarative, arbitrarily nested document field trees into a
//! normalized relational schema: tables, columns, indexes, foreign keys,
//! enum types and the relation declarations used for query assembly.

pub mod compiler;
pub mod config;
pub mod error;
pub mod fields;
pub mod naming;
pub mod relation;
pub mod schema;
pub mod session;
pub mod table;
pub mod walker;

pub use compiler::{
    compile_collection, compile_global, compile_global_versions, compile_schema,
    compile_versions, register_collection,
};
pub use config::{CompilerConfig, LocalizationConfig};
pub use error::SchemaError;
pub use schema::CompiledSchema;
pub use session::{Session, SharedSession};
