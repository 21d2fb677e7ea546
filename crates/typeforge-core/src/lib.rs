//! Core engine for typeforge: schema-driven record types.
//!
//! This crate provides:
//! - Identifier canonicalization with a configurable initialism table
//! - Record-type source generation from submitted schemas
//! - Validation with `syn` and a bounded `rustc` run
//! - A durable catalog and the registry that publishes into it

pub mod compile;
pub mod config;
pub mod error;
pub mod generate;
pub mod ident;
pub mod pipeline;
pub mod registry;
pub mod response;
pub mod schema;

pub use compile::{
    CompileReport, CompileValidator, Diagnostic, ValidatedDefinition, ValidationMode, Validator,
    ValidatorConfig,
};
pub use config::ForgeConfig;
pub use error::{Error, ErrorKind, Result};
pub use generate::{GeneratedDefinition, GeneratedField, TypeSourceGenerator};
pub use ident::{Canonicalizer, Initialisms, canonicalize};
pub use pipeline::{SchemaPipeline, SubmissionState};
pub use registry::{
    Activation, CatalogStore, PublishReceipt, Reservation, TypeDefinition, TypeRegistry,
};
pub use response::{Status, SubmissionResponse};
pub use schema::{ReservedNames, SchemaModel, SchemaSubmission};
