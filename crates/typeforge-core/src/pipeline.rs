//! The submission pipeline: schema in, published record type out.
//!
//! ```text
//! Received ─► Generating ─► Validating ─► Published
//!     │            │             │
//!     └────────────┴─────────────┴──► Rejected
//! ```
//!
//! A rejected submission leaves neither the catalog directory nor the
//! registry state changed.

use std::fmt;
use std::sync::Arc;

use crate::compile::{CompileValidator, Validator};
use crate::config::ForgeConfig;
use crate::error::Result;
use crate::generate::TypeSourceGenerator;
use crate::ident::Canonicalizer;
use crate::registry::{CatalogStore, PublishReceipt, TypeRegistry};
use crate::schema::{ReservedNames, SchemaModel, SchemaSubmission};

/// Lifecycle of one submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmissionState {
    Received,
    Generating,
    Validating,
    Published,
    Rejected,
}

impl fmt::Display for SubmissionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Received => "received",
            Self::Generating => "generating",
            Self::Validating => "validating",
            Self::Published => "published",
            Self::Rejected => "rejected",
        };
        f.write_str(name)
    }
}

/// Runs submissions through generation, validation, and publication.
pub struct SchemaPipeline {
    canonicalizer: Canonicalizer,
    reserved: ReservedNames,
    generator: TypeSourceGenerator,
    registry: Arc<TypeRegistry>,
    validator: Box<dyn Validator>,
}

impl SchemaPipeline {
    /// Open the configured catalog and build the production pipeline.
    pub fn new(config: &ForgeConfig) -> Result<Self> {
        let store = CatalogStore::open(&config.catalog_dir)?;
        let registry = Arc::new(TypeRegistry::open(store, config.activation)?);
        let validator = CompileValidator::new(config.validation.clone())?;

        Ok(Self::with_parts(
            config.canonicalizer(),
            config.reserved_names(),
            registry,
            Box::new(validator),
        ))
    }

    /// Assemble a pipeline from explicit collaborators.
    pub fn with_parts(
        canonicalizer: Canonicalizer,
        reserved: ReservedNames,
        registry: Arc<TypeRegistry>,
        validator: Box<dyn Validator>,
    ) -> Self {
        Self {
            generator: TypeSourceGenerator::new(canonicalizer.clone()),
            canonicalizer,
            reserved,
            registry,
            validator,
        }
    }

    pub fn registry(&self) -> &Arc<TypeRegistry> {
        &self.registry
    }

    pub fn canonicalizer(&self) -> &Canonicalizer {
        &self.canonicalizer
    }

    /// Process one submission end to end.
    ///
    /// The type name is reserved before any source is generated, so a
    /// name collision is reported without running the validator.
    pub fn submit(&self, submission: SchemaSubmission) -> Result<PublishReceipt> {
        let type_name = self.canonicalizer.canonicalize(&submission.name);
        let span = tracing::info_span!("submission", type_name = %type_name);
        let _enter = span.enter();

        let result = self.run(submission);
        match &result {
            Ok(receipt) => {
                tracing::info!(
                    state = %SubmissionState::Published,
                    active = receipt.active,
                    "Submission published"
                );
            }
            Err(e) => {
                tracing::info!(
                    state = %SubmissionState::Rejected,
                    kind = %e.kind(),
                    "Submission rejected: {}",
                    e
                );
            }
        }
        result
    }

    fn run(&self, submission: SchemaSubmission) -> Result<PublishReceipt> {
        tracing::info!(state = %SubmissionState::Received, fields = submission.fields.len());
        let schema = SchemaModel::new(submission, &self.canonicalizer, &self.reserved)?;

        let reservation = self.registry.reserve(schema.type_name())?;

        tracing::info!(state = %SubmissionState::Generating);
        let generated = self.generator.generate(&schema)?;

        tracing::info!(state = %SubmissionState::Validating);
        let validated = self.validator.validate(&generated, self.registry.store())?;

        self.registry.publish(reservation, validated)
    }
}
