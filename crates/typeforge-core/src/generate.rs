//! Rendering a schema into Rust source for a record type.
//!
//! The output is deterministic: the same schema always yields the same
//! bytes. Declared types are copied verbatim; checking them is the
//! validator's job.

use proc_macro2::Literal;
use rustc_hash::FxHashMap;

use crate::error::{Error, Result};
use crate::ident::{self, Canonicalizer};
use crate::schema::SchemaModel;

/// Cargo feature that gates the serde derives in generated files.
pub const SERDE_FEATURE: &str = "serde";

/// A single field of a generated record type.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct GeneratedField {
    /// Canonical field identifier.
    pub ident: String,

    /// Declared type expression, as submitted.
    pub declared_type: String,

    /// Original field key, used as the serialization tag.
    pub tag: String,
}

/// Source for one record type, not yet validated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedDefinition {
    /// Canonical type name.
    pub type_name: String,

    /// File stem the type is published under.
    pub module_name: String,

    /// Fields in raw-key order.
    pub fields: Vec<GeneratedField>,

    /// Rendered source text.
    pub source: String,
}

impl GeneratedDefinition {
    /// File name of the definition inside the catalog.
    pub fn file_name(&self) -> String {
        format!("{}.rs", self.module_name)
    }
}

/// Renders [`SchemaModel`]s into record-type source.
#[derive(Debug, Clone, Default)]
pub struct TypeSourceGenerator {
    canonicalizer: Canonicalizer,
}

impl TypeSourceGenerator {
    pub fn new(canonicalizer: Canonicalizer) -> Self {
        Self { canonicalizer }
    }

    /// Generate the record type for `schema`.
    ///
    /// # Errors
    /// - `InvalidFieldName` if a key canonicalizes to something that
    ///   cannot name a field (`_`, `Self`).
    /// - `DuplicateField` if two keys canonicalize to the same identifier,
    ///   compared case-insensitively.
    pub fn generate(&self, schema: &SchemaModel) -> Result<GeneratedDefinition> {
        let mut seen: FxHashMap<String, &str> = FxHashMap::default();
        let mut fields = Vec::with_capacity(schema.fields().len());

        for spec in schema.fields() {
            let field_ident = self.canonicalizer.canonicalize(&spec.key);

            if ident::is_placeholder(&field_ident) {
                return Err(Error::InvalidFieldName {
                    key: spec.key.clone(),
                    reason: "key has no letters or digits".to_string(),
                });
            }
            if !ident::is_plain_ident(&field_ident) {
                return Err(Error::InvalidFieldName {
                    key: spec.key.clone(),
                    reason: format!("`{field_ident}` is a reserved word"),
                });
            }

            if let Some(first) = seen.insert(field_ident.to_lowercase(), &spec.key) {
                return Err(Error::DuplicateField {
                    first: first.to_string(),
                    second: spec.key.clone(),
                    ident: field_ident,
                });
            }

            fields.push(GeneratedField {
                ident: field_ident,
                declared_type: spec.declared_type.clone(),
                tag: spec.key.clone(),
            });
        }

        let source = render(schema.type_name(), &fields);
        tracing::debug!(
            type_name = schema.type_name(),
            fields = fields.len(),
            "Generated record type source"
        );

        Ok(GeneratedDefinition {
            type_name: schema.type_name().to_string(),
            module_name: schema.module_name().to_string(),
            fields,
            source,
        })
    }
}

fn render(type_name: &str, fields: &[GeneratedField]) -> String {
    let mut code = String::new();

    code.push_str(&format!("//! `{type_name}` record type.\n"));
    code.push_str("//!\n");
    code.push_str("//! Generated by typeforge. Do not edit by hand.\n\n");

    code.push_str("#[allow(unused_imports)]\n");
    code.push_str("use super::prelude::*;\n");
    code.push_str("#[allow(unused_imports)]\n");
    code.push_str("use super::*;\n\n");

    code.push_str("#[derive(Debug, Clone, PartialEq)]\n");
    code.push_str(&format!(
        "#[cfg_attr(feature = \"{SERDE_FEATURE}\", derive(serde::Serialize, serde::Deserialize))]\n"
    ));
    code.push_str(&format!("pub struct {type_name} {{\n"));

    for field in fields {
        let tag = Literal::string(&field.tag);
        code.push_str(&format!(
            "    #[cfg_attr(feature = \"{SERDE_FEATURE}\", serde(rename = {tag}))]\n"
        ));
        code.push_str(&format!("    pub {}: {},\n", field.ident, field.declared_type));
    }

    code.push_str("}\n");
    code
}
