//! Schema submissions and their validated in-memory model.

use std::collections::BTreeMap;

use heck::ToSnakeCase;
use rustc_hash::FxHashSet;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::ident::{self, Canonicalizer};

/// Type names that would shadow the standard prelude inside the catalog.
const PRELUDE_SHADOWS: &[&str] = &[
    "Box", "Option", "Result", "String", "Vec", "Some", "None", "Ok", "Err",
];

/// File stems the catalog uses for itself.
const CATALOG_STEMS: &[&str] = &["mod", "prelude"];

/// A schema as submitted by an operator.
///
/// Field keys are kept in a `BTreeMap`, so iteration is lexicographic by
/// raw key no matter how the payload was ordered.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaSubmission {
    /// Proposed type name, in any casing.
    pub name: String,

    /// Field key to declared type expression.
    #[serde(default, alias = "definition")]
    pub fields: BTreeMap<String, String>,
}

impl SchemaSubmission {
    pub fn new<I, K, V>(name: impl Into<String>, fields: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            name: name.into(),
            fields: fields
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    /// Decode a JSON payload.
    pub fn from_json(payload: &str) -> Result<Self> {
        serde_json::from_str(payload).map_err(|e| Error::Payload(e.to_string()))
    }
}

/// Type names refused at submission time.
#[derive(Debug, Clone)]
pub struct ReservedNames {
    names: FxHashSet<String>,
}

impl ReservedNames {
    pub fn with_extra<I, S>(mut self, extra: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.names
            .extend(extra.into_iter().map(|s| s.as_ref().to_string()));
        self
    }

    pub fn contains(&self, type_name: &str) -> bool {
        self.names.contains(type_name)
    }
}

impl Default for ReservedNames {
    fn default() -> Self {
        Self {
            names: PRELUDE_SHADOWS.iter().map(|s| s.to_string()).collect(),
        }
    }
}

/// A single field of a schema, before canonicalization.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldSpec {
    /// Raw key as submitted; becomes the serialization tag.
    pub key: String,

    /// Declared type expression, untrusted until validated.
    pub declared_type: String,
}

/// A submission that passed the local checks.
#[derive(Debug, Clone)]
pub struct SchemaModel {
    raw_name: String,
    type_name: String,
    module_name: String,
    fields: Vec<FieldSpec>,
}

impl SchemaModel {
    /// Validate a submission.
    ///
    /// # Errors
    /// - `InvalidName` if the name is empty, canonicalizes to the
    ///   placeholder, is a keyword, or is reserved.
    /// - `MalformedFieldType` if a declared type is blank.
    pub fn new(
        submission: SchemaSubmission,
        canonicalizer: &Canonicalizer,
        reserved: &ReservedNames,
    ) -> Result<Self> {
        let SchemaSubmission { name, fields } = submission;

        let invalid = |reason: &str| Error::InvalidName {
            name: name.clone(),
            reason: reason.to_string(),
        };

        if name.trim().is_empty() {
            return Err(invalid("name is empty"));
        }

        let type_name = canonicalizer.canonicalize(&name);
        if ident::is_placeholder(&type_name) {
            return Err(invalid("name has no letters or digits"));
        }
        if !ident::is_plain_ident(&type_name) {
            return Err(invalid(&format!("`{type_name}` is a reserved word")));
        }
        if reserved.contains(&type_name) {
            return Err(invalid(&format!("`{type_name}` is reserved")));
        }

        let module_name = module_stem(&type_name);
        if CATALOG_STEMS.contains(&module_name.as_str()) || ident::module_ident(&module_name).is_none()
        {
            return Err(invalid(&format!(
                "file name `{module_name}` is reserved by the catalog"
            )));
        }

        let mut specs = Vec::with_capacity(fields.len());
        for (key, declared_type) in fields {
            if declared_type.trim().is_empty() {
                return Err(Error::MalformedFieldType {
                    field: key,
                    declared: declared_type,
                    reason: "declared type is empty".to_string(),
                });
            }
            specs.push(FieldSpec { key, declared_type });
        }

        Ok(Self {
            raw_name: name,
            type_name,
            module_name,
            fields: specs,
        })
    }

    /// The name as submitted.
    pub fn raw_name(&self) -> &str {
        &self.raw_name
    }

    /// Canonical type name.
    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    /// Snake-case file stem the type is published under.
    pub fn module_name(&self) -> &str {
        &self.module_name
    }

    /// Fields in lexicographic order of their raw keys.
    pub fn fields(&self) -> &[FieldSpec] {
        &self.fields
    }
}

/// Derive the catalog file stem for a canonical type name.
pub fn module_stem(type_name: &str) -> String {
    type_name.to_snake_case()
}
