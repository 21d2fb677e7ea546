//! Durable catalog storage.
//!
//! The catalog is a directory of Rust source files that an application
//! includes as a module:
//!
//! ```text
//! catalog/
//! ├── mod.rs       # index: one `pub mod` + `pub use` per entry
//! ├── prelude.rs   # primitive aliases
//! └── order.rs     # one record type per file
//! ```

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use proc_macro2::LineColumn;
use quote::ToTokens;
use serde::Serialize;
use syn::{Attribute, Fields, Item, LitStr};
use tempfile::NamedTempFile;

use super::prelude;
use crate::error::{Error, Result};
use crate::generate::{GeneratedDefinition, GeneratedField};
use crate::ident;

/// File name of the catalog index.
pub const INDEX_FILE: &str = "mod.rs";

/// File name of the primitive prelude.
pub const PRELUDE_FILE: &str = "prelude.rs";

/// A record type read back from the catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TypeDefinition {
    /// Type name
    pub name: String,

    /// File stem inside the catalog
    pub module_name: String,

    /// Fields in declaration order
    pub fields: Vec<GeneratedField>,
}

impl From<&GeneratedDefinition> for TypeDefinition {
    fn from(def: &GeneratedDefinition) -> Self {
        Self {
            name: def.type_name.clone(),
            module_name: def.module_name.clone(),
            fields: def.fields.clone(),
        }
    }
}

/// Backing storage for the type catalog.
#[derive(Debug, Clone)]
pub struct CatalogStore {
    root: PathBuf,
}

impl CatalogStore {
    /// Open the catalog at `root`, creating the layout if it is missing.
    ///
    /// # Errors
    /// Returns an error if the directory or its scaffold files cannot be
    /// created.
    pub fn open(root: impl Into<PathBuf>) -> Result<Self> {
        let store = Self { root: root.into() };
        fs::create_dir_all(&store.root)?;

        let prelude_path = store.root.join(PRELUDE_FILE);
        if !prelude_path.exists() {
            write_atomic(&store.root, &prelude_path, &prelude::render())?;
        }
        let index_path = store.index_path();
        if !index_path.exists() {
            write_atomic(&store.root, &index_path, &render_index(&[]))?;
        }

        Ok(store)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn index_path(&self) -> PathBuf {
        self.root.join(INDEX_FILE)
    }

    pub fn prelude_path(&self) -> PathBuf {
        self.root.join(PRELUDE_FILE)
    }

    /// Path of the entry file for `module_name`.
    pub fn entry_path(&self, module_name: &str) -> PathBuf {
        self.root.join(format!("{module_name}.rs"))
    }

    /// Whether an entry with this file stem is durably stored.
    pub fn contains(&self, module_name: &str) -> bool {
        self.entry_path(module_name).exists()
    }

    /// Stems of all entry files, sorted.
    pub fn entry_stems(&self) -> Result<Vec<String>> {
        let mut stems = Vec::new();
        for entry in fs::read_dir(&self.root)? {
            let path = entry?.path();
            if !path.is_file() {
                continue;
            }
            if path.extension().is_none_or(|ext| ext != "rs") {
                let hidden = path
                    .file_name()
                    .and_then(|n| n.to_str())
                    .is_some_and(|n| n.starts_with('.'));
                if !hidden {
                    tracing::warn!("Ignoring stray file in catalog: {}", path.display());
                }
                continue;
            }
            let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
                tracing::warn!("Skipping non-UTF-8 catalog file: {}", path.display());
                continue;
            };
            if format!("{stem}.rs") == INDEX_FILE || format!("{stem}.rs") == PRELUDE_FILE {
                continue;
            }
            stems.push(stem.to_string());
        }
        stems.sort();
        Ok(stems)
    }

    /// Read every entry back into a [`TypeDefinition`].
    ///
    /// # Errors
    /// Returns `Error::Catalog` if an entry does not hold exactly one
    /// record type.
    pub fn load(&self) -> Result<Vec<TypeDefinition>> {
        self.entry_stems()?
            .into_iter()
            .map(|stem| self.load_entry(&stem))
            .collect()
    }

    /// Read a single entry.
    pub fn load_entry(&self, module_name: &str) -> Result<TypeDefinition> {
        let path = self.entry_path(module_name);
        let source = fs::read_to_string(&path)?;
        parse_entry(module_name, &source)
            .map_err(|reason| Error::Catalog(format!("{}: {}", path.display(), reason)))
    }

    /// Durably write a new entry and rewrite the index.
    ///
    /// The entry file is removed again if the index cannot be written,
    /// so a failed call leaves the catalog as it was.
    pub(crate) fn write_entry(&self, def: &GeneratedDefinition) -> io::Result<PathBuf> {
        let path = self.entry_path(&def.module_name);
        write_atomic(&self.root, &path, &def.source)?;

        let result = self
            .index_entries()
            .and_then(|entries| write_atomic(&self.root, &self.index_path(), &render_index(&entries)));

        if let Err(e) = result {
            if let Err(cleanup) = fs::remove_file(&path) {
                tracing::warn!(
                    "Failed to roll back catalog entry {}: {}",
                    path.display(),
                    cleanup
                );
            }
            return Err(e);
        }

        Ok(path)
    }

    /// Copy the prelude and every entry into `dest`.
    ///
    /// Returns the definitions that were copied.
    pub(crate) fn copy_into(&self, dest: &Path) -> Result<Vec<TypeDefinition>> {
        fs::copy(self.prelude_path(), dest.join(PRELUDE_FILE))?;

        let definitions = self.load()?;
        for def in &definitions {
            let file = format!("{}.rs", def.module_name);
            fs::copy(self.root.join(&file), dest.join(&file))?;
        }
        Ok(definitions)
    }

    fn index_entries(&self) -> io::Result<Vec<IndexEntry>> {
        let definitions = self.load().map_err(|e| match e {
            Error::Io(io) => io,
            other => io::Error::other(other.to_string()),
        })?;
        Ok(definitions.iter().map(IndexEntry::from).collect())
    }
}

/// One `pub mod` / `pub use` pair in an index file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexEntry {
    pub module_name: String,
    pub type_name: String,
}

impl From<&TypeDefinition> for IndexEntry {
    fn from(def: &TypeDefinition) -> Self {
        Self {
            module_name: def.module_name.clone(),
            type_name: def.name.clone(),
        }
    }
}

impl From<&GeneratedDefinition> for IndexEntry {
    fn from(def: &GeneratedDefinition) -> Self {
        Self {
            module_name: def.module_name.clone(),
            type_name: def.type_name.clone(),
        }
    }
}

/// Render an index file (`mod.rs` in the catalog, `lib.rs` in a
/// validation workspace).
pub fn render_index(entries: &[IndexEntry]) -> String {
    let mut code = String::new();
    code.push_str("//! Published record types.\n");
    code.push_str("//!\n");
    code.push_str("//! Generated by typeforge. Do not edit by hand.\n\n");
    code.push_str("#![allow(dead_code, non_snake_case, non_camel_case_types)]\n\n");
    code.push_str("pub mod prelude;\n");

    for entry in entries {
        let module = ident::module_ident(&entry.module_name)
            .unwrap_or_else(|| entry.module_name.clone());
        code.push('\n');
        code.push_str(&format!("pub mod {module};\n"));
        code.push_str(&format!("pub use {module}::{};\n", entry.type_name));
    }
    code
}

fn write_atomic(dir: &Path, path: &Path, contents: &str) -> io::Result<()> {
    let mut tmp = NamedTempFile::new_in(dir)?;
    tmp.write_all(contents.as_bytes())?;
    tmp.as_file().sync_all()?;
    tmp.persist(path).map_err(|e| e.error)?;
    Ok(())
}

fn parse_entry(module_name: &str, source: &str) -> std::result::Result<TypeDefinition, String> {
    let file = syn::parse_file(source).map_err(|e| format!("failed to parse: {e}"))?;

    let mut structs = file.items.iter().filter_map(|item| match item {
        Item::Struct(s) => Some(s),
        _ => None,
    });
    let item = structs.next().ok_or("no record type found")?;
    if structs.next().is_some() {
        return Err("more than one record type".to_string());
    }

    let Fields::Named(named) = &item.fields else {
        return Err(format!("`{}` has no named fields", item.ident));
    };

    let fields = named
        .named
        .iter()
        .filter_map(|field| {
            let name = field.ident.as_ref()?.to_string();
            Some(GeneratedField {
                tag: serde_rename(&field.attrs).unwrap_or_else(|| name.clone()),
                declared_type: declared_text(source, &field.ty),
                ident: name,
            })
        })
        .collect();

    Ok(TypeDefinition {
        name: item.ident.to_string(),
        module_name: module_name.to_string(),
        fields,
    })
}

/// The type as written in `source`, falling back to its token rendering
/// (`Vec < Money >`) when span locations are unavailable.
fn declared_text(source: &str, ty: &syn::Type) -> String {
    let tokens = ty.to_token_stream();
    let rendered = tokens.to_string();

    let trees: Vec<_> = tokens.into_iter().collect();
    let (Some(first), Some(last)) = (trees.first(), trees.last()) else {
        return rendered;
    };

    source_slice(source, first.span().start(), last.span().end())
        .filter(|text| {
            syn::parse_str::<syn::Type>(text)
                .is_ok_and(|parsed| parsed.to_token_stream().to_string() == rendered)
        })
        .map(str::to_string)
        .unwrap_or(rendered)
}

/// Slice `source` between two span positions (1-based lines, 0-based
/// character columns).
fn source_slice(source: &str, start: LineColumn, end: LineColumn) -> Option<&str> {
    let offset = |pos: LineColumn| -> Option<usize> {
        if pos.line == 0 {
            return None;
        }
        let line_start = match pos.line {
            1 => 0,
            n => source.match_indices('\n').nth(n - 2)?.0 + 1,
        };
        let rest = &source[line_start..];
        let column = rest
            .char_indices()
            .nth(pos.column)
            .map_or(rest.len(), |(i, _)| i);
        Some(line_start + column)
    };

    let (from, to) = (offset(start)?, offset(end)?);
    source.get(from..to)
}

/// Extract the tag from `#[cfg_attr(feature = "serde", serde(rename = "..."))]`.
fn serde_rename(attrs: &[Attribute]) -> Option<String> {
    let mut tag = None;
    for attr in attrs.iter().filter(|a| a.path().is_ident("cfg_attr")) {
        let parsed = attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("serde") {
                return meta.parse_nested_meta(|inner| {
                    if inner.path.is_ident("rename") {
                        let lit: LitStr = inner.value()?.parse()?;
                        tag = Some(lit.value());
                    }
                    Ok(())
                });
            }
            if meta.input.peek(syn::Token![=]) {
                let _: syn::Expr = meta.value()?.parse()?;
            }
            Ok(())
        });
        if let Err(e) = parsed {
            tracing::debug!("Ignoring unrecognised cfg_attr: {}", e);
        }
    }
    tag
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ident::Canonicalizer;
    use crate::schema::{ReservedNames, SchemaModel, SchemaSubmission};
    use crate::generate::TypeSourceGenerator;
    use tempfile::TempDir;

    fn generated(name: &str, fields: &[(&str, &str)]) -> GeneratedDefinition {
        let schema = SchemaModel::new(
            SchemaSubmission::new(name, fields.iter().copied()),
            &Canonicalizer::default(),
            &ReservedNames::default(),
        )
        .unwrap();
        TypeSourceGenerator::default().generate(&schema).unwrap()
    }

    #[test]
    fn test_open_creates_layout() {
        let temp = TempDir::new().expect("Failed to create temp dir");
        let store = CatalogStore::open(temp.path().join("catalog")).unwrap();

        assert!(store.index_path().exists());
        assert!(store.prelude_path().exists());
        assert!(store.load().unwrap().is_empty());
    }

    #[test]
    fn test_write_and_load_entry() {
        let temp = TempDir::new().expect("Failed to create temp dir");
        let store = CatalogStore::open(temp.path()).unwrap();

        let def = generated("order", &[("qty", "int"), ("sku", "string")]);
        let path = store.write_entry(&def).unwrap();
        assert_eq!(path, store.entry_path("order"));
        assert!(store.contains("order"));

        let loaded = store.load().unwrap();
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded[0].name, "Order");
        assert_eq!(loaded[0].fields[0].ident, "Qty");
        assert_eq!(loaded[0].fields[0].tag, "qty");
        assert_eq!(loaded[0].fields[1].declared_type, "string");

        let index = fs::read_to_string(store.index_path()).unwrap();
        assert!(index.contains("pub mod order;"));
        assert!(index.contains("pub use order::Order;"));
    }

    #[test]
    fn test_tags_round_trip_through_files() {
        let temp = TempDir::new().expect("Failed to create temp dir");
        let store = CatalogStore::open(temp.path()).unwrap();

        store
            .write_entry(&generated("event", &[("@timestamp", "string")]))
            .unwrap();
        let loaded = store.load_entry("event").unwrap();
        assert_eq!(loaded.fields[0].ident, "Timestamp");
        assert_eq!(loaded.fields[0].tag, "@timestamp");
    }

    #[test]
    fn test_declared_types_load_as_written() {
        let temp = TempDir::new().expect("Failed to create temp dir");
        let store = CatalogStore::open(temp.path()).unwrap();

        let declared = ["Vec<Money>", "HashMap<string, Vec<int>>", "[u8; 16]", "Option<&'static str>"];
        let fields: Vec<_> = ["a", "b", "c", "d"].into_iter().zip(declared).collect();
        store.write_entry(&generated("ledger", &fields)).unwrap();

        let loaded = store.load_entry("ledger").unwrap();
        let types: Vec<_> = loaded.fields.iter().map(|f| f.declared_type.as_str()).collect();
        assert_eq!(types, declared);
    }

    #[test]
    fn test_source_slice() {
        let source = "ab\ncdé f\n";
        let at = |line, column| LineColumn { line, column };
        assert_eq!(source_slice(source, at(2, 0), at(2, 3)), Some("cdé"));
        assert_eq!(source_slice(source, at(1, 1), at(2, 1)), Some("b\nc"));
        assert_eq!(source_slice(source, at(0, 0), at(1, 1)), None);
    }

    #[test]
    fn test_corrupt_entry_is_reported() {
        let temp = TempDir::new().expect("Failed to create temp dir");
        let store = CatalogStore::open(temp.path()).unwrap();
        fs::write(store.entry_path("broken"), "pub struct {").unwrap();

        let err = store.load().unwrap_err();
        assert!(matches!(err, Error::Catalog(_)));
    }

    #[test]
    fn test_render_index_uses_raw_idents() {
        let index = render_index(&[IndexEntry {
            module_name: "type".to_string(),
            type_name: "Type".to_string(),
        }]);
        assert!(index.contains("pub mod r#type;"));
        assert!(index.contains("pub use r#type::Type;"));
        syn::parse_file(&index).unwrap();
    }
}
