//! Validating generated definitions before they are published.

use quote::ToTokens;
use syn::visit::{self, Visit};
use syn::{Fields, Item, Visibility};

use super::errors::{Diagnostic, DiagnosticParser};
use super::toolchain::{RunOutcome, ToolchainManager};
use super::types::{CompileReport, ValidatedDefinition, ValidationMode, ValidatorConfig};
use super::workspace::ScratchWorkspace;
use crate::error::{Error, Result};
use crate::generate::GeneratedDefinition;
use crate::registry::CatalogStore;

/// Decides whether a generated definition may be published.
pub trait Validator: Send + Sync {
    /// Validate `def` against the currently published `catalog`.
    ///
    /// Implementations must not modify the catalog.
    fn validate(
        &self,
        def: &GeneratedDefinition,
        catalog: &CatalogStore,
    ) -> Result<ValidatedDefinition>;
}

/// Validator backed by `syn` and, in toolchain mode, `rustc`.
pub struct CompileValidator {
    config: ValidatorConfig,
    toolchain: Option<ToolchainManager>,
}

impl CompileValidator {
    /// Create a validator, locating rustc when the mode needs it.
    pub fn new(config: ValidatorConfig) -> Result<Self> {
        let toolchain = match config.mode {
            ValidationMode::Toolchain => {
                Some(ToolchainManager::resolve(config.rustc.as_deref())?)
            }
            ValidationMode::Embedded => None,
        };
        Ok(Self { config, toolchain })
    }

    pub fn config(&self) -> &ValidatorConfig {
        &self.config
    }

    pub fn toolchain(&self) -> Option<&ToolchainManager> {
        self.toolchain.as_ref()
    }

    fn check_toolchain(
        &self,
        toolchain: &ToolchainManager,
        def: &GeneratedDefinition,
        catalog: &CatalogStore,
    ) -> Result<()> {
        let workspace = ScratchWorkspace::create(self.config.scratch_dir.as_deref(), catalog, def)?;

        let mut args = vec![
            "--crate-type=lib".to_string(),
            "--crate-name=typeforge_check".to_string(),
            format!("--edition={}", self.config.edition),
            "--emit=metadata".to_string(),
            "--error-format=json".to_string(),
            "--out-dir".to_string(),
            workspace.out_dir().display().to_string(),
        ];
        args.extend(self.config.extra_rustc_flags.iter().cloned());
        args.push(workspace.crate_root().display().to_string());

        let timeout = self.config.timeout();
        let output = match toolchain.run(&args, workspace.root(), timeout)? {
            RunOutcome::Finished(output) => output,
            RunOutcome::TimedOut => {
                tracing::warn!("Validation of {} timed out", def.type_name);
                return Err(Error::Compile(CompileReport::timeout(timeout)));
            }
        };

        if output.status.success() {
            return Ok(());
        }

        let diagnostics: Vec<Diagnostic> = DiagnosticParser::new(workspace.root())
            .parse(&output.stderr)
            .into_iter()
            .filter(Diagnostic::is_error)
            .collect();
        tracing::debug!(
            "rustc rejected {} with {} error(s)",
            def.type_name,
            diagnostics.len()
        );

        let raw = if output.stderr.trim().is_empty() {
            format!("rustc exited with {}", output.status)
        } else {
            output.stderr
        };

        Err(Error::Compile(CompileReport {
            raw,
            diagnostics,
            timed_out: false,
        }))
    }
}

impl Validator for CompileValidator {
    fn validate(
        &self,
        def: &GeneratedDefinition,
        catalog: &CatalogStore,
    ) -> Result<ValidatedDefinition> {
        check_structure(def)?;

        if let Some(toolchain) = &self.toolchain {
            self.check_toolchain(toolchain, def, catalog)?;
        }

        Ok(ValidatedDefinition::new(def.clone()))
    }
}

/// Embedded check: every declared type is a type expression and the file
/// holds exactly the record type that was generated.
pub fn check_structure(def: &GeneratedDefinition) -> Result<()> {
    let mut expected = Vec::with_capacity(def.fields.len());
    for field in &def.fields {
        let malformed = |reason: String| Error::MalformedFieldType {
            field: field.tag.clone(),
            declared: field.declared_type.clone(),
            reason,
        };

        let ty = syn::parse_str::<syn::Type>(&field.declared_type)
            .map_err(|e| malformed(e.to_string()))?;

        let mut guard = TypeGuard::default();
        guard.visit_type(&ty);
        if let Some(reason) = guard.rejected {
            return Err(malformed(reason));
        }

        expected.push((field.ident.as_str(), ty.to_token_stream().to_string()));
    }

    let file = syn::parse_file(&def.source)
        .map_err(|e| shape_error(format!("{}: {}", def.file_name(), e)))?;

    let mut record = None;
    for item in &file.items {
        match item {
            Item::Use(_) => {}
            Item::Struct(s) if record.is_none() => record = Some(s),
            _ => {
                return Err(shape_error(format!(
                    "{}: unexpected item in generated source",
                    def.file_name()
                )));
            }
        }
    }

    let Some(record) = record else {
        return Err(shape_error(format!("{}: record type missing", def.file_name())));
    };
    if record.ident != def.type_name
        || !matches!(record.vis, Visibility::Public(_))
        || !record.generics.params.is_empty()
    {
        return Err(shape_error(format!(
            "{}: expected `pub struct {}`",
            def.file_name(),
            def.type_name
        )));
    }

    let Fields::Named(named) = &record.fields else {
        return Err(shape_error(format!("{}: expected named fields", def.file_name())));
    };

    let actual: Vec<(String, String)> = named
        .named
        .iter()
        .map(|f| {
            let ident = f.ident.as_ref().map(ToString::to_string).unwrap_or_default();
            (ident, f.ty.to_token_stream().to_string())
        })
        .collect();

    let matches = actual.len() == expected.len()
        && actual
            .iter()
            .zip(&expected)
            .all(|((ai, at), (ei, et))| ai == ei && at == et);
    if !matches {
        return Err(shape_error(format!(
            "{}: fields of `{}` do not match the schema",
            def.file_name(),
            def.type_name
        )));
    }

    Ok(())
}

fn shape_error(message: String) -> Error {
    Error::Compile(CompileReport {
        raw: message.clone(),
        diagnostics: vec![Diagnostic::error(message)],
        timed_out: false,
    })
}

/// Walks a declared type and rejects anything beyond plain type syntax.
///
/// Expressions may only appear as array lengths or const arguments, and
/// there they must be integer literals or plain paths. Blocks, items,
/// attributes and macros would let rustc act on the host (`#[path]`,
/// `include_str!`) before type checking.
#[derive(Default)]
struct TypeGuard {
    rejected: Option<String>,
}

impl TypeGuard {
    fn reject(&mut self, reason: String) {
        if self.rejected.is_none() {
            self.rejected = Some(reason);
        }
    }
}

impl<'ast> Visit<'ast> for TypeGuard {
    fn visit_type(&mut self, ty: &'ast syn::Type) {
        match ty {
            syn::Type::Infer(_) => self.reject("`_` is not allowed in a field type".to_string()),
            syn::Type::ImplTrait(_) => {
                self.reject("`impl Trait` is not allowed in a field type".to_string())
            }
            syn::Type::Verbatim(tokens) => {
                self.reject(format!("unsupported type syntax `{tokens}`"))
            }
            _ => visit::visit_type(self, ty),
        }
    }

    fn visit_expr(&mut self, expr: &'ast syn::Expr) {
        match expr {
            syn::Expr::Lit(lit) if lit.attrs.is_empty() && matches!(lit.lit, syn::Lit::Int(_)) => {}
            syn::Expr::Path(path) if is_plain_path(path) => {}
            syn::Expr::Macro(mac) => {
                let name = mac.mac.path.to_token_stream().to_string().replace(' ', "");
                self.reject(format!("macro `{name}!` is not allowed in a type"));
            }
            other => self.reject(format!(
                "`{}` is not allowed in a type; array lengths must be integer literals or constants",
                other.to_token_stream()
            )),
        }
    }

    fn visit_macro(&mut self, mac: &'ast syn::Macro) {
        let name = mac.path.to_token_stream().to_string().replace(' ', "");
        self.reject(format!("macro `{name}!` is not allowed in a type"));
    }

    fn visit_attribute(&mut self, attr: &'ast syn::Attribute) {
        self.reject(format!(
            "attribute `{}` is not allowed in a type",
            attr.to_token_stream()
        ));
    }

    fn visit_item(&mut self, _item: &'ast syn::Item) {
        self.reject("items are not allowed in a type".to_string());
    }

    fn visit_block(&mut self, _block: &'ast syn::Block) {
        self.reject("blocks are not allowed in a type".to_string());
    }
}

fn is_plain_path(expr: &syn::ExprPath) -> bool {
    expr.attrs.is_empty()
        && expr.qself.is_none()
        && expr
            .path
            .segments
            .iter()
            .all(|seg| seg.arguments.is_none())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generate::{GeneratedField, TypeSourceGenerator};
    use crate::ident::Canonicalizer;
    use crate::schema::{ReservedNames, SchemaModel, SchemaSubmission};
    use tempfile::TempDir;

    fn generate(name: &str, fields: &[(&str, &str)]) -> GeneratedDefinition {
        let schema = SchemaModel::new(
            SchemaSubmission::new(name, fields.iter().copied()),
            &Canonicalizer::default(),
            &ReservedNames::default(),
        )
        .unwrap();
        TypeSourceGenerator::default().generate(&schema).unwrap()
    }

    fn embedded() -> CompileValidator {
        CompileValidator::new(ValidatorConfig::embedded()).unwrap()
    }

    #[test]
    fn test_embedded_accepts_well_formed() {
        let temp = TempDir::new().unwrap();
        let store = CatalogStore::open(temp.path()).unwrap();
        let def = generate("order", &[("sku", "string"), ("tags", "Vec<string>")]);

        let validated = embedded().validate(&def, &store).unwrap();
        assert_eq!(validated.definition(), &def);
    }

    #[test]
    fn test_malformed_type() {
        let def = generate("order", &[("qty", "int int")]);
        let err = check_structure(&def).unwrap_err();
        assert!(matches!(err, Error::MalformedFieldType { .. }));
    }

    #[test]
    fn test_injection_is_rejected() {
        let def = generate("order", &[("qty", "int, pub Extra: int")]);
        assert!(matches!(
            check_structure(&def).unwrap_err(),
            Error::MalformedFieldType { .. }
        ));

        let def = generate("order", &[("qty", "int }\nfn main() {}\nstruct X {")]);
        assert!(check_structure(&def).is_err());
    }

    #[test]
    fn test_macros_are_rejected() {
        let def = generate("order", &[("qty", "[u8; include!(\"/etc/passwd\")]")]);
        match check_structure(&def).unwrap_err() {
            Error::MalformedFieldType { reason, .. } => assert!(reason.contains("include!")),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_expressions_in_types_are_rejected() {
        let hostile = [
            "[u8; { #[path = \"/etc/shadow\"] mod leak; 0 }]",
            "[u8; { 0 }]",
            "[u8; (|| 0)()]",
            "[u8; 1 + 1]",
            "Foo<{ mod leak; 0 }>",
            "fn(#[path = \"/etc/shadow\"] u8)",
            "[u8; N::<{ 0 }>]",
        ];
        for declared in hostile {
            let def = generate("order", &[("qty", declared)]);
            match check_structure(&def) {
                Err(Error::MalformedFieldType { .. }) => {}
                other => panic!("{declared:?} was not rejected: {other:?}"),
            }
        }
    }

    #[test]
    fn test_plain_array_lengths_are_accepted() {
        for declared in ["[u8; 16]", "[u8; 4usize]", "[int; LEN]", "Option<[string; 2]>"] {
            let def = generate("order", &[("qty", declared)]);
            check_structure(&def).unwrap();
        }
    }

    #[test]
    fn test_tampered_source_is_rejected() {
        let mut def = generate("order", &[("qty", "int")]);
        def.source.push_str("\nfn extra() {}\n");
        assert!(matches!(check_structure(&def).unwrap_err(), Error::Compile(_)));

        let mut def = generate("order", &[("qty", "int")]);
        def.fields.push(GeneratedField {
            ident: "Sku".to_string(),
            declared_type: "string".to_string(),
            tag: "sku".to_string(),
        });
        assert!(matches!(check_structure(&def).unwrap_err(), Error::Compile(_)));
    }

    #[test]
    fn test_rustc_accepts_and_rejects() {
        if which::which("rustc").is_err() {
            return;
        }
        let temp = TempDir::new().unwrap();
        let store = CatalogStore::open(temp.path().join("catalog")).unwrap();
        let validator = CompileValidator::new(ValidatorConfig::default()).unwrap();

        let good = generate("order", &[("qty", "int"), ("sku", "string")]);
        validator.validate(&good, &store).unwrap();

        let bad = generate("order", &[("sku", "strng")]);
        match validator.validate(&bad, &store).unwrap_err() {
            Error::Compile(report) => {
                assert!(!report.timed_out);
                assert!(report.raw.contains("strng"));
                let diag = &report.diagnostics[0];
                assert_eq!(diag.code.as_deref(), Some("E0412"));
                assert_eq!(diag.location.as_ref().unwrap().file, "order.rs");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
