//! Primitive type names available to every schema.

/// Alias name to the Rust type it stands for.
pub const PRIMITIVES: &[(&str, &str)] = &[
    ("int", "i64"),
    ("int8", "i8"),
    ("int16", "i16"),
    ("int32", "i32"),
    ("int64", "i64"),
    ("uint", "u64"),
    ("uint8", "u8"),
    ("uint16", "u16"),
    ("uint32", "u32"),
    ("uint64", "u64"),
    ("float", "f64"),
    ("float32", "f32"),
    ("float64", "f64"),
    ("string", "String"),
    ("byte", "u8"),
    ("rune", "char"),
    ("boolean", "bool"),
    ("bytes", "Vec<u8>"),
];

/// Collections re-exported so declared types can name them unqualified.
const COLLECTIONS: &str = "pub use std::collections::{BTreeMap, HashMap, HashSet};\n";

/// Returns the Rust type behind a primitive alias.
pub fn resolve(alias: &str) -> Option<&'static str> {
    PRIMITIVES
        .iter()
        .find(|(name, _)| *name == alias)
        .map(|(_, ty)| *ty)
}

/// Render `prelude.rs`.
pub fn render() -> String {
    let mut code = String::new();
    code.push_str("//! Primitive type names accepted in schemas.\n");
    code.push_str("//!\n");
    code.push_str("//! Generated by typeforge. Do not edit by hand.\n\n");
    code.push_str("#![allow(non_camel_case_types)]\n\n");
    code.push_str(COLLECTIONS);
    code.push('\n');
    for (alias, ty) in PRIMITIVES {
        code.push_str(&format!("pub type {alias} = {ty};\n"));
    }
    code
}
