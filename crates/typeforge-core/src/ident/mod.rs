//! Identifier canonicalization.
//!
//! Turns arbitrary user-supplied strings into exported, conventionally
//! cased identifiers. See [`Canonicalizer`] for the rules.

mod canonicalize;
mod initialisms;

pub use canonicalize::{Canonicalizer, PLACEHOLDER, canonicalize, is_placeholder};
pub use initialisms::Initialisms;

/// Returns true if `ident` can be written as a plain Rust identifier.
///
/// Keywords (`Self`, `type`, ...) and the bare placeholder are rejected.
pub fn is_plain_ident(ident: &str) -> bool {
    syn::parse_str::<syn::Ident>(ident).is_ok()
}

/// Render `stem` as a module name, using the raw form for keywords.
///
/// Returns `None` for names that cannot be raw identifiers either
/// (`self`, `super`, `crate`, `_`).
pub fn module_ident(stem: &str) -> Option<String> {
    if is_plain_ident(stem) {
        return Some(stem.to_string());
    }
    let raw = format!("r#{stem}");
    syn::parse_str::<syn::Ident>(&raw).ok().map(|_| raw)
}
