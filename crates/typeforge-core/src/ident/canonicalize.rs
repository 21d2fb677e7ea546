//! Canonicalization of arbitrary strings into exported identifiers.
//!
//! `user_id` becomes `UserID`, `api_key` becomes `APIKey`, `HTTP_SERVER`
//! becomes `HTTPServer`. The function is total: input without a single
//! letter yields the placeholder `_`, anything else starts with a letter.

use super::initialisms::Initialisms;

/// Identifier returned when the input has no usable content.
pub const PLACEHOLDER: &str = "_";

/// Returns true if `ident` is the placeholder identifier.
pub fn is_placeholder(ident: &str) -> bool {
    ident == PLACEHOLDER
}

/// Canonicalize `raw` with the default initialism table.
pub fn canonicalize(raw: &str) -> String {
    Canonicalizer::default().canonicalize(raw)
}

/// How the input is cased, which decides how it is split into words.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Casing {
    /// Every character is a lowercase letter.
    Lower,
    /// Uppercase letters and at least one underscore (`USER_ID`).
    ScreamingSnake,
    Mixed,
}

/// Turns raw field keys and type names into exported identifiers.
#[derive(Debug, Clone, Default)]
pub struct Canonicalizer {
    initialisms: Initialisms,
}

impl Canonicalizer {
    /// Create a canonicalizer with the given initialism table.
    pub fn new(initialisms: Initialisms) -> Self {
        Self { initialisms }
    }

    pub fn initialisms(&self) -> &Initialisms {
        &self.initialisms
    }

    /// Canonicalize `raw`.
    ///
    /// Idempotent: canonicalizing the result again returns it unchanged.
    pub fn canonicalize(&self, raw: &str) -> String {
        // A second pass can re-split words that the first pass joined
        // (`h_ttp` -> `HTtp` -> `HTTP`). Passes after the first only
        // uppercase letters, so this reaches a fixed point.
        let mut current = self.pass(raw);
        loop {
            let next = self.pass(&current);
            if next == current {
                return current;
            }
            current = next;
        }
    }

    fn pass(&self, raw: &str) -> String {
        let trimmed = raw.trim_start_matches(|c: char| !is_usable(c));
        if trimmed.is_empty() {
            return PLACEHOLDER.to_string();
        }

        // Anything that cannot appear in an identifier separates words.
        let mut chars: Vec<char> = trimmed
            .chars()
            .map(|c| if is_usable(c) { c } else { '_' })
            .collect();

        match classify(&chars) {
            Casing::Lower => {
                let word: String = chars.iter().collect();
                let mut out = String::with_capacity(word.len());
                self.push_word(&mut out, &word);
                return finish(&out);
            }
            Casing::ScreamingSnake => {
                chars = chars.iter().flat_map(|c| c.to_lowercase()).collect();
            }
            Casing::Mixed => {}
        }

        let mut out = String::with_capacity(chars.len());
        let mut word = String::new();
        let mut i = 0;
        while i < chars.len() {
            let c = chars[i];

            if c == '_' {
                let run_start = i;
                while i < chars.len() && chars[i] == '_' {
                    i += 1;
                }
                self.push_word(&mut out, &word);
                word.clear();

                // Keep one underscore between digits so `v2_1` stays readable.
                let between_digits = run_start > 0
                    && chars[run_start - 1].is_ascii_digit()
                    && chars.get(i).is_some_and(char::is_ascii_digit);
                if between_digits {
                    out.push('_');
                }
                continue;
            }

            word.push(c);
            let ends_word = c.is_lowercase() && chars.get(i + 1).is_some_and(|n| !n.is_lowercase());
            if ends_word {
                self.push_word(&mut out, &word);
                word.clear();
            }
            i += 1;
        }
        self.push_word(&mut out, &word);

        finish(&out)
    }

    /// Append `word` to `out`, recased.
    fn push_word(&self, out: &mut String, word: &str) {
        if word.is_empty() {
            return;
        }

        if let Some(initialism) = self.initialisms.lookup(word) {
            out.push_str(initialism);
        } else if word.to_lowercase() == word {
            let mut chars = word.chars();
            if let Some(first) = chars.next() {
                out.extend(first.to_uppercase());
                out.push_str(chars.as_str());
            }
        } else {
            out.push_str(word);
        }
    }
}

fn is_usable(c: char) -> bool {
    c.is_alphabetic() || c.is_ascii_digit()
}

fn classify(chars: &[char]) -> Casing {
    if chars.iter().all(|c| c.is_lowercase()) {
        Casing::Lower
    } else if chars.contains(&'_') && chars.iter().all(|c| c.is_uppercase() || *c == '_') {
        Casing::ScreamingSnake
    } else {
        Casing::Mixed
    }
}

/// Trim separator residue and make sure the identifier starts with a letter.
///
/// A leading digit is replaced by `_` and trimmed with the other
/// separators, so `2fa` loses its `2`.
fn finish(assembled: &str) -> String {
    let trimmed = assembled
        .trim_start_matches(|c: char| !c.is_alphabetic())
        .trim_end_matches('_');
    if trimmed.is_empty() {
        PLACEHOLDER.to_string()
    } else {
        trimmed.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CORPUS: &[&str] = &[
        "",
        "_",
        "!!!",
        "__test__",
        "user_id",
        "api_key",
        "userId",
        "UserID",
        "HTTP_SERVER",
        "http_server",
        "HttpServer",
        "idUrl",
        "h_ttp",
        "v2_1",
        "v2__1",
        "2fa",
        "123_abc",
        "foo-bar baz",
        "created_at",
        "qty",
        "SKU",
        "iPhone",
        "u_tf8",
        "Ünïcode_name",
        "straße",
        "x__y__z",
        "a1b2c3",
        "___1___",
        "9",
        "11",
        "3d_model",
        "42_is_the_answer",
        "order",
        "ID",
        "id",
        "Id",
        "IDs",
        "xml_http_request",
        "  leading spaces",
        "trailing___",
    ];

    #[test]
    fn test_initialisms() {
        assert_eq!(canonicalize("user_id"), "UserID");
        assert_eq!(canonicalize("api_key"), "APIKey");
        assert_eq!(canonicalize("id"), "ID");
        assert_eq!(canonicalize("Id"), "ID");
        assert_eq!(canonicalize("userId"), "UserID");
        assert_eq!(canonicalize("xml_http_request"), "XMLHTTPRequest");
    }

    #[test]
    fn test_boundaries() {
        assert_eq!(canonicalize(""), "_");
        assert_eq!(canonicalize("!!!"), "_");
        assert_eq!(canonicalize("___"), "_");
        assert_eq!(canonicalize("__test__"), "Test");
        assert_eq!(canonicalize("trailing___"), "Trailing");
    }

    #[test]
    fn test_screaming_snake_is_split_into_words() {
        assert_eq!(canonicalize("HTTP_SERVER"), "HTTPServer");
        assert_eq!(canonicalize("USER_NAME"), "UserName");
        // Without underscores an uppercase word is left alone.
        assert_eq!(canonicalize("SKU"), "SKU");
    }

    #[test]
    fn test_mixed_case() {
        assert_eq!(canonicalize("fooBar"), "FooBar");
        assert_eq!(canonicalize("iPhone"), "IPhone");
        assert_eq!(canonicalize("foo-bar baz"), "FooBarBaz");
        assert_eq!(canonicalize("created_at"), "CreatedAt");
        assert_eq!(canonicalize("qty"), "Qty");
    }

    #[test]
    fn test_digits() {
        assert_eq!(canonicalize("v2_1"), "V2_1");
        assert_eq!(canonicalize("v2__1"), "V2_1");
        assert_eq!(canonicalize("a1b2c3"), "A1b2c3");
    }

    #[test]
    fn test_leading_digits_are_dropped() {
        assert_eq!(canonicalize("2fa"), "Fa");
        assert_eq!(canonicalize("123_abc"), "Abc");
        assert_eq!(canonicalize("9"), "_");
        assert_eq!(canonicalize("11"), "_");
        assert_eq!(canonicalize("1_2"), "_");
        assert_eq!(canonicalize("3d_model"), "DModel");
    }

    #[test]
    fn test_resplit_reaches_fixed_point() {
        assert_eq!(canonicalize("h_ttp"), "HTTP");
    }

    #[test]
    fn test_idempotent() {
        for raw in CORPUS {
            let once = canonicalize(raw);
            let twice = canonicalize(&once);
            assert_eq!(once, twice, "not idempotent for {raw:?}");
        }
    }

    #[test]
    fn test_deterministic() {
        let canonicalizer = Canonicalizer::default();
        for raw in CORPUS {
            assert_eq!(canonicalizer.canonicalize(raw), canonicalizer.canonicalize(raw));
        }
    }

    #[test]
    fn test_result_is_identifier_shaped() {
        for raw in CORPUS {
            let ident = canonicalize(raw);
            let first = ident.chars().next().expect("never empty");
            assert!(
                first.is_alphabetic() || is_placeholder(&ident),
                "{raw:?} -> {ident:?}"
            );
            assert!(
                ident.chars().all(|c| c.is_alphanumeric() || c == '_'),
                "{raw:?} -> {ident:?}"
            );
        }
    }

    #[test]
    fn test_injected_initialisms() {
        let canonicalizer = Canonicalizer::new(Initialisms::common().with_extra(["sku"]));
        assert_eq!(canonicalizer.canonicalize("sku"), "SKU");
        assert_eq!(canonicalizer.canonicalize("product_sku"), "ProductSKU");

        let plain = Canonicalizer::new(Initialisms::empty());
        assert_eq!(plain.canonicalize("user_id"), "UserId");
    }

    #[test]
    fn test_placeholder() {
        assert!(is_placeholder(&canonicalize("$$")));
        assert!(!is_placeholder(&canonicalize("x")));
    }
}
