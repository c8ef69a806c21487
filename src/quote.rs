//! Quoting primitives: identifier quoting, string-literal escaping and
//! operator validation.
//!
//! These are the only places the crate makes lexical decisions; everything
//! above works on tokens.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::{QueryError, QueryResult};
use crate::keyword;

/// Identifiers matching this pattern may be emitted bare, provided they do
/// not collide with a reserved word.
static BARE_IDENT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_$]*$").expect("bare identifier pattern"));

/// Quote an identifier for PostgreSQL.
///
/// With `force` set the identifier is always double-quoted. Otherwise it is
/// emitted bare when it is a plain word that does not collide with a
/// reserved keyword, and double-quoted (internal `"` doubled) in every other
/// case.
pub fn quote_identifier(name: &str, force: bool) -> String {
    if !force && BARE_IDENT.is_match(name) && !keyword::is_reserved(name) {
        name.to_owned()
    } else {
        format!("\"{}\"", name.replace('"', "\"\""))
    }
}

/// Quote a string literal: single quotes with internal `'` doubled.
pub fn escape_string(s: &str) -> String {
    format!("'{}'", s.replace('\'', "''"))
}

/// Keyword operators accepted verbatim (matched case-insensitively).
const OPERATOR_WHITELIST: &[&str] = &[
    "AND",
    "OR",
    "NOT",
    "LIKE",
    "NOT LIKE",
    "ILIKE",
    "NOT ILIKE",
    "SIMILAR TO",
    "NOT SIMILAR TO",
    "IS NULL",
    "IS NOT NULL",
    "IN",
    "NOT IN",
    "EXISTS",
    "IS DISTINCT FROM",
    "IS NOT DISTINCT FROM",
    "COLLATE",
];

/// Characters permitted in symbolic operators.
const OPERATOR_CHARS: &str = "+-*/<>=~!@#%^&|`?";

/// A validated SQL operator.
///
/// An operator is either one of the whitelisted keyword operators or a
/// non-empty symbolic operator drawn from the PostgreSQL operator character
/// set. Comment introducers (`--`, `/*`) are always rejected, so operator
/// text can never smuggle a comment into the output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Operator(String);

impl Operator {
    /// Validate `op` and wrap it. Fails with [`QueryError::InvalidOperator`]
    /// for anything outside the whitelist and the symbolic charset.
    pub fn new(op: &str) -> QueryResult<Operator> {
        if Self::is_valid(op) {
            Ok(Operator(op.to_owned()))
        } else {
            Err(QueryError::InvalidOperator { op: op.to_owned() })
        }
    }

    /// Operator constructor for the crate's own fixed spellings.
    pub(crate) fn known(op: &str) -> Operator {
        debug_assert!(Self::is_valid(op), "builtin operator {op:?} failed validation");
        Operator(op.to_owned())
    }

    fn is_valid(op: &str) -> bool {
        let upper = op.to_ascii_uppercase();
        if OPERATOR_WHITELIST.contains(&upper.as_str()) {
            return true;
        }
        !op.is_empty()
            && op.chars().all(|c| OPERATOR_CHARS.contains(c))
            && !op.contains("--")
            && !op.contains("/*")
    }

    /// The operator text, exactly as supplied.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bare_identifiers_pass_through() {
        assert_eq!(quote_identifier("users", false), "users");
        assert_eq!(quote_identifier("_tmp$2", false), "_tmp$2");
        assert_eq!(quote_identifier("Account", false), "Account");
    }

    #[test]
    fn reserved_and_odd_identifiers_are_quoted() {
        assert_eq!(quote_identifier("select", false), "\"select\"");
        assert_eq!(quote_identifier("user group", false), "\"user group\"");
        assert_eq!(quote_identifier("2fast", false), "\"2fast\"");
        assert_eq!(quote_identifier("", false), "\"\"");
    }

    #[test]
    fn force_quote_always_quotes() {
        assert_eq!(quote_identifier("users", true), "\"users\"");
        assert_eq!(quote_identifier("we\"ird", true), "\"we\"\"ird\"");
    }

    #[test]
    fn string_escaping_doubles_quotes() {
        assert_eq!(escape_string("abc"), "'abc'");
        assert_eq!(escape_string("it's"), "'it''s'");
        assert_eq!(escape_string(""), "''");
    }

    #[test]
    fn whitelisted_operators_accepted() {
        assert!(Operator::new("IS DISTINCT FROM").is_ok());
        assert!(Operator::new("not ilike").is_ok());
        assert!(Operator::new("=").is_ok());
        assert!(Operator::new("<@").is_ok());
        assert!(Operator::new("||").is_ok());
    }

    #[test]
    fn unsafe_operators_rejected() {
        assert_eq!(
            Operator::new("--"),
            Err(QueryError::InvalidOperator { op: "--".into() })
        );
        assert!(Operator::new("/*").is_err());
        assert!(Operator::new("=--=").is_err());
        assert!(Operator::new("").is_err());
        assert!(Operator::new("BOGUS WORDS").is_err());
    }
}
