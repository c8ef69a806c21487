//! SQL keywords and the PostgreSQL reserved-word set.
//!
//! [`Keyword`] is the closed enumeration of keywords this crate can emit.
//! Adding a clause elsewhere means adding its keyword here first, which keeps
//! the renderer exhaustive.

use std::collections::HashSet;

use once_cell::sync::Lazy;

/// Every keyword the serializer can emit.
///
/// Compound variants (`GroupBy`, `CurrentRow`, ...) render as their
/// multi-word SQL form.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Keyword {
    Select,
    Distinct,
    On,
    As,
    From,
    Where,
    GroupBy,
    Having,
    Window,
    OrderBy,
    Asc,
    Desc,
    Using,
    NullsFirst,
    NullsLast,
    Limit,
    All,
    Offset,
    Fetch,
    Next,
    Rows,
    Only,
    WithTies,
    For,
    Update,
    NoKeyUpdate,
    Share,
    KeyShare,
    Of,
    Nowait,
    SkipLocked,
    Union,
    Intersect,
    Except,
    Inner,
    Left,
    Right,
    Full,
    Cross,
    Join,
    Lateral,
    WithOrdinality,
    Cast,
    Any,
    Array,
    Row,
    Exists,
    Filter,
    WithinGroup,
    Over,
    PartitionBy,
    Range,
    Groups,
    Between,
    And,
    Unbounded,
    Preceding,
    Following,
    CurrentRow,
    Exclude,
    Group,
    Ties,
    NoOthers,
    Rollup,
    Cube,
    GroupingSets,
    AbsentOnNull,
    NullOnNull,
    WithUniqueKeys,
    WithoutUniqueKeys,
}

impl Keyword {
    /// The literal SQL text for this keyword.
    pub fn as_str(self) -> &'static str {
        match self {
            Keyword::Select => "SELECT",
            Keyword::Distinct => "DISTINCT",
            Keyword::On => "ON",
            Keyword::As => "AS",
            Keyword::From => "FROM",
            Keyword::Where => "WHERE",
            Keyword::GroupBy => "GROUP BY",
            Keyword::Having => "HAVING",
            Keyword::Window => "WINDOW",
            Keyword::OrderBy => "ORDER BY",
            Keyword::Asc => "ASC",
            Keyword::Desc => "DESC",
            Keyword::Using => "USING",
            Keyword::NullsFirst => "NULLS FIRST",
            Keyword::NullsLast => "NULLS LAST",
            Keyword::Limit => "LIMIT",
            Keyword::All => "ALL",
            Keyword::Offset => "OFFSET",
            Keyword::Fetch => "FETCH",
            Keyword::Next => "NEXT",
            Keyword::Rows => "ROWS",
            Keyword::Only => "ONLY",
            Keyword::WithTies => "WITH TIES",
            Keyword::For => "FOR",
            Keyword::Update => "UPDATE",
            Keyword::NoKeyUpdate => "NO KEY UPDATE",
            Keyword::Share => "SHARE",
            Keyword::KeyShare => "KEY SHARE",
            Keyword::Of => "OF",
            Keyword::Nowait => "NOWAIT",
            Keyword::SkipLocked => "SKIP LOCKED",
            Keyword::Union => "UNION",
            Keyword::Intersect => "INTERSECT",
            Keyword::Except => "EXCEPT",
            Keyword::Inner => "INNER",
            Keyword::Left => "LEFT",
            Keyword::Right => "RIGHT",
            Keyword::Full => "FULL",
            Keyword::Cross => "CROSS",
            Keyword::Join => "JOIN",
            Keyword::Lateral => "LATERAL",
            Keyword::WithOrdinality => "WITH ORDINALITY",
            Keyword::Cast => "CAST",
            Keyword::Any => "ANY",
            Keyword::Array => "ARRAY",
            Keyword::Row => "ROW",
            Keyword::Exists => "EXISTS",
            Keyword::Filter => "FILTER",
            Keyword::WithinGroup => "WITHIN GROUP",
            Keyword::Over => "OVER",
            Keyword::PartitionBy => "PARTITION BY",
            Keyword::Range => "RANGE",
            Keyword::Groups => "GROUPS",
            Keyword::Between => "BETWEEN",
            Keyword::And => "AND",
            Keyword::Unbounded => "UNBOUNDED",
            Keyword::Preceding => "PRECEDING",
            Keyword::Following => "FOLLOWING",
            Keyword::CurrentRow => "CURRENT ROW",
            Keyword::Exclude => "EXCLUDE",
            Keyword::Group => "GROUP",
            Keyword::Ties => "TIES",
            Keyword::NoOthers => "NO OTHERS",
            Keyword::Rollup => "ROLLUP",
            Keyword::Cube => "CUBE",
            Keyword::GroupingSets => "GROUPING SETS",
            Keyword::AbsentOnNull => "ABSENT ON NULL",
            Keyword::NullOnNull => "NULL ON NULL",
            Keyword::WithUniqueKeys => "WITH UNIQUE KEYS",
            Keyword::WithoutUniqueKeys => "WITHOUT UNIQUE KEYS",
        }
    }
}

/// PostgreSQL reserved words, including those reserved except as function or
/// type names. Bare identifiers colliding with any of these get quoted.
static RESERVED_WORDS: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    [
        "ALL",
        "ANALYSE",
        "ANALYZE",
        "AND",
        "ANY",
        "ARRAY",
        "AS",
        "ASC",
        "ASYMMETRIC",
        "AUTHORIZATION",
        "BINARY",
        "BOTH",
        "CASE",
        "CAST",
        "CHECK",
        "COLLATE",
        "COLLATION",
        "COLUMN",
        "CONCURRENTLY",
        "CONSTRAINT",
        "CREATE",
        "CROSS",
        "CURRENT_CATALOG",
        "CURRENT_DATE",
        "CURRENT_ROLE",
        "CURRENT_SCHEMA",
        "CURRENT_TIME",
        "CURRENT_TIMESTAMP",
        "CURRENT_USER",
        "DEFAULT",
        "DEFERRABLE",
        "DESC",
        "DISTINCT",
        "DO",
        "ELSE",
        "END",
        "EXCEPT",
        "FALSE",
        "FETCH",
        "FOR",
        "FOREIGN",
        "FREEZE",
        "FROM",
        "FULL",
        "GRANT",
        "GROUP",
        "HAVING",
        "ILIKE",
        "IN",
        "INITIALLY",
        "INNER",
        "INTERSECT",
        "INTO",
        "IS",
        "ISNULL",
        "JOIN",
        "LATERAL",
        "LEADING",
        "LEFT",
        "LIKE",
        "LIMIT",
        "LOCALTIME",
        "LOCALTIMESTAMP",
        "NATURAL",
        "NOT",
        "NOTNULL",
        "NULL",
        "OFFSET",
        "ON",
        "ONLY",
        "OR",
        "ORDER",
        "OUTER",
        "OVERLAPS",
        "PLACING",
        "PRIMARY",
        "REFERENCES",
        "RETURNING",
        "RIGHT",
        "SELECT",
        "SESSION_USER",
        "SIMILAR",
        "SOME",
        "SYMMETRIC",
        "SYSTEM_USER",
        "TABLE",
        "TABLESAMPLE",
        "THEN",
        "TO",
        "TRAILING",
        "TRUE",
        "UNION",
        "UNIQUE",
        "USER",
        "USING",
        "VARIADIC",
        "VERBOSE",
        "WHEN",
        "WHERE",
        "WINDOW",
        "WITH",
    ]
    .into_iter()
    .collect()
});

/// Whether `name` collides with a reserved word. Matching is
/// case-insensitive.
pub fn is_reserved(name: &str) -> bool {
    RESERVED_WORDS.contains(name.to_ascii_uppercase().as_str())
}
