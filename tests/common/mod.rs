//! Shared test helpers.

use sqlparser::dialect::PostgreSqlDialect;
use sqlparser::parser::Parser;

/// Assert that emitted SQL is syntactically valid PostgreSQL, using
/// sqlparser as an independent round-trip check.
pub fn assert_valid_postgres(sql: &str) {
    if let Err(e) = Parser::parse_sql(&PostgreSqlDialect {}, sql) {
        panic!("emitted SQL failed to parse: {e}\nSQL: {sql}");
    }
}
