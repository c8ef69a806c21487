//! Expression-level serialisation scenarios.

mod common;

use common::assert_valid_postgres;
use sequin::prelude::*;
use sequin::QueryError;

#[test]
fn constant_is_null() {
    let e = lit("abc").is_null();
    assert_eq!(e.to_sql(), "('abc' IS NULL)");
    assert_valid_postgres(&format!("SELECT {}", e.to_sql()));
}

#[test]
fn constant_in_constant_list() {
    let e = lit(1).in_list([lit(1), lit(2), lit(3)]);
    assert_eq!(e.to_sql(), "(1 IN (1, 2, 3))");
    assert_valid_postgres(&format!("SELECT {}", e.to_sql()));
}

#[test]
fn cast_constant_to_boolean() {
    let e = lit(1).cast_as::<Bool>();
    assert_eq!(e.to_sql(), "CAST(1 AS boolean)");
    assert_valid_postgres(&format!("SELECT {}", e.to_sql()));
}

#[test]
fn field_references_quote_as_needed() {
    assert_eq!(field::<Text>("users", "name").to_sql(), "users.name");
    assert_eq!(
        field::<Text>("user group", "select").to_sql(),
        "\"user group\".\"select\""
    );
}

#[test]
fn filtered_aggregate() {
    let e = agg::<Int8>("COUNT", field::<Int8>("users", "id"))
        .filter_where(field::<Bool>("users", "active").eq(lit(true)))
        .into_expr();
    assert_eq!(
        e.to_sql(),
        "COUNT(users.id) FILTER (WHERE (users.active = true))"
    );
    assert_valid_postgres(&format!("SELECT {} FROM users", e.to_sql()));
}

#[test]
fn ordered_set_aggregate_within_group() {
    let e = percentile_cont(lit(0.5))
        .within_group_order_by(field::<Float8>("t", "x").asc())
        .into_expr();
    assert_eq!(e.to_sql(), "percentile_cont(0.5) WITHIN GROUP (ORDER BY t.x ASC)");
}

#[test]
fn string_literal_escape_property() {
    for (input, expected) in [
        ("abc", "'abc'"),
        ("it's", "'it''s'"),
        ("''", "''''''"),
        ("", "''"),
    ] {
        // Literal string constants only accept 'static input, which these
        // all are.
        let e: Expr<Text> = lit(input);
        assert_eq!(e.to_sql(), expected);
    }
}

#[test]
fn non_finite_numbers_render_as_strings() {
    assert_eq!(lit(f64::INFINITY).to_sql(), "'Infinity'");
    assert_eq!(lit(f64::NEG_INFINITY).to_sql(), "'-Infinity'");
    assert_eq!(lit(f64::NAN).to_sql(), "'NaN'");
}

#[test]
fn operator_whitelist_and_symbolic_safety() {
    for ok in ["=", "<>", "<@", "@>", "||", "~~", "IS DISTINCT FROM", "not ilike"] {
        assert!(Operator::new(ok).is_ok(), "expected {ok:?} to validate");
    }
    for bad in ["--", "/*", "<--", "a+b", "DROP", ""] {
        assert!(
            matches!(Operator::new(bad), Err(QueryError::InvalidOperator { .. })),
            "expected {bad:?} to be rejected"
        );
    }
}

#[test]
fn uuid_tag_helper_validates_hex() {
    let e = uuid("550e8400-e29b-41d4-a716-446655440000").unwrap();
    assert_eq!(e.to_sql(), "'550e8400-e29b-41d4-a716-446655440000'");
    assert!(matches!(
        uuid("550e8400"),
        Err(QueryError::InvalidUuid { .. })
    ));
}

#[test]
fn quantified_comparisons() {
    let e = field::<Int4>("t", "x").any_array(
        Operator::new("=").unwrap(),
        array([lit(1), lit(2)]),
    );
    assert_eq!(e.to_sql(), "(t.x = ANY(ARRAY[1, 2]))");
    assert_valid_postgres(&format!("SELECT {} FROM t", e.to_sql()));

    let e = field::<Int4>("t", "x").all_array(Operator::new("<").unwrap(), array([lit(9)]));
    assert_eq!(e.to_sql(), "(t.x < ALL(ARRAY[9]))");
}

#[test]
fn collation_is_force_quoted() {
    let e = field::<Text>("t", "name").collate("fr_FR");
    assert_eq!(e.to_sql(), "(t.name COLLATE \"fr_FR\")");
}

#[test]
fn serialisation_is_deterministic_and_pure() {
    let e = not(field::<Bool>("t", "ok")).or(field::<Int4>("t", "n").le(lit(5)));
    let before = format!("{:?}", e);
    let first = e.to_sql();
    let second = e.to_sql();
    assert_eq!(first, second);
    assert_eq!(first, "((not t.ok) OR (t.n <= 5))");
    assert_eq!(before, format!("{:?}", e), "serialisation must not mutate");
}
