//! Aggregate, grouping-set and window scenarios.

mod common;

use common::assert_valid_postgres;
use sequin::prelude::*;
use sequin::table;

table! {
    pub struct Sales as "sales" {
        region: Text,
        city: Text,
        year: Int4,
        amount: Numeric,
        returned: Bool,
    }
}

#[test]
fn grouped_aggregation_with_having() {
    let query = Sales::table()
        .select(|s| (s.region.as_("region"), sum(&s.amount).as_("total")))
        .group_by(|s| &s.region)
        .having(|_| count_star().into_expr().gt(lit(10i64)));

    let sql = query.to_sql();
    assert_eq!(
        sql,
        "SELECT sales.region AS region, SUM(sales.amount) AS total FROM sales \
         GROUP BY sales.region HAVING (COUNT(*) > 10)"
    );
    assert_valid_postgres(&sql);
}

#[test]
fn rollup_cube_and_grouping_sets() {
    let rolled = Sales::table()
        .select(|s| (s.region.as_("region"), count_star().as_("n")))
        .rollup(|s| (&s.region, composite((&s.city, &s.year))));
    let sql = rolled.to_sql();
    assert_eq!(
        sql,
        "SELECT sales.region AS region, COUNT(*) AS n FROM sales \
         GROUP BY ROLLUP (sales.region, (sales.city, sales.year))"
    );
    assert_valid_postgres(&sql);

    let cubed = Sales::table()
        .select(|s| (count_star().as_("n"),))
        .cube(|s| (&s.region, &s.year));
    assert_eq!(
        cubed.to_sql(),
        "SELECT COUNT(*) AS n FROM sales GROUP BY CUBE (sales.region, sales.year)"
    );

    let sets = Sales::table()
        .select(|s| (count_star().as_("n"),))
        .grouping_sets(|s| (rollup((&s.region,)), grouping_list((&s.city,)), s.year.clone()));
    assert_eq!(
        sets.to_sql(),
        "SELECT COUNT(*) AS n FROM sales \
         GROUP BY GROUPING SETS (ROLLUP (sales.region), sales.city, sales.year)"
    );
}

#[test]
fn group_by_distinct_flag() {
    let query = Sales::table()
        .select(|s| (count_star().as_("n"),))
        .group_by_distinct(|s| rollup((&s.region, &s.city)));
    assert_eq!(
        query.to_sql(),
        "SELECT COUNT(*) AS n FROM sales \
         GROUP BY DISTINCT ROLLUP (sales.region, sales.city)"
    );
}

#[test]
fn aggregate_with_distinct_order_and_filter() {
    let e = string_agg(field::<Text>("s", "city"), lit(", "))
        .distinct()
        .unwrap()
        .order_by(field::<Text>("s", "city").asc())
        .unwrap()
        .filter_where(field::<Bool>("s", "returned").eq(lit(false)))
        .into_expr();
    assert_eq!(
        e.to_sql(),
        "STRING_AGG(DISTINCT s.city, ', ' ORDER BY s.city ASC) \
         FILTER (WHERE (s.returned = false))"
    );
}

#[test]
fn json_aggregates_custom_syntax() {
    let object = json_object_agg(field::<Text>("s", "city"), field::<Numeric>("s", "amount"))
        .absent_on_null()
        .with_unique_keys()
        .into_expr();
    assert_eq!(
        object.to_sql(),
        "json_object_agg(s.city : s.amount ABSENT ON NULL WITH UNIQUE KEYS)"
    );

    let array = json_array_agg(field::<Numeric>("s", "amount"))
        .order_by(field::<Numeric>("s", "amount").desc())
        .null_on_null()
        .into_expr();
    assert_eq!(
        array.to_sql(),
        "json_array_agg(s.amount ORDER BY s.amount DESC NULL ON NULL)"
    );
}

#[test]
fn named_windows_and_window_calls() {
    let query = Sales::table()
        .select(|s| {
            (
                s.region.as_("region"),
                window_call::<Numeric>("SUM", &s.amount)
                    .filter_where(s.returned.eq(lit(false)))
                    .over("w")
                    .as_("running"),
                row_number().over("w").as_("pos"),
            )
        })
        .window("w", |s| {
            WindowDef::new()
                .partition_by(&s.region)
                .order_by(s.year.asc())
                .frame(Frame::rows_to_current())
        })
        .unwrap();

    let sql = query.to_sql();
    assert_eq!(
        sql,
        "SELECT sales.region AS region, \
         SUM(sales.amount) FILTER (WHERE (sales.returned = false)) OVER w AS running, \
         ROW_NUMBER() OVER w AS pos \
         FROM sales \
         WINDOW w AS (PARTITION BY sales.region ORDER BY sales.year ASC \
         ROWS BETWEEN UNBOUNDED PRECEDING AND CURRENT ROW)"
    );
    assert_valid_postgres(&sql);
}

#[test]
fn window_based_on_existing_window() {
    let query = Sales::table()
        .select(|s| (row_number().over("w2").as_("pos"),))
        .window("w1", |s| WindowDef::new().partition_by(&s.region))
        .unwrap()
        .window("w2", |s| WindowDef::based_on("w1").order_by(s.year.desc()))
        .unwrap();

    assert_eq!(
        query.to_sql(),
        "SELECT ROW_NUMBER() OVER w2 AS pos FROM sales \
         WINDOW w1 AS (PARTITION BY sales.region), \
         w2 AS (w1 ORDER BY sales.year DESC)"
    );
}

#[test]
fn frame_exclusion_policies() {
    let query = Sales::table()
        .select(|s| (sum(&s.amount).as_("total"),))
        .window("w", |s| {
            WindowDef::new()
                .order_by(s.year.asc())
                .frame(
                    Frame::groups_between(FrameStart::Preceding(1), FrameEnd::Following(1))
                        .exclude_current_row(),
                )
        })
        .unwrap();

    assert_eq!(
        query.to_sql(),
        "SELECT SUM(sales.amount) AS total FROM sales \
         WINDOW w AS (ORDER BY sales.year ASC \
         GROUPS BETWEEN 1 PRECEDING AND 1 FOLLOWING EXCLUDE CURRENT ROW)"
    );
}

#[test]
fn ordered_set_aggregates() {
    let cont = percentile_cont(lit(0.25))
        .within_group_order_by(field::<Numeric>("s", "amount").asc())
        .filter_where(field::<Bool>("s", "returned").eq(lit(false)))
        .into_expr();
    assert_eq!(
        cont.to_sql(),
        "percentile_cont(0.25) WITHIN GROUP (ORDER BY s.amount ASC) \
         FILTER (WHERE (s.returned = false))"
    );

    let modal = mode()
        .within_group_order_by(field::<Text>("s", "city").asc())
        .into_expr();
    assert_eq!(modal.to_sql(), "mode() WITHIN GROUP (ORDER BY s.city ASC)");
}
