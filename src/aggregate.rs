//! Aggregate calls: plain, ordered-set and JSON aggregates, plus window
//! function calls.
//!
//! All of these end up as final expressions. The builders stage the pieces
//! the grammar allows: a plain aggregate takes `DISTINCT`, an argument
//! `ORDER BY` and a trailing `FILTER`; an ordered-set aggregate becomes
//! usable only once `within_group_order_by` has supplied its ordering; a
//! window call hides `filter_where` after first use and finishes with
//! `over(window)`.

use std::marker::PhantomData;

use crate::error::{QueryError, QueryResult};
use crate::expr::{AnyExpr, Expr, ExprList, ExprNode, IntoExpr, OrderList, OrderSpecNode};
use crate::keyword::Keyword;
use crate::query::Aliased;
use crate::token::{Special, Token, TokenStream};
use crate::types::{Array, Bool, Dynamic, Float8, Int8, Json, Numeric, SqlNum, SqlOrd, SqlType, Text};

// =============================================================================
// Nodes
// =============================================================================

/// `fn([DISTINCT] args [ORDER BY ...]) [FILTER (WHERE p)]`
#[derive(Debug, Clone, PartialEq)]
pub struct AggregateNode {
    pub(crate) name: String,
    pub(crate) star: bool,
    pub(crate) distinct: bool,
    pub(crate) args: Vec<ExprNode>,
    pub(crate) order_by: Vec<OrderSpecNode>,
    pub(crate) filter: Option<ExprNode>,
}

fn filter_tokens(filter: &Option<ExprNode>, ts: &mut TokenStream) {
    if let Some(predicate) = filter {
        ts.keyword(Keyword::Filter);
        ts.lparen();
        ts.keyword(Keyword::Where);
        predicate.write_tokens(ts);
        ts.rparen();
    }
}

impl AggregateNode {
    pub(crate) fn write_tokens(&self, ts: &mut TokenStream) {
        ts.push(Token::ident(self.name.clone()));
        ts.lparen();
        if self.distinct {
            ts.keyword(Keyword::Distinct);
        }
        if self.star {
            ts.special(Special::Star);
        } else {
            ts.comma_separate(&self.args, |ts, arg| arg.write_tokens(ts));
        }
        if !self.order_by.is_empty() {
            ts.keyword(Keyword::OrderBy);
            ts.comma_separate(&self.order_by, |ts, o| o.write_tokens(ts));
        }
        ts.rparen();
        filter_tokens(&self.filter, ts);
    }
}

/// `fn(direct) WITHIN GROUP (ORDER BY ...) [FILTER (WHERE p)]`
#[derive(Debug, Clone, PartialEq)]
pub struct OrderedSetNode {
    pub(crate) name: String,
    pub(crate) direct: Vec<ExprNode>,
    pub(crate) order_by: Vec<OrderSpecNode>,
    pub(crate) filter: Option<ExprNode>,
}

impl OrderedSetNode {
    pub(crate) fn write_tokens(&self, ts: &mut TokenStream) {
        ts.push(Token::ident(self.name.clone()));
        ts.lparen();
        ts.comma_separate(&self.direct, |ts, arg| arg.write_tokens(ts));
        ts.rparen();
        ts.keyword(Keyword::WithinGroup);
        ts.lparen();
        ts.keyword(Keyword::OrderBy);
        ts.comma_separate(&self.order_by, |ts, o| o.write_tokens(ts));
        ts.rparen();
        filter_tokens(&self.filter, ts);
    }
}

/// Null handling of the JSON aggregates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OnNull {
    Absent,
    Null,
}

/// Key uniqueness enforcement of `json_object_agg`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UniqueKeys {
    With,
    Without,
}

fn on_null_tokens(on_null: Option<OnNull>, ts: &mut TokenStream) {
    match on_null {
        Some(OnNull::Absent) => {
            ts.keyword(Keyword::AbsentOnNull);
        }
        Some(OnNull::Null) => {
            ts.keyword(Keyword::NullOnNull);
        }
        None => {}
    }
}

/// `json_object_agg(k : v [on-null] [unique-keys])`
#[derive(Debug, Clone, PartialEq)]
pub struct JsonObjectAggNode {
    pub(crate) key: ExprNode,
    pub(crate) value: ExprNode,
    pub(crate) on_null: Option<OnNull>,
    pub(crate) unique: Option<UniqueKeys>,
}

impl JsonObjectAggNode {
    pub(crate) fn write_tokens(&self, ts: &mut TokenStream) {
        ts.push(Token::ident("json_object_agg"));
        ts.lparen();
        self.key.write_tokens(ts);
        ts.special(Special::Colon);
        self.value.write_tokens(ts);
        on_null_tokens(self.on_null, ts);
        match self.unique {
            Some(UniqueKeys::With) => {
                ts.keyword(Keyword::WithUniqueKeys);
            }
            Some(UniqueKeys::Without) => {
                ts.keyword(Keyword::WithoutUniqueKeys);
            }
            None => {}
        }
        ts.rparen();
    }
}

/// `json_array_agg(v [ORDER BY ...] [on-null])`
#[derive(Debug, Clone, PartialEq)]
pub struct JsonArrayAggNode {
    pub(crate) value: ExprNode,
    pub(crate) order_by: Vec<OrderSpecNode>,
    pub(crate) on_null: Option<OnNull>,
}

impl JsonArrayAggNode {
    pub(crate) fn write_tokens(&self, ts: &mut TokenStream) {
        ts.push(Token::ident("json_array_agg"));
        ts.lparen();
        self.value.write_tokens(ts);
        if !self.order_by.is_empty() {
            ts.keyword(Keyword::OrderBy);
            ts.comma_separate(&self.order_by, |ts, o| o.write_tokens(ts));
        }
        on_null_tokens(self.on_null, ts);
        ts.rparen();
    }
}

/// `fn(args) [FILTER (WHERE p)] OVER window`
#[derive(Debug, Clone, PartialEq)]
pub struct WindowCallNode {
    pub(crate) name: String,
    pub(crate) star: bool,
    pub(crate) args: Vec<ExprNode>,
    pub(crate) filter: Option<ExprNode>,
    pub(crate) window: String,
}

impl WindowCallNode {
    pub(crate) fn write_tokens(&self, ts: &mut TokenStream) {
        ts.push(Token::ident(self.name.clone()));
        ts.lparen();
        if self.star {
            ts.special(Special::Star);
        } else {
            ts.comma_separate(&self.args, |ts, arg| arg.write_tokens(ts));
        }
        ts.rparen();
        filter_tokens(&self.filter, ts);
        ts.keyword(Keyword::Over);
        ts.push(Token::ident(self.window.clone()));
    }
}

// =============================================================================
// Plain aggregates
// =============================================================================

/// A plain aggregate call under construction.
pub struct AggregateCall<T: SqlType> {
    node: AggregateNode,
    _sql: PhantomData<fn() -> T>,
}

/// An aggregate call `name(args)` with a caller-asserted result type.
pub fn agg<T: SqlType>(name: &str, args: impl ExprList) -> AggregateCall<T> {
    AggregateCall {
        node: AggregateNode {
            name: name.to_owned(),
            star: false,
            distinct: false,
            args: args.into_nodes(),
            order_by: Vec::new(),
            filter: None,
        },
        _sql: PhantomData,
    }
}

/// `COUNT(expr)`
pub fn count(expr: impl AnyExpr) -> AggregateCall<Int8> {
    agg("COUNT", vec![expr.into_erased_node()])
}

/// `COUNT(*)`
pub fn count_star() -> AggregateCall<Int8> {
    let mut call = agg::<Int8>("COUNT", ());
    call.node.star = true;
    call
}

/// `SUM(expr)`
pub fn sum<T: SqlNum>(expr: impl IntoExpr<T>) -> AggregateCall<T> {
    agg("SUM", expr.into_expr())
}

/// `AVG(expr)`
pub fn avg<T: SqlNum>(expr: impl IntoExpr<T>) -> AggregateCall<Numeric> {
    agg("AVG", expr.into_expr())
}

/// `MIN(expr)`
pub fn min<T: SqlOrd>(expr: impl IntoExpr<T>) -> AggregateCall<T> {
    agg("MIN", expr.into_expr())
}

/// `MAX(expr)`
pub fn max<T: SqlOrd>(expr: impl IntoExpr<T>) -> AggregateCall<T> {
    agg("MAX", expr.into_expr())
}

/// `BOOL_AND(expr)`
pub fn bool_and(expr: impl IntoExpr<Bool>) -> AggregateCall<Bool> {
    agg("BOOL_AND", expr.into_expr())
}

/// `BOOL_OR(expr)`
pub fn bool_or(expr: impl IntoExpr<Bool>) -> AggregateCall<Bool> {
    agg("BOOL_OR", expr.into_expr())
}

/// `STRING_AGG(value, delimiter)`
pub fn string_agg(
    value: impl IntoExpr<Text>,
    delimiter: impl IntoExpr<Text>,
) -> AggregateCall<Text> {
    agg("STRING_AGG", (value.into_expr(), delimiter.into_expr()))
}

/// `ARRAY_AGG(expr)`
pub fn array_agg<T: SqlType>(expr: impl IntoExpr<T>) -> AggregateCall<Array<T>> {
    agg("ARRAY_AGG", expr.into_expr())
}

impl<T: SqlType> AggregateCall<T> {
    fn argumentless(&self) -> bool {
        self.node.args.is_empty()
    }

    /// Add `DISTINCT`. Argumentless calls such as `COUNT(*)` reject it.
    pub fn distinct(mut self) -> QueryResult<Self> {
        if self.argumentless() {
            return Err(QueryError::InvalidAggregateConfiguration {
                reason: "DISTINCT on an argumentless aggregate".to_owned(),
            });
        }
        self.node.distinct = true;
        Ok(self)
    }

    /// Order the aggregated input. Argumentless calls reject it.
    pub fn order_by(mut self, specs: impl OrderList) -> QueryResult<Self> {
        if self.argumentless() {
            return Err(QueryError::InvalidAggregateConfiguration {
                reason: "ORDER BY on an argumentless aggregate".to_owned(),
            });
        }
        self.node.order_by = specs.into_specs();
        Ok(self)
    }

    /// Attach `FILTER (WHERE predicate)`.
    pub fn filter_where(mut self, predicate: impl IntoExpr<Bool>) -> Self {
        self.node.filter = Some(predicate.into_expr().into_node());
        self
    }

    /// Alias for a projection list.
    pub fn as_(self, name: &str) -> Aliased<T> {
        self.into_expr().as_(name)
    }
}

impl<T: SqlType> IntoExpr<T> for AggregateCall<T> {
    fn into_expr(self) -> Expr<T> {
        Expr::from_node(ExprNode::Aggregate(Box::new(self.node)))
    }
}

impl<T: SqlType> AnyExpr for AggregateCall<T> {
    fn into_erased_node(self) -> ExprNode {
        self.into_expr().into_node()
    }
}

// =============================================================================
// Ordered-set aggregates
// =============================================================================

/// An ordered-set aggregate awaiting its `WITHIN GROUP` ordering.
pub struct OrderedSetCall<T: SqlType> {
    name: String,
    direct: Vec<ExprNode>,
    _sql: PhantomData<fn() -> T>,
}

/// An ordered-set aggregate `name(direct)` with a caller-asserted type.
pub fn ordered_set<T: SqlType>(name: &str, direct: impl ExprList) -> OrderedSetCall<T> {
    OrderedSetCall {
        name: name.to_owned(),
        direct: direct.into_nodes(),
        _sql: PhantomData,
    }
}

/// `percentile_cont(fraction)`
pub fn percentile_cont(fraction: impl IntoExpr<Float8>) -> OrderedSetCall<Float8> {
    ordered_set("percentile_cont", fraction.into_expr())
}

/// `percentile_disc(fraction)`
pub fn percentile_disc(fraction: impl IntoExpr<Float8>) -> OrderedSetCall<Dynamic> {
    ordered_set("percentile_disc", fraction.into_expr())
}

/// `mode()`
pub fn mode() -> OrderedSetCall<Dynamic> {
    ordered_set("mode", ())
}

impl<T: SqlType> OrderedSetCall<T> {
    /// Supply the `WITHIN GROUP (ORDER BY ...)` ordering.
    pub fn within_group_order_by(self, specs: impl OrderList) -> OrderedSetAggregate<T> {
        OrderedSetAggregate {
            node: OrderedSetNode {
                name: self.name,
                direct: self.direct,
                order_by: specs.into_specs(),
                filter: None,
            },
            _sql: PhantomData,
        }
    }
}

/// A complete ordered-set aggregate expression.
pub struct OrderedSetAggregate<T: SqlType> {
    node: OrderedSetNode,
    _sql: PhantomData<fn() -> T>,
}

impl<T: SqlType> OrderedSetAggregate<T> {
    /// Attach `FILTER (WHERE predicate)`.
    pub fn filter_where(mut self, predicate: impl IntoExpr<Bool>) -> Self {
        self.node.filter = Some(predicate.into_expr().into_node());
        self
    }

    /// Alias for a projection list.
    pub fn as_(self, name: &str) -> Aliased<T> {
        self.into_expr().as_(name)
    }
}

impl<T: SqlType> IntoExpr<T> for OrderedSetAggregate<T> {
    fn into_expr(self) -> Expr<T> {
        Expr::from_node(ExprNode::OrderedSetAggregate(Box::new(self.node)))
    }
}

impl<T: SqlType> AnyExpr for OrderedSetAggregate<T> {
    fn into_erased_node(self) -> ExprNode {
        self.into_expr().into_node()
    }
}

// =============================================================================
// JSON aggregates
// =============================================================================

/// A `json_object_agg` call under construction.
pub struct JsonObjectAgg {
    node: JsonObjectAggNode,
}

/// `json_object_agg(key : value)`
pub fn json_object_agg(key: impl IntoExpr<Text>, value: impl AnyExpr) -> JsonObjectAgg {
    JsonObjectAgg {
        node: JsonObjectAggNode {
            key: key.into_expr().into_node(),
            value: value.into_erased_node(),
            on_null: None,
            unique: None,
        },
    }
}

impl JsonObjectAgg {
    /// `ABSENT ON NULL`
    pub fn absent_on_null(mut self) -> Self {
        self.node.on_null = Some(OnNull::Absent);
        self
    }

    /// `NULL ON NULL`
    pub fn null_on_null(mut self) -> Self {
        self.node.on_null = Some(OnNull::Null);
        self
    }

    /// `WITH UNIQUE KEYS`
    pub fn with_unique_keys(mut self) -> Self {
        self.node.unique = Some(UniqueKeys::With);
        self
    }

    /// `WITHOUT UNIQUE KEYS`
    pub fn without_unique_keys(mut self) -> Self {
        self.node.unique = Some(UniqueKeys::Without);
        self
    }

    /// Alias for a projection list.
    pub fn as_(self, name: &str) -> Aliased<Json> {
        self.into_expr().as_(name)
    }
}

impl IntoExpr<Json> for JsonObjectAgg {
    fn into_expr(self) -> Expr<Json> {
        Expr::from_node(ExprNode::JsonObjectAggregate(Box::new(self.node)))
    }
}

/// A `json_array_agg` call under construction.
pub struct JsonArrayAgg {
    node: JsonArrayAggNode,
}

/// `json_array_agg(value)`
pub fn json_array_agg(value: impl AnyExpr) -> JsonArrayAgg {
    JsonArrayAgg {
        node: JsonArrayAggNode {
            value: value.into_erased_node(),
            order_by: Vec::new(),
            on_null: None,
        },
    }
}

impl JsonArrayAgg {
    /// Order the aggregated input.
    pub fn order_by(mut self, specs: impl OrderList) -> Self {
        self.node.order_by = specs.into_specs();
        self
    }

    /// `ABSENT ON NULL`
    pub fn absent_on_null(mut self) -> Self {
        self.node.on_null = Some(OnNull::Absent);
        self
    }

    /// `NULL ON NULL`
    pub fn null_on_null(mut self) -> Self {
        self.node.on_null = Some(OnNull::Null);
        self
    }

    /// Alias for a projection list.
    pub fn as_(self, name: &str) -> Aliased<Json> {
        self.into_expr().as_(name)
    }
}

impl IntoExpr<Json> for JsonArrayAgg {
    fn into_expr(self) -> Expr<Json> {
        Expr::from_node(ExprNode::JsonArrayAggregate(Box::new(self.node)))
    }
}

// =============================================================================
// Window calls
// =============================================================================

/// Marker: `filter_where` still available.
pub struct CanFilter;
/// Marker: `filter_where` already used.
pub struct Filtered;

/// A window function call awaiting its `OVER` clause.
///
/// `filter_where` consumes the `CanFilter` stage, so it can be given at most
/// once; `over(name)` finishes the call against a window declared on the
/// query.
pub struct PartialWindowCall<T: SqlType, F = CanFilter> {
    name: String,
    star: bool,
    args: Vec<ExprNode>,
    filter: Option<ExprNode>,
    _sql: PhantomData<fn() -> (T, F)>,
}

/// A window call `name(args)` with a caller-asserted result type.
pub fn window_call<T: SqlType>(name: &str, args: impl ExprList) -> PartialWindowCall<T> {
    PartialWindowCall {
        name: name.to_owned(),
        star: false,
        args: args.into_nodes(),
        filter: None,
        _sql: PhantomData,
    }
}

/// A window call `name(*)`.
pub fn window_call_star<T: SqlType>(name: &str) -> PartialWindowCall<T> {
    PartialWindowCall {
        name: name.to_owned(),
        star: true,
        args: Vec::new(),
        filter: None,
        _sql: PhantomData,
    }
}

/// `ROW_NUMBER()`
pub fn row_number() -> PartialWindowCall<Int8> {
    window_call("ROW_NUMBER", ())
}

/// `RANK()`
pub fn rank() -> PartialWindowCall<Int8> {
    window_call("RANK", ())
}

/// `DENSE_RANK()`
pub fn dense_rank() -> PartialWindowCall<Int8> {
    window_call("DENSE_RANK", ())
}

impl<T: SqlType> PartialWindowCall<T, CanFilter> {
    /// Attach `FILTER (WHERE predicate)`.
    pub fn filter_where(self, predicate: impl IntoExpr<Bool>) -> PartialWindowCall<T, Filtered> {
        PartialWindowCall {
            name: self.name,
            star: self.star,
            args: self.args,
            filter: Some(predicate.into_expr().into_node()),
            _sql: PhantomData,
        }
    }
}

impl<T: SqlType, F> PartialWindowCall<T, F> {
    /// Finish the call against the named window.
    pub fn over(self, window: &str) -> Expr<T> {
        Expr::from_node(ExprNode::WindowCall(Box::new(WindowCallNode {
            name: self.name,
            star: self.star,
            args: self.args,
            filter: self.filter,
            window: window.to_owned(),
        })))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expr::{field, lit};
    use crate::token::Serializable;
    use crate::types::{Bool, Int8, Text};

    #[test]
    fn filtered_count() {
        let sql = count(field::<Int8>("users", "id"))
            .filter_where(field::<Bool>("users", "active").eq(lit(true)))
            .into_expr()
            .to_sql();
        assert_eq!(sql, "COUNT(users.id) FILTER (WHERE (users.active = true))");
    }

    #[test]
    fn count_star_renders_star() {
        assert_eq!(count_star().into_expr().to_sql(), "COUNT(*)");
    }

    #[test]
    fn argumentless_aggregate_rejects_distinct_and_order_by() {
        assert_eq!(
            count_star().distinct().unwrap_err(),
            QueryError::InvalidAggregateConfiguration {
                reason: "DISTINCT on an argumentless aggregate".into()
            }
        );
        assert!(count_star()
            .order_by(field::<Int8>("t", "x").asc())
            .is_err());
    }

    #[test]
    fn distinct_with_ordered_input() {
        let v = field::<Text>("t", "tag");
        let sql = string_agg(&v, lit(","))
            .distinct()
            .unwrap()
            .order_by(v.asc())
            .unwrap()
            .into_expr()
            .to_sql();
        assert_eq!(sql, "STRING_AGG(DISTINCT t.tag, ',' ORDER BY t.tag ASC)");
    }

    #[test]
    fn percentile_within_group() {
        let sql = percentile_cont(lit(0.5))
            .within_group_order_by(field::<Int8>("t", "x").asc())
            .into_expr()
            .to_sql();
        assert_eq!(
            sql,
            "percentile_cont(0.5) WITHIN GROUP (ORDER BY t.x ASC)"
        );
    }

    #[test]
    fn json_object_agg_full_form() {
        let sql = json_object_agg(field::<Text>("t", "k"), field::<Int8>("t", "v"))
            .absent_on_null()
            .with_unique_keys()
            .into_expr()
            .to_sql();
        assert_eq!(
            sql,
            "json_object_agg(t.k : t.v ABSENT ON NULL WITH UNIQUE KEYS)"
        );
    }

    #[test]
    fn json_array_agg_with_order() {
        let sql = json_array_agg(field::<Int8>("t", "v"))
            .order_by(field::<Int8>("t", "v").desc())
            .null_on_null()
            .into_expr()
            .to_sql();
        assert_eq!(sql, "json_array_agg(t.v ORDER BY t.v DESC NULL ON NULL)");
    }

    #[test]
    fn window_call_with_filter() {
        let sql = window_call_star::<Int8>("COUNT")
            .filter_where(field::<Bool>("t", "ok").eq(lit(true)))
            .over("w")
            .to_sql();
        assert_eq!(sql, "COUNT(*) FILTER (WHERE (t.ok = true)) OVER w");
    }

    #[test]
    fn plain_window_call() {
        assert_eq!(row_number().over("w").to_sql(), "ROW_NUMBER() OVER w");
    }
}
