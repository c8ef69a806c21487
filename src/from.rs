//! From-clause algebra: base tables, table functions, subqueries and joins.
//!
//! The runtime shape is [`FromNode`]; the typed layer threads a *handle*
//! value through joins so clause callbacks can spell column references.
//! Handles compose as nested tuples, one level per join, and the outer side
//! of an outer join is passed through [`OuterSide`] before the `ON` callback
//! runs, so the predicate already sees nullable column types.

use std::marker::PhantomData;

use crate::expr::{field, Expr, ExprList, ExprNode};
use crate::keyword::Keyword;
use crate::query::{Fresh, LockAllowed, Projection, QueryState, SelectQuery};
use crate::token::{Token, TokenStream};
use crate::types::{Bool, Int8, SqlType};

/// Join flavour.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinKind {
    Inner,
    Left,
    Right,
    Full,
    Cross,
}

/// The runtime from-clause tree.
#[derive(Debug, Clone, PartialEq)]
pub enum FromNode {
    /// A base table, `name` or `name AS alias`.
    Table { name: String, alias: Option<String> },
    /// A table function, `name(args) [WITH ORDINALITY] [AS alias]`.
    Function {
        name: String,
        args: Vec<ExprNode>,
        ordinality: bool,
        alias: Option<String>,
    },
    /// A derived table, `(SELECT ...) AS alias`.
    Subquery {
        query: Box<QueryState>,
        alias: String,
    },
    /// `(left KIND JOIN [LATERAL] right [ON predicate])`
    Join {
        kind: JoinKind,
        lateral: bool,
        left: Box<FromNode>,
        right: Box<FromNode>,
        on: Option<ExprNode>,
    },
}

impl FromNode {
    pub(crate) fn write_tokens(&self, ts: &mut TokenStream) {
        match self {
            FromNode::Table { name, alias } => {
                ts.push(Token::ident(name.clone()));
                if let Some(alias) = alias {
                    ts.keyword(Keyword::As);
                    ts.push(Token::ident(alias.clone()));
                }
            }
            FromNode::Function {
                name,
                args,
                ordinality,
                alias,
            } => {
                ts.push(Token::ident(name.clone()));
                ts.lparen();
                ts.comma_separate(args, |ts, arg| arg.write_tokens(ts));
                ts.rparen();
                if *ordinality {
                    ts.keyword(Keyword::WithOrdinality);
                }
                if let Some(alias) = alias {
                    ts.keyword(Keyword::As);
                    ts.push(Token::ident(alias.clone()));
                }
            }
            FromNode::Subquery { query, alias } => {
                ts.lparen();
                query.write_tokens(ts);
                ts.rparen();
                ts.keyword(Keyword::As);
                ts.push(Token::ident(alias.clone()));
            }
            FromNode::Join {
                kind,
                lateral,
                left,
                right,
                on,
            } => {
                ts.lparen();
                left.write_tokens(ts);
                ts.keyword(match kind {
                    JoinKind::Inner => Keyword::Inner,
                    JoinKind::Left => Keyword::Left,
                    JoinKind::Right => Keyword::Right,
                    JoinKind::Full => Keyword::Full,
                    JoinKind::Cross => Keyword::Cross,
                });
                ts.keyword(Keyword::Join);
                if *lateral {
                    ts.keyword(Keyword::Lateral);
                }
                right.write_tokens(ts);
                if let Some(on) = on {
                    ts.keyword(Keyword::On);
                    on.write_tokens(ts);
                }
                ts.rparen();
            }
        }
    }
}

// =============================================================================
// Typed sources
// =============================================================================

/// A query source with its handle value.
pub trait Source: Sized {
    /// The handle(s) clause callbacks receive.
    type Handles: Clone;

    /// Split into the runtime node and the handle value.
    fn into_parts(self) -> (FromNode, Self::Handles);
}

/// The outer-join nullability transform: produces the same handle shape with
/// every column type replaced by its nullable projection.
pub trait OuterSide {
    type Outer: Clone;

    fn outer(self) -> Self::Outer;
}

impl<T: SqlType> OuterSide for Expr<T> {
    type Outer = Expr<T::Null>;

    fn outer(self) -> Self::Outer {
        Expr::from_node(self.into_node())
    }
}

impl<A: OuterSide, B: OuterSide> OuterSide for (A, B) {
    type Outer = (A::Outer, B::Outer);

    fn outer(self) -> Self::Outer {
        (self.0.outer(), self.1.outer())
    }
}

/// A join tree carrying its combined handles.
#[derive(Debug, Clone)]
#[must_use = "a from clause has no effect until selected from"]
pub struct FromClause<H: Clone> {
    node: FromNode,
    handles: H,
}

impl<H: Clone> Source for FromClause<H> {
    type Handles = H;

    fn into_parts(self) -> (FromNode, H) {
        (self.node, self.handles)
    }
}

fn join_node<H>(
    kind: JoinKind,
    lateral: bool,
    left: FromNode,
    right: FromNode,
    on: Option<ExprNode>,
    handles: H,
) -> FromClause<H>
where
    H: Clone,
{
    FromClause {
        node: FromNode::Join {
            kind,
            lateral,
            left: Box::new(left),
            right: Box::new(right),
            on,
        },
        handles,
    }
}

fn join<L, R, F>(left: L, right: R, kind: JoinKind, lateral: bool, on: F) -> FromClause<(L::Handles, R::Handles)>
where
    L: Source,
    R: Source,
    F: FnOnce(&(L::Handles, R::Handles)) -> Expr<Bool>,
{
    let (left_node, left_handles) = left.into_parts();
    let (right_node, right_handles) = right.into_parts();
    let handles = (left_handles, right_handles);
    let on = on(&handles).into_node();
    join_node(kind, lateral, left_node, right_node, Some(on), handles)
}

fn left_outer_join<L, R, F>(
    left: L,
    right: R,
    lateral: bool,
    on: F,
) -> FromClause<(L::Handles, <R::Handles as OuterSide>::Outer)>
where
    L: Source,
    R: Source,
    R::Handles: OuterSide,
    F: FnOnce(&(L::Handles, <R::Handles as OuterSide>::Outer)) -> Expr<Bool>,
{
    let (left_node, left_handles) = left.into_parts();
    let (right_node, right_handles) = right.into_parts();
    let handles = (left_handles, right_handles.outer());
    let on = on(&handles).into_node();
    join_node(JoinKind::Left, lateral, left_node, right_node, Some(on), handles)
}

fn right_outer_join<L, R, F>(
    left: L,
    right: R,
    lateral: bool,
    on: F,
) -> FromClause<(<L::Handles as OuterSide>::Outer, R::Handles)>
where
    L: Source,
    R: Source,
    L::Handles: OuterSide,
    F: FnOnce(&(<L::Handles as OuterSide>::Outer, R::Handles)) -> Expr<Bool>,
{
    let (left_node, left_handles) = left.into_parts();
    let (right_node, right_handles) = right.into_parts();
    let handles = (left_handles.outer(), right_handles);
    let on = on(&handles).into_node();
    join_node(JoinKind::Right, lateral, left_node, right_node, Some(on), handles)
}

fn full_outer_join<L, R, F>(
    left: L,
    right: R,
    lateral: bool,
    on: F,
) -> FromClause<(
    <L::Handles as OuterSide>::Outer,
    <R::Handles as OuterSide>::Outer,
)>
where
    L: Source,
    R: Source,
    L::Handles: OuterSide,
    R::Handles: OuterSide,
    F: FnOnce(
        &(
            <L::Handles as OuterSide>::Outer,
            <R::Handles as OuterSide>::Outer,
        ),
    ) -> Expr<Bool>,
{
    let (left_node, left_handles) = left.into_parts();
    let (right_node, right_handles) = right.into_parts();
    let handles = (left_handles.outer(), right_handles.outer());
    let on = on(&handles).into_node();
    join_node(JoinKind::Full, lateral, left_node, right_node, Some(on), handles)
}

/// Builder surface shared by every query source.
pub trait SourceExt: Source {
    /// `(self INNER JOIN right ON predicate)`
    fn inner_join<R, F>(self, right: R, on: F) -> FromClause<(Self::Handles, R::Handles)>
    where
        R: Source,
        F: FnOnce(&(Self::Handles, R::Handles)) -> Expr<Bool>,
    {
        join(self, right, JoinKind::Inner, false, on)
    }

    /// `(self INNER JOIN LATERAL right ON predicate)`
    fn inner_join_lateral<R, F>(self, right: R, on: F) -> FromClause<(Self::Handles, R::Handles)>
    where
        R: Source,
        F: FnOnce(&(Self::Handles, R::Handles)) -> Expr<Bool>,
    {
        join(self, right, JoinKind::Inner, true, on)
    }

    /// `(self LEFT JOIN right ON predicate)`; the right side's columns turn
    /// nullable.
    fn left_join<R, F>(
        self,
        right: R,
        on: F,
    ) -> FromClause<(Self::Handles, <R::Handles as OuterSide>::Outer)>
    where
        R: Source,
        R::Handles: OuterSide,
        F: FnOnce(&(Self::Handles, <R::Handles as OuterSide>::Outer)) -> Expr<Bool>,
    {
        left_outer_join(self, right, false, on)
    }

    /// `(self LEFT JOIN LATERAL right ON predicate)`
    fn left_join_lateral<R, F>(
        self,
        right: R,
        on: F,
    ) -> FromClause<(Self::Handles, <R::Handles as OuterSide>::Outer)>
    where
        R: Source,
        R::Handles: OuterSide,
        F: FnOnce(&(Self::Handles, <R::Handles as OuterSide>::Outer)) -> Expr<Bool>,
    {
        left_outer_join(self, right, true, on)
    }

    /// `(self RIGHT JOIN right ON predicate)`; this side's columns turn
    /// nullable.
    fn right_join<R, F>(
        self,
        right: R,
        on: F,
    ) -> FromClause<(<Self::Handles as OuterSide>::Outer, R::Handles)>
    where
        R: Source,
        Self::Handles: OuterSide,
        F: FnOnce(&(<Self::Handles as OuterSide>::Outer, R::Handles)) -> Expr<Bool>,
    {
        right_outer_join(self, right, false, on)
    }

    /// `(self RIGHT JOIN LATERAL right ON predicate)`
    fn right_join_lateral<R, F>(
        self,
        right: R,
        on: F,
    ) -> FromClause<(<Self::Handles as OuterSide>::Outer, R::Handles)>
    where
        R: Source,
        Self::Handles: OuterSide,
        F: FnOnce(&(<Self::Handles as OuterSide>::Outer, R::Handles)) -> Expr<Bool>,
    {
        right_outer_join(self, right, true, on)
    }

    /// `(self FULL JOIN right ON predicate)`; both sides turn nullable.
    fn full_join<R, F>(
        self,
        right: R,
        on: F,
    ) -> FromClause<(
        <Self::Handles as OuterSide>::Outer,
        <R::Handles as OuterSide>::Outer,
    )>
    where
        R: Source,
        Self::Handles: OuterSide,
        R::Handles: OuterSide,
        F: FnOnce(
            &(
                <Self::Handles as OuterSide>::Outer,
                <R::Handles as OuterSide>::Outer,
            ),
        ) -> Expr<Bool>,
    {
        full_outer_join(self, right, false, on)
    }

    /// `(self FULL JOIN LATERAL right ON predicate)`
    fn full_join_lateral<R, F>(
        self,
        right: R,
        on: F,
    ) -> FromClause<(
        <Self::Handles as OuterSide>::Outer,
        <R::Handles as OuterSide>::Outer,
    )>
    where
        R: Source,
        Self::Handles: OuterSide,
        R::Handles: OuterSide,
        F: FnOnce(
            &(
                <Self::Handles as OuterSide>::Outer,
                <R::Handles as OuterSide>::Outer,
            ),
        ) -> Expr<Bool>,
    {
        full_outer_join(self, right, true, on)
    }

    /// `(self CROSS JOIN right)`
    fn cross_join<R: Source>(self, right: R) -> FromClause<(Self::Handles, R::Handles)> {
        let (left_node, left_handles) = self.into_parts();
        let (right_node, right_handles) = right.into_parts();
        FromClause {
            node: FromNode::Join {
                kind: JoinKind::Cross,
                lateral: false,
                left: Box::new(left_node),
                right: Box::new(right_node),
                on: None,
            },
            handles: (left_handles, right_handles),
        }
    }

    /// `(self CROSS JOIN LATERAL right)`
    fn cross_join_lateral<R: Source>(self, right: R) -> FromClause<(Self::Handles, R::Handles)> {
        let (left_node, left_handles) = self.into_parts();
        let (right_node, right_handles) = right.into_parts();
        FromClause {
            node: FromNode::Join {
                kind: JoinKind::Cross,
                lateral: true,
                left: Box::new(left_node),
                right: Box::new(right_node),
                on: None,
            },
            handles: (left_handles, right_handles),
        }
    }

    /// Begin a query over this source with the given projection.
    fn select<P, F>(self, f: F) -> SelectQuery<Self::Handles, P, Fresh, LockAllowed>
    where
        P: Projection,
        F: FnOnce(&Self::Handles) -> P,
    {
        let (node, handles) = self.into_parts();
        let items = f(&handles).into_items();
        SelectQuery::new(node, items, handles)
    }
}

impl<T: Source> SourceExt for T {}

// =============================================================================
// Base tables
// =============================================================================

/// Implemented by `table!`-generated handle structs: the real table name and
/// the handle factory for a given alias.
pub trait TableSchema: Sized {
    const NAME: &'static str;

    fn handles(alias: &str) -> Self;
}

/// Marker: `.as_(alias)` still available.
pub struct CanAlias;
/// Marker: the table has been aliased; re-aliasing is statically absent.
pub struct AliasLocked;

/// A base table source. Freshly constructed it serialises as the bare table
/// name; after `.as_(alias)` it serialises as `name AS alias` and cannot be
/// aliased again.
#[must_use = "a table has no effect until selected from"]
pub struct BaseTable<H, A = CanAlias> {
    alias: Option<String>,
    handles: H,
    _stage: PhantomData<A>,
}

impl<H: TableSchema> BaseTable<H, CanAlias> {
    /// The table under its real name.
    pub fn new() -> Self {
        BaseTable {
            alias: None,
            handles: H::handles(H::NAME),
            _stage: PhantomData,
        }
    }

    /// Rename for this query: serialises as `name AS alias`.
    pub fn as_(self, alias: &str) -> BaseTable<H, AliasLocked> {
        BaseTable {
            alias: Some(alias.to_owned()),
            handles: H::handles(alias),
            _stage: PhantomData,
        }
    }
}

impl<H: TableSchema> Default for BaseTable<H, CanAlias> {
    fn default() -> Self {
        Self::new()
    }
}

impl<H: TableSchema + Clone, A> Source for BaseTable<H, A> {
    type Handles = H;

    fn into_parts(self) -> (FromNode, H) {
        (
            FromNode::Table {
                name: H::NAME.to_owned(),
                alias: self.alias,
            },
            self.handles,
        )
    }
}

// =============================================================================
// Table functions
// =============================================================================

/// Marker: `.with_ordinality()` still available.
pub struct NoOrdinality;
/// Marker: ordinality column added.
pub struct Ordinality;

/// A set-returning function in the from clause. The handle is the function's
/// value column; `with_ordinality` (at most once) adds the `ordinality`
/// counter column.
#[must_use = "a table function has no effect until selected from"]
pub struct TableFunction<T: SqlType, O = NoOrdinality> {
    name: String,
    args: Vec<ExprNode>,
    alias: Option<String>,
    _sql: PhantomData<fn() -> (T, O)>,
}

/// A table function `name(args)` whose rows have a caller-asserted type.
pub fn from_function<T: SqlType>(name: &str, args: impl ExprList) -> TableFunction<T> {
    TableFunction {
        name: name.to_owned(),
        args: args.into_nodes(),
        alias: None,
        _sql: PhantomData,
    }
}

impl<T: SqlType> TableFunction<T, NoOrdinality> {
    /// Append `WITH ORDINALITY`.
    pub fn with_ordinality(self) -> TableFunction<T, Ordinality> {
        TableFunction {
            name: self.name,
            args: self.args,
            alias: self.alias,
            _sql: PhantomData,
        }
    }
}

impl<T: SqlType, O> TableFunction<T, O> {
    /// Alias the function source: `name(args) AS alias`.
    pub fn as_(mut self, alias: &str) -> Self {
        self.alias = Some(alias.to_owned());
        self
    }

    fn effective_alias(&self) -> &str {
        self.alias.as_deref().unwrap_or(&self.name)
    }

    fn node(&self, ordinality: bool) -> FromNode {
        FromNode::Function {
            name: self.name.clone(),
            args: self.args.clone(),
            ordinality,
            alias: self.alias.clone(),
        }
    }
}

impl<T: SqlType> Source for TableFunction<T, NoOrdinality> {
    type Handles = Expr<T>;

    fn into_parts(self) -> (FromNode, Self::Handles) {
        let alias = self.effective_alias().to_owned();
        (self.node(false), field(&alias, &alias))
    }
}

impl<T: SqlType> Source for TableFunction<T, Ordinality> {
    type Handles = (Expr<T>, Expr<Int8>);

    fn into_parts(self) -> (FromNode, Self::Handles) {
        let alias = self.effective_alias().to_owned();
        (
            self.node(true),
            (field(&alias, &alias), field(&alias, "ordinality")),
        )
    }
}

// =============================================================================
// Subqueries in FROM
// =============================================================================

/// A derived table `(SELECT ...) AS alias` with handles derived from the
/// inner projection.
#[must_use = "a derived table has no effect until selected from"]
pub struct SubqueryFrom<P: Projection> {
    pub(crate) query: Box<QueryState>,
    pub(crate) alias: String,
    pub(crate) handles: P::Handles,
}

impl<P: Projection> Source for SubqueryFrom<P> {
    type Handles = P::Handles;

    fn into_parts(self) -> (FromNode, Self::Handles) {
        (
            FromNode::Subquery {
                query: self.query,
                alias: self.alias,
            },
            self.handles,
        )
    }
}

/// Declare a table's schema and generate its typed handle struct.
///
/// ```
/// use sequin::table;
/// use sequin::types::{Bool, Int8, Text};
///
/// table! {
///     pub struct Posts as "posts" {
///         id: Int8,
///         name: Text,
///         deleted: Bool,
///     }
/// }
/// ```
///
/// The generated struct has one public [`Expr`] field per column and is
/// generic over the nullability transform, so the outer side of an outer
/// join carries the same struct with every column type nullable.
#[macro_export]
macro_rules! table {
    (
        $(#[$meta:meta])*
        $vis:vis struct $name:ident as $sql_name:literal {
            $($col:ident : $ty:ty),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Clone)]
        $vis struct $name<N: $crate::types::Nullability = $crate::types::Same> {
            $(pub $col: $crate::expr::Expr<<N as $crate::types::Nullability>::Apply<$ty>>,)+
        }

        impl $name<$crate::types::Same> {
            /// The table as a query source, under its real name.
            $vis fn table() -> $crate::from::BaseTable<$name> {
                $crate::from::BaseTable::new()
            }
        }

        impl $crate::from::TableSchema for $name<$crate::types::Same> {
            const NAME: &'static str = $sql_name;

            fn handles(alias: &str) -> Self {
                Self {
                    $($col: $crate::expr::field(alias, stringify!($col)),)+
                }
            }
        }

        impl<N: $crate::types::Nullability> $crate::from::OuterSide for $name<N> {
            type Outer = $name<$crate::types::Nulled>;

            fn outer(self) -> Self::Outer {
                $name {
                    $($col: $crate::expr::Expr::from_node(self.$col.into_node()),)+
                }
            }
        }
    };
}
