//! Expression AST and the typed builder surface.
//!
//! [`ExprNode`] is the closed, type-erased tree every builder ultimately
//! produces; every variant is handled in `to_tokens`, so the compiler keeps
//! the renderer exhaustive. [`Expr<T>`] wraps a node with a phantom SQL type
//! tag that gates which builder methods apply: ordering comparisons need
//! [`SqlOrd`], pattern matching needs [`SqlText`], arithmetic needs
//! [`SqlNum`].
//!
//! Nodes are immutable. Builder methods borrow their receiver and return
//! fresh nodes, so table handles can be reused across clauses.

use std::fmt;
use std::marker::PhantomData;

use crate::aggregate::{
    AggregateNode, JsonArrayAggNode, JsonObjectAggNode, OrderedSetNode, WindowCallNode,
};
use crate::keyword::Keyword;
use crate::query::{Aliased, IntoSubquery, QueryState};
use crate::quote::Operator;
use crate::token::{Literal, Serializable, Special, Token, TokenStream};
use crate::types::{
    Array, Bool, Dynamic, Nullable, SqlNum, SqlOrd, SqlText, SqlType, Text, Uuid, UuidValue,
};
use crate::error::QueryResult;

// =============================================================================
// AST
// =============================================================================

/// `ANY` or `ALL` in a quantified comparison.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Quantifier {
    Any,
    All,
}

/// Right-hand side of a quantified comparison.
#[derive(Debug, Clone, PartialEq)]
pub enum QuantifiedRhs {
    Array(Box<ExprNode>),
    Subquery(Box<QueryState>),
}

/// A type-erased SQL expression.
#[derive(Debug, Clone, PartialEq)]
pub enum ExprNode {
    /// A literal constant.
    Constant(Literal),
    /// A column reference `table.column`.
    Column { table: String, column: String },
    /// A positional parameter `$index` (1-based).
    Parameter(usize),
    /// `(op X)`
    Prefix {
        op: Operator,
        operand: Box<ExprNode>,
    },
    /// `(X op)`, e.g. `(X IS NULL)`.
    Postfix {
        operand: Box<ExprNode>,
        op: Operator,
    },
    /// `(L op R)`
    Infix {
        left: Box<ExprNode>,
        op: Operator,
        right: Box<ExprNode>,
    },
    /// Multi-operand application `(L op (a, b, c))` — `IN` / `NOT IN`.
    Multi {
        left: Box<ExprNode>,
        op: Operator,
        operands: Vec<ExprNode>,
    },
    /// `(L [NOT] IN (subquery))`
    InSubquery {
        operand: Box<ExprNode>,
        negated: bool,
        query: Box<QueryState>,
    },
    /// `(L op ANY(rhs))` / `(L op ALL(rhs))`
    Quantified {
        left: Box<ExprNode>,
        op: Operator,
        quantifier: Quantifier,
        rhs: QuantifiedRhs,
    },
    /// `(X COLLATE "name")` — the collation is always quoted.
    Collate {
        operand: Box<ExprNode>,
        collation: String,
    },
    /// `CAST(X AS type)`
    Cast {
        operand: Box<ExprNode>,
        ty: TokenStream,
    },
    /// `name(args)`
    FunctionCall { name: String, args: Vec<ExprNode> },
    /// A plain aggregate, possibly with `DISTINCT` / `ORDER BY` / `FILTER`.
    Aggregate(Box<AggregateNode>),
    /// An ordered-set aggregate with `WITHIN GROUP`.
    OrderedSetAggregate(Box<OrderedSetNode>),
    /// `json_object_agg(k : v ...)`
    JsonObjectAggregate(Box<JsonObjectAggNode>),
    /// `json_array_agg(v ...)`
    JsonArrayAggregate(Box<JsonArrayAggNode>),
    /// A window function call `fn(args) OVER name`.
    WindowCall(Box<WindowCallNode>),
    /// `ARRAY[a, b, c]`
    ArrayLiteral(Vec<ExprNode>),
    /// `ROW (a, b, c)`
    Row(Vec<ExprNode>),
    /// `EXISTS (subquery)` / `(NOT EXISTS (subquery))`
    Exists {
        query: Box<QueryState>,
        negated: bool,
    },
    /// A scalar subquery `(SELECT ...)` used as an expression.
    Subquery(Box<QueryState>),
}

impl ExprNode {
    fn paren(ts: &mut TokenStream, inner: impl FnOnce(&mut TokenStream)) {
        ts.lparen();
        inner(ts);
        ts.rparen();
    }

    fn subquery_tokens(ts: &mut TokenStream, query: &QueryState) {
        ts.lparen();
        query.write_tokens(ts);
        ts.rparen();
    }

    /// Lower this expression to tokens.
    pub fn write_tokens(&self, ts: &mut TokenStream) {
        match self {
            ExprNode::Constant(lit) => {
                ts.push(Token::Literal(lit.clone()));
            }
            ExprNode::Column { table, column } => {
                ts.push(Token::ColumnRef {
                    table: table.clone(),
                    column: column.clone(),
                });
            }
            ExprNode::Parameter(index) => {
                ts.push(Token::Parameter(*index));
            }
            ExprNode::Prefix { op, operand } => {
                Self::paren(ts, |ts| {
                    ts.push(Token::Operator(op.clone()));
                    operand.write_tokens(ts);
                });
            }
            ExprNode::Postfix { operand, op } => {
                Self::paren(ts, |ts| {
                    operand.write_tokens(ts);
                    ts.push(Token::Operator(op.clone()));
                });
            }
            ExprNode::Infix { left, op, right } => {
                Self::paren(ts, |ts| {
                    left.write_tokens(ts);
                    ts.push(Token::Operator(op.clone()));
                    right.write_tokens(ts);
                });
            }
            ExprNode::Multi { left, op, operands } => {
                Self::paren(ts, |ts| {
                    left.write_tokens(ts);
                    ts.push(Token::Operator(op.clone()));
                    ts.lparen();
                    ts.comma_separate(operands, |ts, operand| operand.write_tokens(ts));
                    ts.rparen();
                });
            }
            ExprNode::InSubquery {
                operand,
                negated,
                query,
            } => {
                Self::paren(ts, |ts| {
                    operand.write_tokens(ts);
                    let op = if *negated { "NOT IN" } else { "IN" };
                    ts.push(Token::Operator(Operator::known(op)));
                    Self::subquery_tokens(ts, query);
                });
            }
            ExprNode::Quantified {
                left,
                op,
                quantifier,
                rhs,
            } => {
                Self::paren(ts, |ts| {
                    left.write_tokens(ts);
                    ts.push(Token::Operator(op.clone()));
                    ts.keyword(match quantifier {
                        Quantifier::Any => Keyword::Any,
                        Quantifier::All => Keyword::All,
                    });
                    match rhs {
                        QuantifiedRhs::Array(array) => {
                            ts.lparen();
                            array.write_tokens(ts);
                            ts.rparen();
                        }
                        QuantifiedRhs::Subquery(query) => {
                            Self::subquery_tokens(ts, query);
                        }
                    }
                });
            }
            ExprNode::Collate { operand, collation } => {
                Self::paren(ts, |ts| {
                    operand.write_tokens(ts);
                    ts.push(Token::Operator(Operator::known("COLLATE")));
                    ts.push(Token::quoted_ident(collation.clone()));
                });
            }
            ExprNode::Cast { operand, ty } => {
                ts.keyword(Keyword::Cast);
                ts.lparen();
                operand.write_tokens(ts);
                ts.keyword(Keyword::As);
                ts.append(ty);
                ts.rparen();
            }
            ExprNode::FunctionCall { name, args } => {
                ts.push(Token::ident(name.clone()));
                ts.lparen();
                ts.comma_separate(args, |ts, arg| arg.write_tokens(ts));
                ts.rparen();
            }
            ExprNode::Aggregate(agg) => agg.write_tokens(ts),
            ExprNode::OrderedSetAggregate(agg) => agg.write_tokens(ts),
            ExprNode::JsonObjectAggregate(agg) => agg.write_tokens(ts),
            ExprNode::JsonArrayAggregate(agg) => agg.write_tokens(ts),
            ExprNode::WindowCall(call) => call.write_tokens(ts),
            ExprNode::ArrayLiteral(items) => {
                ts.keyword(Keyword::Array);
                ts.special(Special::LBracket);
                ts.comma_separate(items, |ts, item| item.write_tokens(ts));
                ts.special(Special::RBracket);
            }
            ExprNode::Row(items) => {
                ts.keyword(Keyword::Row);
                ts.lparen();
                ts.comma_separate(items, |ts, item| item.write_tokens(ts));
                ts.rparen();
            }
            ExprNode::Exists { query, negated } => {
                if *negated {
                    Self::paren(ts, |ts| {
                        ts.push(Token::Operator(Operator::known("NOT")));
                        ts.keyword(Keyword::Exists);
                        Self::subquery_tokens(ts, query);
                    });
                } else {
                    ts.keyword(Keyword::Exists);
                    Self::subquery_tokens(ts, query);
                }
            }
            ExprNode::Subquery(query) => {
                Self::subquery_tokens(ts, query);
            }
        }
    }
}

impl Serializable for ExprNode {
    fn to_tokens(&self) -> TokenStream {
        let mut ts = TokenStream::new();
        self.write_tokens(&mut ts);
        ts
    }
}

fn infix(left: ExprNode, op: &str, right: ExprNode) -> ExprNode {
    ExprNode::Infix {
        left: Box::new(left),
        op: Operator::known(op),
        right: Box::new(right),
    }
}

// =============================================================================
// Typed wrapper
// =============================================================================

/// An expression tagged with its SQL result type.
pub struct Expr<T: SqlType> {
    node: ExprNode,
    _sql: PhantomData<fn() -> T>,
}

impl<T: SqlType> Clone for Expr<T> {
    fn clone(&self) -> Self {
        Expr {
            node: self.node.clone(),
            _sql: PhantomData,
        }
    }
}

impl<T: SqlType> fmt::Debug for Expr<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Expr").field(&self.node).finish()
    }
}

impl<T: SqlType> PartialEq for Expr<T> {
    fn eq(&self, other: &Self) -> bool {
        self.node == other.node
    }
}

impl<T: SqlType> Serializable for Expr<T> {
    fn to_tokens(&self) -> TokenStream {
        self.node.to_tokens()
    }
}

impl<T: SqlType> fmt::Display for Expr<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_sql())
    }
}

impl<T: SqlType> Expr<T> {
    /// Wrap a raw node. The caller asserts the node's SQL type.
    pub fn from_node(node: ExprNode) -> Self {
        Expr {
            node,
            _sql: PhantomData,
        }
    }

    /// The underlying node.
    pub fn node(&self) -> &ExprNode {
        &self.node
    }

    /// Unwrap into the underlying node.
    pub fn into_node(self) -> ExprNode {
        self.node
    }

    /// A positional parameter placeholder `$index` (1-based).
    pub fn parameter(index: usize) -> Self {
        Expr::from_node(ExprNode::Parameter(index))
    }

    /// Alias this expression for a projection list: `expr AS name`.
    pub fn as_(&self, name: &str) -> Aliased<T> {
        Aliased::new(name, self.node.clone())
    }

    /// `(X IS NULL)`
    pub fn is_null(&self) -> Expr<Bool> {
        Expr::from_node(ExprNode::Postfix {
            operand: Box::new(self.node.clone()),
            op: Operator::known("IS NULL"),
        })
    }

    /// `(X IS NOT NULL)`
    pub fn is_not_null(&self) -> Expr<Bool> {
        Expr::from_node(ExprNode::Postfix {
            operand: Box::new(self.node.clone()),
            op: Operator::known("IS NOT NULL"),
        })
    }

    /// `(L = R)`
    pub fn eq(&self, rhs: impl IntoExpr<T>) -> Expr<Bool> {
        Expr::from_node(infix(self.node.clone(), "=", rhs.into_expr().node))
    }

    /// `(L <> R)`
    pub fn ne(&self, rhs: impl IntoExpr<T>) -> Expr<Bool> {
        Expr::from_node(infix(self.node.clone(), "<>", rhs.into_expr().node))
    }

    /// `(L IS DISTINCT FROM R)`
    pub fn is_distinct_from(&self, rhs: impl IntoExpr<T>) -> Expr<Bool> {
        Expr::from_node(infix(
            self.node.clone(),
            "IS DISTINCT FROM",
            rhs.into_expr().node,
        ))
    }

    /// `(L IS NOT DISTINCT FROM R)`
    pub fn is_not_distinct_from(&self, rhs: impl IntoExpr<T>) -> Expr<Bool> {
        Expr::from_node(infix(
            self.node.clone(),
            "IS NOT DISTINCT FROM",
            rhs.into_expr().node,
        ))
    }

    fn in_variant(&self, op: &str, empty: bool, operands: Vec<ExprNode>) -> Expr<Bool> {
        // `x IN ()` is not SQL; an empty list degenerates to its truth value.
        if operands.is_empty() {
            return Expr::from_node(ExprNode::Constant(Literal::Bool(empty)));
        }
        Expr::from_node(ExprNode::Multi {
            left: Box::new(self.node.clone()),
            op: Operator::known(op),
            operands,
        })
    }

    /// `(L IN (v1, v2, ...))`
    pub fn in_list<I>(&self, items: I) -> Expr<Bool>
    where
        I: IntoIterator,
        I::Item: IntoExpr<T>,
    {
        let operands: Vec<_> = items.into_iter().map(|i| i.into_expr().node).collect();
        self.in_variant("IN", false, operands)
    }

    /// `(L NOT IN (v1, v2, ...))`
    pub fn not_in_list<I>(&self, items: I) -> Expr<Bool>
    where
        I: IntoIterator,
        I::Item: IntoExpr<T>,
    {
        let operands: Vec<_> = items.into_iter().map(|i| i.into_expr().node).collect();
        self.in_variant("NOT IN", true, operands)
    }

    /// `(L IN (subquery))`
    pub fn in_subquery(&self, query: impl IntoSubquery) -> Expr<Bool> {
        Expr::from_node(ExprNode::InSubquery {
            operand: Box::new(self.node.clone()),
            negated: false,
            query: Box::new(query.into_subquery()),
        })
    }

    /// `(L NOT IN (subquery))`
    pub fn not_in_subquery(&self, query: impl IntoSubquery) -> Expr<Bool> {
        Expr::from_node(ExprNode::InSubquery {
            operand: Box::new(self.node.clone()),
            negated: true,
            query: Box::new(query.into_subquery()),
        })
    }

    fn quantified(&self, op: Operator, quantifier: Quantifier, rhs: QuantifiedRhs) -> Expr<Bool> {
        Expr::from_node(ExprNode::Quantified {
            left: Box::new(self.node.clone()),
            op,
            quantifier,
            rhs,
        })
    }

    /// `(L op ANY(array))`
    pub fn any_array(&self, op: Operator, array: impl IntoExpr<Array<T>>) -> Expr<Bool> {
        self.quantified(
            op,
            Quantifier::Any,
            QuantifiedRhs::Array(Box::new(array.into_expr().node)),
        )
    }

    /// `(L op ALL(array))`
    pub fn all_array(&self, op: Operator, array: impl IntoExpr<Array<T>>) -> Expr<Bool> {
        self.quantified(
            op,
            Quantifier::All,
            QuantifiedRhs::Array(Box::new(array.into_expr().node)),
        )
    }

    /// `(L op ANY(subquery))`
    pub fn any_subquery(&self, op: Operator, query: impl IntoSubquery) -> Expr<Bool> {
        self.quantified(
            op,
            Quantifier::Any,
            QuantifiedRhs::Subquery(Box::new(query.into_subquery())),
        )
    }

    /// `(L op ALL(subquery))`
    pub fn all_subquery(&self, op: Operator, query: impl IntoSubquery) -> Expr<Bool> {
        self.quantified(
            op,
            Quantifier::All,
            QuantifiedRhs::Subquery(Box::new(query.into_subquery())),
        )
    }

    /// `CAST(X AS type)`
    pub fn cast_as<U: SqlType>(&self) -> Expr<U> {
        let mut ty = TokenStream::new();
        U::type_tokens(&mut ty);
        Expr::from_node(ExprNode::Cast {
            operand: Box::new(self.node.clone()),
            ty,
        })
    }

    /// `(X COLLATE "name")`
    pub fn collate(&self, collation: &str) -> Expr<Text> {
        Expr::from_node(ExprNode::Collate {
            operand: Box::new(self.node.clone()),
            collation: collation.to_owned(),
        })
    }

    /// Generic operator application `(L op R)` with a caller-supplied result
    /// type. The escape hatch for operators without a dedicated method.
    pub fn binary<U: SqlType>(&self, op: Operator, rhs: impl AnyExpr) -> Expr<U> {
        Expr::from_node(ExprNode::Infix {
            left: Box::new(self.node.clone()),
            op,
            right: Box::new(rhs.into_erased_node()),
        })
    }

    /// Ascending order specification.
    pub fn asc(&self) -> OrderSpec {
        OrderSpec::new(self.node.clone(), Some(Direction::Asc))
    }

    /// Descending order specification.
    pub fn desc(&self) -> OrderSpec {
        OrderSpec::new(self.node.clone(), Some(Direction::Desc))
    }

    /// Order through an explicit operator: `expr USING op`.
    pub fn using(&self, op: Operator) -> OrderSpec {
        OrderSpec::new(self.node.clone(), Some(Direction::Using(op)))
    }
}

impl Expr<Bool> {
    /// `(L AND R)`
    pub fn and(&self, rhs: impl IntoExpr<Bool>) -> Expr<Bool> {
        Expr::from_node(infix(self.node.clone(), "AND", rhs.into_expr().node))
    }

    /// `(L OR R)`
    pub fn or(&self, rhs: impl IntoExpr<Bool>) -> Expr<Bool> {
        Expr::from_node(infix(self.node.clone(), "OR", rhs.into_expr().node))
    }
}

impl<T: SqlOrd> Expr<T> {
    /// `(L < R)`
    pub fn lt(&self, rhs: impl IntoExpr<T>) -> Expr<Bool> {
        Expr::from_node(infix(self.node.clone(), "<", rhs.into_expr().node))
    }

    /// `(L <= R)`
    pub fn le(&self, rhs: impl IntoExpr<T>) -> Expr<Bool> {
        Expr::from_node(infix(self.node.clone(), "<=", rhs.into_expr().node))
    }

    /// `(L > R)`
    pub fn gt(&self, rhs: impl IntoExpr<T>) -> Expr<Bool> {
        Expr::from_node(infix(self.node.clone(), ">", rhs.into_expr().node))
    }

    /// `(L >= R)`
    pub fn ge(&self, rhs: impl IntoExpr<T>) -> Expr<Bool> {
        Expr::from_node(infix(self.node.clone(), ">=", rhs.into_expr().node))
    }
}

impl<T: SqlText> Expr<T> {
    /// `(L LIKE R)`
    pub fn like(&self, pattern: impl IntoExpr<Text>) -> Expr<Bool> {
        Expr::from_node(infix(self.node.clone(), "LIKE", pattern.into_expr().node))
    }

    /// `(L NOT LIKE R)`
    pub fn not_like(&self, pattern: impl IntoExpr<Text>) -> Expr<Bool> {
        Expr::from_node(infix(
            self.node.clone(),
            "NOT LIKE",
            pattern.into_expr().node,
        ))
    }

    /// `(L ILIKE R)`
    pub fn ilike(&self, pattern: impl IntoExpr<Text>) -> Expr<Bool> {
        Expr::from_node(infix(self.node.clone(), "ILIKE", pattern.into_expr().node))
    }

    /// `(L NOT ILIKE R)`
    pub fn not_ilike(&self, pattern: impl IntoExpr<Text>) -> Expr<Bool> {
        Expr::from_node(infix(
            self.node.clone(),
            "NOT ILIKE",
            pattern.into_expr().node,
        ))
    }

    /// `(L || R)`
    pub fn concat(&self, rhs: impl IntoExpr<Text>) -> Expr<Text> {
        Expr::from_node(infix(self.node.clone(), "||", rhs.into_expr().node))
    }
}

impl<T: SqlNum> Expr<T> {
    /// `(L + R)`
    pub fn add(&self, rhs: impl IntoExpr<T>) -> Expr<T> {
        Expr::from_node(infix(self.node.clone(), "+", rhs.into_expr().node))
    }

    /// `(L - R)`
    pub fn sub(&self, rhs: impl IntoExpr<T>) -> Expr<T> {
        Expr::from_node(infix(self.node.clone(), "-", rhs.into_expr().node))
    }

    /// `(L * R)`
    pub fn mul(&self, rhs: impl IntoExpr<T>) -> Expr<T> {
        Expr::from_node(infix(self.node.clone(), "*", rhs.into_expr().node))
    }

    /// `(L / R)`
    pub fn div(&self, rhs: impl IntoExpr<T>) -> Expr<T> {
        Expr::from_node(infix(self.node.clone(), "/", rhs.into_expr().node))
    }
}

impl<T: SqlType> Expr<Nullable<T>> {
    /// Project a nullable expression to its not-null type, for comparisons
    /// against non-nullable operands.
    pub fn not_null(&self) -> Expr<T> {
        Expr::from_node(self.node.clone())
    }
}

// =============================================================================
// Conversions
// =============================================================================

/// Conversion into a typed expression. Implemented for expressions
/// themselves and for *literal* host values: only `&'static str` converts to
/// a text expression, so runtime strings have to be bound as parameters.
pub trait IntoExpr<T: SqlType> {
    fn into_expr(self) -> Expr<T>;
}

impl<T: SqlType> IntoExpr<T> for Expr<T> {
    fn into_expr(self) -> Expr<T> {
        self
    }
}

impl<T: SqlType> IntoExpr<T> for &Expr<T> {
    fn into_expr(self) -> Expr<T> {
        self.clone()
    }
}

macro_rules! literal_exprs {
    ($($host:ty => $marker:ty, $variant:expr;)+) => {
        $(
            impl IntoExpr<$marker> for $host {
                fn into_expr(self) -> Expr<$marker> {
                    Expr::from_node(ExprNode::Constant(($variant)(self)))
                }
            }
        )+
    };
}

literal_exprs! {
    bool => Bool, Literal::Bool;
    i16 => crate::types::Int2, |v: i16| Literal::Int(v as i64);
    i32 => crate::types::Int4, |v: i32| Literal::Int(v as i64);
    i64 => crate::types::Int8, Literal::Int;
    f32 => crate::types::Float4, |v: f32| Literal::Float(v as f64);
    f64 => crate::types::Float8, Literal::Float;
    &'static str => Text, |v: &'static str| Literal::Str(v.to_owned());
}

/// A constant expression from a literal host value.
pub fn lit<T: SqlType, V: IntoExpr<T>>(value: V) -> Expr<T> {
    value.into_expr()
}

/// The `null` constant, typed as the nullable projection of `T`.
pub fn null<T: SqlType>() -> Expr<Nullable<T>> {
    Expr::from_node(ExprNode::Constant(Literal::Null))
}

/// A UUID constant. Rejects anything that is not canonical `8-4-4-4-12` hex.
pub fn uuid(value: &str) -> QueryResult<Expr<Uuid>> {
    let parsed = UuidValue::parse(value)?;
    Ok(Expr::from_node(ExprNode::Constant(Literal::Str(
        parsed.as_str().to_owned(),
    ))))
}

/// Logical negation `(not X)`.
pub fn not(value: impl IntoExpr<Bool>) -> Expr<Bool> {
    Expr::from_node(ExprNode::Prefix {
        op: Operator::known("not"),
        operand: Box::new(value.into_expr().node),
    })
}

/// A column reference `table.column` with a caller-asserted type.
pub fn field<T: SqlType>(table: &str, column: &str) -> Expr<T> {
    Expr::from_node(ExprNode::Column {
        table: table.to_owned(),
        column: column.to_owned(),
    })
}

/// A function call `name(args)` with a caller-asserted result type.
pub fn func<T: SqlType>(name: &str, args: impl ExprList) -> Expr<T> {
    Expr::from_node(ExprNode::FunctionCall {
        name: name.to_owned(),
        args: args.into_nodes(),
    })
}

/// A row constructor `ROW (a, b, ...)`.
pub fn row(items: impl ExprList) -> Expr<Dynamic> {
    Expr::from_node(ExprNode::Row(items.into_nodes()))
}

/// An array literal `ARRAY[a, b, ...]`.
pub fn array<T, I>(items: I) -> Expr<Array<T>>
where
    T: SqlType,
    I: IntoIterator,
    I::Item: IntoExpr<T>,
{
    Expr::from_node(ExprNode::ArrayLiteral(
        items.into_iter().map(|i| i.into_expr().node).collect(),
    ))
}

/// `EXISTS (subquery)`
pub fn exists(query: impl IntoSubquery) -> Expr<Bool> {
    Expr::from_node(ExprNode::Exists {
        query: Box::new(query.into_subquery()),
        negated: false,
    })
}

/// `(NOT EXISTS (subquery))`
pub fn not_exists(query: impl IntoSubquery) -> Expr<Bool> {
    Expr::from_node(ExprNode::Exists {
        query: Box::new(query.into_subquery()),
        negated: true,
    })
}

/// A type-erased expression operand; accepted where heterogeneous argument
/// lists are built.
pub trait AnyExpr {
    fn into_erased_node(self) -> ExprNode;
}

impl<T: SqlType> AnyExpr for Expr<T> {
    fn into_erased_node(self) -> ExprNode {
        self.node
    }
}

impl<T: SqlType> AnyExpr for &Expr<T> {
    fn into_erased_node(self) -> ExprNode {
        self.node.clone()
    }
}

/// A heterogeneous list of expressions (function arguments, partition keys).
pub trait ExprList {
    fn into_nodes(self) -> Vec<ExprNode>;
}

impl ExprList for () {
    fn into_nodes(self) -> Vec<ExprNode> {
        Vec::new()
    }
}

impl ExprList for Vec<ExprNode> {
    fn into_nodes(self) -> Vec<ExprNode> {
        self
    }
}

impl<T: SqlType> ExprList for Expr<T> {
    fn into_nodes(self) -> Vec<ExprNode> {
        vec![self.node]
    }
}

impl<T: SqlType> ExprList for &Expr<T> {
    fn into_nodes(self) -> Vec<ExprNode> {
        vec![self.node.clone()]
    }
}

macro_rules! expr_list_tuples {
    ($(($($name:ident),+))+) => {
        $(
            #[allow(non_snake_case)]
            impl<$($name: AnyExpr),+> ExprList for ($($name,)+) {
                fn into_nodes(self) -> Vec<ExprNode> {
                    let ($($name,)+) = self;
                    vec![$($name.into_erased_node()),+]
                }
            }
        )+
    };
}

expr_list_tuples! {
    (A)
    (A, B)
    (A, B, C)
    (A, B, C, D)
    (A, B, C, D, E)
    (A, B, C, D, E, F)
    (A, B, C, D, E, F, G)
    (A, B, C, D, E, F, G, H)
}

// =============================================================================
// Ordering specifications
// =============================================================================

/// Sort direction of one `ORDER BY` element.
#[derive(Debug, Clone, PartialEq)]
pub enum Direction {
    Asc,
    Desc,
    /// `USING op`
    Using(Operator),
}

/// `NULLS FIRST` / `NULLS LAST`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NullsOrder {
    First,
    Last,
}

/// One ordering element, type-erased.
#[derive(Debug, Clone, PartialEq)]
pub struct OrderSpecNode {
    pub(crate) expr: ExprNode,
    pub(crate) direction: Option<Direction>,
    pub(crate) nulls: Option<NullsOrder>,
}

impl OrderSpecNode {
    pub(crate) fn write_tokens(&self, ts: &mut TokenStream) {
        self.expr.write_tokens(ts);
        match &self.direction {
            Some(Direction::Asc) => {
                ts.keyword(Keyword::Asc);
            }
            Some(Direction::Desc) => {
                ts.keyword(Keyword::Desc);
            }
            Some(Direction::Using(op)) => {
                ts.keyword(Keyword::Using);
                ts.push(Token::Operator(op.clone()));
            }
            None => {}
        }
        match self.nulls {
            Some(NullsOrder::First) => {
                ts.keyword(Keyword::NullsFirst);
            }
            Some(NullsOrder::Last) => {
                ts.keyword(Keyword::NullsLast);
            }
            None => {}
        }
    }
}

/// An ordering specification produced by `asc()` / `desc()` / `using(op)`.
///
/// A bare expression used where an ordering is expected keeps PostgreSQL's
/// default (`ASC NULLS LAST`) by emitting no direction at all.
#[derive(Debug, Clone, PartialEq)]
#[must_use = "ordering specifications have no effect until used in a clause"]
pub struct OrderSpec {
    node: OrderSpecNode,
}

impl OrderSpec {
    fn new(expr: ExprNode, direction: Option<Direction>) -> Self {
        OrderSpec {
            node: OrderSpecNode {
                expr,
                direction,
                nulls: None,
            },
        }
    }

    /// Append `NULLS FIRST`.
    pub fn nulls_first(mut self) -> Self {
        self.node.nulls = Some(NullsOrder::First);
        self
    }

    /// Append `NULLS LAST`.
    pub fn nulls_last(mut self) -> Self {
        self.node.nulls = Some(NullsOrder::Last);
        self
    }
}

/// Conversion into one ordering element.
pub trait IntoOrderSpec {
    fn into_order_spec(self) -> OrderSpecNode;
}

impl IntoOrderSpec for OrderSpec {
    fn into_order_spec(self) -> OrderSpecNode {
        self.node
    }
}

impl<T: SqlType> IntoOrderSpec for Expr<T> {
    fn into_order_spec(self) -> OrderSpecNode {
        OrderSpecNode {
            expr: self.node,
            direction: None,
            nulls: None,
        }
    }
}

impl<T: SqlType> IntoOrderSpec for &Expr<T> {
    fn into_order_spec(self) -> OrderSpecNode {
        self.clone().into_order_spec()
    }
}

/// A list of ordering elements (possibly mixed bare expressions and
/// explicit specifications).
pub trait OrderList {
    fn into_specs(self) -> Vec<OrderSpecNode>;
}

impl OrderList for Vec<OrderSpec> {
    fn into_specs(self) -> Vec<OrderSpecNode> {
        self.into_iter().map(IntoOrderSpec::into_order_spec).collect()
    }
}

impl OrderList for OrderSpec {
    fn into_specs(self) -> Vec<OrderSpecNode> {
        vec![self.node]
    }
}

impl<T: SqlType> OrderList for Expr<T> {
    fn into_specs(self) -> Vec<OrderSpecNode> {
        vec![self.into_order_spec()]
    }
}

macro_rules! order_list_tuples {
    ($(($($name:ident),+))+) => {
        $(
            #[allow(non_snake_case)]
            impl<$($name: IntoOrderSpec),+> OrderList for ($($name,)+) {
                fn into_specs(self) -> Vec<OrderSpecNode> {
                    let ($($name,)+) = self;
                    vec![$($name.into_order_spec()),+]
                }
            }
        )+
    };
}

order_list_tuples! {
    (A)
    (A, B)
    (A, B, C)
    (A, B, C, D)
    (A, B, C, D, E)
    (A, B, C, D, E, F)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Int4, Int8};

    #[test]
    fn constant_is_null() {
        assert_eq!(lit("abc").is_null().to_sql(), "('abc' IS NULL)");
    }

    #[test]
    fn constant_in_list() {
        let sql = lit(1).in_list([lit(2), lit(3)]).to_sql();
        assert_eq!(sql, "(1 IN (2, 3))");
    }

    #[test]
    fn empty_in_list_degenerates() {
        let e = field::<Int8>("t", "x");
        assert_eq!(e.in_list(Vec::<Expr<Int8>>::new()).to_sql(), "false");
        assert_eq!(e.not_in_list(Vec::<Expr<Int8>>::new()).to_sql(), "true");
    }

    #[test]
    fn cast_renders_type_name() {
        assert_eq!(lit(1i64).cast_as::<Bool>().to_sql(), "CAST(1 AS boolean)");
    }

    #[test]
    fn field_quotes_only_when_needed() {
        assert_eq!(field::<Text>("users", "name").to_sql(), "users.name");
        assert_eq!(
            field::<Text>("user group", "select").to_sql(),
            "\"user group\".\"select\""
        );
    }

    #[test]
    fn logical_chain_parenthesises_each_step() {
        let active = field::<Bool>("users", "active");
        let age = field::<Int4>("users", "age");
        let sql = not(&active).and(age.ge(18)).to_sql();
        assert_eq!(sql, "((not users.active) AND (users.age >= 18))");
    }

    #[test]
    fn comparison_and_pattern_ops() {
        let name = field::<Text>("u", "name");
        assert_eq!(name.like(lit("a%")).to_sql(), "(u.name LIKE 'a%')");
        assert_eq!(name.ilike(lit("A%")).to_sql(), "(u.name ILIKE 'A%')");
        let age = field::<Int4>("u", "age");
        assert_eq!(age.lt(lit(3)).to_sql(), "(u.age < 3)");
    }

    #[test]
    fn collate_forces_quotes() {
        let sql = field::<Text>("u", "name").collate("de_DE").to_sql();
        assert_eq!(sql, "(u.name COLLATE \"de_DE\")");
    }

    #[test]
    fn distinctness_operators() {
        let a = field::<Int8>("t", "a");
        assert_eq!(
            a.is_distinct_from(lit(1i64)).to_sql(),
            "(t.a IS DISTINCT FROM 1)"
        );
        assert_eq!(
            a.is_not_distinct_from(lit(1i64)).to_sql(),
            "(t.a IS NOT DISTINCT FROM 1)"
        );
    }

    #[test]
    fn quantified_against_array() {
        let a = field::<Int8>("t", "a");
        let sql = a
            .any_array(Operator::new("=").unwrap(), array([lit(1i64), lit(2i64)]))
            .to_sql();
        assert_eq!(sql, "(t.a = ANY(ARRAY[1, 2]))");
    }

    #[test]
    fn array_and_row_literals() {
        assert_eq!(array([lit(1i64)]).to_sql(), "ARRAY[1]");
        assert_eq!(row((lit(1i64), lit("x"))).to_sql(), "ROW (1, 'x')");
    }

    #[test]
    fn uuid_literal_validation() {
        assert_eq!(
            uuid("550e8400-e29b-41d4-a716-446655440000").unwrap().to_sql(),
            "'550e8400-e29b-41d4-a716-446655440000'"
        );
        assert!(uuid("nope").is_err());
    }

    #[test]
    fn nullable_projection_allows_comparison() {
        let n = field::<Nullable<Int8>>("up", "user_id");
        assert_eq!(
            n.not_null().eq(Expr::parameter(1)).to_sql(),
            "(up.user_id = $1)"
        );
    }

    #[test]
    fn order_specs() {
        let x = field::<Int8>("t", "x");
        let mut ts = TokenStream::new();
        x.desc().nulls_first().into_order_spec().write_tokens(&mut ts);
        assert_eq!(ts.unlex(), "t.x DESC NULLS FIRST");

        let mut ts = TokenStream::new();
        x.using(Operator::new("<").unwrap())
            .into_order_spec()
            .write_tokens(&mut ts);
        assert_eq!(ts.unlex(), "t.x USING <");
    }

    #[test]
    fn serialisation_is_pure_and_repeatable() {
        let e = field::<Int8>("t", "x").add(lit(1i64)).eq(lit(10i64));
        let first = e.to_sql();
        let second = e.to_sql();
        assert_eq!(first, second);
        assert_eq!(first, "((t.x + 1) = 10)");
    }
}
