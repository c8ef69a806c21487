//! The staged SELECT builder.
//!
//! [`SelectQuery`] accumulates clauses into an immutable [`QueryState`].
//! Each clause method is gated by a stage marker, so clauses can only be
//! given in their legal order and each at most once; a later call simply
//! does not exist on the narrowed type. The `Lock` parameter is driven to
//! [`LockForbidden`] by any set-operation combinator, because row locks are
//! illegal on a combined query.
//!
//! Clause callbacks receive the source handles threaded through from the
//! from-clause, so predicates and orderings are spelled against typed
//! columns.

use std::fmt;
use std::marker::PhantomData;

use crate::error::{QueryError, QueryResult};
use crate::expr::{field, Expr, ExprList, ExprNode, OrderList, OrderSpecNode};
use crate::from::{FromNode, SubqueryFrom};
use crate::grouping::{GroupingList, GroupingTree, GroupingTrees, IntoGrouping};
use crate::keyword::Keyword;
use crate::token::{Literal, Serializable, Token, TokenStream};
use crate::types::{Bool, Dynamic, SqlType};
use crate::window::{WindowDef, WindowDefNode};

// =============================================================================
// Projections
// =============================================================================

/// One projection entry: `expr AS name`.
#[derive(Debug, Clone, PartialEq)]
pub struct SelectItem {
    pub name: String,
    pub expr: ExprNode,
}

impl SelectItem {
    fn write_tokens(&self, ts: &mut TokenStream) {
        self.expr.write_tokens(ts);
        ts.keyword(Keyword::As);
        ts.push(Token::ident(self.name.clone()));
    }
}

/// An aliased, typed projection entry, produced by `Expr::as_`.
#[must_use = "aliased expressions have no effect until used in a projection"]
pub struct Aliased<T: SqlType> {
    item: SelectItem,
    _sql: PhantomData<fn() -> T>,
}

impl<T: SqlType> Aliased<T> {
    pub(crate) fn new(name: &str, expr: ExprNode) -> Self {
        Aliased {
            item: SelectItem {
                name: name.to_owned(),
                expr,
            },
            _sql: PhantomData,
        }
    }

    /// Unwrap into the type-erased projection entry.
    pub fn into_item(self) -> SelectItem {
        self.item
    }
}

/// A projection shape: the value returned by a `select` callback.
///
/// Beyond supplying the projection entries, a projection knows how to
/// rebuild typed column handles against an alias, which is what makes a
/// query usable as a derived table.
pub trait Projection {
    /// Handles exposed when this projection is selected from as a subquery.
    type Handles: Clone;

    fn into_items(self) -> Vec<SelectItem>;

    fn handles(items: &[SelectItem], alias: &str) -> Self::Handles;
}

impl<T: SqlType> Projection for Aliased<T> {
    type Handles = Expr<T>;

    fn into_items(self) -> Vec<SelectItem> {
        vec![self.item]
    }

    fn handles(items: &[SelectItem], alias: &str) -> Self::Handles {
        field(alias, &items[0].name)
    }
}

/// A dynamic projection; column count is only known at runtime.
impl Projection for Vec<SelectItem> {
    type Handles = Vec<Expr<Dynamic>>;

    fn into_items(self) -> Vec<SelectItem> {
        self
    }

    fn handles(items: &[SelectItem], alias: &str) -> Self::Handles {
        items.iter().map(|item| field(alias, &item.name)).collect()
    }
}

macro_rules! projection_tuples {
    ($(($($name:ident . $idx:tt),+))+) => {
        $(
            impl<$($name: SqlType),+> Projection for ($(Aliased<$name>,)+) {
                type Handles = ($(Expr<$name>,)+);

                fn into_items(self) -> Vec<SelectItem> {
                    vec![$(self.$idx.item),+]
                }

                fn handles(items: &[SelectItem], alias: &str) -> Self::Handles {
                    ($(field::<$name>(alias, &items[$idx].name),)+)
                }
            }
        )+
    };
}

projection_tuples! {
    (A.0)
    (A.0, B.1)
    (A.0, B.1, C.2)
    (A.0, B.1, C.2, D.3)
    (A.0, B.1, C.2, D.3, E.4)
    (A.0, B.1, C.2, D.3, E.4, F.5)
    (A.0, B.1, C.2, D.3, E.4, F.5, G.6)
    (A.0, B.1, C.2, D.3, E.4, F.5, G.6, H.7)
}

/// Projections that are (or may be) exactly one column wide, and can
/// therefore be reified as a scalar expression.
pub trait SingleColumn: Projection {
    type Sql: SqlType;
}

impl<T: SqlType> SingleColumn for Aliased<T> {
    type Sql = T;
}

impl<T: SqlType> SingleColumn for (Aliased<T>,) {
    type Sql = T;
}

impl SingleColumn for Vec<SelectItem> {
    type Sql = Dynamic;
}

// =============================================================================
// Clause data
// =============================================================================

/// `DISTINCT` / `DISTINCT ON (exprs)`.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum DistinctPolicy {
    Distinct,
    DistinctOn(Vec<ExprNode>),
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct GroupByClause {
    pub(crate) distinct: bool,
    pub(crate) tree: GroupingTree,
}

/// Set-operation combinator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SetOpKind {
    Union,
    Intersect,
    Except,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct SetOpNode {
    pub(crate) kind: SetOpKind,
    pub(crate) all: bool,
    pub(crate) query: QueryState,
}

/// `LIMIT n` / `LIMIT ALL`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LimitValue {
    Count(u64),
    All,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct FetchNode {
    pub(crate) count: u64,
    pub(crate) with_ties: bool,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub(crate) struct Pagination {
    pub(crate) limit: Option<LimitValue>,
    pub(crate) offset: Option<u64>,
    pub(crate) fetch: Option<FetchNode>,
}

/// Row-lock strength.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockStrength {
    Update,
    NoKeyUpdate,
    Share,
    KeyShare,
}

/// Lock wait behaviour.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockBlock {
    Nowait,
    SkipLocked,
}

/// One `FOR strength [OF tables] [NOWAIT | SKIP LOCKED]` clause.
#[derive(Debug, Clone, PartialEq)]
#[must_use = "locks have no effect until attached to a query"]
pub struct Lock {
    strength: LockStrength,
    of: Vec<String>,
    block: Option<LockBlock>,
}

impl Lock {
    /// `FOR strength`
    pub fn new(strength: LockStrength) -> Self {
        Lock {
            strength,
            of: Vec::new(),
            block: None,
        }
    }

    /// `FOR UPDATE`
    pub fn update() -> Self {
        Lock::new(LockStrength::Update)
    }

    /// `FOR NO KEY UPDATE`
    pub fn no_key_update() -> Self {
        Lock::new(LockStrength::NoKeyUpdate)
    }

    /// `FOR SHARE`
    pub fn share() -> Self {
        Lock::new(LockStrength::Share)
    }

    /// `FOR KEY SHARE`
    pub fn key_share() -> Self {
        Lock::new(LockStrength::KeyShare)
    }

    /// Restrict the lock to the given table aliases.
    pub fn of(mut self, tables: &[&str]) -> Self {
        self.of = tables.iter().map(|t| (*t).to_owned()).collect();
        self
    }

    /// `NOWAIT`
    pub fn nowait(mut self) -> Self {
        self.block = Some(LockBlock::Nowait);
        self
    }

    /// `SKIP LOCKED`
    pub fn skip_locked(mut self) -> Self {
        self.block = Some(LockBlock::SkipLocked);
        self
    }

    fn write_tokens(&self, ts: &mut TokenStream) {
        ts.keyword(Keyword::For);
        ts.keyword(match self.strength {
            LockStrength::Update => Keyword::Update,
            LockStrength::NoKeyUpdate => Keyword::NoKeyUpdate,
            LockStrength::Share => Keyword::Share,
            LockStrength::KeyShare => Keyword::KeyShare,
        });
        if !self.of.is_empty() {
            ts.keyword(Keyword::Of);
            ts.comma_separate(&self.of, |ts, table| {
                ts.push(Token::ident(table.clone()));
            });
        }
        match self.block {
            Some(LockBlock::Nowait) => {
                ts.keyword(Keyword::Nowait);
            }
            Some(LockBlock::SkipLocked) => {
                ts.keyword(Keyword::SkipLocked);
            }
            None => {}
        }
    }
}

// =============================================================================
// Query state
// =============================================================================

/// The immutable, type-erased record of one SELECT statement.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryState {
    pub(crate) from: FromNode,
    pub(crate) projection: Vec<SelectItem>,
    pub(crate) distinct: Option<DistinctPolicy>,
    pub(crate) where_clause: Option<ExprNode>,
    pub(crate) group_by: Option<GroupByClause>,
    pub(crate) having: Option<ExprNode>,
    pub(crate) windows: Vec<(String, WindowDefNode)>,
    pub(crate) set_ops: Vec<SetOpNode>,
    pub(crate) order_by: Vec<OrderSpecNode>,
    pub(crate) pagination: Pagination,
    pub(crate) locks: Vec<Lock>,
}

impl QueryState {
    fn new(from: FromNode, projection: Vec<SelectItem>) -> Self {
        QueryState {
            from,
            projection,
            distinct: None,
            where_clause: None,
            group_by: None,
            having: None,
            windows: Vec::new(),
            set_ops: Vec::new(),
            order_by: Vec::new(),
            pagination: Pagination::default(),
            locks: Vec::new(),
        }
    }

    /// Clause emission order is fixed: SELECT, distinct, projection, FROM,
    /// WHERE, GROUP BY, HAVING, WINDOW, set operations, ORDER BY,
    /// pagination, locks.
    pub(crate) fn write_tokens(&self, ts: &mut TokenStream) {
        ts.keyword(Keyword::Select);
        match &self.distinct {
            Some(DistinctPolicy::Distinct) => {
                ts.keyword(Keyword::Distinct);
            }
            Some(DistinctPolicy::DistinctOn(keys)) => {
                ts.keyword(Keyword::Distinct);
                ts.keyword(Keyword::On);
                ts.lparen();
                ts.comma_separate(keys, |ts, key| key.write_tokens(ts));
                ts.rparen();
            }
            None => {}
        }
        ts.comma_separate(&self.projection, |ts, item| item.write_tokens(ts));
        ts.keyword(Keyword::From);
        self.from.write_tokens(ts);
        if let Some(predicate) = &self.where_clause {
            ts.keyword(Keyword::Where);
            predicate.write_tokens(ts);
        }
        if let Some(group_by) = &self.group_by {
            ts.keyword(Keyword::GroupBy);
            if group_by.distinct {
                ts.keyword(Keyword::Distinct);
            }
            group_by.tree.write_tokens(ts);
        }
        if let Some(predicate) = &self.having {
            ts.keyword(Keyword::Having);
            predicate.write_tokens(ts);
        }
        if !self.windows.is_empty() {
            ts.keyword(Keyword::Window);
            ts.comma_separate(&self.windows, |ts, (name, def)| {
                ts.push(Token::ident(name.clone()));
                ts.keyword(Keyword::As);
                def.write_tokens(ts);
            });
        }
        for set_op in &self.set_ops {
            ts.keyword(match set_op.kind {
                SetOpKind::Union => Keyword::Union,
                SetOpKind::Intersect => Keyword::Intersect,
                SetOpKind::Except => Keyword::Except,
            });
            if set_op.all {
                ts.keyword(Keyword::All);
            }
            ts.lparen();
            set_op.query.write_tokens(ts);
            ts.rparen();
        }
        if !self.order_by.is_empty() {
            ts.keyword(Keyword::OrderBy);
            ts.comma_separate(&self.order_by, |ts, spec| spec.write_tokens(ts));
        }
        match self.pagination.limit {
            Some(LimitValue::Count(n)) => {
                ts.keyword(Keyword::Limit);
                ts.push(Token::Literal(Literal::Int(n as i64)));
            }
            Some(LimitValue::All) => {
                ts.keyword(Keyword::Limit);
                ts.keyword(Keyword::All);
            }
            None => {}
        }
        if let Some(offset) = self.pagination.offset {
            ts.keyword(Keyword::Offset);
            ts.push(Token::Literal(Literal::Int(offset as i64)));
        }
        if let Some(fetch) = self.pagination.fetch {
            ts.keyword(Keyword::Fetch);
            ts.keyword(Keyword::Next);
            ts.push(Token::Literal(Literal::Int(fetch.count as i64)));
            ts.keyword(Keyword::Rows);
            if fetch.with_ties {
                ts.keyword(Keyword::WithTies);
            } else {
                ts.keyword(Keyword::Only);
            }
        }
        for lock in &self.locks {
            lock.write_tokens(ts);
        }
    }
}

impl Serializable for QueryState {
    fn to_tokens(&self) -> TokenStream {
        let mut ts = TokenStream::new();
        self.write_tokens(&mut ts);
        ts
    }
}

/// Anything usable where a subquery is expected.
pub trait IntoSubquery {
    fn into_subquery(self) -> QueryState;
}

impl IntoSubquery for QueryState {
    fn into_subquery(self) -> QueryState {
        self
    }
}

impl<S, P, St, L> IntoSubquery for SelectQuery<S, P, St, L> {
    fn into_subquery(self) -> QueryState {
        self.state
    }
}

// =============================================================================
// Stages
// =============================================================================

/// Stage: query freshly selected; every clause still available.
pub struct Fresh;
/// Stage: distinct policy chosen.
pub struct DistinctSet;
/// Stage: `WHERE` set.
pub struct Filtered;
/// Stage: `GROUP BY` set.
pub struct Grouped;
/// Stage: `HAVING` set.
pub struct HavingSet;
/// Stage: at least one named window declared.
pub struct Windowed;
/// Stage: combined with a set operation; locks are gone for good.
pub struct Combined;
/// Stage: `ORDER BY` set.
pub struct Ordered;
/// Stage: `LIMIT` set.
pub struct LimitSet;
/// Stage: `OFFSET` set.
pub struct OffsetSet;
/// Stage: pagination finished with `FETCH`.
pub struct Paged;
/// Stage: at least one lock appended; only further locks may follow.
pub struct Locked;

/// Lock phantom: `FOR` clauses available.
pub struct LockAllowed;
/// Lock phantom: `FOR` clauses forbidden (query was combined).
pub struct LockForbidden;

macro_rules! stage_allows {
    ($(#[$meta:meta])* $tr:ident : $($st:ty),+ $(,)?) => {
        $(#[$meta])*
        pub trait $tr {}
        $(impl $tr for $st {})+
    };
}

stage_allows! {
    /// Stages on which `distinct` / `distinct_on` may still be called.
    AllowsDistinct: Fresh
}
stage_allows! {
    /// Stages on which `filter` may still be called.
    AllowsFilter: Fresh, DistinctSet
}
stage_allows! {
    /// Stages on which the `GROUP BY` family may still be called.
    AllowsGroupBy: Fresh, DistinctSet, Filtered
}
stage_allows! {
    /// Stages on which `having` may still be called.
    AllowsHaving: Fresh, DistinctSet, Filtered, Grouped
}
stage_allows! {
    /// Stages on which `window` may still be called.
    AllowsWindow: Fresh, DistinctSet, Filtered, Grouped, HavingSet, Windowed
}
stage_allows! {
    /// Stages on which a set operation may still be applied.
    AllowsSetOp: Fresh, DistinctSet, Filtered, Grouped, HavingSet, Windowed, Combined
}
stage_allows! {
    /// Stages on which `order_by` may still be called.
    AllowsOrderBy: Fresh, DistinctSet, Filtered, Grouped, HavingSet, Windowed, Combined
}
stage_allows! {
    /// Stages on which `limit` may still be called.
    AllowsLimit: Fresh, DistinctSet, Filtered, Grouped, HavingSet, Windowed, Combined, Ordered,
    OffsetSet
}
stage_allows! {
    /// Stages on which `offset` may still be called.
    AllowsOffset: Fresh, DistinctSet, Filtered, Grouped, HavingSet, Windowed, Combined, Ordered,
    LimitSet
}
stage_allows! {
    /// Stages on which `fetch` may still be called.
    AllowsFetch: Fresh, DistinctSet, Filtered, Grouped, HavingSet, Windowed, Combined, Ordered,
    OffsetSet
}
stage_allows! {
    /// Stages on which a lock clause may be appended.
    AllowsLock: Fresh, DistinctSet, Filtered, Grouped, HavingSet, Windowed, Ordered, LimitSet,
    OffsetSet, Paged, Locked
}

// =============================================================================
// The staged builder
// =============================================================================

/// A SELECT statement under construction.
///
/// `Src` is the handle value threaded to clause callbacks, `P` the
/// projection shape, `Stage` the current position in the clause order and
/// `L` whether lock clauses are still legal.
#[must_use = "queries have no effect until serialised with to_sql()"]
pub struct SelectQuery<Src, P, Stage, L> {
    state: QueryState,
    source: Src,
    _proj: PhantomData<fn() -> P>,
    _stage: PhantomData<fn() -> Stage>,
    _lock: PhantomData<fn() -> L>,
}

impl<Src: fmt::Debug, P, Stage, L> fmt::Debug for SelectQuery<Src, P, Stage, L> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SelectQuery")
            .field("state", &self.state)
            .field("source", &self.source)
            .finish()
    }
}

impl<Src, P> SelectQuery<Src, P, Fresh, LockAllowed> {
    pub(crate) fn new(from: FromNode, projection: Vec<SelectItem>, source: Src) -> Self {
        SelectQuery {
            state: QueryState::new(from, projection),
            source,
            _proj: PhantomData,
            _stage: PhantomData,
            _lock: PhantomData,
        }
    }
}

impl<Src, P, St, L> SelectQuery<Src, P, St, L> {
    fn stage<St2>(self) -> SelectQuery<Src, P, St2, L> {
        SelectQuery {
            state: self.state,
            source: self.source,
            _proj: PhantomData,
            _stage: PhantomData,
            _lock: PhantomData,
        }
    }

    fn forbid_locks<St2>(self) -> SelectQuery<Src, P, St2, LockForbidden> {
        SelectQuery {
            state: self.state,
            source: self.source,
            _proj: PhantomData,
            _stage: PhantomData,
            _lock: PhantomData,
        }
    }
}

impl<Src, P, St: AllowsDistinct, L> SelectQuery<Src, P, St, L> {
    /// `SELECT DISTINCT`
    pub fn distinct(mut self) -> SelectQuery<Src, P, DistinctSet, L> {
        self.state.distinct = Some(DistinctPolicy::Distinct);
        self.stage()
    }

    /// `SELECT DISTINCT ON (keys)`
    pub fn distinct_on<F, E>(mut self, keys: F) -> SelectQuery<Src, P, DistinctSet, L>
    where
        F: FnOnce(&Src) -> E,
        E: ExprList,
    {
        let keys = keys(&self.source).into_nodes();
        self.state.distinct = Some(DistinctPolicy::DistinctOn(keys));
        self.stage()
    }
}

impl<Src, P, St: AllowsFilter, L> SelectQuery<Src, P, St, L> {
    /// `WHERE predicate`
    pub fn filter<F>(mut self, predicate: F) -> SelectQuery<Src, P, Filtered, L>
    where
        F: FnOnce(&Src) -> Expr<Bool>,
    {
        self.state.where_clause = Some(predicate(&self.source).into_node());
        self.stage()
    }
}

impl<Src, P, St: AllowsGroupBy, L> SelectQuery<Src, P, St, L> {
    fn set_group_by(&mut self, distinct: bool, tree: GroupingTree) {
        self.state.group_by = Some(GroupByClause { distinct, tree });
    }

    /// `GROUP BY tree`
    pub fn group_by<F, G>(mut self, tree: F) -> SelectQuery<Src, P, Grouped, L>
    where
        F: FnOnce(&Src) -> G,
        G: IntoGrouping,
    {
        let tree = tree(&self.source).into_grouping();
        self.set_group_by(false, tree);
        self.stage()
    }

    /// `GROUP BY DISTINCT tree`
    pub fn group_by_distinct<F, G>(mut self, tree: F) -> SelectQuery<Src, P, Grouped, L>
    where
        F: FnOnce(&Src) -> G,
        G: IntoGrouping,
    {
        let tree = tree(&self.source).into_grouping();
        self.set_group_by(true, tree);
        self.stage()
    }

    /// `GROUP BY ROLLUP (elements)`
    pub fn rollup<F, G>(mut self, elements: F) -> SelectQuery<Src, P, Grouped, L>
    where
        F: FnOnce(&Src) -> G,
        G: GroupingList,
    {
        let tree = GroupingTree::Rollup(elements(&self.source).into_elements());
        self.set_group_by(false, tree);
        self.stage()
    }

    /// `GROUP BY CUBE (elements)`
    pub fn cube<F, G>(mut self, elements: F) -> SelectQuery<Src, P, Grouped, L>
    where
        F: FnOnce(&Src) -> G,
        G: GroupingList,
    {
        let tree = GroupingTree::Cube(elements(&self.source).into_elements());
        self.set_group_by(false, tree);
        self.stage()
    }

    /// `GROUP BY GROUPING SETS (trees)`
    pub fn grouping_sets<F, G>(mut self, trees: F) -> SelectQuery<Src, P, Grouped, L>
    where
        F: FnOnce(&Src) -> G,
        G: GroupingTrees,
    {
        let tree = GroupingTree::Sets(trees(&self.source).into_trees());
        self.set_group_by(false, tree);
        self.stage()
    }
}

impl<Src, P, St: AllowsHaving, L> SelectQuery<Src, P, St, L> {
    /// `HAVING predicate`
    pub fn having<F>(mut self, predicate: F) -> SelectQuery<Src, P, HavingSet, L>
    where
        F: FnOnce(&Src) -> Expr<Bool>,
    {
        self.state.having = Some(predicate(&self.source).into_node());
        self.stage()
    }
}

impl<Src, P, St: AllowsWindow, L> SelectQuery<Src, P, St, L> {
    /// Declare a named window. Fails with
    /// [`QueryError::DuplicateWindowName`] if `name` is already declared on
    /// this query.
    pub fn window<F>(mut self, name: &str, def: F) -> QueryResult<SelectQuery<Src, P, Windowed, L>>
    where
        F: FnOnce(&Src) -> WindowDef,
    {
        if self.state.windows.iter().any(|(n, _)| n == name) {
            return Err(QueryError::DuplicateWindowName {
                name: name.to_owned(),
            });
        }
        let def = def(&self.source).into_node();
        self.state.windows.push((name.to_owned(), def));
        Ok(self.stage())
    }
}

impl<Src, P, St: AllowsSetOp, L> SelectQuery<Src, P, St, L> {
    fn combine<S2, St2, L2>(
        mut self,
        kind: SetOpKind,
        all: bool,
        other: SelectQuery<S2, P, St2, L2>,
    ) -> SelectQuery<Src, P, Combined, LockForbidden> {
        self.state.set_ops.push(SetOpNode {
            kind,
            all,
            query: other.state,
        });
        self.forbid_locks()
    }

    /// `UNION (other)`
    pub fn union<S2, St2, L2>(
        self,
        other: SelectQuery<S2, P, St2, L2>,
    ) -> SelectQuery<Src, P, Combined, LockForbidden> {
        self.combine(SetOpKind::Union, false, other)
    }

    /// `UNION ALL (other)`
    pub fn union_all<S2, St2, L2>(
        self,
        other: SelectQuery<S2, P, St2, L2>,
    ) -> SelectQuery<Src, P, Combined, LockForbidden> {
        self.combine(SetOpKind::Union, true, other)
    }

    /// `INTERSECT (other)`
    pub fn intersect<S2, St2, L2>(
        self,
        other: SelectQuery<S2, P, St2, L2>,
    ) -> SelectQuery<Src, P, Combined, LockForbidden> {
        self.combine(SetOpKind::Intersect, false, other)
    }

    /// `INTERSECT ALL (other)`
    pub fn intersect_all<S2, St2, L2>(
        self,
        other: SelectQuery<S2, P, St2, L2>,
    ) -> SelectQuery<Src, P, Combined, LockForbidden> {
        self.combine(SetOpKind::Intersect, true, other)
    }

    /// `EXCEPT (other)`
    pub fn except<S2, St2, L2>(
        self,
        other: SelectQuery<S2, P, St2, L2>,
    ) -> SelectQuery<Src, P, Combined, LockForbidden> {
        self.combine(SetOpKind::Except, false, other)
    }

    /// `EXCEPT ALL (other)`
    pub fn except_all<S2, St2, L2>(
        self,
        other: SelectQuery<S2, P, St2, L2>,
    ) -> SelectQuery<Src, P, Combined, LockForbidden> {
        self.combine(SetOpKind::Except, true, other)
    }
}

impl<Src, P, St: AllowsOrderBy, L> SelectQuery<Src, P, St, L> {
    /// `ORDER BY specs`. Bare expressions keep PostgreSQL's default
    /// ordering (`ASC NULLS LAST`).
    pub fn order_by<F, O>(mut self, specs: F) -> SelectQuery<Src, P, Ordered, L>
    where
        F: FnOnce(&Src) -> O,
        O: OrderList,
    {
        self.state.order_by = specs(&self.source).into_specs();
        self.stage()
    }
}

impl<Src, P, St: AllowsLimit, L> SelectQuery<Src, P, St, L> {
    /// `LIMIT n`. Replaces any `FETCH` pagination.
    pub fn limit(mut self, count: u64) -> SelectQuery<Src, P, LimitSet, L> {
        self.state.pagination.limit = Some(LimitValue::Count(count));
        self.state.pagination.fetch = None;
        self.stage()
    }

    /// `LIMIT ALL`
    pub fn limit_all(mut self) -> SelectQuery<Src, P, LimitSet, L> {
        self.state.pagination.limit = Some(LimitValue::All);
        self.state.pagination.fetch = None;
        self.stage()
    }
}

impl<Src, P, St: AllowsOffset, L> SelectQuery<Src, P, St, L> {
    /// `OFFSET n`
    pub fn offset(mut self, count: u64) -> SelectQuery<Src, P, OffsetSet, L> {
        self.state.pagination.offset = Some(count);
        self.stage()
    }
}

impl<Src, P, St: AllowsFetch, L> SelectQuery<Src, P, St, L> {
    fn fetch_node(mut self, fetch: FetchNode) -> QueryResult<SelectQuery<Src, P, Paged, L>> {
        if self.state.pagination.offset.is_none() {
            return Err(QueryError::MissingOffsetForFetch);
        }
        self.state.pagination.fetch = Some(fetch);
        self.state.pagination.limit = None;
        Ok(self.stage())
    }

    /// `FETCH NEXT n ROWS ONLY`. Requires a preceding `offset`.
    pub fn fetch(self, count: u64) -> QueryResult<SelectQuery<Src, P, Paged, L>> {
        self.fetch_node(FetchNode {
            count,
            with_ties: false,
        })
    }

    /// `FETCH NEXT n ROWS WITH TIES`. Requires a preceding `offset`.
    pub fn fetch_with_ties(self, count: u64) -> QueryResult<SelectQuery<Src, P, Paged, L>> {
        self.fetch_node(FetchNode {
            count,
            with_ties: true,
        })
    }
}

impl<Src, P, St: AllowsLock> SelectQuery<Src, P, St, LockAllowed> {
    /// Append a lock clause. Multiple locks serialise in order.
    pub fn for_lock(mut self, lock: Lock) -> SelectQuery<Src, P, Locked, LockAllowed> {
        self.state.locks.push(lock);
        self.stage()
    }

    /// `FOR UPDATE`
    pub fn for_update(self) -> SelectQuery<Src, P, Locked, LockAllowed> {
        self.for_lock(Lock::update())
    }

    /// `FOR NO KEY UPDATE`
    pub fn for_no_key_update(self) -> SelectQuery<Src, P, Locked, LockAllowed> {
        self.for_lock(Lock::no_key_update())
    }

    /// `FOR SHARE`
    pub fn for_share(self) -> SelectQuery<Src, P, Locked, LockAllowed> {
        self.for_lock(Lock::share())
    }

    /// `FOR KEY SHARE`
    pub fn for_key_share(self) -> SelectQuery<Src, P, Locked, LockAllowed> {
        self.for_lock(Lock::key_share())
    }
}

impl<Src, P: Projection, St, L> SelectQuery<Src, P, St, L> {
    /// Use this query as a derived table `(SELECT ...) AS alias`, with
    /// typed handles rebuilt from the projection.
    pub fn as_(self, alias: &str) -> SubqueryFrom<P> {
        let handles = P::handles(&self.state.projection, alias);
        SubqueryFrom {
            query: Box::new(self.state),
            alias: alias.to_owned(),
            handles,
        }
    }
}

impl<Src, P: SingleColumn, St, L> SelectQuery<Src, P, St, L> {
    /// Reify this query as a scalar expression. The projection must be
    /// exactly one column wide; anything else fails with
    /// [`QueryError::ScalarArity`].
    pub fn scalar(self) -> QueryResult<Expr<P::Sql>> {
        let found = self.state.projection.len();
        if found == 1 {
            Ok(Expr::from_node(ExprNode::Subquery(Box::new(self.state))))
        } else {
            Err(QueryError::ScalarArity { found })
        }
    }
}

impl<Src, P, St, L> Serializable for SelectQuery<Src, P, St, L> {
    fn to_tokens(&self) -> TokenStream {
        self.state.to_tokens()
    }
}

impl<Src, P, St, L> fmt::Display for SelectQuery<Src, P, St, L> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_sql())
    }
}
