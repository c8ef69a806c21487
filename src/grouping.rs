//! The grouping-set tree: plain lists, `ROLLUP`, `CUBE` and
//! `GROUPING SETS` compose recursively under one `GROUP BY`.

use crate::expr::{AnyExpr, ExprList, ExprNode};
use crate::keyword::Keyword;
use crate::token::TokenStream;

/// One element of a rollup/cube/grouping list: an expression or a
/// parenthesised composite of expressions.
#[derive(Debug, Clone, PartialEq)]
pub enum GroupingElement {
    Expr(ExprNode),
    Composite(Vec<ExprNode>),
}

impl GroupingElement {
    fn write_tokens(&self, ts: &mut TokenStream) {
        match self {
            GroupingElement::Expr(e) => e.write_tokens(ts),
            GroupingElement::Composite(items) => {
                ts.lparen();
                ts.comma_separate(items, |ts, e| e.write_tokens(ts));
                ts.rparen();
            }
        }
    }
}

/// The recursive grouping structure of a `GROUP BY` clause.
#[derive(Debug, Clone, PartialEq)]
pub enum GroupingTree {
    /// A single expression.
    Expr(ExprNode),
    /// A flat list of grouping elements.
    List(Vec<GroupingElement>),
    /// `ROLLUP (e1, e2, ...)`
    Rollup(Vec<GroupingElement>),
    /// `CUBE (e1, e2, ...)`
    Cube(Vec<GroupingElement>),
    /// `GROUPING SETS (t1, t2, ...)`
    Sets(Vec<GroupingTree>),
}

impl GroupingTree {
    pub(crate) fn write_tokens(&self, ts: &mut TokenStream) {
        match self {
            GroupingTree::Expr(e) => e.write_tokens(ts),
            GroupingTree::List(elements) => {
                ts.comma_separate(elements, |ts, e| e.write_tokens(ts));
            }
            GroupingTree::Rollup(elements) => {
                ts.keyword(Keyword::Rollup);
                ts.lparen();
                ts.comma_separate(elements, |ts, e| e.write_tokens(ts));
                ts.rparen();
            }
            GroupingTree::Cube(elements) => {
                ts.keyword(Keyword::Cube);
                ts.lparen();
                ts.comma_separate(elements, |ts, e| e.write_tokens(ts));
                ts.rparen();
            }
            GroupingTree::Sets(trees) => {
                ts.keyword(Keyword::GroupingSets);
                ts.lparen();
                ts.comma_separate(trees, |ts, t| t.write_tokens(ts));
                ts.rparen();
            }
        }
    }
}

/// A composite grouping element `(a, b)`, built with [`composite`].
#[derive(Debug, Clone, PartialEq)]
pub struct Composite(Vec<ExprNode>);

/// Group several expressions into one composite grouping element.
pub fn composite(exprs: impl ExprList) -> Composite {
    Composite(exprs.into_nodes())
}

/// Conversion into a single grouping element.
pub trait IntoGroupingElement {
    fn into_element(self) -> GroupingElement;
}

impl<E: AnyExpr> IntoGroupingElement for E {
    fn into_element(self) -> GroupingElement {
        GroupingElement::Expr(self.into_erased_node())
    }
}

impl IntoGroupingElement for Composite {
    fn into_element(self) -> GroupingElement {
        GroupingElement::Composite(self.0)
    }
}

/// A list of grouping elements, as taken by `rollup(..)` and `cube(..)`.
pub trait GroupingList {
    fn into_elements(self) -> Vec<GroupingElement>;
}

impl GroupingList for Vec<GroupingElement> {
    fn into_elements(self) -> Vec<GroupingElement> {
        self
    }
}

macro_rules! grouping_list_tuples {
    ($(($($name:ident),+))+) => {
        $(
            #[allow(non_snake_case)]
            impl<$($name: IntoGroupingElement),+> GroupingList for ($($name,)+) {
                fn into_elements(self) -> Vec<GroupingElement> {
                    let ($($name,)+) = self;
                    vec![$($name.into_element()),+]
                }
            }
        )+
    };
}

grouping_list_tuples! {
    (A)
    (A, B)
    (A, B, C)
    (A, B, C, D)
    (A, B, C, D, E)
    (A, B, C, D, E, F)
}

/// Conversion into a grouping tree, as taken by `group_by(..)`.
pub trait IntoGrouping {
    fn into_grouping(self) -> GroupingTree;
}

impl IntoGrouping for GroupingTree {
    fn into_grouping(self) -> GroupingTree {
        self
    }
}

impl<E: AnyExpr> IntoGrouping for E {
    fn into_grouping(self) -> GroupingTree {
        GroupingTree::Expr(self.into_erased_node())
    }
}

/// `ROLLUP (elements)` as a grouping tree.
pub fn rollup(elements: impl GroupingList) -> GroupingTree {
    GroupingTree::Rollup(elements.into_elements())
}

/// `CUBE (elements)` as a grouping tree.
pub fn cube(elements: impl GroupingList) -> GroupingTree {
    GroupingTree::Cube(elements.into_elements())
}

/// A plain grouping list as a tree, for nesting inside `GROUPING SETS`.
pub fn grouping_list(elements: impl GroupingList) -> GroupingTree {
    GroupingTree::List(elements.into_elements())
}

/// A list of grouping trees, as taken by `grouping_sets(..)`.
pub trait GroupingTrees {
    fn into_trees(self) -> Vec<GroupingTree>;
}

impl GroupingTrees for Vec<GroupingTree> {
    fn into_trees(self) -> Vec<GroupingTree> {
        self
    }
}

macro_rules! grouping_trees_tuples {
    ($(($($name:ident),+))+) => {
        $(
            #[allow(non_snake_case)]
            impl<$($name: IntoGrouping),+> GroupingTrees for ($($name,)+) {
                fn into_trees(self) -> Vec<GroupingTree> {
                    let ($($name,)+) = self;
                    vec![$($name.into_grouping()),+]
                }
            }
        )+
    };
}

grouping_trees_tuples! {
    (A)
    (A, B)
    (A, B, C)
    (A, B, C, D)
}
