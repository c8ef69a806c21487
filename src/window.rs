//! Window definitions and frame specifications.
//!
//! A [`WindowDef`] is declared at the query level through
//! `SelectQuery::window(name, ..)` and referenced by name from window calls.
//! Frames keep their two illegal bounds unrepresentable: a start bound has
//! no `UNBOUNDED FOLLOWING` and an end bound no `UNBOUNDED PRECEDING`.

use crate::expr::{ExprList, ExprNode, OrderList, OrderSpecNode};
use crate::keyword::Keyword;
use crate::token::{Literal, Token, TokenStream};

/// Frame mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameKind {
    Range,
    Rows,
    Groups,
}

/// Start bound of a frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameStart {
    UnboundedPreceding,
    Preceding(u64),
    CurrentRow,
    Following(u64),
}

/// End bound of a frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameEnd {
    Preceding(u64),
    CurrentRow,
    Following(u64),
    UnboundedFollowing,
}

/// Frame exclusion policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameExclusion {
    CurrentRow,
    Group,
    Ties,
    NoOthers,
}

/// A window frame clause.
#[derive(Debug, Clone, PartialEq)]
#[must_use = "frames have no effect until attached to a window definition"]
pub struct Frame {
    kind: FrameKind,
    start: FrameStart,
    end: Option<FrameEnd>,
    exclusion: Option<FrameExclusion>,
}

impl Frame {
    /// A frame with only a start bound.
    pub fn new(kind: FrameKind, start: FrameStart) -> Self {
        Frame {
            kind,
            start,
            end: None,
            exclusion: None,
        }
    }

    /// A `BETWEEN start AND end` frame.
    pub fn between(kind: FrameKind, start: FrameStart, end: FrameEnd) -> Self {
        Frame {
            kind,
            start,
            end: Some(end),
            exclusion: None,
        }
    }

    /// `ROWS UNBOUNDED PRECEDING`
    pub fn rows_unbounded_preceding() -> Self {
        Frame::new(FrameKind::Rows, FrameStart::UnboundedPreceding)
    }

    /// `ROWS BETWEEN UNBOUNDED PRECEDING AND CURRENT ROW`
    pub fn rows_to_current() -> Self {
        Frame::between(
            FrameKind::Rows,
            FrameStart::UnboundedPreceding,
            FrameEnd::CurrentRow,
        )
    }

    /// `ROWS BETWEEN start AND end`
    pub fn rows_between(start: FrameStart, end: FrameEnd) -> Self {
        Frame::between(FrameKind::Rows, start, end)
    }

    /// `RANGE BETWEEN start AND end`
    pub fn range_between(start: FrameStart, end: FrameEnd) -> Self {
        Frame::between(FrameKind::Range, start, end)
    }

    /// `GROUPS BETWEEN start AND end`
    pub fn groups_between(start: FrameStart, end: FrameEnd) -> Self {
        Frame::between(FrameKind::Groups, start, end)
    }

    /// `EXCLUDE CURRENT ROW`
    pub fn exclude_current_row(mut self) -> Self {
        self.exclusion = Some(FrameExclusion::CurrentRow);
        self
    }

    /// `EXCLUDE GROUP`
    pub fn exclude_group(mut self) -> Self {
        self.exclusion = Some(FrameExclusion::Group);
        self
    }

    /// `EXCLUDE TIES`
    pub fn exclude_ties(mut self) -> Self {
        self.exclusion = Some(FrameExclusion::Ties);
        self
    }

    /// `EXCLUDE NO OTHERS`
    pub fn exclude_no_others(mut self) -> Self {
        self.exclusion = Some(FrameExclusion::NoOthers);
        self
    }

    fn start_tokens(start: FrameStart, ts: &mut TokenStream) {
        match start {
            FrameStart::UnboundedPreceding => {
                ts.keyword(Keyword::Unbounded).keyword(Keyword::Preceding);
            }
            FrameStart::Preceding(n) => {
                ts.push(Token::Literal(Literal::Int(n as i64)))
                    .keyword(Keyword::Preceding);
            }
            FrameStart::CurrentRow => {
                ts.keyword(Keyword::CurrentRow);
            }
            FrameStart::Following(n) => {
                ts.push(Token::Literal(Literal::Int(n as i64)))
                    .keyword(Keyword::Following);
            }
        }
    }

    fn end_tokens(end: FrameEnd, ts: &mut TokenStream) {
        match end {
            FrameEnd::Preceding(n) => {
                ts.push(Token::Literal(Literal::Int(n as i64)))
                    .keyword(Keyword::Preceding);
            }
            FrameEnd::CurrentRow => {
                ts.keyword(Keyword::CurrentRow);
            }
            FrameEnd::Following(n) => {
                ts.push(Token::Literal(Literal::Int(n as i64)))
                    .keyword(Keyword::Following);
            }
            FrameEnd::UnboundedFollowing => {
                ts.keyword(Keyword::Unbounded).keyword(Keyword::Following);
            }
        }
    }

    pub(crate) fn write_tokens(&self, ts: &mut TokenStream) {
        ts.keyword(match self.kind {
            FrameKind::Range => Keyword::Range,
            FrameKind::Rows => Keyword::Rows,
            FrameKind::Groups => Keyword::Groups,
        });
        match self.end {
            Some(end) => {
                ts.keyword(Keyword::Between);
                Self::start_tokens(self.start, ts);
                ts.keyword(Keyword::And);
                Self::end_tokens(end, ts);
            }
            None => Self::start_tokens(self.start, ts),
        }
        if let Some(exclusion) = self.exclusion {
            ts.keyword(Keyword::Exclude);
            ts.keyword(match exclusion {
                FrameExclusion::CurrentRow => Keyword::CurrentRow,
                FrameExclusion::Group => Keyword::Group,
                FrameExclusion::Ties => Keyword::Ties,
                FrameExclusion::NoOthers => Keyword::NoOthers,
            });
        }
    }
}

/// The body of one named window.
#[derive(Debug, Clone, PartialEq, Default)]
pub(crate) struct WindowDefNode {
    pub(crate) base: Option<String>,
    pub(crate) partition_by: Vec<ExprNode>,
    pub(crate) order_by: Vec<OrderSpecNode>,
    pub(crate) frame: Option<Frame>,
}

impl WindowDefNode {
    /// Emits the parenthesised definition body.
    pub(crate) fn write_tokens(&self, ts: &mut TokenStream) {
        ts.lparen();
        if let Some(base) = &self.base {
            ts.push(Token::ident(base.clone()));
        }
        if !self.partition_by.is_empty() {
            ts.keyword(Keyword::PartitionBy);
            ts.comma_separate(&self.partition_by, |ts, e| e.write_tokens(ts));
        }
        if !self.order_by.is_empty() {
            ts.keyword(Keyword::OrderBy);
            ts.comma_separate(&self.order_by, |ts, o| o.write_tokens(ts));
        }
        if let Some(frame) = &self.frame {
            frame.write_tokens(ts);
        }
        ts.rparen();
    }
}

/// Builder for one named window definition.
#[derive(Debug, Clone, PartialEq, Default)]
#[must_use = "window definitions have no effect until registered on a query"]
pub struct WindowDef {
    node: WindowDefNode,
}

impl WindowDef {
    /// An empty definition.
    pub fn new() -> Self {
        Self::default()
    }

    /// A definition refining an existing named window.
    pub fn based_on(name: &str) -> Self {
        WindowDef {
            node: WindowDefNode {
                base: Some(name.to_owned()),
                ..WindowDefNode::default()
            },
        }
    }

    /// `PARTITION BY exprs`
    pub fn partition_by(mut self, exprs: impl ExprList) -> Self {
        self.node.partition_by = exprs.into_nodes();
        self
    }

    /// `ORDER BY specs`
    pub fn order_by(mut self, specs: impl OrderList) -> Self {
        self.node.order_by = specs.into_specs();
        self
    }

    /// Attach a frame clause.
    pub fn frame(mut self, frame: Frame) -> Self {
        self.node.frame = Some(frame);
        self
    }

    pub(crate) fn into_node(self) -> WindowDefNode {
        self.node
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expr::field;
    use crate::types::{Int8, Text};

    fn render(def: WindowDef) -> String {
        let mut ts = TokenStream::new();
        def.into_node().write_tokens(&mut ts);
        ts.unlex()
    }

    #[test]
    fn full_definition() {
        let def = WindowDef::new()
            .partition_by(field::<Text>("t", "region"))
            .order_by(field::<Int8>("t", "amount").desc())
            .frame(Frame::rows_to_current());
        assert_eq!(
            render(def),
            "(PARTITION BY t.region ORDER BY t.amount DESC ROWS BETWEEN UNBOUNDED PRECEDING AND CURRENT ROW)"
        );
    }

    #[test]
    fn based_on_existing_window() {
        let def = WindowDef::based_on("w0").order_by(field::<Int8>("t", "x").asc());
        assert_eq!(render(def), "(w0 ORDER BY t.x ASC)");
    }

    #[test]
    fn frame_exclusions() {
        let def = WindowDef::new().frame(
            Frame::groups_between(FrameStart::Preceding(2), FrameEnd::Following(2)).exclude_ties(),
        );
        assert_eq!(
            render(def),
            "(GROUPS BETWEEN 2 PRECEDING AND 2 FOLLOWING EXCLUDE TIES)"
        );
    }

    #[test]
    fn range_start_only() {
        let def = WindowDef::new().frame(Frame::new(FrameKind::Range, FrameStart::CurrentRow));
        assert_eq!(render(def), "(RANGE CURRENT ROW)");
    }
}
