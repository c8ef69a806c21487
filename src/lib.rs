//! # Sequin
//!
//! A statically-typed SELECT builder for PostgreSQL. Queries are plain
//! immutable values; serialising one walks the AST into a token stream and
//! renders it to SQL text with `$1..$n` placeholders that line up with the
//! positional vector produced by the matching parameter packer.
//!
//! Column types and nullability travel through joins and projections as
//! phantom types: the outer side of an outer join shows up nullable inside
//! the `ON` callback, clause order is enforced by the builder's stage
//! markers, and locks stop being available the moment a query is combined
//! with `UNION`/`INTERSECT`/`EXCEPT`.
//!
//! ## Quick start
//!
//! ```
//! use sequin::prelude::*;
//! use sequin::{params, table};
//!
//! table! {
//!     pub struct Posts as "posts" {
//!         id: Int8,
//!         name: Text,
//!         deleted: Bool,
//!     }
//! }
//!
//! table! {
//!     pub struct UserPost as "user_post" {
//!         post_id: Int8,
//!         user_id: Int8,
//!     }
//! }
//!
//! params! {
//!     pub struct ByUser => ByUserValues {
//!         user_id: Int8,
//!     }
//! }
//!
//! let params = ByUser::new();
//! let query = Posts::table()
//!     .as_("s")
//!     .inner_join(UserPost::table().as_("up"), |(s, up)| s.id.eq(&up.post_id))
//!     .select(|(s, _)| (s.id.as_("id"), s.name.as_("name")))
//!     .filter(|(s, up)| not(&s.deleted).and(up.user_id.eq(&params.user_id)));
//!
//! assert_eq!(
//!     query.to_sql(),
//!     "SELECT s.id AS id, s.name AS name \
//!      FROM (posts AS s INNER JOIN user_post AS up ON (s.id = up.post_id)) \
//!      WHERE ((not s.deleted) AND (up.user_id = $1))"
//! );
//! assert_eq!(ByUser::pack(ByUserValues { user_id: 42 }), vec![Value::Int(42)]);
//! ```
//!
//! ## Architecture
//!
//! Two-stage rendering keeps lexical concerns in one place:
//!
//! ```text
//! builders ──▶ AST (ExprNode / QueryState) ──▶ TokenStream ──▶ unlex() ──▶ SQL
//! ```
//!
//! Everything below the builder surface is type-erased; everything above it
//! is phantom-typed. The crate performs no I/O and keeps no global state:
//! serialisation is a pure function, repeatable and byte-identical.

pub mod aggregate;
pub mod error;
pub mod expr;
pub mod from;
pub mod grouping;
pub mod keyword;
pub mod params;
pub mod query;
pub mod quote;
pub mod token;
pub mod types;
pub mod window;

pub use error::{QueryError, QueryResult};
pub use expr::{Expr, ExprNode};
pub use query::{QueryState, SelectQuery};
pub use quote::Operator;
pub use token::{Serializable, Token, TokenStream};
pub use types::Value;

/// Re-exports for convenient usage.
pub mod prelude {
    pub use crate::aggregate::{
        agg, array_agg, avg, bool_and, bool_or, count, count_star, dense_rank, json_array_agg,
        json_object_agg, max, min, mode, ordered_set, percentile_cont, percentile_disc, rank,
        row_number, string_agg, sum, window_call, window_call_star,
    };
    pub use crate::error::{QueryError, QueryResult};
    pub use crate::expr::{
        array, exists, field, func, lit, not, not_exists, null, row, uuid, AnyExpr, Expr,
        ExprList, IntoExpr, IntoOrderSpec, OrderSpec,
    };
    pub use crate::from::{from_function, FromClause, Source, SourceExt};
    pub use crate::grouping::{composite, cube, grouping_list, rollup, GroupingTree};
    pub use crate::query::{Lock, LockStrength, SelectQuery};
    pub use crate::quote::Operator;
    pub use crate::token::Serializable;
    pub use crate::types::{
        Bool, Bytea, Date, Dynamic, Float4, Float8, Int2, Int4, Int8, Json, Jsonb, Multirange,
        Nullable, Numeric, Range, Text, Time, Timestamp, Timestamptz, Uuid, UuidValue, Value,
    };
    pub use crate::window::{Frame, FrameEnd, FrameKind, FrameStart, WindowDef};
}
