//! Positional parameter binding.
//!
//! [`params!`] declares a parameter set once and yields two things that
//! share the declaration order: a handle struct with one typed expression
//! per parameter (serialising to `$1`, `$2`, ... in declaration order) and a
//! `pack` function turning a record of host values into the positional
//! vector a prepared-statement driver binds. Because both sides are
//! generated from the same field list, the placeholder indices and the
//! packed vector can never drift apart, and the values struct makes
//! omitting a field a compile error.
//!
//! ```
//! use sequin::params;
//! use sequin::token::Serializable;
//! use sequin::types::{Int8, Text, Value};
//!
//! params! {
//!     pub struct FilterParams => FilterValues {
//!         user_id: Int8,
//!         name_like: Text,
//!     }
//! }
//!
//! let p = FilterParams::new();
//! assert_eq!(p.user_id.to_sql(), "$1");
//! assert_eq!(
//!     FilterParams::pack(FilterValues { user_id: 7, name_like: "a%".into() }),
//!     vec![Value::Int(7), Value::Text("a%".into())],
//! );
//! ```
//!
//! For parameter sets whose shape is only known at runtime, construct
//! placeholders directly with [`Expr::parameter`](crate::expr::Expr::parameter)
//! and keep the value vector in the same order yourself.

/// Declare a typed parameter set and its values record.
///
/// The first struct receives one `Expr<T>` field per declared parameter;
/// the second receives the matching host-typed fields and drives `pack`.
#[macro_export]
macro_rules! params {
    (
        $(#[$meta:meta])*
        $vis:vis struct $name:ident => $values:ident {
            $($field:ident : $ty:ty),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        $vis struct $name {
            $(pub $field: $crate::expr::Expr<$ty>,)+
        }

        /// Host values for the matching parameter set, packed in
        /// declaration order.
        $vis struct $values {
            $(pub $field: <$ty as $crate::types::SqlType>::Host,)+
        }

        impl $name {
            /// Number of declared parameters.
            $vis const LEN: usize = [$(stringify!($field)),+].len();

            /// Parameter handles; placeholders are numbered `$1..$n` in
            /// declaration order.
            $vis fn new() -> Self {
                let mut index = 0usize;
                Self {
                    $($field: {
                        index += 1;
                        $crate::expr::Expr::parameter(index)
                    },)+
                }
            }

            /// Pack host values into the positional vector, in declaration
            /// order.
            $vis fn pack(values: $values) -> ::std::vec::Vec<$crate::types::Value> {
                ::std::vec![
                    $($crate::types::IntoValue::into_value(values.$field)),+
                ]
            }
        }

        impl ::std::default::Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }
    };
}

#[cfg(test)]
mod tests {
    use crate::token::Serializable;
    use crate::types::{Bool, Int8, Nullable, Text, Value};

    params! {
        struct SearchParams => SearchValues {
            user_id: Int8,
            name_like: Text,
            active: Bool,
            score: Nullable<Int8>,
        }
    }

    #[test]
    fn placeholders_follow_declaration_order() {
        let p = SearchParams::new();
        assert_eq!(p.user_id.to_sql(), "$1");
        assert_eq!(p.name_like.to_sql(), "$2");
        assert_eq!(p.active.to_sql(), "$3");
        assert_eq!(p.score.to_sql(), "$4");
        assert_eq!(SearchParams::LEN, 4);
    }

    #[test]
    fn packer_aligns_with_placeholders() {
        let packed = SearchParams::pack(SearchValues {
            user_id: 7,
            name_like: "a%".into(),
            active: true,
            score: None,
        });
        assert_eq!(
            packed,
            vec![
                Value::Int(7),
                Value::Text("a%".into()),
                Value::Bool(true),
                Value::Null,
            ]
        );
    }

    #[test]
    fn packing_is_repeatable() {
        let pack = || {
            SearchParams::pack(SearchValues {
                user_id: 1,
                name_like: "x".into(),
                active: false,
                score: Some(9),
            })
        };
        assert_eq!(pack(), pack());
        assert_eq!(pack().len(), SearchParams::LEN);
    }
}
