//! SQL type descriptors.
//!
//! Types exist twice here: as zero-sized *markers* implementing [`SqlType`]
//! that tag expressions at compile time, and as [`Value`]s that carry host
//! data into the positional parameter vector. A marker knows its printed
//! type name (for `CAST`), its nullable projection and the host type a
//! parameter of that SQL type binds.

use std::marker::PhantomData;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::{QueryError, QueryResult};
use crate::token::{Special, Token, TokenStream};

/// Marker trait for SQL types.
pub trait SqlType: 'static {
    /// The nullable projection of this type. Idempotent:
    /// `Nullable<T>::Null` is `Nullable<T>` again.
    type Null: SqlType;

    /// Host type bound for a parameter of this SQL type.
    type Host: IntoValue;

    /// Emit the printed type name, e.g. for `CAST(x AS name)`.
    fn type_tokens(ts: &mut TokenStream);
}

macro_rules! markers {
    ($($(#[$meta:meta])* $name:ident => $sql:literal, $host:ty;)+) => {
        $(
            $(#[$meta])*
            #[derive(Debug, Clone, Copy, PartialEq, Eq)]
            pub struct $name;

            impl SqlType for $name {
                type Null = Nullable<$name>;
                type Host = $host;

                fn type_tokens(ts: &mut TokenStream) {
                    ts.push(Token::ident($sql));
                }
            }
        )+
    };
}

markers! {
    /// `boolean`
    Bool => "boolean", bool;
    /// `int2` / `smallint`
    Int2 => "int2", i16;
    /// `int4` / `integer`
    Int4 => "int4", i32;
    /// `int8` / `bigint`
    Int8 => "int8", i64;
    /// `float4` / `real`
    Float4 => "float4", f32;
    /// `float8` / `double precision`
    Float8 => "float8", f64;
    /// `numeric`, bound as its canonical text form
    Numeric => "numeric", String;
    /// `text`
    Text => "text", String;
    /// `uuid`
    Uuid => "uuid", UuidValue;
    /// `bytea`
    Bytea => "bytea", Bytes;
    /// `date`, bound as `YYYY-MM-DD` text
    Date => "date", String;
    /// `time`
    Time => "time", String;
    /// `timestamp`
    Timestamp => "timestamp", String;
    /// `timestamptz`
    Timestamptz => "timestamptz", String;
    /// `json`
    Json => "json", String;
    /// `jsonb`
    Jsonb => "jsonb", String;
}

/// Escape hatch for expressions whose SQL type is not tracked statically.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Dynamic;

impl SqlType for Dynamic {
    type Null = Dynamic;
    type Host = Value;

    fn type_tokens(ts: &mut TokenStream) {
        ts.push(Token::ident("unknown"));
    }
}

/// The nullable derivation of `T`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Nullable<T: SqlType>(PhantomData<fn() -> T>);

impl<T: SqlType> SqlType for Nullable<T> {
    type Null = Nullable<T>;
    type Host = Option<T::Host>;

    fn type_tokens(ts: &mut TokenStream) {
        T::type_tokens(ts);
    }
}

/// The array derivation of `T`, printed `T[]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Array<T: SqlType>(PhantomData<fn() -> T>);

impl<T: SqlType> SqlType for Array<T> {
    type Null = Nullable<Array<T>>;
    type Host = Vec<T::Host>;

    fn type_tokens(ts: &mut TokenStream) {
        T::type_tokens(ts);
        ts.special(Special::LBracket).special(Special::RBracket);
    }
}

/// Element types with a built-in range and multirange in PostgreSQL.
pub trait RangeElement: SqlType {
    fn range_name() -> &'static str;
    fn multirange_name() -> &'static str;
}

macro_rules! range_elements {
    ($($elem:ident => $range:literal, $multi:literal;)+) => {
        $(
            impl RangeElement for $elem {
                fn range_name() -> &'static str {
                    $range
                }
                fn multirange_name() -> &'static str {
                    $multi
                }
            }
        )+
    };
}

range_elements! {
    Int4 => "int4range", "int4multirange";
    Int8 => "int8range", "int8multirange";
    Numeric => "numrange", "nummultirange";
    Timestamp => "tsrange", "tsmultirange";
    Timestamptz => "tstzrange", "tstzmultirange";
    Date => "daterange", "datemultirange";
}

/// The range derivation over `T`, bound as its text form.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Range<T: RangeElement>(PhantomData<fn() -> T>);

impl<T: RangeElement> SqlType for Range<T> {
    type Null = Nullable<Range<T>>;
    type Host = String;

    fn type_tokens(ts: &mut TokenStream) {
        ts.push(Token::ident(T::range_name()));
    }
}

/// The multirange derivation over `T`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Multirange<T: RangeElement>(PhantomData<fn() -> T>);

impl<T: RangeElement> SqlType for Multirange<T> {
    type Null = Nullable<Multirange<T>>;
    type Host = String;

    fn type_tokens(ts: &mut TokenStream) {
        ts.push(Token::ident(T::multirange_name()));
    }
}

// =============================================================================
// Capability traits
// =============================================================================

/// Types with a SQL ordering; gates `<`, `<=`, `>`, `>=`.
pub trait SqlOrd: SqlType {}

/// Numeric types; gates arithmetic.
pub trait SqlNum: SqlOrd {}

/// Text-like types; gates `LIKE` / `ILIKE` and collation-sensitive ops.
pub trait SqlText: SqlType {}

macro_rules! caps {
    ($trait:ident: $($ty:ty),+ $(,)?) => {
        $(impl $trait for $ty {})+
    };
}

caps!(SqlOrd: Int2, Int4, Int8, Float4, Float8, Numeric, Text, Date, Time, Timestamp, Timestamptz, Uuid);
caps!(SqlNum: Int2, Int4, Int8, Float4, Float8, Numeric);
caps!(SqlText: Text);

impl<T: SqlOrd> SqlOrd for Nullable<T> {}
impl<T: SqlNum> SqlNum for Nullable<T> {}
impl<T: SqlText> SqlText for Nullable<T> {}

// =============================================================================
// Nullability transform
// =============================================================================

/// Type-level switch applied to every column of a table handle. The outer
/// side of an outer join flips from [`Same`] to [`Nulled`], turning each
/// column type into its nullable projection.
pub trait Nullability: 'static {
    type Apply<T: SqlType>: SqlType;
}

/// Identity: columns keep their declared types.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Same;

impl Nullability for Same {
    type Apply<T: SqlType> = T;
}

/// Nullable: every column type becomes `T::Null`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Nulled;

impl Nullability for Nulled {
    type Apply<T: SqlType> = T::Null;
}

// =============================================================================
// Host values
// =============================================================================

/// A host value destined for the positional parameter vector.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    Uuid(UuidValue),
    Bytes(Vec<u8>),
    Array(Vec<Value>),
}

/// Conversion into [`Value`]. A local trait so that container impls
/// (`Option`, `Vec`) stay coherent.
pub trait IntoValue {
    fn into_value(self) -> Value;
}

impl IntoValue for Value {
    fn into_value(self) -> Value {
        self
    }
}

impl IntoValue for bool {
    fn into_value(self) -> Value {
        Value::Bool(self)
    }
}

impl IntoValue for i16 {
    fn into_value(self) -> Value {
        Value::Int(self as i64)
    }
}

impl IntoValue for i32 {
    fn into_value(self) -> Value {
        Value::Int(self as i64)
    }
}

impl IntoValue for i64 {
    fn into_value(self) -> Value {
        Value::Int(self)
    }
}

impl IntoValue for f32 {
    fn into_value(self) -> Value {
        Value::Float(self as f64)
    }
}

impl IntoValue for f64 {
    fn into_value(self) -> Value {
        Value::Float(self)
    }
}

impl IntoValue for String {
    fn into_value(self) -> Value {
        Value::Text(self)
    }
}

impl IntoValue for UuidValue {
    fn into_value(self) -> Value {
        Value::Uuid(self)
    }
}

impl IntoValue for Bytes {
    fn into_value(self) -> Value {
        Value::Bytes(self.0)
    }
}

impl<H: IntoValue> IntoValue for Option<H> {
    fn into_value(self) -> Value {
        match self {
            Some(v) => v.into_value(),
            None => Value::Null,
        }
    }
}

impl<H: IntoValue> IntoValue for Vec<H> {
    fn into_value(self) -> Value {
        Value::Array(self.into_iter().map(IntoValue::into_value).collect())
    }
}

/// Binary parameter payload. A newtype rather than a bare `Vec<u8>` so the
/// element-wise `Vec` conversion above stays unambiguous.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bytes(pub Vec<u8>);

/// Declare a marker for a named enum (or other user-defined) SQL type.
///
/// ```
/// use sequin::sql_enum;
///
/// sql_enum! {
///     pub struct Mood as "mood";
/// }
/// ```
///
/// The marker participates in casts and parameter binding like the built-in
/// markers; values bind as their text labels.
#[macro_export]
macro_rules! sql_enum {
    (
        $(#[$meta:meta])*
        $vis:vis struct $name:ident as $sql:literal;
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq)]
        $vis struct $name;

        impl $crate::types::SqlType for $name {
            type Null = $crate::types::Nullable<$name>;
            type Host = ::std::string::String;

            fn type_tokens(ts: &mut $crate::token::TokenStream) {
                ts.push($crate::token::Token::ident($sql));
            }
        }
    };
}

static UUID_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[0-9a-fA-F]{8}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{12}$")
        .expect("uuid pattern")
});

/// A validated UUID in its canonical hex form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UuidValue(String);

impl UuidValue {
    /// Parse the canonical `8-4-4-4-12` hex form. Fails with
    /// [`QueryError::InvalidUuid`] on anything else.
    pub fn parse(value: &str) -> QueryResult<UuidValue> {
        if UUID_PATTERN.is_match(value) {
            Ok(UuidValue(value.to_ascii_lowercase()))
        } else {
            Err(QueryError::InvalidUuid {
                value: value.to_owned(),
            })
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::token::Serializable;

    struct TypeName<T: SqlType>(PhantomData<T>);

    impl<T: SqlType> Serializable for TypeName<T> {
        fn to_tokens(&self) -> TokenStream {
            let mut ts = TokenStream::new();
            T::type_tokens(&mut ts);
            ts
        }
    }

    fn name_of<T: SqlType>() -> String {
        TypeName::<T>(PhantomData).to_sql()
    }

    #[test]
    fn printed_type_names() {
        assert_eq!(name_of::<Bool>(), "boolean");
        assert_eq!(name_of::<Int8>(), "int8");
        assert_eq!(name_of::<Nullable<Text>>(), "text");
        // Only `(` hugs a preceding identifier, so array bounds keep their
        // space; PostgreSQL accepts the form either way.
        assert_eq!(name_of::<Array<Int4>>(), "int4 []");
        assert_eq!(name_of::<Range<Int8>>(), "int8range");
        assert_eq!(name_of::<Multirange<Date>>(), "datemultirange");
    }

    #[test]
    fn declared_enum_marker() {
        sql_enum! {
            struct Mood as "mood";
        }
        assert_eq!(name_of::<Mood>(), "mood");
        assert_eq!(name_of::<Nullable<Mood>>(), "mood");
    }

    #[test]
    fn uuid_accepts_canonical_hex() {
        let u = UuidValue::parse("550E8400-E29B-41D4-A716-446655440000").unwrap();
        assert_eq!(u.as_str(), "550e8400-e29b-41d4-a716-446655440000");
    }

    #[test]
    fn uuid_rejects_malformed_input() {
        for bad in ["", "not-a-uuid", "550e8400e29b41d4a716446655440000", "550e8400-e29b-41d4-a716-44665544000g"] {
            assert_eq!(
                UuidValue::parse(bad),
                Err(QueryError::InvalidUuid { value: bad.into() })
            );
        }
    }

    #[test]
    fn option_and_vec_hosts_convert() {
        assert_eq!(None::<i64>.into_value(), Value::Null);
        assert_eq!(Some(7i64).into_value(), Value::Int(7));
        assert_eq!(
            vec![1i32, 2].into_value(),
            Value::Array(vec![Value::Int(1), Value::Int(2)])
        );
        assert_eq!(Bytes(vec![1, 2]).into_value(), Value::Bytes(vec![1, 2]));
    }
}
