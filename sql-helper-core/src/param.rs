use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use sqlx::{
    Postgres,
    postgres::PgArguments,
    query::Query,
    query_builder::Separated,
    types::{BigDecimal, Uuid},
};

/// A value bound to a `$n` placeholder.
///
/// Every variant is nullable so a null still tells PostgreSQL which type the
/// placeholder has.
#[derive(Debug, Clone, PartialEq)]
pub enum Param {
    Bool(Option<bool>),
    Int2(Option<i16>),
    Int4(Option<i32>),
    Int8(Option<i64>),
    Float4(Option<f32>),
    Float8(Option<f64>),
    Numeric(Option<BigDecimal>),
    Text(Option<String>),
    Bytes(Option<Vec<u8>>),
    Json(Option<serde_json::Value>),
    Date(Option<NaiveDate>),
    Time(Option<NaiveTime>),
    Timestamp(Option<NaiveDateTime>),
    TimestampTz(Option<DateTime<Utc>>),
    Uuid(Option<Uuid>),
}

impl Param {
    pub fn is_null(&self) -> bool {
        match self {
            Param::Bool(value) => value.is_none(),
            Param::Int2(value) => value.is_none(),
            Param::Int4(value) => value.is_none(),
            Param::Int8(value) => value.is_none(),
            Param::Float4(value) => value.is_none(),
            Param::Float8(value) => value.is_none(),
            Param::Numeric(value) => value.is_none(),
            Param::Text(value) => value.is_none(),
            Param::Bytes(value) => value.is_none(),
            Param::Json(value) => value.is_none(),
            Param::Date(value) => value.is_none(),
            Param::Time(value) => value.is_none(),
            Param::Timestamp(value) => value.is_none(),
            Param::TimestampTz(value) => value.is_none(),
            Param::Uuid(value) => value.is_none(),
        }
    }

    /// PostgreSQL name of the placeholder type.
    pub fn type_name(&self) -> &'static str {
        match self {
            Param::Bool(_) => "BOOL",
            Param::Int2(_) => "INT2",
            Param::Int4(_) => "INT4",
            Param::Int8(_) => "INT8",
            Param::Float4(_) => "FLOAT4",
            Param::Float8(_) => "FLOAT8",
            Param::Numeric(_) => "NUMERIC",
            Param::Text(_) => "TEXT",
            Param::Bytes(_) => "BYTEA",
            Param::Json(_) => "JSONB",
            Param::Date(_) => "DATE",
            Param::Time(_) => "TIME",
            Param::Timestamp(_) => "TIMESTAMP",
            Param::TimestampTz(_) => "TIMESTAMPTZ",
            Param::Uuid(_) => "UUID",
        }
    }

    /// A null of the named PostgreSQL type. Types without a variant of
    /// their own give a text null.
    pub fn null_of(type_name: &str) -> Param {
        match type_name {
            "BOOL" => Param::Bool(None),
            "INT2" => Param::Int2(None),
            "INT4" => Param::Int4(None),
            "INT8" => Param::Int8(None),
            "FLOAT4" => Param::Float4(None),
            "FLOAT8" => Param::Float8(None),
            "NUMERIC" => Param::Numeric(None),
            "BYTEA" => Param::Bytes(None),
            "JSON" | "JSONB" => Param::Json(None),
            "DATE" => Param::Date(None),
            "TIME" => Param::Time(None),
            "TIMESTAMP" => Param::Timestamp(None),
            "TIMESTAMPTZ" => Param::TimestampTz(None),
            "UUID" => Param::Uuid(None),
            _ => Param::Text(None),
        }
    }

    pub(crate) fn bind<'q>(
        &'q self,
        query: Query<'q, Postgres, PgArguments>,
    ) -> Query<'q, Postgres, PgArguments> {
        match self {
            Param::Bool(value) => query.bind(*value),
            Param::Int2(value) => query.bind(*value),
            Param::Int4(value) => query.bind(*value),
            Param::Int8(value) => query.bind(*value),
            Param::Float4(value) => query.bind(*value),
            Param::Float8(value) => query.bind(*value),
            Param::Numeric(value) => query.bind(value.as_ref()),
            Param::Text(value) => query.bind(value.as_deref()),
            Param::Bytes(value) => query.bind(value.as_deref()),
            Param::Json(value) => query.bind(value.as_ref()),
            Param::Date(value) => query.bind(*value),
            Param::Time(value) => query.bind(*value),
            Param::Timestamp(value) => query.bind(*value),
            Param::TimestampTz(value) => query.bind(*value),
            Param::Uuid(value) => query.bind(*value),
        }
    }

    pub(crate) fn push_bind<'args>(
        self,
        separated: &mut Separated<'_, 'args, Postgres, &'static str>,
    ) {
        match self {
            Param::Bool(value) => separated.push_bind(value),
            Param::Int2(value) => separated.push_bind(value),
            Param::Int4(value) => separated.push_bind(value),
            Param::Int8(value) => separated.push_bind(value),
            Param::Float4(value) => separated.push_bind(value),
            Param::Float8(value) => separated.push_bind(value),
            Param::Numeric(value) => separated.push_bind(value),
            Param::Text(value) => separated.push_bind(value),
            Param::Bytes(value) => separated.push_bind(value),
            Param::Json(value) => separated.push_bind(value),
            Param::Date(value) => separated.push_bind(value),
            Param::Time(value) => separated.push_bind(value),
            Param::Timestamp(value) => separated.push_bind(value),
            Param::TimestampTz(value) => separated.push_bind(value),
            Param::Uuid(value) => separated.push_bind(value),
        };
    }
}

macro_rules! impl_from {
    ($($variant:ident => $ty:ty),* $(,)?) => {
        $(
            impl From<$ty> for Param {
                fn from(value: $ty) -> Self {
                    Param::$variant(Some(value.into()))
                }
            }

            impl From<Option<$ty>> for Param {
                fn from(value: Option<$ty>) -> Self {
                    Param::$variant(value.map(Into::into))
                }
            }
        )*
    };
}

impl_from! {
    Bool => bool,
    Int2 => i16,
    Int4 => i32,
    Int8 => i64,
    Float4 => f32,
    Float8 => f64,
    Numeric => BigDecimal,
    Text => String,
    Text => &str,
    Bytes => Vec<u8>,
    Bytes => &[u8],
    Json => serde_json::Value,
    Date => NaiveDate,
    Time => NaiveTime,
    Timestamp => NaiveDateTime,
    TimestampTz => DateTime<Utc>,
    Uuid => Uuid,
}

#[cfg(test)]
mod tests {
    use crate::param::Param;

    #[test]
    fn conversions_keep_type_for_nulls() {
        assert_eq!(Param::from(5_i32), Param::Int4(Some(5)));
        assert_eq!(Param::from(None::<i32>), Param::Int4(None));
        assert_eq!(Param::from("abc"), Param::Text(Some("abc".into())));
        assert_eq!(Param::from(None::<&str>), Param::Text(None));
        assert_eq!(Param::from(&b"ab"[..]), Param::Bytes(Some(vec![b'a', b'b'])));
        assert!(Param::from(None::<i64>).is_null());
        assert!(!Param::from(false).is_null());
    }

    #[test]
    fn typed_nulls_from_type_names() {
        for type_name in ["BOOL", "INT2", "INT4", "INT8", "NUMERIC", "DATE", "UUID", "JSONB"] {
            let param = Param::null_of(type_name);
            assert!(param.is_null());
            assert_eq!(param.type_name(), type_name);
        }
        assert_eq!(Param::null_of("VARCHAR"), Param::Text(None));
        assert_eq!(Param::null_of("INT4[]"), Param::Text(None));
    }

    #[test]
    fn type_names() {
        assert_eq!(Param::from(1_i16).type_name(), "INT2");
        assert_eq!(Param::from(None::<String>).type_name(), "TEXT");
        assert_eq!(Param::Json(None).type_name(), "JSONB");
    }
}
