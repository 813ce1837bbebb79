use std::{cmp, fmt};

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use serde::{Serialize, Serializer};
use sqlx::{
    Column, Decode, Postgres, Row, Type, TypeInfo, ValueRef,
    postgres::{
        PgColumn, PgRow, PgValueFormat,
        types::{Oid, PgInterval, PgMoney},
    },
    types::{BigDecimal, Uuid},
};

use crate::{error::HelperError, param::Param};

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    #[serde(serialize_with = "as_display")]
    Numeric(BigDecimal),
    Text(String),
    Bytes(Vec<u8>),
    Json(serde_json::Value),
    Date(NaiveDate),
    Time(NaiveTime),
    Timestamp(NaiveDateTime),
    TimestampTz(DateTime<Utc>),
    #[serde(serialize_with = "as_display")]
    Uuid(Uuid),
    Array(Vec<Value>),
}

fn as_display<T: fmt::Display, S: Serializer>(value: &T, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.collect_str(value)
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub(crate) fn from_column(row: &PgRow, column: &PgColumn) -> Result<Self, HelperError> {
        let idx = column.ordinal();
        Ok(match column.type_info().name() {
            "VOID" => Value::Null,
            "BOOL" => get(row, idx, Value::Bool)?,
            "INT2" => get(row, idx, |value: i16| Value::Int(value.into()))?,
            "INT4" => get(row, idx, |value: i32| Value::Int(value.into()))?,
            "INT8" => get(row, idx, Value::Int)?,
            "FLOAT4" => get(row, idx, |value: f32| Value::Float(value.into()))?,
            "FLOAT8" => get(row, idx, Value::Float)?,
            "NUMERIC" => get(row, idx, Value::Numeric)?,
            "TEXT" | "VARCHAR" | "CHAR" | "NAME" => get(row, idx, Value::Text)?,
            // Untyped literals such as `select 'a'` come back as text.
            "UNKNOWN" => row
                .try_get_unchecked::<Option<String>, _>(idx)?
                .map_or(Value::Null, Value::Text),
            "BYTEA" => get(row, idx, Value::Bytes)?,
            "JSON" | "JSONB" => get(row, idx, Value::Json)?,
            "DATE" => get(row, idx, Value::Date)?,
            "TIME" => get(row, idx, Value::Time)?,
            "TIMESTAMP" => get(row, idx, Value::Timestamp)?,
            "TIMESTAMPTZ" => get(row, idx, Value::TimestampTz)?,
            "UUID" => get(row, idx, Value::Uuid)?,
            "OID" => get(row, idx, |value: Oid| Value::Int(value.0.into()))?,
            "MONEY" => get(row, idx, |value: PgMoney| Value::Numeric(value.to_bigdecimal(2)))?,
            "INTERVAL" => get(row, idx, |value: PgInterval| {
                Value::Text(format_interval(&value))
            })?,
            // Binary form of these is their text, the name case depends on
            // whether the driver knows the type.
            name if ["XML", "CITEXT"].iter().any(|text| name.eq_ignore_ascii_case(text)) => row
                .try_get_unchecked::<Option<String>, _>(idx)?
                .map_or(Value::Null, Value::Text),
            "BOOL[]" => get_array(row, idx, Value::Bool)?,
            "INT2[]" => get_array(row, idx, |value: i16| Value::Int(value.into()))?,
            "INT4[]" => get_array(row, idx, |value: i32| Value::Int(value.into()))?,
            "INT8[]" => get_array(row, idx, Value::Int)?,
            "FLOAT4[]" => get_array(row, idx, |value: f32| Value::Float(value.into()))?,
            "FLOAT8[]" => get_array(row, idx, Value::Float)?,
            "NUMERIC[]" => get_array(row, idx, Value::Numeric)?,
            "TEXT[]" | "VARCHAR[]" | "CHAR[]" | "NAME[]" => get_array(row, idx, Value::Text)?,
            "DATE[]" => get_array(row, idx, Value::Date)?,
            "TIMESTAMP[]" => get_array(row, idx, Value::Timestamp)?,
            "TIMESTAMPTZ[]" => get_array(row, idx, Value::TimestampTz)?,
            "UUID[]" => get_array(row, idx, Value::Uuid)?,
            _ => raw(row, idx)?,
        })
    }

    /// Integer view of the value, used by scalar helpers.
    pub fn to_i64(&self) -> Result<i64, HelperError> {
        let not_an_integer = || HelperError::NotAnInteger {
            value: self.to_string(),
        };
        match self {
            Value::Null => Ok(0),
            Value::Bool(value) => Ok(i64::from(*value)),
            Value::Int(value) => Ok(*value),
            // i64::MAX as f64 rounds up to 2^63, which is already out of range.
            Value::Float(value)
                if value.fract() == 0.0
                    && *value >= i64::MIN as f64
                    && *value < i64::MAX as f64 =>
            {
                Ok(*value as i64)
            }
            Value::Numeric(value) if value.is_integer() => value
                .with_scale(0)
                .to_string()
                .parse()
                .map_err(|_| not_an_integer()),
            Value::Text(value) => value.trim().parse().map_err(|_| not_an_integer()),
            _ => Err(not_an_integer()),
        }
    }
}

fn get<'r, T>(row: &'r PgRow, idx: usize, wrap: impl FnOnce(T) -> Value) -> Result<Value, HelperError>
where
    T: Decode<'r, Postgres> + Type<Postgres>,
{
    Ok(row
        .try_get::<Option<T>, _>(idx)?
        .map_or(Value::Null, wrap))
}

fn get_array<'r, T>(
    row: &'r PgRow,
    idx: usize,
    wrap: impl Fn(T) -> Value,
) -> Result<Value, HelperError>
where
    Vec<Option<T>>: Decode<'r, Postgres> + Type<Postgres>,
{
    get(row, idx, |items: Vec<Option<T>>| {
        Value::Array(
            items
                .into_iter()
                .map(|item| item.map_or(Value::Null, &wrap))
                .collect(),
        )
    })
}

/// Types without a decoder of their own come back as text when the server
/// sent text, and as raw bytes otherwise.
fn raw(row: &PgRow, idx: usize) -> Result<Value, HelperError> {
    let value = row.try_get_raw(idx)?;
    if value.is_null() {
        return Ok(Value::Null);
    }
    Ok(match value.format() {
        PgValueFormat::Text => Value::Text(value.as_str().map_err(sqlx::Error::Decode)?.to_string()),
        PgValueFormat::Binary => {
            Value::Bytes(value.as_bytes().map_err(sqlx::Error::Decode)?.to_vec())
        }
    })
}

/// Renders an interval in PostgreSQL's default output style. A positive
/// field following a negative one gets an explicit `+`.
fn format_interval(interval: &PgInterval) -> String {
    let mut parts = vec![];
    let mut negative_before = false;
    let fields = [
        (interval.months / 12, "year"),
        (interval.months % 12, "mon"),
        (interval.days, "day"),
    ];
    for (amount, unit) in fields {
        if amount != 0 {
            let sign = if negative_before && amount > 0 { "+" } else { "" };
            let plural = if amount == 1 { "" } else { "s" };
            parts.push(format!("{sign}{amount} {unit}{plural}"));
            negative_before = amount < 0;
        }
    }
    if interval.microseconds != 0 || parts.is_empty() {
        let sign = match interval.microseconds < 0 {
            true => "-",
            false if negative_before => "+",
            false => "",
        };
        let micros = interval.microseconds.unsigned_abs();
        let seconds = micros / 1_000_000;
        let mut time = format!(
            "{sign}{:02}:{:02}:{:02}",
            seconds / 3600,
            seconds / 60 % 60,
            seconds % 60
        );
        let fraction = micros % 1_000_000;
        if fraction != 0 {
            time.push_str(format!(".{fraction:06}").trim_end_matches('0'));
        }
        parts.push(time);
    }
    parts.join(" ")
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "NULL"),
            Value::Bool(value) => write!(f, "{value}"),
            Value::Int(value) => write!(f, "{value}"),
            Value::Float(value) => write!(f, "{value}"),
            Value::Numeric(value) => write!(f, "{value}"),
            Value::Text(value) => write!(f, "{value}"),
            Value::Bytes(value) => {
                write!(f, "\\x")?;
                for byte in value {
                    write!(f, "{byte:02x}")?;
                }
                Ok(())
            }
            Value::Json(value) => write!(f, "{value}"),
            Value::Date(value) => write!(f, "{value}"),
            Value::Time(value) => write!(f, "{value}"),
            Value::Timestamp(value) => write!(f, "{value}"),
            Value::TimestampTz(value) => write!(f, "{value}"),
            Value::Uuid(value) => write!(f, "{value}"),
            // PostgreSQL array literal, accepted back by a cast to the array type.
            Value::Array(items) => {
                write!(f, "{{")?;
                for (idx, item) in items.iter().enumerate() {
                    if idx > 0 {
                        write!(f, ",")?;
                    }
                    match item {
                        Value::Null
                        | Value::Bool(_)
                        | Value::Int(_)
                        | Value::Float(_)
                        | Value::Numeric(_) => write!(f, "{item}")?,
                        _ => write!(
                            f,
                            "\"{}\"",
                            item.to_string().replace('\\', "\\\\").replace('"', "\\\"")
                        )?,
                    }
                }
                write!(f, "}}")
            }
        }
    }
}

impl From<Value> for Param {
    /// Nulls lose their type and are bound as text, so are arrays which are
    /// sent as array literals. [`DataColumn::to_param`] keeps the column type.
    fn from(value: Value) -> Self {
        match value {
            Value::Null => Param::Text(None),
            value @ Value::Array(_) => Param::Text(Some(value.to_string())),
            Value::Bool(value) => Param::from(value),
            Value::Int(value) => Param::from(value),
            Value::Float(value) => Param::from(value),
            Value::Numeric(value) => Param::from(value),
            Value::Text(value) => Param::from(value),
            Value::Bytes(value) => Param::from(value),
            Value::Json(value) => Param::from(value),
            Value::Date(value) => Param::from(value),
            Value::Time(value) => Param::from(value),
            Value::Timestamp(value) => Param::from(value),
            Value::TimestampTz(value) => Param::from(value),
            Value::Uuid(value) => Param::from(value),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DataColumn {
    pub name: String,
    pub type_name: String,
}

impl DataColumn {
    pub fn new(name: impl Into<String>, type_name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            type_name: type_name.into(),
        }
    }

    /// Parameter for a value of this column. Nulls take the column type.
    pub fn to_param(&self, value: &Value) -> Param {
        match value {
            Value::Null => Param::null_of(&self.type_name),
            value => Param::from(value.clone()),
        }
    }

    pub(crate) fn describe<'a>(columns: impl IntoIterator<Item = &'a PgColumn>) -> Vec<Self> {
        columns
            .into_iter()
            .map(|column| DataColumn::new(column.name(), column.type_info().name()))
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct DataRow {
    pub values: Vec<Value>,
}

impl DataRow {
    pub fn get(&self, idx: usize) -> Option<&Value> {
        self.values.get(idx)
    }
}

impl TryFrom<&PgRow> for DataRow {
    type Error = HelperError;

    fn try_from(row: &PgRow) -> Result<Self, Self::Error> {
        let mut values = Vec::with_capacity(row.len());
        for column in row.columns() {
            values.push(Value::from_column(row, column)?);
        }
        Ok(DataRow { values })
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct DataTable {
    pub columns: Vec<DataColumn>,
    pub rows: Vec<DataRow>,
}

/// One table per result producing statement.
pub type DataSet = Vec<DataTable>;

impl DataTable {
    pub fn new(columns: Vec<DataColumn>) -> Self {
        Self {
            columns,
            rows: vec![],
        }
    }

    pub fn push(&mut self, row: DataRow) -> Result<(), HelperError> {
        if row.values.len() != self.columns.len() {
            return Err(HelperError::ColumnMismatch {
                expected: self.columns.len(),
                found: row.values.len(),
            });
        }
        self.rows.push(row);
        Ok(())
    }

    pub(crate) fn from_rows(rows: &[PgRow]) -> Result<Self, HelperError> {
        let mut table = DataTable::new(
            rows.first()
                .map(|row| DataColumn::describe(row.columns()))
                .unwrap_or_default(),
        );
        for row in rows {
            table.rows.push(DataRow::try_from(row)?);
        }
        Ok(table)
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|column| column.name == name)
    }

    pub fn value(&self, row: usize, column: &str) -> Option<&Value> {
        let idx = self.column_index(column)?;
        self.rows.get(row)?.get(idx)
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

impl fmt::Display for DataTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let headers = self
            .columns
            .iter()
            .map(|column| column.name.clone())
            .collect::<Vec<_>>();
        let cells = self
            .rows
            .iter()
            .map(|row| row.values.iter().map(Value::to_string).collect::<Vec<_>>())
            .collect::<Vec<_>>();
        let mut lengths = headers
            .iter()
            .map(|header| header.chars().count())
            .collect::<Vec<_>>();
        for row in &cells {
            for (length, cell) in lengths.iter_mut().zip(row) {
                *length = cmp::max(*length, cell.chars().count());
            }
        }
        let pad = |items: &[String]| {
            items
                .iter()
                .zip(&lengths)
                .map(|(item, len)| format!("{item}{}", " ".repeat(len - item.chars().count())))
                .collect::<Vec<_>>()
                .join("  |  ")
                .trim_end()
                .to_string()
        };
        writeln!(f, "{}", pad(&headers))?;
        writeln!(
            f,
            "{}",
            lengths
                .iter()
                .map(|len| "-".repeat(*len))
                .collect::<Vec<_>>()
                .join("--+--")
        )?;
        for row in &cells {
            writeln!(f, "{}", pad(row))?;
        }
        let count = self.rows.len();
        write!(f, "({count} {})", if count == 1 { "row" } else { "rows" })
    }
}
