use std::{error::Error, fmt::Display, str::FromStr};

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use regex::Regex;
use sql_helper_core::Param;
use sqlx::types::{BigDecimal, Uuid};

#[derive(Debug, Clone)]
pub enum ParamError {
    InvalidValue { sql_type: String, value: String },
}

impl Display for ParamError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ParamError::InvalidValue { sql_type, value } => {
                write!(f, "\"{value}\" is not a valid {sql_type} parameter")
            }
        }
    }
}

impl Error for ParamError {}

fn parse<T: FromStr>(sql_type: &str, value: &str) -> Result<T, ParamError> {
    value.parse().map_err(|_| ParamError::InvalidValue {
        sql_type: sql_type.to_string(),
        value: value.to_string(),
    })
}

fn parse_hex(value: &str) -> Result<Vec<u8>, ParamError> {
    let invalid = || ParamError::InvalidValue {
        sql_type: "bytea".into(),
        value: value.to_string(),
    };
    let digits = value.strip_prefix("\\x").unwrap_or(value);
    if digits.len() % 2 != 0 || !digits.is_ascii() {
        return Err(invalid());
    }
    (0..digits.len())
        .step_by(2)
        .map(|idx| u8::from_str_radix(&digits[idx..idx + 2], 16).map_err(|_| invalid()))
        .collect()
}

/// Parses a command line parameter written as `type:value`.
///
/// `null` as the value binds a typed null, `\null` binds the literal text
/// `null`. Arguments without a known type prefix are bound as text,
/// including their prefix.
pub fn parse_param(argument: &str) -> Result<Param, Box<dyn Error>> {
    let pattern = Regex::new(r"(?s)^([a-z][a-z0-9]*):(.*)$")?;
    let Some(captures) = pattern.captures(argument) else {
        return Ok(Param::from(argument));
    };
    let (Some(sql_type), Some(value)) = (captures.get(1), captures.get(2)) else {
        return Ok(Param::from(argument));
    };
    let (sql_type, value) = (sql_type.as_str(), value.as_str());
    let value = match value {
        "null" => None,
        r"\null" => Some("null"),
        value => Some(value),
    };

    Ok(match sql_type {
        "bool" | "boolean" => Param::Bool(value.map(|v| parse(sql_type, v)).transpose()?),
        "int2" | "smallint" => Param::Int2(value.map(|v| parse(sql_type, v)).transpose()?),
        "int4" | "int" | "integer" => Param::Int4(value.map(|v| parse(sql_type, v)).transpose()?),
        "int8" | "bigint" => Param::Int8(value.map(|v| parse(sql_type, v)).transpose()?),
        "float4" | "real" => Param::Float4(value.map(|v| parse(sql_type, v)).transpose()?),
        "float8" | "float" | "double" => {
            Param::Float8(value.map(|v| parse(sql_type, v)).transpose()?)
        }
        "numeric" | "decimal" => {
            Param::Numeric(value.map(|v| parse::<BigDecimal>(sql_type, v)).transpose()?)
        }
        "text" | "varchar" => Param::Text(value.map(str::to_string)),
        "bytea" => Param::Bytes(value.map(parse_hex).transpose()?),
        "json" | "jsonb" => Param::Json(
            value
                .map(serde_json::from_str::<serde_json::Value>)
                .transpose()?,
        ),
        "date" => Param::Date(value.map(|v| parse::<NaiveDate>(sql_type, v)).transpose()?),
        "time" => Param::Time(value.map(|v| parse::<NaiveTime>(sql_type, v)).transpose()?),
        "timestamp" => {
            Param::Timestamp(value.map(|v| parse::<NaiveDateTime>(sql_type, v)).transpose()?)
        }
        "timestamptz" => Param::TimestampTz(
            value
                .map(|v| parse::<DateTime<Utc>>(sql_type, v))
                .transpose()?,
        ),
        "uuid" => Param::Uuid(value.map(|v| parse::<Uuid>(sql_type, v)).transpose()?),
        _ => Param::from(argument),
    })
}

/// Treats `statement` as a path when such a file exists.
pub fn read_statement(statement: String) -> Result<String, Box<dyn Error>> {
    Ok(match std::fs::exists(&statement)? {
        true => std::fs::read_to_string(statement)?,
        false => statement,
    })
}
