use std::{error::Error, fmt};

use sqlparser::tokenizer::TokenizerError;

#[derive(Debug)]
pub enum HelperError {
    Database(sqlx::Error),
    Tokenize(TokenizerError),
    InvalidName { name: String },
    UnsupportedType { type_name: String },
    NotAnInteger { value: String },
    ColumnMismatch { expected: usize, found: usize },
}

impl fmt::Display for HelperError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HelperError::Database(error) => write!(f, "Database error: {error}"),
            HelperError::Tokenize(error) => write!(f, "Could not split statements: {error}"),
            HelperError::InvalidName { name } => {
                write!(f, "Invalid procedure or function name \"{name}\"")
            }
            HelperError::UnsupportedType { type_name } => {
                write!(f, "Unsupported SQL type {type_name}")
            }
            HelperError::NotAnInteger { value } => {
                write!(f, "Scalar {value} cannot be read as an integer")
            }
            HelperError::ColumnMismatch { expected, found } => {
                write!(f, "Row has {found} values but the table has {expected} columns")
            }
        }
    }
}

impl Error for HelperError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            HelperError::Database(error) => Some(error),
            HelperError::Tokenize(error) => Some(error),
            _ => None,
        }
    }
}

impl From<sqlx::Error> for HelperError {
    fn from(error: sqlx::Error) -> Self {
        HelperError::Database(error)
    }
}

impl From<TokenizerError> for HelperError {
    fn from(error: TokenizerError) -> Self {
        HelperError::Tokenize(error)
    }
}
