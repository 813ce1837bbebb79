use sqlparser::{
    dialect::PostgreSqlDialect,
    tokenizer::{Token, Tokenizer},
};
use sqlx::{Postgres, postgres::PgArguments, query::Query};

use crate::{error::HelperError, escape_ident, param::Param};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CommandKind {
    /// Plain SQL with `$1..$n` placeholders.
    Text,
    /// `CALL name(...)`
    Procedure,
    /// `SELECT * FROM name(...)`
    Function,
}

/// A statement plus the parameters bound to it.
///
/// The rendered statement is rebuilt whenever a parameter is added, so
/// procedure and function calls always carry one placeholder per parameter.
#[derive(Debug, Clone, PartialEq)]
#[must_use]
pub struct Command {
    kind: CommandKind,
    target: String,
    sql: String,
    params: Vec<Param>,
}

impl Command {
    pub fn text(sql: impl Into<String>) -> Self {
        let sql = sql.into();
        Self {
            kind: CommandKind::Text,
            target: sql.clone(),
            sql,
            params: vec![],
        }
    }

    pub fn procedure(name: impl Into<String>) -> Result<Self, HelperError> {
        Self::routine(CommandKind::Procedure, name.into())
    }

    pub fn function(name: impl Into<String>) -> Result<Self, HelperError> {
        Self::routine(CommandKind::Function, name.into())
    }

    fn routine(kind: CommandKind, name: String) -> Result<Self, HelperError> {
        let target = quote_qualified(&name)?;
        let mut command = Self {
            kind,
            target,
            sql: String::new(),
            params: vec![],
        };
        command.render();
        Ok(command)
    }

    pub fn bind(mut self, param: impl Into<Param>) -> Self {
        self.params.push(param.into());
        self.render();
        self
    }

    pub fn bind_all(mut self, params: impl IntoIterator<Item = Param>) -> Self {
        self.params.extend(params);
        self.render();
        self
    }

    pub fn kind(&self) -> CommandKind {
        self.kind
    }

    pub fn sql(&self) -> &str {
        &self.sql
    }

    pub fn params(&self) -> &[Param] {
        &self.params
    }

    fn render(&mut self) {
        let statement = match self.kind {
            CommandKind::Text => return,
            CommandKind::Procedure => "CALL",
            CommandKind::Function => "SELECT * FROM",
        };
        let placeholders = (1..=self.params.len())
            .map(|idx| format!("${idx}"))
            .collect::<Vec<_>>()
            .join(", ");
        self.sql = format!("{statement} {}({placeholders})", self.target);
    }

    pub(crate) fn query(&self) -> Query<'_, Postgres, PgArguments> {
        self.params
            .iter()
            .fold(sqlx::query(&self.sql), |query, param| param.bind(query))
    }
}

/// Quotes every dot separated part of `schema.name`.
pub(crate) fn quote_qualified(name: &str) -> Result<String, HelperError> {
    let parts = name.trim().split('.').map(str::trim).collect::<Vec<_>>();
    if parts.iter().any(|part| part.is_empty()) {
        return Err(HelperError::InvalidName {
            name: name.to_string(),
        });
    }
    Ok(parts
        .into_iter()
        .map(escape_ident)
        .collect::<Vec<_>>()
        .join("."))
}

/// Splits SQL text on top level `;`. Quoted text, dollar quoted bodies and
/// comments stay intact. Statements holding nothing but whitespace or
/// comments are dropped.
pub fn split_statements(sql: &str) -> Result<Vec<&str>, HelperError> {
    let dialect = PostgreSqlDialect {};
    let tokens = Tokenizer::new(&dialect, sql).tokenize_with_location()?;
    let mut separators = vec![];
    let mut has_content = vec![];
    let mut content = false;
    for token in &tokens {
        match &token.token {
            Token::SemiColon => {
                separators.push((token.span.start.line, token.span.start.column));
                has_content.push(content);
                content = false;
            }
            Token::Whitespace(_) | Token::EOF => {}
            _ => content = true,
        }
    }

    let mut statements = vec![];
    let mut start = 0;
    for (end, content) in byte_offsets(sql, &separators).into_iter().zip(has_content) {
        if content {
            statements.push(sql[start..end].trim());
        }
        start = (end + 1).min(sql.len());
    }
    if content {
        statements.push(sql[start..].trim());
    }
    Ok(statements)
}

/// Byte offsets of tokenizer locations, which count lines and characters
/// from one.
fn byte_offsets(sql: &str, locations: &[(u64, u64)]) -> Vec<usize> {
    let mut offsets = Vec::with_capacity(locations.len());
    let mut pending = locations.iter().peekable();
    let (mut line, mut column) = (1_u64, 1_u64);
    for (offset, character) in sql.char_indices() {
        while pending.next_if(|&&location| location <= (line, column)).is_some() {
            offsets.push(offset);
        }
        if character == '\n' {
            line += 1;
            column = 1;
        } else {
            column += 1;
        }
    }
    offsets.extend(pending.map(|_| sql.len()));
    offsets
}
