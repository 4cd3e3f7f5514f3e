//! # INSERT Statement Parser
//!
//! The only instruction form the ledger understands:
//!
//! ```text
//! INSERT INTO <table> (<col>, <col>, ...) VALUES (<val>, <val>, ...)
//! ```
//!
//! Keywords are case-insensitive. Values may be quoted with `'` or `"`;
//! commas inside quotes do not split, a doubled quote inside a quoted value
//! is a literal quote, and the surrounding quotes are stripped from the
//! stored value. A trailing `;` is tolerated.

use super::entities::Row;
use super::errors::StateError;

/// A parsed `INSERT INTO` statement, columns already zipped with values.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InsertStatement {
    pub table: String,
    pub row: Row,
}

impl InsertStatement {
    /// Parse `data` into a table name and a row.
    pub fn parse(data: &str) -> Result<Self, StateError> {
        let rest = take_keyword(data, "INSERT").ok_or_else(|| unknown("expected INSERT INTO"))?;
        let rest = take_keyword(rest, "INTO").ok_or_else(|| unknown("expected INSERT INTO"))?;

        let rest = rest.trim_start();
        let name_end = rest
            .find(|c: char| c.is_whitespace() || c == '(')
            .unwrap_or(rest.len());
        let table = unquote(&rest[..name_end]);
        if table.is_empty() {
            return Err(unknown("missing table name"));
        }

        let rest = rest[name_end..].trim_start();
        let rest = rest
            .strip_prefix('(')
            .ok_or_else(|| unknown("missing column list"))?;
        let close = rest.find(')').ok_or_else(|| unknown("unterminated column list"))?;
        let columns = split_columns(&rest[..close])?;

        let rest = take_keyword(&rest[close + 1..], "VALUES")
            .ok_or_else(|| unknown("expected VALUES"))?;
        let body = rest.trim().trim_end_matches(';').trim_end();
        let inner = body
            .strip_prefix('(')
            .and_then(|b| b.strip_suffix(')'))
            .ok_or_else(|| unknown("malformed value list"))?;
        let values = split_values(inner)?;

        if columns.len() != values.len() {
            return Err(StateError::MalformedColumns(format!(
                "{} columns, {} values",
                columns.len(),
                values.len()
            )));
        }

        let mut row = Row::new();
        for (column, value) in columns.into_iter().zip(values) {
            if row.contains_key(&column) {
                return Err(StateError::MalformedColumns(format!(
                    "duplicate column {column}"
                )));
            }
            row.insert(column, value);
        }

        Ok(Self { table, row })
    }
}

fn unknown(reason: &str) -> StateError {
    StateError::UnknownInstructionForm(reason.to_string())
}

/// Strip a leading case-insensitive keyword that is not the prefix of a longer word.
fn take_keyword<'a>(s: &'a str, keyword: &str) -> Option<&'a str> {
    let s = s.trim_start();
    let head = s.get(..keyword.len())?;
    if !head.eq_ignore_ascii_case(keyword) {
        return None;
    }
    let rest = &s[keyword.len()..];
    match rest.chars().next() {
        Some(c) if c.is_alphanumeric() || c == '_' => None,
        _ => Some(rest),
    }
}

fn split_columns(src: &str) -> Result<Vec<String>, StateError> {
    src.split(',')
        .map(|c| {
            let name = unquote(c.trim());
            if name.is_empty() {
                Err(StateError::MalformedColumns("empty column name".into()))
            } else {
                Ok(name)
            }
        })
        .collect()
}

fn split_values(src: &str) -> Result<Vec<String>, StateError> {
    if src.trim().is_empty() {
        return Ok(Vec::new());
    }

    let mut values = Vec::new();
    let mut current = String::new();
    let mut quote: Option<char> = None;

    for c in src.chars() {
        match quote {
            Some(q) if c == q => {
                quote = None;
                current.push(c);
            }
            Some(_) => current.push(c),
            None if c == '\'' || c == '"' => {
                quote = Some(c);
                current.push(c);
            }
            None if c == ',' => {
                values.push(unquote(current.trim()));
                current.clear();
            }
            None => current.push(c),
        }
    }

    if quote.is_some() {
        return Err(unknown("unterminated quoted value"));
    }
    values.push(unquote(current.trim()));
    Ok(values)
}

/// Remove one pair of matching surrounding quotes and unescape doubled quotes.
fn unquote(s: &str) -> String {
    for q in ['\'', '"', '`'] {
        if s.len() >= 2 && s.starts_with(q) && s.ends_with(q) {
            let inner = &s[1..s.len() - 1];
            let doubled: String = [q, q].iter().collect();
            return inner.replace(&doubled, &q.to_string());
        }
    }
    s.to_string()
}
