use std::collections::BTreeMap;

mod scanner;

use scanner::{
    State, closes_dollar_quote, dollar_quote_open, is_block_comment_end, is_block_comment_start,
    is_cast, is_line_comment_start, scan_name,
};

use crate::error::SqlFluentError;
use crate::types::RowValues;

/// Named parameter values keyed by name (without the leading `:`).
pub type NamedParams = BTreeMap<String, RowValues>;

/// Target placeholder style for translation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaceholderStyle {
    /// PostgreSQL-style placeholders like `$1`.
    Postgres,
    /// SQLite-style placeholders like `?1`.
    Sqlite,
    /// Bare `?` placeholders bound strictly by position.
    Positional,
}

impl PlaceholderStyle {
    fn push_placeholder(self, buf: &mut String, slot: usize) {
        match self {
            PlaceholderStyle::Postgres => {
                buf.push('$');
                buf.push_str(&slot.to_string());
            }
            PlaceholderStyle::Sqlite => {
                buf.push('?');
                buf.push_str(&slot.to_string());
            }
            PlaceholderStyle::Positional => buf.push('?'),
        }
    }
}

/// SQL text whose `:name` markers were rewritten into positional placeholders.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NamedStatement {
    sql: String,
    slots: BTreeMap<String, Vec<usize>>,
    slot_count: usize,
}

impl NamedStatement {
    /// The rewritten SQL.
    #[must_use]
    pub fn sql(&self) -> &str {
        &self.sql
    }

    #[must_use]
    pub fn into_sql(self) -> String {
        self.sql
    }

    /// Total number of positional placeholders emitted.
    #[must_use]
    pub fn slot_count(&self) -> usize {
        self.slot_count
    }

    /// 1-based positions occupied by `name`, in order of appearance.
    #[must_use]
    pub fn slots_for(&self, name: &str) -> Option<&[usize]> {
        self.slots.get(name).map(Vec::as_slice)
    }

    /// Distinct parameter names found in the text.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.slots.keys().map(String::as_str)
    }

    /// Produce positional values for this statement.
    ///
    /// Every key of `params` is written to each slot its name occupies; keys
    /// that do not occur in the text are ignored.
    ///
    /// # Errors
    ///
    /// Returns `SqlFluentError::ParameterError` listing every name that occurs
    /// in the text but has no value in `params`.
    pub fn bind(&self, params: &NamedParams) -> Result<Vec<RowValues>, SqlFluentError> {
        let mut bound: Vec<Option<RowValues>> = vec![None; self.slot_count];
        for (name, value) in params {
            if let Some(positions) = self.slots.get(name) {
                for &position in positions {
                    bound[position - 1] = Some(value.clone());
                }
            }
        }

        let missing: Vec<&str> = self
            .slots
            .iter()
            .filter(|(_, positions)| positions.iter().any(|&p| bound[p - 1].is_none()))
            .map(|(name, _)| name.as_str())
            .collect();
        if !missing.is_empty() {
            return Err(SqlFluentError::ParameterError(format!(
                "no value supplied for parameter(s): {}",
                missing.join(", ")
            )));
        }

        Ok(bound.into_iter().flatten().collect())
    }
}

/// Rewrite `:name` markers into positional placeholders of `style`.
///
/// Every occurrence takes the next slot, so a name used twice occupies two
/// slots. Markers inside single-quoted literals, double-quoted identifiers,
/// comments and dollar-quoted bodies are left alone, as are `::` casts.
///
/// ```rust
/// use sql_fluent::prelude::*;
///
/// let stmt = parse_named(
///     "select * from t where a = :a and b = ':a' or c = :a",
///     PlaceholderStyle::Sqlite,
/// );
/// assert_eq!(stmt.sql(), "select * from t where a = ?1 and b = ':a' or c = ?2");
/// assert_eq!(stmt.slots_for("a"), Some(&[1, 2][..]));
/// ```
#[must_use]
pub fn parse_named(sql: &str, style: PlaceholderStyle) -> NamedStatement {
    let bytes = sql.as_bytes();
    let mut out = String::with_capacity(sql.len());
    let mut slots: BTreeMap<String, Vec<usize>> = BTreeMap::new();
    let mut slot_count = 0;
    let mut copied = 0;
    let mut state = State::Normal;
    let mut idx = 0;

    while idx < bytes.len() {
        let b = bytes[idx];
        match state {
            State::Normal => match b {
                b'\'' => state = State::SingleQuoted,
                b'"' => state = State::DoubleQuoted,
                _ if is_line_comment_start(bytes, idx) => {
                    state = State::LineComment;
                    idx += 1;
                }
                _ if is_block_comment_start(bytes, idx) => {
                    state = State::BlockComment(1);
                    idx += 1;
                }
                _ if is_cast(bytes, idx) => idx += 1,
                b'$' => {
                    if let Some((tag, advance)) = dollar_quote_open(bytes, idx) {
                        state = State::DollarQuoted(tag);
                        idx = advance;
                    }
                }
                b':' => {
                    if let Some((end, name)) = scan_name(bytes, idx + 1) {
                        out.push_str(&sql[copied..idx]);
                        slot_count += 1;
                        style.push_placeholder(&mut out, slot_count);
                        slots.entry(name.to_string()).or_default().push(slot_count);
                        copied = end;
                        idx = end;
                        continue;
                    }
                }
                _ => {}
            },
            State::SingleQuoted => {
                if b == b'\'' {
                    if bytes.get(idx + 1) == Some(&b'\'') {
                        idx += 1; // skip escaped quote
                    } else {
                        state = State::Normal;
                    }
                }
            }
            State::DoubleQuoted => {
                if b == b'"' {
                    if bytes.get(idx + 1) == Some(&b'"') {
                        idx += 1; // skip escaped quote
                    } else {
                        state = State::Normal;
                    }
                }
            }
            State::LineComment => {
                if b == b'\n' {
                    state = State::Normal;
                }
            }
            State::BlockComment(depth) => {
                if is_block_comment_start(bytes, idx) {
                    state = State::BlockComment(depth + 1);
                    idx += 1;
                } else if is_block_comment_end(bytes, idx) {
                    if depth == 1 {
                        state = State::Normal;
                    } else {
                        state = State::BlockComment(depth - 1);
                    }
                    idx += 1;
                }
            }
            State::DollarQuoted(ref tag) => {
                if b == b'$' && closes_dollar_quote(bytes, idx, tag) {
                    idx += tag.len() + 1;
                    state = State::Normal;
                }
            }
        }
        idx += 1;
    }

    out.push_str(&sql[copied..]);
    NamedStatement {
        sql: out,
        slots,
        slot_count,
    }
}

/// Generated names for expanding a list under `key`: `key__0000`, `key__0001`, ...
#[must_use]
pub fn synthetic_names(key: &str, quantity: usize) -> Vec<String> {
    (0..quantity).map(|i| format!("{key}__{i:04}")).collect()
}

/// Comma-separated `:name` markers for [`synthetic_names`].
#[must_use]
pub fn synthetic_placeholders(key: &str, quantity: usize) -> String {
    synthetic_names(key, quantity)
        .iter()
        .map(|name| format!(":{name}"))
        .collect::<Vec<_>>()
        .join(", ")
}
