use crate::translation::PlaceholderStyle;

/// SQL flavour spoken by a connection.
///
/// The dialect decides how positional placeholders are written after named
/// parameters are translated, and how a page window is appended to a
/// rendered statement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SqlDialect {
    /// SQL:2008 paging with bare `?` placeholders.
    #[default]
    Standard,
    /// `LIMIT`/`OFFSET` paging with `?N` placeholders.
    Sqlite,
    /// `LIMIT`/`OFFSET` paging with `$N` placeholders.
    Postgres,
}

impl SqlDialect {
    #[must_use]
    pub fn placeholder_style(self) -> PlaceholderStyle {
        match self {
            SqlDialect::Standard => PlaceholderStyle::Positional,
            SqlDialect::Sqlite => PlaceholderStyle::Sqlite,
            SqlDialect::Postgres => PlaceholderStyle::Postgres,
        }
    }

    /// Append a page window that skips `offset` rows and returns at most `size`.
    pub fn push_pagination(self, buffer: &mut String, offset: u64, size: u64) {
        match self {
            SqlDialect::Standard => {
                buffer.push_str(&format!(
                    " OFFSET {offset} ROWS FETCH NEXT {size} ROWS ONLY"
                ));
            }
            SqlDialect::Sqlite | SqlDialect::Postgres => {
                buffer.push_str(&format!(" LIMIT {size} OFFSET {offset}"));
            }
        }
    }
}
