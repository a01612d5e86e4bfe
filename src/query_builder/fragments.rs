use crate::dialect::SqlDialect;
use crate::error::SqlFluentError;
use crate::translation::{NamedParams, synthetic_names, synthetic_placeholders};
use crate::types::RowValues;

const LIKE_SUFFIX: &str = "__like";
const MATCH_NOTHING: &str = "1 = 0";

/// What an `IN` predicate over an empty list renders as.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EmptySetPolicy {
    /// Render a clause that is always false, so the query returns no rows.
    #[default]
    MatchNothing,
    /// Drop the predicate, so it does not restrict the query at all.
    Skip,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinKind {
    Inner,
    Left,
    Right,
}

impl JoinKind {
    fn keyword(self) -> &'static str {
        match self {
            JoinKind::Inner => "JOIN",
            JoinKind::Left => "LEFT JOIN",
            JoinKind::Right => "RIGHT JOIN",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    Asc,
    Desc,
}

impl SortDirection {
    /// Anything but a case-insensitive `desc` sorts ascending.
    #[must_use]
    pub fn parse(direction: &str) -> Self {
        if direction.trim().eq_ignore_ascii_case("desc") {
            SortDirection::Desc
        } else {
            SortDirection::Asc
        }
    }

    fn keyword(self) -> &'static str {
        match self {
            SortDirection::Asc => "ASC",
            SortDirection::Desc => "DESC",
        }
    }
}

#[derive(Debug, Clone)]
struct JoinClause {
    table: String,
    condition: String,
    kind: JoinKind,
}

/// Parameter name derived from a column token (`people.id` -> `people_id`).
pub(crate) fn param_name(token: &str) -> String {
    token
        .trim()
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '_' { c } else { '_' })
        .collect()
}

fn is_blank(text: &str) -> bool {
    text.trim().is_empty()
}

fn push_predicate(buffer: &mut String, has_where: &mut bool, predicate: &str) {
    if *has_where {
        buffer.push_str(" AND ");
    } else {
        buffer.push_str(" WHERE ");
        *has_where = true;
    }
    buffer.push_str(predicate);
}

/// Accumulated statement fragments plus the named parameter map.
#[derive(Debug, Clone, Default)]
pub(crate) struct QueryFragments {
    table: Option<String>,
    select: Option<String>,
    joins: Vec<JoinClause>,
    where_raw: Vec<String>,
    where_eq: Vec<String>,
    where_in: Vec<(String, Vec<RowValues>)>,
    where_like: Vec<String>,
    group_by: Option<String>,
    order_by: Option<(String, SortDirection)>,
    page: i64,
    per_page: i64,
    statement: Option<String>,
    empty_set_policy: EmptySetPolicy,
    pub(crate) params: NamedParams,
}

impl QueryFragments {
    pub(crate) fn set_table(&mut self, table: &str) {
        self.table = Some(table.to_string());
    }

    pub(crate) fn set_select(&mut self, select: &str) {
        self.select = Some(select.to_string());
    }

    pub(crate) fn add_join(&mut self, kind: JoinKind, table: &str, condition: &str) {
        self.joins.push(JoinClause {
            table: table.to_string(),
            condition: condition.to_string(),
            kind,
        });
    }

    pub(crate) fn set_statement(&mut self, statement: &str) {
        self.statement = Some(statement.to_string());
    }

    pub(crate) fn add_where_raw(&mut self, predicate: &str) {
        self.where_raw.push(predicate.to_string());
    }

    pub(crate) fn add_where_eq(&mut self, token: &str, value: RowValues) {
        self.params.insert(param_name(token), value);
        self.where_eq.push(token.trim().to_string());
    }

    /// A repeated token replaces the earlier list in place.
    pub(crate) fn add_where_in(&mut self, token: &str, values: Vec<RowValues>) {
        if is_blank(token) {
            return;
        }
        let token = token.trim();
        if let Some(entry) = self.where_in.iter_mut().find(|(t, _)| t == token) {
            entry.1 = values;
        } else {
            self.where_in.push((token.to_string(), values));
        }
    }

    pub(crate) fn add_where_like(&mut self, token: &str, text: Option<&str>) {
        if is_blank(token) {
            return;
        }
        let Some(text) = text.filter(|t| !is_blank(t)) else {
            return;
        };
        let token = token.trim();
        self.params.insert(
            format!("{}{LIKE_SUFFIX}", param_name(token)),
            RowValues::Text(format!("%{}%", text.to_lowercase())),
        );
        self.where_like.push(token.to_string());
    }

    pub(crate) fn set_page(&mut self, page: i64, per_page: i64) {
        self.page = page;
        self.per_page = per_page;
    }

    pub(crate) fn set_order_by(&mut self, column: &str, direction: SortDirection) {
        self.order_by = Some((column.to_string(), direction));
    }

    pub(crate) fn set_group_by(&mut self, group_by: &str) {
        self.group_by = Some(group_by.to_string());
    }

    pub(crate) fn set_empty_set_policy(&mut self, policy: EmptySetPolicy) {
        self.empty_set_policy = policy;
    }

    pub(crate) fn insert_param(&mut self, key: &str, value: RowValues) {
        self.params.insert(key.to_string(), value);
    }

    /// `(offset, size)` when both page and page size are positive.
    #[allow(clippy::cast_sign_loss)]
    fn page_window(&self) -> Result<Option<(u64, u64)>, SqlFluentError> {
        if self.page <= 0 || self.per_page <= 0 {
            return Ok(None);
        }
        let per_page = self.per_page as u64;
        let offset = (self.page as u64 - 1).checked_mul(per_page).ok_or_else(|| {
            SqlFluentError::ConfigError(format!(
                "page {} of size {} is out of range",
                self.page, self.per_page
            ))
        })?;
        Ok(Some((offset, per_page)))
    }

    /// Full SELECT, with the page window appended when `paginate` is set.
    ///
    /// A raw statement is returned unchanged.
    pub(crate) fn render(
        &mut self,
        dialect: SqlDialect,
        paginate: bool,
    ) -> Result<String, SqlFluentError> {
        if let Some(statement) = &self.statement {
            return Ok(statement.clone());
        }

        let mut buffer = self.render_base()?;
        let select = self
            .select
            .as_deref()
            .filter(|s| !is_blank(s))
            .unwrap_or("*");
        buffer.insert_str(0, &format!("SELECT {select}"));

        if paginate && let Some((offset, size)) = self.page_window()? {
            dialect.push_pagination(&mut buffer, offset, size);
        }
        Ok(buffer)
    }

    /// `SELECT COUNT(expr) AS count` over the same joins, predicates and grouping.
    pub(crate) fn render_count(&mut self, expression: Option<&str>) -> Result<String, SqlFluentError> {
        let expression = expression.map(str::trim).filter(|e| !e.is_empty()).unwrap_or("*");

        if let Some(statement) = &self.statement {
            let inner = statement.trim().trim_end_matches(';');
            return Ok(format!(
                "SELECT COUNT({expression}) AS count FROM ({inner}) counted"
            ));
        }

        let base = self.render_base()?;
        Ok(format!("SELECT COUNT({expression}) AS count{base}"))
    }

    /// Everything after the select list: table, joins, predicates, grouping, ordering.
    ///
    /// Expanding `IN` lists writes their synthetic parameters into `params`.
    fn render_base(&mut self) -> Result<String, SqlFluentError> {
        let table = self
            .table
            .as_deref()
            .filter(|t| !is_blank(t))
            .ok_or_else(|| SqlFluentError::ConfigError("table is required".into()))?;

        let mut buffer = format!(" FROM {table}");

        for join in &self.joins {
            buffer.push_str(&format!(
                " {} {} ON {}",
                join.kind.keyword(),
                join.table,
                join.condition
            ));
        }

        let mut has_where = false;

        for predicate in &self.where_raw {
            push_predicate(&mut buffer, &mut has_where, predicate);
        }

        for token in &self.where_eq {
            let predicate = format!("{token} = :{}", param_name(token));
            push_predicate(&mut buffer, &mut has_where, &predicate);
        }

        for (token, values) in &self.where_in {
            if values.is_empty() {
                if self.empty_set_policy == EmptySetPolicy::MatchNothing {
                    push_predicate(&mut buffer, &mut has_where, MATCH_NOTHING);
                }
                continue;
            }
            let key = param_name(token);
            let predicate = format!(
                "{token} IN ({})",
                synthetic_placeholders(&key, values.len())
            );
            push_predicate(&mut buffer, &mut has_where, &predicate);
            for (name, value) in synthetic_names(&key, values.len()).into_iter().zip(values) {
                self.params.insert(name, value.clone());
            }
        }

        for token in &self.where_like {
            let predicate = format!("LOWER({token}) LIKE :{}{LIKE_SUFFIX}", param_name(token));
            push_predicate(&mut buffer, &mut has_where, &predicate);
        }

        if let Some(group_by) = &self.group_by {
            buffer.push_str(&format!(" GROUP BY {group_by}"));
        }

        if let Some((column, direction)) = &self.order_by {
            buffer.push_str(&format!(" ORDER BY {column} {}", direction.keyword()));
        }

        Ok(buffer)
    }
}
