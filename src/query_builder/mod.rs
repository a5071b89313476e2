//! Vendor-aware statement builders.
//!
//! A [`QueryBuilder`] is fixed to one [`DatabaseType`] and one binding mode.
//! In prepared mode every value becomes a vendor placeholder and is collected
//! into [`QueryAndParams::params`] in the order it appears in the SQL text; in
//! inline mode values are rendered as escaped literals and no params are
//! returned.
//!
//! ```rust
//! use sql_dbal::prelude::*;
//! use sql_dbal::query_builder::{eq, gt};
//!
//! let qb = QueryBuilder::new(DatabaseType::Postgres, true);
//! let q = qb
//!     .select("users", &["id", "name"])
//!     .filter(Where::new().and(eq("active", true)).and(gt("age", 18)))
//!     .order_by("id", Order::Asc)
//!     .limit(10)
//!     .build()
//!     .unwrap();
//! assert_eq!(
//!     q.query,
//!     "SELECT id, name FROM users WHERE active = $1 AND age > $2 ORDER BY id ASC LIMIT 10"
//! );
//! assert_eq!(q.params, vec![RowValues::Bool(true), RowValues::Int(18)]);
//! ```

mod dml;
mod select;
mod where_clause;

pub use select::{Order, SelectBuilder};
pub use where_clause::{
    Predicate, Where, between, eq, gt, gte, in_list, is_not_null, is_null, like, lt, lte, neq,
    not_between, not_in, not_like,
};

use crate::error::SqlDbalError;
use crate::escape;
use crate::types::{DatabaseType, RowValues};

/// A query and its parameters bundled together.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryAndParams {
    /// The SQL query string
    pub query: String,
    /// The parameters to be bound to the query
    pub params: Vec<RowValues>,
}

impl QueryAndParams {
    pub fn new(query: impl Into<String>, params: Vec<RowValues>) -> Self {
        Self {
            query: query.into(),
            params,
        }
    }

    pub fn new_without_params(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            params: Vec::new(),
        }
    }
}

/// Entry point for building statements against one vendor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueryBuilder {
    db_type: DatabaseType,
    prepare: bool,
}

impl QueryBuilder {
    #[must_use]
    pub fn new(db_type: DatabaseType, prepare: bool) -> Self {
        Self { db_type, prepare }
    }

    #[must_use]
    pub fn database_type(&self) -> DatabaseType {
        self.db_type
    }

    #[must_use]
    pub fn is_prepared(&self) -> bool {
        self.prepare
    }

    #[must_use]
    pub fn select(&self, table: &str, columns: &[&str]) -> SelectBuilder {
        SelectBuilder::new(*self, table, columns)
    }

    /// Standalone `WHERE ...` fragment for hand-written statements.
    ///
    /// An empty filter renders as an empty string. Placeholders start at 1,
    /// so the fragment should be the only bound part of the final statement.
    ///
    /// # Errors
    /// Returns `SqlDbalError::ParameterError` for an empty `IN` list.
    pub fn where_clause(&self, filter: &Where) -> Result<QueryAndParams, SqlDbalError> {
        let mut binder = self.binder();
        let rendered = filter.render(&mut binder)?;
        if rendered.is_empty() {
            return Ok(binder.finish(String::new()));
        }
        Ok(binder.finish(format!("WHERE {rendered}")))
    }

    pub(crate) fn binder(&self) -> Binder {
        Binder {
            db_type: self.db_type,
            prepare: self.prepare,
            params: Vec::new(),
        }
    }
}

/// Collects bound values while a statement is rendered.
pub(crate) struct Binder {
    db_type: DatabaseType,
    prepare: bool,
    params: Vec<RowValues>,
}

impl Binder {
    /// Placeholder or inline literal for `value`.
    pub(crate) fn bind(&mut self, value: &RowValues) -> String {
        if self.prepare {
            self.params.push(value.clone());
            self.db_type.placeholder_style().render(self.params.len())
        } else {
            escape::literal(self.db_type, value)
        }
    }

    pub(crate) fn db_type(&self) -> DatabaseType {
        self.db_type
    }

    pub(crate) fn finish(self, query: String) -> QueryAndParams {
        QueryAndParams::new(query, self.params)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn where_clause_prepared() {
        let qb = QueryBuilder::new(DatabaseType::Postgres, true);
        let filter = Where::new()
            .and(eq("status", "open"))
            .or_group(Where::new().and(gt("age", 30)).and(is_null("deleted_at")));
        let q = qb.where_clause(&filter).unwrap();
        assert_eq!(
            q.query,
            "WHERE status = $1 OR (age > $2 AND deleted_at IS NULL)"
        );
        assert_eq!(q.params, vec![RowValues::from("open"), RowValues::Int(30)]);
    }

    #[test]
    fn where_clause_inline() {
        let qb = QueryBuilder::new(DatabaseType::Mysql, false);
        let q = qb
            .where_clause(&Where::new().and(eq("name", "O'Brien")).and(in_list("id", [1, 2])))
            .unwrap();
        assert_eq!(q.query, "WHERE name = 'O\\'Brien' AND id IN (1, 2)");
        assert!(q.params.is_empty());
    }

    #[test]
    fn where_clause_empty_and_invalid() {
        let qb = QueryBuilder::new(DatabaseType::Sqlite, true);
        assert_eq!(qb.where_clause(&Where::new()).unwrap(), QueryAndParams::new_without_params(""));
        assert!(matches!(
            qb.where_clause(&Where::new().and(not_in::<i64>("id", []))),
            Err(SqlDbalError::ParameterError(_))
        ));
    }
}
