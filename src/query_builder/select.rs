use std::fmt::Write as _;

use super::{QueryAndParams, QueryBuilder, Where};
use crate::error::SqlDbalError;
use crate::types::DatabaseType;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Order {
    Asc,
    Desc,
}

impl Order {
    fn as_sql(self) -> &'static str {
        match self {
            Order::Asc => "ASC",
            Order::Desc => "DESC",
        }
    }
}

/// `SELECT` statement under construction. Create one with [`QueryBuilder::select`].
#[derive(Debug, Clone)]
pub struct SelectBuilder {
    builder: QueryBuilder,
    table: String,
    columns: Vec<String>,
    filter: Option<Where>,
    group_by: Vec<String>,
    having: Option<Where>,
    order_by: Vec<(String, Order)>,
    limit: Option<u64>,
    offset: Option<u64>,
}

impl SelectBuilder {
    pub(super) fn new(builder: QueryBuilder, table: &str, columns: &[&str]) -> Self {
        Self {
            builder,
            table: table.to_string(),
            columns: columns.iter().map(ToString::to_string).collect(),
            filter: None,
            group_by: Vec::new(),
            having: None,
            order_by: Vec::new(),
            limit: None,
            offset: None,
        }
    }

    #[must_use]
    pub fn filter(mut self, filter: impl Into<Where>) -> Self {
        self.filter = Some(filter.into());
        self
    }

    #[must_use]
    pub fn group_by(mut self, column: &str) -> Self {
        self.group_by.push(column.to_string());
        self
    }

    #[must_use]
    pub fn having(mut self, having: impl Into<Where>) -> Self {
        self.having = Some(having.into());
        self
    }

    #[must_use]
    pub fn order_by(mut self, column: &str, order: Order) -> Self {
        self.order_by.push((column.to_string(), order));
        self
    }

    #[must_use]
    pub fn limit(mut self, limit: u64) -> Self {
        self.limit = Some(limit);
        self
    }

    #[must_use]
    pub fn offset(mut self, offset: u64) -> Self {
        self.offset = Some(offset);
        self
    }

    /// Render the statement.
    ///
    /// # Errors
    /// Returns `SqlDbalError::ParameterError` for an empty `IN` list and
    /// `SqlDbalError::Unimplemented` for an offset on Sybase, which has no
    /// row-offset syntax.
    pub fn build(&self) -> Result<QueryAndParams, SqlDbalError> {
        let db_type = self.builder.database_type();
        let mut binder = self.builder.binder();

        let columns = if self.columns.is_empty() {
            "*".to_string()
        } else {
            self.columns.join(", ")
        };
        let mut sql = String::from("SELECT ");
        if db_type == DatabaseType::Sybase {
            if self.offset.is_some() {
                return Err(SqlDbalError::Unimplemented(
                    "Sybase has no OFFSET clause".to_string(),
                ));
            }
            if let Some(limit) = self.limit {
                let _ = write!(sql, "TOP {limit} ");
            }
        }
        let _ = write!(sql, "{columns} FROM {}", self.table);

        if let Some(filter) = self.filter.as_ref().filter(|w| !w.is_empty()) {
            let _ = write!(sql, " WHERE {}", filter.render(&mut binder)?);
        }
        if !self.group_by.is_empty() {
            let _ = write!(sql, " GROUP BY {}", self.group_by.join(", "));
        }
        if let Some(having) = self.having.as_ref().filter(|w| !w.is_empty()) {
            let _ = write!(sql, " HAVING {}", having.render(&mut binder)?);
        }
        if !self.order_by.is_empty() {
            let order: Vec<String> = self
                .order_by
                .iter()
                .map(|(c, o)| format!("{c} {}", o.as_sql()))
                .collect();
            let _ = write!(sql, " ORDER BY {}", order.join(", "));
        }
        self.render_limit(db_type, &mut sql);

        Ok(binder.finish(sql))
    }

    fn render_limit(&self, db_type: DatabaseType, sql: &mut String) {
        match (db_type, self.limit, self.offset) {
            (_, None, None) | (DatabaseType::Sybase, _, _) => {}
            (DatabaseType::Mysql | DatabaseType::Postgres | DatabaseType::Sqlite, limit, offset) => {
                match (db_type, limit) {
                    (_, Some(n)) => {
                        let _ = write!(sql, " LIMIT {n}");
                    }
                    // OFFSET without LIMIT is not accepted by MySQL or SQLite
                    (DatabaseType::Mysql, None) => sql.push_str(" LIMIT 18446744073709551615"),
                    (DatabaseType::Sqlite, None) => sql.push_str(" LIMIT -1"),
                    _ => {}
                }
                if let Some(m) = offset {
                    let _ = write!(sql, " OFFSET {m}");
                }
            }
            (DatabaseType::Mssql | DatabaseType::Oracle, limit, offset) => {
                if db_type == DatabaseType::Mssql && self.order_by.is_empty() {
                    sql.push_str(" ORDER BY (SELECT NULL)");
                }
                if db_type == DatabaseType::Mssql || offset.is_some() {
                    let _ = write!(sql, " OFFSET {} ROWS", offset.unwrap_or(0));
                }
                if let Some(n) = limit {
                    let next = if db_type == DatabaseType::Mssql || offset.is_some() {
                        "NEXT"
                    } else {
                        "FIRST"
                    };
                    let _ = write!(sql, " FETCH {next} {n} ROWS ONLY");
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query_builder::{eq, gt};
    use crate::types::RowValues;

    fn users(db: DatabaseType) -> SelectBuilder {
        QueryBuilder::new(db, true).select("users", &["id", "name"])
    }

    #[test]
    fn full_select_in_prepared_mode() {
        let q = QueryBuilder::new(DatabaseType::Mysql, true)
            .select("orders", &["customer", "COUNT(*) AS n"])
            .filter(eq("status", "open"))
            .group_by("customer")
            .having(gt("COUNT(*)", 2))
            .order_by("n", Order::Desc)
            .limit(5)
            .offset(10)
            .build()
            .unwrap();
        assert_eq!(
            q.query,
            "SELECT customer, COUNT(*) AS n FROM orders WHERE status = ? GROUP BY customer \
             HAVING COUNT(*) > ? ORDER BY n DESC LIMIT 5 OFFSET 10"
        );
        assert_eq!(q.params, vec![RowValues::Text("open".into()), RowValues::Int(2)]);
    }

    #[test]
    fn no_columns_selects_star() {
        let q = QueryBuilder::new(DatabaseType::Sqlite, false)
            .select("t", &[])
            .build()
            .unwrap();
        assert_eq!(q.query, "SELECT * FROM t");
    }

    #[test]
    fn limit_rendering_per_vendor() {
        let cases = [
            (DatabaseType::Postgres, "SELECT id, name FROM users ORDER BY id ASC LIMIT 10 OFFSET 20"),
            (DatabaseType::Sqlite, "SELECT id, name FROM users ORDER BY id ASC LIMIT 10 OFFSET 20"),
            (
                DatabaseType::Mssql,
                "SELECT id, name FROM users ORDER BY id ASC OFFSET 20 ROWS FETCH NEXT 10 ROWS ONLY",
            ),
            (
                DatabaseType::Oracle,
                "SELECT id, name FROM users ORDER BY id ASC OFFSET 20 ROWS FETCH NEXT 10 ROWS ONLY",
            ),
        ];
        for (db, expected) in cases {
            let q = users(db).order_by("id", Order::Asc).limit(10).offset(20).build().unwrap();
            assert_eq!(q.query, expected, "{db:?}");
        }
    }

    #[test]
    fn limit_only() {
        let q = users(DatabaseType::Oracle).limit(3).build().unwrap();
        assert_eq!(q.query, "SELECT id, name FROM users FETCH FIRST 3 ROWS ONLY");

        let q = users(DatabaseType::Mssql).limit(3).build().unwrap();
        assert_eq!(
            q.query,
            "SELECT id, name FROM users ORDER BY (SELECT NULL) OFFSET 0 ROWS FETCH NEXT 3 ROWS ONLY"
        );

        let q = users(DatabaseType::Sybase).limit(3).build().unwrap();
        assert_eq!(q.query, "SELECT TOP 3 id, name FROM users");
    }

    #[test]
    fn offset_without_limit() {
        let q = users(DatabaseType::Sqlite).offset(4).build().unwrap();
        assert_eq!(q.query, "SELECT id, name FROM users LIMIT -1 OFFSET 4");

        let q = users(DatabaseType::Postgres).offset(4).build().unwrap();
        assert_eq!(q.query, "SELECT id, name FROM users OFFSET 4");

        assert!(matches!(
            users(DatabaseType::Sybase).limit(1).offset(4).build(),
            Err(SqlDbalError::Unimplemented(_))
        ));
    }
}
