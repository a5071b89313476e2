use super::{QueryAndParams, QueryBuilder, Where};
use crate::error::SqlDbalError;
use crate::types::{DatabaseType, RowValues};

impl QueryBuilder {
    /// `INSERT INTO table (cols) VALUES (...)`.
    ///
    /// # Errors
    /// Returns `SqlDbalError::ParameterError` when `values` is empty.
    pub fn insert<K, V>(
        &self,
        table: &str,
        values: impl IntoIterator<Item = (K, V)>,
    ) -> Result<QueryAndParams, SqlDbalError>
    where
        K: Into<String>,
        V: Into<RowValues>,
    {
        self.insert_like("INSERT", table, values)
    }

    /// `REPLACE INTO`, only understood by `MySQL` and `SQLite`.
    ///
    /// # Errors
    /// Returns `SqlDbalError::Unimplemented` for other vendors and
    /// `SqlDbalError::ParameterError` when `values` is empty.
    pub fn replace<K, V>(
        &self,
        table: &str,
        values: impl IntoIterator<Item = (K, V)>,
    ) -> Result<QueryAndParams, SqlDbalError>
    where
        K: Into<String>,
        V: Into<RowValues>,
    {
        match self.database_type() {
            DatabaseType::Mysql | DatabaseType::Sqlite => self.insert_like("REPLACE", table, values),
            other => Err(SqlDbalError::Unimplemented(format!(
                "REPLACE is not supported by {other}"
            ))),
        }
    }

    /// `UPDATE table SET ... [WHERE ...]`. Set values bind before filter values.
    ///
    /// # Errors
    /// Returns `SqlDbalError::ParameterError` when `values` is empty or the filter
    /// has an empty `IN` list.
    pub fn update<K, V>(
        &self,
        table: &str,
        values: impl IntoIterator<Item = (K, V)>,
        filter: Option<&Where>,
    ) -> Result<QueryAndParams, SqlDbalError>
    where
        K: Into<String>,
        V: Into<RowValues>,
    {
        let mut binder = self.binder();
        let assignments: Vec<String> = values
            .into_iter()
            .map(|(k, v)| format!("{} = {}", k.into(), binder.bind(&v.into())))
            .collect();
        if assignments.is_empty() {
            return Err(SqlDbalError::ParameterError(format!(
                "UPDATE {table} has no columns to set"
            )));
        }
        let mut sql = format!("UPDATE {table} SET {}", assignments.join(", "));
        if let Some(filter) = filter.filter(|w| !w.is_empty()) {
            sql.push_str(" WHERE ");
            sql.push_str(&filter.render(&mut binder)?);
        }
        Ok(binder.finish(sql))
    }

    /// `DELETE FROM table [WHERE ...]`.
    ///
    /// # Errors
    /// Returns `SqlDbalError::ParameterError` when the filter has an empty `IN` list.
    pub fn delete(&self, table: &str, filter: Option<&Where>) -> Result<QueryAndParams, SqlDbalError> {
        let mut binder = self.binder();
        let mut sql = format!("DELETE FROM {table}");
        if let Some(filter) = filter.filter(|w| !w.is_empty()) {
            sql.push_str(" WHERE ");
            sql.push_str(&filter.render(&mut binder)?);
        }
        Ok(binder.finish(sql))
    }

    fn insert_like<K, V>(
        &self,
        verb: &str,
        table: &str,
        values: impl IntoIterator<Item = (K, V)>,
    ) -> Result<QueryAndParams, SqlDbalError>
    where
        K: Into<String>,
        V: Into<RowValues>,
    {
        let mut binder = self.binder();
        let mut columns = Vec::new();
        let mut slots = Vec::new();
        for (k, v) in values {
            columns.push(k.into());
            slots.push(binder.bind(&v.into()));
        }
        if columns.is_empty() {
            return Err(SqlDbalError::ParameterError(format!(
                "{verb} into {table} has no columns"
            )));
        }
        let sql = format!(
            "{verb} INTO {table} ({}) VALUES ({})",
            columns.join(", "),
            slots.join(", ")
        );
        Ok(binder.finish(sql))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query_builder::{eq, in_list};

    #[test]
    fn insert_binds_in_column_order() {
        let q = QueryBuilder::new(DatabaseType::Postgres, true)
            .insert("users", [("name", RowValues::from("ann")), ("age", RowValues::Int(30))])
            .unwrap();
        assert_eq!(q.query, "INSERT INTO users (name, age) VALUES ($1, $2)");
        assert_eq!(q.params, vec![RowValues::Text("ann".into()), RowValues::Int(30)]);
    }

    #[test]
    fn inline_insert_escapes_per_vendor() {
        let q = QueryBuilder::new(DatabaseType::Mysql, false)
            .insert("t", [("a", "it's")])
            .unwrap();
        assert_eq!(q.query, r"INSERT INTO t (a) VALUES ('it\'s')");
        assert!(q.params.is_empty());
    }

    #[test]
    fn empty_insert_is_rejected() {
        let none: [(&str, i64); 0] = [];
        assert!(matches!(
            QueryBuilder::new(DatabaseType::Sqlite, true).insert("t", none),
            Err(SqlDbalError::ParameterError(_))
        ));
    }

    #[test]
    fn replace_is_vendor_gated() {
        let q = QueryBuilder::new(DatabaseType::Sqlite, true)
            .replace("kv", [("k", "a"), ("v", "b")])
            .unwrap();
        assert_eq!(q.query, "REPLACE INTO kv (k, v) VALUES (?, ?)");

        assert!(matches!(
            QueryBuilder::new(DatabaseType::Postgres, true).replace("kv", [("k", "a")]),
            Err(SqlDbalError::Unimplemented(_))
        ));
    }

    #[test]
    fn update_binds_set_before_filter() {
        let filter = Where::new().and(eq("id", 7));
        let q = QueryBuilder::new(DatabaseType::Mssql, true)
            .update("users", [("name", "bob")], Some(&filter))
            .unwrap();
        assert_eq!(q.query, "UPDATE users SET name = @P1 WHERE id = @P2");
        assert_eq!(q.params, vec![RowValues::Text("bob".into()), RowValues::Int(7)]);
    }

    #[test]
    fn delete_with_and_without_filter() {
        let qb = QueryBuilder::new(DatabaseType::Oracle, true);
        assert_eq!(qb.delete("t", None).unwrap().query, "DELETE FROM t");

        let filter = Where::new().and(in_list("id", [1, 2]));
        let q = qb.delete("t", Some(&filter)).unwrap();
        assert_eq!(q.query, "DELETE FROM t WHERE id IN (:1, :2)");
    }
}
