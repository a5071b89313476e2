//! DDL generation for the supported vendors.
//!
//! Fragments produced by [`SchemaBuilder::column`] and the constraint helpers
//! all end in `", "` so they can be concatenated and handed to
//! [`SchemaBuilder::create`], which trims the trailing separator.

mod types;

pub use types::{AlterOp, ColumnDescriptor, DataType};

use types::SizeRule;

use crate::error::SqlDbalError;
use crate::types::DatabaseType;

const SEPARATOR: &str = ", ";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SchemaBuilder {
    db_type: DatabaseType,
}

impl SchemaBuilder {
    #[must_use]
    pub fn new(db_type: DatabaseType) -> Self {
        Self { db_type }
    }

    #[must_use]
    pub fn database_type(&self) -> DatabaseType {
        self.db_type
    }

    /// Column definition fragment, e.g. `"id INT(11) AUTO_INCREMENT PRIMARY KEY, "`.
    ///
    /// # Errors
    /// Returns `SqlDbalError::SchemaError` when the datatype is missing or has no
    /// spelling for this vendor, when a mandatory size is absent, or when
    /// auto-increment is asked of a non-integer column.
    pub fn column(&self, column: &ColumnDescriptor) -> Result<String, SqlDbalError> {
        Ok(format!("{}{SEPARATOR}", self.definition(column)?))
    }

    /// `CONSTRAINT name PRIMARY KEY (cols), `
    ///
    /// # Errors
    /// Returns `SqlDbalError::SchemaError` when `columns` is empty.
    pub fn primary(&self, name: &str, columns: &[&str]) -> Result<String, SqlDbalError> {
        Ok(format!(
            "CONSTRAINT {name} PRIMARY KEY ({}){SEPARATOR}",
            column_list(name, columns)?
        ))
    }

    /// `CONSTRAINT name UNIQUE (cols), `
    ///
    /// # Errors
    /// Returns `SqlDbalError::SchemaError` when `columns` is empty.
    pub fn unique(&self, name: &str, columns: &[&str]) -> Result<String, SqlDbalError> {
        Ok(format!(
            "CONSTRAINT {name} UNIQUE ({}){SEPARATOR}",
            column_list(name, columns)?
        ))
    }

    /// `CONSTRAINT name FOREIGN KEY (cols) REFERENCES table (ref_cols), `
    ///
    /// # Errors
    /// Returns `SqlDbalError::SchemaError` when either column list is empty or
    /// the lists differ in length.
    pub fn foreign(
        &self,
        name: &str,
        columns: &[&str],
        ref_table: &str,
        ref_columns: &[&str],
    ) -> Result<String, SqlDbalError> {
        if columns.len() != ref_columns.len() {
            return Err(SqlDbalError::SchemaError(format!(
                "foreign key {name} maps {} columns onto {}",
                columns.len(),
                ref_columns.len()
            )));
        }
        Ok(format!(
            "CONSTRAINT {name} FOREIGN KEY ({}) REFERENCES {ref_table} ({}){SEPARATOR}",
            column_list(name, columns)?,
            column_list(name, ref_columns)?
        ))
    }

    /// `CREATE TABLE table (...)` from concatenated fragments.
    ///
    /// # Errors
    /// Returns `SqlDbalError::SchemaError` when no fragments are given.
    pub fn create<S: AsRef<str>>(&self, table: &str, fragments: &[S]) -> Result<String, SqlDbalError> {
        let body: String = fragments.iter().map(AsRef::as_ref).collect();
        let body = body.trim_end().trim_end_matches(',').trim_end();
        if body.is_empty() {
            return Err(SqlDbalError::SchemaError(format!(
                "table {table} has no columns"
            )));
        }
        Ok(format!("CREATE TABLE {table} ({body})"))
    }

    /// `ALTER TABLE` for each op.
    ///
    /// `MySQL` and `PostgreSQL` take all ops in one statement; other vendors get
    /// one statement per op, joined with `";\n"`.
    ///
    /// # Errors
    /// Returns `SqlDbalError::SchemaError` when `ops` is empty or an op has no
    /// equivalent for this vendor.
    pub fn alter(&self, table: &str, ops: &[AlterOp]) -> Result<String, SqlDbalError> {
        if ops.is_empty() {
            return Err(SqlDbalError::SchemaError(format!(
                "nothing to alter on {table}"
            )));
        }
        let clauses = ops
            .iter()
            .map(|op| self.alter_clause(op))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(match self.db_type {
            DatabaseType::Mysql | DatabaseType::Postgres => {
                format!("ALTER TABLE {table} {}", clauses.join(", "))
            }
            _ => clauses
                .iter()
                .map(|c| format!("ALTER TABLE {table} {c}"))
                .collect::<Vec<_>>()
                .join(";\n"),
        })
    }

    #[must_use]
    pub fn drop(&self, table: &str) -> String {
        format!("DROP TABLE {table}")
    }

    fn alter_clause(&self, op: &AlterOp) -> Result<String, SqlDbalError> {
        use DatabaseType::{Mssql, Mysql, Oracle, Postgres, Sqlite, Sybase};

        let unsupported = |what: &str| {
            Err(SqlDbalError::SchemaError(format!(
                "{what} is not supported by {}",
                self.db_type
            )))
        };
        Ok(match (op, self.db_type) {
            (AlterOp::AddColumn(c), Mysql | Postgres | Sqlite) => {
                format!("ADD COLUMN {}", self.definition(c)?)
            }
            (AlterOp::AddColumn(c), Oracle) => format!("ADD ({})", self.definition(c)?),
            (AlterOp::AddColumn(c), Mssql | Sybase) => format!("ADD {}", self.definition(c)?),

            (AlterOp::DropColumn(name), Sybase) => format!("DROP {name}"),
            (AlterOp::DropColumn(name), _) => format!("DROP COLUMN {name}"),

            (AlterOp::RenameColumn { .. }, Mssql | Sybase) => {
                return unsupported("RENAME COLUMN (use sp_rename)");
            }
            (AlterOp::RenameColumn { from, to }, _) => format!("RENAME COLUMN {from} TO {to}"),

            (AlterOp::ModifyColumn(c), Mysql) => format!("MODIFY COLUMN {}", self.definition(c)?),
            (AlterOp::ModifyColumn(c), Postgres) => {
                let (type_sql, _) = self.type_sql(c)?;
                format!("ALTER COLUMN {} TYPE {type_sql}", c.name)
            }
            (AlterOp::ModifyColumn(c), Mssql) => format!("ALTER COLUMN {}", self.definition(c)?),
            (AlterOp::ModifyColumn(c), Oracle) => format!("MODIFY ({})", self.definition(c)?),
            (AlterOp::ModifyColumn(c), Sybase) => format!("MODIFY {}", self.definition(c)?),
            (AlterOp::ModifyColumn(_), Sqlite) => return unsupported("MODIFY COLUMN"),

            (AlterOp::AddConstraint(_) | AlterOp::DropConstraint(_), Sqlite) => {
                return unsupported("ALTER TABLE constraints");
            }
            (AlterOp::AddConstraint(fragment), _) => {
                format!("ADD {}", fragment.trim_end().trim_end_matches(','))
            }
            (AlterOp::DropConstraint(name), _) => format!("DROP CONSTRAINT {name}"),
        })
    }

    fn definition(&self, column: &ColumnDescriptor) -> Result<String, SqlDbalError> {
        let (type_sql, auto_is_primary) = self.type_sql(column)?;
        let mut sql = format!("{} {type_sql}", column.name);
        match column.nullable {
            Some(true) => sql.push_str(" NULL"),
            Some(false) => sql.push_str(" NOT NULL"),
            None => {}
        }
        if let Some(default) = &column.default {
            sql.push_str(" DEFAULT ");
            sql.push_str(default);
        }
        if column.auto_increment {
            match self.db_type {
                DatabaseType::Mysql => sql.push_str(" AUTO_INCREMENT"),
                DatabaseType::Mssql | DatabaseType::Sybase => sql.push_str(" IDENTITY(1,1)"),
                DatabaseType::Oracle => sql.push_str(" GENERATED BY DEFAULT AS IDENTITY"),
                // carried by the type itself
                DatabaseType::Postgres | DatabaseType::Sqlite => {}
            }
        }
        if column.primary && !auto_is_primary {
            sql.push_str(" PRIMARY KEY");
        }
        if column.unique {
            sql.push_str(" UNIQUE");
        }
        Ok(sql)
    }

    /// Rendered type, and whether it already includes `PRIMARY KEY`.
    fn type_sql(&self, column: &ColumnDescriptor) -> Result<(String, bool), SqlDbalError> {
        let schema_err = |msg: String| Err(SqlDbalError::SchemaError(msg));

        let datatype = match (column.datatype, column.auto_increment) {
            (Some(dt), _) => dt,
            (None, true) => DataType::Int,
            (None, false) => {
                return schema_err(format!("column {} has no datatype", column.name));
            }
        };

        if column.auto_increment {
            if !datatype.is_integer() {
                return schema_err(format!(
                    "column {} cannot auto increment a {datatype:?}",
                    column.name
                ));
            }
            match self.db_type {
                DatabaseType::Postgres => {
                    let serial = match datatype {
                        DataType::BigInt => "BIGSERIAL",
                        DataType::SmallInt | DataType::TinyInt => "SMALLSERIAL",
                        _ => "SERIAL",
                    };
                    return Ok((serial.to_string(), false));
                }
                DatabaseType::Sqlite => {
                    if !column.primary {
                        return schema_err(format!(
                            "column {}: SQLite only auto increments the primary key",
                            column.name
                        ));
                    }
                    return Ok(("INTEGER PRIMARY KEY AUTOINCREMENT".to_string(), true));
                }
                _ => {}
            }
        }

        let Some((name, rule)) = datatype.spelling(self.db_type) else {
            return schema_err(format!(
                "{datatype:?} is not supported by {} (column {})",
                self.db_type, column.name
            ));
        };
        let rendered = match (rule, column.size, column.scale) {
            (SizeRule::RequiredLength, None, _) => {
                return schema_err(format!("column {}: {name} requires a size", column.name));
            }
            (SizeRule::Length | SizeRule::RequiredLength, Some(size), _) => {
                format!("{name}({size})")
            }
            (SizeRule::Precision, Some(size), Some(scale)) => format!("{name}({size},{scale})"),
            (SizeRule::Precision, Some(size), None) => format!("{name}({size})"),
            _ => name.to_string(),
        };
        Ok((rendered, false))
    }
}

fn column_list(name: &str, columns: &[&str]) -> Result<String, SqlDbalError> {
    if columns.is_empty() {
        return Err(SqlDbalError::SchemaError(format!(
            "constraint {name} lists no columns"
        )));
    }
    Ok(columns.join(", "))
}
