use serde::{Deserialize, Serialize};

use crate::types::DatabaseType;

/// Portable column types, mapped to a vendor spelling by the schema builder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DataType {
    TinyInt,
    SmallInt,
    Int,
    BigInt,
    Decimal,
    Float,
    Double,
    Char,
    Varchar,
    Text,
    Date,
    DateTime,
    Timestamp,
    Time,
    Boolean,
    Blob,
    Json,
}

/// How a vendor type takes the descriptor's `size` / `scale`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum SizeRule {
    /// Size is ignored.
    None,
    /// `TYPE(size)` when a size is given.
    Length,
    /// `TYPE(size)` is mandatory.
    RequiredLength,
    /// `TYPE(size, scale)` / `TYPE(size)`.
    Precision,
}

impl DataType {
    #[must_use]
    pub fn is_integer(self) -> bool {
        matches!(
            self,
            DataType::TinyInt | DataType::SmallInt | DataType::Int | DataType::BigInt
        )
    }

    /// Vendor type name and sizing rule, `None` when the vendor has no such type.
    pub(crate) fn spelling(self, db: DatabaseType) -> Option<(&'static str, SizeRule)> {
        use DatabaseType::{Mssql, Mysql, Oracle, Postgres, Sqlite, Sybase};
        use SizeRule::{Length, Precision, RequiredLength};

        let spelled = match (self, db) {
            (DataType::TinyInt, Postgres | Oracle) => return None,
            (DataType::TinyInt, Mysql) => ("TINYINT", Length),
            (DataType::TinyInt, _) => ("TINYINT", SizeRule::None),

            (DataType::SmallInt, Mysql) => ("SMALLINT", Length),
            (DataType::SmallInt, _) => ("SMALLINT", SizeRule::None),

            (DataType::Int, Mysql) => ("INT", Length),
            (DataType::Int, Postgres | Sqlite | Oracle) => ("INTEGER", SizeRule::None),
            (DataType::Int, Mssql | Sybase) => ("INT", SizeRule::None),

            (DataType::BigInt, Mysql) => ("BIGINT", Length),
            (DataType::BigInt, Oracle) => ("NUMBER(19)", SizeRule::None),
            (DataType::BigInt, _) => ("BIGINT", SizeRule::None),

            (DataType::Decimal, Postgres) => ("NUMERIC", Precision),
            (DataType::Decimal, Oracle) => ("NUMBER", Precision),
            (DataType::Decimal, _) => ("DECIMAL", Precision),

            (DataType::Float, Mysql) => ("FLOAT", Precision),
            (DataType::Float, Oracle) => ("BINARY_FLOAT", SizeRule::None),
            (DataType::Float, _) => ("REAL", SizeRule::None),

            (DataType::Double, Mysql) => ("DOUBLE", SizeRule::None),
            (DataType::Double, Postgres | Sybase) => ("DOUBLE PRECISION", SizeRule::None),
            (DataType::Double, Sqlite) => ("REAL", SizeRule::None),
            (DataType::Double, Mssql) => ("FLOAT", SizeRule::None),
            (DataType::Double, Oracle) => ("BINARY_DOUBLE", SizeRule::None),

            (DataType::Char, _) => ("CHAR", Length),

            (DataType::Varchar, Mysql | Sybase) => ("VARCHAR", RequiredLength),
            (DataType::Varchar, Oracle) => ("VARCHAR2", RequiredLength),
            (DataType::Varchar, _) => ("VARCHAR", Length),

            (DataType::Text, Mssql) => ("NVARCHAR(MAX)", SizeRule::None),
            (DataType::Text, Oracle) => ("CLOB", SizeRule::None),
            (DataType::Text, _) => ("TEXT", SizeRule::None),

            (DataType::Date, _) => ("DATE", SizeRule::None),

            (DataType::DateTime, Mysql | Sqlite | Sybase) => ("DATETIME", SizeRule::None),
            (DataType::DateTime, Mssql) => ("DATETIME2", SizeRule::None),
            (DataType::DateTime, Postgres | Oracle) => ("TIMESTAMP", SizeRule::None),

            (DataType::Timestamp, Sybase) => return None,
            (DataType::Timestamp, Postgres) => ("TIMESTAMPTZ", SizeRule::None),
            (DataType::Timestamp, Mssql) => ("DATETIMEOFFSET", SizeRule::None),
            (DataType::Timestamp, Oracle) => ("TIMESTAMP WITH TIME ZONE", SizeRule::None),
            (DataType::Timestamp, _) => ("TIMESTAMP", SizeRule::None),

            (DataType::Time, Oracle) => return None,
            (DataType::Time, _) => ("TIME", SizeRule::None),

            (DataType::Boolean, Mssql | Sybase) => ("BIT", SizeRule::None),
            (DataType::Boolean, Oracle) => ("NUMBER(1)", SizeRule::None),
            (DataType::Boolean, _) => ("BOOLEAN", SizeRule::None),

            (DataType::Blob, Postgres) => ("BYTEA", SizeRule::None),
            (DataType::Blob, Mssql) => ("VARBINARY(MAX)", SizeRule::None),
            (DataType::Blob, Sybase) => ("IMAGE", SizeRule::None),
            (DataType::Blob, _) => ("BLOB", SizeRule::None),

            (DataType::Json, Sybase | Oracle) => return None,
            (DataType::Json, Postgres) => ("JSONB", SizeRule::None),
            (DataType::Json, Mssql) => ("NVARCHAR(MAX)", SizeRule::None),
            (DataType::Json, Sqlite) => ("TEXT", SizeRule::None),
            (DataType::Json, Mysql) => ("JSON", SizeRule::None),
        };
        Some(spelled)
    }
}

/// One column of a `CREATE TABLE` / `ALTER TABLE`.
///
/// ```rust
/// use sql_dbal::schema::{ColumnDescriptor, DataType};
///
/// let id = ColumnDescriptor::new("id")
///     .datatype(DataType::Int)
///     .size(11)
///     .auto_increment()
///     .primary();
/// # let _ = id;
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnDescriptor {
    pub name: String,
    pub datatype: Option<DataType>,
    pub size: Option<u32>,
    pub scale: Option<u32>,
    /// `Some(true)` renders `NULL`, `Some(false)` renders `NOT NULL`.
    pub nullable: Option<bool>,
    pub primary: bool,
    pub auto_increment: bool,
    pub unique: bool,
    /// Raw SQL default expression.
    pub default: Option<String>,
}

impl ColumnDescriptor {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn datatype(mut self, datatype: DataType) -> Self {
        self.datatype = Some(datatype);
        self
    }

    #[must_use]
    pub fn size(mut self, size: u32) -> Self {
        self.size = Some(size);
        self
    }

    #[must_use]
    pub fn scale(mut self, scale: u32) -> Self {
        self.scale = Some(scale);
        self
    }

    #[must_use]
    pub fn null(mut self) -> Self {
        self.nullable = Some(true);
        self
    }

    #[must_use]
    pub fn not_null(mut self) -> Self {
        self.nullable = Some(false);
        self
    }

    #[must_use]
    pub fn primary(mut self) -> Self {
        self.primary = true;
        self
    }

    #[must_use]
    pub fn auto_increment(mut self) -> Self {
        self.auto_increment = true;
        self
    }

    #[must_use]
    pub fn unique(mut self) -> Self {
        self.unique = true;
        self
    }

    #[must_use]
    pub fn default_value(mut self, expr: impl Into<String>) -> Self {
        self.default = Some(expr.into());
        self
    }
}

/// One change applied by [`SchemaBuilder::alter`](super::SchemaBuilder::alter).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AlterOp {
    AddColumn(ColumnDescriptor),
    DropColumn(String),
    RenameColumn { from: String, to: String },
    ModifyColumn(ColumnDescriptor),
    /// A fragment from `primary` / `unique` / `foreign`.
    AddConstraint(String),
    DropConstraint(String),
}
