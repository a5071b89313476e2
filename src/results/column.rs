use serde::{Deserialize, Serialize};

/// Metadata for one result column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnInfo {
    pub name: String,
    /// Type as declared by the driver, when it reports one.
    pub declared_type: Option<String>,
    /// Maximum length in bytes/characters, when known.
    pub max_length: Option<usize>,
}

impl ColumnInfo {
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        declared_type: Option<String>,
        max_length: Option<usize>,
    ) -> Self {
        Self {
            name: name.into(),
            declared_type,
            max_length,
        }
    }

    #[must_use]
    pub fn named(name: impl Into<String>) -> Self {
        Self::new(name, None, None)
    }
}

/// Which [`ColumnInfo`] field `get_col_info` reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ColumnField {
    #[default]
    Name,
    DeclaredType,
    MaxLength,
}

impl ColumnField {
    pub(crate) fn read(self, column: &ColumnInfo) -> Option<String> {
        match self {
            ColumnField::Name => Some(column.name.clone()),
            ColumnField::DeclaredType => column.declared_type.clone(),
            ColumnField::MaxLength => column.max_length.map(|len| len.to_string()),
        }
    }
}
