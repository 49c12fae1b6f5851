//! Field and column definitions.

/// Column data type of a declared field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Integer,
    String,
    DateTime,
}

impl FieldKind {
    /// Get the SQL type name used in CREATE TABLE.
    pub const fn sql_name(&self) -> &'static str {
        match self {
            FieldKind::Integer => "INTEGER",
            FieldKind::String => "VARCHAR",
            FieldKind::DateTime => "DATETIME",
        }
    }
}

/// Column template declared on a model.
///
/// Templates are created once when a model is defined. Entities copy the
/// template into their own [`FieldValue`](crate::entity::FieldValue) slots, so
/// instance data never flows back into the model.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Field {
    /// Column name
    pub name: String,
    /// Column data type
    pub kind: FieldKind,
    /// Whether this is the primary key
    pub primary_key: bool,
    /// Whether the column is declared NOT NULL
    pub not_null: bool,
    /// Whether the column has a unique constraint
    pub unique: bool,
    /// Foreign key reference (`table.column`)
    pub foreign_key: Option<String>,
}

impl Field {
    /// Create a new field template of the given kind.
    pub fn new(name: impl Into<String>, kind: FieldKind) -> Self {
        Self {
            name: name.into(),
            kind,
            primary_key: false,
            not_null: false,
            unique: false,
            foreign_key: None,
        }
    }

    /// An `INTEGER` column.
    pub fn integer(name: impl Into<String>) -> Self {
        Self::new(name, FieldKind::Integer)
    }

    /// A `VARCHAR` column.
    pub fn string(name: impl Into<String>) -> Self {
        Self::new(name, FieldKind::String)
    }

    /// A `DATETIME` column, stored as ISO-8601 text.
    pub fn datetime(name: impl Into<String>) -> Self {
        Self::new(name, FieldKind::DateTime)
    }

    /// Mark as primary key.
    pub fn primary_key(mut self) -> Self {
        self.primary_key = true;
        self
    }

    /// Mark as NOT NULL.
    pub fn not_null(mut self) -> Self {
        self.not_null = true;
        self
    }

    /// Add a unique constraint.
    pub fn unique(mut self) -> Self {
        self.unique = true;
        self
    }

    /// Reference another table's column (`"language.language_id"`).
    pub fn foreign_key(mut self, reference: impl Into<String>) -> Self {
        self.foreign_key = Some(reference.into());
        self
    }

    /// Split the foreign key reference into `(table, column)`.
    pub fn foreign_key_target(&self) -> Option<(&str, &str)> {
        self.foreign_key
            .as_deref()
            .and_then(|reference| reference.split_once('.'))
    }
}
