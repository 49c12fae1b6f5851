//! Error types for SQLWizz operations.

use crate::value::Value;
use std::fmt;

/// The primary error type for all SQLWizz operations.
#[derive(Debug)]
pub enum Error {
    /// No model is registered under the requested name
    ModelNotFound(ModelNotFoundError),
    /// The model declares no relation with the requested name
    RelationNotFound(RelationNotFoundError),
    /// A lookup by primary key matched no row
    ObjectNotFound(ObjectNotFoundError),
    /// A many-to-one display value could not be resolved to a foreign id
    ForeignIdNotFound(ForeignIdNotFoundError),
    /// Statement execution failed; carries the rendered SQL
    Sql(SqlError),
    /// Failure reported by a database collaborator
    Database(DatabaseError),
    /// Type conversion errors
    Type(TypeError),
    /// Configuration and caller errors detected before any I/O
    Config(ConfigError),
    /// Serialization/deserialization errors
    Serde(String),
}

#[derive(Debug)]
pub struct ModelNotFoundError {
    pub name: String,
    pub registered: Vec<String>,
}

#[derive(Debug)]
pub struct RelationNotFoundError {
    pub model: String,
    pub relation: String,
}

#[derive(Debug)]
pub struct ObjectNotFoundError {
    pub model: String,
    pub id: Value,
}

#[derive(Debug)]
pub struct ForeignIdNotFoundError {
    pub relation: String,
    pub lookup_column: String,
    pub value: Value,
}

#[derive(Debug)]
pub struct SqlError {
    pub sql: String,
    pub params: Vec<Value>,
    pub message: String,
    pub source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

#[derive(Debug)]
pub struct DatabaseError {
    pub message: String,
    pub source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

#[derive(Debug)]
pub struct TypeError {
    pub expected: &'static str,
    pub actual: String,
    pub column: Option<String>,
}

#[derive(Debug)]
pub struct ConfigError {
    pub message: String,
    pub source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl Error {
    /// Shorthand for a configuration error without a source.
    pub fn config(message: impl Into<String>) -> Self {
        Error::Config(ConfigError {
            message: message.into(),
            source: None,
        })
    }

    /// Shorthand for a collaborator failure without a source.
    pub fn database(message: impl Into<String>) -> Self {
        Error::Database(DatabaseError {
            message: message.into(),
            source: None,
        })
    }

    /// Wrap an execution failure with the statement that triggered it.
    pub fn sql(sql: impl Into<String>, params: Vec<Value>, cause: Error) -> Self {
        Error::Sql(SqlError {
            sql: sql.into(),
            params,
            message: cause.to_string(),
            source: Some(Box::new(cause)),
        })
    }

    /// Get the SQL text associated with this error, if any.
    pub fn sql_text(&self) -> Option<&str> {
        match self {
            Error::Sql(e) => Some(&e.sql),
            _ => None,
        }
    }

    /// True for the two "row does not exist" variants.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::ObjectNotFound(_) | Error::ForeignIdNotFound(_))
    }

    /// True for errors raised before touching the database.
    pub fn is_config(&self) -> bool {
        matches!(self, Error::Config(_))
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::ModelNotFound(e) => write!(f, "Model not found: {}", e),
            Error::RelationNotFound(e) => write!(f, "Relation not found: {}", e),
            Error::ObjectNotFound(e) => write!(f, "Object not found: {}", e),
            Error::ForeignIdNotFound(e) => write!(f, "Foreign id not found: {}", e),
            Error::Sql(e) => write!(f, "SQL error: {}", e),
            Error::Database(e) => write!(f, "Database error: {}", e.message),
            Error::Type(e) => write!(f, "Type error: {}", e),
            Error::Config(e) => write!(f, "Configuration error: {}", e.message),
            Error::Serde(msg) => write!(f, "Serialization error: {}", msg),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Sql(e) => e
                .source
                .as_deref()
                .map(|err| err as &(dyn std::error::Error + 'static)),
            Error::Database(e) => e
                .source
                .as_deref()
                .map(|err| err as &(dyn std::error::Error + 'static)),
            Error::Config(e) => e
                .source
                .as_deref()
                .map(|err| err as &(dyn std::error::Error + 'static)),
            _ => None,
        }
    }
}

impl fmt::Display for ModelNotFoundError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "'{}' is not registered (registered models: {})",
            self.name,
            self.registered.join(", ")
        )
    }
}

impl fmt::Display for RelationNotFoundError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "model '{}' has no relation '{}'", self.model, self.relation)
    }
}

impl fmt::Display for ObjectNotFoundError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "no {} with id {}", self.model, self.id)
    }
}

impl fmt::Display for ForeignIdNotFoundError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "relation '{}': no row where {} = {}",
            self.relation, self.lookup_column, self.value
        )
    }
}

impl fmt::Display for SqlError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}\nSQL: {}", self.message, self.sql)
    }
}

impl fmt::Display for DatabaseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl fmt::Display for TypeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(col) = &self.column {
            write!(
                f,
                "expected {} for column '{}', found {}",
                self.expected, col, self.actual
            )
        } else {
            write!(f, "expected {}, found {}", self.expected, self.actual)
        }
    }
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl From<ModelNotFoundError> for Error {
    fn from(err: ModelNotFoundError) -> Self {
        Error::ModelNotFound(err)
    }
}

impl From<RelationNotFoundError> for Error {
    fn from(err: RelationNotFoundError) -> Self {
        Error::RelationNotFound(err)
    }
}

impl From<ObjectNotFoundError> for Error {
    fn from(err: ObjectNotFoundError) -> Self {
        Error::ObjectNotFound(err)
    }
}

impl From<ForeignIdNotFoundError> for Error {
    fn from(err: ForeignIdNotFoundError) -> Self {
        Error::ForeignIdNotFound(err)
    }
}

impl From<SqlError> for Error {
    fn from(err: SqlError) -> Self {
        Error::Sql(err)
    }
}

impl From<DatabaseError> for Error {
    fn from(err: DatabaseError) -> Self {
        Error::Database(err)
    }
}

impl From<TypeError> for Error {
    fn from(err: TypeError) -> Self {
        Error::Type(err)
    }
}

impl From<ConfigError> for Error {
    fn from(err: ConfigError) -> Self {
        Error::Config(err)
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Serde(err.to_string())
    }
}

/// Result type alias for SQLWizz operations.
pub type Result<T> = std::result::Result<T, Error>;
