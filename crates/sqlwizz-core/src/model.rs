//! Model metadata.
//!
//! A [`Model`] is the declarative schema of one entity type: its table, its
//! ordered fields and its relations. Models are built once during bootstrap
//! and shared (behind `Arc`) by the wizzard registry and every entity.
//!
//! ```ignore
//! let film = Model::new("Film")
//!     .table("film")
//!     .field(Field::integer("film_id").primary_key())
//!     .field(Field::string("title").not_null())
//!     .field(Field::integer("language_id").foreign_key("language.language_id"))
//!     .relation(Relation::many_to_one("language", "Language", "language_id", "language_id").eager())
//!     .relation(Relation::many_to_many("actors", "Actor", "film_actor", "actor_id"));
//! ```

use crate::error::{Error, RelationNotFoundError, Result};
use crate::field::Field;
use crate::relationship::Relation;

/// Declarative schema for one entity type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Model {
    /// Registry name
    pub name: String,
    /// Backing table; `None` for abstract models that are never registered
    pub table_name: Option<String>,
    pub fields: Vec<Field>,
    pub relations: Vec<Relation>,
    /// Columns searched by full-text search when the caller names none
    pub search_columns: Vec<String>,
}

impl Model {
    /// Start declaring a model. It stays abstract until [`Model::table`] is called.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            table_name: None,
            fields: Vec::new(),
            relations: Vec::new(),
            search_columns: Vec::new(),
        }
    }

    /// Set the backing table.
    pub fn table(mut self, table_name: impl Into<String>) -> Self {
        self.table_name = Some(table_name.into());
        self
    }

    /// Append a field.
    pub fn field(mut self, field: Field) -> Self {
        self.fields.push(field);
        self
    }

    /// Append a relation.
    pub fn relation(mut self, relation: Relation) -> Self {
        self.relations.push(relation);
        self
    }

    /// Declare the default full-text search columns.
    pub fn search_columns<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.search_columns = columns.into_iter().map(Into::into).collect();
        self
    }

    pub fn is_abstract(&self) -> bool {
        self.table_name.is_none()
    }

    /// The backing table, or a configuration error for abstract models.
    pub fn table_name(&self) -> Result<&str> {
        self.table_name
            .as_deref()
            .ok_or_else(|| Error::config(format!("model '{}' declares no table", self.name)))
    }

    /// The single primary key field.
    pub fn id_field(&self) -> Result<&Field> {
        let mut keys = self.fields.iter().filter(|f| f.primary_key);
        match (keys.next(), keys.next()) {
            (Some(field), None) => Ok(field),
            (None, _) => Err(Error::config(format!(
                "model '{}' declares no primary key",
                self.name
            ))),
            (Some(_), Some(_)) => Err(Error::config(format!(
                "model '{}' declares more than one primary key",
                self.name
            ))),
        }
    }

    /// Column name of the primary key.
    pub fn id_field_name(&self) -> Result<&str> {
        self.id_field().map(|f| f.name.as_str())
    }

    pub fn get_field(&self, name: &str) -> Option<&Field> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn find_relation(&self, name: &str) -> Option<&Relation> {
        self.relations.iter().find(|r| r.name == name)
    }

    /// Look up a relation, failing with [`Error::RelationNotFound`].
    pub fn get_relation(&self, name: &str) -> Result<&Relation> {
        self.find_relation(name).ok_or_else(|| {
            Error::RelationNotFound(RelationNotFoundError {
                model: self.name.clone(),
                relation: name.to_string(),
            })
        })
    }

    pub fn many_to_one_relations(&self) -> impl Iterator<Item = &Relation> {
        self.relations.iter().filter(|r| r.is_many_to_one())
    }

    pub fn one_to_many_relations(&self) -> impl Iterator<Item = &Relation> {
        self.relations.iter().filter(|r| r.is_one_to_many())
    }

    pub fn many_to_many_relations(&self) -> impl Iterator<Item = &Relation> {
        self.relations.iter().filter(|r| r.is_many_to_many())
    }

    /// Field names in declaration order.
    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|f| f.name.as_str())
    }
}
