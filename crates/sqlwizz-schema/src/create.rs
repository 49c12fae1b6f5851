//! CREATE TABLE generation from model metadata.

use sqlwizz_core::{Error, Field, Model, RelationKind, Result};
use sqlwizz_query::{ColumnDefinition, CreateTableQuery};
use std::collections::HashSet;

/// Builder for the CREATE TABLE statement of one model.
#[derive(Debug)]
pub struct CreateTable<'m> {
    model: &'m Model,
    if_not_exists: bool,
}

impl<'m> CreateTable<'m> {
    /// Create a new CREATE TABLE builder.
    pub fn new(model: &'m Model) -> Self {
        Self {
            model,
            if_not_exists: false,
        }
    }

    /// Add IF NOT EXISTS clause.
    pub fn if_not_exists(mut self) -> Self {
        self.if_not_exists = true;
        self
    }

    /// Build the statement.
    pub fn build(&self) -> Result<CreateTableQuery> {
        let table = self.model.table_name()?;
        self.model.id_field()?;

        let columns = self.model.fields.iter().map(column_definition).collect();
        let mut query = CreateTableQuery::build(table, columns, self.if_not_exists)?;
        for field in &self.model.fields {
            if let Some((ref_table, ref_column)) = field.foreign_key_target() {
                query = query.foreign_key(field.name.as_str(), ref_table, ref_column);
            } else if let Some(reference) = &field.foreign_key {
                return Err(Error::config(format!(
                    "foreign key '{}' on {}.{} is not of the form table.column",
                    reference, table, field.name
                )));
            }
        }
        Ok(query)
    }
}

fn column_definition(field: &Field) -> ColumnDefinition {
    let mut def = ColumnDefinition::new(field.name.as_str(), field.kind.sql_name());
    if field.primary_key {
        def = def.primary_key();
    }
    if field.not_null {
        def = def.not_null();
    }
    if field.unique {
        def = def.unique();
    }
    def
}

/// Builds CREATE TABLE statements for a set of models.
///
/// Tables referenced by foreign keys are created before the tables that
/// reference them. Junction tables of many-to-many relations follow once
/// both sides exist.
#[derive(Debug, Default)]
pub struct SchemaBuilder<'m> {
    models: Vec<&'m Model>,
    if_not_exists: bool,
}

impl<'m> SchemaBuilder<'m> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add IF NOT EXISTS to every statement.
    pub fn if_not_exists(mut self) -> Self {
        self.if_not_exists = true;
        self
    }

    /// Add a model. Abstract models are skipped.
    pub fn create_table(mut self, model: &'m Model) -> Self {
        if model.is_abstract() {
            tracing::debug!(model = %model.name, "Skipping abstract model");
        } else {
            self.models.push(model);
        }
        self
    }

    /// Build all statements in dependency order.
    pub fn build(&self) -> Result<Vec<CreateTableQuery>> {
        let mut created: HashSet<&str> = HashSet::new();
        let mut pending: Vec<&Model> = self.models.clone();
        let mut statements = Vec::new();
        let known: HashSet<&str> = self
            .models
            .iter()
            .filter_map(|m| m.table_name.as_deref())
            .collect();

        while !pending.is_empty() {
            let ready = pending.iter().position(|model| {
                model
                    .fields
                    .iter()
                    .filter_map(Field::foreign_key_target)
                    .all(|(table, _)| {
                        created.contains(table)
                            || !known.contains(table)
                            || Some(table) == model.table_name.as_deref()
                    })
            });
            let Some(index) = ready else {
                let tables: Vec<&str> = pending
                    .iter()
                    .filter_map(|m| m.table_name.as_deref())
                    .collect();
                return Err(Error::config(format!(
                    "circular foreign keys between tables: {}",
                    tables.join(", ")
                )));
            };
            let model = pending.remove(index);
            let mut builder = CreateTable::new(model);
            if self.if_not_exists {
                builder = builder.if_not_exists();
            }
            statements.push(builder.build()?);
            created.insert(model.table_name()?);
        }

        let mut junctions: HashSet<&str> = HashSet::new();
        for model in &self.models {
            for relation in model.many_to_many_relations() {
                let Some(foreign) = self.models.iter().find(|m| m.name == relation.foreign_model)
                else {
                    continue;
                };
                let RelationKind::ManyToMany {
                    junction_table,
                    foreign_key_field,
                    ..
                } = &relation.kind
                else {
                    continue;
                };
                if !junctions.insert(junction_table.as_str()) {
                    continue;
                }
                statements.push(self.junction_table(
                    model,
                    foreign,
                    junction_table,
                    foreign_key_field,
                )?);
            }
        }
        Ok(statements)
    }

    fn junction_table(
        &self,
        owner: &Model,
        foreign: &Model,
        junction_table: &str,
        foreign_key_field: &str,
    ) -> Result<CreateTableQuery> {
        let owner_key = owner.id_field_name()?;
        let foreign_key = foreign.id_field_name()?;
        if owner_key == foreign_key_field {
            return Err(Error::config(format!(
                "junction table {} would name both of its columns '{}'",
                junction_table, owner_key
            )));
        }
        let columns = vec![
            ColumnDefinition::new(owner_key, "INTEGER").not_null(),
            ColumnDefinition::new(foreign_key_field, "INTEGER").not_null(),
        ];
        Ok(
            CreateTableQuery::build(junction_table, columns, self.if_not_exists)?
                .foreign_key(owner_key, owner.table_name()?, owner_key)
                .foreign_key(foreign_key_field, foreign.table_name()?, foreign_key),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlwizz_core::Relation;
    use sqlwizz_query::Render;

    fn language() -> Model {
        Model::new("Language")
            .table("language")
            .field(Field::integer("language_id").primary_key())
            .field(Field::string("name").not_null().unique())
    }

    fn actor() -> Model {
        Model::new("Actor")
            .table("actor")
            .field(Field::integer("actor_id").primary_key())
            .field(Field::string("last_name"))
    }

    fn film() -> Model {
        Model::new("Film")
            .table("film")
            .field(Field::integer("film_id").primary_key())
            .field(Field::string("title").not_null())
            .field(Field::datetime("last_update"))
            .field(Field::integer("language_id").foreign_key("language.language_id"))
            .relation(Relation::many_to_many(
                "actors",
                "Actor",
                "film_actor",
                "actor_id",
            ))
    }

    #[test]
    fn test_create_table_basic() {
        let model = film();
        let (sql, params) = CreateTable::new(&model).build().unwrap().render();
        assert!(params.is_empty());
        assert!(sql.starts_with("CREATE TABLE film ("));
        assert!(sql.contains("film_id INTEGER PRIMARY KEY"));
        assert!(sql.contains("title VARCHAR NOT NULL"));
        assert!(sql.contains("last_update DATETIME"));
        assert!(sql.contains("FOREIGN KEY (language_id) REFERENCES language (language_id)"));
    }

    #[test]
    fn test_create_table_if_not_exists() {
        let model = language();
        let (sql, _) = CreateTable::new(&model).if_not_exists().build().unwrap().render();
        assert!(sql.starts_with("CREATE TABLE IF NOT EXISTS language"));
        assert!(sql.contains("name VARCHAR NOT NULL UNIQUE"));
    }

    #[test]
    fn test_create_table_requires_primary_key() {
        let model = Model::new("Log").table("log").field(Field::string("line"));
        assert!(CreateTable::new(&model).build().unwrap_err().is_config());
    }

    #[test]
    fn test_schema_builder_orders_by_foreign_keys() {
        let (film, language, actor) = (film(), language(), actor());
        let abstract_base = Model::new("Base").field(Field::integer("id").primary_key());
        let statements = SchemaBuilder::new()
            .if_not_exists()
            .create_table(&film)
            .create_table(&abstract_base)
            .create_table(&language)
            .create_table(&actor)
            .build()
            .unwrap();

        let tables: Vec<&str> = statements.iter().map(|s| s.table.as_str()).collect();
        assert_eq!(tables, vec!["language", "film", "actor", "film_actor"]);

        let (junction, _) = statements[3].render();
        assert!(junction.contains("film_id INTEGER NOT NULL"));
        assert!(junction.contains("actor_id INTEGER NOT NULL"));
        assert!(junction.contains("FOREIGN KEY (actor_id) REFERENCES actor (actor_id)"));
    }

    #[test]
    fn test_self_referencing_junction_needs_distinct_columns() {
        let sequels = |column: &str| {
            Model::new("Film")
                .table("film")
                .field(Field::integer("film_id").primary_key())
                .relation(Relation::many_to_many("sequels", "Film", "film_sequel", column))
        };

        let clashing = sequels("film_id");
        let err = SchemaBuilder::new()
            .create_table(&clashing)
            .build()
            .unwrap_err();
        assert!(err.is_config());
        assert!(err.to_string().contains("film_sequel"));

        let distinct = sequels("sequel_id");
        let statements = SchemaBuilder::new().create_table(&distinct).build().unwrap();
        let (junction, _) = statements[1].render();
        assert!(junction.contains("FOREIGN KEY (film_id) REFERENCES film (film_id)"));
        assert!(junction.contains("FOREIGN KEY (sequel_id) REFERENCES film (film_id)"));
    }

    #[test]
    fn test_schema_builder_detects_cycles() {
        let a = Model::new("A")
            .table("a")
            .field(Field::integer("id").primary_key())
            .field(Field::integer("b_id").foreign_key("b.id"));
        let b = Model::new("B")
            .table("b")
            .field(Field::integer("id").primary_key())
            .field(Field::integer("a_id").foreign_key("a.id"));
        let err = SchemaBuilder::new()
            .create_table(&a)
            .create_table(&b)
            .build()
            .unwrap_err();
        assert!(err.to_string().contains("circular"));
    }
}
