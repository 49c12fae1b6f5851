//! Declarative filter objects.
//!
//! Filters name a model and one of its fields or relations. They are lowered
//! to predicates by [`QueryBuilder`](crate::builder::QueryBuilder); a
//! many-to-many filter additionally asks for an INNER JOIN against the
//! relation's junction table.

use crate::expr::{ColumnReference, Predicate};
use sqlwizz_core::{Error, Model, RelationKind, Result, Value};

/// Declarative filter scoped to a model.
#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    /// `table.field = value`, or its negation
    Field {
        model: String,
        field: String,
        value: Value,
        negate: bool,
    },
    /// Owner foreign-key column equals `value`
    ManyToOne {
        model: String,
        relation: String,
        value: Value,
    },
    /// Junction foreign column equals `value`
    ManyToMany {
        model: String,
        relation: String,
        value: Value,
    },
    /// Any of the nested filters matches
    Any(Vec<Filter>),
}

impl Filter {
    pub fn field(model: impl Into<String>, field: impl Into<String>, value: impl Into<Value>) -> Self {
        Filter::Field {
            model: model.into(),
            field: field.into(),
            value: value.into(),
            negate: false,
        }
    }

    pub fn many_to_one(
        model: impl Into<String>,
        relation: impl Into<String>,
        value: impl Into<Value>,
    ) -> Self {
        Filter::ManyToOne {
            model: model.into(),
            relation: relation.into(),
            value: value.into(),
        }
    }

    pub fn many_to_many(
        model: impl Into<String>,
        relation: impl Into<String>,
        value: impl Into<Value>,
    ) -> Self {
        Filter::ManyToMany {
            model: model.into(),
            relation: relation.into(),
            value: value.into(),
        }
    }

    pub fn any(filters: Vec<Filter>) -> Self {
        Filter::Any(filters)
    }

    /// Negate a field filter. Other filters are returned unchanged.
    pub fn negated(mut self) -> Self {
        if let Filter::Field { negate, .. } = &mut self {
            *negate = !*negate;
        }
        self
    }

    /// Lower to a predicate over `model`.
    ///
    /// Names of many-to-many relations that need a junction join are pushed
    /// onto `junctions`, each at most once.
    pub fn lower(&self, model: &Model, junctions: &mut Vec<String>) -> Result<Predicate> {
        let table = model.table_name()?;
        match self {
            Filter::Field {
                model: scope,
                field,
                value,
                negate,
            } => {
                check_scope(scope, model)?;
                if model.get_field(field).is_none() {
                    return Err(Error::config(format!(
                        "model '{}' has no field '{}'",
                        model.name, field
                    )));
                }
                let predicate = Predicate::column_as_parameter(
                    ColumnReference::qualified(table, field.as_str()),
                    value.clone(),
                );
                Ok(if *negate { predicate.not() } else { predicate })
            }
            Filter::ManyToOne {
                model: scope,
                relation,
                value,
            } => {
                check_scope(scope, model)?;
                match &model.get_relation(relation)?.kind {
                    RelationKind::ManyToOne {
                        foreign_key_field, ..
                    } => Ok(Predicate::column_as_parameter(
                        ColumnReference::qualified(table, foreign_key_field.as_str()),
                        value.clone(),
                    )),
                    _ => Err(kind_mismatch(model, relation, "many-to-one")),
                }
            }
            Filter::ManyToMany {
                model: scope,
                relation,
                value,
            } => {
                check_scope(scope, model)?;
                match &model.get_relation(relation)?.kind {
                    RelationKind::ManyToMany {
                        junction_table,
                        foreign_key_field,
                        ..
                    } => {
                        if !junctions.iter().any(|name| name == relation) {
                            junctions.push(relation.clone());
                        }
                        Ok(Predicate::column_as_parameter(
                            ColumnReference::qualified(
                                junction_table.as_str(),
                                foreign_key_field.as_str(),
                            ),
                            value.clone(),
                        ))
                    }
                    _ => Err(kind_mismatch(model, relation, "many-to-many")),
                }
            }
            Filter::Any(filters) => {
                let lowered = filters
                    .iter()
                    .map(|filter| filter.lower(model, junctions))
                    .collect::<Result<Vec<_>>>()?;
                Predicate::or_all(lowered)
            }
        }
    }
}

fn check_scope(scope: &str, model: &Model) -> Result<()> {
    if scope == model.name {
        Ok(())
    } else {
        Err(Error::config(format!(
            "filter for model '{}' applied to '{}'",
            scope, model.name
        )))
    }
}

fn kind_mismatch(model: &Model, relation: &str, expected: &str) -> Error {
    Error::config(format!(
        "relation '{}' of '{}' is not {}",
        relation, model.name, expected
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expr::Render;
    use sqlwizz_core::{Field, Relation};

    fn film() -> Model {
        Model::new("Film")
            .table("film")
            .field(Field::integer("film_id").primary_key())
            .field(Field::string("rating"))
            .field(Field::integer("language_id"))
            .relation(Relation::many_to_one(
                "language",
                "Language",
                "language_id",
                "language_id",
            ))
            .relation(Relation::many_to_many(
                "actors",
                "Actor",
                "film_actor",
                "actor_id",
            ))
    }

    #[test]
    fn test_field_filter() {
        let mut junctions = Vec::new();
        let pred = Filter::field("Film", "rating", "R")
            .negated()
            .lower(&film(), &mut junctions)
            .unwrap();
        assert_eq!(pred.render().0, "NOT film.rating = ?");
        assert!(junctions.is_empty());
    }

    #[test]
    fn test_many_to_one_filter_uses_foreign_key_column() {
        let mut junctions = Vec::new();
        let pred = Filter::many_to_one("Film", "language", 1_i64)
            .lower(&film(), &mut junctions)
            .unwrap();
        assert_eq!(
            pred.render(),
            ("film.language_id = ?".to_string(), vec![Value::BigInt(1)])
        );
    }

    #[test]
    fn test_many_to_many_filter_requests_junction_once() {
        let mut junctions = Vec::new();
        let pred = Filter::any(vec![
            Filter::many_to_many("Film", "actors", 1_i64),
            Filter::many_to_many("Film", "actors", 2_i64),
        ])
        .lower(&film(), &mut junctions)
        .unwrap();
        assert_eq!(
            pred.render().0,
            "film_actor.actor_id = ? OR film_actor.actor_id = ?"
        );
        assert_eq!(junctions, vec!["actors".to_string()]);
    }

    #[test]
    fn test_scope_and_kind_errors() {
        let model = film();
        let mut junctions = Vec::new();
        assert!(
            Filter::field("Actor", "rating", "R")
                .lower(&model, &mut junctions)
                .unwrap_err()
                .is_config()
        );
        assert!(
            Filter::many_to_many("Film", "language", 1_i64)
                .lower(&model, &mut junctions)
                .unwrap_err()
                .is_config()
        );
        assert!(matches!(
            Filter::many_to_one("Film", "director", 1_i64).lower(&model, &mut junctions),
            Err(Error::RelationNotFound(_))
        ));
        assert!(Filter::any(vec![]).lower(&model, &mut junctions).is_err());
    }
}
