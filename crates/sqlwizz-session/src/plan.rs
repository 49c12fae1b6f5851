//! Read planning and row hydration.
//!
//! A [`SelectPlan`] pairs a SELECT with the [`RowLayout`] describing how each
//! result column maps back onto the entity: owner fields first, then one
//! slice per eagerly joined many-to-one relation, then one column per eager
//! aggregate.

use crate::config::WizzardConfig;
use crate::options::{FetchOptions, RelationOptions};
use crate::registry::ModelRegistry;
use sqlwizz_core::{
    AggregateFunction, Aggregation, Entity, Error, Model, Relation, RelationData, RelationKind,
    Result, Row, Value,
};
use sqlwizz_query::{
    ColumnReference, Expr, FromClause, Function, GroupByClause, JoinCondition, JoinType, Predicate,
    Query, QueryBuilder, SelectClause, TableName,
};
use std::sync::Arc;

const OWNER_KEY_ALIAS: &str = "owner_pk";
const AGGREGATE_ALIAS: &str = "aggr";

#[derive(Debug, Clone)]
struct JoinedSlice {
    relation: String,
    model: Arc<Model>,
    start: usize,
}

#[derive(Debug, Clone)]
struct AggregateSlot {
    relation: String,
    index: usize,
    function: AggregateFunction,
}

/// Positional mapping from result columns to entity fields and relations.
#[derive(Debug, Clone)]
pub(crate) struct RowLayout {
    fields: Vec<String>,
    joined: Vec<JoinedSlice>,
    aggregates: Vec<AggregateSlot>,
}

impl RowLayout {
    fn new(fields: Vec<String>) -> Self {
        Self {
            fields,
            joined: Vec::new(),
            aggregates: Vec::new(),
        }
    }

    fn width(&self) -> usize {
        self.fields.len()
            + self
                .joined
                .iter()
                .map(|slice| slice.model.fields.len())
                .sum::<usize>()
            + self.aggregates.len()
    }

    /// Build an entity of `model` from one result row.
    pub(crate) fn hydrate(&self, model: &Arc<Model>, row: &Row) -> Result<Entity> {
        let expected = self.width();
        if row.len() < expected {
            return Err(Error::database(format!(
                "result row for '{}' has {} columns, expected {}",
                model.name,
                row.len(),
                expected
            )));
        }
        let value_at = |index: usize| row.get(index).cloned().unwrap_or(Value::Null);

        let mut entity = Entity::new(Arc::clone(model));
        for (index, name) in self.fields.iter().enumerate() {
            entity.set(name, value_at(index))?;
        }

        for slice in &self.joined {
            let width = slice.model.fields.len();
            let range = slice.start..slice.start + width;
            let data = if range.clone().all(|i| value_at(i).is_null()) {
                RelationData::One(None)
            } else {
                let mut foreign = Entity::new(Arc::clone(&slice.model));
                for (field, index) in slice.model.fields.iter().zip(range) {
                    foreign.set(&field.name, value_at(index))?;
                }
                RelationData::One(Some(Box::new(foreign)))
            };
            entity.set_relation(&slice.relation, data)?;
        }

        for slot in &self.aggregates {
            let value = aggregate_value(slot.function, value_at(slot.index));
            entity.set_relation(&slot.relation, RelationData::Aggregate(value))?;
        }
        Ok(entity)
    }
}

/// A missing aggregate row counts as zero; other aggregates stay NULL.
pub(crate) fn aggregate_value(function: AggregateFunction, value: Value) -> Value {
    if value.is_null() && function == AggregateFunction::Count {
        Value::BigInt(0)
    } else {
        value
    }
}

/// A SELECT plus how to read its rows.
#[derive(Debug, Clone)]
pub(crate) struct SelectPlan {
    pub query: Query,
    pub model: Arc<Model>,
    pub layout: RowLayout,
}

impl SelectPlan {
    pub(crate) fn hydrate(&self, row: &Row) -> Result<Entity> {
        self.layout.hydrate(&self.model, row)
    }
}

/// What a relation needs after the primary query.
#[derive(Debug, Clone)]
pub(crate) enum FollowUp {
    /// Known without querying
    Done(RelationData),
    /// At most one related row
    One(SelectPlan),
    /// A collection of related rows
    Many(SelectPlan),
    /// A single aggregate scalar
    Aggregate {
        query: Query,
        function: AggregateFunction,
    },
}

/// True when a relation is loaded by a follow-up query rather than the
/// primary statement. Collections without an aggregation always are.
pub(crate) fn needs_follow_up(relation: &Relation) -> bool {
    relation.lazy_load || (!relation.is_many_to_one() && relation.aggregation().is_none())
}

/// Owner columns that the follow-ups run for `options` are keyed by. They
/// are projected even when `options` narrows the field list.
fn follow_up_keys<'m>(model: &'m Model, options: &FetchOptions) -> Result<Vec<&'m str>> {
    let mut keys = Vec::new();
    for relation in &model.relations {
        if !needs_follow_up(relation) || options.skips(&relation.name) {
            continue;
        }
        let key = match &relation.kind {
            RelationKind::ManyToOne {
                foreign_key_field, ..
            } => match model.get_field(foreign_key_field) {
                Some(field) => field.name.as_str(),
                None => continue,
            },
            _ => model.id_field_name()?,
        };
        keys.push(key);
    }
    Ok(keys)
}

/// Builds statements from model metadata and registered foreign models.
pub(crate) struct Planner<'a> {
    registry: &'a ModelRegistry,
    config: &'a WizzardConfig,
}

impl<'a> Planner<'a> {
    pub(crate) fn new(registry: &'a ModelRegistry, config: &'a WizzardConfig) -> Self {
        Self { registry, config }
    }

    /// Primary SELECT for `model`, with eager joins and aggregate subqueries.
    pub(crate) fn select(
        &self,
        model: &Arc<Model>,
        options: &FetchOptions,
        id: Option<&Value>,
    ) -> Result<SelectPlan> {
        let table = model.table_name()?;
        let mut fields = options.projection(model)?;
        for key in follow_up_keys(model, options)? {
            if !fields.contains(&key) {
                tracing::debug!(column = key, "Projecting key column for a follow-up");
                fields.push(key);
            }
        }
        let mut builder = options.apply(QueryBuilder::new(model).select(&fields), self.config);
        if let Some(id) = id {
            builder = builder.by_id(id.clone());
        }
        let mut query = builder.build()?;
        let mut layout = RowLayout::new(fields.iter().map(|f| (*f).to_string()).collect());
        let mut sources = vec![table.to_string()];

        for relation in &model.relations {
            if relation.lazy_load || options.skips(&relation.name) {
                continue;
            }
            match &relation.kind {
                RelationKind::ManyToOne {
                    foreign_key_field,
                    foreign_model_key_field,
                    ..
                } => {
                    let foreign = self.registry.get(&relation.foreign_model)?;
                    let foreign_table = foreign.table_name()?;
                    let (target, source) = if sources.iter().any(|s| s == foreign_table) {
                        let alias = format!("{}_{}", table, relation.name);
                        (TableName::new(foreign_table).alias(alias.as_str()), alias)
                    } else {
                        (TableName::new(foreign_table), foreign_table.to_string())
                    };
                    let on = Predicate::equals(
                        ColumnReference::qualified(table, foreign_key_field.as_str()),
                        ColumnReference::qualified(source.as_str(), foreign_model_key_field.as_str()),
                    );
                    query.from = query.from.clone().join(
                        JoinType::LeftOuter,
                        target,
                        Some(JoinCondition::On(on)),
                    )?;
                    let start = query.select.items().len();
                    for field in &foreign.fields {
                        query.select.push(Expr::Column(ColumnReference::qualified(
                            source.as_str(),
                            field.name.as_str(),
                        )));
                    }
                    tracing::debug!(
                        relation = %relation.name,
                        table = %source,
                        "Joining many-to-one relation"
                    );
                    layout.joined.push(JoinedSlice {
                        relation: relation.name.clone(),
                        model: foreign,
                        start,
                    });
                    sources.push(source);
                }
                _ => {
                    let Some(aggregation) = relation.aggregation() else {
                        continue;
                    };
                    let alias = format!("{}_{}", table, relation.name);
                    let subquery = self
                        .aggregate_subquery(model, relation, aggregation)?
                        .as_subquery(alias.as_str());
                    let on = Predicate::equals(
                        ColumnReference::qualified(alias.as_str(), OWNER_KEY_ALIAS),
                        ColumnReference::qualified(table, model.id_field_name()?),
                    );
                    query.from = query.from.clone().join(
                        JoinType::LeftOuter,
                        subquery,
                        Some(JoinCondition::On(on)),
                    )?;
                    layout.aggregates.push(AggregateSlot {
                        relation: relation.name.clone(),
                        index: query.select.items().len(),
                        function: aggregation.function,
                    });
                    query
                        .select
                        .push(Expr::Column(ColumnReference::qualified(alias.as_str(), AGGREGATE_ALIAS)));
                    tracing::debug!(
                        relation = %relation.name,
                        function = aggregation.function.as_str(),
                        "Joining aggregate subquery"
                    );
                    sources.push(alias);
                }
            }
        }

        Ok(SelectPlan {
            query,
            model: Arc::clone(model),
            layout,
        })
    }

    /// `SELECT COUNT(table.pk)` sharing the filter of `options`.
    pub(crate) fn count(&self, model: &Model, options: &FetchOptions) -> Result<Query> {
        options.apply_filter(QueryBuilder::new(model)).build_count()
    }

    /// Grouped `owner key, AGG(...)` rows over the related table.
    fn aggregate_subquery(
        &self,
        model: &Model,
        relation: &Relation,
        aggregation: &Aggregation,
    ) -> Result<Query> {
        let (source, owner_column) = self.collection_source(model, relation)?;
        let owner = ColumnReference::qualified(source.name.as_str(), owner_column.as_str());
        let select = SelectClause::new([
            Some(Expr::Column(owner.clone().alias(OWNER_KEY_ALIAS))),
            Some(Expr::Function(
                self.aggregate_function(relation, aggregation)?
                    .alias(AGGREGATE_ALIAS),
            )),
        ])?;
        let from = self.collection_from(&source, relation, aggregation)?;
        Ok(Query::new(select, from).with_group_by(GroupByClause::new(vec![Expr::Column(owner)])))
    }

    /// Where the rows of a collection live, and the column naming the owner.
    fn collection_source(&self, model: &Model, relation: &Relation) -> Result<(TableName, String)> {
        match &relation.kind {
            RelationKind::OneToMany {
                foreign_key_field, ..
            } => {
                let foreign = self.registry.get(&relation.foreign_model)?;
                let back = match foreign_key_field {
                    Some(column) => column.clone(),
                    None => model.id_field_name()?.to_string(),
                };
                Ok((TableName::new(foreign.table_name()?), back))
            }
            RelationKind::ManyToMany { junction_table, .. } => Ok((
                TableName::new(junction_table.as_str()),
                model.id_field_name()?.to_string(),
            )),
            RelationKind::ManyToOne { .. } => Err(Error::config(format!(
                "relation '{}' of '{}' is not a collection",
                relation.name, model.name
            ))),
        }
    }

    /// FROM for aggregating a collection. A many-to-many aggregate over a
    /// column reaches through the junction into the foreign table.
    fn collection_from(
        &self,
        source: &TableName,
        relation: &Relation,
        aggregation: &Aggregation,
    ) -> Result<FromClause> {
        let from = FromClause::new(source.clone());
        match (&relation.kind, &aggregation.column) {
            (
                RelationKind::ManyToMany {
                    junction_table,
                    foreign_key_field,
                    ..
                },
                Some(_),
            ) => {
                let foreign = self.registry.get(&relation.foreign_model)?;
                let foreign_table = foreign.table_name()?;
                let on = Predicate::equals(
                    ColumnReference::qualified(foreign_table, foreign.id_field_name()?),
                    ColumnReference::qualified(junction_table.as_str(), foreign_key_field.as_str()),
                );
                from.join(JoinType::Inner, foreign_table, Some(JoinCondition::On(on)))
            }
            _ => Ok(from),
        }
    }

    fn aggregate_function(&self, relation: &Relation, aggregation: &Aggregation) -> Result<Function> {
        let argument = match &aggregation.column {
            None => Expr::star(),
            Some(column) => {
                let foreign = self.registry.get(&relation.foreign_model)?;
                Expr::Column(ColumnReference::qualified(foreign.table_name()?, column.as_str()))
            }
        };
        Ok(Function::new(aggregation.function.as_str(), vec![argument]))
    }

    /// Follow-up load of one relation of `owner`.
    pub(crate) fn follow_up(
        &self,
        owner: &Entity,
        relation: &Relation,
        options: Option<&RelationOptions>,
    ) -> Result<FollowUp> {
        let foreign = self.registry.get(&relation.foreign_model)?;
        let foreign_table = foreign.table_name()?;

        if let RelationKind::ManyToOne {
            foreign_key_field,
            foreign_model_key_field,
            ..
        } = &relation.kind
        {
            let key = owner.get(foreign_key_field).cloned().unwrap_or(Value::Null);
            if key.is_null() {
                return Ok(FollowUp::Done(RelationData::One(None)));
            }
            let query = QueryBuilder::new(&foreign)
                .filter(Predicate::column_as_parameter(
                    ColumnReference::qualified(foreign_table, foreign_model_key_field.as_str()),
                    key,
                ))
                .build()?;
            return Ok(FollowUp::One(plain_plan(query, foreign)));
        }

        let owner_id = owner.id()?.clone();
        if owner_id.is_null() {
            return Ok(FollowUp::Done(match relation.aggregation() {
                Some(aggregation) => {
                    RelationData::Aggregate(aggregate_value(aggregation.function, Value::Null))
                }
                None => RelationData::Many(Vec::new()),
            }));
        }
        let (source, owner_column) = self.collection_source(owner.model(), relation)?;
        let owner_condition = Predicate::column_as_parameter(
            ColumnReference::qualified(source.name.as_str(), owner_column.as_str()),
            owner_id,
        );

        if let Some(aggregation) = relation.aggregation() {
            let select = SelectClause::new([Some(Expr::Function(
                self.aggregate_function(relation, aggregation)?,
            ))])?;
            let from = self.collection_from(&source, relation, aggregation)?;
            return Ok(FollowUp::Aggregate {
                query: Query::new(select, from).with_where(owner_condition),
                function: aggregation.function,
            });
        }

        let mut builder = QueryBuilder::new(&foreign).filter(owner_condition);
        if let Some(options) = options {
            builder = options.apply(builder);
        }
        let mut query = builder.build()?;
        if let RelationKind::ManyToMany {
            junction_table,
            foreign_key_field,
            ..
        } = &relation.kind
        {
            if !query.from.table.joins_table(junction_table) {
                let on = Predicate::equals(
                    ColumnReference::qualified(junction_table.as_str(), foreign_key_field.as_str()),
                    ColumnReference::qualified(foreign_table, foreign.id_field_name()?),
                );
                query.from = query.from.clone().join(
                    JoinType::Inner,
                    junction_table.as_str(),
                    Some(JoinCondition::On(on)),
                )?;
            }
        }
        Ok(FollowUp::Many(plain_plan(query, foreign)))
    }

    /// `COUNT(*)` of the rows related to `owner`.
    pub(crate) fn count_related(&self, owner: &Entity, relation: &Relation) -> Result<Query> {
        let (source, owner_column) = self.collection_source(owner.model(), relation)?;
        let condition = Predicate::column_as_parameter(
            ColumnReference::qualified(source.name.as_str(), owner_column.as_str()),
            owner.id()?.clone(),
        );
        let select =
            SelectClause::new([Some(Expr::Function(Function::new("COUNT", vec![Expr::star()])))])?;
        Ok(Query::new(select, FromClause::new(source)).with_where(condition))
    }

    /// Foreign ids currently linked to `owner_id` through a junction table.
    pub(crate) fn junction_ids(
        &self,
        model: &Model,
        relation: &Relation,
        owner_id: &Value,
    ) -> Result<Query> {
        let RelationKind::ManyToMany {
            junction_table,
            foreign_key_field,
            ..
        } = &relation.kind
        else {
            return Err(Error::config(format!(
                "relation '{}' of '{}' is not many-to-many",
                relation.name, model.name
            )));
        };
        let select = SelectClause::new([Some(Expr::Column(ColumnReference::qualified(
            junction_table.as_str(),
            foreign_key_field.as_str(),
        )))])?;
        let condition = Predicate::column_as_parameter(
            ColumnReference::qualified(junction_table.as_str(), model.id_field_name()?),
            owner_id.clone(),
        );
        Ok(Query::new(select, FromClause::new(junction_table.as_str())).with_where(condition))
    }

    /// `SELECT table.select_column ... WHERE table.filter_column = ? LIMIT 1`.
    pub(crate) fn lookup(
        &self,
        model: &Model,
        select_column: &str,
        filter_column: &str,
        value: Value,
    ) -> Result<Query> {
        let table = model.table_name()?;
        for column in [select_column, filter_column] {
            if model.get_field(column).is_none() {
                return Err(Error::config(format!(
                    "model '{}' has no field '{}'",
                    model.name, column
                )));
            }
        }
        QueryBuilder::new(model)
            .select(&[select_column])
            .filter(Predicate::column_as_parameter(
                ColumnReference::qualified(table, filter_column),
                value,
            ))
            .paginate(1, None)
            .build()
    }
}

/// Plan reading every field of `model` and nothing else.
fn plain_plan(query: Query, model: Arc<Model>) -> SelectPlan {
    let layout = RowLayout::new(model.field_names().map(str::to_string).collect());
    SelectPlan {
        query,
        model,
        layout,
    }
}
