//! The query wizzard.

use crate::config::WizzardConfig;
use crate::link::{LinkPlan, parse_id_list};
use crate::options::{FetchOptions, SearchResult};
use crate::plan::{FollowUp, Planner, aggregate_value, needs_follow_up};
use crate::registry::{ModelObserver, ModelRegistry};
use sqlwizz_core::{
    Database, Entity, Error, ForeignIdNotFoundError, Model, ObjectNotFoundError, Relation,
    RelationData, RelationKind, Result, Row, Value,
};
use sqlwizz_query::{
    ColumnReference, DeleteQuery, InsertQuery, Predicate, Render, Statement, UpdateQuery,
};
use sqlwizz_schema::SchemaBuilder;
use std::sync::Arc;

/// Resolved write data: plain columns plus wanted many-to-many ids.
#[derive(Debug, Default)]
struct WritePlan {
    columns: Vec<(String, Value)>,
    links: Vec<(Relation, Vec<Value>)>,
}

impl WritePlan {
    fn set_column(&mut self, name: &str, value: Value) {
        match self.columns.iter_mut().find(|(column, _)| column == name) {
            Some(slot) => slot.1 = value,
            None => self.columns.push((name.to_string(), value)),
        }
    }
}

/// Plans, executes and hydrates queries for registered models over one
/// [`Database`].
///
/// All calls are blocking and run one after another on the same cursor.
/// Multi-statement writes run inside [`transaction`](Self::transaction):
/// they commit once every statement succeeded and roll back on the first
/// failure.
///
/// # Example
///
/// ```ignore
/// let mut wizzard = QueryWizzard::new(db);
/// wizzard.register_model(language);
/// wizzard.register_model(film);
///
/// let film = wizzard.get_by_id("Film", 7, &FetchOptions::new())?;
/// let id = wizzard.create("Film", [("title", Value::from("Alien")), ("language", Value::from("English"))])?;
/// ```
pub struct QueryWizzard<D: Database> {
    db: D,
    config: WizzardConfig,
    registry: ModelRegistry,
    last_sql: Option<String>,
    last_insert_id: Option<Value>,
}

impl<D: Database> QueryWizzard<D> {
    pub fn new(db: D) -> Self {
        Self {
            db,
            config: WizzardConfig::default(),
            registry: ModelRegistry::new(),
            last_sql: None,
            last_insert_id: None,
        }
    }

    /// Create a wizzard with a validated configuration.
    pub fn with_config(db: D, config: WizzardConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            ..Self::new(db)
        })
    }

    // ========================================================================
    // Registry and accessors
    // ========================================================================

    /// Register a model. See [`ModelRegistry::register`].
    pub fn register_model(&mut self, model: Model) -> bool {
        self.registry.register(model)
    }

    pub fn registry(&self) -> &ModelRegistry {
        &self.registry
    }

    pub fn get_model(&self, name: &str) -> Result<Arc<Model>> {
        self.registry.get(name)
    }

    pub fn config(&self) -> &WizzardConfig {
        &self.config
    }

    pub fn database(&self) -> &D {
        &self.db
    }

    pub fn database_mut(&mut self) -> &mut D {
        &mut self.db
    }

    pub fn into_database(self) -> D {
        self.db
    }

    /// Text of the most recently executed statement.
    pub fn last_sql(&self) -> Option<&str> {
        self.last_sql.as_deref()
    }

    /// Id returned after the most recent [`create`](Self::create).
    pub fn last_insert_id(&self) -> Option<&Value> {
        self.last_insert_id.as_ref()
    }

    fn planner(&self) -> Planner<'_> {
        Planner::new(&self.registry, &self.config)
    }

    // ========================================================================
    // Execution
    // ========================================================================

    fn run(&mut self, sql: &str, params: &[Value]) -> Result<()> {
        if self.config.log_params {
            tracing::trace!(sql = %sql, params = ?params, "Executing statement");
        } else {
            tracing::trace!(sql = %sql, params = params.len(), "Executing statement");
        }
        self.last_sql = Some(sql.to_string());
        let bound = (!params.is_empty()).then_some(params);
        self.db
            .execute(sql, bound)
            .map_err(|e| Error::sql(sql, params.to_vec(), e))
    }

    /// Render and execute one statement.
    pub fn execute(&mut self, statement: &impl Render) -> Result<()> {
        let (sql, params) = statement.render();
        self.run(&sql, &params)
    }

    /// Execute and fetch every row.
    pub fn fetch_all(&mut self, statement: &impl Render) -> Result<Vec<Row>> {
        let (sql, params) = statement.render();
        self.run(&sql, &params)?;
        self.db.fetchall().map_err(|e| Error::sql(sql, params, e))
    }

    /// Execute and fetch the first row.
    pub fn fetch_one(&mut self, statement: &impl Render) -> Result<Option<Row>> {
        let (sql, params) = statement.render();
        self.run(&sql, &params)?;
        self.db.fetchone().map_err(|e| Error::sql(sql, params, e))
    }

    /// Run `f` as one transaction.
    ///
    /// Commits when `f` succeeds. On the first error the transaction is
    /// rolled back and that error is returned.
    pub fn transaction<T, F>(&mut self, f: F) -> Result<T>
    where
        F: FnOnce(&mut Self) -> Result<T>,
    {
        match f(self) {
            Ok(value) => match self.db.commit() {
                Ok(()) => {
                    tracing::debug!("Transaction committed");
                    Ok(value)
                }
                Err(e) => {
                    self.rollback_after(&e);
                    Err(e)
                }
            },
            Err(e) => {
                self.rollback_after(&e);
                Err(e)
            }
        }
    }

    fn rollback_after(&mut self, cause: &Error) {
        tracing::debug!(error = %cause, "Rolling back transaction");
        if let Err(rollback) = self.db.rollback() {
            tracing::error!(error = %rollback, cause = %cause, "Rollback failed");
        }
    }

    /// Execute `statements` in order as one transaction.
    #[tracing::instrument(level = "debug", skip(self, statements), fields(count = statements.len()))]
    pub fn execute_in_transaction(&mut self, statements: &[Statement]) -> Result<()> {
        self.transaction(|wizzard| {
            for statement in statements {
                wizzard.execute(statement)?;
            }
            Ok(())
        })
    }

    // ========================================================================
    // Reads
    // ========================================================================

    /// Load one entity by primary key, failing with
    /// [`Error::ObjectNotFound`] when no row matches.
    #[tracing::instrument(level = "debug", skip(self, id, options))]
    pub fn get_by_id(
        &mut self,
        model: &str,
        id: impl Into<Value>,
        options: &FetchOptions,
    ) -> Result<Entity> {
        let id = id.into();
        match self.try_get_by_id(model, id.clone(), options)? {
            Some(entity) => Ok(entity),
            None => Err(Error::ObjectNotFound(ObjectNotFoundError {
                model: model.to_string(),
                id,
            })),
        }
    }

    /// Load one entity by primary key, or `None`.
    pub fn try_get_by_id(
        &mut self,
        model: &str,
        id: impl Into<Value>,
        options: &FetchOptions,
    ) -> Result<Option<Entity>> {
        let model = self.registry.get(model)?;
        let id = id.into();
        let plan = self.planner().select(&model, options, Some(&id))?;
        let Some(row) = self.fetch_one(&plan.query)? else {
            return Ok(None);
        };
        let mut entity = plan.hydrate(&row)?;
        self.load_follow_ups(&mut entity, options)?;
        Ok(Some(entity))
    }

    /// First entity matching `options`, or `None`.
    #[tracing::instrument(level = "debug", skip(self, options))]
    pub fn get(&mut self, model: &str, options: &FetchOptions) -> Result<Option<Entity>> {
        let model = self.registry.get(model)?;
        let plan = self.planner().select(&model, options, None)?;
        let Some(row) = self.fetch_one(&plan.query)? else {
            return Ok(None);
        };
        let mut entity = plan.hydrate(&row)?;
        self.load_follow_ups(&mut entity, options)?;
        Ok(Some(entity))
    }

    /// Every entity matching `options`.
    #[tracing::instrument(level = "debug", skip(self, options))]
    pub fn get_all(&mut self, model: &str, options: &FetchOptions) -> Result<Vec<Entity>> {
        let model = self.registry.get(model)?;
        let plan = self.planner().select(&model, options, None)?;
        let rows = self.fetch_all(&plan.query)?;
        let mut entities = rows
            .iter()
            .map(|row| plan.hydrate(row))
            .collect::<Result<Vec<_>>>()?;
        for entity in &mut entities {
            self.load_follow_ups(entity, options)?;
        }
        tracing::debug!(count = entities.len(), "Loaded entities");
        Ok(entities)
    }

    /// [`get_all`](Self::get_all) plus the unpaged number of matches.
    pub fn get_all_with_count(
        &mut self,
        model: &str,
        options: &FetchOptions,
    ) -> Result<(Vec<Entity>, u64)> {
        let entities = self.get_all(model, options)?;
        let count = self.count(model, options)?;
        Ok((entities, count))
    }

    /// Number of rows matching the filter of `options`, ignoring paging.
    #[tracing::instrument(level = "debug", skip(self, options))]
    pub fn count(&mut self, model: &str, options: &FetchOptions) -> Result<u64> {
        let model = self.registry.get(model)?;
        let query = self.planner().count(&model, options)?;
        let row = self.fetch_one(&query)?;
        scalar_count(row)
    }

    /// Number of rows in a collection relation of `entity`.
    pub fn count_related(&mut self, entity: &Entity, relation: &str) -> Result<u64> {
        let relation = entity.model().get_relation(relation)?;
        let query = self.planner().count_related(entity, relation)?;
        let row = self.fetch_one(&query)?;
        scalar_count(row)
    }

    /// Full-text search over the model's search columns, or
    /// `options.search_columns` when given, ANDed with any filter.
    #[tracing::instrument(level = "debug", skip(self, options))]
    pub fn search(
        &mut self,
        model: &str,
        text: &str,
        options: &FetchOptions,
    ) -> Result<SearchResult> {
        let options = FetchOptions {
            search: Some(text.to_string()),
            ..options.clone()
        };
        let entities = self.get_all(model, &options)?;
        let count = self.count(model, &options)?;
        Ok(SearchResult { entities, count })
    }

    /// `select_column` of the first row whose `filter_column` equals `value`.
    pub fn lookup_value(
        &mut self,
        model: &str,
        select_column: &str,
        filter_column: &str,
        value: impl Into<Value>,
    ) -> Result<Option<Value>> {
        let model = self.registry.get(model)?;
        let query = self
            .planner()
            .lookup(&model, select_column, filter_column, value.into())?;
        let row = self.fetch_one(&query)?;
        Ok(row.and_then(|row| row.into_values().into_iter().next()))
    }

    fn load_follow_ups(&mut self, entity: &mut Entity, options: &FetchOptions) -> Result<()> {
        let model = entity.model_arc();
        for relation in &model.relations {
            if !needs_follow_up(relation) || options.skips(&relation.name) {
                continue;
            }
            let follow_up =
                self.planner()
                    .follow_up(entity, relation, options.relation_options(&relation.name))?;
            tracing::debug!(relation = %relation.name, "Loading relation with a follow-up query");
            let data = match follow_up {
                FollowUp::Done(data) => data,
                FollowUp::One(plan) => {
                    let row = self.fetch_one(&plan.query)?;
                    RelationData::One(row.map(|row| plan.hydrate(&row)).transpose()?.map(Box::new))
                }
                FollowUp::Many(plan) => {
                    let rows = self.fetch_all(&plan.query)?;
                    RelationData::Many(
                        rows.iter()
                            .map(|row| plan.hydrate(row))
                            .collect::<Result<Vec<_>>>()?,
                    )
                }
                FollowUp::Aggregate { query, function } => {
                    let row = self.fetch_one(&query)?;
                    let value = row
                        .and_then(|row| row.into_values().into_iter().next())
                        .unwrap_or(Value::Null);
                    RelationData::Aggregate(aggregate_value(function, value))
                }
            };
            entity.set_relation(&relation.name, data)?;
        }
        Ok(())
    }

    // ========================================================================
    // Writes
    // ========================================================================

    /// Insert a row and its many-to-many links; returns the new id.
    ///
    /// Keys of `data` name fields, many-to-one relations (written as the
    /// foreign id, or a display value resolved through the relation's
    /// lookup column) or many-to-many relations (a list of foreign ids).
    #[tracing::instrument(level = "debug", skip(self, data))]
    pub fn create<K, I>(&mut self, model: &str, data: I) -> Result<Value>
    where
        I: IntoIterator<Item = (K, Value)>,
        K: Into<String>,
    {
        let model = self.registry.get(model)?;
        let plan = self.resolve_data(&model, data)?;
        let insert = InsertQuery::build(model.table_name()?, plan.columns)?;
        let links = plan.links;

        self.transaction(|wizzard| {
            wizzard.execute(&insert)?;
            let id = wizzard.fetch_last_insert_id()?;
            for (relation, wanted) in &links {
                wizzard.reconcile_links(&model, relation, &id, &[], wanted)?;
            }
            Ok(id)
        })
    }

    /// Update rows matching `condition`.
    ///
    /// Without a condition, `instance` selects its own row by primary key;
    /// with neither, the update is rejected as a config error.
    /// Many-to-many keys need `instance`; its loaded collection (or the
    /// junction table when not loaded) gives the current links.
    #[tracing::instrument(level = "debug", skip(self, condition, data, instance))]
    pub fn update<K, I>(
        &mut self,
        model: &str,
        condition: Option<Predicate>,
        data: I,
        instance: Option<&Entity>,
    ) -> Result<()>
    where
        I: IntoIterator<Item = (K, Value)>,
        K: Into<String>,
    {
        let model = self.registry.get(model)?;
        let owner_id = match instance {
            Some(instance) => Some(instance.id()?.clone()).filter(|id| !id.is_null()),
            None => None,
        };
        let condition = match (condition, &owner_id) {
            (Some(condition), _) => condition,
            (None, Some(id)) => Predicate::id_as_parameter(&model, id.clone())?,
            (None, None) => {
                return Err(Error::config(format!(
                    "updating '{}' needs a condition or an instance with an id",
                    model.name
                )));
            }
        };
        self.apply_update(&model, condition, data, owner_id, instance)
    }

    /// Update the row with primary key `id`, including its many-to-many links.
    #[tracing::instrument(level = "debug", skip(self, id, data))]
    pub fn update_by_id<K, I>(&mut self, model: &str, id: impl Into<Value>, data: I) -> Result<()>
    where
        I: IntoIterator<Item = (K, Value)>,
        K: Into<String>,
    {
        let model = self.registry.get(model)?;
        let id = id.into();
        let condition = Predicate::id_as_parameter(&model, id.clone())?;
        self.apply_update(&model, condition, data, Some(id), None)
    }

    fn apply_update<K, I>(
        &mut self,
        model: &Arc<Model>,
        condition: Predicate,
        data: I,
        owner_id: Option<Value>,
        instance: Option<&Entity>,
    ) -> Result<()>
    where
        I: IntoIterator<Item = (K, Value)>,
        K: Into<String>,
    {
        let plan = self.resolve_data(model, data)?;

        let mut link_sets = Vec::new();
        if !plan.links.is_empty() {
            let owner_id = owner_id.as_ref().ok_or_else(|| {
                Error::config(format!(
                    "updating many-to-many relations of '{}' needs the row's id",
                    model.name
                ))
            })?;
            for (relation, wanted) in plan.links {
                let actual = match instance.and_then(|i| loaded_ids(i, &relation)) {
                    Some(ids) => ids,
                    None => self.junction_ids(model, &relation, owner_id)?,
                };
                link_sets.push((relation, actual, wanted));
            }
        }

        let update = if plan.columns.is_empty() {
            None
        } else {
            Some(UpdateQuery::build(model, Some(condition), plan.columns)?)
        };
        if update.is_none() && link_sets.is_empty() {
            tracing::debug!(model = %model.name, "Nothing to update");
            return Ok(());
        }

        self.transaction(|wizzard| {
            if let Some(update) = &update {
                wizzard.execute(update)?;
            }
            if let Some(owner_id) = &owner_id {
                for (relation, actual, wanted) in &link_sets {
                    wizzard.reconcile_links(model, relation, owner_id, actual, wanted)?;
                }
            }
            Ok(())
        })
    }

    /// Delete rows matching `condition`.
    #[tracing::instrument(level = "debug", skip(self, condition))]
    pub fn delete(&mut self, model: &str, condition: Predicate) -> Result<()> {
        let model = self.registry.get(model)?;
        let delete = DeleteQuery::new(model.table_name()?, Some(condition))?;
        self.execute_in_transaction(&[delete.into()])
    }

    /// Delete one row and its junction rows.
    #[tracing::instrument(level = "debug", skip(self, id))]
    pub fn delete_by_id(&mut self, model: &str, id: impl Into<Value>) -> Result<()> {
        let model = self.registry.get(model)?;
        let id = id.into();
        let owner_column = model.id_field_name()?;

        let mut statements: Vec<Statement> = Vec::new();
        for junction in model.many_to_many_relations().filter_map(Relation::junction_table) {
            let condition = Predicate::column_as_parameter(
                ColumnReference::qualified(junction, owner_column),
                id.clone(),
            );
            statements.push(DeleteQuery::new(junction, Some(condition))?.into());
        }
        let condition = Predicate::id_as_parameter(&model, id)?;
        statements.push(DeleteQuery::new(model.table_name()?, Some(condition))?.into());
        self.execute_in_transaction(&statements)
    }

    /// Create the tables of every registered model, plus junction tables,
    /// in foreign-key order.
    pub fn create_tables(&mut self) -> Result<()> {
        let models = self.registry.models();
        let statements: Vec<Statement> = models
            .iter()
            .fold(SchemaBuilder::new().if_not_exists(), |builder, model| {
                builder.create_table(model)
            })
            .build()?
            .into_iter()
            .map(Statement::from)
            .collect();
        self.execute_in_transaction(&statements)
    }

    fn resolve_data<K, I>(&mut self, model: &Model, data: I) -> Result<WritePlan>
    where
        I: IntoIterator<Item = (K, Value)>,
        K: Into<String>,
    {
        let mut plan = WritePlan::default();
        for (key, value) in data {
            let key: String = key.into();
            if model.get_field(&key).is_some() {
                plan.set_column(&key, value);
                continue;
            }
            if !value.is_truthy() {
                tracing::debug!(key = %key, "Ignoring empty value");
                continue;
            }
            let relation = model.get_relation(&key)?;
            match &relation.kind {
                RelationKind::ManyToOne {
                    foreign_key_field,
                    foreign_model_key_field,
                    lookup_column,
                    load_all,
                } => {
                    let id = match lookup_column {
                        Some(lookup_column) if !*load_all => self
                            .lookup_value(
                                &relation.foreign_model,
                                foreign_model_key_field,
                                lookup_column,
                                value.clone(),
                            )?
                            .ok_or_else(|| {
                                Error::ForeignIdNotFound(ForeignIdNotFoundError {
                                    relation: key.clone(),
                                    lookup_column: lookup_column.clone(),
                                    value,
                                })
                            })?,
                        _ => value,
                    };
                    plan.set_column(foreign_key_field, id);
                }
                RelationKind::ManyToMany { .. } => {
                    plan.links.push((relation.clone(), parse_id_list(&value)?));
                }
                RelationKind::OneToMany { .. } => {
                    return Err(Error::config(format!(
                        "one-to-many relation '{}' of '{}' is written from the other side",
                        key, model.name
                    )));
                }
            }
        }
        Ok(plan)
    }

    fn fetch_last_insert_id(&mut self) -> Result<Value> {
        let sql = self.config.last_insert_id_sql.clone();
        self.run(&sql, &[])?;
        let row = self
            .db
            .fetchone()
            .map_err(|e| Error::sql(sql.as_str(), Vec::new(), e))?;
        let id = row
            .and_then(|row| row.into_values().into_iter().next())
            .filter(|id| !id.is_null())
            .ok_or_else(|| Error::database(format!("'{}' returned no id", sql)))?;
        self.last_insert_id = Some(id.clone());
        Ok(id)
    }

    fn junction_ids(&mut self, model: &Model, relation: &Relation, owner_id: &Value) -> Result<Vec<Value>> {
        let query = self.planner().junction_ids(model, relation, owner_id)?;
        let rows = self.fetch_all(&query)?;
        Ok(rows
            .into_iter()
            .filter_map(|row| row.into_values().into_iter().next())
            .collect())
    }

    fn reconcile_links(
        &mut self,
        model: &Model,
        relation: &Relation,
        owner_id: &Value,
        actual: &[Value],
        wanted: &[Value],
    ) -> Result<()> {
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
        let plan = LinkPlan::reconcile(
            junction_table,
            model.id_field_name()?,
            owner_id,
            foreign_key_field,
            actual,
            wanted,
        );
        tracing::debug!(
            relation = %relation.name,
            links = plan.links().count(),
            unlinks = plan.unlinks().count(),
            "Reconciling junction rows"
        );
        for statement in plan.statements()? {
            self.execute(&statement)?;
        }
        Ok(())
    }
}

impl<D: Database> ModelObserver for QueryWizzard<D> {
    fn on_model_loaded(&mut self, model: Model) {
        self.register_model(model);
    }
}

/// Ids of an already loaded collection.
fn loaded_ids(instance: &Entity, relation: &Relation) -> Option<Vec<Value>> {
    let entities = instance.related_many(&relation.name)?;
    Some(
        entities
            .iter()
            .filter_map(|entity| entity.id().ok().cloned())
            .collect(),
    )
}

fn scalar_count(row: Option<Row>) -> Result<u64> {
    let Some(row) = row else {
        return Ok(0);
    };
    let count: i64 = row.get_as(0)?;
    Ok(u64::try_from(count).unwrap_or_default())
}
