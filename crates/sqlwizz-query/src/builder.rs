//! Model-aware SELECT builder.

use crate::clause::{FromClause, OrderByClause, Pagination, SelectClause};
use crate::expr::{ColumnReference, Expr, Function, Predicate};
use crate::filter::Filter;
use crate::join::{JoinCondition, JoinType};
use crate::statement::Query;
use sqlwizz_core::{Error, Model, RelationKind, Result, Value};

/// Builds a SELECT [`Query`] for one model.
///
/// Filtering accepts exactly one mode: an explicit predicate
/// ([`filter`](Self::filter)), declarative filter objects
/// ([`filters`](Self::filters)) or keyword equality
/// ([`filter_by`](Self::filter_by)). Mixing modes fails in [`build`](Self::build).
/// A primary-key restriction ([`by_id`](Self::by_id)) and full-text search
/// ([`search`](Self::search)) are ANDed onto whichever mode is used.
///
/// # Example
///
/// ```ignore
/// let query = QueryBuilder::new(&film)
///     .filter_by("rating", "PG")
///     .order_by("title", true)
///     .paginate(20, Some(2))
///     .build()?;
/// ```
#[derive(Debug, Clone)]
pub struct QueryBuilder<'m> {
    model: &'m Model,
    projection: Option<Vec<Expr>>,
    id: Option<Value>,
    condition: Option<Predicate>,
    filters: Option<Vec<Filter>>,
    equals: Vec<(String, Value)>,
    search: Option<(String, Option<Vec<String>>)>,
    order_by: Option<(ColumnReference, bool)>,
    pagination: Option<Pagination>,
}

impl<'m> QueryBuilder<'m> {
    pub fn new(model: &'m Model) -> Self {
        Self {
            model,
            projection: None,
            id: None,
            condition: None,
            filters: None,
            equals: Vec::new(),
            search: None,
            order_by: None,
            pagination: None,
        }
    }

    /// Project the given names. Declared fields are table-qualified; anything
    /// else (`*`, `COUNT(*)`, `other.column`) is kept as written.
    pub fn select(mut self, names: &[&str]) -> Self {
        let table = self.model.table_name.as_deref();
        let items = names
            .iter()
            .map(|name| match (table, self.model.get_field(name)) {
                (Some(table), Some(field)) => {
                    Expr::Column(ColumnReference::qualified(table, field.name.as_str()))
                }
                _ if name.contains('.') && !name.contains(['(', ' ']) => Expr::col(name),
                _ => Expr::raw(*name),
            })
            .collect();
        self.projection = Some(items);
        self
    }

    /// Project arbitrary expressions.
    pub fn select_exprs(mut self, items: Vec<Expr>) -> Self {
        self.projection = Some(items);
        self
    }

    /// Restrict to the row with this primary key.
    pub fn by_id(mut self, id: impl Into<Value>) -> Self {
        self.id = Some(id.into());
        self
    }

    /// Filter with an explicit predicate. Repeated calls are ANDed.
    pub fn filter(mut self, predicate: Predicate) -> Self {
        self.condition = Some(match self.condition.take() {
            Some(existing) => existing.and(predicate),
            None => predicate,
        });
        self
    }

    /// Filter with declarative filter objects, ANDed together.
    pub fn filters(mut self, filters: Vec<Filter>) -> Self {
        self.filters.get_or_insert_with(Vec::new).extend(filters);
        self
    }

    /// Filter on `column = value`.
    pub fn filter_by(mut self, column: impl Into<String>, value: impl Into<Value>) -> Self {
        self.equals.push((column.into(), value.into()));
        self
    }

    /// Full-text search over `columns`, or the model's search columns when `None`.
    pub fn search(mut self, text: impl Into<String>, columns: Option<Vec<String>>) -> Self {
        self.search = Some((text.into(), columns));
        self
    }

    /// Order by a column; an unqualified column is qualified with the model's table.
    pub fn order_by(mut self, column: impl Into<ColumnReference>, ascending: bool) -> Self {
        self.order_by = Some((column.into(), ascending));
        self
    }

    /// Page through results; `page_number` is 1-based.
    pub fn paginate(mut self, page_size: u64, page_number: Option<u64>) -> Self {
        self.pagination = Some(Pagination::new(page_size, page_number));
        self
    }

    /// Build the SELECT statement.
    pub fn build(&self) -> Result<Query> {
        let table = self.model.table_name()?;
        let projection = match &self.projection {
            Some(items) => items.clone(),
            None => self
                .model
                .fields
                .iter()
                .map(|field| Expr::Column(ColumnReference::qualified(table, field.name.as_str())))
                .collect(),
        };
        let select = SelectClause::new(projection.into_iter().map(Some))?;
        let (from, condition) = self.plan_source()?;

        let mut query = Query::new(select, from);
        if let Some(condition) = condition {
            query = query.with_where(condition);
        }
        if let Some((column, ascending)) = &self.order_by {
            query = query.with_order_by(OrderByClause::new(column.clone().or_table(table), *ascending));
        }
        if let Some(pagination) = self.pagination {
            query = query.with_pagination(pagination);
        }
        tracing::debug!(model = %self.model.name, "Built select query");
        Ok(query)
    }

    /// Build `SELECT COUNT(table.pk)` with the same source and filter, unpaged.
    pub fn build_count(&self) -> Result<Query> {
        let table = self.model.table_name()?;
        let id = ColumnReference::qualified(table, self.model.id_field_name()?);
        let select = SelectClause::new([Some(Expr::Function(Function::new(
            "COUNT",
            vec![Expr::Column(id)],
        )))])?;
        let (from, condition) = self.plan_source()?;
        let mut query = Query::new(select, from);
        if let Some(condition) = condition {
            query = query.with_where(condition);
        }
        Ok(query)
    }

    /// FROM clause with junction joins, plus the combined WHERE predicate.
    fn plan_source(&self) -> Result<(FromClause, Option<Predicate>)> {
        let table = self.model.table_name()?;
        let modes = usize::from(self.condition.is_some())
            + usize::from(self.filters.is_some())
            + usize::from(!self.equals.is_empty());
        if modes > 1 {
            return Err(Error::config(
                "filter with exactly one of: a predicate, filter objects, or keyword equality",
            ));
        }

        let mut conditions = Vec::new();
        let mut junctions: Vec<String> = Vec::new();

        if let Some(id) = &self.id {
            conditions.push(Predicate::id_as_parameter(self.model, id.clone())?);
        }
        if let Some(condition) = &self.condition {
            for relation in self.model.many_to_many_relations() {
                let Some(junction) = relation.junction_table() else {
                    continue;
                };
                let touches = condition
                    .columns()
                    .iter()
                    .any(|col| col.table.as_deref() == Some(junction));
                if touches && !junctions.contains(&relation.name) {
                    junctions.push(relation.name.clone());
                }
            }
            conditions.push(condition.clone());
        }
        if let Some(filters) = &self.filters {
            for filter in filters {
                conditions.push(filter.lower(self.model, &mut junctions)?);
            }
        }
        for (column, value) in &self.equals {
            let column = ColumnReference::from(column.as_str());
            if column.table.is_none() && self.model.get_field(&column.name).is_none() {
                return Err(Error::config(format!(
                    "model '{}' has no field '{}'",
                    self.model.name, column.name
                )));
            }
            conditions.push(Predicate::column_as_parameter(
                column.or_table(table),
                value.clone(),
            ));
        }
        if let Some((text, columns)) = &self.search {
            conditions.push(self.search_condition(text, columns.as_deref())?);
        }

        let mut from = FromClause::new(table);
        for name in &junctions {
            from = self.join_junction(from, name)?;
        }

        let condition = if conditions.is_empty() {
            None
        } else {
            Some(Predicate::and_all(conditions)?)
        };
        Ok((from, condition))
    }

    fn join_junction(&self, from: FromClause, relation: &str) -> Result<FromClause> {
        let table = self.model.table_name()?;
        let id = self.model.id_field_name()?;
        let RelationKind::ManyToMany { junction_table, .. } =
            &self.model.get_relation(relation)?.kind
        else {
            return Ok(from);
        };
        if from.table.joins_table(junction_table) {
            return Ok(from);
        }
        tracing::debug!(junction = %junction_table, relation = %relation, "Joining junction table");
        let on = Predicate::equals(
            ColumnReference::qualified(junction_table.as_str(), id),
            ColumnReference::qualified(table, id),
        );
        from.join(
            JoinType::Inner,
            junction_table.as_str(),
            Some(JoinCondition::On(on)),
        )
    }

    /// OR-chain of `column LIKE ?` bound to `%text%`.
    pub fn search_condition(&self, text: &str, columns: Option<&[String]>) -> Result<Predicate> {
        let table = self.model.table_name()?;
        let columns = columns.unwrap_or(&self.model.search_columns);
        if columns.is_empty() {
            return Err(Error::config(format!(
                "no search columns given and model '{}' declares none",
                self.model.name
            )));
        }
        let pattern = format!("%{}%", text);
        let likes = columns
            .iter()
            .map(|column| {
                Predicate::like(
                    ColumnReference::from(column.as_str()).or_table(table),
                    Expr::param(pattern.as_str()),
                )
            })
            .collect();
        Predicate::or_all(likes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expr::Render;
    use sqlwizz_core::{Field, Relation};

    fn assert_query_lines(sql: &str, expected: &[&str]) {
        let actual: Vec<String> = sql
            .lines()
            .map(|line| line.trim().to_lowercase())
            .filter(|line| !line.is_empty())
            .collect();
        assert_eq!(actual, expected);
    }

    fn dummy() -> Model {
        Model::new("Dummy")
            .table("dummy_table")
            .field(Field::integer("dummy_id").primary_key())
    }

    fn film() -> Model {
        Model::new("Film")
            .table("film")
            .field(Field::integer("film_id").primary_key())
            .field(Field::string("title"))
            .field(Field::string("description"))
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
            .search_columns(["title", "description"])
    }

    #[test]
    fn test_select_star_by_id() {
        let model = dummy();
        let query = QueryBuilder::new(&model)
            .select(&["*"])
            .by_id(17_i64)
            .build()
            .unwrap();
        let (sql, params) = query.render();
        assert_query_lines(
            &sql,
            &["select *", "from dummy_table", "where dummy_table.dummy_id = ?"],
        );
        assert_eq!(params[0], Value::BigInt(17));
        assert_eq!(params.len(), 1);
    }

    #[test]
    fn test_default_projection_is_all_fields() {
        let model = film();
        let (sql, params) = QueryBuilder::new(&model).build().unwrap().render();
        assert_query_lines(
            &sql,
            &[
                "select film.film_id, film.title, film.description, film.language_id",
                "from film",
            ],
        );
        assert!(params.is_empty());
    }

    #[test]
    fn test_filter_modes_are_exclusive() {
        let model = film();
        let err = QueryBuilder::new(&model)
            .filter(Predicate::equals(Expr::col("film.title"), Expr::param("x")))
            .filter_by("title", "y")
            .build()
            .unwrap_err();
        assert!(err.is_config());

        let err = QueryBuilder::new(&model)
            .filters(vec![Filter::field("Film", "title", "x")])
            .filter_by("title", "y")
            .build_count()
            .unwrap_err();
        assert!(err.is_config());
    }

    #[test]
    fn test_keyword_equality_is_parameterized() {
        let model = film();
        let (sql, params) = QueryBuilder::new(&model)
            .select(&["title"])
            .filter_by("title", "Alien")
            .filter_by("language_id", 1_i64)
            .build()
            .unwrap()
            .render();
        assert_query_lines(
            &sql,
            &[
                "select film.title",
                "from film",
                "where film.title = ? and film.language_id = ?",
            ],
        );
        assert_eq!(params, vec![Value::from("Alien"), Value::BigInt(1)]);
        assert!(QueryBuilder::new(&model).filter_by("rating", "R").build().is_err());
    }

    #[test]
    fn test_many_to_many_filters_join_junction_once() {
        let model = film();
        let (sql, params) = QueryBuilder::new(&model)
            .select(&["film_id"])
            .filters(vec![
                Filter::any(vec![
                    Filter::many_to_many("Film", "actors", 1_i64),
                    Filter::many_to_many("Film", "actors", 2_i64),
                ]),
                Filter::many_to_one("Film", "language", 3_i64),
            ])
            .build()
            .unwrap()
            .render();
        assert_query_lines(
            &sql,
            &[
                "select film.film_id",
                "from film",
                "inner join film_actor on film_actor.film_id = film.film_id",
                "where (film_actor.actor_id = ? or film_actor.actor_id = ?) and film.language_id = ?",
            ],
        );
        assert_eq!(
            params,
            vec![Value::BigInt(1), Value::BigInt(2), Value::BigInt(3)]
        );
    }

    #[test]
    fn test_predicate_on_junction_adds_join() {
        let model = film();
        let (sql, _) = QueryBuilder::new(&model)
            .select(&["film_id"])
            .filter(Predicate::column_as_parameter(
                ColumnReference::qualified("film_actor", "actor_id"),
                9_i64,
            ))
            .build()
            .unwrap()
            .render();
        assert!(sql.contains("INNER JOIN film_actor ON film_actor.film_id = film.film_id"));
    }

    #[test]
    fn test_search_order_and_paging() {
        let model = film();
        let (sql, params) = QueryBuilder::new(&model)
            .select(&["film_id", "title"])
            .search("alien", None)
            .order_by("title", false)
            .paginate(20, Some(3))
            .build()
            .unwrap()
            .render();
        assert_query_lines(
            &sql,
            &[
                "select film.film_id, film.title",
                "from film",
                "where film.title like ? or film.description like ?",
                "order by film.title desc",
                "limit 20 offset 40",
            ],
        );
        assert_eq!(
            params,
            vec![Value::from("%alien%"), Value::from("%alien%")]
        );
    }

    #[test]
    fn test_search_is_anded_with_filter() {
        let model = film();
        let (sql, _) = QueryBuilder::new(&model)
            .select(&["film_id"])
            .filter_by("language_id", 1_i64)
            .search("x", Some(vec!["title".into(), "description".into()]))
            .build()
            .unwrap()
            .render();
        assert!(sql.contains(
            "WHERE film.language_id = ? AND (film.title LIKE ? OR film.description LIKE ?)"
        ));
    }

    #[test]
    fn test_search_without_columns_fails() {
        let model = dummy();
        assert!(QueryBuilder::new(&model).search("x", None).build().is_err());
    }

    #[test]
    fn test_build_count_shares_filter() {
        let model = film();
        let builder = QueryBuilder::new(&model)
            .filter_by("title", "Alien")
            .order_by("title", true)
            .paginate(10, Some(1));
        let (sql, params) = builder.build_count().unwrap().render();
        assert_query_lines(
            &sql,
            &["select count(film.film_id)", "from film", "where film.title = ?"],
        );
        assert_eq!(params, vec![Value::from("Alien")]);
    }

    #[test]
    fn test_qualified_order_column_kept() {
        let model = film();
        let (sql, _) = QueryBuilder::new(&model)
            .order_by("language.name", true)
            .build()
            .unwrap()
            .render();
        assert!(sql.contains("ORDER BY language.name ASC"));
    }
}
