//! SQLWizz - declarative relational models mapped to parameterized SQL.
//!
//! SQLWizz provides:
//!
//! - Runtime model metadata: tables, fields and relations declared once
//! - A composable SQL AST that renders to `?`-parameterized text plus binds
//! - A query wizzard that plans joins, aggregates and follow-up loads
//! - Writes with many-to-one lookups, many-to-many reconciliation and transactions
//! - CREATE TABLE generation from the same metadata
//!
//! # Quick Start
//!
//! ```ignore
//! use sqlwizz::prelude::*;
//!
//! let language = Model::new("Language")
//!     .table("language")
//!     .field(Field::integer("language_id").primary_key())
//!     .field(Field::string("name").not_null());
//!
//! let film = Model::new("Film")
//!     .table("film")
//!     .field(Field::integer("film_id").primary_key())
//!     .field(Field::string("title").not_null())
//!     .field(Field::integer("language_id").foreign_key("language.language_id"))
//!     .relation(
//!         Relation::many_to_one("language", "Language", "language_id", "language_id")
//!             .lookup_column("name")
//!             .eager(),
//!     )
//!     .relation(Relation::many_to_many("actors", "Actor", "film_actor", "actor_id"))
//!     .search_columns(["title"]);
//!
//! let mut wizzard = QueryWizzard::new(db);
//! wizzard.register_model(language);
//! wizzard.register_model(film);
//!
//! // Insert, resolving "English" to its language_id
//! let id = wizzard.create(
//!     "Film",
//!     [
//!         ("title", Value::from("Alien")),
//!         ("language", Value::from("English")),
//!         ("actors", Value::from("[1, 2]")),
//!     ],
//! )?;
//!
//! // Read it back with the language joined in and actors loaded lazily
//! let film = wizzard.get_by_id("Film", id, &FetchOptions::new())?;
//! println!("{}", film.to_json());
//! ```
//!
//! # Features
//!
//! - **Parameters only**: caller values are always bound, never inlined
//! - **Eager or lazy**: many-to-one joins and aggregate subqueries, or follow-up queries
//! - **Atomic writes**: a row and its junction rows commit together or not at all
//! - **Bring your own driver**: anything implementing [`Database`] works

pub use sqlwizz_core::{
    AggregateFunction, Aggregation, ConfigError, Database, DatabaseError, Entity, Error, Field,
    FieldKind, FieldValue, ForeignIdNotFoundError, Model, ModelNotFoundError,
    ObjectNotFoundError, Relation, RelationData, RelationKind, RelationNotFoundError,
    RelationValue, Result, Row, SqlError, TypeError, Value,
};
pub use sqlwizz_query::{
    BooleanOp, ColumnDefinition, ColumnReference, ComparisonOp, CreateTableQuery, DeleteQuery,
    Expr, Filter, FromClause, Function, GroupByClause, InsertQuery, JoinCondition, JoinType,
    Literal, OrderByClause, Pagination, Predicate, Query, QueryBuilder, Render, SelectClause,
    Statement, TableName, TableReference, UpdateQuery,
};
pub use sqlwizz_schema::{CreateTable, SchemaBuilder, create_all, create_table};
pub use sqlwizz_session::{
    FetchOptions, LinkOp, LinkPlan, ModelObserver, ModelRegistry, QueryWizzard, RelationOptions,
    SearchResult, WizzardConfig,
};

/// Prelude module for convenient imports.
///
/// ```ignore
/// use sqlwizz::prelude::*;
/// ```
pub mod prelude {
    pub use crate::{
        Aggregation, Database, Entity, Error, FetchOptions, Field, Filter, Model, Predicate,
        QueryBuilder, QueryWizzard, Relation, RelationData, RelationOptions, Render, Result, Row,
        Value, WizzardConfig,
    };
    pub use sqlwizz_query::{ColumnReference, Expr};
}
