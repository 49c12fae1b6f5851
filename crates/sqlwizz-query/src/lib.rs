//! SQL construction layer for SQLWizz.
//!
//! `sqlwizz-query` turns model metadata and caller filters into statement
//! trees that render to `?`-parameterized SQL plus an ordered bind list.
//!
//! # Role In The Architecture
//!
//! - **Expressions**: literals, parameters, columns, functions and predicates.
//! - **Clauses and joins**: typed SELECT/FROM/WHERE/... wrappers and left-deep join trees.
//! - **Statements**: `Query`, `InsertQuery`, `UpdateQuery`, `DeleteQuery`, `CreateTableQuery`.
//! - **QueryBuilder**: assembles a `Query` for a model from filters, search, ordering and paging.
//!
//! Statements execute through the `Database` trait from `sqlwizz-core`, usually
//! via the `QueryWizzard` in `sqlwizz-session`.

pub mod builder;
pub mod clause;
pub mod expr;
pub mod filter;
pub mod join;
pub mod statement;

pub use builder::QueryBuilder;
pub use clause::{
    DeleteClause, FromClause, GroupByClause, HavingClause, InsertClause, OrderByClause,
    Pagination, SelectClause, SetClause, UpdateClause, ValuesClause, WhereClause,
};
pub use expr::{
    BooleanOp, ColumnReference, ComparisonOp, Expr, Function, Literal, Numeric, Predicate, Render,
};
pub use filter::Filter;
pub use join::{JoinCondition, JoinConstruct, JoinTarget, JoinType, TableName, TableReference};
pub use statement::{
    ColumnDefinition, CreateTableQuery, DeleteQuery, ForeignKeyConstraint, InsertQuery, Query,
    Statement, UpdateQuery,
};
