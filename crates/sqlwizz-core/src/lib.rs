//! Core types and traits for SQLWizz.
//!
//! This crate provides the foundational pieces every other layer builds on:
//!
//! - [`Value`] and [`Row`] for parameters and result rows
//! - [`Error`] and [`Result`] shared by all crates
//! - [`Database`], the blocking cursor collaborator statements run through
//! - [`Model`], [`Field`] and [`Relation`] declarative metadata
//! - [`Entity`], an in-memory instance of a model

pub mod connection;
pub mod entity;
pub mod error;
pub mod field;
pub mod model;
pub mod relationship;
pub mod row;
pub mod value;

pub use connection::Database;
pub use entity::{Entity, FieldValue, RelationData, RelationValue};
pub use error::{
    ConfigError, DatabaseError, Error, ForeignIdNotFoundError, ModelNotFoundError,
    ObjectNotFoundError, RelationNotFoundError, Result, SqlError, TypeError,
};
pub use field::{Field, FieldKind};
pub use model::Model;
pub use relationship::{AggregateFunction, Aggregation, Relation, RelationKind};
pub use row::Row;
pub use value::Value;
