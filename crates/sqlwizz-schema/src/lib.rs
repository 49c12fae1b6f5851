//! Schema support for SQLWizz.
//!
//! This crate provides:
//! - CREATE TABLE statements derived from [`Model`] metadata
//! - Foreign-key aware ordering of several tables, junction tables included
//! - Execution of the generated DDL against a [`Database`]

pub mod create;

pub use create::{CreateTable, SchemaBuilder};

use sqlwizz_core::{Database, Error, Model, Result};
use sqlwizz_query::{CreateTableQuery, Render};

/// Create a table for a model.
///
/// # Example
///
/// ```ignore
/// let film = Model::new("Film")
///     .table("film")
///     .field(Field::integer("film_id").primary_key());
///
/// let (sql, _) = create_table(&film).if_not_exists().build()?.render();
/// ```
pub fn create_table(model: &Model) -> CreateTable<'_> {
    CreateTable::new(model)
}

/// Execute CREATE TABLE statements in order.
///
/// Stops at the first failure. Committing is left to the caller.
pub fn create_all<D: Database + ?Sized>(db: &mut D, statements: &[CreateTableQuery]) -> Result<()> {
    for statement in statements {
        let sql = statement.render().0;
        tracing::debug!(table = %statement.table, "Creating table");
        db.execute(&sql, None)
            .map_err(|e| Error::sql(sql.as_str(), Vec::new(), e))?;
    }
    Ok(())
}
