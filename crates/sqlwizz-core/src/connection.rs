//! Database collaborator trait.
//!
//! SQLWizz does not ship a driver. Anything that can run a parameterized
//! statement on a single cursor and hand back positional rows can back a
//! [`QueryWizzard`](../../sqlwizz_session/struct.QueryWizzard.html) by
//! implementing [`Database`].
//!
//! All calls are blocking and are issued strictly one after another on the
//! same cursor: `execute` followed by `fetchone`/`fetchall` reads the result
//! of that statement.

use crate::error::Result;
use crate::row::Row;
use crate::value::Value;

/// Minimal cursor-style database interface.
///
/// Rendered SQL uses positional `?` placeholders; `params` is `None` for
/// statements without placeholders.
pub trait Database {
    /// Execute one statement on the current cursor.
    fn execute(&mut self, sql: &str, params: Option<&[Value]>) -> Result<()>;

    /// Fetch the next row of the last statement's result, if any.
    fn fetchone(&mut self) -> Result<Option<Row>>;

    /// Fetch all remaining rows of the last statement's result.
    fn fetchall(&mut self) -> Result<Vec<Row>>;

    /// Commit the current transaction.
    fn commit(&mut self) -> Result<()>;

    /// Roll back the current transaction.
    fn rollback(&mut self) -> Result<()>;

    /// Open a fresh cursor, discarding any pending result.
    fn create_cursor(&mut self) -> Result<()> {
        Ok(())
    }
}

impl<D: Database + ?Sized> Database for Box<D> {
    fn execute(&mut self, sql: &str, params: Option<&[Value]>) -> Result<()> {
        (**self).execute(sql, params)
    }

    fn fetchone(&mut self) -> Result<Option<Row>> {
        (**self).fetchone()
    }

    fn fetchall(&mut self) -> Result<Vec<Row>> {
        (**self).fetchall()
    }

    fn commit(&mut self) -> Result<()> {
        (**self).commit()
    }

    fn rollback(&mut self) -> Result<()> {
        (**self).rollback()
    }

    fn create_cursor(&mut self) -> Result<()> {
        (**self).create_cursor()
    }
}
