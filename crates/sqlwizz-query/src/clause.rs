//! SQL clause types.
//!
//! Read side: SELECT, FROM, WHERE, GROUP BY, HAVING, ORDER BY, LIMIT/OFFSET.
//! Write side: UPDATE/SET, INSERT INTO/VALUES, DELETE FROM.

use crate::expr::{Expr, Predicate, Render};
use crate::join::{JoinCondition, JoinTarget, JoinType, TableReference};
use sqlwizz_core::{Error, Result, Value};

/// Separator between rendered lines of one statement.
pub(crate) const LINE_SEPARATOR: &str = "\n    ";

/// SELECT clause with a non-empty projection.
#[derive(Debug, Clone, PartialEq)]
pub struct SelectClause {
    items: Vec<Expr>,
}

impl SelectClause {
    /// Build from optional items. `None` and blank items are dropped; if
    /// nothing is left the projection is empty and construction fails.
    pub fn new<I>(items: I) -> Result<Self>
    where
        I: IntoIterator<Item = Option<Expr>>,
    {
        let items: Vec<Expr> = items
            .into_iter()
            .flatten()
            .filter(|item| !item.is_blank())
            .collect();
        if items.is_empty() {
            return Err(Error::config("SELECT clause needs at least one item"));
        }
        Ok(Self { items })
    }

    /// Build from raw projection text such as `"*"` or `"film.title"`.
    pub fn columns(names: &[&str]) -> Result<Self> {
        Self::new(names.iter().map(|name| Some(Expr::raw(*name))))
    }

    pub fn items(&self) -> &[Expr] {
        &self.items
    }

    /// Append a projection item.
    pub fn push(&mut self, item: Expr) {
        if !item.is_blank() {
            self.items.push(item);
        }
    }
}

impl Render for SelectClause {
    fn build(&self, params: &mut Vec<Value>) -> String {
        let items: Vec<String> = self
            .items
            .iter()
            .map(|item| item.build_projection(params))
            .collect();
        format!("SELECT {}", items.join(", "))
    }
}

/// FROM clause over a table, derived table or join tree.
#[derive(Debug, Clone, PartialEq)]
pub struct FromClause {
    pub table: TableReference,
}

impl FromClause {
    pub fn new(table: impl Into<TableReference>) -> Self {
        Self {
            table: table.into(),
        }
    }

    /// Extend the join tree with one more join on the right.
    pub fn join(
        self,
        join_type: JoinType,
        target: impl Into<JoinTarget>,
        condition: Option<JoinCondition>,
    ) -> Result<Self> {
        Ok(Self {
            table: self.table.join(join_type, target, condition)?,
        })
    }
}

impl Render for FromClause {
    fn build(&self, params: &mut Vec<Value>) -> String {
        let lines = self.table.as_lines(params);
        format!("FROM {}", lines.join(LINE_SEPARATOR))
    }
}

/// WHERE clause.
#[derive(Debug, Clone, PartialEq)]
pub struct WhereClause {
    pub condition: Predicate,
}

impl WhereClause {
    pub fn new(condition: Predicate) -> Self {
        Self { condition }
    }
}

impl Render for WhereClause {
    fn build(&self, params: &mut Vec<Value>) -> String {
        format!("WHERE {}", self.condition.build(params))
    }
}

/// HAVING clause.
#[derive(Debug, Clone, PartialEq)]
pub struct HavingClause {
    pub condition: Predicate,
}

impl HavingClause {
    pub fn new(condition: Predicate) -> Self {
        Self { condition }
    }
}

impl Render for HavingClause {
    fn build(&self, params: &mut Vec<Value>) -> String {
        format!("HAVING {}", self.condition.build(params))
    }
}

/// GROUP BY clause.
#[derive(Debug, Clone, PartialEq)]
pub struct GroupByClause {
    pub items: Vec<Expr>,
}

impl GroupByClause {
    pub fn new(items: Vec<Expr>) -> Self {
        Self { items }
    }
}

impl Render for GroupByClause {
    fn build(&self, params: &mut Vec<Value>) -> String {
        let items: Vec<String> = self.items.iter().map(|item| item.build(params)).collect();
        format!("GROUP BY {}", items.join(", "))
    }
}

/// ORDER BY clause.
#[derive(Debug, Clone, PartialEq)]
pub struct OrderByClause {
    pub expr: Expr,
    pub ascending: bool,
}

impl OrderByClause {
    pub fn new(expr: impl Into<Expr>, ascending: bool) -> Self {
        Self {
            expr: expr.into(),
            ascending,
        }
    }
}

impl Render for OrderByClause {
    fn build(&self, params: &mut Vec<Value>) -> String {
        format!(
            "ORDER BY {} {}",
            self.expr.build(params),
            if self.ascending { "ASC" } else { "DESC" }
        )
    }
}

/// LIMIT/OFFSET from a page size and a 1-based page number.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
    pub page_size: u64,
    pub page_number: Option<u64>,
}

impl Pagination {
    pub fn new(page_size: u64, page_number: Option<u64>) -> Self {
        Self {
            page_size,
            page_number,
        }
    }

    /// Zero-based row offset, if a page number was given.
    pub fn offset(&self) -> Option<u64> {
        self.page_number
            .map(|page| page.saturating_sub(1).saturating_mul(self.page_size))
    }
}

impl Render for Pagination {
    fn build(&self, _params: &mut Vec<Value>) -> String {
        match self.offset() {
            Some(offset) => format!("LIMIT {} OFFSET {}", self.page_size, offset),
            None => format!("LIMIT {}", self.page_size),
        }
    }
}

/// UPDATE clause.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdateClause {
    pub table: String,
}

impl UpdateClause {
    pub fn new(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
        }
    }
}

impl Render for UpdateClause {
    fn build(&self, _params: &mut Vec<Value>) -> String {
        format!("UPDATE {}", self.table)
    }
}

/// SET clause: one `column = ?` per update, in insertion order.
#[derive(Debug, Clone, PartialEq)]
pub struct SetClause {
    pub updates: Vec<(String, Value)>,
}

impl SetClause {
    pub fn new(updates: Vec<(String, Value)>) -> Self {
        Self { updates }
    }
}

impl Render for SetClause {
    fn build(&self, params: &mut Vec<Value>) -> String {
        let pairs: Vec<String> = self
            .updates
            .iter()
            .map(|(column, value)| {
                params.push(value.clone());
                format!("{} = ?", column)
            })
            .collect();
        format!("SET {}", pairs.join(", "))
    }
}

/// INSERT INTO clause.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InsertClause {
    pub table: String,
    pub columns: Vec<String>,
}

impl InsertClause {
    pub fn new(table: impl Into<String>, columns: Vec<String>) -> Self {
        Self {
            table: table.into(),
            columns,
        }
    }
}

impl Render for InsertClause {
    fn build(&self, _params: &mut Vec<Value>) -> String {
        format!("INSERT INTO {} ({})", self.table, self.columns.join(", "))
    }
}

/// VALUES clause, parallel to the INSERT column list.
#[derive(Debug, Clone, PartialEq)]
pub struct ValuesClause {
    pub values: Vec<Value>,
}

impl ValuesClause {
    pub fn new(values: Vec<Value>) -> Self {
        Self { values }
    }
}

impl Render for ValuesClause {
    fn build(&self, params: &mut Vec<Value>) -> String {
        params.extend(self.values.iter().cloned());
        let placeholders = vec!["?"; self.values.len()];
        format!("VALUES ({})", placeholders.join(", "))
    }
}

/// DELETE FROM clause.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeleteClause {
    pub table: String,
}

impl DeleteClause {
    pub fn new(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
        }
    }
}

impl Render for DeleteClause {
    fn build(&self, _params: &mut Vec<Value>) -> String {
        format!("DELETE FROM {}", self.table)
    }
}
