//! Table references and JOIN trees.
//!
//! Join trees are left-deep: the left side of a [`JoinConstruct`] is any
//! table reference (including another join), the right side is always a
//! plain table or a derived table. Rendering flattens the chain into one
//! line for the base table and one line per join, in construction order.

use crate::expr::{Predicate, Render};
use crate::statement::Query;
use sqlwizz_core::{Error, Result, Value};

/// Types of SQL joins.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinType {
    Inner,
    LeftOuter,
    RightOuter,
    FullOuter,
    Natural,
    Cross,
}

impl JoinType {
    /// Get the SQL keyword for this join type.
    pub const fn as_str(&self) -> &'static str {
        match self {
            JoinType::Inner => "INNER JOIN",
            JoinType::LeftOuter => "LEFT OUTER JOIN",
            JoinType::RightOuter => "RIGHT OUTER JOIN",
            JoinType::FullOuter => "FULL OUTER JOIN",
            JoinType::Natural => "NATURAL JOIN",
            JoinType::Cross => "CROSS JOIN",
        }
    }

    /// NATURAL and CROSS joins take no condition; all others require one.
    pub const fn takes_condition(&self) -> bool {
        !matches!(self, JoinType::Natural | JoinType::Cross)
    }
}

/// How the two sides of a join are matched.
#[derive(Debug, Clone, PartialEq)]
pub enum JoinCondition {
    On(Predicate),
    Using(Vec<String>),
}

impl Render for JoinCondition {
    fn build(&self, params: &mut Vec<Value>) -> String {
        match self {
            JoinCondition::On(predicate) => format!("ON {}", predicate.build(params)),
            JoinCondition::Using(columns) => format!("USING ({})", columns.join(", ")),
        }
    }
}

/// A base table, optionally aliased.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableName {
    pub name: String,
    pub alias: Option<String>,
}

impl TableName {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            alias: None,
        }
    }

    pub fn alias(mut self, alias: impl Into<String>) -> Self {
        self.alias = Some(alias.into());
        self
    }

    fn sql(&self) -> String {
        match &self.alias {
            Some(alias) => format!("{} AS {}", self.name, alias),
            None => self.name.clone(),
        }
    }
}

impl From<&str> for TableName {
    fn from(name: &str) -> Self {
        TableName::new(name)
    }
}

/// Right-hand side of a join.
#[derive(Debug, Clone, PartialEq)]
pub enum JoinTarget {
    Table(TableName),
    /// Derived table; the query carries its own alias
    Subquery(Box<Query>),
}

impl JoinTarget {
    fn build(&self, params: &mut Vec<Value>) -> String {
        match self {
            JoinTarget::Table(table) => table.sql(),
            JoinTarget::Subquery(query) => query.build(params),
        }
    }
}

impl From<TableName> for JoinTarget {
    fn from(table: TableName) -> Self {
        JoinTarget::Table(table)
    }
}

impl From<&str> for JoinTarget {
    fn from(name: &str) -> Self {
        JoinTarget::Table(TableName::new(name))
    }
}

impl From<Query> for JoinTarget {
    fn from(query: Query) -> Self {
        JoinTarget::Subquery(Box::new(query))
    }
}

/// Anything that can appear after FROM.
#[derive(Debug, Clone, PartialEq)]
pub enum TableReference {
    Table(TableName),
    Subquery(Box<Query>),
    Join(Box<JoinConstruct>),
}

impl TableReference {
    /// Join `target` onto the right of this reference.
    pub fn join(
        self,
        join_type: JoinType,
        target: impl Into<JoinTarget>,
        condition: Option<JoinCondition>,
    ) -> Result<Self> {
        let join = JoinConstruct::new(self, join_type, target.into(), condition)?;
        Ok(TableReference::Join(Box::new(join)))
    }

    /// Rendered lines: the base table first, then one per join.
    pub fn as_lines(&self, params: &mut Vec<Value>) -> Vec<String> {
        match self {
            TableReference::Table(table) => vec![table.sql()],
            TableReference::Subquery(query) => vec![query.build(params)],
            TableReference::Join(join) => join.as_lines(params),
        }
    }

    /// True when a join in the tree already targets `table`.
    pub fn joins_table(&self, table: &str) -> bool {
        match self {
            TableReference::Join(join) => {
                matches!(&join.table2, JoinTarget::Table(t) if t.name == table)
                    || join.table1.joins_table(table)
            }
            _ => false,
        }
    }
}

impl From<TableName> for TableReference {
    fn from(table: TableName) -> Self {
        TableReference::Table(table)
    }
}

impl From<&str> for TableReference {
    fn from(name: &str) -> Self {
        TableReference::Table(TableName::new(name))
    }
}

impl From<Query> for TableReference {
    fn from(query: Query) -> Self {
        TableReference::Subquery(Box::new(query))
    }
}

/// One join in a left-deep tree.
#[derive(Debug, Clone, PartialEq)]
pub struct JoinConstruct {
    pub table1: TableReference,
    pub join_type: JoinType,
    pub table2: JoinTarget,
    pub condition: Option<JoinCondition>,
}

impl JoinConstruct {
    /// Create a join, checking the condition against the join type.
    pub fn new(
        table1: TableReference,
        join_type: JoinType,
        table2: JoinTarget,
        condition: Option<JoinCondition>,
    ) -> Result<Self> {
        match (join_type.takes_condition(), condition.is_some()) {
            (true, false) => {
                return Err(Error::config(format!(
                    "{} requires a join condition",
                    join_type.as_str()
                )));
            }
            (false, true) => {
                return Err(Error::config(format!(
                    "{} does not take a join condition",
                    join_type.as_str()
                )));
            }
            _ => {}
        }
        Ok(Self {
            table1,
            join_type,
            table2,
            condition,
        })
    }

    /// Rendered lines of the whole chain ending in this join.
    pub fn as_lines(&self, params: &mut Vec<Value>) -> Vec<String> {
        let mut lines = self.table1.as_lines(params);
        let mut line = format!("{} {}", self.join_type.as_str(), self.table2.build(params));
        if let Some(condition) = &self.condition {
            line.push(' ');
            line.push_str(&condition.build(params));
        }
        lines.push(line);
        lines
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clause::SelectClause;
    use crate::clause::{FromClause, GroupByClause};
    use crate::expr::{ColumnReference, Expr, Function};

    fn on(left: &str, right: &str) -> Option<JoinCondition> {
        Some(JoinCondition::On(Predicate::equals(
            Expr::col(left),
            Expr::col(right),
        )))
    }

    #[test]
    fn test_three_way_join_lines_in_order() {
        let tree = TableReference::from("film")
            .join(
                JoinType::LeftOuter,
                "language",
                on("film.language_id", "language.language_id"),
            )
            .unwrap()
            .join(
                JoinType::Inner,
                "film_actor",
                on("film_actor.film_id", "film.film_id"),
            )
            .unwrap();

        let mut params = Vec::new();
        let lines = tree.as_lines(&mut params);
        assert_eq!(
            lines,
            vec![
                "film".to_string(),
                "LEFT OUTER JOIN language ON film.language_id = language.language_id".to_string(),
                "INNER JOIN film_actor ON film_actor.film_id = film.film_id".to_string(),
            ]
        );
        assert!(params.is_empty());
        assert!(tree.joins_table("film_actor"));
        assert!(!tree.joins_table("film"));
    }

    #[test]
    fn test_condition_must_match_join_type() {
        assert!(TableReference::from("a").join(JoinType::Inner, "b", None).is_err());
        assert!(
            TableReference::from("a")
                .join(JoinType::Cross, "b", on("a.x", "b.x"))
                .is_err()
        );
        let natural = TableReference::from("a")
            .join(JoinType::Natural, "b", None)
            .unwrap();
        assert_eq!(natural.as_lines(&mut Vec::new())[1], "NATURAL JOIN b");
    }

    #[test]
    fn test_using_condition() {
        let tree = TableReference::from("film")
            .join(
                JoinType::Inner,
                "film_text",
                Some(JoinCondition::Using(vec!["film_id".into()])),
            )
            .unwrap();
        assert_eq!(
            tree.as_lines(&mut Vec::new())[1],
            "INNER JOIN film_text USING (film_id)"
        );
    }

    #[test]
    fn test_subquery_target_params_precede_on_params() {
        let sub = Query::new(
            SelectClause::new(vec![
                Some(ColumnReference::new("film_id").alias("film_id").into()),
                Some(Function::new("COUNT", vec![Expr::star()]).alias("aggr").into()),
            ])
            .unwrap(),
            FromClause::new("inventory"),
        )
        .with_where(Predicate::greater_than_or_equals(
            Expr::col("store_id"),
            Expr::param(1_i64),
        ))
        .with_group_by(GroupByClause::new(vec![Expr::col("film_id")]))
        .as_subquery("film_inventory");

        let tree = TableReference::from("film")
            .join(
                JoinType::LeftOuter,
                sub,
                Some(JoinCondition::On(
                    Predicate::equals(
                        Expr::col("film_inventory.film_id"),
                        Expr::col("film.film_id"),
                    )
                    .and(Predicate::equals(Expr::col("film.rating"), Expr::param("PG"))),
                )),
            )
            .unwrap();

        let mut params = Vec::new();
        let lines = tree.as_lines(&mut params);
        assert!(lines[1].starts_with("LEFT OUTER JOIN (SELECT film_id AS film_id, COUNT(*) AS aggr"));
        assert!(lines[1].contains(") AS film_inventory ON film_inventory.film_id = film.film_id"));
        assert_eq!(params, vec![Value::BigInt(1), Value::from("PG")]);
    }
}
