//! Junction-table operations for many-to-many relations.

use regex::Regex;
use sqlwizz_core::{Error, Result, Value};
use sqlwizz_query::{ColumnReference, DeleteQuery, InsertQuery, Predicate, Statement};
use std::sync::OnceLock;

/// One junction-row change.
#[derive(Debug, Clone, PartialEq)]
pub enum LinkOp {
    /// INSERT a junction row.
    Link {
        table: String,
        owner_column: String,
        owner_value: Value,
        foreign_column: String,
        foreign_value: Value,
    },
    /// DELETE a junction row.
    Unlink {
        table: String,
        owner_column: String,
        owner_value: Value,
        foreign_column: String,
        foreign_value: Value,
    },
}

impl LinkOp {
    pub fn table(&self) -> &str {
        match self {
            LinkOp::Link { table, .. } | LinkOp::Unlink { table, .. } => table,
        }
    }

    pub fn is_link(&self) -> bool {
        matches!(self, LinkOp::Link { .. })
    }

    pub fn is_unlink(&self) -> bool {
        matches!(self, LinkOp::Unlink { .. })
    }

    /// The foreign id this operation adds or removes.
    pub fn foreign_value(&self) -> &Value {
        match self {
            LinkOp::Link { foreign_value, .. } | LinkOp::Unlink { foreign_value, .. } => {
                foreign_value
            }
        }
    }

    /// Build the INSERT or DELETE statement.
    pub fn to_statement(&self) -> Result<Statement> {
        match self {
            LinkOp::Link {
                table,
                owner_column,
                owner_value,
                foreign_column,
                foreign_value,
            } => Ok(InsertQuery::build(
                table.as_str(),
                vec![
                    (owner_column.clone(), owner_value.clone()),
                    (foreign_column.clone(), foreign_value.clone()),
                ],
            )?
            .into()),
            LinkOp::Unlink {
                table,
                owner_column,
                owner_value,
                foreign_column,
                foreign_value,
            } => {
                let condition = Predicate::column_as_parameter(
                    ColumnReference::qualified(table.as_str(), owner_column.as_str()),
                    owner_value.clone(),
                )
                .and(Predicate::column_as_parameter(
                    ColumnReference::qualified(table.as_str(), foreign_column.as_str()),
                    foreign_value.clone(),
                ));
                Ok(DeleteQuery::new(table.as_str(), Some(condition))?.into())
            }
        }
    }
}

/// The operations turning the junction rows of one owner from `actual`
/// into `wanted`.
///
/// Links come first, in `wanted` order, followed by unlinks in `actual`
/// order. Ids present on both sides produce nothing.
#[derive(Debug, Clone, PartialEq)]
pub struct LinkPlan {
    pub ops: Vec<LinkOp>,
}

impl LinkPlan {
    pub fn reconcile(
        table: &str,
        owner_column: &str,
        owner_value: &Value,
        foreign_column: &str,
        actual: &[Value],
        wanted: &[Value],
    ) -> Self {
        let (to_add, to_remove) = diff_ids(actual, wanted);
        let op = |value: Value, link: bool| {
            let (table, owner_column, owner_value, foreign_column) = (
                table.to_string(),
                owner_column.to_string(),
                owner_value.clone(),
                foreign_column.to_string(),
            );
            if link {
                LinkOp::Link {
                    table,
                    owner_column,
                    owner_value,
                    foreign_column,
                    foreign_value: value,
                }
            } else {
                LinkOp::Unlink {
                    table,
                    owner_column,
                    owner_value,
                    foreign_column,
                    foreign_value: value,
                }
            }
        };
        let ops = to_add
            .into_iter()
            .map(|v| op(v, true))
            .chain(to_remove.into_iter().map(|v| op(v, false)))
            .collect();
        Self { ops }
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    pub fn links(&self) -> impl Iterator<Item = &LinkOp> {
        self.ops.iter().filter(|op| op.is_link())
    }

    pub fn unlinks(&self) -> impl Iterator<Item = &LinkOp> {
        self.ops.iter().filter(|op| op.is_unlink())
    }

    pub fn statements(&self) -> Result<Vec<Statement>> {
        self.ops.iter().map(LinkOp::to_statement).collect()
    }
}

/// `(wanted - actual, actual - wanted)`, order preserved and deduplicated.
pub fn diff_ids(actual: &[Value], wanted: &[Value]) -> (Vec<Value>, Vec<Value>) {
    let contains = |set: &[Value], v: &Value| set.iter().any(|x| x.same_as(v));
    let mut to_add: Vec<Value> = Vec::new();
    for id in wanted {
        if !contains(actual, id) && !contains(&to_add, id) {
            to_add.push(id.clone());
        }
    }
    let mut to_remove: Vec<Value> = Vec::new();
    for id in actual {
        if !contains(wanted, id) && !contains(&to_remove, id) {
            to_remove.push(id.clone());
        }
    }
    (to_add, to_remove)
}

fn id_token_regex() -> Result<&'static Regex> {
    static TOKEN: OnceLock<std::result::Result<Regex, regex::Error>> = OnceLock::new();
    TOKEN
        .get_or_init(|| Regex::new(r#"-?\d+|'[^']*'|"[^"]*"|[^\s,\[\]'"]+"#))
        .as_ref()
        .map_err(|e| Error::config(format!("invalid id list pattern: {}", e)))
}

/// Interpret a written many-to-many value as a list of foreign ids.
///
/// Accepts an array, a single id, or text such as `"[1, 2, 3]"` or
/// `"['a', 'b']"`. Integer tokens become `BigInt`, others `Text`.
pub fn parse_id_list(value: &Value) -> Result<Vec<Value>> {
    match value {
        Value::Null => Ok(Vec::new()),
        Value::Array(items) => Ok(items.clone()),
        Value::Int(_) | Value::BigInt(_) => Ok(vec![value.clone()]),
        Value::Text(text) => {
            let regex = id_token_regex()?;
            Ok(regex
                .find_iter(text)
                .map(|token| {
                    let token = token.as_str();
                    match token.parse::<i64>() {
                        Ok(id) => Value::BigInt(id),
                        Err(_) => Value::Text(token.trim_matches(['\'', '"']).to_string()),
                    }
                })
                .collect())
        }
        other => Err(Error::config(format!(
            "cannot read a list of ids from a {} value",
            other.type_name()
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlwizz_query::Render;

    fn ids(values: &[i64]) -> Vec<Value> {
        values.iter().map(|v| Value::BigInt(*v)).collect()
    }

    #[test]
    fn test_reconcile_adds_and_removes_only_differences() {
        let plan = LinkPlan::reconcile(
            "film_actor",
            "film_id",
            &Value::BigInt(7),
            "actor_id",
            &ids(&[1, 2, 3]),
            &ids(&[2, 3, 4]),
        );
        assert_eq!(plan.ops.len(), 2);
        let links: Vec<&Value> = plan.links().map(LinkOp::foreign_value).collect();
        let unlinks: Vec<&Value> = plan.unlinks().map(LinkOp::foreign_value).collect();
        assert_eq!(links, vec![&Value::BigInt(4)]);
        assert_eq!(unlinks, vec![&Value::BigInt(1)]);
    }

    #[test]
    fn test_reconcile_ignores_integer_width_and_duplicates() {
        let (add, remove) = diff_ids(
            &[Value::Int(1), Value::Int(2)],
            &[Value::BigInt(2), Value::BigInt(1), Value::BigInt(5), Value::BigInt(5)],
        );
        assert_eq!(add, ids(&[5]));
        assert!(remove.is_empty());
    }

    #[test]
    fn test_link_statements() {
        let plan = LinkPlan::reconcile(
            "film_actor",
            "film_id",
            &Value::BigInt(7),
            "actor_id",
            &ids(&[1]),
            &ids(&[4]),
        );
        let statements = plan.statements().unwrap();
        let (insert, insert_params) = statements[0].render();
        assert_eq!(
            insert,
            "INSERT INTO film_actor (film_id, actor_id)\n    VALUES (?, ?)"
        );
        assert_eq!(insert_params, ids(&[7, 4]));

        let (delete, delete_params) = statements[1].render();
        assert_eq!(
            delete,
            "DELETE FROM film_actor\n    WHERE film_actor.film_id = ? AND film_actor.actor_id = ?"
        );
        assert_eq!(delete_params, ids(&[7, 1]));
    }

    #[test]
    fn test_parse_id_list() {
        assert_eq!(parse_id_list(&Value::from("[1, 2, 3]")).unwrap(), ids(&[1, 2, 3]));
        assert_eq!(parse_id_list(&Value::from("4")).unwrap(), ids(&[4]));
        assert_eq!(
            parse_id_list(&Value::from("['PG', \"R\"]")).unwrap(),
            vec![Value::from("PG"), Value::from("R")]
        );
        assert!(parse_id_list(&Value::from("[]")).unwrap().is_empty());
        assert_eq!(
            parse_id_list(&Value::Array(ids(&[8, 9]))).unwrap(),
            ids(&[8, 9])
        );
        assert!(parse_id_list(&Value::Bool(true)).unwrap_err().is_config());
    }
}
