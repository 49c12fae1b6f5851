//! Statement objects.
//!
//! Each statement composes clauses into one renderable unit whose `params()`
//! match its `?` placeholders one to one.

use crate::clause::{
    DeleteClause, FromClause, GroupByClause, HavingClause, InsertClause, LINE_SEPARATOR,
    OrderByClause, Pagination, SelectClause, SetClause, UpdateClause, ValuesClause, WhereClause,
};
use crate::expr::{Predicate, Render};
use sqlwizz_core::{Error, Model, Result, Value};

/// SELECT statement.
///
/// Clauses render in a fixed order (select, from, where, group by, having,
/// order by, pagination); absent clauses are skipped.
#[derive(Debug, Clone, PartialEq)]
pub struct Query {
    pub select: SelectClause,
    pub from: FromClause,
    pub where_clause: Option<WhereClause>,
    pub group_by: Option<GroupByClause>,
    pub having: Option<HavingClause>,
    pub order_by: Option<OrderByClause>,
    pub pagination: Option<Pagination>,
    /// Render wrapped in parentheses for use as a derived table
    pub is_subquery: bool,
    pub alias: Option<String>,
}

impl Query {
    pub fn new(select: SelectClause, from: FromClause) -> Self {
        Self {
            select,
            from,
            where_clause: None,
            group_by: None,
            having: None,
            order_by: None,
            pagination: None,
            is_subquery: false,
            alias: None,
        }
    }

    pub fn with_where(mut self, condition: Predicate) -> Self {
        self.where_clause = Some(WhereClause::new(condition));
        self
    }

    pub fn with_group_by(mut self, group_by: GroupByClause) -> Self {
        self.group_by = Some(group_by);
        self
    }

    pub fn with_having(mut self, condition: Predicate) -> Self {
        self.having = Some(HavingClause::new(condition));
        self
    }

    pub fn with_order_by(mut self, order_by: OrderByClause) -> Self {
        self.order_by = Some(order_by);
        self
    }

    pub fn with_pagination(mut self, pagination: Pagination) -> Self {
        self.pagination = Some(pagination);
        self
    }

    /// Mark as a derived table named `alias`.
    pub fn as_subquery(mut self, alias: impl Into<String>) -> Self {
        self.is_subquery = true;
        self.alias = Some(alias.into());
        self
    }
}

impl Render for Query {
    fn build(&self, params: &mut Vec<Value>) -> String {
        let mut lines = vec![self.select.build(params), self.from.build(params)];
        if let Some(clause) = &self.where_clause {
            lines.push(clause.build(params));
        }
        if let Some(clause) = &self.group_by {
            lines.push(clause.build(params));
        }
        if let Some(clause) = &self.having {
            lines.push(clause.build(params));
        }
        if let Some(clause) = &self.order_by {
            lines.push(clause.build(params));
        }
        if let Some(clause) = &self.pagination {
            lines.push(clause.build(params));
        }
        let sql = lines.join(LINE_SEPARATOR);
        if !self.is_subquery {
            return sql;
        }
        match &self.alias {
            Some(alias) => format!("({}) AS {}", sql, alias),
            None => format!("({})", sql),
        }
    }
}

/// INSERT statement.
#[derive(Debug, Clone, PartialEq)]
pub struct InsertQuery {
    pub insert: InsertClause,
    pub values: ValuesClause,
}

impl InsertQuery {
    /// Build from an ordered column -> value list.
    pub fn build(table: impl Into<String>, inserts: Vec<(String, Value)>) -> Result<Self> {
        let table = table.into();
        if inserts.is_empty() {
            return Err(Error::config(format!("INSERT into {} has no columns", table)));
        }
        let (columns, values): (Vec<String>, Vec<Value>) = inserts.into_iter().unzip();
        Ok(Self {
            insert: InsertClause::new(table, columns),
            values: ValuesClause::new(values),
        })
    }
}

impl Render for InsertQuery {
    fn build(&self, params: &mut Vec<Value>) -> String {
        let insert = self.insert.build(params);
        let values = self.values.build(params);
        format!("{}{}{}", insert, LINE_SEPARATOR, values)
    }
}

/// UPDATE statement.
#[derive(Debug, Clone, PartialEq)]
pub struct UpdateQuery {
    pub update: UpdateClause,
    pub set: SetClause,
    pub where_clause: Option<WhereClause>,
}

impl UpdateQuery {
    /// UPDATE the model's table with `updates`, restricted by `filter_condition`.
    pub fn build(
        model: &Model,
        filter_condition: Option<Predicate>,
        updates: Vec<(String, Value)>,
    ) -> Result<Self> {
        let table = model.table_name()?;
        if updates.is_empty() {
            return Err(Error::config(format!("UPDATE of {} has nothing to set", table)));
        }
        Ok(Self {
            update: UpdateClause::new(table),
            set: SetClause::new(updates),
            where_clause: filter_condition.map(WhereClause::new),
        })
    }
}

impl Render for UpdateQuery {
    fn build(&self, params: &mut Vec<Value>) -> String {
        let mut lines = vec![self.update.build(params), self.set.build(params)];
        if let Some(clause) = &self.where_clause {
            lines.push(clause.build(params));
        }
        lines.join(LINE_SEPARATOR)
    }
}

/// DELETE statement. A condition is mandatory.
#[derive(Debug, Clone, PartialEq)]
pub struct DeleteQuery {
    pub delete: DeleteClause,
    pub where_clause: WhereClause,
}

impl DeleteQuery {
    /// Fails immediately when `condition` is `None`.
    pub fn new(table: impl Into<String>, condition: Option<Predicate>) -> Result<Self> {
        let table = table.into();
        let condition = condition.ok_or_else(|| {
            Error::config(format!("DELETE from {} requires a condition", table))
        })?;
        Ok(Self {
            delete: DeleteClause::new(table),
            where_clause: WhereClause::new(condition),
        })
    }
}

impl Render for DeleteQuery {
    fn build(&self, params: &mut Vec<Value>) -> String {
        let delete = self.delete.build(params);
        let condition = self.where_clause.build(params);
        format!("{}{}{}", delete, LINE_SEPARATOR, condition)
    }
}

/// Column of a CREATE TABLE statement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnDefinition {
    pub name: String,
    pub data_type: String,
    pub primary_key: bool,
    pub not_null: bool,
    pub unique: bool,
}

impl ColumnDefinition {
    pub fn new(name: impl Into<String>, data_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            data_type: data_type.into(),
            primary_key: false,
            not_null: false,
            unique: false,
        }
    }

    pub fn primary_key(mut self) -> Self {
        self.primary_key = true;
        self
    }

    pub fn not_null(mut self) -> Self {
        self.not_null = true;
        self
    }

    pub fn unique(mut self) -> Self {
        self.unique = true;
        self
    }

    fn sql(&self) -> String {
        let mut def = format!("{} {}", self.name, self.data_type);
        if self.primary_key {
            def.push_str(" PRIMARY KEY");
        }
        if self.not_null {
            def.push_str(" NOT NULL");
        }
        if self.unique && !self.primary_key {
            def.push_str(" UNIQUE");
        }
        def
    }
}

/// Table-level FOREIGN KEY constraint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ForeignKeyConstraint {
    pub column: String,
    pub references_table: String,
    pub references_column: String,
}

/// CREATE TABLE statement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateTableQuery {
    pub table: String,
    pub columns: Vec<ColumnDefinition>,
    pub foreign_keys: Vec<ForeignKeyConstraint>,
    pub if_not_exists: bool,
}

impl CreateTableQuery {
    pub fn build(
        table: impl Into<String>,
        columns: Vec<ColumnDefinition>,
        if_not_exists: bool,
    ) -> Result<Self> {
        let table = table.into();
        if columns.is_empty() {
            return Err(Error::config(format!("CREATE TABLE {} has no columns", table)));
        }
        Ok(Self {
            table,
            columns,
            foreign_keys: Vec::new(),
            if_not_exists,
        })
    }

    /// Add `FOREIGN KEY (column) REFERENCES table (column)`.
    pub fn foreign_key(
        mut self,
        column: impl Into<String>,
        references_table: impl Into<String>,
        references_column: impl Into<String>,
    ) -> Self {
        self.foreign_keys.push(ForeignKeyConstraint {
            column: column.into(),
            references_table: references_table.into(),
            references_column: references_column.into(),
        });
        self
    }
}

impl Render for CreateTableQuery {
    fn build(&self, _params: &mut Vec<Value>) -> String {
        let mut sql = String::from("CREATE TABLE ");
        if self.if_not_exists {
            sql.push_str("IF NOT EXISTS ");
        }
        sql.push_str(&self.table);
        sql.push_str(" (");

        let parts: Vec<String> = self
            .columns
            .iter()
            .map(ColumnDefinition::sql)
            .chain(self.foreign_keys.iter().map(|fk| {
                format!(
                    "FOREIGN KEY ({}) REFERENCES {} ({})",
                    fk.column, fk.references_table, fk.references_column
                )
            }))
            .collect();

        sql.push_str(LINE_SEPARATOR);
        sql.push_str(&parts.join(&format!(",{}", LINE_SEPARATOR)));
        sql.push_str("\n)");
        sql
    }
}

/// Any executable statement.
#[derive(Debug, Clone, PartialEq)]
pub enum Statement {
    Select(Query),
    Insert(InsertQuery),
    Update(UpdateQuery),
    Delete(DeleteQuery),
    CreateTable(CreateTableQuery),
}

impl Render for Statement {
    fn build(&self, params: &mut Vec<Value>) -> String {
        match self {
            Statement::Select(q) => q.build(params),
            Statement::Insert(q) => q.build(params),
            Statement::Update(q) => q.build(params),
            Statement::Delete(q) => q.build(params),
            Statement::CreateTable(q) => q.build(params),
        }
    }
}

impl From<Query> for Statement {
    fn from(q: Query) -> Self {
        Statement::Select(q)
    }
}

impl From<InsertQuery> for Statement {
    fn from(q: InsertQuery) -> Self {
        Statement::Insert(q)
    }
}

impl From<UpdateQuery> for Statement {
    fn from(q: UpdateQuery) -> Self {
        Statement::Update(q)
    }
}

impl From<DeleteQuery> for Statement {
    fn from(q: DeleteQuery) -> Self {
        Statement::Delete(q)
    }
}

impl From<CreateTableQuery> for Statement {
    fn from(q: CreateTableQuery) -> Self {
        Statement::CreateTable(q)
    }
}
