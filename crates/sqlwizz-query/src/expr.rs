//! SQL expressions and predicates.
//!
//! Every node renders itself through [`Render::build`], appending the values
//! it binds to a shared parameter list in the same left-to-right order as the
//! `?` placeholders it writes. `params()` is derived from the same walk, so a
//! node's text and its bind list cannot drift apart.
//!
//! Caller-supplied scalars belong in [`Expr::Parameter`]. [`Literal`] nodes are
//! inlined into the SQL text and are meant for constants chosen by code.

use sqlwizz_core::{Error, Model, Result, Value};
use std::fmt::Write as _;

/// A node that renders to parameterized SQL text.
pub trait Render {
    /// Render into `params`, returning the SQL text.
    fn build(&self, params: &mut Vec<Value>) -> String;

    /// Render to SQL text plus its ordered bind list.
    fn render(&self) -> (String, Vec<Value>) {
        let mut params = Vec::new();
        let sql = self.build(&mut params);
        (sql, params)
    }

    /// The ordered bind list matching the rendered placeholders.
    fn params(&self) -> Vec<Value> {
        self.render().1
    }
}

/// A numeric literal parsed leniently from text.
#[derive(Debug, Clone, PartialEq)]
pub enum Numeric {
    Int(i64),
    Float(f64),
    /// Text that parsed as neither; rendered unchanged
    Raw(String),
}

impl Numeric {
    /// Parse as an integer, then as a float, else keep the text. Never fails.
    pub fn parse(text: &str) -> Self {
        let trimmed = text.trim();
        if let Ok(v) = trimmed.parse::<i64>() {
            Numeric::Int(v)
        } else if let Ok(v) = trimmed.parse::<f64>() {
            Numeric::Float(v)
        } else {
            Numeric::Raw(text.to_string())
        }
    }
}

/// Inline constant.
#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    String(String),
    Numerical(Numeric),
    /// ISO-8601 date or timestamp text
    Date(String),
    /// `TRUE`, `FALSE`, or `UNKNOWN` for `None`
    Boolean(Option<bool>),
}

impl Literal {
    pub fn string(value: impl Into<String>) -> Self {
        Literal::String(value.into())
    }

    /// Numeric literal from text, see [`Numeric::parse`].
    pub fn numerical(text: &str) -> Self {
        Literal::Numerical(Numeric::parse(text))
    }

    pub fn integer(value: i64) -> Self {
        Literal::Numerical(Numeric::Int(value))
    }

    pub fn date(value: impl Into<String>) -> Self {
        Literal::Date(value.into())
    }

    pub fn boolean(value: Option<bool>) -> Self {
        Literal::Boolean(value)
    }

    fn sql_text(&self) -> String {
        match self {
            Literal::String(s) | Literal::Date(s) => quote(s),
            Literal::Numerical(Numeric::Int(v)) => v.to_string(),
            Literal::Numerical(Numeric::Float(v)) => v.to_string(),
            Literal::Numerical(Numeric::Raw(s)) => s.clone(),
            Literal::Boolean(Some(true)) => "TRUE".to_string(),
            Literal::Boolean(Some(false)) => "FALSE".to_string(),
            Literal::Boolean(None) => "UNKNOWN".to_string(),
        }
    }
}

fn quote(text: &str) -> String {
    format!("'{}'", text.replace('\'', "''"))
}

/// A column, optionally qualified by table and renamed in projections.
///
/// Equality compares `name` and `table` only, so a projection item matches
/// the result column it produced whatever its alias.
#[derive(Debug, Clone, Eq)]
pub struct ColumnReference {
    pub name: String,
    pub table: Option<String>,
    pub alias: Option<String>,
}

impl ColumnReference {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            table: None,
            alias: None,
        }
    }

    pub fn qualified(table: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            table: Some(table.into()),
            alias: None,
        }
    }

    pub fn alias(mut self, alias: impl Into<String>) -> Self {
        self.alias = Some(alias.into());
        self
    }

    /// Qualify with `table` unless already qualified.
    pub fn or_table(mut self, table: &str) -> Self {
        if self.table.is_none() {
            self.table = Some(table.to_string());
        }
        self
    }

    /// `table.name`, or bare `name`.
    pub fn qualified_name(&self) -> String {
        match &self.table {
            Some(table) => format!("{}.{}", table, self.name),
            None => self.name.clone(),
        }
    }
}

impl PartialEq for ColumnReference {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name && self.table == other.table
    }
}

impl From<&str> for ColumnReference {
    /// Accepts `"column"` or `"table.column"`.
    fn from(text: &str) -> Self {
        match text.split_once('.') {
            Some((table, name)) => ColumnReference::qualified(table, name),
            None => ColumnReference::new(text),
        }
    }
}

/// SQL function call such as `COUNT(*)`.
#[derive(Debug, Clone, PartialEq)]
pub struct Function {
    pub name: String,
    pub args: Vec<Expr>,
    /// Rendered as `AS alias` in projections
    pub alias: Option<String>,
}

impl Function {
    pub fn new(name: impl Into<String>, args: Vec<Expr>) -> Self {
        Self {
            name: name.into(),
            args,
            alias: None,
        }
    }

    pub fn alias(mut self, alias: impl Into<String>) -> Self {
        self.alias = Some(alias.into());
        self
    }
}

/// Value expression.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Literal(Literal),
    /// Bound value, rendered as `?`
    Parameter(Value),
    Column(ColumnReference),
    Function(Function),
    /// Verbatim text such as `*`
    Raw(String),
}

impl Expr {
    pub fn param(value: impl Into<Value>) -> Self {
        Expr::Parameter(value.into())
    }

    /// A column from `"column"` or `"table.column"`.
    pub fn col(name: &str) -> Self {
        Expr::Column(ColumnReference::from(name))
    }

    pub fn raw(text: impl Into<String>) -> Self {
        Expr::Raw(text.into())
    }

    /// `*`
    pub fn star() -> Self {
        Expr::Raw("*".to_string())
    }

    /// True for items that render to nothing and are dropped from projections.
    pub fn is_blank(&self) -> bool {
        match self {
            Expr::Raw(text) => text.trim().is_empty(),
            Expr::Column(col) => col.name.is_empty(),
            _ => false,
        }
    }

    /// The referenced column, if this is a column expression.
    pub fn as_column(&self) -> Option<&ColumnReference> {
        match self {
            Expr::Column(col) => Some(col),
            _ => None,
        }
    }

    /// Render as a projection item, including any `AS alias`.
    pub fn build_projection(&self, params: &mut Vec<Value>) -> String {
        let alias = match self {
            Expr::Column(col) => col.alias.as_deref(),
            Expr::Function(func) => func.alias.as_deref(),
            _ => None,
        };
        let sql = self.build(params);
        match alias {
            Some(alias) => format!("{} AS {}", sql, alias),
            None => sql,
        }
    }

    fn collect_columns<'a>(&'a self, out: &mut Vec<&'a ColumnReference>) {
        match self {
            Expr::Column(col) => out.push(col),
            Expr::Function(func) => func.args.iter().for_each(|arg| arg.collect_columns(out)),
            _ => {}
        }
    }
}

impl Render for Expr {
    fn build(&self, params: &mut Vec<Value>) -> String {
        match self {
            Expr::Literal(lit) => lit.sql_text(),
            Expr::Parameter(value) => {
                params.push(value.clone());
                "?".to_string()
            }
            Expr::Column(col) => col.qualified_name(),
            Expr::Function(func) => {
                let args: Vec<String> = func.args.iter().map(|arg| arg.build(params)).collect();
                format!("{}({})", func.name, args.join(", "))
            }
            Expr::Raw(text) => text.clone(),
        }
    }
}

impl From<ColumnReference> for Expr {
    fn from(col: ColumnReference) -> Self {
        Expr::Column(col)
    }
}

impl From<Literal> for Expr {
    fn from(lit: Literal) -> Self {
        Expr::Literal(lit)
    }
}

impl From<Function> for Expr {
    fn from(func: Function) -> Self {
        Expr::Function(func)
    }
}

/// Comparison operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComparisonOp {
    Equals,
    NotEquals,
    LessThan,
    LessThanOrEquals,
    GreaterThan,
    GreaterThanOrEquals,
    Like,
}

impl ComparisonOp {
    pub const fn as_str(&self) -> &'static str {
        match self {
            ComparisonOp::Equals => "=",
            ComparisonOp::NotEquals => "<>",
            ComparisonOp::LessThan => "<",
            ComparisonOp::LessThanOrEquals => "<=",
            ComparisonOp::GreaterThan => ">",
            ComparisonOp::GreaterThanOrEquals => ">=",
            ComparisonOp::Like => "LIKE",
        }
    }
}

/// Boolean connectives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BooleanOp {
    And,
    Or,
}

impl BooleanOp {
    pub const fn as_str(&self) -> &'static str {
        match self {
            BooleanOp::And => "AND",
            BooleanOp::Or => "OR",
        }
    }
}

/// Boolean-valued expression used in WHERE, HAVING and ON.
#[derive(Debug, Clone, PartialEq)]
pub enum Predicate {
    Comparison {
        op: ComparisonOp,
        lhs: Expr,
        rhs: Expr,
    },
    Boolean {
        op: BooleanOp,
        lhs: Box<Predicate>,
        rhs: Box<Predicate>,
    },
    Not(Box<Predicate>),
    /// `TRUE`, `FALSE` or `UNKNOWN`
    Literal(Option<bool>),
}

impl Predicate {
    pub fn compare(lhs: impl Into<Expr>, op: ComparisonOp, rhs: impl Into<Expr>) -> Self {
        Predicate::Comparison {
            op,
            lhs: lhs.into(),
            rhs: rhs.into(),
        }
    }

    pub fn equals(lhs: impl Into<Expr>, rhs: impl Into<Expr>) -> Self {
        Self::compare(lhs, ComparisonOp::Equals, rhs)
    }

    pub fn like(lhs: impl Into<Expr>, pattern: impl Into<Expr>) -> Self {
        Self::compare(lhs, ComparisonOp::Like, pattern)
    }

    pub fn greater_than_or_equals(lhs: impl Into<Expr>, rhs: impl Into<Expr>) -> Self {
        Self::compare(lhs, ComparisonOp::GreaterThanOrEquals, rhs)
    }

    /// `table.pk = ?` bound to `id`.
    pub fn id_as_parameter(model: &Model, id: impl Into<Value>) -> Result<Self> {
        let column = ColumnReference::qualified(model.table_name()?, model.id_field_name()?);
        Ok(Self::column_as_parameter(column, id))
    }

    /// `column = ?` bound to `value`.
    pub fn column_as_parameter(column: ColumnReference, value: impl Into<Value>) -> Self {
        Self::equals(column, Expr::param(value))
    }

    pub fn and(self, other: Predicate) -> Self {
        Predicate::Boolean {
            op: BooleanOp::And,
            lhs: Box::new(self),
            rhs: Box::new(other),
        }
    }

    pub fn or(self, other: Predicate) -> Self {
        Predicate::Boolean {
            op: BooleanOp::Or,
            lhs: Box::new(self),
            rhs: Box::new(other),
        }
    }

    pub fn not(self) -> Self {
        Predicate::Not(Box::new(self))
    }

    /// Left-fold a non-empty list into `((p1 op p2) op p3) ...`.
    pub fn concat(op: BooleanOp, predicates: Vec<Predicate>) -> Result<Self> {
        let mut iter = predicates.into_iter();
        let first = iter.next().ok_or_else(|| {
            Error::config(format!("cannot combine an empty predicate list with {}", op.as_str()))
        })?;
        Ok(iter.fold(first, |acc, next| Predicate::Boolean {
            op,
            lhs: Box::new(acc),
            rhs: Box::new(next),
        }))
    }

    pub fn and_all(predicates: Vec<Predicate>) -> Result<Self> {
        Self::concat(BooleanOp::And, predicates)
    }

    pub fn or_all(predicates: Vec<Predicate>) -> Result<Self> {
        Self::concat(BooleanOp::Or, predicates)
    }

    /// Columns referenced anywhere in the tree, left to right.
    pub fn columns(&self) -> Vec<&ColumnReference> {
        let mut out = Vec::new();
        self.collect_columns(&mut out);
        out
    }

    fn collect_columns<'a>(&'a self, out: &mut Vec<&'a ColumnReference>) {
        match self {
            Predicate::Comparison { lhs, rhs, .. } => {
                lhs.collect_columns(out);
                rhs.collect_columns(out);
            }
            Predicate::Boolean { lhs, rhs, .. } => {
                lhs.collect_columns(out);
                rhs.collect_columns(out);
            }
            Predicate::Not(inner) => inner.collect_columns(out),
            Predicate::Literal(_) => {}
        }
    }

    fn build_operand(&self, parent: BooleanOp, params: &mut Vec<Value>) -> String {
        match self {
            Predicate::Boolean { op, .. } if *op != parent => format!("({})", self.build(params)),
            _ => self.build(params),
        }
    }
}

impl Render for Predicate {
    fn build(&self, params: &mut Vec<Value>) -> String {
        match self {
            Predicate::Comparison { op, lhs, rhs } => {
                let mut sql = lhs.build(params);
                let _ = write!(sql, " {} {}", op.as_str(), rhs.build(params));
                sql
            }
            Predicate::Boolean { op, lhs, rhs } => {
                let left = lhs.build_operand(*op, params);
                let right = rhs.build_operand(*op, params);
                format!("{} {} {}", left, op.as_str(), right)
            }
            Predicate::Not(inner) => match inner.as_ref() {
                Predicate::Boolean { .. } => format!("NOT ({})", inner.build(params)),
                _ => format!("NOT {}", inner.build(params)),
            },
            Predicate::Literal(value) => Literal::Boolean(*value).sql_text(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlwizz_core::Field;

    fn placeholders(sql: &str) -> usize {
        sql.matches('?').count()
    }

    #[test]
    fn test_numeric_lenient_parse() {
        assert_eq!(Numeric::parse("42"), Numeric::Int(42));
        assert_eq!(Numeric::parse("4.5"), Numeric::Float(4.5));
        assert_eq!(Numeric::parse("abc"), Numeric::Raw("abc".to_string()));
        assert_eq!(Literal::numerical(" 7 ").sql_text(), "7");
        assert_eq!(Literal::numerical("n/a").sql_text(), "n/a");
    }

    #[test]
    fn test_literals_render_inline() {
        let (sql, params) = Expr::from(Literal::string("O'Hara")).render();
        assert_eq!(sql, "'O''Hara'");
        assert!(params.is_empty());
        assert_eq!(Literal::date("2006-02-15").sql_text(), "'2006-02-15'");
        assert_eq!(Literal::boolean(Some(true)).sql_text(), "TRUE");
        assert_eq!(Literal::boolean(None).sql_text(), "UNKNOWN");
    }

    #[test]
    fn test_id_as_parameter() {
        let model = Model::new("Dummy")
            .table("dummy_table")
            .field(Field::integer("dummy_id").primary_key());
        let pred = Predicate::id_as_parameter(&model, 17_i64).unwrap();
        let (sql, params) = pred.render();
        assert_eq!(sql, "dummy_table.dummy_id = ?");
        assert_eq!(params, vec![Value::BigInt(17)]);
        assert!(!sql.contains("17"));
    }

    #[test]
    fn test_id_as_parameter_without_primary_key() {
        let model = Model::new("Log").table("log").field(Field::string("line"));
        assert!(Predicate::id_as_parameter(&model, 1_i64).is_err());
    }

    #[test]
    fn test_column_as_parameter_never_inlines() {
        let pred = Predicate::column_as_parameter(
            ColumnReference::qualified("film", "title"),
            "x' OR '1'='1",
        );
        let (sql, params) = pred.render();
        assert_eq!(sql, "film.title = ?");
        assert_eq!(params, vec![Value::Text("x' OR '1'='1".into())]);
    }

    #[test]
    fn test_params_follow_render_order() {
        let pred = Predicate::and_all(vec![
            Predicate::column_as_parameter(ColumnReference::new("a"), 1_i64),
            Predicate::or_all(vec![
                Predicate::like(Expr::col("b"), Expr::param("%x%")),
                Predicate::greater_than_or_equals(Expr::col("c"), Expr::param(3_i64)),
            ])
            .unwrap(),
            Predicate::column_as_parameter(ColumnReference::new("d"), 4_i64).not(),
        ])
        .unwrap();

        let (sql, params) = pred.render();
        assert_eq!(sql, "a = ? AND (b LIKE ? OR c >= ?) AND NOT d = ?");
        assert_eq!(
            params,
            vec![
                Value::BigInt(1),
                Value::Text("%x%".into()),
                Value::BigInt(3),
                Value::BigInt(4)
            ]
        );
        assert_eq!(placeholders(&sql), pred.params().len());
    }

    #[test]
    fn test_concat_left_folds() {
        let parts = vec![
            Predicate::equals(Expr::col("a"), Expr::param(1_i64)),
            Predicate::equals(Expr::col("b"), Expr::param(2_i64)),
            Predicate::equals(Expr::col("c"), Expr::param(3_i64)),
        ];
        match Predicate::or_all(parts).unwrap() {
            Predicate::Boolean { op, lhs, .. } => {
                assert_eq!(op, BooleanOp::Or);
                assert!(matches!(*lhs, Predicate::Boolean { .. }));
            }
            other => panic!("unexpected predicate: {other:?}"),
        }
    }

    #[test]
    fn test_concat_empty_is_error() {
        let err = Predicate::and_all(vec![]).unwrap_err();
        assert!(err.is_config());
    }

    #[test]
    fn test_not_wraps_boolean_children() {
        let pred = Predicate::equals(Expr::col("a"), Expr::param(1_i64))
            .or(Predicate::Literal(Some(false)))
            .not();
        assert_eq!(pred.render().0, "NOT (a = ? OR FALSE)");
    }

    #[test]
    fn test_columns_collects_references() {
        let pred = Predicate::equals(Expr::col("film_actor.actor_id"), Expr::param(3_i64))
            .and(Predicate::equals(
                Expr::Function(Function::new("LOWER", vec![Expr::col("film.title")])),
                Expr::param("alien"),
            ));
        let cols = pred.columns();
        assert_eq!(cols.len(), 2);
        assert_eq!(cols[0], &ColumnReference::qualified("film_actor", "actor_id"));
        assert_eq!(cols[1], &ColumnReference::qualified("film", "title"));
    }

    #[test]
    fn test_column_equality_ignores_alias() {
        let a = ColumnReference::qualified("film", "film_id").alias("id");
        let b = ColumnReference::qualified("film", "film_id");
        let c = ColumnReference::new("film_id");
        assert_eq!(a, b);
        assert_ne!(b, c);
        assert_eq!(c.or_table("film"), b);
    }

    #[test]
    fn test_function_projection_alias() {
        let func = Function::new("COUNT", vec![Expr::star()]).alias("aggr");
        let mut params = Vec::new();
        assert_eq!(
            Expr::from(func.clone()).build_projection(&mut params),
            "COUNT(*) AS aggr"
        );
        assert_eq!(Expr::from(func).build(&mut params), "COUNT(*)");
    }
}
