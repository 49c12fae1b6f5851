//! Relationship metadata for SQLWizz.
//!
//! Relations are declared once per model next to its fields and describe how
//! the wizzard joins, aggregates or follows up on related rows. Entities get
//! their own copy of every relation slot at construction time.

/// Aggregate function applied to the related rows of an eager collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AggregateFunction {
    Count,
    Sum,
    Avg,
    Min,
    Max,
}

impl AggregateFunction {
    /// Get the SQL function name.
    pub const fn as_str(&self) -> &'static str {
        match self {
            AggregateFunction::Count => "COUNT",
            AggregateFunction::Sum => "SUM",
            AggregateFunction::Avg => "AVG",
            AggregateFunction::Min => "MIN",
            AggregateFunction::Max => "MAX",
        }
    }
}

/// A scalar aggregate surfaced instead of loading a collection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Aggregation {
    pub function: AggregateFunction,
    /// Aggregated column of the related table; `None` means `*`.
    pub column: Option<String>,
}

impl Aggregation {
    /// `COUNT(*)` over the related rows.
    pub fn count() -> Self {
        Self {
            function: AggregateFunction::Count,
            column: None,
        }
    }

    /// Apply `function` to one column of the related rows.
    pub fn over(function: AggregateFunction, column: impl Into<String>) -> Self {
        Self {
            function,
            column: Some(column.into()),
        }
    }
}

/// Kind-specific relation settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RelationKind {
    /// Many owner rows point at one foreign row through `foreign_key_field`.
    ManyToOne {
        /// Owner column holding the foreign id
        foreign_key_field: String,
        /// Foreign column the owner column references
        foreign_model_key_field: String,
        /// Foreign column used to translate a written display value to an id
        lookup_column: Option<String>,
        /// Written values are already ids; no lookup happens
        load_all: bool,
    },
    /// One owner row has many foreign rows pointing back at it.
    OneToMany {
        /// Foreign column referencing the owner; defaults to the owner's primary key name
        foreign_key_field: Option<String>,
        aggregation: Option<Aggregation>,
    },
    /// Owner and foreign rows linked through a junction table.
    ManyToMany {
        junction_table: String,
        /// Junction column referencing the foreign model
        foreign_key_field: String,
        aggregation: Option<Aggregation>,
    },
}

/// Relation template declared on a model.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Relation {
    /// Attribute name on the owning model
    pub name: String,
    /// Registered name of the related model
    pub foreign_model: String,
    pub kind: RelationKind,
    /// Load through a follow-up query instead of the primary statement.
    pub lazy_load: bool,
}

impl Relation {
    /// Declare a many-to-one relation.
    pub fn many_to_one(
        name: impl Into<String>,
        foreign_model: impl Into<String>,
        foreign_key_field: impl Into<String>,
        foreign_model_key_field: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            foreign_model: foreign_model.into(),
            kind: RelationKind::ManyToOne {
                foreign_key_field: foreign_key_field.into(),
                foreign_model_key_field: foreign_model_key_field.into(),
                lookup_column: None,
                load_all: false,
            },
            lazy_load: true,
        }
    }

    /// Declare a one-to-many relation.
    pub fn one_to_many(name: impl Into<String>, foreign_model: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            foreign_model: foreign_model.into(),
            kind: RelationKind::OneToMany {
                foreign_key_field: None,
                aggregation: None,
            },
            lazy_load: true,
        }
    }

    /// Declare a many-to-many relation through `junction_table`.
    pub fn many_to_many(
        name: impl Into<String>,
        foreign_model: impl Into<String>,
        junction_table: impl Into<String>,
        foreign_key_field: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            foreign_model: foreign_model.into(),
            kind: RelationKind::ManyToMany {
                junction_table: junction_table.into(),
                foreign_key_field: foreign_key_field.into(),
                aggregation: None,
            },
            lazy_load: true,
        }
    }

    /// Resolve within the primary query.
    pub fn eager(mut self) -> Self {
        self.lazy_load = false;
        self
    }

    /// Set the lazy flag explicitly.
    pub fn lazy(mut self, lazy_load: bool) -> Self {
        self.lazy_load = lazy_load;
        self
    }

    /// Set the lookup column for written display values. Many-to-one only.
    pub fn lookup_column(mut self, column: impl Into<String>) -> Self {
        if let RelationKind::ManyToOne { lookup_column, .. } = &mut self.kind {
            *lookup_column = Some(column.into());
        }
        self
    }

    /// Treat written values as foreign ids. Many-to-one only.
    pub fn load_all(mut self) -> Self {
        if let RelationKind::ManyToOne { load_all, .. } = &mut self.kind {
            *load_all = true;
        }
        self
    }

    /// Override the foreign column referencing the owner. One-to-many only.
    pub fn back_reference(mut self, column: impl Into<String>) -> Self {
        if let RelationKind::OneToMany {
            foreign_key_field, ..
        } = &mut self.kind
        {
            *foreign_key_field = Some(column.into());
        }
        self
    }

    /// Surface an aggregate instead of the collection. Collections only.
    pub fn aggregate(mut self, aggr: Aggregation) -> Self {
        match &mut self.kind {
            RelationKind::OneToMany { aggregation, .. }
            | RelationKind::ManyToMany { aggregation, .. } => *aggregation = Some(aggr),
            RelationKind::ManyToOne { .. } => {}
        }
        self
    }

    pub fn is_many_to_one(&self) -> bool {
        matches!(self.kind, RelationKind::ManyToOne { .. })
    }

    pub fn is_one_to_many(&self) -> bool {
        matches!(self.kind, RelationKind::OneToMany { .. })
    }

    pub fn is_many_to_many(&self) -> bool {
        matches!(self.kind, RelationKind::ManyToMany { .. })
    }

    /// The declared aggregation of a collection relation.
    pub fn aggregation(&self) -> Option<&Aggregation> {
        match &self.kind {
            RelationKind::OneToMany { aggregation, .. }
            | RelationKind::ManyToMany { aggregation, .. } => aggregation.as_ref(),
            RelationKind::ManyToOne { .. } => None,
        }
    }

    /// True when the relation is resolved to a scalar inside the primary query.
    pub fn is_eager_aggregate(&self) -> bool {
        !self.lazy_load && self.aggregation().is_some()
    }

    /// Junction table name for many-to-many relations.
    pub fn junction_table(&self) -> Option<&str> {
        match &self.kind {
            RelationKind::ManyToMany { junction_table, .. } => Some(junction_table),
            _ => None,
        }
    }
}
