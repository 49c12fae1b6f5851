//! Per-call fetch options and search results.

use crate::config::WizzardConfig;
use serde::Serialize;
use sqlwizz_core::{Entity, Error, Model, Result, Value};
use sqlwizz_query::{Filter, Predicate, QueryBuilder};
use std::collections::HashMap;

/// Options for a lazily loaded relation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelationOptions {
    /// Column of the related model to order by
    pub order_by: Option<String>,
    pub ascending: bool,
    pub page_size: Option<u64>,
    pub page_number: Option<u64>,
    /// Do not load this relation at all
    pub skip: bool,
}

impl Default for RelationOptions {
    fn default() -> Self {
        Self {
            order_by: None,
            ascending: true,
            page_size: None,
            page_number: None,
            skip: false,
        }
    }
}

impl RelationOptions {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Opt out of loading.
    #[must_use]
    pub fn skipped() -> Self {
        Self {
            skip: true,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn order_by(mut self, column: impl Into<String>, ascending: bool) -> Self {
        self.order_by = Some(column.into());
        self.ascending = ascending;
        self
    }

    #[must_use]
    pub fn paginate(mut self, page_size: u64, page_number: Option<u64>) -> Self {
        self.page_size = Some(page_size);
        self.page_number = page_number;
        self
    }

    pub(crate) fn apply<'m>(&self, mut builder: QueryBuilder<'m>) -> QueryBuilder<'m> {
        if let Some(column) = &self.order_by {
            builder = builder.order_by(column.as_str(), self.ascending);
        }
        if let Some(size) = self.page_size {
            builder = builder.paginate(size, self.page_number);
        }
        builder
    }
}

/// Options for reads through the wizzard.
///
/// Filtering takes exactly one of `condition`, `filters` or `equals`;
/// search text is ANDed onto whichever is used.
#[derive(Debug, Clone, Default)]
pub struct FetchOptions {
    /// Restrict the projection to these fields of the model
    pub select_fields: Option<Vec<String>>,
    pub condition: Option<Predicate>,
    pub filters: Option<Vec<Filter>>,
    pub equals: Vec<(String, Value)>,
    pub search: Option<String>,
    /// Columns to search; the model's search columns when `None`
    pub search_columns: Option<Vec<String>>,
    pub order_by: Option<(String, bool)>,
    pub page_size: Option<u64>,
    pub page_number: Option<u64>,
    /// Per-relation loading options, keyed by relation name
    pub relations: HashMap<String, RelationOptions>,
}

impl FetchOptions {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn select(mut self, fields: &[&str]) -> Self {
        self.select_fields = Some(fields.iter().map(|f| (*f).to_string()).collect());
        self
    }

    #[must_use]
    pub fn condition(mut self, condition: Predicate) -> Self {
        self.condition = Some(condition);
        self
    }

    #[must_use]
    pub fn filter(mut self, filter: Filter) -> Self {
        self.filters.get_or_insert_with(Vec::new).push(filter);
        self
    }

    #[must_use]
    pub fn equals(mut self, column: impl Into<String>, value: impl Into<Value>) -> Self {
        self.equals.push((column.into(), value.into()));
        self
    }

    #[must_use]
    pub fn search(mut self, text: impl Into<String>, columns: Option<Vec<String>>) -> Self {
        self.search = Some(text.into());
        self.search_columns = columns;
        self
    }

    #[must_use]
    pub fn order_by(mut self, column: impl Into<String>, ascending: bool) -> Self {
        self.order_by = Some((column.into(), ascending));
        self
    }

    #[must_use]
    pub fn paginate(mut self, page_size: u64, page_number: Option<u64>) -> Self {
        self.page_size = Some(page_size);
        self.page_number = page_number;
        self
    }

    /// Page number only; the size comes from the configuration.
    #[must_use]
    pub fn page(mut self, page_number: u64) -> Self {
        self.page_number = Some(page_number);
        self
    }

    #[must_use]
    pub fn relation(mut self, name: impl Into<String>, options: RelationOptions) -> Self {
        self.relations.insert(name.into(), options);
        self
    }

    /// Skip loading a relation.
    #[must_use]
    pub fn skip_relation(self, name: impl Into<String>) -> Self {
        self.relation(name, RelationOptions::skipped())
    }

    pub(crate) fn relation_options(&self, name: &str) -> Option<&RelationOptions> {
        self.relations.get(name)
    }

    pub(crate) fn skips(&self, name: &str) -> bool {
        self.relation_options(name).is_some_and(|o| o.skip)
    }

    /// Apply the filter part (no projection, ordering or paging).
    pub(crate) fn apply_filter<'m>(&self, mut builder: QueryBuilder<'m>) -> QueryBuilder<'m> {
        if let Some(condition) = &self.condition {
            builder = builder.filter(condition.clone());
        }
        if let Some(filters) = &self.filters {
            builder = builder.filters(filters.clone());
        }
        for (column, value) in &self.equals {
            builder = builder.filter_by(column.as_str(), value.clone());
        }
        if let Some(text) = &self.search {
            builder = builder.search(text.as_str(), self.search_columns.clone());
        }
        builder
    }

    /// Apply filter, ordering and paging.
    pub(crate) fn apply<'m>(
        &self,
        mut builder: QueryBuilder<'m>,
        config: &WizzardConfig,
    ) -> QueryBuilder<'m> {
        builder = self.apply_filter(builder);
        if let Some((column, ascending)) = &self.order_by {
            builder = builder.order_by(column.as_str(), *ascending);
        }
        match (self.page_size, self.page_number) {
            (Some(size), number) => builder = builder.paginate(size, number),
            (None, Some(number)) => {
                builder = builder.paginate(config.default_page_size, Some(number));
            }
            (None, None) => {}
        }
        builder
    }

    /// Selected fields, checked against the model.
    pub(crate) fn projection<'a>(&'a self, model: &'a Model) -> Result<Vec<&'a str>> {
        match &self.select_fields {
            None => Ok(model.field_names().collect()),
            Some(fields) => fields
                .iter()
                .map(|name| {
                    model.get_field(name).map(|f| f.name.as_str()).ok_or_else(|| {
                        Error::config(format!("model '{}' has no field '{}'", model.name, name))
                    })
                })
                .collect(),
        }
    }
}

/// One page of search hits plus the total number of matches.
#[derive(Debug, Clone, Serialize)]
pub struct SearchResult {
    pub entities: Vec<Entity>,
    pub count: u64,
}

impl SearchResult {
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::json!({
            "count": self.count,
            "results": self.entities.iter().map(Entity::to_json).collect::<Vec<_>>(),
        })
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }
}
