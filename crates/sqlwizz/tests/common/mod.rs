//! Scripted database and sample models shared by the integration tests.

#![allow(dead_code)]

use sqlwizz::prelude::*;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};

/// Recorded calls plus scripted results.
#[derive(Debug, Default)]
pub struct MockState {
    /// Every executed statement with its bound parameters
    pub executed: Vec<(String, Vec<Value>)>,
    pub commits: usize,
    pub rollbacks: usize,
    /// Result sets handed out to SELECT statements, in order
    results: VecDeque<Vec<Row>>,
    current: VecDeque<Row>,
    /// Statements containing this text fail
    fail_on: Option<String>,
}

/// In-memory stand-in for a driver.
///
/// Each executed SELECT consumes the next queued result set (an empty one
/// when the queue is exhausted); other statements produce no rows.
#[derive(Debug, Clone, Default)]
pub struct MockDatabase {
    state: Arc<Mutex<MockState>>,
}

impl MockDatabase {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap()
    }

    /// Queue the rows returned by the next SELECT.
    pub fn queue(&self, rows: Vec<Vec<Value>>) -> &Self {
        self.state()
            .results
            .push_back(rows.into_iter().map(Row::new).collect());
        self
    }

    pub fn fail_on(&self, needle: &str) {
        self.state().fail_on = Some(needle.to_string());
    }

    pub fn executed(&self) -> Vec<(String, Vec<Value>)> {
        self.state().executed.clone()
    }

    pub fn executed_sql(&self) -> Vec<String> {
        self.state()
            .executed
            .iter()
            .map(|(sql, _)| sql.clone())
            .collect()
    }
}

impl Database for MockDatabase {
    fn execute(&mut self, sql: &str, params: Option<&[Value]>) -> Result<()> {
        let mut state = self.state();
        state
            .executed
            .push((sql.to_string(), params.map(<[Value]>::to_vec).unwrap_or_default()));
        if state.fail_on.as_deref().is_some_and(|needle| sql.contains(needle)) {
            return Err(Error::database("injected failure"));
        }
        state.current = if sql.starts_with("SELECT") {
            state.results.pop_front().unwrap_or_default().into()
        } else {
            VecDeque::new()
        };
        Ok(())
    }

    fn fetchone(&mut self) -> Result<Option<Row>> {
        Ok(self.state().current.pop_front())
    }

    fn fetchall(&mut self) -> Result<Vec<Row>> {
        Ok(self.state().current.drain(..).collect())
    }

    fn commit(&mut self) -> Result<()> {
        self.state().commits += 1;
        Ok(())
    }

    fn rollback(&mut self) -> Result<()> {
        self.state().rollbacks += 1;
        Ok(())
    }
}

pub fn language() -> Model {
    Model::new("Language")
        .table("language")
        .field(Field::integer("language_id").primary_key())
        .field(Field::string("name").not_null().unique())
}

pub fn actor() -> Model {
    Model::new("Actor")
        .table("actor")
        .field(Field::integer("actor_id").primary_key())
        .field(Field::string("first_name"))
        .field(Field::string("last_name"))
}

pub fn store() -> Model {
    Model::new("Store")
        .table("store")
        .field(Field::integer("store_id").primary_key())
        .field(Field::string("name"))
        .relation(Relation::one_to_many("inventory", "Inventory").back_reference("store_id"))
}

pub fn inventory() -> Model {
    Model::new("Inventory")
        .table("inventory")
        .field(Field::integer("inventory_id").primary_key())
        .field(Field::integer("film_id").foreign_key("film.film_id"))
        .field(Field::integer("store_id").foreign_key("store.store_id"))
        .relation(Relation::many_to_one("store", "Store", "store_id", "store_id"))
}

pub fn film() -> Model {
    Model::new("Film")
        .table("film")
        .field(Field::integer("film_id").primary_key())
        .field(Field::string("title").not_null())
        .field(Field::string("description"))
        .field(Field::integer("language_id").foreign_key("language.language_id"))
        .relation(
            Relation::many_to_one("language", "Language", "language_id", "language_id")
                .lookup_column("name")
                .eager(),
        )
        .relation(Relation::many_to_many("actors", "Actor", "film_actor", "actor_id"))
        .relation(Relation::one_to_many("inventory", "Inventory"))
        .search_columns(["title", "description"])
}

pub fn category() -> Model {
    Model::new("Category")
        .table("category")
        .field(Field::integer("category_id").primary_key())
        .field(Field::string("name"))
        .relation(
            Relation::many_to_many("films", "Film", "film_category", "film_id")
                .aggregate(Aggregation::count())
                .eager(),
        )
}

/// A wizzard over a fresh mock with every sample model registered.
pub fn wizzard() -> (QueryWizzard<MockDatabase>, MockDatabase) {
    let db = MockDatabase::new();
    let mut wizzard = QueryWizzard::new(db.clone());
    for model in [language(), actor(), store(), inventory(), film(), category()] {
        wizzard.register_model(model);
    }
    (wizzard, db)
}

/// Trimmed, lower-cased lines of a statement.
pub fn lines(sql: &str) -> Vec<String> {
    sql.lines()
        .map(|line| line.trim().to_lowercase())
        .filter(|line| !line.is_empty())
        .collect()
}

pub fn ids(values: &[i64]) -> Vec<Value> {
    values.iter().map(|v| Value::BigInt(*v)).collect()
}
