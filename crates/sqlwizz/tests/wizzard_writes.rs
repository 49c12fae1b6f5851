mod common;

use common::{ids, lines, wizzard};
use sqlwizz::prelude::*;
use sqlwizz::{InsertQuery, RelationNotFoundError, Statement};

#[test]
fn create_resolves_lookup_and_links_in_one_transaction() {
    let (mut wizzard, db) = wizzard();
    db.queue(vec![vec![Value::from(1_i64)]])
        .queue(vec![vec![Value::from(11_i64)]]);

    let id = wizzard
        .create(
            "Film",
            [
                ("title", Value::from("Alien")),
                ("language", Value::from("English")),
                ("actors", Value::from("[1, 2]")),
            ],
        )
        .expect("create film");

    assert_eq!(id, Value::BigInt(11));
    assert_eq!(wizzard.last_insert_id(), Some(&Value::BigInt(11)));

    let executed = db.executed();
    assert_eq!(executed.len(), 5);
    assert_eq!(
        lines(&executed[0].0),
        vec![
            "select language.language_id",
            "from language",
            "where language.name = ?",
            "limit 1",
        ]
    );
    assert_eq!(executed[0].1, vec![Value::from("English")]);
    assert_eq!(
        executed[1].0,
        "INSERT INTO film (title, language_id)\n    VALUES (?, ?)"
    );
    assert_eq!(executed[1].1, vec![Value::from("Alien"), Value::BigInt(1)]);
    assert_eq!(executed[2].0, "SELECT last_insert_rowid()");
    assert_eq!(
        executed[3].0,
        "INSERT INTO film_actor (film_id, actor_id)\n    VALUES (?, ?)"
    );
    assert_eq!(executed[3].1, ids(&[11, 1]));
    assert_eq!(executed[4].1, ids(&[11, 2]));

    let state = db.state();
    assert_eq!((state.commits, state.rollbacks), (1, 0));
}

#[test]
fn many_to_one_without_lookup_column_takes_the_id() {
    let (mut wizzard, db) = wizzard();
    db.queue(vec![vec![Value::from(40_i64)]]);

    wizzard
        .create(
            "Inventory",
            [("film_id", Value::from(7_i64)), ("store", Value::from(2_i64))],
        )
        .expect("create inventory");

    let executed = db.executed();
    assert_eq!(
        executed[0].0,
        "INSERT INTO inventory (film_id, store_id)\n    VALUES (?, ?)"
    );
    assert_eq!(executed[0].1, ids(&[7, 2]));
}

#[test]
fn unresolved_lookup_fails_before_any_write() {
    let (mut wizzard, db) = wizzard();

    let err = wizzard
        .create(
            "Film",
            [
                ("title", Value::from("Alien")),
                ("language", Value::from("Klingon")),
            ],
        )
        .expect_err("no language row queued");

    let Error::ForeignIdNotFound(missing) = &err else {
        panic!("expected ForeignIdNotFound");
    };
    assert_eq!(missing.relation, "language");
    assert_eq!(missing.lookup_column, "name");
    assert_eq!(missing.value, Value::from("Klingon"));
    assert!(err.is_not_found());

    assert_eq!(db.executed().len(), 1);
    let state = db.state();
    assert_eq!((state.commits, state.rollbacks), (0, 0));
}

#[test]
fn unknown_keys_fail_only_when_truthy() {
    let (mut wizzard, db) = wizzard();

    let err = wizzard
        .create(
            "Film",
            [("title", Value::from("Alien")), ("director", Value::from("Scott"))],
        )
        .expect_err("no such relation");
    assert!(matches!(
        &err,
        Error::RelationNotFound(RelationNotFoundError { model, relation })
            if model == "Film" && relation == "director"
    ));
    assert!(db.executed().is_empty());

    db.queue(vec![vec![Value::from(12_i64)]]);
    wizzard
        .create(
            "Film",
            [
                ("title", Value::from("Alien")),
                ("director", Value::from("")),
                ("actors", Value::Null),
            ],
        )
        .expect("empty values are ignored");
    let executed = db.executed_sql();
    assert_eq!(executed.len(), 2);
    assert_eq!(executed[0], "INSERT INTO film (title)\n    VALUES (?)");
}

#[test]
fn one_to_many_keys_are_rejected() {
    let (mut wizzard, db) = wizzard();

    let err = wizzard
        .create(
            "Film",
            [("title", Value::from("Alien")), ("inventory", Value::from("[1]"))],
        )
        .expect_err("collections are written from the other side");
    assert!(err.is_config());
    assert!(db.executed().is_empty());
}

#[test]
fn failed_link_rolls_back_the_whole_create() {
    let (mut wizzard, db) = wizzard();
    db.queue(vec![vec![Value::from(11_i64)]]);
    db.fail_on("INSERT INTO film_actor");

    let err = wizzard
        .create(
            "Film",
            [
                ("title", Value::from("Alien")),
                ("actors", Value::from(vec![1_i64, 2])),
            ],
        )
        .expect_err("junction insert fails");

    assert!(matches!(err, Error::Sql(_)));
    assert!(
        err.sql_text()
            .is_some_and(|sql| sql.starts_with("INSERT INTO film_actor"))
    );
    assert_eq!(db.executed().len(), 3);
    let state = db.state();
    assert_eq!((state.commits, state.rollbacks), (0, 1));
}

#[test]
fn update_by_id_reconciles_against_the_junction_table() {
    let (mut wizzard, db) = wizzard();
    db.queue(vec![
        vec![Value::from(1_i64)],
        vec![Value::from(2_i64)],
        vec![Value::from(3_i64)],
    ]);

    wizzard
        .update_by_id("Film", 7_i64, [("actors", Value::from(vec![2_i64, 3, 4]))])
        .expect("update links");

    let executed = db.executed();
    assert_eq!(executed.len(), 3);
    assert_eq!(
        lines(&executed[0].0),
        vec![
            "select film_actor.actor_id",
            "from film_actor",
            "where film_actor.film_id = ?",
        ]
    );
    assert_eq!(
        executed[1].0,
        "INSERT INTO film_actor (film_id, actor_id)\n    VALUES (?, ?)"
    );
    assert_eq!(executed[1].1, ids(&[7, 4]));
    assert_eq!(
        executed[2].0,
        "DELETE FROM film_actor\n    WHERE film_actor.film_id = ? AND film_actor.actor_id = ?"
    );
    assert_eq!(executed[2].1, ids(&[7, 1]));
    let state = db.state();
    assert_eq!((state.commits, state.rollbacks), (1, 0));
}

#[test]
fn update_with_loaded_instance_uses_its_collection() {
    let (mut wizzard, db) = wizzard();
    let actor_model = wizzard.get_model("Actor").expect("registered");
    let actor = |id: i64| {
        Entity::new(actor_model.clone())
            .with("actor_id", id)
            .expect("field exists")
    };
    let mut film = Entity::new(wizzard.get_model("Film").expect("registered"))
        .with("film_id", 7_i64)
        .expect("field exists");
    film.set_relation("actors", RelationData::Many(vec![actor(1), actor(2)]))
        .expect("relation exists");

    wizzard
        .update(
            "Film",
            None,
            [
                ("title", Value::from("Aliens")),
                ("actors", Value::from("[2, 5]")),
            ],
            Some(&film),
        )
        .expect("update film");

    let executed = db.executed();
    assert_eq!(executed.len(), 3);
    assert_eq!(
        executed[0].0,
        "UPDATE film\n    SET title = ?\n    WHERE film.film_id = ?"
    );
    assert_eq!(executed[0].1, vec![Value::from("Aliens"), Value::BigInt(7)]);
    assert_eq!(executed[1].1, ids(&[7, 5]));
    assert!(executed[2].0.starts_with("DELETE FROM film_actor"));
    assert_eq!(executed[2].1, ids(&[7, 1]));
    assert_eq!(db.state().commits, 1);
}

#[test]
fn update_by_condition_touches_only_columns() {
    let (mut wizzard, db) = wizzard();
    let condition = Predicate::column_as_parameter(
        ColumnReference::qualified("film", "language_id"),
        Value::from(1_i64),
    );

    wizzard
        .update(
            "Film",
            Some(condition.clone()),
            [("description", Value::from("Dubbed"))],
            None,
        )
        .expect("update rows");
    assert_eq!(
        db.executed()[0],
        (
            "UPDATE film\n    SET description = ?\n    WHERE film.language_id = ?".to_string(),
            vec![Value::from("Dubbed"), Value::BigInt(1)],
        )
    );

    let err = wizzard
        .update(
            "Film",
            Some(condition),
            [("actors", Value::from("[1]"))],
            None,
        )
        .expect_err("links need a row id");
    assert!(err.is_config());
    assert_eq!(db.executed().len(), 1);
}

#[test]
fn update_without_condition_or_row_id_is_rejected() {
    let (mut wizzard, db) = wizzard();

    let err = wizzard
        .update("Film", None, [("title", Value::from("Untitled"))], None)
        .expect_err("would rewrite every film");
    assert!(err.is_config());

    let unsaved = Entity::new(wizzard.registry().get("Film").expect("registered"));
    let err = wizzard
        .update(
            "Film",
            None,
            [("title", Value::from("Untitled"))],
            Some(&unsaved),
        )
        .expect_err("instance has no id");
    assert!(err.is_config());

    assert!(db.executed().is_empty());
    assert_eq!(db.state().commits, 0);
}

#[test]
fn empty_update_does_nothing() {
    let (mut wizzard, db) = wizzard();

    wizzard
        .update_by_id("Film", 7_i64, Vec::<(&str, Value)>::new())
        .expect("nothing to do");

    assert!(db.executed().is_empty());
    assert_eq!(db.state().commits, 0);
}

#[test]
fn delete_by_id_removes_junction_rows_first() {
    let (mut wizzard, db) = wizzard();

    wizzard.delete_by_id("Film", 7_i64).expect("delete film");

    let executed = db.executed();
    assert_eq!(
        executed,
        vec![
            (
                "DELETE FROM film_actor\n    WHERE film_actor.film_id = ?".to_string(),
                ids(&[7]),
            ),
            (
                "DELETE FROM film\n    WHERE film.film_id = ?".to_string(),
                ids(&[7]),
            ),
        ]
    );
    assert_eq!(db.state().commits, 1);
}

#[test]
fn delete_by_condition() {
    let (mut wizzard, db) = wizzard();

    wizzard
        .delete(
            "Actor",
            Predicate::column_as_parameter(
                ColumnReference::qualified("actor", "last_name"),
                "Weaver",
            ),
        )
        .expect("delete actors");

    assert_eq!(
        db.executed_sql(),
        vec!["DELETE FROM actor\n    WHERE actor.last_name = ?".to_string()]
    );
}

#[test]
fn create_tables_in_foreign_key_order() {
    let (mut wizzard, db) = wizzard();

    wizzard.create_tables().expect("create tables");

    let tables: Vec<String> = db
        .executed_sql()
        .iter()
        .map(|sql| {
            sql.trim_start_matches("CREATE TABLE IF NOT EXISTS ")
                .split(' ')
                .next()
                .unwrap_or_default()
                .to_string()
        })
        .collect();
    assert_eq!(
        tables,
        vec![
            "actor",
            "category",
            "language",
            "film",
            "store",
            "inventory",
            "film_category",
            "film_actor",
        ]
    );
    let state = db.state();
    assert_eq!((state.commits, state.rollbacks), (1, 0));
}

#[test]
fn statement_batch_stops_at_the_first_failure() {
    let (mut wizzard, db) = wizzard();
    db.fail_on("INSERT INTO store");
    let insert = |table: &str| -> Statement {
        InsertQuery::build(table, vec![("name".to_string(), Value::from("x"))])
            .expect("has columns")
            .into()
    };

    let err = wizzard
        .execute_in_transaction(&[insert("language"), insert("store"), insert("actor")])
        .expect_err("second statement fails");

    assert!(matches!(err, Error::Sql(_)));
    assert_eq!(db.executed().len(), 2);
    let state = db.state();
    assert_eq!((state.commits, state.rollbacks), (0, 1));
}

#[test]
fn custom_last_insert_id_statement() {
    let db = common::MockDatabase::new();
    let config = WizzardConfig::default().last_insert_id_sql("SELECT lastval()");
    let mut wizzard = QueryWizzard::with_config(db.clone(), config).expect("valid config");
    wizzard.register_model(common::actor());
    db.queue(vec![vec![Value::from(3_i64)]]);

    let id = wizzard
        .create("Actor", [("first_name", Value::from("Ian"))])
        .expect("create actor");

    assert_eq!(id, Value::BigInt(3));
    assert_eq!(db.executed_sql()[1], "SELECT lastval()");
}

#[test]
fn missing_insert_id_rolls_back() {
    let (mut wizzard, db) = wizzard();

    let err = wizzard
        .create("Actor", [("first_name", Value::from("Ian"))])
        .expect_err("no id row queued");

    assert!(matches!(err, Error::Database(_)));
    let state = db.state();
    assert_eq!((state.commits, state.rollbacks), (0, 1));
}
