use std::time::Duration;

use sql_dbal::prelude::*;
use sql_dbal::test_utils::{ScriptHandle, ScriptedAdapter};

fn cached_options() -> EngineOptions {
    EngineOptions::builder()
        .cache(CacheConfig {
            ttl: Duration::from_secs(60),
            cache_queries: true,
            cache_inserts: true,
            directory: None,
        })
        .finish()
}

fn connected(db_type: DatabaseType, options: EngineOptions) -> (Database, ScriptHandle) {
    let (adapter, handle) = ScriptedAdapter::new(db_type);
    let mut db = Database::new(Box::new(adapter), options);
    db.connect(ConnectionConfig::new().with_database("app")).unwrap();
    (db, handle)
}

#[test]
fn repeated_read_is_served_from_cache() {
    let (mut db, handle) = connected(DatabaseType::Mysql, cached_options());
    handle.push_rows(&["id"], vec![vec![RowValues::Int(1)], vec![RowValues::Int(2)]]);

    assert_eq!(db.query("SELECT id FROM t").unwrap(), 2);
    assert!(!db.from_cache());
    assert_eq!(handle.executes(), 1);

    assert_eq!(db.query("  SELECT id FROM t ").unwrap(), 2);
    assert!(db.from_cache());
    assert_eq!(handle.executes(), 1, "cache hit must not reach the adapter");
    assert_eq!(db.get_col(None, 0).unwrap(), vec![RowValues::Int(1), RowValues::Int(2)]);
    assert_eq!(db.num_queries(), 2);
}

#[test]
fn cached_mutation_restores_rows_affected_and_insert_id() {
    let (mut db, handle) = connected(DatabaseType::Mysql, cached_options());
    handle.push_affected(1);
    handle.set_last_insert_id(Some(42));

    assert_eq!(db.query("INSERT INTO t (a) VALUES (1)").unwrap(), 1);
    db.query("SELECT 1").unwrap();
    assert_eq!(db.insert_id(), None);

    assert_eq!(db.query("INSERT INTO t (a) VALUES (1)").unwrap(), 1);
    assert!(db.from_cache());
    assert_eq!(db.rows_affected(), 1);
    assert_eq!(db.insert_id(), Some(42));
}

#[test]
fn different_params_are_different_cache_entries() {
    let (mut db, handle) = connected(DatabaseType::Postgres, cached_options());
    handle.push_rows(&["n"], vec![vec![RowValues::Int(1)]]);
    handle.push_rows(&["n"], vec![vec![RowValues::Int(2)]]);

    db.query_with_params("SELECT n FROM t WHERE id = $1", &[RowValues::Int(1)])
        .unwrap();
    db.query_with_params("SELECT n FROM t WHERE id = $1", &[RowValues::Int(2)])
        .unwrap();
    assert_eq!(handle.executes(), 2);
    assert_eq!(db.get_var(None, 0, 0).unwrap(), Some(RowValues::Int(2)));
}

#[test]
fn disabling_the_cache_reaches_the_adapter_again() {
    let (mut db, handle) = connected(DatabaseType::Sqlite, cached_options());
    handle.push_rows(&["id"], vec![vec![RowValues::Int(1)]]);
    handle.push_rows(&["id"], vec![vec![RowValues::Int(1)]]);

    db.query("SELECT id FROM t").unwrap();
    db.set_cache_enabled(false);
    db.query("SELECT id FROM t").unwrap();
    assert_eq!(handle.executes(), 2);
}

#[test]
fn transactions_are_never_cached() {
    let (mut db, handle) = connected(DatabaseType::Mssql, cached_options());
    db.begin_transaction().unwrap();
    db.commit().unwrap();
    db.begin_transaction().unwrap();
    db.rollback().unwrap();
    assert_eq!(
        handle.statements(),
        vec![
            "BEGIN TRANSACTION",
            "COMMIT TRANSACTION",
            "BEGIN TRANSACTION",
            "ROLLBACK TRANSACTION"
        ]
    );
}

#[test]
fn expired_entry_is_fetched_again() {
    let options = EngineOptions::builder()
        .cache(CacheConfig {
            ttl: Duration::from_millis(1),
            cache_queries: true,
            cache_inserts: false,
            directory: None,
        })
        .finish();
    let (mut db, handle) = connected(DatabaseType::Mysql, options);
    handle.push_rows(&["n"], vec![vec![RowValues::Int(1)]]);
    handle.push_rows(&["n"], vec![vec![RowValues::Int(2)]]);

    db.query("SELECT n FROM t").unwrap();
    std::thread::sleep(Duration::from_millis(20));
    db.query("SELECT n FROM t").unwrap();

    assert!(!db.from_cache());
    assert_eq!(handle.executes(), 2);
    assert_eq!(db.get_var(None, 0, 0).unwrap(), Some(RowValues::Int(2)));
}

#[test]
fn adapter_is_told_about_open_transactions() {
    let (mut db, handle) = connected(DatabaseType::Postgres, EngineOptions::default());
    assert!(!handle.in_transaction());

    db.begin_transaction().unwrap();
    assert!(handle.in_transaction());
    db.query("SAVEPOINT s1").unwrap();
    db.query("ROLLBACK TO SAVEPOINT s1").unwrap();
    assert!(handle.in_transaction());
    db.commit().unwrap();
    assert!(!handle.in_transaction());

    db.query("START TRANSACTION").unwrap();
    assert!(handle.in_transaction());
    db.rollback().unwrap();
    assert!(!handle.in_transaction());

    // a failed BEGIN leaves the state alone
    handle.push_error("begin refused");
    assert!(db.begin_transaction().is_err());
    assert!(!handle.in_transaction());
}

#[test]
fn flush_replaces_previous_result() {
    let (mut db, handle) = connected(DatabaseType::Mysql, EngineOptions::default());
    handle.push_rows(
        &["a", "b"],
        vec![vec![RowValues::Int(1), RowValues::Int(2)]],
    );
    handle.push_rows(&["c"], vec![]);

    db.query("SELECT a, b FROM t").unwrap();
    assert_eq!(db.column_info().len(), 2);

    assert_eq!(db.query("SELECT c FROM u").unwrap(), 0);
    let names: Vec<_> = db.column_info().iter().map(|c| c.name.as_str()).collect();
    assert_eq!(names, ["c"]);
    assert_eq!(db.num_rows(), 0);
    assert!(db.get_row(None, 0, OutputFormat::Object).unwrap().is_none());
}

#[test]
fn row_keys_follow_column_metadata() {
    let (mut db, handle) = connected(DatabaseType::Mysql, EngineOptions::default());
    handle.push_rows(
        &["id", "name"],
        vec![
            vec![RowValues::Int(1), RowValues::from("a")],
            vec![RowValues::Int(2), RowValues::from("b")],
        ],
    );
    assert_eq!(db.query("SELECT id, name FROM t").unwrap(), 2);

    let FetchedRows::Object(rows) = db.get_results(None, OutputFormat::Object).unwrap() else {
        panic!("expected object rows");
    };
    assert_eq!(rows.len(), 2);
    for row in &rows {
        let keys: Vec<&str> = row.iter().map(|(k, _)| k).collect();
        assert_eq!(keys, ["id", "name"]);
    }

    let json = db.get_results(None, OutputFormat::Json).unwrap();
    let FetchedRows::Json(value) = json else {
        panic!("expected json");
    };
    assert_eq!(value[1]["name"], "b");

    assert_eq!(
        db.get_col_info(ColumnField::Name, None),
        vec![Some("id".to_string()), Some("name".to_string())]
    );
    assert_eq!(db.get_col_info(ColumnField::Name, Some(5)), Vec::<Option<String>>::new());
}

#[test]
fn lost_connection_gets_exactly_one_reconnect() {
    let (mut db, handle) = connected(DatabaseType::Mysql, EngineOptions::default());
    assert_eq!(handle.connects(), 1);

    handle.sever();
    handle.fail_connects(true);
    let err = db.query("SELECT 1").unwrap_err();
    assert!(matches!(err, SqlDbalError::ConnectionError(_)));
    assert_eq!(handle.connects(), 2);
    assert_eq!(handle.executes(), 0);
    assert!(db.last_error().is_some());

    handle.fail_connects(false);
    db.query("SELECT 1").unwrap();
    assert_eq!(handle.connects(), 3);
    assert_eq!(db.conn_queries(), 1);
}

#[test]
fn never_connected_has_no_reconnect_and_no_vendor() {
    let (adapter, handle) = ScriptedAdapter::new(DatabaseType::Oracle);
    let mut db = Database::new(Box::new(adapter), EngineOptions::default());

    assert!(matches!(db.query("SELECT 1 FROM dual"), Err(SqlDbalError::NotConnected(_))));
    assert_eq!(handle.connects(), 0);
    assert!(db.schema().is_err());
    assert!(db.builder().is_err());
    assert_eq!(db.captured_errors().len(), 3);
}

#[test]
fn driver_errors_are_registered_with_the_query() {
    let (mut db, handle) = connected(DatabaseType::Postgres, cached_options());
    handle.push_error("relation \"missing\" does not exist");

    let err = db.query("SELECT * FROM missing").unwrap_err();
    assert!(matches!(err, SqlDbalError::ExecutionError { .. }));
    let captured = db.captured_errors().last().unwrap();
    assert_eq!(captured.query.as_deref(), Some("SELECT * FROM missing"));
    assert!(captured.message.contains("does not exist"));

    // failures are not cached
    handle.push_rows(&["x"], vec![]);
    db.query("SELECT * FROM missing").unwrap();
    assert_eq!(handle.executes(), 2);
}

#[test]
fn builder_conveniences_use_vendor_placeholders() {
    let options = EngineOptions::builder().prepare(true).finish();
    let (mut db, handle) = connected(DatabaseType::Postgres, options);
    handle.push_affected(1);
    handle.push_affected(3);

    db.insert("users", [("name", "ann"), ("role", "admin")]).unwrap();
    let filter = Where::new().and(sql_dbal::query_builder::eq("role", "admin"));
    assert_eq!(db.update("users", [("active", false)], Some(&filter)).unwrap(), 3);

    assert_eq!(
        handle.statements(),
        vec![
            "INSERT INTO users (name, role) VALUES ($1, $2)",
            "UPDATE users SET active = $1 WHERE role = $2",
        ]
    );
    assert!(db.replace("users", [("name", "x")]).is_err());
}

#[test]
fn mysql_sql_is_converted_for_sql_server_when_enabled() {
    let options = EngineOptions::builder().convert_mysql_to_mssql(true).finish();
    let (mut db, handle) = connected(DatabaseType::Mssql, options);
    handle.push_rows(&["id"], vec![]);

    db.query("SELECT `id` FROM `users` LIMIT 5").unwrap();
    assert_eq!(handle.statements(), vec!["SELECT TOP 5 [id] FROM [users]"]);
    // the record keeps what the caller wrote
    assert_eq!(
        db.last_query().unwrap().normalized,
        "SELECT `id` FROM `users` LIMIT 5"
    );
}

#[test]
fn trace_log_and_call_site() {
    let options = EngineOptions::builder().trace(true).finish();
    let (mut db, handle) = connected(DatabaseType::Sqlite, options);
    handle.push_affected(2);

    let line = line!() + 1;
    db.query("DELETE FROM t").unwrap();

    let record = db.last_query().unwrap();
    assert_eq!(record.call_site.method, "query");
    assert_eq!(record.call_site.line, line);
    assert!(record.call_site.file.ends_with("engine_scripted.rs"));

    let trace = db.trace_log();
    assert_eq!(trace.len(), 1);
    assert_eq!(trace[0].rows, 2);
    assert!(!trace[0].cached);
    assert!(db.total_query_time() >= trace[0].elapsed);
}

#[test]
fn debug_dump_mentions_query_and_rows() {
    let (mut db, handle) = connected(DatabaseType::Mysql, EngineOptions::default());
    handle.push_rows(&["city"], vec![vec![RowValues::from("Oslo")]]);
    db.query("SELECT city FROM places").unwrap();

    let dump = db.debug();
    assert!(dump.contains("SELECT city FROM places"));
    assert!(dump.contains("Oslo"));
    assert!(dump.contains("1 row(s)"));

    let var = db.vardump(&RowValues::Int(7));
    assert!(var.contains("Type: int"));
    assert!(var.contains("SELECT city FROM places"));
}

#[test]
fn hidden_errors_are_still_captured() {
    let (mut db, handle) = connected(DatabaseType::Mysql, EngineOptions::default());
    db.hide_errors();
    handle.push_error("boom");
    assert!(db.query("SELECT 1").is_err());
    assert_eq!(db.captured_errors().len(), 1);
    db.show_errors();
}
