//! Runs against the database in `DATABASE_URL`. Every test returns early
//! when the variable is not set.

use std::env;

use futures_util::TryStreamExt;
use sql_helper_core::{
    Command, DataColumn, DataRow, DataTable, HelperError, SqlHelper, SqlHelperBuilder, Value,
};

async fn connect() -> Option<SqlHelper> {
    let Ok(url) = env::var("DATABASE_URL") else {
        eprintln!("DATABASE_URL is not set, skipping");
        return None;
    };
    Some(
        SqlHelperBuilder::default()
            .max_connections(2)
            .connect(&url)
            .await
            .unwrap(),
    )
}

/// Creates a table unique to this process and test.
async fn create_table(helper: &SqlHelper, name: &str, columns: &str) -> String {
    let table = format!("sql_helper_{name}_{}", std::process::id());
    helper
        .execute(&Command::text(format!("drop table if exists {table}")))
        .await
        .unwrap();
    helper
        .execute(&Command::text(format!("create table {table} ({columns})")))
        .await
        .unwrap();
    table
}

async fn drop_table(helper: &SqlHelper, table: &str) {
    helper
        .execute(&Command::text(format!("drop table {table}")))
        .await
        .unwrap();
}

async fn count(helper: &SqlHelper, table: &str) -> i64 {
    helper
        .execute_scalar_int(&Command::text(format!("select count(*) from {table}")))
        .await
        .unwrap()
}

#[tokio::test]
async fn failed_batch_commits_nothing() {
    let Some(helper) = connect().await else { return };
    let table = create_table(&helper, "batch", "id int4 not null").await;

    let result = helper
        .execute_batch(&[
            Command::text(format!("insert into {table} values ($1)")).bind(1_i32),
            Command::text(format!("insert into {table} values ($1)")).bind(None::<i32>),
        ])
        .await;
    assert!(matches!(result, Err(HelperError::Database(_))));
    assert_eq!(count(&helper, &table).await, 0);

    let affected = helper
        .execute_batch(&[
            Command::text(format!("insert into {table} values (1), (2)")),
            Command::text(format!("delete from {table} where id = $1")).bind(2_i32),
        ])
        .await
        .unwrap();
    assert_eq!(affected, [2, 1]);
    assert_eq!(count(&helper, &table).await, 1);
    drop_table(&helper, &table).await;
}

#[tokio::test]
async fn copies_tables_with_nulls_and_extended_types() {
    let Some(helper) = connect().await else { return };
    let columns = "id int4, n int4, name text, at timestamptz, span interval, tags int4[], doc json";
    let source = create_table(&helper, "bulk_source", columns).await;
    let target = create_table(&helper, "bulk_target", columns).await;
    helper
        .execute(&Command::text(format!(
            "insert into {source} values \
             (1, null, 'a', null, '1 day 02:00:00', '{{1,NULL,3}}', '{{\"k\": 1}}'), \
             (2, 5, null, now(), null, null, null)"
        )))
        .await
        .unwrap();

    let query = |table: &str| Command::text(format!("select * from {table} order by id"));
    let data = helper.get_table(&query(&source)).await.unwrap();
    assert_eq!(data.value(0, "n"), Some(&Value::Null));
    assert_eq!(data.value(0, "span"), Some(&Value::Text("1 day 02:00:00".into())));
    assert_eq!(
        data.value(0, "tags"),
        Some(&Value::Array(vec![Value::Int(1), Value::Null, Value::Int(3)]))
    );

    assert_eq!(helper.bulk_insert(&target, &data).await.unwrap(), 2);
    assert_eq!(helper.get_table(&query(&target)).await.unwrap(), data);
    drop_table(&helper, &source).await;
    drop_table(&helper, &target).await;
}

#[tokio::test]
async fn bulk_insert_splits_past_bind_limit() {
    let Some(helper) = connect().await else { return };
    let table = create_table(&helper, "bulk_chunks", "id int8, label text").await;
    let mut data = DataTable::new(vec![
        DataColumn::new("id", "INT8"),
        DataColumn::new("label", "TEXT"),
    ]);
    for id in 0..40_000 {
        data.push(DataRow {
            values: vec![Value::Int(id), Value::Text(format!("row {id}"))],
        })
        .unwrap();
    }
    assert_eq!(helper.bulk_insert(&table, &data).await.unwrap(), 40_000);
    assert_eq!(count(&helper, &table).await, 40_000);
    drop_table(&helper, &table).await;
}

#[tokio::test]
async fn empty_results_keep_their_columns() {
    let Some(helper) = connect().await else { return };
    let table = helper
        .get_table(&Command::text("select 1 as a, 'x'::text as b where false"))
        .await
        .unwrap();
    assert!(table.is_empty());
    assert_eq!(
        table.columns,
        [DataColumn::new("a", "INT4"), DataColumn::new("b", "TEXT")]
    );
}

#[tokio::test]
async fn data_sets_keep_one_table_per_result() {
    let Some(helper) = connect().await else { return };
    let data_set = helper
        .get_data_set(&Command::text(
            "select 1 as a where false; create temp table scratch (x int); select 2 as b",
        ))
        .await
        .unwrap();
    assert_eq!(data_set.len(), 2);
    assert_eq!(data_set[0].columns, [DataColumn::new("a", "INT4")]);
    assert!(data_set[0].is_empty());
    assert_eq!(data_set[1].value(0, "b"), Some(&Value::Int(2)));
}

#[tokio::test]
async fn reader_streams_every_row() {
    let Some(helper) = connect().await else { return };
    let command = Command::text("select generate_series(1, $1) as n").bind(5_i32);
    let rows = helper
        .get_reader(&command)
        .try_collect::<Vec<_>>()
        .await
        .unwrap();
    assert_eq!(rows.len(), 5);
    assert_eq!(rows[4].get(0), Some(&Value::Int(5)));
}

async fn scalar(helper: &SqlHelper, sql: &str) -> Result<i64, HelperError> {
    helper.execute_scalar_int(&Command::text(sql)).await
}

#[tokio::test]
async fn scalars_as_integers() {
    let Some(helper) = connect().await else { return };
    assert_eq!(scalar(&helper, "select null::int4").await.unwrap(), 0);
    assert_eq!(scalar(&helper, "select 1 where false").await.unwrap(), 0);
    assert_eq!(scalar(&helper, "select 42::numeric(10, 2)").await.unwrap(), 42);
    assert!(matches!(
        scalar(&helper, "select 1e20::float8").await,
        Err(HelperError::NotAnInteger { .. })
    ));
}

#[tokio::test]
async fn decodes_catalog_types() {
    let Some(helper) = connect().await else { return };
    let row = helper
        .get_row(&Command::text(
            "select 'pg_catalog'::regnamespace::oid as o, array['a', null] as words, \
             '1.5'::money as cash, interval '-1 mon 3 days' as span",
        ))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(row.get(0), Some(&Value::Int(11)));
    assert_eq!(
        row.get(1),
        Some(&Value::Array(vec![Value::Text("a".into()), Value::Null]))
    );
    assert_eq!(row.get(2), Some(&Value::Numeric("1.50".parse().unwrap())));
    assert_eq!(row.get(3), Some(&Value::Text("-1 mons +3 days".into())));
}
