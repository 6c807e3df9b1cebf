//! Runs against a real server when `DATABASE_URL` is set (a `.env` file is honored).

#![cfg(feature = "postgres")]

use quarry::postgres::{PgExecutor, PgTransactionManager};
use quarry::stmt::{BranchCond, Guard, IfStmt, StatementNode};
use quarry::{
    BuiltSql, Engine, Error, ExecOption, Executor, Scope, SqlDebugInterceptor, Value, build_sql,
    transactional,
};
use std::sync::Arc;

async fn try_connect() -> Option<Arc<tokio_postgres::Client>> {
    dotenvy::dotenv().ok();
    let database_url = std::env::var("DATABASE_URL").ok()?;
    let (client, connection) = tokio_postgres::connect(&database_url, tokio_postgres::NoTls)
        .await
        .expect("Failed to connect to DATABASE_URL with NoTls");
    tokio::spawn(async move {
        if let Err(e) = connection.await {
            eprintln!("tokio-postgres connection error: {e}");
        }
    });
    Some(Arc::new(client))
}

#[tokio::test]
async fn executes_built_statements() {
    let Some(client) = try_connect().await else {
        eprintln!("DATABASE_URL not set; skipping");
        return;
    };
    let executor: Arc<dyn Executor> = Arc::new(PgExecutor::new(client));
    let engine = Engine::builder()
        .with_sql_debug(SqlDebugInterceptor::new())
        .build();

    engine
        .execute(ExecOption::new(
            executor.clone(),
            BuiltSql::new(
                "CREATE TEMP TABLE quarry_users (id BIGINT PRIMARY KEY, name TEXT, active BOOL)",
                vec![],
            ),
        ))
        .await
        .unwrap();
    for (id, name) in [(1_i64, "ada"), (2, "grace")] {
        engine
            .execute(ExecOption::new(
                executor.clone(),
                BuiltSql::new(
                    "INSERT INTO quarry_users (id, name, active) VALUES (?, ?, ?)",
                    vec![Value::Int(id), Value::from(name), Value::Bool(true)],
                ),
            ))
            .await
            .unwrap();
    }

    let nodes = [
        StatementNode::raw("SELECT id, name FROM quarry_users"),
        StatementNode::Where(BranchCond::If(IfStmt::new(
            Guard::present("name"),
            "name = #{name}",
        ))),
    ];
    let scope = Scope::new().bind("name", "grace");
    let rows = engine
        .query(ExecOption::new(executor, build_sql(&nodes, &scope).unwrap()))
        .await
        .unwrap();

    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].try_get::<i64>("id").unwrap(), 2);
    assert_eq!(rows[0].try_get::<String>("name").unwrap(), "grace");
}

#[tokio::test]
async fn transaction_rolls_back_on_error() {
    let Some(client) = try_connect().await else {
        eprintln!("DATABASE_URL not set; skipping");
        return;
    };
    let manager = PgTransactionManager::new(client.clone());
    let reader = PgExecutor::new(client);
    reader
        .execute("CREATE TEMP TABLE quarry_tx (id BIGINT)", &[])
        .await
        .unwrap();

    let err = transactional(&manager, |tx| async move {
        tx.execute("INSERT INTO quarry_tx (id) VALUES (?)", &[Value::Int(1)])
            .await?;
        Err::<(), _>(Error::validation("abort"))
    })
    .await
    .unwrap_err();
    assert!(matches!(err, Error::Validation(_)));

    let rows = reader.query("SELECT id FROM quarry_tx", &[]).await.unwrap();
    assert!(rows.is_empty());
}
