//! End-to-end: condition text and statement nodes rendered to SQL, executed through the
//! engine against an in-memory executor.

use futures_util::future::BoxFuture;
use quarry::cache::{CacheConfig, KeyTemplate, LruCacheManager};
use quarry::cond::{ParamType, Table, condition_to_sql};
use quarry::stmt::{BranchCond, Foreach, Guard, IfStmt, StatementNode};
use quarry::{
    Clause, Engine, ExecContext, ExecOption, ExecResult, Executor, FromRow, Page, Row, Scope,
    SqlBuilder, Value, build_sql,
};
use std::sync::{Arc, Mutex};
use std::time::Duration;

#[derive(Debug, Clone, PartialEq)]
struct Order {
    id: i64,
    status: String,
}

impl FromRow for Order {
    fn from_row(row: &Row) -> ExecResult<Self> {
        Ok(Self {
            id: row.try_get("id")?,
            status: row.try_get("status")?,
        })
    }
}

/// Returns a fixed result set and records every statement it receives.
struct FixtureExecutor {
    orders: Vec<Order>,
    log: Mutex<Vec<(String, Vec<Value>)>>,
}

impl FixtureExecutor {
    fn new(n: i64) -> Arc<Self> {
        Arc::new(Self {
            orders: (1..=n)
                .map(|id| Order {
                    id,
                    status: if id % 2 == 0 { "paid" } else { "open" }.to_string(),
                })
                .collect(),
            log: Mutex::new(Vec::new()),
        })
    }

    fn statements(&self) -> Vec<String> {
        self.log.lock().unwrap().iter().map(|(sql, _)| sql.clone()).collect()
    }
}

impl Executor for FixtureExecutor {
    fn execute<'a>(&'a self, sql: &'a str, args: &'a [Value]) -> BoxFuture<'a, ExecResult<u64>> {
        self.log.lock().unwrap().push((sql.to_string(), args.to_vec()));
        Box::pin(async { Ok(1) })
    }

    fn query<'a>(&'a self, sql: &'a str, args: &'a [Value]) -> BoxFuture<'a, ExecResult<Vec<Row>>> {
        self.log.lock().unwrap().push((sql.to_string(), args.to_vec()));
        let rows = if sql.starts_with("SELECT COUNT(*)") {
            vec![Row::from_pairs([("count", self.orders.len() as i64)])]
        } else {
            self.orders
                .iter()
                .map(|o| {
                    Row::from_pairs([
                        ("id", Value::Int(o.id)),
                        ("status", Value::from(o.status.as_str())),
                    ])
                })
                .collect()
        };
        Box::pin(async move { Ok(rows) })
    }
}

fn orders_table() -> Table {
    Table::new("orders")
        .column("id", "BIGINT")
        .column("status", "ENUM('open','paid')")
        .column("amount", "DECIMAL(10,2)")
        .column("created_at", "DATETIME")
}

#[tokio::test]
async fn condition_text_drives_a_paginated_query() {
    let cond = condition_to_sql("{status.EQ&amount.GE}|1", &orders_table()).unwrap();
    assert_eq!(cond.sql, "(status = ? AND amount >= ?) OR id = ?");
    assert_eq!(
        cond.param_types,
        vec![ParamType::String, ParamType::Float, ParamType::Integer]
    );

    let mut where_ = Clause::new();
    where_.push(
        &format!("({})", cond.sql),
        vec![Value::from("paid"), Value::Float(10.0), Value::Int(3)],
    );
    let mut builder = SqlBuilder::new();
    builder
        .append("SELECT id, status FROM orders", vec![])
        .append_where(where_);
    let built = builder.finish();

    let executor = FixtureExecutor::new(25);
    let engine = Engine::builder().with_pagination().build();
    let page = Arc::new(Page::new(3, 10).desc("id"));

    let orders: Vec<Order> = engine
        .fetch_all(ExecOption::new(executor.clone(), built).with_page(page.clone()))
        .await
        .unwrap();

    assert_eq!(orders.len(), 25);
    assert_eq!(page.total_count(), 25);
    assert_eq!(page.total_pages(), 3);
    assert_eq!(
        executor.statements(),
        vec![
            "SELECT COUNT(*) FROM orders WHERE 1=1 AND ((status = ? AND amount >= ?) OR id = ?)"
                .to_string(),
            "SELECT id, status FROM orders WHERE 1=1 AND ((status = ? AND amount >= ?) OR id = ?) \
             ORDER BY id DESC LIMIT 10, 20"
                .to_string(),
        ]
    );
}

#[tokio::test]
async fn statement_nodes_with_cache_and_eviction() {
    let executor = FixtureExecutor::new(1);
    let engine = Engine::new();
    let orders = Arc::new(
        CacheConfig::new(LruCacheManager::<Order>::new(64)).query_timeout(Duration::from_secs(1)),
    );

    let select = [
        StatementNode::raw("SELECT id, status FROM orders"),
        StatementNode::simple("WHERE id = #{id}"),
    ];
    let scope = Scope::new().bind("id", 1);
    let key = KeyTemplate::new("order:#{id}", &scope);

    for _ in 0..2 {
        let option = ExecOption::new(executor.clone(), build_sql(&select, &scope).unwrap())
            .with_context(ExecContext::cacheable(&orders, key));
        let order: Option<Order> = engine.fetch_optional(option).await.unwrap();
        assert_eq!(order.map(|o| o.status), Some("open".to_string()));
    }
    assert_eq!(executor.statements().len(), 1);

    let update = [
        StatementNode::raw("UPDATE orders"),
        StatementNode::Set(BranchCond::IfChain(vec![
            IfStmt::new(Guard::present("status"), "status = #{status}"),
            IfStmt::new(Guard::present("amount"), "amount = #{amount}"),
        ])),
        StatementNode::simple("WHERE id = #{id}"),
    ];
    let scope = scope.bind("status", "paid");
    let built = build_sql(&update, &scope).unwrap();
    assert_eq!(built.sql, "UPDATE orders SET status = ? WHERE id = ?");

    engine
        .execute(
            ExecOption::new(executor.clone(), built)
                .with_context(ExecContext::cache_evict(&orders, "order:1")),
        )
        .await
        .unwrap();
    assert!(orders.manager().get("order:1").await.unwrap().is_none());
}

#[tokio::test]
async fn foreach_builds_an_in_list() {
    let nodes = [
        StatementNode::raw("DELETE FROM orders WHERE id IN"),
        StatementNode::Foreach(
            Foreach::new("ids", "id", "#{id}")
                .separator(", ")
                .open("(")
                .close(")"),
        ),
    ];
    let scope = Scope::new().bind("ids", vec![4, 8, 15]);
    let executor = FixtureExecutor::new(0);

    let affected = Engine::new()
        .execute(ExecOption::new(executor.clone(), build_sql(&nodes, &scope).unwrap()))
        .await
        .unwrap();

    assert_eq!(affected, 1);
    let log = executor.log.lock().unwrap();
    assert_eq!(log[0].0, "DELETE FROM orders WHERE id IN (?, ?, ?)");
    assert_eq!(log[0].1, vec![Value::Int(4), Value::Int(8), Value::Int(15)]);
}
