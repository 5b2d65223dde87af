mod common;

use common::proxied;
use dsproxy::{
    Connection, DataSource, ParameterKey, ParameterTransformer, Parameters, PreparedStatement,
    ProxyConfig, QueryTransformer, RecordingObserver, Statement, StatementKind, TransformAction,
    TransformContext, Value,
};
use std::sync::{Arc, Mutex};

/// (query, is_batch, batch_count) for every transformer invocation.
#[derive(Debug, Default)]
struct SeenContexts(Mutex<Vec<(String, bool, usize)>>);

impl SeenContexts {
    fn record(&self, ctx: &TransformContext<'_>) {
        self.0
            .lock()
            .unwrap()
            .push((ctx.query.to_string(), ctx.is_batch, ctx.batch_count));
    }

    fn take(&self) -> Vec<(String, bool, usize)> {
        std::mem::take(&mut *self.0.lock().unwrap())
    }
}

fn query_spy(seen: Arc<SeenContexts>) -> impl QueryTransformer {
    move |ctx: &TransformContext<'_>| -> TransformAction<String> {
        seen.record(ctx);
        TransformAction::Continue
    }
}

fn parameter_spy(seen: Arc<SeenContexts>) -> impl ParameterTransformer {
    move |ctx: &TransformContext<'_>| -> TransformAction<Parameters> {
        seen.record(ctx);
        TransformAction::Continue
    }
}

fn entry(query: &str, batch_count: usize) -> (String, bool, usize) {
    (query.to_string(), true, batch_count)
}

#[tokio::test]
async fn add_batch_reports_zero_based_counts() {
    let seen = Arc::new(SeenContexts::default());
    let recorder = Arc::new(RecordingObserver::new());
    let config = ProxyConfig::new()
        .with_query_transformer(query_spy(seen.clone()))
        .with_observer_arc(recorder.clone());
    let (ds, _log) = proxied(config);

    let conn = ds.get_connection().await.unwrap();
    let mut stmt = conn.create_statement().await.unwrap();
    stmt.add_batch("A").unwrap();
    stmt.add_batch("B").unwrap();
    stmt.add_batch("C").unwrap();

    assert_eq!(seen.take(), vec![entry("A", 0), entry("B", 1), entry("C", 2)]);
    assert_eq!(stmt.batch().len(), 3);
    assert!(recorder.calls_to("add_batch").iter().all(|c| c.execution.is_none()));
}

#[tokio::test]
async fn execute_batch_reports_every_queued_query_in_order() {
    let recorder = Arc::new(RecordingObserver::new());
    let (ds, log) = proxied(ProxyConfig::new().with_observer_arc(recorder.clone()));

    let conn = ds.get_connection().await.unwrap();
    let mut stmt = conn.create_statement().await.unwrap();
    stmt.add_batch("A").unwrap();
    stmt.add_batch("B").unwrap();
    let counts = stmt.execute_batch().await.unwrap();

    assert_eq!(counts, vec![1, 1]);
    assert_eq!(log.sql_for("add_batch"), vec!["A", "B"]);

    let executions = recorder.executions();
    assert_eq!(executions.len(), 1);
    assert!(executions[0].is_batch);
    assert_eq!(executions[0].statement, StatementKind::Statement);
    assert_eq!(executions[0].query_texts(), vec!["A", "B"]);
    assert_eq!(executions[0].batch_size(), 2);
}

#[tokio::test]
async fn clear_batch_resets_the_counter() {
    let seen = Arc::new(SeenContexts::default());
    let recorder = Arc::new(RecordingObserver::new());
    let config = ProxyConfig::new()
        .with_query_transformer(query_spy(seen.clone()))
        .with_observer_arc(recorder.clone());
    let (ds, log) = proxied(config);

    let conn = ds.get_connection().await.unwrap();
    let mut stmt = conn.create_statement().await.unwrap();
    stmt.add_batch("A").unwrap();
    stmt.clear_batch().unwrap();
    stmt.add_batch("B").unwrap();
    stmt.execute_batch().await.unwrap();

    assert_eq!(seen.take(), vec![entry("A", 0), entry("B", 0)]);
    assert_eq!(log.count("clear_batch"), 1);
    assert_eq!(recorder.executions()[0].query_texts(), vec!["B"]);

    let clear = &recorder.calls_to("clear_batch")[0];
    assert!(clear.execution.is_none());
    assert!(clear.error.is_none());
}

#[tokio::test]
async fn execute_batch_leaves_queued_entries_alone() {
    let recorder = Arc::new(RecordingObserver::new());
    let (ds, _log) = proxied(ProxyConfig::new().with_observer_arc(recorder.clone()));

    let conn = ds.get_connection().await.unwrap();
    let mut stmt = conn.create_statement().await.unwrap();
    stmt.add_batch("A").unwrap();
    stmt.add_batch("B").unwrap();
    stmt.execute_batch().await.unwrap();
    stmt.execute_batch().await.unwrap();

    let executions = recorder.executions();
    assert_eq!(executions.len(), 2);
    assert_eq!(executions[0], executions[1]);
    assert_eq!(stmt.batch().next_index(), 2);
}

#[tokio::test]
async fn batches_are_tracked_per_statement() {
    let seen = Arc::new(SeenContexts::default());
    let (ds, _log) = proxied(ProxyConfig::new().with_query_transformer(query_spy(seen.clone())));

    let conn = ds.get_connection().await.unwrap();
    let mut first = conn.create_statement().await.unwrap();
    let mut second = conn.create_statement().await.unwrap();
    first.add_batch("A").unwrap();
    second.add_batch("X").unwrap();
    first.add_batch("B").unwrap();

    assert_eq!(seen.take(), vec![entry("A", 0), entry("X", 0), entry("B", 1)]);
}

#[tokio::test]
async fn prepared_batches_snapshot_parameters() {
    let seen = Arc::new(SeenContexts::default());
    let recorder = Arc::new(RecordingObserver::new());
    let config = ProxyConfig::new()
        .with_parameter_transformer(parameter_spy(seen.clone()))
        .with_observer_arc(recorder.clone());
    let (ds, log) = proxied(config);

    let conn = ds.get_connection().await.unwrap();
    let mut stmt = conn
        .prepare_statement("INSERT INTO users (name) VALUES (?)")
        .await
        .unwrap();
    stmt.set_parameter(1.into(), "alice".into()).unwrap();
    stmt.add_batch().unwrap();
    stmt.set_parameter(1.into(), "bob".into()).unwrap();
    stmt.add_batch().unwrap();
    let counts = stmt.execute_batch().await.unwrap();

    assert_eq!(counts, vec![1, 1]);
    let query = "INSERT INTO users (name) VALUES (?)";
    assert_eq!(seen.take(), vec![entry(query, 0), entry(query, 1)]);

    let record = &recorder.executions()[0];
    assert!(record.is_batch);
    assert_eq!(record.statement, StatementKind::Prepared);
    let names: Vec<_> = record
        .queries
        .iter()
        .map(|q| q.parameters.get(&ParameterKey::Index(1)).cloned())
        .collect();
    assert_eq!(
        names,
        vec![Some(Value::from("alice")), Some(Value::from("bob"))]
    );

    let driver_batches: Vec<_> = log
        .events()
        .into_iter()
        .filter(|e| e.method == "add_batch")
        .map(|e| e.params)
        .collect();
    assert_eq!(
        driver_batches,
        vec![vec![Value::from("alice")], vec![Value::from("bob")]]
    );
}

#[tokio::test]
async fn prepared_clear_batch_resets_the_counter() {
    let seen = Arc::new(SeenContexts::default());
    let config = ProxyConfig::new().with_parameter_transformer(parameter_spy(seen.clone()));
    let (ds, _log) = proxied(config);

    let conn = ds.get_connection().await.unwrap();
    let mut stmt = conn.prepare_statement("DELETE FROM t WHERE id = ?").await.unwrap();
    stmt.set_parameter(1.into(), 1.into()).unwrap();
    stmt.add_batch().unwrap();
    stmt.clear_batch().unwrap();
    stmt.add_batch().unwrap();

    let counts: Vec<_> = seen.take().into_iter().map(|(_, _, count)| count).collect();
    assert_eq!(counts, vec![0, 0]);
    assert_eq!(stmt.batch().len(), 1);
}
