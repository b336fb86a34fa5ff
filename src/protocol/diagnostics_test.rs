use super::*;
use std::time::Duration;
use tokio::sync::oneshot;
use tokio::time::timeout;

fn diagnostics(protocol: Protocol) -> Arc<ConnectionDiagnostics> {
    Arc::new(ConnectionDiagnostics::new(ConnectionHandle { id: Uuid::new_v4(), protocol }))
}

async fn wait_until_empty(diag: &ConnectionDiagnostics) {
    timeout(Duration::from_secs(1), async {
        while !diag.get_tasks().is_empty() {
            tokio::task::yield_now().await;
        }
    })
    .await
    .expect("operation entry should be dropped after completion");
}

#[tokio::test]
async fn finished_operation_drops_its_entry() {
    let diag = diagnostics(Protocol::GraphQLTransportWs);
    let (tx, rx) = oneshot::channel::<()>();
    diag.spawn_operation("1".to_owned(), async move {
        let _ = rx.await;
    });

    let tasks = diag.get_tasks();
    assert_eq!(tasks, vec![TaskSnapshot { name: "1".to_owned(), finished: false }]);
    assert!(diag.has_operation("1"));

    tx.send(()).unwrap();
    wait_until_empty(&diag).await;
    assert!(!diag.has_operation("1"));
}

#[tokio::test]
async fn cancel_operation_removes_and_aborts() {
    let diag = diagnostics(Protocol::GraphQLWs);
    diag.spawn_operation("sub".to_owned(), futures::future::pending());

    assert!(diag.cancel_operation("sub"));
    assert!(diag.get_tasks().is_empty());
    assert!(!diag.cancel_operation("sub"));
}

#[tokio::test]
async fn reused_id_is_not_removed_by_stale_task() {
    let diag = diagnostics(Protocol::GraphQLWs);
    let (tx, rx) = oneshot::channel::<()>();
    diag.spawn_operation("op".to_owned(), async move {
        let _ = rx.await;
    });
    // Replace the entry without aborting the first task.
    diag.spawn_operation("op".to_owned(), futures::future::pending());

    tx.send(()).unwrap();
    tokio::time::sleep(Duration::from_millis(20)).await;
    assert_eq!(diag.get_tasks().len(), 1);
}

#[tokio::test]
async fn shutdown_cancels_everything_and_signals_closed() {
    let diag = diagnostics(Protocol::GraphQLTransportWs);
    diag.spawn_operation("a".to_owned(), futures::future::pending());
    diag.spawn_operation("b".to_owned(), futures::future::pending());
    diag.set_init_timeout(tokio::spawn(futures::future::pending()));
    assert_eq!(diag.connection_init_timeout().map(|t| t.finished), Some(false));
    assert!(!diag.is_closed());

    diag.shutdown().await;

    assert!(diag.get_tasks().is_empty());
    assert_eq!(diag.connection_init_timeout().map(|t| t.finished), Some(true));
    assert!(diag.is_closed());
    timeout(Duration::from_millis(100), diag.wait_closed())
        .await
        .expect("wait_closed should resolve after shutdown");
}

#[tokio::test]
async fn legacy_protocol_has_no_init_timeout() {
    let diag = diagnostics(Protocol::GraphQLWs);
    assert_eq!(diag.connection_init_timeout(), None);
    assert_eq!(diag.handle().protocol, Protocol::GraphQLWs);
}
