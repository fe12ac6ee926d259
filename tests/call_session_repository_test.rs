//! Postgres repository integration tests
#![cfg(feature = "postgres")]

use callhub::domain::shared::UniqueName;
use callhub::domain::video_call::{
    CallMode, CallSession, CallSessionRepository, GroupCallRepository, GroupCallSession,
    InsertOutcome, SessionStatus,
};
use callhub::config::Config;
use callhub::infrastructure::persistence::{
    create_pool, run_migrations, PgCallSessionRepository, PgGroupCallRepository,
};
use sqlx::PgPool;
use uuid::Uuid;

fn session(initiator: Uuid, receiver: Uuid) -> CallSession {
    CallSession::new(
        UniqueName::parse(&format!("test-{}", Uuid::new_v4().simple())).unwrap(),
        "group".to_string(),
        initiator,
        receiver,
    )
}

#[tokio::test]
#[ignore] // Requires database
async fn test_insert_if_absent_collapses_duplicates() {
    let pool = setup_database().await;
    let repo = PgCallSessionRepository::new(pool.clone());
    let (alice, bob) = (Uuid::new_v4(), Uuid::new_v4());

    let first = session(alice, bob);
    let mut second = session(bob, alice);
    second.unique_name = first.unique_name.clone();

    let inserted = repo.insert_if_absent(&first).await.expect("Failed to insert");
    assert!(matches!(inserted, InsertOutcome::Inserted(_)));

    match repo.insert_if_absent(&second).await.expect("Failed to insert") {
        InsertOutcome::Existing(existing) => assert_eq!(existing.id, first.id),
        other => panic!("expected existing session, got {:?}", other),
    }

    cleanup_database(pool).await;
}

#[tokio::test]
#[ignore] // Requires database
async fn test_status_and_hide_flags() {
    let pool = setup_database().await;
    let repo = PgCallSessionRepository::new(pool.clone());
    let (alice, bob) = (Uuid::new_v4(), Uuid::new_v4());

    let s = session(alice, bob);
    repo.insert_if_absent(&s).await.expect("Failed to insert");

    repo.update_status(s.id, SessionStatus::Completed)
        .await
        .expect("Failed to update status");

    assert!(repo.hide_for_initiator(s.id).await.unwrap());
    assert!(!repo.hide_for_initiator(s.id).await.unwrap());

    let stored = repo.find_by_id(s.id).await.unwrap().unwrap();
    assert_eq!(stored.status, SessionStatus::Completed);
    assert!(stored.hidden_by_initiator);
    assert!(!stored.hidden_by_receiver);

    assert!(repo.list_initiated(alice, None, None).await.unwrap().is_empty());
    let received = repo
        .list_received(bob, Some(CallMode::DirectVideoCall), Some(10))
        .await
        .unwrap();
    assert_eq!(received.len(), 1);

    assert_eq!(repo.hide_all_for_user(bob).await.unwrap(), 1);
    assert_eq!(repo.hide_all_for_user(bob).await.unwrap(), 0);

    cleanup_database(pool).await;
}

#[tokio::test]
#[ignore] // Requires database
async fn test_group_participation() {
    let pool = setup_database().await;
    let repo = PgGroupCallRepository::new(pool.clone());
    let (alice, bob) = (Uuid::new_v4(), Uuid::new_v4());

    let g = GroupCallSession::new(Uuid::new_v4());
    repo.create(&g, &[alice, bob]).await.expect("Failed to create");

    assert!(repo.hide_participation(g.id, alice).await.unwrap());
    assert!(repo
        .list_for_participant(alice, None, None)
        .await
        .unwrap()
        .is_empty());
    assert_eq!(
        repo.list_for_participant(bob, Some(CallMode::GroupVideoCall), Some(5))
            .await
            .unwrap()
            .len(),
        1
    );

    cleanup_database(pool).await;
}

async fn setup_database() -> PgPool {
    let db_url = std::env::var("DATABASE_URL")
        .unwrap_or_else(|_| "postgres://postgres@localhost/callhub_test".to_string());

    let mut config = Config::default().database;
    config.url = db_url;
    config.max_connections = 5;
    config.min_connections = 1;

    let pool = create_pool(&config).await.expect("Failed to create pool");
    run_migrations(&pool).await.expect("Failed to run migrations");
    pool
}

async fn cleanup_database(pool: PgPool) {
    sqlx::query("DELETE FROM rooms WHERE unique_name LIKE 'test-%'")
        .execute(&pool)
        .await
        .ok();
    pool.close().await;
}
