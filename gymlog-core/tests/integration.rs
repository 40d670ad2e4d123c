//! Integration tests for the gymlog repository
//!
//! These run the full stack (repository, worker, observers, SQLite) against
//! in-memory and on-disk databases.

use gymlog_core::{Config, Database, Error, GymLog, GymLogRepository, User};
use std::time::Duration;
use tempfile::TempDir;
use tokio::time::timeout;

const WAIT: Duration = Duration::from_secs(5);

async fn memory_repo() -> GymLogRepository {
    gymlog_core::logging::init_test();
    let db = Database::open_in_memory().expect("open in-memory database");
    db.migrate().expect("migrate");
    GymLogRepository::with_database(db)
        .await
        .expect("build repository")
}

async fn seed_users(repo: &GymLogRepository, names: &[&str]) -> Vec<i64> {
    repo.insert_users(names.iter().map(|n| User::new(*n, "pw")))
        .await
        .expect("seed users")
}

// ============================================
// Writes and full-table reads
// ============================================

#[tokio::test]
async fn test_fetch_all_contains_existing_and_inserted_rows() {
    let repo = memory_repo().await;
    let ids = seed_users(&repo, &["alice"]).await;
    let existing = repo
        .insert_gym_log(GymLog::new(ids[0], "Squat", 100.0, 5))
        .await
        .unwrap();

    let mut inserted = Vec::new();
    for (exercise, weight) in [("Bench", 60.0), ("Row", 55.0), ("Press", 40.0)] {
        inserted.push(
            repo.insert_gym_log(GymLog::new(ids[0], exercise, weight, 8))
                .await
                .unwrap(),
        );
    }

    let logs = repo.all_logs().await.unwrap();
    assert_eq!(logs.len(), 4);
    assert_eq!(logs[0].id, existing);

    let mut all_ids: Vec<i64> = logs.iter().map(|l| l.id).collect();
    all_ids.dedup();
    assert_eq!(all_ids.len(), 4, "ids must be unique");
    for id in inserted {
        assert!(all_ids.contains(&id));
    }
}

#[tokio::test]
async fn test_fire_and_forget_inserts_eventually_land() {
    let repo = memory_repo().await;
    let ids = seed_users(&repo, &["alice"]).await;
    let mut cache = repo.observe_all_logs();

    for reps in 1..=3 {
        drop(repo.insert_gym_log(GymLog::new(ids[0], "Curl", 12.5, reps)));
    }

    let logs = timeout(WAIT, cache.wait_for(|logs| logs.len() == 3))
        .await
        .expect("dropped inserts should still run")
        .unwrap();
    let mut reps: Vec<i32> = logs.iter().map(|l| l.reps).collect();
    reps.sort();
    assert_eq!(reps, vec![1, 2, 3]);
}

#[tokio::test]
async fn test_log_for_missing_user_is_rejected_by_schema() {
    let repo = memory_repo().await;
    let result = repo
        .insert_gym_log(GymLog::new(12345, "Squat", 100.0, 5))
        .await;

    assert!(matches!(result, Err(Error::Database(_))));
    assert!(repo.all_logs().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_duplicate_username_rejected() {
    let repo = memory_repo().await;
    seed_users(&repo, &["alice"]).await;

    let result = repo.insert_user(User::new("alice", "other")).await;
    assert!(matches!(result, Err(Error::Database(_))));
}

// ============================================
// Observable queries
// ============================================

#[tokio::test]
async fn test_observe_logs_by_user_filters_owner() {
    let repo = memory_repo().await;
    let ids = seed_users(&repo, &["seven", "nine"]).await;
    let (seven, nine) = (ids[0], ids[1]);

    let mut live = repo.observe_logs_by_user_id(seven).await.unwrap();
    assert!(live.get().is_empty());

    let first = repo
        .insert_gym_log(GymLog::new(seven, "Squat", 100.0, 5))
        .await
        .unwrap();
    repo.insert_gym_log(GymLog::new(nine, "Bench", 60.0, 8))
        .await
        .unwrap();
    let second = repo
        .insert_gym_log(GymLog::new(seven, "Deadlift", 140.0, 3))
        .await
        .unwrap();

    let logs = timeout(WAIT, live.wait_for(|logs| logs.len() == 2))
        .await
        .expect("observer should see both logs")
        .unwrap();

    assert_eq!(logs.iter().map(|l| l.id).collect::<Vec<_>>(), vec![first, second]);
    assert!(logs.iter().all(|l| l.user_id == seven));
}

#[tokio::test]
async fn test_observe_user_by_username_lifecycle() {
    let repo = memory_repo().await;

    let mut live = repo.observe_user_by_username("alice").await.unwrap();
    assert_eq!(live.get(), None);

    let id = repo.insert_user(User::new("alice", "pw")).await.unwrap();
    let user = timeout(WAIT, live.wait_for(Option::is_some))
        .await
        .expect("observer should see the insert")
        .unwrap()
        .unwrap();
    assert_eq!(user.id, id);
    assert_eq!(user.password, "pw");

    // Change the stored row behind the repository's back.
    repo.database()
        .connection()
        .execute(
            "UPDATE users SET password = 'rotated', is_admin = 1 WHERE id = ?",
            [id],
        )
        .unwrap();

    let updated = timeout(WAIT, live.changed())
        .await
        .expect("same handle should update without re-subscribing")
        .unwrap()
        .unwrap();
    assert_eq!(updated.password, "rotated");
    assert!(updated.is_admin);
}

#[tokio::test]
async fn test_observer_ends_when_handles_dropped() {
    let repo = memory_repo().await;
    let live = repo.observe_user_by_id(1).await.unwrap();
    let mut rx = live.into_receiver();

    let id = repo.insert_user(User::new("alice", "pw")).await.unwrap();
    timeout(WAIT, rx.wait_for(|u| u.as_ref().map(|u| u.id) == Some(id)))
        .await
        .expect("observer should push")
        .unwrap();
    drop(rx);

    // The repository keeps working after an observer goes away.
    repo.insert_user(User::new("bob", "pw")).await.unwrap();
    assert_eq!(repo.all_users().await.unwrap().len(), 2);
}

// ============================================
// On-disk databases
// ============================================

fn disk_config(dir: &TempDir) -> Config {
    let mut config = Config::default();
    config.database.path = Some(dir.path().join("data/gymlog.db"));
    config
}

#[tokio::test]
async fn test_open_creates_database_and_loads_cache() {
    let dir = TempDir::new().unwrap();
    let config = disk_config(&dir);

    {
        let repo = GymLogRepository::open(&config).await.unwrap();
        let ids = seed_users(&repo, &["alice"]).await;
        repo.insert_gym_log(GymLog::new(ids[0], "Squat", 100.0, 5))
            .await
            .unwrap();
    }

    assert!(dir.path().join("data/gymlog.db").exists());

    let reopened = GymLogRepository::open(&config).await.unwrap();
    let cached = reopened.cached_logs();
    assert_eq!(cached.len(), 1);
    assert_eq!(cached[0].exercise, "Squat");
}

#[tokio::test]
async fn test_two_repositories_see_same_data() {
    let dir = TempDir::new().unwrap();
    let config = disk_config(&dir);

    let writer = GymLogRepository::open(&config).await.unwrap();
    let ids = seed_users(&writer, &["alice"]).await;
    writer
        .insert_gym_log(GymLog::new(ids[0], "Squat", 100.0, 5))
        .await
        .unwrap();

    let reader = GymLogRepository::open(&config).await.unwrap();
    assert_eq!(
        reader.all_logs().await.unwrap(),
        writer.all_logs().await.unwrap()
    );
}
