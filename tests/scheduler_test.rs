use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use academia::db::MemoryKeyValueStore;
use academia::error::AppError;
use academia::models::{DayOfWeek, Lesson};
use academia::notify::{PermissionState, ReminderSink, SharedPermission};
use academia::services::{LessonStore, ReminderPolicy, ReminderScheduler};
use async_trait::async_trait;
use chrono::{Datelike, Duration as ChronoDuration, Local};
use tokio::sync::watch;

#[derive(Default)]
struct CountingSink {
    count: AtomicUsize,
}

#[async_trait]
impl ReminderSink for CountingSink {
    async fn emit(&self, _title: &str, _body: &str) -> Result<(), AppError> {
        self.count.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// A lesson on today's weekday starting a few minutes from now. Returns
/// `None` close to midnight, where "a few minutes from now" is tomorrow.
fn lesson_starting_soon() -> Option<Lesson> {
    let now = Local::now().naive_local();
    let start = now + ChronoDuration::minutes(5);
    let end = start + ChronoDuration::minutes(50);
    if start.date() != now.date() || end.date() != now.date() {
        return None;
    }
    Some(
        Lesson::new(
            "soon",
            "Organic Chemistry",
            DayOfWeek::from(now.date().weekday()),
            start.format("%H:%M").to_string(),
            end.format("%H:%M").to_string(),
        )
        .with_location("Lab 2"),
    )
}

#[tokio::test]
async fn test_scheduler_initialization() {
    let store = Arc::new(LessonStore::load(Arc::new(MemoryKeyValueStore::new())).await);
    let permission = Arc::new(SharedPermission::default());
    let sink = Arc::new(CountingSink::default());

    let scheduler = ReminderScheduler::new(store, permission, sink, 10, ReminderPolicy::default());

    assert!(scheduler.fire_log().is_empty());
}

#[tokio::test]
async fn test_scheduler_fires_once_across_ticks_and_stops_on_shutdown() {
    let Some(lesson) = lesson_starting_soon() else {
        return;
    };

    let store = Arc::new(LessonStore::load(Arc::new(MemoryKeyValueStore::new())).await);
    store.append(vec![lesson]).await.expect("Failed to add lesson");

    let permission = Arc::new(SharedPermission::new(PermissionState::Granted));
    let sink = Arc::new(CountingSink::default());

    // 1 second interval so several ticks see the same occurrence
    let scheduler = ReminderScheduler::new(
        store,
        permission,
        sink.clone(),
        1,
        ReminderPolicy::default(),
    );

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let scheduler_task = tokio::spawn(scheduler.start(shutdown_rx));

    tokio::time::sleep(Duration::from_millis(2500)).await;

    shutdown_tx.send(true).expect("scheduler dropped its receiver");
    tokio::time::timeout(Duration::from_secs(2), scheduler_task)
        .await
        .expect("scheduler did not stop")
        .expect("scheduler panicked");

    assert_eq!(sink.count.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_scheduler_without_permission_emits_nothing() {
    let Some(lesson) = lesson_starting_soon() else {
        return;
    };

    let store = Arc::new(LessonStore::load(Arc::new(MemoryKeyValueStore::new())).await);
    store.append(vec![lesson]).await.expect("Failed to add lesson");

    let sink = Arc::new(CountingSink::default());
    let scheduler = ReminderScheduler::new(
        store,
        Arc::new(SharedPermission::new(PermissionState::NotYetAsked)),
        sink.clone(),
        1,
        ReminderPolicy::default(),
    );

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let scheduler_task = tokio::spawn(scheduler.start(shutdown_rx));

    tokio::time::sleep(Duration::from_millis(1500)).await;
    drop(shutdown_tx);
    tokio::time::timeout(Duration::from_secs(2), scheduler_task)
        .await
        .expect("scheduler did not stop")
        .expect("scheduler panicked");

    assert_eq!(sink.count.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_permission_granted_mid_run_takes_effect() {
    let Some(lesson) = lesson_starting_soon() else {
        return;
    };

    let store = Arc::new(LessonStore::load(Arc::new(MemoryKeyValueStore::new())).await);
    store.append(vec![lesson]).await.expect("Failed to add lesson");

    let permission = Arc::new(SharedPermission::new(PermissionState::Denied));
    let sink = Arc::new(CountingSink::default());
    let scheduler = ReminderScheduler::new(
        store,
        permission.clone(),
        sink.clone(),
        1,
        ReminderPolicy::default(),
    );

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let scheduler_task = tokio::spawn(scheduler.start(shutdown_rx));

    tokio::time::sleep(Duration::from_millis(500)).await;
    assert_eq!(sink.count.load(Ordering::SeqCst), 0);

    permission.set(PermissionState::Granted);
    tokio::time::sleep(Duration::from_millis(1500)).await;

    shutdown_tx.send(true).expect("scheduler dropped its receiver");
    scheduler_task.await.expect("scheduler panicked");

    assert_eq!(sink.count.load(Ordering::SeqCst), 1);
}
