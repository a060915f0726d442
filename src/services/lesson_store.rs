use std::collections::HashSet;
use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::{info, warn};

use crate::db::{KeyValueStore, SCHEDULE_KEY, load_collection};
use crate::error::AppError;
use crate::models::Lesson;
use crate::services::conflict::apply_conflicts;

/// Canonical weekly schedule.
///
/// Every mutation recomputes conflict flags and persists the result before it
/// becomes visible. The lock is held across the write, so persisted state
/// always reflects the latest mutation.
pub struct LessonStore {
    kv: Arc<dyn KeyValueStore>,
    lessons: Mutex<Vec<Lesson>>,
}

impl LessonStore {
    pub async fn load(kv: Arc<dyn KeyValueStore>) -> Self {
        let mut lessons: Vec<Lesson> = load_collection(kv.as_ref(), SCHEDULE_KEY).await;

        let mut seen = HashSet::new();
        lessons.retain(|lesson| {
            let fresh = seen.insert(lesson.id.clone());
            if !fresh {
                warn!("Dropping duplicate stored lesson: {}", lesson.id);
            }
            fresh
        });
        apply_conflicts(&mut lessons);

        info!("Loaded schedule with {} lessons", lessons.len());
        Self {
            kv,
            lessons: Mutex::new(lessons),
        }
    }

    pub async fn snapshot(&self) -> Vec<Lesson> {
        self.lessons.lock().await.clone()
    }

    pub async fn append(&self, incoming: Vec<Lesson>) -> Result<Vec<Lesson>, AppError> {
        let mut current = self.lessons.lock().await;

        let mut ids: HashSet<&str> = current.iter().map(|l| l.id.as_str()).collect();
        for lesson in &incoming {
            if lesson.subject.trim().is_empty() {
                return Err(AppError::BadRequest(format!(
                    "Lesson {} has an empty subject",
                    lesson.id
                )));
            }
            if !ids.insert(lesson.id.as_str()) {
                return Err(AppError::DuplicateLesson(lesson.id.clone()));
            }
        }

        let added = incoming.len();
        let mut next = current.clone();
        next.extend(incoming);
        apply_conflicts(&mut next);

        self.persist(&next).await?;
        *current = next.clone();

        info!("Appended {} lessons (total {})", added, next.len());
        Ok(next)
    }

    pub async fn clear(&self) -> Result<Vec<Lesson>, AppError> {
        let mut current = self.lessons.lock().await;

        self.persist(&[]).await?;
        let removed = current.len();
        current.clear();

        info!("Cleared schedule ({} lessons removed)", removed);
        Ok(Vec::new())
    }

    async fn persist(&self, lessons: &[Lesson]) -> Result<(), AppError> {
        let blob = serde_json::to_string(lessons)?;
        self.kv.set(SCHEDULE_KEY, &blob).await
    }
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;

    use super::*;
    use crate::db::MemoryKeyValueStore;
    use crate::models::DayOfWeek;

    struct ReadOnlyStore;

    #[async_trait]
    impl KeyValueStore for ReadOnlyStore {
        async fn get(&self, _key: &str) -> Result<Option<String>, AppError> {
            Ok(None)
        }

        async fn set(&self, _key: &str, _value: &str) -> Result<(), AppError> {
            Err(AppError::InternalServerError)
        }
    }

    fn monday(id: &str, start: &str, end: &str) -> Lesson {
        Lesson::new(id, "Statistics", DayOfWeek::Monday, start, end)
    }

    #[tokio::test]
    async fn test_load_corrupt_blob_starts_empty() {
        let kv = Arc::new(MemoryKeyValueStore::with_entry(SCHEDULE_KEY, "[{\"id\":"));
        let store = LessonStore::load(kv).await;

        assert!(store.snapshot().await.is_empty());
    }

    #[tokio::test]
    async fn test_load_recomputes_stale_flags() {
        let blob = r#"[
            {"id":"a","subject":"A","dayOfWeek":"Monday","startTime":"09:00","endTime":"10:00","location":"","isConflict":true},
            {"id":"b","subject":"B","dayOfWeek":"Monday","startTime":"10:00","endTime":"11:00","location":"","isConflict":true}
        ]"#;
        let kv = Arc::new(MemoryKeyValueStore::with_entry(SCHEDULE_KEY, blob));
        let store = LessonStore::load(kv).await;

        let lessons = store.snapshot().await;
        assert_eq!(lessons.len(), 2);
        assert!(lessons.iter().all(|l| !l.is_conflict()));
    }

    #[tokio::test]
    async fn test_append_flags_conflicts_and_persists() {
        let kv = Arc::new(MemoryKeyValueStore::new());
        let store = LessonStore::load(kv.clone()).await;

        let schedule = store
            .append(vec![monday("a", "09:00", "10:00"), monday("b", "09:30", "10:30")])
            .await
            .expect("append");

        assert!(schedule.iter().all(|l| l.is_conflict()));

        let persisted: Vec<Lesson> =
            serde_json::from_str(&kv.raw(SCHEDULE_KEY).expect("persisted")).unwrap();
        assert_eq!(persisted, schedule);
    }

    #[tokio::test]
    async fn test_append_preserves_insertion_order() {
        let store = LessonStore::load(Arc::new(MemoryKeyValueStore::new())).await;

        store.append(vec![monday("z", "14:00", "15:00")]).await.unwrap();
        let schedule = store.append(vec![monday("a", "08:00", "09:00")]).await.unwrap();

        let ids: Vec<&str> = schedule.iter().map(|l| l.id.as_str()).collect();
        assert_eq!(ids, vec!["z", "a"]);
    }

    #[tokio::test]
    async fn test_append_rejects_duplicate_id_without_partial_write() {
        let store = LessonStore::load(Arc::new(MemoryKeyValueStore::new())).await;
        store.append(vec![monday("a", "09:00", "10:00")]).await.unwrap();

        let result = store
            .append(vec![monday("b", "11:00", "12:00"), monday("a", "13:00", "14:00")])
            .await;

        assert!(matches!(result, Err(AppError::DuplicateLesson(id)) if id == "a"));
        assert_eq!(store.snapshot().await.len(), 1);
    }

    #[tokio::test]
    async fn test_append_rejects_blank_subject() {
        let store = LessonStore::load(Arc::new(MemoryKeyValueStore::new())).await;

        let result = store
            .append(vec![Lesson::new("x", "  ", DayOfWeek::Friday, "09:00", "10:00")])
            .await;

        assert!(matches!(result, Err(AppError::BadRequest(_))));
        assert!(store.snapshot().await.is_empty());
    }

    #[tokio::test]
    async fn test_failed_persist_leaves_store_unchanged() {
        let store = LessonStore::load(Arc::new(ReadOnlyStore)).await;

        let result = store.append(vec![monday("a", "09:00", "10:00")]).await;

        assert!(result.is_err());
        assert!(store.snapshot().await.is_empty());
    }

    #[tokio::test]
    async fn test_concurrent_appends_persist_latest_schedule() {
        let kv = Arc::new(MemoryKeyValueStore::new());
        let store = Arc::new(LessonStore::load(kv.clone()).await);

        let handles: Vec<_> = (0..8)
            .map(|i| {
                let store = store.clone();
                tokio::spawn(async move {
                    let start = format!("{:02}:00", 8 + i);
                    let end = format!("{:02}:30", 8 + i);
                    store
                        .append(vec![monday(&format!("l{}", i), &start, &end)])
                        .await
                })
            })
            .collect();
        for handle in handles {
            handle.await.expect("task panicked").expect("append");
        }

        let schedule = store.snapshot().await;
        assert_eq!(schedule.len(), 8);
        assert_eq!(
            kv.raw(SCHEDULE_KEY),
            Some(serde_json::to_string(&schedule).unwrap())
        );
    }

    #[tokio::test]
    async fn test_clear_empties_and_persists() {
        let kv = Arc::new(MemoryKeyValueStore::new());
        let store = LessonStore::load(kv.clone()).await;
        store.append(vec![monday("a", "09:00", "10:00")]).await.unwrap();

        let schedule = store.clear().await.expect("clear");

        assert!(schedule.is_empty());
        assert!(store.snapshot().await.is_empty());
        assert_eq!(kv.raw(SCHEDULE_KEY).as_deref(), Some("[]"));
    }
}
