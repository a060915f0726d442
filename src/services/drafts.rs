use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::document::CandidateLesson;
use crate::error::AppError;
use crate::models::{DayOfWeek, Lesson};
use crate::services::conflict::apply_conflicts;
use crate::services::lesson_store::LessonStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum DraftField {
    Subject,
    DayOfWeek,
    StartTime,
    EndTime,
    Location,
    Instructor,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DraftEdit {
    pub field: DraftField,
    pub value: String,
}

/// Recompute conflicts over `existing ∪ drafts` and return only the drafts.
pub fn reconcile(existing: &[Lesson], drafts: Vec<Lesson>) -> Vec<Lesson> {
    let mut union: Vec<Lesson> = existing.iter().cloned().chain(drafts).collect();
    apply_conflicts(&mut union);
    union.split_off(existing.len())
}

/// Turn extraction output into draft lessons with fresh ids. The advisory
/// conflict flag is dropped; unusable records are skipped.
pub fn drafts_from_candidates(candidates: Vec<CandidateLesson>) -> Vec<Lesson> {
    candidates
        .into_iter()
        .filter_map(|candidate| {
            if candidate.subject.trim().is_empty() {
                warn!("Skipping candidate lesson without a subject");
                return None;
            }
            let day = match candidate.day_of_week.parse::<DayOfWeek>() {
                Ok(day) => day,
                Err(e) => {
                    warn!("Skipping candidate {}: {}", candidate.subject, e);
                    return None;
                }
            };
            if let Some(flag) = candidate.is_conflict {
                debug!("Ignoring advisory conflict flag {} on {}", flag, candidate.subject);
            }

            let mut lesson = Lesson::new(
                Uuid::new_v4().to_string(),
                candidate.subject.trim(),
                day,
                candidate.start_time.trim(),
                candidate.end_time.trim(),
            );
            lesson.location = candidate.location.unwrap_or_default();
            lesson.instructor = candidate.instructor.filter(|i| !i.trim().is_empty());
            Some(lesson)
        })
        .collect()
}

/// Lessons awaiting review before they enter the schedule.
#[derive(Debug, Default)]
pub struct DraftSession {
    source: Option<String>,
    drafts: Vec<Lesson>,
}

impl DraftSession {
    pub fn source(&self) -> Option<&str> {
        self.source.as_deref()
    }

    pub fn drafts(&self) -> &[Lesson] {
        &self.drafts
    }

    pub fn is_empty(&self) -> bool {
        self.drafts.is_empty()
    }

    /// Replace any pending drafts with a new extraction result.
    pub fn propose(
        &mut self,
        existing: &[Lesson],
        source: Option<String>,
        candidates: Vec<CandidateLesson>,
    ) -> &[Lesson] {
        let drafts = drafts_from_candidates(candidates);
        info!(
            "Proposed {} draft lessons from {}",
            drafts.len(),
            source.as_deref().unwrap_or("upload")
        );
        self.source = source;
        self.drafts = reconcile(existing, drafts);
        &self.drafts
    }

    pub fn refresh(&mut self, existing: &[Lesson]) -> &[Lesson] {
        let drafts = std::mem::take(&mut self.drafts);
        self.drafts = reconcile(existing, drafts);
        &self.drafts
    }

    pub fn edit_field(
        &mut self,
        existing: &[Lesson],
        id: &str,
        field: DraftField,
        value: &str,
    ) -> Result<&[Lesson], AppError> {
        let draft = self
            .drafts
            .iter_mut()
            .find(|l| l.id == id)
            .ok_or(AppError::NotFound)?;

        match field {
            DraftField::Subject => {
                if value.trim().is_empty() {
                    return Err(AppError::BadRequest("Subject must not be empty".to_string()));
                }
                draft.subject = value.trim().to_string();
            }
            DraftField::DayOfWeek => {
                draft.day_of_week = value
                    .parse()
                    .map_err(|e: crate::models::UnknownDay| AppError::BadRequest(e.to_string()))?;
            }
            DraftField::StartTime => draft.start_time = value.trim().to_string(),
            DraftField::EndTime => draft.end_time = value.trim().to_string(),
            DraftField::Location => draft.location = value.to_string(),
            DraftField::Instructor => {
                draft.instructor = Some(value.trim().to_string()).filter(|i| !i.is_empty());
            }
        }

        debug!("Edited draft {} field {:?}", id, field);
        Ok(self.refresh(existing))
    }

    pub fn discard(&mut self) -> usize {
        let dropped = self.drafts.len();
        self.drafts.clear();
        self.source = None;
        dropped
    }
}

/// Move the pending drafts into the schedule. On failure the drafts stay
/// pending so the user can retry.
pub async fn commit(
    session: &Mutex<DraftSession>,
    store: &LessonStore,
) -> Result<Vec<Lesson>, AppError> {
    let mut session = session.lock().await;
    if session.is_empty() {
        return Err(AppError::BadRequest("No draft lessons to confirm".to_string()));
    }

    let schedule = store.append(session.drafts().to_vec()).await?;
    let committed = session.discard();
    info!("Confirmed {} draft lessons", committed);
    Ok(schedule)
}
