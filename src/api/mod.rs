use axum::Json;
use axum::extract::{Path, Query};
use axum::routing::{patch, post};
use axum::{Router, extract::State, http::StatusCode, routing::get};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

use crate::document::Document;
use crate::error::AppError;
use crate::models::*;
use crate::notify::{NotificationPermission, PermissionState};
use crate::services::drafts::{self, DraftEdit};
use crate::services::grid::{GridConfig, PlacedLesson, layout_week};
use crate::state::AppState;

const SCHEDULE_MIME_TYPE: &str = "application/pdf";

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct DraftsResponse {
    source: Option<String>,
    drafts: Vec<Lesson>,
}

#[derive(Serialize)]
struct GridResponse {
    config: GridConfig,
    placements: Vec<PlacedLesson>,
}

#[derive(Deserialize)]
struct MaterialQuery {
    q: Option<String>,
}

#[derive(Serialize, Deserialize)]
struct PermissionBody {
    state: PermissionState,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/schedule", get(get_schedule).delete(clear_schedule))
        .route("/schedule/grid", get(schedule_grid))
        .route("/drafts", get(list_drafts).post(upload_drafts).delete(discard_drafts))
        .route("/drafts/confirm", post(confirm_drafts))
        .route("/drafts/{id}", patch(edit_draft))
        .route("/materials", get(list_materials).post(add_material))
        .route("/materials/{id}", axum::routing::delete(delete_material))
        .route("/materials/{id}/chat", post(chat_material))
        .route("/notifications/permission", get(get_permission).put(set_permission))
        .route("/notifications/permission/request", post(request_permission))
        .with_state(state)
}

async fn health(State(state): State<AppState>) -> Result<StatusCode, AppError> {
    state.kv.ping().await?;
    Ok(StatusCode::OK)
}

async fn get_schedule(State(state): State<AppState>) -> Json<Vec<Lesson>> {
    Json(state.lessons.snapshot().await)
}

async fn clear_schedule(State(state): State<AppState>) -> Result<Json<Vec<Lesson>>, AppError> {
    let schedule = state.lessons.clear().await?;
    Ok(Json(schedule))
}

async fn schedule_grid(State(state): State<AppState>) -> Json<GridResponse> {
    let lessons = state.lessons.snapshot().await;
    Json(GridResponse {
        placements: layout_week(&lessons, &state.grid),
        config: state.grid.clone(),
    })
}

async fn upload_drafts(
    State(state): State<AppState>,
    Json(document): Json<Document>,
) -> Result<Json<DraftsResponse>, AppError> {
    if document.mime_type != SCHEDULE_MIME_TYPE {
        return Err(AppError::BadRequest("Please upload a PDF file.".to_string()));
    }

    let candidates = state.documents.extract_lessons(&document).await?;
    let existing = state.lessons.snapshot().await;

    let mut session = state.drafts.lock().await;
    let drafts = session.propose(&existing, Some(document.name), candidates).to_vec();
    Ok(Json(DraftsResponse {
        source: session.source().map(str::to_string),
        drafts,
    }))
}

async fn list_drafts(State(state): State<AppState>) -> Json<DraftsResponse> {
    let existing = state.lessons.snapshot().await;

    let mut session = state.drafts.lock().await;
    let drafts = session.refresh(&existing).to_vec();
    Json(DraftsResponse {
        source: session.source().map(str::to_string),
        drafts,
    })
}

async fn edit_draft(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(edit): Json<DraftEdit>,
) -> Result<Json<DraftsResponse>, AppError> {
    let existing = state.lessons.snapshot().await;

    let mut session = state.drafts.lock().await;
    let drafts = session
        .edit_field(&existing, &id, edit.field, &edit.value)?
        .to_vec();
    Ok(Json(DraftsResponse {
        source: session.source().map(str::to_string),
        drafts,
    }))
}

async fn confirm_drafts(State(state): State<AppState>) -> Result<Json<Vec<Lesson>>, AppError> {
    let schedule = drafts::commit(&state.drafts, &state.lessons).await?;
    Ok(Json(schedule))
}

async fn discard_drafts(State(state): State<AppState>) -> StatusCode {
    let dropped = state.drafts.lock().await.discard();
    info!("Discarded {} draft lessons", dropped);
    StatusCode::NO_CONTENT
}

async fn list_materials(
    State(state): State<AppState>,
    Query(query): Query<MaterialQuery>,
) -> Json<Vec<StudyMaterial>> {
    match query.q.as_deref() {
        Some(q) => Json(state.materials.search(q).await),
        None => Json(state.materials.list().await),
    }
}

async fn add_material(
    State(state): State<AppState>,
    Json(document): Json<Document>,
) -> Result<Json<StudyMaterial>, AppError> {
    let summary = match state.documents.summarize(&document).await {
        Ok(summary) => Some(summary),
        Err(e) => {
            warn!("Storing {} without a summary: {}", document.name, e);
            None
        }
    };

    let material = StudyMaterial {
        id: Uuid::new_v4().to_string(),
        name: document.name,
        mime_type: document.mime_type,
        summary,
        content: document.content,
        upload_date: Utc::now().timestamp_millis(),
    };
    state.materials.add(material.clone()).await?;
    Ok(Json(material))
}

async fn delete_material(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode, AppError> {
    state.materials.delete(&id).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn chat_material(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<ChatRequest>,
) -> Result<Json<ChatResponse>, AppError> {
    if req.question.trim().is_empty() {
        return Err(AppError::BadRequest("Question must not be empty".to_string()));
    }
    let material = state.materials.find(&id).await.ok_or(AppError::NotFound)?;

    let document = Document {
        name: material.name,
        mime_type: material.mime_type,
        content: material.content,
    };
    let answer = state
        .documents
        .chat(&document, &req.history, &req.question)
        .await?;
    Ok(Json(ChatResponse { answer }))
}

async fn get_permission(State(state): State<AppState>) -> Json<PermissionBody> {
    Json(PermissionBody {
        state: state.permission.state(),
    })
}

async fn set_permission(
    State(state): State<AppState>,
    Json(body): Json<PermissionBody>,
) -> Json<PermissionBody> {
    state.permission.set(body.state);
    Json(PermissionBody {
        state: state.permission.state(),
    })
}

async fn request_permission(State(state): State<AppState>) -> Json<PermissionBody> {
    Json(PermissionBody {
        state: state.permission.request().await,
    })
}
