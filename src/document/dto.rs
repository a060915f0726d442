use serde::{Deserialize, Serialize};

use crate::models::ChatMessage;

/// An uploaded document as sent by the client.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Document {
    pub name: String,
    pub mime_type: String,
    /// Base64 body.
    pub content: String,
}

/// A lesson proposed by the extraction service. `is_conflict` is advisory
/// and never trusted.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CandidateLesson {
    pub subject: String,
    pub day_of_week: String,
    pub start_time: String,
    pub end_time: String,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub instructor: Option<String>,
    #[serde(default)]
    pub is_conflict: Option<bool>,
}

#[derive(Debug, Serialize)]
pub struct DocumentRequest<'a> {
    pub document: &'a Document,
}

#[derive(Debug, Serialize)]
pub struct ChatServiceRequest<'a> {
    pub document: &'a Document,
    pub history: &'a [ChatMessage],
    pub question: &'a str,
}

#[derive(Debug, Deserialize)]
pub struct ChatServiceResponse {
    pub answer: String,
}
