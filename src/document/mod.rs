pub mod dto;

use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::error::AppError;
use crate::models::{ChatMessage, MaterialSummary};

pub use dto::{CandidateLesson, Document};

const NOT_CONFIGURED: &str = "Document service is not configured";

#[derive(Clone, Debug)]
pub struct DocumentServiceConfig {
    pub base_url: String,
    pub api_token: Option<String>,
}

/// External document intelligence: schedule extraction, summaries and chat.
#[async_trait]
pub trait DocumentService: Send + Sync {
    async fn extract_lessons(&self, document: &Document) -> Result<Vec<CandidateLesson>, AppError>;
    async fn summarize(&self, document: &Document) -> Result<MaterialSummary, AppError>;
    async fn chat(
        &self,
        document: &Document,
        history: &[ChatMessage],
        question: &str,
    ) -> Result<String, AppError>;
}

pub struct HttpDocumentService {
    client: Client,
    config: DocumentServiceConfig,
}

impl HttpDocumentService {
    pub fn new(config: DocumentServiceConfig) -> Result<Self, AppError> {
        let client = Client::builder()
            .build()
            .map_err(|e| AppError::Config(format!("Failed to build http client: {}", e)))?;
        Ok(Self { client, config })
    }

    async fn post_json<B, R>(&self, path: &str, body: &B) -> Result<R, AppError>
    where
        B: Serialize + Sync,
        R: DeserializeOwned,
    {
        let url = format!("{}/{}", self.config.base_url.trim_end_matches('/'), path);

        let mut request = self.client.post(&url).json(body);
        if let Some(token) = &self.config.api_token {
            request = request.header("Authorization", format!("Bearer {}", token));
        }

        let response = request
            .send()
            .await
            .map_err(|e| AppError::Document(format!("Request to {} failed: {}", path, e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::Document(format!(
                "Document service error {}: {}",
                status, body
            )));
        }

        let body_text = response
            .text()
            .await
            .map_err(|e| AppError::Document(format!("Failed to read response: {}", e)))?;

        serde_json::from_str::<R>(&body_text).map_err(|e| {
            tracing::error!("Failed to parse {} response: {}", path, e);
            AppError::Document(format!("Failed to parse document service response: {}", e))
        })
    }
}

#[async_trait]
impl DocumentService for HttpDocumentService {
    async fn extract_lessons(&self, document: &Document) -> Result<Vec<CandidateLesson>, AppError> {
        let candidates: Vec<CandidateLesson> = self
            .post_json("extract-schedule", &dto::DocumentRequest { document })
            .await?;
        tracing::info!(
            "Document service proposed {} lessons from {}",
            candidates.len(),
            document.name
        );
        Ok(candidates)
    }

    async fn summarize(&self, document: &Document) -> Result<MaterialSummary, AppError> {
        self.post_json("summarize", &dto::DocumentRequest { document })
            .await
    }

    async fn chat(
        &self,
        document: &Document,
        history: &[ChatMessage],
        question: &str,
    ) -> Result<String, AppError> {
        let response: dto::ChatServiceResponse = self
            .post_json(
                "chat",
                &dto::ChatServiceRequest {
                    document,
                    history,
                    question,
                },
            )
            .await?;
        Ok(response.answer)
    }
}

/// Used when no service URL is configured: extraction proposes nothing and
/// summaries and chat are unavailable.
pub struct NoopDocumentService;

#[async_trait]
impl DocumentService for NoopDocumentService {
    async fn extract_lessons(&self, _document: &Document) -> Result<Vec<CandidateLesson>, AppError> {
        Ok(Vec::new())
    }

    async fn summarize(&self, _document: &Document) -> Result<MaterialSummary, AppError> {
        Err(AppError::Document(NOT_CONFIGURED.to_string()))
    }

    async fn chat(
        &self,
        _document: &Document,
        _history: &[ChatMessage],
        _question: &str,
    ) -> Result<String, AppError> {
        Err(AppError::Document(NOT_CONFIGURED.to_string()))
    }
}
