use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::info;

use crate::db::{KeyValueStore, MATERIALS_KEY, load_collection};
use crate::error::AppError;
use crate::models::StudyMaterial;

pub struct MaterialStore {
    kv: Arc<dyn KeyValueStore>,
    materials: Mutex<Vec<StudyMaterial>>,
}

impl MaterialStore {
    pub async fn load(kv: Arc<dyn KeyValueStore>) -> Self {
        let materials: Vec<StudyMaterial> = load_collection(kv.as_ref(), MATERIALS_KEY).await;
        info!("Loaded {} study materials", materials.len());
        Self {
            kv,
            materials: Mutex::new(materials),
        }
    }

    pub async fn list(&self) -> Vec<StudyMaterial> {
        self.materials.lock().await.clone()
    }

    /// Case-insensitive substring match on the material name.
    pub async fn search(&self, query: &str) -> Vec<StudyMaterial> {
        let needle = query.trim().to_lowercase();
        self.materials
            .lock()
            .await
            .iter()
            .filter(|m| m.name.to_lowercase().contains(&needle))
            .cloned()
            .collect()
    }

    pub async fn find(&self, id: &str) -> Option<StudyMaterial> {
        self.materials
            .lock()
            .await
            .iter()
            .find(|m| m.id == id)
            .cloned()
    }

    /// Newest materials come first.
    pub async fn add(&self, material: StudyMaterial) -> Result<Vec<StudyMaterial>, AppError> {
        let mut current = self.materials.lock().await;

        let mut next = current.clone();
        next.insert(0, material);
        self.persist(&next).await?;
        *current = next.clone();

        info!("Added study material (total {})", next.len());
        Ok(next)
    }

    pub async fn delete(&self, id: &str) -> Result<Vec<StudyMaterial>, AppError> {
        let mut current = self.materials.lock().await;

        if !current.iter().any(|m| m.id == id) {
            return Err(AppError::NotFound);
        }
        let next: Vec<StudyMaterial> = current.iter().filter(|m| m.id != id).cloned().collect();
        self.persist(&next).await?;
        *current = next.clone();

        info!("Deleted study material {}", id);
        Ok(next)
    }

    async fn persist(&self, materials: &[StudyMaterial]) -> Result<(), AppError> {
        let blob = serde_json::to_string(materials)?;
        self.kv.set(MATERIALS_KEY, &blob).await
    }
}
