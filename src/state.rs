use std::sync::Arc;

use tokio::sync::Mutex;

use crate::db::KeyValueStore;
use crate::document::DocumentService;
use crate::notify::SharedPermission;
use crate::services::drafts::DraftSession;
use crate::services::grid::GridConfig;
use crate::services::lesson_store::LessonStore;
use crate::services::material_store::MaterialStore;

#[derive(Clone)]
pub struct AppState {
    pub kv: Arc<dyn KeyValueStore>,
    pub lessons: Arc<LessonStore>,
    pub materials: Arc<MaterialStore>,
    pub drafts: Arc<Mutex<DraftSession>>,
    pub documents: Arc<dyn DocumentService>,
    pub permission: Arc<SharedPermission>,
    pub grid: GridConfig,
}

impl AppState {
    pub async fn load(
        kv: Arc<dyn KeyValueStore>,
        documents: Arc<dyn DocumentService>,
        grid: GridConfig,
    ) -> Self {
        let lessons = Arc::new(LessonStore::load(kv.clone()).await);
        let materials = Arc::new(MaterialStore::load(kv.clone()).await);

        Self {
            kv,
            lessons,
            materials,
            drafts: Arc::new(Mutex::new(DraftSession::default())),
            documents,
            permission: Arc::new(SharedPermission::default()),
            grid,
        }
    }
}
