pub mod conflict;
pub mod drafts;
pub mod grid;
pub mod lesson_store;
pub mod material_store;
pub mod scheduler;

pub use conflict::{apply_conflicts, detect_conflicts};
pub use drafts::{DraftEdit, DraftField, DraftSession, reconcile};
pub use grid::{GridConfig, GridPlacement, place_lesson, layout_week};
pub use lesson_store::LessonStore;
pub use material_store::MaterialStore;
pub use scheduler::{ReminderMatch, ReminderPolicy, ReminderScheduler};
