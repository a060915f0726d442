pub mod lesson;
pub mod material;

pub use lesson::{DayOfWeek, Lesson, TimeSpan, UnknownDay, parse_clock};
pub use material::{ChatMessage, ChatRequest, ChatResponse, ChatRole, MaterialSummary, StudyMaterial};
