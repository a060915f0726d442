pub mod repository;

pub use repository::{
    KeyValueStore, MATERIALS_KEY, MemoryKeyValueStore, SCHEDULE_KEY, SqliteKeyValueStore,
    load_collection,
};
