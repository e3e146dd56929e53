#![forbid(unsafe_code)]

pub mod repository;

pub use repository::{
    ExerciseRepository, ExerciseSummary, HotspotRepository, InMemoryRepository, QuestionRecord,
    QuestionRepository, StepRepository, Storage, StorageError,
};
