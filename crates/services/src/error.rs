//! Shared error types for the services crate.

use thiserror::Error;

use exam_core::geometry::GeometryError;
use exam_core::model::{AnswerError, HotspotError, HotspotId, ItemKey, StepError, StepId};
use exam_core::sequencer::SequencerError;
use storage::repository::StorageError;

/// Errors emitted by `HotspotAuthoringController`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum AuthoringError {
    #[error("another gesture is already in progress")]
    GestureInProgress,
    #[error("no gesture is in progress")]
    NoActiveGesture,
    #[error("exercise has no step to place hotspots on")]
    NoActiveStep,
    #[error("step {0} not found")]
    StepNotFound(StepId),
    #[error("hotspot {0} not found")]
    HotspotNotFound(HotspotId),
    #[error("no hotspot editor is open")]
    NoOpenEditor,
    #[error("no delete is awaiting confirmation")]
    NoPendingDelete,
    #[error(transparent)]
    Geometry(#[from] GeometryError),
    #[error(transparent)]
    Hotspot(#[from] HotspotError),
    #[error(transparent)]
    Step(#[from] StepError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Which pool a selection count refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PoolKind {
    Questions,
    Exercises,
}

/// Errors emitted by `ItemSelectionEngine`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SelectionError {
    #[error("requested {requested} {pool:?} but only {available} are available")]
    CountExceedsPool {
        pool: PoolKind,
        requested: usize,
        available: usize,
    },
    #[error("no items requested")]
    NothingRequested,
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors emitted by session evaluators.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum EvaluationError {
    #[error("evaluation service is not configured")]
    Disabled,
    #[error("invalid evaluator URL: {0}")]
    InvalidUrl(String),
    #[error("evaluation request failed with status {0}")]
    HttpStatus(reqwest::StatusCode),
    #[error(transparent)]
    Http(#[from] reqwest::Error),
    #[error("evaluation unavailable: {0}")]
    Unavailable(String),
}

/// Errors emitted by the exam session.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SessionError {
    #[error("no items available for session")]
    Empty,
    #[error("session already submitted")]
    Finalized,
    #[error("submission in progress")]
    Submitting,
    #[error("item {0} is not part of this session")]
    ItemNotFound(ItemKey),
    #[error("item {0} is not a question")]
    NotAQuestion(ItemKey),
    #[error("item {0} is not an exercise")]
    NotAnExercise(ItemKey),
    #[error("item index {0} is out of range")]
    IndexOutOfRange(usize),
    #[error("submission has not been requested")]
    SubmitNotRequested,
    #[error(transparent)]
    Answer(#[from] AnswerError),
    #[error(transparent)]
    Sequencer(#[from] SequencerError),
    #[error(transparent)]
    Selection(#[from] SelectionError),
}
