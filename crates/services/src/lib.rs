#![forbid(unsafe_code)]

pub mod authoring;
pub mod error;
pub mod exam;

pub use exam_core::Clock;

pub use error::{AuthoringError, EvaluationError, PoolKind, SelectionError, SessionError};

pub use authoring::{HotspotAuthoringController, HotspotWriter, Tool};
pub use exam::{
    HttpEvaluator, ItemSelectionEngine, SessionController, SessionOutcome, SubmissionPipeline,
};
