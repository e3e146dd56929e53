mod answers;
mod controller;
mod progress;
mod selection;
mod submission;
mod timer;

// Public API of the exam-taking subsystem.
pub use answers::AnswerStore;
pub use controller::SessionController;
pub use progress::SessionProgress;
pub use selection::ItemSelectionEngine;
pub use submission::{
    Evaluation, Evaluator, EvaluatorConfig, HttpEvaluator, SessionOutcome, SubmissionBundle,
    SubmissionPipeline, SubmissionState, SubmissionTicket, SubmitReason,
};
pub use timer::{Countdown, SessionTimer, TICK_PERIOD, TickOutcome};
