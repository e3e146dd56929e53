mod answer;
mod exercise;
mod hotspot;
mod ids;
mod item;
mod question;
mod settings;
mod step;

pub use ids::{
    ExamId, ExerciseId, HotspotId, ItemKey, OptionId, ParseIdError, QuestionId, ResponseKey,
    StepId, TopicId,
};

pub use answer::{Answer, AnswerError, HotspotResponse};
pub use exercise::Exercise;
pub use hotspot::{Hotspot, HotspotError, HotspotFields, HotspotKind};
pub use item::{ItemLabels, ItemPayload, TestItem};
pub use question::{Question, QuestionError, QuestionKind, QuestionOption};
pub use settings::{
    AuthoringSettings, ConfigError, ExamSettings, ExamSettingsDraft, MAX_DURATION_MINUTES,
};
pub use step::{Step, StepError, StepImage};
