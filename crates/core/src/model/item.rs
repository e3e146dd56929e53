use serde::{Deserialize, Serialize};

use crate::model::exercise::Exercise;
use crate::model::ids::ItemKey;
use crate::model::question::Question;

/// Category and topic names shown next to an item.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemLabels {
    pub category: Option<String>,
    pub topic: Option<String>,
}

/// The content of an exam item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ItemPayload {
    Question(Question),
    Exercise(Exercise),
}

/// One question or exercise presented in an exam session.
///
/// Items are read-only once a session has started.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestItem {
    labels: ItemLabels,
    payload: ItemPayload,
}

impl TestItem {
    #[must_use]
    pub fn question(question: Question, labels: ItemLabels) -> Self {
        Self {
            labels,
            payload: ItemPayload::Question(question),
        }
    }

    #[must_use]
    pub fn exercise(exercise: Exercise, labels: ItemLabels) -> Self {
        Self {
            labels,
            payload: ItemPayload::Exercise(exercise),
        }
    }

    #[must_use]
    pub fn key(&self) -> ItemKey {
        match &self.payload {
            ItemPayload::Question(q) => ItemKey::Question(q.id()),
            ItemPayload::Exercise(e) => ItemKey::Exercise(e.id()),
        }
    }

    #[must_use]
    pub fn labels(&self) -> &ItemLabels {
        &self.labels
    }

    #[must_use]
    pub fn payload(&self) -> &ItemPayload {
        &self.payload
    }

    #[must_use]
    pub fn as_question(&self) -> Option<&Question> {
        match &self.payload {
            ItemPayload::Question(q) => Some(q),
            ItemPayload::Exercise(_) => None,
        }
    }

    #[must_use]
    pub fn as_exercise(&self) -> Option<&Exercise> {
        match &self.payload {
            ItemPayload::Exercise(e) => Some(e),
            ItemPayload::Question(_) => None,
        }
    }
}
