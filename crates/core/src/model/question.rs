use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use thiserror::Error;

use crate::model::ids::{OptionId, QuestionId, TopicId};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum QuestionError {
    #[error("question prompt cannot be empty")]
    EmptyPrompt,

    #[error("question needs at least {min} options")]
    TooFewOptions { min: usize },

    #[error("option {0} appears more than once")]
    DuplicateOption(OptionId),
}

/// A selectable option of a choice or ordering question.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuestionOption {
    pub id: OptionId,
    pub text: String,
}

impl QuestionOption {
    #[must_use]
    pub fn new(id: OptionId, text: impl Into<String>) -> Self {
        Self {
            id,
            text: text.into(),
        }
    }
}

/// Shape of a question and its options.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum QuestionKind {
    TrueFalse,
    SingleChoice { options: Vec<QuestionOption> },
    MultipleChoice { options: Vec<QuestionOption> },
    /// Options listed in their authored order, which is also the default answer.
    Ordering { options: Vec<QuestionOption> },
}

impl QuestionKind {
    #[must_use]
    pub fn options(&self) -> &[QuestionOption] {
        match self {
            QuestionKind::TrueFalse => &[],
            QuestionKind::SingleChoice { options }
            | QuestionKind::MultipleChoice { options }
            | QuestionKind::Ordering { options } => options,
        }
    }

    fn min_options(&self) -> usize {
        match self {
            QuestionKind::TrueFalse => 0,
            _ => 2,
        }
    }
}

/// A non-exercise exam item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Question {
    id: QuestionId,
    topic_id: TopicId,
    prompt: String,
    kind: QuestionKind,
}

impl Question {
    /// # Errors
    ///
    /// Returns `QuestionError` for an empty prompt, too few options, or duplicate option ids.
    pub fn new(
        id: QuestionId,
        topic_id: TopicId,
        prompt: impl Into<String>,
        kind: QuestionKind,
    ) -> Result<Self, QuestionError> {
        let prompt = prompt.into().trim().to_string();
        if prompt.is_empty() {
            return Err(QuestionError::EmptyPrompt);
        }
        let options = kind.options();
        if options.len() < kind.min_options() {
            return Err(QuestionError::TooFewOptions {
                min: kind.min_options(),
            });
        }
        let mut seen = HashSet::with_capacity(options.len());
        for option in options {
            if !seen.insert(option.id) {
                return Err(QuestionError::DuplicateOption(option.id));
            }
        }
        Ok(Self {
            id,
            topic_id,
            prompt,
            kind,
        })
    }

    #[must_use]
    pub fn id(&self) -> QuestionId {
        self.id
    }

    #[must_use]
    pub fn topic_id(&self) -> TopicId {
        self.topic_id
    }

    #[must_use]
    pub fn prompt(&self) -> &str {
        &self.prompt
    }

    #[must_use]
    pub fn kind(&self) -> &QuestionKind {
        &self.kind
    }

    #[must_use]
    pub fn has_option(&self, id: OptionId) -> bool {
        self.kind.options().iter().any(|o| o.id == id)
    }

    /// Authored option order, used to seed ordering answers.
    #[must_use]
    pub fn authored_order(&self) -> Vec<OptionId> {
        self.kind.options().iter().map(|o| o.id).collect()
    }

    #[must_use]
    pub fn is_ordering(&self) -> bool {
        matches!(self.kind, QuestionKind::Ordering { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn options(ids: &[u64]) -> Vec<QuestionOption> {
        ids.iter()
            .map(|id| QuestionOption::new(OptionId::new(*id), format!("Option {id}")))
            .collect()
    }

    #[test]
    fn rejects_duplicate_options() {
        let err = Question::new(
            QuestionId::new(1),
            TopicId::new(1),
            "Pick one",
            QuestionKind::SingleChoice {
                options: options(&[1, 2, 1]),
            },
        )
        .unwrap_err();
        assert_eq!(err, QuestionError::DuplicateOption(OptionId::new(1)));
    }

    #[test]
    fn true_false_needs_no_options() {
        let q = Question::new(
            QuestionId::new(1),
            TopicId::new(1),
            "Sky is blue",
            QuestionKind::TrueFalse,
        )
        .unwrap();
        assert!(q.authored_order().is_empty());
    }

    #[test]
    fn rejects_blank_prompt() {
        let err = Question::new(QuestionId::new(1), TopicId::new(1), "  ", QuestionKind::TrueFalse)
            .unwrap_err();
        assert_eq!(err, QuestionError::EmptyPrompt);
    }
}
