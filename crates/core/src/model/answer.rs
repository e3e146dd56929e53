use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashSet};
use thiserror::Error;

use crate::model::ids::OptionId;
use crate::model::question::{Question, QuestionKind};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum AnswerError {
    #[error("answer shape does not match the question type")]
    ShapeMismatch,

    #[error("option {0} does not belong to this question")]
    UnknownOption(OptionId),

    #[error("ordering must list every option exactly once")]
    NotAPermutation,
}

/// A learner's answer to a question, shaped by the question type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum Answer {
    Boolean(bool),
    Single(OptionId),
    Multiple(BTreeSet<OptionId>),
    Ordered(Vec<OptionId>),
}

impl Answer {
    /// Check that this answer fits `question`.
    ///
    /// # Errors
    ///
    /// Returns `AnswerError` if the variant does not match the question kind,
    /// references an unknown option, or an ordering is not a permutation.
    pub fn validate_for(&self, question: &Question) -> Result<(), AnswerError> {
        match (question.kind(), self) {
            (QuestionKind::TrueFalse, Answer::Boolean(_)) => Ok(()),
            (QuestionKind::SingleChoice { .. }, Answer::Single(id)) => known(question, *id),
            (QuestionKind::MultipleChoice { .. }, Answer::Multiple(ids)) => {
                ids.iter().try_for_each(|id| known(question, *id))
            }
            (QuestionKind::Ordering { options }, Answer::Ordered(ids)) => {
                ids.iter().try_for_each(|id| known(question, *id))?;
                let unique: HashSet<_> = ids.iter().collect();
                if ids.len() != options.len() || unique.len() != ids.len() {
                    return Err(AnswerError::NotAPermutation);
                }
                Ok(())
            }
            _ => Err(AnswerError::ShapeMismatch),
        }
    }
}

fn known(question: &Question, id: OptionId) -> Result<(), AnswerError> {
    if question.has_option(id) {
        Ok(())
    } else {
        Err(AnswerError::UnknownOption(id))
    }
}

/// What a learner did to a hotspot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum HotspotResponse {
    Clicked,
    Text(String),
}
