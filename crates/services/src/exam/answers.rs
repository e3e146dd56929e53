use std::collections::{BTreeMap, HashMap, HashSet};

use exam_core::model::{
    Answer, AnswerError, ExerciseId, HotspotResponse, ItemKey, ItemPayload, OptionId, Question,
    TestItem,
};
use exam_core::sequencer::ExerciseProgress;

/// Learner answers for one exam sitting.
///
/// Ordering questions start with the authored order already stored, so the
/// stored value alone does not say whether the learner answered. They count
/// as answered only once touched.
#[derive(Debug, Clone, Default)]
pub struct AnswerStore {
    answers: HashMap<ItemKey, Answer>,
    touched: HashSet<ItemKey>,
    progress: HashMap<ExerciseId, ExerciseProgress>,
}

impl AnswerStore {
    /// Seed ordering defaults and exercise progress for `items`.
    #[must_use]
    pub fn seed(items: &[TestItem]) -> Self {
        let mut store = Self::default();
        for item in items {
            match item.payload() {
                ItemPayload::Question(question) if question.is_ordering() => {
                    store
                        .answers
                        .insert(item.key(), Answer::Ordered(question.authored_order()));
                }
                ItemPayload::Question(_) => {}
                ItemPayload::Exercise(exercise) => {
                    store
                        .progress
                        .insert(exercise.id(), ExerciseProgress::new(exercise));
                }
            }
        }
        store
    }

    #[must_use]
    pub fn answer(&self, key: &ItemKey) -> Option<&Answer> {
        self.answers.get(key)
    }

    /// Store an answer after checking it fits the question.
    ///
    /// # Errors
    ///
    /// Returns `AnswerError` if the answer's shape or options do not match.
    pub fn set_answer(&mut self, question: &Question, answer: Answer) -> Result<(), AnswerError> {
        answer.validate_for(question)?;
        let key = ItemKey::Question(question.id());
        if question.is_ordering() {
            self.touched.insert(key);
        }
        self.answers.insert(key, answer);
        Ok(())
    }

    /// Replace the order of an ordering question and mark it touched.
    ///
    /// # Errors
    ///
    /// Returns `AnswerError::NotAPermutation` unless `order` lists every option once.
    pub fn reorder(
        &mut self,
        question: &Question,
        order: Vec<OptionId>,
    ) -> Result<(), AnswerError> {
        self.set_answer(question, Answer::Ordered(order))
    }

    /// Move one option of an ordering question from `from` to `to`.
    ///
    /// # Errors
    ///
    /// Returns `AnswerError::ShapeMismatch` for non-ordering questions and
    /// `AnswerError::NotAPermutation` for an index out of range.
    pub fn move_option(
        &mut self,
        question: &Question,
        from: usize,
        to: usize,
    ) -> Result<(), AnswerError> {
        if !question.is_ordering() {
            return Err(AnswerError::ShapeMismatch);
        }
        let mut order = match self.answers.get(&ItemKey::Question(question.id())) {
            Some(Answer::Ordered(order)) => order.clone(),
            _ => question.authored_order(),
        };
        if from >= order.len() || to >= order.len() {
            return Err(AnswerError::NotAPermutation);
        }
        let option = order.remove(from);
        order.insert(to, option);
        self.reorder(question, order)
    }

    #[must_use]
    pub fn is_touched(&self, key: &ItemKey) -> bool {
        self.touched.contains(key)
    }

    #[must_use]
    pub fn progress(&self, exercise_id: ExerciseId) -> Option<&ExerciseProgress> {
        self.progress.get(&exercise_id)
    }

    pub fn progress_mut(&mut self, exercise_id: ExerciseId) -> Option<&mut ExerciseProgress> {
        self.progress.get_mut(&exercise_id)
    }

    /// Whether `item` counts toward the answered total.
    #[must_use]
    pub fn is_answered(&self, item: &TestItem) -> bool {
        let key = item.key();
        match item.payload() {
            ItemPayload::Question(question) if question.is_ordering() => {
                self.touched.contains(&key)
            }
            ItemPayload::Question(_) => self.answers.contains_key(&key),
            ItemPayload::Exercise(exercise) => self
                .progress
                .get(&exercise.id())
                .is_some_and(|progress| progress.is_exercise_complete(exercise)),
        }
    }

    #[must_use]
    pub fn answered_count(&self, items: &[TestItem]) -> usize {
        items.iter().filter(|item| self.is_answered(item)).count()
    }

    /// Question answers keyed by item key, e.g. `q-7`.
    #[must_use]
    pub fn export_answers(&self) -> BTreeMap<String, Answer> {
        self.answers
            .iter()
            .map(|(key, answer)| (key.to_string(), answer.clone()))
            .collect()
    }

    /// Hotspot responses per exercise, keyed by item key then `{stepId}_{hotspotId}`.
    #[must_use]
    pub fn export_exercise_responses(&self) -> BTreeMap<String, BTreeMap<String, HotspotResponse>> {
        self.progress
            .iter()
            .map(|(id, progress)| {
                (
                    ItemKey::Exercise(*id).to_string(),
                    progress.export_responses(),
                )
            })
            .collect()
    }
}
