use std::sync::Arc;

use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;

use exam_core::model::{ExamSettings, TestItem};
use storage::repository::{ExerciseRepository, QuestionRepository, Storage};

use crate::error::{PoolKind, SelectionError};

/// Draws a random, frozen mix of questions and exercises for one sitting.
#[derive(Clone)]
pub struct ItemSelectionEngine {
    questions: Arc<dyn QuestionRepository>,
    exercises: Arc<dyn ExerciseRepository>,
    seed: Option<u64>,
}

impl ItemSelectionEngine {
    #[must_use]
    pub fn new(
        questions: Arc<dyn QuestionRepository>,
        exercises: Arc<dyn ExerciseRepository>,
    ) -> Self {
        Self {
            questions,
            exercises,
            seed: None,
        }
    }

    #[must_use]
    pub fn from_storage(storage: &Storage) -> Self {
        Self::new(
            Arc::clone(&storage.questions),
            Arc::clone(&storage.exercises),
        )
    }

    /// Fix the shuffle seed so selections are reproducible.
    #[must_use]
    pub fn with_seed(mut self, seed: Option<u64>) -> Self {
        self.seed = seed;
        self
    }

    /// Select using the counts from validated exam settings.
    ///
    /// # Errors
    ///
    /// See [`Self::select`].
    pub async fn select_for(
        &self,
        settings: &ExamSettings,
    ) -> Result<Vec<TestItem>, SelectionError> {
        self.select(settings.question_count(), settings.exercise_count())
            .await
    }

    /// Pick `question_count` questions and `exercise_count` exercises uniformly
    /// at random, hydrate the exercises, and shuffle the combined list.
    ///
    /// An exercise whose detail cannot be fetched is left out, so the result
    /// can be shorter than requested.
    ///
    /// # Errors
    ///
    /// Returns `SelectionError::NothingRequested` when both counts are zero,
    /// `SelectionError::CountExceedsPool` when a count is larger than its pool,
    /// or `SelectionError::Storage` if a pool cannot be read.
    pub async fn select(
        &self,
        question_count: usize,
        exercise_count: usize,
    ) -> Result<Vec<TestItem>, SelectionError> {
        if question_count == 0 && exercise_count == 0 {
            return Err(SelectionError::NothingRequested);
        }

        let mut question_pool = if question_count > 0 {
            self.questions.fetch_question_pool().await?
        } else {
            Vec::new()
        };
        let mut exercise_pool = if exercise_count > 0 {
            self.exercises.fetch_exercise_pool().await?
        } else {
            Vec::new()
        };
        ensure_fits(PoolKind::Questions, question_count, question_pool.len())?;
        ensure_fits(PoolKind::Exercises, exercise_count, exercise_pool.len())?;

        let mut rng = self.rng();
        question_pool.shuffle(&mut rng);
        question_pool.truncate(question_count);
        exercise_pool.shuffle(&mut rng);
        exercise_pool.truncate(exercise_count);

        let mut items: Vec<TestItem> = question_pool
            .into_iter()
            .map(|record| TestItem::question(record.question, record.labels))
            .collect();

        for summary in exercise_pool {
            match self.exercises.fetch_exercise_detail(summary.id).await {
                Ok(exercise) => items.push(TestItem::exercise(exercise, summary.labels)),
                Err(err) => {
                    tracing::warn!(
                        exercise_id = %summary.id,
                        error = %err,
                        "Dropping exercise that failed to load"
                    );
                }
            }
        }

        items.shuffle(&mut rng);
        tracing::info!(
            questions = question_count,
            exercises = exercise_count,
            selected = items.len(),
            "Exam items selected"
        );
        Ok(items)
    }

    fn rng(&self) -> StdRng {
        match self.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        }
    }
}

fn ensure_fits(pool: PoolKind, requested: usize, available: usize) -> Result<(), SelectionError> {
    if requested > available {
        return Err(SelectionError::CountExceedsPool {
            pool,
            requested,
            available,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    use exam_core::model::{
        Exercise, ExerciseId, ItemKey, ItemLabels, Question, QuestionId, QuestionKind, TopicId,
    };
    use async_trait::async_trait;
    use storage::repository::{ExerciseSummary, InMemoryRepository, StorageError};

    fn seeded(questions: u64, exercises: u64) -> InMemoryRepository {
        let repo = InMemoryRepository::new();
        for id in 1..=questions {
            let question = Question::new(
                QuestionId::new(id),
                TopicId::new(1),
                format!("Question {id}"),
                QuestionKind::TrueFalse,
            )
            .unwrap();
            repo.insert_question(question, ItemLabels::default()).unwrap();
        }
        for id in 1..=exercises {
            let mut exercise =
                Exercise::new(ExerciseId::new(id), TopicId::new(1), format!("Ex {id}"));
            exercise.set_complete(true);
            repo.upsert_exercise(exercise, ItemLabels::default()).unwrap();
        }
        repo
    }

    fn engine(repo: &InMemoryRepository) -> ItemSelectionEngine {
        ItemSelectionEngine::from_storage(&Storage::from_repository(repo.clone()))
    }

    #[tokio::test]
    async fn selects_unique_items_of_each_kind() {
        let repo = seeded(20, 10);
        let items = engine(&repo).select(5, 3).await.unwrap();

        assert_eq!(items.len(), 8);
        let keys: HashSet<_> = items.iter().map(TestItem::key).collect();
        assert_eq!(keys.len(), 8);
        assert_eq!(items.iter().filter(|i| i.as_question().is_some()).count(), 5);
        assert_eq!(items.iter().filter(|i| i.as_exercise().is_some()).count(), 3);
    }

    #[tokio::test]
    async fn repeated_selections_vary_order() {
        let repo = seeded(20, 10);
        let engine = engine(&repo);
        let mut orders = HashSet::new();
        for _ in 0..10 {
            let items = engine.select(5, 3).await.unwrap();
            orders.insert(items.iter().map(TestItem::key).collect::<Vec<_>>());
        }
        assert!(orders.len() > 1);
    }

    #[tokio::test]
    async fn same_seed_gives_same_order() {
        let repo = seeded(20, 10);
        let first = engine(&repo).with_seed(Some(42)).select(5, 3).await.unwrap();
        let second = engine(&repo).with_seed(Some(42)).select(5, 3).await.unwrap();
        let keys = |items: &[TestItem]| items.iter().map(TestItem::key).collect::<Vec<_>>();
        assert_eq!(keys(&first), keys(&second));
    }

    struct BrokenDetail {
        inner: InMemoryRepository,
        broken: ExerciseId,
    }

    #[async_trait]
    impl ExerciseRepository for BrokenDetail {
        async fn fetch_exercise_pool(&self) -> Result<Vec<ExerciseSummary>, StorageError> {
            self.inner.fetch_exercise_pool().await
        }

        async fn fetch_exercise_detail(&self, id: ExerciseId) -> Result<Exercise, StorageError> {
            if id == self.broken {
                return Err(StorageError::Connection("timed out".into()));
            }
            self.inner.fetch_exercise_detail(id).await
        }
    }

    #[tokio::test]
    async fn exercise_that_fails_to_load_is_dropped() {
        let repo = seeded(4, 3);
        let broken = ExerciseId::new(2);
        let engine = ItemSelectionEngine::new(
            Arc::new(repo.clone()),
            Arc::new(BrokenDetail {
                inner: repo,
                broken,
            }),
        );

        let items = engine.select(4, 3).await.unwrap();
        assert_eq!(items.len(), 6);
        assert_eq!(items.iter().filter(|i| i.as_exercise().is_some()).count(), 2);
        assert!(items.iter().all(|i| i.key() != ItemKey::Exercise(broken)));
    }

    #[tokio::test]
    async fn rejects_counts_beyond_pool_and_empty_requests() {
        let repo = seeded(2, 1);
        let err = engine(&repo).select(3, 0).await.unwrap_err();
        assert!(matches!(
            err,
            SelectionError::CountExceedsPool {
                pool: PoolKind::Questions,
                requested: 3,
                available: 2
            }
        ));
        assert!(matches!(
            engine(&repo).select(0, 0).await,
            Err(SelectionError::NothingRequested)
        ));
    }
}
