use async_trait::async_trait;
use exam_core::model::{
    Exercise, ExerciseId, Hotspot, HotspotId, ItemLabels, Question, Step, StepId, StepImage,
    TopicId,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use thiserror::Error;

/// Errors surfaced by storage adapters.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum StorageError {
    #[error("not found")]
    NotFound,

    #[error("conflict")]
    Conflict,

    #[error("connection error: {0}")]
    Connection(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}

/// Pool entry for a question, with the labels shown during the exam.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuestionRecord {
    pub question: Question,
    pub labels: ItemLabels,
}

/// Lightweight pool entry for an exercise; the full steps are fetched on demand.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExerciseSummary {
    pub id: ExerciseId,
    pub topic_id: TopicId,
    pub title: String,
    pub labels: ItemLabels,
    pub step_count: usize,
}

impl ExerciseSummary {
    #[must_use]
    pub fn from_exercise(exercise: &Exercise, labels: ItemLabels) -> Self {
        Self {
            id: exercise.id(),
            topic_id: exercise.topic_id(),
            title: exercise.title().to_owned(),
            labels,
            step_count: exercise.steps().len(),
        }
    }
}

/// Hotspot persistence used by the authoring controller.
#[async_trait]
pub trait HotspotRepository: Send + Sync {
    /// Store a newly placed hotspot under its step.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if the step is missing, or
    /// `StorageError::Conflict` if the id already exists.
    async fn create_hotspot(&self, hotspot: &Hotspot) -> Result<(), StorageError>;

    /// Overwrite an existing hotspot. Never creates one.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if the hotspot no longer exists.
    async fn update_hotspot(&self, hotspot: &Hotspot) -> Result<(), StorageError>;

    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if the hotspot does not exist.
    async fn delete_hotspot(&self, id: HotspotId) -> Result<(), StorageError>;
}

/// Step persistence; a step is created together with its uploaded image.
#[async_trait]
pub trait StepRepository: Send + Sync {
    /// Append a step to an exercise and return it with its assigned id and number.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if the exercise is missing.
    async fn create_step(
        &self,
        exercise_id: ExerciseId,
        image: &StepImage,
    ) -> Result<Step, StorageError>;

    /// Delete a step together with its hotspots.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if the step does not exist.
    async fn delete_step(&self, id: StepId) -> Result<(), StorageError>;
}

#[async_trait]
pub trait ExerciseRepository: Send + Sync {
    /// Exercises an exam may draw from. Only those marked complete by their author.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the pool cannot be read.
    async fn fetch_exercise_pool(&self) -> Result<Vec<ExerciseSummary>, StorageError>;

    /// Fetch an exercise with all steps and hotspots.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if missing, or other storage errors.
    async fn fetch_exercise_detail(&self, id: ExerciseId) -> Result<Exercise, StorageError>;
}

#[async_trait]
pub trait QuestionRepository: Send + Sync {
    /// # Errors
    ///
    /// Returns `StorageError` if the pool cannot be read.
    async fn fetch_question_pool(&self) -> Result<Vec<QuestionRecord>, StorageError>;
}

#[derive(Default)]
struct Inner {
    exercises: HashMap<ExerciseId, (Exercise, ItemLabels)>,
    questions: Vec<QuestionRecord>,
    next_step_id: u64,
}

impl Inner {
    fn locate_step(&mut self, id: StepId) -> Option<&mut Step> {
        self.exercises
            .values_mut()
            .find_map(|(exercise, _)| exercise.step_mut(id))
    }

    fn locate_hotspot(&mut self, id: HotspotId) -> Option<&mut Step> {
        let step_id = self
            .exercises
            .values()
            .find_map(|(exercise, _)| exercise.find_hotspot(id))
            .map(Hotspot::step_id)?;
        self.locate_step(step_id)
    }
}

/// Simple in-memory repository implementation for testing and prototyping.
#[derive(Clone, Default)]
pub struct InMemoryRepository {
    inner: Arc<Mutex<Inner>>,
}

impl InMemoryRepository {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, Inner>, StorageError> {
        self.inner
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))
    }

    /// Insert or replace an exercise in the pool.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Connection` if the store is poisoned.
    pub fn upsert_exercise(
        &self,
        exercise: Exercise,
        labels: ItemLabels,
    ) -> Result<(), StorageError> {
        let mut guard = self.lock()?;
        let max_step = exercise
            .steps()
            .iter()
            .map(|s| s.id().value())
            .max()
            .unwrap_or(0);
        guard.next_step_id = guard.next_step_id.max(max_step);
        guard.exercises.insert(exercise.id(), (exercise, labels));
        Ok(())
    }

    /// Add a question to the pool.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Conflict` if a question with that id exists.
    pub fn insert_question(
        &self,
        question: Question,
        labels: ItemLabels,
    ) -> Result<(), StorageError> {
        let mut guard = self.lock()?;
        if guard.questions.iter().any(|r| r.question.id() == question.id()) {
            return Err(StorageError::Conflict);
        }
        guard.questions.push(QuestionRecord { question, labels });
        Ok(())
    }

    /// Current stored copy of a hotspot, if any.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Connection` if the store is poisoned.
    pub fn stored_hotspot(&self, id: HotspotId) -> Result<Option<Hotspot>, StorageError> {
        let guard = self.lock()?;
        Ok(guard
            .exercises
            .values()
            .find_map(|(exercise, _)| exercise.find_hotspot(id).cloned()))
    }
}

#[async_trait]
impl HotspotRepository for InMemoryRepository {
    async fn create_hotspot(&self, hotspot: &Hotspot) -> Result<(), StorageError> {
        let mut guard = self.lock()?;
        if guard.locate_hotspot(hotspot.id()).is_some() {
            return Err(StorageError::Conflict);
        }
        let step = guard
            .locate_step(hotspot.step_id())
            .ok_or(StorageError::NotFound)?;
        step.push_hotspot(hotspot.clone())
            .map_err(|e| StorageError::Serialization(e.to_string()))
    }

    async fn update_hotspot(&self, hotspot: &Hotspot) -> Result<(), StorageError> {
        let mut guard = self.lock()?;
        let step = guard
            .locate_hotspot(hotspot.id())
            .ok_or(StorageError::NotFound)?;
        let stored = step
            .hotspot_mut(hotspot.id())
            .ok_or(StorageError::NotFound)?;
        let number = stored.display_number();
        *stored = hotspot.clone();
        stored.set_display_number(number);
        Ok(())
    }

    async fn delete_hotspot(&self, id: HotspotId) -> Result<(), StorageError> {
        let mut guard = self.lock()?;
        let step = guard.locate_hotspot(id).ok_or(StorageError::NotFound)?;
        step.remove_hotspot(id)
            .map(|_| ())
            .map_err(|_| StorageError::NotFound)
    }
}

#[async_trait]
impl StepRepository for InMemoryRepository {
    async fn create_step(
        &self,
        exercise_id: ExerciseId,
        image: &StepImage,
    ) -> Result<Step, StorageError> {
        let mut guard = self.lock()?;
        let id = StepId::new(guard.next_step_id + 1);
        let (exercise, _) = guard
            .exercises
            .get_mut(&exercise_id)
            .ok_or(StorageError::NotFound)?;
        let step = Step::new(id, exercise_id, exercise.next_step_number(), image.clone())
            .map_err(|e| StorageError::Serialization(e.to_string()))?;
        exercise.push_step(step.clone());
        guard.next_step_id += 1;
        Ok(step)
    }

    async fn delete_step(&self, id: StepId) -> Result<(), StorageError> {
        let mut guard = self.lock()?;
        let removed = guard
            .exercises
            .values_mut()
            .find_map(|(exercise, _)| exercise.remove_step(id));
        removed.map(|_| ()).ok_or(StorageError::NotFound)
    }
}

#[async_trait]
impl ExerciseRepository for InMemoryRepository {
    async fn fetch_exercise_pool(&self) -> Result<Vec<ExerciseSummary>, StorageError> {
        let guard = self.lock()?;
        let mut pool: Vec<_> = guard
            .exercises
            .values()
            .filter(|(exercise, _)| exercise.is_complete())
            .map(|(exercise, labels)| ExerciseSummary::from_exercise(exercise, labels.clone()))
            .collect();
        pool.sort_by_key(|s| s.id);
        Ok(pool)
    }

    async fn fetch_exercise_detail(&self, id: ExerciseId) -> Result<Exercise, StorageError> {
        let guard = self.lock()?;
        guard
            .exercises
            .get(&id)
            .map(|(exercise, _)| exercise.clone())
            .ok_or(StorageError::NotFound)
    }
}

#[async_trait]
impl QuestionRepository for InMemoryRepository {
    async fn fetch_question_pool(&self) -> Result<Vec<QuestionRecord>, StorageError> {
        Ok(self.lock()?.questions.clone())
    }
}

/// Aggregates the collaborator repositories behind trait objects for easy backend swapping.
#[derive(Clone)]
pub struct Storage {
    pub hotspots: Arc<dyn HotspotRepository>,
    pub steps: Arc<dyn StepRepository>,
    pub exercises: Arc<dyn ExerciseRepository>,
    pub questions: Arc<dyn QuestionRepository>,
}

impl Storage {
    #[must_use]
    pub fn in_memory() -> Self {
        Self::from_repository(InMemoryRepository::new())
    }

    #[must_use]
    pub fn from_repository(repo: InMemoryRepository) -> Self {
        Self {
            hotspots: Arc::new(repo.clone()),
            steps: Arc::new(repo.clone()),
            exercises: Arc::new(repo.clone()),
            questions: Arc::new(repo),
        }
    }
}
