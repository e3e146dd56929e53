//! Step-gated playback of an exercise.
//!
//! A learner answers each hotspot with its one defining action. A step is
//! complete once every hotspot on it is answered, and only completing the
//! current step moves playback forward on its own.

use std::collections::{BTreeMap, HashMap};
use thiserror::Error;

use crate::geometry::Point;
use crate::model::{
    Exercise, ExerciseId, Hotspot, HotspotId, HotspotKind, HotspotResponse, ResponseKey, Step,
    StepId,
};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum SequencerError {
    #[error("progress belongs to exercise {expected}, got {found}")]
    ExerciseMismatch {
        expected: ExerciseId,
        found: ExerciseId,
    },

    #[error("step {0} not found")]
    StepNotFound(StepId),

    #[error("step index {0} is out of range")]
    StepIndexOutOfRange(usize),

    #[error("hotspot {0} not found on this step")]
    HotspotNotFound(HotspotId),

    #[error("step {0} is not the current step")]
    NotCurrentStep(StepId),

    #[error("{0:?} hotspots do not accept this action")]
    WrongAction(HotspotKind),
}

/// How a textbox value was submitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextTrigger {
    Enter,
    Blur,
}

/// Result of a learner action on a hotspot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionOutcome {
    /// The hotspot was answered by this action.
    Answered {
        step_complete: bool,
        /// Index of the step playback moved to, when the step completion advanced it.
        advanced_to: Option<usize>,
        exercise_complete: bool,
    },
    /// Nothing changed: the hotspot was already answered or the input was blank.
    Inert,
}

/// Per-exercise playback state: which hotspots are answered and which step is shown.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExerciseProgress {
    exercise_id: ExerciseId,
    current: usize,
    responses: HashMap<ResponseKey, HotspotResponse>,
}

impl ExerciseProgress {
    #[must_use]
    pub fn new(exercise: &Exercise) -> Self {
        Self {
            exercise_id: exercise.id(),
            current: 0,
            responses: HashMap::new(),
        }
    }

    #[must_use]
    pub fn exercise_id(&self) -> ExerciseId {
        self.exercise_id
    }

    #[must_use]
    pub fn current_index(&self) -> usize {
        self.current
    }

    #[must_use]
    pub fn current_step<'a>(&self, exercise: &'a Exercise) -> Option<&'a Step> {
        exercise.steps().get(self.current)
    }

    #[must_use]
    pub fn response(&self, key: &ResponseKey) -> Option<&HotspotResponse> {
        self.responses.get(key)
    }

    #[must_use]
    pub fn is_answered(&self, step_id: StepId, hotspot_id: HotspotId) -> bool {
        self.responses
            .contains_key(&ResponseKey::new(step_id, hotspot_id))
    }

    /// A step with no hotspots is trivially complete.
    #[must_use]
    pub fn is_step_complete(&self, step: &Step) -> bool {
        step.hotspots()
            .iter()
            .all(|h| self.is_answered(step.id(), h.id()))
    }

    /// Revisited complete steps only display their recorded answers.
    #[must_use]
    pub fn is_read_only(&self, step: &Step) -> bool {
        self.is_step_complete(step)
    }

    #[must_use]
    pub fn completed_steps(&self, exercise: &Exercise) -> usize {
        exercise
            .steps()
            .iter()
            .filter(|s| self.is_step_complete(s))
            .count()
    }

    #[must_use]
    pub fn is_exercise_complete(&self, exercise: &Exercise) -> bool {
        exercise.steps().iter().all(|s| self.is_step_complete(s))
    }

    /// Topmost hotspot under `point` on the current step.
    #[must_use]
    pub fn hit_test<'a>(&self, exercise: &'a Exercise, point: Point) -> Option<&'a Hotspot> {
        self.current_step(exercise)?.hit_test(point)
    }

    /// Record a click on a button hotspot of the current step.
    ///
    /// # Errors
    ///
    /// Returns `SequencerError` if the step or hotspot is unknown, the step is
    /// not current, or the hotspot is a textbox.
    pub fn press(
        &mut self,
        exercise: &Exercise,
        step_id: StepId,
        hotspot_id: HotspotId,
    ) -> Result<ActionOutcome, SequencerError> {
        let hotspot = self.target(exercise, step_id, hotspot_id)?;
        if hotspot.kind() != HotspotKind::Button {
            return Err(SequencerError::WrongAction(hotspot.kind()));
        }
        Ok(self.record(exercise, step_id, hotspot_id, HotspotResponse::Clicked))
    }

    /// Record a textbox value submitted with Enter or by leaving the field.
    ///
    /// Blank values leave the hotspot unanswered.
    ///
    /// # Errors
    ///
    /// Returns `SequencerError` if the step or hotspot is unknown, the step is
    /// not current, or the hotspot is a button.
    pub fn enter_text(
        &mut self,
        exercise: &Exercise,
        step_id: StepId,
        hotspot_id: HotspotId,
        value: &str,
    ) -> Result<ActionOutcome, SequencerError> {
        let hotspot = self.target(exercise, step_id, hotspot_id)?;
        if hotspot.kind() != HotspotKind::Textbox {
            return Err(SequencerError::WrongAction(hotspot.kind()));
        }
        let value = value.trim();
        if value.is_empty() {
            return Ok(ActionOutcome::Inert);
        }
        Ok(self.record(
            exercise,
            step_id,
            hotspot_id,
            HotspotResponse::Text(value.to_string()),
        ))
    }

    /// Move to the next step. Returns false at the last step.
    pub fn next(&mut self, exercise: &Exercise) -> bool {
        if self.current + 1 < exercise.steps().len() {
            self.current += 1;
            true
        } else {
            false
        }
    }

    /// Move to the previous step. Returns false at the first step.
    pub fn previous(&mut self) -> bool {
        if self.current > 0 {
            self.current -= 1;
            true
        } else {
            false
        }
    }

    /// Jump to a step by index.
    ///
    /// # Errors
    ///
    /// Returns `SequencerError::StepIndexOutOfRange` for an index past the last step.
    pub fn go_to(&mut self, exercise: &Exercise, index: usize) -> Result<(), SequencerError> {
        if index >= exercise.steps().len() {
            return Err(SequencerError::StepIndexOutOfRange(index));
        }
        self.current = index;
        Ok(())
    }

    /// Responses keyed by `{stepId}_{hotspotId}`.
    #[must_use]
    pub fn export_responses(&self) -> BTreeMap<String, HotspotResponse> {
        self.responses
            .iter()
            .map(|(key, response)| (key.to_string(), response.clone()))
            .collect()
    }

    fn target<'a>(
        &self,
        exercise: &'a Exercise,
        step_id: StepId,
        hotspot_id: HotspotId,
    ) -> Result<&'a Hotspot, SequencerError> {
        if exercise.id() != self.exercise_id {
            return Err(SequencerError::ExerciseMismatch {
                expected: self.exercise_id,
                found: exercise.id(),
            });
        }
        let index = exercise
            .step_index(step_id)
            .ok_or(SequencerError::StepNotFound(step_id))?;
        if index != self.current {
            return Err(SequencerError::NotCurrentStep(step_id));
        }
        exercise.steps()[index]
            .hotspot(hotspot_id)
            .ok_or(SequencerError::HotspotNotFound(hotspot_id))
    }

    fn record(
        &mut self,
        exercise: &Exercise,
        step_id: StepId,
        hotspot_id: HotspotId,
        response: HotspotResponse,
    ) -> ActionOutcome {
        let key = ResponseKey::new(step_id, hotspot_id);
        if self.responses.contains_key(&key) {
            return ActionOutcome::Inert;
        }
        self.responses.insert(key, response);

        let step_complete = exercise
            .steps()
            .get(self.current)
            .is_some_and(|s| self.is_step_complete(s));
        let advanced_to = if step_complete && self.next(exercise) {
            Some(self.current)
        } else {
            None
        };

        ActionOutcome::Answered {
            step_complete,
            advanced_to,
            exercise_complete: self.is_exercise_complete(exercise),
        }
    }
}
