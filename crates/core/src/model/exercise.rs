use serde::{Deserialize, Serialize};

use crate::model::hotspot::Hotspot;
use crate::model::ids::{ExerciseId, HotspotId, StepId, TopicId};
use crate::model::step::{Step, StepError};

/// An ordered sequence of image steps a learner works through.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Exercise {
    id: ExerciseId,
    topic_id: TopicId,
    title: String,
    steps: Vec<Step>,
    is_complete: bool,
}

impl Exercise {
    #[must_use]
    pub fn new(id: ExerciseId, topic_id: TopicId, title: impl Into<String>) -> Self {
        Self {
            id,
            topic_id,
            title: title.into().trim().to_string(),
            steps: Vec::new(),
            is_complete: false,
        }
    }

    /// Rehydrate an exercise, checking that steps are numbered `1..=n` in order.
    ///
    /// # Errors
    ///
    /// Returns `StepError::NonContiguous` if the numbering has gaps or is out of order.
    pub fn from_persisted(
        id: ExerciseId,
        topic_id: TopicId,
        title: impl Into<String>,
        steps: Vec<Step>,
        is_complete: bool,
    ) -> Result<Self, StepError> {
        for (expected, step) in (1_u32..).zip(steps.iter()) {
            if step.step_number() != expected {
                return Err(StepError::NonContiguous {
                    expected,
                    found: step.step_number(),
                });
            }
        }
        Ok(Self {
            id,
            topic_id,
            title: title.into().trim().to_string(),
            steps,
            is_complete,
        })
    }

    #[must_use]
    pub fn id(&self) -> ExerciseId {
        self.id
    }

    #[must_use]
    pub fn topic_id(&self) -> TopicId {
        self.topic_id
    }

    #[must_use]
    pub fn title(&self) -> &str {
        &self.title
    }

    #[must_use]
    pub fn steps(&self) -> &[Step] {
        &self.steps
    }

    #[must_use]
    pub fn step(&self, id: StepId) -> Option<&Step> {
        self.steps.iter().find(|s| s.id() == id)
    }

    pub fn step_mut(&mut self, id: StepId) -> Option<&mut Step> {
        self.steps.iter_mut().find(|s| s.id() == id)
    }

    #[must_use]
    pub fn step_index(&self, id: StepId) -> Option<usize> {
        self.steps.iter().position(|s| s.id() == id)
    }

    /// Authoring flag: the author marked every step as ready.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.is_complete
    }

    pub fn set_complete(&mut self, complete: bool) {
        self.is_complete = complete;
    }

    /// Number the next appended step would get.
    #[must_use]
    pub fn next_step_number(&self) -> u32 {
        u32::try_from(self.steps.len())
            .unwrap_or(u32::MAX)
            .saturating_add(1)
    }

    /// Total hotspots across every step.
    #[must_use]
    pub fn hotspot_count(&self) -> usize {
        self.steps.iter().map(|s| s.hotspots().len()).sum()
    }

    /// Find a hotspot anywhere in the exercise.
    #[must_use]
    pub fn find_hotspot(&self, id: HotspotId) -> Option<&Hotspot> {
        self.steps.iter().find_map(|s| s.hotspot(id))
    }

    pub fn hotspot_mut(&mut self, id: HotspotId) -> Option<&mut Hotspot> {
        self.steps.iter_mut().find_map(|s| s.hotspot_mut(id))
    }

    /// Step id and index within that step of a hotspot.
    #[must_use]
    pub fn locate_hotspot(&self, id: HotspotId) -> Option<(StepId, usize)> {
        self.steps.iter().find_map(|s| {
            s.hotspots()
                .iter()
                .position(|h| h.id() == id)
                .map(|index| (s.id(), index))
        })
    }

    /// Append a step, renumbering it to follow the current last step.
    pub fn push_step(&mut self, mut step: Step) {
        step.set_step_number(self.next_step_number());
        self.steps.push(step);
    }

    /// Remove a step and its hotspots, then renumber the rest contiguously.
    pub fn remove_step(&mut self, id: StepId) -> Option<Step> {
        let index = self.step_index(id)?;
        let removed = self.steps.remove(index);
        for (number, step) in (1_u32..).zip(self.steps.iter_mut()) {
            step.set_step_number(number);
        }
        Some(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Point;
    use crate::model::hotspot::HotspotKind;
    use crate::model::step::StepImage;

    fn image() -> StepImage {
        StepImage::new("https://cdn.example.com/s.png", 800, 600).unwrap()
    }

    fn exercise_with_steps(n: u64) -> Exercise {
        let mut exercise = Exercise::new(ExerciseId::new(1), TopicId::new(1), "Login flow");
        for id in 1..=n {
            let step = Step::new(StepId::new(id), exercise.id(), 1, image()).unwrap();
            exercise.push_step(step);
        }
        exercise
    }

    #[test]
    fn removing_a_step_renumbers_and_drops_hotspots() {
        let mut exercise = exercise_with_steps(3);
        let hotspot = Hotspot::place(
            HotspotId::generate(),
            StepId::new(2),
            HotspotKind::Button,
            Point::new(50.0, 50.0),
        );
        let hotspot_id = hotspot.id();
        exercise
            .step_mut(StepId::new(2))
            .unwrap()
            .push_hotspot(hotspot)
            .unwrap();

        let removed = exercise.remove_step(StepId::new(2)).unwrap();
        assert_eq!(removed.hotspots().len(), 1);
        assert!(exercise.find_hotspot(hotspot_id).is_none());

        let numbers: Vec<_> = exercise.steps().iter().map(Step::step_number).collect();
        assert_eq!(numbers, vec![1, 2]);
    }

    #[test]
    fn from_persisted_rejects_gaps() {
        let steps = vec![
            Step::new(StepId::new(1), ExerciseId::new(1), 1, image()).unwrap(),
            Step::new(StepId::new(2), ExerciseId::new(1), 3, image()).unwrap(),
        ];
        let err = Exercise::from_persisted(ExerciseId::new(1), TopicId::new(1), "x", steps, true)
            .unwrap_err();
        assert_eq!(
            err,
            StepError::NonContiguous {
                expected: 2,
                found: 3
            }
        );
    }
}
