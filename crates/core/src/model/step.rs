use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

use crate::geometry::Point;
use crate::model::hotspot::Hotspot;
use crate::model::ids::{ExerciseId, HotspotId, StepId};

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum StepError {
    #[error("step image URL is empty or invalid")]
    InvalidImageUrl,

    #[error("step image dimensions cannot be zero")]
    InvalidImageDimensions,

    #[error("step number must be >= 1")]
    InvalidStepNumber,

    #[error("hotspot belongs to step {found}, not step {expected}")]
    ForeignHotspot { expected: StepId, found: StepId },

    #[error("steps are not numbered 1..=n (expected {expected}, found {found})")]
    NonContiguous { expected: u32, found: u32 },

    #[error("hotspot {0} not found")]
    HotspotNotFound(HotspotId),
}

//
// ─── IMAGE ─────────────────────────────────────────────────────────────────────
//

/// The image a step is drawn over, with its natural pixel size.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepImage {
    url: Url,
    natural_width: u32,
    natural_height: u32,
}

impl StepImage {
    /// # Errors
    ///
    /// Returns `StepError::InvalidImageUrl` if the URL does not parse, or
    /// `StepError::InvalidImageDimensions` if either dimension is zero.
    pub fn new(
        url: impl AsRef<str>,
        natural_width: u32,
        natural_height: u32,
    ) -> Result<Self, StepError> {
        let raw = url.as_ref().trim();
        if raw.is_empty() {
            return Err(StepError::InvalidImageUrl);
        }
        let url = Url::parse(raw).map_err(|_| StepError::InvalidImageUrl)?;
        if natural_width == 0 || natural_height == 0 {
            return Err(StepError::InvalidImageDimensions);
        }
        Ok(Self {
            url,
            natural_width,
            natural_height,
        })
    }

    #[must_use]
    pub fn url(&self) -> &Url {
        &self.url
    }

    #[must_use]
    pub fn natural_width(&self) -> u32 {
        self.natural_width
    }

    #[must_use]
    pub fn natural_height(&self) -> u32 {
        self.natural_height
    }

    /// Width divided by height, for letterboxing the container.
    #[must_use]
    pub fn aspect_ratio(&self) -> f64 {
        f64::from(self.natural_width) / f64::from(self.natural_height)
    }
}

//
// ─── STEP ──────────────────────────────────────────────────────────────────────
//

/// One image-bearing stage of an exercise.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Step {
    id: StepId,
    exercise_id: ExerciseId,
    step_number: u32,
    image: StepImage,
    hotspots: Vec<Hotspot>,
}

impl Step {
    /// # Errors
    ///
    /// Returns `StepError::InvalidStepNumber` for step number zero.
    pub fn new(
        id: StepId,
        exercise_id: ExerciseId,
        step_number: u32,
        image: StepImage,
    ) -> Result<Self, StepError> {
        if step_number == 0 {
            return Err(StepError::InvalidStepNumber);
        }
        Ok(Self {
            id,
            exercise_id,
            step_number,
            image,
            hotspots: Vec::new(),
        })
    }

    /// Build a step together with its hotspots, checking that they all point back at it.
    ///
    /// # Errors
    ///
    /// Returns `StepError` for an invalid number or a hotspot owned by another step.
    pub fn with_hotspots(
        id: StepId,
        exercise_id: ExerciseId,
        step_number: u32,
        image: StepImage,
        hotspots: Vec<Hotspot>,
    ) -> Result<Self, StepError> {
        let mut step = Self::new(id, exercise_id, step_number, image)?;
        for hotspot in hotspots {
            step.push_hotspot(hotspot)?;
        }
        Ok(step)
    }

    #[must_use]
    pub fn id(&self) -> StepId {
        self.id
    }

    #[must_use]
    pub fn exercise_id(&self) -> ExerciseId {
        self.exercise_id
    }

    #[must_use]
    pub fn step_number(&self) -> u32 {
        self.step_number
    }

    pub(crate) fn set_step_number(&mut self, number: u32) {
        self.step_number = number;
    }

    #[must_use]
    pub fn image(&self) -> &StepImage {
        &self.image
    }

    #[must_use]
    pub fn hotspots(&self) -> &[Hotspot] {
        &self.hotspots
    }

    #[must_use]
    pub fn hotspot(&self, id: HotspotId) -> Option<&Hotspot> {
        self.hotspots.iter().find(|h| h.id() == id)
    }

    pub fn hotspot_mut(&mut self, id: HotspotId) -> Option<&mut Hotspot> {
        self.hotspots.iter_mut().find(|h| h.id() == id)
    }

    #[must_use]
    pub fn contains_hotspot(&self, id: HotspotId) -> bool {
        self.hotspot(id).is_some()
    }

    /// Append a hotspot and renumber.
    ///
    /// # Errors
    ///
    /// Returns `StepError::ForeignHotspot` if the hotspot belongs to another step.
    pub fn push_hotspot(&mut self, hotspot: Hotspot) -> Result<(), StepError> {
        if hotspot.step_id() != self.id {
            return Err(StepError::ForeignHotspot {
                expected: self.id,
                found: hotspot.step_id(),
            });
        }
        self.hotspots.push(hotspot);
        self.renumber_hotspots();
        Ok(())
    }

    /// Remove a hotspot and renumber the rest.
    ///
    /// # Errors
    ///
    /// Returns `StepError::HotspotNotFound` if no hotspot has that id.
    pub fn remove_hotspot(&mut self, id: HotspotId) -> Result<Hotspot, StepError> {
        let index = self
            .hotspots
            .iter()
            .position(|h| h.id() == id)
            .ok_or(StepError::HotspotNotFound(id))?;
        let removed = self.hotspots.remove(index);
        self.renumber_hotspots();
        Ok(removed)
    }

    /// Put a hotspot back at `index` (clamped), e.g. after a rejected delete.
    ///
    /// # Errors
    ///
    /// Returns `StepError::ForeignHotspot` if the hotspot belongs to another step.
    pub fn restore_hotspot(&mut self, index: usize, hotspot: Hotspot) -> Result<(), StepError> {
        if hotspot.step_id() != self.id {
            return Err(StepError::ForeignHotspot {
                expected: self.id,
                found: hotspot.step_id(),
            });
        }
        let index = index.min(self.hotspots.len());
        self.hotspots.insert(index, hotspot);
        self.renumber_hotspots();
        Ok(())
    }

    /// Topmost hotspot under `point`. Later hotspots are drawn above earlier ones.
    #[must_use]
    pub fn hit_test(&self, point: Point) -> Option<&Hotspot> {
        self.hotspots.iter().rev().find(|h| h.rect().contains(point))
    }

    fn renumber_hotspots(&mut self) {
        for (number, hotspot) in (1_u32..).zip(self.hotspots.iter_mut()) {
            hotspot.set_display_number(number);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::hotspot::HotspotKind;

    fn image() -> StepImage {
        StepImage::new("https://cdn.example.com/step-1.png", 1280, 720).unwrap()
    }

    fn step() -> Step {
        Step::new(StepId::new(1), ExerciseId::new(1), 1, image()).unwrap()
    }

    fn button_at(step: StepId, x: f64, y: f64) -> Hotspot {
        Hotspot::place(HotspotId::generate(), step, HotspotKind::Button, Point::new(x, y))
    }

    #[test]
    fn image_rejects_bad_input() {
        assert_eq!(
            StepImage::new("  ", 10, 10).unwrap_err(),
            StepError::InvalidImageUrl
        );
        assert_eq!(
            StepImage::new("https://cdn.example.com/a.png", 0, 10).unwrap_err(),
            StepError::InvalidImageDimensions
        );
    }

    #[test]
    fn hotspots_are_renumbered_after_removal() {
        let mut step = step();
        let first = button_at(step.id(), 20.0, 20.0);
        let second = button_at(step.id(), 60.0, 60.0);
        let third = button_at(step.id(), 80.0, 20.0);
        let first_id = first.id();
        step.push_hotspot(first).unwrap();
        step.push_hotspot(second).unwrap();
        step.push_hotspot(third).unwrap();

        step.remove_hotspot(first_id).unwrap();
        let numbers: Vec<_> = step.hotspots().iter().map(Hotspot::display_number).collect();
        assert_eq!(numbers, vec![1, 2]);
    }

    #[test]
    fn rejects_hotspot_from_other_step() {
        let mut step = step();
        let err = step
            .push_hotspot(button_at(StepId::new(9), 20.0, 20.0))
            .unwrap_err();
        assert!(matches!(err, StepError::ForeignHotspot { .. }));
    }

    #[test]
    fn hit_test_prefers_topmost() {
        let mut step = step();
        let below = button_at(step.id(), 50.0, 50.0);
        let above = button_at(step.id(), 52.0, 51.0);
        let above_id = above.id();
        step.push_hotspot(below).unwrap();
        step.push_hotspot(above).unwrap();

        assert_eq!(step.hit_test(Point::new(51.0, 50.5)).map(Hotspot::id), Some(above_id));
        assert!(step.hit_test(Point::new(5.0, 95.0)).is_none());
    }
}
