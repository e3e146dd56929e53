use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::geometry::{FULL, MIN_HEIGHT, MIN_WIDTH};
use crate::model::hotspot::HotspotKind;

/// Longest exam duration accepted, in minutes.
pub const MAX_DURATION_MINUTES: u32 = 600;

#[derive(Debug, Error, Clone, PartialEq)]
#[non_exhaustive]
pub enum ConfigError {
    #[error("exam duration must be between 1 and 600 minutes")]
    InvalidDuration,

    #[error("exam must contain at least one question or exercise")]
    EmptyExam,

    #[error("default {kind:?} size {width}x{height} is outside the allowed range")]
    InvalidDefaultSize {
        kind: HotspotKind,
        width: f64,
        height: f64,
    },
}

/// Validated parameters for one exam attempt.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExamSettings {
    duration_minutes: Option<u32>,
    question_count: usize,
    exercise_count: usize,
}

/// Raw exam parameters as entered by an author or read from the environment.
#[derive(Clone, Debug, Default)]
pub struct ExamSettingsDraft {
    pub duration_minutes: Option<u32>,
    pub question_count: usize,
    pub exercise_count: usize,
}

impl ExamSettingsDraft {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate the draft.
    ///
    /// A duration of zero is treated as "no time limit".
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if the duration is out of range or both counts are zero.
    pub fn validate(self) -> Result<ExamSettings, ConfigError> {
        let duration_minutes = self.duration_minutes.filter(|m| *m > 0);
        if duration_minutes.is_some_and(|m| m > MAX_DURATION_MINUTES) {
            return Err(ConfigError::InvalidDuration);
        }
        if self.question_count == 0 && self.exercise_count == 0 {
            return Err(ConfigError::EmptyExam);
        }
        Ok(ExamSettings {
            duration_minutes,
            question_count: self.question_count,
            exercise_count: self.exercise_count,
        })
    }
}

impl ExamSettings {
    #[must_use]
    pub fn duration_minutes(&self) -> Option<u32> {
        self.duration_minutes
    }

    #[must_use]
    pub fn question_count(&self) -> usize {
        self.question_count
    }

    #[must_use]
    pub fn exercise_count(&self) -> usize {
        self.exercise_count
    }
}

/// Defaults applied when an author drops a new hotspot.
#[derive(Clone, Debug, PartialEq)]
pub struct AuthoringSettings {
    button_size: (f64, f64),
    textbox_size: (f64, f64),
}

impl AuthoringSettings {
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidDefaultSize` if a size is below the hotspot
    /// minimum or larger than the container.
    pub fn new(button_size: (f64, f64), textbox_size: (f64, f64)) -> Result<Self, ConfigError> {
        check_size(HotspotKind::Button, button_size)?;
        check_size(HotspotKind::Textbox, textbox_size)?;
        Ok(Self {
            button_size,
            textbox_size,
        })
    }

    #[must_use]
    pub fn default_size(&self, kind: HotspotKind) -> (f64, f64) {
        match kind {
            HotspotKind::Button => self.button_size,
            HotspotKind::Textbox => self.textbox_size,
        }
    }
}

impl Default for AuthoringSettings {
    fn default() -> Self {
        Self {
            button_size: HotspotKind::Button.default_size(),
            textbox_size: HotspotKind::Textbox.default_size(),
        }
    }
}

fn check_size(kind: HotspotKind, (width, height): (f64, f64)) -> Result<(), ConfigError> {
    let ok = (MIN_WIDTH..=FULL).contains(&width) && (MIN_HEIGHT..=FULL).contains(&height);
    if ok {
        Ok(())
    } else {
        Err(ConfigError::InvalidDefaultSize {
            kind,
            width,
            height,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_duration_means_untimed() {
        let settings = ExamSettingsDraft {
            duration_minutes: Some(0),
            question_count: 3,
            exercise_count: 0,
        }
        .validate()
        .unwrap();
        assert_eq!(settings.duration_minutes(), None);
    }

    #[test]
    fn rejects_empty_and_overlong_exams() {
        assert_eq!(
            ExamSettingsDraft::new().validate().unwrap_err(),
            ConfigError::EmptyExam
        );
        let err = ExamSettingsDraft {
            duration_minutes: Some(MAX_DURATION_MINUTES + 1),
            question_count: 1,
            exercise_count: 0,
        }
        .validate()
        .unwrap_err();
        assert_eq!(err, ConfigError::InvalidDuration);
    }

    #[test]
    fn authoring_sizes_respect_minimum() {
        assert!(AuthoringSettings::new((4.0, 6.0), (20.0, 5.0)).is_err());
        assert!(AuthoringSettings::new((5.0, 3.0), (100.0, 100.0)).is_ok());
    }
}
