use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::geometry::{GeometryError, Point, Rect};
use crate::model::ids::{HotspotId, StepId};

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq)]
#[non_exhaustive]
pub enum HotspotError {
    #[error("textbox hotspot requires a correct answer")]
    MissingCorrectAnswer,

    #[error("display number must be >= 1")]
    InvalidDisplayNumber,

    #[error(transparent)]
    Geometry(#[from] GeometryError),
}

//
// ─── KIND ──────────────────────────────────────────────────────────────────────
//

/// What the learner does with a hotspot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HotspotKind {
    /// Answered by a single click.
    Button,
    /// Answered by typing a value and pressing Enter or leaving the field.
    Textbox,
}

impl HotspotKind {
    /// Default `(width, height)` in percent for a freshly placed hotspot.
    #[must_use]
    pub fn default_size(self) -> (f64, f64) {
        match self {
            HotspotKind::Button => (12.0, 6.0),
            HotspotKind::Textbox => (20.0, 5.0),
        }
    }
}

//
// ─── EDIT FIELDS ───────────────────────────────────────────────────────────────
//

/// Author-editable text fields of a hotspot, as entered in the edit dialog.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HotspotFields {
    pub label: Option<String>,
    pub placeholder: Option<String>,
    pub correct_answer: Option<String>,
    pub case_sensitive: bool,
}

impl HotspotFields {
    fn normalized(self) -> Self {
        Self {
            label: normalize_optional(self.label),
            placeholder: normalize_optional(self.placeholder),
            correct_answer: normalize_optional(self.correct_answer),
            case_sensitive: self.case_sensitive,
        }
    }
}

//
// ─── HOTSPOT ───────────────────────────────────────────────────────────────────
//

/// An interactive region anchored to percentage coordinates on a step image.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Hotspot {
    id: HotspotId,
    step_id: StepId,
    kind: HotspotKind,
    rect: Rect,
    label: Option<String>,
    placeholder: Option<String>,
    correct_answer: Option<String>,
    case_sensitive: bool,
    display_number: u32,
}

impl Hotspot {
    /// Place a new hotspot of `kind` centered at `center`, using the kind's default size.
    #[must_use]
    pub fn place(id: HotspotId, step_id: StepId, kind: HotspotKind, center: Point) -> Self {
        let (width, height) = kind.default_size();
        Self::place_sized(id, step_id, kind, center, width, height)
    }

    /// Place a new hotspot with an explicit default size.
    #[must_use]
    pub fn place_sized(
        id: HotspotId,
        step_id: StepId,
        kind: HotspotKind,
        center: Point,
        width: f64,
        height: f64,
    ) -> Self {
        Self {
            id,
            step_id,
            kind,
            rect: Rect::centered_at(center, width, height).rounded(),
            label: None,
            placeholder: None,
            correct_answer: None,
            case_sensitive: false,
            display_number: 1,
        }
    }

    /// Rehydrate a hotspot from persisted storage.
    ///
    /// # Errors
    ///
    /// Returns `HotspotError` if the geometry violates bounds or minimum size,
    /// or the display number is zero.
    pub fn from_persisted(
        id: HotspotId,
        step_id: StepId,
        kind: HotspotKind,
        rect: Rect,
        fields: HotspotFields,
        display_number: u32,
    ) -> Result<Self, HotspotError> {
        let rect = Rect::validated(rect.x, rect.y, rect.width, rect.height)?;
        if display_number == 0 {
            return Err(HotspotError::InvalidDisplayNumber);
        }
        let fields = fields.normalized();
        Ok(Self {
            id,
            step_id,
            kind,
            rect,
            label: fields.label,
            placeholder: fields.placeholder,
            correct_answer: fields.correct_answer,
            case_sensitive: fields.case_sensitive,
            display_number,
        })
    }

    #[must_use]
    pub fn id(&self) -> HotspotId {
        self.id
    }

    #[must_use]
    pub fn step_id(&self) -> StepId {
        self.step_id
    }

    #[must_use]
    pub fn kind(&self) -> HotspotKind {
        self.kind
    }

    #[must_use]
    pub fn rect(&self) -> Rect {
        self.rect
    }

    #[must_use]
    pub fn label(&self) -> Option<&str> {
        self.label.as_deref()
    }

    #[must_use]
    pub fn placeholder(&self) -> Option<&str> {
        self.placeholder.as_deref()
    }

    #[must_use]
    pub fn correct_answer(&self) -> Option<&str> {
        self.correct_answer.as_deref()
    }

    #[must_use]
    pub fn case_sensitive(&self) -> bool {
        self.case_sensitive
    }

    #[must_use]
    pub fn display_number(&self) -> u32 {
        self.display_number
    }

    /// Snapshot of the editable fields, used to prefill the edit dialog.
    #[must_use]
    pub fn fields(&self) -> HotspotFields {
        HotspotFields {
            label: self.label.clone(),
            placeholder: self.placeholder.clone(),
            correct_answer: self.correct_answer.clone(),
            case_sensitive: self.case_sensitive,
        }
    }

    /// Replace geometry after a committed gesture. The rect is rounded to two decimals.
    pub fn set_rect(&mut self, rect: Rect) {
        self.rect = rect.rounded();
    }

    pub fn set_display_number(&mut self, number: u32) {
        self.display_number = number.max(1);
    }

    /// Apply edited fields.
    ///
    /// # Errors
    ///
    /// Returns `HotspotError::MissingCorrectAnswer` for a textbox without a correct answer.
    pub fn apply_fields(&mut self, fields: HotspotFields) -> Result<(), HotspotError> {
        let fields = fields.normalized();
        if self.kind == HotspotKind::Textbox && fields.correct_answer.is_none() {
            return Err(HotspotError::MissingCorrectAnswer);
        }
        self.label = fields.label;
        self.placeholder = fields.placeholder;
        self.correct_answer = fields.correct_answer;
        self.case_sensitive = fields.case_sensitive;
        Ok(())
    }

    /// Compare learner input against the expected textbox value.
    ///
    /// Buttons have no typed answer and never match.
    #[must_use]
    pub fn matches_text(&self, input: &str) -> bool {
        let Some(expected) = self.correct_answer.as_deref() else {
            return false;
        };
        let input = input.trim();
        if self.case_sensitive {
            input == expected
        } else {
            input.to_lowercase() == expected.to_lowercase()
        }
    }
}

fn normalize_optional(value: Option<String>) -> Option<String> {
    value
        .map(|val| val.trim().to_string())
        .filter(|val| !val.is_empty())
}
