use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Error type for parsing an ID from a string
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseIdError {
    kind: &'static str,
}

impl fmt::Display for ParseIdError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "failed to parse {} from string", self.kind)
    }
}

impl std::error::Error for ParseIdError {}

macro_rules! numeric_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        pub struct $name(u64);

        impl $name {
            #[must_use]
            pub fn new(id: u64) -> Self {
                Self(id)
            }

            /// Returns the underlying u64 value
            #[must_use]
            pub fn value(&self) -> u64 {
                self.0
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}({})", stringify!($name), self.0)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl FromStr for $name {
            type Err = ParseIdError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                s.parse::<u64>().map(Self::new).map_err(|_| ParseIdError {
                    kind: stringify!($name),
                })
            }
        }
    };
}

numeric_id!(
    /// Unique identifier for an exercise step
    StepId
);
numeric_id!(
    /// Unique identifier for an exercise
    ExerciseId
);
numeric_id!(
    /// Unique identifier for a topic
    TopicId
);
numeric_id!(
    /// Unique identifier for a question
    QuestionId
);
numeric_id!(
    /// Unique identifier for an answer option within a question
    OptionId
);
numeric_id!(
    /// Unique identifier for an exam definition
    ExamId
);

/// Unique identifier for a hotspot.
///
/// Generated on the authoring side so a hotspot can be shown before the
/// create call resolves.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct HotspotId(Uuid);

impl HotspotId {
    /// Creates a fresh random `HotspotId`
    #[must_use]
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }

    #[must_use]
    pub fn from_uuid(id: Uuid) -> Self {
        Self(id)
    }

    #[must_use]
    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl fmt::Debug for HotspotId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "HotspotId({})", self.0)
    }
}

impl fmt::Display for HotspotId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for HotspotId {
    type Err = ParseIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s)
            .map(Self)
            .map_err(|_| ParseIdError { kind: "HotspotId" })
    }
}

// ─── Composite keys ────────────────────────────────────────────────────────────

/// Key of a single item inside an exam session.
///
/// Questions and exercises live in separate id spaces, so the key keeps the
/// variant to avoid collisions in answer maps.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum ItemKey {
    Question(QuestionId),
    Exercise(ExerciseId),
}

impl fmt::Display for ItemKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ItemKey::Question(id) => write!(f, "q-{id}"),
            ItemKey::Exercise(id) => write!(f, "e-{id}"),
        }
    }
}

impl FromStr for ItemKey {
    type Err = ParseIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let err = ParseIdError { kind: "ItemKey" };
        match s.split_once('-') {
            Some(("q", id)) => id.parse().map(ItemKey::Question).map_err(|_| err),
            Some(("e", id)) => id.parse().map(ItemKey::Exercise).map_err(|_| err),
            _ => Err(err),
        }
    }
}

/// Key of a learner response to one hotspot, rendered as `{stepId}_{hotspotId}`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ResponseKey {
    pub step_id: StepId,
    pub hotspot_id: HotspotId,
}

impl ResponseKey {
    #[must_use]
    pub fn new(step_id: StepId, hotspot_id: HotspotId) -> Self {
        Self {
            step_id,
            hotspot_id,
        }
    }
}

impl fmt::Display for ResponseKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}_{}", self.step_id, self.hotspot_id)
    }
}

impl FromStr for ResponseKey {
    type Err = ParseIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let err = ParseIdError {
            kind: "ResponseKey",
        };
        let (step, hotspot) = s.split_once('_').ok_or_else(|| err.clone())?;
        Ok(Self {
            step_id: step.parse().map_err(|_| err.clone())?,
            hotspot_id: hotspot.parse().map_err(|_| err)?,
        })
    }
}

// ─── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_step_id_display() {
        let id = StepId::new(42);
        assert_eq!(id.to_string(), "42");
        assert_eq!(format!("{id:?}"), "StepId(42)");
    }

    #[test]
    fn test_question_id_from_str_invalid() {
        let result = "not-a-number".parse::<QuestionId>();
        assert!(result.is_err());
    }

    #[test]
    fn test_item_key_display_keeps_variant() {
        assert_eq!(ItemKey::Question(QuestionId::new(7)).to_string(), "q-7");
        assert_eq!(ItemKey::Exercise(ExerciseId::new(7)).to_string(), "e-7");
        assert_ne!(
            ItemKey::Question(QuestionId::new(7)),
            ItemKey::Exercise(ExerciseId::new(7))
        );
    }

    #[test]
    fn test_item_key_from_str() {
        let key: ItemKey = "e-12".parse().unwrap();
        assert_eq!(key, ItemKey::Exercise(ExerciseId::new(12)));
        assert!("x-12".parse::<ItemKey>().is_err());
    }

    #[test]
    fn test_response_key_format() {
        let hotspot = HotspotId::generate();
        let key = ResponseKey::new(StepId::new(3), hotspot);
        let rendered = key.to_string();
        assert_eq!(rendered, format!("3_{hotspot}"));
        let parsed: ResponseKey = rendered.parse().unwrap();
        assert_eq!(parsed, key);
    }

    #[test]
    fn test_hotspot_ids_are_unique() {
        assert_ne!(HotspotId::generate(), HotspotId::generate());
    }
}
