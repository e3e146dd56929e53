use thiserror::Error;

use crate::geometry::GeometryError;
use crate::model::{AnswerError, ConfigError, HotspotError, QuestionError, StepError};
use crate::sequencer::SequencerError;

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    #[error(transparent)]
    Geometry(#[from] GeometryError),
    #[error(transparent)]
    Hotspot(#[from] HotspotError),
    #[error(transparent)]
    Step(#[from] StepError),
    #[error(transparent)]
    Question(#[from] QuestionError),
    #[error(transparent)]
    Answer(#[from] AnswerError),
    #[error(transparent)]
    Sequencer(#[from] SequencerError),
    #[error(transparent)]
    Config(#[from] ConfigError),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Rect;

    fn rect_or_error(x: f64) -> Result<Rect, Error> {
        Ok(Rect::validated(x, 10.0, 20.0, 10.0)?)
    }

    #[test]
    fn geometry_failures_lift_into_crate_error() {
        let err = rect_or_error(f64::NAN).unwrap_err();
        assert!(matches!(err, Error::Geometry(GeometryError::NotFinite)));
        assert!(rect_or_error(10.0).is_ok());
    }
}
