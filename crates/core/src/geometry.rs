//! Percentage-based coordinate model for hotspots.
//!
//! Every position and size is a percentage (0–100) of the step image
//! container, so a placement made on one screen lands on the same spot of the
//! image on any other. Pixel input from pointer gestures is converted here.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Upper bound of the percentage space on each axis.
pub const FULL: f64 = 100.0;
/// Smallest width a hotspot may have, in percent.
pub const MIN_WIDTH: f64 = 5.0;
/// Smallest height a hotspot may have, in percent.
pub const MIN_HEIGHT: f64 = 3.0;

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq)]
#[non_exhaustive]
pub enum GeometryError {
    #[error("container size must be positive and finite (got {width}x{height})")]
    InvalidContainer { width: f64, height: f64 },

    #[error("only the south-east corner can be used to resize")]
    UnsupportedCorner(ResizeCorner),

    #[error("rect {width}x{height} is below the minimum size")]
    BelowMinimum { width: f64, height: f64 },

    #[error("rect does not fit inside the container")]
    OutOfBounds,

    #[error("coordinate is not a finite number")]
    NotFinite,
}

//
// ─── PRIMITIVES ────────────────────────────────────────────────────────────────
//

/// A point in percent space.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    #[must_use]
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// Pointer movement in screen pixels since a gesture started.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct PixelDelta {
    pub dx: f64,
    pub dy: f64,
}

impl PixelDelta {
    #[must_use]
    pub fn new(dx: f64, dy: f64) -> Self {
        Self { dx, dy }
    }
}

/// Rendered size of the image container, in pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ContainerSize {
    width: f64,
    height: f64,
}

impl ContainerSize {
    /// # Errors
    ///
    /// Returns `GeometryError::InvalidContainer` if either side is not a positive finite number.
    pub fn new(width: f64, height: f64) -> Result<Self, GeometryError> {
        if !width.is_finite() || !height.is_finite() || width <= 0.0 || height <= 0.0 {
            return Err(GeometryError::InvalidContainer { width, height });
        }
        Ok(Self { width, height })
    }

    #[must_use]
    pub fn width(&self) -> f64 {
        self.width
    }

    #[must_use]
    pub fn height(&self) -> f64 {
        self.height
    }

    /// Convert a pixel delta into a percent delta on each axis.
    #[must_use]
    pub fn delta_to_percent(&self, delta: PixelDelta) -> (f64, f64) {
        (
            finite_or_zero(delta.dx) / self.width * FULL,
            finite_or_zero(delta.dy) / self.height * FULL,
        )
    }

    /// Convert a pixel position relative to the container's top-left into percent space.
    #[must_use]
    pub fn point_to_percent(&self, px: f64, py: f64) -> Point {
        Point::new(
            (finite_or_zero(px) / self.width * FULL).clamp(0.0, FULL),
            (finite_or_zero(py) / self.height * FULL).clamp(0.0, FULL),
        )
    }
}

/// The corner handle grabbed during a resize.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResizeCorner {
    NorthWest,
    NorthEast,
    SouthWest,
    SouthEast,
}

/// A rectangle in percent space.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    #[must_use]
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Validate a rect loaded from storage or typed by an author.
    ///
    /// # Errors
    ///
    /// Returns `GeometryError` if any field is not finite, the size is below
    /// the minimum, or the rect pokes out of the 0–100 space.
    pub fn validated(x: f64, y: f64, width: f64, height: f64) -> Result<Self, GeometryError> {
        if ![x, y, width, height].iter().all(|v| v.is_finite()) {
            return Err(GeometryError::NotFinite);
        }
        if width < MIN_WIDTH || height < MIN_HEIGHT {
            return Err(GeometryError::BelowMinimum { width, height });
        }
        if x < 0.0 || y < 0.0 || x + width > FULL || y + height > FULL {
            return Err(GeometryError::OutOfBounds);
        }
        Ok(Self::new(x, y, width, height))
    }

    /// Build a rect of the given size centered on `center`, pulled back inside bounds.
    #[must_use]
    pub fn centered_at(center: Point, width: f64, height: f64) -> Self {
        let width = width.clamp(MIN_WIDTH, FULL);
        let height = height.clamp(MIN_HEIGHT, FULL);
        Self::new(
            clamp(center.x - width / 2.0, width),
            clamp(center.y - height / 2.0, height),
            width,
            height,
        )
    }

    /// Hit test in percent space; edges count as inside.
    #[must_use]
    pub fn contains(&self, point: Point) -> bool {
        point.x >= self.x
            && point.x <= self.x + self.width
            && point.y >= self.y
            && point.y <= self.y + self.height
    }

    /// Round every field to two decimals, the precision values are committed with.
    #[must_use]
    pub fn rounded(&self) -> Self {
        let width = round2(self.width);
        let height = round2(self.height);
        Self::new(
            clamp(round2(self.x), width),
            clamp(round2(self.y), height),
            width,
            height,
        )
    }
}

//
// ─── OPERATIONS ────────────────────────────────────────────────────────────────
//

/// Keep `pos` inside `0 ..= 100 - size`.
#[must_use]
pub fn clamp(pos: f64, size: f64) -> f64 {
    let max = (FULL - size).max(0.0);
    finite_or_zero(pos).clamp(0.0, max)
}

/// Move `origin` by a pixel delta, keeping the whole rect inside the container.
#[must_use]
pub fn apply_drag(origin: Rect, delta: PixelDelta, container: ContainerSize) -> Rect {
    let (dx, dy) = container.delta_to_percent(delta);
    Rect::new(
        clamp(origin.x + dx, origin.width),
        clamp(origin.y + dy, origin.height),
        origin.width,
        origin.height,
    )
}

/// Grow or shrink `origin` from its south-east corner.
///
/// The size never drops below `MIN_WIDTH` x `MIN_HEIGHT` and never extends
/// past the right or bottom edge. The top-left anchor does not move.
///
/// # Errors
///
/// Returns `GeometryError::UnsupportedCorner` for any corner other than south-east.
pub fn apply_resize(
    origin: Rect,
    delta: PixelDelta,
    container: ContainerSize,
    corner: ResizeCorner,
) -> Result<Rect, GeometryError> {
    if corner != ResizeCorner::SouthEast {
        return Err(GeometryError::UnsupportedCorner(corner));
    }
    let (dx, dy) = container.delta_to_percent(delta);
    let max_width = (FULL - origin.x).max(MIN_WIDTH);
    let max_height = (FULL - origin.y).max(MIN_HEIGHT);
    Ok(Rect::new(
        origin.x,
        origin.y,
        (origin.width + dx).clamp(MIN_WIDTH, max_width),
        (origin.height + dy).clamp(MIN_HEIGHT, max_height),
    ))
}

/// Round to two decimal places.
#[must_use]
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

fn finite_or_zero(value: f64) -> f64 {
    if value.is_finite() { value } else { 0.0 }
}
