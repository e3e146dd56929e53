use std::fmt;
use std::sync::Arc;

use exam_core::geometry::{
    self, ContainerSize, GeometryError, PixelDelta, Rect, ResizeCorner,
};
use exam_core::model::HotspotId;

/// Handle for one pointer-move/pointer-up listener registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(pub u64);

/// Window-level pointer listeners, subscribed only while a gesture runs.
pub trait PointerEvents: Send + Sync {
    fn acquire(&self) -> ListenerId;
    fn release(&self, id: ListenerId);
}

/// Pointer source for headless use, where events are fed in directly.
#[derive(Debug, Default)]
pub struct DetachedPointer;

impl PointerEvents for DetachedPointer {
    fn acquire(&self) -> ListenerId {
        ListenerId(0)
    }

    fn release(&self, _id: ListenerId) {}
}

/// Listener registration that is released when dropped.
pub struct PointerCapture {
    source: Arc<dyn PointerEvents>,
    id: ListenerId,
}

impl PointerCapture {
    #[must_use]
    pub fn acquire(source: &Arc<dyn PointerEvents>) -> Self {
        let id = source.acquire();
        Self {
            source: Arc::clone(source),
            id,
        }
    }
}

impl Drop for PointerCapture {
    fn drop(&mut self) {
        self.source.release(self.id);
    }
}

impl fmt::Debug for PointerCapture {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PointerCapture")
            .field("id", &self.id)
            .finish_non_exhaustive()
    }
}

/// Transient geometry of a running gesture, merged over stored state when rendering.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Preview {
    pub hotspot_id: HotspotId,
    pub origin: Rect,
    pub delta: PixelDelta,
    pub container: ContainerSize,
}

/// What the author is doing with the pointer right now.
#[derive(Debug, Default)]
pub enum Interaction {
    #[default]
    Idle,
    Dragging {
        preview: Preview,
        capture: PointerCapture,
    },
    Resizing {
        preview: Preview,
        corner: ResizeCorner,
        capture: PointerCapture,
    },
}

/// Inspectable summary of `Interaction`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InteractionKind {
    Idle,
    Dragging(HotspotId),
    Resizing(HotspotId),
}

impl Interaction {
    #[must_use]
    pub fn kind(&self) -> InteractionKind {
        match self {
            Interaction::Idle => InteractionKind::Idle,
            Interaction::Dragging { preview, .. } => InteractionKind::Dragging(preview.hotspot_id),
            Interaction::Resizing { preview, .. } => InteractionKind::Resizing(preview.hotspot_id),
        }
    }

    #[must_use]
    pub fn is_active(&self) -> bool {
        !matches!(self, Interaction::Idle)
    }

    #[must_use]
    pub fn target(&self) -> Option<HotspotId> {
        self.preview().map(|p| p.hotspot_id)
    }

    #[must_use]
    pub fn preview(&self) -> Option<&Preview> {
        match self {
            Interaction::Idle => None,
            Interaction::Dragging { preview, .. } | Interaction::Resizing { preview, .. } => {
                Some(preview)
            }
        }
    }

    pub(crate) fn set_delta(&mut self, delta: PixelDelta) -> bool {
        match self {
            Interaction::Idle => false,
            Interaction::Dragging { preview, .. } | Interaction::Resizing { preview, .. } => {
                preview.delta = delta;
                true
            }
        }
    }

    /// Geometry the target hotspot would have if the gesture ended now.
    ///
    /// # Errors
    ///
    /// Returns `GeometryError::UnsupportedCorner` for a resize from an unsupported corner.
    pub fn preview_rect(&self) -> Result<Option<Rect>, GeometryError> {
        match self {
            Interaction::Idle => Ok(None),
            Interaction::Dragging { preview, .. } => Ok(Some(geometry::apply_drag(
                preview.origin,
                preview.delta,
                preview.container,
            ))),
            Interaction::Resizing {
                preview, corner, ..
            } => geometry::apply_resize(preview.origin, preview.delta, preview.container, *corner)
                .map(Some),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU64, Ordering};

    #[derive(Default)]
    struct Counting {
        live: AtomicU64,
    }

    impl PointerEvents for Counting {
        fn acquire(&self) -> ListenerId {
            self.live.fetch_add(1, Ordering::SeqCst);
            ListenerId(1)
        }

        fn release(&self, _id: ListenerId) {
            self.live.fetch_sub(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn capture_released_when_interaction_ends() {
        let counting = Arc::new(Counting::default());
        let source: Arc<dyn PointerEvents> = counting.clone();
        let mut interaction = Interaction::Dragging {
            preview: Preview {
                hotspot_id: HotspotId::generate(),
                origin: Rect::new(10.0, 10.0, 12.0, 6.0),
                delta: PixelDelta::default(),
                container: ContainerSize::new(100.0, 100.0).unwrap(),
            },
            capture: PointerCapture::acquire(&source),
        };
        assert_eq!(counting.live.load(Ordering::SeqCst), 1);

        assert!(interaction.set_delta(PixelDelta::new(5.0, 5.0)));
        assert_eq!(
            interaction.preview_rect().unwrap(),
            Some(Rect::new(15.0, 15.0, 12.0, 6.0))
        );

        let finished = std::mem::take(&mut interaction);
        drop(finished);
        assert_eq!(counting.live.load(Ordering::SeqCst), 0);
        assert_eq!(interaction.kind(), InteractionKind::Idle);
    }
}
